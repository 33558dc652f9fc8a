use std::{collections::BTreeMap, ops::Deref};

use diesel::prelude::*;
use lombok::AllArgsConstructor;
use serde::Serialize;

use crate::validation::IngredientRow;

/// One recipe's use of one catalog ingredient.
#[derive(
    Queryable,
    Selectable,
    Insertable,
    Identifiable,
    AllArgsConstructor,
    Debug,
    Clone,
    PartialEq,
    Serialize,
)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
#[diesel(primary_key(recipe_id, ingredient_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub quantity: f64,
    pub unit: String,
}

/// Partial update of a link; `None` leaves the column untouched.
#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct LinkChanges<'a> {
    pub quantity: Option<f64>,
    pub unit: Option<&'a str>,
}

impl LinkChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit.is_none()
    }
}

/// A link joined with its ingredient name, as shown on a recipe page.
#[derive(Queryable, Debug, Clone, PartialEq, Serialize)]
pub struct IngredientLine {
    pub id: i32,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portion {
    pub quantity: f64,
    pub unit: String,
}

/// The full set of links of one recipe keyed by ingredient name. Ordering of
/// the source rows is irrelevant.
#[derive(Clone, Default, PartialEq, Serialize)]
pub struct Composition {
    inner: BTreeMap<String, Portion>,
}

impl Composition {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    pub fn set_portion(&mut self, name: &str, quantity: f64, unit: &str) {
        self.inner.insert(
            name.to_owned(),
            Portion {
                quantity,
                unit: unit.to_owned(),
            },
        );
    }
}

impl From<&[IngredientLine]> for Composition {
    fn from(lines: &[IngredientLine]) -> Self {
        let mut composition = Self::new();
        lines.iter().for_each(|line| {
            composition.set_portion(&line.name, line.quantity, &line.unit);
        });
        composition
    }
}

impl From<&[IngredientRow]> for Composition {
    fn from(rows: &[IngredientRow]) -> Self {
        let mut composition = Self::new();
        rows.iter().for_each(|row| {
            composition.set_portion(row.name.trim(), row.quantity, row.unit.trim());
        });
        composition
    }
}

impl Deref for Composition {
    type Target = BTreeMap<String, Portion>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ServiceError, ServiceResult};

pub const MIN_STARS: i32 = 1;
pub const MAX_STARS: i32 = 5;

/// One submitted `{name, quantity, unit}` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRow {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

impl IngredientRow {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }

    /// Decodes the JSON array a recipe form posts as its ingredient list.
    pub fn parse_list(json: &str) -> ServiceResult<Vec<IngredientRow>> {
        serde_json::from_str(json).map_err(|error| {
            ServiceError::validation(
                "ingredients",
                format!("The ingredient list is malformed: {error}"),
            )
        })
    }

    fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            quantity: self.quantity,
            unit: self.unit.trim().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub min_title_len: usize,
    pub min_ingredient_name_len: usize,
    pub require_unit: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_title_len: 3,
            min_ingredient_name_len: 2,
            require_unit: true,
        }
    }
}

impl ValidationPolicy {
    /// Checks a recipe header and its full ingredient list, returning the rows
    /// with surrounding whitespace removed.
    pub fn validate_composition(
        &self,
        title: &str,
        rows: &[IngredientRow],
    ) -> ServiceResult<Vec<IngredientRow>> {
        let mut errors = FieldErrors::new();

        if title.trim().chars().count() < self.min_title_len {
            errors.insert(
                "title",
                format!(
                    "The title must be at least {} characters long.",
                    self.min_title_len
                ),
            );
        }

        let rows: Vec<IngredientRow> = rows.iter().map(IngredientRow::normalized).collect();

        for (index, row) in rows.iter().enumerate() {
            let prefix = format!("ingredients[{index}]");
            self.check_name(&mut errors, &format!("{prefix}.name"), &row.name);
            check_quantity(&mut errors, &format!("{prefix}.quantity"), row.quantity);
            self.check_unit(&mut errors, &format!("{prefix}.unit"), &row.unit);
        }

        for name in rows.iter().map(|row| row.name.as_str()).duplicates() {
            errors.insert(
                "ingredients",
                format!("The ingredient \"{name}\" is listed more than once."),
            );
        }

        errors.into_result()?;
        Ok(rows)
    }

    /// Checks a single ingredient added to an existing recipe.
    pub fn validate_ingredient(
        &self,
        name: &str,
        quantity: f64,
        unit: &str,
    ) -> ServiceResult<IngredientRow> {
        let row = IngredientRow::new(name, quantity, unit).normalized();

        let mut errors = FieldErrors::new();
        self.check_name(&mut errors, "name_ingredient", &row.name);
        check_quantity(&mut errors, "quantity", row.quantity);
        self.check_unit(&mut errors, "unit", &row.unit);
        errors.into_result()?;

        Ok(row)
    }

    /// Checks the fields supplied to a partial link update.
    pub fn validate_changes(&self, quantity: Option<f64>, unit: Option<&str>) -> ServiceResult<()> {
        let mut errors = FieldErrors::new();

        if let Some(quantity) = quantity {
            check_quantity(&mut errors, "quantity", quantity);
        }
        if let Some(unit) = unit {
            self.check_unit(&mut errors, "unit", unit.trim());
        }

        errors.into_result()
    }

    fn check_name(&self, errors: &mut FieldErrors, field: &str, name: &str) {
        if name.chars().count() < self.min_ingredient_name_len {
            errors.insert(
                field,
                format!(
                    "The ingredient name must be at least {} characters long.",
                    self.min_ingredient_name_len
                ),
            );
        }
    }

    fn check_unit(&self, errors: &mut FieldErrors, field: &str, unit: &str) {
        if self.require_unit && unit.is_empty() {
            errors.insert(field, "The unit cannot be empty.");
        }
    }
}

fn check_quantity(errors: &mut FieldErrors, field: &str, quantity: f64) {
    if !quantity.is_finite() || quantity <= 0.0 {
        errors.insert(field, "The quantity must be a positive number.");
    }
}

pub fn validate_stars(stars: i32) -> ServiceResult<i32> {
    if (MIN_STARS..=MAX_STARS).contains(&stars) {
        Ok(stars)
    } else {
        Err(ServiceError::validation(
            "stars",
            format!("The rating must be between {MIN_STARS} and {MAX_STARS} stars."),
        ))
    }
}

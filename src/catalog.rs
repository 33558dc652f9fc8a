//! The shared ingredient vocabulary.
//!
//! Every method runs on a connection borrowed from the caller so the catalog
//! takes part in the caller's transaction.

use diesel::prelude::*;
use itertools::Itertools;
use tracing::{debug, info};

use crate::database::connection::DbConnection;
use crate::database::models::{Ingredient, NewIngredient};
use crate::database::schema::{ingredients, recipe_ingredients};
use crate::error::{ServiceError, ServiceResult};

pub trait IngredientCatalog {
    /// Returns the id of the ingredient called `name`, creating it when the
    /// catalog has no such entry yet.
    fn resolve_or_create(&self, connection: &mut DbConnection, name: &str) -> ServiceResult<i32>;

    fn find_by_name(
        &self,
        connection: &mut DbConnection,
        name: &str,
    ) -> ServiceResult<Option<Ingredient>>;

    /// Deletes every candidate no link references anymore and returns the
    /// removed ids.
    fn collect_orphans(
        &self,
        connection: &mut DbConnection,
        candidates: &[i32],
    ) -> ServiceResult<Vec<i32>>;
}

#[derive(Debug, Clone, Copy)]
pub struct SqlCatalog {
    max_attempts: usize,
}

impl Default for SqlCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCatalog {
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

    pub fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Inserts a new entry inside a savepoint, so a uniqueness failure leaves
    /// the enclosing transaction usable. A name that already exists comes
    /// back as [`ServiceError::Conflict`].
    pub fn insert(&self, connection: &mut DbConnection, name: &str) -> ServiceResult<Ingredient> {
        connection
            .transaction(|connection| {
                diesel::insert_into(ingredients::table)
                    .values(NewIngredient { name })
                    .returning(Ingredient::as_returning())
                    .get_result(connection)
            })
            .map_err(|error| match ServiceError::from(error) {
                error if error.is_unique_violation() => {
                    ServiceError::Conflict(format!("ingredient \"{name}\" already exists"))
                }
                error => error,
            })
    }

    /// Lookup, then insert. An insert that loses a uniqueness race is
    /// followed by another lookup, up to `max_attempts` rounds.
    fn resolve_with(
        &self,
        connection: &mut DbConnection,
        name: &str,
        lookup: impl Fn(&mut DbConnection, &str, usize) -> ServiceResult<Option<Ingredient>>,
    ) -> ServiceResult<i32> {
        for attempt in 1..=self.max_attempts {
            if let Some(ingredient) = lookup(connection, name, attempt)? {
                return Ok(ingredient.id);
            }

            match self.insert(connection, name) {
                Ok(ingredient) => {
                    debug!(id = ingredient.id, name, "Created catalog ingredient");
                    return Ok(ingredient.id);
                }
                Err(ServiceError::Conflict(_)) => {
                    debug!(attempt, name, "Ingredient created concurrently");
                }
                Err(error) => return Err(error),
            }
        }

        Err(ServiceError::Conflict(format!(
            "could not resolve ingredient \"{name}\" after {} attempts",
            self.max_attempts
        )))
    }

    pub fn list(&self, connection: &mut DbConnection) -> ServiceResult<Vec<Ingredient>> {
        Ok(ingredients::table
            .select(Ingredient::as_select())
            .order(ingredients::name.asc())
            .load(connection)?)
    }

    pub fn reference_count(
        &self,
        connection: &mut DbConnection,
        ingredient_id: i32,
    ) -> ServiceResult<i64> {
        Ok(recipe_ingredients::table
            .filter(recipe_ingredients::ingredient_id.eq(ingredient_id))
            .count()
            .get_result(connection)?)
    }
}

impl IngredientCatalog for SqlCatalog {
    fn resolve_or_create(&self, connection: &mut DbConnection, name: &str) -> ServiceResult<i32> {
        self.resolve_with(connection, name, |connection, name, _| {
            self.find_by_name(connection, name)
        })
    }

    fn find_by_name(
        &self,
        connection: &mut DbConnection,
        name: &str,
    ) -> ServiceResult<Option<Ingredient>> {
        Ok(ingredients::table
            .filter(ingredients::name.eq(name))
            .select(Ingredient::as_select())
            .first(connection)
            .optional()?)
    }

    fn collect_orphans(
        &self,
        connection: &mut DbConnection,
        candidates: &[i32],
    ) -> ServiceResult<Vec<i32>> {
        let mut removed = Vec::new();

        for &ingredient_id in candidates.iter().unique() {
            if self.reference_count(connection, ingredient_id)? == 0 {
                diesel::delete(ingredients::table.find(ingredient_id)).execute(connection)?;
                removed.push(ingredient_id);
            }
        }

        if !removed.is_empty() {
            info!(?removed, "Removed orphaned ingredients");
        }

        Ok(removed)
    }
}

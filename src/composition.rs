use diesel::prelude::*;
use tracing::{info, info_span};

use crate::catalog::{IngredientCatalog, SqlCatalog};
use crate::database::connection::{DbConnection, DbPool};
use crate::database::models::{ImageChange, LinkChanges, NewRecipe, RecipeChanges, RecipeIngredient};
use crate::database::schema::{ratings, recipe_ingredients, recipes, users};
use crate::error::{ServiceError, ServiceResult};
use crate::validation::{IngredientRow, ValidationPolicy};

pub const RECIPE_NOT_FOUND: &str = "Recipe not found.";
pub const LINK_NOT_FOUND: &str = "Ingredient not found.";
pub const OWNER_NOT_FOUND: &str = "User not found.";

/// Sets the ingredient composition of recipes. Each public operation is one
/// `BEGIN IMMEDIATE` transaction: it commits completely or leaves nothing.
pub struct RecipeCompositionManager<C = SqlCatalog> {
    pool: DbPool,
    catalog: C,
    policy: ValidationPolicy,
}

impl RecipeCompositionManager<SqlCatalog> {
    pub fn new(pool: DbPool) -> Self {
        Self::with_catalog(pool, SqlCatalog::new(), ValidationPolicy::default())
    }
}

impl<C: IngredientCatalog> RecipeCompositionManager<C> {
    pub fn with_catalog(pool: DbPool, catalog: C, policy: ValidationPolicy) -> Self {
        Self {
            pool,
            catalog,
            policy,
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn ensure_recipe(&self, recipe_id: i32) -> ServiceResult<()> {
        let mut connection = self.pool.get()?;
        ensure_recipe_exists(&mut connection, recipe_id)
    }

    pub fn ensure_owner(&self, owner_id: i32) -> ServiceResult<()> {
        let mut connection = self.pool.get()?;
        ensure_user_exists(&mut connection, owner_id)
    }

    pub fn create_recipe(
        &self,
        title: &str,
        description: &str,
        owner_id: i32,
        rows: &[IngredientRow],
        image: Option<&str>,
    ) -> ServiceResult<i32> {
        let span = info_span!("create_recipe", owner_id, rows = rows.len());
        let _guard = span.enter();

        let rows = self.policy.validate_composition(title, rows)?;
        let mut connection = self.pool.get()?;

        let recipe_id = connection.immediate_transaction(|connection| {
            ensure_user_exists(connection, owner_id)?;

            let recipe_id: i32 = diesel::insert_into(recipes::table)
                .values(NewRecipe {
                    title: title.trim(),
                    description,
                    image,
                    owner_id,
                })
                .returning(recipes::id)
                .get_result(connection)?;

            self.link_rows(connection, recipe_id, &rows)?;

            Ok::<_, ServiceError>(recipe_id)
        })?;

        info!(recipe_id, "Created recipe");
        Ok(recipe_id)
    }

    /// Rewrites the recipe header and replaces its whole ingredient set with
    /// `rows`. Ingredients left without any link are removed from the catalog.
    pub fn edit_recipe(
        &self,
        recipe_id: i32,
        title: &str,
        description: &str,
        rows: &[IngredientRow],
        image: ImageChange<'_>,
    ) -> ServiceResult<()> {
        let span = info_span!("edit_recipe", recipe_id, rows = rows.len());
        let _guard = span.enter();

        let rows = self.policy.validate_composition(title, rows)?;
        let mut connection = self.pool.get()?;

        connection.immediate_transaction(|connection| {
            let updated = diesel::update(recipes::table.find(recipe_id))
                .set(RecipeChanges::new(title.trim(), description, image))
                .execute(connection)?;
            if updated == 0 {
                return Err(ServiceError::not_found(RECIPE_NOT_FOUND));
            }

            let previous = self.unlink_all(connection, recipe_id)?;
            self.link_rows(connection, recipe_id, &rows)?;
            self.catalog.collect_orphans(connection, &previous)?;

            Ok(())
        })?;

        info!(recipe_id, "Replaced recipe composition");
        Ok(())
    }

    /// Adds one ingredient to a recipe. An existing link for the same
    /// ingredient takes the new quantity and unit instead.
    pub fn add_single_ingredient(
        &self,
        recipe_id: i32,
        name: &str,
        quantity: f64,
        unit: &str,
    ) -> ServiceResult<RecipeIngredient> {
        let span = info_span!("add_single_ingredient", recipe_id, name);
        let _guard = span.enter();

        let row = self.policy.validate_ingredient(name, quantity, unit)?;
        let mut connection = self.pool.get()?;

        connection.immediate_transaction(|connection| {
            ensure_recipe_exists(connection, recipe_id)?;

            let ingredient_id = self.catalog.resolve_or_create(connection, &row.name)?;
            let existing = find_link(connection, recipe_id, ingredient_id)?;

            let link = match existing {
                Some(link) => diesel::update(&link)
                    .set(LinkChanges {
                        quantity: Some(row.quantity),
                        unit: Some(row.unit.as_str()),
                    })
                    .returning(RecipeIngredient::as_returning())
                    .get_result(connection)?,
                None => diesel::insert_into(recipe_ingredients::table)
                    .values(RecipeIngredient::new(
                        recipe_id,
                        ingredient_id,
                        row.quantity,
                        row.unit.clone(),
                    ))
                    .returning(RecipeIngredient::as_returning())
                    .get_result(connection)?,
            };

            Ok(link)
        })
    }

    /// Changes only the supplied fields of an existing link.
    pub fn update_ingredient(
        &self,
        recipe_id: i32,
        ingredient_id: i32,
        quantity: Option<f64>,
        unit: Option<&str>,
    ) -> ServiceResult<RecipeIngredient> {
        let span = info_span!("update_ingredient", recipe_id, ingredient_id);
        let _guard = span.enter();

        self.policy.validate_changes(quantity, unit)?;
        let changes = LinkChanges {
            quantity,
            unit: unit.map(str::trim),
        };
        let mut connection = self.pool.get()?;

        connection.immediate_transaction(|connection| {
            let link = find_link(connection, recipe_id, ingredient_id)?
                .ok_or_else(|| ServiceError::not_found(LINK_NOT_FOUND))?;

            if changes.is_empty() {
                return Ok(link);
            }

            Ok(diesel::update(&link)
                .set(&changes)
                .returning(RecipeIngredient::as_returning())
                .get_result(connection)?)
        })
    }

    /// Removes one link. The ingredient leaves the catalog when no other
    /// recipe uses it.
    pub fn delete_ingredient(&self, recipe_id: i32, ingredient_id: i32) -> ServiceResult<()> {
        let span = info_span!("delete_ingredient", recipe_id, ingredient_id);
        let _guard = span.enter();

        let mut connection = self.pool.get()?;

        connection.immediate_transaction(|connection| {
            let deleted = diesel::delete(recipe_ingredients::table.find((recipe_id, ingredient_id)))
                .execute(connection)?;
            if deleted == 0 {
                return Err(ServiceError::not_found(LINK_NOT_FOUND));
            }

            self.catalog.collect_orphans(connection, &[ingredient_id])?;
            Ok(())
        })
    }

    /// Deletes a recipe with its links and ratings, then drops the
    /// ingredients nothing references anymore. Returns the removed
    /// ingredient ids.
    pub fn delete_recipe(&self, recipe_id: i32) -> ServiceResult<Vec<i32>> {
        let span = info_span!("delete_recipe", recipe_id);
        let _guard = span.enter();

        let mut connection = self.pool.get()?;

        let removed = connection.immediate_transaction(|connection| {
            ensure_recipe_exists(connection, recipe_id)?;

            let previous = self.unlink_all(connection, recipe_id)?;
            diesel::delete(ratings::table.filter(ratings::recipe_id.eq(recipe_id)))
                .execute(connection)?;
            diesel::delete(recipes::table.find(recipe_id)).execute(connection)?;

            self.catalog.collect_orphans(connection, &previous)
        })?;

        info!(recipe_id, removed = removed.len(), "Deleted recipe");
        Ok(removed)
    }

    fn link_rows(
        &self,
        connection: &mut DbConnection,
        recipe_id: i32,
        rows: &[IngredientRow],
    ) -> ServiceResult<()> {
        for row in rows {
            let ingredient_id = self.catalog.resolve_or_create(connection, &row.name)?;

            diesel::insert_into(recipe_ingredients::table)
                .values(RecipeIngredient::new(
                    recipe_id,
                    ingredient_id,
                    row.quantity,
                    row.unit.clone(),
                ))
                .execute(connection)?;
        }

        Ok(())
    }

    /// Deletes every link of the recipe and returns the ingredient ids they
    /// pointed to.
    fn unlink_all(&self, connection: &mut DbConnection, recipe_id: i32) -> ServiceResult<Vec<i32>> {
        let previous: Vec<i32> = recipe_ingredients::table
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select(recipe_ingredients::ingredient_id)
            .load(connection)?;

        diesel::delete(
            recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
        )
        .execute(connection)?;

        Ok(previous)
    }
}

pub(crate) fn ensure_recipe_exists(
    connection: &mut DbConnection,
    recipe_id: i32,
) -> ServiceResult<()> {
    let exists: bool = diesel::select(diesel::dsl::exists(recipes::table.find(recipe_id)))
        .get_result(connection)?;

    if exists {
        Ok(())
    } else {
        Err(ServiceError::not_found(RECIPE_NOT_FOUND))
    }
}

pub(crate) fn ensure_user_exists(connection: &mut DbConnection, user_id: i32) -> ServiceResult<()> {
    let exists: bool = diesel::select(diesel::dsl::exists(users::table.find(user_id)))
        .get_result(connection)?;

    if exists {
        Ok(())
    } else {
        Err(ServiceError::not_found(OWNER_NOT_FOUND))
    }
}

fn find_link(
    connection: &mut DbConnection,
    recipe_id: i32,
    ingredient_id: i32,
) -> ServiceResult<Option<RecipeIngredient>> {
    Ok(recipe_ingredients::table
        .find((recipe_id, ingredient_id))
        .select(RecipeIngredient::as_select())
        .first(connection)
        .optional()?)
}

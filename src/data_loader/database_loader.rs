use diesel::prelude::*;
use lombok::AllArgsConstructor;

use crate::composition::{ensure_recipe_exists, RECIPE_NOT_FOUND};
use crate::database::connection::{DbConnection, DbPool};
use crate::database::models::{IngredientLine, Recipe, RecipeDetail, RecipeSummary};
use crate::database::schema::{ingredients, recipe_ingredients, recipes};
use crate::error::{ServiceError, ServiceResult};
use crate::rating::average_stars;

use super::data_loader::DataLoader;

#[derive(AllArgsConstructor)]
pub struct DatabaseLoader {
    pool: DbPool,
}

impl DatabaseLoader {
    fn ingredient_lines(
        connection: &mut DbConnection,
        recipe_id: i32,
    ) -> ServiceResult<Vec<IngredientLine>> {
        Ok(recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select((
                ingredients::id,
                ingredients::name,
                recipe_ingredients::quantity,
                recipe_ingredients::unit,
            ))
            .order(ingredients::name.asc())
            .load(connection)?)
    }
}

impl DataLoader for DatabaseLoader {
    fn load_recipe(&self, recipe_id: i32) -> ServiceResult<RecipeDetail> {
        let mut connection = self.pool.get()?;

        let recipe = recipes::table
            .find(recipe_id)
            .select(Recipe::as_select())
            .first(&mut connection)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(RECIPE_NOT_FOUND))?;

        let ingredients = Self::ingredient_lines(&mut connection, recipe_id)?;
        let average_rating = average_stars(&mut connection, recipe_id)?;

        Ok(RecipeDetail {
            recipe,
            ingredients,
            average_rating,
        })
    }

    fn load_recipe_ingredients(&self, recipe_id: i32) -> ServiceResult<Vec<IngredientLine>> {
        let mut connection = self.pool.get()?;
        ensure_recipe_exists(&mut connection, recipe_id)?;

        Self::ingredient_lines(&mut connection, recipe_id)
    }

    fn load_all_recipes(&self) -> ServiceResult<Vec<RecipeSummary>> {
        let mut connection = self.pool.get()?;

        let all_recipes = recipes::table
            .select(Recipe::as_select())
            .order(recipes::id.asc())
            .load(&mut connection)?;

        all_recipes
            .into_iter()
            .map(|recipe| {
                Ok(RecipeSummary {
                    average_rating: average_stars(&mut connection, recipe.id)?,
                    id: recipe.id,
                    title: recipe.title,
                    image: recipe.image,
                })
            })
            .collect()
    }
}

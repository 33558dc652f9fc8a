use crate::database::models::{Composition, IngredientLine, RecipeDetail, RecipeSummary};
use crate::error::ServiceResult;

/// Read side of the recipe store.
pub trait DataLoader {
    fn load_recipe(&self, recipe_id: i32) -> ServiceResult<RecipeDetail>;
    fn load_recipe_ingredients(&self, recipe_id: i32) -> ServiceResult<Vec<IngredientLine>>;
    fn load_all_recipes(&self) -> ServiceResult<Vec<RecipeSummary>>;

    fn load_composition(&self, recipe_id: i32) -> ServiceResult<Composition> {
        let lines = self.load_recipe_ingredients(recipe_id)?;
        Ok(Composition::from(lines.as_slice()))
    }
}

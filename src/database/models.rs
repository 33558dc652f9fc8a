pub mod ingredient;
pub mod rating;
pub mod recipe;
pub mod recipe_ingredient;
pub mod user;

pub use ingredient::{Ingredient, NewIngredient};
pub use rating::{NewRating, Rating};
pub use recipe::{ImageChange, NewRecipe, Recipe, RecipeChanges, RecipeDetail, RecipeSummary};
pub use recipe_ingredient::{Composition, IngredientLine, LinkChanges, Portion, RecipeIngredient};
pub use user::{NewUser, User};

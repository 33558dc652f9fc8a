use diesel::prelude::*;
use serde::Serialize;

use super::recipe_ingredient::IngredientLine;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Recipe {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub owner_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image: Option<&'a str>,
    pub owner_id: i32,
}

/// What an edit does to the stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageChange<'a> {
    Keep,
    /// `None` clears the image.
    Replace(Option<&'a str>),
}

/// Header fields written by an edit. The outer `None` of `image` leaves the
/// column untouched, `Some(None)` sets it to NULL.
#[derive(AsChangeset)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChanges<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image: Option<Option<&'a str>>,
}

impl<'a> RecipeChanges<'a> {
    pub fn new(title: &'a str, description: &'a str, image: ImageChange<'a>) -> Self {
        Self {
            title,
            description,
            image: match image {
                ImageChange::Keep => None,
                ImageChange::Replace(image) => Some(image),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientLine>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: i32,
    pub title: String,
    pub image: Option<String>,
    pub average_rating: Option<f64>,
}

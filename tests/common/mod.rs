#![allow(dead_code)]

use diesel::prelude::*;
use recipebook::database::connection::{establish_pooled_connection, DbPool};
use recipebook::database::schema::{recipe_ingredients, recipes};
use recipebook::users::UserService;
use recipebook::{IngredientRow, RecipeCompositionManager, SqlCatalog};
use tempfile::TempDir;

/// A migrated database file that lives as long as the value.
pub struct TestDb {
    pub pool: DbPool,
    _dir: TempDir,
}

pub fn setup_test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recipebook.sqlite");
    let pool = establish_pooled_connection(path.to_str().unwrap(), 4).unwrap();

    TestDb { pool, _dir: dir }
}

pub fn create_user(pool: &DbPool, username: &str) -> i32 {
    UserService::new(pool.clone())
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
        .id
}

pub fn rows(items: &[(&str, f64, &str)]) -> Vec<IngredientRow> {
    items
        .iter()
        .map(|(name, quantity, unit)| {
            IngredientRow::new(*name, *quantity, *unit)
        })
        .collect()
}

/// Creates a recipe without description or image and returns its id.
pub fn add_recipe(pool: &DbPool, owner: i32, title: &str, items: &[(&str, f64, &str)]) -> i32 {
    RecipeCompositionManager::new(pool.clone())
        .create_recipe(title, "", owner, &rows(items), None)
        .unwrap()
}

pub fn catalog_names(pool: &DbPool) -> Vec<String> {
    let mut connection = pool.get().unwrap();
    SqlCatalog::new()
        .list(&mut connection)
        .unwrap()
        .into_iter()
        .map(|ingredient| ingredient.name)
        .collect()
}

pub fn recipe_count(pool: &DbPool) -> i64 {
    let mut connection = pool.get().unwrap();
    recipes::table.count().get_result(&mut connection).unwrap()
}

pub fn link_count(pool: &DbPool) -> i64 {
    let mut connection = pool.get().unwrap();
    recipe_ingredients::table
        .count()
        .get_result(&mut connection)
        .unwrap()
}

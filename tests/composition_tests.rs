mod common;

use common::{add_recipe, catalog_names, create_user, link_count, recipe_count, rows, setup_test_db};
use recipebook::catalog::{IngredientCatalog, SqlCatalog};
use recipebook::data_loader::{DataLoader, DatabaseLoader};
use recipebook::database::connection::DbConnection;
use recipebook::database::models::{Composition, ImageChange, Ingredient};
use recipebook::{IngredientRow, RatingManager, RecipeCompositionManager, ServiceError};
use recipebook::{ServiceResult, ValidationPolicy};

#[test]
fn test_create_recipe_scenario() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let loader = DatabaseLoader::new(db.pool.clone());

    let sugar = rows(&[("Sugar", 200.0, "g")]);
    let recipe_id = manager
        .create_recipe("Tarte", "desc", owner, &sugar, None)
        .unwrap();

    assert_eq!(catalog_names(&db.pool), ["Sugar"]);
    let lines = loader.load_recipe_ingredients(recipe_id).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].name, "Sugar");
    assert_eq!(lines[0].quantity, 200.0);
    assert_eq!(lines[0].unit, "g");
}

#[test]
fn test_create_recipe_stores_submitted_set() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let loader = DatabaseLoader::new(db.pool.clone());

    let submitted = rows(&[
        ("Flour", 250.0, "g"),
        ("Butter", 125.0, "g"),
        ("Eggs", 2.0, "pieces"),
        ("Milk", 0.25, "l"),
    ]);
    let image = Some("uploads/images/crepes.png");
    let recipe_id = manager
        .create_recipe("Crepes", "Thin pancakes", owner, &submitted, image)
        .unwrap();

    let composition = loader.load_composition(recipe_id).unwrap();
    assert_eq!(composition, Composition::from(submitted.as_slice()));
    assert_eq!(composition.len(), 4);
    assert_eq!(composition.get("Milk").map(|p| p.quantity), Some(0.25));

    let detail = loader.load_recipe(recipe_id).unwrap();
    assert_eq!(detail.recipe.image.as_deref(), image);
}

#[test]
fn test_shared_ingredient_exists_once() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");

    let tarte = [("Sugar", 200.0, "g"), ("Flour", 250.0, "g")];
    let cake = [("Sugar", 100.0, "g"), ("Eggs", 3.0, "pcs")];
    add_recipe(&db.pool, owner, "Tarte", &tarte);
    add_recipe(&db.pool, owner, "Cake", &cake);

    assert_eq!(catalog_names(&db.pool), ["Eggs", "Flour", "Sugar"]);
    assert_eq!(link_count(&db.pool), 4);
}

#[test]
fn test_create_recipe_trims_names() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");

    add_recipe(&db.pool, owner, "Tarte", &[("Sugar", 1.0, "g")]);
    add_recipe(&db.pool, owner, "Cake", &[("  Sugar  ", 1.0, "g")]);

    assert_eq!(catalog_names(&db.pool), ["Sugar"]);
}

#[test]
fn test_create_recipe_validation_writes_nothing() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());

    let invalid = rows(&[("Sugar", 200.0, "g"), ("Salt", -1.0, "g")]);
    let result = manager.create_recipe("Ta", "", owner, &invalid, None);

    match result {
        Err(ServiceError::Validation(errors)) => {
            assert!(errors.contains("title"));
            assert!(errors.contains("ingredients[1].quantity"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(recipe_count(&db.pool), 0);
    assert!(catalog_names(&db.pool).is_empty());
}

#[test]
fn test_create_recipe_for_unknown_owner() {
    let db = setup_test_db();
    let manager = RecipeCompositionManager::new(db.pool.clone());

    let sugar = rows(&[("Sugar", 1.0, "g")]);
    let result = manager.create_recipe("Tarte", "", 404, &sugar, None);

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert_eq!(recipe_count(&db.pool), 0);
    assert!(catalog_names(&db.pool).is_empty());
}

/// Delegates to the SQL catalog but fails when asked for one name.
struct FailingCatalog {
    inner: SqlCatalog,
    fail_on: &'static str,
}

impl IngredientCatalog for FailingCatalog {
    fn resolve_or_create(&self, connection: &mut DbConnection, name: &str) -> ServiceResult<i32> {
        if name == self.fail_on {
            return Err(ServiceError::Storage(
                diesel::result::Error::RollbackTransaction,
            ));
        }
        self.inner.resolve_or_create(connection, name)
    }

    fn find_by_name(
        &self,
        connection: &mut DbConnection,
        name: &str,
    ) -> ServiceResult<Option<Ingredient>> {
        self.inner.find_by_name(connection, name)
    }

    fn collect_orphans(
        &self,
        connection: &mut DbConnection,
        candidates: &[i32],
    ) -> ServiceResult<Vec<i32>> {
        self.inner.collect_orphans(connection, candidates)
    }
}

fn failing_manager(
    db: &common::TestDb,
    fail_on: &'static str,
) -> RecipeCompositionManager<FailingCatalog> {
    let catalog = FailingCatalog {
        inner: SqlCatalog::new(),
        fail_on,
    };
    RecipeCompositionManager::with_catalog(db.pool.clone(), catalog, ValidationPolicy::default())
}

#[test]
fn test_create_recipe_rolls_back_on_failure() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = failing_manager(&db, "Boom");

    let submitted = rows(&[("Sugar", 200.0, "g"), ("Boom", 1.0, "g")]);
    let result = manager.create_recipe("Tarte", "", owner, &submitted, None);

    assert!(matches!(result, Err(ServiceError::Storage(_))));
    assert_eq!(recipe_count(&db.pool), 0);
    assert_eq!(link_count(&db.pool), 0);
    assert!(catalog_names(&db.pool).is_empty());
}

#[test]
fn test_edit_recipe_rolls_back_on_failure() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let loader = DatabaseLoader::new(db.pool.clone());
    let before = rows(&[("Sugar", 200.0, "g"), ("Apples", 4.0, "pieces")]);
    let recipe_id = RecipeCompositionManager::new(db.pool.clone())
        .create_recipe("Tarte", "desc", owner, &before, None)
        .unwrap();

    let after = rows(&[("Pears", 3.0, "pieces"), ("Boom", 1.0, "g")]);
    let result = failing_manager(&db, "Boom").edit_recipe(
        recipe_id,
        "Renamed",
        "other",
        &after,
        ImageChange::Replace(None),
    );

    assert!(result.is_err());
    let detail = loader.load_recipe(recipe_id).unwrap();
    assert_eq!(detail.recipe.title, "Tarte");
    assert_eq!(
        loader.load_composition(recipe_id).unwrap(),
        Composition::from(before.as_slice())
    );
    assert_eq!(catalog_names(&db.pool), ["Apples", "Sugar"]);
}

#[test]
fn test_edit_recipe_replaces_full_set() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let loader = DatabaseLoader::new(db.pool.clone());

    let before = rows(&[("Sugar", 200.0, "g"), ("Apples", 4.0, "pieces")]);
    let recipe_id = manager
        .create_recipe("Tarte", "desc", owner, &before, Some("tarte.png"))
        .unwrap();

    let after = rows(&[("Sugar", 150.0, "g"), ("Pears", 3.0, "pieces")]);
    let clear = ImageChange::Replace(None);
    manager
        .edit_recipe(recipe_id, "Tarte aux poires", "new desc", &after, clear)
        .unwrap();

    let detail = loader.load_recipe(recipe_id).unwrap();
    assert_eq!(detail.recipe.title, "Tarte aux poires");
    assert_eq!(detail.recipe.description, "new desc");
    assert_eq!(detail.recipe.image, None);
    assert_eq!(
        loader.load_composition(recipe_id).unwrap(),
        Composition::from(after.as_slice())
    );
    // Apples lost its only link.
    assert_eq!(catalog_names(&db.pool), ["Pears", "Sugar"]);
}

#[test]
fn test_edit_recipe_image_change() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let loader = DatabaseLoader::new(db.pool.clone());
    let sugar = rows(&[("Sugar", 200.0, "g")]);
    let recipe_id = manager
        .create_recipe("Tarte", "", owner, &sugar, Some("tarte.png"))
        .unwrap();
    let image = |loader: &DatabaseLoader| loader.load_recipe(recipe_id).unwrap().recipe.image;

    manager
        .edit_recipe(recipe_id, "Tarte", "", &sugar, ImageChange::Keep)
        .unwrap();
    assert_eq!(image(&loader).as_deref(), Some("tarte.png"));

    let replace = ImageChange::Replace(Some("tarte-2.png"));
    manager
        .edit_recipe(recipe_id, "Tarte", "", &sugar, replace)
        .unwrap();
    assert_eq!(image(&loader).as_deref(), Some("tarte-2.png"));
}

#[test]
fn test_edit_recipe_keeps_ingredients_used_elsewhere() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let tarte = add_recipe(&db.pool, owner, "Tarte", &[("Apples", 4.0, "pieces")]);
    add_recipe(&db.pool, owner, "Compote", &[("Apples", 6.0, "pieces")]);

    let pears = rows(&[("Pears", 3.0, "pieces")]);
    manager
        .edit_recipe(tarte, "Tarte", "", &pears, ImageChange::Keep)
        .unwrap();

    assert_eq!(catalog_names(&db.pool), ["Apples", "Pears"]);
}

#[test]
fn test_edit_missing_recipe() {
    let db = setup_test_db();
    let manager = RecipeCompositionManager::new(db.pool.clone());

    let sugar = rows(&[("Sugar", 1.0, "g")]);
    let result = manager.edit_recipe(99, "Tarte", "", &sugar, ImageChange::Keep);

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert!(catalog_names(&db.pool).is_empty());
}

#[test]
fn test_delete_recipe_collects_orphans() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let loader = DatabaseLoader::new(db.pool.clone());

    let first = add_recipe(
        &db.pool,
        owner,
        "Tarte",
        &[("Vanilla", 1.0, "pod"), ("Sugar", 200.0, "g")],
    );
    let second = add_recipe(&db.pool, owner, "Cake", &[("Sugar", 100.0, "g")]);

    let removed = manager.delete_recipe(first).unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(catalog_names(&db.pool), ["Sugar"]);
    assert_eq!(recipe_count(&db.pool), 1);
    assert_eq!(loader.load_recipe_ingredients(second).unwrap().len(), 1);
}

#[test]
fn test_delete_recipe_removes_ratings() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let ratings = RatingManager::new(db.pool.clone());
    let recipe_id = add_recipe(&db.pool, owner, "Tarte", &[("Sugar", 1.0, "g")]);
    ratings.rate_recipe(recipe_id, owner, 4).unwrap();

    manager.delete_recipe(recipe_id).unwrap();

    assert_eq!(ratings.rating_count(recipe_id).unwrap(), 0);
    assert_eq!(link_count(&db.pool), 0);
    assert!(catalog_names(&db.pool).is_empty());
}

#[test]
fn test_delete_missing_recipe() {
    let db = setup_test_db();
    let manager = RecipeCompositionManager::new(db.pool.clone());

    assert!(matches!(
        manager.delete_recipe(12),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn test_add_single_ingredient_upserts() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let recipe_id = add_recipe(&db.pool, owner, "Tarte", &[("Sugar", 200.0, "g")]);

    let salt = manager
        .add_single_ingredient(recipe_id, "Salt", 1.0, "tsp")
        .unwrap();
    let again = manager
        .add_single_ingredient(recipe_id, "Salt", 2.0, "pinch")
        .unwrap();

    assert_eq!(salt.ingredient_id, again.ingredient_id);
    assert_eq!(again.quantity, 2.0);
    assert_eq!(again.unit, "pinch");
    assert_eq!(link_count(&db.pool), 2);
    assert_eq!(catalog_names(&db.pool), ["Salt", "Sugar"]);
}

#[test]
fn test_add_single_ingredient_to_missing_recipe() {
    let db = setup_test_db();
    let manager = RecipeCompositionManager::new(db.pool.clone());

    let result = manager.add_single_ingredient(3, "Salt", 1.0, "tsp");

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert!(catalog_names(&db.pool).is_empty());
}

#[test]
fn test_add_single_ingredient_validation() {
    let db = setup_test_db();
    let manager = RecipeCompositionManager::new(db.pool.clone());

    match manager.add_single_ingredient(1, "S", 0.0, "g") {
        Err(ServiceError::Validation(errors)) => {
            assert!(errors.contains("name_ingredient"));
            assert!(errors.contains("quantity"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_update_ingredient_changes_only_supplied_fields() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let recipe_id = add_recipe(&db.pool, owner, "Tarte", &[("Sugar", 200.0, "g")]);
    let sugar = manager
        .add_single_ingredient(recipe_id, "Sugar", 200.0, "g")
        .unwrap()
        .ingredient_id;

    let updated = manager
        .update_ingredient(recipe_id, sugar, Some(150.0), None)
        .unwrap();
    assert_eq!(updated.quantity, 150.0);
    assert_eq!(updated.unit, "g");

    let updated = manager
        .update_ingredient(recipe_id, sugar, None, Some("oz"))
        .unwrap();
    assert_eq!(updated.quantity, 150.0);
    assert_eq!(updated.unit, "oz");

    let unchanged = manager
        .update_ingredient(recipe_id, sugar, None, None)
        .unwrap();
    assert_eq!(unchanged, updated);
}

#[test]
fn test_update_missing_link() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let recipe_id = add_recipe(&db.pool, owner, "Tarte", &[("Sugar", 200.0, "g")]);

    let result = manager.update_ingredient(recipe_id, 999, Some(1.0), None);

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[test]
fn test_delete_ingredient_collects_orphan() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let manager = RecipeCompositionManager::new(db.pool.clone());
    let loader = DatabaseLoader::new(db.pool.clone());

    let tarte = add_recipe(
        &db.pool,
        owner,
        "Tarte",
        &[("Sugar", 200.0, "g"), ("Vanilla", 1.0, "pod")],
    );
    let cake = add_recipe(&db.pool, owner, "Cake", &[("Sugar", 100.0, "g")]);
    let lines = loader.load_recipe_ingredients(tarte).unwrap();
    let id_of = |name: &str| lines.iter().find(|line| line.name == name).unwrap().id;
    let (sugar, vanilla) = (id_of("Sugar"), id_of("Vanilla"));

    manager.delete_ingredient(tarte, vanilla).unwrap();
    manager.delete_ingredient(tarte, sugar).unwrap();

    assert!(loader.load_recipe_ingredients(tarte).unwrap().is_empty());
    assert_eq!(loader.load_recipe_ingredients(cake).unwrap().len(), 1);
    assert_eq!(catalog_names(&db.pool), ["Sugar"]);
    assert!(matches!(
        manager.delete_ingredient(tarte, sugar),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn test_unit_optional_policy() {
    let db = setup_test_db();
    let owner = create_user(&db.pool, "alice");
    let policy = ValidationPolicy {
        require_unit: false,
        ..ValidationPolicy::default()
    };
    let manager =
        RecipeCompositionManager::with_catalog(db.pool.clone(), SqlCatalog::new(), policy);

    let eggs = [IngredientRow::new("Eggs", 3.0, "")];
    let recipe_id = manager
        .create_recipe("Omelette", "", owner, &eggs, None)
        .unwrap();

    let lines = DatabaseLoader::new(db.pool.clone())
        .load_recipe_ingredients(recipe_id)
        .unwrap();
    assert_eq!(lines[0].unit, "");
}

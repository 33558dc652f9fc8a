//! Caller-facing operations. Every method converts failures into an
//! [`Outcome`], so nothing from the storage layer reaches the caller.

use tracing::{info, warn};

use crate::comments::{CommentId, CommentService, CommentStore, InMemoryCommentStore};
use crate::composition::RecipeCompositionManager;
use crate::config::Config;
use crate::data_loader::{DataLoader, DatabaseLoader};
use crate::database::connection::{establish_pooled_connection, DbPool};
use crate::database::models::ImageChange;
use crate::error::ServiceResult;
use crate::outcome::Outcome;
use crate::rating::RatingManager;
use crate::uploads::{store_image, FileStorage, LocalFileStorage};
use crate::users::UserService;
use crate::validation::{IngredientRow, ValidationPolicy};

/// A submitted recipe form; `ingredients` is the JSON-encoded row list.
#[derive(Debug, Clone, Copy)]
pub struct RecipeForm<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub ingredients: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageUpload<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

pub struct App {
    compositions: RecipeCompositionManager,
    ratings: RatingManager,
    users: UserService,
    comments: CommentService,
    loader: DatabaseLoader,
    files: Box<dyn FileStorage>,
    allowed_extensions: Vec<String>,
}

fn respond<T>(result: ServiceResult<T>, on_success: impl FnOnce(T) -> Outcome) -> Outcome {
    match result {
        Ok(value) => on_success(value),
        Err(error) => Outcome::from(error),
    }
}

impl App {
    pub fn new(
        pool: DbPool,
        policy: ValidationPolicy,
        comment_store: Box<dyn CommentStore>,
        files: Box<dyn FileStorage>,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            compositions: RecipeCompositionManager::with_catalog(
                pool.clone(),
                Default::default(),
                policy,
            ),
            ratings: RatingManager::new(pool.clone()),
            users: UserService::new(pool.clone()),
            comments: CommentService::new(comment_store),
            loader: DatabaseLoader::new(pool),
            files,
            allowed_extensions,
        }
    }

    pub fn from_config(config: &Config) -> ServiceResult<Self> {
        let pool = establish_pooled_connection(&config.database_url, config.pool_size)?;
        let policy = ValidationPolicy {
            require_unit: config.require_unit,
            ..ValidationPolicy::default()
        };

        Ok(Self::new(
            pool,
            policy,
            Box::new(InMemoryCommentStore::new()),
            Box::new(LocalFileStorage::new(
                &config.upload_dir,
                &config.upload_prefix,
            )),
            config.allowed_extensions.clone(),
        ))
    }

    pub fn compositions(&self) -> &RecipeCompositionManager {
        &self.compositions
    }

    pub fn register_user(&self, username: &str, email: &str, password: &str) -> Outcome {
        respond(self.users.register(username, email, password), |user| {
            Outcome::success("Account created.").with("user_id", user.id)
        })
    }

    pub fn create_recipe(
        &self,
        form: &RecipeForm<'_>,
        owner_id: i32,
        image: Option<ImageUpload<'_>>,
    ) -> Outcome {
        let result = IngredientRow::parse_list(form.ingredients).and_then(|rows| {
            // Reject bad input before an upload is written to disk.
            self.compositions
                .policy()
                .validate_composition(form.title, &rows)?;
            self.compositions.ensure_owner(owner_id)?;

            self.with_upload(image, |image| {
                self.compositions.create_recipe(
                    form.title,
                    form.description,
                    owner_id,
                    &rows,
                    image,
                )
            })
        });

        respond(result, |recipe_id| {
            Outcome::success("Recipe created successfully.").with("recipe_id", recipe_id)
        })
    }

    /// Without a new upload the recipe keeps its current image.
    pub fn edit_recipe(
        &self,
        recipe_id: i32,
        form: &RecipeForm<'_>,
        image: Option<ImageUpload<'_>>,
    ) -> Outcome {
        let result = IngredientRow::parse_list(form.ingredients).and_then(|rows| {
            self.compositions
                .policy()
                .validate_composition(form.title, &rows)?;
            self.compositions.ensure_recipe(recipe_id)?;

            self.with_upload(image, |image| {
                let image = match image {
                    Some(path) => ImageChange::Replace(Some(path)),
                    None => ImageChange::Keep,
                };

                self.compositions.edit_recipe(
                    recipe_id,
                    form.title,
                    form.description,
                    &rows,
                    image,
                )
            })
        });

        respond(result, |()| {
            Outcome::success("Recipe updated successfully.")
        })
    }

    pub fn delete_recipe(&self, recipe_id: i32) -> Outcome {
        respond(self.compositions.delete_recipe(recipe_id), |removed| {
            Outcome::success("Recipe and unused ingredients deleted.")
                .with("removed_ingredients", removed)
        })
    }

    pub fn view_recipe(&self, recipe_id: i32) -> Outcome {
        let result = self.loader.load_recipe(recipe_id).and_then(|detail| {
            let comments = self.comments.comments_for(recipe_id)?;
            Ok((
                serde_json::to_value(detail)?,
                serde_json::to_value(comments)?,
            ))
        });

        respond(result, |(recipe, comments)| {
            Outcome::success("Recipe found.")
                .with("recipe", recipe)
                .with("comments", comments)
        })
    }

    pub fn list_recipes(&self) -> Outcome {
        let result = self
            .loader
            .load_all_recipes()
            .and_then(|recipes| Ok(serde_json::to_value(recipes)?));

        respond(result, |recipes| {
            Outcome::success("Recipes loaded.").with("recipes", recipes)
        })
    }

    pub fn add_ingredient(&self, recipe_id: i32, name: &str, quantity: f64, unit: &str) -> Outcome {
        let result = self
            .compositions
            .add_single_ingredient(recipe_id, name, quantity, unit);

        respond(result, |link| {
            Outcome::success("Ingredient added successfully.")
                .with("ingredient_id", link.ingredient_id)
                .with("name_ingredient", name.trim())
                .with("quantity", link.quantity)
                .with("unit", link.unit)
        })
    }

    pub fn update_ingredient(
        &self,
        recipe_id: i32,
        ingredient_id: i32,
        quantity: Option<f64>,
        unit: Option<&str>,
    ) -> Outcome {
        let result = self
            .compositions
            .update_ingredient(recipe_id, ingredient_id, quantity, unit);

        respond(result, |link| {
            Outcome::success("Ingredient updated successfully.")
                .with("quantity", link.quantity)
                .with("unit", link.unit)
        })
    }

    pub fn delete_ingredient(&self, recipe_id: i32, ingredient_id: i32) -> Outcome {
        respond(
            self.compositions.delete_ingredient(recipe_id, ingredient_id),
            |()| Outcome::success("Ingredient removed from recipe."),
        )
    }

    pub fn rate_recipe(&self, recipe_id: i32, user_id: i32, stars: i32) -> Outcome {
        let result = self
            .ratings
            .rate_recipe(recipe_id, user_id, stars)
            .and_then(|rating| {
                let average = self.ratings.average_rating(recipe_id)?;
                Ok((rating, average))
            });

        respond(result, |(rating, average)| {
            info!(recipe_id, user_id, stars = rating.stars, "Recipe rated");
            let message = format!("Your rating of {} stars has been saved.", rating.stars);
            Outcome::success(message)
                .with("stars", rating.stars)
                .with("average_rating", average)
        })
    }

    pub fn add_comment(&self, recipe_id: i32, user_id: i32, text: &str) -> Outcome {
        respond(self.comments.add_comment(recipe_id, user_id, text), |id| {
            Outcome::success("Comment added.").with("comment_id", id)
        })
    }

    pub fn update_comment(&self, id: CommentId, text: &str) -> Outcome {
        respond(self.comments.update_comment(id, text), |()| {
            Outcome::success("Comment updated.")
        })
    }

    pub fn delete_comment(&self, id: CommentId) -> Outcome {
        respond(self.comments.delete_comment(id), |()| {
            Outcome::success("Comment deleted.")
        })
    }

    /// Stores the upload, if any, and hands its path to `write`. The file is
    /// deleted again when `write` fails.
    fn with_upload<T>(
        &self,
        image: Option<ImageUpload<'_>>,
        write: impl FnOnce(Option<&str>) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let stored = image
            .map(|upload| {
                store_image(
                    self.files.as_ref(),
                    &self.allowed_extensions,
                    upload.bytes,
                    upload.filename,
                )
            })
            .transpose()?;

        let result = write(stored.as_deref());

        if let (Err(error), Some(path)) = (&result, &stored) {
            warn!(%error, path = %path, "Discarding upload of failed operation");
            if let Err(remove_error) = self.files.remove(path) {
                warn!(error = %remove_error, path = %path, "Unable to remove upload");
            }
        }

        result
    }
}

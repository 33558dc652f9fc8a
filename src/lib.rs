#![warn(clippy::all)]

pub mod api;
pub mod catalog;
pub mod comments;
pub mod composition;
pub mod config;
pub mod data_loader;
pub mod database;
pub mod error;
pub mod outcome;
pub mod rating;
pub mod telemetry;
pub mod uploads;
pub mod users;
pub mod validation;

pub use api::{App, ImageUpload, RecipeForm};
pub use catalog::{IngredientCatalog, SqlCatalog};
pub use composition::RecipeCompositionManager;
pub use config::Config;
pub use error::{FieldErrors, ServiceError, ServiceResult};
pub use outcome::{Message, Outcome};
pub use rating::RatingManager;
pub use validation::{IngredientRow, ValidationPolicy};

#![warn(clippy::all)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use recipebook::telemetry::init_tracing;
use recipebook::{App, Config, IngredientRow, Outcome, ServiceResult};
use serde::Deserialize;
use tracing::{info, trace_span, warn};

/// Bulk-load recipes from a JSON file, one transaction per recipe.
#[derive(Parser)]
#[command(name = "import-data", version)]
struct Args {
    /// JSON array of {title, description, owner, image, ingredients} objects
    file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ImportedRecipe {
    title: String,
    #[serde(default)]
    description: String,
    owner: i32,
    image: Option<String>,
    #[serde(default)]
    ingredients: Vec<IngredientRow>,
}

fn main() -> ExitCode {
    if let Err(error) = init_tracing() {
        eprintln!("{error}");
    }

    let args = Args::parse();

    match import(&args.file) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

/// Returns how many recipes failed to import.
fn import(file: &Path) -> ServiceResult<usize> {
    let span = trace_span!("importing recipes", file = %file.display());
    let _guard = span.enter();

    let config = Config::from_env()?;
    let app = App::from_config(&config)?;

    let recipes: Vec<ImportedRecipe> = serde_json::from_str(&fs::read_to_string(file)?)?;
    info!(count = recipes.len(), "Starting import");

    let mut failures = 0;
    for (index, recipe) in recipes.iter().enumerate() {
        let result = app.compositions().create_recipe(
            &recipe.title,
            &recipe.description,
            recipe.owner,
            &recipe.ingredients,
            recipe.image.as_deref(),
        );

        let outcome = match result {
            Ok(recipe_id) => Outcome::success("Recipe imported.").with("recipe_id", recipe_id),
            Err(error) => {
                failures += 1;
                warn!(index, title = %recipe.title, %error, "Recipe not imported");
                Outcome::from(error)
            }
        };

        println!("{}", serde_json::to_string(&outcome.with("index", index))?);
    }

    info!(imported = recipes.len() - failures, failures, "End import");
    Ok(failures)
}

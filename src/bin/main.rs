#![warn(clippy::all)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use recipebook::telemetry::init_tracing;
use recipebook::{App, Config, ImageUpload, Outcome, RecipeForm, ServiceError, ServiceResult};
use tracing::trace_span;

#[derive(Parser)]
#[command(name = "recipebook", version, about = "Administer the recipe database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Create a user account
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Create a recipe with its ingredients
    Create {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        owner: i32,
        /// JSON array of {"name", "quantity", "unit"} objects
        #[arg(long, default_value = "[]")]
        ingredients: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Replace a recipe's header and full ingredient list
    Edit {
        id: i32,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "[]")]
        ingredients: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a recipe and the ingredients only it used
    Delete { id: i32 },
    /// Add one ingredient to a recipe, or update it when already present
    AddIngredient {
        recipe_id: i32,
        name: String,
        quantity: f64,
        #[arg(long, default_value = "")]
        unit: String,
    },
    /// Change the quantity and/or unit of a recipe ingredient
    UpdateIngredient {
        recipe_id: i32,
        ingredient_id: i32,
        #[arg(long)]
        quantity: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Remove one ingredient from a recipe
    RemoveIngredient { recipe_id: i32, ingredient_id: i32 },
    /// Rate a recipe from 1 to 5 stars
    Rate {
        recipe_id: i32,
        user_id: i32,
        #[arg(allow_negative_numbers = true)]
        stars: i32,
    },
    /// Show one recipe with its ingredients
    Show { id: i32 },
    /// List every recipe with its average rating
    List,
}

fn main() -> ExitCode {
    if let Err(error) = init_tracing() {
        eprintln!("{error}");
    }

    let cli = Cli::parse();

    let outcome = match run(cli.command) {
        Ok(outcome) => outcome,
        Err(error) => Outcome::from(error),
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{json}"),
        Err(error) => eprintln!("Unable to print result: {error}"),
    }

    if outcome.error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(command: Command) -> ServiceResult<Outcome> {
    let span = trace_span!("running command");
    let _guard = span.enter();

    let config = Config::from_env()?;
    let app = App::from_config(&config)?;

    let outcome = match command {
        Command::Migrate => Outcome::success("Database is up to date."),
        Command::Register {
            username,
            email,
            password,
        } => app.register_user(&username, &email, &password),
        Command::Create {
            title,
            description,
            owner,
            ingredients,
            image,
        } => {
            let image = image.as_deref().map(read_upload).transpose()?;
            let form = RecipeForm {
                title: &title,
                description: &description,
                ingredients: &ingredients,
            };
            app.create_recipe(&form, owner, upload(&image))
        }
        Command::Edit {
            id,
            title,
            description,
            ingredients,
            image,
        } => {
            let image = image.as_deref().map(read_upload).transpose()?;
            let form = RecipeForm {
                title: &title,
                description: &description,
                ingredients: &ingredients,
            };
            app.edit_recipe(id, &form, upload(&image))
        }
        Command::Delete { id } => app.delete_recipe(id),
        Command::AddIngredient {
            recipe_id,
            name,
            quantity,
            unit,
        } => app.add_ingredient(recipe_id, &name, quantity, &unit),
        Command::UpdateIngredient {
            recipe_id,
            ingredient_id,
            quantity,
            unit,
        } => app.update_ingredient(recipe_id, ingredient_id, quantity, unit.as_deref()),
        Command::RemoveIngredient {
            recipe_id,
            ingredient_id,
        } => app.delete_ingredient(recipe_id, ingredient_id),
        Command::Rate {
            recipe_id,
            user_id,
            stars,
        } => app.rate_recipe(recipe_id, user_id, stars),
        Command::Show { id } => app.view_recipe(id),
        Command::List => app.list_recipes(),
    };

    Ok(outcome)
}

/// Reads an image from disk as `(filename, bytes)`.
fn read_upload(path: &Path) -> ServiceResult<(String, Vec<u8>)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ServiceError::validation("image", "The image path has no file name.")
        })?
        .to_owned();

    Ok((filename, fs::read(path)?))
}

fn upload(image: &Option<(String, Vec<u8>)>) -> Option<ImageUpload<'_>> {
    image.as_ref().map(|(filename, bytes)| ImageUpload {
        filename,
        bytes,
    })
}

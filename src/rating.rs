use diesel::prelude::*;
use tracing::{debug, info_span};

use crate::composition::{ensure_recipe_exists, ensure_user_exists};
use crate::database::connection::{DbConnection, DbPool};
use crate::database::models::{NewRating, Rating};
use crate::database::schema::ratings;
use crate::error::ServiceResult;
use crate::validation::validate_stars;

pub struct RatingManager {
    pool: DbPool,
}

impl RatingManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Records `stars` for the pair, replacing an earlier rating by the same
    /// user.
    pub fn rate_recipe(&self, recipe_id: i32, user_id: i32, stars: i32) -> ServiceResult<Rating> {
        let span = info_span!("rate_recipe", recipe_id, user_id, stars);
        let _guard = span.enter();

        let stars = validate_stars(stars)?;
        let mut connection = self.pool.get()?;

        connection.immediate_transaction(|connection| {
            ensure_recipe_exists(connection, recipe_id)?;

            ensure_user_exists(connection, user_id)?;

            let existing = ratings::table
                .filter(ratings::recipe_id.eq(recipe_id))
                .filter(ratings::user_id.eq(user_id))
                .select(Rating::as_select())
                .first(connection)
                .optional()?;

            let rating = match existing {
                Some(rating) => {
                    debug!(
                        rating_id = rating.id,
                        previous = rating.stars,
                        "Updating rating"
                    );
                    diesel::update(&rating)
                        .set(ratings::stars.eq(stars))
                        .returning(Rating::as_returning())
                        .get_result(connection)?
                }
                None => diesel::insert_into(ratings::table)
                    .values(NewRating::new(recipe_id, user_id, stars))
                    .returning(Rating::as_returning())
                    .get_result(connection)?,
            };

            Ok(rating)
        })
    }

    /// Mean of the stars given to the recipe, `None` while it is unrated.
    pub fn average_rating(&self, recipe_id: i32) -> ServiceResult<Option<f64>> {
        let mut connection = self.pool.get()?;
        ensure_recipe_exists(&mut connection, recipe_id)?;

        average_stars(&mut connection, recipe_id)
    }

    pub fn rating_count(&self, recipe_id: i32) -> ServiceResult<i64> {
        let mut connection = self.pool.get()?;

        Ok(ratings::table
            .filter(ratings::recipe_id.eq(recipe_id))
            .count()
            .get_result(&mut connection)?)
    }
}

pub(crate) fn average_stars(
    connection: &mut DbConnection,
    recipe_id: i32,
) -> ServiceResult<Option<f64>> {
    let stars: Vec<i32> = ratings::table
        .filter(ratings::recipe_id.eq(recipe_id))
        .select(ratings::stars)
        .load(connection)?;

    if stars.is_empty() {
        return Ok(None);
    }

    let total: i64 = stars.iter().map(|&stars| i64::from(stars)).sum();
    Ok(Some(total as f64 / stars.len() as f64))
}

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{info, info_span};

use crate::database::connection::DbPool;
use crate::database::models::{NewUser, User};
use crate::database::schema::users;
use crate::error::{FieldErrors, ServiceError, ServiceResult};

pub const MIN_PASSWORD_LEN: usize = 6;

const EMAIL_TAKEN: &str = "Email address already exists";
const USERNAME_TAKEN: &str = "Username already taken";

pub struct UserService {
    pool: DbPool,
}

impl UserService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> ServiceResult<User> {
        let span = info_span!("register_user", username);
        let _guard = span.enter();

        let username = username.trim();
        let email = email.trim();

        let mut errors = FieldErrors::new();
        if username.is_empty() {
            errors.insert("username", "The username cannot be empty.");
        }
        if !email.contains('@') {
            errors.insert("email", "The email address is invalid.");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password", "Password is too weak");
        }
        errors.into_result()?;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        let mut connection = self.pool.get()?;

        let user = connection.immediate_transaction(|connection| {
            let email_taken: bool = diesel::select(diesel::dsl::exists(
                users::table.filter(users::email.eq(email)),
            ))
            .get_result(connection)?;
            if email_taken {
                return Err(ServiceError::validation("email", EMAIL_TAKEN));
            }

            diesel::insert_into(users::table)
                .values(NewUser {
                    username,
                    email,
                    password_hash: &password_hash,
                })
                .returning(User::as_returning())
                .get_result(connection)
                .map_err(registration_conflict)
        })?;

        info!(user_id = user.id, "Registered user");
        Ok(user)
    }

    pub fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let mut connection = self.pool.get()?;

        let user = users::table
            .filter(users::email.eq(email.trim()))
            .select(User::as_select())
            .first(&mut connection)
            .optional()?
            .ok_or_else(|| ServiceError::Unauthorized("Email not found".to_owned()))?;

        let parsed_hash = PasswordHash::new(&user.password_hash)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                ServiceError::Unauthorized("Password incorrect".to_owned())
            })?;

        Ok(user)
    }
}

/// Maps a UNIQUE failure on `users` to the field it concerns.
fn registration_conflict(error: DieselError) -> ServiceError {
    let email_taken = match &error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            Some(info.message().contains("users.email"))
        }
        _ => None,
    };

    match email_taken {
        Some(true) => ServiceError::validation("email", EMAIL_TAKEN),
        Some(false) => ServiceError::validation("username", USERNAME_TAKEN),
        None => ServiceError::from(error),
    }
}

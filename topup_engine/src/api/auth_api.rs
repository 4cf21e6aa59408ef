use std::fmt::Debug;

use log::*;

use crate::{
    api::{
        account_objects::{LoginRequest, NewUserRequest},
        order_objects::{Paged, Pagination},
    },
    db_types::{CustomerSummary, NewUser, ProfileUpdate, Role, User},
    helpers::{hash_password, verify_password},
    traits::{AuthApiError, UserManagement},
    validation::{is_blank, is_valid_email, ValidationErrors},
};

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// `AuthApi` manages user registration, credential checks and profiles.
///
/// It does not issue tokens. That is left to the transport layer, which decides what a session looks like.
pub struct AuthApi<B> {
    db: B,
}

impl<B: Debug> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B> AuthApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a new customer. Self-registration can never create an admin.
    pub async fn register(&self, request: NewUserRequest) -> Result<User, AuthApiError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();
        let mut errors = ValidationErrors::new();
        errors.check(
            username.chars().count() >= MIN_USERNAME_LENGTH,
            "username",
            "Username must be at least 3 characters long",
        );
        errors.check(is_valid_email(&email), "email", "Please provide a valid email");
        errors.check(
            request.password.chars().count() >= MIN_PASSWORD_LENGTH,
            "password",
            "Password must be at least 6 characters long",
        );
        errors.check(!is_blank(&request.player_id), "player_id", "Player ID is required");
        errors.into_result()?;
        if self.db.username_or_email_exists(&username, &email).await? {
            debug!("🔐️ Registration refused for '{username}'. Username or email already taken.");
            return Err(AuthApiError::UserAlreadyExists);
        }
        let password_hash =
            hash_password(&request.password).map_err(|e| AuthApiError::PasswordHashError(e.to_string()))?;
        let user = NewUser {
            username,
            email,
            password_hash,
            role: Role::Customer,
            player_id: request.player_id.trim().to_string(),
            phone: request.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        };
        let user = self.db.insert_user(user).await?;
        info!("🔐️ New customer registered: #{} '{}'", user.id, user.username);
        Ok(user)
    }

    /// Checks the credentials and returns the matching user.
    ///
    /// An unknown username and a wrong password produce the same error, so that callers cannot probe for accounts.
    pub async fn login(&self, request: LoginRequest) -> Result<User, AuthApiError> {
        let mut errors = ValidationErrors::new();
        errors.check(!is_blank(&request.username), "username", "Username is required");
        errors.check(!request.password.is_empty(), "password", "Password is required");
        errors.into_result()?;
        let user = self.db.fetch_user_by_username(request.username.trim()).await?.ok_or_else(|| {
            debug!("🔐️ Login attempt for unknown user '{}'", request.username.trim());
            AuthApiError::InvalidCredentials
        })?;
        let valid = verify_password(&request.password, &user.password_hash)
            .map_err(|e| AuthApiError::PasswordHashError(e.to_string()))?;
        if !valid {
            debug!("🔐️ Wrong password for user #{}", user.id);
            return Err(AuthApiError::InvalidCredentials);
        }
        debug!("🔐️ User #{} ({}) logged in", user.id, user.role);
        Ok(user)
    }

    pub async fn profile(&self, user_id: i64) -> Result<User, AuthApiError> {
        self.db.fetch_user(user_id).await?.ok_or(AuthApiError::UserNotFound(user_id))
    }

    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User, AuthApiError> {
        let update = ProfileUpdate {
            email: update.email.map(|e| e.trim().to_string()),
            player_id: update.player_id.map(|p| p.trim().to_string()),
            phone: update.phone.map(|p| p.trim().to_string()),
        };
        if update.is_empty() {
            return Err(ValidationErrors::general("No valid fields to update").into());
        }
        let mut errors = ValidationErrors::new();
        if let Some(email) = &update.email {
            errors.check(is_valid_email(email), "email", "Please provide a valid email");
        }
        if let Some(player_id) = &update.player_id {
            errors.check(!player_id.is_empty(), "player_id", "Player ID cannot be empty");
        }
        errors.into_result()?;
        let user = self.db.update_profile(user_id, update).await?.ok_or(AuthApiError::UserNotFound(user_id))?;
        debug!("🔐️ Profile updated for user #{user_id}");
        Ok(user)
    }

    pub async fn customers(
        &self,
        search: Option<String>,
        page: Pagination,
    ) -> Result<Paged<CustomerSummary>, AuthApiError> {
        let search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.db.fetch_customers(search, page).await
    }

    /// Creates an admin account with the given credentials, unless a user with that username already exists.
    ///
    /// Admins cannot register themselves, so this is how the first admin comes into being. Returns the new user, or
    /// `None` if the username was taken (in which case nothing is changed, whatever that user's role is).
    pub async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthApiError> {
        if self.db.fetch_user_by_username(username).await?.is_some() {
            debug!("🔐️ Admin account '{username}' already exists");
            return Ok(None);
        }
        let mut errors = ValidationErrors::new();
        errors.check(is_valid_email(email), "email", "Please provide a valid email");
        errors.check(
            password.chars().count() >= MIN_PASSWORD_LENGTH,
            "password",
            "Password must be at least 6 characters long",
        );
        errors.into_result()?;
        let password_hash = hash_password(password).map_err(|e| AuthApiError::PasswordHashError(e.to_string()))?;
        let admin = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
            player_id: "-".to_string(),
            phone: None,
        };
        let admin = self.db.insert_user(admin).await?;
        warn!("🔐️ Admin account '{}' created (#{})", admin.username, admin.id);
        Ok(Some(admin))
    }
}

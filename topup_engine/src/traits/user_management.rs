use thiserror::Error;

use crate::{
    api::order_objects::{Pagination, Paged},
    db_types::{CustomerSummary, NewUser, ProfileUpdate, User},
    validation::ValidationErrors,
};

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid user data. {0}")]
    ValidationError(ValidationErrors),
    #[error("Username or email already exists")]
    UserAlreadyExists,
    #[error("Email address is already in use")]
    EmailAlreadyInUse,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found: {0}")]
    UserNotFound(i64),
    #[error("Could not process password. {0}")]
    PasswordHashError(String),
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

impl From<ValidationErrors> for AuthApiError {
    fn from(e: ValidationErrors) -> Self {
        AuthApiError::ValidationError(e)
    }
}

/// Storage for user identities and credentials.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    async fn fetch_user(&self, id: i64) -> Result<Option<User>, AuthApiError>;

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, AuthApiError>;

    /// Returns true if either the username or the email address is already registered.
    async fn username_or_email_exists(&self, username: &str, email: &str) -> Result<bool, AuthApiError>;

    /// Inserts a new user. Backends return [`AuthApiError::UserAlreadyExists`] if a uniqueness constraint is violated.
    async fn insert_user(&self, user: NewUser) -> Result<User, AuthApiError>;

    /// Applies the (non-empty) profile update and returns the updated user, or `None` if the user does not exist.
    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<Option<User>, AuthApiError>;

    /// A page of customers, newest first, optionally filtered by a substring of the username, email or player id.
    async fn fetch_customers(
        &self,
        search: Option<String>,
        page: Pagination,
    ) -> Result<Paged<CustomerSummary>, AuthApiError>;

    async fn count_customers(&self) -> Result<i64, AuthApiError>;
}

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use serde_json::json;
use thiserror::Error;
use topup_engine::{validation::ValidationErrors, AuthApiError, CatalogError, OrderFlowError, SettingsError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    ValidationError(ValidationErrors),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Could not serialize access token. {0}")]
    CouldNotSerializeAccessToken(String),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InsufficientPermissions(String),
}

impl ServerError {
    /// The message that is shown to clients. Internal errors are logged, and replaced by a generic message.
    fn public_message(&self) -> String {
        match self {
            Self::AuthenticationError(e) => e.to_string(),
            Self::InvalidRequestBody(_) |
            Self::InvalidRequestPath(_) |
            Self::NoRecordFound(_) |
            Self::Conflict(_) |
            Self::InsufficientPermissions(_) => self.to_string(),
            Self::ValidationError(e) => e.to_string(),
            _ => "Server error".to_string(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken(_) => StatusCode::FORBIDDEN,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
                AuthError::InvalidSignature(_) => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CouldNotSerializeAccessToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ Request failed. {self}");
        }
        let body = match self {
            // Request-level validation failures have no field, and are reported as a plain message
            Self::ValidationError(errors) if errors.errors().iter().any(|e| !e.field.is_empty()) => {
                json!({ "errors": errors })
            },
            _ => json!({ "message": self.public_message() }),
        };
        HttpResponse::build(status).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    InsufficientPermissions(String),
    #[error("Requests from this address are not allowed")]
    ForbiddenPeer,
    #[error("Invalid signature. {0}")]
    InvalidSignature(String),
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AuthApiError::ValidationError(e) => Self::ValidationError(e),
            AuthApiError::UserAlreadyExists => Self::Conflict(e.to_string()),
            AuthApiError::EmailAlreadyInUse => Self::Conflict(e.to_string()),
            AuthApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            AuthApiError::UserNotFound(_) => Self::NoRecordFound("User not found".to_string()),
            AuthApiError::PasswordHashError(e) => Self::BackendError(format!("Password hashing failed. {e}")),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            OrderFlowError::ValidationError(e) => Self::ValidationError(e),
            OrderFlowError::ProductNotFound(_) => Self::NoRecordFound("Product not found or inactive".to_string()),
            OrderFlowError::UserNotFound(_) => Self::NoRecordFound("User not found".to_string()),
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound("Order not found".to_string()),
            OrderFlowError::AccessDenied => Self::InsufficientPermissions("Access denied".to_string()),
            OrderFlowError::VersionConflict { .. } => Self::Conflict(e.to_string()),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            CatalogError::ValidationError(e) => Self::ValidationError(e),
            CatalogError::ProductNotFound(_) => Self::NoRecordFound("Product not found".to_string()),
            CatalogError::ProductHasOrders(_) => Self::Conflict(e.to_string()),
        }
    }
}

impl From<SettingsError> for ServerError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            SettingsError::ValidationError(e) => Self::ValidationError(e),
            SettingsError::SettingNotFound(_) => Self::NoRecordFound("Setting not found".to_string()),
        }
    }
}

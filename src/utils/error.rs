use async_graphql::ErrorExtensions;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    UserInput(String),
    Authentication(String),
    Forbidden(String),
    NotFound(String),
    DatabaseError(String),
    Internal(String),
}

impl AppError {
    /// Code surfaced to GraphQL clients under `extensions.code`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UserInput(_) => "BAD_USER_INPUT",
            AppError::Authentication(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) | AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UserInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Authentication(msg) => write!(f, "Not authenticated: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        AppError::DatabaseError(format!("serialization failed: {}", e))
    }
}

impl From<mongodb::bson::de::Error> for AppError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        AppError::DatabaseError(format!("deserialization failed: {}", e))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing failed: {}", e))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Authentication(format!("invalid token: {}", e))
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| ext.set("code", code))
    }
}

/// Resolver-side conversion that keeps `extensions.code`. A bare `?` would
/// go through async-graphql's `Display` conversion and drop it.
pub trait GraphqlResult<T> {
    fn graphql(self) -> async_graphql::Result<T>;
}

impl<T> GraphqlResult<T> for Result<T, AppError> {
    fn graphql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

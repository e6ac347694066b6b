use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::models::ValidationError;
use crate::repo::RepoError;
use crate::usecase::UseCaseError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("you are not allowed to access this resource")]
    Forbidden,
    #[error("resource not found")]
    NotFound,
    #[error("too many requests")]
    RateLimited,
    #[error("internal server error")]
    Internal,
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Forbidden => ApiError::Forbidden,
            RepoError::Internal(cause) => {
                log::error!("repository failure: {cause:#}");
                ApiError::Internal
            }
        }
    }
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::Validation(v) => v.into(),
            UseCaseError::Repo(r) => r.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Unanticipated failures surface as a generic "error" envelope;
        // everything the client can act on is a "fail".
        let envelope = if status.is_server_error() { "error" } else { "fail" };
        HttpResponse::build(status).json(json!({
            "status": envelope,
            "message": self.to_string(),
        }))
    }
}

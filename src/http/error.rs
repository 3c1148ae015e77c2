use rouille::Response;

use crate::{domain::tracklist::ValidateError, storage::error::StoreError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MixtapeNotFound(id) => {
                ApiError::NotFound(format!("mixtape {} not found", id))
            }

            StoreError::InvalidMixtapeId => ApiError::BadRequest("invalid mixtape id".into()),

            StoreError::Database(_) | StoreError::BadDoc { .. } | StoreError::Internal(_) => {
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl From<ValidateError> for ApiError {
    fn from(err: ValidateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    pub fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) =>
                Response::text(msg).with_status_code(404),

            ApiError::BadRequest(msg) =>
                Response::text(msg).with_status_code(400),

            ApiError::Internal(msg) =>
                Response::text(msg).with_status_code(500),
        }
    }
}

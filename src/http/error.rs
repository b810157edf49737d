use rouille::Response;
use serde::Serialize;

use crate::storage::error::StorageError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidReference(_)
            | StorageError::BlockOutOfRange { .. }
            | StorageError::TooManyBlocks { .. } => ApiError::BadRequest(err.to_string()),

            StorageError::Database(_)
            | StorageError::Serde(_)
            | StorageError::Corrupt { .. }
            | StorageError::Fs(_) => {
                log::error!("storage failure: {err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        let msg = match &self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        };
        Response::json(&ErrorBody { error: msg }).with_status_code(status)
    }
}

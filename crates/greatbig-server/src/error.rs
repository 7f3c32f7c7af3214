use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use greatbig::services::ServiceError;
use serde::Serialize;
use thiserror::Error;

use crate::headers::failure_alert;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Client error tied to an entity, reported with alert headers
    #[error("{message}")]
    BadRequestAlert {
        message: String,
        entity_name: &'static str,
        error_key: &'static str,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemBody {
    title: String,
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_key: Option<&'static str>,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::IdExists { entity } => ApiError::BadRequestAlert {
                message,
                entity_name: entity,
                error_key: "idexists",
            },
            ServiceError::InvalidSort { entity, .. } => ApiError::BadRequestAlert {
                message,
                entity_name: entity,
                error_key: "invalidsort",
            },
            ServiceError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequestAlert {
                message,
                entity_name,
                error_key,
            } => {
                let body = ProblemBody {
                    title: message,
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    message: format!("error.{}", error_key),
                    entity_name: Some(entity_name),
                    error_key: Some(error_key),
                };
                (
                    StatusCode::BAD_REQUEST,
                    failure_alert(entity_name, error_key),
                    Json(body),
                )
                    .into_response()
            },
            ApiError::MalformedPayload(detail) => {
                let body = ProblemBody {
                    title: detail,
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    message: "error.http.400".to_string(),
                    entity_name: None,
                    error_key: None,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            },
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                let body = ProblemBody {
                    title: "Internal Server Error".to_string(),
                    status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    message: "error.http.500".to_string(),
                    entity_name: None,
                    error_key: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            },
        }
    }
}

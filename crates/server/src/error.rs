//! HTTP error mapping and the response envelope.
//!
//! Every handler returns the same envelope `{"status": <code>, "data":
//! <payload>}`. Service errors map to a fixed status taxonomy: bad input
//! and rejected transitions to 400, missing records to 404, storage and
//! unexpected failures to 500; the originating message is surfaced as-is.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repository::RepositoryError;
use serde::Serialize;
use serde_json::json;
use service::ServiceError;
use tracing::{error, warn};

/// Wrap a payload in the response envelope with a 200 status.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(json!({ "status": 200, "data": data }))).into_response()
}

/// Error half of the handler result type; renders the envelope with the
/// mapped status code and the error message as `data`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Validation(_) | ServiceError::InvalidTransition { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Repo(_) | ServiceError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("request failed: {}", err);
        } else {
            warn!("request rejected: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::from(ServiceError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": self.status.as_u16(), "data": self.message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::OrderStatus;

    #[test]
    fn test_validation_maps_to_400() {
        let err = ApiError::from(ServiceError::Validation("client_id is required".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "client_id is required");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(ServiceError::NotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_transition_maps_to_400_with_message() {
        let err = ApiError::from(ServiceError::InvalidTransition {
            from: OrderStatus::Accepted,
            to: OrderStatus::OnWay,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("accepted"));
        assert!(err.message.contains("on_way"));
    }

    #[test]
    fn test_repo_error_maps_to_500() {
        let err = ApiError::from(ServiceError::Unexpected("boom".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_repo_not_found_passes_through_service_mapping() {
        let err = ApiError::from(RepositoryError::NotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}

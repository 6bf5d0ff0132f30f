use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Serialize,
    tracing::warn,
};

use lcbot_routing::Error as RoutingError;

/// Error returned by webhook and callback handlers.
///
/// Rendered as `{"message": "..."}` with a status the platform can act on:
/// it retries pushes that did not get a 2xx.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid webhook secret")]
    Unauthorized,

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::BadRequest(message.to_string())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Routing(e) => match e {
                RoutingError::UnknownPushType { .. } => StatusCode::BAD_REQUEST,
                RoutingError::AgentNotFound { .. } | RoutingError::LicenseNotFound { .. } => {
                    StatusCode::NOT_FOUND
                },
                RoutingError::DuplicateAgent { .. }
                | RoutingError::DuplicateLicense { .. }
                | RoutingError::InstallCancelled { .. } => StatusCode::CONFLICT,
                RoutingError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RoutingError::PlatformCallFailed(e) if e.is_timeout() => {
                    StatusCode::GATEWAY_TIMEOUT
                },
                RoutingError::PlatformCallFailed(_) => StatusCode::BAD_GATEWAY,
                RoutingError::NoAgentsAvailable
                | RoutingError::AssignmentRaceDetected { .. }
                | RoutingError::NotConfigured { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<lcbot_platform::Error> for ApiError {
    fn from(e: lcbot_platform::Error) -> Self {
        match e {
            lcbot_platform::Error::InvalidPayload { .. } => Self::bad_request(e),
            other => Self::Routing(RoutingError::PlatformCallFailed(other)),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "request failed");
        }
        (status, Json(ErrorResponse { message })).into_response()
    }
}

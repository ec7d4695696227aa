use crate::errors::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

impl Error {
    /// HTTP status a failed request is answered with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::IndexOutOfRange { .. }
            | Self::InvalidQuantity { .. }
            | Self::InvalidPrice { .. }
            | Self::InvalidName
            | Self::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            Self::CapacityExceeded { .. } => StatusCode::CONFLICT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::StoreOutOfBounds { .. } | Self::Config { .. } | Self::Io(_) | Self::EnvVar(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            warn!("Request rejected: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

/// Plain acknowledgement for successful mutations.
pub(crate) const ACK: &str = "OK";

pub(crate) async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 Not Found")
}

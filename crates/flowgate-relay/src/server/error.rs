//! Errors raised at the HTTP boundary, before a connection exists.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::storage::{DatabaseError, LedgerError};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Unknown connection type {0:?}")]
    BadRole(String),

    #[error("Missing {0}")]
    MissingCredential(&'static str),

    #[error("Unknown node secret")]
    UnknownSecret,

    #[error("Invalid admin token: {0}")]
    InvalidToken(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Credential store error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ConnectError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRole(_) | Self::MissingCredential(_) | Self::Malformed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownSecret | Self::InvalidToken(_) => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the log.
        let body = if status.is_server_error() {
            warn!(error = %self, "Request failed on the server side");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}

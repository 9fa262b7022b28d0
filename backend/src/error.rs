use axum::http::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("segment store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Gpx(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

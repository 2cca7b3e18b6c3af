//! Error types for Arrow Flight operations

use qfetch_core::ConnectorError;
use thiserror::Error;

/// Errors that can occur talking to the remote engine over Flight
#[derive(Debug, Error)]
pub enum FlightError {
    /// Malformed endpoint URL
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Credential material was missing or unusable
    #[error("authentication error: {0}")]
    Auth(String),

    /// The server answered with something the client cannot use
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Arrow Flight error
    #[error("Flight error: {0}")]
    FlightDecodeError(#[from] arrow_flight::error::FlightError),

    /// gRPC transport error
    #[error("transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    /// gRPC status error
    #[error("gRPC error: {0}")]
    GrpcError(#[from] tonic::Status),
}

impl From<FlightError> for ConnectorError {
    fn from(err: FlightError) -> Self {
        match err {
            FlightError::Auth(msg) => ConnectorError::Auth(msg),
            FlightError::InvalidEndpoint(msg) => ConnectorError::Connection(msg),
            FlightError::TransportError(e) => ConnectorError::Connection(e.to_string()),
            FlightError::GrpcError(status)
                if status.code() == tonic::Code::Unauthenticated
                    || status.code() == tonic::Code::PermissionDenied =>
            {
                ConnectorError::Auth(status.to_string())
            }
            other => ConnectorError::Execution(other.to_string()),
        }
    }
}

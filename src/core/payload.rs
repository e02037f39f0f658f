//! Request body reading.
use axum::body::Body;
use bytes::Bytes;
use thiserror::Error;

/// Why a request body could not be turned into a payload
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PayloadError {
    /// The body stream failed or exceeded the size limit
    #[error("unable to read request body: {0}")]
    Read(#[source] axum::Error),

    /// The body was read successfully but held no bytes
    #[error("empty payload")]
    Empty,
}

/// Read the whole body, rejecting streams over `limit` bytes and empty bodies.
pub async fn read_payload(body: Body, limit: usize) -> Result<Bytes, PayloadError> {
    let raw = axum::body::to_bytes(body, limit)
        .await
        .map_err(PayloadError::Read)?;

    if raw.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(raw)
}

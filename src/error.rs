//! # Error Types
//!
//! Central error type for the tsmerge library. Data-level problems inside
//! the merger core (late packets, duplicates, full station table) have
//! their own [`FeedError`](crate::merger::FeedError) enum and never
//! escape the ingest path; `TsMergeError` covers everything that does
//! propagate: I/O, malformed wire data and protocol-level failures in
//! the drivers.

use thiserror::Error;

/// Primary error type for the tsmerge library
#[derive(Error, Debug)]
pub enum TsMergeError {
    /// I/O errors from socket or file operations
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed input data (TS packets, ingest records)
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Protocol-level failures in the network drivers
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A specialized Result type for tsmerge operations.
pub type Result<T> = std::result::Result<T, TsMergeError>;

// StreamSync - Offline Video Downloads for Mobile
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Error types for StreamSync
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by where they originate: the download engine boundary,
//! local persistence, configuration, and general failures.
//!
//! ## Engine boundary
//! - Registration or initial fetch failure → `InitializationFailed`
//! - start/pause/resume/cancel/delete failure → `OperationFailed`
//! - Delete of an unknown asset → `AssetNotFound` (benign, never shown to users)
//!
//! ## Persistence
//! - SQLite driver failures → `SqlxError` (via `#[from]`)
//! - Schema setup failures → `MigrationFailed`
//! - Corrupt or unreadable cache entries → `StorageError`

use thiserror::Error;

/// Result type alias using our StreamSyncError type
pub type Result<T> = std::result::Result<T, StreamSyncError>;

/// Main error type for StreamSync
#[derive(Error, Debug)]
pub enum StreamSyncError {
    // ===== Engine Errors =====

    /// Engine registration or the initial status/asset fetch failed.
    /// The reconciler stays not-ready; retrying is left to the caller.
    #[error("Initialization failed during {stage}: {message}")]
    InitializationFailed {
        /// Which step failed ("register", "list_statuses", "list_assets")
        stage: String,
        message: String,
    },

    /// A start/pause/resume/cancel/delete call to the engine failed
    #[error("Operation '{operation}' failed: {message}")]
    OperationFailed {
        operation: String,
        message: String,
    },

    /// Asset id is unknown to the engine or to the local asset list
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Engine rejected the API key
    #[error("Engine authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Engine is not reachable or not registered yet
    #[error("Download engine unavailable: {0}")]
    EngineUnavailable(String),

    // ===== Storage Errors =====

    /// Generic persistence failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Database schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    // ===== Validation / Configuration Errors =====

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reconciler state does not allow the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration is invalid or incomplete
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ===== General Errors =====

    /// Operation timed out
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Database driver error from sqlx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl StreamSyncError {
    /// Create an AssetNotFound error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        StreamSyncError::AssetNotFound(id.into())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        StreamSyncError::InvalidInput(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        StreamSyncError::InternalError(message.into())
    }

    /// Create an InitializationFailed error for the given stage
    pub fn init_failed<S: Into<String>, M: std::fmt::Display>(stage: S, cause: M) -> Self {
        StreamSyncError::InitializationFailed {
            stage: stage.into(),
            message: cause.to_string(),
        }
    }

    /// Create an OperationFailed error for the given engine call
    pub fn operation_failed<S: Into<String>, M: std::fmt::Display>(operation: S, cause: M) -> Self {
        StreamSyncError::OperationFailed {
            operation: operation.into(),
            message: cause.to_string(),
        }
    }

    /// Check if error is retryable by re-issuing the same call
    ///
    /// The core never retries on its own; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamSyncError::InitializationFailed { .. }
                | StreamSyncError::OperationFailed { .. }
                | StreamSyncError::EngineUnavailable(_)
                | StreamSyncError::Timeout(_)
        )
    }

    /// Errors that are swallowed at the reconciler boundary and never shown
    pub fn is_benign(&self) -> bool {
        matches!(self, StreamSyncError::AssetNotFound(_))
    }

    /// Check if error is related to local persistence
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            StreamSyncError::StorageError(_)
                | StreamSyncError::MigrationFailed(_)
                | StreamSyncError::SqlxError(_)
                | StreamSyncError::IoError(_)
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            StreamSyncError::InitializationFailed { .. } => {
                "Downloads are unavailable right now. Please try again later.".to_string()
            }
            StreamSyncError::AuthenticationFailed(_) => {
                "The download service rejected the API key. Please check your configuration.".to_string()
            }
            StreamSyncError::OperationFailed { operation, .. } => {
                format!("Could not {} right now. Please try again.", operation.replace('_', " "))
            }
            StreamSyncError::EngineUnavailable(_) => {
                "The download service is not ready yet.".to_string()
            }
            // Never surfaced, but keep a neutral message for completeness
            StreamSyncError::AssetNotFound(_) => "Nothing to delete.".to_string(),
            _ => self.to_string(),
        }
    }
}

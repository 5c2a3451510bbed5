//! Typed error hierarchy for the autopilot pipeline.
//!
//! One enum per subsystem:
//! - `BackendError`: generation, speech and brainstorm calls
//! - `DecodeError`: narration audio payloads
//! - `StorageError`: the persisted key/value capability
//! - `ArchiveError`: bundle packaging
//! - `PlaybackError`: audio output
//! - `OrchestratorError`: unit and batch scheduling

use thiserror::Error;

/// Errors from the generative backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No API key found in environment variable {var}")]
    MissingApiKey { var: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend rate limit exceeded")]
    RateLimited,

    #[error("Backend rejected credentials: {0}")]
    Auth(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend call timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Errors from decoding a narration audio payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid PCM format: {sample_rate} Hz, {channels} channel(s)")]
    InvalidFormat { sample_rate: u32, channels: u16 },

    #[error("Audio payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Errors from the key/value persistence capability.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access storage file at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize stored value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored value under '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Errors from building a project bundle.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Units {first} and {second} both resolve to '{path}'")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("Zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write bundle: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the audio output device.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Audio output unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Playback task failed: {0}")]
    TaskFailed(String),
}

/// Errors from the task orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("A build-all batch is already in progress")]
    BatchInProgress,

    #[error("Unit {key} is not part of the checklist")]
    UnknownUnit { key: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to persist artifact: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_api_carries_status() {
        let err = BackendError::Api {
            status: 503,
            body: "overloaded".to_string(),
        };
        match &err {
            BackendError::Api { status, body } => {
                assert_eq!(*status, 503);
                assert_eq!(body, "overloaded");
            }
            _ => panic!("Expected Api variant"),
        }
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn decode_error_converts_from_base64_error() {
        use base64::Engine;
        let b64_err = base64::engine::general_purpose::STANDARD
            .decode("@@@")
            .unwrap_err();
        let err: DecodeError = b64_err.into();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn storage_error_io_carries_path() {
        let path = std::path::PathBuf::from("/tmp/storage.json");
        let err = StorageError::Io {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        match &err {
            StorageError::Io { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn archive_collision_names_both_units() {
        let err = ArchiveError::PathCollision {
            path: "api/x.ts".to_string(),
            first: "1-0".to_string(),
            second: "2-1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1-0"));
        assert!(msg.contains("2-1"));
        assert!(msg.contains("api/x.ts"));
    }

    #[test]
    fn orchestrator_error_converts_from_storage_error() {
        let inner = StorageError::LockPoisoned;
        let err: OrchestratorError = inner.into();
        assert!(matches!(
            err,
            OrchestratorError::Storage(StorageError::LockPoisoned)
        ));
    }

    #[test]
    fn orchestrator_error_converts_from_backend_error() {
        let err: OrchestratorError = BackendError::Timeout { secs: 5 }.into();
        assert!(matches!(err, OrchestratorError::Backend(BackendError::Timeout { secs: 5 })));
        assert_eq!(err.to_string(), BackendError::Timeout { secs: 5 }.to_string());
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BackendError::RateLimited);
        assert_std_error(&DecodeError::InvalidFormat {
            sample_rate: 0,
            channels: 1,
        });
        assert_std_error(&StorageError::LockPoisoned);
        assert_std_error(&PlaybackError::TaskFailed("x".into()));
        assert_std_error(&OrchestratorError::BatchInProgress);
    }
}

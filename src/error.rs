//! Error types for the play runtime.
//!
//! Per-frame operations never surface errors to the frame driver: failures
//! inside a script, callback or property write are logged and the frame
//! continues. The types here describe those failures so that they can be
//! logged consistently, and cover the setup paths (Lua initialization,
//! configuration, scene loading) that do return `Result`.

use thiserror::Error;

/// Failure raised inside one script invocation boundary.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The Lua evaluator reported an error (syntax or runtime).
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),
    /// A callback implemented in Rust reported a failure.
    #[error("{0}")]
    Callback(String),
    /// A property write requested by a script was rejected.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl ScriptError {
    /// Convenience constructor for Rust-side callback failures.
    pub fn callback(msg: impl Into<String>) -> Self {
        ScriptError::Callback(msg.into())
    }
}

/// Errors produced while resolving or writing a dotted property path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropertyError {
    #[error("invalid property path '{0}'")]
    InvalidPath(String),
    #[error("property '{path}' expects a {expected} value")]
    TypeMismatch { path: String, expected: &'static str },
    #[error("target object '{0}' no longer exists")]
    MissingTarget(String),
}

/// Setup-time errors returned by the engine, play session and CLI.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("lua initialization failed: {0}")]
    Lua(#[from] mlua::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scene description: {0}")]
    Scene(#[from] serde_json::Error),
    #[error("play session already active")]
    AlreadyPlaying,
    #[error("play session is not active")]
    NotPlaying,
}

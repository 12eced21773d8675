use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostInitError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid action identity '{0}': must be lowercase alphanumeric with '-' or '_'")]
    InvalidActionId(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action registered twice: {0}")]
    DuplicateAction(String),

    #[error("invalid requirements for action '{action}': {reason}")]
    InvalidRequirements { action: String, reason: String },

    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    #[error("context key already published: {0}")]
    ContextKeyExists(&'static str),

    #[error("status db error: {0}")]
    StatusDb(String),

    #[error("no metadata service could be loaded")]
    NoMetadataService,

    #[error("metadata not found: {0}")]
    MetadataNotFound(String),

    #[error("metadata service error: {0}")]
    Metadata(String),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("no network adapter available")]
    NoNetworkAdapter,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, HostInitError>;

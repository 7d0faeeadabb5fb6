use thiserror::Error;

/// Error kinds surfaced by the core data model and codec (§7).
#[derive(Error, Debug)]
pub enum FraudError {
    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encode error: {0}")]
    EncodeError(String),

    #[error("state store timeout on key {key}: {detail}")]
    StateStoreTimeout { key: String, detail: String },

    #[error("feature group error in {group}: {detail}")]
    FeatureGroupError { group: String, detail: String },

    #[error("velocity write failure for user {user_id}, window {window}: {detail}")]
    VelocityWriteFailure {
        user_id: String,
        window: String,
        detail: String,
    },

    #[error("aggregator dropped late event for key {key}: {detail}")]
    AggregatorLateEvent { key: String, detail: String },

    #[error("sink write failure on {sink}: {detail}")]
    SinkWriteFailure { sink: String, detail: String },

    #[error("invalid configuration for key '{key}': {detail}")]
    ConfigInvalid { key: String, detail: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FraudError>;

use thiserror::Error;

/// Startup-time error surface for the pipeline binary. Per-record faults
/// never reach here — those are handled inline (decode placeholders, miss
/// synthesis, timeout defaults) per `fraud_core::FraudError`'s §7 table.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("metrics server failed to bind: {0}")]
    MetricsServer(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] fraud_core::FraudError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod profile_cache;
pub mod record_stream;
pub mod state_store;
pub mod stream_joiner;
pub mod velocity_updater;
pub mod windowed_aggregator;

pub use error::{PipelineError, Result};
pub use metrics::PipelineMetrics;
pub use orchestrator::{AlertRateLimiter, PipelineOrchestrator};
pub use profile_cache::ProfileCache;
pub use record_stream::{ChannelSink, ChannelSource, RecordSink, RecordSinkError, RecordSource};
pub use state_store::{InMemoryStateStore, StateStore};
pub use stream_joiner::{HistoricalPattern, MerchantUpdateEvent, StreamJoiner, UserBehaviorEvent};
pub use velocity_updater::VelocityUpdater;
pub use windowed_aggregator::{AggInput, WindowedAggregator};

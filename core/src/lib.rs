pub mod aggregates;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod feature;
pub mod profile;
pub mod transaction;
pub mod types;
pub mod velocity;

pub use aggregates::{
    AggregateOutput, AmountClusterAggregate, FraudPatternAggregate, GeographicAggregate,
    HighFrequencyAlert, MerchantAggregate, UserSessionAggregate, UserVelocityAggregate,
};
pub use codec::{decode, encode_enriched, encode_feature_record, error_placeholder, Decoded};
pub use config::PipelineConfig;
pub use error::{FraudError, Result};
pub use feature::{EntityType, FeatureMap, FeatureRecord, FeatureStats, FeatureType, FeatureValue};
pub use profile::{MerchantProfile, MerchantRiskLevel, UserProfile};
pub use transaction::{EnrichedTransaction, GeoPoint, Transaction};
pub use types::{Decision, FraudScore, RiskLevel, ScoredOutcome};
pub use velocity::{
    RecentTransactionEntry, VelocityCounter, VelocityWindow, MERCHANT_RECENT_CAPACITY,
    USER_RECENT_CAPACITY,
};

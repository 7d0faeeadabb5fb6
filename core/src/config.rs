//! Pipeline configuration (§6). Parsed from `--key value` command-line pairs
//! into a builder struct with `with_*` setters and a single `validate()` that
//! names the offending key on failure, per the teacher's `ModelConfig`
//! builder idiom.

use std::path::PathBuf;

use crate::error::{FraudError, Result};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub kafka_brokers: Vec<String>,
    pub consumer_group_id: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub parallelism: usize,
    pub checkpoint_interval_ms: u64,
    pub fraud_threshold: f64,
    pub enable_feature_store: bool,
    pub enable_real_time_scoring: bool,
    pub model_path: Option<PathBuf>,
    pub velocity_window_size_ms: u64,
    pub metrics_port: u16,
    pub enable_alerting: bool,
    pub critical_alert_threshold: f64,
    pub high_alert_threshold: f64,
    pub max_alerts_per_minute: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kafka_brokers: Vec::new(),
            consumer_group_id: String::new(),
            redis_host: String::new(),
            redis_port: 6379,
            redis_password: None,
            parallelism: 12,
            checkpoint_interval_ms: 10_000,
            fraud_threshold: 0.7,
            enable_feature_store: true,
            enable_real_time_scoring: true,
            model_path: None,
            velocity_window_size_ms: 5 * 60 * 1000,
            metrics_port: 9100,
            enable_alerting: true,
            critical_alert_threshold: 0.95,
            high_alert_threshold: 0.80,
            max_alerts_per_minute: 60,
        }
    }
}

impl PipelineConfig {
    pub fn with_kafka_brokers(mut self, brokers: Vec<String>) -> Self {
        self.kafka_brokers = brokers;
        self
    }

    pub fn with_consumer_group_id(mut self, group: impl Into<String>) -> Self {
        self.consumer_group_id = group.into();
        self
    }

    pub fn with_redis(mut self, host: impl Into<String>, port: u16, password: Option<String>) -> Self {
        self.redis_host = host.into();
        self.redis_port = port;
        self.redis_password = password;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_checkpoint_interval_ms(mut self, ms: u64) -> Self {
        self.checkpoint_interval_ms = ms;
        self
    }

    pub fn with_fraud_threshold(mut self, threshold: f64) -> Self {
        self.fraud_threshold = threshold;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = port;
        self
    }

    /// Parse from a flat `--key value` argv slice (argv[0] excluded), per §6.
    /// Unrecognized keys are ignored — the table in §6 is the exhaustive set
    /// this core consumes; launchers may pass through other operational flags.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cfg = Self::default();
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut i = 0;
        while i < args.len() {
            let key = args[i].trim_start_matches("--");
            let value = args.get(i + 1).cloned().unwrap_or_default();
            match key {
                "kafka-brokers" => {
                    cfg.kafka_brokers = value.split(',').map(|s| s.trim().to_string()).collect()
                }
                "consumer-group-id" => cfg.consumer_group_id = value.clone(),
                "redis-host" => cfg.redis_host = value.clone(),
                "redis-port" => {
                    cfg.redis_port = value.parse().map_err(|_| FraudError::ConfigInvalid {
                        key: "redis-port".into(),
                        detail: format!("'{}' is not a valid port", value),
                    })?
                }
                "redis-password" => cfg.redis_password = Some(value.clone()),
                "parallelism" => {
                    cfg.parallelism = value.parse().map_err(|_| FraudError::ConfigInvalid {
                        key: "parallelism".into(),
                        detail: format!("'{}' is not a valid worker count", value),
                    })?
                }
                "checkpoint-interval" => {
                    cfg.checkpoint_interval_ms =
                        value.parse().map_err(|_| FraudError::ConfigInvalid {
                            key: "checkpoint-interval".into(),
                            detail: format!("'{}' is not a valid interval", value),
                        })?
                }
                "fraud-threshold" => {
                    cfg.fraud_threshold = value.parse().map_err(|_| FraudError::ConfigInvalid {
                        key: "fraud-threshold".into(),
                        detail: format!("'{}' is not a valid threshold", value),
                    })?
                }
                "enable-feature-store" => cfg.enable_feature_store = parse_bool(&value),
                "enable-real-time-scoring" => cfg.enable_real_time_scoring = parse_bool(&value),
                "model-path" => cfg.model_path = Some(PathBuf::from(value.clone())),
                "velocity-window-size" => {
                    cfg.velocity_window_size_ms =
                        value.parse().map_err(|_| FraudError::ConfigInvalid {
                            key: "velocity-window-size".into(),
                            detail: format!("'{}' is not a valid duration", value),
                        })?
                }
                "metrics-port" => {
                    cfg.metrics_port = value.parse().map_err(|_| FraudError::ConfigInvalid {
                        key: "metrics-port".into(),
                        detail: format!("'{}' is not a valid port", value),
                    })?
                }
                "enable-alerting" => cfg.enable_alerting = parse_bool(&value),
                "critical-alert-threshold" => {
                    cfg.critical_alert_threshold =
                        value.parse().map_err(|_| FraudError::ConfigInvalid {
                            key: "critical-alert-threshold".into(),
                            detail: format!("'{}' is not a valid threshold", value),
                        })?
                }
                "high-alert-threshold" => {
                    cfg.high_alert_threshold =
                        value.parse().map_err(|_| FraudError::ConfigInvalid {
                            key: "high-alert-threshold".into(),
                            detail: format!("'{}' is not a valid threshold", value),
                        })?
                }
                "max-alerts-per-minute" => {
                    cfg.max_alerts_per_minute =
                        value.parse().map_err(|_| FraudError::ConfigInvalid {
                            key: "max-alerts-per-minute".into(),
                            detail: format!("'{}' is not a valid rate", value),
                        })?
                }
                _ => {}
            }
            i += 2;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Enforce the §6 validation table, naming the offending key on failure.
    pub fn validate(&self) -> Result<()> {
        if self.kafka_brokers.is_empty() {
            return Err(FraudError::ConfigInvalid {
                key: "kafka-brokers".into(),
                detail: "must be non-empty".into(),
            });
        }
        if self.consumer_group_id.is_empty() {
            return Err(FraudError::ConfigInvalid {
                key: "consumer-group-id".into(),
                detail: "must be non-empty".into(),
            });
        }
        if self.redis_host.is_empty() {
            return Err(FraudError::ConfigInvalid {
                key: "redis-host".into(),
                detail: "must be non-empty".into(),
            });
        }
        if self.redis_port == 0 {
            return Err(FraudError::ConfigInvalid {
                key: "redis-port".into(),
                detail: "must be in 1..65535".into(),
            });
        }
        if self.parallelism == 0 {
            return Err(FraudError::ConfigInvalid {
                key: "parallelism".into(),
                detail: "must be greater than 0".into(),
            });
        }
        if self.checkpoint_interval_ms == 0 {
            return Err(FraudError::ConfigInvalid {
                key: "checkpoint-interval".into(),
                detail: "must be greater than 0".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.fraud_threshold) {
            return Err(FraudError::ConfigInvalid {
                key: "fraud-threshold".into(),
                detail: "must be in [0,1]".into(),
            });
        }
        if self.metrics_port == 0 {
            return Err(FraudError::ConfigInvalid {
                key: "metrics-port".into(),
                detail: "must be in 1..65535".into(),
            });
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

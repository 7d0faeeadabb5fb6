use serde::{Deserialize, Serialize};

/// Fraud score for a single transaction, always held clamped to [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FraudScore(pub f64);

impl FraudScore {
    pub fn new(score: f64) -> Self {
        Self(score.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for FraudScore {
    fn default() -> Self {
        Self(0.0)
    }
}

/// Discrete risk label derived from `fraud_score` (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    VeryLow,
    Error,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
            RiskLevel::VeryLow => "VERY_LOW",
            RiskLevel::Error => "ERROR",
        }
    }
}

/// Action dictated by the scorer (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Approve,
    Review,
    Decline,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::Review => "REVIEW",
            Decision::Decline => "DECLINE",
        }
    }
}

/// Outcome of scoring: decision plus risk level, always produced together
/// (§4.5's decision mapping never yields one without the other).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredOutcome {
    pub fraud_score: FraudScore,
    pub decision: Decision,
    pub risk_level: RiskLevel,
}

impl ScoredOutcome {
    /// Map a clamped score to (decision, risk_level) using the default §4.5 thresholds.
    pub fn from_score(score: f64) -> Self {
        Self::from_score_with_thresholds(score, 0.95, 0.80, 0.60, 0.30)
    }

    /// Map a clamped score to (decision, risk_level) against caller-supplied
    /// thresholds, so a `ScoringConfig` can move the §4.5 boundaries without
    /// this type knowing about the scoring engine.
    pub fn from_score_with_thresholds(
        score: f64,
        threshold_decline: f64,
        threshold_review_high: f64,
        threshold_review_medium: f64,
        threshold_approve_low: f64,
    ) -> Self {
        let fraud_score = FraudScore::new(score);
        let v = fraud_score.value();
        let (decision, risk_level) = if v >= threshold_decline {
            (Decision::Decline, RiskLevel::Critical)
        } else if v >= threshold_review_high {
            (Decision::Review, RiskLevel::High)
        } else if v >= threshold_review_medium {
            (Decision::Review, RiskLevel::Medium)
        } else if v >= threshold_approve_low {
            (Decision::Approve, RiskLevel::Low)
        } else {
            (Decision::Approve, RiskLevel::VeryLow)
        };
        Self {
            fraud_score,
            decision,
            risk_level,
        }
    }

    /// The blacklist hard override (§4.5): unconditional DECLINE/CRITICAL.
    pub fn blacklisted(score: f64) -> Self {
        Self {
            fraud_score: FraudScore::new(score),
            decision: Decision::Decline,
            risk_level: RiskLevel::Critical,
        }
    }

    /// The decode-failure placeholder outcome (§4.1, §7).
    pub fn error_placeholder() -> Self {
        Self {
            fraud_score: FraudScore::new(0.5),
            decision: Decision::Review,
            risk_level: RiskLevel::Error,
        }
    }
}

// src/forensics/models/mod.rs
//!
//! Core data model for the attack-aggregation pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points granted when a success-after-failure authentication chain is found.
pub const SEQUENCE_RISK_POINTS: f64 = 50.0;
/// Points granted when a known-malicious payload fragment is found.
pub const PAYLOAD_RISK_POINTS: f64 = 30.0;
/// Points granted when a known offensive tool signature is found.
pub const TOOL_RISK_POINTS: f64 = 20.0;

/// Capture surface a record was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Protocol {
    #[serde(rename = "http")]
    #[default]
    Http,
    #[serde(rename = "ssh")]
    Ssh,
}

/// One observed request/event, as produced by the ingestion layer.
///
/// Records are immutable once captured; the pipeline reads them and never
/// writes them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(default = "generate_record_id")]
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source_address: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub url: String,
    /// Raw request body. Arbitrary JSON; only plain-string bodies are
    /// inspected by the payload analyzer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status_code: Option<u16>,
    /// Per-event suspicion score, pre-computed at capture time.
    #[serde(default)]
    pub severity_score: i64,
    /// Suspicion tags, either bare (`sql_injection`) or prefixed
    /// (`SUSPICIOUS_PATTERN:union select`).
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Fresh record identifier, also used when imported records carry none.
pub(crate) fn generate_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl RequestRecord {
    pub fn new(source_address: &str, url: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: generate_record_id(),
            timestamp,
            source_address: source_address.to_string(),
            protocol: Protocol::Http,
            url: url.to_string(),
            body: None,
            user_agent: None,
            response_status_code: None,
            severity_score: 0,
            indicators: Vec::new(),
        }
    }
}

/// Category of rate-limit violation recorded by the limiter subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitType {
    #[serde(rename = "ddos-protection")]
    DdosProtection,
    #[serde(rename = "critical-endpoints")]
    CriticalEndpoints,
    #[serde(rename = "trap-endpoints")]
    TrapEndpoints,
    #[serde(rename = "application")]
    Application,
}

/// A block/violation event emitted by the request-rate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitEvent {
    pub source_address: String,
    pub timestamp: DateTime<Utc>,
    pub limit_type: LimitType,
}

/// Qualitative label for a request rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RpsStyle {
    #[serde(rename = "sporadic")]
    #[default]
    Sporadic,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "extreme")]
    Extreme,
}

impl RpsStyle {
    /// First-match-wins over ascending rate bands.
    pub fn from_rps(rps: f64) -> Self {
        if rps < 0.1 {
            RpsStyle::Sporadic
        } else if rps < 1.0 {
            RpsStyle::Low
        } else if rps < 10.0 {
            RpsStyle::Moderate
        } else if rps < 50.0 {
            RpsStyle::High
        } else {
            RpsStyle::Extreme
        }
    }
}

/// Descriptive label combining duration and request rate.
///
/// The branches overlap; classification is ordered, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IntensityLabel {
    #[serde(rename = "flash burst")]
    FlashBurst,
    #[serde(rename = "low persistent")]
    LowPersistent,
    #[serde(rename = "medium persistent")]
    MediumPersistent,
    #[serde(rename = "prolonged burst")]
    ProlongedBurst,
    #[serde(rename = "low micro-scan")]
    LowMicroScan,
    #[serde(rename = "moderate micro-scan")]
    ModerateMicroScan,
    #[serde(rename = "intense micro-scan")]
    IntenseMicroScan,
    #[serde(rename = "extreme")]
    Extreme,
    #[serde(rename = "high persistent")]
    HighPersistent,
    #[serde(rename = "low impact")]
    LowImpact,
    #[serde(rename = "other")]
    #[default]
    Other,
}

impl IntensityLabel {
    pub fn classify(duration_minutes: f64, rps: f64) -> Self {
        // Ordered branch table. Reordering changes results for inputs that
        // satisfy more than one predicate.
        if duration_minutes < 5.0 && rps >= 10.0 {
            IntensityLabel::FlashBurst
        } else if duration_minutes >= 5.0 && rps < 1.0 {
            IntensityLabel::LowPersistent
        } else if duration_minutes >= 2.0 && (1.0..5.0).contains(&rps) {
            IntensityLabel::MediumPersistent
        } else if duration_minutes >= 1.5 && rps >= 9.0 {
            IntensityLabel::ProlongedBurst
        } else if rps < 2.0 && duration_minutes < 1.0 {
            IntensityLabel::LowMicroScan
        } else if rps < 5.0 && duration_minutes < 1.0 {
            IntensityLabel::ModerateMicroScan
        } else if rps >= 5.0 && duration_minutes < 1.0 {
            IntensityLabel::IntenseMicroScan
        } else if rps >= 50.0 {
            IntensityLabel::Extreme
        } else if duration_minutes >= 60.0 && rps >= 5.0 {
            IntensityLabel::HighPersistent
        } else if rps < 1.0 {
            IntensityLabel::LowImpact
        } else {
            IntensityLabel::Other
        }
    }
}

impl std::fmt::Display for IntensityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IntensityLabel::FlashBurst => "flash burst",
            IntensityLabel::LowPersistent => "low persistent",
            IntensityLabel::MediumPersistent => "medium persistent",
            IntensityLabel::ProlongedBurst => "prolonged burst",
            IntensityLabel::LowMicroScan => "low micro-scan",
            IntensityLabel::ModerateMicroScan => "moderate micro-scan",
            IntensityLabel::IntenseMicroScan => "intense micro-scan",
            IntensityLabel::Extreme => "extreme",
            IntensityLabel::HighPersistent => "high persistent",
            IntensityLabel::LowImpact => "low impact",
            IntensityLabel::Other => "other",
        };
        f.write_str(label)
    }
}

/// Severity tier mapped from the composite danger score.
///
/// `Defcon1` is the highest level of concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DangerLevel {
    #[serde(rename = "Defcon 1")]
    Defcon1,
    #[serde(rename = "Defcon 2")]
    Defcon2,
    #[serde(rename = "Defcon 3")]
    Defcon3,
    #[serde(rename = "Defcon 4")]
    Defcon4,
    #[serde(rename = "Defcon 5")]
    #[default]
    Defcon5,
}

impl std::fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DangerLevel::Defcon1 => "Defcon 1",
            DangerLevel::Defcon2 => "Defcon 2",
            DangerLevel::Defcon3 => "Defcon 3",
            DangerLevel::Defcon4 => "Defcon 4",
            DangerLevel::Defcon5 => "Defcon 5",
        };
        f.write_str(label)
    }
}

/// Per-source-address aggregate under evaluation.
///
/// Built fresh for every query: the grouping stage creates it, each later
/// stage fills in its own fields. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAttack {
    // Identity
    pub source_address: String,
    /// Member records in store order; not guaranteed chronological.
    pub member_records: Vec<RequestRecord>,

    // Grouping
    pub total_logs: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sum_score: i64,
    pub rate_limit_events: Vec<RateLimitEvent>,
    pub rate_limit_count: usize,

    // Stats
    pub duration_ms: i64,
    pub duration_minutes: f64,
    pub human_duration: String,
    pub average_score: f64,
    pub requests_per_second: f64,
    /// De-prefixed, lower-cased indicator tags, sorted and deduplicated.
    pub attack_patterns: Vec<String>,
    pub unique_technique_count: usize,
    pub unique_technique_norm: f64,

    // Behavioral
    pub brute_force_success_detected: bool,
    pub sequence_risk_score: f64,
    pub high_risk_payload_matches: Vec<String>,
    pub payload_risk_score: f64,
    /// Distinct client signatures, sorted. Absent user agents count as
    /// the sentinel `"unknown"`.
    pub distinct_user_agents: Vec<String>,
    pub user_agent_count: usize,
    pub tool_signature_detected: bool,
    pub tool_risk_score: f64,

    // Scoring
    pub rps_style: RpsStyle,
    pub intensity_label: IntensityLabel,
    pub rps_norm: f64,
    pub duration_norm: f64,
    pub duration_decay: f64,
    pub duration_norm_penalized: f64,
    pub score_norm: f64,
    pub danger_score: f64,
    pub danger_level: DangerLevel,
}

impl CandidateAttack {
    /// A fresh aggregate carrying only the grouping-stage identity fields.
    pub fn from_group(
        source_address: String,
        member_records: Vec<RequestRecord>,
        first_seen: DateTime<Utc>,
        last_seen: DateTime<Utc>,
        sum_score: i64,
    ) -> Self {
        let total_logs = member_records.len();
        Self {
            source_address,
            member_records,
            total_logs,
            first_seen,
            last_seen,
            sum_score,
            rate_limit_events: Vec::new(),
            rate_limit_count: 0,
            duration_ms: 0,
            duration_minutes: 0.0,
            human_duration: String::new(),
            average_score: 0.0,
            requests_per_second: 0.0,
            attack_patterns: Vec::new(),
            unique_technique_count: 0,
            unique_technique_norm: 0.0,
            brute_force_success_detected: false,
            sequence_risk_score: 0.0,
            high_risk_payload_matches: Vec::new(),
            payload_risk_score: 0.0,
            distinct_user_agents: Vec::new(),
            user_agent_count: 0,
            tool_signature_detected: false,
            tool_risk_score: 0.0,
            rps_style: RpsStyle::default(),
            intensity_label: IntensityLabel::default(),
            rps_norm: 0.0,
            duration_norm: 0.0,
            duration_decay: 0.0,
            duration_norm_penalized: 0.0,
            score_norm: 0.0,
            danger_score: 0.0,
            danger_level: DangerLevel::default(),
        }
    }
}

/// Result of a full pipeline invocation.
///
/// `total_count` is the size of the qualifying set before any pagination
/// the caller applies above the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackQueryResult {
    pub items: Vec<CandidateAttack>,
    pub total_count: usize,
}

/// Round to `digits` decimal places, half away from zero.
pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rps_style_bands() {
        assert_eq!(RpsStyle::from_rps(0.05), RpsStyle::Sporadic);
        assert_eq!(RpsStyle::from_rps(0.5), RpsStyle::Low);
        assert_eq!(RpsStyle::from_rps(9.99), RpsStyle::Moderate);
        assert_eq!(RpsStyle::from_rps(10.0), RpsStyle::High);
        assert_eq!(RpsStyle::from_rps(50.0), RpsStyle::Extreme);
    }

    #[test]
    fn test_intensity_order_is_first_match_wins() {
        // duration < 5 min with rps >= 10 satisfies both the flash-burst and
        // the prolonged-burst predicates; the earlier branch must win.
        assert_eq!(
            IntensityLabel::classify(2.0, 12.0),
            IntensityLabel::FlashBurst
        );
        // past the 5-minute mark the prolonged-burst branch takes over
        assert_eq!(
            IntensityLabel::classify(6.0, 12.0),
            IntensityLabel::ProlongedBurst
        );
        assert_eq!(
            IntensityLabel::classify(10.0, 0.5),
            IntensityLabel::LowPersistent
        );
        assert_eq!(
            IntensityLabel::classify(0.5, 1.0),
            IntensityLabel::LowMicroScan
        );
        assert_eq!(
            IntensityLabel::classify(0.5, 3.0),
            IntensityLabel::ModerateMicroScan
        );
        assert_eq!(
            IntensityLabel::classify(0.5, 7.0),
            IntensityLabel::IntenseMicroScan
        );
        assert_eq!(
            IntensityLabel::classify(90.0, 6.0),
            IntensityLabel::HighPersistent
        );
        assert_eq!(IntensityLabel::classify(3.0, 0.9), IntensityLabel::LowImpact);
        assert_eq!(IntensityLabel::classify(1.2, 6.0), IntensityLabel::Other);
    }

    #[test]
    fn test_danger_level_serializes_to_human_label() {
        let json = serde_json::to_string(&DangerLevel::Defcon3).unwrap();
        assert_eq!(json, "\"Defcon 3\"");
        assert_eq!(DangerLevel::Defcon1.to_string(), "Defcon 1");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(81.22477, 2), 81.22);
        assert_eq!(round_to(0.054999, 5), 0.055);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}

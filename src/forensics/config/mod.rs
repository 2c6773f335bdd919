// src/forensics/config/mod.rs
//!
//! Scoring configuration: weights, tolerances, severity thresholds and
//! pattern lists.
//!
//! Every knob has a built-in default. Values sourced from the configuration
//! collaborator are parsed as JSON first, then as a `KEY:value,KEY:value`
//! fallback; anything absent or malformed degrades to the default and is
//! logged, never propagated. The loaded value is passed into the pipeline by
//! value — there is no ambient global configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrapwireError};
use crate::forensics::models::DangerLevel;
use crate::forensics::storage::ConfigStore;

/// Store key holding the danger-weight map.
pub const DANGER_WEIGHTS_KEY: &str = "DANGER_WEIGHTS";
/// Store key holding the tolerance map.
pub const TOLERANCE_WEIGHTS_KEY: &str = "TOLERANCE_WEIGHTS";
/// Store key holding the severity-tier threshold table.
pub const SEVERITY_THRESHOLDS_KEY: &str = "SEVERITY_THRESHOLDS";
/// Store key holding the suspicious-payload pattern list.
pub const SUSPICIOUS_PATTERNS_KEY: &str = "SUSPICIOUS_PATTERNS";
/// Store key holding the offensive-tool signature list.
pub const TOOL_SIGNATURES_KEY: &str = "TOOL_SIGNATURES";

/// Weights applied to the normalized terms of the composite danger score.
///
/// The four base terms sum to 1.0; the three behavioral terms are additive
/// on top, and the composite is clamped to 100 before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerWeights {
    pub rps: f64,
    pub duration: f64,
    pub score: f64,
    /// Technique-diversity weight. Resolved from its own key; one upstream
    /// code path reused the duration key here, which is not preserved.
    pub technique: f64,
    pub sequence: f64,
    pub payload: f64,
    pub tool: f64,
}

impl Default for DangerWeights {
    fn default() -> Self {
        Self {
            rps: 0.18,
            duration: 0.12,
            score: 0.50,
            technique: 0.20,
            sequence: 0.15,
            payload: 0.10,
            tool: 0.05,
        }
    }
}

impl DangerWeights {
    fn apply_map(&mut self, map: &HashMap<String, f64>) {
        if let Some(v) = map.get("RPSNORM") {
            self.rps = *v;
        }
        if let Some(v) = map.get("DURNORM") {
            self.duration = *v;
        }
        if let Some(v) = map.get("SCORENORM") {
            self.score = *v;
        }
        if let Some(v) = map.get("UNIQUETECHNORM") {
            self.technique = *v;
        }
        if let Some(v) = map.get("SEQNORM") {
            self.sequence = *v;
        }
        if let Some(v) = map.get("PAYLOADNORM") {
            self.payload = *v;
        }
        if let Some(v) = map.get("TOOLNORM") {
            self.tool = *v;
        }
    }
}

/// Normalization denominators/caps for the raw metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Requests-per-second cap.
    pub rps: f64,
    /// Duration tolerance in minutes; log-scaled so long attacks saturate.
    pub duration: f64,
    /// Average-severity cap.
    pub score: f64,
    /// Exponential-decay constant, minutes.
    pub decay: f64,
    /// Technique-diversity cap.
    pub unique_techniques: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            rps: 10.0,
            duration: 361.0,
            score: 40.0,
            decay: 240.0,
            unique_techniques: 6.0,
        }
    }
}

impl ToleranceConfig {
    fn apply_map(&mut self, map: &HashMap<String, f64>) {
        if let Some(v) = map.get("RPSTOL") {
            self.rps = *v;
        }
        if let Some(v) = map.get("DURTOL") {
            self.duration = *v;
        }
        if let Some(v) = map.get("SCORETOL") {
            self.score = *v;
        }
        if let Some(v) = map.get("DURDECAYTOL") {
            self.decay = *v;
        }
        if let Some(v) = map.get("UNQTECHTOL") {
            self.unique_techniques = *v;
        }
    }
}

/// Ascending threshold table mapping a danger score to a severity tier.
///
/// Classification uses `<=` semantics: a score exactly on a boundary falls
/// into the less severe tier. Scores above the last threshold land in the
/// most severe tier.
///
/// Two incompatible tables exist in the wild for the same 5-tier scale;
/// both are available here and the choice is a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds(pub [f64; 4]);

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self([20.0, 40.0, 65.0, 80.0])
    }
}

impl SeverityThresholds {
    /// The older table still present in legacy deployments.
    pub fn legacy() -> Self {
        Self([15.0, 30.0, 60.0, 85.0])
    }

    pub fn classify(&self, danger_score: f64) -> DangerLevel {
        let [t5, t4, t3, t2] = self.0;
        if danger_score <= t5 {
            DangerLevel::Defcon5
        } else if danger_score <= t4 {
            DangerLevel::Defcon4
        } else if danger_score <= t3 {
            DangerLevel::Defcon3
        } else if danger_score <= t2 {
            DangerLevel::Defcon2
        } else {
            DangerLevel::Defcon1
        }
    }
}

/// Payload fragments flagged when found in a request URL or string body.
/// Entries are regex fragments joined into one case-insensitive alternation.
pub fn default_suspicious_patterns() -> Vec<String> {
    [
        "/etc/passwd",
        "/bin/sh",
        "cmd\\.exe",
        "whoami",
        "wget ",
        "curl ",
        "chmod ",
        "eval\\(",
        "union select",
        "alert\\(",
        "\\.\\./",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Client-signature fragments of known scanning/exploitation tooling.
pub fn default_tool_signatures() -> Vec<String> {
    [
        "curl", "wget", "python", "masscan", "zgrab", "nmap", "sqlmap", "nikto", "gobuster",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Complete scoring configuration for one pipeline construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForensicConfig {
    pub weights: DangerWeights,
    pub tolerances: ToleranceConfig,
    pub severity_thresholds: SeverityThresholds,
    pub suspicious_patterns: Vec<String>,
    pub tool_signatures: Vec<String>,
}

impl Default for ForensicConfig {
    fn default() -> Self {
        Self {
            weights: DangerWeights::default(),
            tolerances: ToleranceConfig::default(),
            severity_thresholds: SeverityThresholds::default(),
            suspicious_patterns: default_suspicious_patterns(),
            tool_signatures: default_tool_signatures(),
        }
    }
}

impl ForensicConfig {
    /// Load configuration from the config collaborator.
    ///
    /// A failing fetch is propagated; absent or malformed values fall back
    /// to the built-in defaults.
    pub async fn load(store: &dyn ConfigStore) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = store.get_value(DANGER_WEIGHTS_KEY).await? {
            match parse_numeric_map(&raw) {
                Some(map) => config.weights.apply_map(&map),
                None => log::warn!(
                    "malformed {} value {:?}, using default weights",
                    DANGER_WEIGHTS_KEY,
                    raw
                ),
            }
        }
        if let Some(raw) = store.get_value(TOLERANCE_WEIGHTS_KEY).await? {
            match parse_numeric_map(&raw) {
                Some(map) => config.tolerances.apply_map(&map),
                None => log::warn!(
                    "malformed {} value {:?}, using default tolerances",
                    TOLERANCE_WEIGHTS_KEY,
                    raw
                ),
            }
        }
        if let Some(raw) = store.get_value(SEVERITY_THRESHOLDS_KEY).await? {
            match parse_thresholds(&raw) {
                Some(thresholds) => config.severity_thresholds = thresholds,
                None => log::warn!(
                    "malformed {} value {:?}, using default thresholds",
                    SEVERITY_THRESHOLDS_KEY,
                    raw
                ),
            }
        }
        if let Some(raw) = store.get_value(SUSPICIOUS_PATTERNS_KEY).await? {
            let list = parse_string_list(&raw);
            if list.is_empty() {
                log::warn!("empty {} value, using default patterns", SUSPICIOUS_PATTERNS_KEY);
            } else {
                config.suspicious_patterns = list;
            }
        }
        if let Some(raw) = store.get_value(TOOL_SIGNATURES_KEY).await? {
            let list = parse_string_list(&raw);
            if list.is_empty() {
                log::warn!("empty {} value, using default signatures", TOOL_SIGNATURES_KEY);
            } else {
                config.tool_signatures = list;
            }
        }

        log::info!("forensic scoring configuration loaded");
        Ok(config)
    }

    /// Load configuration from a YAML file (operator CLI path).
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| TrapwireError::Config(format!("invalid config file {}: {}", path.display(), e)))
    }
}

/// Parse a numeric map either as a JSON object (`{"RPSTOL": 10}`) or as the
/// `KEY:value,KEY:value` fallback format. Non-numeric pairs in the fallback
/// format are skipped; a value that parses as neither yields `None`.
pub fn parse_numeric_map(raw: &str) -> Option<HashMap<String, f64>> {
    if let Ok(json) = serde_json::from_str::<HashMap<String, f64>>(raw) {
        return Some(json);
    }

    let mut map = HashMap::new();
    for pair in raw.split(',') {
        let mut parts = pair.splitn(2, ':');
        let key = parts.next().unwrap_or("").trim();
        let value = parts.next().unwrap_or("").trim();
        if key.is_empty() {
            continue;
        }
        if let Ok(number) = value.parse::<f64>() {
            map.insert(key.to_string(), number);
        }
    }
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

/// Parse a string list either as a JSON array or as a comma-separated list.
pub fn parse_string_list(raw: &str) -> Vec<String> {
    if let Ok(json) = serde_json::from_str::<Vec<String>>(raw) {
        return json
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a 4-entry ascending threshold table, JSON array or comma list.
pub fn parse_thresholds(raw: &str) -> Option<SeverityThresholds> {
    let values: Vec<f64> = if let Ok(json) = serde_json::from_str::<Vec<f64>>(raw) {
        json
    } else {
        let parsed: Vec<f64> = raw
            .split(',')
            .filter_map(|s| s.trim().parse::<f64>().ok())
            .collect();
        parsed
    };
    if values.len() != 4 {
        return None;
    }
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return None;
    }
    Some(SeverityThresholds([values[0], values[1], values[2], values[3]]))
}

// src/forensics/stages/stats.rs
//!
//! Derives duration, throughput, average severity and technique-diversity
//! signals for each candidate attack.

use std::collections::BTreeSet;

use crate::forensics::config::ToleranceConfig;
use crate::forensics::models::round_to;
use crate::forensics::pipeline::{AttackBatch, PipelineStage};

pub struct StatsStage {
    tolerances: ToleranceConfig,
}

impl StatsStage {
    pub fn new(tolerances: ToleranceConfig) -> Self {
        Self { tolerances }
    }
}

/// `"1234ms"` below one minute, `"4.5 min"` below an hour, `"2h 15m"` above.
fn human_duration(duration_ms: i64, duration_minutes: f64) -> String {
    if duration_minutes < 1.0 {
        format!("{}ms", duration_ms)
    } else if duration_minutes < 60.0 {
        format!("{} min", round_to(duration_minutes, 1))
    } else {
        let hours = (duration_minutes / 60.0).floor() as i64;
        let minutes = (duration_minutes.floor() as i64) % 60;
        format!("{}h {}m", hours, minutes)
    }
}

/// Lower-case a suspicion tag and strip its category prefix: everything
/// after the first colon is the technique name.
fn normalize_indicator(indicator: &str) -> String {
    let lowered = indicator.to_lowercase();
    match lowered.split_once(':') {
        Some((_, technique)) => technique.to_string(),
        None => lowered,
    }
}

impl PipelineStage for StatsStage {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn run(&self, batch: &mut AttackBatch) {
        for attack in &mut batch.attacks {
            attack.duration_ms = (attack.last_seen - attack.first_seen).num_milliseconds();
            attack.duration_minutes = attack.duration_ms as f64 / 60_000.0;
            attack.human_duration = human_duration(attack.duration_ms, attack.duration_minutes);

            attack.average_score =
                round_to(attack.sum_score as f64 / attack.total_logs as f64, 2);

            // Sub-second bursts divide by a floored one-second denominator
            // instead of blowing up.
            let seconds = (attack.duration_ms as f64 / 1000.0).max(1.0);
            attack.requests_per_second = round_to(attack.total_logs as f64 / seconds, 5);

            let techniques: BTreeSet<String> = attack
                .member_records
                .iter()
                .flat_map(|r| r.indicators.iter())
                .map(|tag| normalize_indicator(tag))
                .collect();
            attack.unique_technique_count = techniques.len();
            attack.unique_technique_norm = (attack.unique_technique_count as f64
                / self.tolerances.unique_techniques)
                .min(1.0);
            attack.attack_patterns = techniques.into_iter().collect();
        }
    }
}

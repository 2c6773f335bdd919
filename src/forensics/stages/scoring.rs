// src/forensics/stages/scoring.rs
//!
//! Normalizes every signal, applies the configured weights and decay, and
//! reduces them to the composite danger score and severity tier.

use crate::forensics::config::{DangerWeights, SeverityThresholds, ToleranceConfig};
use crate::forensics::models::{
    round_to, IntensityLabel, RpsStyle, PAYLOAD_RISK_POINTS, SEQUENCE_RISK_POINTS,
    TOOL_RISK_POINTS,
};
use crate::forensics::pipeline::{AttackBatch, PipelineStage};

pub struct ScoringStage {
    weights: DangerWeights,
    tolerances: ToleranceConfig,
    thresholds: SeverityThresholds,
}

impl ScoringStage {
    pub fn new(
        weights: DangerWeights,
        tolerances: ToleranceConfig,
        thresholds: SeverityThresholds,
    ) -> Self {
        Self {
            weights,
            tolerances,
            thresholds,
        }
    }
}

impl PipelineStage for ScoringStage {
    fn name(&self) -> &'static str {
        "scoring"
    }

    fn run(&self, batch: &mut AttackBatch) {
        for attack in &mut batch.attacks {
            let rps = attack.requests_per_second;
            let minutes = attack.duration_minutes;

            attack.rps_style = RpsStyle::from_rps(rps);
            attack.intensity_label = IntensityLabel::classify(minutes, rps);

            attack.rps_norm = (rps / self.tolerances.rps).min(1.0);
            // Logarithmic so long attacks saturate instead of dominating.
            attack.duration_norm =
                ((minutes + 1.0).ln() / self.tolerances.duration.ln()).min(1.0);
            attack.score_norm = (attack.average_score / self.tolerances.score).min(1.0);
            // Long-running low-intensity attacks are discounted.
            attack.duration_decay = (-minutes / self.tolerances.decay).exp();
            attack.duration_norm_penalized = attack.duration_norm * attack.duration_decay;

            let sequence_norm = attack.sequence_risk_score / SEQUENCE_RISK_POINTS;
            let payload_norm = attack.payload_risk_score / PAYLOAD_RISK_POINTS;
            let tool_norm = attack.tool_risk_score / TOOL_RISK_POINTS;

            let contributions = [
                attack.rps_norm * self.weights.rps,
                attack.duration_norm_penalized * self.weights.duration,
                attack.score_norm * self.weights.score,
                attack.unique_technique_norm * self.weights.technique,
                sequence_norm * self.weights.sequence,
                payload_norm * self.weights.payload,
                tool_norm * self.weights.tool,
            ];
            let total: f64 = contributions.iter().sum();

            attack.danger_score = round_to((100.0 * total).min(100.0), 2);
            attack.danger_level = self.thresholds.classify(attack.danger_score);

            log::debug!(
                "{} scored {} ({})",
                attack.source_address,
                attack.danger_score,
                attack.danger_level
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forensics::config::ForensicConfig;
    use crate::forensics::models::{CandidateAttack, DangerLevel, RequestRecord};
    use crate::forensics::stages::StatsStage;
    use chrono::{Duration, TimeZone, Utc};

    fn scored_attack(mutate: impl Fn(&mut CandidateAttack)) -> CandidateAttack {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let members: Vec<RequestRecord> = (0..12)
            .map(|i| {
                let mut r =
                    RequestRecord::new("9.9.9.9", "/scan", base + Duration::seconds(i * 20));
                r.severity_score = 50;
                r
            })
            .collect();
        let first = members.first().unwrap().timestamp;
        let last = members.last().unwrap().timestamp;
        let sum = members.iter().map(|r| r.severity_score).sum();
        let mut attack =
            CandidateAttack::from_group("9.9.9.9".to_string(), members, first, last, sum);

        let config = ForensicConfig::default();
        let mut batch = AttackBatch {
            records: Vec::new(),
            rate_limit_events: Vec::new(),
            attacks: vec![attack.clone()],
        };
        StatsStage::new(config.tolerances).run(&mut batch);
        attack = batch.attacks.remove(0);
        mutate(&mut attack);

        let mut batch = AttackBatch {
            records: Vec::new(),
            rate_limit_events: Vec::new(),
            attacks: vec![attack],
        };
        ScoringStage::new(
            config.weights,
            config.tolerances,
            config.severity_thresholds,
        )
        .run(&mut batch);
        batch.attacks.remove(0)
    }

    #[test]
    fn test_normalized_fields_stay_in_unit_interval() {
        let attack = scored_attack(|_| {});
        for value in [
            attack.rps_norm,
            attack.duration_norm,
            attack.duration_decay,
            attack.duration_norm_penalized,
            attack.score_norm,
            attack.unique_technique_norm,
        ] {
            assert!((0.0..=1.0).contains(&value), "out of range: {}", value);
        }
    }

    #[test]
    fn test_composite_matches_documented_formula() {
        let attack = scored_attack(|_| {});
        let w = DangerWeights::default();
        let expected_total = attack.rps_norm * w.rps
            + attack.duration_norm_penalized * w.duration
            + attack.score_norm * w.score
            + attack.unique_technique_norm * w.technique;
        assert_eq!(attack.danger_score, round_to(100.0 * expected_total, 2));
    }

    #[test]
    fn test_behavioral_signals_raise_the_composite() {
        let quiet = scored_attack(|_| {});
        let loud = scored_attack(|a| {
            a.sequence_risk_score = SEQUENCE_RISK_POINTS;
            a.payload_risk_score = PAYLOAD_RISK_POINTS;
            a.tool_risk_score = TOOL_RISK_POINTS;
        });
        let w = DangerWeights::default();
        let lift = 100.0 * (w.sequence + w.payload + w.tool);
        assert!((loud.danger_score - quiet.danger_score - lift).abs() < 0.02);
    }

    #[test]
    fn test_composite_is_clamped_to_one_hundred() {
        let attack = scored_attack(|a| {
            a.average_score = 1_000.0;
            a.unique_technique_norm = 1.0;
            a.requests_per_second = 500.0;
            a.sequence_risk_score = SEQUENCE_RISK_POINTS;
            a.payload_risk_score = PAYLOAD_RISK_POINTS;
            a.tool_risk_score = TOOL_RISK_POINTS;
        });
        assert_eq!(attack.danger_score, 100.0);
        assert_eq!(attack.danger_level, DangerLevel::Defcon1);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let a = scored_attack(|_| {});
        let b = scored_attack(|_| {});
        assert_eq!(a.danger_score, b.danger_score);
        assert_eq!(a.danger_level, b.danger_level);
        assert_eq!(a.rps_norm, b.rps_norm);
        assert_eq!(a.duration_norm_penalized, b.duration_norm_penalized);
        assert_eq!(a.intensity_label, b.intensity_label);
    }
}

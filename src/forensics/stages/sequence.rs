// src/forensics/stages/sequence.rs
//!
//! Scans each attack's records in time order for a success-after-failure
//! authentication chain: one or more 401/403 responses immediately followed
//! by a 200. The signature is independent of raw volume, which is what makes
//! it worth more points than any throughput signal.

use crate::forensics::models::SEQUENCE_RISK_POINTS;
use crate::forensics::pipeline::{AttackBatch, PipelineStage};

#[derive(Default)]
pub struct SequenceStage;

impl SequenceStage {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStage for SequenceStage {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn run(&self, batch: &mut AttackBatch) {
        for attack in &mut batch.attacks {
            // Sort a copy of (timestamp, status); the canonical member order
            // stays untouched. The sort is stable, so records sharing a
            // millisecond keep their store order.
            let mut sequence: Vec<(chrono::DateTime<chrono::Utc>, u16)> = attack
                .member_records
                .iter()
                .map(|r| (r.timestamp, r.response_status_code.unwrap_or(0)))
                .collect();
            sequence.sort_by_key(|entry| entry.0);

            let mut last_status: u16 = 0;
            let mut detected = false;
            for (_, status) in sequence {
                if matches!(last_status, 401 | 403) && status == 200 {
                    detected = true;
                }
                last_status = status;
            }

            attack.brute_force_success_detected = detected;
            attack.sequence_risk_score = if detected { SEQUENCE_RISK_POINTS } else { 0.0 };
            if detected {
                log::debug!(
                    "brute-force success chain detected for {}",
                    attack.source_address
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forensics::models::{CandidateAttack, RequestRecord};
    use chrono::{Duration, TimeZone, Utc};

    fn batch_with_statuses(statuses: &[Option<u16>]) -> AttackBatch {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let members: Vec<RequestRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut r =
                    RequestRecord::new("10.0.0.1", "/login", base + Duration::seconds(i as i64));
                r.response_status_code = *status;
                r
            })
            .collect();
        let first = members.first().map(|r| r.timestamp).unwrap();
        let last = members.last().map(|r| r.timestamp).unwrap();
        let attack = CandidateAttack::from_group("10.0.0.1".to_string(), members, first, last, 0);
        AttackBatch {
            records: Vec::new(),
            rate_limit_events: Vec::new(),
            attacks: vec![attack],
        }
    }

    fn detect(statuses: &[Option<u16>]) -> (bool, f64) {
        let mut batch = batch_with_statuses(statuses);
        SequenceStage::new().run(&mut batch);
        let attack = &batch.attacks[0];
        (attack.brute_force_success_detected, attack.sequence_risk_score)
    }

    #[test]
    fn test_failures_then_success_is_detected() {
        assert_eq!(detect(&[Some(403), Some(403), Some(200)]), (true, 50.0));
        assert_eq!(detect(&[Some(401), Some(200)]), (true, 50.0));
    }

    #[test]
    fn test_success_before_failure_is_not_detected() {
        assert_eq!(detect(&[Some(200), Some(403)]), (false, 0.0));
    }

    #[test]
    fn test_non_adjacent_success_is_not_detected() {
        // the 500 between the 401 and the 200 breaks the chain
        assert_eq!(detect(&[Some(401), Some(500), Some(200)]), (false, 0.0));
    }

    #[test]
    fn test_missing_status_defaults_to_zero() {
        assert_eq!(detect(&[Some(403), None, Some(200)]), (false, 0.0));
    }

    #[test]
    fn test_detection_is_sticky() {
        assert_eq!(
            detect(&[Some(401), Some(200), Some(404), Some(404)]),
            (true, 50.0)
        );
    }

    #[test]
    fn test_records_are_sorted_by_time_before_the_scan() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        // store order 200-then-403, chronological order 403-then-200
        let mut success =
            RequestRecord::new("10.0.0.1", "/login", base + Duration::seconds(10));
        success.response_status_code = Some(200);
        let mut failure = RequestRecord::new("10.0.0.1", "/login", base);
        failure.response_status_code = Some(403);

        let attack = CandidateAttack::from_group(
            "10.0.0.1".to_string(),
            vec![success, failure],
            base,
            base + Duration::seconds(10),
            0,
        );
        let mut batch = AttackBatch {
            records: Vec::new(),
            rate_limit_events: Vec::new(),
            attacks: vec![attack],
        };
        SequenceStage::new().run(&mut batch);
        assert!(batch.attacks[0].brute_force_success_detected);
        // canonical member order untouched
        assert_eq!(
            batch.attacks[0].member_records[0].response_status_code,
            Some(200)
        );
    }
}

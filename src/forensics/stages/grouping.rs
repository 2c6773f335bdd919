// src/forensics/stages/grouping.rs
//!
//! Buckets matched records by source address into candidate attacks.

use std::collections::BTreeMap;

use crate::forensics::models::{CandidateAttack, RequestRecord};
use crate::forensics::pipeline::{AttackBatch, PipelineStage};

/// Partitions the record batch by source address, aggregates per-group
/// bounds and score sums, joins rate-limit events falling inside each
/// group's window, and discards groups below the minimum size.
///
/// Groups are emitted in source-address order so pipeline output is stable
/// regardless of input ordering. Member records keep the store's original
/// ordering; stages that need time order sort for themselves.
pub struct GroupingStage {
    min_logs_for_attack: usize,
}

impl GroupingStage {
    pub fn new(min_logs_for_attack: usize) -> Self {
        Self {
            min_logs_for_attack,
        }
    }
}

impl PipelineStage for GroupingStage {
    fn name(&self) -> &'static str {
        "grouping"
    }

    fn run(&self, batch: &mut AttackBatch) {
        let mut groups: BTreeMap<String, Vec<RequestRecord>> = BTreeMap::new();
        for record in batch.records.drain(..) {
            groups
                .entry(record.source_address.clone())
                .or_default()
                .push(record);
        }

        let mut attacks = Vec::new();
        for (source_address, members) in groups {
            if members.len() < self.min_logs_for_attack {
                log::debug!(
                    "dropping group {} with {} records (minimum {})",
                    source_address,
                    members.len(),
                    self.min_logs_for_attack
                );
                continue;
            }

            let first_seen = members.iter().map(|r| r.timestamp).min().unwrap_or_default();
            let last_seen = members.iter().map(|r| r.timestamp).max().unwrap_or_default();
            let sum_score: i64 = members.iter().map(|r| r.severity_score).sum();

            let mut attack =
                CandidateAttack::from_group(source_address, members, first_seen, last_seen, sum_score);

            let mut events: Vec<_> = batch
                .rate_limit_events
                .iter()
                .filter(|e| {
                    e.source_address == attack.source_address
                        && e.timestamp >= first_seen
                        && e.timestamp <= last_seen
                })
                .cloned()
                .collect();
            events.sort_by_key(|e| e.timestamp);
            attack.rate_limit_count = events.len();
            attack.rate_limit_events = events;

            attacks.push(attack);
        }

        batch.attacks = attacks;
    }
}

// src/forensics/stages/fingerprint.rs
//!
//! Clusters distinct client signatures per attack and flags known
//! offensive tooling. Automated scanners rarely rotate their user agent,
//! so a single recognizable signature across a whole group is a strong
//! tell.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};

use crate::forensics::config::default_tool_signatures;
use crate::forensics::models::TOOL_RISK_POINTS;
use crate::forensics::pipeline::{AttackBatch, PipelineStage};

/// Sentinel for records captured without a user agent.
const UNKNOWN_AGENT: &str = "unknown";

pub struct FingerprintStage {
    signature_pattern: Regex,
}

fn compile_signatures(fragments: &[String]) -> Option<Regex> {
    if fragments.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!("({})", fragments.join("|")))
        .case_insensitive(true)
        .build()
        .ok()
}

impl FingerprintStage {
    /// Build the stage from configured tool signatures. An empty or
    /// uncompilable list falls back to the built-in defaults.
    pub fn new(signatures: &[String]) -> Self {
        let signature_pattern = compile_signatures(signatures).unwrap_or_else(|| {
            if !signatures.is_empty() {
                log::warn!("invalid tool-signature list, using built-in defaults");
            }
            compile_signatures(&default_tool_signatures())
                .expect("built-in tool signatures are valid")
        });
        Self { signature_pattern }
    }
}

impl PipelineStage for FingerprintStage {
    fn name(&self) -> &'static str {
        "fingerprint"
    }

    fn run(&self, batch: &mut AttackBatch) {
        for attack in &mut batch.attacks {
            let agents: BTreeSet<String> = attack
                .member_records
                .iter()
                .map(|r| {
                    r.user_agent
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_AGENT.to_string())
                })
                .collect();

            attack.tool_signature_detected =
                agents.iter().any(|ua| self.signature_pattern.is_match(ua));
            attack.tool_risk_score = if attack.tool_signature_detected {
                TOOL_RISK_POINTS
            } else {
                0.0
            };
            attack.user_agent_count = agents.len();
            attack.distinct_user_agents = agents.into_iter().collect();
        }
    }
}

// src/forensics/stages/payload.rs
//!
//! Inspects request content for known-malicious fragments: system-file
//! paths, shell binaries and commands, SQL/script injection markers.

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::forensics::config::default_suspicious_patterns;
use crate::forensics::models::PAYLOAD_RISK_POINTS;
use crate::forensics::pipeline::{AttackBatch, PipelineStage};

pub struct PayloadStage {
    pattern: Regex,
}

fn compile_alternation(fragments: &[String]) -> Option<Regex> {
    if fragments.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!("({})", fragments.join("|")))
        .case_insensitive(true)
        .build()
        .ok()
}

impl PayloadStage {
    /// Build the stage from configured pattern fragments. An empty or
    /// uncompilable list falls back to the built-in defaults.
    pub fn new(fragments: &[String]) -> Self {
        let pattern = compile_alternation(fragments).unwrap_or_else(|| {
            if !fragments.is_empty() {
                log::warn!("invalid suspicious-pattern list, using built-in defaults");
            }
            compile_alternation(&default_suspicious_patterns())
                .expect("built-in payload patterns are valid")
        });
        Self { pattern }
    }
}

/// URL plus body, space-separated. Only plain-string bodies take part;
/// structured bodies are skipped so incidental key names never match.
fn searchable_content(url: &str, body: Option<&Value>) -> String {
    let body_str = match body {
        Some(Value::String(s)) => s.as_str(),
        _ => "",
    };
    format!("{} {}", url, body_str)
}

impl PipelineStage for PayloadStage {
    fn name(&self) -> &'static str {
        "payload"
    }

    fn run(&self, batch: &mut AttackBatch) {
        for attack in &mut batch.attacks {
            let matches: Vec<String> = attack
                .member_records
                .iter()
                .map(|r| searchable_content(&r.url, r.body.as_ref()))
                .filter(|content| self.pattern.is_match(content))
                .collect();

            attack.payload_risk_score = if matches.is_empty() {
                0.0
            } else {
                PAYLOAD_RISK_POINTS
            };
            attack.high_risk_payload_matches = matches;
        }
    }
}

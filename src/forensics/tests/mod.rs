// src/forensics/tests/mod.rs
//!
//! Comprehensive tests for the attack-aggregation pipeline

#[cfg(test)]
mod unit_tests {
    use crate::forensics::config::ForensicConfig;
    use crate::forensics::models::*;
    use crate::forensics::pipeline::{standard_pipeline, AttackBatch};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap()
    }

    fn record(
        addr: &str,
        url: &str,
        offset_ms: i64,
        score: i64,
        status: Option<u16>,
        agent: Option<&str>,
        indicators: &[&str],
    ) -> RequestRecord {
        let mut r = RequestRecord::new(addr, url, base_time() + Duration::milliseconds(offset_ms));
        r.severity_score = score;
        r.response_status_code = status;
        r.user_agent = agent.map(|s| s.to_string());
        r.indicators = indicators.iter().map(|s| s.to_string()).collect();
        r
    }

    fn run(records: Vec<RequestRecord>, min_logs: usize) -> Vec<CandidateAttack> {
        let pipeline = standard_pipeline(&ForensicConfig::default(), min_logs);
        pipeline
            .execute(AttackBatch::new(records, Vec::new()))
            .attacks
    }

    // ==================== Invariants ====================

    #[test]
    fn test_all_attacks_satisfy_size_and_time_invariants() {
        let mut records = Vec::new();
        for i in 0..15 {
            records.push(record("10.0.0.1", "/a", i * 500, 10, Some(404), None, &[]));
        }
        for i in 0..3 {
            records.push(record("10.0.0.2", "/b", i * 500, 10, Some(404), None, &[]));
        }
        let attacks = run(records, 5);

        assert_eq!(attacks.len(), 1);
        for attack in &attacks {
            assert!(attack.total_logs >= 5);
            assert_eq!(attack.total_logs, attack.member_records.len());
            assert!(attack.first_seen <= attack.last_seen);
        }
    }

    #[test]
    fn test_identical_snapshot_produces_byte_identical_output() {
        let make_records = || -> Vec<RequestRecord> {
            (0..12)
                .map(|i| {
                    let mut r = record(
                        "10.0.0.1",
                        "/scan",
                        i * 1000,
                        15,
                        Some(404),
                        Some("curl/8.0"),
                        &["SUSPICIOUS_PATTERN:probe"],
                    );
                    r.id = format!("record-{}", i);
                    r
                })
                .collect()
        };
        let first = serde_json::to_string(&run(make_records(), 10)).unwrap();
        let second = serde_json::to_string(&run(make_records(), 10)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_permuted_input_keeps_patterns_and_score_stable() {
        let records: Vec<RequestRecord> = (0..10)
            .map(|i| {
                record(
                    "10.0.0.1",
                    "/x",
                    i * 1000,
                    20,
                    Some(404),
                    None,
                    &[["a:alpha", "beta", "c:gamma"][i as usize % 3]],
                )
            })
            .collect();
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = run(records, 10);
        let backward = run(reversed, 10);
        assert_eq!(forward[0].attack_patterns, backward[0].attack_patterns);
        assert_eq!(forward[0].danger_score, backward[0].danger_score);
        assert_eq!(forward[0].requests_per_second, backward[0].requests_per_second);
    }

    // ==================== Behavioral signals ====================

    #[test]
    fn test_brute_force_chain_is_scored_through_the_pipeline() {
        let mut records = Vec::new();
        for i in 0..9 {
            records.push(record(
                "172.16.0.5",
                "/login",
                i * 1000,
                25,
                Some(403),
                None,
                &[],
            ));
        }
        records.push(record("172.16.0.5", "/login", 9_000, 25, Some(200), None, &[]));

        let attacks = run(records, 10);
        let attack = &attacks[0];
        assert!(attack.brute_force_success_detected);
        assert_eq!(attack.sequence_risk_score, 50.0);

        // the sequence term lifts the composite by its full weight
        let weights = ForensicConfig::default().weights;
        let without: f64 = attack.danger_score - 100.0 * weights.sequence;
        assert!(without >= 0.0);
    }

    #[test]
    fn test_clean_traffic_scores_low_tier() {
        let records: Vec<RequestRecord> = (0..10)
            .map(|i| {
                record(
                    "192.0.2.10",
                    "/blog",
                    i * 30_000,
                    1,
                    Some(200),
                    Some("Mozilla/5.0"),
                    &[],
                )
            })
            .collect();
        let attacks = run(records, 10);
        let attack = &attacks[0];
        assert_eq!(attack.payload_risk_score, 0.0);
        assert_eq!(attack.tool_risk_score, 0.0);
        assert!(!attack.brute_force_success_detected);
        assert_eq!(attack.danger_level, DangerLevel::Defcon5);
    }

    #[test]
    fn test_tooling_and_payload_signals_compound() {
        let records: Vec<RequestRecord> = (0..10)
            .map(|i| {
                record(
                    "198.51.100.9",
                    "/cgi-bin/../../etc/passwd",
                    i * 100,
                    40,
                    Some(404),
                    Some("sqlmap/1.6"),
                    &["SUSPICIOUS_PATTERN:traversal", "BOT_UA:sqlmap"],
                )
            })
            .collect();
        let attacks = run(records, 10);
        let attack = &attacks[0];

        assert_eq!(attack.payload_risk_score, 30.0);
        assert!(attack.tool_signature_detected);
        assert_eq!(attack.tool_risk_score, 20.0);
        assert_eq!(attack.user_agent_count, 1);
        assert_eq!(attack.high_risk_payload_matches.len(), 10);
        assert_eq!(
            attack.attack_patterns,
            vec!["sqlmap".to_string(), "traversal".to_string()]
        );
    }

    // ==================== Documented scoring scenario ====================

    #[test]
    fn test_four_minute_burst_scenario() {
        // 2401 records over exactly four minutes at ~10 req/s, average
        // severity 50, three distinct techniques.
        let tags = ["SCAN:probing", "SCAN:enumeration", "fuzzing"];
        let records: Vec<RequestRecord> = (0..=2400)
            .map(|i| {
                record(
                    "9.9.9.9",
                    "/search",
                    i * 100,
                    50,
                    Some(404),
                    Some("Mozilla/5.0"),
                    &[tags[i as usize % 3]],
                )
            })
            .collect();
        let attacks = run(records, 10);
        assert_eq!(attacks.len(), 1);
        let attack = &attacks[0];

        assert_eq!(attack.duration_ms, 240_000);
        assert_eq!(attack.duration_minutes, 4.0);
        assert_eq!(attack.requests_per_second, 10.00417);
        assert_eq!(attack.rps_norm, 1.0);
        assert_eq!(attack.duration_norm, 5.0_f64.ln() / 361.0_f64.ln());
        assert_eq!(attack.score_norm, 1.0);
        assert_eq!(attack.unique_technique_norm, 0.5);
        assert_eq!(attack.rps_style, RpsStyle::High);
        assert_eq!(attack.intensity_label, IntensityLabel::FlashBurst);

        let weights = ForensicConfig::default().weights;
        let decay = (-4.0_f64 / 240.0).exp();
        let expected = 100.0
            * (1.0 * weights.rps
                + attack.duration_norm * decay * weights.duration
                + 1.0 * weights.score
                + 0.5 * weights.technique);
        assert!((attack.danger_score - round_to(expected, 2)).abs() < 1e-9);
        assert_eq!(
            attack.danger_level,
            ForensicConfig::default()
                .severity_thresholds
                .classify(attack.danger_score)
        );
    }

    #[test]
    fn test_same_millisecond_burst_rps_equals_total_logs() {
        let records: Vec<RequestRecord> = (0..12)
            .map(|_| record("10.1.1.1", "/", 0, 5, Some(404), None, &[]))
            .collect();
        let attacks = run(records, 10);
        assert_eq!(attacks[0].requests_per_second, 12.0);
        assert_eq!(attacks[0].duration_ms, 0);
    }

    // ==================== Grouping edge cases ====================

    #[test]
    fn test_groups_below_threshold_are_never_materialized() {
        let mut records = Vec::new();
        for addr in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            for i in 0..4 {
                records.push(record(addr, "/", i * 1000, 1, None, None, &[]));
            }
        }
        assert!(run(records.clone(), 5).is_empty());
        assert_eq!(run(records, 4).len(), 3);
    }

    #[test]
    fn test_attacks_are_emitted_in_address_order() {
        let mut records = Vec::new();
        for addr in ["9.0.0.1", "1.0.0.1", "5.0.0.1"] {
            for i in 0..3 {
                records.push(record(addr, "/", i * 1000, 1, None, None, &[]));
            }
        }
        let attacks = run(records, 1);
        let addresses: Vec<&str> = attacks.iter().map(|a| a.source_address.as_str()).collect();
        assert_eq!(addresses, vec!["1.0.0.1", "5.0.0.1", "9.0.0.1"]);
    }
}

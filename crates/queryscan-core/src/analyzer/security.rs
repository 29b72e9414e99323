//! Security analysis: pattern-driven injection and exposure checks.

use crate::rules::security_rules;
use crate::types::{clamp_score, SecurityLevel, SecurityReport, Severity, Vulnerability};

/// Points deducted per vulnerability severity.
fn penalty(severity: Severity) -> i32 {
    match severity {
        Severity::Critical => 30,
        Severity::High => 20,
        Severity::Medium => 10,
        Severity::Low => 5,
    }
}

/// Evaluates the rule catalog over the raw statement text. Each rule fires
/// at most once regardless of how many times its pattern matches.
pub fn analyze(sql: &str) -> SecurityReport {
    let mut vulnerabilities = Vec::new();

    for rule in security_rules() {
        let matches = rule.count_matches(sql);
        if matches >= rule.min_matches {
            vulnerabilities.push(
                Vulnerability::new(rule.code, rule.severity, rule.message)
                    .with_impact(rule.impact)
                    .with_recommendation(rule.recommendation),
            );
        }
    }

    let deducted: i32 = vulnerabilities.iter().map(|v| penalty(v.severity)).sum();
    let score = clamp_score(100 - deducted);
    let level = if score >= 90 {
        SecurityLevel::Safe
    } else if score >= 70 {
        SecurityLevel::Low
    } else if score >= 50 {
        SecurityLevel::Medium
    } else if score >= 30 {
        SecurityLevel::High
    } else {
        SecurityLevel::Critical
    };

    SecurityReport {
        score,
        level,
        vulnerabilities,
    }
}

//! Performance analysis: anti-pattern detection with a deducted score.

use crate::rules::{
    count_column_pattern, function_call_pattern, index_hostile_functions, offset_pattern,
    FUNCTION_USAGE_THRESHOLD,
};
use crate::types::{
    clamp_score, issue_codes, Issue, ParsedStructure, PerformanceReport, Priority, QueryType,
    RiskLevel, Severity, Suggestion,
};

/// Points deducted per issue severity. `CRITICAL` never occurs here; the
/// performance checks top out at `HIGH`.
fn penalty(severity: Severity) -> i32 {
    match severity {
        Severity::High | Severity::Critical => 15,
        Severity::Medium => 8,
        Severity::Low => 3,
    }
}

/// Rows beyond which an `OFFSET` is considered expensive pagination.
const LARGE_OFFSET_THRESHOLD: u64 = 1000;

/// Subquery count above which the query should be restructured.
const SUBQUERY_COUNT_THRESHOLD: usize = 5;

/// Subquery nesting depth above which readability and planning suffer.
const SUBQUERY_DEPTH_THRESHOLD: usize = 2;

/// `DISTINCT` occurrence count above which deduplication cost is flagged.
const DISTINCT_THRESHOLD: usize = 3;

/// Scans the fact model and the raw text for anti-patterns and scores the
/// result. The score starts at 100 and loses points per finding.
pub fn analyze(structure: &ParsedStructure, sql: &str) -> PerformanceReport {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    check_missing_where(structure, &mut issues, &mut recommendations);
    check_functions_in_clauses(structure, &mut issues, &mut recommendations);
    check_joins(structure, &mut issues);
    check_subqueries(structure, &mut issues, &mut recommendations);
    check_distinct(sql, &mut issues);
    check_offset(sql, &mut issues, &mut recommendations);
    check_function_usage(sql, &mut issues);
    check_count_column(sql, &mut recommendations);

    let deducted: i32 = issues.iter().map(|i| penalty(i.severity)).sum();
    let score = clamp_score(100 - deducted);
    let level = if score >= 80 {
        RiskLevel::Low
    } else if score >= 60 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    PerformanceReport {
        score,
        level,
        issues,
        recommendations,
    }
}

fn check_missing_where(
    structure: &ParsedStructure,
    issues: &mut Vec<Issue>,
    recommendations: &mut Vec<Suggestion>,
) {
    if structure.query_type == QueryType::Select
        && !structure.tables.is_empty()
        && structure.where_clauses.is_empty()
    {
        issues.push(
            Issue::new(
                issue_codes::NO_WHERE_CLAUSE,
                Severity::High,
                "SELECT reads a table without a WHERE clause",
            )
            .with_impact("Full table scan over every row"),
        );
        recommendations.push(Suggestion::new(
            issue_codes::NO_WHERE_CLAUSE,
            Priority::High,
            "Add a WHERE clause to restrict the affected rows",
        ));
    }
}

fn check_functions_in_clauses(
    structure: &ParsedStructure,
    issues: &mut Vec<Issue>,
    recommendations: &mut Vec<Suggestion>,
) {
    let pattern = function_call_pattern();

    if structure.where_clauses.iter().any(|w| pattern.is_match(w)) {
        issues.push(
            Issue::new(
                issue_codes::FUNCTION_IN_WHERE,
                Severity::Medium,
                "Function call inside a WHERE condition",
            )
            .with_impact("Prevents index usage on the wrapped column"),
        );
        recommendations.push(Suggestion::new(
            issue_codes::FUNCTION_IN_WHERE,
            Priority::Medium,
            "Rewrite the condition so the column is compared unwrapped, or add a functional index",
        ));
    }

    if structure
        .joins
        .iter()
        .filter_map(|j| j.condition.as_deref())
        .any(|c| pattern.is_match(c))
    {
        issues.push(
            Issue::new(
                issue_codes::FUNCTION_IN_JOIN,
                Severity::High,
                "Function call inside a join condition",
            )
            .with_impact("Prevents index usage during the join"),
        );
    }

    if structure.order_by.iter().any(|o| pattern.is_match(o)) {
        issues.push(
            Issue::new(
                issue_codes::FUNCTION_IN_ORDER_BY,
                Severity::Medium,
                "Function call inside ORDER BY",
            )
            .with_impact("Forces a sort over computed values"),
        );
    }
}

fn check_joins(structure: &ParsedStructure, issues: &mut Vec<Issue>) {
    for join in &structure.joins {
        if join.join_type == crate::types::JoinType::Cross {
            issues.push(
                Issue::new(
                    issue_codes::CROSS_JOIN,
                    Severity::High,
                    format!("CROSS JOIN with table '{}'", join.table),
                )
                .with_impact("Cartesian product over both tables"),
            );
        } else if join.condition.is_none() {
            issues.push(
                Issue::new(
                    issue_codes::JOIN_WITHOUT_CONDITION,
                    Severity::High,
                    format!("Join with table '{}' has no ON condition", join.table),
                )
                .with_impact("Degenerates into a Cartesian product"),
            );
        }
    }
}

fn check_subqueries(
    structure: &ParsedStructure,
    issues: &mut Vec<Issue>,
    recommendations: &mut Vec<Suggestion>,
) {
    let depth = structure.max_subquery_depth();
    if depth > SUBQUERY_DEPTH_THRESHOLD {
        issues.push(
            Issue::new(
                issue_codes::DEEP_NESTED_SUBQUERY,
                Severity::Medium,
                format!("Subqueries nested {depth} levels deep"),
            )
            .with_impact("Hard to plan and hard to read"),
        );
        recommendations.push(Suggestion::new(
            issue_codes::DEEP_NESTED_SUBQUERY,
            Priority::Medium,
            "Flatten deeply nested subqueries into CTEs",
        ));
    }
    if structure.subqueries.len() > SUBQUERY_COUNT_THRESHOLD {
        issues.push(
            Issue::new(
                issue_codes::TOO_MANY_SUBQUERIES,
                Severity::Medium,
                format!("{} subqueries in one statement", structure.subqueries.len()),
            )
            .with_impact("Each subquery may be re-evaluated per row"),
        );
    }
}

fn check_distinct(sql: &str, issues: &mut Vec<Issue>) {
    let count = sql
        .to_uppercase()
        .match_indices("DISTINCT")
        .count();
    if count > DISTINCT_THRESHOLD {
        issues.push(
            Issue::new(
                issue_codes::TOO_MANY_DISTINCT,
                Severity::Medium,
                format!("DISTINCT used {count} times"),
            )
            .with_impact("Repeated deduplication sorts or hashes"),
        );
    }
}

fn check_offset(sql: &str, issues: &mut Vec<Issue>, recommendations: &mut Vec<Suggestion>) {
    for caps in offset_pattern().captures_iter(sql) {
        let value: u64 = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if value > LARGE_OFFSET_THRESHOLD {
            issues.push(
                Issue::new(
                    issue_codes::LARGE_OFFSET,
                    Severity::Medium,
                    format!("OFFSET {value} skips rows after fetching them"),
                )
                .with_impact("The database still reads every skipped row"),
            );
            recommendations.push(Suggestion::new(
                issue_codes::LARGE_OFFSET,
                Priority::Medium,
                "Use keyset pagination (WHERE id > last_seen) instead of a large OFFSET",
            ));
        }
    }
}

fn check_function_usage(sql: &str, issues: &mut Vec<Issue>) {
    for (pattern, name) in index_hostile_functions() {
        let count = pattern.find_iter(sql).count();
        if count > FUNCTION_USAGE_THRESHOLD {
            issues.push(
                Issue::new(
                    issue_codes::FUNCTION_USAGE,
                    Severity::Medium,
                    format!("{name} used {count} times"),
                )
                .with_impact("Heavy per-row function evaluation"),
            );
        }
    }
}

/// `COUNT(column)` costs a NULL check per row that `COUNT(*)` skips.
fn check_count_column(sql: &str, recommendations: &mut Vec<Suggestion>) {
    if count_column_pattern().is_match(sql) {
        recommendations.push(Suggestion::new(
            issue_codes::AGGREGATION_OPTIMIZATION,
            Priority::Low,
            "Use COUNT(*) instead of COUNT(column) unless NULLs must be excluded",
        ));
    }
}

//! Optimization advice: concrete, example-bearing rewrite suggestions.
//!
//! The advisor reads both the fact model and the performance findings, so a
//! flagged join problem always has a matching suggestion here.

use crate::rules::{
    in_subquery_pattern, is_non_column_word, join_column_pattern, where_column_pattern,
};
use crate::types::{
    issue_codes, Issue, OptimizationReport, ParsedStructure, PerformanceReport, Priority,
    Suggestion,
};

/// Builds the prioritized suggestion list. Ordering within a priority tier
/// follows insertion order, so output is deterministic.
pub fn analyze(
    structure: &ParsedStructure,
    performance: &PerformanceReport,
    sql: &str,
) -> OptimizationReport {
    let mut suggestions = Vec::new();

    suggest_indexes(structure, &mut suggestions);
    suggest_join_fixes(structure, &performance.issues, &mut suggestions);
    suggest_subquery_rewrites(structure, sql, &mut suggestions);
    suggest_aggregation_fixes(sql, &mut suggestions);
    suggest_pagination_fix(&performance.issues, &mut suggestions);
    suggest_condition_ordering(structure, &mut suggestions);

    suggestions.sort_by_key(|s| std::cmp::Reverse(s.priority.rank()));

    let high = count_priority(&suggestions, Priority::High);
    let medium = count_priority(&suggestions, Priority::Medium);
    let low = count_priority(&suggestions, Priority::Low);

    OptimizationReport {
        total_count: suggestions.len(),
        high_priority_count: high,
        medium_priority_count: medium,
        low_priority_count: low,
        suggestions,
    }
}

fn count_priority(suggestions: &[Suggestion], priority: Priority) -> usize {
    suggestions.iter().filter(|s| s.priority == priority).count()
}

/// First real (non-CTE) table name, for index examples.
fn example_table(structure: &ParsedStructure) -> String {
    structure
        .tables
        .iter()
        .find(|t| !t.is_cte)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| "your_table".to_string())
}

/// Index candidates from filter and join columns.
fn suggest_indexes(structure: &ParsedStructure, suggestions: &mut Vec<Suggestion>) {
    let table = example_table(structure);
    let mut seen: Vec<String> = Vec::new();

    for fragment in &structure.where_clauses {
        for caps in where_column_pattern().captures_iter(fragment) {
            let column = caps[1].to_lowercase();
            if is_non_column_word(&column) || seen.contains(&column) {
                continue;
            }
            seen.push(column.clone());
            suggestions.push(
                Suggestion::new(
                    issue_codes::INDEX,
                    Priority::High,
                    format!("Filter column '{column}' is an index candidate"),
                )
                .with_example(format!("CREATE INDEX idx_{table}_{column} ON {table}({column});"))
                .with_expected_improvement("30-50%"),
            );
        }
    }

    for condition in structure.joins.iter().filter_map(|j| j.condition.as_deref()) {
        for caps in join_column_pattern().captures_iter(condition) {
            let column = caps[1].to_lowercase();
            if is_non_column_word(&column) || seen.contains(&column) {
                continue;
            }
            seen.push(column.clone());
            suggestions.push(
                Suggestion::new(
                    issue_codes::INDEX,
                    Priority::High,
                    format!("Join column '{column}' is an index candidate"),
                )
                .with_example(format!("CREATE INDEX idx_{table}_{column} ON {table}({column});"))
                .with_expected_improvement("40-60%"),
            );
        }
    }

    if !structure.order_by.is_empty() {
        let columns = structure.order_by.join(", ");
        suggestions.push(
            Suggestion::new(
                issue_codes::INDEX,
                Priority::Medium,
                format!("ORDER BY column(s) '{columns}' can be served by an index"),
            )
            .with_example(format!("CREATE INDEX idx_{table}_sort ON {table}({columns});"))
            .with_expected_improvement("20-40%"),
        );
    }
}

/// Join repairs keyed off the performance findings, plus a reorder hint for
/// join-heavy queries.
fn suggest_join_fixes(
    structure: &ParsedStructure,
    issues: &[Issue],
    suggestions: &mut Vec<Suggestion>,
) {
    let broken_join = issues
        .iter()
        .any(|i| i.code == issue_codes::CROSS_JOIN || i.code == issue_codes::JOIN_WITHOUT_CONDITION);
    if broken_join {
        suggestions.push(
            Suggestion::new(
                issue_codes::JOIN_OPTIMIZATION,
                Priority::High,
                "Add explicit ON conditions so joins do not degenerate into Cartesian products",
            )
            .with_example("JOIN orders o ON o.user_id = u.id"),
        );
    }

    if structure.joins.len() > 3 {
        suggestions.push(
            Suggestion::new(
                issue_codes::JOIN_OPTIMIZATION,
                Priority::Medium,
                format!(
                    "{} joins in one statement; join the most selective tables first",
                    structure.joins.len()
                ),
            )
            .with_expected_improvement("10-25%"),
        );
    }
}

fn suggest_subquery_rewrites(
    structure: &ParsedStructure,
    sql: &str,
    suggestions: &mut Vec<Suggestion>,
) {
    if !structure.subqueries.is_empty() {
        suggestions.push(
            Suggestion::new(
                issue_codes::QUERY_REFACTOR,
                Priority::Medium,
                "Rewrite the subquery as a join",
            )
            .with_example("JOIN (SELECT ...) sub ON sub.id = t.id")
            .with_expected_improvement("20-40%"),
        );
    }

    if in_subquery_pattern().is_match(sql) {
        suggestions.push(
            Suggestion::new(
                issue_codes::QUERY_REFACTOR,
                Priority::Low,
                "Consider EXISTS instead of IN for the subquery membership test",
            )
            .with_example("WHERE EXISTS (SELECT 1 FROM u WHERE u.id = t.id)")
            .with_expected_improvement("10-20%"),
        );
    }
}

fn suggest_aggregation_fixes(sql: &str, suggestions: &mut Vec<Suggestion>) {
    let upper = sql.to_uppercase();

    if upper.contains("HAVING") && upper.contains("GROUP BY") {
        suggestions.push(
            Suggestion::new(
                issue_codes::AGGREGATION_OPTIMIZATION,
                Priority::Low,
                "Move row-level filters from HAVING into WHERE so they run before grouping",
            )
            .with_expected_improvement("5-15%"),
        );
    }

    if upper.matches("DISTINCT").count() > 2 {
        suggestions.push(
            Suggestion::new(
                issue_codes::QUERY_REFACTOR,
                Priority::Medium,
                "Repeated DISTINCT; deduplicate once or use GROUP BY",
            )
            .with_expected_improvement("15-30%"),
        );
    }
}

fn suggest_pagination_fix(issues: &[Issue], suggestions: &mut Vec<Suggestion>) {
    if issues.iter().any(|i| i.code == issue_codes::LARGE_OFFSET) {
        suggestions.push(
            Suggestion::new(
                issue_codes::PAGINATION_OPTIMIZATION,
                Priority::Medium,
                "Replace the large OFFSET with keyset pagination",
            )
            .with_example("WHERE id > :last_seen_id ORDER BY id LIMIT 20")
            .with_expected_improvement("50-90%"),
        );
    }
}

/// Connective-heavy WHERE clauses benefit from putting the most selective
/// condition first.
fn suggest_condition_ordering(structure: &ParsedStructure, suggestions: &mut Vec<Suggestion>) {
    let connectives: usize = structure
        .where_clauses
        .iter()
        .map(|fragment| {
            let upper = fragment.to_uppercase();
            upper
                .split_whitespace()
                .filter(|w| *w == "AND" || *w == "OR")
                .count()
        })
        .sum();
    if connectives >= 3 {
        suggestions.push(
            Suggestion::new(
                issue_codes::CONDITION_OPTIMIZATION,
                Priority::Low,
                "Order WHERE conditions from most to least selective",
            )
            .with_expected_improvement("5-15%"),
        );
    }
}

//! Impact analysis: what breaks if a table or column changes.
//!
//! Direct impacts are textual occurrences of the target in the statement;
//! indirect impacts are one-hop traversals of the lineage graph. The final
//! score takes the worst single finding rather than summing, so one
//! CRITICAL usage outweighs any number of LOW ones.

use regex::Regex;

use crate::types::{
    issue_codes, DirectImpact, ImpactLevel, ImpactRecommendation, ImpactResult, ImpactStatistics,
    ImpactTarget, LineageGraph, ParsedStructure,
};

/// Usage patterns for a table name, with their kind label and level.
const TABLE_USAGE_PATTERNS: &[(&str, &str, ImpactLevel)] = &[
    (r"(?i)\bFROM\s+{}\b", "FROM", ImpactLevel::High),
    (r"(?i)\bJOIN\s+{}\b", "JOIN", ImpactLevel::High),
    (r"(?i)\bUPDATE\s+{}\b", "UPDATE", ImpactLevel::Medium),
    (r"(?i)\bINSERT\s+INTO\s+{}\b", "INSERT", ImpactLevel::Medium),
    (r"(?i)\bDELETE\s+FROM\s+{}\b", "DELETE", ImpactLevel::Medium),
];

/// Clause keywords scanned backwards from a column occurrence, with the
/// kind label and level for that context.
const COLUMN_CONTEXTS: &[(&str, &str, ImpactLevel)] = &[
    ("SELECT", "SELECT", ImpactLevel::Critical),
    ("WHERE", "WHERE", ImpactLevel::High),
    ("JOIN", "JOIN", ImpactLevel::High),
    (" ON ", "JOIN", ImpactLevel::High),
    ("GROUP BY", "GROUP_BY", ImpactLevel::Medium),
    ("ORDER BY", "ORDER_BY", ImpactLevel::Medium),
];

/// Direct impact weight per level.
fn direct_weight(level: ImpactLevel) -> u8 {
    match level {
        ImpactLevel::Critical => 100,
        ImpactLevel::High => 80,
        ImpactLevel::Medium => 60,
        ImpactLevel::Low => 40,
    }
}

/// Indirect impact weight per level.
fn indirect_weight(level: ImpactLevel) -> u8 {
    match level {
        ImpactLevel::Medium => 50,
        _ => 30,
    }
}

/// Runs the full impact computation for one target against one statement's
/// text, fact model, and lineage graph.
pub fn analyze(
    sql: &str,
    structure: &ParsedStructure,
    lineage: &LineageGraph,
    target: &ImpactTarget,
) -> ImpactResult {
    let direct_impacts = direct_impacts(sql, target);
    let indirect_impacts = indirect_impacts(lineage, &target.table);
    let (affected_tables, affected_ctes) = affected_sets(lineage, structure, &target.table);

    let direct_max = direct_impacts
        .iter()
        .map(|d| direct_weight(d.impact_level))
        .max()
        .unwrap_or(0);
    let indirect_max = indirect_impacts
        .iter()
        .map(|d| indirect_weight(d.impact_level))
        .max()
        .unwrap_or(0);
    let impact_score = direct_max.max(indirect_max);

    let impact_level = if impact_score >= 90 {
        ImpactLevel::Critical
    } else if impact_score >= 70 {
        ImpactLevel::High
    } else if impact_score >= 50 {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    };

    let statistics = ImpactStatistics {
        total_direct_impacts: direct_impacts.len(),
        total_indirect_impacts: indirect_impacts.len(),
        total_affected_tables: affected_tables.len(),
        total_affected_ctes: affected_ctes.len(),
    };

    let recommendations = recommendations(
        target,
        impact_level,
        &direct_impacts,
        &statistics,
        &affected_ctes,
    );

    ImpactResult {
        target: target.clone(),
        impact_level,
        impact_score,
        direct_impacts,
        indirect_impacts,
        affected_tables,
        affected_ctes,
        statistics,
        recommendations,
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        names.push(name.to_string());
    }
}

/// Everything reachable from the target: join partners, dependent CTEs,
/// and the tables co-referenced by those CTEs and by matching subqueries.
/// The target itself is excluded.
fn affected_sets(
    lineage: &LineageGraph,
    structure: &ParsedStructure,
    table: &str,
) -> (Vec<String>, Vec<String>) {
    let mut affected_tables = Vec::new();
    let mut affected_ctes = Vec::new();

    for join in &lineage.join_relationships {
        let other = if join.left_table.eq_ignore_ascii_case(table) {
            Some(&join.right_table)
        } else if join.right_table.eq_ignore_ascii_case(table) {
            Some(&join.left_table)
        } else {
            None
        };
        if let Some(other) = other {
            if other.eq_ignore_ascii_case(table) {
                continue;
            }
            if structure.is_cte_name(other) {
                push_unique(&mut affected_ctes, other);
            } else {
                push_unique(&mut affected_tables, other);
            }
        }
    }

    for dep in &lineage.cte_dependencies {
        let referenced = dep
            .referenced_tables
            .iter()
            .chain(&dep.referenced_ctes)
            .any(|n| n.eq_ignore_ascii_case(table));
        if !referenced {
            continue;
        }
        push_unique(&mut affected_ctes, &dep.cte_name);
        for name in &dep.referenced_tables {
            if !name.eq_ignore_ascii_case(table) {
                push_unique(&mut affected_tables, name);
            }
        }
        for name in &dep.referenced_ctes {
            if !name.eq_ignore_ascii_case(table) {
                push_unique(&mut affected_ctes, name);
            }
        }
    }

    for rel in &lineage.subquery_relationships {
        if !rel
            .referenced_tables
            .iter()
            .any(|n| n.eq_ignore_ascii_case(table))
        {
            continue;
        }
        for name in &rel.referenced_tables {
            if name.eq_ignore_ascii_case(table) {
                continue;
            }
            if structure.is_cte_name(name) {
                push_unique(&mut affected_ctes, name);
            } else {
                push_unique(&mut affected_tables, name);
            }
        }
    }

    (affected_tables, affected_ctes)
}

/// Textual occurrences of the target table (and column, when given).
fn direct_impacts(sql: &str, target: &ImpactTarget) -> Vec<DirectImpact> {
    let mut impacts = Vec::new();
    let escaped = regex::escape(&target.table);

    for (template, kind, level) in TABLE_USAGE_PATTERNS {
        let pattern = match Regex::new(&template.replace("{}", &escaped)) {
            Ok(p) => p,
            Err(_) => continue,
        };
        for found in pattern.find_iter(sql) {
            let line_number = line_of(sql, found.start());
            impacts.push(DirectImpact {
                kind: (*kind).to_string(),
                location: format!("line {line_number}"),
                line_number,
                query_snippet: snippet(sql, found.start(), found.end()),
                impact_level: *level,
                column: None,
            });
        }
    }

    if let Some(column) = &target.column {
        impacts.extend(column_impacts(sql, &target.table, column));
    }

    impacts
}

/// Occurrences of the column name, bare and table-qualified, classified by
/// the nearest preceding clause keyword. The bare pattern also matches
/// inside a qualified occurrence, so qualified usage is recorded twice;
/// that double count is part of the compatibility contract.
fn column_impacts(sql: &str, table: &str, column: &str) -> Vec<DirectImpact> {
    let escaped_column = regex::escape(column);
    let patterns = [
        format!(r"(?i)\b{escaped_column}\b"),
        format!(r"(?i)\b{}\s*\.\s*{escaped_column}\b", regex::escape(table)),
    ];
    let upper = sql.to_uppercase();
    let mut impacts = Vec::new();

    for pattern in &patterns {
        let pattern = match Regex::new(pattern) {
            Ok(p) => p,
            Err(_) => continue,
        };
        for found in pattern.find_iter(sql) {
            let before = &upper[..floor_boundary(&upper, found.start())];
            let (kind, level) = COLUMN_CONTEXTS
                .iter()
                .filter_map(|(keyword, kind, level)| {
                    before.rfind(keyword).map(|pos| (pos, *kind, *level))
                })
                .max_by_key(|(pos, _, _)| *pos)
                .map(|(_, kind, level)| (kind, level))
                .unwrap_or(("OTHER", ImpactLevel::Low));

            let line_number = line_of(sql, found.start());
            impacts.push(DirectImpact {
                kind: kind.to_string(),
                location: format!("line {line_number}"),
                line_number,
                query_snippet: snippet(sql, found.start(), found.end()),
                impact_level: level,
                column: Some(column.to_string()),
            });
        }
    }

    impacts
}

/// One-hop traversal of the lineage graph from the target table.
fn indirect_impacts(lineage: &LineageGraph, table: &str) -> Vec<crate::types::IndirectImpact> {
    use crate::types::IndirectImpact;
    let mut impacts = Vec::new();

    for join in &lineage.join_relationships {
        let other = if join.left_table.eq_ignore_ascii_case(table) {
            Some(&join.right_table)
        } else if join.right_table.eq_ignore_ascii_case(table) {
            Some(&join.left_table)
        } else {
            None
        };
        if let Some(other) = other {
            impacts.push(IndirectImpact {
                kind: issue_codes::JOIN_RELATIONSHIP.to_string(),
                related_name: other.clone(),
                impact_level: ImpactLevel::Medium,
                path: format!("{table} -> {other}"),
                join_type: Some(join.join_type),
                clause: None,
            });
        }
    }

    for dep in &lineage.cte_dependencies {
        let referenced = dep
            .referenced_tables
            .iter()
            .chain(&dep.referenced_ctes)
            .any(|n| n.eq_ignore_ascii_case(table));
        if referenced {
            impacts.push(IndirectImpact {
                kind: issue_codes::CTE_DEPENDENCY.to_string(),
                related_name: dep.cte_name.clone(),
                impact_level: ImpactLevel::Low,
                path: format!("{table} -> {} (CTE)", dep.cte_name),
                join_type: None,
                clause: None,
            });
        }
    }

    for rel in &lineage.subquery_relationships {
        if rel
            .referenced_tables
            .iter()
            .any(|n| n.eq_ignore_ascii_case(table))
        {
            let name = format!("subquery #{}", rel.subquery_index);
            impacts.push(IndirectImpact {
                kind: issue_codes::SUBQUERY_RELATIONSHIP.to_string(),
                related_name: name.clone(),
                impact_level: ImpactLevel::Low,
                path: format!("{table} -> {name}"),
                join_type: None,
                clause: Some(rel.clause),
            });
        }
    }

    impacts
}

/// Templated guidance keyed by the overall level and the tallies.
fn recommendations(
    target: &ImpactTarget,
    level: ImpactLevel,
    direct_impacts: &[DirectImpact],
    statistics: &ImpactStatistics,
    affected_ctes: &[String],
) -> Vec<ImpactRecommendation> {
    let mut recommendations = Vec::new();
    let subject = match &target.column {
        Some(column) => format!("{}.{column}", target.table),
        None => target.table.clone(),
    };

    if statistics.total_direct_impacts == 0 && statistics.total_indirect_impacts == 0 {
        recommendations.push(ImpactRecommendation {
            priority: ImpactLevel::Low,
            message: format!("No usage of '{subject}' found in this query"),
            action: "Verify the target name; the change may be safe here".to_string(),
        });
        return recommendations;
    }

    if level >= ImpactLevel::Critical {
        recommendations.push(ImpactRecommendation {
            priority: ImpactLevel::Critical,
            message: format!("'{subject}' feeds the projected output of this query"),
            action: "Coordinate the change with every consumer of the result set".to_string(),
        });
    } else if level >= ImpactLevel::High {
        recommendations.push(ImpactRecommendation {
            priority: ImpactLevel::High,
            message: format!("'{subject}' sits on a core read path"),
            action: "Update and re-test dependent queries before deploying the change".to_string(),
        });
    }

    let selected_column = direct_impacts
        .iter()
        .find(|d| d.kind == "SELECT" && d.column.is_some());
    if let Some(impact) = selected_column {
        let column = impact.column.as_deref().unwrap_or_default();
        recommendations.push(ImpactRecommendation {
            priority: ImpactLevel::High,
            message: format!("Column '{column}' is part of the projected result set"),
            action: "Renaming or dropping it changes the output shape; migrate result consumers first"
                .to_string(),
        });
    }

    if !affected_ctes.is_empty() {
        recommendations.push(ImpactRecommendation {
            priority: ImpactLevel::Medium,
            message: format!(
                "{} CTE(s) are rebuilt from '{}'",
                affected_ctes.len(),
                target.table
            ),
            action: "Review the CTE definitions for assumptions about the current shape"
                .to_string(),
        });
    }

    if statistics.total_direct_impacts + statistics.total_indirect_impacts > 10 {
        recommendations.push(ImpactRecommendation {
            priority: ImpactLevel::Medium,
            message: "The target is used in more than ten places".to_string(),
            action: "Stage the change behind a compatibility view and migrate incrementally"
                .to_string(),
        });
    }

    recommendations.push(ImpactRecommendation {
        priority: ImpactLevel::Low,
        message: "Record the schema change".to_string(),
        action: "Document the change and notify downstream owners".to_string(),
    });

    recommendations
}

/// 1-based line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    text[..floor_boundary(text, offset)]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Up to 50 characters of context on each side of a match.
fn snippet(text: &str, start: usize, end: usize) -> String {
    let from = floor_boundary(text, start.saturating_sub(50));
    let to = ceil_boundary(text, (end + 50).min(text.len()));
    text[from..to].trim().replace('\n', " ")
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::lineage;
    use crate::extractor::parse_structures;
    use crate::types::AnalysisOptions;

    fn impact_for(sql: &str, table: &str, column: Option<&str>) -> ImpactResult {
        let structures = parse_structures(sql, &AnalysisOptions::default()).unwrap();
        let structure = ParsedStructure::merge(structures, sql);
        let graph = lineage::analyze(&structure);
        let target = ImpactTarget {
            table: table.to_string(),
            column: column.map(str::to_string),
        };
        analyze(sql, &structure, &graph, &target)
    }

    #[test]
    fn test_from_usage_is_high() {
        let result = impact_for("SELECT id FROM users WHERE id = 1", "users", None);
        assert_eq!(result.direct_impacts.len(), 1);
        assert_eq!(result.direct_impacts[0].kind, "FROM");
        assert_eq!(result.direct_impacts[0].impact_level, ImpactLevel::High);
        assert_eq!(result.impact_score, 80);
        assert_eq!(result.impact_level, ImpactLevel::High);
    }

    #[test]
    fn test_update_usage_is_medium() {
        let result = impact_for("UPDATE users SET name = 'x' WHERE id = 1", "users", None);
        assert_eq!(result.direct_impacts[0].kind, "UPDATE");
        assert_eq!(result.impact_level, ImpactLevel::Medium);
    }

    #[test]
    fn test_selected_column_is_critical() {
        let result = impact_for("SELECT email FROM users WHERE id = 1", "users", Some("email"));
        let column_impact = result
            .direct_impacts
            .iter()
            .find(|d| d.column.is_some())
            .unwrap();
        assert_eq!(column_impact.kind, "SELECT");
        assert_eq!(column_impact.impact_level, ImpactLevel::Critical);
        assert_eq!(result.impact_level, ImpactLevel::Critical);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.priority == ImpactLevel::High && r.message.contains("email")));
    }

    #[test]
    fn test_qualified_column_counted_twice() {
        // The bare pattern also matches inside `users.email`, so a qualified
        // occurrence yields two direct impacts.
        let result = impact_for(
            "SELECT users.email FROM users WHERE id = 1",
            "users",
            Some("email"),
        );
        let column_hits = result
            .direct_impacts
            .iter()
            .filter(|d| d.column.is_some())
            .count();
        assert_eq!(column_hits, 2);
    }

    #[test]
    fn test_where_column_is_high() {
        let result = impact_for("SELECT id FROM users WHERE email = 'x'", "users", Some("email"));
        let column_impact = result
            .direct_impacts
            .iter()
            .find(|d| d.column.is_some())
            .unwrap();
        assert_eq!(column_impact.kind, "WHERE");
        assert_eq!(column_impact.impact_level, ImpactLevel::High);
    }

    #[test]
    fn test_line_numbers() {
        let sql = "SELECT id\nFROM users\nWHERE id = 1";
        let result = impact_for(sql, "users", None);
        assert_eq!(result.direct_impacts[0].line_number, 2);
        assert_eq!(result.direct_impacts[0].location, "line 2");
    }

    #[test]
    fn test_join_partner_is_indirect() {
        let result = impact_for(
            "SELECT * FROM users JOIN orders ON users.id = orders.user_id WHERE users.id = 1",
            "users",
            None,
        );
        let join = result
            .indirect_impacts
            .iter()
            .find(|i| i.kind == issue_codes::JOIN_RELATIONSHIP)
            .unwrap();
        assert_eq!(join.related_name, "orders");
        assert_eq!(join.path, "users -> orders");
        assert!(result.affected_tables.contains(&"orders".to_string()));
    }

    #[test]
    fn test_cte_dependency_is_indirect() {
        let result = impact_for(
            "WITH recent AS (SELECT * FROM orders WHERE ts > '2024-01-01') \
             SELECT * FROM recent",
            "orders",
            None,
        );
        let dep = result
            .indirect_impacts
            .iter()
            .find(|i| i.kind == issue_codes::CTE_DEPENDENCY)
            .unwrap();
        assert_eq!(dep.related_name, "recent");
        assert_eq!(dep.path, "orders -> recent (CTE)");
        assert_eq!(dep.impact_level, ImpactLevel::Low);
        assert_eq!(result.affected_ctes, vec!["recent"]);
        assert_eq!(result.statistics.total_affected_ctes, 1);
    }

    #[test]
    fn test_cte_co_referenced_tables_are_affected() {
        let result = impact_for(
            "WITH r AS (SELECT * FROM orders WHERE uid IN (SELECT id FROM users WHERE active > 0)) \
             SELECT * FROM r",
            "orders",
            None,
        );
        assert_eq!(result.affected_ctes, vec!["r"]);
        assert!(result.affected_tables.contains(&"users".to_string()));
        assert_eq!(
            result.statistics.total_affected_tables,
            result.affected_tables.len()
        );
    }

    #[test]
    fn test_unused_target_reports_no_usage() {
        let result = impact_for("SELECT id FROM users WHERE id = 1", "payments", None);
        assert_eq!(result.impact_score, 0);
        assert_eq!(result.impact_level, ImpactLevel::Low);
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].message.contains("No usage"));
    }

    #[test]
    fn test_snippet_window() {
        let long = format!("SELECT id FROM users WHERE {}", "x = 1 AND ".repeat(30));
        let result = impact_for(&long, "users", None);
        assert!(result.direct_impacts[0].query_snippet.len() <= 120);
        assert!(result.direct_impacts[0].query_snippet.contains("FROM users"));
    }

    #[test]
    fn test_determinism() {
        let sql = "WITH r AS (SELECT * FROM orders WHERE x = 1) \
                   SELECT * FROM r JOIN users u ON r.uid = u.id";
        let a = impact_for(sql, "orders", None);
        let b = impact_for(sql, "orders", None);
        assert_eq!(a, b);
    }
}

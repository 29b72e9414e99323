//! Complexity analysis: weighted structural metrics.

use crate::types::{
    clamp_score, ComplexityLevel, ComplexityMetrics, ComplexityReport, ParsedStructure,
};

/// Additive weight over tiered thresholds: the highest tier passed wins.
fn tiered(value: usize, tiers: &[(usize, i32)]) -> i32 {
    for &(threshold, weight) in tiers {
        if value > threshold {
            return weight;
        }
    }
    0
}

/// Scores structural complexity on a 0-100 scale (higher is more complex).
pub fn analyze(structure: &ParsedStructure, sql: &str) -> ComplexityReport {
    let union_count = sql.to_uppercase().matches("UNION").count();

    let metrics = ComplexityMetrics {
        query_length: structure.query_length,
        query_lines: structure.query_lines,
        table_count: structure.tables.len(),
        join_count: structure.joins.len(),
        subquery_count: structure.subqueries.len(),
        max_subquery_depth: structure.max_subquery_depth(),
        where_clause_count: structure.where_clauses.len(),
        column_count: structure.columns.len(),
        group_by_count: structure.group_by.len(),
        order_by_count: structure.order_by.len(),
        cte_count: structure.ctes.len(),
        union_count,
    };

    let mut raw = 0i32;
    raw += tiered(metrics.query_lines, &[(3000, 30), (1000, 20), (500, 10)]);
    raw += tiered(metrics.table_count, &[(10, 15), (5, 10), (3, 5)]);
    raw += tiered(metrics.join_count, &[(10, 15), (5, 10), (3, 5)]);
    raw += tiered(metrics.max_subquery_depth, &[(3, 15), (2, 10), (1, 5)]);
    raw += tiered(metrics.subquery_count, &[(10, 10), (5, 5)]);
    raw += tiered(metrics.where_clause_count, &[(10, 5)]);
    raw += tiered(union_count, &[(3, 5)]);

    let score = clamp_score(raw);
    let level = if score >= 70 {
        ComplexityLevel::VeryHigh
    } else if score >= 50 {
        ComplexityLevel::High
    } else if score >= 30 {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    };

    ComplexityReport {
        score,
        level,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::parse_structures;
    use crate::types::AnalysisOptions;

    fn report_for(sql: &str) -> ComplexityReport {
        let structures = parse_structures(sql, &AnalysisOptions::default()).unwrap();
        analyze(&ParsedStructure::merge(structures, sql), sql)
    }

    #[test]
    fn test_trivial_query_is_low() {
        let report = report_for("SELECT id FROM users WHERE id = 1");
        assert_eq!(report.score, 0);
        assert_eq!(report.level, ComplexityLevel::Low);
    }

    #[test]
    fn test_size_tier_counts_lines_not_characters() {
        let long_one_liner = format!(
            "SELECT id FROM t WHERE x = 1 {}",
            "AND x = 1 ".repeat(70)
        );
        let report = report_for(&long_one_liner);
        assert!(report.metrics.query_length > 500);
        assert_eq!(report.metrics.query_lines, 1);
        assert_eq!(report.score, 0);

        let many_lines = format!("SELECT id\nFROM t\nWHERE x = 1{}", "\n".repeat(600));
        assert!(report_for(&many_lines).score >= 10);
    }

    #[test]
    fn test_tiered_takes_highest_passed() {
        assert_eq!(tiered(11, &[(10, 15), (5, 10), (3, 5)]), 15);
        assert_eq!(tiered(6, &[(10, 15), (5, 10), (3, 5)]), 10);
        assert_eq!(tiered(4, &[(10, 15), (5, 10), (3, 5)]), 5);
        assert_eq!(tiered(3, &[(10, 15), (5, 10), (3, 5)]), 0);
    }

    #[test]
    fn test_joins_raise_score_monotonically() {
        let four_joins = "SELECT * FROM a \
                          JOIN b ON a.x = b.x JOIN c ON a.x = c.x \
                          JOIN d ON a.x = d.x JOIN e ON a.x = e.x WHERE a.x = 1";
        let one_join = "SELECT * FROM a JOIN b ON a.x = b.x WHERE a.x = 1";
        assert!(report_for(four_joins).score > report_for(one_join).score);
    }

    #[test]
    fn test_depth_weight() {
        let nested = "SELECT * FROM t WHERE a IN (SELECT b FROM u WHERE c IN (SELECT d FROM v))";
        let report = report_for(nested);
        assert_eq!(report.metrics.max_subquery_depth, 2);
        assert_eq!(report.score, 5);
    }

    #[test]
    fn test_metrics_reflect_structure() {
        let report = report_for("WITH r AS (SELECT * FROM o) SELECT a, b FROM r GROUP BY a, b");
        assert_eq!(report.metrics.cte_count, 1);
        assert_eq!(report.metrics.group_by_count, 2);
        assert_eq!(report.metrics.column_count, 2);
    }
}

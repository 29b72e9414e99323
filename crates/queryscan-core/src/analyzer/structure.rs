//! Structure analysis: pure counts over the fact model.

use crate::types::{ParsedStructure, StructureReport};

/// Derives the count/shape report. Performs no scoring.
pub fn analyze(structure: &ParsedStructure) -> StructureReport {
    StructureReport {
        query_type: structure.query_type,
        table_count: structure.tables.len(),
        tables: structure.table_names(),
        column_count: structure.columns.len(),
        join_count: structure.joins.len(),
        join_types: structure.joins.iter().map(|j| j.join_type).collect(),
        subquery_count: structure.subqueries.len(),
        max_subquery_depth: structure.max_subquery_depth(),
        where_clause_count: structure.where_clauses.len(),
        group_by_count: structure.group_by.len(),
        order_by_count: structure.order_by.len(),
        cte_count: structure.ctes.len(),
        query_length: structure.query_length,
        query_lines: structure.query_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::parse_structures;
    use crate::types::{AnalysisOptions, JoinType, QueryType};

    fn report_for(sql: &str) -> StructureReport {
        let structures = parse_structures(sql, &AnalysisOptions::default()).unwrap();
        analyze(&ParsedStructure::merge(structures, sql))
    }

    #[test]
    fn test_counts_for_three_way_join() {
        let report = report_for(
            "SELECT u.id, o.total FROM users u \
             JOIN orders o ON u.id = o.user_id \
             LEFT JOIN payments p ON o.id = p.order_id \
             CROSS JOIN regions",
        );
        assert_eq!(report.query_type, QueryType::Select);
        assert_eq!(report.table_count, 4);
        assert_eq!(report.join_count, 3);
        assert_eq!(
            report.join_types,
            vec![JoinType::Inner, JoinType::Left, JoinType::Cross]
        );
        assert_eq!(report.subquery_count, 0);
    }

    #[test]
    fn test_where_and_group_counts() {
        let report = report_for(
            "SELECT status, COUNT(*) FROM orders WHERE ts > '2024-01-01' \
             GROUP BY status ORDER BY COUNT(*) DESC",
        );
        assert_eq!(report.where_clause_count, 1);
        assert_eq!(report.group_by_count, 1);
        assert_eq!(report.order_by_count, 1);
    }
}

//! Lineage graph construction over tables, CTEs, joins, and subqueries.

use crate::extractor::referenced_table_names;
use crate::rules::qualified_reference_pattern;
use crate::types::{
    CteDependency, JoinRelationship, LineageGraph, ParsedStructure, SubqueryRelationship,
};

/// Placeholder when the left side of a join cannot be resolved.
const UNKNOWN_TABLE: &str = "unknown";

/// Builds the relationship graph from the fact model.
pub fn analyze(structure: &ParsedStructure) -> LineageGraph {
    let mut ctes: Vec<String> = structure.ctes.iter().map(|c| c.name.clone()).collect();
    ctes.sort();

    let mut tables: Vec<String> = structure
        .tables
        .iter()
        .filter(|t| !t.is_cte)
        .map(|t| t.name.clone())
        .collect();
    tables.sort();

    LineageGraph {
        join_relationships: resolve_join_endpoints(structure),
        cte_dependencies: cte_dependencies(structure),
        subquery_relationships: subquery_relationships(structure),
        tables,
        ctes,
    }
}

/// Pairs each join with a left-hand table.
///
/// The left side is taken from the first `name.column` qualifier in the
/// `ON` condition that is not the joined table itself, even when that
/// qualifier is an alias rather than a known table. Without a usable
/// condition the fallback is a chain: the first referenced table, then
/// each join's right side. With no prior table the left side is
/// `"unknown"`. The qualifier-first behavior can misattribute aliases in
/// multi-join statements; it is kept for report compatibility and isolated
/// here so a symbol-table approach can replace it.
fn resolve_join_endpoints(structure: &ParsedStructure) -> Vec<JoinRelationship> {
    let mut previous = structure
        .tables
        .first()
        .map(|t| t.name.clone())
        .unwrap_or_else(|| UNKNOWN_TABLE.to_string());

    structure
        .joins
        .iter()
        .map(|join| {
            let left_table = join
                .condition
                .as_deref()
                .and_then(|condition| condition_left_table(condition, &join.table))
                .unwrap_or_else(|| previous.clone());
            let relationship = JoinRelationship {
                left_table,
                right_table: join.table.clone(),
                join_type: join.join_type,
                condition: join.condition.clone(),
            };
            previous = join.table.clone();
            relationship
        })
        .collect()
}

/// First qualifier in the condition naming something other than the joined
/// table.
fn condition_left_table(condition: &str, right_table: &str) -> Option<String> {
    qualified_reference_pattern()
        .captures_iter(condition)
        .map(|caps| caps[1].to_lowercase())
        .find(|name| !name.eq_ignore_ascii_case(right_table))
}

/// Splits each CTE's referenced names into base tables and sibling CTEs.
fn cte_dependencies(structure: &ParsedStructure) -> Vec<CteDependency> {
    structure
        .ctes
        .iter()
        .map(|cte| {
            let (referenced_ctes, referenced_tables): (Vec<String>, Vec<String>) = cte
                .referenced_tables
                .iter()
                .cloned()
                .partition(|name| structure.is_cte_name(name));
            CteDependency {
                cte_name: cte.name.clone(),
                referenced_tables,
                referenced_ctes,
            }
        })
        .collect()
}

/// One relationship record per subquery, in discovery order.
fn subquery_relationships(structure: &ParsedStructure) -> Vec<SubqueryRelationship> {
    structure
        .subqueries
        .iter()
        .enumerate()
        .map(|(i, subquery)| SubqueryRelationship {
            subquery_index: i + 1,
            depth: subquery.depth,
            clause: subquery.clause,
            referenced_tables: referenced_table_names(&subquery.body),
        })
        .collect()
}

//! Analyzer result records consumed by downstream report rendering.
//!
//! Field names and nesting are part of the compatibility contract: any
//! serialization format is acceptable as long as these names are preserved.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Issue, Suggestion, Vulnerability};
use super::structure::{JoinType, QueryType, SubqueryClause};

/// Tunables for a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Maximum parenthesis nesting depth tolerated during extraction.
    /// Exceeding it aborts the run with
    /// [`crate::EngineError::RecursionLimitExceeded`].
    pub max_nesting_depth: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
        }
    }
}

/// Pure counts and shape metrics over the structural fact model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    pub query_type: QueryType,
    pub table_count: usize,
    pub tables: Vec<String>,
    pub column_count: usize,
    pub join_count: usize,
    pub join_types: Vec<JoinType>,
    pub subquery_count: usize,
    pub max_subquery_depth: usize,
    pub where_clause_count: usize,
    pub group_by_count: usize,
    pub order_by_count: usize,
    pub cte_count: usize,
    pub query_length: usize,
    pub query_lines: usize,
}

/// Performance risk level. Note the inversion: a high score means few
/// problems, so `Low` here means low risk. This mapping is preserved for
/// compatibility with the original report consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Anti-pattern findings with a 0-100 score (higher is better).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub score: u8,
    pub level: RiskLevel,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Suggestion>,
}

/// Prioritized, example-bearing optimization suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    /// Sorted by priority descending; insertion order within a tier.
    pub suggestions: Vec<Suggestion>,
    pub total_count: usize,
    pub high_priority_count: usize,
    pub medium_priority_count: usize,
    pub low_priority_count: usize,
}

/// Structural complexity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// The raw metrics the complexity score is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityMetrics {
    pub query_length: usize,
    pub query_lines: usize,
    pub table_count: usize,
    pub join_count: usize,
    pub subquery_count: usize,
    pub max_subquery_depth: usize,
    pub where_clause_count: usize,
    pub column_count: usize,
    pub group_by_count: usize,
    pub order_by_count: usize,
    pub cte_count: usize,
    pub union_count: usize,
}

/// Weighted structural complexity, 0-100 (higher is more complex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub score: u8,
    pub level: ComplexityLevel,
    pub metrics: ComplexityMetrics,
}

/// Security safety level (higher score is safer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

/// Injection/exposure findings with a 0-100 safety score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub score: u8,
    pub level: SecurityLevel,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// A join edge between two resolved relation names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRelationship {
    /// Left side; `"unknown"` when the heuristic could not resolve it.
    pub left_table: String,
    pub right_table: String,
    pub join_type: JoinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Tables and sibling CTEs a CTE body depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CteDependency {
    pub cte_name: String,
    pub referenced_tables: Vec<String>,
    pub referenced_ctes: Vec<String>,
}

/// Tables a subquery reads from. Subqueries stay anonymous: they never
/// become graph nodes, only this relationship record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubqueryRelationship {
    /// 1-based index into the discovery order.
    pub subquery_index: usize,
    pub depth: usize,
    pub clause: SubqueryClause,
    pub referenced_tables: Vec<String>,
}

/// Kind of a lineage graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Table,
    Cte,
}

/// Kind of a lineage graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Join,
    CteDep,
    SubqueryRef,
}

/// A node in the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineageNode {
    pub name: String,
    pub kind: NodeKind,
}

/// A directed edge in the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Directed relationship graph over the tables and CTEs of a query.
///
/// Built once from the fact model; read-only afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct LineageGraph {
    /// Sorted, deduplicated table names. Names that are CTE definitions are
    /// listed under `ctes` instead, never here.
    pub tables: Vec<String>,
    /// Sorted CTE names.
    pub ctes: Vec<String>,
    pub join_relationships: Vec<JoinRelationship>,
    pub cte_dependencies: Vec<CteDependency>,
    pub subquery_relationships: Vec<SubqueryRelationship>,
}

impl LineageGraph {
    /// Node view: every table and CTE, tagged with its kind.
    pub fn nodes(&self) -> Vec<LineageNode> {
        let mut nodes: Vec<LineageNode> = self
            .tables
            .iter()
            .map(|t| LineageNode {
                name: t.clone(),
                kind: NodeKind::Table,
            })
            .collect();
        nodes.extend(self.ctes.iter().map(|c| LineageNode {
            name: c.clone(),
            kind: NodeKind::Cte,
        }));
        nodes
    }

    /// Edge view over join and CTE-dependency relationships. Subquery
    /// references are kept out, matching the no-anonymous-nodes rule; they
    /// remain available in `subquery_relationships`.
    pub fn edges(&self) -> Vec<LineageEdge> {
        let mut edges: Vec<LineageEdge> = self
            .join_relationships
            .iter()
            .map(|j| LineageEdge {
                from: j.left_table.clone(),
                to: j.right_table.clone(),
                kind: EdgeKind::Join,
            })
            .collect();
        for dep in &self.cte_dependencies {
            for source in dep.referenced_tables.iter().chain(&dep.referenced_ctes) {
                edges.push(LineageEdge {
                    from: source.clone(),
                    to: dep.cte_name.clone(),
                    kind: EdgeKind::CteDep,
                });
            }
        }
        edges
    }
}

/// Impact level for a hypothetical change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// The (table, optional column) a what-if question is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactTarget {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// A textual occurrence of the target in the query itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectImpact {
    /// Usage kind: `FROM`, `JOIN`, `UPDATE`, `INSERT`, `DELETE` for table
    /// matches; the enclosing clause (`SELECT`, `WHERE`, ...) for columns.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable location, e.g. `"line 12"`.
    pub location: String,
    pub line_number: usize,
    /// Surrounding text for the match.
    pub query_snippet: String,
    pub impact_level: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// A graph-reachable impact one hop from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndirectImpact {
    /// `JOIN_RELATIONSHIP`, `CTE_DEPENDENCY`, or `SUBQUERY_RELATIONSHIP`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the reached table or CTE; for subqueries, `"subquery #N"`.
    pub related_name: String,
    pub impact_level: ImpactLevel,
    /// Traversal path, e.g. `"orders -> recent (CTE)"`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause: Option<SubqueryClause>,
}

/// Tally block carried alongside the impact lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStatistics {
    pub total_direct_impacts: usize,
    pub total_indirect_impacts: usize,
    pub total_affected_tables: usize,
    pub total_affected_ctes: usize,
}

/// A templated what-to-do entry keyed by impact level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRecommendation {
    pub priority: ImpactLevel,
    pub message: String,
    pub action: String,
}

/// Answer to "what breaks if this table/column changes?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactResult {
    pub target: ImpactTarget,
    pub impact_level: ImpactLevel,
    pub impact_score: u8,
    pub direct_impacts: Vec<DirectImpact>,
    pub indirect_impacts: Vec<IndirectImpact>,
    pub affected_tables: Vec<String>,
    pub affected_ctes: Vec<String>,
    pub statistics: ImpactStatistics,
    pub recommendations: Vec<ImpactRecommendation>,
}

/// Aggregate result of the full analysis pipeline for one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysis {
    pub structure: StructureReport,
    pub performance: PerformanceReport,
    pub optimization: OptimizationReport,
    pub complexity: ComplexityReport,
    pub security: SecurityReport,
    pub lineage: LineageGraph,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_depth() {
        assert_eq!(AnalysisOptions::default().max_nesting_depth, 64);
    }

    #[test]
    fn test_lineage_nodes_tag_ctes() {
        let graph = LineageGraph {
            tables: vec!["orders".into()],
            ctes: vec!["recent".into()],
            ..Default::default()
        };
        let nodes = graph.nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, NodeKind::Table);
        assert_eq!(nodes[1].kind, NodeKind::Cte);
    }

    #[test]
    fn test_lineage_edges_exclude_subqueries() {
        let graph = LineageGraph {
            tables: vec!["orders".into()],
            ctes: vec!["recent".into()],
            cte_dependencies: vec![CteDependency {
                cte_name: "recent".into(),
                referenced_tables: vec!["orders".into()],
                referenced_ctes: vec![],
            }],
            subquery_relationships: vec![SubqueryRelationship {
                subquery_index: 1,
                depth: 1,
                clause: SubqueryClause::Where,
                referenced_tables: vec!["orders".into()],
            }],
            ..Default::default()
        };
        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::CteDep);
        assert_eq!(edges[0].from, "orders");
        assert_eq!(edges[0].to, "recent");
    }

    #[test]
    fn test_complexity_level_wire_name() {
        let json = serde_json::to_value(ComplexityLevel::VeryHigh).unwrap();
        assert_eq!(json, "VERY_HIGH");
    }

    #[test]
    fn test_impact_level_ordering() {
        assert!(ImpactLevel::Critical > ImpactLevel::High);
        assert!(ImpactLevel::Medium > ImpactLevel::Low);
    }
}

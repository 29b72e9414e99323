//! The structural fact model extracted from one statement.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Grant,
    #[default]
    Unknown,
}

impl QueryType {
    pub(crate) fn from_keyword(word: &str) -> Self {
        match word.to_uppercase().as_str() {
            "SELECT" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            "CREATE" => QueryType::Create,
            "DROP" => QueryType::Drop,
            "ALTER" => QueryType::Alter,
            "GRANT" => QueryType::Grant,
            _ => QueryType::Unknown,
        }
    }
}

/// Join flavor, one entry per `JOIN` keyword occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Cross => "CROSS",
        };
        f.write_str(s)
    }
}

/// A referenced relation, deduplicated case-insensitively by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    /// Normalized (case-folded) name.
    pub name: String,
    /// True when the name is defined by a CTE in the same statement.
    pub is_cte: bool,
}

/// One join clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinInfo {
    pub join_type: JoinType,
    /// Normalized name of the joined (right-hand) table.
    pub table: String,
    /// Raw `ON` condition text, absent for `CROSS JOIN` and bare joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Clause a subquery was discovered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubqueryClause {
    Select,
    From,
    Where,
    #[default]
    Unknown,
}

/// A nested `SELECT`, stored flat in an arena vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubqueryInfo {
    /// Parenthesis nesting count at discovery; the top-level statement is 0,
    /// so the first nested SELECT is at depth 1.
    pub depth: usize,
    /// Nearest enclosing clause keyword.
    pub clause: SubqueryClause,
    /// Raw body text from the nested SELECT to its closing parenthesis.
    pub body: String,
    /// Arena index of the enclosing subquery, absent for depth-1 entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
}

/// A `WITH`-clause definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CteInfo {
    /// Normalized name. Unique within a statement; when two definitions
    /// share a name the later one replaces the earlier.
    pub name: String,
    /// Raw body text between the defining parentheses.
    pub body: String,
    /// Normalized names of tables the body reads from.
    pub referenced_tables: Vec<String>,
}

/// The extracted, dialect-tolerant summary of one SQL statement.
///
/// Built once per analysis run and immutable afterward. No field is ever
/// null; unset collections are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParsedStructure {
    pub query_type: QueryType,
    pub tables: Vec<TableRef>,
    pub columns: Vec<String>,
    pub joins: Vec<JoinInfo>,
    pub subqueries: Vec<SubqueryInfo>,
    pub ctes: Vec<CteInfo>,
    /// Raw WHERE fragments, one per WHERE clause encountered.
    pub where_clauses: Vec<String>,
    /// GROUP BY items.
    pub group_by: Vec<String>,
    /// ORDER BY items.
    pub order_by: Vec<String>,
    pub query_length: usize,
    pub query_lines: usize,
}

impl ParsedStructure {
    /// Maximum subquery nesting depth, 0 when there are no subqueries.
    pub fn max_subquery_depth(&self) -> usize {
        self.subqueries.iter().map(|s| s.depth).max().unwrap_or(0)
    }

    /// Normalized table names in first-occurrence order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// True when `name` is defined as a CTE in this statement.
    pub fn is_cte_name(&self, name: &str) -> bool {
        self.ctes.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Folds per-statement structures into one aggregate for the pipeline.
    ///
    /// Tables are re-deduplicated across statements; list fields are
    /// concatenated in statement order. Length and line counts describe the
    /// whole input, not a single statement.
    pub fn merge(structures: Vec<ParsedStructure>, full_text: &str) -> ParsedStructure {
        let mut merged = ParsedStructure {
            query_type: structures
                .first()
                .map(|s| s.query_type)
                .unwrap_or_default(),
            query_length: full_text.len(),
            query_lines: full_text.lines().count().max(1),
            ..ParsedStructure::default()
        };

        for structure in structures {
            for table in structure.tables {
                if !merged
                    .tables
                    .iter()
                    .any(|t| t.name.eq_ignore_ascii_case(&table.name))
                {
                    merged.tables.push(table);
                }
            }
            merged.columns.extend(structure.columns);
            merged.joins.extend(structure.joins);
            merged.subqueries.extend(structure.subqueries);
            for cte in structure.ctes {
                match merged.ctes.iter_mut().find(|c| c.name == cte.name) {
                    Some(existing) => *existing = cte,
                    None => merged.ctes.push(cte),
                }
            }
            merged.where_clauses.extend(structure.where_clauses);
            merged.group_by.extend(structure.group_by);
            merged.order_by.extend(structure.order_by);
        }

        // A CTE name that also appears as a table keeps its CTE designation.
        let cte_names: Vec<String> = merged.ctes.iter().map(|c| c.name.clone()).collect();
        for table in &mut merged.tables {
            if cte_names.iter().any(|n| n.eq_ignore_ascii_case(&table.name)) {
                table.is_cte = true;
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_depth_empty() {
        let structure = ParsedStructure::default();
        assert_eq!(structure.max_subquery_depth(), 0);
    }

    #[test]
    fn test_merge_dedups_tables_case_insensitively() {
        let a = ParsedStructure {
            tables: vec![TableRef {
                name: "users".into(),
                is_cte: false,
            }],
            ..Default::default()
        };
        let b = ParsedStructure {
            tables: vec![TableRef {
                name: "USERS".into(),
                is_cte: false,
            }],
            ..Default::default()
        };
        let merged = ParsedStructure::merge(vec![a, b], "x");
        assert_eq!(merged.tables.len(), 1);
    }

    #[test]
    fn test_merge_cte_last_wins() {
        let a = ParsedStructure {
            ctes: vec![CteInfo {
                name: "recent".into(),
                body: "SELECT 1".into(),
                referenced_tables: vec![],
            }],
            ..Default::default()
        };
        let b = ParsedStructure {
            ctes: vec![CteInfo {
                name: "recent".into(),
                body: "SELECT 2".into(),
                referenced_tables: vec![],
            }],
            ..Default::default()
        };
        let merged = ParsedStructure::merge(vec![a, b], "x");
        assert_eq!(merged.ctes.len(), 1);
        assert_eq!(merged.ctes[0].body, "SELECT 2");
    }

    #[test]
    fn test_merge_marks_cte_tables() {
        let structure = ParsedStructure {
            tables: vec![TableRef {
                name: "recent".into(),
                is_cte: false,
            }],
            ctes: vec![CteInfo {
                name: "recent".into(),
                body: "SELECT * FROM orders".into(),
                referenced_tables: vec!["orders".into()],
            }],
            ..Default::default()
        };
        let merged = ParsedStructure::merge(vec![structure], "x");
        assert!(merged.tables[0].is_cte);
    }

    #[test]
    fn test_query_type_from_keyword() {
        assert_eq!(QueryType::from_keyword("select"), QueryType::Select);
        assert_eq!(QueryType::from_keyword("MERGE"), QueryType::Unknown);
    }
}

//! Finding types shared across the analyzers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Severity of an issue or vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Priority of an optimization suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank; higher sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

/// A flagged anti-pattern produced by the performance analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Machine-readable issue code, see [`issue_codes`].
    #[serde(rename = "type")]
    pub code: String,

    /// Severity level.
    pub severity: Severity,

    /// Human-readable message.
    pub message: String,

    /// What the anti-pattern costs at runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

impl Issue {
    pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            impact: None,
        }
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }
}

/// A flagged security weakness produced by the security analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    /// Machine-readable code, see [`issue_codes`].
    #[serde(rename = "type")]
    pub code: String,

    /// Severity level.
    pub severity: Severity,

    /// Human-readable message.
    pub message: String,

    /// What an attacker could gain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,

    /// How to remediate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Vulnerability {
    pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            impact: None,
            recommendation: None,
        }
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// An actionable recommendation produced by the optimization advisor or as
/// a companion to a performance issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Machine-readable code, see [`issue_codes`].
    #[serde(rename = "type")]
    pub code: String,

    /// Priority tier, drives report ordering.
    pub priority: Priority,

    /// Human-readable message.
    pub message: String,

    /// Literal SQL or prose example of the suggested change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    /// Rough expected improvement range, e.g. `"30-50%"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_improvement: Option<String>,
}

impl Suggestion {
    pub fn new(code: impl Into<String>, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            priority,
            message: message.into(),
            example: None,
            expected_improvement: None,
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn with_expected_improvement(mut self, range: impl Into<String>) -> Self {
        self.expected_improvement = Some(range.into());
        self
    }
}

/// Clamps a raw score into the documented `[0, 100]` range.
pub(crate) fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Machine-readable finding codes.
pub mod issue_codes {
    // Performance issues
    pub const NO_WHERE_CLAUSE: &str = "NO_WHERE_CLAUSE";
    pub const FUNCTION_IN_WHERE: &str = "FUNCTION_IN_WHERE";
    pub const FUNCTION_IN_JOIN: &str = "FUNCTION_IN_JOIN";
    pub const FUNCTION_IN_ORDER_BY: &str = "FUNCTION_IN_ORDER_BY";
    pub const CROSS_JOIN: &str = "CROSS_JOIN";
    pub const JOIN_WITHOUT_CONDITION: &str = "JOIN_WITHOUT_CONDITION";
    pub const DEEP_NESTED_SUBQUERY: &str = "DEEP_NESTED_SUBQUERY";
    pub const TOO_MANY_SUBQUERIES: &str = "TOO_MANY_SUBQUERIES";
    pub const TOO_MANY_DISTINCT: &str = "TOO_MANY_DISTINCT";
    pub const LARGE_OFFSET: &str = "LARGE_OFFSET";
    pub const FUNCTION_USAGE: &str = "FUNCTION_USAGE";

    // Suggestions
    pub const INDEX: &str = "INDEX";
    pub const QUERY_REFACTOR: &str = "QUERY_REFACTOR";
    pub const JOIN_OPTIMIZATION: &str = "JOIN_OPTIMIZATION";
    pub const CONDITION_OPTIMIZATION: &str = "CONDITION_OPTIMIZATION";
    pub const AGGREGATION_OPTIMIZATION: &str = "AGGREGATION_OPTIMIZATION";
    pub const PAGINATION_OPTIMIZATION: &str = "PAGINATION_OPTIMIZATION";

    // Security vulnerabilities
    pub const STRING_CONCATENATION: &str = "STRING_CONCATENATION";
    pub const DYNAMIC_QUERY: &str = "DYNAMIC_QUERY";
    pub const DIRECT_INPUT: &str = "DIRECT_INPUT";
    pub const EXCESSIVE_PERMISSION: &str = "EXCESSIVE_PERMISSION";
    pub const SELECT_ALL: &str = "SELECT_ALL";
    pub const UNION_INJECTION_PATTERN: &str = "UNION_INJECTION_PATTERN";

    // Indirect impact kinds
    pub const JOIN_RELATIONSHIP: &str = "JOIN_RELATIONSHIP";
    pub const CTE_DEPENDENCY: &str = "CTE_DEPENDENCY";
    pub const SUBQUERY_RELATIONSHIP: &str = "SUBQUERY_RELATIONSHIP";
}

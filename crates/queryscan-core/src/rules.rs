//! Immutable rule catalogs.
//!
//! Issue and vulnerability rules are represented as data (pattern, severity,
//! message) rather than hard-coded branches, compiled once behind
//! `OnceLock`, so each rule is independently testable and extensible.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{issue_codes, Severity};

/// A pattern rule evaluated by the security analyzer over normalized text.
pub struct SecurityRule {
    pub code: &'static str,
    pub severity: Severity,
    /// Matches below this count are ignored (1 for most rules).
    pub min_matches: usize,
    pub message: &'static str,
    pub impact: &'static str,
    pub recommendation: &'static str,
    pattern: Regex,
}

impl SecurityRule {
    /// Number of matches in `text`.
    pub fn count_matches(&self, text: &str) -> usize {
        self.pattern.find_iter(text).count()
    }
}

/// The security rule catalog.
pub fn security_rules() -> &'static [SecurityRule] {
    static RULES: OnceLock<Vec<SecurityRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            SecurityRule {
                code: issue_codes::STRING_CONCATENATION,
                severity: Severity::High,
                min_matches: 1,
                message: "String concatenation operator adjacent to a quote",
                impact: "Possible SQL injection via concatenation",
                recommendation: "Use parameterized queries",
                pattern: Regex::new(r#"\+\s*['"]|['"]\s*\+"#).expect("invalid pattern"),
            },
            // Each dynamic-execution form is its own rule so that stacked
            // forms in one statement each cost a deduction.
            SecurityRule {
                code: issue_codes::DYNAMIC_QUERY,
                severity: Severity::Critical,
                min_matches: 1,
                message: "EXEC() call detected",
                impact: "SQL injection through dynamically built statements",
                recommendation: "Use static queries or strict input validation",
                pattern: Regex::new(r"(?i)\bEXEC\s*\(").expect("invalid pattern"),
            },
            SecurityRule {
                code: issue_codes::DYNAMIC_QUERY,
                severity: Severity::Critical,
                min_matches: 1,
                message: "EXECUTE IMMEDIATE detected",
                impact: "SQL injection through dynamically built statements",
                recommendation: "Use static queries or strict input validation",
                pattern: Regex::new(r"(?i)EXECUTE\s+IMMEDIATE").expect("invalid pattern"),
            },
            SecurityRule {
                code: issue_codes::DYNAMIC_QUERY,
                severity: Severity::Critical,
                min_matches: 1,
                message: "PREPARE ... FROM detected",
                impact: "SQL injection through dynamically built statements",
                recommendation: "Use static queries or strict input validation",
                pattern: Regex::new(r"(?i)PREPARE\s+\w+\s+FROM").expect("invalid pattern"),
            },
            SecurityRule {
                code: issue_codes::DIRECT_INPUT,
                severity: Severity::High,
                min_matches: 1,
                message: "Variable interpolation placeholder detected",
                impact: "Possible SQL injection via unescaped interpolation",
                recommendation: "Use parameterized queries",
                pattern: Regex::new(r"\$\{?\w+\}?|%s|%d").expect("invalid pattern"),
            },
            SecurityRule {
                code: issue_codes::EXCESSIVE_PERMISSION,
                severity: Severity::Medium,
                min_matches: 1,
                message: "GRANT ALL detected",
                impact: "Excessive privilege grant",
                recommendation: "Apply the principle of least privilege",
                pattern: Regex::new(r"(?i)GRANT\s+ALL").expect("invalid pattern"),
            },
            SecurityRule {
                code: issue_codes::SELECT_ALL,
                severity: Severity::Low,
                min_matches: 3,
                message: "SELECT * used repeatedly",
                impact: "Unnecessary data exposure",
                recommendation: "Select only the columns that are needed",
                pattern: Regex::new(r"(?i)SELECT\s+\*").expect("invalid pattern"),
            },
            SecurityRule {
                code: issue_codes::UNION_INJECTION_PATTERN,
                severity: Severity::Medium,
                min_matches: 1,
                message: "UNION SELECT NULL pattern detected",
                impact: "Union-based injection signature",
                recommendation: "Validate inputs and whitelist allowed values",
                pattern: Regex::new(r"(?i)UNION\s+SELECT\s+NULL").expect("invalid pattern"),
            },
        ]
    })
}

/// Functions whose heavy use defeats index lookups. One issue is raised per
/// function exceeding [`FUNCTION_USAGE_THRESHOLD`] occurrences.
pub fn index_hostile_functions() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (Regex::new(r"(?i)UPPER\s*\(").expect("invalid pattern"), "UPPER"),
            (Regex::new(r"(?i)LOWER\s*\(").expect("invalid pattern"), "LOWER"),
            (Regex::new(r"(?i)TRIM\s*\(").expect("invalid pattern"), "TRIM"),
            (
                Regex::new(r"(?i)SUBSTRING\s*\(").expect("invalid pattern"),
                "SUBSTRING",
            ),
            (Regex::new(r"(?i)CAST\s*\(").expect("invalid pattern"), "CAST"),
            (Regex::new(r"::\s*\w+").expect("invalid pattern"), "type cast"),
        ]
    })
}

/// Per-function occurrence count above which heavy use is flagged.
pub const FUNCTION_USAGE_THRESHOLD: usize = 3;

/// A function call wrapping something, e.g. `UPPER(name)`.
pub fn function_call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w+\s*\(").expect("invalid pattern"))
}

/// A column compared against something in a WHERE fragment.
pub fn where_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\w+)\s*[=<>!]").expect("invalid pattern"))
}

/// A column on one side of an equality in a join condition.
pub fn join_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\w+)\s*=").expect("invalid pattern"))
}

/// A qualified `name.column` reference with the qualifier captured.
pub fn qualified_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\w+)\s*\.\s*\w+").expect("invalid pattern"))
}

/// `OFFSET <n>` with its numeric argument captured.
pub fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)OFFSET\s+(\d+)").expect("invalid pattern"))
}

/// An `IN (SELECT ...)` membership test.
pub fn in_subquery_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bIN\s*\(\s*SELECT").expect("invalid pattern"))
}

/// `COUNT(column)` as opposed to `COUNT(*)`.
pub fn count_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)COUNT\s*\(\s*\w+\s*\)").expect("invalid pattern"))
}

/// Words matched by the column patterns that are not columns.
pub const NON_COLUMN_WORDS: &[&str] = &[
    "AND", "OR", "NOT", "IN", "LIKE", "BETWEEN", "ON", "IS", "NULL", "EXISTS",
];

/// True if `word` is an operator keyword rather than a column name.
pub fn is_non_column_word(word: &str) -> bool {
    let upper = word.to_uppercase();
    NON_COLUMN_WORDS.contains(&upper.as_str())
}

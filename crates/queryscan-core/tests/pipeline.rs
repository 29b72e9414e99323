//! End-to-end tests through the public entry points.

use queryscan_core::{
    analyze, analyze_impact, issue_codes, split_statements, ComplexityLevel, EngineError,
    ImpactLevel, ImpactTarget, JoinType, QueryType, RiskLevel, SecurityLevel,
};
use rstest::rstest;

const THREE_JOIN_QUERY: &str = "SELECT u.id, o.total, p.amount, r.name \
    FROM users u \
    JOIN orders o ON u.id = o.user_id \
    LEFT JOIN payments p ON o.id = p.order_id \
    CROSS JOIN regions r \
    WHERE u.active = 1";

#[test]
fn three_join_query_counts() {
    let analysis = analyze(THREE_JOIN_QUERY).unwrap();
    assert_eq!(analysis.structure.query_type, QueryType::Select);
    assert_eq!(analysis.structure.join_count, 3);
    assert_eq!(analysis.structure.table_count, 4);
    assert_eq!(
        analysis.structure.join_types,
        vec![JoinType::Inner, JoinType::Left, JoinType::Cross]
    );
}

#[test]
fn analysis_is_idempotent() {
    let first = serde_json::to_string(&analyze(THREE_JOIN_QUERY).unwrap()).unwrap();
    let second = serde_json::to_string(&analyze(THREE_JOIN_QUERY).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_where_caps_performance_score() {
    let analysis = analyze("SELECT * FROM users").unwrap();
    assert!(analysis
        .performance
        .issues
        .iter()
        .any(|i| i.code == issue_codes::NO_WHERE_CLAUSE));
    assert!(analysis.performance.score <= 85);
}

#[test]
fn concatenation_caps_security_score() {
    let analysis =
        analyze("SELECT * FROM users WHERE name = '\" + userName + \"'").unwrap();
    assert!(analysis
        .security
        .vulnerabilities
        .iter()
        .any(|v| v.code == issue_codes::STRING_CONCATENATION));
    assert!(analysis.security.score <= 80);
    assert_ne!(analysis.security.level, SecurityLevel::Safe);
}

#[test]
fn cte_produces_dependency_edge() {
    let analysis = analyze(
        "WITH recent AS (SELECT * FROM orders WHERE ts > '2024-01-01') \
         SELECT * FROM recent",
    )
    .unwrap();
    let edges = analysis.lineage.edges();
    assert!(edges
        .iter()
        .any(|e| e.from == "orders" && e.to == "recent"));
    assert_eq!(analysis.lineage.ctes, vec!["recent"]);
    assert_eq!(analysis.lineage.tables, vec!["orders"]);
}

#[test]
fn complexity_is_monotonic_in_joins() {
    let simple = analyze("SELECT id FROM a WHERE id = 1").unwrap();
    let complex = analyze(
        "SELECT * FROM a \
         JOIN b ON a.x = b.x JOIN c ON a.x = c.x \
         JOIN d ON a.x = d.x JOIN e ON a.x = e.x \
         WHERE a.x IN (SELECT y FROM f WHERE z IN (SELECT w FROM g))",
    )
    .unwrap();
    assert!(complex.complexity.score > simple.complexity.score);
    assert_eq!(simple.complexity.level, ComplexityLevel::Low);
}

#[rstest]
#[case("")]
#[case("   \n\t ")]
#[case("-- just a comment\n/* and another */")]
fn empty_inputs_are_rejected(#[case] sql: &str) {
    assert_eq!(analyze(sql).unwrap_err(), EngineError::EmptyInput);
}

#[test]
fn duplicate_cte_keeps_last_definition() {
    let analysis = analyze(
        "WITH x AS (SELECT * FROM t1 WHERE a = 1), x AS (SELECT * FROM t2 WHERE b = 2) \
         SELECT * FROM x",
    )
    .unwrap();
    assert_eq!(analysis.structure.cte_count, 1);
    let dep = &analysis.lineage.cte_dependencies[0];
    assert_eq!(dep.referenced_tables, vec!["t2"]);
}

#[test]
fn impact_is_deterministic() {
    let sql = "WITH r AS (SELECT * FROM orders WHERE x = 1) \
               SELECT * FROM r JOIN users u ON r.uid = u.id";
    let target = ImpactTarget {
        table: "orders".to_string(),
        column: None,
    };
    let first = serde_json::to_string(&analyze_impact(sql, &target).unwrap()).unwrap();
    let second = serde_json::to_string(&analyze_impact(sql, &target).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn impact_of_selected_column_is_critical() {
    let target = ImpactTarget {
        table: "users".to_string(),
        column: Some("email".to_string()),
    };
    let result = analyze_impact("SELECT email FROM users WHERE id = 1", &target).unwrap();
    assert_eq!(result.impact_level, ImpactLevel::Critical);
    assert!(!result.recommendations.is_empty());
    assert_eq!(
        result.statistics.total_direct_impacts,
        result.direct_impacts.len()
    );
}

#[test]
fn multi_statement_input_merges_tables() {
    let analysis = analyze("SELECT * FROM a WHERE x = 1; SELECT * FROM b WHERE y = 2;").unwrap();
    assert_eq!(analysis.structure.tables, vec!["a", "b"]);
    assert_eq!(analysis.structure.where_clause_count, 2);
}

#[test]
fn split_statements_ignores_quoted_semicolons() {
    let parts = split_statements("SELECT 'a;b' FROM t; SELECT 1");
    assert_eq!(parts.len(), 2);
}

#[rstest]
#[case("SELECT id FROM users WHERE id = 1", RiskLevel::Low)]
#[case("SELECT * FROM a CROSS JOIN b JOIN c", RiskLevel::High)]
fn performance_levels(#[case] sql: &str, #[case] expected: RiskLevel) {
    assert_eq!(analyze(sql).unwrap().performance.level, expected);
}

#[test]
fn optimization_counts_are_consistent() {
    let analysis = analyze(THREE_JOIN_QUERY).unwrap();
    let report = &analysis.optimization;
    assert_eq!(
        report.total_count,
        report.high_priority_count + report.medium_priority_count + report.low_priority_count
    );
    assert_eq!(report.total_count, report.suggestions.len());
}

#[test]
fn serialized_field_names_are_stable() {
    let analysis = analyze("SELECT * FROM users").unwrap();
    let json = serde_json::to_value(&analysis).unwrap();
    assert!(json["structure"]["tableCount"].is_number());
    assert!(json["performance"]["issues"][0]["type"].is_string());
    assert_eq!(json["performance"]["issues"][0]["severity"], "HIGH");
    assert!(json["lineage"]["joinRelationships"].is_array());
}

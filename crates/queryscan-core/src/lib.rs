pub mod analyzer;
pub mod error;
pub mod extractor;
pub mod rules;
pub mod tokenizer;
pub mod types;

// Re-export main entry points
pub use analyzer::{analyze, analyze_impact, analyze_impact_with_options, analyze_with_options};
pub use error::EngineError;
pub use extractor::parse_structures;
pub use tokenizer::split_statements;

// Re-export types explicitly
pub use types::{
    // Issue codes
    issue_codes,
    AnalysisOptions,
    ComplexityLevel,
    ComplexityMetrics,
    ComplexityReport,
    CteDependency,
    CteInfo,
    DirectImpact,
    EdgeKind,
    ImpactLevel,
    ImpactRecommendation,
    ImpactResult,
    ImpactStatistics,
    ImpactTarget,
    IndirectImpact,
    Issue,
    JoinInfo,
    JoinRelationship,
    JoinType,
    LineageEdge,
    LineageGraph,
    LineageNode,
    NodeKind,
    OptimizationReport,
    ParsedStructure,
    PerformanceReport,
    Priority,
    QueryAnalysis,
    QueryType,
    RiskLevel,
    SecurityLevel,
    SecurityReport,
    Severity,
    StructureReport,
    SubqueryClause,
    SubqueryInfo,
    SubqueryRelationship,
    Suggestion,
    TableRef,
    Vulnerability,
};

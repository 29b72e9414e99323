//! Data model: fact-model entities, finding types, and analyzer reports.

mod common;
mod response;
mod structure;

pub use common::{issue_codes, Issue, Priority, Severity, Suggestion, Vulnerability};
pub(crate) use common::clamp_score;
pub use response::{
    AnalysisOptions, ComplexityLevel, ComplexityMetrics, ComplexityReport, CteDependency,
    DirectImpact, EdgeKind, ImpactLevel, ImpactRecommendation, ImpactResult, ImpactStatistics,
    ImpactTarget, IndirectImpact, JoinRelationship, LineageEdge, LineageGraph, LineageNode,
    NodeKind, OptimizationReport, PerformanceReport, QueryAnalysis, RiskLevel, SecurityLevel,
    SecurityReport, StructureReport, SubqueryRelationship,
};
pub use structure::{
    CteInfo, JoinInfo, JoinType, ParsedStructure, QueryType, SubqueryClause, SubqueryInfo,
    TableRef,
};

//! The analysis pipeline.
//!
//! Extraction runs once per input; every analyzer is a pure function over
//! the merged fact model (plus the raw text for the regex-based checks).
//! Running the pipeline twice on the same input yields identical results.

pub(crate) mod complexity;
pub(crate) mod impact;
pub(crate) mod lineage;
pub(crate) mod optimization;
pub(crate) mod performance;
pub(crate) mod security;
pub(crate) mod structure;

use crate::error::EngineError;
use crate::extractor::parse_structures;
use crate::types::{
    AnalysisOptions, ImpactResult, ImpactTarget, ParsedStructure, QueryAnalysis,
};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Runs the full pipeline with default options.
pub fn analyze(sql: &str) -> Result<QueryAnalysis, EngineError> {
    analyze_with_options(sql, &AnalysisOptions::default())
}

/// Runs the full pipeline: extraction, then every analyzer in order.
pub fn analyze_with_options(
    sql: &str,
    options: &AnalysisOptions,
) -> Result<QueryAnalysis, EngineError> {
    let structures = parse_structures(sql, options)?;
    let merged = ParsedStructure::merge(structures, sql);

    #[cfg(feature = "tracing")]
    debug!(
        lines = merged.query_lines,
        tables = merged.tables.len(),
        "running analysis pipeline"
    );

    let structure = structure::analyze(&merged);
    let performance = performance::analyze(&merged, sql);
    let optimization = optimization::analyze(&merged, &performance, sql);
    let complexity = complexity::analyze(&merged, sql);
    let security = security::analyze(sql);
    let lineage = lineage::analyze(&merged);

    Ok(QueryAnalysis {
        structure,
        performance,
        optimization,
        complexity,
        security,
        lineage,
    })
}

/// Answers "what breaks if this target changes?" with default options.
pub fn analyze_impact(sql: &str, target: &ImpactTarget) -> Result<ImpactResult, EngineError> {
    analyze_impact_with_options(sql, target, &AnalysisOptions::default())
}

/// Impact analysis over the same extraction and lineage the full pipeline
/// uses, so the two entry points never disagree about relationships.
pub fn analyze_impact_with_options(
    sql: &str,
    target: &ImpactTarget,
    options: &AnalysisOptions,
) -> Result<ImpactResult, EngineError> {
    let structures = parse_structures(sql, options)?;
    let merged = ParsedStructure::merge(structures, sql);
    let graph = lineage::analyze(&merged);
    Ok(impact::analyze(sql, &merged, &graph, target))
}

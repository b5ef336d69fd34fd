//! Competitive feature-set enrichment for latent factor decompositions.
//!
//! Tests whether annotated feature sets (pathways, signatures, modules) are
//! preferentially associated with the factors of a trained decomposition
//! (PCA, factor analysis, NMF), under a competitive null: the statistics of
//! set members are compared against the statistics of non-members.
//!
//! Pipeline stages, each usable on its own:
//!
//! - **Feature statistics** — per-feature factor association (loading,
//!   correlation, Fisher's z) in [`feature_stats`]
//! - **Set statistics** — two-sample mean-difference and rank-sum engines,
//!   with optional intra-set correlation adjustment, in [`set_statistics`]
//! - **Permutation null** — empirical p-values from feature-axis
//!   permutations in [`permutation`]
//! - **Multiple testing correction** — Bonferroni through
//!   Benjamini-Yekutieli in [`correction`]
//! - **Orchestration** — [`enrichment::run_enrichment`] wires the stages
//!   together over named matrices
//!
//! Enable the `parallel` feature to fan permutation trials out over a rayon
//! pool, and `serde` to (de)serialize configurations and results.

pub mod correction;
pub mod correlation;
pub mod descriptive;
pub mod distribution;
pub mod enrichment;
pub mod feature_sets;
pub mod feature_stats;
pub mod matrix;
pub mod permutation;
pub mod rank;
pub mod set_statistics;

pub use enrichment::{run_enrichment, EnrichmentConfig, EnrichmentResults, FactorSelection, TestMode};
pub use matrix::NamedMatrix;
pub use velella_core::{Result, VelellaError};

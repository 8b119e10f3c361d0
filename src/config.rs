use serde::{Deserialize, Serialize};

/// Tunable constants for the assembly engine.
///
/// Every constant here corresponds to one of the empirical thresholds
/// spec.md's "Open questions" section flags as unjustified in the source
/// material. None of the defaults are re-derived; they match the original
/// HISAT-genotype implementation's literal values so behavior is preserved
/// unless a caller opts into something different.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mismatch budget per base used by `overlap_with`, in mismatches per
    /// base (`0.012` == roughly 1 mismatch per 83 bases).
    pub overlap_mismatch_budget_per_base: f64,
    /// Half-width of the shift search window `overlap_with` scans around
    /// the naive ungapped anchor.
    pub overlap_shift_window: i64,
    /// Mismatch score assigned when two cells disagree on `var_id` before
    /// the coverage-based adjustment is applied.
    pub overlap_variant_conflict_mismatch: f64,
    /// Minimum overlap percentage (of the shorter node's ungapped length)
    /// required to accept a raw edge in `generate_raw_edges`.
    pub raw_edge_overlap_pct: f64,
    /// Minimum overlap percentage used when `reduce` regenerates edges.
    pub reduce_overlap_pct: f64,
    /// Overlap percentage used by the guided contractor when it
    /// regenerates edges between iterations.
    pub contractor_overlap_pct: f64,
    /// Reciprocal overlap ceiling below which a node is still considered
    /// for a jump edge even though it already has one "to" edge.
    pub jump_edge_existing_overlap_pct: f64,
    /// Reciprocal overlap ceiling above which two nodes are considered
    /// too overlapping to bridge with a jump edge.
    pub jump_edge_candidate_overlap_pct: f64,
    /// Maximum number of jump edges added per node.
    pub max_jump_edges_per_node: usize,
    /// Minimum overlap, in bases, considered by `remove_low_cov_nodes`.
    pub low_cov_min_overlap_bases: i64,
    /// Coverage floor below which a node is eligible for low-coverage
    /// removal.
    pub low_cov_threshold: f64,
    /// Minimum overlap proportion required before a low-coverage node can
    /// be removed in favor of an overlapping higher-coverage node.
    pub low_cov_overlap_pct_floor: f64,
    /// Mate-pair mode dominance multiplier in 1-to-2 / 2-to-1 junction
    /// resolution.
    pub contractor_mate_multiplier: f64,
    /// Allele-guided mode dominance multiplier (spec: `1`, i.e. no slack).
    pub contractor_allele_multiplier: f64,
    /// Hard cap on guided-contractor iterations.
    pub contractor_max_iterations: usize,
    /// De Bruijn k-mer size.
    pub debruijn_k: usize,
    /// Standard-mode deletion ratio: a vertex is pruned when its score
    /// times this exceeds the column's relative average (>= 3 vertices).
    pub debruijn_multi_vertex_ratio: f64,
    /// Standard-mode deletion ratio used for 2-vertex columns against the
    /// other vertex's score.
    pub debruijn_two_vertex_ratio: f64,
    /// Standard-mode deletion ratio used for 2-vertex columns against the
    /// column's overall average k-mer support.
    pub debruijn_two_vertex_avg_ratio: f64,
    /// Phase-resolution class-size dominance ratio (the "6x" rule).
    pub phase_dominance_ratio: f64,
    /// Whether to canonicalize deletion runs by left-shifting them against
    /// the backbone before building the De Bruijn graph. The original
    /// gates this behind a debug flag that defaults to off; kept off here
    /// by default for the same reason (open question (b)/(c) in spec §9).
    pub canonicalize_deletions: bool,
    /// Whether gap-bridging in `combine_with` should weight synthesized
    /// cells by the backbone pileup instead of always synthesizing plain
    /// `N` cells. The original never actually takes this branch at
    /// runtime (dead code behind `or True`); kept off by default.
    pub use_pileup_weighted_gap_fill: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            overlap_mismatch_budget_per_base: 0.012,
            overlap_shift_window: 5,
            overlap_variant_conflict_mismatch: 5.0,
            raw_edge_overlap_pct: 0.1,
            reduce_overlap_pct: 0.1,
            contractor_overlap_pct: 0.02,
            jump_edge_existing_overlap_pct: 0.2,
            jump_edge_candidate_overlap_pct: 0.8,
            max_jump_edges_per_node: 2,
            low_cov_min_overlap_bases: 10,
            low_cov_threshold: 3.0,
            low_cov_overlap_pct_floor: 0.5,
            contractor_mate_multiplier: 2.0,
            contractor_allele_multiplier: 1.0,
            contractor_max_iterations: 10,
            debruijn_k: 60,
            debruijn_multi_vertex_ratio: 3.0,
            debruijn_two_vertex_ratio: 8.0,
            debruijn_two_vertex_avg_ratio: 8.0,
            phase_dominance_ratio: 6.0,
            canonicalize_deletions: false,
            use_pileup_weighted_gap_fill: false,
        }
    }
}

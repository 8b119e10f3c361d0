pub mod comparison;
pub mod contractor;
pub mod debruijn;
pub mod interval_graph;

pub use comparison::{get_node_comparison_info, ColumnSignal};
pub use contractor::{run_guided_contraction, GuideMode};
pub use debruijn::refine as debruijn_refine;
pub use interval_graph::IntervalGraph;

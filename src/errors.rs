use std::fmt;

/// Errors surfaced at the boundary of the assembly engine.
///
/// Structural invariant violations are not represented here: those are
/// fatal and fail fast via `panic!`/`debug_assert!` at the point they are
/// detected, per the engine's error handling design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// `add_node` was called twice with the same read id. The graph is
    /// left unchanged; the caller gets this back instead of a silent drop.
    DuplicateReadId(String),
    /// A merge into a node that already carries synthetic `N` cells was
    /// requested. The merge is skipped and both nodes are retained.
    ContainmentInconsistency(String),
    /// A load-bearing structural invariant was violated (e.g. an edge
    /// pointing at a node id no longer in the graph). Also raised via
    /// `panic!`/`debug_assert!` at the point of detection; this variant
    /// exists for the few call sites that can still report it as `Err`.
    StructuralInvariant(String),
    /// The 2x2 phase-resolution matrix tied exactly; the refiner stopped
    /// rather than guessing a phase.
    PhaseAmbiguity(String),
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::DuplicateReadId(id) => {
                write!(f, "duplicate read id on add_node: {}", id)
            }
            AssemblyError::ContainmentInconsistency(id) => {
                write!(
                    f,
                    "refusing to merge into node {} because it already contains synthetic N-cells",
                    id
                )
            }
            AssemblyError::StructuralInvariant(msg) => {
                write!(f, "structural invariant violated: {}", msg)
            }
            AssemblyError::PhaseAmbiguity(msg) => {
                write!(f, "phase resolution stopped: {}", msg)
            }
        }
    }
}

impl std::error::Error for AssemblyError {}

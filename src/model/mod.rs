pub mod backbone;
pub mod cell;
pub mod node;
pub mod variant;

pub use backbone::Backbone;
pub use cell::{Cell, Nt, VarId};
pub use node::{left_shift_deletions, mate_id_of, other_mate_id, Node};
pub use variant::{Haplotype, Variant, VariantData, VariantKind};

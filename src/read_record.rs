use crate::model::VarId;

/// One aligned read, as handed to `add_node` at the engine's boundary.
/// See spec.md §6 "Read record".
#[derive(Debug, Clone)]
pub struct ReadRecord {
    /// Read id, carrying its `|L`/`|R` mate suffix.
    pub read_id: String,
    /// 0-based backbone coordinate of the first non-insertion column.
    pub left: i64,
    /// One token per column: `A`/`C`/`G`/`T`/`D`/`N`/`IA`/`IC`/`IG`/`IT`.
    pub seq: Vec<String>,
    /// Per-column quality character, `None` where no quality was supplied.
    pub qual_chars: Vec<Option<u8>>,
    /// Per-column variant id, parallel to `seq`.
    pub var_id: Vec<VarId>,
}

impl ReadRecord {
    pub fn new(read_id: impl Into<String>, left: i64, seq: Vec<String>, qual_chars: Vec<Option<u8>>, var_id: Vec<VarId>) -> ReadRecord {
        assert_eq!(seq.len(), qual_chars.len());
        assert_eq!(seq.len(), var_id.len());
        ReadRecord {
            read_id: read_id.into(),
            left,
            seq,
            qual_chars,
            var_id,
        }
    }

    pub(crate) fn seq_refs(&self) -> Vec<&str> {
        self.seq.iter().map(|s| s.as_str()).collect()
    }
}

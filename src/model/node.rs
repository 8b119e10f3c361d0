use std::collections::HashSet;

use crate::config::Config;
use crate::model::backbone::Backbone;
use crate::model::cell::{match_score, Cell, Nt, VarId};
use crate::model::variant::VariantKind;

/// Strip a read id's `|L`/`|R` suffix to get its mate id.
///
/// `HSQ1008:141:D0CC8ACXX:3:2304:4780:36964|L` and the `|R` end of the
/// same fragment both map to the same mate id.
pub fn mate_id_of(read_id: &str) -> String {
    read_id.split('|').next().unwrap_or(read_id).to_string()
}

/// The id of the other end of a mate pair: swap `|L` for `|R` or vice versa.
pub fn other_mate_id(read_id: &str) -> Option<String> {
    let (base, end) = read_id.rsplit_once('|')?;
    let other_end = match end {
        "L" => "R",
        "R" => "L",
        _ => return None,
    };
    Some(format!("{}|{}", base, other_end))
}

/// Canonicalize runs of `D` in a major-base sequence by left-shifting them
/// against the backbone: while the base immediately left of a run matches
/// the backbone base at the run's current last position, slide the whole
/// run one column left. `left` is the backbone coordinate of `seq[0]`.
///
/// Shared between `combine_with`'s deletion handling and the De Bruijn
/// refiner's sequence preparation so both see the same canonical form.
pub fn left_shift_deletions(seq: &mut [Nt], backbone: &Backbone, left: i64) {
    let mut i = 0;
    while i < seq.len() {
        if seq[i] != Nt::D {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < seq.len() && seq[j] == Nt::D {
            j += 1;
        }
        let len = j - i;
        let mut start = i;
        while start > 0 {
            let flank_pos = left + start as i64 - 1;
            let run_last_pos = left + (start + len) as i64 - 1;
            if flank_pos < 0 || run_last_pos < 0 {
                break;
            }
            if flank_pos as usize >= backbone.len() || run_last_pos as usize >= backbone.len() {
                break;
            }
            if backbone.base_at(flank_pos as usize) != backbone.base_at(run_last_pos as usize) {
                break;
            }
            seq.swap(start - 1, start + len - 1);
            start -= 1;
        }
        i = j;
    }
}

/// Same canonicalization as `left_shift_deletions`, but over whole `Cell`s
/// (counts and variant ids travel with the swap) rather than bare `Nt`
/// majorities. Used by `combine_with` so a merged node's deletion span
/// lines up with the backbone's leftmost equivalent run before `get_vars`
/// reads it back against the known-variant catalog.
fn left_shift_deletion_cells(seq: &mut [Cell], backbone: &Backbone, left: i64) {
    let mut i = 0;
    while i < seq.len() {
        if seq[i].major() != Nt::D {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < seq.len() && seq[j].major() == Nt::D {
            j += 1;
        }
        let len = j - i;
        let mut start = i;
        while start > 0 {
            let flank_pos = left + start as i64 - 1;
            let run_last_pos = left + (start + len) as i64 - 1;
            if flank_pos < 0 || run_last_pos < 0 {
                break;
            }
            if flank_pos as usize >= backbone.len() || run_last_pos as usize >= backbone.len() {
                break;
            }
            if backbone.base_at(flank_pos as usize) != backbone.base_at(run_last_pos as usize) {
                break;
            }
            seq.swap(start - 1, start + len - 1);
            start -= 1;
        }
        i = j;
    }
}

fn decode_qual(c: Option<u8>) -> u8 {
    match c {
        None => 0,
        Some(c) => {
            let q = (c as i32) / 10 - 3;
            q.max(0) as u8
        }
    }
}

/// The per-read unit of assembly: a positioned, mutable sequence of column
/// cells with associated read/mate sets. See spec.md §3 "Node".
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    /// Inclusive backbone coordinate of the first non-insertion cell.
    pub left: i64,
    /// Inclusive backbone coordinate of the last non-insertion cell,
    /// maintained as `left + (#cells - #I-cells) - 1`.
    pub right: i64,
    pub seq: Vec<Cell>,
    pub qual: Vec<u8>,
    pub read_ids: HashSet<String>,
    pub mate_ids: HashSet<String>,
    pub avg_cov: f64,
    ins_len: usize,
}

impl Node {
    /// Construct a node from one aligned read.
    ///
    /// `seq`, `qual`, `var` are parallel arrays of equal length. `seq`
    /// entries are the token form `Nt::parse` understands (`"A"`, `"D"`,
    /// `"N"`, `"IA"`..`"IT"`). `qual` entries are `None` when no quality
    /// was supplied for that column.
    pub fn new(id: impl Into<String>, left: i64, seq: &[&str], qual: &[Option<u8>], var: &[VarId]) -> Node {
        assert_eq!(seq.len(), qual.len());
        assert_eq!(seq.len(), var.len());
        let id = id.into();

        let mut cells = Vec::with_capacity(seq.len());
        let mut ins_len = 0usize;
        for (token, var_id) in seq.iter().zip(var.iter()) {
            let nt = Nt::parse(token);
            if nt.is_insertion() {
                ins_len += 1;
            }
            cells.push(Cell::single(nt, var_id.clone()));
        }

        let decoded_qual: Vec<u8> = qual.iter().map(|q| decode_qual(*q)).collect();
        let right = left + seq.len() as i64 - 1 - ins_len as i64;
        let mate = mate_id_of(&id);

        let mut node = Node {
            id: id.clone(),
            left,
            right,
            seq: cells,
            qual: decoded_qual,
            read_ids: HashSet::from([id]),
            mate_ids: HashSet::from([mate]),
            avg_cov: 0.0,
            ins_len,
        };
        node.recalculate_avg_cov();
        node.check_invariants();
        node
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.seq.len() as i64,
            (self.right - self.left + 1) + self.ins_len as i64,
            "node {} violates len(seq) = (right - left + 1) + #I-cells",
            self.id
        );
    }

    pub fn ins_len(&self) -> usize {
        self.ins_len
    }

    pub fn recalculate_avg_cov(&mut self) {
        if self.seq.is_empty() {
            self.avg_cov = 0.0;
            return;
        }
        let total: u64 = self.seq.iter().map(|c| c.total_count() as u64).sum();
        self.avg_cov = total as f64 / self.seq.len() as f64;
    }

    /// All cells whose major base is not `D`, in order (insertions are
    /// kept: "ungapped" only excludes deletions, per the original).
    pub fn ungapped_seq(&self) -> Vec<&Cell> {
        self.seq.iter().filter(|c| c.major() != Nt::D).collect()
    }

    pub fn ungapped_length(&self) -> usize {
        self.seq.iter().filter(|c| c.major() != Nt::D).count()
    }

    pub fn contains_n(&self) -> bool {
        self.seq.iter().any(|c| c.major() == Nt::N)
    }

    /// Map a backbone-relative offset (from `self.left`) to an index into
    /// `ungapped_seq()`. Returns `-1` if `pos` falls beyond the node.
    pub fn ungapped_seq_pos(&self, pos: i64) -> i64 {
        let mut tot_del_len: i64 = 0;
        let mut tot_ins_len: i64 = 0;
        for (i, cell) in self.seq.iter().enumerate() {
            let nt = cell.major();
            if nt == Nt::D {
                tot_del_len += 1;
            } else if nt.is_insertion() {
                tot_ins_len += 1;
            }
            if i as i64 - tot_ins_len == pos {
                return pos - tot_del_len;
            }
        }
        -1
    }

    /// Approximate overlap test. Precondition: `self.left <= other.left`.
    /// Returns `(shift, overlap_len)` in ungapped-cell units, or `(-1,-1)`
    /// if no shift in the search window stays within the mismatch budget.
    pub fn overlap_with(&self, other: &Node, cfg: &Config, skip_n: bool) -> (i64, i64) {
        assert!(self.left <= other.left);
        if self.right < other.left {
            return (-1, -1);
        }

        let seq = self.ungapped_seq();
        let other_seq = other.ungapped_seq();
        let i_left = self.ungapped_seq_pos(other.left - self.left);

        let window = cfg.overlap_shift_window;
        for i in (i_left - window)..=(i_left + window) {
            if i < 0 {
                continue;
            }
            let max_mm = cfg.overlap_mismatch_budget_per_base * (seq.len() as i64 - i) as f64;
            let mut tmp_mm = 0.0f64;
            for j in 0..other_seq.len() {
                let ii = i as usize + j;
                if ii >= seq.len() {
                    break;
                }
                let cell_a = seq[ii];
                let cell_b = other_seq[j];
                let nt_a = cell_a.major();
                let nt_b = cell_b.major();

                let mut mismatch = 0.0f64;
                if skip_n && (nt_a == Nt::N || nt_b == Nt::N) {
                    mismatch = 0.0;
                } else if nt_a != nt_b {
                    mismatch = 1.0 - match_score(cell_a, cell_b);
                    let var_a = cell_a.var_ids_for(nt_a).next();
                    let var_b = cell_b.var_ids_for(nt_b).next();
                    if var_a != var_b {
                        mismatch = cfg.overlap_variant_conflict_mismatch;
                        let adjust = (cell_a.count(nt_a) as f64 / self.avg_cov.max(1e-9)).min(1.0)
                            * (cell_b.count(nt_b) as f64 / other.avg_cov.max(1e-9)).min(1.0);
                        mismatch *= adjust;
                        if mismatch < 1.0 {
                            mismatch = 1.0;
                        }
                    }
                }

                tmp_mm += mismatch;
                if tmp_mm > max_mm {
                    break;
                }
            }

            if tmp_mm <= max_mm {
                return (i, seq.len() as i64 - i);
            }
        }

        (-1, -1)
    }

    /// Merge `other` into `self`. Precondition: `self.left <= other.left`.
    /// `pileup`, when `cfg.use_pileup_weighted_gap_fill` is set, supplies
    /// per-backbone-position coverage used to weight synthesized cells
    /// when bridging a gap between the two nodes. When
    /// `cfg.canonicalize_deletions` is set, each side's own deletion runs
    /// are left-shifted against `backbone` before the merge, so two reads
    /// whose D-run lands at different but backbone-equivalent offsets
    /// agree cell-for-cell instead of tying.
    pub fn combine_with(&mut self, other: &Node, backbone: &Backbone, cfg: &Config, pileup: Option<&[Cell]>) {
        assert!(self.left <= other.left);
        debug_assert!(
            !other.seq.is_empty() && other.seq[0].get(Nt::D).is_none(),
            "a node's first column must never be a deletion"
        );

        // Canonicalize each side's own deletion placement before merging,
        // so two reads whose D-run landed at different (but backbone-
        // equivalent) offsets agree cell-for-cell instead of tying.
        if cfg.canonicalize_deletions {
            left_shift_deletion_cells(&mut self.seq, backbone, self.left);
        }
        let other_seq: Vec<Cell> = if cfg.canonicalize_deletions {
            let mut s = other.seq.clone();
            left_shift_deletion_cells(&mut s, backbone, other.left);
            s
        } else {
            other.seq.clone()
        };

        let mut j = 0usize;
        let mut new_seq: Vec<Cell>;

        if self.right >= other.left {
            // Overlapping or contained.
            let mut ins_len = 0i64;
            let mut i = 0usize;
            let mut found = false;
            while i < self.seq.len() {
                let nt = self.seq[i].major();
                if nt.is_insertion() {
                    ins_len += 1;
                }
                if i as i64 == other.left - self.left + ins_len {
                    found = true;
                    break;
                }
                i += 1;
            }
            assert!(found, "overlap anchor not found in combine_with");

            new_seq = self.seq[..i].to_vec();
            while i < self.seq.len() && j < other_seq.len() {
                let mut merged = self.seq[i].clone();
                for (nt, count, var) in other_seq[j].entries() {
                    merged.add(nt, count, var.clone());
                }
                new_seq.push(merged);
                i += 1;
                j += 1;
            }
            if i < self.seq.len() {
                new_seq.extend_from_slice(&self.seq[i..]);
            }
        } else {
            // Gapped: synthesize bridging cells.
            new_seq = self.seq.clone();
            let gap_len = other.left - self.right - 1;

            if cfg.use_pileup_weighted_gap_fill {
                let sum_1 = self.seq.last().map(|c| c.total_count()).unwrap_or(0) as f64;
                let sum_2 = other_seq.first().map(|c| c.total_count()).unwrap_or(0) as f64;
                let flank_cov = (sum_1 + sum_2) / 2.0;
                for k in 0..gap_len {
                    let pileup_pos = (self.right + 1 + k) as usize;
                    let ref_cell = pileup.and_then(|p| p.get(pileup_pos));
                    match ref_cell {
                        Some(ref_cell) if ref_cell.total_count() > 0 => {
                            let weight = flank_cov / (ref_cell.total_count() as f64).max(1.0);
                            let mut cell = Cell::new();
                            for (nt, count, var) in ref_cell.entries() {
                                cell.add(nt, ((count as f64) * weight).round() as u32, var.clone());
                            }
                            new_seq.push(cell);
                        }
                        _ => new_seq.push(Cell::gap()),
                    }
                }
            } else {
                for _ in 0..gap_len {
                    new_seq.push(Cell::gap());
                }
            }
        }

        if j < other_seq.len() {
            new_seq.extend_from_slice(&other_seq[j..]);
        }

        self.read_ids.extend(other.read_ids.iter().cloned());
        self.mate_ids.extend(other.mate_ids.iter().cloned());

        self.seq = new_seq;
        self.ins_len = self.seq.iter().filter(|c| c.major().is_insertion()).count();
        self.right = self.left + self.seq.len() as i64 - 1 - self.ins_len as i64;
        self.recalculate_avg_cov();
        self.check_invariants();
    }

    /// Variant ids only (no `"gap"`/`"unknown"` markers), deduped against
    /// the immediately preceding entry. Used by the allele-guided
    /// contractor to compare a node's span against a known haplotype's.
    pub fn get_var_ids(&self, left: i64, right: i64, backbone: &Backbone) -> Vec<String> {
        let left = left.max(self.left);
        let right = right.min(self.right);
        if left > right {
            return Vec::new();
        }
        let mut vars: Vec<String> = Vec::new();
        let mut ins_len: i64 = 0;

        for pos in left..=right {
            let mut var_i = pos - self.left + ins_len;
            let mut anchor: Option<(&Cell, Nt)> = None;
            while (var_i as usize) < self.seq.len() {
                let cell = &self.seq[var_i as usize];
                let nt = cell.major();
                if nt.is_insertion() {
                    var_i += 1;
                    ins_len += 1;
                } else {
                    anchor = Some((cell, nt));
                    break;
                }
            }
            let (cell, nt) = match anchor {
                Some(x) => x,
                None => continue,
            };

            for (_, _, var) in cell.entries() {
                let vid = match var {
                    VarId::Known(vid) => vid,
                    _ => continue,
                };
                if vars.last().map(|v| v == vid).unwrap_or(false) {
                    continue;
                }
                let variant = backbone
                    .variants
                    .get(vid)
                    .unwrap_or_else(|| panic!("var id {} not found in catalog", vid));
                let matches = variant_explains_major(variant.kind, &variant.data, nt);
                if matches {
                    vars.push(vid.clone());
                }
            }
        }
        vars
    }

    /// Full variant extraction, emitting `"gap"` for bridged `N` columns
    /// and `"unknown"` for unexplained mismatches, in coordinate order.
    pub fn get_vars(&self, left: i64, right: i64, backbone: &Backbone) -> Vec<(VarId, i64)> {
        let left = left.max(self.left);
        let right = right.min(self.right);
        if left > right {
            return Vec::new();
        }
        let mut vars: Vec<(VarId, i64)> = Vec::new();
        let mut skip_pos: i64 = -1;
        let mut ins_len: i64 = 0;

        for pos in left..=right {
            if pos <= skip_pos {
                continue;
            }
            let mut var_i = pos - self.left + ins_len;
            let mut anchor: Option<(&Cell, Nt)> = None;
            while (var_i as usize) < self.seq.len() {
                let cell = &self.seq[var_i as usize];
                let nt = cell.major();
                if nt.is_insertion() {
                    var_i += 1;
                    ins_len += 1;
                    let var = cell.var_ids_for(nt).next().cloned().unwrap_or(VarId::Empty);
                    if vars.last().map(|(v, _)| *v != var).unwrap_or(false) {
                        vars.push((var, pos));
                    }
                } else {
                    anchor = Some((cell, nt));
                    break;
                }
            }
            let (cell, nt) = match anchor {
                Some(x) => x,
                None => continue,
            };

            if nt.is_acgt() && nt.base_letter() == Some(backbone.base_at(pos as usize)) {
                continue;
            }
            if nt == Nt::N {
                vars.push((VarId::Gap, pos));
                continue;
            }

            let mut added = false;
            let mut saw_unknown = false;
            for (_, _, var) in cell.entries() {
                match var {
                    VarId::Empty | VarId::Gap => continue,
                    VarId::Unknown => {
                        saw_unknown = true;
                        continue;
                    }
                    VarId::Known(vid) => {
                        if vars.last().map(|(v, _)| v.as_known() == Some(vid.as_str())).unwrap_or(false) {
                            continue;
                        }
                        let variant = backbone
                            .variants
                            .get(vid)
                            .unwrap_or_else(|| panic!("var id {} not found in catalog", vid));
                        if variant_explains_major(variant.kind, &variant.data, nt) {
                            assert!(
                                pos as usize >= variant.pos,
                                "variant {} position invariant violated at {}",
                                vid,
                                pos
                            );
                            if variant.kind == VariantKind::Deletion {
                                if pos as usize > variant.pos {
                                    continue;
                                }
                                skip_pos = pos + variant.deletion_len().unwrap() as i64 - 1;
                            }
                            added = true;
                            vars.push((VarId::Known(vid.clone()), pos));
                        }
                    }
                }
            }
            if !added && saw_unknown {
                vars.push((VarId::Unknown, pos));
            }
        }
        vars
    }

    /// Plain-text diagnostic dump (the Rust analogue of the original's
    /// `print_info`, minus ANSI colouring and canvas rendering — those
    /// belong to the out-of-scope visualization sidecar).
    pub fn describe(&self) -> String {
        format!(
            "Node {} [{}, {}] avg_cov={:.1} reads={} mates={}",
            self.id,
            self.left,
            self.right,
            self.avg_cov,
            self.read_ids.len(),
            self.mate_ids.len()
        )
    }
}

fn variant_explains_major(kind: VariantKind, data: &crate::model::variant::VariantData, nt: Nt) -> bool {
    use crate::model::variant::VariantData;
    match (kind, data) {
        (VariantKind::Single, VariantData::Single(b)) => nt.is_acgt() && nt.base_letter() == Some(*b),
        (VariantKind::Deletion, _) => nt == Nt::D,
        (VariantKind::Insertion, _) => false,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::variant::{Variant, VariantData};
    use bio_types::strand::Strand;

    fn backbone(seq: &str) -> Backbone {
        Backbone::new("test", seq.as_bytes().to_vec(), Strand::Unknown)
    }

    #[test]
    fn mate_id_strips_suffix() {
        assert_eq!(mate_id_of("read1|L"), "read1");
        assert_eq!(mate_id_of("read1|R"), "read1");
        assert_eq!(other_mate_id("read1|L").unwrap(), "read1|R");
        assert_eq!(other_mate_id("read1|R").unwrap(), "read1|L");
    }

    #[test]
    fn construction_sets_left_right_and_ins_len() {
        let node = Node::new(
            "r1|L",
            0,
            &["A", "C", "IA", "G", "T"],
            &[None, None, None, None, None],
            &[VarId::Empty, VarId::Empty, VarId::Empty, VarId::Empty, VarId::Empty],
        );
        assert_eq!(node.left, 0);
        // 5 cells, 1 insertion => right = 0 + 5 - 1 - 1 = 3
        assert_eq!(node.right, 3);
        assert_eq!(node.ins_len(), 1);
    }

    #[test]
    fn single_node_round_trip_has_no_variants() {
        let bb = backbone("ACGTACGT");
        let node = Node::new(
            "r1|L",
            0,
            &["A", "C", "G", "T"],
            &[None, None, None, None],
            &[VarId::Empty, VarId::Empty, VarId::Empty, VarId::Empty],
        );
        assert!(node.get_vars(0, node.right, &bb).is_empty());
    }

    #[test]
    fn get_vars_reports_single_variant() {
        let mut bb = backbone("AAAAAA");
        bb.add_variant(
            "v1",
            Variant::new(VariantKind::Single, 3, VariantData::Single(b'G')),
        );
        let node = Node::new(
            "r1|L",
            1,
            &["A", "A", "G", "A"],
            &[None, None, None, None],
            &[
                VarId::Empty,
                VarId::Empty,
                VarId::Known("v1".to_string()),
                VarId::Empty,
            ],
        );
        let vars = node.get_vars(0, node.right, &bb);
        assert_eq!(vars, vec![(VarId::Known("v1".to_string()), 3)]);
    }

    #[test]
    fn combine_with_bridges_gap_with_n_cells() {
        let cfg = Config::default();
        let bb = backbone("ACXXXGT");
        let mut a = Node::new(
            "a|L",
            0,
            &["A", "C"],
            &[None, None],
            &[VarId::Empty, VarId::Empty],
        );
        let b = Node::new(
            "b|L",
            5,
            &["G", "T"],
            &[None, None],
            &[VarId::Empty, VarId::Empty],
        );
        a.combine_with(&b, &bb, &cfg, None);
        assert_eq!(a.left, 0);
        assert_eq!(a.right, 6);
        assert_eq!(a.seq.len(), 6);
        assert_eq!(a.seq[2].major(), Nt::N);
        assert_eq!(a.seq[3].major(), Nt::N);
        assert_eq!(a.read_ids.len(), 2);
    }

    #[test]
    fn combine_with_is_idempotent_under_self_merge() {
        let cfg = Config::default();
        let bb = backbone("AC");
        let mut a = Node::new(
            "a|L",
            0,
            &["A", "C"],
            &[None, None],
            &[VarId::Empty, VarId::Empty],
        );
        let clone = a.clone();
        a.combine_with(&clone, &bb, &cfg, None);
        assert_eq!(a.seq[0].count(Nt::A), 2);
        assert_eq!(a.seq[1].count(Nt::C), 2);
        assert!((a.avg_cov - clone.avg_cov * 2.0).abs() < 1e-9);
    }

    #[test]
    fn combine_with_left_shifts_deletion_when_canonicalizing() {
        // Backbone ACAAAAG: a D-run landing at positions 3-5 (flanked by
        // matching base at position 2) shifts left to 2-4 once merged.
        let bb = backbone("ACAAAAG");
        let mut cfg = Config::default();
        cfg.canonicalize_deletions = true;

        let v2 = VarId::Known("v2".to_string());
        let a = Node::new(
            "a|L",
            0,
            &["A", "C", "A", "D", "D", "D", "G"],
            &[None; 7],
            &[VarId::Empty, VarId::Empty, VarId::Empty, v2.clone(), v2.clone(), v2.clone(), VarId::Empty],
        );
        let clone = a.clone();
        let mut merged = a;
        merged.combine_with(&clone, &bb, &cfg, None);

        assert_eq!(merged.seq[2].major(), Nt::D);
        assert_eq!(merged.seq[3].major(), Nt::D);
        assert_eq!(merged.seq[4].major(), Nt::D);
        assert_eq!(merged.seq[5].major(), Nt::A);
    }

    #[test]
    fn seq_len_accounts_for_insertion_cells() {
        let node = Node::new(
            "a|L",
            0,
            &["A", "IC", "C"],
            &[None, None, None],
            &[VarId::Empty, VarId::Empty, VarId::Empty],
        );
        assert_eq!(node.ins_len(), 1);
        assert_eq!(node.left, 0);
        assert_eq!(node.right, 1);
        assert_eq!(node.seq.len() as i64, (node.right - node.left + 1) + node.ins_len() as i64);
    }

    #[test]
    fn overlap_with_returns_sentinel_when_no_shift_fits_the_budget() {
        let cfg = Config::default();
        let a = Node::new(
            "a|L",
            0,
            &["A"; 20],
            &[None; 20],
            &vec![VarId::Empty; 20],
        );
        let b = Node::new(
            "b|L",
            0,
            &["G"; 20],
            &[None; 20],
            &vec![VarId::Empty; 20],
        );
        assert_eq!(a.overlap_with(&b, &cfg, false), (-1, -1));
    }

    #[test]
    fn combine_with_is_associative_on_non_overlapping_appendable_reads() {
        let cfg = Config::default();
        let bb = backbone("AXCXG");

        let mk = |id: &str, left: i64, base: &str| {
            Node::new(id, left, &[base], &[None], &[VarId::Empty])
        };

        let left_then_right = {
            let mut ab = mk("a|L", 0, "A");
            ab.combine_with(&mk("b|L", 2, "C"), &bb, &cfg, None);
            ab.combine_with(&mk("c|L", 4, "G"), &bb, &cfg, None);
            ab
        };
        let right_then_left = {
            let mut bc = mk("b|L", 2, "C");
            bc.combine_with(&mk("c|L", 4, "G"), &bb, &cfg, None);
            let mut a = mk("a|L", 0, "A");
            a.combine_with(&bc, &bb, &cfg, None);
            a
        };

        assert_eq!(left_then_right.left, right_then_left.left);
        assert_eq!(left_then_right.right, right_then_left.right);
        assert_eq!(left_then_right.read_ids, right_then_left.read_ids);
        assert_eq!(left_then_right.mate_ids, right_then_left.mate_ids);
        for (a, b) in left_then_right.seq.iter().zip(right_then_left.seq.iter()) {
            assert_eq!(a.major(), b.major());
        }
    }
}

#[macro_use]
extern crate lazy_static;

use bio_types::strand::Strand;
use hla_assembler::config::Config;
use hla_assembler::model::backbone::Backbone;
use hla_assembler::model::node::Node;
use hla_assembler::model::variant::{Haplotype, Variant, VariantData, VariantKind};
use hla_assembler::model::VarId;
use hla_assembler::{AssemblyEngine, ReadRecord};

lazy_static! {
    static ref DEFAULT_CONFIG: Config = Config::default();
}

fn tokens(bases: &str) -> Vec<String> {
    bases.chars().map(|c| c.to_string()).collect()
}

fn read(id: &str, left: i64, bases: &str, var_id: Vec<VarId>) -> ReadRecord {
    let seq = tokens(bases);
    let qual = vec![None; seq.len()];
    ReadRecord::new(id, left, seq, qual, var_id)
}

fn no_vars(len: usize) -> Vec<VarId> {
    vec![VarId::Empty; len]
}

/// S2 — single SNV phased by coverage: backbone `AAAAAA`, variant
/// `v1 = (single, 3, G)`. Five reads carry it, five don't; the interval
/// graph stage should keep them as two distinct nodes.
#[test]
fn single_snv_phases_into_two_nodes_by_coverage() {
    let mut bb = Backbone::new("test", b"AAAAAA".to_vec(), Strand::Unknown);
    bb.add_variant("v1", Variant::new(VariantKind::Single, 3, VariantData::Single(b'G')));
    let cfg = DEFAULT_CONFIG.clone();
    let engine = AssemblyEngine::new(&bb, cfg);

    let mut reads = Vec::new();
    for i in 0..5 {
        let mut var = no_vars(4);
        var[2] = VarId::Known("v1".to_string());
        reads.push(read(&format!("alt{}|L", i), 1, "AAGA", var));
    }
    for i in 0..5 {
        reads.push(read(&format!("ref{}|L", i), 2, "AAAA", no_vars(4)));
    }

    let result = engine.assemble(reads).unwrap();
    assert_eq!(result.len(), 2);

    let mut var_lists: Vec<Vec<(VarId, i64)>> = result.values().map(|n| n.get_vars(n.left, n.right, &bb)).collect();
    var_lists.sort_by_key(|v| v.len());
    assert_eq!(var_lists[0], Vec::new());
    assert_eq!(var_lists[1], vec![(VarId::Known("v1".to_string()), 3)]);
}

/// S3 — deletion left-shift: backbone `ACAAAAG`, deletion variant
/// `v2 = (deletion, 2, 3)`. One read's D-run lands right-shifted at
/// 3-5; `combine_with` (the merge kernel the interval graph, contractor,
/// and De Bruijn emitter all share) canonicalizes it against the
/// backbone before the merged node reports its variants, so the result
/// carries `v2` exactly once, at its leftmost position.
#[test]
fn deletion_left_shift_canonicalizes_merged_node() {
    let bb = Backbone::new("test", b"ACAAAAG".to_vec(), Strand::Unknown);
    let mut cfg = DEFAULT_CONFIG.clone();
    cfg.canonicalize_deletions = true;

    let v2 = VarId::Known("v2".to_string());
    let right_shifted = Node::new(
        "r1|L",
        0,
        &["A", "C", "A", "D", "D", "D", "G"],
        &[None; 7],
        &[VarId::Empty, VarId::Empty, VarId::Empty, v2.clone(), v2.clone(), v2.clone(), VarId::Empty],
    );
    let canonical = Node::new(
        "r2|L",
        0,
        &["A", "C", "D", "D", "D", "A", "G"],
        &[None; 7],
        &[VarId::Empty, VarId::Empty, v2.clone(), v2.clone(), v2.clone(), VarId::Empty, VarId::Empty],
    );

    let mut merged = right_shifted;
    merged.combine_with(&canonical, &bb, &cfg, None);

    assert_eq!(merged.get_vars(merged.left, merged.right, &bb), vec![(v2, 2)]);
}

/// S5 — jump-edge bridging: backbone length 100, reads covering 0-40 and
/// 60-99 with no read spanning the gap. Jump-edge generation should
/// connect the two sides and `combine_with` should bridge the 19-base
/// gap with synthetic `N` cells.
#[test]
fn jump_edges_bridge_uncovered_gap() {
    let bb = Backbone::new("test", vec![b'A'; 100], Strand::Unknown);
    let cfg = DEFAULT_CONFIG.clone();
    let engine = AssemblyEngine::new(&bb, cfg);

    let left_side = read("left|L", 0, &"A".repeat(41), no_vars(41));
    let right_side = read("right|L", 60, &"A".repeat(40), no_vars(40));

    let result = engine.assemble(vec![left_side, right_side]).unwrap();
    assert_eq!(result.len(), 1);
    let node = result.values().next().unwrap();
    assert_eq!(node.left, 0);
    assert_eq!(node.right, 99);

    let vars = node.get_vars(node.left, node.right, &bb);
    let gap_positions: Vec<i64> = vars.iter().filter(|(v, _)| *v == VarId::Gap).map(|(_, p)| *p).collect();
    assert_eq!(gap_positions.len(), 19);
    assert_eq!(gap_positions.first().copied(), Some(41));
    assert_eq!(gap_positions.last().copied(), Some(59));
}

/// S6 — De Bruijn pruning of a single erroneous branch: thirty reads
/// support one path through a column; one lone read creates an
/// alternate, mate-unsupported vertex that standard-mode pruning
/// should delete, leaving one path across that column.
#[test]
fn debruijn_prunes_unsupported_singleton_branch() {
    let bb = Backbone::new("test", vec![b'A'; 200], Strand::Unknown);
    let mut cfg = DEFAULT_CONFIG.clone();
    cfg.debruijn_k = 60;
    let engine = AssemblyEngine::new(&bb, cfg);

    let mut reads = Vec::new();
    for i in 0..30 {
        reads.push(read(&format!("major{}|L", i), 0, &"A".repeat(150), no_vars(150)));
    }
    let mut branch_bases = "A".repeat(150);
    branch_bases.replace_range(100..101, "C");
    reads.push(read("branch|L", 0, &branch_bases, no_vars(150)));

    let result = engine.assemble(reads).unwrap();
    assert_eq!(result.len(), 1);
}

/// A haplotype catalog entry exists purely so `compute_max_alleles`
/// (allele-guided contraction) has something to score against; this
/// just confirms the public model types used to build one compile and
/// round-trip through a backbone.
#[test]
fn haplotype_catalog_entries_are_stored_on_the_backbone() {
    let mut bb = Backbone::new("test", b"ACGT".to_vec(), Strand::Unknown);
    bb.add_variant("v1", Variant::new(VariantKind::Single, 1, VariantData::Single(b'G')));
    bb.add_haplotype(Haplotype {
        ht_id: "A*01:01".to_string(),
        backbone_id: "test".to_string(),
        left: 0,
        right: 3,
        var_ids: vec!["v1".to_string()],
    });
    assert_eq!(bb.haplotypes.len(), 1);
    assert_eq!(bb.haplotypes[0].var_ids, vec!["v1".to_string()]);
}

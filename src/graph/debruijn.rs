use std::collections::{HashMap, HashSet, VecDeque};

use hashlink::LinkedHashMap;
use itertools::Itertools;

use crate::config::Config;
use crate::model::{left_shift_deletions, Backbone, Nt, Node};

/// One distinct k-mer sliding window ending at a backbone column.
#[derive(Debug, Clone)]
struct Vertex {
    nt: Nt,
    k_minus1_mer: Vec<Nt>,
    predecessors: Vec<usize>,
    num_ids: Vec<u32>,
}

fn suffix_k_minus_1(v: &Vertex) -> Vec<Nt> {
    let mut s = v.k_minus1_mer[1..].to_vec();
    s.push(v.nt);
    s
}

/// The column-indexed k-mer graph built from the current node set's
/// major-base sequences.
pub struct DebruijnGraph<'b> {
    columns: Vec<Vec<Vertex>>,
    id_of: HashMap<u32, String>,
    mate_ids_of: HashMap<u32, HashSet<String>>,
    k: usize,
    backbone: &'b Backbone,
}

fn build_debruijn_graph<'b>(nodes: &LinkedHashMap<String, Node>, backbone: &'b Backbone, cfg: &Config) -> DebruijnGraph<'b> {
    let k = cfg.debruijn_k;
    let l = backbone.len();
    let num_columns = l.saturating_sub(k).saturating_add(1);
    let mut columns: Vec<Vec<Vertex>> = vec![Vec::new(); num_columns];
    let mut id_of = HashMap::new();
    let mut mate_ids_of = HashMap::new();
    let mut next_id = 0u32;

    for (node_id, node) in nodes.iter() {
        let mut major_seq: Vec<Nt> = node
            .seq
            .iter()
            .map(|c| c.major())
            .filter(|nt| !nt.is_insertion())
            .collect();
        if major_seq.len() < k {
            continue;
        }
        if cfg.canonicalize_deletions {
            left_shift_deletions(&mut major_seq, backbone, node.left);
        }

        let numeric_id = next_id;
        next_id += 1;
        id_of.insert(numeric_id, node_id.clone());
        mate_ids_of.insert(numeric_id, node.mate_ids.clone());

        let node_left = node.left as usize;
        let max_p = node_left + major_seq.len() - k;
        for p in node_left..=max_p {
            if p >= columns.len() {
                break;
            }
            let offset = p - node_left;
            let kmer = &major_seq[offset..offset + k];
            let nt = kmer[k - 1];
            let k_m1 = kmer[..k - 1].to_vec();

            if let Some(v) = columns[p].iter_mut().find(|v| v.nt == nt && v.k_minus1_mer == k_m1) {
                v.num_ids.push(numeric_id);
            } else {
                let predecessors = if p == 0 {
                    Vec::new()
                } else {
                    columns[p - 1]
                        .iter()
                        .enumerate()
                        .filter(|(_, pv)| suffix_k_minus_1(pv) == k_m1)
                        .map(|(i, _)| i)
                        .collect()
                };
                columns[p].push(Vertex {
                    nt,
                    k_minus1_mer: k_m1,
                    predecessors,
                    num_ids: vec![numeric_id],
                });
            }
        }
    }

    DebruijnGraph { columns, id_of, mate_ids_of, k, backbone }
}

/// Whether a vertex's full k-mer (its `k_minus1_mer` plus its own base)
/// agrees with the backbone reference at the columns it spans. `D`/`N`
/// positions carry no base and are treated as automatically consistent.
fn kmer_matches_backbone(v: &Vertex, col: usize, backbone: &Backbone) -> bool {
    v.k_minus1_mer
        .iter()
        .copied()
        .chain(std::iter::once(v.nt))
        .enumerate()
        .all(|(offset, nt)| match nt.base_letter() {
            Some(b) => backbone.base_at(col + offset) == b,
            None => true,
        })
}

fn compute_mate_presence(mate_ids_of: &HashMap<u32, HashSet<String>>) -> HashMap<u32, bool> {
    let mut all_mates: HashMap<&str, u32> = HashMap::new();
    for mates in mate_ids_of.values() {
        for m in mates {
            *all_mates.entry(m.as_str()).or_insert(0) += 1;
        }
    }
    mate_ids_of
        .iter()
        .map(|(id, mates)| (*id, mates.iter().any(|m| all_mates.get(m.as_str()).copied().unwrap_or(0) >= 2)))
        .collect()
}

/// Standard-mode pruning followed by try-hard mode, each iterated until a
/// full pass produces no deletions. Returns the set of deleted numeric ids.
fn prune(graph: &mut DebruijnGraph<'_>, cfg: &Config) -> HashSet<u32> {
    use rayon::prelude::*;

    let mate_presence = compute_mate_presence(&graph.mate_ids_of);
    let backbone = graph.backbone;
    let mut deleted: HashSet<u32> = HashSet::new();

    loop {
        let total_support: usize = graph.columns.iter().flatten().map(|v| v.num_ids.len()).sum();
        let avg_kmers = if !graph.columns.is_empty() {
            total_support as f64 / graph.columns.len() as f64
        } else {
            0.0
        };

        // Each column's delete decision only reads its own vertices and
        // `mate_presence`/`avg_kmers`, so columns score independently; the
        // per-column id lists are collected and only then applied.
        let to_delete: Vec<u32> = graph
            .columns
            .par_iter()
            .enumerate()
            .flat_map(|(p, col)| {
                if col.len() < 2 {
                    return Vec::new();
                }
                let scores: Vec<usize> = col
                    .iter()
                    .map(|v| v.num_ids.iter().filter(|id| mate_presence.get(id).copied().unwrap_or(false)).count())
                    .collect();
                let n = col.len();
                let mut ids = Vec::new();
                for i in 0..n {
                    let others: Vec<f64> = (0..n).filter(|&j| j != i).map(|j| scores[j] as f64).collect();
                    let rel = others.iter().sum::<f64>() / others.len().max(1) as f64;
                    let v_score = scores[i] as f64;

                    let delete = if n >= 3 {
                        v_score * cfg.debruijn_multi_vertex_ratio < rel
                    } else {
                        let mut d = v_score * cfg.debruijn_two_vertex_ratio < rel
                            || v_score * cfg.debruijn_two_vertex_avg_ratio < avg_kmers;
                        if !d && n == 2 && col[i].nt != Nt::D {
                            let other = &col[1 - i];
                            if other.nt == Nt::D
                                && kmer_matches_backbone(other, p, backbone)
                                && !kmer_matches_backbone(&col[i], p, backbone)
                            {
                                d = true;
                            }
                        }
                        d
                    };

                    if delete {
                        ids.extend(col[i].num_ids.iter().copied());
                    }
                }
                ids
            })
            .collect();

        let mut any_deleted = false;
        for id in to_delete {
            if deleted.insert(id) {
                any_deleted = true;
            }
        }

        if !any_deleted {
            break;
        }
        for col in graph.columns.iter_mut() {
            for v in col.iter_mut() {
                v.num_ids.retain(|id| !deleted.contains(id));
            }
        }
    }

    loop {
        let mut any_deleted = false;
        for col in graph.columns.iter_mut() {
            if col.len() <= 2 {
                continue;
            }
            let mut idx: Vec<usize> = (0..col.len()).collect();
            idx.sort_by_key(|&i| std::cmp::Reverse(col[i].num_ids.len()));
            let keep: HashSet<usize> = idx.into_iter().take(2).collect();
            for (i, v) in col.iter().enumerate() {
                if !keep.contains(&i) {
                    for id in &v.num_ids {
                        if deleted.insert(*id) {
                            any_deleted = true;
                        }
                    }
                }
            }
        }
        if !any_deleted {
            break;
        }
        for col in graph.columns.iter_mut() {
            for v in col.iter_mut() {
                v.num_ids.retain(|id| !deleted.contains(id));
            }
        }
    }

    deleted
}

struct Path {
    left: usize,
    right: usize,
    num_ids: Vec<u32>,
}

/// BFS path compression: extend straight-line runs of single-vertex
/// columns, branching the search at merges and forks.
fn compress_paths(graph: &DebruijnGraph<'_>) -> Vec<Path> {
    let mut paths = Vec::new();
    let mut visited: HashSet<(usize, usize)> = HashSet::new();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for (p, col) in graph.columns.iter().enumerate() {
        for (i, v) in col.iter().enumerate() {
            if v.num_ids.is_empty() {
                continue;
            }
            let has_live_predecessor = p > 0
                && v.predecessors
                    .iter()
                    .any(|pi| graph.columns[p - 1].get(*pi).map(|pv| !pv.num_ids.is_empty()).unwrap_or(false));
            if !has_live_predecessor {
                queue.push_back((p, i));
            }
        }
    }

    while let Some((start_p, start_i)) = queue.pop_front() {
        if !visited.insert((start_p, start_i)) {
            continue;
        }
        if graph.columns[start_p][start_i].num_ids.is_empty() {
            continue;
        }
        let num_ids = graph.columns[start_p][start_i].num_ids.clone();
        let mut p = start_p;
        let mut i = start_i;

        loop {
            let next_p = p + 1;
            if next_p >= graph.columns.len() {
                break;
            }
            let cur_live: Vec<usize> = graph.columns[p]
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.num_ids.is_empty())
                .map(|(j, _)| j)
                .collect();
            if cur_live.len() != 1 || cur_live[0] != i {
                break;
            }
            let next_live: Vec<usize> = graph.columns[next_p]
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.num_ids.is_empty())
                .map(|(j, _)| j)
                .collect();
            if next_live.len() != 1 {
                for j in next_live {
                    queue.push_back((next_p, j));
                }
                break;
            }
            let j = next_live[0];
            if graph.columns[next_p][j].predecessors != vec![i] {
                queue.push_back((next_p, j));
                break;
            }
            p = next_p;
            i = j;
        }

        paths.push(Path {
            left: start_p,
            right: p + graph.k - 1,
            num_ids,
        });
    }
    paths
}

struct EquivClass {
    num_ids: HashSet<u32>,
    all_ids: HashSet<u32>,
}

struct Cohort {
    left: usize,
    right: usize,
    classes: Vec<EquivClass>,
}

fn expand_with_mates(ids: &HashSet<u32>, mate_ids_of: &HashMap<u32, HashSet<String>>, mate_to_numeric: &HashMap<String, u32>) -> HashSet<u32> {
    let mut out = ids.clone();
    for id in ids {
        if let Some(mates) = mate_ids_of.get(id) {
            for m in mates {
                if let Some(&mid) = mate_to_numeric.get(m) {
                    out.insert(mid);
                }
            }
        }
    }
    out
}

struct Group {
    left: usize,
    right: usize,
    members: Vec<usize>,
}

/// Group compressed paths into column-overlap cohorts, one or two classes
/// each (a class is one haplotype candidate within the cohort's span).
/// Single-member cohorts have any read ids already claimed by a
/// multi-member cohort subtracted out, and are dropped entirely once
/// nothing exclusive to them remains (spec §4.4 "pairing equivalence
/// classes": a single-class cohort only survives on its own exclusive
/// reads).
fn build_cohorts(paths: &[Path], mate_ids_of: &HashMap<u32, HashSet<String>>, mate_to_numeric: &HashMap<String, u32>) -> Vec<Cohort> {
    let order: Vec<usize> = (0..paths.len()).sorted_by_key(|&i| (paths[i].left, paths[i].right)).collect();

    let mut groups = Vec::new();
    let mut idx = 0;
    while idx < order.len() {
        let start = order[idx];
        let mut right = paths[start].right;
        let mut members = vec![start];
        let mut j = idx + 1;
        while j < order.len() && paths[order[j]].left < right {
            members.push(order[j]);
            right = right.max(paths[order[j]].right);
            j += 1;
        }
        let left = paths[start].left;
        groups.push(Group { left, right, members });
        idx = j;
    }

    let mut excl_num_ids: HashSet<u32> = HashSet::new();
    for g in &groups {
        if g.members.len() >= 2 {
            excl_num_ids.extend(g.members.iter().flat_map(|&m| paths[m].num_ids.iter().copied()));
        }
    }

    let mut cohorts = Vec::new();
    for g in groups {
        let classes = if g.members.len() >= 2 {
            g.members
                .iter()
                .map(|&m| {
                    let num_ids: HashSet<u32> = paths[m].num_ids.iter().cloned().collect();
                    let all_ids = expand_with_mates(&num_ids, mate_ids_of, mate_to_numeric);
                    EquivClass { num_ids, all_ids }
                })
                .collect()
        } else {
            let mut num_ids: HashSet<u32> = g.members.iter().flat_map(|&m| paths[m].num_ids.iter().cloned()).collect();
            num_ids.retain(|id| !excl_num_ids.contains(id));
            if num_ids.is_empty() {
                continue;
            }
            let all_ids = expand_with_mates(&num_ids, mate_ids_of, mate_to_numeric);
            vec![EquivClass { num_ids, all_ids }]
        };

        cohorts.push(Cohort { left: g.left, right: g.right, classes });
    }
    cohorts
}

fn intersection_matrix(a: &Cohort, b: &Cohort) -> Vec<Vec<usize>> {
    a.classes
        .iter()
        .map(|ca| b.classes.iter().map(|cb| ca.all_ids.intersection(&cb.all_ids).count()).collect())
        .collect()
}

/// Score a cohort pair: sum for 1xN/Nx1, row-wise max-minus-second for
/// 2x2 (returning `(-inf, true)` on an exact tie, per the refiner's "stop
/// rather than guess" rule).
fn score_pair(a: &Cohort, b: &Cohort) -> (f64, bool) {
    let m = intersection_matrix(a, b);
    if a.classes.len() == 2 && b.classes.len() == 2 {
        let s00 = (m[0][0] + m[1][1]) as f64;
        let s01 = (m[0][1] + m[1][0]) as f64;
        if s00 == s01 {
            return (f64::NEG_INFINITY, true);
        }
        let score = (m[0][0].max(m[0][1]) as f64 - m[0][0].min(m[0][1]) as f64)
            + (m[1][0].max(m[1][1]) as f64 - m[1][0].min(m[1][1]) as f64);
        (score, false)
    } else {
        (m.iter().flatten().sum::<usize>() as f64, false)
    }
}

fn concat_class(a: &EquivClass, b: &EquivClass) -> EquivClass {
    let mut num_ids = a.num_ids.clone();
    num_ids.extend(b.num_ids.iter().cloned());
    let mut all_ids = a.all_ids.clone();
    all_ids.extend(b.all_ids.iter().cloned());
    EquivClass { num_ids, all_ids }
}

fn merge_cohorts(a: &Cohort, b: &Cohort, cfg: &Config) -> Cohort {
    let m = intersection_matrix(a, b);
    let classes = match (a.classes.len(), b.classes.len()) {
        (1, 1) => vec![concat_class(&a.classes[0], &b.classes[0])],
        (1, 2) => {
            let m00 = m[0][0] as f64;
            let m01 = m[0][1] as f64;
            if m00 > 2.0f64.max(m01 * cfg.phase_dominance_ratio) {
                vec![
                    concat_class(&a.classes[0], &b.classes[0]),
                    EquivClass {
                        num_ids: b.classes[1].num_ids.clone(),
                        all_ids: b.classes[1].all_ids.clone(),
                    },
                ]
            } else if m01 > 2.0f64.max(m00 * cfg.phase_dominance_ratio) {
                vec![
                    concat_class(&a.classes[0], &b.classes[1]),
                    EquivClass {
                        num_ids: b.classes[0].num_ids.clone(),
                        all_ids: b.classes[0].all_ids.clone(),
                    },
                ]
            } else if a.left == 0 {
                vec![concat_class(&a.classes[0], &b.classes[0]), concat_class(&a.classes[0], &b.classes[1])]
            } else {
                vec![
                    concat_class(&a.classes[0], &b.classes[0]),
                    EquivClass {
                        num_ids: b.classes[1].num_ids.clone(),
                        all_ids: b.classes[1].all_ids.clone(),
                    },
                ]
            }
        }
        (2, 1) => {
            let m00 = m[0][0] as f64;
            let m10 = m[1][0] as f64;
            if m00 > 2.0f64.max(m10 * cfg.phase_dominance_ratio) {
                vec![
                    concat_class(&a.classes[0], &b.classes[0]),
                    EquivClass {
                        num_ids: a.classes[1].num_ids.clone(),
                        all_ids: a.classes[1].all_ids.clone(),
                    },
                ]
            } else if m10 > 2.0f64.max(m00 * cfg.phase_dominance_ratio) {
                vec![
                    concat_class(&a.classes[1], &b.classes[0]),
                    EquivClass {
                        num_ids: a.classes[0].num_ids.clone(),
                        all_ids: a.classes[0].all_ids.clone(),
                    },
                ]
            } else {
                vec![
                    concat_class(&a.classes[0], &b.classes[0]),
                    EquivClass {
                        num_ids: a.classes[1].num_ids.clone(),
                        all_ids: a.classes[1].all_ids.clone(),
                    },
                ]
            }
        }
        _ => {
            // Trim the row/column belonging to a dominated class before
            // comparing s00/s01, mirroring the 1x2/2x1 dominance rule
            // (spec §4.4 "phase resolution" step 4).
            let mut mm = m.clone();
            let a0 = a.classes[0].num_ids.len() as f64;
            let a1 = a.classes[1].num_ids.len() as f64;
            if a0 > 2.0f64.max(a1 * cfg.phase_dominance_ratio) {
                mm[1][0] = 0;
                mm[1][1] = 0;
            } else if a1 > 2.0f64.max(a0 * cfg.phase_dominance_ratio) {
                mm[0][0] = 0;
                mm[0][1] = 0;
            }
            let b0 = b.classes[0].num_ids.len() as f64;
            let b1 = b.classes[1].num_ids.len() as f64;
            if b0 > 2.0f64.max(b1 * cfg.phase_dominance_ratio) {
                mm[0][1] = 0;
                mm[1][1] = 0;
            } else if b1 > 2.0f64.max(b0 * cfg.phase_dominance_ratio) {
                mm[0][0] = 0;
                mm[1][0] = 0;
            }

            let s00 = (mm[0][0] + mm[1][1]) as f64;
            let s01 = (mm[0][1] + mm[1][0]) as f64;
            if s00 > s01 {
                vec![concat_class(&a.classes[0], &b.classes[0]), concat_class(&a.classes[1], &b.classes[1])]
            } else {
                vec![concat_class(&a.classes[0], &b.classes[1]), concat_class(&a.classes[1], &b.classes[0])]
            }
        }
    };
    Cohort {
        left: a.left.min(b.left),
        right: a.right.max(b.right),
        classes,
    }
}

/// Repeatedly merge the best-scoring cohort pair until one remains, the
/// best remaining score is negative, or a 2x2 tie stops the whole pass
/// (spec §9 open question (c): preserved as the original's behavior).
fn resolve_phase(mut cohorts: Vec<Cohort>, cfg: &Config) -> Vec<Cohort> {
    loop {
        if cohorts.len() <= 1 {
            break;
        }
        let mut best: Option<(usize, usize, f64, bool)> = None;
        for i in 0..cohorts.len() {
            for i2 in (i + 1)..cohorts.len() {
                let (s, tie) = score_pair(&cohorts[i], &cohorts[i2]);
                if best.map(|(_, _, bs, _)| s > bs).unwrap_or(true) {
                    best = Some((i, i2, s, tie));
                }
            }
        }
        let (i, i2, s, tie) = match best {
            Some(x) => x,
            None => break,
        };
        if s < 0.0 {
            log::debug!("phase resolution stopping: best remaining score {} < 0", s);
            break;
        }
        if tie {
            log::debug!(
                "phase resolution stopping: exact 2x2 tie between cohorts [{},{}] and [{},{}]",
                cohorts[i].left,
                cohorts[i].right,
                cohorts[i2].left,
                cohorts[i2].right
            );
            break;
        }
        let merged = merge_cohorts(&cohorts[i], &cohorts[i2], cfg);
        let (lo, hi) = if i < i2 { (i, i2) } else { (i2, i) };
        cohorts.remove(hi);
        cohorts.remove(lo);
        cohorts.push(merged);
        cohorts.sort_by_key(|c| (c.left, c.right));
    }
    cohorts
}

fn emit_haplotypes(
    cohorts: &[Cohort],
    graph: &DebruijnGraph<'_>,
    nodes: &LinkedHashMap<String, Node>,
    backbone: &Backbone,
    cfg: &Config,
) -> LinkedHashMap<String, Node> {
    let mut out = LinkedHashMap::new();
    for (ci, cohort) in cohorts.iter().enumerate() {
        for (cj, class) in cohort.classes.iter().enumerate() {
            if class.num_ids.is_empty() {
                continue;
            }
            let mut ids: Vec<u32> = class.num_ids.iter().cloned().collect();
            ids.sort_unstable();
            let seed_id = &graph.id_of[&ids[0]];
            let mut seed = nodes[seed_id].clone();
            for nid in &ids[1..] {
                let other_id = &graph.id_of[nid];
                let other = nodes[other_id].clone();
                if seed.left <= other.left {
                    seed.combine_with(&other, backbone, cfg, None);
                } else {
                    let mut tmp = other;
                    tmp.combine_with(&seed, backbone, cfg, None);
                    seed = tmp;
                }
            }
            let new_id = format!("({}-{}){}", ci, cj, seed_id);
            seed.id = new_id.clone();
            out.insert(new_id, seed);
        }
    }
    out
}

/// Run the full De Bruijn refiner over the current node set: build the
/// k-mer graph, prune by mate-support, compress into paths, group into
/// cohorts, resolve phase, and emit the final one-or-two haplotype nodes.
pub fn refine(nodes: &LinkedHashMap<String, Node>, backbone: &Backbone, cfg: &Config) -> LinkedHashMap<String, Node> {
    if backbone.len() < cfg.debruijn_k {
        log::warn!("backbone shorter than k={}; skipping De Bruijn refinement", cfg.debruijn_k);
        return nodes.clone();
    }

    let mut graph = build_debruijn_graph(nodes, backbone, cfg);
    if graph.id_of.is_empty() {
        log::warn!("no node reached k={} bases; skipping De Bruijn refinement", cfg.debruijn_k);
        return nodes.clone();
    }

    let deleted = prune(&mut graph, cfg);
    if !deleted.is_empty() {
        log::debug!("De Bruijn pruning removed {} node(s)", deleted.len());
    }

    let mut mate_to_numeric: HashMap<String, u32> = HashMap::new();
    for (&id, node_id) in &graph.id_of {
        if let Some(node) = nodes.get(node_id) {
            for m in &node.mate_ids {
                mate_to_numeric.entry(m.clone()).or_insert(id);
            }
        }
    }

    let paths = compress_paths(&graph);
    let cohorts = build_cohorts(&paths, &graph.mate_ids_of, &mate_to_numeric);
    let cohorts = resolve_phase(cohorts, cfg);
    emit_haplotypes(&cohorts, &graph, nodes, backbone, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarId;
    use bio_types::strand::Strand;

    fn backbone(len: usize) -> Backbone {
        Backbone::new("test", vec![b'A'; len], Strand::Unknown)
    }

    fn read(id: &str, left: i64, len: usize) -> Node {
        let tokens = vec!["A".to_string(); len];
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();
        let qual = vec![None; len];
        let var = vec![VarId::Empty; len];
        Node::new(id, left, &refs, &qual, &var)
    }

    #[test]
    fn nodes_shorter_than_k_are_dropped_before_building_columns() {
        let bb = backbone(200);
        let mut cfg = Config::default();
        cfg.debruijn_k = 60;
        let mut nodes = LinkedHashMap::new();
        let short = read("short", 0, 10);
        nodes.insert(short.id.clone(), short);

        let graph = build_debruijn_graph(&nodes, &bb, &cfg);
        assert!(graph.id_of.is_empty());
    }

    #[test]
    fn emission_never_exceeds_two_nodes() {
        let bb = backbone(200);
        let mut cfg = Config::default();
        cfg.debruijn_k = 60;
        let mut nodes = LinkedHashMap::new();
        for i in 0..3 {
            let n = read(&format!("r{}", i), 0, 150);
            nodes.insert(n.id.clone(), n);
        }
        let result = refine(&nodes, &bb, &cfg);
        assert!(result.len() <= 2);
    }
}

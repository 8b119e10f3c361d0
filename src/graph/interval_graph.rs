use std::collections::{HashMap, HashSet};

use hashlink::LinkedHashMap;

use crate::config::Config;
use crate::errors::AssemblyError;
use crate::model::{Backbone, Node};

/// The keyed collection of read nodes plus the `to`/`from` overlap-edge
/// indices. See spec.md §3 "Interval graph" and §4.2.
pub struct IntervalGraph<'b> {
    pub backbone: &'b Backbone,
    pub nodes: LinkedHashMap<String, Node>,
    pub to: HashMap<String, Vec<(String, i64)>>,
    pub from: HashMap<String, Vec<(String, i64)>>,
}

impl<'b> IntervalGraph<'b> {
    pub fn new(backbone: &'b Backbone) -> Self {
        IntervalGraph {
            backbone,
            nodes: LinkedHashMap::new(),
            to: HashMap::new(),
            from: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), AssemblyError> {
        if self.nodes.contains_key(&node.id) {
            log::warn!("duplicate read id on add_node: {}", node.id);
            return Err(AssemblyError::DuplicateReadId(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn sorted_ids_by_left_right(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.keys().cloned().collect();
        ids.sort_by(|a, b| {
            let na = &self.nodes[a];
            let nb = &self.nodes[b];
            (na.left, na.right, a).cmp(&(nb.left, nb.right, b))
        });
        ids
    }

    pub(crate) fn add_edge(&mut self, a: String, b: String, offset: i64) {
        self.to.entry(a.clone()).or_default().push((b.clone(), offset));
        self.from.entry(b).or_default().push((a, -offset));
    }

    /// Drop a node and every edge referencing it, in either direction.
    pub(crate) fn remove_node(&mut self, id: &str) {
        self.nodes.remove(id);
        self.to.remove(id);
        self.from.remove(id);
        for edges in self.to.values_mut() {
            edges.retain(|(b, _)| b != id);
        }
        for edges in self.from.values_mut() {
            edges.retain(|(a, _)| a != id);
        }
    }

    fn rebuild_from(&mut self) {
        let mut from: HashMap<String, Vec<(String, i64)>> = HashMap::new();
        for (a, edges) in &self.to {
            for (b, offset) in edges {
                from.entry(b.clone()).or_default().push((a.clone(), -offset));
            }
        }
        self.from = from;
    }

    /// `generate_raw_edges`: sort nodes by `(left, right)`, test every
    /// candidate overlapping pair, accept when the overlap covers a big
    /// enough fraction of the shorter node's ungapped length.
    pub fn generate_raw_edges(&mut self, cfg: &Config, overlap_pct: f64, skip_n: bool) {
        use rayon::prelude::*;

        let ids = self.sorted_ids_by_left_right();
        // Each node's candidate list is independent of every other node's,
        // so the outer scan parallelizes; edges are only applied (mutating
        // `to`/`from`) after every candidate has been scored.
        let mut new_edges: Vec<(String, String, i64)> = ids
            .par_iter()
            .enumerate()
            .flat_map(|(i, a_id)| {
                let a = &self.nodes[a_id];
                ids[i + 1..]
                    .iter()
                    .take_while(|b_id| self.nodes[*b_id].left <= a.right)
                    .filter_map(|b_id| {
                        let b = &self.nodes[b_id];
                        let (at, overlap) = a.overlap_with(b, cfg, skip_n);
                        if at < 0 || overlap <= 0 {
                            return None;
                        }
                        let min_ungapped = a.ungapped_length().min(b.ungapped_length()) as f64;
                        if overlap as f64 >= overlap_pct * min_ungapped {
                            Some((a_id.clone(), b_id.clone(), at))
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        new_edges.sort_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));
        for (a, b, offset) in new_edges {
            self.add_edge(a, b, offset);
        }
    }

    /// Strict reciprocal overlap fraction between two nodes, ordered by
    /// position: `overlap_len / max(ungapped_a, ungapped_b)`.
    fn reciprocal_overlap(&self, a_id: &str, b_id: &str, cfg: &Config) -> f64 {
        let (left, right) = if self.nodes[a_id].left <= self.nodes[b_id].left {
            (&self.nodes[a_id], &self.nodes[b_id])
        } else {
            (&self.nodes[b_id], &self.nodes[a_id])
        };
        let (at, overlap) = left.overlap_with(right, cfg, true);
        if at < 0 {
            return 0.0;
        }
        let max_ungapped = left.ungapped_length().max(right.ungapped_length()) as f64;
        if max_ungapped <= 0.0 {
            0.0
        } else {
            overlap as f64 / max_ungapped
        }
    }

    /// `generate_jump_edges`: for nodes with at most one weakly-overlapping
    /// outgoing edge, bridge forward to the first barely-overlapping
    /// candidates not already reachable in one hop.
    pub fn generate_jump_edges(&mut self, cfg: &Config) {
        let ids = self.sorted_ids_by_left_right();
        let mut new_edges = Vec::new();
        for (idx, a_id) in ids.iter().enumerate() {
            let out_edges = self.to.get(a_id).cloned().unwrap_or_default();
            if out_edges.len() > 1 {
                continue;
            }
            if let Some((existing_to, _)) = out_edges.first() {
                if self.reciprocal_overlap(a_id, existing_to, cfg) >= cfg.jump_edge_existing_overlap_pct {
                    continue;
                }
            }
            let one_hop: HashSet<String> = out_edges
                .iter()
                .flat_map(|(b, _)| self.to.get(b).cloned().unwrap_or_default())
                .map(|(c, _)| c)
                .collect();

            let a = &self.nodes[a_id];
            let mut added = 0usize;
            for b_id in ids.iter().skip(idx + 1) {
                if added >= cfg.max_jump_edges_per_node {
                    break;
                }
                if one_hop.contains(b_id) || out_edges.iter().any(|(t, _)| t == b_id) {
                    continue;
                }
                let b = &self.nodes[b_id];
                if b.left <= a.right {
                    continue;
                }
                if self.reciprocal_overlap(a_id, b_id, cfg) <= cfg.jump_edge_candidate_overlap_pct {
                    new_edges.push((a_id.clone(), b_id.clone(), b.left - a.left));
                    added += 1;
                }
            }
        }
        for (a, b, offset) in new_edges {
            self.add_edge(a, b, offset);
        }
    }

    /// `merge_inside_nodes`: fold containment chains into their root via
    /// `combine_with`, skipping (and reporting) a merge whose root already
    /// carries synthetic `N`-cells.
    pub fn merge_inside_nodes(&mut self, cfg: &Config) -> Result<(), AssemblyError> {
        let mut parent: HashMap<String, String> = HashMap::new();
        for (a_id, edges) in &self.to {
            let a = &self.nodes[a_id];
            for (b_id, offset) in edges {
                if b_id == a_id {
                    continue;
                }
                let b = &self.nodes[b_id];
                let contained = (*offset == 0 && a.ungapped_length() >= b.ungapped_length())
                    || (*offset > 0 && a.ungapped_length() as i64 >= b.ungapped_length() as i64 + offset);
                if contained {
                    parent.entry(b_id.clone()).or_insert_with(|| a_id.clone());
                }
            }
        }

        fn find_root(parent: &HashMap<String, String>, id: &str) -> String {
            let mut cur = id.to_string();
            let mut seen = HashSet::new();
            while let Some(p) = parent.get(&cur) {
                if !seen.insert(cur.clone()) {
                    break;
                }
                cur = p.clone();
            }
            cur
        }

        let mut to_remove = Vec::new();
        let mut any_conflict = false;
        for b_id in parent.keys().cloned().collect::<Vec<_>>() {
            let root_id = find_root(&parent, &b_id);
            if root_id == b_id || !self.nodes.contains_key(&root_id) || !self.nodes.contains_key(&b_id) {
                continue;
            }
            if self.nodes[&root_id].contains_n() {
                log::warn!(
                    "skipping merge of {} into {}: root already carries synthetic N-cells",
                    b_id,
                    root_id
                );
                any_conflict = true;
                continue;
            }
            let consumed = self.nodes[&b_id].clone();
            self.nodes.get_mut(&root_id).unwrap().combine_with(&consumed, self.backbone, cfg, None);
            to_remove.push(b_id);
        }
        for id in to_remove {
            self.remove_node(&id);
        }

        if any_conflict {
            Err(AssemblyError::ContainmentInconsistency(
                "one or more contained nodes retained because their root contains synthetic N-cells".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// `remove_redundant_edges`: drop `a->b` whenever some `a->c->b` path
    /// already exists.
    pub fn remove_redundant_edges(&mut self) {
        let mut new_to: HashMap<String, Vec<(String, i64)>> = HashMap::new();
        for (a_id, edges) in &self.to {
            let mut two_hop: HashSet<String> = HashSet::new();
            for (b_id, _) in edges {
                if let Some(b_edges) = self.to.get(b_id) {
                    two_hop.extend(b_edges.iter().map(|(c, _)| c.clone()));
                }
            }
            let kept: Vec<(String, i64)> = edges
                .iter()
                .filter(|(b_id, _)| !two_hop.contains(b_id))
                .cloned()
                .collect();
            if !kept.is_empty() {
                new_to.insert(a_id.clone(), kept);
            }
        }
        self.to = new_to;
        self.rebuild_from();
    }

    /// `remove_low_cov_nodes`: between two nodes overlapping by at least
    /// `low_cov_min_overlap_bases`, drop the lower-coverage one if its
    /// coverage falls under the floor and the higher-coverage neighbor's
    /// coverage, discounted by overlap fraction, still dominates.
    pub fn remove_low_cov_nodes(&mut self, cfg: &Config) {
        let mut ids: Vec<String> = self.nodes.keys().cloned().collect();
        ids.sort_by(|x, y| {
            let nx = &self.nodes[x];
            let ny = &self.nodes[y];
            (nx.right, nx.left, x).cmp(&(ny.right, ny.left, y))
        });

        let mut removed: HashSet<String> = HashSet::new();
        for i in 0..ids.len() {
            if removed.contains(&ids[i]) {
                continue;
            }
            for j in (i + 1)..ids.len() {
                if removed.contains(&ids[j]) {
                    continue;
                }
                let a = &self.nodes[&ids[i]];
                let b = &self.nodes[&ids[j]];
                let overlap_start = a.left.max(b.left);
                let overlap_end = a.right.min(b.right);
                if overlap_end < overlap_start {
                    continue;
                }
                let overlap_len = overlap_end - overlap_start + 1;
                if overlap_len < cfg.low_cov_min_overlap_bases {
                    continue;
                }
                let shorter = a.ungapped_length().min(b.ungapped_length()) as f64;
                if shorter <= 0.0 {
                    continue;
                }
                let overlap_pct = overlap_len as f64 / shorter;
                if overlap_pct < cfg.low_cov_overlap_pct_floor {
                    continue;
                }
                let (lo_id, lo, hi) = if a.avg_cov <= b.avg_cov {
                    (&ids[i], a, b)
                } else {
                    (&ids[j], b, a)
                };
                if lo.avg_cov < cfg.low_cov_threshold && lo.avg_cov * (1.3 - overlap_pct) * 10.0 < hi.avg_cov {
                    removed.insert(lo_id.clone());
                }
            }
        }
        for id in removed {
            self.remove_node(&id);
        }
    }

    /// `reduce`: merge maximal unbranched chains end to end, then rebuild
    /// edges (with jump edges enabled).
    pub fn reduce(&mut self, cfg: &Config, overlap_pct: f64) {
        let mut visited: HashSet<String> = HashSet::new();
        let ids = self.sorted_ids_by_left_right();
        let mut chains: Vec<Vec<String>> = Vec::new();

        for id in &ids {
            if visited.contains(id) {
                continue;
            }
            let preds = self.from.get(id).cloned().unwrap_or_default();
            if preds.len() == 1 {
                let (p_id, _) = &preds[0];
                if self.to.get(p_id).map(|v| v.len()).unwrap_or(0) == 1 {
                    // not a chain start; reached from its predecessor.
                    continue;
                }
            }
            let mut chain = vec![id.clone()];
            visited.insert(id.clone());
            let mut cur = id.clone();
            loop {
                let succs = self.to.get(&cur).cloned().unwrap_or_default();
                if succs.len() != 1 {
                    break;
                }
                let (next_id, _) = &succs[0];
                if visited.contains(next_id) {
                    break;
                }
                if self.from.get(next_id).map(|v| v.len()).unwrap_or(0) != 1 {
                    break;
                }
                chain.push(next_id.clone());
                visited.insert(next_id.clone());
                cur = next_id.clone();
            }
            if chain.len() > 1 {
                chains.push(chain);
            }
        }

        for chain in chains {
            let root_id = chain[0].clone();
            for other_id in &chain[1..] {
                let other = self.nodes[other_id].clone();
                self.nodes.get_mut(&root_id).unwrap().combine_with(&other, self.backbone, cfg, None);
            }
            for other_id in &chain[1..] {
                self.nodes.remove(other_id);
            }
        }

        self.to.clear();
        self.from.clear();
        self.generate_raw_edges(cfg, overlap_pct, true);
        self.generate_jump_edges(cfg);
    }

    pub fn describe(&self) -> String {
        let mut out = String::new();
        for id in self.sorted_ids_by_left_right() {
            out.push_str(&self.nodes[&id].describe());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarId;
    use bio_types::strand::Strand;

    fn backbone() -> Backbone {
        Backbone::new("test", b"ACGTACGT".to_vec(), Strand::Unknown)
    }

    fn read(id: &str, left: i64, bases: &str) -> Node {
        let tokens: Vec<String> = bases.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();
        let qual = vec![None; refs.len()];
        let var = vec![VarId::Empty; refs.len()];
        Node::new(id, left, &refs, &qual, &var)
    }

    #[test]
    fn s1_trivial_single_allele_merges_to_one_node() {
        let bb = backbone();
        let cfg = Config::default();
        let mut g = IntervalGraph::new(&bb);
        g.add_node(read("r1|L", 0, "ACGT")).unwrap();
        g.add_node(read("r2|L", 2, "GTAC")).unwrap();
        g.add_node(read("r3|L", 4, "ACGT")).unwrap();

        g.generate_raw_edges(&cfg, cfg.raw_edge_overlap_pct, true);
        g.merge_inside_nodes(&cfg).ok();
        g.remove_redundant_edges();
        g.reduce(&cfg, cfg.reduce_overlap_pct);

        assert_eq!(g.nodes.len(), 1);
        let node = g.nodes.values().next().unwrap();
        assert_eq!(node.left, 0);
        assert_eq!(node.right, 7);
        assert!(node.get_vars(0, node.right, &bb).is_empty());
    }

    #[test]
    fn duplicate_add_node_is_rejected() {
        let bb = backbone();
        let mut g = IntervalGraph::new(&bb);
        g.add_node(read("r1|L", 0, "ACGT")).unwrap();
        let err = g.add_node(read("r1|L", 0, "ACGT")).unwrap_err();
        assert_eq!(err, AssemblyError::DuplicateReadId("r1|L".to_string()));
        assert_eq!(g.nodes.len(), 1);
    }

    #[test]
    fn remove_low_cov_nodes_never_deletes_a_node_at_the_coverage_floor() {
        // Long enough that the two candidates' overlap clears
        // `low_cov_min_overlap_bases` (10), so the floor check is actually
        // exercised rather than short-circuited by the overlap-length gate.
        let bb = Backbone::new("test", b"ACGTACGTACGTACGT".to_vec(), Strand::Unknown);
        let cfg = Config::default();

        let base = read("base|L", 0, "ACGTACGTACGTACGT");
        // Merge `base` into itself twice to reach avg_cov == 3.0 exactly,
        // the retention floor from spec.md property 10.
        let mut lo = base.clone();
        lo.combine_with(&base, &bb, &cfg, None);
        lo.combine_with(&base, &bb, &cfg, None);
        assert!((lo.avg_cov - 3.0).abs() < 1e-9);

        // A much higher-coverage neighbor fully overlapping `lo`: under
        // the dominance rule alone this would make `lo` eligible for
        // removal, but the >= 3.0 floor must still protect it.
        let mut hi = base.clone();
        for _ in 0..4 {
            hi.combine_with(&base, &bb, &cfg, None);
        }
        hi.id = "hi|L".to_string();
        assert!(hi.avg_cov > lo.avg_cov);

        let mut g = IntervalGraph::new(&bb);
        g.add_node(lo).unwrap();
        g.add_node(hi).unwrap();
        g.remove_low_cov_nodes(&cfg);

        assert_eq!(g.nodes.len(), 2);
    }

    #[test]
    fn edge_mirrors_are_maintained() {
        let bb = backbone();
        let cfg = Config::default();
        let mut g = IntervalGraph::new(&bb);
        g.add_node(read("r1|L", 0, "ACGT")).unwrap();
        g.add_node(read("r2|L", 2, "GTAC")).unwrap();
        g.generate_raw_edges(&cfg, cfg.raw_edge_overlap_pct, true);
        for (a, edges) in &g.to {
            for (b, offset) in edges {
                let mirrored = g.from.get(b).unwrap();
                assert!(mirrored.iter().any(|(x, o)| x == a && *o == -offset));
            }
        }
    }
}

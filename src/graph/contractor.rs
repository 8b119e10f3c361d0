use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::graph::interval_graph::IntervalGraph;

/// Which evidence source drives junction resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideMode {
    MatePair,
    AlleleGuided,
}

struct Resolution {
    pairs: Vec<(String, String)>,
}

/// `max_alleles`: for each node, the set of known haplotype ids whose
/// variant set in the node's span minimizes the symmetric difference with
/// the node's own variant set.
fn compute_max_alleles(graph: &IntervalGraph) -> HashMap<String, HashSet<String>> {
    let mut result = HashMap::new();
    for (id, node) in graph.nodes.iter() {
        let node_vars: HashSet<String> = node
            .get_var_ids(node.left, node.right, graph.backbone)
            .into_iter()
            .collect();

        let mut best_score: Option<usize> = None;
        let mut best: HashSet<String> = HashSet::new();
        for hap in &graph.backbone.haplotypes {
            let allele_vars: HashSet<String> = hap
                .var_ids
                .iter()
                .filter(|v| {
                    graph
                        .backbone
                        .variants
                        .get(*v)
                        .map(|variant| variant.pos as i64 >= node.left && variant.pos as i64 <= node.right)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            let sym_diff = node_vars.symmetric_difference(&allele_vars).count();
            match best_score {
                None => {
                    best_score = Some(sym_diff);
                    best = HashSet::from([hap.ht_id.clone()]);
                }
                Some(s) if sym_diff < s => {
                    best_score = Some(sym_diff);
                    best = HashSet::from([hap.ht_id.clone()]);
                }
                Some(s) if sym_diff == s => {
                    best.insert(hap.ht_id.clone());
                }
                _ => {}
            }
        }
        result.insert(id.clone(), best);
    }
    result
}

fn score(mode: GuideMode, graph: &IntervalGraph, max_alleles: Option<&HashMap<String, HashSet<String>>>, p: &str, s: &str) -> usize {
    match mode {
        GuideMode::MatePair => graph.nodes[p].mate_ids.intersection(&graph.nodes[s].mate_ids).count(),
        GuideMode::AlleleGuided => {
            let ma = max_alleles.expect("allele-guided mode requires precomputed max_alleles");
            let empty = HashSet::new();
            ma.get(p)
                .unwrap_or(&empty)
                .intersection(ma.get(s).unwrap_or(&empty))
                .count()
        }
    }
}

fn resolve_1_to_2(m: &[Vec<usize>], mult: f64, is_first: bool, preds: &[String], succs: &[String]) -> Vec<(String, String)> {
    let m00 = m[0][0] as f64;
    let m01 = m[0][1] as f64;
    if m00 > mult * m01 {
        vec![(preds[0].clone(), succs[0].clone())]
    } else if m01 > mult * m00 {
        vec![(preds[0].clone(), succs[1].clone())]
    } else if is_first {
        vec![(preds[0].clone(), succs[0].clone()), (preds[0].clone(), succs[1].clone())]
    } else {
        Vec::new()
    }
}

fn resolve_2_to_1(m: &[Vec<usize>], mult: f64, is_last: bool, preds: &[String], succs: &[String]) -> Vec<(String, String)> {
    let m00 = m[0][0] as f64;
    let m10 = m[1][0] as f64;
    if m00 > mult * m10 {
        vec![(preds[0].clone(), succs[0].clone())]
    } else if m10 > mult * m00 {
        vec![(preds[1].clone(), succs[0].clone())]
    } else if is_last {
        vec![(preds[0].clone(), succs[0].clone()), (preds[1].clone(), succs[0].clone())]
    } else {
        Vec::new()
    }
}

fn resolve_2_to_2(m: &[Vec<usize>], cfg: &Config, mode: GuideMode, preds: &[String], succs: &[String]) -> Vec<(String, String)> {
    let s00 = (m[0][0] + m[1][1]) as f64;
    let s01 = (m[0][1] + m[1][0]) as f64;
    let accept = match mode {
        GuideMode::MatePair => {
            let max_s = s00.max(s01);
            let other = s00.min(s01);
            max_s > 2.0f64.max(other * cfg.contractor_mate_multiplier)
        }
        GuideMode::AlleleGuided => s00 != s01,
    };
    if !accept {
        return Vec::new();
    }
    if s00 >= s01 {
        vec![(preds[0].clone(), succs[0].clone()), (preds[1].clone(), succs[1].clone())]
    } else {
        vec![(preds[0].clone(), succs[1].clone()), (preds[1].clone(), succs[0].clone())]
    }
}

fn find_junction_resolutions(
    graph: &IntervalGraph,
    cfg: &Config,
    mode: GuideMode,
    max_alleles: Option<&HashMap<String, HashSet<String>>>,
) -> Vec<Resolution> {
    let mult = match mode {
        GuideMode::MatePair => cfg.contractor_mate_multiplier,
        GuideMode::AlleleGuided => cfg.contractor_allele_multiplier,
    };

    let mut out = Vec::new();
    for id in graph.sorted_ids_by_left_right() {
        let mut succs: Vec<String> = graph
            .to
            .get(&id)
            .map(|v| v.iter().map(|(b, _)| b.clone()).collect())
            .unwrap_or_default();
        if succs.is_empty() || succs.len() > 2 {
            continue;
        }
        succs.sort();

        let mut preds_union: HashSet<String> = HashSet::new();
        for s in &succs {
            for (p, _) in graph.from.get(s).cloned().unwrap_or_default() {
                preds_union.insert(p);
            }
        }
        if preds_union.len() > 2 || !preds_union.contains(&id) {
            continue;
        }
        let mut preds: Vec<String> = preds_union.into_iter().collect();
        preds.sort();

        let m: Vec<Vec<usize>> = preds
            .iter()
            .map(|p| succs.iter().map(|s| score(mode, graph, max_alleles, p, s)).collect())
            .collect();

        let pairs = match (preds.len(), succs.len()) {
            (1, 2) => {
                let is_first = graph.from.get(&preds[0]).map(|v| v.is_empty()).unwrap_or(true);
                resolve_1_to_2(&m, mult, is_first, &preds, &succs)
            }
            (2, 1) => {
                let is_last = graph.to.get(&succs[0]).map(|v| v.is_empty()).unwrap_or(true);
                resolve_2_to_1(&m, mult, is_last, &preds, &succs)
            }
            (2, 2) => resolve_2_to_2(&m, cfg, mode, &preds, &succs),
            _ => Vec::new(),
        };

        if !pairs.is_empty() {
            out.push(Resolution { pairs });
        }
    }
    out
}

fn apply_resolutions(graph: &mut IntervalGraph, cfg: &Config, resolutions: Vec<Resolution>, mode: GuideMode, iter: usize) -> anyhow::Result<()> {
    let sep = match mode {
        GuideMode::MatePair => '-',
        GuideMode::AlleleGuided => '+',
    };
    let mut consumed: HashSet<String> = HashSet::new();
    let mut new_nodes = Vec::new();

    for res in resolutions {
        for (pred_id, succ_id) in res.pairs {
            if pred_id == succ_id {
                anyhow::bail!("junction resolution paired node {} with itself", pred_id);
            }
            if consumed.contains(&pred_id) || consumed.contains(&succ_id) {
                continue;
            }
            if !graph.nodes.contains_key(&pred_id) || !graph.nodes.contains_key(&succ_id) {
                continue;
            }
            let mut dup = graph.nodes[&pred_id].clone();
            dup.id = format!("{}{}{}{}", pred_id, sep, iter, succ_id);
            let succ = graph.nodes[&succ_id].clone();
            dup.combine_with(&succ, graph.backbone, cfg, None);
            new_nodes.push(dup);
            consumed.insert(pred_id);
            consumed.insert(succ_id);
        }
    }

    for id in consumed {
        graph.remove_node(&id);
    }
    for node in new_nodes {
        let _ = graph.add_node(node);
    }
    Ok(())
}

/// Iteratively duplicate/contract nodes at 1→2, 2→1, and 2→2 junctions
/// using either mate-pair or allele-guided evidence, capped at
/// `cfg.contractor_max_iterations` iterations.
///
/// Returns an error only if a junction resolution is internally
/// inconsistent (a structural bug, not a data condition callers can
/// recover from); see `apply_resolutions`.
pub fn run_guided_contraction(graph: &mut IntervalGraph, cfg: &Config, mode: GuideMode) -> anyhow::Result<()> {
    for iter in 0..cfg.contractor_max_iterations {
        let max_alleles = match mode {
            GuideMode::AlleleGuided => Some(compute_max_alleles(graph)),
            GuideMode::MatePair => None,
        };
        let resolutions = find_junction_resolutions(graph, cfg, mode, max_alleles.as_ref());
        if resolutions.is_empty() {
            log::debug!("guided contractor ({:?}) converged after {} iterations", mode, iter);
            return Ok(());
        }
        apply_resolutions(graph, cfg, resolutions, mode, iter)?;
        graph.to.clear();
        graph.from.clear();
        graph.generate_raw_edges(cfg, cfg.contractor_overlap_pct, true);
        graph.generate_jump_edges(cfg);
        graph.reduce(cfg, cfg.contractor_overlap_pct);
    }
    log::warn!("guided contractor ({:?}) hit the iteration cap", mode);
    Ok(())
}

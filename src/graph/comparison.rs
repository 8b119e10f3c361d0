use std::collections::HashMap;

use hashlink::LinkedHashMap;

use crate::model::{Backbone, Nt, Node};

/// Three-valued column signal for external rendering: does this node's
/// base at this column match the backbone, match some other node's base
/// in the same column, or stand alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSignal {
    Match,
    SharedVariant,
    UniqueVariant,
}

/// `get_node_comparison_info`: per-column aligned bases across the given
/// nodes plus a color signal for each, for an external renderer. This is
/// the only API surface the (out-of-scope) visualization sidecar needs.
pub fn get_node_comparison_info(
    nodes: &LinkedHashMap<String, Node>,
    backbone: &Backbone,
) -> Vec<(i64, Vec<(String, Nt, ColumnSignal)>)> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let left = nodes.values().map(|n| n.left).min().unwrap();
    let right = nodes.values().map(|n| n.right).max().unwrap();

    let mut out = Vec::with_capacity((right - left + 1).max(0) as usize);
    for pos in left..=right {
        let mut column: Vec<(String, Nt)> = Vec::new();
        for (id, node) in nodes.iter() {
            if pos < node.left || pos > node.right {
                continue;
            }
            let local_i = node.ungapped_seq_pos(pos - node.left);
            if local_i < 0 {
                continue;
            }
            let ungapped = node.ungapped_seq();
            if local_i as usize >= ungapped.len() {
                continue;
            }
            column.push((id.clone(), ungapped[local_i as usize].major()));
        }

        let ref_base = Nt::base(backbone.base_at(pos as usize));
        let mut counts: HashMap<Nt, usize> = HashMap::new();
        for (_, nt) in &column {
            *counts.entry(*nt).or_insert(0) += 1;
        }

        let annotated = column
            .into_iter()
            .map(|(id, nt)| {
                let signal = if nt == ref_base {
                    ColumnSignal::Match
                } else if counts.get(&nt).copied().unwrap_or(0) > 1 {
                    ColumnSignal::SharedVariant
                } else {
                    ColumnSignal::UniqueVariant
                };
                (id, nt, signal)
            })
            .collect();
        out.push((pos, annotated));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarId;
    use bio_types::strand::Strand;

    #[test]
    fn unique_variant_signalled_when_only_one_node_carries_it() {
        let bb = Backbone::new("t", b"AAAA".to_vec(), Strand::Unknown);
        let mut nodes = LinkedHashMap::new();
        let no_var = vec![VarId::Empty, VarId::Empty, VarId::Empty, VarId::Empty];
        let a = Node::new("a|L", 0, &["A", "G", "A", "A"], &[None, None, None, None], &no_var);
        let b = Node::new("b|L", 0, &["A", "A", "A", "A"], &[None, None, None, None], &no_var);
        nodes.insert(a.id.clone(), a);
        nodes.insert(b.id.clone(), b);

        let info = get_node_comparison_info(&nodes, &bb);
        let (_, col1) = &info[1];
        let a_entry = col1.iter().find(|(id, _, _)| id == "a|L").unwrap();
        assert_eq!(a_entry.2, ColumnSignal::UniqueVariant);
    }
}

use hashlink::LinkedHashMap;

use crate::config::Config;
use crate::errors::AssemblyError;
use crate::graph::{contractor, debruijn, interval_graph::IntervalGraph};
use crate::model::{Backbone, Cell, Node};
use crate::read_record::ReadRecord;

/// Backbone pileup: per-position column cell, used only to attribute
/// counts when `combine_with` bridges a gap under
/// `Config::use_pileup_weighted_gap_fill`.
pub type Pileup = Vec<Cell>;

/// Runs the fixed assembly pipeline over one backbone: node construction,
/// interval graph, mate-pair and allele-guided contraction, reduction, and
/// the De Bruijn refiner. See spec.md §5's stage order.
pub struct AssemblyEngine<'b> {
    backbone: &'b Backbone,
    cfg: Config,
}

impl<'b> AssemblyEngine<'b> {
    pub fn new(backbone: &'b Backbone, cfg: Config) -> AssemblyEngine<'b> {
        AssemblyEngine { backbone, cfg }
    }

    /// Assemble one or two haplotype nodes from a stream of aligned reads.
    pub fn assemble(&self, reads: Vec<ReadRecord>) -> Result<LinkedHashMap<String, Node>, AssemblyError> {
        let mut graph = IntervalGraph::new(self.backbone);

        for read in &reads {
            let node = Node::new(read.read_id.clone(), read.left, &read.seq_refs(), &read.qual_chars, &read.var_id);
            graph.add_node(node)?;
        }
        log::info!("constructed {} read node(s)", graph.nodes.len());

        graph.generate_raw_edges(&self.cfg, self.cfg.raw_edge_overlap_pct, true);
        graph.generate_jump_edges(&self.cfg);
        graph.merge_inside_nodes(&self.cfg)?;
        graph.remove_redundant_edges();
        graph.remove_low_cov_nodes(&self.cfg);
        graph.reduce(&self.cfg, self.cfg.reduce_overlap_pct);
        log::debug!("interval graph stage left {} node(s)", graph.nodes.len());

        contractor::run_guided_contraction(&mut graph, &self.cfg, contractor::GuideMode::MatePair)
            .map_err(|e| AssemblyError::StructuralInvariant(e.to_string()))?;
        contractor::run_guided_contraction(&mut graph, &self.cfg, contractor::GuideMode::AlleleGuided)
            .map_err(|e| AssemblyError::StructuralInvariant(e.to_string()))?;
        log::debug!("guided contractor left {} node(s)", graph.nodes.len());

        let refined = debruijn::refine(&graph.nodes, self.backbone, &self.cfg);
        log::info!("assembly finished with {} haplotype node(s)", refined.len());
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarId;
    use bio_types::strand::Strand;

    #[test]
    fn s1_three_perfectly_aligned_reads_assemble_into_one_node() {
        let bb = Backbone::new("test", b"ACGTACGT".to_vec(), Strand::Unknown);
        let cfg = Config::default();
        let engine = AssemblyEngine::new(&bb, cfg);

        let mk = |id: &str, left: i64, bases: &str| {
            let seq: Vec<String> = bases.chars().map(|c| c.to_string()).collect();
            let qual = vec![None; seq.len()];
            let var = vec![VarId::Empty; seq.len()];
            ReadRecord::new(id, left, seq, qual, var)
        };

        let reads = vec![mk("r1|L", 0, "ACGT"), mk("r2|L", 2, "GTAC"), mk("r3|L", 4, "ACGT")];
        let result = engine.assemble(reads).unwrap();
        assert_eq!(result.len(), 1);
        let node = result.values().next().unwrap();
        assert_eq!(node.left, 0);
        assert_eq!(node.right, 7);
        assert!(node.get_vars(0, node.right, &bb).is_empty());
    }

    #[test]
    fn duplicate_read_id_is_rejected_and_graph_left_unchanged() {
        let bb = Backbone::new("test", b"ACGT".to_vec(), Strand::Unknown);
        let cfg = Config::default();
        let engine = AssemblyEngine::new(&bb, cfg);
        let seq: Vec<String> = "ACGT".chars().map(|c| c.to_string()).collect();
        let qual = vec![None; 4];
        let var = vec![VarId::Empty; 4];
        let reads = vec![
            ReadRecord::new("dup|L", 0, seq.clone(), qual.clone(), var.clone()),
            ReadRecord::new("dup|L", 0, seq, qual, var),
        ];
        let err = engine.assemble(reads).unwrap_err();
        assert_eq!(err, AssemblyError::DuplicateReadId("dup|L".to_string()));
    }
}

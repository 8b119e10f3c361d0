use bio_types::strand::Strand;
use hashlink::LinkedHashMap;
use std::collections::HashSet;

use crate::model::variant::{Haplotype, Variant};

/// The immutable reference model for a locus: backbone sequence, exon
/// intervals, the catalog of known variants, and known haplotypes.
///
/// Everything here is read-only once constructed — nodes and graphs carry
/// a reference to it, never a copy of its sequence.
#[derive(Debug, Clone)]
pub struct Backbone {
    pub name: String,
    pub seq: Vec<u8>,
    /// Inclusive `[left, right]` exon intervals, in backbone coordinates.
    pub exons: Vec<(usize, usize)>,
    pub strand: Strand,
    pub variants: LinkedHashMap<String, Variant>,
    pub haplotypes: Vec<Haplotype>,
    pub partial_allele_ids: HashSet<String>,
}

impl Backbone {
    pub fn new(name: impl Into<String>, seq: Vec<u8>, strand: Strand) -> Backbone {
        Backbone {
            name: name.into(),
            seq,
            exons: Vec::new(),
            strand,
            variants: LinkedHashMap::new(),
            haplotypes: Vec::new(),
            partial_allele_ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn base_at(&self, pos: usize) -> u8 {
        self.seq[pos]
    }

    pub fn add_variant(&mut self, id: impl Into<String>, variant: Variant) {
        self.variants.insert(id.into(), variant);
    }

    pub fn add_haplotype(&mut self, haplotype: Haplotype) {
        self.haplotypes.push(haplotype);
    }
}

//! Innovation tracking for NEAT.
//!
//! Every new connection gene receives an innovation number from an
//! [`InnovationTracker`]. The tracker is an ordinary value owned by the
//! population and passed by `&mut` into every structural mutation, so the
//! dependency is explicit and the tracker can be tested in isolation.
//!
//! ## Context-sensitive reuse
//!
//! A number is reused only when the same `(from, to)` pair is requested by a
//! genome whose current set of gene innovations is exactly the set recorded
//! when the number was first handed out. Two genomes that reach the same edge
//! from different histories therefore get different numbers. This is
//! deliberate: it makes a shared number mean "the same mutation applied to the
//! same ancestor", not merely "the same edge".

use serde::{Deserialize, Serialize};

use crate::gene::NodeId;
use crate::genome::Genome;

/// One entry in the tracker's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Source node of the new connection.
    pub from: NodeId,
    /// Target node of the new connection.
    pub to: NodeId,
    /// Number assigned to the connection.
    pub innovation: u64,
    /// Sorted innovation numbers the requesting genome carried at the time,
    /// excluding the gene being created.
    pub gene_innovations: Vec<u64>,
}

impl MutationRecord {
    /// Whether this record describes `(from, to)` requested from the same
    /// genome context.
    fn matches(&self, from: NodeId, to: NodeId, genome: &Genome) -> bool {
        if genome.genes().len() != self.gene_innovations.len() {
            return false;
        }
        if self.from != from || self.to != to {
            return false;
        }
        genome
            .genes()
            .iter()
            .all(|g| self.gene_innovations.binary_search(&g.innovation).is_ok())
    }
}

/// Monotonic counter plus the log of every structural mutation so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InnovationTracker {
    next_innovation: u64,
    history: Vec<MutationRecord>,
}

impl InnovationTracker {
    /// Create an empty tracker starting at innovation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tracker whose first number is `next_innovation`.
    ///
    /// Used when resuming from a saved genome so new genes never reuse one of
    /// its numbers.
    #[must_use]
    pub fn starting_at(next_innovation: u64) -> Self {
        Self {
            next_innovation,
            history: Vec::new(),
        }
    }

    /// Return the innovation number for a new `from -> to` gene in `genome`.
    ///
    /// Must be called once per new gene, before the gene is appended, so the
    /// recorded snapshot excludes it.
    pub fn get_or_create(&mut self, from: NodeId, to: NodeId, genome: &Genome) -> u64 {
        if let Some(record) = self
            .history
            .iter()
            .find(|record| record.matches(from, to, genome))
        {
            return record.innovation;
        }

        let innovation = self.next_innovation;
        self.next_innovation += 1;

        let mut gene_innovations: Vec<u64> =
            genome.genes().iter().map(|g| g.innovation).collect();
        gene_innovations.sort_unstable();

        self.history.push(MutationRecord {
            from,
            to,
            innovation,
            gene_innovations,
        });
        innovation
    }

    /// The number the next new mutation will receive.
    #[must_use]
    pub const fn next_innovation(&self) -> u64 {
        self.next_innovation
    }

    /// Every mutation recorded so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[MutationRecord] {
        &self.history
    }

    /// Number of recorded mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MutationConfig;

    fn blank_genome() -> Genome {
        Genome::new(2, 1, MutationConfig::default())
    }

    #[test]
    fn test_same_pair_same_context_reuses_number() {
        let mut tracker = InnovationTracker::new();
        let g1 = blank_genome();
        let g2 = blank_genome();

        let a = tracker.get_or_create(NodeId(0), NodeId(2), &g1);
        let b = tracker.get_or_create(NodeId(0), NodeId(2), &g2);
        assert_eq!(a, b);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_different_pair_gets_new_number() {
        let mut tracker = InnovationTracker::new();
        let g = blank_genome();

        let a = tracker.get_or_create(NodeId(0), NodeId(2), &g);
        let b = tracker.get_or_create(NodeId(1), NodeId(2), &g);
        assert_ne!(a, b);
        assert_eq!(tracker.next_innovation(), 2);
    }

    #[test]
    fn test_starting_at_offsets_numbers() {
        let mut tracker = InnovationTracker::starting_at(7);
        assert!(tracker.is_empty());
        let g = blank_genome();
        assert_eq!(tracker.get_or_create(NodeId(0), NodeId(2), &g), 7);
        assert_eq!(tracker.next_innovation(), 8);
    }

    #[test]
    fn test_different_context_gets_new_number() {
        let mut tracker = InnovationTracker::new();
        let plain = blank_genome();
        let mut wired = blank_genome();
        wired
            .connect(NodeId(1), NodeId(2), 0.5, &mut tracker)
            .expect("legal connection");

        let a = tracker.get_or_create(NodeId(0), NodeId(2), &plain);
        let b = tracker.get_or_create(NodeId(0), NodeId(2), &wired);
        assert_ne!(a, b, "same edge from a different history is a new innovation");
    }

    #[test]
    fn test_snapshot_excludes_new_gene() {
        let mut tracker = InnovationTracker::new();
        let mut g = blank_genome();
        g.connect(NodeId(0), NodeId(2), 1.0, &mut tracker)
            .expect("legal connection");

        let record = &tracker.history()[0];
        assert!(record.gene_innovations.is_empty());
        assert_eq!(record.from, NodeId(0));
        assert_eq!(record.to, NodeId(2));
    }
}

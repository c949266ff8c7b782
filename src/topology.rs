//! Compiled evaluation order using CSR format.
//!
//! A [`Network`] is a pure function of a genome's nodes and genes. It holds
//! the layered firing order plus every node's outgoing edges in Compressed
//! Sparse Row form, so evaluation never chases per-node `Vec`s and nothing
//! can dangle after cloning or crossover.
//!
//! ## Ordering
//!
//! Nodes fire in ascending layer order; nodes sharing a layer keep their
//! creation order. Outgoing edges of a node keep gene order. Both orders are
//! stable, so two structurally identical genomes produce bit-identical
//! outputs.

use std::collections::HashMap;

use crate::error::{NeatError, Result};
use crate::gene::{ConnectionGene, NodeGene, NodeId};

/// One outgoing edge in the CSR index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Index of the gene in the genome's gene list.
    pub gene: usize,
    /// Index of the target node in the genome's node list.
    pub target: usize,
}

/// Firing order and outgoing adjacency for one genome.
#[derive(Debug, Clone, Default)]
pub struct Network {
    /// Node indices in firing order.
    order: Vec<usize>,
    /// CSR offsets; edges of node `i` are `edges[offsets[i]..offsets[i + 1]]`.
    offsets: Vec<usize>,
    /// Outgoing edges grouped by source node.
    edges: Vec<Edge>,
}

impl Network {
    /// Build the network for `nodes` and `genes`.
    ///
    /// Disabled genes are indexed too; evaluation skips them. This keeps the
    /// index a faithful picture of the genome's connections.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::UnknownNode`] if a gene references a node that is
    /// not in `nodes`.
    pub fn compile(nodes: &[NodeGene], genes: &[ConnectionGene]) -> Result<Self> {
        let node_count = nodes.len();
        let index_of: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut resolved = Vec::with_capacity(genes.len());
        for (gene_idx, gene) in genes.iter().enumerate() {
            let from = *index_of
                .get(&gene.from)
                .ok_or(NeatError::UnknownNode(gene.from))?;
            let to = *index_of
                .get(&gene.to)
                .ok_or(NeatError::UnknownNode(gene.to))?;
            resolved.push((from, gene_idx, to));
        }

        // Counting pass.
        let mut counts = vec![0usize; node_count];
        for &(from, _, _) in &resolved {
            counts[from] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut running = 0;
        offsets.push(running);
        for &count in &counts {
            running += count;
            offsets.push(running);
        }

        // Fill pass; iterating genes in order keeps each row in gene order.
        let mut edges = vec![Edge { gene: 0, target: 0 }; running];
        let mut write_pos = offsets[..node_count].to_vec();
        for (from, gene, target) in resolved {
            edges[write_pos[from]] = Edge { gene, target };
            write_pos[from] += 1;
        }

        let mut order: Vec<usize> = (0..node_count).collect();
        // `sort_by_key` is stable: equal layers keep creation order.
        order.sort_by_key(|&i| nodes[i].layer);

        Ok(Self {
            order,
            offsets,
            edges,
        })
    }

    /// Node indices in firing order.
    #[inline]
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Outgoing edges of the node at `node_idx`, in gene order.
    #[inline]
    #[must_use]
    pub fn outgoing(&self, node_idx: usize) -> &[Edge] {
        match (self.offsets.get(node_idx), self.offsets.get(node_idx + 1)) {
            (Some(&start), Some(&end)) => &self.edges[start..end],
            _ => &[],
        }
    }

    /// Number of nodes covered.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Number of indexed edges, enabled or not.
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

//! NEAT genome: layered node arena plus innovation-tagged connection genes.
//!
//! Nodes live in a flat `Vec` in creation order and are addressed by stable
//! [`NodeId`]s; genes store endpoint ids instead of references. Adjacency is
//! never kept eagerly in sync: structural mutations drop the compiled
//! [`Network`] and [`Genome::compile_network`](crate::Genome::compile_network)
//! rebuilds it from scratch.
//!
//! ## Layers
//!
//! Layer 0 holds the inputs and the bias, the top layer holds the outputs.
//! A gene always runs from a lower to a higher layer. When a split needs a
//! layer that does not exist yet, every node at or above the insertion point
//! moves up one layer.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MutationConfig;
use crate::error::{NeatError, Result};
use crate::gene::{ConnectionGene, NodeGene, NodeId};
use crate::innovation::InnovationTracker;
use crate::topology::Network;

/// Read-only view of a node for persistence and visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    /// Stable node id.
    pub id: NodeId,
    /// Evaluation layer.
    pub layer: u32,
}

/// Read-only view of a connection gene for persistence and visualization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneView {
    /// Source node id.
    pub from: NodeId,
    /// Target node id.
    pub to: NodeId,
    /// Connection weight.
    pub weight: f32,
    /// Whether the connection takes part in evaluation.
    pub enabled: bool,
    /// Historical marking.
    pub innovation: u64,
}

/// A NEAT genome representing one agent's brain.
#[derive(Debug, Serialize, Deserialize)]
pub struct Genome {
    pub(crate) inputs: usize,
    pub(crate) outputs: usize,
    pub(crate) bias_node: NodeId,
    pub(crate) layer_count: u32,
    pub(crate) next_node: u32,
    /// Nodes in creation order: inputs, outputs, bias, then hidden nodes.
    pub(crate) nodes: Vec<NodeGene>,
    /// Genes in the order they were added.
    pub(crate) genes: Vec<ConnectionGene>,
    #[serde(default)]
    pub(crate) config: MutationConfig,
    /// `None` whenever the structure changed since the last compile.
    #[serde(skip)]
    pub(crate) network: Option<Network>,
}

impl Clone for Genome {
    /// Structural copy. Node activation state is not carried over; the
    /// compiled network is, since the structure is identical.
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs,
            outputs: self.outputs,
            bias_node: self.bias_node,
            layer_count: self.layer_count,
            next_node: self.next_node,
            nodes: self.nodes.iter().map(NodeGene::clone_structure).collect(),
            genes: self.genes.clone(),
            config: self.config,
            network: self.network.clone(),
        }
    }
}

impl Genome {
    /// Create an unconnected genome: `inputs` input nodes and the bias on
    /// layer 0, `outputs` output nodes on layer 1.
    #[must_use]
    pub fn new(inputs: usize, outputs: usize, config: MutationConfig) -> Self {
        let mut nodes = Vec::with_capacity(inputs + outputs + 1);
        let mut next_node = 0u32;

        for _ in 0..inputs {
            nodes.push(NodeGene::new(NodeId(next_node), 0));
            next_node += 1;
        }
        for _ in 0..outputs {
            nodes.push(NodeGene::new(NodeId(next_node), 1));
            next_node += 1;
        }
        let bias_node = NodeId(next_node);
        nodes.push(NodeGene::new(bias_node, 0));
        next_node += 1;

        let network = Network::compile(&nodes, &[]).ok();
        Self {
            inputs,
            outputs,
            bias_node,
            layer_count: 2,
            next_node,
            nodes,
            genes: Vec::new(),
            config,
            network,
        }
    }

    /// Number of input nodes (excluding bias).
    #[must_use]
    pub const fn input_count(&self) -> usize {
        self.inputs
    }

    /// Number of output nodes.
    #[must_use]
    pub const fn output_count(&self) -> usize {
        self.outputs
    }

    /// Id of the bias node.
    #[must_use]
    pub const fn bias_node(&self) -> NodeId {
        self.bias_node
    }

    /// Number of layers, inputs through outputs.
    #[must_use]
    pub const fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// Mutation settings this genome carries.
    #[must_use]
    pub const fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Nodes in creation order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    /// Genes in the order they were added.
    #[must_use]
    pub fn genes(&self) -> &[ConnectionGene] {
        &self.genes
    }

    /// Ordered `(id, layer)` list.
    #[must_use]
    pub fn node_views(&self) -> Vec<NodeView> {
        self.nodes
            .iter()
            .map(|n| NodeView {
                id: n.id,
                layer: n.layer,
            })
            .collect()
    }

    /// Ordered `(from, to, weight, enabled, innovation)` list.
    #[must_use]
    pub fn gene_views(&self) -> Vec<GeneView> {
        self.genes
            .iter()
            .map(|g| GeneView {
                from: g.from,
                to: g.to,
                weight: g.weight,
                enabled: g.enabled,
                innovation: g.innovation,
            })
            .collect()
    }

    /// Number of nodes created by splitting connections.
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.nodes.len().saturating_sub(self.inputs + self.outputs + 1)
    }

    /// Number of enabled genes.
    #[must_use]
    pub fn enabled_gene_count(&self) -> usize {
        self.genes.iter().filter(|g| g.enabled).count()
    }

    /// Whether the compiled network matches the current structure.
    #[must_use]
    pub const fn is_compiled(&self) -> bool {
        self.network.is_some()
    }

    /// Position of `id` in the node list.
    pub(crate) fn node_index(&self, id: NodeId) -> Option<usize> {
        // Ids equal positions unless the genome was assembled by hand.
        match self.nodes.get(id.index()) {
            Some(node) if node.id == id => Some(id.index()),
            _ => self.nodes.iter().position(|n| n.id == id),
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.node_index(id).map(|i| &self.nodes[i])
    }

    /// Look up a gene by innovation number.
    #[must_use]
    pub fn gene_by_innovation(&self, innovation: u64) -> Option<&ConnectionGene> {
        self.genes.iter().find(|g| g.innovation == innovation)
    }

    /// Whether a gene, enabled or not, joins `a` and `b` in either direction.
    #[must_use]
    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.genes
            .iter()
            .any(|g| (g.from == a && g.to == b) || (g.from == b && g.to == a))
    }

    /// Whether every legal cross-layer pair is already wired.
    ///
    /// Counts distinct node pairs joined by a gene, so duplicate genes from
    /// splitting a bias connection do not make a genome look saturated.
    #[must_use]
    pub fn fully_connected(&self) -> bool {
        let mut per_layer = vec![0usize; self.layer_count as usize];
        for node in &self.nodes {
            if let Some(count) = per_layer.get_mut(node.layer as usize) {
                *count += 1;
            }
        }

        let mut above: usize = per_layer.iter().sum();
        let mut max_connections = 0;
        for &count in &per_layer {
            above -= count;
            max_connections += count * above;
        }

        self.wired_pairs().len() >= max_connections
    }

    /// Distinct unordered node pairs joined by a gene, enabled or not.
    fn wired_pairs(&self) -> HashSet<(NodeId, NodeId)> {
        self.genes
            .iter()
            .map(|g| (g.from.min(g.to), g.from.max(g.to)))
            .collect()
    }

    /// Add a connection between two specific nodes.
    ///
    /// The pair is reordered so the lower-layer node is the source. The
    /// weight is clamped to [-1, 1]. Returns the index of the new gene.
    ///
    /// # Errors
    ///
    /// - [`NeatError::UnknownNode`] if either id is not in the genome
    /// - [`NeatError::SameLayer`] if both nodes share a layer
    /// - [`NeatError::AlreadyConnected`] if a gene already joins them
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: f32,
        tracker: &mut InnovationTracker,
    ) -> Result<usize> {
        let from_layer = self.node(from).ok_or(NeatError::UnknownNode(from))?.layer;
        let to_layer = self.node(to).ok_or(NeatError::UnknownNode(to))?.layer;

        if from_layer == to_layer {
            return Err(NeatError::SameLayer { from, to });
        }
        if self.is_connected(from, to) {
            return Err(NeatError::AlreadyConnected { from, to });
        }

        let (source, target) = if from_layer < to_layer {
            (from, to)
        } else {
            (to, from)
        };
        Ok(self.push_gene(source, target, weight.clamp(-1.0, 1.0), tracker))
    }

    /// Append a gene that is already known to be legal.
    fn push_gene(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: f32,
        tracker: &mut InnovationTracker,
    ) -> usize {
        let innovation = tracker.get_or_create(from, to, self);
        self.genes
            .push(ConnectionGene::new(from, to, weight, innovation));
        self.network = None;
        self.genes.len() - 1
    }

    /// Apply one round of mutation.
    ///
    /// A genome without genes always gains a connection. Otherwise three
    /// independent trials run: perturb every weight, add a connection, add a
    /// node.
    pub fn mutate<R: Rng>(&mut self, tracker: &mut InnovationTracker, rng: &mut R) {
        if self.genes.is_empty() {
            self.add_connection(tracker, rng);
            return;
        }

        if rng.random::<f32>() < self.config.weight_mutation_prob {
            let config = self.config;
            for gene in &mut self.genes {
                gene.mutate_weight(&config, rng);
            }
        }

        if rng.random::<f32>() < self.config.add_connection_prob {
            self.add_connection(tracker, rng);
        }

        if rng.random::<f32>() < self.config.add_node_prob {
            self.add_node(tracker, rng);
        }
    }

    /// Wire a random legal pair with a uniform weight in [-1, 1].
    ///
    /// Silently does nothing when every legal pair is already wired.
    pub fn add_connection<R: Rng>(&mut self, tracker: &mut InnovationTracker, rng: &mut R) {
        let wired = self.wired_pairs();

        let mut candidates = Vec::new();
        for (i, a) in self.nodes.iter().enumerate() {
            for b in &self.nodes[i + 1..] {
                if a.layer != b.layer && !wired.contains(&(a.id.min(b.id), a.id.max(b.id))) {
                    let pair = if a.layer < b.layer {
                        (a.id, b.id)
                    } else {
                        (b.id, a.id)
                    };
                    candidates.push(pair);
                }
            }
        }

        if candidates.is_empty() {
            return;
        }
        let (from, to) = candidates[rng.random_range(0..candidates.len())];
        let weight = rng.random_range(-1.0..=1.0);
        self.push_gene(from, to, weight, tracker);
        debug!(%from, %to, weight, "added connection");
    }

    /// Split a random gene with a new hidden node.
    ///
    /// The split gene is disabled and replaced by `from -> new` (weight 1),
    /// `new -> to` (the old weight) and `bias -> new` (weight 0).
    /// Bias-originating genes are only split when nothing else is available.
    pub fn add_node<R: Rng>(&mut self, tracker: &mut InnovationTracker, rng: &mut R) {
        if self.genes.is_empty() {
            self.add_connection(tracker, rng);
            return;
        }

        let bias = self.bias_node;
        let non_bias: Vec<usize> = (0..self.genes.len())
            .filter(|&i| self.genes[i].from != bias)
            .collect();
        let split = if non_bias.is_empty() {
            rng.random_range(0..self.genes.len())
        } else {
            non_bias[rng.random_range(0..non_bias.len())]
        };

        let gene = &self.genes[split];
        let (from, to, weight) = (gene.from, gene.to, gene.weight);
        let (Some(from_layer), Some(to_layer)) =
            (self.node(from).map(|n| n.layer), self.node(to).map(|n| n.layer))
        else {
            warn!(%from, %to, "split gene references a missing node");
            return;
        };
        self.genes[split].enabled = false;

        let new_id = NodeId(self.next_node);
        self.next_node += 1;
        let new_layer = from_layer + 1;
        self.nodes.push(NodeGene::new(new_id, new_layer));

        self.push_gene(from, new_id, 1.0, tracker);
        self.push_gene(new_id, to, weight, tracker);
        self.push_gene(bias, new_id, 0.0, tracker);

        if new_layer == to_layer {
            let last = self.nodes.len() - 1;
            for node in &mut self.nodes[..last] {
                if node.layer >= new_layer {
                    node.layer += 1;
                }
            }
            self.layer_count += 1;
        }

        debug!(
            node = %new_id,
            layer = new_layer,
            layers = self.layer_count,
            "split connection"
        );
    }

    /// Produce a child from `self` (the fitter parent) and `other`.
    ///
    /// The child copies `self`'s nodes. Genes matching by innovation take
    /// their weight from either parent and, if either copy is disabled, stay
    /// disabled with probability `disable_inherited_prob`. Disjoint and
    /// excess genes come from `self` unchanged.
    #[must_use]
    pub fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let partner_genes: HashMap<u64, &ConnectionGene> =
            other.genes.iter().map(|g| (g.innovation, g)).collect();

        let mut genes = Vec::with_capacity(self.genes.len());
        for gene in &self.genes {
            let child_gene = match partner_genes.get(&gene.innovation) {
                Some(&partner) => {
                    let mut enabled = true;
                    if (!gene.enabled || !partner.enabled)
                        && rng.random::<f32>() < self.config.disable_inherited_prob
                    {
                        enabled = false;
                    }

                    let mut chosen = if rng.random::<f32>() < self.config.inherit_weight_prob {
                        gene.clone()
                    } else {
                        partner.rebind(gene.from, gene.to)
                    };
                    chosen.enabled = enabled;
                    chosen
                }
                None => gene.clone(),
            };
            genes.push(child_gene);
        }

        let mut child = Self {
            inputs: self.inputs,
            outputs: self.outputs,
            bias_node: self.bias_node,
            layer_count: self.layer_count,
            next_node: self.next_node,
            nodes: self.nodes.iter().map(NodeGene::clone_structure).collect(),
            genes,
            config: self.config,
            network: None,
        };
        child.recompile();
        child
    }

    /// Rebuild the network, logging instead of failing. Only used on genomes
    /// derived from an already valid parent.
    pub(crate) fn recompile(&mut self) {
        if let Err(err) = self.compile_network() {
            warn!(%err, "could not compile derived genome");
        }
    }

    /// Check structural invariants of a genome loaded from outside.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::MalformedGenome`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let malformed = |msg: String| Err(NeatError::MalformedGenome(msg));

        let fixed = self.inputs + self.outputs + 1;
        if self.inputs == 0 || self.outputs == 0 {
            return malformed("genome needs inputs and outputs".into());
        }
        if self.nodes.len() < fixed {
            return malformed(format!(
                "expected at least {fixed} nodes, found {}",
                self.nodes.len()
            ));
        }
        if self.layer_count < 2 {
            return malformed(format!("layer_count {} below 2", self.layer_count));
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return malformed(format!("duplicate node {}", node.id));
            }
            if node.layer >= self.layer_count {
                return malformed(format!(
                    "node {} on layer {} of {}",
                    node.id, node.layer, self.layer_count
                ));
            }
            if node.id.0 >= self.next_node {
                return malformed(format!("node {} not below next id", node.id));
            }
        }

        let top = self.layer_count - 1;
        for (i, node) in self.nodes[..fixed].iter().enumerate() {
            let expected_layer = if (self.inputs..self.inputs + self.outputs).contains(&i) {
                top
            } else {
                0
            };
            if node.id.index() != i || node.layer != expected_layer {
                return malformed(format!("fixed node {i} out of place"));
            }
        }
        if self.bias_node.index() != fixed - 1 {
            return malformed(format!("bias node {} out of place", self.bias_node));
        }

        for gene in &self.genes {
            let (Some(from), Some(to)) = (self.node(gene.from), self.node(gene.to)) else {
                return malformed(format!(
                    "gene {} references a missing node",
                    gene.innovation
                ));
            };
            if from.layer >= to.layer {
                return malformed(format!(
                    "gene {} runs from layer {} to layer {}",
                    gene.innovation, from.layer, to.layer
                ));
            }
            if !gene.weight.is_finite() {
                return malformed(format!("gene {} has a non-finite weight", gene.innovation));
            }
        }
        Ok(())
    }

    /// Validate and compile a genome that was deserialized by the host.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::MalformedGenome`] if validation fails.
    pub fn restore(mut genome: Self) -> Result<Self> {
        genome.validate()?;
        genome.compile_network()?;
        Ok(genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn wired_genome(tracker: &mut InnovationTracker) -> Genome {
        let mut genome = Genome::new(2, 1, MutationConfig::default());
        genome.connect(NodeId(0), NodeId(2), 0.5, tracker).unwrap();
        genome.connect(NodeId(1), NodeId(2), -0.5, tracker).unwrap();
        genome
    }

    fn assert_no_same_layer_genes(genome: &Genome) {
        for gene in genome.genes() {
            let from = genome.node(gene.from).unwrap().layer;
            let to = genome.node(gene.to).unwrap().layer;
            assert!(from < to, "gene {} is not feed-forward", gene.innovation);
        }
    }

    #[test]
    fn test_new_genome_layout() {
        let genome = Genome::new(7, 3, MutationConfig::default());

        assert_eq!(genome.nodes().len(), 11);
        assert_eq!(genome.bias_node(), NodeId(10));
        assert_eq!(genome.layer_count(), 2);
        assert!(genome.genes().is_empty());
        assert!(genome.is_compiled());
        assert_eq!(genome.hidden_count(), 0);
        assert!(genome.nodes()[..7].iter().all(|n| n.layer == 0));
        assert!(genome.nodes()[7..10].iter().all(|n| n.layer == 1));
        assert_eq!(genome.node(NodeId(10)).unwrap().layer, 0);
    }

    #[test]
    fn test_connect_orders_pair_by_layer() {
        let mut tracker = InnovationTracker::new();
        let mut genome = Genome::new(2, 1, MutationConfig::default());

        let idx = genome.connect(NodeId(2), NodeId(0), 3.0, &mut tracker).unwrap();
        let gene = &genome.genes()[idx];
        assert_eq!(gene.from, NodeId(0));
        assert_eq!(gene.to, NodeId(2));
        assert_eq!(gene.weight, 1.0);
        assert!(!genome.is_compiled());
    }

    #[test]
    fn test_connect_rejects_illegal_pairs() {
        let mut tracker = InnovationTracker::new();
        let mut genome = wired_genome(&mut tracker);

        assert_eq!(
            genome.connect(NodeId(0), NodeId(1), 0.1, &mut tracker),
            Err(NeatError::SameLayer {
                from: NodeId(0),
                to: NodeId(1)
            })
        );
        assert_eq!(
            genome.connect(NodeId(2), NodeId(0), 0.1, &mut tracker),
            Err(NeatError::AlreadyConnected {
                from: NodeId(2),
                to: NodeId(0)
            })
        );
        assert_eq!(
            genome.connect(NodeId(0), NodeId(9), 0.1, &mut tracker),
            Err(NeatError::UnknownNode(NodeId(9)))
        );
    }

    #[test]
    fn test_first_mutation_forces_connection() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(7, 3, MutationConfig::default());

        genome.mutate(&mut tracker, &mut rng);
        assert_eq!(genome.genes().len(), 1);
        assert!(genome.genes()[0].enabled);
        assert_no_same_layer_genes(&genome);
    }

    #[test]
    fn test_fully_connected_counts_layers() {
        let mut tracker = InnovationTracker::new();
        let mut genome = wired_genome(&mut tracker);
        assert!(!genome.fully_connected());

        genome.connect(NodeId(3), NodeId(2), 0.0, &mut tracker).unwrap();
        assert!(genome.fully_connected());
    }

    #[test]
    fn test_add_connection_fills_until_full() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(3, 2, MutationConfig::default());

        // 4 layer-0 nodes (3 inputs + bias) times 2 outputs.
        for _ in 0..20 {
            genome.add_connection(&mut tracker, &mut rng);
        }
        assert_eq!(genome.genes().len(), 8);
        assert!(genome.fully_connected());
        assert_no_same_layer_genes(&genome);
    }

    #[test]
    fn test_duplicate_bias_genes_do_not_saturate() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(1, 1, MutationConfig::default());
        genome.connect(NodeId(2), NodeId(1), 0.3, &mut tracker).unwrap();

        // Only a bias gene to split: bias -> hidden ends up wired twice.
        genome.add_node(&mut tracker, &mut rng);
        genome.connect(NodeId(0), NodeId(1), 0.3, &mut tracker).unwrap();
        let hidden = NodeId(3);
        assert_eq!(genome.genes().len(), 5);
        assert!(!genome.is_connected(NodeId(0), hidden));
        assert!(!genome.fully_connected());

        genome.add_connection(&mut tracker, &mut rng);
        assert_eq!(genome.genes().len(), 6);
        assert!(genome.is_connected(NodeId(0), hidden));
        assert!(genome.fully_connected());
    }

    #[test]
    fn test_add_node_with_dangling_gene_changes_nothing() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(2, 1, MutationConfig::default());
        genome
            .genes
            .push(ConnectionGene::new(NodeId(0), NodeId(42), 0.5, 0));

        genome.add_node(&mut tracker, &mut rng);
        assert_eq!(genome.genes().len(), 1);
        assert!(genome.genes()[0].enabled);
        assert_eq!(genome.nodes().len(), 4);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_add_node_structure() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = wired_genome(&mut tracker);

        let nodes_before = genome.nodes().len();
        let genes_before = genome.genes().len();
        genome.add_node(&mut tracker, &mut rng);

        assert_eq!(genome.nodes().len(), nodes_before + 1);
        assert_eq!(genome.genes().len(), genes_before + 3);
        assert_eq!(genome.enabled_gene_count(), genes_before + 2);
        assert_eq!(genome.layer_count(), 3);
        assert_eq!(genome.hidden_count(), 1);

        let hidden = genome.nodes().last().unwrap();
        assert_eq!(hidden.layer, 1);
        assert_eq!(genome.node(NodeId(2)).unwrap().layer, 2);

        let new_genes = &genome.genes()[genes_before..];
        assert_eq!(new_genes[0].to, hidden.id);
        assert_eq!(new_genes[0].weight, 1.0);
        assert_eq!(new_genes[1].from, hidden.id);
        assert_eq!(new_genes[2].from, genome.bias_node());
        assert_eq!(new_genes[2].weight, 0.0);

        let split = genome
            .genes()
            .iter()
            .find(|g| !g.enabled)
            .expect("split gene is disabled");
        assert_eq!(new_genes[0].from, split.from);
        assert_eq!(new_genes[1].to, split.to);
        assert_eq!(new_genes[1].weight, split.weight);

        genome.compile_network().unwrap();
        assert_no_same_layer_genes(&genome);
    }

    #[test]
    fn test_add_node_shifts_layers_only_when_needed() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = wired_genome(&mut tracker);
        genome.add_node(&mut tracker, &mut rng);
        // The unsplit input -> output gene now spans two layers.

        for _ in 0..30 {
            let mut copy = genome.clone();
            copy.add_node(&mut tracker, &mut rng);

            // The split gene's endpoints reappear on the first two new genes.
            let n = genome.genes().len();
            let (from, to) = (copy.genes()[n].from, copy.genes()[n + 1].to);
            let span = genome.node(to).unwrap().layer - genome.node(from).unwrap().layer;
            let grew = copy.layer_count() - genome.layer_count();
            assert_eq!(grew, u32::from(span == 1));
            assert_no_same_layer_genes(&copy);
        }
    }

    #[test]
    fn test_add_node_prefers_non_bias_genes() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(1, 1, MutationConfig::default());
        genome.connect(NodeId(2), NodeId(1), 0.3, &mut tracker).unwrap();
        genome.connect(NodeId(0), NodeId(1), 0.3, &mut tracker).unwrap();

        for _ in 0..10 {
            let mut copy = genome.clone();
            copy.add_node(&mut tracker, &mut rng);
            assert!(copy.genes()[0].enabled, "bias gene should not be split");
            assert!(!copy.genes()[1].enabled);
        }
    }

    #[test]
    fn test_add_node_on_empty_genome_connects() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(2, 1, MutationConfig::default());
        genome.add_node(&mut tracker, &mut rng);
        assert_eq!(genome.genes().len(), 1);
        assert_eq!(genome.hidden_count(), 0);
    }

    #[test]
    fn test_mutation_keeps_invariants() {
        let config = MutationConfig {
            add_connection_prob: 0.5,
            add_node_prob: 0.3,
            ..MutationConfig::default()
        };
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = Genome::new(4, 2, config);

        for _ in 0..200 {
            genome.mutate(&mut tracker, &mut rng);
        }
        assert!(genome.hidden_count() > 0);
        assert!(genome.genes().iter().all(|g| (-1.0..=1.0).contains(&g.weight)));
        assert_no_same_layer_genes(&genome);
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn test_crossover_with_self_keeps_weights() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let genome = wired_genome(&mut tracker);

        let child = genome.crossover(&genome, &mut rng);
        assert!(child.is_compiled());
        assert_eq!(child.genes(), genome.genes());
        assert_eq!(child.node_views(), genome.node_views());
    }

    #[test]
    fn test_crossover_disjoint_genes_from_fitter_parent() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let fitter = wired_genome(&mut tracker);

        let mut weaker = Genome::new(2, 1, MutationConfig::default());
        weaker.connect(NodeId(0), NodeId(2), -0.9, &mut tracker).unwrap();
        weaker.connect(NodeId(3), NodeId(2), 0.2, &mut tracker).unwrap();

        let child = fitter.crossover(&weaker, &mut rng);
        let innovations: Vec<u64> = child.genes().iter().map(|g| g.innovation).collect();
        let expected: Vec<u64> = fitter.genes().iter().map(|g| g.innovation).collect();
        assert_eq!(innovations, expected);

        // The shared first gene takes one of the two parents' weights.
        let w = child.genes()[0].weight;
        assert!(w == 0.5 || w == -0.9);
        // The second gene has no partner and is copied as is.
        assert_eq!(child.genes()[1], fitter.genes()[1]);
    }

    #[test]
    fn test_crossover_disable_rule() {
        let config = MutationConfig {
            disable_inherited_prob: 1.0,
            ..MutationConfig::default()
        };
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut parent = Genome::new(2, 1, config);
        parent.connect(NodeId(0), NodeId(2), 0.5, &mut tracker).unwrap();
        parent.connect(NodeId(1), NodeId(2), 0.5, &mut tracker).unwrap();
        let mut other = parent.clone();
        other.genes[0].enabled = false;

        let child = parent.crossover(&other, &mut rng);
        assert!(!child.genes()[0].enabled);
        assert!(child.genes()[1].enabled);
    }

    #[test]
    fn test_crossover_disable_rate() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut parent = Genome::new(2, 1, MutationConfig::default());
        parent.connect(NodeId(0), NodeId(2), 0.5, &mut tracker).unwrap();
        let mut other = parent.clone();
        other.genes[0].enabled = false;

        let trials = 4000;
        let disabled = (0..trials)
            .filter(|_| !parent.crossover(&other, &mut rng).genes()[0].enabled)
            .count();
        let rate = disabled as f32 / trials as f32;
        assert!((rate - 0.75).abs() < 0.03, "disable rate {rate}");
    }

    #[test]
    fn test_clone_is_structural_copy() {
        let mut tracker = InnovationTracker::new();
        let mut genome = wired_genome(&mut tracker);
        genome.compile_network().unwrap();
        genome.nodes[2].input_sum = 3.0;

        let copy = genome.clone();
        assert_eq!(copy.genes(), genome.genes());
        assert_eq!(copy.node_views(), genome.node_views());
        assert!(copy.is_compiled());
        assert_eq!(copy.nodes()[2].input_sum, 0.0);
    }

    #[test]
    fn test_views() {
        let mut tracker = InnovationTracker::new();
        let genome = wired_genome(&mut tracker);

        let nodes = genome.node_views();
        assert_eq!(nodes[2], NodeView { id: NodeId(2), layer: 1 });

        let genes = genome.gene_views();
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[1].from, NodeId(1));
        assert_eq!(genes[1].weight, -0.5);
        assert!(genes[1].enabled);
        assert_eq!(genes[1].innovation, 1);
    }

    #[test]
    fn test_validate_rejects_backward_gene() {
        let mut tracker = InnovationTracker::new();
        let mut genome = wired_genome(&mut tracker);
        genome.genes[0].from = NodeId(2);
        genome.genes[0].to = NodeId(0);

        assert!(matches!(
            Genome::restore(genome),
            Err(NeatError::MalformedGenome(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip_restores() {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        let mut genome = wired_genome(&mut tracker);
        genome.add_node(&mut tracker, &mut rng);

        let json = serde_json::to_string(&genome).expect("serialize");
        let loaded: Genome = serde_json::from_str(&json).expect("deserialize");
        assert!(!loaded.is_compiled());

        let restored = Genome::restore(loaded).expect("valid genome");
        assert!(restored.is_compiled());
        assert_eq!(restored.gene_views(), genome.gene_views());
        assert_eq!(restored.layer_count(), genome.layer_count());
    }
}

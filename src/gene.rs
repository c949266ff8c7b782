//! Gene types for NEAT genomes.
//!
//! This module defines the fundamental building blocks of NEAT networks:
//! - [`NodeGene`]: a neuron with a layer index and transient activation state
//! - [`ConnectionGene`]: a weighted, innovation-tagged edge between two nodes

use std::fmt;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::activation::steepened_sigmoid;
use crate::config::MutationConfig;

/// Stable identifier for a node within a genome.
///
/// Ids are assigned in creation order and survive cloning and crossover, so
/// two genomes descended from the same ancestor can be compared node by node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The id as a `usize`, for indexing.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node gene representing a neuron in the NEAT network.
///
/// Layer 0 holds the inputs and the bias; the highest layer holds the outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGene {
    /// Stable id, unique within the genome.
    pub id: NodeId,
    /// Evaluation layer. Genes only ever run from a lower to a higher layer.
    pub layer: u32,
    /// Weighted sum accumulated from incoming connections this pass.
    #[serde(skip)]
    pub input_sum: f32,
    /// Value this node emits to its outgoing connections.
    #[serde(skip)]
    pub output: f32,
}

impl NodeGene {
    /// Create a node with cleared activation state.
    #[must_use]
    pub const fn new(id: NodeId, layer: u32) -> Self {
        Self {
            id,
            layer,
            input_sum: 0.0,
            output: 0.0,
        }
    }

    /// Fire the node and return the value it sends downstream.
    ///
    /// Layer-0 nodes (inputs and bias) pass their externally set output
    /// through unchanged; every other node squashes its accumulated input.
    #[inline]
    pub fn activate(&mut self) -> f32 {
        if self.layer != 0 {
            self.output = steepened_sigmoid(self.input_sum);
        }
        self.output
    }

    /// Copy id and layer only; activation state starts cleared.
    #[must_use]
    pub const fn clone_structure(&self) -> Self {
        Self::new(self.id, self.layer)
    }
}

/// A connection gene representing a weighted link between two nodes.
///
/// Endpoints are stored by [`NodeId`], never by reference, so genes can be
/// copied between genomes that share node numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Connection weight, kept within [-1, 1].
    pub weight: f32,
    /// Disabled genes are skipped during evaluation but kept for crossover.
    pub enabled: bool,
    /// Historical marking shared by every genome that made the same mutation.
    pub innovation: u64,
}

impl ConnectionGene {
    /// Create a new enabled connection.
    #[must_use]
    pub const fn new(from: NodeId, to: NodeId, weight: f32, innovation: u64) -> Self {
        Self {
            from,
            to,
            weight,
            enabled: true,
            innovation,
        }
    }

    /// Perturb or replace the weight.
    ///
    /// With probability `weight_replace_prob` the weight is redrawn uniformly
    /// from [-1, 1]; otherwise Gaussian noise is added. The result is always
    /// clamped to [-1, 1].
    pub fn mutate_weight<R: Rng>(&mut self, config: &MutationConfig, rng: &mut R) {
        if rng.random::<f32>() < config.weight_replace_prob {
            self.weight = rng.random_range(-1.0..=1.0);
        } else {
            let noise: f32 = rng.sample(StandardNormal);
            self.weight += noise * config.weight_perturb_std;
        }
        self.weight = self.weight.clamp(-1.0, 1.0);
    }

    /// Copy this gene onto new endpoints, keeping weight, enabled flag and
    /// innovation.
    #[must_use]
    pub fn rebind(&self, from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            ..self.clone()
        }
    }
}

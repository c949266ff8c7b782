//! # Dino NEAT
//!
//! A NeuroEvolution of Augmenting Topologies (NEAT) engine that evolves the
//! brains of players in a side-scrolling obstacle-jumping game.
//!
//! ## Features
//!
//! - **Layered Genomes**: Nodes carry an integer layer and connections only
//!   run upward, so every network is feed-forward by construction
//! - **Context-Sensitive Innovation**: A shared [`InnovationTracker`] reuses a
//!   number only for the same edge added to the same ancestral gene set
//! - **Speciation**: Compatibility distance, fitness sharing, staleness and
//!   proportional offspring allocation
//! - **Agent Trait**: The game plugs in through [`Agent`]; the engine never
//!   sees physics or rendering
//!
//! ## Quick Start
//!
//! ```rust
//! use dino_neat::{Genome, InnovationTracker, MutationConfig, NodeId};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut tracker = InnovationTracker::new();
//!
//! // 2 inputs, 1 output, plus the bias node (id 3)
//! let mut genome = Genome::new(2, 1, MutationConfig::default());
//! genome.connect(NodeId(0), NodeId(2), 1.0, &mut tracker).unwrap();
//! genome.mutate(&mut tracker, &mut rng);
//! genome.compile_network().unwrap();
//!
//! let output = genome.feed_forward(&[1.0, 0.0]).unwrap();
//! assert!(output[0] > 0.0 && output[0] < 1.0);
//! ```
//!
//! ## Training Loop
//!
//! ```rust,ignore
//! use dino_neat::{NeatConfig, Population};
//!
//! let mut population: Population<Dino> = Population::new(NeatConfig::dino(500), &mut rng)?;
//! loop {
//!     while !population.done() {
//!         world.step();
//!         population.update_alive(&world)?;
//!     }
//!     population.natural_selection(&mut rng);
//!     world.reset();
//! }
//!
//! // Later: continue from the last generation's best brain.
//! let last = population.history().last().cloned().unwrap();
//! let population: Population<Dino> = Population::resume(
//!     NeatConfig::dino(500),
//!     last.best_genome.unwrap(),
//!     last.generation + 1,
//!     &mut rng,
//! )?;
//! ```
//!
//! ## Architecture
//!
//! ### Arena Genomes
//!
//! Nodes live in a `Vec` in creation order and are addressed by a stable
//! [`NodeId`]; connection genes store endpoint ids, never references. Cloning
//! and crossover are plain copies and cannot leave dangling links.
//!
//! ### Compiled Networks
//!
//! [`Genome::compile_network`] derives the firing order and a CSR
//! outgoing-edge index from the genes. Structural mutation marks it stale;
//! weight mutation does not.

pub mod activation;
pub mod agent;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod population;
pub mod species;
pub mod topology;

// Re-exports for convenience
pub use activation::steepened_sigmoid;
pub use agent::{Agent, Decisions, Sensors};
pub use config::{MutationConfig, NeatConfig, SpeciationConfig, DECISION_COUNT, SENSOR_COUNT};
pub use error::{NeatError, Result};
pub use gene::{ConnectionGene, NodeGene, NodeId};
pub use genome::{GeneView, Genome, NodeView};
pub use innovation::{InnovationTracker, MutationRecord};
pub use population::{ChampionRecord, GenerationStats, Population};
pub use species::{compatibility_distance, Species};
pub use topology::Network;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_serialization_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        let mut tracker = InnovationTracker::new();
        let mut genome = Genome::new(SENSOR_COUNT, DECISION_COUNT, MutationConfig::default());
        genome.mutate(&mut tracker, &mut rng);
        genome.add_node(&mut tracker, &mut rng);

        let json = serde_json::to_string(&genome).expect("Serialization failed");
        let restored: Genome = serde_json::from_str(&json).expect("Deserialization failed");
        let restored = Genome::restore(restored).expect("restored genome is valid");

        assert_eq!(genome.node_views(), restored.node_views());
        assert_eq!(genome.gene_views(), restored.gene_views());
        assert_eq!(genome.layer_count(), restored.layer_count());
        assert!(restored.is_compiled());
    }

    #[test]
    fn test_tracker_serialization_keeps_numbering() {
        let mut tracker = InnovationTracker::new();
        let mut genome = Genome::new(2, 1, MutationConfig::default());
        genome.connect(NodeId(0), NodeId(2), 0.5, &mut tracker).unwrap();

        let json = serde_json::to_string(&tracker).unwrap();
        let mut restored: InnovationTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.history(), tracker.history());

        let fresh = Genome::new(2, 1, MutationConfig::default());
        assert_eq!(restored.get_or_create(NodeId(0), NodeId(2), &fresh), 0);
        assert_eq!(restored.next_innovation(), 1);
    }
}

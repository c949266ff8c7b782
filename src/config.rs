//! Tunable parameters for mutation, speciation and population management.
//!
//! Defaults reproduce the constants the dino trainer has always used. All
//! structs are serde-serializable so a host can keep them next to its save
//! files.

use serde::{Deserialize, Serialize};

use crate::error::{NeatError, Result};

/// Number of sensor readings an agent feeds its brain each frame.
pub const SENSOR_COUNT: usize = 7;
/// Number of decisions (small jump, big jump, duck) a brain produces.
pub const DECISION_COUNT: usize = 3;

/// Per-genome mutation and inheritance probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability that a `mutate` call perturbs every connection weight.
    pub weight_mutation_prob: f32,
    /// Probability that a single weight mutation replaces the weight outright.
    pub weight_replace_prob: f32,
    /// Standard deviation of the Gaussian weight perturbation.
    pub weight_perturb_std: f32,
    /// Probability that a `mutate` call adds a connection.
    pub add_connection_prob: f32,
    /// Probability that a `mutate` call splits a connection with a new node.
    pub add_node_prob: f32,
    /// Probability that a matching gene disabled in either parent stays
    /// disabled in the child.
    pub disable_inherited_prob: f32,
    /// Probability that a matching gene takes its weight from the fitter parent.
    pub inherit_weight_prob: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            weight_mutation_prob: 0.8,
            weight_replace_prob: 0.1,
            weight_perturb_std: 0.02,
            add_connection_prob: 0.05,
            add_node_prob: 0.01,
            disable_inherited_prob: 0.75,
            inherit_weight_prob: 0.5,
        }
    }
}

/// Compatibility, culling and reproduction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciationConfig {
    /// Coefficient on the disjoint/excess gene count.
    pub excess_coeff: f32,
    /// Coefficient on the mean weight difference of matching genes.
    pub weight_diff_coeff: f32,
    /// Maximum distance at which a genome joins a species.
    pub compatibility_threshold: f32,
    /// Genomes with fewer genes than this are not normalized by gene count.
    pub small_genome_threshold: usize,
    /// Weight difference assumed when two genomes share no genes.
    pub no_match_weight_diff: f32,
    /// Probability that a baby is a straight clone of the species' best.
    pub clone_champion_prob: f32,
    /// Generations without improvement after which a species is dropped.
    pub stale_limit: u32,
    /// Species kept by a mass extinction.
    pub mass_extinction_survivors: usize,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            excess_coeff: 1.0,
            weight_diff_coeff: 0.5,
            compatibility_threshold: 3.0,
            small_genome_threshold: 20,
            no_match_weight_diff: 100.0,
            clone_champion_prob: 0.25,
            stale_limit: 15,
            mass_extinction_survivors: 5,
        }
    }
}

/// Top-level configuration for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeatConfig {
    /// Input nodes per genome (excluding bias).
    pub inputs: usize,
    /// Output nodes per genome.
    pub outputs: usize,
    /// Agents per generation.
    pub population_size: usize,
    /// Genome-level mutation settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Species-level settings.
    #[serde(default)]
    pub speciation: SpeciationConfig,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            inputs: SENSOR_COUNT,
            outputs: DECISION_COUNT,
            population_size: 500,
            mutation: MutationConfig::default(),
            speciation: SpeciationConfig::default(),
        }
    }
}

impl NeatConfig {
    /// Config for the dino game with a custom population size.
    #[must_use]
    pub fn dino(population_size: usize) -> Self {
        Self {
            population_size,
            ..Default::default()
        }
    }

    /// Config for arbitrary network shapes, mostly useful in tests.
    #[must_use]
    pub fn with_shape(inputs: usize, outputs: usize, population_size: usize) -> Self {
        Self {
            inputs,
            outputs,
            population_size,
            ..Default::default()
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.inputs == 0 || self.outputs == 0 {
            return Err(NeatError::InvalidConfig(
                "genomes need at least one input and one output".into(),
            ));
        }
        if self.population_size == 0 {
            return Err(NeatError::InvalidConfig(
                "population_size must be positive".into(),
            ));
        }

        let m = &self.mutation;
        let s = &self.speciation;
        let probabilities = [
            ("weight_mutation_prob", m.weight_mutation_prob),
            ("weight_replace_prob", m.weight_replace_prob),
            ("add_connection_prob", m.add_connection_prob),
            ("add_node_prob", m.add_node_prob),
            ("disable_inherited_prob", m.disable_inherited_prob),
            ("inherit_weight_prob", m.inherit_weight_prob),
            ("clone_champion_prob", s.clone_champion_prob),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(NeatError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {p}"
                )));
            }
        }

        if !(m.weight_perturb_std.is_finite() && m.weight_perturb_std > 0.0) {
            return Err(NeatError::InvalidConfig(
                "weight_perturb_std must be positive".into(),
            ));
        }
        if !(s.compatibility_threshold.is_finite() && s.compatibility_threshold >= 0.0) {
            return Err(NeatError::InvalidConfig(
                "compatibility_threshold must be non-negative".into(),
            ));
        }
        if s.mass_extinction_survivors == 0 {
            return Err(NeatError::InvalidConfig(
                "mass_extinction_survivors must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dino_shape() {
        let config = NeatConfig::default();
        assert_eq!(config.inputs, SENSOR_COUNT);
        assert_eq!(config.outputs, DECISION_COUNT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let mut config = NeatConfig::dino(10);
        config.mutation.add_node_prob = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("add_node_prob"));
    }

    #[test]
    fn test_validate_rejects_empty_population() {
        let config = NeatConfig::with_shape(2, 1, 0);
        assert!(matches!(
            config.validate(),
            Err(NeatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let json = r#"{"inputs": 2, "outputs": 1, "population_size": 20}"#;
        let config: NeatConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mutation, MutationConfig::default());
        assert_eq!(config.speciation, SpeciationConfig::default());
    }
}

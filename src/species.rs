//! Speciation: clustering compatible genomes so new topologies get time to
//! optimize before competing with the whole population.
//!
//! A [`Species`] does not own its agents. It stores indices into the
//! population's agent list, rebuilt every generation, plus a cloned
//! representative genome and a cloned champion that outlive the list.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use tracing::debug;

use crate::agent::Agent;
use crate::config::SpeciationConfig;
use crate::error::{NeatError, Result};
use crate::genome::Genome;
use crate::innovation::InnovationTracker;

/// How different two genomes are.
///
/// `c1 * D / N + c2 * W`, where `D` counts innovations present in exactly one
/// genome, `W` is the mean absolute weight difference over matching genes
/// (`no_match_weight_diff` when nothing matches) and `N` is the larger gene
/// count, treated as 1 below `small_genome_threshold`. Returns 0 when either
/// genome has no genes.
#[must_use]
pub fn compatibility_distance(g1: &Genome, g2: &Genome, config: &SpeciationConfig) -> f32 {
    let (genes1, genes2) = (g1.genes(), g2.genes());
    if genes1.is_empty() || genes2.is_empty() {
        return 0.0;
    }

    let mut weights2: HashMap<u64, f32> = HashMap::with_capacity(genes2.len());
    for gene in genes2 {
        weights2.entry(gene.innovation).or_insert(gene.weight);
    }
    let innovations1: HashSet<u64> = genes1.iter().map(|g| g.innovation).collect();

    let disjoint = innovations1
        .iter()
        .filter(|i| !weights2.contains_key(i))
        .count()
        + weights2
            .keys()
            .filter(|i| !innovations1.contains(i))
            .count();

    let mut matching = 0usize;
    let mut weight_diff = 0.0f32;
    let mut seen = HashSet::with_capacity(genes1.len());
    for gene in genes1 {
        if !seen.insert(gene.innovation) {
            continue;
        }
        if let Some(&w) = weights2.get(&gene.innovation) {
            matching += 1;
            weight_diff += (gene.weight - w).abs();
        }
    }
    let mean_weight_diff = if matching == 0 {
        config.no_match_weight_diff
    } else {
        weight_diff / matching as f32
    };

    let longest = genes1.len().max(genes2.len());
    let n = if longest < config.small_genome_threshold {
        1.0
    } else {
        longest as f32
    };

    config.excess_coeff * disjoint as f32 / n + config.weight_diff_coeff * mean_weight_diff
}

/// A cluster of agents whose genomes lie within the compatibility threshold
/// of a shared representative.
#[derive(Debug)]
pub struct Species<A: Agent> {
    members: Vec<usize>,
    representative: Genome,
    champion: A,
    best_fitness: f64,
    staleness: u32,
    average_fitness: f64,
    config: SpeciationConfig,
}

impl<A: Agent> Species<A> {
    /// Found a species around `agents[founder]`.
    ///
    /// # Panics
    ///
    /// Panics if `founder` is out of bounds.
    pub fn new(founder: usize, agents: &[A], config: SpeciationConfig) -> Self {
        let agent = &agents[founder];
        Self {
            members: vec![founder],
            representative: agent.brain().clone(),
            champion: agent.replicate(),
            best_fitness: agent.fitness(),
            staleness: 0,
            average_fitness: 0.0,
            config,
        }
    }

    /// Whether `genome` is close enough to the representative to join.
    #[must_use]
    pub fn same_species(&self, genome: &Genome) -> bool {
        compatibility_distance(genome, &self.representative, &self.config)
            <= self.config.compatibility_threshold
    }

    /// Add the agent at `index` as a member.
    pub fn add(&mut self, index: usize) {
        self.members.push(index);
    }

    /// Forget all members, keeping representative, champion and history.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Order members by descending fitness and track improvement.
    ///
    /// The top member becomes the representative for the next generation. If
    /// it beats `best_fitness` it also becomes the champion and staleness
    /// resets; otherwise staleness grows by one.
    pub fn sort_species(&mut self, agents: &[A]) {
        self.members
            .sort_by(|&a, &b| agents[b].fitness().total_cmp(&agents[a].fitness()));

        let Some(&top) = self.members.first() else {
            return;
        };
        let leader = &agents[top];
        self.representative = leader.brain().clone();
        if leader.fitness() > self.best_fitness {
            self.best_fitness = leader.fitness();
            self.champion = leader.replicate();
            self.staleness = 0;
        } else {
            self.staleness += 1;
        }
    }

    /// Produce one offspring from the current members.
    ///
    /// A lone member is cloned. Otherwise the best member is cloned with
    /// probability `clone_champion_prob`; failing that two parents are drawn
    /// uniformly from the better half and crossed. The baby is always
    /// mutated. Members must already be sorted.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::EmptySpecies`] when there are no members.
    pub fn give_me_baby<R: Rng>(
        &self,
        agents: &[A],
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Result<A> {
        let (&best, _) = self.members.split_first().ok_or(NeatError::EmptySpecies)?;

        let mut baby = if self.members.len() == 1
            || rng.random::<f32>() < self.config.clone_champion_prob
        {
            agents[best].replicate()
        } else {
            let better_half = &self.members[..(self.members.len() / 2).max(1)];
            let first = &agents[better_half[rng.random_range(0..better_half.len())]];
            let second = &agents[better_half[rng.random_range(0..better_half.len())]];
            first.crossover(second, rng)
        };

        baby.brain_mut().mutate(tracker, rng);
        Ok(baby)
    }

    /// Keep only the better half when there are more than two members.
    pub fn cull(&mut self) {
        if self.members.len() > 2 {
            let before = self.members.len();
            self.members.truncate(before / 2);
            debug!(before, after = self.members.len(), "culled species");
        }
    }

    /// Divide every member's fitness by the member count.
    pub fn fitness_sharing(&self, agents: &mut [A]) {
        let size = self.members.len() as f64;
        for &i in &self.members {
            let agent = &mut agents[i];
            agent.set_fitness(agent.fitness() / size);
        }
    }

    /// Recompute the mean member fitness (0 when empty).
    pub fn set_average(&mut self, agents: &[A]) {
        self.average_fitness = if self.members.is_empty() {
            0.0
        } else {
            self.members.iter().map(|&i| agents[i].fitness()).sum::<f64>()
                / self.members.len() as f64
        };
    }

    /// Indices of the current members, best first after sorting.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of current members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the species has no members this generation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Genome new agents are compared against.
    #[must_use]
    pub const fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Best agent the species has ever produced.
    #[must_use]
    pub const fn champion(&self) -> &A {
        &self.champion
    }

    #[must_use]
    pub const fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Generations since `best_fitness` last improved.
    #[must_use]
    pub const fn staleness(&self) -> u32 {
        self.staleness
    }

    #[must_use]
    pub const fn average_fitness(&self) -> f64 {
        self.average_fitness
    }
}

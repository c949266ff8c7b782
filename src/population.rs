//! Generation management: running agents, speciating and breeding.
//!
//! A [`Population`] owns the agents, the species list and the innovation
//! tracker. The host drives it in two phases per generation:
//!
//! 1. call [`update_alive`](Population::update_alive) once per frame until
//!    [`done`](Population::done) reports every agent dead;
//! 2. call [`natural_selection`](Population::natural_selection) to replace
//!    the agents with the next generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::{Agent, Decisions};
use crate::config::NeatConfig;
use crate::error::{NeatError, Result};
use crate::genome::Genome;
use crate::innovation::InnovationTracker;
use crate::species::Species;

/// Summary of one finished generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    /// Highest score reached during the run.
    pub best_score: f64,
    pub average_score: f64,
    /// Species alive after selection.
    pub species_count: usize,
    /// Gene count of the generation's top agent.
    pub best_genome_genes: usize,
    /// The top agent's genome, for [`Population::resume`].
    #[serde(default)]
    pub best_genome: Option<Genome>,
}

/// A new all-time best, kept for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionRecord {
    pub generation: u32,
    pub score: f64,
    pub genome: Genome,
}

/// All agents of the current generation plus the evolutionary state.
#[derive(Debug)]
pub struct Population<A: Agent> {
    config: NeatConfig,
    agents: Vec<A>,
    species: Vec<Species<A>>,
    tracker: InnovationTracker,
    generation: u32,
    best_score: f64,
    best_agent: Option<A>,
    champions: Vec<ChampionRecord>,
    history: Vec<GenerationStats>,
    mass_extinction_pending: bool,
    population_life: u64,
}

impl<A: Agent> Population<A> {
    /// Spawn `config.population_size` agents with minimal brains.
    ///
    /// Every genome is mutated once, which gives it its first connection.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`]
    /// if `config` does not validate.
    pub fn new<R: Rng>(config: NeatConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let mut tracker = InnovationTracker::new();
        let agents = Self::spawn_minimal(&config, &mut tracker, rng)?;
        info!(
            size = config.population_size,
            innovations = tracker.next_innovation(),
            "population initialized"
        );
        Ok(Self::from_parts(config, agents, tracker, 0))
    }

    /// Continue training from a saved genome, e.g. the `best_genome` of the
    /// last [`GenerationStats`].
    ///
    /// The first agent gets `genome`; the rest start minimal as in
    /// [`new`](Self::new). The tracker starts past the genome's highest
    /// innovation number.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`] if `config` does not validate or
    /// its shape differs from the genome's, and
    /// [`NeatError::MalformedGenome`] if the genome fails validation.
    pub fn resume<R: Rng>(
        config: NeatConfig,
        genome: Genome,
        generation: u32,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let brain = Genome::restore(genome)?;
        if brain.input_count() != config.inputs || brain.output_count() != config.outputs {
            return Err(NeatError::InvalidConfig(format!(
                "genome shape {}x{} does not match config {}x{}",
                brain.input_count(),
                brain.output_count(),
                config.inputs,
                config.outputs
            )));
        }

        let next = brain
            .genes()
            .iter()
            .map(|g| g.innovation + 1)
            .max()
            .unwrap_or(0);
        let mut tracker = InnovationTracker::starting_at(next);
        let mut agents = Self::spawn_minimal(&config, &mut tracker, rng)?;
        if let Some(first) = agents.first_mut() {
            *first = A::spawn(brain);
        }
        info!(
            generation,
            size = config.population_size,
            innovations = tracker.next_innovation(),
            "population resumed"
        );
        Ok(Self::from_parts(config, agents, tracker, generation))
    }

    fn spawn_minimal<R: Rng>(
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Result<Vec<A>> {
        let mut agents = Vec::with_capacity(config.population_size);
        for _ in 0..config.population_size {
            let mut brain = Genome::new(config.inputs, config.outputs, config.mutation);
            brain.mutate(tracker, rng);
            brain.compile_network()?;
            agents.push(A::spawn(brain));
        }
        Ok(agents)
    }

    fn from_parts(
        config: NeatConfig,
        agents: Vec<A>,
        tracker: InnovationTracker,
        generation: u32,
    ) -> Self {
        Self {
            config,
            agents,
            species: Vec::new(),
            tracker,
            generation,
            best_score: 0.0,
            best_agent: None,
            champions: Vec::new(),
            history: Vec::new(),
            mass_extinction_pending: false,
            population_life: 0,
        }
    }

    /// Advance every live agent by one frame: look, decide, act, update.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors, e.g. when the population was configured
    /// with a shape other than the agent's sensors and decisions.
    pub fn update_alive(&mut self, env: &A::Environment) -> Result<()> {
        self.population_life += 1;
        for agent in self.agents.iter_mut().filter(|a| !a.is_dead()) {
            let sensors = agent.look(env);
            let decisions: Decisions = agent.brain_mut().decide(&sensors)?;
            agent.act(&decisions);
            agent.update(env);
        }
        Ok(())
    }

    /// Whether every agent has died.
    #[must_use]
    pub fn done(&self) -> bool {
        self.agents.iter().all(Agent::is_dead)
    }

    /// Keep only the top species at the next selection.
    pub fn trigger_mass_extinction(&mut self) {
        self.mass_extinction_pending = true;
    }

    /// Replace the current agents with the next generation.
    ///
    /// Speciates, scores, culls and shares fitness, drops stale and
    /// hopeless species, then fills the population with each species'
    /// champion plus offspring in proportion to its average fitness.
    pub fn natural_selection<R: Rng>(&mut self, rng: &mut R) {
        let size = self.config.population_size;
        let average_score = if self.agents.is_empty() {
            0.0
        } else {
            self.agents.iter().map(Agent::score).sum::<f64>() / self.agents.len() as f64
        };
        let run_best = self
            .agents
            .iter()
            .map(Agent::score)
            .fold(0.0, f64::max);

        self.speciate();
        self.calculate_fitness();
        self.sort_species();

        if self.mass_extinction_pending {
            let survivors = self.config.speciation.mass_extinction_survivors;
            info!(before = self.species.len(), survivors, "mass extinction");
            self.species.truncate(survivors.max(1));
            self.mass_extinction_pending = false;
        }

        for species in &mut self.species {
            species.cull();
            species.fitness_sharing(&mut self.agents);
            species.set_average(&self.agents);
        }

        let top = self.top_agent();
        self.record_best(top);
        self.kill_stale_species();
        self.kill_bad_species();

        let mut total = self.average_fitness_sum();
        if self.species.is_empty() || total <= 0.0 {
            if let Some(best) = self.fittest_agent() {
                warn!(total, "degenerate fitness, reseeding from the fittest agent");
                let mut species = Species::new(best, &self.agents, self.config.speciation);
                species.set_average(&self.agents);
                self.species = vec![species];
                total = self.average_fitness_sum();
            }
        }

        let mut children: Vec<A> = Vec::with_capacity(size);
        for species in &self.species {
            children.push(species.champion().replicate());

            let quota = offspring_quota(species.average_fitness(), total, size);
            for _ in 0..quota {
                match species.give_me_baby(&self.agents, &mut self.tracker, rng) {
                    Ok(baby) => children.push(baby),
                    Err(err) => {
                        warn!(%err, "falling back to champion clone");
                        children.push(species.champion().replicate());
                    }
                }
            }
        }

        while children.len() < size {
            let baby = match self.species.first() {
                Some(species) => species.give_me_baby(&self.agents, &mut self.tracker, rng),
                None => Err(NeatError::EmptySpecies),
            };
            let child = match baby {
                Ok(baby) => baby,
                Err(err) => {
                    warn!(%err, "cloning the global best to fill the population");
                    match self.best_agent.as_ref().or(self.agents.first()) {
                        Some(best) => best.replicate(),
                        None => break,
                    }
                }
            };
            children.push(child);
        }
        children.truncate(size);

        for child in &mut children {
            child.brain_mut().recompile();
        }
        // Member indices point into the outgoing generation.
        for species in &mut self.species {
            species.clear();
        }

        let stats = GenerationStats {
            generation: self.generation,
            best_score: run_best,
            average_score,
            species_count: self.species.len(),
            best_genome_genes: top.map_or(0, |i| self.agents[i].brain().genes().len()),
            best_genome: top.map(|i| self.agents[i].brain().clone()),
        };
        info!(
            generation = stats.generation,
            best_score = stats.best_score,
            average_score = stats.average_score,
            species = stats.species_count,
            innovations = self.tracker.next_innovation(),
            "generation complete"
        );
        self.history.push(stats);

        self.agents = children;
        self.generation += 1;
        self.population_life = 0;
    }

    /// Assign every agent to the first compatible species, founding new
    /// species as needed, then drop species nobody joined.
    fn speciate(&mut self) {
        for species in &mut self.species {
            species.clear();
        }
        for i in 0..self.agents.len() {
            let brain = self.agents[i].brain();
            match self.species.iter_mut().find(|s| s.same_species(brain)) {
                Some(species) => species.add(i),
                None => self
                    .species
                    .push(Species::new(i, &self.agents, self.config.speciation)),
            }
        }
        self.species.retain(|s| !s.is_empty());
        debug!(species = self.species.len(), "speciated");
    }

    /// The first agent is the previous generation's top champion clone and
    /// keeps its inherited fitness.
    fn calculate_fitness(&mut self) {
        for agent in self.agents.iter_mut().skip(1) {
            agent.calculate_fitness();
        }
    }

    fn sort_species(&mut self) {
        for species in &mut self.species {
            species.sort_species(&self.agents);
        }
        self.species
            .sort_by(|a, b| b.best_fitness().total_cmp(&a.best_fitness()));
    }

    fn top_agent(&self) -> Option<usize> {
        self.species
            .first()
            .and_then(|s| s.members().first().copied())
            .or_else(|| self.fittest_agent())
    }

    fn fittest_agent(&self) -> Option<usize> {
        self.agents
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.fitness().total_cmp(&b.fitness()))
            .map(|(i, _)| i)
    }

    fn record_best(&mut self, top: Option<usize>) {
        let Some(agent) = top.map(|i| &self.agents[i]) else {
            return;
        };
        if agent.score() > self.best_score {
            info!(
                generation = self.generation,
                old = self.best_score,
                new = agent.score(),
                "new best score"
            );
            self.best_score = agent.score();
            self.champions.push(ChampionRecord {
                generation: self.generation,
                score: agent.score(),
                genome: agent.brain().clone(),
            });
            self.best_agent = Some(agent.replicate());
        }
    }

    /// Drop species that have not improved for `stale_limit` generations,
    /// sparing the top two.
    fn kill_stale_species(&mut self) {
        let limit = self.config.speciation.stale_limit;
        let mut rank = 0;
        self.species.retain(|s| {
            let keep = rank < 2 || s.staleness() < limit;
            rank += 1;
            keep
        });
    }

    /// Drop species whose share of the offspring rounds below one, sparing
    /// the top one.
    fn kill_bad_species(&mut self) {
        let total = self.average_fitness_sum();
        if total <= 0.0 {
            return;
        }
        let size = self.config.population_size as f64;
        let mut rank = 0;
        self.species.retain(|s| {
            let keep = rank == 0 || s.average_fitness() / total * size >= 1.0;
            rank += 1;
            keep
        });
    }

    fn average_fitness_sum(&self) -> f64 {
        self.species.iter().map(Species::average_fitness).sum()
    }

    /// Agents of the current generation.
    #[must_use]
    pub fn agents(&self) -> &[A] {
        &self.agents
    }

    /// Mutable access to the agents, e.g. to reset game state between runs.
    pub fn agents_mut(&mut self) -> &mut [A] {
        &mut self.agents
    }

    /// Species as of the last selection, best first.
    ///
    /// Between selections each species keeps its representative, champion
    /// and statistics but has no members; they are reassigned at the next
    /// [`natural_selection`](Self::natural_selection).
    #[must_use]
    pub fn species(&self) -> &[Species<A>] {
        &self.species
    }

    #[must_use]
    pub const fn tracker(&self) -> &InnovationTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn config(&self) -> &NeatConfig {
        &self.config
    }

    /// Number of completed selections.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Best score any agent has reached so far.
    #[must_use]
    pub const fn best_score(&self) -> f64 {
        self.best_score
    }

    /// Copy of the agent that set [`best_score`](Self::best_score).
    #[must_use]
    pub const fn best_agent(&self) -> Option<&A> {
        self.best_agent.as_ref()
    }

    /// Every new all-time best, oldest first.
    #[must_use]
    pub fn champions(&self) -> &[ChampionRecord] {
        &self.champions
    }

    /// One entry per completed selection.
    #[must_use]
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Frames simulated in the current generation.
    #[must_use]
    pub const fn population_life(&self) -> u64 {
        self.population_life
    }
}

/// Babies a species breeds besides its champion: its share of the population
/// by average fitness, rounded down, minus the champion's slot.
fn offspring_quota(average: f64, total: f64, size: usize) -> usize {
    if total <= 0.0 {
        return 0;
    }
    ((average / total * size as f64).floor() as usize).saturating_sub(1)
}

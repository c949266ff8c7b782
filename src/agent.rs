//! The seam between the engine and the game.
//!
//! An [`Agent`] is whatever the host simulation uses to represent one player:
//! it owns a brain ([`Genome`]), turns the world into a sensor vector, acts on
//! the brain's decisions and keeps its own score. The engine never looks past
//! this trait.

use crate::config::{DECISION_COUNT, SENSOR_COUNT};
use crate::genome::Genome;

/// Normalized sensor readings: distance, height, width and altitude of the
/// nearest obstacle, game speed, own altitude, gap to the next obstacle.
pub type Sensors = [f32; SENSOR_COUNT];

/// Brain outputs: small jump, big jump, duck. Each in (0, 1).
pub type Decisions = [f32; DECISION_COUNT];

/// A player controlled by an evolving genome.
pub trait Agent: Sized {
    /// Read-only world state the agent senses each frame.
    type Environment: ?Sized;

    /// Create a fresh agent (alive, zero score) around `brain`.
    fn spawn(brain: Genome) -> Self;

    /// The agent's genome.
    fn brain(&self) -> &Genome;

    /// Mutable access to the agent's genome.
    fn brain_mut(&mut self) -> &mut Genome;

    /// Score accumulated during the current run.
    fn score(&self) -> f64;

    /// Selection fitness.
    fn fitness(&self) -> f64;

    /// Overwrite the selection fitness.
    fn set_fitness(&mut self, fitness: f64);

    /// Derive fitness from the score. Defaults to `score²`.
    fn calculate_fitness(&mut self) {
        let score = self.score();
        self.set_fitness(score * score);
    }

    /// Whether the agent has collided and stopped playing.
    fn is_dead(&self) -> bool;

    /// Build the sensor vector for the current frame.
    fn look(&mut self, env: &Self::Environment) -> Sensors;

    /// Apply the brain's decisions (jump, duck, ...).
    fn act(&mut self, decisions: &Decisions);

    /// Advance physics, collision checks and score by one frame.
    fn update(&mut self, env: &Self::Environment);

    /// A fresh agent carrying a copy of this brain and this fitness.
    fn replicate(&self) -> Self {
        let mut copy = Self::spawn(self.brain().clone());
        copy.set_fitness(self.fitness());
        copy
    }

    /// Offspring of `self` and `other`; the fitter parent's genome leads the
    /// crossover.
    fn crossover<R: rand::Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let brain = if self.fitness() > other.fitness() {
            self.brain().crossover(other.brain(), rng)
        } else {
            other.brain().crossover(self.brain(), rng)
        };
        Self::spawn(brain)
    }
}

//! Headless dino run: evolve jumpers and duckers on a generated obstacle course.
//!
//! Cacti must be jumped, low birds ducked under or jumped, high birds ignored.
//! The game speeds up over time. No rendering; progress is logged.
//!
//! Run with: `RUST_LOG=info cargo run --example dino_run`

use dino_neat::{Agent, Decisions, Genome, NeatConfig, Population, Sensors, SENSOR_COUNT};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PLAYER_X: f32 = 250.0;
const PLAYER_SIZE: f32 = 20.0;
const PLAYER_WIDTH: f32 = 44.0;
const PLAYER_HEIGHT: f32 = 47.0;
const DUCK_HEIGHT: f32 = 26.0;
const SPAWN_X: f32 = 1280.0;
const START_SPEED: f32 = 10.0;
const SPEED_INCREMENT: f32 = 0.0008;
const MAX_FRAMES: u32 = 20_000;

#[derive(Debug, Clone, Copy)]
struct Obstacle {
    x: f32,
    w: f32,
    h: f32,
    /// Centre height above ground; 0 for cacti.
    altitude: f32,
}

impl Obstacle {
    fn is_bird(&self) -> bool {
        self.altitude > 0.0
    }

    /// Distance from the player's trailing edge to this obstacle's centre.
    fn distance(&self) -> f32 {
        self.x + self.w / 2.0 - (PLAYER_X - PLAYER_SIZE / 2.0)
    }

    fn hits(&self, bottom: f32, top: f32, width: f32) -> bool {
        let overlaps = PLAYER_X - width / 2.0 <= self.x + self.w / 2.0
            && PLAYER_X + width / 2.0 >= self.x - self.w / 2.0;
        if !overlaps {
            return false;
        }
        if self.is_bird() {
            bottom <= self.altitude + self.h / 2.0 && top >= self.altitude - self.h / 2.0
        } else {
            bottom <= self.h
        }
    }
}

/// The shared course every dino of a generation runs on.
struct World {
    obstacles: Vec<Obstacle>,
    speed: f32,
    timer: u32,
    gap: u32,
    frame: u32,
    rng: ChaCha8Rng,
}

impl World {
    fn new(seed: u64) -> Self {
        Self {
            obstacles: Vec::new(),
            speed: START_SPEED,
            timer: 0,
            gap: 0,
            frame: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn step(&mut self) {
        self.frame += 1;
        self.speed += SPEED_INCREMENT;
        for obstacle in &mut self.obstacles {
            obstacle.x -= self.speed;
        }
        self.obstacles.retain(|o| o.x + o.w > 0.0);

        self.timer += 1;
        if self.timer > 60 + self.gap {
            self.timer = 0;
            self.gap = self.rng.random_range(0..50);
            let obstacle = match self.rng.random_range(0..5) {
                0 => Obstacle {
                    x: SPAWN_X,
                    w: 30.0,
                    h: 40.0,
                    altitude: 0.0,
                },
                1 => Obstacle {
                    x: SPAWN_X,
                    w: 40.0,
                    h: 60.0,
                    altitude: 0.0,
                },
                2 => Obstacle {
                    x: SPAWN_X,
                    w: 80.0,
                    h: 40.0,
                    altitude: 0.0,
                },
                3 => Obstacle {
                    x: SPAWN_X,
                    w: 60.0,
                    h: 40.0,
                    altitude: 20.0,
                },
                _ => Obstacle {
                    x: SPAWN_X,
                    w: 60.0,
                    h: 40.0,
                    altitude: 100.0,
                },
            };
            self.obstacles.push(obstacle);
        }
    }
}

struct Dino {
    brain: Genome,
    fitness: f64,
    score: f64,
    lifespan: u32,
    pos_y: f32,
    vel_y: f32,
    gravity: f32,
    duck: bool,
    dead: bool,
}

impl Dino {
    fn jump(&mut self, big: bool) {
        if self.pos_y == 0.0 {
            (self.gravity, self.vel_y) = if big { (1.0, 20.0) } else { (1.2, 16.0) };
        }
    }

    fn ducking(&mut self, ducking: bool) {
        if self.pos_y != 0.0 && ducking {
            self.gravity = 3.0;
        }
        self.duck = ducking;
    }
}

impl Agent for Dino {
    type Environment = World;

    fn spawn(brain: Genome) -> Self {
        Self {
            brain,
            fitness: 0.0,
            score: 0.0,
            lifespan: 0,
            pos_y: 0.0,
            vel_y: 0.0,
            gravity: 1.2,
            duck: false,
            dead: false,
        }
    }

    fn brain(&self) -> &Genome {
        &self.brain
    }

    fn brain_mut(&mut self) -> &mut Genome {
        &mut self.brain
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn look(&mut self, world: &World) -> Sensors {
        let mut vision = [0.0; SENSOR_COUNT];
        vision[4] = world.speed / 100.0;
        vision[5] = self.pos_y / 200.0;

        let mut ahead: Vec<(f32, &Obstacle)> = world
            .obstacles
            .iter()
            .map(|o| (o.distance(), o))
            .filter(|(d, _)| *d > 0.0)
            .collect();
        ahead.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(&(nearest, obstacle)) = ahead.first() {
            vision[0] = 10.0 / nearest;
            vision[1] = obstacle.h / 100.0;
            vision[2] = obstacle.w / 100.0;
            vision[3] = obstacle.altitude / 200.0;
            if let Some(&(next, _)) = ahead.iter().find(|(d, _)| *d > nearest) {
                vision[6] = 1.0 / (next - nearest);
            }
        }
        vision
    }

    fn act(&mut self, decisions: &Decisions) {
        let (choice, strongest) = decisions
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        if strongest > 0.5 {
            match choice {
                0 => self.jump(false),
                1 => self.jump(true),
                _ => self.ducking(true),
            }
        } else {
            self.ducking(false);
        }
    }

    fn update(&mut self, world: &World) {
        self.lifespan += 1;
        if self.lifespan % 3 == 0 {
            self.score += 1.0;
        }

        self.pos_y += self.vel_y;
        if self.pos_y > 0.0 {
            self.vel_y -= self.gravity;
        } else {
            self.pos_y = 0.0;
            self.vel_y = 0.0;
        }

        let (height, width) = if self.duck && self.pos_y == 0.0 {
            (DUCK_HEIGHT, PLAYER_WIDTH * 0.8)
        } else {
            (PLAYER_HEIGHT, PLAYER_WIDTH * 0.5)
        };
        let (bottom, top) = (self.pos_y, self.pos_y + height);
        if world.obstacles.iter().any(|o| o.hits(bottom, top, width)) {
            self.dead = true;
        }
    }
}

fn main() -> dino_neat::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let generations = 30;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut population: Population<Dino> = Population::new(NeatConfig::dino(200), &mut rng)?;

    for generation in 0..generations {
        let mut world = World::new(generation);
        while !population.done() && world.frame < MAX_FRAMES {
            world.step();
            population.update_alive(&world)?;
        }
        for dino in population.agents_mut() {
            dino.dead = true;
        }
        population.natural_selection(&mut rng);
    }

    if let Some(best) = population.best_agent() {
        let brain = best.brain();
        info!(
            score = population.best_score(),
            layers = brain.layer_count(),
            hidden = brain.hidden_count(),
            connections = brain.enabled_gene_count(),
            "best dino"
        );
    }
    Ok(())
}

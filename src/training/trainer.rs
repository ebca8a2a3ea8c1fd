use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{StartPolicy, TrainingConfig};
use super::evaluation::{evaluation_starts, win_rate};
use crate::agent::{Agent, Transition, UpdateParams};
use crate::error::{Result, TheseusError};
use crate::maze::{Cell, GameStatus, MazeEnvironment};
use crate::metrics::{MetricsTracker, TrainingMetrics};
use crate::policy::EpsilonGreedy;

/// Why a training run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The windowed win rate reached the threshold and the run was told to stop there
    Converged,
    /// The episode budget was used up
    Exhausted,
    /// The stop signal was raised
    Interrupted,
}

/// Outcome of a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub metrics: TrainingMetrics,
    pub episodes_run: usize,
    pub elapsed: Duration,
    pub termination: Termination,
    /// Whether the convergence criterion was met at any evaluation
    pub converged: bool,
}

impl TrainingReport {
    /// Total reward of every episode.
    pub fn reward_history(&self) -> &[f32] {
        &self.metrics.episode_rewards
    }

    /// `(episodes completed, win rate)` of every evaluation.
    pub fn win_history(&self) -> &[(usize, f32)] {
        &self.metrics.win_history
    }

    pub fn final_win_rate(&self) -> Option<f32> {
        self.metrics.win_history.last().map(|&(_, rate)| rate)
    }
}

/// Picks the start cell of each episode.
struct StartCycle {
    cells: Vec<Cell>,
    next: usize,
    shuffle: bool,
}

impl StartCycle {
    fn new(policy: StartPolicy, env: &MazeEnvironment) -> Result<Self> {
        match policy {
            StartPolicy::Fixed(cell) => {
                check_start(env, cell, "start")?;
                Ok(StartCycle {
                    cells: vec![cell],
                    next: 0,
                    shuffle: false,
                })
            }
            StartPolicy::RandomFree => {
                let cells = env.start_cells();
                if cells.is_empty() {
                    return Err(TheseusError::invalid_parameter("start", "the maze has no free start cell"));
                }
                Ok(StartCycle {
                    next: cells.len(),
                    cells,
                    shuffle: true,
                })
            }
        }
    }

    fn next(&mut self, rng: &mut StdRng) -> Cell {
        if self.next >= self.cells.len() {
            if self.shuffle {
                self.cells.shuffle(rng);
            }
            self.next = 0;
        }
        let cell = self.cells[self.next];
        self.next += 1;
        cell
    }
}

/// A start cell must be free and must not be the exit.
fn check_start(env: &MazeEnvironment, cell: Cell, name: &str) -> Result<()> {
    if !env.grid().is_free(cell) || cell == env.exit() {
        return Err(TheseusError::invalid_parameter(
            name,
            format!("{} must be a free cell other than the exit", cell),
        ));
    }
    Ok(())
}

/// Runs episodes of an agent in a maze until convergence, the episode budget
/// or a stop request.
pub struct Trainer {
    config: TrainingConfig,
    stop: Option<Arc<AtomicBool>>,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Trainer { config, stop: None })
    }

    /// Stop between episodes once `signal` is set.
    pub fn with_stop_signal(mut self, signal: Arc<AtomicBool>) -> Self {
        self.stop = Some(signal);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .map_or(false, |signal| signal.load(Ordering::Relaxed))
    }

    pub fn train<A: Agent + ?Sized>(&self, agent: &mut A, env: &mut MazeEnvironment) -> Result<TrainingReport> {
        let started = Instant::now();
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut schedule = EpsilonGreedy::new(config.exploration_rate, config.exploration_decay)?;
        let params = UpdateParams {
            discount: config.discount,
            learning_rate: config.learning_rate,
        };
        let mut starts = StartCycle::new(config.start, env)?;
        let eval_starts = evaluation_starts(env, config.evaluation.scope);
        for &cell in &eval_starts {
            check_start(env, cell, "evaluation.scope")?;
        }
        let mut tracker = MetricsTracker::new();
        let mut termination = Termination::Exhausted;
        let mut converged = false;

        info!(
            "Training {} for up to {} episodes (gamma {}, epsilon {}, alpha {})",
            agent.name(),
            config.episodes,
            config.discount,
            config.exploration_rate,
            config.learning_rate
        );

        for episode in 0..config.episodes {
            if self.stop_requested() {
                termination = Termination::Interrupted;
                break;
            }

            let start = starts.next(&mut rng);
            let epsilon = schedule.epsilon();
            let status = run_episode(agent, env, start, episode, epsilon, &params, &mut rng, &mut tracker)?;
            tracker.end_episode(status == GameStatus::Won, epsilon);
            if status == GameStatus::Lost {
                debug!("Episode {} from {} ran out of steps before reaching the exit", episode, start);
            }
            schedule.decay();

            if let Some(checkpoint) = &config.checkpoint {
                if (episode + 1) % checkpoint.every == 0 {
                    if let Err(err) = agent.save(&checkpoint.path) {
                        warn!("Checkpoint to {:?} failed: {}", checkpoint.path, err);
                    }
                }
            }

            if (episode + 1) % config.evaluation.every == 0 {
                let rate = win_rate(agent, env, &eval_starts)?;
                tracker.record_win_rate(rate);
                debug!(
                    "Episode {}: reward {:.2}, win rate {:.3}",
                    episode,
                    tracker.metrics().episode_rewards.last().copied().unwrap_or(0.0),
                    rate
                );

                let reached = tracker
                    .windowed_win_rate(config.evaluation.window)
                    .map_or(false, |mean| mean >= config.evaluation.threshold);
                if reached {
                    converged = true;
                    if config.stop_at_convergence {
                        termination = Termination::Converged;
                        break;
                    }
                }
            }
        }

        let episodes_run = tracker.episode_count();
        let elapsed = started.elapsed();
        info!(
            "{} finished after {} episodes in {:.2?}: {:?}",
            agent.name(),
            episodes_run,
            elapsed,
            termination
        );

        Ok(TrainingReport {
            metrics: tracker.into_metrics(),
            episodes_run,
            elapsed,
            termination,
            converged,
        })
    }
}

/// Play one training episode, updating the agent after every step.
#[allow(clippy::too_many_arguments)]
fn run_episode<A: Agent + ?Sized>(
    agent: &mut A,
    env: &mut MazeEnvironment,
    start: Cell,
    episode: usize,
    epsilon: f32,
    params: &UpdateParams,
    rng: &mut StdRng,
    tracker: &mut MetricsTracker,
) -> Result<GameStatus> {
    tracker.start_episode();
    let mut state = env.reset(start)?;
    agent.begin_episode();
    let mut action = agent.select_action(state, epsilon, rng);

    loop {
        let outcome = env.step(action)?;
        tracker.step(outcome.reward);

        let next_action = if outcome.done {
            None
        } else {
            Some(agent.select_action(outcome.next_state, epsilon, rng))
        };
        let transition = Transition {
            state,
            action,
            reward: outcome.reward,
            next_state: outcome.next_state,
            done: outcome.done,
            next_actions: env.legal_actions(outcome.next_state),
        };
        agent
            .observe(&transition, next_action, params)
            .map_err(|err| err.at_step(episode, env.steps()))?;
        if let Some(loss) = agent.last_loss() {
            tracker.record_loss(loss);
        }

        match next_action {
            Some(next) => {
                state = outcome.next_state;
                action = next;
            }
            None => return Ok(outcome.status),
        }
    }
}

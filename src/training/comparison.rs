//! Side-by-side training runs of several agent kinds on one maze.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::TrainingConfig;
use super::trainer::{Trainer, TrainingReport};
use crate::agent::{self, AgentConfig, AgentKind};
use crate::error::{Result, TheseusError};
use crate::maze::MazeEnvironment;

/// Aggregated results of `runs` training runs of one agent kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub name: String,
    pub runs: usize,
    pub mean_episodes: f64,
    pub mean_seconds: f64,
    pub converged_runs: usize,
    pub mean_final_win_rate: f64,
    pub reports: Vec<TrainingReport>,
}

impl ComparisonSummary {
    fn from_reports(kind: AgentKind, reports: Vec<TrainingReport>) -> Self {
        let runs = reports.len();
        let n = runs.max(1) as f64;
        let mean_episodes = reports.iter().map(|r| r.episodes_run as f64).sum::<f64>() / n;
        let mean_seconds = reports.iter().map(|r| r.elapsed.as_secs_f64()).sum::<f64>() / n;
        let converged_runs = reports.iter().filter(|r| r.converged).count();
        let mean_final_win_rate = reports
            .iter()
            .map(|r| r.final_win_rate().unwrap_or(0.0) as f64)
            .sum::<f64>()
            / n;

        ComparisonSummary {
            name: kind.to_string(),
            runs,
            mean_episodes,
            mean_seconds,
            converged_runs,
            mean_final_win_rate,
            reports,
        }
    }
}

/// Train a fresh agent of every kind `runs` times and summarise the results.
///
/// Run `i` uses `training.seed + i` (and the same offset on the replay seed),
/// so every kind sees the same sequence of seeds.
pub fn compare(
    env: &mut MazeEnvironment,
    kinds: &[AgentKind],
    agent_config: &AgentConfig,
    training: &TrainingConfig,
    runs: usize,
) -> Result<Vec<ComparisonSummary>> {
    if runs == 0 {
        return Err(TheseusError::invalid_parameter("runs", "must be greater than 0"));
    }
    training.validate()?;

    let mut summaries = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let mut reports = Vec::with_capacity(runs);
        for run in 0..runs {
            let offset = run as u64;
            let mut config = agent_config.clone();
            config.replay.seed = config.replay.seed.wrapping_add(offset);
            let trainer = Trainer::new(training.clone().with_seed(training.seed.wrapping_add(offset)))?;

            let mut agent = agent::build(kind, env, &config)?;
            reports.push(trainer.train(agent.as_mut(), env)?);
        }

        let summary = ComparisonSummary::from_reports(kind, reports);
        info!(
            "{}: {:.1} episodes, {:.3}s, {}/{} converged, final win rate {:.3}",
            summary.name,
            summary.mean_episodes,
            summary.mean_seconds,
            summary.converged_runs,
            summary.runs,
            summary.mean_final_win_rate
        );
        summaries.push(summary);
    }
    Ok(summaries)
}

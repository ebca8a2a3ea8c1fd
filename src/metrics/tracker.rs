use std::path::Path;

use serde::{Deserialize, Serialize};

/// Statistics of one training run, one entry per episode unless noted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Sum of rewards per episode
    pub episode_rewards: Vec<f32>,

    /// Running total of `episode_rewards`
    pub cumulative_rewards: Vec<f32>,

    /// Steps taken per episode
    pub episode_lengths: Vec<usize>,

    /// Exploration rate the episode was played with
    pub epsilons: Vec<f32>,

    /// Whether the episode reached the exit
    pub wins: Vec<bool>,

    /// `(episode index, mean training loss)` for the episodes whose agent
    /// reported a loss. Episodes without one are skipped, so this does not
    /// line up with the per-episode vectors above.
    pub losses: Vec<(usize, f32)>,

    /// `(episodes completed, win rate)` after every evaluation
    pub win_history: Vec<(usize, f32)>,
}

impl TrainingMetrics {
    pub fn episodes(&self) -> usize {
        self.episode_rewards.len()
    }

    /// Episodes that ran out of steps.
    pub fn lost_episodes(&self) -> usize {
        self.wins.iter().filter(|&&won| !won).count()
    }

    /// Save metrics to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load metrics from file
    pub fn load<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Tracks metrics during training
#[derive(Debug, Default)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,

    // Episode tracking
    current_episode_reward: f32,
    current_episode_length: usize,
    current_loss_sum: f32,
    current_loss_count: usize,

    // Step tracking
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new episode
    pub fn start_episode(&mut self) {
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
        self.current_loss_sum = 0.0;
        self.current_loss_count = 0;
    }

    /// Record a step within an episode
    pub fn step(&mut self, reward: f32) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    /// Record a training loss
    pub fn record_loss(&mut self, loss: f32) {
        self.current_loss_sum += loss;
        self.current_loss_count += 1;
    }

    /// End the current episode
    pub fn end_episode(&mut self, won: bool, epsilon: f32) {
        let episode = self.metrics.episodes();
        let total = self.metrics.cumulative_rewards.last().copied().unwrap_or(0.0);
        self.metrics.episode_rewards.push(self.current_episode_reward);
        self.metrics.cumulative_rewards.push(total + self.current_episode_reward);
        self.metrics.episode_lengths.push(self.current_episode_length);
        self.metrics.epsilons.push(epsilon);
        self.metrics.wins.push(won);
        if self.current_loss_count > 0 {
            self.metrics
                .losses
                .push((episode, self.current_loss_sum / self.current_loss_count as f32));
        }
    }

    /// Record the outcome of an evaluation
    pub fn record_win_rate(&mut self, win_rate: f32) {
        let episode = self.metrics.episodes();
        self.metrics.win_history.push((episode, win_rate));
    }

    /// Mean of the last `window` evaluation win rates, if that many exist.
    pub fn windowed_win_rate(&self, window: usize) -> Option<f32> {
        let history = &self.metrics.win_history;
        if window == 0 || history.len() < window {
            return None;
        }
        let sum: f32 = history.iter().rev().take(window).map(|&(_, rate)| rate).sum();
        Some(sum / window as f32)
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> TrainingMetrics {
        self.metrics
    }

    /// Get episode count
    pub fn episode_count(&self) -> usize {
        self.metrics.episodes()
    }

    /// Get total steps
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_bookkeeping() {
        let mut tracker = MetricsTracker::new();
        tracker.start_episode();
        tracker.step(-0.05);
        tracker.step(10.0);
        tracker.end_episode(true, 0.1);

        tracker.start_episode();
        tracker.step(-0.75);
        tracker.record_loss(2.0);
        tracker.record_loss(4.0);
        tracker.end_episode(false, 0.05);

        let metrics = tracker.metrics();
        assert_eq!(metrics.episode_lengths, vec![2, 1]);
        assert!((metrics.cumulative_rewards[1] - 9.2).abs() < 1e-5);
        assert_eq!(metrics.wins, vec![true, false]);
        assert_eq!(metrics.losses, vec![(1, 3.0)]);
        assert_eq!(metrics.lost_episodes(), 1);
        assert_eq!(tracker.total_steps(), 3);
    }

    #[test]
    fn test_windowed_win_rate() {
        let mut tracker = MetricsTracker::new();
        assert_eq!(tracker.windowed_win_rate(1), None);
        tracker.record_win_rate(0.5);
        tracker.record_win_rate(1.0);
        assert_eq!(tracker.windowed_win_rate(2), Some(0.75));
        assert_eq!(tracker.windowed_win_rate(1), Some(1.0));
        assert_eq!(tracker.windowed_win_rate(3), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let mut tracker = MetricsTracker::new();
        tracker.start_episode();
        tracker.step(1.0);
        tracker.end_episode(true, 0.2);
        tracker.record_win_rate(1.0);

        tracker.metrics().save(&path).unwrap();
        assert_eq!(&TrainingMetrics::load(&path).unwrap(), tracker.metrics());
    }
}

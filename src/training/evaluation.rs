use serde::{Deserialize, Serialize};

use super::config::EvaluationScope;
use crate::agent::Agent;
use crate::error::Result;
use crate::maze::{Action, Cell, GameStatus, MazeEnvironment};

/// A greedy rollout from one start cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    /// Each visited cell with the action chosen there
    pub moves: Vec<(Cell, Action)>,
    pub status: GameStatus,
    pub final_cell: Cell,
}

impl Playback {
    pub fn won(&self) -> bool {
        self.status == GameStatus::Won
    }
}

/// Play one episode from `start` following the agent's greedy policy.
///
/// Ends on the exit or when the environment's step budget runs out.
pub fn play<A: Agent + ?Sized>(agent: &A, env: &mut MazeEnvironment, start: Cell) -> Result<Playback> {
    let mut cell = env.reset(start)?;
    let mut moves = Vec::new();
    let mut status = GameStatus::Playing;

    while status == GameStatus::Playing {
        let action = agent.predict(cell);
        moves.push((cell, action));
        let outcome = env.step(action)?;
        cell = outcome.next_state;
        status = outcome.status;
    }

    Ok(Playback {
        moves,
        status,
        final_cell: cell,
    })
}

/// Cells an evaluation with `scope` starts from.
pub fn evaluation_starts(env: &MazeEnvironment, scope: EvaluationScope) -> Vec<Cell> {
    match scope {
        EvaluationScope::Start(cell) => vec![cell],
        EvaluationScope::AllFree => env.start_cells(),
    }
}

/// Fraction of greedy rollouts from `starts` that reach the exit.
pub fn win_rate<A: Agent + ?Sized>(agent: &A, env: &mut MazeEnvironment, starts: &[Cell]) -> Result<f32> {
    if starts.is_empty() {
        return Ok(0.0);
    }
    let mut wins = 0;
    for &start in starts {
        if play(agent, env, start)?.won() {
            wins += 1;
        }
    }
    Ok(wins as f32 / starts.len() as f32)
}

use std::path::Path;

use crate::agent::{
    self, Agent, AgentConfig, AgentKind, QTableAgent, QTableTraceAgent, ReplayAgent, ReplayConfig,
    SarsaTableAgent, SarsaTableTraceAgent, TraceKind, Transition, UpdateParams,
};
use crate::activations::Activation;
use crate::error::TheseusError;
use crate::maze::{Action, Cell, Grid, MazeEnvironment};
use crate::optimizer::OptimizerConfig;

const PARAMS: UpdateParams = UpdateParams {
    discount: 0.9,
    learning_rate: 0.1,
};

fn open_env() -> MazeEnvironment {
    let grid = Grid::from_rows(&[vec![0, 0, 0], vec![0, 0, 0], vec![0, 0, 0]]).unwrap();
    MazeEnvironment::new(grid, Cell::new(2, 2)).unwrap()
}

fn transition(env: &MazeEnvironment, state: Cell, action: Action, reward: f32, done: bool) -> Transition {
    let next_state = env.grid().target(state, action).unwrap_or(state);
    Transition {
        state,
        action,
        reward,
        next_state,
        done,
        next_actions: env.legal_actions(next_state),
    }
}

fn assert_close(actual: f32, expected: f32) {
    assert!((actual - expected).abs() < 1e-5, "expected {}, got {}", expected, actual);
}

#[test]
fn test_q_learning_update() {
    let env = open_env();
    let mut agent = QTableAgent::new(&env);
    agent
        .observe(&transition(&env, Cell::new(1, 2), Action::Right, 10.0, true), None, &PARAMS)
        .unwrap();
    assert_close(agent.table().get(Cell::new(1, 2), Action::Right), 1.0);
    assert_eq!(agent.table().len(), 1);
}

#[test]
fn test_sarsa_and_q_learning_bootstrap_differently() {
    let env = open_env();
    let mut q = QTableAgent::new(&env);
    let mut sarsa = SarsaTableAgent::new(&env);

    // Make Right the greedy action in (1, 0).
    let seed = transition(&env, Cell::new(1, 0), Action::Right, 10.0, true);
    q.observe(&seed, None, &PARAMS).unwrap();
    sarsa.observe(&seed, None, &PARAMS).unwrap();

    // The policy then picks Left in (1, 0), which is not greedy.
    let step = transition(&env, Cell::new(0, 0), Action::Right, -0.05, false);
    q.observe(&step, Some(Action::Left), &PARAMS).unwrap();
    sarsa.observe(&step, Some(Action::Left), &PARAMS).unwrap();

    let q_value = q.table().get(Cell::new(0, 0), Action::Right);
    let sarsa_value = sarsa.table().get(Cell::new(0, 0), Action::Right);
    assert_close(q_value, 0.1 * (-0.05 + 0.9 * 1.0));
    assert_close(sarsa_value, 0.1 * -0.05);
    assert!(q_value > sarsa_value);
}

#[test]
fn test_sarsa_matches_q_learning_when_next_action_is_greedy() {
    let env = open_env();
    let mut q = QTableAgent::new(&env);
    let mut sarsa = SarsaTableAgent::new(&env);
    let seed = transition(&env, Cell::new(1, 0), Action::Right, 10.0, true);
    q.observe(&seed, None, &PARAMS).unwrap();
    sarsa.observe(&seed, None, &PARAMS).unwrap();

    let step = transition(&env, Cell::new(0, 0), Action::Right, -0.05, false);
    q.observe(&step, Some(Action::Right), &PARAMS).unwrap();
    sarsa.observe(&step, Some(Action::Right), &PARAMS).unwrap();
    assert_eq!(q.q_values(Cell::new(0, 0)), sarsa.q_values(Cell::new(0, 0)));
}

#[test]
fn test_traces_stay_bounded_and_decay() {
    let env = open_env();
    let mut agent = QTableTraceAgent::new(&env);
    let first = Cell::new(0, 0);
    agent
        .observe(&transition(&env, first, Action::Right, -0.05, false), Some(Action::Right), &PARAMS)
        .unwrap();

    let decay = PARAMS.discount * agent.trace_decay();
    let mut previous = agent.traces().get(first, Action::Right);
    assert_close(previous, decay);

    let mut cell = Cell::new(1, 0);
    for action in [Action::Right, Action::Down, Action::Left] {
        agent
            .observe(&transition(&env, cell, action, -0.05, false), Some(Action::Down), &PARAMS)
            .unwrap();
        let trace = agent.traces().get(first, Action::Right);
        assert!((0.0..=1.0).contains(&trace));
        assert!(trace < previous);
        previous = trace;
        cell = env.grid().target(cell, action).unwrap();
    }

    agent.begin_episode();
    assert!(agent.traces().is_empty());
}

#[test]
fn test_trace_carries_reward_back_along_the_path() {
    let env = open_env();
    let mut plain = QTableAgent::new(&env);
    let mut traced = QTableTraceAgent::new(&env);
    let path = [
        transition(&env, Cell::new(0, 0), Action::Right, -0.05, false),
        transition(&env, Cell::new(1, 0), Action::Right, 10.0, true),
    ];
    for step in &path {
        plain.observe(step, None, &PARAMS).unwrap();
        traced.observe(step, None, &PARAMS).unwrap();
    }

    // -0.005 from the first step, then 0.1 * 10 * (0.9 * 0.8) from the exit.
    assert_close(traced.table().get(Cell::new(0, 0), Action::Right), -0.005 + 0.72);
    assert_close(plain.table().get(Cell::new(0, 0), Action::Right), -0.005);
}

#[test]
fn test_accumulating_traces_grow_with_repeats() {
    let env = open_env();
    let mut agent = SarsaTableTraceAgent::new(&env)
        .with_traces(1.0, TraceKind::Accumulating)
        .unwrap();
    let params = UpdateParams { discount: 1.0, learning_rate: 0.1 };
    let bump = transition(&env, Cell::new(0, 0), Action::Up, -0.75, false);
    agent.observe(&bump, Some(Action::Up), &params).unwrap();
    agent.observe(&bump, Some(Action::Up), &params).unwrap();
    assert_close(agent.traces().get(Cell::new(0, 0), Action::Up), 2.0);

    assert!(SarsaTableTraceAgent::new(&env).with_traces(1.2, TraceKind::Replacing).is_err());
}

#[test]
fn test_non_finite_update_is_a_numerical_error() {
    let env = open_env();
    let mut agent = QTableAgent::new(&env);
    let broken = transition(&env, Cell::new(0, 0), Action::Right, f32::INFINITY, false);
    assert!(matches!(
        agent.observe(&broken, None, &PARAMS),
        Err(TheseusError::NumericalError(_))
    ));
    assert_eq!(agent.q_values(Cell::new(0, 0)), [0.0; 4]);
}

#[test]
fn test_trace_agents_leave_table_untouched_on_numerical_error() {
    let env = open_env();
    let mut agents: Vec<Box<dyn Agent>> = vec![
        Box::new(QTableTraceAgent::new(&env)),
        Box::new(SarsaTableTraceAgent::new(&env)),
    ];
    let first = transition(&env, Cell::new(0, 0), Action::Right, -0.05, false);
    let broken = transition(&env, Cell::new(1, 0), Action::Down, f32::INFINITY, false);

    for agent in agents.iter_mut() {
        agent.begin_episode();
        agent.observe(&first, Some(Action::Down), &PARAMS).unwrap();
        let cells = [Cell::new(0, 0), Cell::new(1, 0), Cell::new(1, 1)];
        let before: Vec<_> = cells.iter().map(|&cell| agent.q_values(cell)).collect();

        assert!(matches!(
            agent.observe(&broken, Some(Action::Down), &PARAMS),
            Err(TheseusError::NumericalError(_))
        ));
        let after: Vec<_> = cells.iter().map(|&cell| agent.q_values(cell)).collect();
        assert_eq!(after, before, "{} changed its table", agent.name());
    }
}

#[test]
fn test_predict_prefers_legal_actions() {
    let env = open_env();
    let agent = QTableAgent::new(&env);
    // All values are zero: the lowest legal code wins, and Left/Up are off the grid.
    assert_eq!(agent.predict(Cell::new(0, 0)), Action::Right);
    assert_eq!(agent.predict(Cell::new(1, 1)), Action::Left);
}

fn assert_same_policy(a: &dyn Agent, b: &dyn Agent, env: &MazeEnvironment) {
    for cell in env.grid().free_cells() {
        assert_eq!(a.predict(cell), b.predict(cell), "policy differs at {}", cell);
        assert_eq!(a.q_values(cell), b.q_values(cell), "values differ at {}", cell);
    }
}

fn train_a_little(agent: &mut dyn Agent, env: &MazeEnvironment) {
    let steps = [
        transition(env, Cell::new(0, 0), Action::Right, -0.05, false),
        transition(env, Cell::new(1, 0), Action::Down, -0.05, false),
        transition(env, Cell::new(1, 1), Action::Down, -0.05, false),
        transition(env, Cell::new(1, 2), Action::Right, 10.0, true),
    ];
    agent.begin_episode();
    for (i, step) in steps.iter().enumerate() {
        let next = steps.get(i + 1).map(|s| s.action);
        agent.observe(step, next, &PARAMS).unwrap();
    }
}

fn round_trip(kind: AgentKind, config: &AgentConfig, path: &Path) {
    let env = open_env();
    let mut original = agent::build(kind, &env, config).unwrap();
    train_a_little(original.as_mut(), &env);
    original.save(path).unwrap();

    let restored = agent::load(kind, path, &env, config).unwrap();
    if kind != AgentKind::Random {
        assert_same_policy(original.as_ref(), restored.as_ref(), &env);
    }
    assert_eq!(restored.name(), original.name());
}

#[test]
fn test_save_load_round_trip_for_every_kind() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        replay: ReplayConfig { batch_size: 2, capacity: 16, ..Default::default() },
        ..Default::default()
    };
    for kind in AgentKind::ALL {
        let path = dir.path().join(format!("{}.bin", kind));
        round_trip(kind, &config, &path);
    }
}

#[test]
fn test_load_rejects_other_grid_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.bin");
    let env = open_env();
    QTableAgent::new(&env).save(&path).unwrap();

    let bigger = Grid::from_rows(&[vec![0; 4], vec![0; 4], vec![0; 4]]).unwrap();
    let other = MazeEnvironment::new(bigger, Cell::new(3, 2)).unwrap();
    assert!(matches!(
        QTableAgent::load(&path, &other),
        Err(TheseusError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_replay_agent_learns_from_repeated_transition() {
    let env = open_env();
    let config = ReplayConfig {
        capacity: 8,
        batch_size: 1,
        learning_rate: 0.01,
        ..Default::default()
    };
    let mut agent = ReplayAgent::with_config(&env, config).unwrap();
    let exit_step = transition(&env, Cell::new(1, 2), Action::Right, 10.0, true);
    for _ in 0..1000 {
        agent.observe(&exit_step, None, &PARAMS).unwrap();
    }
    let value = agent.q_values(Cell::new(1, 2))[Action::Right.index()];
    assert!((value - 10.0).abs() < 1.0, "Q should approach the exit reward, got {}", value);
    assert!(agent.last_loss().is_some());
}

#[test]
fn test_replay_agent_rejects_a_diverging_update() {
    let env = open_env();
    let config = ReplayConfig {
        batch_size: 1,
        learning_rate: 1.0e38,
        optimizer: OptimizerConfig::SGD,
        ..Default::default()
    };
    let mut agent = ReplayAgent::with_config(&env, config).unwrap();
    let cell = Cell::new(1, 2);
    let before = agent.q_values(cell);

    let exit_step = transition(&env, cell, Action::Right, 10.0, true);
    assert!(matches!(
        agent.observe(&exit_step, None, &PARAMS),
        Err(TheseusError::NumericalError(_))
    ));
    assert_eq!(agent.q_values(cell), before);
    assert!(agent.q_values(cell).iter().all(|value| value.is_finite()));
    assert_eq!(agent.last_loss(), None);
}

#[test]
fn test_replay_hidden_activation_is_configurable() {
    let env = open_env();
    for activation in [Activation::Tanh, Activation::LeakyRelu { alpha: 0.01 }] {
        let config = ReplayConfig {
            batch_size: 2,
            hidden_activation: activation,
            ..Default::default()
        };
        let mut agent = ReplayAgent::with_config(&env, config).unwrap();
        assert!(agent.network().layers[..2].iter().all(|layer| layer.activation == activation));
        assert_eq!(agent.network().layers[2].activation, Activation::Linear);

        train_a_little(&mut agent, &env);
        assert!(agent.last_loss().map_or(false, f32::is_finite));
    }
}

#[test]
fn test_build_names() {
    let env = open_env();
    let config = AgentConfig::default();
    let names: Vec<String> = AgentKind::ALL
        .iter()
        .map(|&kind| agent::build(kind, &env, &config).unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["q-table", "q-table-trace", "sarsa-table", "sarsa-table-trace", "replay-network", "random"]
    );
}

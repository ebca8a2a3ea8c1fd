//! theseus CLI - train, replay and compare maze-solving agents
//!
//! Mazes are plain-text files: `#` is a wall, `.` is free, `S` marks the
//! start and `E` the exit.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use theseus::agent::{self, AgentKind};
use theseus::maze::{Cell, CellState, MazeEnvironment, MazeLayout, MazeView};
use theseus::training::{self, Playback, RunConfig};

#[derive(Parser)]
#[command(name = "theseus")]
#[command(version, about = "Reinforcement learning agents that escape grid mazes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an agent and optionally save it
    Train(TrainArgs),

    /// Replay a saved agent's greedy policy
    Play(PlayArgs),

    /// Train several agent kinds and compare their convergence
    Compare(CompareArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Maze layout file
    #[arg(long)]
    maze: PathBuf,

    /// Agent kind (q-learning, q-learning-trace, sarsa, sarsa-trace, replay, random)
    #[arg(long)]
    agent: Option<AgentKind>,

    /// JSON run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the episode budget
    #[arg(long)]
    episodes: Option<usize>,

    /// Stop as soon as the agent converges
    #[arg(long)]
    stop_at_convergence: bool,

    /// Where to save the trained agent
    #[arg(long)]
    save: Option<PathBuf>,

    /// Where to write the training statistics (JSON)
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct PlayArgs {
    #[arg(long)]
    maze: PathBuf,

    #[arg(long)]
    agent: AgentKind,

    /// Saved agent to load
    #[arg(long)]
    load: PathBuf,

    /// Start cell as `x,y`; defaults to the maze's `S` marker
    #[arg(long)]
    start: Option<Cell>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    #[arg(long)]
    maze: PathBuf,

    /// Comma-separated agent kinds; all kinds when omitted
    #[arg(long, value_delimiter = ',')]
    agents: Vec<AgentKind>,

    /// Training runs per agent kind
    #[arg(long, default_value_t = 3)]
    runs: usize,

    #[arg(long)]
    config: Option<PathBuf>,
}

struct LoadedMaze {
    env: MazeEnvironment,
    start: Cell,
}

fn load_maze(path: &Path) -> Result<LoadedMaze> {
    let layout = MazeLayout::load(path).with_context(|| format!("reading maze {}", path.display()))?;
    let exit = layout
        .exit
        .ok_or_else(|| anyhow!("maze {} has no exit marker 'E'", path.display()))?;
    let start = layout.start.unwrap_or(Cell::new(0, 0));
    let env = MazeEnvironment::new(layout.grid, exit).context("building the maze environment")?;
    Ok(LoadedMaze { env, start })
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path).with_context(|| format!("reading config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn render(view: &MazeView<'_>, path: &[Cell]) -> String {
    let mut out = String::new();
    for y in 0..view.grid.height() {
        for x in 0..view.grid.width() {
            let cell = Cell::new(x, y);
            let symbol = if cell == view.position {
                '@'
            } else if cell == view.exit {
                'E'
            } else if view.grid.get(cell) == Some(CellState::Wall) {
                '#'
            } else if path.contains(&cell) {
                '*'
            } else {
                '.'
            };
            out.push(symbol);
        }
        out.push('\n');
    }
    out
}

fn train(args: TrainArgs) -> Result<()> {
    let mut run = load_config(args.config.as_deref())?;
    if let Some(kind) = args.agent {
        run.agent = kind;
    }
    if let Some(episodes) = args.episodes {
        run.training.episodes = episodes;
    }
    if let Some(seed) = args.seed {
        run.training.seed = seed;
        run.agent_config.replay.seed = seed;
    }
    run.training.stop_at_convergence |= args.stop_at_convergence;

    let LoadedMaze { mut env, .. } = load_maze(&args.maze)?;
    let mut agent = agent::build(run.agent, &env, &run.agent_config)?;
    let trainer = training::Trainer::new(run.training.clone())?;
    let report = trainer.train(agent.as_mut(), &mut env)?;

    println!(
        "{}: {:?} after {} episodes in {:.2?}, final win rate {}",
        agent.name(),
        report.termination,
        report.episodes_run,
        report.elapsed,
        report
            .final_win_rate()
            .map_or_else(|| "n/a".to_string(), |rate| format!("{:.3}", rate))
    );

    if let Some(path) = &args.save {
        agent
            .save(path)
            .with_context(|| format!("saving agent to {}", path.display()))?;
        println!("Agent saved to {}", path.display());
    }
    if let Some(path) = &args.metrics {
        report
            .metrics
            .save(path)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
        println!("Metrics written to {}", path.display());
    }
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    let run = load_config(args.config.as_deref())?;
    let LoadedMaze { mut env, start } = load_maze(&args.maze)?;
    let start = args.start.unwrap_or(start);
    let agent = agent::load(args.agent, &args.load, &env, &run.agent_config)
        .with_context(|| format!("loading agent from {}", args.load.display()))?;

    let Playback { moves, status, final_cell } = training::play(agent.as_ref(), &mut env, start)?;
    let path: Vec<Cell> = moves.iter().map(|&(cell, _)| cell).collect();
    print!("{}", render(&env.view(), &path));
    for (cell, action) in &moves {
        println!("{} -> {}", cell, action);
    }
    println!("{:?} at {} after {} moves", status, final_cell, moves.len());
    Ok(())
}

fn compare(args: CompareArgs) -> Result<()> {
    let run = load_config(args.config.as_deref())?;
    let LoadedMaze { mut env, .. } = load_maze(&args.maze)?;
    let kinds = if args.agents.is_empty() {
        AgentKind::ALL.to_vec()
    } else {
        args.agents
    };

    let summaries = training::compare(&mut env, &kinds, &run.agent_config, &run.training, args.runs)?;
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10}",
        "agent", "episodes", "seconds", "converged", "win rate"
    );
    for summary in summaries {
        println!(
            "{:<20} {:>10.1} {:>10.3} {:>7}/{:<2} {:>10.3}",
            summary.name,
            summary.mean_episodes,
            summary.mean_seconds,
            summary.converged_runs,
            summary.runs,
            summary.mean_final_win_rate
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => train(args),
        Commands::Play(args) => play(args),
        Commands::Compare(args) => compare(args),
    }
}

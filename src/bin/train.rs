use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use fallers::{Agent, AgentConfig, Error, Game, GameConfig, GameMode, TrainConfig, Trainer};
use fallers::logging::init_logging;
use fallers::report::write_scores_csv;

#[derive(Parser, Debug)]
#[command(version, about = "Train a deep Q-learning agent on the falling obstacles game")]
struct Cli {
    /// reward convention
    #[arg(long, value_enum, default_value_t = GameMode::Seek)]
    mode: GameMode,

    #[arg(long, default_value_t = 500)]
    episodes: usize,

    /// hard cap on steps per episode
    #[arg(long, default_value_t = 10_000)]
    max_steps: usize,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 0.95)]
    gamma: f32,

    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.0025)]
    learning_rate: f32,

    /// where the trained model is stored
    #[arg(long, default_value = "input/fallers_agent.bin")]
    model: PathBuf,

    /// per-episode score report
    #[arg(long, default_value = "input/scores.csv")]
    report: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let train_config = TrainConfig {
        episodes: cli.episodes,
        max_steps: cli.max_steps,
        seed: cli.seed,
    };
    let agent_config = AgentConfig {
        gamma: cli.gamma,
        batch_size: cli.batch_size,
        learning_rate: cli.learning_rate,
        ..Default::default()
    };

    info!("initializing {:?} game and agent", cli.mode);
    let (game_rng, agent_rng) = train_config.rngs();
    let game = Game::new(GameConfig::new(cli.mode, false), game_rng).context("invalid game configuration")?;
    let agent = Agent::new(game.observation_size(), game.action_size(), agent_config, agent_rng)
        .context("invalid agent configuration")?;
    let mut trainer = Trainer::new(game, agent, train_config).context("invalid training configuration")?;

    let interrupt = trainer.interrupt_handle();
    ctrlc::set_handler(move || interrupt.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    match trainer.run().map(|records| records.len()) {
        Ok(episodes) => info!("training finished after {} episodes", episodes),
        Err(Error::Interrupted { episodes_completed }) => {
            warn!("stopping early, keeping {} finished episodes", episodes_completed)
        }
        Err(e) => return Err(e).context("training failed"),
    }

    ensure_parent(&cli.report)?;
    write_scores_csv(&cli.report, trainer.records())
        .with_context(|| format!("failed to write score report to {}", cli.report.display()))?;
    info!("wrote score report to {}", cli.report.display());

    ensure_parent(&cli.model)?;
    trainer.agent().store(&cli.model)
        .with_context(|| format!("failed to store model at {}", cli.model.display()))?;
    info!("saved trained model to {}", cli.model.display());

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use macroquad::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fallers::{Agent, AgentConfig, Display, Error, Game, GameConfig, GameMode, TrainConfig, Trainer, TrainerState};
use fallers::logging::init_logging;
use fallers::render::{MacroquadDisplay, SCORE_AREA_HEIGHT};
use fallers::report::write_scores_csv;

const FIELD_SCALE: i32 = 2;
const FIELD_SIZE: i32 = 300;
const AGENT_TICK_SPEED: f32 = 0.05; // seconds

#[derive(Parser, Debug)]
#[command(version, about = "Watch the agent train live, or replay a stored model")]
struct Cli {
    #[arg(long, value_enum, default_value_t = GameMode::Seek)]
    mode: GameMode,

    #[arg(long, default_value_t = 100)]
    episodes: usize,

    #[arg(long, default_value_t = 10_000)]
    max_steps: usize,

    #[arg(long)]
    seed: Option<u64>,

    /// training steps taken per drawn frame
    #[arg(long, default_value_t = 1)]
    steps_per_frame: usize,

    #[arg(long, default_value = "input/fallers_agent.bin")]
    model: PathBuf,

    #[arg(long, default_value = "input/scores.csv")]
    report: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "fallers".to_owned(),
        window_width: FIELD_SIZE * FIELD_SCALE,
        window_height: (SCORE_AREA_HEIGHT as i32) + FIELD_SIZE * FIELD_SCALE,
        window_resizable: false,
        ..Default::default()
    }
}

enum Screen {
    Menu,
    Training(Trainer),
    Watching { game: Game, agent: Agent, display: MacroquadDisplay },
}

enum MenuChoice {
    Train,
    Watch,
}

#[macroquad::main(window_conf)]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = Arc::clone(&quit);
        ctrlc::set_handler(move || quit.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl-C handler")?;
    }

    let mut screen = Screen::Menu;
    let mut time_accumulator: f32 = 0.0;

    loop {
        let quitting = quit.load(Ordering::SeqCst);
        let back = is_key_pressed(KeyCode::Escape);

        screen = match screen {
            Screen::Menu => {
                if quitting {
                    break;
                }
                clear_background(WHITE);
                match draw_menu() {
                    Some(MenuChoice::Train) => Screen::Training(start_training(&cli)?),
                    Some(MenuChoice::Watch) => start_watching(&cli),
                    None => Screen::Menu,
                }
            }
            Screen::Training(mut trainer) => {
                if quitting || back {
                    trainer.interrupt_handle().store(true, Ordering::SeqCst);
                }
                match advance_training(&mut trainer, cli.steps_per_frame) {
                    Ok(TrainerState::Complete) | Err(Error::Interrupted { .. }) => {
                        finish_training(&cli, &trainer)?;
                        if quitting {
                            break;
                        }
                        Screen::Menu
                    }
                    Ok(_) => Screen::Training(trainer),
                    Err(e) => return Err(e).context("training failed"),
                }
            }
            Screen::Watching { mut game, mut agent, mut display } => {
                if quitting {
                    break;
                }
                if back {
                    Screen::Menu
                } else {
                    time_accumulator += get_frame_time();
                    while time_accumulator >= AGENT_TICK_SPEED {
                        time_accumulator -= AGENT_TICK_SPEED;
                        if game.over() {
                            info!("replay ended with score {}", game.score());
                            game.reset();
                        }
                        let action = agent.greedy_action(&game.get_state())?;
                        game.step(action)?;
                    }
                    display.draw(&game.frame());
                    Screen::Watching { game, agent, display }
                }
            }
        };

        next_frame().await
    }

    Ok(())
}

fn start_training(cli: &Cli) -> Result<Trainer> {
    let train_config = TrainConfig {
        episodes: cli.episodes,
        max_steps: cli.max_steps,
        seed: cli.seed,
    };
    let (game_rng, agent_rng) = train_config.rngs();

    let mut game = Game::new(GameConfig::new(cli.mode, true), game_rng)?;
    game.attach_display(Box::new(MacroquadDisplay::new()));
    let agent = Agent::new(game.observation_size(), game.action_size(), AgentConfig::default(), agent_rng)?;

    info!("training live for {} episodes", cli.episodes);
    Ok(Trainer::new(game, agent, train_config)?)
}

fn advance_training(trainer: &mut Trainer, steps: usize) -> fallers::Result<TrainerState> {
    let mut state = trainer.state();
    for _ in 0..steps.max(1) {
        state = trainer.tick()?;
        if state == TrainerState::Complete {
            break;
        }
    }
    Ok(state)
}

fn finish_training(cli: &Cli, trainer: &Trainer) -> Result<()> {
    if trainer.records().is_empty() {
        warn!("no finished episodes, nothing to save");
        return Ok(());
    }
    for path in [&cli.report, &cli.model] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    write_scores_csv(&cli.report, trainer.records())
        .with_context(|| format!("failed to write score report to {}", cli.report.display()))?;
    trainer.agent().store(&cli.model)
        .with_context(|| format!("failed to store model at {}", cli.model.display()))?;
    info!("saved {} episodes of training to {}", trainer.records().len(), cli.model.display());
    Ok(())
}

fn start_watching(cli: &Cli) -> Screen {
    let (game_rng, agent_rng) = TrainConfig { seed: cli.seed, ..Default::default() }.rngs();

    let game = Game::new(GameConfig::new(cli.mode, false), game_rng);
    let agent = Agent::load(&cli.model, agent_rng);
    match (game, agent) {
        (Ok(game), Ok(agent)) => Screen::Watching { game, agent, display: MacroquadDisplay::new() },
        (Err(e), _) | (_, Err(e)) => {
            error!("cannot replay {}: {}", cli.model.display(), e);
            Screen::Menu
        }
    }
}

struct Button {
    rect: Rect,
    text: &'static str,
}

impl Button {
    fn new(x: f32, y: f32, w: f32, h: f32, text: &'static str) -> Self {
        Self {
            rect: Rect::new(x, y, w, h),
            text,
        }
    }

    fn draw_and_check_click(&self) -> bool {
        let mouse_pos = mouse_position();
        let mouse_over = self.rect.contains(vec2(mouse_pos.0, mouse_pos.1));

        let color = if mouse_over {
            Color::from_rgba(100, 100, 120, 255)
        } else {
            Color::from_rgba(80, 80, 100, 255)
        };

        draw_rectangle(self.rect.x, self.rect.y, self.rect.w, self.rect.h, color);
        let text_dims = measure_text(self.text, None, 30, 1.0);
        let text_x = self.rect.x + (self.rect.w - text_dims.width) / 2.0;
        let text_y = self.rect.y + (self.rect.h - text_dims.height) / 2.0 + text_dims.offset_y;
        draw_text(self.text, text_x, text_y, 30.0, WHITE);
        mouse_over && is_mouse_button_pressed(MouseButton::Left)
    }
}

fn draw_menu() -> Option<MenuChoice> {
    let center_x = screen_width() / 2.0;
    let center_y = screen_height() / 2.0;
    let button_width = 250.0;
    let button_height = 60.0;
    let spacing = 20.0;

    let train_button = Button::new(
        center_x - button_width / 2.0,
        center_y - button_height - spacing / 2.0,
        button_width,
        button_height,
        "Train Agent"
    );

    let watch_button = Button::new(
        center_x - button_width / 2.0,
        center_y + spacing / 2.0,
        button_width,
        button_height,
        "Watch Agent"
    );

    let title = "fallers";
    let title_dims = measure_text(title, None, 50, 1.0);
    draw_text(title, center_x - title_dims.width / 2.0, center_y - 100.0, 50.0, BLACK);

    if train_button.draw_and_check_click() {
        Some(MenuChoice::Train)
    } else if watch_button.draw_and_check_click() {
        Some(MenuChoice::Watch)
    } else {
        None
    }
}

//! tictac CLI: board detection, scheduled play and synthetic frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use nalgebra::Point2;

use tictac::actuator::{ActuatorSink, HttpActuator, LogActuator};
use tictac::vision::synthetic::{render_frame, square_corners, RenderParams};
use tictac::vision::{GridLocator, StrokeClassifier};
use tictac::{
    detect_board, load_frame, run_pipeline, save_gray, BoardState, ImageSequenceSource,
    MoveEngine, Pipeline, PipelineConfig, Player, Scheduler,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "tictac")]
#[command(about = "Watch a tic-tac-toe board through a camera and answer with servo moves")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate and classify the board in one image; prints a JSON report.
    Detect {
        /// Input image.
        image: PathBuf,

        /// Pipeline config (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the scheduled pipeline over a directory of frames.
    Run(RunArgs),

    /// Print the engine's decision for a board as JSON.
    NextMove {
        /// Nine cells, row-major, using X, O and '.'.
        #[arg(long)]
        board: String,

        /// Player to move.
        #[arg(long)]
        to_move: Player,
    },

    /// Write a synthetic frame of a board.
    Render {
        /// Nine cells, row-major, using X, O and '.'.
        #[arg(long)]
        board: String,

        /// Output image path.
        #[arg(long)]
        out: PathBuf,

        /// Frame side length in pixels.
        #[arg(long, default_value = "320")]
        size: usize,
    },
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Directory of frames, read in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Pipeline config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start over at the first frame when the directory is exhausted.
    #[arg(long = "loop")]
    looping: bool,

    /// Log servo targets instead of posting them.
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    #[cfg(feature = "tracing")]
    {
        if tracing_log::LogTracer::init().is_ok() {
            log::set_max_level(level);
            tictac::core::init_tracing(false);
            return;
        }
    }

    if let Err(err) = tictac::core::init_with_level(level) {
        eprintln!("logger already installed: {err}");
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Detect { image, config } => run_detect(&image, config.as_deref()),
        Commands::Run(args) => run_scheduled(&args),
        Commands::NextMove { board, to_move } => run_next_move(&board, to_move),
        Commands::Render { board, out, size } => run_render(&board, &out, size),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    match path {
        Some(path) => {
            log::info!("Loading config: {}", path.display());
            PipelineConfig::load_json(path).map_err(|e| -> CliError {
                format!("Failed to load config {}: {}", path.display(), e).into()
            })
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn run_detect(image: &Path, config: Option<&Path>) -> CliResult<()> {
    let cfg = load_config(config)?;
    let frame = load_frame(image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", image.display(), e).into()
    })?;
    log::info!("Image size: {}x{}", frame.width(), frame.height());

    let locator = GridLocator::new(cfg.locator.clone());
    let classifier = StrokeClassifier::new(cfg.classifier_params());
    let report = detect_board(&locator, &classifier, &frame)?;
    log::info!("Board {} (score {:.2})", report.board, report.score);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_scheduled(args: &RunArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let source = ImageSequenceSource::open(&args.frames, args.looping)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let stats = runtime.block_on(async {
        let sink: Arc<dyn ActuatorSink> = if args.dry_run {
            Arc::new(LogActuator)
        } else {
            log::info!("Posting moves to {}", cfg.endpoint);
            Arc::new(HttpActuator::new(cfg.endpoint.clone(), cfg.send_timeout())?)
        };
        let pipeline = Arc::new(Pipeline::from_config(&cfg, sink));

        let mut scheduler = Scheduler::new(cfg.frame_interval());
        if let Some(max) = args.max_ticks {
            scheduler = scheduler.with_max_ticks(max);
        }
        let stats = run_pipeline(&scheduler, source, pipeline.clone()).await;
        log::info!("Final board {}", pipeline.accepted());
        if !args.dry_run {
            // let in-flight actuator requests finish
            tokio::time::sleep(cfg.send_timeout()).await;
        }
        Ok::<_, CliError>(stats)
    })?;

    println!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

fn run_next_move(board: &str, to_move: Player) -> CliResult<()> {
    let state: BoardState = board.parse()?;
    if !state.is_legal() {
        return Err(format!("board {state} is not a legal position").into());
    }
    let decision = MoveEngine::new().next_move(&state, to_move)?;
    println!("{}", serde_json::to_string(&decision)?);
    Ok(())
}

fn run_render(board: &str, out: &Path, size: usize) -> CliResult<()> {
    if size < 32 {
        return Err(format!("--size {size} is too small (minimum 32)").into());
    }
    let state: BoardState = board.parse()?;
    let half = size as f32 / 2.0;
    let corners = square_corners(Point2::new(half, half), size as f32 * 0.75);
    let img = render_frame(size, size, 200, &corners, &state, &RenderParams::default())?;
    save_gray(&img, out)?;
    log::info!("Wrote {} ({size}x{size})", out.display());
    Ok(())
}

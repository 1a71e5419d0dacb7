use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use obavoid::{
    frame::FrameMapper, grid::Grid, monte_carlo::learn_policy, scenario, GridState, NavigationEngine,
    Point, Signature, SimConfig,
};

/// Command line argument parser.
#[derive(Parser, Debug)]
#[command(about = "Steer a simulated robot around obstacles with learned grid policies", long_about = None)]
pub struct Args {
    /// Path to the simulation configuration TOML file.
    config_path: PathBuf,

    /// Log every tick and learning run.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the map cell and grid cell of a position.
    Locate { x: f64, y: f64 },
    /// Learn and print the policy for one grid layout.
    Learn {
        end_row: u8,
        end_col: u8,
        /// Penalized cell as row,col. May be repeated.
        #[arg(long, value_parser = parse_cell)]
        obstacle: Vec<GridState>,
    },
    /// Run one navigation episode.
    Run {
        x: f64,
        y: f64,
        goal_x: f64,
        goal_y: f64,
        /// CSV file of obstacle positions with an x,y header.
        #[arg(long)]
        obstacles: Option<PathBuf>,
        /// Initial heading in degrees.
        #[arg(long, default_value_t = 0.0)]
        heading: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(args.verbose)?;
    let config = SimConfig::load(&args.config_path)?;

    match args.command {
        Commands::Locate { x, y } => {
            let frame = FrameMapper::new(&config.frame).locate(Point::new(x, y));
            println!("Map cell: {}  Grid cell: {}", frame.map_cell, frame.grid_cell);
        }
        Commands::Learn { end_row, end_col, obstacle } => {
            let (rows, cols) = (config.frame.rows, config.frame.cols);
            let end = obstacle.iter().fold(GridState::new(end_row, end_col), |end, obs| {
                Signature::new(end, *obs, rows, cols).end
            });
            let params = &config.learning;
            let grid = Grid::configure(
                rows, cols, params.start(), end, &obstacle,
                params.step_cost, params.obstacle_penalty,
            )?;
            println!("Rewards:");
            println!("{}", grid.render_rewards());
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
            let (policy, report) =
                learn_policy(rows, cols, params, end, &obstacle, &mut rng)?;
            println!("Policy (end {}):", end);
            println!("{}", policy.render());
            println!("State values:");
            println!("{}", report.render_values());
            println!(
                "Episodes: {}  Abandoned: {}  Final largest change: {:.4}",
                report.deltas.len(),
                report.abandoned,
                report.deltas.last().copied().unwrap_or(0.0)
            );
        }
        Commands::Run { x, y, goal_x, goal_y, obstacles, heading } => {
            let obstacles = match obstacles {
                Some(path) => scenario::from_path(&path)?,
                None => Vec::new(),
            };
            let goal = Point::new(goal_x, goal_y);
            let budget = config.robot.step_budget;
            let mut engine = NavigationEngine::new(config, Point::new(x, y), heading, goal)?;
            let mut outcome = "step budget exhausted";
            for step in 1..=budget {
                let report = engine.update(&obstacles, goal)?;
                println!(
                    "{:>4} {:<14} heading {:>6.1} position {}",
                    step, report.decision.to_string(), report.heading, report.position
                );
                if report.hit {
                    outcome = "hit an obstacle";
                    break;
                }
                if report.reached {
                    outcome = "reached the goal";
                    break;
                }
            }
            println!(
                "Episode over: {} ({} policies learned)",
                outcome,
                engine.cache().learning_runs()
            );
        }
    }
    Ok(())
}

/// Parse a grid cell written as `row,col`.
fn parse_cell(s: &str) -> Result<GridState, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected row,col but got '{}'", s))?;
    let row = row.trim().parse::<u8>().map_err(|e| e.to_string())?;
    let col = col.trim().parse::<u8>().map_err(|e| e.to_string())?;
    Ok(GridState::new(row, col))
}

fn setup_logging(verbose: bool) -> Result<(), fern::InitError> {
    let log_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                Utc::now().format("[%Y-%m-%d %H:%M:%S.%6f]"),
                record.level(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

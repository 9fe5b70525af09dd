//! heat-nn CLI - neural Poisson solver driven by YAML configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use heat_nn::config::{require_training_sections, NetworkConfig};
use heat_nn::data::read_npy;
use heat_nn::logging::init_logging;
use heat_nn::report::{run_evaluation, EvalRunConfig};
use heat_nn::{Checkpoint, Grid, PoissonNetwork};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "heat-nn")]
#[command(version)]
#[command(about = "Configuration-driven neural network solver for the Poisson equation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding architecture databases (defaults to $ARCHS_DIR)
    #[arg(long, global = true)]
    archs_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a training configuration
    Validate {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Build the configured architecture with random weights and save it
    Init {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Checkpoint file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Predict the potential of one right-hand side
    Solve {
        /// Path to the YAML configuration (must set `resume`)
        #[arg(short, long)]
        config: PathBuf,

        /// 2-D `.npy` array holding the right-hand side
        #[arg(long)]
        rhs: PathBuf,

        /// Case directory receiving the results
        #[arg(short, long)]
        output: PathBuf,

        /// Write PNG figures
        #[arg(long)]
        plot: bool,
    },

    /// Evaluate a trained network on a dataset and tabulate its metrics
    Eval {
        /// Path to the evaluation run file
        #[arg(short, long)]
        config: PathBuf,

        /// Name of the CSV file written in the case directory
        #[arg(short, long, default_value = "metrics")]
        filename: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let archs_dir = cli.archs_dir.as_deref();

    match cli.command {
        Commands::Validate { config } => {
            let cfg = NetworkConfig::load(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            require_training_sections(&cfg)?;
            let spec = cfg.arch.resolve(archs_dir)?;
            let model = spec.build()?;

            println!("Configuration is valid!");
            println!();
            let g = &cfg.globals;
            println!(
                "Domain: {} x {} nodes, [{}, {}] x [{}, {}] ({:?})",
                g.nnx, g.nny, g.xmin, g.xmax, g.ymin, g.ymax, g.coord
            );
            println!(
                "Architecture: {} with {} scales, depths {:?}, receptive field {}",
                model.kind(),
                model.n_scales(),
                model.depths(),
                model.rf_global_x()
            );
            println!(
                "Data loader: {:?}, batch size {}, alpha {}, scaling factor {}",
                cfg.data_loader.kind,
                cfg.data_loader.args.batch_size,
                cfg.alpha(),
                cfg.scaling_factor()
            );
            if let Some(opt) = &cfg.optimizer {
                println!("Optimizer: {:?}, lr {}", opt.kind, opt.args.lr);
            }
            if let Some(loss) = &cfg.loss {
                let terms: Vec<String> = loss.args.loss_list.iter().map(|t| t.to_string()).collect();
                println!("Loss: {}", terms.join(" + "));
            }
            let metrics: Vec<&str> = cfg.metrics.iter().map(|m| m.name()).collect();
            println!("Metrics: {}", metrics.join(", "));
            if let Some(trainer) = &cfg.trainer {
                println!("Trainer: {} epochs, monitor '{}'", trainer.epochs, trainer.monitor);
            }
        }

        Commands::Init { config, output } => {
            let cfg = NetworkConfig::load(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let spec = cfg.arch.resolve(archs_dir)?;
            let model = spec.build()?;
            let mut checkpoint = Checkpoint::new(spec, model);
            checkpoint.description = cfg.name.clone();
            checkpoint
                .save_json(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), "checkpoint written");
        }

        Commands::Solve { config, rhs, output, plot } => {
            let cfg = NetworkConfig::load(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let solver = PoissonNetwork::new(&cfg, archs_dir)?;

            let arr = read_npy(&rhs).with_context(|| format!("Failed to read {}", rhs.display()))?;
            let &[rows, cols] = arr.shape.as_slice() else {
                anyhow::bail!("{} must hold a 2-D array, found shape {:?}", rhs.display(), arr.shape);
            };
            let field = Grid::from_vec(rows, cols, arr.data)?;
            let potential = solver.run_case(&output, &field, plot, true)?;
            let (lo, hi) = potential.min_max();
            info!(min = lo, max = hi, "potential computed");
        }

        Commands::Eval { config, filename } => {
            let run = EvalRunConfig::load(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let rows = run_evaluation(&run, &filename, archs_dir)?;
            for row in &rows {
                println!("{:<12} {:>14.6e}", row.metric_name, row.value);
            }
        }
    }

    Ok(())
}

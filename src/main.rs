//! WMR Evolution CLI - Evolve robot designs from JSON configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use wmr_evolution::{
    compute::{RoverSimulator, evolution::EvolutionEngine, evolution::FitnessEvaluator},
    recording::{CompressionType, RecorderConfig, RecordingPlayer, record_trace},
    schema::{
        CandidateReport, EvolutionConfig, EvolutionProgress, EvolutionStats, ObjectiveBreakdown,
        PARAMETER_NAMES, RobotParameters,
    },
};

#[derive(Parser, Debug)]
#[command(name = "wmr-evolve")]
#[command(about = "Evolve the design and speed controller of a simulated wheeled mobile robot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an evolution and write its reports
    Run {
        /// Run name used as the prefix of every output file
        name: String,
        /// Evolution config JSON (defaults apply to missing fields)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the population size
        #[arg(long)]
        population: Option<usize>,
        /// Override the generation budget
        #[arg(long)]
        generations: Option<usize>,
        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Evaluate each generation on all cores
        #[arg(long, default_value_t = false)]
        parallel: bool,
        /// Compress the trial recording with LZ4
        #[arg(long, default_value_t = false)]
        lz4: bool,
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Simulate and score one design
    Trial {
        /// Evolution config JSON providing ranges, trial and objective settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Robot parameters JSON (defaults to the config baseline)
        #[arg(long)]
        parameters: Option<PathBuf>,
        /// Write the trial recording here
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Print a summary of a trial recording
    Inspect {
        input: PathBuf,
        /// Also print every frame
        #[arg(long, default_value_t = false)]
        frames: bool,
    },
    /// Print the default evolution config
    ExampleConfig,
}

#[derive(Serialize)]
struct BestSummary<'a> {
    best: &'a CandidateReport,
    stats: &'a EvolutionStats,
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Run {
            name,
            config,
            population,
            generations,
            seed,
            parallel,
            lz4,
            out_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(size) = population {
                config.population.size = size;
            }
            if let Some(max) = generations {
                config.population.max_generations = max;
            }
            if let Some(seed) = seed {
                config.random_seed = seed;
            }
            if parallel {
                config.evaluation.parallel = true;
            }
            run(&name, config, lz4, &out_dir)?;
        }
        Commands::Trial {
            config,
            parameters,
            record,
        } => {
            let config = load_config(config.as_deref())?;
            let params = match parameters {
                Some(path) => read_json::<RobotParameters>(&path)?,
                None => config.baseline,
            };
            trial(&config, &params, record.as_deref())?;
        }
        Commands::Inspect { input, frames } => inspect(&input, frames)?,
        Commands::ExampleConfig => {
            println!("{}", serde_json::to_string_pretty(&EvolutionConfig::default())?);
        }
    }

    Ok(())
}

fn run(name: &str, config: EvolutionConfig, lz4: bool, out_dir: &Path) -> Result<()> {
    let recording = recorder_config(lz4)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    println!("WMR Evolution");
    println!("=============");
    println!("Run: {}", name);
    println!(
        "Population: {}, generations: {}, stagnation limit: {}",
        config.population.size, config.population.max_generations, config.population.stagnation_limit
    );
    println!("Seed: {}", config.random_seed);
    println!();

    let settings = config.simulation.clone();
    let mut engine = EvolutionEngine::new(config, RoverSimulator::default())?;
    let result = engine.run_with_callback(print_progress)?;

    println!();
    println!(
        "Stopped: {:?} after {} generations ({} evaluations, {:.2}s)",
        result.stats.stop_reason,
        result.stats.generations,
        result.stats.total_evaluations,
        result.stats.elapsed_seconds
    );
    print_report(&result.best);

    write_json(&out_dir.join(format!("{name}-generations.json")), &result.history)?;
    write_json(&out_dir.join(format!("{name}-population.json")), &result.population)?;
    write_json(
        &out_dir.join(format!("{name}-best.json")),
        &BestSummary {
            best: &result.best,
            stats: &result.stats,
        },
    )?;

    let replay = engine
        .evaluator()
        .evaluate_detailed(&result.best.genome, true)?;
    match replay.trace {
        Some(trace) => {
            let path = out_dir.join(format!("{name}-trial.wmrt"));
            let stats = record_trace(
                &path,
                &replay.parameters,
                &settings,
                &trace,
                recording,
            )
            .with_context(|| format!("writing {}", path.display()))?;
            println!("Recorded best trial: {} ({})", path.display(), stats);
        }
        None => log::warn!("Best design is infeasible; no trial recorded"),
    }

    println!("Reports written to {}", out_dir.display());
    Ok(())
}

fn trial(config: &EvolutionConfig, params: &RobotParameters, record: Option<&Path>) -> Result<()> {
    config.validate()?;
    let evaluator = FitnessEvaluator::from_config(RoverSimulator::default(), config);
    let genome = config.parameters.encode(params);
    let mut evaluation = evaluator.evaluate_detailed(&genome, record.is_some())?;

    let trace = evaluation.trace.take();
    let report = evaluation.into_report(genome);
    print_report(&report);

    if let (Some(path), Some(trace)) = (record, trace) {
        let stats = record_trace(
            path,
            params,
            &config.simulation,
            &trace,
            RecorderConfig::default(),
        )
        .with_context(|| format!("writing {}", path.display()))?;
        println!("Recorded: {} ({})", path.display(), stats);
    }
    Ok(())
}

fn inspect(input: &Path, show_frames: bool) -> Result<()> {
    let mut player = RecordingPlayer::open(input)
        .with_context(|| format!("opening recording {}", input.display()))?;
    let geometry = player.geometry();

    println!("Recording: {}", input.display());
    println!("  Frames: {}", player.frame_count());
    println!("  Frame interval: {:.3}s", player.frame_interval());
    println!("  Compression: {:?}", player.header().flags.compression);
    println!(
        "  Robot: wheel radius {:.3}, chassis {:.3} x {:.3}, sensor limit {:.3}",
        geometry.wheel_radius, geometry.chassis_length, geometry.chassis_height, geometry.sensor_limit
    );

    let count = player.frame_count();
    if count == 0 {
        return Ok(());
    }
    let first = player.read_frame(0)?;
    let last = player.read_frame(count - 1)?;
    println!(
        "  Start: t={:.2}s x={:.3}  End: t={:.2}s x={:.3}",
        first.time, first.chassis_x, last.time, last.chassis_x
    );

    if show_frames {
        for frame in player.frames() {
            let frame = frame?;
            println!(
                "  t={:6.2} x={:8.3} y={:6.3} angle={:7.3} sensor={:7.3} contact={}",
                frame.time,
                frame.chassis_x,
                frame.chassis_y,
                frame.chassis_angle,
                frame.sensor_distance,
                frame.wall_contact
            );
        }
    }
    Ok(())
}

fn print_progress(progress: &EvolutionProgress) {
    println!(
        "  Gen {:4}/{}: best=({:.4}, {:.4}) avg obj={:.4} stalled={} evals={}",
        progress.generation,
        progress.total_generations,
        progress.statistics.best.feasibility,
        progress.statistics.best.objective,
        progress.statistics.average.objective,
        progress.stagnation_count,
        progress.evaluations
    );
}

fn print_report(report: &CandidateReport) {
    println!(
        "Fitness: feasibility={:.4} objective={:.4}",
        report.fitness.feasibility, report.fitness.objective
    );
    for (name, value) in PARAMETER_NAMES.iter().zip(report.parameters.to_array()) {
        println!("  {:22} {:10.4}", name, value);
    }
    if let Some(breakdown) = &report.breakdown {
        print_breakdown(breakdown);
    }
}

fn print_breakdown(b: &ObjectiveBreakdown) {
    println!("Objective breakdown:");
    println!("  final distance to target {:+.4} -> {:.4}", b.final_distance, b.terms.final_distance);
    println!("  final speed              {:+.4} -> {:.4}", b.final_speed, b.terms.final_speed);
    println!("  hit wall                 {:>7} -> {:.4}", b.hit_wall, b.terms.wall_avoidance);
    println!("  wheel radius             {:.4} -> {:.4}", b.wheel_radius, b.terms.wheel_size);
    println!(
        "  index at rest            {}/{} -> {:.4}",
        b.index_at_rest, b.sample_count, b.terms.time_at_rest
    );
}

fn recorder_config(lz4: bool) -> Result<RecorderConfig> {
    let compression = if lz4 {
        CompressionType::Lz4
    } else {
        CompressionType::None
    };
    if !compression.is_supported() {
        bail!("--lz4 needs a build with the `lz4` feature");
    }
    Ok(RecorderConfig {
        compression,
        ..Default::default()
    })
}

fn load_config(path: Option<&Path>) -> Result<EvolutionConfig> {
    match path {
        Some(path) => read_json(path),
        None => Ok(EvolutionConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| anyhow!("parsing {}: {}", path.display(), e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let encoded = serde_json::to_vec_pretty(value)?;
    fs::write(path, encoded).with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

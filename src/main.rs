use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, info};
use qcirc::config::SimConfig;
use qcirc::runtime::{self, ShotHistogram};
use qcirc::tensor::n2multiidx;
use qcirc::{QCircuit, QResult, QasmReader};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::to_writer_pretty;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

const QCIRC_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "qcirc", version = QCIRC_VERSION,
    about = "qcirc - an OpenQASM 2.0 state-vector simulator.\n\
             Use 'qcirc help <command>' for more information on a specific command, e.g., 'qcirc help run'.",
    long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Parses and executes an OpenQASM 2.0 program.
    Run {
        /// Source .qasm file path
        source: PathBuf,
        /// Seed for the measurement sampler.
        #[arg(long)]
        seed: Option<u64>,
        /// Number of independent shots. More than one prints an outcome histogram.
        #[arg(long)]
        shots: Option<usize>,
        /// Emit a JSON report instead of plain text.
        #[arg(long)]
        json: bool,
        /// JSON configuration file.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Additional include search directory (repeatable).
        #[arg(short = 'I', long = "include", value_name = "DIR")]
        include: Vec<PathBuf>,
        /// Enable debug logging.
        #[arg(long)]
        debug: bool,
    },
    /// Parses an OpenQASM 2.0 program and prints a resource summary.
    Check {
        /// Source .qasm file path
        source: PathBuf,
        /// Additional include search directory (repeatable).
        #[arg(short = 'I', long = "include", value_name = "DIR")]
        include: Vec<PathBuf>,
        /// Enable debug logging.
        #[arg(long)]
        debug: bool,
    },
    /// Prints the qcirc version.
    Version,
}

#[derive(Serialize, Debug)]
struct AmplitudeEntry {
    basis: String,
    re: f64,
    im: f64,
    probability: f64,
}

#[derive(Serialize, Debug)]
struct RunReport {
    circuit: Option<String>,
    qubits: usize,
    dits: usize,
    seed: u64,
    shots: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    amplitudes: Option<Vec<AmplitudeEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    classical: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probabilities: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    histogram: Option<ShotHistogram>,
    elapsed_ms: u128,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn load_circuit(source: &Path, include_paths: &[PathBuf]) -> QResult<QCircuit> {
    QasmReader::new()
        .with_include_paths(include_paths.iter().cloned())
        .read_file(source)
}

fn single_shot(circuit: &QCircuit, config: &SimConfig, seed: u64, report: &mut RunReport) -> QResult<()> {
    let mut engine = runtime::shot_engine(circuit, seed, 0)?;
    engine.execute()?;
    let state = engine.state();
    let amplitudes = state
        .amplitudes()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.norm() > config.amplitude_cutoff)
        .map(|(i, a)| AmplitudeEntry {
            basis: n2multiidx(i, state.dims()).iter().map(|d| d.to_string()).collect(),
            re: a.re,
            im: a.im,
            probability: a.norm_sqr(),
        })
        .collect();
    report.amplitudes = Some(amplitudes);
    report.classical = Some(engine.get_dits().to_vec());
    report.probabilities = Some(engine.get_probs().to_vec());
    Ok(())
}

fn many_shots(circuit: &QCircuit, shots: usize, seed: u64, quiet: bool) -> QResult<ShotHistogram> {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(shots as u64)
    };
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} shots")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let outcomes = (0..shots)
        .into_par_iter()
        .progress_with(bar.clone())
        .map(|shot| runtime::run_single_shot(circuit, seed, shot as u64))
        .collect::<QResult<Vec<String>>>()?;
    bar.finish_and_clear();
    Ok(runtime::histogram(outcomes))
}

fn print_report(report: &RunReport) {
    match &report.circuit {
        Some(name) => println!("circuit '{}': {} qubits, {} dits", name, report.qubits, report.dits),
        None => println!("circuit: {} qubits, {} dits", report.qubits, report.dits),
    }
    println!("seed: {}", report.seed);
    if let Some(amplitudes) = &report.amplitudes {
        println!("amplitudes:");
        for a in amplitudes {
            println!(
                "  |{}>  {:+.6} {:+.6}i  (p = {:.6})",
                a.basis, a.re, a.im, a.probability
            );
        }
    }
    if let Some(classical) = &report.classical {
        let dits: Vec<String> = classical.iter().map(|d| d.to_string()).collect();
        println!("classical dits: [{}]", dits.join(", "));
    }
    if let Some(histogram) = &report.histogram {
        println!("outcomes over {} shots:", report.shots);
        for (outcome, count) in histogram {
            println!(
                "  {}  {:>8}  ({:.4})",
                outcome,
                count,
                *count as f64 / report.shots as f64
            );
        }
    }
    println!("elapsed: {} ms", report.elapsed_ms);
}

fn run(source: &Path, config: SimConfig, json: bool) -> QResult<()> {
    let start = Instant::now();
    let circuit = load_circuit(source, &config.include_paths)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!("running {} shot(s) with seed {}", config.shots, seed);

    let mut report = RunReport {
        circuit: circuit.name().map(str::to_string),
        qubits: circuit.nq(),
        dits: circuit.nc(),
        seed,
        shots: config.shots,
        amplitudes: None,
        classical: None,
        probabilities: None,
        histogram: None,
        elapsed_ms: 0,
    };
    if config.shots <= 1 {
        single_shot(&circuit, &config, seed, &mut report)?;
    } else {
        report.histogram = Some(many_shots(&circuit, config.shots, seed, json)?);
    }
    report.elapsed_ms = start.elapsed().as_millis();

    if json {
        to_writer_pretty(io::stdout().lock(), &report).map_err(|e| qcirc::QError::Io {
            path: PathBuf::from("<stdout>"),
            source: e.into(),
        })?;
        println!();
    } else {
        print_report(&report);
    }
    Ok(())
}

fn check(source: &Path, include_paths: &[PathBuf]) -> QResult<()> {
    let circuit = load_circuit(source, include_paths)?;
    circuit.validate()?;
    println!("{}: ok", source.display());
    println!("  qubits:        {}", circuit.nq());
    println!("  classical:     {}", circuit.nc());
    println!("  operations:    {}", circuit.len());
    println!("  gates applied: {}", circuit.gate_count());
    println!("  measurements:  {}", circuit.measurement_count());
    println!("  distinct gates: {}", circuit.gates().len());
    for g in circuit.gates() {
        debug!("gate {} on {} qubit(s)", g.name, g.arity);
    }
    Ok(())
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            seed,
            shots,
            json,
            config,
            include,
            debug,
        } => {
            init_logging(debug);
            let base = match config {
                Some(path) => SimConfig::from_file(&path).map_err(|e| e.to_string())?,
                None => SimConfig::default(),
            };
            let config = base.merge_cli(seed, shots, &include);
            run(&source, config, json).map_err(|e| format!("{}: {}", source.display(), e))?;
        }
        Commands::Check {
            source,
            include,
            debug,
        } => {
            init_logging(debug);
            check(&source, &include).map_err(|e| format!("{}: {}", source.display(), e))?;
        }
        Commands::Version => {
            println!("qcirc version {}", QCIRC_VERSION);
        }
    }
    Ok(())
}

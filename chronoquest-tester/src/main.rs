mod logic;

use anyhow::{Context, Result};
use chronoquest_game::EngineConfig;
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::{
    RunRecord, Simulator, Strategy, StrategySummary, resolve_seed_inputs, split_csv, summarize,
};

#[derive(Debug, Parser)]
#[command(name = "chronoquest-tester", version)]
#[command(about = "Autopilot playability and invariant testing for the ChronoQuest engine")]
struct Args {
    /// Seeds to run (comma-separated, decimal or 0x-prefixed hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Runs per strategy and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Strategies to run (cautious,greedy,random or all)
    #[arg(long, default_value = "all")]
    strategy: String,

    /// Turn limit for a single run
    #[arg(long, default_value_t = 300)]
    max_turns: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Engine tuning document to use instead of the bundled one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    announce_banner();

    let start_time = Instant::now();
    let strategies = Strategy::parse_list(&split_csv(&args.strategy))?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let config = load_config(args.config.as_deref())?;

    let simulator = Simulator::new(config, args.max_turns)?;
    let runs = simulator.run_batch(&strategies, &seeds, args.iterations)?;
    let summaries = summarize(&runs);

    write_reports(&args, &summaries, &runs, start_time)?;

    if runs.iter().any(|r| !r.passed()) {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

fn announce_banner() {
    eprintln!("{}", "🕰️ ChronoQuest Autopilot Tester".bright_cyan().bold());
    eprintln!("{}", "================================".cyan());
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::embedded().clone());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    EngineConfig::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn write_reports(
    args: &Args,
    summaries: &[StrategySummary],
    runs: &[RunRecord],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, summaries, runs)?,
        "markdown" => {
            if runs.is_empty() {
                writeln!(
                    &mut output_target,
                    "# ChronoQuest Autopilot Results\n\n_No runs executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, summaries, runs)?;
            }
        }
        _ => {
            if runs.is_empty() {
                writeln!(&mut output_target, "No runs executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    summaries,
                    runs,
                    start_time.elapsed(),
                )?;
                writeln!(&mut output_target)?;
                writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
            }
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

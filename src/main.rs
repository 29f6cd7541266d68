//! methbed: methylKit calls to BED intervals
//!
//! Usage: methbed <COMMAND> [OPTIONS]

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use methbed::batch::{collect_inputs, default_out_dir, ensure_dir, expand_wildcards, output_path};
use methbed::commands::{CpaCommand, MergeCommand, SplitChromCommand, ToBedCommand};
use methbed::config::{MalformedPolicy, PipelineConfig, DEFAULT_CHUNK_SIZE};
use methbed::error::{PipelineError, Result};
use methbed::reference::FastaReference;

/// Output directory used by `cpa` in directory mode.
const CPA_SUBDIR: &str = "cpa_context";

#[derive(Parser)]
#[command(name = "methbed")]
#[command(version)]
#[command(about = "Convert methylKit methylation calls into BED intervals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where inputs come from and where outputs go.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Input call file(s), wildcards allowed (use - for stdin)
    #[arg(short, long, num_args = 1.., conflicts_with = "dir")]
    input: Vec<PathBuf>,

    /// Process every file in this directory that matches --pattern
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// File pattern used with --dir
    #[arg(short, long, default_value = "*.txt")]
    pattern: String,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Write results to stdout instead of per-input files
    #[arg(long, conflicts_with_all = ["out_dir", "dir"])]
    stdout: bool,
}

/// Options shared by the converting commands.
#[derive(Args, Debug, Clone)]
struct PipelineArgs {
    /// Write a header row before the records
    #[arg(short = 'H', long)]
    header: bool,

    /// Log and skip malformed rows instead of stopping at the first one
    #[arg(long)]
    skip_malformed: bool,
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        let policy = if self.skip_malformed {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Fail
        };
        PipelineConfig::new()
            .with_header(self.header)
            .with_malformed_policy(policy)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge runs of up to three consecutive positions into BED intervals
    Merge {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Calls read per lookahead refill (at least 3; output does not depend on it)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Start a new interval where the strand changes
        #[arg(long)]
        split_on_strand_change: bool,
    },

    /// Keep calls in CpA context, resolved against a reference genome
    Cpa {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Indexed reference FASTA (needs a .fai next to it)
        #[arg(short, long)]
        reference: PathBuf,

        /// Only process these chromosomes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        chromosomes: Vec<String>,
    },

    /// Write one BED4 row per call
    ToBed {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Split call files into one file per chromosome
    SplitChr {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            input,
            pipeline,
            chunk_size,
            split_on_strand_change,
        } => run_merge(input, pipeline, chunk_size, split_on_strand_change),
        Commands::Cpa {
            input,
            pipeline,
            reference,
            chromosomes,
        } => run_cpa(input, pipeline, reference, chromosomes),
        Commands::ToBed { input, pipeline } => run_to_bed(input, pipeline),
        Commands::SplitChr { input } => run_split_chr(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Destination of one input's output.
enum Target {
    Stdout,
    File(PathBuf),
    Dir(PathBuf),
}

struct Job {
    input: PathBuf,
    target: Target,
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_stdin(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(File::open(path)?))
    }
}

/// Run `f` against the writer for a job's target.
fn with_output<T>(target: &Target, f: impl FnOnce(&mut dyn Write) -> Result<T>) -> Result<T> {
    match target {
        Target::File(path) => {
            let mut file = File::create(path)?;
            f(&mut file)
        }
        Target::Stdout | Target::Dir(_) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            f(&mut handle)
        }
    }
}

/// Resolve inputs and their destinations.
///
/// `suffix` names per-file outputs; `dir_subdir` is the default output
/// directory below `--dir`; `per_dir` makes each target the output
/// directory itself.
fn plan(args: &InputArgs, suffix: &str, dir_subdir: Option<&str>, per_dir: bool) -> Result<Vec<Job>> {
    let (inputs, dir_default) = match &args.dir {
        Some(dir) => {
            let inputs = collect_inputs(dir, &args.pattern)?;
            if inputs.is_empty() {
                warn!("No files in {} match '{}'", dir.display(), args.pattern);
            }
            let default = match dir_subdir {
                Some(sub) => dir.join(sub),
                None => dir.clone(),
            };
            (inputs, Some(default))
        }
        None if args.input.is_empty() => (vec![PathBuf::from("-")], None),
        None => (expand_wildcards(&args.input)?, None),
    };

    let mut jobs = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !per_dir && (args.stdout || is_stdin(&input)) {
            jobs.push(Job {
                input,
                target: Target::Stdout,
            });
            continue;
        }

        let out_dir = args
            .out_dir
            .clone()
            .or_else(|| dir_default.clone())
            .unwrap_or_else(|| default_out_dir(&input));
        ensure_dir(&out_dir)?;
        let target = if per_dir {
            Target::Dir(out_dir)
        } else {
            Target::File(output_path(&input, &out_dir, suffix))
        };
        jobs.push(Job { input, target });
    }
    Ok(jobs)
}

/// Run every job; a failing input does not stop the batch.
///
/// `run_one` returns the number of chromosome streams it had to abort.
fn run_jobs<F>(jobs: &[Job], mut run_one: F) -> Result<()>
where
    F: FnMut(&Job) -> Result<usize>,
{
    let total = jobs.len();
    let mut failures = Vec::new();

    for job in jobs {
        let result = run_one(job).and_then(|aborted| match aborted {
            0 => Ok(()),
            aborted => Err(PipelineError::Incomplete {
                input: job.input.display().to_string(),
                aborted,
            }),
        });
        if let Err(e) = result {
            if total > 1 {
                error!("{}: {}", job.input.display(), e);
            }
            failures.push(e);
        }
    }

    match failures.len() {
        0 => Ok(()),
        1 if total == 1 => Err(failures.remove(0)),
        failed => Err(PipelineError::BatchFailed { failed, total }),
    }
}

fn run_merge(
    input: InputArgs,
    pipeline: PipelineArgs,
    chunk_size: usize,
    split_on_strand_change: bool,
) -> Result<()> {
    let config = pipeline
        .config()
        .with_chunk_size(chunk_size)
        .with_strand_split(split_on_strand_change);
    config.validate()?;

    let cmd = MergeCommand::new(config);
    let jobs = plan(&input, ".bed", None, false)?;
    run_jobs(&jobs, |job| {
        let stats = with_output(&job.target, |mut out| {
            cmd.run_reader(open_input(&job.input)?, &mut out)
        })?;
        info!("{}: {}", job.input.display(), stats);
        Ok(stats.chromosomes_aborted)
    })
}

fn run_cpa(
    input: InputArgs,
    pipeline: PipelineArgs,
    reference: PathBuf,
    chromosomes: Vec<String>,
) -> Result<()> {
    let config = pipeline.config();
    let jobs = plan(&input, ".CpA.bed", Some(CPA_SUBDIR), false)?;

    let reference = FastaReference::from_path(&reference)?;
    let mut cmd = CpaCommand::new(config, reference);
    if !chromosomes.is_empty() {
        cmd = cmd.with_chromosomes(chromosomes);
    }

    run_jobs(&jobs, |job| {
        let stats = with_output(&job.target, |mut out| {
            cmd.run_reader(open_input(&job.input)?, &mut out)
        })?;
        info!("{}: {}", job.input.display(), stats);
        Ok(stats.chromosomes_aborted)
    })
}

fn run_to_bed(input: InputArgs, pipeline: PipelineArgs) -> Result<()> {
    let cmd = ToBedCommand::new(pipeline.config());
    let jobs = plan(&input, ".bed", None, false)?;
    run_jobs(&jobs, |job| {
        let stats = with_output(&job.target, |mut out| {
            cmd.run_reader(open_input(&job.input)?, &mut out)
        })?;
        info!("{}: {}", job.input.display(), stats);
        Ok(0)
    })
}

fn run_split_chr(input: InputArgs) -> Result<()> {
    let jobs = plan(&input, "", None, true)?;
    run_jobs(&jobs, |job| {
        let out_dir = match &job.target {
            Target::Dir(out_dir) if !is_stdin(&job.input) => out_dir,
            _ => {
                return Err(PipelineError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "split-chr needs a named input file",
                )))
            }
        };
        let stats = SplitChromCommand::new(PipelineConfig::new(), out_dir).run(&job.input)?;
        info!("{}: {}", job.input.display(), stats);
        Ok(0)
    })
}

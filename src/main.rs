use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use pore_splitter::{run, Config, DuplicatePolicy, DEFAULT_CHUNK_SIZE, DEFAULT_COMPRESSION};

#[derive(Parser, Debug)]
#[command(name = "pore_splitter", version)]
#[command(about = "Split Nanopore reads based on channel number.", long_about = None)]
struct Cli {
    /// Input folder with fastq file(s), gzipped or not
    #[arg(short, long, value_name = "/path/to/folder/with/fastq")]
    input: PathBuf,

    /// Output folder
    #[arg(short, long, value_name = "/path/to/output/folder")]
    output: PathBuf,

    /// Pore range to keep, between 0-512
    #[arg(short, long, value_name = "0-256")]
    range: String,

    /// Number of CPU [default: all]
    #[arg(short, long)]
    threads: Option<usize>,

    /// Number of samples to process in parallel [default: all CPU]
    #[arg(short, long)]
    parallel: Option<usize>,

    /// Number of lines per chunk, a multiple of 4
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Gzip level of the output files (0-9)
    #[arg(short = 'z', long, default_value_t = DEFAULT_COMPRESSION)]
    compression: u32,

    /// Fail a file if the same read id is kept twice instead of keeping the last read
    #[arg(long)]
    fail_on_duplicates: bool,

    /// Write a YAML summary of the run to this file
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.input, self.output, self.range);
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(parallel) = self.parallel {
            config.parallel = parallel;
        }
        config.chunk_size = self.chunk_size;
        config.compression = self.compression;
        if self.fail_on_duplicates {
            config.duplicate_policy = DuplicatePolicy::Fail;
        }
        config
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    if let Err(e) = try_main() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary_path = cli.summary.clone();

    let summary = run(&cli.into_config())?;

    if let Some(path) = summary_path {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create summary file {:?}", path))?;
        serde_yaml::to_writer(BufWriter::new(file), &summary)
            .with_context(|| format!("Failed to write summary file {:?}", path))?;
    }

    Ok(())
}

#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process;

use clap::Parser;

use tally_sales::config::{Config, SchedulerKind};
use tally_sales::error::Result;
use tally_sales::job::SalesJob;
use tally_sales::report::Summary;
use tally_sales::sink::{ReportFiles, ReportSink};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Per-store sales, basket and store statistics from a pipe-delimited transaction log")]
struct Args {
    /// Transactions file; defaults to TestData/TestData1.csv
    #[clap(value_parser)]
    input: Option<PathBuf>,

    /// TOML file with run settings; flags override it
    #[clap(long, value_parser, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for report files; defaults to the input's directory
    #[clap(long, value_parser, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[clap(long, value_parser)]
    workers: Option<usize>,

    /// Bytes per partition
    #[clap(long, value_parser)]
    chunk_size: Option<u64>,

    #[clap(long, value_enum)]
    scheduler: Option<SchedulerKind>,

    #[clap(long, value_parser)]
    delimiter: Option<char>,

    /// Skip collecting the products of every basket
    #[clap(long, takes_value = false)]
    no_basket_items: bool,

    /// Only print the report; write no files
    #[clap(long, takes_value = false)]
    no_files: bool
}

impl Args {

    fn into_config(self) -> Result<(Config, bool)> {
        let mut config = match self.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default()
        };
        match self.input {
            Some(input) => config.input = input,
            None => info!("Using input file {}", config.input.display())
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.chunk_size.is_some() {
            config.chunk_size = self.chunk_size;
        }
        if let Some(scheduler) = self.scheduler {
            config.scheduler = scheduler;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if self.no_basket_items {
            config.basket_items = false;
        }
        config.validate()?;
        Ok((config, !self.no_files))
    }
}

fn run(args: Args) -> Result<()> {
    let (config, write_files) = args.into_config()?;
    let job = SalesJob::new(config)?;
    let run = job.run()?;

    let config = job.config();
    print!("{}", Summary::new(&config.input, &run));

    if write_files {
        let sink = ReportSink::new(config.output_dir());
        sink.write_reports(&config.input, &run, ReportFiles::from_config(config))?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("** Error: {}.", e);
        process::exit(e.exit_code());
    }
}

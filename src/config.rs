//! Command-line configuration for the benchmark driver.
use std::path::PathBuf;

use clap::Parser;

use crate::error::Error;
use crate::harness::RunConfig;
use crate::report::ResultName;

pub const DEFAULT_LABEL: &str = "MCC_030402_99106458";

/// Assigns every input line a slot in a shared two-choice hash table.
#[derive(Debug, Parser)]
#[command(name = "twochoice", version)]
pub struct Args {
    /// Nominal input size, used in the result file name (accepts K/M suffixes).
    #[arg(long = "data_size", value_parser = parse_size)]
    pub data_size: usize,

    /// Number of worker threads.
    #[arg(long, value_parser = parse_threads)]
    pub threads: usize,

    /// Placement table capacity; must cover the number of distinct lines (accepts K/M suffixes).
    #[arg(long, value_parser = parse_size)]
    pub tsize: usize,

    /// Input file, one key per line.
    #[arg(long)]
    pub input: PathBuf,

    /// Directory receiving the result file.
    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,

    /// Tag embedded in the result file name.
    #[arg(long, default_value = DEFAULT_LABEL)]
    pub label: String,
}

impl Args {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            table_capacity: self.tsize,
            threads: self.threads,
        }
    }

    pub fn result_name(&self) -> ResultName<'_> {
        ResultName {
            label: &self.label,
            data_size: self.data_size,
            threads: self.threads,
            tsize: self.tsize,
        }
    }
}

/// Parses a positive count with an optional `K`/`k` (x1000) or `M`/`m`
/// (x1000000) suffix.
pub fn parse_size(input: &str) -> Result<usize, Error> {
    let invalid = || Error::InvalidSize {
        input: input.to_owned(),
    };

    let (digits, multiplier) = match input.as_bytes().last() {
        Some(b'K' | b'k') if input.len() > 1 => (&input[..input.len() - 1], 1_000),
        Some(b'M' | b'm') if input.len() > 1 => (&input[..input.len() - 1], 1_000_000),
        _ => (input, 1),
    };

    let value: usize = digits.parse().map_err(|_| invalid())?;
    match value.checked_mul(multiplier) {
        Some(size) if size > 0 => Ok(size),
        _ => Err(invalid()),
    }
}

pub fn parse_threads(input: &str) -> Result<usize, Error> {
    match input.parse::<usize>() {
        Ok(threads) if threads >= 1 => Ok(threads),
        _ => Err(Error::InvalidThreads {
            input: input.to_owned(),
        }),
    }
}

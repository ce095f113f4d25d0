//! Result file and console summary for a finished run.
//!
//! File layout, one run per file:
//!
//! ```text
//! ExecutionTime: <ms> ms
//! NumberOfHandledCollision: <collisions>
//! <slot of key 0>,<slot of key 1>,...,<slot of key n-1>
//! ```
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::harness::RunReport;

/// Run parameters encoded in the result file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultName<'a> {
    pub label: &'a str,
    pub data_size: usize,
    pub threads: usize,
    pub tsize: usize,
}

impl ResultName<'_> {
    /// `Results_<label>_<data_size>_<threads>_<tsize>.txt`
    pub fn file_name(&self) -> String {
        format!(
            "Results_{}_{}_{}_{}.txt",
            self.label, self.data_size, self.threads, self.tsize
        )
    }
}

/// Creates `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })
}

pub fn write_results(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    let elapsed_ms = report.elapsed.as_secs_f64() * 1000.0;
    writeln!(out, "ExecutionTime: {elapsed_ms:.0} ms")?;
    writeln!(out, "NumberOfHandledCollision: {}", report.stats.collisions)?;

    for (i, slot) in report.assignments.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        write!(out, "{slot}")?;
    }
    out.write_all(b"\n")
}

/// Writes the result file into `dir`, returning its path.
pub fn save(dir: &Path, name: &ResultName<'_>, report: &RunReport) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(name.file_name());
    let io_err = |source| Error::Io {
        path: path.clone(),
        source,
    };

    let mut out = BufWriter::new(File::create(&path).map_err(io_err)?);
    write_results(&mut out, report).map_err(io_err)?;
    out.flush().map_err(io_err)?;

    tracing::debug!(path = %path.display(), "wrote results");
    Ok(path)
}

/// One-line console summary.
pub fn summary(threads: usize, report: &RunReport) -> String {
    format!(
        "Threads:{}  Time:{:.3}s  Unique:{}  CollRate:{:.4}%",
        threads,
        report.elapsed.as_secs_f64(),
        report.stats.unique,
        report.stats.collision_rate(),
    )
}

// ⚙️ Run Configuration - Explicit context passed to every stage
// No process-wide globals: paths and sizes travel with the run

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::window::DEFAULT_WINDOW_RADIUS;

/// Default chunk size: 64 KiB per read
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// RunConfig - Everything one pipeline run needs to know
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Single dump file or a directory of dump files
    pub input: PathBuf,

    /// Directory receiving the append logs, exports, and run log
    pub out_dir: PathBuf,

    /// Bytes per chunk read
    pub chunk_size: usize,

    /// Neighbor lines taken on each side when building context windows
    pub window_radius: usize,

    /// Staging database path; `None` disables persistence entirely
    pub staging_db: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: PathBuf, out_dir: PathBuf) -> Self {
        RunConfig {
            input,
            out_dir,
            chunk_size: DEFAULT_CHUNK_SIZE,
            window_radius: DEFAULT_WINDOW_RADIUS,
            staging_db: None,
        }
    }

    /// Parse `<input> [--out DIR] [--chunk-size BYTES] [--window RADIUS]
    /// [--staging DB]` from the argument list after the mode word.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut input: Option<PathBuf> = None;
        let mut out_dir = PathBuf::from("harvest_out");
        let mut chunk_size = DEFAULT_CHUNK_SIZE;
        let mut window_radius = DEFAULT_WINDOW_RADIUS;
        let mut staging_db = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--out" => {
                    out_dir = PathBuf::from(flag_value(args, &mut i, "--out")?);
                }
                "--chunk-size" => {
                    let raw = flag_value(args, &mut i, "--chunk-size")?;
                    chunk_size = raw
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --chunk-size: {}", raw))?;
                    if chunk_size == 0 {
                        bail!("--chunk-size must be greater than zero");
                    }
                }
                "--window" => {
                    let raw = flag_value(args, &mut i, "--window")?;
                    window_radius = raw
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --window: {}", raw))?;
                }
                "--staging" => {
                    staging_db = Some(PathBuf::from(flag_value(args, &mut i, "--staging")?));
                }
                other if other.starts_with("--") => {
                    bail!("Unknown flag: {}", other);
                }
                positional => {
                    if input.is_some() {
                        bail!("Unexpected extra argument: {}", positional);
                    }
                    input = Some(PathBuf::from(positional));
                }
            }
            i += 1;
        }

        let input = match input {
            Some(p) => p,
            None => bail!("Missing input path (file or directory)"),
        };

        Ok(RunConfig {
            input,
            out_dir,
            chunk_size,
            window_radius,
            staging_db,
        })
    }

    // Derived output paths, all under out_dir

    pub fn account_log_path(&self) -> PathBuf {
        self.out_dir.join("accounts.jsonl")
    }

    pub fn transfer_log_path(&self) -> PathBuf {
        self.out_dir.join("transfers.jsonl")
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.out_dir.join("run.log")
    }

    pub fn account_export_path(&self) -> PathBuf {
        self.out_dir.join("accounts.csv")
    }

    pub fn transfer_export_path(&self) -> PathBuf {
        self.out_dir.join("transfers.csv")
    }
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(v) => Ok(v),
        None => bail!("{} requires a value", flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = RunConfig::from_args(&args(&["dump.bin"])).unwrap();
        assert_eq!(cfg.input, Path::new("dump.bin"));
        assert_eq!(cfg.out_dir, Path::new("harvest_out"));
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.window_radius, DEFAULT_WINDOW_RADIUS);
        assert!(cfg.staging_db.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cfg = RunConfig::from_args(&args(&[
            "dumps/",
            "--out",
            "results",
            "--chunk-size",
            "4096",
            "--window",
            "3",
            "--staging",
            "staging.db",
        ]))
        .unwrap();
        assert_eq!(cfg.out_dir, Path::new("results"));
        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.window_radius, 3);
        assert_eq!(cfg.staging_db.as_deref(), Some(Path::new("staging.db")));
    }

    #[test]
    fn test_missing_input_is_error() {
        assert!(RunConfig::from_args(&args(&["--out", "x"])).is_err());
    }

    #[test]
    fn test_zero_chunk_size_is_error() {
        assert!(RunConfig::from_args(&args(&["d", "--chunk-size", "0"])).is_err());
    }

    #[test]
    fn test_unknown_flag_is_error() {
        assert!(RunConfig::from_args(&args(&["d", "--bogus"])).is_err());
    }

    #[test]
    fn test_derived_paths_live_under_out_dir() {
        let cfg = RunConfig::new(PathBuf::from("d"), PathBuf::from("out"));
        assert_eq!(cfg.account_log_path(), Path::new("out/accounts.jsonl"));
        assert_eq!(cfg.transfer_log_path(), Path::new("out/transfers.jsonl"));
        assert_eq!(cfg.run_log_path(), Path::new("out/run.log"));
        assert_eq!(cfg.account_export_path(), Path::new("out/accounts.csv"));
        assert_eq!(cfg.transfer_export_path(), Path::new("out/transfers.csv"));
    }
}

// 🚚 Pipeline Orchestrator - Chunked scan over one file or a directory
// Strictly sequential: one file at a time, one chunk at a time, lines in
// positional order. The bottleneck is disk I/O, not CPU.

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::RunConfig;
use crate::decoder::{decode_chunk, Encoding};
use crate::extractor::extract_entities;
use crate::records::{EmitContext, RecordEmitter};
use crate::splitter::{collapse_whitespace, split_lines};
use crate::window::context_windows;

/// Run-log checkpoint cadence, in chunks
const CHECKPOINT_EVERY: usize = 64;

// ============================================================================
// RUN LOG
// ============================================================================

/// RunLog - Plain-text progress log with one timestamped line per event
pub struct RunLog {
    file: File,
}

impl RunLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open run log: {}", path.display()))?;
        Ok(RunLog { file })
    }

    pub fn line(&mut self, message: &str) -> Result<()> {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        writeln!(self.file, "[{}] {}", stamp, message).context("Failed to write run log")?;
        Ok(())
    }
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Per-file scan state. The transfer-skipping FinalTail step is deliberate
/// observable behavior: the leftover tail is not guaranteed to hold a
/// complete multi-entity context, so only account candidates are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Streaming,
    FinalTail,
    Done,
}

/// PipelineStats - Totals across the whole run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub files_scanned: usize,
    pub chunks_read: usize,
    pub accounts_emitted: usize,
    pub transfers_emitted: usize,
}

// ============================================================================
// RUN
// ============================================================================

/// Scan every input file through the full pipeline, appending records to the
/// JSONL logs under `config.out_dir`.
pub fn run_scan(config: &RunConfig) -> Result<PipelineStats> {
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("Failed to create output dir: {}", config.out_dir.display()))?;

    let files = input_files(&config.input)?;
    if files.is_empty() {
        bail!("No input files found at {}", config.input.display());
    }

    let mut run_log = RunLog::open(&config.run_log_path())?;
    let mut emitter =
        RecordEmitter::open(&config.account_log_path(), &config.transfer_log_path())?;

    let mut stats = PipelineStats::default();

    for path in &files {
        let chunks = scan_file(path, config, &mut emitter, &mut run_log)?;
        stats.files_scanned += 1;
        stats.chunks_read += chunks;
    }

    stats.accounts_emitted = emitter.accounts_emitted;
    stats.transfers_emitted = emitter.transfers_emitted;

    run_log.line(&format!(
        "run complete: {} file(s), {} chunk(s), {} account record(s), {} transfer record(s)",
        stats.files_scanned, stats.chunks_read, stats.accounts_emitted, stats.transfers_emitted
    ))?;

    Ok(stats)
}

/// Resolve the input path to an ordered list of files. Directories are
/// listed one level deep, sorted by file name for reproducible ordering.
fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        bail!("Input path does not exist: {}", input.display());
    }

    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to list input dir: {}", input.display()))?
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// One complete Streaming → FinalTail → Done cycle for a single file.
/// Returns the number of chunks read.
fn scan_file(
    path: &Path,
    config: &RunConfig,
    emitter: &mut RecordEmitter,
    run_log: &mut RunLog,
) -> Result<usize> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;

    run_log.line(&format!("scan start: {}", source))?;

    let mut buffer = vec![0u8; config.chunk_size];
    let mut tail = String::new();
    let mut chunk_index = 0usize;
    let mut last_encoding = Encoding::Utf8;
    let mut state = ScanState::Streaming;

    while state != ScanState::Done {
        match state {
            ScanState::Streaming => {
                let n = file
                    .read(&mut buffer)
                    .with_context(|| format!("Failed to read chunk from {}", path.display()))?;

                if n == 0 {
                    state = ScanState::FinalTail;
                    continue;
                }

                let decoded = decode_chunk(&buffer[..n]);
                last_encoding = decoded.encoding;

                let outcome = split_lines(&tail, &decoded.text);
                tail = outcome.tail;

                let ctx = EmitContext {
                    source: &source,
                    encoding: decoded.encoding.label(),
                    chunk_index,
                };
                for context in context_windows(&outcome.lines, config.window_radius) {
                    let extraction = extract_entities(&context);
                    emitter.emit_window(&extraction, &context, ctx, true)?;
                }

                chunk_index += 1;
                if chunk_index % CHECKPOINT_EVERY == 0 {
                    run_log.line(&format!("checkpoint: {} chunks into {}", chunk_index, source))?;
                }
            }
            ScanState::FinalTail => {
                // Accounts only: no transfer inference on the leftover tail
                let leftover = collapse_whitespace(&tail);
                if !leftover.is_empty() {
                    let extraction = extract_entities(&leftover);
                    let ctx = EmitContext {
                        source: &source,
                        encoding: last_encoding.label(),
                        chunk_index,
                    };
                    emitter.emit_window(&extraction, &leftover, ctx, false)?;
                }
                state = ScanState::Done;
            }
            ScanState::Done => unreachable!(),
        }
    }

    run_log.line(&format!("scan end: {} ({} chunks)", source, chunk_index))?;

    Ok(chunk_index)
}

// ============================================================================
// TESTS
// ============================================================================

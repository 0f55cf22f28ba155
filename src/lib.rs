// Dump Harvester - Core Library
// Streaming entity extraction over partially-binary dump files

pub mod config;
pub mod decoder;
pub mod splitter;
pub mod window;
pub mod extractor;
pub mod records;
pub mod pipeline;
pub mod export;
pub mod staging;

// Re-export commonly used types
pub use config::{RunConfig, DEFAULT_CHUNK_SIZE};
pub use decoder::{decode_chunk, score_candidate, Decoded, Encoding};
pub use splitter::{collapse_whitespace, split_lines, SplitOutcome};
pub use window::{context_windows, DEFAULT_WINDOW_RADIUS};
pub use extractor::{extract_entities, normalize_amount, Extraction};
pub use records::{AccountRecord, EmitContext, RecordEmitter, TransferRecord};
pub use pipeline::{run_scan, PipelineStats, RunLog};
pub use export::{
    dedup_accounts, export_tables, read_account_log, read_transfer_log, ExportSummary,
};
pub use staging::{PersistReport, StagingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

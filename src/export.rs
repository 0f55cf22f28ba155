// 📊 Exporter - Flat tabular exports from the append logs
// Reads the full logs back into memory: fine for staging-sized runs, a
// known ceiling for very large record volumes (external merge would be the
// redesign if that ever bites)

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::RunConfig;
use crate::records::{AccountRecord, TransferRecord};

/// ExportSummary - Row counts of the two written tables
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub unique_accounts: usize,
    pub transfers: usize,
}

// ============================================================================
// LOG READ-BACK
// ============================================================================

/// Read the account log. A missing file is an empty log, not an error: a run
/// over a dump with no matches never creates it.
pub fn read_account_log(path: &Path) -> Result<Vec<AccountRecord>> {
    read_jsonl(path)
}

/// Read the transfer log (same missing-file rule).
pub fn read_transfer_log(path: &Path) -> Result<Vec<TransferRecord>> {
    read_jsonl(path)
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read log: {}", path.display()))?;

    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .with_context(|| format!("Malformed record in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

// ============================================================================
// DEDUPLICATION
// ============================================================================

/// Deduplicate account records by identifier: map-insert-overwrite, so the
/// most-recently-appended occurrence wins. Row order is first-seen order.
pub fn dedup_accounts(records: Vec<AccountRecord>) -> Vec<AccountRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<AccountRecord> = Vec::new();

    for record in records {
        match index.get(&record.account_id) {
            Some(&i) => rows[i] = record,
            None => {
                index.insert(record.account_id.clone(), rows.len());
                rows.push(record);
            }
        }
    }

    rows
}

// ============================================================================
// EXPORT
// ============================================================================

/// Read both logs and write the flat CSV tables: accounts deduplicated by
/// identifier, transfers as-is (never deduplicated).
pub fn export_tables(config: &RunConfig) -> Result<ExportSummary> {
    let accounts = dedup_accounts(read_account_log(&config.account_log_path())?);
    let transfers = read_transfer_log(&config.transfer_log_path())?;

    write_account_table(&config.account_export_path(), &accounts)?;
    write_transfer_table(&config.transfer_export_path(), &transfers)?;

    Ok(ExportSummary {
        unique_accounts: accounts.len(),
        transfers: transfers.len(),
    })
}

fn write_account_table(path: &Path, accounts: &[AccountRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create export: {}", path.display()))?;

    writer.write_record(["account_id", "bank_code", "discovered_at", "source", "encoding"])?;
    for account in accounts {
        let discovered_at = account.discovered_at.to_rfc3339();
        writer.write_record([
            account.account_id.as_str(),
            account.bank_code.as_deref().unwrap_or(""),
            discovered_at.as_str(),
            account.source.as_str(),
            account.encoding.as_str(),
        ])?;
    }
    writer.flush().context("Failed to flush account export")?;
    Ok(())
}

fn write_transfer_table(path: &Path, transfers: &[TransferRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create export: {}", path.display()))?;

    writer.write_record([
        "id",
        "from_account",
        "to_account",
        "amount",
        "currency",
        "timestamp",
        "status",
        "type",
        "source",
        "encoding",
    ])?;
    for transfer in transfers {
        let amount = format!("{:.2}", transfer.amount);
        writer.write_record([
            transfer.id.as_str(),
            transfer.from_account.as_str(),
            transfer.to_account.as_str(),
            amount.as_str(),
            transfer.currency.as_str(),
            transfer.timestamp.as_str(),
            transfer.status.as_str(),
            transfer.kind.as_str(),
            transfer.source.as_str(),
            transfer.encoding.as_str(),
        ])?;
    }
    writer.flush().context("Failed to flush transfer export")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn account(id: &str, source: &str) -> AccountRecord {
        AccountRecord {
            account_id: id.to_string(),
            bank_code: None,
            discovered_at: Utc::now(),
            source: source.to_string(),
            encoding: "utf-8".to_string(),
        }
    }

    #[test]
    fn test_dedup_last_occurrence_wins() {
        let rows = dedup_accounts(vec![
            account("ES9121000418450200051332", "first.bin"),
            account("ES9121000418450200051332", "second.bin"),
            account("ES9121000418450200051332", "third.bin"),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, "third.bin");
    }

    #[test]
    fn test_dedup_preserves_first_seen_row_order() {
        let rows = dedup_accounts(vec![
            account("DE89370400440532013000", "a.bin"),
            account("ES9121000418450200051332", "a.bin"),
            account("DE89370400440532013000", "b.bin"),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].account_id, "DE89370400440532013000");
        assert_eq!(rows[0].source, "b.bin");
        assert_eq!(rows[1].account_id, "ES9121000418450200051332");
    }

    #[test]
    fn test_missing_logs_export_empty_tables() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(PathBuf::from("unused"), dir.path().to_path_buf());
        let summary = export_tables(&config).unwrap();
        assert_eq!(summary.unique_accounts, 0);
        assert_eq!(summary.transfers, 0);

        let csv = std::fs::read_to_string(config.account_export_path()).unwrap();
        assert!(csv.starts_with("account_id,bank_code,discovered_at,source,encoding"));
    }

    #[test]
    fn test_export_from_appended_logs() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(PathBuf::from("unused"), dir.path().to_path_buf());

        let mut log = String::new();
        for source in ["a.bin", "b.bin", "c.bin"] {
            log.push_str(&serde_json::to_string(&account("ES9121000418450200051332", source)).unwrap());
            log.push('\n');
        }
        log.push_str(&serde_json::to_string(&account("DE89370400440532013000", "a.bin")).unwrap());
        log.push('\n');
        std::fs::write(config.account_log_path(), log).unwrap();

        let summary = export_tables(&config).unwrap();
        assert_eq!(summary.unique_accounts, 2);

        let csv = std::fs::read_to_string(config.account_export_path()).unwrap();
        let es_row: Vec<&str> = csv
            .lines()
            .filter(|l| l.starts_with("ES9121000418450200051332"))
            .collect();
        assert_eq!(es_row.len(), 1);
        assert!(es_row[0].contains("c.bin"));
    }

    #[test]
    fn test_transfers_are_not_deduplicated() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(PathBuf::from("unused"), dir.path().to_path_buf());

        let transfer = TransferRecord {
            id: "dump-0-abcd1234".to_string(),
            from_account: "ES9121000418450200051332".to_string(),
            to_account: "DE89370400440532013000".to_string(),
            amount: 1500.0,
            currency: "UNKNOWN".to_string(),
            description: "ctx".to_string(),
            timestamp: "2024-03-15".to_string(),
            status: "completed".to_string(),
            kind: "transfer".to_string(),
            source: "dump.bin".to_string(),
            encoding: "utf-8".to_string(),
        };
        let line = serde_json::to_string(&transfer).unwrap();
        std::fs::write(
            config.transfer_log_path(),
            format!("{}\n{}\n", line, line),
        )
        .unwrap();

        let summary = export_tables(&config).unwrap();
        assert_eq!(summary.transfers, 2);
    }
}

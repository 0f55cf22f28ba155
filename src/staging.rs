// 💾 Staging Persister - Conflict-safe upserts into the relational sink
// Optional stage: only runs when a staging database is configured. Re-running
// the pipeline over unchanged input adds no rows because every insert rides
// on a natural-key uniqueness constraint.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::records::{AccountRecord, TransferRecord};

// ============================================================================
// PERSIST REPORT
// ============================================================================

/// PersistReport - What happened, statement by statement
///
/// Failures are collected instead of aborting the remaining statements: the
/// upserts are idempotent, so skipping past a bad record and reporting it at
/// the end loses nothing.
#[derive(Debug, Clone, Default)]
pub struct PersistReport {
    pub accounts_inserted: usize,
    pub accounts_skipped: usize,
    pub transfers_inserted: usize,
    pub transfers_skipped: usize,
    pub errors: Vec<String>,
}

impl PersistReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ============================================================================
// STAGING STORE
// ============================================================================

/// StagingStore - SQLite sink for discovered entities, awaiting promotion
/// into the ledger by a separate downstream process.
pub struct StagingStore {
    conn: Connection,
}

impl StagingStore {
    /// Open (or create) the staging database at `path` and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open staging db: {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Wrap an existing connection (tests use an in-memory one).
    pub fn with_connection(conn: Connection) -> Result<Self> {
        setup_staging(&conn)?;
        Ok(StagingStore { conn })
    }

    /// Upsert every record, one statement at a time, never aborting on a
    /// failed statement. Strictly sequential, no batching.
    pub fn persist(
        &self,
        accounts: &[AccountRecord],
        transfers: &[TransferRecord],
    ) -> PersistReport {
        let mut report = PersistReport::default();

        for account in accounts {
            match self.upsert_account(account) {
                Ok(true) => report.accounts_inserted += 1,
                Ok(false) => report.accounts_skipped += 1,
                Err(e) => report
                    .errors
                    .push(format!("account {}: {}", account.account_id, e)),
            }
        }

        for transfer in transfers {
            match self.upsert_transfer(transfer) {
                Ok(true) => report.transfers_inserted += 1,
                Ok(false) => report.transfers_skipped += 1,
                Err(e) => report.errors.push(format!("transfer {}: {}", transfer.id, e)),
            }
        }

        report
    }

    /// Insert, do nothing on conflict with the `account_id` natural key.
    /// Returns whether a row was actually written.
    fn upsert_account(&self, account: &AccountRecord) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO staged_accounts
                (account_id, bank_code, discovered_at, source)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                account.account_id,
                account.bank_code,
                account.discovered_at.to_rfc3339(),
                account.source,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Insert, do nothing on conflict with the transfer `id`.
    fn upsert_transfer(&self, transfer: &TransferRecord) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO staged_transfers
                (id, from_account, to_account, amount, currency,
                 timestamp, status, type, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                transfer.id,
                transfer.from_account,
                transfer.to_account,
                transfer.amount,
                transfer.currency,
                transfer.timestamp,
                transfer.status,
                transfer.kind,
                transfer.source,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn account_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM staged_accounts", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn transfer_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM staged_transfers", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn setup_staging(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staged_accounts (
            account_id TEXT PRIMARY KEY,
            bank_code TEXT,
            discovered_at TEXT NOT NULL,
            source TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staged_transfers (
            id TEXT PRIMARY KEY,
            from_account TEXT NOT NULL,
            to_account TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            status TEXT NOT NULL,
            type TEXT NOT NULL,
            source TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

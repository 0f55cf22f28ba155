use anyhow::Result;
use std::env;

use dump_harvester::{
    export_tables, read_account_log, read_transfer_log, run_scan, RunConfig, StagingStore, VERSION,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("report") => run_report(&args[2..]),
        Some(_) => run_harvest(&args[1..]),
        None => {
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  dump-harvester <input> [--out DIR] [--chunk-size BYTES] [--window RADIUS] [--staging DB]");
    eprintln!("  dump-harvester report [--out DIR]");
}

/// Full run: scan → export → optional persistence, strictly in that order.
fn run_harvest(args: &[String]) -> Result<()> {
    let config = RunConfig::from_args(args)?;

    println!("🗂️  Dump Harvester v{} - Streaming Entity Extraction", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Scan
    println!("\n📂 Scanning {}...", config.input.display());
    let stats = run_scan(&config)?;
    println!(
        "✓ Scanned {} file(s) in {} chunk(s)",
        stats.files_scanned, stats.chunks_read
    );
    println!(
        "✓ Emitted {} account record(s), {} transfer record(s)",
        stats.accounts_emitted, stats.transfers_emitted
    );

    // 2. Export
    println!("\n📊 Exporting tables...");
    let summary = export_tables(&config)?;
    println!(
        "✓ Exported {} unique account(s) → {}",
        summary.unique_accounts,
        config.account_export_path().display()
    );
    println!(
        "✓ Exported {} transfer(s) → {}",
        summary.transfers,
        config.transfer_export_path().display()
    );

    // 3. Persist (only when a staging db is configured)
    if let Some(db_path) = &config.staging_db {
        println!("\n💾 Persisting to staging store...");
        let store = StagingStore::open(db_path)?;
        let accounts =
            dump_harvester::dedup_accounts(read_account_log(&config.account_log_path())?);
        let transfers = read_transfer_log(&config.transfer_log_path())?;
        let report = store.persist(&accounts, &transfers);

        println!(
            "✓ Accounts: {} inserted, {} already staged",
            report.accounts_inserted, report.accounts_skipped
        );
        println!(
            "✓ Transfers: {} inserted, {} already staged",
            report.transfers_inserted, report.transfers_skipped
        );

        if report.has_errors() {
            eprintln!("⚠️  {} statement(s) failed:", report.errors.len());
            for error in &report.errors {
                eprintln!("   {}", error);
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Harvest complete");

    Ok(())
}

/// Summary statistics from an existing output directory.
fn run_report(args: &[String]) -> Result<()> {
    let mut out_dir = std::path::PathBuf::from("harvest_out");
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--out" {
            i += 1;
            if let Some(v) = args.get(i) {
                out_dir = std::path::PathBuf::from(v);
            }
        }
        i += 1;
    }

    let config = RunConfig::new(out_dir.clone(), out_dir);
    let accounts = read_account_log(&config.account_log_path())?;
    let transfers = read_transfer_log(&config.transfer_log_path())?;
    let unique = dump_harvester::dedup_accounts(accounts.clone());

    println!("📈 Harvest Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Account records appended: {}", accounts.len());
    println!("Unique accounts:          {}", unique.len());
    println!("Transfer records:         {}", transfers.len());

    // Per-source breakdown
    let mut by_source: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for account in &accounts {
        *by_source.entry(account.source.clone()).or_insert(0) += 1;
    }
    if !by_source.is_empty() {
        println!("\nBy source file:");
        for (source, count) in by_source {
            println!("  {:<40} {}", source, count);
        }
    }

    Ok(())
}

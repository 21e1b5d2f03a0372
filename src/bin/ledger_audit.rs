use std::path::PathBuf;

use anyhow::bail;

use gpicks::config::AppConfig;
use gpicks::ledger::Ledger;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| AppConfig::from_env().ledger_path);
    if !path.exists() {
        bail!("no ledger at {}", path.display());
    }

    let ledger = Ledger::open(&path);
    let summary = ledger.summary();
    println!("{}: {} entries", path.display(), ledger.entries().len());
    println!(
        "balance {:.2} (start {:.2}, roi {:+.1}%), {} bets, {} open",
        summary.current_balance, summary.starting_balance, summary.roi, summary.total_bets, summary.open_bets
    );

    let issues = ledger.verify();
    if issues.is_empty() {
        println!("ok");
        return Ok(());
    }
    for issue in &issues {
        println!("entry {}: {}", issue.index, issue.message);
    }
    bail!("{} ledger issue(s)", issues.len())
}

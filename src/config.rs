use std::env;
use std::path::PathBuf;

use crate::kelly::{DEFAULT_KELLY_FRACTION, DEFAULT_MAX_STAKE_PCT};
use crate::slip::DEFAULT_MAX_POOL;

const DATA_DIR: &str = "gpicks";
const LEDGER_FILE: &str = "ledger.json";
pub const DEFAULT_TOP_PICKS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub ledger_path: PathBuf,
    pub params_path: Option<PathBuf>,
    pub max_pool: usize,
    pub top_picks: usize,
    pub kelly_fraction: f64,
    pub max_stake_pct: f64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank or unparseable values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let ledger_path = get("GPICKS_LEDGER")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_ledger_path(&get));
        let params_path = get("GPICKS_PARAMS").map(PathBuf::from);
        let max_pool = get("GPICKS_MAX_POOL")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|v| *v >= 2)
            .unwrap_or(DEFAULT_MAX_POOL);
        let top_picks = get("GPICKS_TOP_PICKS")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TOP_PICKS);
        let kelly_fraction = get("GPICKS_KELLY_FRACTION")
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|v| *v > 0.0 && *v <= 1.0)
            .unwrap_or(DEFAULT_KELLY_FRACTION);
        let max_stake_pct = get("GPICKS_MAX_STAKE_PCT")
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|v| *v > 0.0 && *v <= 1.0)
            .unwrap_or(DEFAULT_MAX_STAKE_PCT);
        Self {
            ledger_path,
            params_path,
            max_pool,
            top_picks,
            kelly_fraction,
            max_stake_pct,
        }
    }
}

fn default_ledger_path(get: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    // Prefer XDG data dir.
    if let Some(base) = get("XDG_DATA_HOME") {
        return PathBuf::from(base).join(DATA_DIR).join(LEDGER_FILE);
    }
    match get("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(DATA_DIR)
            .join(LEDGER_FILE),
        None => PathBuf::from(LEDGER_FILE),
    }
}

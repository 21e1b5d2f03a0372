use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GpicksError, Result};

const INITIAL_SLIP_ID: &str = "INITIAL";
const BALANCE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Initialize,
    Bet,
    Win,
    Loss,
    Push,
}

impl Action {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "initialize" => Ok(Action::Initialize),
            "bet" => Ok(Action::Bet),
            "win" => Ok(Action::Win),
            "loss" => Ok(Action::Loss),
            "push" => Ok(Action::Push),
            _ => Err(GpicksError::InvalidAction(raw.to_string())),
        }
    }

    /// Result actions parsed from user input; rejects bet/initialize.
    pub fn parse_result(raw: &str) -> Result<Self> {
        match Action::parse(raw)? {
            a if a.is_result() => Ok(a),
            _ => Err(GpicksError::InvalidAction(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Initialize => "initialize",
            Action::Bet => "bet",
            Action::Win => "win",
            Action::Loss => "loss",
            Action::Push => "push",
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Action::Win | Action::Loss | Action::Push)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollEntry {
    pub timestamp: DateTime<Local>,
    pub slip_id: String,
    pub action: Action,
    pub amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    #[serde(default)]
    pub game_script: Option<String>,
    #[serde(default)]
    pub stack_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Optional tags recorded with a bet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetTags {
    pub game_script: Option<String>,
    pub stack_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    current_balance: f64,
    ledger: Vec<BankrollEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub current_balance: f64,
    pub starting_balance: f64,
    pub profit: f64,
    pub total_staked: f64,
    pub total_returned: f64,
    pub total_bets: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub open_bets: usize,
    pub win_rate: f64,
    pub roi: f64,
}

/// AND of the filters that are set. `date_from` is inclusive, `date_to`
/// exclusive.
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    pub game_script: Option<String>,
    pub stack_type: Option<String>,
    pub date_from: Option<DateTime<Local>>,
    pub date_to: Option<DateTime<Local>>,
}

impl LedgerQuery {
    pub fn matches(&self, e: &BankrollEntry) -> bool {
        if let Some(script) = &self.game_script
            && e.game_script.as_deref() != Some(script.as_str())
        {
            return false;
        }
        if let Some(stack) = &self.stack_type
            && e.stack_type.as_deref() != Some(stack.as_str())
        {
            return false;
        }
        if self.date_from.is_some_and(|from| e.timestamp < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| e.timestamp >= to) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Script,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRoi {
    pub key: String,
    pub bets: usize,
    pub graded: usize,
    pub staked: f64,
    pub returned: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerIssue {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlipState {
    Open,
    Graded,
}

/// Append-only bankroll ledger persisted as JSON.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<BankrollEntry>,
    current_balance: f64,
    /// `current_balance` stored in the file when it disagreed with the chain.
    stored_balance: Option<f64>,
}

impl Ledger {
    /// Loads the ledger at `path`. A missing file is an empty ledger; an
    /// unreadable or malformed one is treated the same and logged.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut ledger = Self {
            path,
            entries: Vec::new(),
            current_balance: 0.0,
            stored_balance: None,
        };
        match fs::read_to_string(&ledger.path) {
            Ok(raw) => match serde_json::from_str::<LedgerFile>(&raw) {
                Ok(file) => {
                    ledger.entries = file.ledger;
                    ledger.current_balance = ledger.entries.last().map(|e| e.balance_after).unwrap_or(0.0);
                    if (file.current_balance - ledger.current_balance).abs() > BALANCE_EPSILON {
                        warn!(
                            path = %ledger.path.display(),
                            stored = file.current_balance,
                            chain = ledger.current_balance,
                            "ledger balance disagrees with its last entry; using the entry"
                        );
                        ledger.stored_balance = Some(file.current_balance);
                    }
                    debug!(path = %ledger.path.display(), entries = ledger.entries.len(), "loaded ledger");
                }
                Err(err) => {
                    warn!(path = %ledger.path.display(), error = %err, "could not parse ledger; starting empty");
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %ledger.path.display(), error = %err, "could not read ledger; starting empty");
            }
        }
        ledger
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[BankrollEntry] {
        &self.entries
    }

    pub fn current_balance(&self) -> f64 {
        self.current_balance
    }

    pub fn is_initialized(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn initialize(&mut self, amount: f64) -> Result<&BankrollEntry> {
        if self.is_initialized() {
            return Err(GpicksError::AlreadyInitialized {
                entries: self.entries.len(),
            });
        }
        check_amount("starting amount", amount, false)?;
        let entry = BankrollEntry {
            timestamp: Local::now(),
            slip_id: INITIAL_SLIP_ID.to_string(),
            action: Action::Initialize,
            amount,
            balance_before: 0.0,
            balance_after: amount,
            game_script: None,
            stack_type: None,
            notes: Some("Initial bankroll setup".to_string()),
        };
        self.append(entry)
    }

    pub fn log_bet(&mut self, slip_id: &str, stake: f64, tags: BetTags) -> Result<&BankrollEntry> {
        if !self.is_initialized() {
            return Err(GpicksError::NotInitialized);
        }
        check_amount("stake", stake, false)?;
        if stake > self.current_balance {
            return Err(GpicksError::InsufficientBankroll {
                stake,
                balance: self.current_balance,
            });
        }
        let entry = BankrollEntry {
            timestamp: Local::now(),
            slip_id: slip_id.to_string(),
            action: Action::Bet,
            amount: -stake,
            balance_before: self.current_balance,
            balance_after: self.current_balance - stake,
            game_script: tags.game_script,
            stack_type: tags.stack_type,
            notes: tags.notes,
        };
        self.append(entry)
    }

    /// Grades the open bet for `slip_id`. `payout` is the gross amount
    /// credited back (0 for a loss, the stake for a push).
    pub fn log_result(
        &mut self,
        slip_id: &str,
        result: Action,
        payout: f64,
        notes: Option<String>,
    ) -> Result<&BankrollEntry> {
        if !result.is_result() {
            return Err(GpicksError::InvalidAction(result.as_str().to_string()));
        }
        check_amount("payout", payout, true)?;
        match self.slip_states().get(slip_id).copied() {
            None => return Err(GpicksError::NoOpenBet(slip_id.to_string())),
            Some(SlipState::Graded) => return Err(GpicksError::AlreadyGraded(slip_id.to_string())),
            Some(SlipState::Open) => {}
        }
        let entry = BankrollEntry {
            timestamp: Local::now(),
            slip_id: slip_id.to_string(),
            action: result,
            amount: payout,
            balance_before: self.current_balance,
            balance_after: self.current_balance + payout,
            game_script: None,
            stack_type: None,
            notes,
        };
        self.append(entry)
    }

    fn append(&mut self, entry: BankrollEntry) -> Result<&BankrollEntry> {
        let previous_balance = self.current_balance;
        self.current_balance = entry.balance_after;
        self.entries.push(entry);
        if let Err(err) = self.save() {
            self.entries.pop();
            self.current_balance = previous_balance;
            return Err(GpicksError::Persist(err));
        }
        self.stored_balance = None;
        let last = self.entries.len() - 1;
        debug!(
            slip = %self.entries[last].slip_id,
            action = %self.entries[last].action,
            balance = self.current_balance,
            "ledger entry appended"
        );
        Ok(&self.entries[last])
    }

    /// Writes `<path>.tmp` then renames it over the ledger file.
    fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let file = LedgerFile {
            current_balance: self.current_balance,
            ledger: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("serialize ledger")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("rename into {}", self.path.display()))?;
        Ok(())
    }

    fn slip_states(&self) -> HashMap<&str, SlipState> {
        let mut states = HashMap::new();
        for e in &self.entries {
            match e.action {
                Action::Bet => {
                    states.insert(e.slip_id.as_str(), SlipState::Open);
                }
                a if a.is_result() => {
                    states.insert(e.slip_id.as_str(), SlipState::Graded);
                }
                _ => {}
            }
        }
        states
    }

    /// Stake of the ungraded bet on `slip_id`.
    pub fn open_stake(&self, slip_id: &str) -> Option<f64> {
        if self.slip_states().get(slip_id) != Some(&SlipState::Open) {
            return None;
        }
        self.entries
            .iter()
            .rev()
            .find(|e| e.action == Action::Bet && e.slip_id == slip_id)
            .map(|e| -e.amount)
    }

    pub fn open_bets(&self) -> Vec<&str> {
        let mut open = self
            .slip_states()
            .into_iter()
            .filter(|(_, s)| *s == SlipState::Open)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        open.sort_unstable();
        open
    }

    pub fn summary(&self) -> LedgerSummary {
        if self.entries.is_empty() {
            return LedgerSummary::default();
        }
        let count = |a: Action| self.entries.iter().filter(|e| e.action == a).count();
        let sum = |pred: fn(Action) -> bool| {
            self.entries
                .iter()
                .filter(|e| pred(e.action))
                .map(|e| e.amount.abs())
                .sum::<f64>()
        };
        let total_bets = count(Action::Bet);
        let wins = count(Action::Win);
        let starting_balance = match self.entries.first() {
            Some(e) if e.action == Action::Initialize => e.balance_after,
            _ => 0.0,
        };
        LedgerSummary {
            current_balance: self.current_balance,
            starting_balance,
            profit: self.current_balance - starting_balance,
            total_staked: sum(|a| a == Action::Bet),
            total_returned: sum(|a| a.is_result()),
            total_bets,
            wins,
            losses: count(Action::Loss),
            pushes: count(Action::Push),
            open_bets: self.open_bets().len(),
            win_rate: if total_bets > 0 {
                wins as f64 / total_bets as f64 * 100.0
            } else {
                0.0
            },
            roi: if starting_balance > 0.0 {
                (self.current_balance - starting_balance) / starting_balance * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn query(&self, q: &LedgerQuery) -> Vec<&BankrollEntry> {
        self.entries.iter().filter(|e| q.matches(e)).collect()
    }

    /// Per-tag ROI. Results carry no tags themselves, so each one inherits
    /// the tags of the bet it grades. Untagged bets group under "untagged".
    pub fn roi_by(&self, group: GroupBy) -> Vec<GroupRoi> {
        let mut open_key: HashMap<&str, String> = HashMap::new();
        let mut groups: BTreeMap<String, GroupRoi> = BTreeMap::new();
        for e in &self.entries {
            match e.action {
                Action::Bet => {
                    let tag = match group {
                        GroupBy::Script => e.game_script.as_deref(),
                        GroupBy::Stack => e.stack_type.as_deref(),
                    };
                    let key = tag.unwrap_or("untagged").to_string();
                    let g = groups.entry(key.clone()).or_insert_with(|| GroupRoi {
                        key: key.clone(),
                        bets: 0,
                        graded: 0,
                        staked: 0.0,
                        returned: 0.0,
                        roi: 0.0,
                    });
                    g.bets += 1;
                    g.staked += -e.amount;
                    open_key.insert(e.slip_id.as_str(), key);
                }
                a if a.is_result() => {
                    if let Some(key) = open_key.remove(e.slip_id.as_str())
                        && let Some(g) = groups.get_mut(&key)
                    {
                        g.graded += 1;
                        g.returned += e.amount;
                    }
                }
                _ => {}
            }
        }
        groups
            .into_values()
            .map(|mut g| {
                if g.staked > 0.0 {
                    g.roi = (g.returned - g.staked) / g.staked * 100.0;
                }
                g
            })
            .collect()
    }

    /// Chain and state-machine checks over the loaded entries. Empty when the
    /// ledger is consistent.
    pub fn verify(&self) -> Vec<LedgerIssue> {
        let mut issues = Vec::new();
        let mut push = |index: usize, message: String| issues.push(LedgerIssue { index, message });
        let mut states: HashMap<&str, SlipState> = HashMap::new();

        for (i, e) in self.entries.iter().enumerate() {
            if (e.balance_before + e.amount - e.balance_after).abs() > BALANCE_EPSILON {
                push(
                    i,
                    format!(
                        "balance_after {} != balance_before {} + amount {}",
                        e.balance_after, e.balance_before, e.amount
                    ),
                );
            }
            if i == 0 {
                if e.action != Action::Initialize {
                    push(i, format!("first entry is {}, expected initialize", e.action));
                }
                if e.balance_before.abs() > BALANCE_EPSILON {
                    push(i, format!("opening balance_before is {}", e.balance_before));
                }
            } else {
                let prev = &self.entries[i - 1];
                if (prev.balance_after - e.balance_before).abs() > BALANCE_EPSILON {
                    push(
                        i,
                        format!(
                            "balance_before {} does not continue previous balance_after {}",
                            e.balance_before, prev.balance_after
                        ),
                    );
                }
                if e.action == Action::Initialize {
                    push(i, "initialize after the first entry".to_string());
                }
            }
            match e.action {
                Action::Bet => {
                    if e.amount > 0.0 {
                        push(i, format!("bet amount {} is positive", e.amount));
                    }
                    if e.balance_after < -BALANCE_EPSILON {
                        push(i, format!("bet overdraws the bankroll to {}", e.balance_after));
                    }
                    states.insert(e.slip_id.as_str(), SlipState::Open);
                }
                a if a.is_result() => {
                    if e.amount < 0.0 {
                        push(i, format!("{} payout {} is negative", a, e.amount));
                    }
                    match states.get(e.slip_id.as_str()).copied() {
                        Some(SlipState::Open) => {
                            states.insert(e.slip_id.as_str(), SlipState::Graded);
                        }
                        Some(SlipState::Graded) => {
                            push(i, format!("slip {} graded twice", e.slip_id));
                        }
                        None => push(i, format!("slip {} graded without a bet", e.slip_id)),
                    }
                }
                _ => {}
            }
        }

        if let Some(stored) = self.stored_balance {
            push(
                self.entries.len(),
                format!(
                    "stored current_balance {} != last balance_after {}",
                    stored, self.current_balance
                ),
            );
        }
        issues
    }

    pub fn export_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
        for e in &self.entries {
            wtr.serialize(CsvRow::from(e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    slip_id: &'a str,
    action: &'static str,
    amount: f64,
    balance_before: f64,
    balance_after: f64,
    game_script: &'a str,
    stack_type: &'a str,
    notes: &'a str,
}

impl<'a> From<&'a BankrollEntry> for CsvRow<'a> {
    fn from(e: &'a BankrollEntry) -> Self {
        Self {
            timestamp: e.timestamp.to_rfc3339(),
            slip_id: &e.slip_id,
            action: e.action.as_str(),
            amount: e.amount,
            balance_before: e.balance_before,
            balance_after: e.balance_after,
            game_script: e.game_script.as_deref().unwrap_or(""),
            stack_type: e.stack_type.as_deref().unwrap_or(""),
            notes: e.notes.as_deref().unwrap_or(""),
        }
    }
}

fn check_amount(field: &'static str, value: f64, allow_zero: bool) -> Result<()> {
    let ok = value.is_finite() && if allow_zero { value >= 0.0 } else { value > 0.0 };
    if ok {
        Ok(())
    } else {
        Err(GpicksError::InvalidAmount { field, value })
    }
}

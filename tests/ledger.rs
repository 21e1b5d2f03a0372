use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;

use gpicks::GpicksError;
use gpicks::kelly::{DEFAULT_KELLY_FRACTION, DEFAULT_MAX_STAKE_PCT, kelly_stake};
use gpicks::Direction;
use gpicks::ledger::{Action, BetTags, GroupBy, Ledger};
use gpicks::slip::{SettleLeg, settle};

fn ledger_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gpicks-it-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir.join("nested").join("ledger.json")
}

fn bet_tags(script: &str) -> BetTags {
    BetTags {
        game_script: Some(script.to_string()),
        stack_type: Some("qb_wr".to_string()),
        notes: None,
    }
}

#[test]
fn documented_win_scenario() {
    let mut ledger = Ledger::open(ledger_path("scenario"));
    ledger.initialize(1000.0).unwrap();
    ledger.log_bet("SLIP-1", 50.0, BetTags::default()).unwrap();
    ledger.log_result("SLIP-1", Action::Win, 95.0, None).unwrap();
    assert_relative_eq!(ledger.current_balance(), 1045.0);
    assert_eq!(ledger.entries().len(), 3);
}

#[test]
fn balance_chain_holds_over_a_season() {
    let path = ledger_path("season");
    let mut ledger = Ledger::open(&path);
    ledger.initialize(500.0).unwrap();

    let outcomes = [
        (Action::Win, 2.6),
        (Action::Loss, 0.0),
        (Action::Push, 1.0),
        (Action::Loss, 0.0),
        (Action::Win, 3.1),
        (Action::Loss, 0.0),
    ];
    for (i, (action, multiple)) in outcomes.iter().enumerate() {
        let slip = format!("S{i}");
        let k = kelly_stake(
            0.45,
            2.6,
            ledger.current_balance(),
            DEFAULT_KELLY_FRACTION,
            DEFAULT_MAX_STAKE_PCT,
        );
        assert!(k.stake > 0.0);
        assert!(k.stake <= ledger.current_balance() * DEFAULT_MAX_STAKE_PCT + 1e-9);
        let script = if i % 2 == 0 { "shootout" } else { "control" };
        ledger.log_bet(&slip, k.stake, bet_tags(script)).unwrap();
        ledger.log_result(&slip, *action, k.stake * multiple, None).unwrap();
    }

    let entries = ledger.entries();
    for pair in entries.windows(2) {
        assert_relative_eq!(pair[1].balance_before, pair[0].balance_after);
    }
    for e in entries {
        assert_relative_eq!(e.balance_after, e.balance_before + e.amount, epsilon = 1e-9);
    }
    assert_relative_eq!(
        ledger.current_balance(),
        entries.last().unwrap().balance_after
    );
    assert!(ledger.verify().is_empty());

    let summary = ledger.summary();
    assert_eq!(summary.total_bets, 6);
    assert_eq!((summary.wins, summary.losses, summary.pushes), (2, 3, 1));
    assert_relative_eq!(summary.win_rate, 100.0 * 2.0 / 6.0, epsilon = 1e-9);
    assert_relative_eq!(summary.profit, ledger.current_balance() - 500.0, epsilon = 1e-9);

    let by_script = ledger.roi_by(GroupBy::Script);
    let keys = by_script.iter().map(|g| g.key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["control", "shootout"]);
    let staked: f64 = by_script.iter().map(|g| g.staked).sum();
    assert_relative_eq!(staked, summary.total_staked, epsilon = 1e-9);

    let reloaded = Ledger::open(&path);
    assert_eq!(reloaded.entries().len(), entries.len());
    for (a, b) in reloaded.entries().iter().zip(entries) {
        assert_eq!(a.slip_id, b.slip_id);
        assert_eq!(a.action, b.action);
        assert_eq!(a.timestamp, b.timestamp);
        assert_relative_eq!(a.balance_after, b.balance_after, epsilon = 1e-9);
    }
    assert_relative_eq!(reloaded.current_balance(), ledger.current_balance(), epsilon = 1e-9);
    assert!(reloaded.verify().is_empty());
}

#[test]
fn each_slip_is_graded_once() {
    let mut ledger = Ledger::open(ledger_path("graded"));
    ledger.initialize(100.0).unwrap();
    ledger.log_bet("A", 10.0, BetTags::default()).unwrap();
    ledger.log_result("A", Action::Loss, 0.0, None).unwrap();
    let err = ledger.log_result("A", Action::Win, 30.0, None).unwrap_err();
    assert!(matches!(err, GpicksError::AlreadyGraded(ref id) if id == "A"));
    assert!(err.is_validation());
    assert!(matches!(
        ledger.log_result("B", Action::Win, 30.0, None),
        Err(GpicksError::NoOpenBet(_))
    ));
    assert_relative_eq!(ledger.current_balance(), 90.0);
}

#[test]
fn unreadable_ledger_starts_over() {
    let path = ledger_path("garbage");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"current_balance": "lots", "ledger": 3}"#).unwrap();
    let mut ledger = Ledger::open(&path);
    assert!(!ledger.is_initialized());
    ledger.initialize(250.0).unwrap();
    assert_relative_eq!(Ledger::open(&path).current_balance(), 250.0);
}

#[test]
fn result_names_parse() {
    assert_eq!(Action::parse_result("WIN").unwrap(), Action::Win);
    assert_eq!(Action::parse_result(" push ").unwrap(), Action::Push);
    assert!(matches!(
        Action::parse_result("bet"),
        Err(GpicksError::InvalidAction(_))
    ));
    assert!(Action::parse("jackpot").is_err());
}

#[test]
fn settled_slip_feeds_the_ledger() {
    let mut ledger = Ledger::open(ledger_path("settle"));
    ledger.initialize(200.0).unwrap();
    ledger.log_bet("PARLAY", 10.0, bet_tags("shootout")).unwrap();
    let stake = ledger.open_stake("PARLAY").unwrap();

    let legs = [
        SettleLeg { line: 275.5, direction: Direction::Over, actual: Some(301.0) },
        SettleLeg { line: 4.5, direction: Direction::Over, actual: Some(6.0) },
        SettleLeg { line: 48.5, direction: Direction::Under, actual: Some(31.0) },
    ];
    let settled = settle(&legs, stake, 6.0).unwrap();
    let action = settled.action().unwrap();
    assert_eq!(action, Action::Win);
    ledger.log_result("PARLAY", action, settled.payout, None).unwrap();

    assert_relative_eq!(ledger.current_balance(), 250.0);
    assert_eq!(ledger.open_stake("PARLAY"), None);
    assert!(ledger.verify().is_empty());
}

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_relative_eq;

use gpicks::params::SigmaRule;
use gpicks::picks_csv::load_picks;
use gpicks::{Direction, EvScorer, Pick, RoleArchetype, RoleTag, ScoringParams, StatType};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn fixture_picks() -> Vec<Pick> {
    load_picks(&fixture_path("picks.csv")).expect("fixture should parse")
}

#[test]
fn fixture_loads_every_row() {
    let picks = fixture_picks();
    assert_eq!(picks.len(), 8);
    assert_eq!(picks[0].player, "Josh Allen");
    assert_eq!(picks[0].role_archetype, RoleArchetype::Qb);
    assert_eq!(picks[3].script_hint, "BUF_control");
    assert_eq!(picks[7].stat_type, StatType::RushRecYards);
}

#[test]
fn passing_yards_pick_scores_as_documented() {
    let scored = EvScorer::default().score_all(fixture_picks()).unwrap();
    let allen = &scored[0];
    assert_eq!(allen.id(), "1");
    assert_relative_eq!(allen.score.sigma, 54.549, epsilon = 1e-3);
    assert_eq!(allen.score.direction, Direction::Over);
    assert_relative_eq!(allen.score.win_probability, 0.673, epsilon = 2e-3);
    assert_relative_eq!(allen.score.ev_percent, 8.89, epsilon = 1e-2);
    assert_eq!(allen.score.role_tag, RoleTag::Correlation);
}

#[test]
fn under_pick_is_low_variance() {
    let scored = EvScorer::default().score_all(fixture_picks()).unwrap();
    let mostert = scored.iter().find(|p| p.id() == "6").unwrap();
    assert_eq!(mostert.score.direction, Direction::Under);
    assert!(mostert.score.ev_percent < 0.0);
    assert!(mostert.score.win_probability > 0.6);
    assert_eq!(mostert.score.role_tag, RoleTag::LowVariance);
}

#[test]
fn every_fixture_score_is_in_range() {
    for p in EvScorer::default().score_all(fixture_picks()).unwrap() {
        assert!(p.score.sigma > 0.0, "{}", p.id());
        assert!(p.score.win_probability > 0.0 && p.score.win_probability < 1.0);
        assert!(p.score.win_probability >= 0.5, "direction follows the projection");
        assert!(p.score.ev_percent.abs() <= 60.0);
    }
}

#[test]
fn tuning_file_changes_scores() {
    let dir = std::env::temp_dir().join(format!("gpicks-scoring-{}", std::process::id()));
    let path = dir.join("params.json");
    let tight = ScoringParams::defaults().with_sigma_rule(
        "passing_yards",
        SigmaRule {
            pct_of_line: 0.10,
            absolute_floor: 5.0,
        },
    );
    tight.save(&path).unwrap();

    let loaded = ScoringParams::load(&path).unwrap();
    assert_eq!(
        loaded.sigma_rule("passing_yards"),
        SigmaRule {
            pct_of_line: 0.10,
            absolute_floor: 5.0,
        }
    );
    assert_eq!(
        loaded.correlation_prior("passing_yards", "receiving_yards", "shootout"),
        Some(0.45)
    );

    let allen = fixture_picks().remove(0);
    let reference = EvScorer::default().evaluate(&allen);
    let tuned = EvScorer::new(Arc::new(loaded)).evaluate(&allen);
    assert!(tuned.sigma < reference.sigma);
    assert!(tuned.win_probability > reference.win_probability);
    assert_eq!(tuned.ev_percent, reference.ev_percent);

    fs::write(&path, "not json").unwrap();
    let fallback = ScoringParams::load_or_reference(Some(&path));
    assert_eq!(&fallback, ScoringParams::reference());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_pick_file_is_an_error() {
    let err = load_picks(&fixture_path("does_not_exist.csv")).unwrap_err();
    assert!(format!("{err:#}").contains("does_not_exist.csv"));
}

use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_relative_eq;

use gpicks::correlation::{
    CorrelationKind, ScriptContext, best_partners, empirical_pair_correlation, game_script_priors,
    lineup_correlation_matrix,
};
use gpicks::picks_csv::load_picks;
use gpicks::{GameScript, Pick, ScoringParams};

fn fixture_picks() -> Vec<Pick> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("picks.csv");
    load_picks(&path).expect("fixture should parse")
}

#[test]
fn matrix_is_symmetric_with_unit_diagonal() {
    let picks = fixture_picks();
    let params = Arc::new(ScoringParams::default());
    for kind in [CorrelationKind::Priors, CorrelationKind::Position] {
        let model = kind.build(params.clone());
        let ctx = ScriptContext::new("shootout").with_total_line(53.0);
        let m = lineup_correlation_matrix(model.as_ref(), &picks, &ctx);
        assert_eq!(m.len(), picks.len());
        for i in 0..m.len() {
            assert_eq!(m[i][i], 1.0);
            for j in 0..m.len() {
                assert_eq!(m[i][j], m[j][i]);
                assert!(m[i][j] >= -1.0 && m[i][j] <= 1.0);
            }
        }
    }
}

#[test]
fn quarterback_partners_prefer_his_own_receivers() {
    let picks = fixture_picks();
    let model = CorrelationKind::Position.build(Arc::new(ScoringParams::default()));
    let ctx = ScriptContext::new("shootout");
    let partners = best_partners(model.as_ref(), &picks[0], &picks, &ctx, 3);
    assert_eq!(partners.len(), 3);
    assert_eq!(partners[0].pick_id, "2");
    assert!(partners.iter().all(|p| p.pick_id != "1"));
    for pair in partners.windows(2) {
        assert!(pair[0].correlation >= pair[1].correlation);
    }
    assert_relative_eq!(partners[0].ev_boost, partners[0].correlation * 0.1, epsilon = 1e-12);
}

#[test]
fn script_priors_track_the_betting_line() {
    for (pace_a, pace_b, spread, total) in [
        (65.0, 65.0, -3.0, 45.0),
        (70.0, 71.0, -2.5, 54.5),
        (60.0, 61.0, 10.0, 38.5),
    ] {
        let p = game_script_priors(pace_a, pace_b, spread, total);
        let sum: f64 = GameScript::ALL.iter().map(|s| p.get(*s)).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
    }
    let high = game_script_priors(70.0, 71.0, -2.5, 54.5);
    assert_eq!(high.most_likely(), GameScript::Shootout);
    let low = game_script_priors(60.0, 61.0, -1.0, 38.5);
    assert_eq!(low.most_likely(), GameScript::Control);
    let lopsided = game_script_priors(65.0, 65.0, -13.5, 45.0);
    assert!(lopsided.blowout > game_script_priors(65.0, 65.0, -3.0, 45.0).blowout);
}

#[test]
fn empirical_correlation_from_history() {
    let targets = [6.0, 8.0, 5.0, 9.0, 7.0, 10.0];
    let yards = [55.0, 80.0, 40.0, 95.0, 66.0, 101.0];
    let pc = empirical_pair_correlation(&targets, &yards);
    assert!(pc.correlation > 0.9);
    assert_eq!(pc.sample_size, 6);
}

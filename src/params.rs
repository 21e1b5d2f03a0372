use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pick::{GameScript, Position};

pub const DEFAULT_SIGMA_RULE: SigmaRule = SigmaRule {
    pct_of_line: 0.30,
    absolute_floor: 10.0,
};
pub const DEFAULT_ARCHETYPE_VOLATILITY: f64 = 1.1;

static REFERENCE: Lazy<ScoringParams> = Lazy::new(ScoringParams::defaults);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaRule {
    pub pct_of_line: f64,
    pub absolute_floor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPrior {
    pub stat_a: String,
    pub stat_b: String,
    pub script: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleThresholds {
    pub anchor_min_ev: f64,
    pub anchor_min_prob: f64,
    pub low_variance_min_prob: f64,
}

impl Default for RoleThresholds {
    fn default() -> Self {
        Self {
            anchor_min_ev: 12.0,
            anchor_min_prob: 0.62,
            low_variance_min_prob: 0.58,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeRule {
    pub min_coverage: usize,
    pub min_corr_sum: f64,
    pub min_avg_prob: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub a: GradeRule,
    pub b: GradeRule,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: GradeRule {
                min_coverage: 3,
                min_corr_sum: 0.35,
                min_avg_prob: 0.63,
            },
            b: GradeRule {
                min_coverage: 2,
                min_corr_sum: 0.20,
                min_avg_prob: 0.60,
            },
        }
    }
}

/// On-disk shape of a tuning file. Correlation priors are a list because JSON
/// object keys cannot be tuples.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParamsFile {
    sigma_rules: HashMap<String, SigmaRule>,
    archetype_volatility: HashMap<String, f64>,
    correlation_priors: Vec<CorrelationPrior>,
    position_correlations: HashMap<Position, HashMap<Position, f64>>,
    script_multipliers: HashMap<GameScript, HashMap<Position, f64>>,
    #[serde(default)]
    role_thresholds: RoleThresholds,
    #[serde(default)]
    grade_thresholds: GradeThresholds,
}

/// Immutable tuning constants injected into the scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParamsFile", into = "ParamsFile")]
pub struct ScoringParams {
    sigma_rules: HashMap<String, SigmaRule>,
    archetype_volatility: HashMap<String, f64>,
    correlation_priors: HashMap<(String, String, String), f64>,
    position_correlations: HashMap<Position, HashMap<Position, f64>>,
    script_multipliers: HashMap<GameScript, HashMap<Position, f64>>,
    pub role_thresholds: RoleThresholds,
    pub grade_thresholds: GradeThresholds,
}

impl From<ParamsFile> for ScoringParams {
    fn from(file: ParamsFile) -> Self {
        let correlation_priors = file
            .correlation_priors
            .into_iter()
            .map(|p| ((p.stat_a, p.stat_b, p.script), p.value))
            .collect();
        Self {
            sigma_rules: file.sigma_rules,
            archetype_volatility: file.archetype_volatility,
            correlation_priors,
            position_correlations: file.position_correlations,
            script_multipliers: file.script_multipliers,
            role_thresholds: file.role_thresholds,
            grade_thresholds: file.grade_thresholds,
        }
    }
}

impl From<ScoringParams> for ParamsFile {
    fn from(params: ScoringParams) -> Self {
        let mut correlation_priors = params
            .correlation_priors
            .into_iter()
            .map(|((stat_a, stat_b, script), value)| CorrelationPrior {
                stat_a,
                stat_b,
                script,
                value,
            })
            .collect::<Vec<_>>();
        correlation_priors.sort_by(|a, b| {
            (&a.script, &a.stat_a, &a.stat_b).cmp(&(&b.script, &b.stat_a, &b.stat_b))
        });
        Self {
            sigma_rules: params.sigma_rules,
            archetype_volatility: params.archetype_volatility,
            correlation_priors,
            position_correlations: params.position_correlations,
            script_multipliers: params.script_multipliers,
            role_thresholds: params.role_thresholds,
            grade_thresholds: params.grade_thresholds,
        }
    }
}

impl ScoringParams {
    /// Shared reference tuning set, built once.
    pub fn reference() -> &'static ScoringParams {
        &REFERENCE
    }

    pub fn defaults() -> Self {
        let sigma_rules = [
            ("receiving_yards", 0.28, 9.0),
            ("receptions", 0.38, 1.2),
            ("rushing_yards", 0.30, 10.0),
            ("rush_rec_yards", 0.27, 12.0),
            ("passing_yards", 0.22, 18.0),
            ("passing_tds", 0.55, 0.6),
            ("rushing_tds", 0.70, 0.5),
            ("fantasy_points", 0.40, 4.0),
        ]
        .into_iter()
        .map(|(stat, pct_of_line, absolute_floor)| {
            (
                stat.to_string(),
                SigmaRule {
                    pct_of_line,
                    absolute_floor,
                },
            )
        })
        .collect();

        // Lower multiplier = steadier usage.
        let archetype_volatility = [
            ("alpha_wr", 0.9),
            ("slot_wr", 1.0),
            ("field_stretcher", 1.2),
            ("rb1", 0.95),
            ("rb2", 1.1),
            ("pass_rb", 1.05),
            ("te1", 1.05),
            ("te2", 1.25),
            ("qb", 0.9),
            ("other", 1.1),
        ]
        .into_iter()
        .map(|(role, mult)| (role.to_string(), mult))
        .collect();

        let correlation_priors = [
            ("passing_yards", "receiving_yards", "shootout", 0.45),
            ("passing_yards", "receptions", "shootout", 0.40),
            ("passing_yards", "receiving_yards", "BUF_control", 0.30),
            ("rushing_yards", "passing_yards", "BUF_control", -0.10),
            ("rushing_yards", "receptions", "BUF_control", 0.05),
            ("rush_rec_yards", "passing_yards", "shootout", 0.25),
            ("rush_rec_yards", "receiving_yards", "shootout", 0.20),
            ("receptions", "receiving_yards", "neutral", 0.35),
            ("rushing_yards", "rush_rec_yards", "neutral", 0.30),
        ]
        .into_iter()
        .map(|(a, b, script, value)| ((a.to_string(), b.to_string(), script.to_string()), value))
        .collect();

        use Position::*;
        let position_correlations = [
            (Qb, vec![(Wr, 0.65), (Te, 0.45), (Rb, 0.15), (K, 0.25), (Dst, -0.10)]),
            (
                Rb,
                vec![(Qb, 0.15), (Wr, -0.05), (Te, 0.05), (Rb, -0.15), (K, 0.10), (Dst, -0.05)],
            ),
            (
                Wr,
                vec![(Qb, 0.65), (Wr, -0.10), (Te, -0.05), (Rb, -0.05), (K, 0.15), (Dst, -0.10)],
            ),
            (
                Te,
                vec![(Qb, 0.45), (Wr, -0.05), (Te, -0.10), (Rb, 0.05), (K, 0.10), (Dst, -0.05)],
            ),
            (
                K,
                vec![(Qb, 0.25), (Wr, 0.15), (Te, 0.10), (Rb, 0.10), (K, 0.00), (Dst, 0.05)],
            ),
            (
                Dst,
                vec![(Qb, -0.10), (Wr, -0.10), (Te, -0.05), (Rb, -0.05), (K, 0.05), (Dst, 0.00)],
            ),
        ]
        .into_iter()
        .map(|(pos, row)| (pos, row.into_iter().collect()))
        .collect();

        let script_multipliers = [
            (GameScript::Shootout, [1.20, 1.15, 1.10, 0.90, 1.05, 0.85]),
            (GameScript::Control, [0.95, 0.90, 0.95, 1.15, 0.95, 1.10]),
            (GameScript::Neutral, [1.00, 1.00, 1.00, 1.00, 1.00, 1.00]),
            (GameScript::Blowout, [0.80, 0.85, 0.90, 1.25, 0.90, 1.15]),
            (GameScript::Defensive, [0.85, 0.80, 0.85, 0.95, 0.80, 1.30]),
        ]
        .into_iter()
        .map(|(script, mults)| {
            let row = [Qb, Wr, Te, Rb, K, Dst].into_iter().zip(mults).collect();
            (script, row)
        })
        .collect();

        Self {
            sigma_rules,
            archetype_volatility,
            correlation_priors,
            position_correlations,
            script_multipliers,
            role_thresholds: RoleThresholds::default(),
            grade_thresholds: GradeThresholds::default(),
        }
    }

    pub fn sigma_rule(&self, stat: &str) -> SigmaRule {
        self.sigma_rules
            .get(stat)
            .copied()
            .unwrap_or(DEFAULT_SIGMA_RULE)
    }

    pub fn sigma_rules(&self) -> impl Iterator<Item = (&str, SigmaRule)> {
        self.sigma_rules.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn archetype_volatility(&self, role: &str) -> f64 {
        self.archetype_volatility
            .get(role)
            .copied()
            .unwrap_or(DEFAULT_ARCHETYPE_VOLATILITY)
    }

    /// Exact-order lookup; symmetry is the caller's concern.
    pub fn correlation_prior(&self, stat_a: &str, stat_b: &str, script: &str) -> Option<f64> {
        self.correlation_priors
            .get(&(stat_a.to_string(), stat_b.to_string(), script.to_string()))
            .copied()
    }

    pub fn position_correlation(&self, a: Position, b: Position) -> f64 {
        self.position_entry(a, b).unwrap_or(0.0)
    }

    /// Exact-order matrix cell, `None` when the tuning set leaves it out.
    pub fn position_entry(&self, a: Position, b: Position) -> Option<f64> {
        self.position_correlations
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
    }

    pub fn script_multiplier(&self, script: GameScript, pos: Position) -> f64 {
        self.script_multipliers
            .get(&script)
            .and_then(|row| row.get(&pos))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn with_sigma_rule(mut self, stat: &str, rule: SigmaRule) -> Self {
        self.sigma_rules.insert(stat.to_string(), rule);
        self
    }

    pub fn with_archetype_volatility(mut self, role: &str, mult: f64) -> Self {
        self.archetype_volatility.insert(role.to_string(), mult);
        self
    }

    pub fn with_correlation_prior(mut self, stat_a: &str, stat_b: &str, script: &str, value: f64) -> Self {
        self.correlation_priors.insert(
            (stat_a.to_string(), stat_b.to_string(), script.to_string()),
            value,
        );
        self
    }

    pub fn with_position_correlation(mut self, a: Position, b: Position, value: f64) -> Self {
        self.position_correlations.entry(a).or_default().insert(b, value);
        self
    }

    pub fn with_script_multiplier(mut self, script: GameScript, pos: Position, mult: f64) -> Self {
        self.script_multipliers.entry(script).or_default().insert(pos, mult);
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read tuning file {}", path.display()))?;
        let params: Self =
            serde_json::from_str(&raw).with_context(|| format!("parse tuning file {}", path.display()))?;
        params
            .validate()
            .with_context(|| format!("check tuning file {}", path.display()))?;
        Ok(params)
    }

    /// Sigma inputs and multipliers must be finite and positive so every
    /// derived sigma stays above zero. Correlation values must be finite.
    pub fn validate(&self) -> Result<()> {
        for (stat, rule) in &self.sigma_rules {
            if !positive(rule.pct_of_line) || !positive(rule.absolute_floor) {
                bail!(
                    "sigma rule for {stat} needs positive pct_of_line and absolute_floor, got {} and {}",
                    rule.pct_of_line,
                    rule.absolute_floor
                );
            }
        }
        for (role, mult) in &self.archetype_volatility {
            if !positive(*mult) {
                bail!("archetype volatility for {role} must be positive, got {mult}");
            }
        }
        for (script, row) in &self.script_multipliers {
            for (pos, mult) in row {
                if !positive(*mult) {
                    bail!(
                        "script multiplier for {} {} must be positive, got {mult}",
                        script.as_str(),
                        pos.as_str()
                    );
                }
            }
        }
        let priors = self.correlation_priors.values();
        let cells = self.position_correlations.values().flat_map(|row| row.values());
        if let Some(bad) = priors.chain(cells).find(|v| !v.is_finite()) {
            bail!("correlation value {bad} is not finite");
        }
        Ok(())
    }

    /// Missing or broken tuning files fall back to the reference set.
    pub fn load_or_reference(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::reference().clone();
        };
        match Self::load(path) {
            Ok(params) => params,
            Err(err) => {
                warn!("using reference scoring params: {err:#}");
                Self::reference().clone()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize scoring params")?;
        fs::write(&tmp, json).context("write scoring params")?;
        fs::rename(&tmp, path).context("swap scoring params")?;
        Ok(())
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self::reference().clone()
    }
}

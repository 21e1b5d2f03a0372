use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GpicksError, Result};
use crate::ev::ScoredPick;
use crate::pick::{Pick, Position, RoleArchetype, StatType};
use crate::slip::SlipMetrics;

#[derive(Debug, Deserialize)]
struct RawPick {
    id: Option<String>,
    player: Option<String>,
    team: Option<String>,
    opponent: Option<String>,
    stat_type: Option<String>,
    line: Option<String>,
    projection: Option<String>,
    role_archetype: Option<String>,
    script_hint: Option<String>,
    position: Option<String>,
}

pub fn load_picks(path: &Path) -> anyhow::Result<Vec<Pick>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let picks = parse_picks(file).with_context(|| format!("parse {}", path.display()))?;
    debug!(path = %path.display(), count = picks.len(), "loaded picks");
    Ok(picks)
}

/// Rows are numbered from 1, excluding the header.
pub fn parse_picks<R: Read>(reader: R) -> Result<Vec<Pick>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (i, rec) in rdr.deserialize::<RawPick>().enumerate() {
        let row = i + 1;
        let raw = rec.map_err(|e| GpicksError::Csv {
            row,
            field: "*".to_string(),
            message: e.to_string(),
        })?;
        out.push(pick_from_raw(row, raw)?);
    }
    Ok(out)
}

fn pick_from_raw(row: usize, raw: RawPick) -> Result<Pick> {
    let required = |field: &str, v: Option<String>| -> Result<String> {
        match v {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(GpicksError::Csv {
                row,
                field: field.to_string(),
                message: "missing".to_string(),
            }),
        }
    };
    let number = |field: &str, v: Option<String>| -> Result<f64> {
        let s = required(field, v)?;
        match s.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(x),
            _ => Err(GpicksError::Csv {
                row,
                field: field.to_string(),
                message: format!("not a number: {s:?}"),
            }),
        }
    };

    let id = required("id", raw.id)?;
    let player = required("player", raw.player)?;
    let stat_type = StatType::parse(&required("stat_type", raw.stat_type)?);
    let line = number("line", raw.line)?;
    let projection = number("projection", raw.projection)?;

    let mut pick = Pick::new(id, player, stat_type, line, projection).with_team(
        raw.team.as_deref().unwrap_or(""),
        raw.opponent.as_deref().unwrap_or(""),
    );
    if let Some(role) = raw.role_archetype.filter(|s| !s.is_empty()) {
        pick = pick.with_role(RoleArchetype::parse(&role));
    }
    if let Some(script) = raw.script_hint.filter(|s| !s.is_empty()) {
        pick = pick.with_script(&script);
    }
    if let Some(pos) = raw.position.filter(|s| !s.is_empty()) {
        let parsed = Position::parse(&pos).ok_or_else(|| GpicksError::Csv {
            row,
            field: "position".to_string(),
            message: format!("unknown position {pos:?}"),
        })?;
        pick = pick.with_position(parsed);
    }
    Ok(pick)
}

#[derive(Serialize)]
struct ScoredRow<'a> {
    id: &'a str,
    player: &'a str,
    team: &'a str,
    stat_type: &'a str,
    line: f64,
    projection: f64,
    direction: &'static str,
    sigma: f64,
    win_prob_pct: f64,
    ev_pct: f64,
    role_tag: &'static str,
}

pub fn write_scored_picks(path: &Path, picks: &[ScoredPick]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    for p in picks {
        wtr.serialize(ScoredRow {
            id: &p.pick.id,
            player: &p.pick.player,
            team: &p.pick.team,
            stat_type: p.pick.stat_type.as_str(),
            line: p.pick.line,
            projection: p.pick.projection,
            direction: p.score.direction.as_str(),
            sigma: round(p.score.sigma, 2),
            win_prob_pct: round(p.score.win_probability * 100.0, 2),
            ev_pct: round(p.score.ev_percent, 2),
            role_tag: p.score.role_tag.as_str(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct SlipRow {
    rank: usize,
    grade: &'static str,
    pick_ids: String,
    players: String,
    anchors: usize,
    low_variance: usize,
    correlation: usize,
    role_coverage: usize,
    corr_sum: f64,
    avg_ev_pct: f64,
    avg_win_prob_pct: f64,
    score: f64,
}

pub fn write_slips(path: &Path, slips: &[SlipMetrics]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    for (i, s) in slips.iter().enumerate() {
        wtr.serialize(SlipRow {
            rank: i + 1,
            grade: s.grade.as_str(),
            pick_ids: s.ids_label(),
            players: s.players_label(),
            anchors: s.anchor_count,
            low_variance: s.low_variance_count,
            correlation: s.correlation_count,
            role_coverage: s.role_coverage,
            corr_sum: round(s.correlation_sum, 3),
            avg_ev_pct: round(s.avg_ev, 2),
            avg_win_prob_pct: round(s.avg_win_prob * 100.0, 2),
            score: round(s.overall_score, 1),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn round(v: f64, dp: i32) -> f64 {
    let m = 10f64.powi(dp);
    (v * m).round() / m
}

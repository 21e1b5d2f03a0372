use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GpicksError;

/// Prop category. Names outside the known set are kept verbatim so custom
/// tuning tables can still key on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatType {
    ReceivingYards,
    Receptions,
    RushingYards,
    RushRecYards,
    PassingYards,
    PassingTds,
    RushingTds,
    FantasyPoints,
    Custom(String),
}

impl StatType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "receiving_yards" => StatType::ReceivingYards,
            "receptions" => StatType::Receptions,
            "rushing_yards" => StatType::RushingYards,
            "rush_rec_yards" => StatType::RushRecYards,
            "passing_yards" => StatType::PassingYards,
            "passing_tds" => StatType::PassingTds,
            "rushing_tds" => StatType::RushingTds,
            "fantasy_points" => StatType::FantasyPoints,
            _ => StatType::Custom(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatType::ReceivingYards => "receiving_yards",
            StatType::Receptions => "receptions",
            StatType::RushingYards => "rushing_yards",
            StatType::RushRecYards => "rush_rec_yards",
            StatType::PassingYards => "passing_yards",
            StatType::PassingTds => "passing_tds",
            StatType::RushingTds => "rushing_tds",
            StatType::FantasyPoints => "fantasy_points",
            StatType::Custom(name) => name,
        }
    }

    /// Volume stats eligible for the Low-Variance role.
    pub fn is_low_variance_stat(&self) -> bool {
        matches!(
            self,
            StatType::Receptions | StatType::RushingYards | StatType::ReceivingYards
        )
    }
}

impl From<String> for StatType {
    fn from(raw: String) -> Self {
        StatType::parse(&raw)
    }
}

impl From<StatType> for String {
    fn from(stat: StatType) -> Self {
        stat.as_str().to_string()
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleArchetype {
    AlphaWr,
    SlotWr,
    FieldStretcher,
    Rb1,
    Rb2,
    PassRb,
    Te1,
    Te2,
    Qb,
    Other,
    Custom(String),
}

impl RoleArchetype {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "alpha_wr" => RoleArchetype::AlphaWr,
            "slot_wr" => RoleArchetype::SlotWr,
            "field_stretcher" => RoleArchetype::FieldStretcher,
            "rb1" => RoleArchetype::Rb1,
            "rb2" => RoleArchetype::Rb2,
            "pass_rb" => RoleArchetype::PassRb,
            "te1" => RoleArchetype::Te1,
            "te2" => RoleArchetype::Te2,
            "qb" => RoleArchetype::Qb,
            "" | "other" => RoleArchetype::Other,
            _ => RoleArchetype::Custom(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleArchetype::AlphaWr => "alpha_wr",
            RoleArchetype::SlotWr => "slot_wr",
            RoleArchetype::FieldStretcher => "field_stretcher",
            RoleArchetype::Rb1 => "rb1",
            RoleArchetype::Rb2 => "rb2",
            RoleArchetype::PassRb => "pass_rb",
            RoleArchetype::Te1 => "te1",
            RoleArchetype::Te2 => "te2",
            RoleArchetype::Qb => "qb",
            RoleArchetype::Other => "other",
            RoleArchetype::Custom(name) => name,
        }
    }

    pub fn is_low_variance_role(&self) -> bool {
        matches!(
            self,
            RoleArchetype::Te1 | RoleArchetype::Rb1 | RoleArchetype::SlotWr
        )
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            RoleArchetype::AlphaWr | RoleArchetype::SlotWr | RoleArchetype::FieldStretcher => {
                Some(Position::Wr)
            }
            RoleArchetype::Rb1 | RoleArchetype::Rb2 | RoleArchetype::PassRb => Some(Position::Rb),
            RoleArchetype::Te1 | RoleArchetype::Te2 => Some(Position::Te),
            RoleArchetype::Qb => Some(Position::Qb),
            RoleArchetype::Other | RoleArchetype::Custom(_) => None,
        }
    }
}

impl From<String> for RoleArchetype {
    fn from(raw: String) -> Self {
        RoleArchetype::parse(&raw)
    }
}

impl From<RoleArchetype> for String {
    fn from(role: RoleArchetype) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for RoleArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Qb,
    #[serde(rename = "RB")]
    Rb,
    #[serde(rename = "WR")]
    Wr,
    #[serde(rename = "TE")]
    Te,
    #[serde(rename = "K")]
    K,
    #[serde(rename = "DST")]
    Dst,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Qb,
        Position::Rb,
        Position::Wr,
        Position::Te,
        Position::K,
        Position::Dst,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Qb),
            "RB" => Some(Position::Rb),
            "WR" => Some(Position::Wr),
            "TE" => Some(Position::Te),
            "K" => Some(Position::K),
            "DST" | "DEF" | "D/ST" => Some(Position::Dst),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Qb => "QB",
            Position::Rb => "RB",
            Position::Wr => "WR",
            Position::Te => "TE",
            Position::K => "K",
            Position::Dst => "DST",
        }
    }
}

/// Coarse game script used by the position-based correlation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameScript {
    Shootout,
    Control,
    Neutral,
    Blowout,
    Defensive,
}

impl GameScript {
    pub const ALL: [GameScript; 5] = [
        GameScript::Shootout,
        GameScript::Control,
        GameScript::Neutral,
        GameScript::Blowout,
        GameScript::Defensive,
    ];

    /// Team-specific names such as `BUF_control` collapse onto their base script.
    pub fn from_name(raw: &str) -> Self {
        let s = raw.trim().to_lowercase();
        if s.contains("shootout") {
            GameScript::Shootout
        } else if s.contains("control") {
            GameScript::Control
        } else if s.contains("blowout") {
            GameScript::Blowout
        } else if s.contains("defensive") {
            GameScript::Defensive
        } else {
            GameScript::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameScript::Shootout => "shootout",
            GameScript::Control => "control",
            GameScript::Neutral => "neutral",
            GameScript::Blowout => "blowout",
            GameScript::Defensive => "defensive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    pub fn from_line(line: f64, projection: f64) -> Self {
        if projection >= line {
            Direction::Over
        } else {
            Direction::Under
        }
    }

    pub fn parse(raw: &str) -> Result<Self, GpicksError> {
        match raw.trim().to_lowercase().as_str() {
            "over" => Ok(Direction::Over),
            "under" => Ok(Direction::Under),
            _ => Err(GpicksError::InvalidDirection(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Over => "Over",
            Direction::Under => "Under",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleTag {
    Anchor,
    #[serde(rename = "Low-Variance")]
    LowVariance,
    Correlation,
}

impl RoleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::Anchor => "Anchor",
            RoleTag::LowVariance => "Low-Variance",
            RoleTag::Correlation => "Correlation",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prop bet candidate as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub id: String,
    pub player: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub opponent: String,
    pub stat_type: StatType,
    pub line: f64,
    pub projection: f64,
    #[serde(default = "default_archetype")]
    pub role_archetype: RoleArchetype,
    #[serde(default = "default_script")]
    pub script_hint: String,
    #[serde(default)]
    pub position: Option<Position>,
}

fn default_archetype() -> RoleArchetype {
    RoleArchetype::Other
}

fn default_script() -> String {
    "neutral".to_string()
}

impl Pick {
    pub fn new(
        id: impl Into<String>,
        player: impl Into<String>,
        stat_type: StatType,
        line: f64,
        projection: f64,
    ) -> Self {
        Self {
            id: id.into(),
            player: player.into(),
            team: String::new(),
            opponent: String::new(),
            stat_type,
            line,
            projection,
            role_archetype: RoleArchetype::Other,
            script_hint: default_script(),
            position: None,
        }
    }

    pub fn with_team(mut self, team: &str, opponent: &str) -> Self {
        self.team = team.to_string();
        self.opponent = opponent.to_string();
        self
    }

    pub fn with_role(mut self, role: RoleArchetype) -> Self {
        self.role_archetype = role;
        self
    }

    pub fn with_script(mut self, script: &str) -> Self {
        self.script_hint = script.to_string();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Explicit position if given, else the one implied by the archetype.
    pub fn resolved_position(&self) -> Option<Position> {
        self.position.or_else(|| self.role_archetype.position())
    }

    pub fn direction(&self) -> Direction {
        Direction::from_line(self.line, self.projection)
    }
}

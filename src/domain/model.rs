use crate::utils::error::{ReportError, Result};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Direction of a player move relative to the club that reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    In,
    Out,
}

impl Movement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::In => "in",
            Movement::Out => "out",
        }
    }
}

impl FromStr for Movement {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(Movement::In),
            "out" => Ok(Movement::Out),
            _ => Err(ReportError::parse(
                "transfer_movement",
                s,
                "expected 'in' or 'out'",
            )),
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub season: String,
    pub year: i32,
    pub league_name: String,
    pub club_name: String,
    pub player_name: String,
    /// Fee in millions; `None` when the source has no fee for the move.
    pub fee: Option<f64>,
    pub movement: Movement,
    pub age: Option<u32>,
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub home_team: String,
    pub away_team: String,
    pub score: String,
    pub utc_time: String,
    pub kickoff: NaiveDateTime,
    /// (home, away); `None` for fixtures that have not been played.
    pub goals: Option<(u32, u32)>,
}

impl MatchRecord {
    pub fn is_played(&self) -> bool {
        self.goals.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Home => "home",
            Venue::Away => "away",
        }
    }
}

/// One team's side of a played match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMatch {
    pub team: String,
    pub opponent: String,
    pub venue: Venue,
    pub goals_for: u32,
    pub goals_against: u32,
    pub kickoff: NaiveDateTime,
}

impl TeamMatch {
    pub fn result(&self) -> &'static str {
        match self.goals_for.cmp(&self.goals_against) {
            std::cmp::Ordering::Greater => "W",
            std::cmp::Ordering::Equal => "D",
            std::cmp::Ordering::Less => "L",
        }
    }

    pub fn points(&self) -> u32 {
        match self.result() {
            "W" => 3,
            "D" => 1,
            _ => 0,
        }
    }
}

/// Splits every played match into a home row and an away row.
pub fn team_perspective(matches: &[MatchRecord]) -> Vec<TeamMatch> {
    let mut rows = Vec::with_capacity(matches.len() * 2);
    for m in matches {
        let Some((home, away)) = m.goals else {
            continue;
        };
        rows.push(TeamMatch {
            team: m.home_team.clone(),
            opponent: m.away_team.clone(),
            venue: Venue::Home,
            goals_for: home,
            goals_against: away,
            kickoff: m.kickoff,
        });
        rows.push(TeamMatch {
            team: m.away_team.clone(),
            opponent: m.home_team.clone(),
            venue: Venue::Away,
            goals_for: away,
            goals_against: home,
            kickoff: m.kickoff,
        });
    }
    rows
}

/// A single cell as seen by the aggregation functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    Missing,
}

impl Value<'_> {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// String form used for group keys and CSV cells.
    pub fn to_key(&self) -> String {
        match self {
            Value::Text(s) => s.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Missing => String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::Value::String(s.to_string()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Missing => serde_json::Value::Null,
        }
    }
}

impl From<u32> for Value<'_> {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i32> for Value<'_> {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<Option<f64>> for Value<'_> {
    fn from(n: Option<f64>) -> Self {
        n.map(Value::Number).unwrap_or(Value::Missing)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Text(Cow::Borrowed(s))
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Uniform column access over loaded records.
pub trait Row {
    /// Table name used in error messages.
    const TABLE: &'static str;

    fn field(&self, name: &str) -> Result<Value<'_>>;
}

impl Row for TransferRecord {
    const TABLE: &'static str = "transfers";

    fn field(&self, name: &str) -> Result<Value<'_>> {
        Ok(match name {
            "season" => self.season.as_str().into(),
            "year" => self.year.into(),
            "league_name" => self.league_name.as_str().into(),
            "club_name" => self.club_name.as_str().into(),
            "player_name" => self.player_name.as_str().into(),
            "fee_cleaned" => self.fee.into(),
            "transfer_movement" => self.movement.as_str().into(),
            "age" => self.age.map(Value::from).unwrap_or(Value::Missing),
            "position" => self.position.as_str().into(),
            other => return Err(ReportError::missing_column(other, Self::TABLE)),
        })
    }
}

impl Row for MatchRecord {
    const TABLE: &'static str = "matches";

    fn field(&self, name: &str) -> Result<Value<'_>> {
        Ok(match name {
            "home_team" => self.home_team.as_str().into(),
            "away_team" => self.away_team.as_str().into(),
            "score" => self.score.as_str().into(),
            "utc_time" => self.utc_time.as_str().into(),
            "home_goals" => self.goals.map(|(h, _)| Value::from(h)).unwrap_or(Value::Missing),
            "away_goals" => self.goals.map(|(_, a)| Value::from(a)).unwrap_or(Value::Missing),
            "date" => Value::Text(Cow::Owned(self.kickoff.format("%Y-%m-%d").to_string())),
            "year" => self.kickoff.year().into(),
            other => return Err(ReportError::missing_column(other, Self::TABLE)),
        })
    }
}

impl Row for TeamMatch {
    const TABLE: &'static str = "team_matches";

    fn field(&self, name: &str) -> Result<Value<'_>> {
        Ok(match name {
            "team" => self.team.as_str().into(),
            "opponent" => self.opponent.as_str().into(),
            "venue" => self.venue.as_str().into(),
            "goals_for" => self.goals_for.into(),
            "goals_against" => self.goals_against.into(),
            "result" => self.result().into(),
            "points" => self.points().into(),
            "date" => Value::Text(Cow::Owned(self.kickoff.format("%Y-%m-%d").to_string())),
            "year" => self.kickoff.year().into(),
            other => return Err(ReportError::missing_column(other, Self::TABLE)),
        })
    }
}

/// Which record table a report section reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    #[default]
    Transfers,
    Matches,
    TeamMatches,
}

/// Everything loaded for one run. Read-only after extraction.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub transfers: Vec<TransferRecord>,
    pub matches: Vec<MatchRecord>,
    pub team_matches: Vec<TeamMatch>,
}

impl Dataset {
    pub fn new(transfers: Vec<TransferRecord>, matches: Vec<MatchRecord>) -> Self {
        let team_matches = team_perspective(&matches);
        Self {
            transfers,
            matches,
            team_matches,
        }
    }

    pub fn len(&self) -> usize {
        self.transfers.len() + self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

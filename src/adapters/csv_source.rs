//! CSV -> typed records.
//!
//! Columns are resolved from the header row once per file. A required
//! column that is absent fails the whole file with `MissingColumnError`;
//! a cell that does not parse fails it with `ParseError` carrying the line.

use crate::core::season::season_to_year;
use crate::domain::model::{MatchRecord, Movement, TransferRecord};
use crate::utils::error::{ReportError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashMap;

struct ColumnIndex<'a> {
    positions: HashMap<String, usize>,
    source: &'a str,
}

impl<'a> ColumnIndex<'a> {
    fn new(
        headers: &StringRecord,
        field_mapping: Option<&HashMap<String, String>>,
        source: &'a str,
    ) -> Self {
        let mut positions = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            let header = header.trim();
            let name = field_mapping
                .and_then(|m| m.get(header))
                .map(String::as_str)
                .unwrap_or(header);
            positions.entry(name.to_string()).or_insert(i);
        }
        Self { positions, source }
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.positions
            .get(column)
            .copied()
            .ok_or_else(|| ReportError::missing_column(column, self.source))
    }
}

/// Pandas-style missing markers.
fn is_missing(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "" | "na" | "n/a" | "nan" | "null" | "none"
    )
}

fn cell(row: &StringRecord, index: usize) -> &str {
    row.get(index).map(str::trim).unwrap_or("")
}

fn parse_fee(value: &str) -> Result<Option<f64>> {
    if is_missing(value) {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|e| ReportError::parse("fee_cleaned", value, e.to_string()))
}

fn parse_age(value: &str) -> Result<Option<u32>> {
    if is_missing(value) {
        return Ok(None);
    }
    if let Ok(age) = value.parse::<u32>() {
        return Ok(Some(age));
    }
    // float columns with missing values come out as "24.0"
    match value.parse::<f64>() {
        Ok(age) if age >= 0.0 && age.fract() == 0.0 => Ok(Some(age as u32)),
        _ => Err(ReportError::parse("age", value, "expected a whole number")),
    }
}

/// Falls back to the season's leading year when the cell is missing.
fn parse_year(value: &str, season: &str) -> Result<i32> {
    if is_missing(value) {
        return season_to_year(season);
    }
    if let Ok(year) = value.parse::<i32>() {
        return Ok(year);
    }
    match value.parse::<f64>() {
        Ok(year) if year.fract() == 0.0 && year.abs() <= f64::from(i32::MAX) => Ok(year as i32),
        _ => Err(ReportError::parse("year", value, "expected a whole year")),
    }
}

struct TransferColumns {
    season: usize,
    year: usize,
    league_name: usize,
    club_name: usize,
    player_name: usize,
    fee: usize,
    movement: usize,
    age: usize,
    position: usize,
}

impl TransferColumns {
    fn resolve(index: &ColumnIndex<'_>) -> Result<Self> {
        Ok(Self {
            season: index.require("season")?,
            year: index.require("year")?,
            league_name: index.require("league_name")?,
            club_name: index.require("club_name")?,
            player_name: index.require("player_name")?,
            fee: index.require("fee_cleaned")?,
            movement: index.require("transfer_movement")?,
            age: index.require("age")?,
            position: index.require("position")?,
        })
    }

    fn parse(&self, row: &StringRecord) -> Result<TransferRecord> {
        let season = cell(row, self.season);
        Ok(TransferRecord {
            season: season.to_string(),
            year: parse_year(cell(row, self.year), season)?,
            league_name: cell(row, self.league_name).to_string(),
            club_name: cell(row, self.club_name).to_string(),
            player_name: cell(row, self.player_name).to_string(),
            fee: parse_fee(cell(row, self.fee))?,
            movement: cell(row, self.movement).parse::<Movement>()?,
            age: parse_age(cell(row, self.age))?,
            position: cell(row, self.position).to_string(),
        })
    }
}

/// Reads one transfer table. `source` names the file in error messages.
pub fn read_transfers(
    data: &[u8],
    source: &str,
    field_mapping: Option<&HashMap<String, String>>,
) -> Result<Vec<TransferRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);
    let headers = reader.headers()?.clone();
    let columns = TransferColumns::resolve(&ColumnIndex::new(&headers, field_mapping, source))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        records.push(columns.parse(&row).map_err(|e| e.at_line(line))?);
    }

    tracing::debug!("Read {} transfers from {}", records.len(), source);
    Ok(records)
}

/// "2 - 1", "2-1" or "2:1"; missing markers mean the fixture is unplayed.
pub fn parse_score(score: &str) -> Result<Option<(u32, u32)>> {
    if is_missing(score) {
        return Ok(None);
    }
    let (home, away) = score
        .split_once('-')
        .or_else(|| score.split_once(':'))
        .ok_or_else(|| ReportError::parse("score", score, "expected 'home - away'"))?;

    let goals = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| ReportError::parse("score", score, e.to_string()))
    };
    Ok(Some((goals(home)?, goals(away)?)))
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date.
pub fn parse_utc_time(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ReportError::parse("utc_time", value, "unrecognised timestamp"))
}

struct MatchColumns {
    home_team: usize,
    away_team: usize,
    score: usize,
    utc_time: usize,
}

impl MatchColumns {
    fn resolve(index: &ColumnIndex<'_>) -> Result<Self> {
        Ok(Self {
            home_team: index.require("home_team")?,
            away_team: index.require("away_team")?,
            score: index.require("score")?,
            utc_time: index.require("utc_time")?,
        })
    }

    fn parse(&self, row: &StringRecord) -> Result<MatchRecord> {
        let score = cell(row, self.score);
        let utc_time = cell(row, self.utc_time);
        Ok(MatchRecord {
            home_team: cell(row, self.home_team).to_string(),
            away_team: cell(row, self.away_team).to_string(),
            score: score.to_string(),
            utc_time: utc_time.to_string(),
            kickoff: parse_utc_time(utc_time)?,
            goals: parse_score(score)?,
        })
    }
}

pub fn read_matches(
    data: &[u8],
    source: &str,
    field_mapping: Option<&HashMap<String, String>>,
) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);
    let headers = reader.headers()?.clone();
    let columns = MatchColumns::resolve(&ColumnIndex::new(&headers, field_mapping, source))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        records.push(columns.parse(&row).map_err(|e| e.at_line(line))?);
    }

    tracing::debug!("Read {} matches from {}", records.len(), source);
    Ok(records)
}

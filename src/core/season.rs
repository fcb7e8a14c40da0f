use crate::utils::error::{ReportError, Result};

/// Leading calendar year of a "YYYY/YY" season token.
pub fn season_to_year(season: &str) -> Result<i32> {
    let trimmed = season.trim();
    let (start, _) = trimmed
        .split_once('/')
        .ok_or_else(|| ReportError::parse("season", season, "expected YYYY/YY"))?;

    if start.len() != 4 || !start.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReportError::parse(
            "season",
            season,
            "leading year must be four digits",
        ));
    }

    start
        .parse::<i32>()
        .map_err(|e| ReportError::parse("season", season, e.to_string()))
}

/// Year a category label stands for: a season token or a plain year.
pub fn chronological_rank(label: &str) -> Option<i32> {
    season_to_year(label)
        .ok()
        .or_else(|| label.trim().parse::<i32>().ok())
}

/// Orders season labels chronologically; labels without a year sort last.
pub fn sort_seasons(seasons: &mut [String]) {
    seasons.sort_by_key(|s| (chronological_rank(s).unwrap_or(i32::MAX), s.clone()));
}

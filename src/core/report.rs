use crate::config::toml_config::{ChartDefinition, ReportConfig, SectionDefinition, Thresholds};
use crate::core::aggregate::{self, Predicate};
use crate::core::chart;
use crate::domain::model::{Dataset, DatasetKind, Row, format_number};
use crate::domain::report::{ChartSpec, Report, ReportSection, Timespan};
use crate::utils::error::Result;
use chrono::Utc;

/// Year range covered by every loaded table.
pub fn data_bounds(dataset: &Dataset) -> Result<Option<Timespan>> {
    let transfers = aggregate::year_bounds(&dataset.transfers)?;
    let matches = aggregate::year_bounds(&dataset.matches)?;
    Ok(match (transfers, matches) {
        (Some(a), Some(b)) => Some(Timespan {
            from_year: a.from_year.min(b.from_year),
            to_year: a.to_year.max(b.to_year),
        }),
        (a, b) => a.or(b),
    })
}

/// Renders every section over the timespan the definition asks for,
/// defaulting to the full range of the data.
pub fn render_report(config: &ReportConfig, dataset: &Dataset) -> Result<Report> {
    let timespan = config.resolve_timespan(data_bounds(dataset)?)?;
    render_with_timespan(config, dataset, timespan)
}

/// Full recomputation from the loaded records; nothing is cached between calls.
pub fn render_with_timespan(
    config: &ReportConfig,
    dataset: &Dataset,
    timespan: Option<Timespan>,
) -> Result<Report> {
    if let Some(span) = timespan {
        tracing::info!(
            "🗓️ Rendering {} sections for {}-{}",
            config.sections.len(),
            span.from_year,
            span.to_year
        );
    }

    let sections = config
        .sections
        .iter()
        .map(|section| render_section(section, dataset, timespan, &config.thresholds))
        .collect::<Result<Vec<_>>>()?;

    Ok(Report {
        title: fill_template(&config.report.title, &config.thresholds, timespan),
        generated_at: Utc::now(),
        timespan,
        sections,
    })
}

fn render_section(
    section: &SectionDefinition,
    dataset: &Dataset,
    timespan: Option<Timespan>,
    thresholds: &Thresholds,
) -> Result<ReportSection> {
    let mut predicates = Vec::with_capacity(section.filters.len() + 1);
    if let Some(span) = timespan {
        predicates.push(Predicate::year_range(span));
    }
    predicates.extend(section.filters.iter().map(|f| f.resolve(thresholds)));

    let chart = match &section.chart {
        Some(definition) => {
            let title = fill_template(definition.title(), thresholds, timespan);
            Some(match section.dataset {
                DatasetKind::Transfers => {
                    section_chart(&dataset.transfers, &predicates, definition, title, thresholds)?
                }
                DatasetKind::Matches => {
                    section_chart(&dataset.matches, &predicates, definition, title, thresholds)?
                }
                DatasetKind::TeamMatches => section_chart(
                    &dataset.team_matches,
                    &predicates,
                    definition,
                    title,
                    thresholds,
                )?,
            })
        }
        None => None,
    };

    let empty = chart.as_ref().is_some_and(ChartSpec::is_empty);
    match &chart {
        Some(_) if empty => {
            tracing::warn!("⚠️ Section '{}' has no data for the selected filters", section.id)
        }
        Some(c) => tracing::debug!("Section '{}': {} points", section.id, c.points.len()),
        None => tracing::debug!("Section '{}': narrative only", section.id),
    }

    Ok(ReportSection {
        id: section.id.clone(),
        heading: fill_template(&section.heading, thresholds, timespan),
        narrative: fill_template(&section.narrative, thresholds, timespan),
        chart,
        empty,
    })
}

fn section_chart<R: Row>(
    records: &[R],
    predicates: &[Predicate],
    definition: &ChartDefinition,
    title: String,
    thresholds: &Thresholds,
) -> Result<ChartSpec> {
    let kept = aggregate::filter(records, predicates)?;
    match definition {
        ChartDefinition::Aggregate(c) => chart::aggregate_chart(kept, c, title, thresholds.top_n),
        ChartDefinition::Points(c) => chart::points_chart(kept, c, title),
    }
}

/// Replaces `{top_n}`, `{high_value_fee}`, `{from_year}` and `{to_year}`.
pub fn fill_template(text: &str, thresholds: &Thresholds, timespan: Option<Timespan>) -> String {
    let mut out = text
        .replace("{top_n}", &thresholds.top_n.to_string())
        .replace("{high_value_fee}", &format_number(thresholds.high_value_fee));
    if let Some(span) = timespan {
        out = out
            .replace("{from_year}", &span.from_year.to_string())
            .replace("{to_year}", &span.to_year.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MatchRecord, Movement, TransferRecord};
    use chrono::NaiveDate;

    fn transfer(
        year: i32,
        league: &str,
        club: &str,
        fee: f64,
        movement: Movement,
    ) -> TransferRecord {
        TransferRecord {
            season: format!("{}/{:02}", year, (year + 1) % 100),
            year,
            league_name: league.to_string(),
            club_name: club.to_string(),
            player_name: format!("{} {}", club, year),
            fee: Some(fee),
            movement,
            age: Some(26),
            position: "Centre-Back".to_string(),
        }
    }

    fn config() -> ReportConfig {
        ReportConfig::from_toml_str(
            r#"
[report]
title = "Top {top_n} story"

[sources]
transfers = ["all.csv"]

[thresholds]
top_n = 2
high_value_fee = 60

[load]
output_path = "./out"
output_formats = ["json"]

[[sections]]
id = "intro"
heading = "Introduction"
narrative = "Covers {from_year} to {to_year}."

[[sections]]
id = "spending"
heading = "Spending {from_year}-{to_year}"
filters = [{ op = "equals", field = "transfer_movement", value = "in" }]
chart = { type = "aggregate", title = "Spending", group_by = ["league_name"], measure = { kind = "sum", field = "fee_cleaned" } }

[[sections]]
id = "big-moves"
heading = "Over {high_value_fee}"
filters = [{ op = "high_value_fee" }]
chart = { type = "points", title = "Big moves", x = "season", y = "fee_cleaned", color = "league_name" }
"#,
        )
        .unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                transfer(2015, "Serie A", "Juventus", 90.0, Movement::In),
                transfer(2016, "Serie A", "Roma", 20.0, Movement::In),
                transfer(2017, "La Liga", "Barcelona", 105.0, Movement::In),
                transfer(2017, "Ligue 1", "Monaco", 180.0, Movement::Out),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_render_report_over_full_range() {
        let report = render_report(&config(), &dataset()).unwrap();

        assert_eq!(report.title, "Top 2 story");
        assert_eq!(
            report.timespan,
            Some(Timespan {
                from_year: 2015,
                to_year: 2017
            })
        );

        let spending = report.section("spending").unwrap();
        assert_eq!(spending.heading, "Spending 2015-2017");
        let totals: Vec<(String, f64)> = spending
            .chart
            .as_ref()
            .unwrap()
            .points
            .iter()
            .map(|p| (p.x.as_str().unwrap().to_string(), p.y))
            .collect();
        assert_eq!(
            totals,
            vec![("Serie A".to_string(), 110.0), ("La Liga".to_string(), 105.0)]
        );

        let big = report.section("big-moves").unwrap();
        assert_eq!(big.heading, "Over 60");
        assert_eq!(big.chart.as_ref().unwrap().points.len(), 3);

        let intro = report.section("intro").unwrap();
        assert!(intro.chart.is_none());
        assert!(!intro.empty);
        assert_eq!(intro.narrative, "Covers 2015 to 2017.");
    }

    #[test]
    fn test_timespan_narrows_every_section() {
        let span = Timespan {
            from_year: 2017,
            to_year: 2017,
        };
        let report = render_with_timespan(&config(), &dataset(), Some(span)).unwrap();

        let spending = report.section("spending").unwrap();
        let chart = spending.chart.as_ref().unwrap();
        assert_eq!(chart.points.len(), 1);
        assert_eq!(chart.points[0].y, 105.0);
    }

    #[test]
    fn test_empty_selection_is_flagged_not_an_error() {
        let span = Timespan {
            from_year: 1990,
            to_year: 1991,
        };
        let report = render_with_timespan(&config(), &dataset(), Some(span)).unwrap();

        assert_eq!(report.empty_sections(), 2);
        assert!(report
            .sections
            .iter()
            .filter_map(|s| s.chart.as_ref())
            .all(|c| c.points.is_empty()));
    }

    #[test]
    fn test_render_is_repeatable() {
        let data = dataset();
        let cfg = config();
        let first = render_report(&cfg, &data).unwrap();
        let second = render_report(&cfg, &data).unwrap();
        assert_eq!(first.sections, second.sections);
        assert_eq!(data.transfers.len(), 4);
    }

    fn fixture(home: &str, away: &str, date: &str, goals: Option<(u32, u32)>) -> MatchRecord {
        MatchRecord {
            home_team: home.to_string(),
            away_team: away.to_string(),
            score: goals.map(|(h, a)| format!("{} - {}", h, a)).unwrap_or_default(),
            utc_time: date.to_string(),
            kickoff: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            goals,
        }
    }

    #[test]
    fn test_match_sections_read_team_tables() {
        let config = ReportConfig::from_toml_str(
            r#"
[report]
title = "Title race"

[sources]
matches = ["premier-league-matches.csv"]

[load]
output_path = "./out"
output_formats = ["json"]

[[sections]]
id = "points"
heading = "Points {from_year}-{to_year}"
dataset = "team_matches"
filters = [{ op = "one_of", field = "team", values = ["Arsenal", "Chelsea"] }]

[sections.chart]
type = "aggregate"
title = "Points"
group_by = ["team"]
measure = { kind = "sum", field = "points" }

[[sections]]
id = "home-goals"
heading = "Home goals"
dataset = "matches"

[sections.chart]
type = "aggregate"
title = "Home goals"
group_by = ["home_team"]
measure = { kind = "sum", field = "home_goals" }
"#,
        )
        .unwrap();
        let dataset = Dataset::new(
            Vec::new(),
            vec![
                fixture("Arsenal", "Chelsea", "2023-08-12", Some((2, 1))),
                fixture("Chelsea", "Liverpool", "2023-08-19", Some((1, 1))),
                fixture("Liverpool", "Arsenal", "2023-08-26", Some((0, 3))),
                fixture("Arsenal", "Liverpool", "2024-05-01", None),
            ],
        );

        let report = render_report(&config, &dataset).unwrap();

        assert_eq!(
            report.timespan,
            Some(Timespan {
                from_year: 2023,
                to_year: 2024
            })
        );

        let points = report.section("points").unwrap();
        assert_eq!(points.heading, "Points 2023-2024");
        let table: Vec<(&str, f64, &str)> = points
            .chart
            .as_ref()
            .unwrap()
            .points
            .iter()
            .map(|p| (p.x.as_str().unwrap(), p.y, p.hover["count"].as_str()))
            .collect();
        assert_eq!(table, vec![("Arsenal", 6.0, "2"), ("Chelsea", 1.0, "2")]);

        let home = report.section("home-goals").unwrap();
        let goals: Vec<(&str, f64, &str)> = home
            .chart
            .as_ref()
            .unwrap()
            .points
            .iter()
            .map(|p| (p.x.as_str().unwrap(), p.y, p.hover["count"].as_str()))
            .collect();
        assert_eq!(
            goals,
            vec![("Arsenal", 2.0, "2"), ("Chelsea", 1.0, "1"), ("Liverpool", 0.0, "1")]
        );
    }

    #[test]
    fn test_data_bounds_of_empty_dataset() {
        assert!(data_bounds(&Dataset::default()).unwrap().is_none());
    }
}

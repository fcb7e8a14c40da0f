use transfer_story::config::toml_config::{ChartDefinition, ReportConfig};
use transfer_story::core::report::render_report;
use transfer_story::domain::model::{Dataset, Movement, TransferRecord};
use transfer_story::utils::validation::Validate;

const SHIPPED: &str = include_str!("../report.toml");

fn transfer(
    league: &str,
    club: &str,
    season: &str,
    fee: f64,
    movement: Movement,
) -> TransferRecord {
    TransferRecord {
        season: season.to_string(),
        year: season[..4].parse().unwrap(),
        league_name: league.to_string(),
        club_name: club.to_string(),
        player_name: format!("{} signing", club),
        fee: Some(fee),
        movement,
        age: Some(25),
        position: "Central Midfield".to_string(),
    }
}

#[test]
fn test_shipped_definition_is_valid() {
    let config = ReportConfig::from_toml_str(SHIPPED).unwrap();
    config.validate().unwrap();

    assert_eq!(config.sources.transfers.len(), 5);
    assert_eq!(config.thresholds.top_n, 5);
    assert_eq!(config.thresholds.high_value_fee, 50.0);

    let ids: Vec<&str> = config.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "introduction",
            "spending-trend",
            "league-spending",
            "top-earning-clubs",
            "top-spending-clubs",
            "high-value-trends",
            "age-vs-fee",
            "position-spending",
            "conclusion",
        ]
    );

    let narrative_only: Vec<&str> = config
        .sections
        .iter()
        .filter(|s| s.chart.is_none())
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(narrative_only, vec!["introduction", "conclusion"]);

    let top_n_sections = config
        .sections
        .iter()
        .filter(|s| matches!(&s.chart, Some(ChartDefinition::Aggregate(c)) if c.top_n.is_some()))
        .count();
    assert_eq!(top_n_sections, 2);
}

#[test]
fn test_shipped_definition_renders_story() {
    let config = ReportConfig::from_toml_str(SHIPPED).unwrap();
    let dataset = Dataset::new(
        vec![
            transfer("Premier League", "Chelsea FC", "2017/2018", 70.0, Movement::In),
            transfer("Premier League", "Chelsea FC", "2018/2019", 40.0, Movement::Out),
            transfer("Serie A", "Juventus FC", "2018/2019", 117.0, Movement::In),
            transfer("Serie A", "AS Roma", "2017/2018", 20.0, Movement::In),
        ],
        Vec::new(),
    );

    let report = render_report(&config, &dataset).unwrap();

    let trend = report.section("spending-trend").unwrap();
    let chart = trend.chart.as_ref().unwrap();
    assert_eq!(
        chart.category_order,
        Some(vec!["2017/2018".to_string(), "2018/2019".to_string()])
    );
    assert_eq!(chart.y.label, "Total Spending (in Million €)");

    let earning = report.section("top-earning-clubs").unwrap();
    assert_eq!(earning.heading, "Top 5 Earning Clubs in Each League");
    assert_eq!(earning.chart.as_ref().unwrap().points.len(), 1);

    let high_value = report.section("high-value-trends").unwrap();
    assert_eq!(high_value.chart.as_ref().unwrap().points.len(), 2);

    let intro = report.section("introduction").unwrap();
    assert!(intro.narrative.contains("between 2017 and 2018"));
}

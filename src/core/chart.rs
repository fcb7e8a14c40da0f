use crate::config::toml_config::{AggregateChart, PointsChart};
use crate::core::aggregate::{self, AggregatedRow, Measure};
use crate::core::season;
use crate::domain::model::Row;
use crate::domain::report::{Axis, ChartPoint, ChartSpec};
use crate::utils::error::{ReportError, Result};
use std::collections::{BTreeMap, HashMap};

/// Display names carried over from the source datasets' column renames.
pub fn default_label(field: &str) -> String {
    match field {
        "fee_cleaned" => "Transfer Fee in Millions".to_string(),
        "league_name" => "League Name".to_string(),
        "club_name" => "Club Name".to_string(),
        "count" => "Count".to_string(),
        other => other
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn axis(field: &str, labels: &HashMap<String, String>) -> Axis {
    Axis {
        field: field.to_string(),
        label: labels
            .get(field)
            .cloned()
            .unwrap_or_else(|| default_label(field)),
    }
}

/// Bar/line chart over grouped totals. The last group key is the x axis;
/// with two or more keys the first one colours the bars.
pub fn aggregate_chart<'a, R: Row + 'a>(
    records: Vec<&'a R>,
    chart: &AggregateChart,
    title: String,
    default_top_n: usize,
) -> Result<ChartSpec> {
    let Some(x_field) = chart.group_by.last() else {
        return Err(ReportError::MissingConfigError {
            field: "chart.group_by".to_string(),
        });
    };
    let x_index = chart.group_by.len() - 1;
    let colored = chart.group_by.len() > 1;
    // a count measure already is the row count
    let with_count = !matches!(chart.measure, Measure::Count);

    let mut rows = aggregate::group_and_sum(records, &chart.group_by, &chart.measure)?;

    if let Some(top_n) = &chart.top_n {
        let partition = chart
            .group_by
            .iter()
            .position(|k| *k == top_n.partition)
            .unwrap_or(0);
        aggregate::sort_by_partition_then_total(&mut rows, partition, chart.order);
        rows = aggregate::top_n_per_group(
            rows,
            partition,
            top_n.n.unwrap_or(default_top_n),
            chart.order,
        );
    } else if chart.chronological {
        sort_chronologically(&mut rows);
    } else {
        aggregate::sort_rows(&mut rows, chart.order);
    }

    let points: Vec<ChartPoint> = rows
        .into_iter()
        .map(|row| ChartPoint {
            x: serde_json::Value::String(row.key[x_index].clone()),
            y: row.total,
            color: colored.then(|| row.key[0].clone()),
            hover: if with_count {
                BTreeMap::from([("count".to_string(), row.count.to_string())])
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    let category_order = chart.chronological.then(|| {
        let mut labels: Vec<String> = Vec::new();
        for point in &points {
            if let Some(label) = point.x.as_str() {
                if !labels.iter().any(|l| l == label) {
                    labels.push(label.to_string());
                }
            }
        }
        season::sort_seasons(&mut labels);
        labels
    });

    Ok(ChartSpec {
        kind: chart.kind,
        title,
        x: axis(x_field, &chart.labels),
        y: axis(chart.measure.name(), &chart.labels),
        color: colored.then(|| axis(&chart.group_by[0], &chart.labels)),
        hover: if with_count {
            vec![axis("count", &chart.labels)]
        } else {
            Vec::new()
        },
        category_order,
        points,
    })
}

fn sort_chronologically(rows: &mut [AggregatedRow]) {
    rows.sort_by_key(|row| {
        row.key
            .last()
            .and_then(|k| season::chronological_rank(k))
            .unwrap_or(i32::MAX)
    });
}

/// One point per record; records without a numeric y are left out.
pub fn points_chart<'a, R: Row + 'a>(
    records: Vec<&'a R>,
    chart: &PointsChart,
    title: String,
) -> Result<ChartSpec> {
    let records = match &chart.sort_by {
        Some(field) => aggregate::sort_by_field(records, field)?,
        None => records,
    };

    let mut points = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in records {
        let Some(y) = aggregate::numeric(&chart.y, &record.field(&chart.y)?)? else {
            skipped += 1;
            continue;
        };
        let color = match &chart.color {
            Some(field) => {
                let value = record.field(field)?;
                (!value.is_missing()).then(|| value.to_key())
            }
            None => None,
        };
        let mut hover = BTreeMap::new();
        for field in &chart.hover {
            hover.insert(field.clone(), record.field(field)?.to_key());
        }
        points.push(ChartPoint {
            x: record.field(&chart.x)?.to_json(),
            y,
            color,
            hover,
        });
    }
    if skipped > 0 {
        tracing::debug!(skipped, field = %chart.y, "records without a value left out of chart");
    }

    Ok(ChartSpec {
        kind: chart.kind,
        title,
        x: axis(&chart.x, &chart.labels),
        y: axis(&chart.y, &chart.labels),
        color: chart.color.as_deref().map(|c| axis(c, &chart.labels)),
        hover: chart.hover.iter().map(|h| axis(h, &chart.labels)).collect(),
        category_order: chart.category_order.clone(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::SortOrder;
    use crate::config::toml_config::TopN;
    use crate::domain::model::{Movement, TransferRecord};
    use crate::domain::report::ChartKind;

    fn transfer(season: &str, league: &str, club: &str, fee: Option<f64>) -> TransferRecord {
        TransferRecord {
            season: season.to_string(),
            year: season[..4].parse().unwrap(),
            league_name: league.to_string(),
            club_name: club.to_string(),
            player_name: format!("{} signing", club),
            fee,
            movement: Movement::In,
            age: Some(23),
            position: "Left Winger".to_string(),
        }
    }

    fn grouped(group_by: &[&str]) -> AggregateChart {
        AggregateChart {
            kind: ChartKind::Bar,
            title: "t".to_string(),
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            measure: Measure::sum("fee_cleaned"),
            order: SortOrder::Desc,
            top_n: None,
            chronological: false,
            labels: HashMap::new(),
        }
    }

    #[test]
    fn test_default_labels() {
        assert_eq!(default_label("fee_cleaned"), "Transfer Fee in Millions");
        assert_eq!(default_label("player_name"), "Player Name");
        assert_eq!(default_label("goals_against"), "Goals Against");
    }

    #[test]
    fn test_aggregate_chart_sorted_by_total() {
        let records = vec![
            transfer("2016/17", "Serie A", "Juventus", Some(90.0)),
            transfer("2016/17", "Premier League", "Man Utd", Some(105.0)),
            transfer("2016/17", "Serie A", "Napoli", Some(30.0)),
        ];
        let chart = grouped(&["league_name"]);
        let spec = aggregate_chart(records.iter().collect(), &chart, "t".into(), 5).unwrap();

        assert_eq!(spec.x.label, "League Name");
        assert_eq!(spec.y.label, "Transfer Fee in Millions");
        assert!(spec.color.is_none());
        let xs: Vec<&str> = spec.points.iter().filter_map(|p| p.x.as_str()).collect();
        assert_eq!(xs, vec!["Serie A", "Premier League"]);
        assert_eq!(spec.points[0].y, 120.0);
    }

    #[test]
    fn test_aggregate_chart_top_n_colors_by_partition() {
        let records = vec![
            transfer("2016/17", "Serie A", "Juventus", Some(90.0)),
            transfer("2016/17", "Serie A", "Napoli", Some(30.0)),
            transfer("2016/17", "Serie A", "Roma", Some(40.0)),
            transfer("2016/17", "Bundesliga", "Bayern", Some(35.0)),
        ];
        let mut chart = grouped(&["league_name", "club_name"]);
        chart.top_n = Some(TopN {
            partition: "league_name".to_string(),
            n: Some(2),
        });
        let spec = aggregate_chart(records.iter().collect(), &chart, "t".into(), 5).unwrap();

        let points: Vec<(&str, &str)> = spec
            .points
            .iter()
            .map(|p| (p.color.as_deref().unwrap(), p.x.as_str().unwrap()))
            .collect();
        assert_eq!(
            points,
            vec![
                ("Bundesliga", "Bayern"),
                ("Serie A", "Juventus"),
                ("Serie A", "Roma")
            ]
        );
        assert_eq!(spec.color.unwrap().label, "League Name");
    }

    #[test]
    fn test_chronological_line_chart() {
        let records = vec![
            transfer("2018/19", "Serie A", "Juventus", Some(100.0)),
            transfer("2016/17", "Serie A", "Juventus", Some(90.0)),
            transfer("2017/18", "Serie A", "Milan", Some(10.0)),
        ];
        let mut chart = grouped(&["season"]);
        chart.kind = ChartKind::Line;
        chart.chronological = true;
        let spec = aggregate_chart(records.iter().collect(), &chart, "t".into(), 5).unwrap();

        let xs: Vec<&str> = spec.points.iter().filter_map(|p| p.x.as_str()).collect();
        assert_eq!(xs, vec!["2016/17", "2017/18", "2018/19"]);
        assert_eq!(
            spec.category_order.unwrap(),
            vec!["2016/17", "2017/18", "2018/19"]
        );
    }

    #[test]
    fn test_points_chart_skips_missing_values() {
        let records = vec![
            transfer("2017/18", "Ligue 1", "PSG", Some(222.0)),
            transfer("2016/17", "Ligue 1", "Monaco", None),
            transfer("2016/17", "Premier League", "Man Utd", Some(105.0)),
        ];
        let chart = PointsChart {
            kind: ChartKind::Scatter,
            title: "t".to_string(),
            x: "season".to_string(),
            y: "fee_cleaned".to_string(),
            color: Some("league_name".to_string()),
            hover: vec!["player_name".to_string(), "club_name".to_string()],
            sort_by: Some("season".to_string()),
            category_order: None,
            labels: HashMap::from([("season".to_string(), "Season".to_string())]),
        };
        let spec = points_chart(records.iter().collect(), &chart, "t".into()).unwrap();

        assert_eq!(spec.points.len(), 2);
        assert_eq!(spec.points[0].x, serde_json::json!("2016/17"));
        assert_eq!(spec.points[0].hover["club_name"], "Man Utd");
        assert_eq!(spec.points[1].color.as_deref(), Some("Ligue 1"));
        assert_eq!(spec.x.label, "Season");
        assert_eq!(spec.hover.len(), 2);

        let by_position = PointsChart {
            y: "position".to_string(),
            ..chart
        };
        assert!(matches!(
            points_chart(records.iter().collect(), &by_position, "t".into()),
            Err(ReportError::ParseError { ref field, .. }) if field == "position"
        ));
    }
}

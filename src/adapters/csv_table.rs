use crate::domain::model::format_number;
use crate::domain::report::ChartSpec;
use crate::utils::error::Result;

fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.as_f64().map(format_number).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Chart points as a flat table: x, y, then color and hover columns.
pub fn chart_table(chart: &ChartSpec) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![chart.x.field.as_str(), chart.y.field.as_str()];
    if let Some(color) = &chart.color {
        header.push(color.field.as_str());
    }
    header.extend(chart.hover.iter().map(|h| h.field.as_str()));
    writer.write_record(&header)?;

    for point in &chart.points {
        let mut row = vec![json_cell(&point.x), format_number(point.y)];
        if chart.color.is_some() {
            row.push(point.color.clone().unwrap_or_default());
        }
        for axis in &chart.hover {
            row.push(point.hover.get(&axis.field).cloned().unwrap_or_default());
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()).into())
}

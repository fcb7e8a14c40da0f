//! Filter, group, sort and top-N over borrowed records.
//!
//! Every function here is pure: records are only ever borrowed, and the
//! output is rebuilt from scratch on each call.

use crate::domain::model::{Row, Value};
use crate::domain::report::Timespan;
use crate::utils::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One condition of a filter; a filter is the conjunction of its predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Equals { field: String, value: String },
    GreaterThan { field: String, threshold: f64 },
    /// Inclusive on both ends.
    Between { field: String, min: f64, max: f64 },
    OneOf { field: String, values: Vec<String> },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::Equals { field, .. }
            | Predicate::GreaterThan { field, .. }
            | Predicate::Between { field, .. }
            | Predicate::OneOf { field, .. } => field,
        }
    }

    pub fn year_range(timespan: Timespan) -> Self {
        Predicate::Between {
            field: "year".to_string(),
            min: f64::from(timespan.from_year),
            max: f64::from(timespan.to_year),
        }
    }

    /// Missing cells never match. Numeric comparisons on a text column fail.
    pub fn matches<R: Row>(&self, record: &R) -> Result<bool> {
        let value = record.field(self.field())?;
        Ok(match self {
            Predicate::Equals { value: expected, .. } => {
                !value.is_missing() && value.to_key() == *expected
            }
            Predicate::GreaterThan { field, threshold } => {
                numeric(field, &value)?.is_some_and(|n| n > *threshold)
            }
            Predicate::Between { field, min, max } => {
                numeric(field, &value)?.is_some_and(|n| n >= *min && n <= *max)
            }
            Predicate::OneOf { values, .. } => {
                !value.is_missing() && values.contains(&value.to_key())
            }
        })
    }
}

/// Numeric view of a cell: `None` when missing, `ParseError` for text.
pub fn numeric(field: &str, value: &Value<'_>) -> Result<Option<f64>> {
    match value {
        Value::Number(n) => Ok((!n.is_nan()).then_some(*n)),
        Value::Missing => Ok(None),
        Value::Text(text) => Err(ReportError::parse(field, text, "expected a numeric column")),
    }
}

pub fn filter<'a, R, I>(records: I, predicates: &[Predicate]) -> Result<Vec<&'a R>>
where
    R: Row + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut kept = Vec::new();
    for record in records {
        let mut keep = true;
        for predicate in predicates {
            if !predicate.matches(record)? {
                keep = false;
                break;
            }
        }
        if keep {
            kept.push(record);
        }
    }
    Ok(kept)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measure {
    Sum { field: String },
    Count,
}

impl Measure {
    pub fn sum(field: &str) -> Self {
        Measure::Sum {
            field: field.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Measure::Sum { field } => field,
            Measure::Count => "count",
        }
    }

    fn contribution<R: Row>(&self, record: &R) -> Result<Option<f64>> {
        match self {
            Measure::Sum { field } => numeric(field, &record.field(field)?),
            Measure::Count => Ok(Some(1.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub key: Vec<String>,
    pub total: f64,
    /// Rows in the group, including those whose measured value is missing.
    pub count: usize,
}

/// Groups by the tuple of `group_keys` in first-seen order. Missing values
/// add nothing to a sum.
pub fn group_and_sum<'a, R, I, K>(
    records: I,
    group_keys: &[K],
    measure: &Measure,
) -> Result<Vec<AggregatedRow>>
where
    R: Row + 'a,
    I: IntoIterator<Item = &'a R>,
    K: AsRef<str>,
{
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut rows: Vec<AggregatedRow> = Vec::new();

    for record in records {
        let key = group_keys
            .iter()
            .map(|k| record.field(k.as_ref()).map(|v| v.to_key()))
            .collect::<Result<Vec<_>>>()?;
        let contribution = measure.contribution(record)?;

        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(AggregatedRow {
                    key,
                    total: 0.0,
                    count: 0,
                });
                rows.len() - 1
            }
        };

        let row = &mut rows[slot];
        row.count += 1;
        if let Some(value) = contribution {
            row.total += value;
        }
    }

    Ok(rows)
}

/// Stable: equal totals keep their incoming order.
pub fn sort_rows(rows: &mut [AggregatedRow], order: SortOrder) {
    rows.sort_by(|a, b| order.apply(a.total.total_cmp(&b.total)));
}

/// Partition key ascending, then total in `order`.
pub fn sort_by_partition_then_total(
    rows: &mut [AggregatedRow],
    partition: usize,
    order: SortOrder,
) {
    rows.sort_by(|a, b| {
        a.key
            .get(partition)
            .cmp(&b.key.get(partition))
            .then_with(|| order.apply(a.total.total_cmp(&b.total)))
    });
}

/// Keeps the first `n` rows of each partition after sorting it by total.
/// Partitions come out in first-seen order.
pub fn top_n_per_group(
    rows: Vec<AggregatedRow>,
    partition: usize,
    n: usize,
    order: SortOrder,
) -> Vec<AggregatedRow> {
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    let mut partitions: Vec<Vec<AggregatedRow>> = Vec::new();

    for row in rows {
        let key = row.key.get(partition).cloned();
        let slot = *index.entry(key).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push(row);
    }

    partitions
        .into_iter()
        .flat_map(|mut group| {
            sort_rows(&mut group, order);
            group.truncate(n);
            group
        })
        .collect()
}

/// Numbers compare numerically, text lexically; missing sorts last.
pub fn compare_values(a: &Value<'_>, b: &Value<'_>) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Number(_), Value::Text(_)) => Ordering::Less,
        (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        (Value::Missing, Value::Missing) => Ordering::Equal,
        (Value::Missing, _) => Ordering::Greater,
        (_, Value::Missing) => Ordering::Less,
    }
}

/// Stable ascending sort of borrowed records by one column.
pub fn sort_by_field<'a, R: Row>(records: Vec<&'a R>, field: &str) -> Result<Vec<&'a R>> {
    let mut keyed = records
        .into_iter()
        .map(|r| r.field(field).map(|v| (v, r)))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|(a, _), (b, _)| compare_values(a, b));
    Ok(keyed.into_iter().map(|(_, r)| r).collect())
}

/// Sum of a measure over ungrouped records.
pub fn total<'a, R, I>(records: I, measure: &Measure) -> Result<f64>
where
    R: Row + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut sum = 0.0;
    for record in records {
        if let Some(value) = measure.contribution(record)? {
            sum += value;
        }
    }
    Ok(sum)
}

/// Smallest and largest `year` across the records; the default timespan.
pub fn year_bounds<R: Row>(records: &[R]) -> Result<Option<Timespan>> {
    let mut bounds: Option<Timespan> = None;
    for record in records {
        let Some(year) = record.field("year")?.as_number() else {
            continue;
        };
        let year = year as i32;
        bounds = Some(match bounds {
            None => Timespan {
                from_year: year,
                to_year: year,
            },
            Some(span) => Timespan {
                from_year: span.from_year.min(year),
                to_year: span.to_year.max(year),
            },
        });
    }
    Ok(bounds)
}

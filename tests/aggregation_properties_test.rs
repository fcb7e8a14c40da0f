use quickcheck_macros::quickcheck;
use std::collections::HashMap;
use transfer_story::core::aggregate::{self, AggregatedRow, Measure, Predicate, SortOrder};
use transfer_story::domain::model::{Movement, TransferRecord};

const LEAGUES: [&str; 3] = ["Premier League", "Serie A", "Ligue 1"];

/// (league index, club index, incoming, fee) tuples turned into records.
/// Fees are whole numbers so sums are exact in any order.
fn records(raw: &[(u8, u8, bool, Option<u16>)]) -> Vec<TransferRecord> {
    raw.iter()
        .enumerate()
        .map(|(i, &(league, club, incoming, fee))| TransferRecord {
            season: "2019/20".to_string(),
            year: 2019,
            league_name: LEAGUES[league as usize % LEAGUES.len()].to_string(),
            club_name: format!("Club {}", club % 7),
            player_name: format!("Player {}", i),
            fee: fee.map(f64::from),
            movement: if incoming { Movement::In } else { Movement::Out },
            age: None,
            position: "Attack".to_string(),
        })
        .collect()
}

fn movement(direction: &str) -> Predicate {
    Predicate::Equals {
        field: "transfer_movement".to_string(),
        value: direction.to_string(),
    }
}

#[quickcheck]
fn group_totals_conserve_the_filtered_sum(raw: Vec<(u8, u8, bool, Option<u16>)>) -> bool {
    let data = records(&raw);
    let kept = aggregate::filter(&data, &[movement("in")]).unwrap();
    let expected = aggregate::total(kept.iter().copied(), &Measure::sum("fee_cleaned")).unwrap();

    let rows = aggregate::group_and_sum(
        kept,
        &["league_name", "club_name"],
        &Measure::sum("fee_cleaned"),
    )
    .unwrap();
    let grouped: f64 = rows.iter().map(|r| r.total).sum();

    grouped == expected
}

#[quickcheck]
fn counts_cover_every_row(raw: Vec<(u8, u8, bool, Option<u16>)>) -> bool {
    let data = records(&raw);
    let rows = aggregate::group_and_sum(&data, &["league_name"], &Measure::Count).unwrap();
    let counted: usize = rows.iter().map(|r| r.count).sum();
    counted == data.len() && rows.iter().all(|r| r.total == r.count as f64)
}

#[quickcheck]
fn top_n_keeps_min_of_n_and_partition_size(
    raw: Vec<(u8, u8, bool, Option<u16>)>,
    n: u8,
) -> bool {
    let n = usize::from(n % 10);
    let data = records(&raw);
    let rows = aggregate::group_and_sum(
        &data,
        &["league_name", "club_name"],
        &Measure::sum("fee_cleaned"),
    )
    .unwrap();

    let mut sizes: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        *sizes.entry(row.key[0].clone()).or_default() += 1;
    }

    let top = aggregate::top_n_per_group(rows, 0, n, SortOrder::Desc);
    let mut kept: HashMap<String, usize> = HashMap::new();
    for row in &top {
        *kept.entry(row.key[0].clone()).or_default() += 1;
    }

    sizes
        .iter()
        .all(|(league, size)| kept.get(league).copied().unwrap_or(0) == n.min(*size))
}

#[quickcheck]
fn top_n_rows_are_the_largest_of_their_partition(raw: Vec<(u8, u8, bool, Option<u16>)>) -> bool {
    let data = records(&raw);
    let rows = aggregate::group_and_sum(
        &data,
        &["league_name", "club_name"],
        &Measure::sum("fee_cleaned"),
    )
    .unwrap();
    let top = aggregate::top_n_per_group(rows.clone(), 0, 2, SortOrder::Desc);

    top.iter().all(|kept| {
        let beaten = rows
            .iter()
            .filter(|r| r.key[0] == kept.key[0] && r.total > kept.total)
            .count();
        beaten < 2
    })
}

#[quickcheck]
fn movement_filters_partition_the_input(raw: Vec<(u8, u8, bool, Option<u16>)>) -> bool {
    let data = records(&raw);
    let incoming = aggregate::filter(&data, &[movement("in")]).unwrap();
    let outgoing = aggregate::filter(&data, &[movement("out")]).unwrap();

    let disjoint = incoming
        .iter()
        .all(|a| outgoing.iter().all(|b| a.player_name != b.player_name));
    disjoint && incoming.len() + outgoing.len() == data.len()
}

#[quickcheck]
fn sort_rows_is_stable_on_ties(totals: Vec<u8>) -> bool {
    let mut rows: Vec<AggregatedRow> = totals
        .iter()
        .enumerate()
        .map(|(i, &t)| AggregatedRow {
            key: vec![i.to_string()],
            total: f64::from(t % 4),
            count: 1,
        })
        .collect();
    aggregate::sort_rows(&mut rows, SortOrder::Desc);

    rows.windows(2).all(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        let first: usize = a.key[0].parse().unwrap();
        let second: usize = b.key[0].parse().unwrap();
        a.total > b.total || (a.total == b.total && first < second)
    })
}

#[test]
fn test_incoming_spend_per_league() {
    let data = records(&[
        (0, 0, true, Some(60)),
        (0, 1, true, Some(40)),
        (1, 2, false, Some(80)),
    ]);

    let kept = aggregate::filter(&data, &[movement("in")]).unwrap();
    let rows =
        aggregate::group_and_sum(kept, &["league_name"], &Measure::sum("fee_cleaned")).unwrap();

    assert_eq!(
        rows,
        vec![AggregatedRow {
            key: vec!["Premier League".to_string()],
            total: 100.0,
            count: 2,
        }]
    );
}

#[test]
fn test_empty_input_is_empty_output() {
    let data: Vec<TransferRecord> = Vec::new();

    let kept = aggregate::filter(&data, &[movement("in")]).unwrap();
    assert!(kept.is_empty());

    let rows = aggregate::group_and_sum(kept, &["league_name"], &Measure::Count).unwrap();
    assert!(rows.is_empty());
    assert!(aggregate::top_n_per_group(rows, 0, 5, SortOrder::Desc).is_empty());
    assert!(aggregate::year_bounds(&data).unwrap().is_none());
}

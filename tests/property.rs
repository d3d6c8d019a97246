//! Property-based tests for table comparison using proptest

use proptest::prelude::*;
use query_eval::compare::{Comparator, Comparison, RowMatching};
use query_eval::parser::{ExpectedValue, parse_expected};
use query_eval::table::{ActualResult, Table};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

// =========================================================================
// Strategies
// =========================================================================

/// A table with 1-4 distinct columns and 1-5 rows of non-empty alphanumeric cells.
fn arb_table() -> impl Strategy<Value = Table> {
    prop::collection::btree_set("[a-z]{1,6}", 1..5).prop_flat_map(|columns| {
        let width = columns.len();
        prop::collection::vec(prop::collection::vec("[A-Za-z0-9]{1,6}", width), 1..6).prop_map(
            move |rows| {
                let mut table = Table::new(columns.iter().cloned().collect());
                for row in rows {
                    table.push_cells(row.into_iter().map(Some));
                }
                table
            },
        )
    })
}

/// A table plus a shuffled column order and a shuffled row order.
fn arb_permuted_table() -> impl Strategy<Value = (Table, Vec<String>, Vec<usize>)> {
    arb_table().prop_flat_map(|table| {
        let columns = table.columns().to_vec();
        let rows: Vec<usize> = (0..table.row_count()).collect();
        (
            Just(table),
            Just(columns).prop_shuffle(),
            Just(rows).prop_shuffle(),
        )
    })
}

fn rearrange(table: &Table, columns: &[String], rows: &[usize]) -> Table {
    let mut out = Table::new(columns.to_vec());
    for &row in rows {
        out.push_cells(columns.iter().map(|c| table.cell(row, c)));
    }
    out
}

fn to_csv(table: &Table) -> String {
    let mut lines = vec![table.columns().join(",")];
    for row in 0..table.row_count() {
        let cells: Vec<&str> = table
            .columns()
            .iter()
            .map(|c| table.cell(row, c).unwrap_or_default())
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn to_json_columns(table: &Table) -> String {
    let mut map = Map::new();
    for column in table.columns() {
        let values = (0..table.row_count())
            .map(|row| json!(table.cell(row, column)))
            .collect();
        map.insert(column.clone(), Value::Array(values));
    }
    Value::Object(map).to_string()
}

fn to_json_records(table: &Table) -> String {
    let records: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| json!(row))
        .collect();
    Value::Array(records).to_string()
}

fn check(matching: RowMatching, actual: &Table, expected: &Table) -> Comparison {
    Comparator::new(matching).compare(
        &ActualResult::Rows(actual.clone()),
        &ExpectedValue::Table(expected.clone()),
    )
}

// =========================================================================
// Property: row and column order never affect the outcome
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn permuted_table_matches((table, columns, rows) in arb_permuted_table()) {
        let permuted = rearrange(&table, &columns, &rows);
        prop_assert_eq!(check(RowMatching::Multiset, &table, &permuted), Comparison::Match);
        prop_assert_eq!(check(RowMatching::Set, &table, &permuted), Comparison::Match);
        prop_assert_eq!(check(RowMatching::Multiset, &permuted, &table), Comparison::Match);
    }
}

// =========================================================================
// Property: one changed cell always fails
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn single_changed_cell_fails(
        table in arb_table(),
        row in any::<prop::sample::Index>(),
        column in any::<prop::sample::Index>(),
    ) {
        let row = row.index(table.row_count());
        let target = column.get(table.columns()).clone();

        let mut changed = Table::new(table.columns().to_vec());
        for r in 0..table.row_count() {
            changed.push_cells(table.columns().iter().map(|c| {
                let cell = table.cell(r, c).unwrap_or_default().to_string();
                // '#' never appears in generated cells, so the new value is unique
                Some(if r == row && *c == target { format!("{}#", cell) } else { cell })
            }));
        }

        for matching in [RowMatching::Multiset, RowMatching::Set] {
            let result = check(matching, &table, &changed);
            prop_assert!(!result.passed(), "{:?} passed: {}", matching, result);
            prop_assert!(!result.is_warning());
        }
    }
}

// =========================================================================
// Property: CSV and JSON encodings of one table are interchangeable
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn csv_and_json_answers_agree(table in arb_table()) {
        let from_csv = parse_expected(&to_csv(&table));
        let from_columns = parse_expected(&to_json_columns(&table));
        let from_records = parse_expected(&to_json_records(&table));

        prop_assert_eq!(&from_csv, &ExpectedValue::Table(table.clone()));
        prop_assert_eq!(&from_columns, &from_csv);

        let actual = ActualResult::Rows(table);
        let comparator = Comparator::default();
        prop_assert_eq!(comparator.compare(&actual, &from_csv), Comparison::Match);
        prop_assert_eq!(comparator.compare(&actual, &from_columns), Comparison::Match);
        prop_assert_eq!(comparator.compare(&actual, &from_records), Comparison::Match);
    }
}

// =========================================================================
// Property: column cleanup never loses a data column
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn normalized_columns_stay_distinct(
        raw in prop::collection::vec("((orders|users)\\.)?(count|state|total_sale_price)", 1..7),
    ) {
        let row: Vec<Value> = (0..raw.len()).map(|i| json!(i)).collect();
        let result = ActualResult::from_raw(&raw, &[row]);
        let table = result.table().expect("one row is a table");

        let distinct: BTreeSet<&String> = table.columns().iter().collect();
        prop_assert_eq!(table.column_count(), raw.len());
        prop_assert_eq!(distinct.len(), raw.len());

        let values: BTreeSet<String> = table.rows()[0].values().cloned().collect();
        let expected: BTreeSet<String> = (0..raw.len()).map(|i| i.to_string()).collect();
        prop_assert_eq!(values, expected);
    }
}

mod common;

use volley_ingest::aggregate::{aggregate, build_domain, collect_source_files, load_historical};
use volley_ingest::domain::Domain;
use volley_ingest::schema::ColumnKind;
use volley_ingest::table::{Table, Value};

use common::{DataRoot, read_fixture};

fn text_table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::from_records(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| Value::from_cell(c)).collect())
            .collect(),
    )
}

#[test]
fn disjoint_columns_are_unioned_with_nulls() {
    let first = text_table(&["A", "B"], &[&["1", "2"]]);
    let second = text_table(&["B", "C"], &[&["3", "x"]]);
    let combined = aggregate(vec![first, second], None).unwrap();

    assert_eq!(combined.column_names(), vec!["A", "B", "C"]);
    assert_eq!(combined.row_count(), 2);
    assert_eq!(combined.cell(0, "C"), Some(&Value::Null));
    assert_eq!(combined.cell(1, "A"), Some(&Value::Null));
    assert_eq!(combined.cell(1, "B"), Some(&Value::Number(3.0)));
}

#[test]
fn mixed_values_coerce_to_text() {
    let first = text_table(&["K"], &[&["5"], &["7"]]);
    let second = text_table(&["K"], &[&["abc"]]);
    let combined = aggregate(vec![first, second], None).unwrap();
    let column = combined.column("K").unwrap();
    assert_eq!(column.kind, ColumnKind::Text);
    assert_eq!(
        column.values,
        vec![Value::text("5"), Value::text("7"), Value::text("abc")]
    );
}

#[test]
fn source_listing_is_sorted_and_csv_only() {
    let root = DataRoot::new();
    root.write_source(Domain::Athlete, "b.csv", "t\nA\n1\n");
    root.write_source(Domain::Athlete, "a.csv", "t\nA\n1\n");
    root.write_source(Domain::Athlete, "notes.txt", "ignore me");
    let files = collect_source_files(&Domain::Athlete.profile().source_dir(root.path())).unwrap();
    let names = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["a.csv", "b.csv"]);
}

#[test]
fn missing_source_dir_is_empty() {
    let root = DataRoot::new();
    let files = collect_source_files(&root.path().join("Nope")).unwrap();
    assert!(files.is_empty());
}

#[test]
fn historical_overall_renames_mp_and_drops_index() {
    let root = DataRoot::new();
    root.write_historical(Domain::Overall, &read_fixture("historical_overall.csv"));
    let historical = load_historical(root.path(), Domain::Overall.profile()).unwrap();

    assert!(!historical.has_column("Unnamed: 0"));
    assert!(!historical.has_column("MP"));
    assert!(historical.has_column("Matches"));
    assert_eq!(historical.row_count(), 2);
    assert_eq!(historical.cell(0, "season"), Some(&Value::text("Unknown")));
    assert_eq!(
        historical.cell(1, "source_file"),
        Some(&Value::text("historical data"))
    );
}

#[test]
fn historical_rows_come_after_file_rows() {
    let root = DataRoot::new();
    root.write_source(
        Domain::Overall,
        "Team1 vs Team2 Totals Team1 (2024-09-15).csv",
        "title\nMatches,Kills,Digs\n1,14,30\n",
    );
    root.write_historical(Domain::Overall, &read_fixture("historical_overall.csv"));

    let combined = build_domain(root.path(), Domain::Overall.profile()).unwrap();
    assert_eq!(combined.row_count(), 3);
    assert_eq!(
        combined.cell(0, "source_file"),
        Some(&Value::text("Team1 vs Team2 Totals Team1 (2024-09-15).csv"))
    );
    assert_eq!(
        combined.cell(2, "source_file"),
        Some(&Value::text("historical data"))
    );
    // Per-file rows lack Blocks, historical rows lack Digs.
    assert_eq!(combined.cell(0, "Blocks"), Some(&Value::Null));
    assert_eq!(combined.cell(1, "Digs"), Some(&Value::Null));
    assert_eq!(combined.cell(2, "Matches"), Some(&Value::Number(20.0)));
    assert_eq!(combined.column_names().last(), Some(&"source_file"));
}

#[test]
fn bad_file_does_not_sink_the_domain() {
    let root = DataRoot::new();
    root.write_source(Domain::Athlete, "a.csv", "title\nPlayer,Kills\nAna,3\n");
    let bad = Domain::Athlete.profile().source_dir(root.path()).join("b.csv");
    std::fs::write(&bad, [0xffu8, 0xfe, 0x00]).unwrap();

    let combined = build_domain(root.path(), Domain::Athlete.profile()).unwrap();
    assert_eq!(combined.row_count(), 1);
}

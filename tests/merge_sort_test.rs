use lumbung::executor::sort::{RunMerger, SortDirection, read_run, sort_records, write_run};
use lumbung::types::value::DataType;
use tempfile::TempDir;

fn record(id: i64, label: &str) -> Vec<String> {
    vec![id.to_string(), label.to_string()]
}

fn header() -> Vec<String> {
    vec!["id".to_string(), "label".to_string()]
}

fn ids(records: &[Vec<String>]) -> Vec<i64> {
    records
        .iter()
        .map(|record| record[0].parse::<i64>().unwrap())
        .collect()
}

#[test]
fn test_merge_equals_sorted_concatenation() {
    let dir = TempDir::new().unwrap();
    let runs = vec![
        vec![record(1, "a"), record(5, "b"), record(9, "c")],
        vec![record(2, "d"), record(3, "e")],
        vec![record(4, "f"), record(8, "g"), record(10, "h")],
    ];
    let mut paths = Vec::new();
    let mut all: Vec<i64> = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        let path = dir.path().join(format!("run_{i}.csv"));
        write_run(&path, &header(), run).unwrap();
        all.extend(ids(run));
        paths.push(path);
    }
    all.sort();

    let merger = RunMerger::new(dir.path(), "id", DataType::Int, SortDirection::Asc);
    let merged = merger.merge(paths).unwrap();
    let (merged_header, records) = read_run(&merged).unwrap();
    assert_eq!(merged_header, header());
    assert_eq!(ids(&records), all);
}

#[test]
fn test_merge_descending() {
    let dir = TempDir::new().unwrap();
    let first = vec![record(9, "a"), record(4, "b")];
    let second = vec![record(7, "c"), record(1, "d")];
    let path_a = dir.path().join("run_0.csv");
    let path_b = dir.path().join("run_1.csv");
    write_run(&path_a, &header(), &first).unwrap();
    write_run(&path_b, &header(), &second).unwrap();

    let merger = RunMerger::new(dir.path(), "id", DataType::Int, SortDirection::Desc);
    let merged = merger.merge(vec![path_a, path_b]).unwrap();
    let (_, records) = read_run(&merged).unwrap();
    assert_eq!(ids(&records), vec![9, 7, 4, 1]);
}

#[test]
fn test_merge_compares_keys_numerically() {
    let dir = TempDir::new().unwrap();
    // lexicographic comparison would put "10" before "2"
    let first = vec![record(2, "a"), record(30, "b")];
    let second = vec![record(10, "c")];
    let path_a = dir.path().join("run_0.csv");
    let path_b = dir.path().join("run_1.csv");
    write_run(&path_a, &header(), &first).unwrap();
    write_run(&path_b, &header(), &second).unwrap();

    let merger = RunMerger::new(dir.path(), "id", DataType::Int, SortDirection::Asc);
    let merged = merger.merge(vec![path_a, path_b]).unwrap();
    let (_, records) = read_run(&merged).unwrap();
    assert_eq!(ids(&records), vec![2, 10, 30]);
}

#[test]
fn test_single_run_is_returned_as_is() {
    let dir = TempDir::new().unwrap();
    let run = vec![record(1, "a"), record(2, "b")];
    let path = dir.path().join("run_0.csv");
    write_run(&path, &header(), &run).unwrap();

    let merger = RunMerger::new(dir.path(), "id", DataType::Int, SortDirection::Asc);
    let merged = merger.merge(vec![path.clone()]).unwrap();
    assert_eq!(merged, path);
}

#[test]
fn test_no_runs_yield_empty_output() {
    let dir = TempDir::new().unwrap();
    let merger = RunMerger::new(dir.path(), "id", DataType::Int, SortDirection::Asc);
    let merged = merger.merge(Vec::new()).unwrap();
    let (merged_header, records) = read_run(&merged).unwrap();
    assert!(merged_header.is_empty());
    assert!(records.is_empty());
}

#[test]
fn test_odd_run_carries_over_to_next_pass() {
    let dir = TempDir::new().unwrap();
    // five runs force three passes with a carried-over odd run
    let mut paths = Vec::new();
    let mut all = Vec::new();
    for i in 0..5i64 {
        let run = vec![record(i, "x"), record(i + 10, "y"), record(i + 20, "z")];
        let path = dir.path().join(format!("run_{i}.csv"));
        write_run(&path, &header(), &run).unwrap();
        all.extend(ids(&run));
        paths.push(path);
    }
    all.sort();

    let merger = RunMerger::new(dir.path(), "id", DataType::Int, SortDirection::Asc);
    let merged = merger.merge(paths).unwrap();
    let (_, records) = read_run(&merged).unwrap();
    assert_eq!(ids(&records), all);
}

#[test]
fn test_sort_records_orders_by_typed_key() {
    let records = vec![record(10, "a"), record(2, "b"), record(33, "c")];
    let sorted = sort_records(records, 0, DataType::Int, SortDirection::Asc).unwrap();
    assert_eq!(ids(&sorted), vec![2, 10, 33]);

    let records = vec![record(10, "a"), record(2, "b"), record(33, "c")];
    let sorted = sort_records(records, 0, DataType::Int, SortDirection::Desc).unwrap();
    assert_eq!(ids(&sorted), vec![33, 10, 2]);
}

#[test]
fn test_run_round_trip_preserves_fields_with_commas() {
    let dir = TempDir::new().unwrap();
    let run = vec![vec!["1".to_string(), "a,b".to_string()]];
    let path = dir.path().join("run_0.csv");
    write_run(&path, &header(), &run).unwrap();
    let (_, records) = read_run(&path).unwrap();
    assert_eq!(records, run);
}

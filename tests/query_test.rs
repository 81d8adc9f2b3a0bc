use std::collections::HashMap;

use lumbung::executor::condition::{Combine, Filter, FlatCondition};
use lumbung::executor::query::OrderBy;
use lumbung::executor::sort::SortDirection;
use lumbung::storage::schema::ColumnSchema;
use lumbung::storage::storage_manager::StorageManager;
use lumbung::types::error::DatabaseError;
use lumbung::types::value::{DataType, Value};
use lumbung::utils::mock::TempData;

fn employee(name: &str, age: i64, dept: &str) -> HashMap<String, String> {
    HashMap::from([
        ("name".to_string(), name.to_string()),
        ("age".to_string(), age.to_string()),
        ("dept".to_string(), dept.to_string()),
    ])
}

fn setup_employees(storage: &StorageManager) {
    storage
        .create_table(
            "emp",
            vec![
                ColumnSchema::new("name", DataType::Str),
                ColumnSchema::new("age", DataType::Int),
                ColumnSchema::new("dept", DataType::Str),
            ],
            "name",
        )
        .unwrap();
    storage.insert("emp", &employee("Alice", 30, "HR")).unwrap();
    storage.insert("emp", &employee("Bob", 25, "IT")).unwrap();
    storage.insert("emp", &employee("Carol", 35, "HR")).unwrap();
}

fn names(rows: &[Vec<Value>]) -> Vec<String> {
    rows.iter().map(|row| row[0].to_string()).collect()
}

#[test]
fn test_flat_condition_scan_returns_matches_in_page_order() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);

    let filter = Filter::Flat {
        conditions: vec![FlatCondition::parse("age", ">", "28").unwrap()],
        combine: Combine::And,
    };
    let result = storage.execute_query("emp", None, Some(&filter), None).unwrap();
    assert_eq!(names(&result.rows), vec!["Alice", "Carol"]);
}

#[test]
fn test_query_without_conditions_returns_every_live_row() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);
    let result = storage.execute_query("emp", None, None, None).unwrap();
    assert_eq!(result.columns, vec!["name", "age", "dept"]);
    assert_eq!(result.rows.len(), 3);
}

#[test]
fn test_projection_preserves_requested_order() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);
    let columns = vec!["age".to_string(), "name".to_string()];
    let result = storage
        .execute_query("emp", Some(&columns), None, None)
        .unwrap();
    assert_eq!(result.columns, vec!["age", "name"]);
    assert_eq!(
        result.rows[0],
        vec![Value::Int(30), Value::Str("Alice".to_string())]
    );
}

#[test]
fn test_projection_of_unknown_column_fails() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);
    let columns = vec!["salary".to_string()];
    let result = storage.execute_query("emp", Some(&columns), None, None);
    assert!(matches!(
        result,
        Err(DatabaseError::ColumnNotFound { name, .. }) if name == "salary"
    ));
}

#[test]
fn test_nested_condition_scan() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);
    let filter = Filter::Expr("dept == IT OR age >= 35".to_string());
    let result = storage.execute_query("emp", None, Some(&filter), None).unwrap();
    assert_eq!(names(&result.rows), vec!["Bob", "Carol"]);
}

#[test]
fn test_order_by_is_global_across_pages() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    storage
        .create_table(
            "metrics",
            vec![
                ColumnSchema::new("id", DataType::Int),
                ColumnSchema::new("reading", DataType::Int),
            ],
            "id",
        )
        .unwrap();
    // descending insert order puts the smallest readings on the second
    // page; a per-page sort could never produce a global order here
    for i in 0..70i64 {
        storage
            .insert(
                "metrics",
                &HashMap::from([
                    ("id".to_string(), i.to_string()),
                    ("reading".to_string(), (1000 - i).to_string()),
                ]),
            )
            .unwrap();
    }

    let order = OrderBy::new("reading", SortDirection::Asc);
    let result = storage
        .execute_query("metrics", None, None, Some(&order))
        .unwrap();
    assert_eq!(result.rows.len(), 70);
    let readings: Vec<i64> = result
        .rows
        .iter()
        .map(|row| match row[1] {
            Value::Int(reading) => reading,
            _ => panic!("expected integer reading"),
        })
        .collect();
    let mut sorted = readings.clone();
    sorted.sort();
    assert_eq!(readings, sorted);
    assert_eq!(readings.first(), Some(&931));
    assert_eq!(readings.last(), Some(&1000));
}

#[test]
fn test_order_by_descending() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);
    let order = OrderBy::new("age", SortDirection::Desc);
    let result = storage.execute_query("emp", None, None, Some(&order)).unwrap();
    assert_eq!(names(&result.rows), vec!["Carol", "Alice", "Bob"]);
}

#[test]
fn test_order_by_sorts_numerically_not_lexicographically() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    storage
        .create_table(
            "nums",
            vec![ColumnSchema::new("n", DataType::Int)],
            "n",
        )
        .unwrap();
    for n in [10i64, 2, 1, 20] {
        storage
            .insert("nums", &HashMap::from([("n".to_string(), n.to_string())]))
            .unwrap();
    }
    let order = OrderBy::new("n", SortDirection::Asc);
    let result = storage.execute_query("nums", None, None, Some(&order)).unwrap();
    let ns: Vec<String> = result.rows.iter().map(|row| row[0].to_string()).collect();
    // "10" would sort before "2" if the key were compared as text
    assert_eq!(ns, vec!["1", "2", "10", "20"]);
}

#[test]
fn test_order_by_unknown_column_fails() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_employees(&storage);
    let order = OrderBy::new("salary", SortDirection::Asc);
    let result = storage.execute_query("emp", None, None, Some(&order));
    assert!(matches!(result, Err(DatabaseError::ColumnNotFound { .. })));
}

#[test]
fn test_query_on_empty_table_returns_nothing() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    storage
        .create_table(
            "empty",
            vec![ColumnSchema::new("id", DataType::Int)],
            "id",
        )
        .unwrap();
    let result = storage.execute_query("empty", None, None, None).unwrap();
    assert!(result.rows.is_empty());

    let order = OrderBy::new("id", SortDirection::Asc);
    let result = storage.execute_query("empty", None, None, Some(&order)).unwrap();
    assert!(result.rows.is_empty());
}

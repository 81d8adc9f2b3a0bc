use std::collections::HashMap;

use lumbung::executor::condition::Filter;
use lumbung::executor::query::OrderBy;
use lumbung::executor::sort::SortDirection;
use lumbung::storage::schema::ColumnSchema;
use lumbung::storage::storage_manager::StorageManager;
use lumbung::types::error::DatabaseError;
use lumbung::types::value::{DataType, Value};
use lumbung::utils::mock::TempData;

fn setup_emp_dept(storage: &StorageManager) {
    storage
        .create_table(
            "emp",
            vec![
                ColumnSchema::new("name", DataType::Str),
                ColumnSchema::new("dept_id", DataType::Int),
            ],
            "name",
        )
        .unwrap();
    storage
        .create_table(
            "dept",
            vec![
                ColumnSchema::new("id", DataType::Int),
                ColumnSchema::new("name", DataType::Str),
            ],
            "id",
        )
        .unwrap();
    for (name, dept_id) in [("Alice", 1), ("Bob", 2), ("Carol", 1), ("Dan", 3)] {
        storage
            .insert(
                "emp",
                &HashMap::from([
                    ("name".to_string(), name.to_string()),
                    ("dept_id".to_string(), dept_id.to_string()),
                ]),
            )
            .unwrap();
    }
    for (id, name) in [(1, "HR"), (2, "IT")] {
        storage
            .insert(
                "dept",
                &HashMap::from([
                    ("id".to_string(), id.to_string()),
                    ("name".to_string(), name.to_string()),
                ]),
            )
            .unwrap();
    }
}

#[test]
fn test_join_matches_on_typed_equality() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);

    let result = storage
        .execute_join_query("emp", None, None, None, Some("dept"), Some("emp.dept_id==dept.id"))
        .unwrap();
    // Dan has no matching department and drops out of the inner join
    assert_eq!(result.rows.len(), 3);
    assert_eq!(
        result.columns,
        vec!["emp.name", "emp.dept_id", "dept.id", "dept.name"]
    );
    let pairs: Vec<(String, String)> = result
        .rows
        .iter()
        .map(|row| (row[0].to_string(), row[3].to_string()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Alice".to_string(), "HR".to_string()),
            ("Bob".to_string(), "IT".to_string()),
            ("Carol".to_string(), "HR".to_string()),
        ]
    );
}

#[test]
fn test_join_condition_accepts_reversed_table_order() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let result = storage
        .execute_join_query("emp", None, None, None, Some("dept"), Some("dept.id==emp.dept_id"))
        .unwrap();
    assert_eq!(result.rows.len(), 3);
}

#[test]
fn test_join_plain_column_resolves_to_right_table_on_collision() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);

    // both tables carry `name`; the unqualified form picks the right side
    let columns = vec!["name".to_string(), "emp.name".to_string()];
    let result = storage
        .execute_join_query(
            "emp",
            Some(&columns),
            None,
            None,
            Some("dept"),
            Some("emp.dept_id==dept.id"),
        )
        .unwrap();
    assert_eq!(
        result.rows[0],
        vec![Value::Str("HR".to_string()), Value::Str("Alice".to_string())]
    );
}

#[test]
fn test_join_applies_row_conditions_after_matching() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let filter = Filter::Expr("dept.name == HR".to_string());
    let columns = vec!["emp.name".to_string()];
    let result = storage
        .execute_join_query(
            "emp",
            Some(&columns),
            Some(&filter),
            None,
            Some("dept"),
            Some("emp.dept_id==dept.id"),
        )
        .unwrap();
    let names: Vec<String> = result.rows.iter().map(|row| row[0].to_string()).collect();
    assert_eq!(names, vec!["Alice", "Carol"]);
}

#[test]
fn test_ordered_join_merges_runs_across_page_pairs() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    storage
        .create_table(
            "readings",
            vec![
                ColumnSchema::new("id", DataType::Int),
                ColumnSchema::new("sensor", DataType::Int),
                ColumnSchema::new("value", DataType::Int),
            ],
            "id",
        )
        .unwrap();
    storage
        .create_table(
            "sensors",
            vec![
                ColumnSchema::new("sensor", DataType::Int),
                ColumnSchema::new("label", DataType::Str),
            ],
            "sensor",
        )
        .unwrap();
    // 70 readings span two pages, so the join spills two runs per scan
    for i in 0..70i64 {
        storage
            .insert(
                "readings",
                &HashMap::from([
                    ("id".to_string(), i.to_string()),
                    ("sensor".to_string(), "7".to_string()),
                    ("value".to_string(), (500 - i).to_string()),
                ]),
            )
            .unwrap();
    }
    storage
        .insert(
            "sensors",
            &HashMap::from([
                ("sensor".to_string(), "7".to_string()),
                ("label".to_string(), "boiler".to_string()),
            ]),
        )
        .unwrap();

    let order = OrderBy::new("value", SortDirection::Asc);
    let columns = vec!["value".to_string(), "label".to_string()];
    let result = storage
        .execute_join_query(
            "readings",
            Some(&columns),
            None,
            Some(&order),
            Some("sensors"),
            Some("readings.sensor==sensors.sensor"),
        )
        .unwrap();
    assert_eq!(result.rows.len(), 70);
    let values: Vec<i64> = result
        .rows
        .iter()
        .map(|row| match row[0] {
            Value::Int(value) => value,
            _ => panic!("expected integer value"),
        })
        .collect();
    let mut sorted = values.clone();
    sorted.sort();
    assert_eq!(values, sorted);
    assert_eq!(values.first(), Some(&431));
}

#[test]
fn test_ordered_join_descending() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let order = OrderBy::new("emp.name", SortDirection::Desc);
    let columns = vec!["emp.name".to_string()];
    let result = storage
        .execute_join_query(
            "emp",
            Some(&columns),
            None,
            Some(&order),
            Some("dept"),
            Some("emp.dept_id==dept.id"),
        )
        .unwrap();
    let names: Vec<String> = result.rows.iter().map(|row| row[0].to_string()).collect();
    assert_eq!(names, vec!["Carol", "Bob", "Alice"]);
}

#[test]
fn test_join_without_join_table_behaves_as_plain_query() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let result = storage
        .execute_join_query("emp", None, None, None, None, None)
        .unwrap();
    assert_eq!(result.columns, vec!["name", "dept_id"]);
    assert_eq!(result.rows.len(), 4);
}

#[test]
fn test_malformed_join_condition_fails() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let result =
        storage.execute_join_query("emp", None, None, None, Some("dept"), Some("dept_id=id"));
    assert!(matches!(result, Err(DatabaseError::MalformedCondition { .. })));
}

#[test]
fn test_join_condition_naming_unknown_table_fails() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let result = storage.execute_join_query(
        "emp",
        None,
        None,
        None,
        Some("dept"),
        Some("emp.dept_id==ghosts.id"),
    );
    assert!(matches!(
        result,
        Err(DatabaseError::TableNotFound { name }) if name == "ghosts"
    ));
}

#[test]
fn test_join_condition_naming_unknown_column_fails() {
    let temp = TempData::new();
    let storage = temp.storage_manager();
    setup_emp_dept(&storage);
    let result = storage.execute_join_query(
        "emp",
        None,
        None,
        None,
        Some("dept"),
        Some("emp.badge==dept.id"),
    );
    assert!(matches!(
        result,
        Err(DatabaseError::ColumnNotFound { name, .. }) if name == "badge"
    ));
}

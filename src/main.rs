use std::collections::HashMap;
use std::io::Write;

use lumbung::executor::aggregate::AggregateFunction;
use lumbung::executor::condition::Filter;
use lumbung::executor::query::{OrderBy, QueryResult};
use lumbung::executor::sort::SortDirection;
use lumbung::storage::schema::ColumnSchema;
use lumbung::storage::storage_manager::StorageManager;
use lumbung::types::value::DataType;
use rustyline::{DefaultEditor, Result, error::ReadlineError};

fn read_multiline_command(rl: &mut DefaultEditor) -> Result<String> {
    let mut input = String::new();
    let mut prompt = "lumbung> ".to_string();

    loop {
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                let trimmed_line = line.trim_end();

                // Backslash at the end of a line continues the command
                if trimmed_line.ends_with('\\') {
                    let mut line_without_backslash = trimmed_line.to_string();
                    line_without_backslash.pop();
                    input.push_str(&line_without_backslash);
                    input.push(' ');

                    prompt = "      -> ".to_string();
                } else {
                    input.push_str(trimmed_line);
                    break;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Ok(input)
}

fn print_result(result: &QueryResult) {
    println!("-{}-", "-".repeat(result.columns.len() * 3));
    println!("{}", result.columns.join(" | "));
    println!("-{}-", "-".repeat(result.columns.len() * 3));
    for row in &result.rows {
        let rendered: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        println!("{}", rendered.join(" | "));
    }
    println!("\n{} rows.", result.rows.len());
}

fn split_pair(text: &str) -> Option<(&str, &str)> {
    text.split_once('=')
}

struct Shell {
    storage: StorageManager,
}

impl Shell {
    fn run_create(&self, args: &[&str]) {
        // create TABLE COL TYPE [COL TYPE ...] PRIMARY_KEY
        if args.len() < 4 || args.len() % 2 != 0 {
            println!("Usage: create TABLE COL TYPE [COL TYPE ...] PRIMARY_KEY");
            return;
        }
        let table = args[0];
        let primary_key = args[args.len() - 1];
        let mut columns = Vec::new();
        for pair in args[1..args.len() - 1].chunks(2) {
            let Some(data_type) = DataType::from_tag(pair[1]) else {
                println!("Unknown type '{}' (expected int, float, bool, str or char)", pair[1]);
                return;
            };
            columns.push(ColumnSchema::new(pair[0], data_type));
        }
        match self.storage.create_table(table, columns, primary_key) {
            Ok(()) => println!("Table {} created.", table),
            Err(err) => println!("Error creating table: {}", err),
        }
    }

    fn run_insert(&self, args: &[&str]) {
        // insert TABLE COL=VALUE [COL=VALUE ...]
        if args.len() < 2 {
            println!("Usage: insert TABLE COL=VALUE [COL=VALUE ...]");
            return;
        }
        let table = args[0];
        let mut values = HashMap::new();
        for pair in &args[1..] {
            match split_pair(pair) {
                Some((column, value)) => {
                    values.insert(column.to_string(), value.to_string());
                }
                None => {
                    println!("Expected COL=VALUE, got '{}'", pair);
                    return;
                }
            }
        }
        match self.storage.insert(table, &values) {
            Ok(()) => println!("Entry added to table {}.", table),
            Err(err) => println!("Error inserting into table: {}", err),
        }
    }

    fn run_update(&self, args: &[&str]) {
        // update TABLE COL=VALUE NEWCOL=NEWVALUE [...]
        if args.len() < 3 {
            println!("Usage: update TABLE COL=VALUE NEWCOL=NEWVALUE [...]");
            return;
        }
        let table = args[0];
        let Some((column, value)) = split_pair(args[1]) else {
            println!("Expected COL=VALUE, got '{}'", args[1]);
            return;
        };
        let mut values = HashMap::new();
        for pair in &args[2..] {
            match split_pair(pair) {
                Some((new_column, new_value)) => {
                    values.insert(new_column.to_string(), new_value.to_string());
                }
                None => {
                    println!("Expected COL=VALUE, got '{}'", pair);
                    return;
                }
            }
        }
        match self.storage.update(table, column, value, &values) {
            Ok(()) => println!("Entry updated in table {}.", table),
            Err(err) => println!("Error updating table: {}", err),
        }
    }

    fn run_delete(&self, args: &[&str]) {
        // delete TABLE PRIMARY_KEY=VALUE
        if args.len() != 2 {
            println!("Usage: delete TABLE PRIMARY_KEY=VALUE");
            return;
        }
        let Some((column, value)) = split_pair(args[1]) else {
            println!("Expected COL=VALUE, got '{}'", args[1]);
            return;
        };
        match self.storage.delete(args[0], column, value) {
            Ok(()) => println!("Entry deleted from table {}.", args[0]),
            Err(err) => println!("Error deleting from table: {}", err),
        }
    }

    /// get TABLE [COL ...] [where EXPR] [order_by COL ASC|DESC]
    fn run_get(&self, args: &[&str]) {
        if args.is_empty() {
            println!("Usage: get TABLE [COL ...] [where EXPR] [order_by COL ASC|DESC]");
            return;
        }
        let table = args[0];
        let rest = &args[1..];
        let where_at = rest.iter().position(|token| *token == "where");
        let order_at = rest.iter().position(|token| *token == "order_by");

        let columns_end = where_at.or(order_at).unwrap_or(rest.len());
        let columns: Vec<String> = rest[..columns_end].iter().map(|s| s.to_string()).collect();
        let columns = if columns.is_empty() { None } else { Some(columns) };

        let filter = where_at.map(|at| {
            let end = order_at.filter(|order| *order > at).unwrap_or(rest.len());
            Filter::Expr(rest[at + 1..end].join(" "))
        });

        let order_by = match order_at {
            Some(at) => {
                if rest.len() < at + 3 {
                    println!("order_by needs a column and a direction");
                    return;
                }
                match SortDirection::parse(rest[at + 2]) {
                    Ok(direction) => Some(OrderBy::new(rest[at + 1], direction)),
                    Err(err) => {
                        println!("Error: {}", err);
                        return;
                    }
                }
            }
            None => None,
        };

        match self.storage.execute_query(
            table,
            columns.as_deref(),
            filter.as_ref(),
            order_by.as_ref(),
        ) {
            Ok(result) => print_result(&result),
            Err(err) => println!("Error selecting from table: {}", err),
        }
    }

    /// join TABLE JOIN_TABLE TABLE.COL==TABLE.COL [COL ...] [where EXPR]
    /// [order_by COL ASC|DESC]
    fn run_join(&self, args: &[&str]) {
        if args.len() < 3 {
            println!(
                "Usage: join TABLE JOIN_TABLE TABLE.COL==TABLE.COL [COL ...] [where EXPR] [order_by COL ASC|DESC]"
            );
            return;
        }
        let table = args[0];
        let join_table = args[1];
        let join_condition = args[2];
        let rest = &args[3..];
        let where_at = rest.iter().position(|token| *token == "where");
        let order_at = rest.iter().position(|token| *token == "order_by");

        let columns_end = where_at.or(order_at).unwrap_or(rest.len());
        let columns: Vec<String> = rest[..columns_end].iter().map(|s| s.to_string()).collect();
        let columns = if columns.is_empty() { None } else { Some(columns) };

        let filter = where_at.map(|at| {
            let end = order_at.filter(|order| *order > at).unwrap_or(rest.len());
            Filter::Expr(rest[at + 1..end].join(" "))
        });

        let order_by = match order_at {
            Some(at) => {
                if rest.len() < at + 3 {
                    println!("order_by needs a column and a direction");
                    return;
                }
                match SortDirection::parse(rest[at + 2]) {
                    Ok(direction) => Some(OrderBy::new(rest[at + 1], direction)),
                    Err(err) => {
                        println!("Error: {}", err);
                        return;
                    }
                }
            }
            None => None,
        };

        match self.storage.execute_join_query(
            table,
            columns.as_deref(),
            filter.as_ref(),
            order_by.as_ref(),
            Some(join_table),
            Some(join_condition),
        ) {
            Ok(result) => print_result(&result),
            Err(err) => println!("Error joining tables: {}", err),
        }
    }

    fn run_group(&self, args: &[&str]) {
        // group TABLE GROUP_COL SUM|COUNT|MIN|MAX AGG_COL
        if args.len() != 4 {
            println!("Usage: group TABLE GROUP_COL SUM|COUNT|MIN|MAX AGG_COL");
            return;
        }
        let function = match AggregateFunction::parse(args[2]) {
            Ok(function) => function,
            Err(err) => {
                println!("Error: {}", err);
                return;
            }
        };
        match self
            .storage
            .perform_group_by(args[0], args[1], function, args[3])
        {
            Ok(groups) => {
                for (group, value) in &groups {
                    println!("{} | {}", group, value);
                }
                println!("\n{} groups.", groups.len());
            }
            Err(err) => println!("Error grouping table: {}", err),
        }
    }

    fn process_command(&self, command: &str) -> bool {
        let cmd = command.trim();
        let tokens: Vec<&str> = cmd.split_whitespace().collect();

        match tokens.first().map(|t| t.to_lowercase()).as_deref() {
            Some("exit") | Some("quit") | Some("q") => {
                println!("Goodbye!");
                return false;
            }
            Some("help") | Some("h") => {
                println!(
                    r#"
Available commands:
  create TABLE COL TYPE [COL TYPE ...] PRIMARY_KEY
  insert TABLE COL=VALUE [COL=VALUE ...]
  update TABLE COL=VALUE NEWCOL=NEWVALUE [...]
  delete TABLE PRIMARY_KEY=VALUE
  get    TABLE [COL ...] [where EXPR] [order_by COL ASC|DESC]
  join   TABLE JOIN_TABLE TABLE.COL==TABLE.COL [COL ...] [where EXPR] [order_by COL ASC|DESC]
  group  TABLE GROUP_COL SUM|COUNT|MIN|MAX AGG_COL
  exists TABLE
  help, h          - Show this help message
  clear            - Clear the screen
  exit, quit, q    - Exit the database

Use '\' at the end of a line for multiline input.
Use Up/Down arrows to navigate command history.
"#
                );
            }
            Some("clear") => {
                print!("\x1B[2J\x1B[1;1H");
                let _ = std::io::stdout().flush();
            }
            Some("create") => self.run_create(&tokens[1..]),
            Some("insert") => self.run_insert(&tokens[1..]),
            Some("update") => self.run_update(&tokens[1..]),
            Some("delete") => self.run_delete(&tokens[1..]),
            Some("get") => self.run_get(&tokens[1..]),
            Some("join") => self.run_join(&tokens[1..]),
            Some("group") => self.run_group(&tokens[1..]),
            Some("exists") => {
                if let Some(table) = tokens.get(1) {
                    println!("{}", self.storage.check_table_exists(table));
                } else {
                    println!("Usage: exists TABLE");
                }
            }
            None => {
                // Empty command, do nothing
            }
            Some(other) => {
                println!("Unknown command: {}", other);
            }
        }

        true
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let storage = StorageManager::new(&data_dir).expect("Failed to open data directory");
    let shell = Shell { storage };

    println!("LUMBUNG DB");
    println!("Data directory: {}", data_dir);
    println!("Type help or ? to list commands.\n");

    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history("history.txt");

    loop {
        match read_multiline_command(&mut rl) {
            Ok(input) => {
                let command = input.trim().to_string();

                if !command.is_empty() {
                    rl.add_history_entry(&command)?;
                    if !shell.process_command(&command) {
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("EOF");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history("history.txt");
    Ok(())
}

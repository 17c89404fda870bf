//! # Integration Tests for the Database Facade
//!
//! End-to-end tests through the public `Database` API: every call crosses
//! the execution bridge to the worker thread and back, so these tests also
//! exercise request/reply correlation, progress dispatch, and teardown.
//!
//! Expected values are computed independently of the implementation; each
//! test verifies observable behavior only.

use sqldeck::{Database, DbError, ResultSet, Value};
use std::sync::{Arc, Mutex};

fn grid(columns: &[&str], rows: &[Vec<Value>]) -> ResultSet {
    let mut rs = ResultSet::with_columns(columns.iter().map(|c| c.to_string()).collect());
    for row in rows {
        rs.push_row(row.clone());
    }
    rs
}

fn people() -> ResultSet {
    grid(
        &["id", "name"],
        &[
            vec![Value::Real(1.0), Value::Text("Sharon".into())],
            vec![Value::Real(2.0), Value::Text("Rob".into())],
            vec![Value::Real(3.0), Value::Text("Nick".into())],
            vec![Value::Real(4.0), Value::Text("Mihael".into())],
        ],
    )
}

mod load_tests {
    use super::*;

    #[test]
    fn load_without_image_yields_default_name_and_empty_schema() {
        let db = Database::new();
        let meta = db.load_db(None, None).unwrap();

        assert_eq!(meta.name, "database");
        assert!(meta.schema.is_empty());
        assert_eq!(db.name().as_deref(), Some("database"));
    }

    #[test]
    fn load_uses_supplied_name() {
        let db = Database::new();
        let meta = db.load_db(None, Some("inventory.sqlite")).unwrap();
        assert_eq!(meta.name, "inventory.sqlite");
    }

    #[test]
    fn load_corrupt_image_surfaces_engine_error() {
        let db = Database::new();
        let err = db
            .load_db(Some(b"garbage bytes".to_vec()), None)
            .unwrap_err();

        let db_err = err.downcast_ref::<DbError>().expect("typed error source");
        assert!(matches!(db_err, DbError::Engine(_)));
    }

    #[test]
    fn load_replaces_previous_database() {
        let db = Database::new();
        db.execute("CREATE TABLE before(x)").unwrap();

        db.load_db(None, None).unwrap();

        assert!(
            db.execute("SELECT * FROM before").is_err(),
            "load_db SHOULD discard the previous handle"
        );
    }
}

mod execute_tests {
    use super::*;

    #[test]
    fn select_returns_column_oriented_values() {
        let db = Database::new();
        db.execute("CREATE TABLE t(a integer, b text)").unwrap();
        db.execute("INSERT INTO t VALUES (1, 'x'), (2, 'y')").unwrap();

        let rs = db.execute("SELECT a, b FROM t ORDER BY a").unwrap();

        assert_eq!(rs.columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            rs.column("a").unwrap(),
            &[Value::Integer(1), Value::Integer(2)]
        );
        assert_eq!(
            rs.column("b").unwrap(),
            &[Value::Text("x".into()), Value::Text("y".into())]
        );
    }

    #[test]
    fn chained_statements_return_only_the_last_result() {
        let db = Database::new();
        let rs = db.execute("SELECT 1 AS first; SELECT 2 AS second").unwrap();

        assert_eq!(rs.columns, vec!["second".to_string()]);
        assert_eq!(rs.column("second").unwrap(), &[Value::Integer(2)]);
    }

    #[test]
    fn pure_ddl_returns_an_empty_result_set() {
        let db = Database::new();
        let rs = db.execute("CREATE TABLE t(x)").unwrap();
        assert!(rs.columns.is_empty());
        assert_eq!(rs.row_count(), 0);
    }

    #[test]
    fn empty_sql_is_invalid_argument_with_exact_message() {
        let db = Database::new();
        let err = db.execute("").unwrap_err();

        let db_err = err.downcast_ref::<DbError>().expect("typed error source");
        assert_eq!(
            db_err,
            &DbError::InvalidArgument("exec: Missing query string".to_string())
        );
    }

    #[test]
    fn engine_errors_carry_native_message() {
        let db = Database::new();
        let err = db.execute("SELECT * FROM nowhere").unwrap_err();
        assert!(
            format!("{err:#}").contains("nowhere"),
            "error SHOULD carry the engine's message, got: {err:#}"
        );
    }

    #[test]
    fn execute_with_binds_positional_params() {
        let db = Database::new();
        let rs = db
            .execute_with("SELECT ?1 AS tag", &[Value::Integer(9)])
            .unwrap();
        assert_eq!(rs.column("tag").unwrap(), &[Value::Integer(9)]);
    }
}

mod schema_tests {
    use super::*;

    #[test]
    fn refresh_schema_extracts_columns_and_types() {
        let db = Database::new();
        db.load_db(None, None).unwrap();
        db.execute("CREATE TABLE t(a, b integer, c decimal(5,2), d varchar(30))")
            .unwrap();

        db.refresh_schema().unwrap();

        let schema = db.schema().unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "t");
        let cols: Vec<(&str, &str)> = schema[0]
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.decl_type.as_str()))
            .collect();
        assert_eq!(
            cols,
            vec![
                ("a", "N/A"),
                ("b", "integer"),
                ("c", "decimal(5, 2)"),
                ("d", "varchar(30)"),
            ]
        );
    }

    #[test]
    fn virtual_table_with_tokenizer_arguments_is_parsed() {
        let db = Database::new();
        db.load_db(None, None).unwrap();
        db.execute(
            "CREATE VIRTUAL TABLE ft USING fts4(title, body, \
             tokenize=unicode61 \"tokenchars=.+#\")",
        )
        .unwrap();

        db.refresh_schema().unwrap();

        let schema = db.schema().unwrap();
        let ft = schema.iter().find(|t| t.name == "ft").expect("ft present");
        let names: Vec<&str> = ft.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["title", "body"]);
    }

    #[test]
    fn refresh_schema_survives_fts_shadow_tables() {
        // fts modules create shadow tables whose catalog DDL quotes names
        // with single quotes; they must parse like any other table
        let db = Database::new();
        db.load_db(None, None).unwrap();
        db.execute("CREATE VIRTUAL TABLE ft USING fts4(title, body)")
            .unwrap();

        db.refresh_schema().unwrap();

        let schema = db.schema().unwrap();
        let content = schema
            .iter()
            .find(|t| t.name == "ft_content")
            .expect("shadow table present in schema");
        assert!(
            content.columns.iter().any(|c| c.name == "c0title"),
            "shadow columns SHOULD parse, got: {:?}",
            content.columns
        );
    }

    #[test]
    fn schema_excludes_internal_tables() {
        let db = Database::new();
        db.load_db(None, None).unwrap();
        // AUTOINCREMENT creates the internal sqlite_sequence table
        db.execute("CREATE TABLE t(id integer PRIMARY KEY AUTOINCREMENT)")
            .unwrap();
        db.execute("INSERT INTO t VALUES (NULL)").unwrap();

        db.refresh_schema().unwrap();

        let schema = db.schema().unwrap();
        assert!(
            schema.iter().all(|t| !t.name.starts_with("sqlite_")),
            "internal tables SHOULD be excluded, got: {schema:?}"
        );
    }
}

mod import_tests {
    use super::*;

    #[test]
    fn import_round_trips_the_grid() {
        let db = Database::builder().chunk_size(2).build();
        let data = people();

        let meta = db.import_db("people", data.clone(), 0).unwrap();

        assert_eq!(meta.name, "database");
        assert_eq!(meta.schema.len(), 1);
        assert_eq!(meta.schema[0].name, "people");

        let rs = db.execute("SELECT id, name FROM people").unwrap();
        assert_eq!(rs, data, "select SHOULD return exactly the imported grid");
    }

    #[test]
    fn import_reports_progress_to_the_matching_counter() {
        let db = Database::builder().chunk_size(2).build();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let other_seen = Arc::new(Mutex::new(Vec::new()));
        let id = {
            let seen = Arc::clone(&seen);
            db.create_progress_counter(move |pct| seen.lock().unwrap().push(pct))
        };
        let other = {
            let other_seen = Arc::clone(&other_seen);
            db.create_progress_counter(move |pct| other_seen.lock().unwrap().push(pct))
        };

        db.import_db("people", people(), id).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 50, 100]);
        assert!(
            other_seen.lock().unwrap().is_empty(),
            "events SHOULD only reach the counter they are tagged with"
        );

        db.delete_progress_counter(id);
        db.delete_progress_counter(other);
    }

    #[test]
    fn deleted_counter_receives_nothing() {
        let db = Database::builder().chunk_size(2).build();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = {
            let seen = Arc::clone(&seen);
            db.create_progress_counter(move |pct| seen.lock().unwrap().push(pct))
        };
        db.delete_progress_counter(id);

        db.import_db("people", people(), id).unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn import_existing_table_name_fails() {
        let db = Database::new();
        db.execute("CREATE TABLE people(x)").unwrap();

        let err = db.import_db("people", people(), 0).unwrap_err();
        let db_err = err.downcast_ref::<DbError>().expect("typed error source");
        assert!(matches!(db_err, DbError::Engine(_)));
    }

    #[test]
    fn import_updates_cached_schema_alongside_existing_tables() {
        let db = Database::new();
        db.load_db(None, None).unwrap();
        db.execute("CREATE TABLE existing(x integer)").unwrap();

        let meta = db.import_db("fresh", people(), 0).unwrap();

        let names: Vec<&str> = meta.schema.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"existing"));
        assert!(names.contains(&"fresh"));
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn export_before_any_open_is_empty() {
        let db = Database::new();
        assert!(db.export().unwrap().is_empty());
    }

    #[test]
    fn export_import_is_idempotent() {
        let db = Database::new();
        db.execute(
            "CREATE TABLE t(a integer, b text);\
             INSERT INTO t VALUES (1, 'x'), (2, 'y');\
             CREATE TABLE u(c decimal(5,2))",
        )
        .unwrap();
        db.refresh_schema().unwrap();
        let schema_before = db.schema().unwrap();
        let rows_before = db.execute("SELECT a, b FROM t ORDER BY a").unwrap();

        let image = db.export().unwrap();
        let meta = db.load_db(Some(image), Some("restored")).unwrap();

        assert_eq!(meta.schema, schema_before);
        let rows_after = db.execute("SELECT a, b FROM t ORDER BY a").unwrap();
        assert_eq!(rows_after, rows_before);
    }
}

mod table_name_tests {
    use super::*;

    #[test]
    fn validate_accepts_a_clean_name() {
        let db = Database::new();
        db.validate_table_name("clean_name_42").unwrap();
        // validation proves creatability inside a rolled-back transaction
        assert!(
            db.execute("SELECT * FROM clean_name_42").is_err(),
            "validation SHOULD NOT leave the table behind"
        );
    }

    #[test]
    fn validate_rejects_reserved_prefix_symbols_and_leading_digit() {
        let db = Database::new();
        assert!(db.validate_table_name("sqlite_seq").is_err());
        assert!(db.validate_table_name("a b").is_err());
        assert!(db.validate_table_name("1abc").is_err());
    }

    #[test]
    fn validate_rejects_an_existing_table() {
        let db = Database::new();
        db.execute("CREATE TABLE taken(x)").unwrap();
        assert!(db.validate_table_name("taken").is_err());
    }
}

mod teardown_tests {
    use super::*;

    #[test]
    fn shut_down_is_idempotent_and_calls_after_fail() {
        let db = Database::new();
        db.execute("SELECT 1").unwrap();

        db.shut_down();
        db.shut_down();

        let err = db.execute("SELECT 1").unwrap_err();
        let db_err = err.downcast_ref::<DbError>().expect("typed error source");
        assert!(matches!(db_err, DbError::Bridge(_)));
    }
}

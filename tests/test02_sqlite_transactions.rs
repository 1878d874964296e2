use sql_driver::prelude::*;
use tempfile::TempDir;

fn file_params(dir: &TempDir) -> ConnectionParameters {
    ConnectionParameters::new()
        .with("driver", "sqlite")
        .with("path", dir.path().join("tx.db").to_string_lossy().into_owned())
}

fn count(conn: &Connection) -> Result<String, DriverError> {
    conn.query("SELECT COUNT(*) FROM t")?.fetch_text(0)
}

#[test]
fn ordering_rules_are_enforced() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connect(&ConnectionParameters::new().with("driver", "sqlite"))?;

    let err = conn.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    let err = conn.roll_back().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);

    conn.begin_transaction()?;
    assert_eq!(conn.transaction_state(), TransactionState::Active);
    let err = conn.begin_transaction().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    assert_eq!(err.operation(), Operation::BeginTransaction);
    assert_eq!(conn.transaction_state(), TransactionState::Active);

    conn.commit()?;
    assert_eq!(conn.transaction_state(), TransactionState::None);
    Ok(())
}

#[test]
fn commit_and_rollback_are_visible() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connect(&ConnectionParameters::new().with("driver", "sqlite"))?;
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;

    conn.begin_transaction()?;
    conn.exec("INSERT INTO t DEFAULT VALUES")?;
    conn.roll_back()?;
    assert_eq!(count(&conn)?, "0");

    conn.begin_transaction()?;
    conn.exec("INSERT INTO t DEFAULT VALUES")?;
    conn.commit()?;
    assert_eq!(count(&conn)?, "1");
    Ok(())
}

#[test]
fn transactional_commits_or_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connect(&ConnectionParameters::new().with("driver", "sqlite"))?;
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;

    let inserted = conn.transactional(|tx| tx.exec("INSERT INTO t DEFAULT VALUES"))?;
    assert_eq!(inserted, 1);

    let result: Result<(), DriverError> = conn.transactional(|tx| {
        tx.exec("INSERT INTO t DEFAULT VALUES")?;
        tx.exec("INSERT INTO nowhere DEFAULT VALUES")?;
        Ok(())
    });
    assert!(result.is_err());
    assert!(!conn.in_transaction());
    assert_eq!(count(&conn)?, "1");
    Ok(())
}

#[test]
fn dropping_an_active_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let params = file_params(&dir);

    {
        let conn = connect(&params)?;
        conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;
        conn.begin_transaction()?;
        conn.exec("INSERT INTO t DEFAULT VALUES")?;
    }

    let conn = connect(&params)?;
    assert_eq!(count(&conn)?, "0");
    Ok(())
}

#[test]
fn backend_rollback_is_picked_up_after_a_failed_statement() -> Result<(), Box<dyn std::error::Error>>
{
    let conn = connect(&ConnectionParameters::new().with("driver", "sqlite"))?;
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;
    conn.exec("INSERT INTO t (id) VALUES (1)")?;

    conn.begin_transaction()?;
    conn.exec("INSERT INTO t (id) VALUES (2)")?;
    let err = conn
        .exec("INSERT OR ROLLBACK INTO t (id) VALUES (1)")
        .unwrap_err();
    assert_eq!(err.normalized().sql_state(), Some("23000"));
    assert_eq!(conn.transaction_state(), TransactionState::None);

    let err = conn.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);

    conn.begin_transaction()?;
    conn.exec("INSERT INTO t (id) VALUES (3)")?;
    conn.commit()?;
    assert_eq!(count(&conn)?, "2");
    Ok(())
}

#[test]
fn transactional_work_failing_after_backend_rollback_keeps_its_error()
-> Result<(), Box<dyn std::error::Error>> {
    let conn = connect(&ConnectionParameters::new().with("driver", "sqlite"))?;
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)")?;
    conn.exec("INSERT INTO t (id) VALUES (1)")?;

    let err = conn
        .transactional(|conn| {
            let mut stmt = conn.prepare("INSERT OR ROLLBACK INTO t (id) VALUES (?)")?;
            stmt.execute_with(&[RowValues::Int(1)])?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
    assert!(!conn.in_transaction());
    assert_eq!(count(&conn)?, "1");
    Ok(())
}

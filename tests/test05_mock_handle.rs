use sql_driver::prelude::*;
use sql_driver::native::NativeExecution;
use sql_driver::test_utils::{MockReply, mock_connection};
use sql_driver::{DiagnosticRecord, NativeFailure};

#[test]
fn named_sequence_lookup_is_one_parameterised_query() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    probe.push_rows("current_value", vec![RowValues::Int(17)]);

    assert_eq!(conn.last_insert_id(Some("seq1"))?, "17");

    let queries: Vec<_> = probe
        .calls()
        .into_iter()
        .filter(|call| call.method == "query" || call.method == "execute")
        .collect();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].params, vec![RowValues::Text("seq1".into())]);
    assert!(
        !queries[0]
            .sql
            .as_deref()
            .unwrap_or_default()
            .contains("seq1")
    );
    Ok(())
}

#[test]
fn unnamed_lookup_with_no_identity_is_empty() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    probe.push_rows("id", vec![RowValues::Null]);
    assert_eq!(conn.last_insert_id(None)?, "");

    // exhausted result
    assert_eq!(conn.last_insert_id(None)?, "");
    Ok(())
}

#[test]
fn every_diagnostic_record_reaches_the_caller() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    let mut failure = NativeFailure::single(DiagnosticRecord::new(
        Some(547),
        Some("23000"),
        "The INSERT statement conflicted with the FOREIGN KEY constraint",
    ));
    failure.push(DiagnosticRecord::new(
        Some(3621),
        Some("01000"),
        "The statement has been terminated.",
    ));
    probe.push_reply(MockReply::Fail(failure));

    let err = conn.exec("INSERT INTO child (parent_id) VALUES (7)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
    let normalized = err.normalized();
    assert_eq!(normalized.records().len(), 2);
    assert_eq!(normalized.code(), Some(547));
    assert_eq!(normalized.sql_state(), Some("23000"));
    assert!(normalized.message().contains("FOREIGN KEY"));
    assert!(normalized.message().contains("has been terminated"));
}

#[test]
fn undeterminable_row_count_is_an_execution_failure() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    probe.push_reply(MockReply::Execute(NativeExecution::undetermined()));

    let err = conn.exec("UPDATE t SET a = 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
    assert_eq!(err.operation(), Operation::RowsAffected);

    // a zero count is a success
    probe.push_reply(MockReply::Execute(NativeExecution::affected(0)));
    assert_eq!(conn.exec("DELETE FROM t WHERE id = 999").unwrap(), 0);
}

#[test]
fn inserts_update_the_tracked_identity() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    probe.set_generated_id(Some("41"));
    conn.exec("INSERT INTO t (a) VALUES (1)")?;
    assert_eq!(conn.tracked_insert_id().as_deref(), Some("41"));

    conn.exec("UPDATE t SET a = 2")?;
    assert_eq!(probe.count("last_generated_id"), 1);
    Ok(())
}

#[test]
fn failed_native_begin_leaves_no_transaction() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    probe.fail_next("begin", NativeFailure::message("server went away"));

    let err = conn.begin_transaction().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    assert_eq!(conn.transaction_state(), TransactionState::None);

    conn.begin_transaction().unwrap();
    assert!(conn.in_transaction());
}

#[test]
fn drop_rolls_back_and_releases_the_handle() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    conn.begin_transaction().unwrap();
    drop(conn);

    assert_eq!(probe.count("rollback"), 1);
    assert!(probe.is_closed());
}

#[test]
fn close_reports_each_step_once() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    conn.close().unwrap();
    assert_eq!(probe.count("close"), 1);
    assert_eq!(probe.count("rollback"), 0);
}

#[test]
fn strict_mode_failure_fails_the_connection() {
    use sql_driver::test_utils::MockHandle;

    let (handle, probe) = MockHandle::new();
    probe.fail_next("configure_strict", NativeFailure::message("cannot enable"));
    let err = Connection::open(Box::new(handle), ConnectionParameters::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    assert_eq!(err.operation(), Operation::Configure);
}

#[test]
fn session_options_are_applied_after_strict_mode() {
    let params = ConnectionParameters::new().with("lock_timeout", 5000);
    let (_conn, probe) = mock_connection(params);
    let methods: Vec<_> = probe.calls().into_iter().map(|call| call.method).collect();
    assert_eq!(methods, ["configure_strict", "apply_session_option"]);
    assert_eq!(
        probe.calls()[1].sql.as_deref(),
        Some("lock_timeout = 5000")
    );
}

#[test]
fn server_version_prefers_metadata() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    assert_eq!(conn.server_version().unwrap(), "mock 1.0");
    assert!(!conn.requires_query_for_server_version());

    probe.set_server_version(None);
    let err = conn.server_version().unwrap_err();
    assert_eq!(err.operation(), Operation::ServerInfo);
}

#[test]
fn failed_statement_follows_a_backend_rollback() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    conn.begin_transaction().unwrap();

    probe.end_transaction();
    probe.push_reply(MockReply::Fail(NativeFailure::message("deadlock victim")));
    assert!(conn.exec("UPDATE t SET a = 1").is_err());
    assert_eq!(probe.count("in_transaction"), 1);
    assert_eq!(conn.transaction_state(), TransactionState::None);

    conn.begin_transaction().unwrap();
    assert_eq!(probe.count("begin"), 2);
}

#[test]
fn failed_commit_keeps_a_transaction_the_backend_still_holds() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    conn.begin_transaction().unwrap();

    probe.fail_next("commit", NativeFailure::message("log full"));
    let err = conn.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    assert!(conn.in_transaction());

    conn.roll_back().unwrap();
    assert!(!conn.in_transaction());
}

#[test]
fn rows_survive_a_failed_identity_read() {
    let (conn, probe) = mock_connection(ConnectionParameters::new());
    probe.push_rows("id", vec![RowValues::Int(9)]);
    probe.fail_next("last_generated_id", NativeFailure::message("identity unavailable"));

    let mut stmt = conn
        .prepare("INSERT INTO t (a) OUTPUT inserted.id VALUES (1)")
        .unwrap();
    let err = stmt.execute().unwrap_err();
    assert_eq!(err.operation(), Operation::Identity);
    assert_eq!(stmt.state(), StatementState::Executed);
    assert_eq!(stmt.fetch_column(0).unwrap(), Some(RowValues::Int(9)));
}

#[test]
fn passthrough_option_keeps_its_spelling() {
    let params = ConnectionParameters::new().with("Lock_Timeout", 100);
    let (_conn, probe) = mock_connection(params);
    assert_eq!(
        probe.calls()[1].sql.as_deref(),
        Some("Lock_Timeout = 100")
    );
}

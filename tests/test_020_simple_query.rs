
use pgconnect::{BufferFormat, PgError, Session, SessionState, TransactionStatus};
use test_utils::{MockServer, Step};

fn connected_session(server: &MockServer) -> Session {
    let mut session = Session::new();
    session.connect_tcp(server.host(), server.service()).unwrap();
    session.startup("joe", "").unwrap();
    session
}

// cargo test --test test_020_simple_query -- --nocapture
#[test]
fn test_020_select_one_row() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("SELECT 1")));
    let mut reply = test_utils::row_description(&[("?column?", 23, 0)]);
    reply.extend(test_utils::data_row(&[Some(b"1")]));
    reply.extend(test_utils::command_complete("SELECT 1"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("SELECT 1").unwrap();

    assert_eq!(session.state(), SessionState::ReadyForQuery);
    assert_eq!(session.transaction_status(), TransactionStatus::Idle);
    assert_eq!(session.buffer_format(), BufferFormat::Query);

    let field_map = session.field_descriptors();
    assert_eq!(field_map.len(), 1);
    assert_eq!(field_map[0].name(), "?column?");
    assert_eq!(field_map[0].type_oid(), 23);

    assert_eq!(session.row_queue_len(), 1);
    let row = session.pop_row_as_strings().unwrap();
    assert_eq!(row.into_values(), ["1"]);
    assert!(session.row_queue_empty());
    assert!(matches!(
        session.pop_row(),
        Err(PgError::QueueEmpty("row"))
    ));

    assert_eq!(session.pop_notification().unwrap(), ": SELECT 1");
    assert!(session.notification_queue_empty());
    server.finish();
}

#[test]
fn test_020_null_column() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("SELECT NULL, 'x'")));
    let mut reply = test_utils::row_description(&[("a", 25, 0), ("b", 25, 0)]);
    reply.extend(test_utils::data_row(&[None, Some(b"x")]));
    reply.extend(test_utils::command_complete("SELECT 1"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("SELECT NULL, 'x'").unwrap();

    let row = session.pop_row_as_strings().unwrap();
    assert_eq!(row.into_values(), ["", "x"]);
    server.finish();
}

#[test]
fn test_020_interleaved_notice() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("SELECT 1")));
    let mut reply = test_utils::row_description(&[("?column?", 23, 0)]);
    reply.extend(test_utils::notice_response("NOTICE", "hint"));
    reply.extend(test_utils::data_row(&[Some(b"1")]));
    reply.extend(test_utils::command_complete("SELECT 1"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("SELECT 1").unwrap();

    // notifications keep arrival order, the row projection is unaffected
    assert_eq!(session.pop_notification().unwrap(), "NOTICE: hint");
    assert_eq!(session.pop_notification().unwrap(), ": SELECT 1");
    let row = session.pop_row_as_strings().unwrap();
    assert_eq!(row.into_values(), ["1"]);
    server.finish();
}

#[test]
fn test_020_asynchronous_notification() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("LISTEN tick")));
    let mut reply = test_utils::command_complete("LISTEN");
    reply.extend(test_utils::notification_response("", "tick"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("LISTEN tick").unwrap();

    assert_eq!(session.pop_notification().unwrap(), ": LISTEN");
    assert_eq!(session.pop_notification().unwrap(), ": tick");
    server.finish();
}

#[test]
fn test_020_parameter_status_upsert() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("SET application_name = 'one'")));
    let mut reply = test_utils::parameter_status("application_name", "one");
    reply.extend(test_utils::command_complete("SET"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    steps.push(Step::Expect(test_utils::query_request("SET application_name = 'two'")));
    let mut reply = test_utils::parameter_status("application_name", "two");
    reply.extend(test_utils::command_complete("SET"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("SET application_name = 'one'").unwrap();
    assert_eq!(session.parameter("application_name"), Some("one"));

    // a later broadcast wins
    session.query("SET application_name = 'two'").unwrap();
    assert_eq!(session.parameter("application_name"), Some("two"));
    assert!(session.parameters().any(|(k, _)| k == "server_version"));
    server.finish();
}

#[test]
fn test_020_row_description_replaces_field_map_and_rows() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("SELECT a; SELECT b")));
    let mut reply = test_utils::row_description(&[("a", 25, 0)]);
    reply.extend(test_utils::data_row(&[Some(b"stale")]));
    reply.extend(test_utils::command_complete("SELECT 1"));
    reply.extend(test_utils::row_description(&[("b", 25, 0)]));
    reply.extend(test_utils::data_row(&[Some(b"fresh")]));
    reply.extend(test_utils::command_complete("SELECT 1"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("SELECT a; SELECT b").unwrap();

    // the second RowDescription emptied the queue and replaced the field map
    assert_eq!(session.row_queue_len(), 1);
    assert_eq!(session.field_descriptors()[0].name(), "b");
    let row = session.pop_row_as_strings().unwrap();
    assert_eq!(row.into_values(), ["fresh"]);
    server.finish();
}

#[test]
fn test_020_empty_query() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("")));
    let mut reply = test_utils::empty_query_response();
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("").unwrap();
    assert_eq!(session.pop_notification().unwrap(), "[Empty request]");
    server.finish();
}

#[test]
fn test_020_unknown_message_code_is_fatal() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("SELECT 1")));
    steps.push(Step::Send(test_utils::msg(b'!', b"surprise")));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    let err = session.query("SELECT 1").unwrap_err();
    assert!(matches!(err, PgError::UnknownMessageCode(b'!')));
    assert_eq!(session.state(), SessionState::NotConnected);
    assert!(!session.is_connected());
    server.finish();
}

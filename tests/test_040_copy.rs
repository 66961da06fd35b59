
use pgconnect::{BufferFormat, PgError, Session, SessionState};
use test_utils::{MockServer, Step};

fn connected_session(server: &MockServer) -> Session {
    let mut session = Session::new();
    session.connect_tcp(server.host(), server.service()).unwrap();
    session.startup("joe", "").unwrap();
    session
}

// cargo test --test test_040_copy -- --nocapture
#[test]
fn test_040_copy_in() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("COPY t FROM STDIN")));
    steps.push(Step::Send(test_utils::copy_in_response(false, 2)));
    steps.push(Step::Expect(test_utils::copy_data_request(b"a\tb\n")));
    steps.push(Step::Expect(test_utils::copy_done_request()));
    let mut reply = test_utils::command_complete("COPY 1");
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);

    // the reply loop suspends as soon as the server asks for input
    session.query("COPY t FROM STDIN").unwrap();
    assert_eq!(session.state(), SessionState::CopyIn);
    assert_eq!(session.buffer_format(), BufferFormat::CopyText);

    // while copying in, other operations stay rejected
    assert!(matches!(
        session.query("SELECT 1"),
        Err(PgError::InvalidState {
            operation: "query",
            state: SessionState::CopyIn,
        })
    ));

    session.copy_data(b"a\tb\n").unwrap();
    assert_eq!(session.state(), SessionState::CopyIn);
    session.copy_done().unwrap();
    assert_eq!(session.state(), SessionState::ReadyForQuery);
    assert_eq!(session.pop_notification().unwrap(), ": COPY 1");
    server.finish();
}

#[test]
fn test_040_copy_fail() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("COPY t FROM STDIN")));
    steps.push(Step::Send(test_utils::copy_in_response(false, 1)));
    steps.push(Step::Expect(test_utils::copy_fail_request("broken input")));
    let mut reply =
        test_utils::error_response("ERROR", "COPY from stdin failed: broken input");
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("COPY t FROM STDIN").unwrap();
    session.copy_fail("broken input").unwrap();

    assert_eq!(session.state(), SessionState::ReadyForQuery);
    assert_eq!(
        session.pop_notification().unwrap(),
        "ERROR: COPY from stdin failed: broken input"
    );
    server.finish();
}

#[test]
fn test_040_copy_out() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request("COPY t TO STDOUT")));
    let mut reply = test_utils::copy_out_response(false, 2);
    reply.extend(test_utils::copy_data(b"1\tx\n"));
    reply.extend(test_utils::copy_data(b"2\ty\n"));
    reply.extend(test_utils::copy_done());
    reply.extend(test_utils::command_complete("COPY 2"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("COPY t TO STDOUT").unwrap();

    // the full reply loop drains the copy stream
    assert_eq!(session.state(), SessionState::ReadyForQuery);
    assert_eq!(session.buffer_format(), BufferFormat::CopyText);
    assert_eq!(session.row_queue_len(), 2);
    assert_eq!(
        session.pop_row_as_strings().unwrap().into_values(),
        ["1\tx\n"]
    );
    assert_eq!(session.pop_row().unwrap(), b"2\ty\n");
    assert_eq!(session.pop_notification().unwrap(), ": COPY 2");
    server.finish();
}

#[test]
fn test_040_copy_out_binary() {
    test_utils::init_logger();

    let mut steps = test_utils::startup_steps("joe", "joe");
    steps.push(Step::Expect(test_utils::query_request(
        "COPY t TO STDOUT (FORMAT binary)",
    )));
    let mut reply = test_utils::copy_out_response(true, 1);
    reply.extend(test_utils::copy_data(b"PGCOPY\n\xff\r\n\0chunk"));
    reply.extend(test_utils::copy_done());
    reply.extend(test_utils::command_complete("COPY 1"));
    reply.extend(test_utils::ready_for_query(b'I'));
    steps.push(Step::Send(reply));
    let server = MockServer::start(steps);

    let mut session = connected_session(&server);
    session.query("COPY t TO STDOUT (FORMAT binary)").unwrap();

    assert_eq!(session.buffer_format(), BufferFormat::CopyBinary);
    // binary chunks are rendered printable-filtered
    assert_eq!(
        session.pop_row_as_strings().unwrap().into_values(),
        ["PGCOPY.....chunk"]
    );
    server.finish();
}

#[test]
fn test_040_copy_guards() {
    test_utils::init_logger();

    let server = MockServer::start(test_utils::startup_steps("joe", "joe"));
    let mut session = connected_session(&server);

    // the COPY operations require an active COPY-in stream
    assert!(matches!(
        session.copy_data(b"a\n"),
        Err(PgError::InvalidState {
            operation: "copy_data",
            state: SessionState::ReadyForQuery,
        })
    ));
    assert!(matches!(
        session.copy_done(),
        Err(PgError::InvalidState { .. })
    ));
    assert!(matches!(
        session.copy_fail("nope"),
        Err(PgError::InvalidState { .. })
    ));
    server.finish();
}

use crate::{
    conn::{BackendKey, BufferFormat, ConnectParams, SessionState, TcpClient, TransactionStatus},
    protocol::{
        parts::{RowDescription, ServerNotice},
        Request, ServerMessage,
    },
    row::Row,
    PgError, PgResult,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

/// A synchronous session with a PostgreSQL server.
///
/// The session owns the transport and drives the frontend/backend dialog:
/// it sends one client message and then drains the server's reply stream,
/// classifying each message, until the server is ready for the next client
/// message — or, for `COPY ... FROM STDIN`, until the server asks the client
/// to stream data.
///
/// Result rows and COPY chunks are collected as raw buffers in the row
/// queue; notices, errors, notifications and command tags are collected as
/// formatted strings in the notification queue. A server error does not
/// appear as an `Err` return: it is pushed to the notification queue, the
/// reply loop waits for the trailing `ReadyForQuery`, and the session stays
/// usable (check [`transaction_status`](Self::transaction_status)).
///
/// Only trust-mode ("no authentication") connections are supported.
///
/// # Example
///
/// ```rust,no_run
/// use pgconnect::{ConnectParams, PgResult, Session};
/// # fn main() -> PgResult<()> {
/// let mut session = Session::new();
/// session.connect(ConnectParams::tcp("localhost", "5432"))?;
/// session.startup("joe", "")?;
/// session.query("SELECT version()")?;
/// while !session.row_queue_empty() {
///     println!("{}", session.pop_row_as_strings()?);
/// }
/// while !session.notification_queue_empty() {
///     println!("{}", session.pop_notification()?);
/// }
/// # Ok(())
/// # }
/// ```
///
/// The session is not thread-safe; at most one caller may drive it at a
/// time. On drop it sends a best-effort `Terminate` and closes the
/// transport, suppressing all errors.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    transaction_status: TransactionStatus,
    buffer_format: BufferFormat,
    backend_key: Option<BackendKey>,
    field_map: Arc<RowDescription>,
    row_queue: VecDeque<Vec<u8>>,
    notifications: VecDeque<String>,
    parameters: HashMap<String, String>,
    tcp_client: Option<TcpClient>,
}

impl Session {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::NotConnected,
            transaction_status: TransactionStatus::default(),
            buffer_format: BufferFormat::default(),
            backend_key: None,
            field_map: Arc::new(RowDescription::default()),
            row_queue: VecDeque::new(),
            notifications: VecDeque::new(),
            parameters: HashMap::new(),
            tcp_client: None,
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// Opens the transport described by the given parameters.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` unless the session is `NotConnected`;
    /// `PgError::Io` if the endpoint does not accept.
    pub fn connect(&mut self, params: ConnectParams) -> PgResult<()> {
        self.check_state("connect", &[SessionState::NotConnected])?;
        self.transaction_status = TransactionStatus::default();
        self.buffer_format = BufferFormat::default();
        self.backend_key = None;
        self.field_map = Arc::new(RowDescription::default());
        self.row_queue.clear();
        self.notifications.clear();
        self.parameters.clear();
        self.tcp_client = Some(TcpClient::try_new(params)?);
        self.state = SessionState::NotStarted;
        Ok(())
    }

    /// Connects over TCP to `<host>:<service>`.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub fn connect_tcp(&mut self, host: &str, service: &str) -> PgResult<()> {
        self.connect(ConnectParams::tcp(host, service))
    }

    /// Connects to a server on the local machine through its Unix-domain
    /// socket file `<dir>/<prefix><port>`.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub fn connect_local(&mut self, port: &str, dir: &str, prefix: &str) -> PgResult<()> {
        self.connect(ConnectParams::local(port, dir, prefix))
    }

    /// Initiates the dialog with the server. The parameter table is reset.
    /// All replies are processed until the server is ready to accept input.
    ///
    /// If `database` is empty, the user name doubles as database name.
    ///
    /// Returns true if the server is ready to accept input.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` unless startup is the next expected step;
    /// `PgError::AuthenticationNotSupported` if the server asks for more
    /// than trust authentication; transport and framing errors.
    pub fn startup(&mut self, user: &str, database: &str) -> PgResult<bool> {
        self.check_state("startup", &[SessionState::NotStarted])?;
        debug!("startup(): user {user:?}, database {database:?}");
        self.parameters.clear();
        self.fatally(|session| {
            session.send(&Request::Startup { user, database })?;
            session.process_until_ready()
        })?;
        Ok(self.state == SessionState::ReadyForQuery)
    }

    /// Sends the terminate message and closes the transport.
    ///
    /// The session ends up `NotConnected` even if sending fails.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` if no transport is open; `PgError::Io` if the
    /// terminate message cannot be written.
    pub fn terminate(&mut self) -> PgResult<()> {
        if self.state == SessionState::NotConnected {
            return Err(PgError::InvalidState {
                operation: "terminate",
                state: self.state,
            });
        }
        let result = self.send(&Request::Terminate);
        self.tcp_client = None;
        self.state = SessionState::NotConnected;
        result
    }

    // ---- queries ---------------------------------------------------------

    /// Transmits an SQL string and processes all replies, until the server
    /// is again ready for input or — for `COPY ... FROM STDIN` — expects
    /// data from the client.
    ///
    /// Afterwards the session is `ReadyForQuery` or `CopyIn`; result rows
    /// and COPY-out chunks are in the row queue, notices and command tags in
    /// the notification queue.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` unless the session is `ReadyForQuery`;
    /// transport and framing errors (fatal). A server-side SQL error is not
    /// an `Err`: it lands in the notification queue.
    pub fn query(&mut self, sql: &str) -> PgResult<()> {
        self.check_state("query", &[SessionState::ReadyForQuery])?;
        debug!("query(): {sql:?}");
        self.fatally(|session| {
            session.send(&Request::Query(sql))?;
            session.state = SessionState::InQuery;
            session.process_until_ready()
        })
    }

    /// Like [`query`](Self::query), but pauses the reply stream as soon as
    /// one data row was enqueued; the remaining rows are pulled one at a
    /// time with [`fetch_row`](Self::fetch_row).
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn query_paced(&mut self, sql: &str) -> PgResult<()> {
        self.check_state("query_paced", &[SessionState::ReadyForQuery])?;
        debug!("query_paced(): {sql:?}");
        self.fatally(|session| {
            session.send(&Request::Query(sql))?;
            session.state = SessionState::InQuery;
            session.process_until_data().map(|_| ())
        })
    }

    /// Processes replies until the next data row was enqueued or the server
    /// became ready. Returns false once the session is `ReadyForQuery`, i.e.
    /// when no further data is pending.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` while the server waits for COPY-in data or
    /// before startup; transport and framing errors (fatal).
    pub fn fetch_row(&mut self) -> PgResult<bool> {
        self.check_state(
            "fetch_row",
            &[
                SessionState::ReadyForQuery,
                SessionState::InQuery,
                SessionState::CopyOut,
                SessionState::CopyDone,
                SessionState::Complete,
            ],
        )?;
        if self.state == SessionState::ReadyForQuery {
            return Ok(false);
        }
        self.fatally(Self::process_until_data)?;
        Ok(self.state != SessionState::ReadyForQuery)
    }

    /// Processes all pending replies without enqueuing data buffers, then
    /// clears the row queue. Notices, parameter updates etc. are still
    /// processed.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` before startup or while the server waits for
    /// COPY-in data; transport and framing errors (fatal).
    pub fn discard_pending(&mut self) -> PgResult<()> {
        self.check_state(
            "discard_pending",
            &[
                SessionState::ReadyForQuery,
                SessionState::InQuery,
                SessionState::CopyOut,
                SessionState::CopyDone,
                SessionState::Complete,
            ],
        )?;
        self.fatally(|session| {
            while session.state != SessionState::ReadyForQuery
                && session.state != SessionState::CopyIn
            {
                match session.read_message()? {
                    ServerMessage::DataRow(_) | ServerMessage::CopyData(_) => {}
                    msg => {
                        session.dispatch(msg)?;
                    }
                }
            }
            Ok(())
        })?;
        self.row_queue.clear();
        Ok(())
    }

    // ---- the COPY sub-protocol ------------------------------------------

    /// Streams one chunk of COPY-in payload to the server.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` unless the session is `CopyIn`; transport
    /// errors (fatal).
    pub fn copy_data(&mut self, bytes: &[u8]) -> PgResult<()> {
        self.check_state("copy_data", &[SessionState::CopyIn])?;
        self.fatally(|session| session.send(&Request::CopyData(bytes)))
    }

    /// Finishes the COPY-in stream and processes the replies until the
    /// server is again ready for input.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` unless the session is `CopyIn`; transport and
    /// framing errors (fatal).
    pub fn copy_done(&mut self) -> PgResult<()> {
        self.check_state("copy_done", &[SessionState::CopyIn])?;
        self.fatally(|session| {
            session.send(&Request::CopyDone)?;
            session.state = SessionState::InQuery;
            session.process_until_ready()
        })
    }

    /// Aborts the COPY-in stream with the given reason and processes the
    /// replies until the server is again ready for input. The server answers
    /// with an error notice that lands in the notification queue.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` unless the session is `CopyIn`; transport and
    /// framing errors (fatal).
    pub fn copy_fail(&mut self, reason: &str) -> PgResult<()> {
        self.check_state("copy_fail", &[SessionState::CopyIn])?;
        self.fatally(|session| {
            session.send(&Request::CopyFail(reason))?;
            session.state = SessionState::InQuery;
            session.process_until_ready()
        })
    }

    // ---- out-of-band messages -------------------------------------------

    /// Sends the sync message. No reply is awaited; the session state is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` before startup; transport errors (fatal).
    pub fn sync(&mut self) -> PgResult<()> {
        self.check_post_startup("sync")?;
        self.fatally(|session| session.send(&Request::Sync))
    }

    /// Sends the flush message. No reply is awaited; the session state is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` before startup; transport errors (fatal).
    pub fn flush(&mut self) -> PgResult<()> {
        self.check_post_startup("flush")?;
        self.fatally(|session| session.send(&Request::Flush))
    }

    /// Asks the server to cancel the in-flight request.
    ///
    /// The cancel packet carries the `(pid, secret_key)` pair captured
    /// during startup and is written on a transient second connection to the
    /// same endpoint; the current session's transport is never touched. The
    /// server may ignore the request; if it honors it, the running query
    /// terminates with an error notice followed by the usual
    /// `ReadyForQuery`, which the session drains as for any failed query.
    ///
    /// # Errors
    ///
    /// `PgError::InvalidState` before startup; `PgError::Usage` if the
    /// server never sent its key data; `PgError::Io` if the second
    /// connection fails (the session itself remains intact).
    pub fn cancel(&self) -> PgResult<()> {
        self.check_post_startup("cancel")?;
        let Some(BackendKey { pid, secret_key }) = self.backend_key else {
            return Err(PgError::Usage("the server did not send backend key data"));
        };
        let params = self
            .tcp_client
            .as_ref()
            .ok_or(PgError::Usage("session is not connected"))?
            .connect_params()
            .clone();
        debug!("cancel(): for pid {pid} on a second connection to {params}");
        let mut client = TcpClient::try_new(params)?;
        Request::Cancel { pid, secret_key }.emit(client.writer())
        // dropping the client closes the transient connection
    }

    // ---- accessors -------------------------------------------------------

    /// The current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The transaction status from the most recent `ReadyForQuery`.
    #[must_use]
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// The layout of the buffers currently in the row queue.
    #[must_use]
    pub fn buffer_format(&self) -> BufferFormat {
        self.buffer_format
    }

    /// True while a transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.tcp_client.is_some()
    }

    /// The server process id captured during startup.
    #[must_use]
    pub fn backend_pid(&self) -> Option<u32> {
        self.backend_key.map(|k| k.pid)
    }

    /// The value of a run-time parameter the server has reported.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Iterates over all reported run-time parameters.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The field descriptions of the current query result.
    #[must_use]
    pub fn field_descriptors(&self) -> &RowDescription {
        &self.field_map
    }

    // ---- the row queue ---------------------------------------------------

    /// False if rows are enqueued.
    #[must_use]
    pub fn row_queue_empty(&self) -> bool {
        self.row_queue.is_empty()
    }

    /// Number of enqueued rows.
    #[must_use]
    pub fn row_queue_len(&self) -> usize {
        self.row_queue.len()
    }

    /// The raw buffer at the front of the row queue.
    #[must_use]
    pub fn peek_row(&self) -> Option<&[u8]> {
        self.row_queue.front().map(Vec::as_slice)
    }

    /// Removes and returns the raw buffer at the front of the row queue.
    ///
    /// # Errors
    ///
    /// `PgError::QueueEmpty` if no row is enqueued.
    pub fn pop_row(&mut self) -> PgResult<Vec<u8>> {
        self.row_queue
            .pop_front()
            .ok_or(PgError::QueueEmpty("row"))
    }

    /// Removes the row at the front of the row queue and projects it into
    /// strings, using the current buffer format and field descriptions. See
    /// [`Row`] for the projection policy.
    ///
    /// # Errors
    ///
    /// `PgError::QueueEmpty` if no row is enqueued;
    /// `PgError::NoBufferFormat` if no buffer format is established;
    /// `PgError::MalformedFrame` if the buffer contradicts the field
    /// descriptions (the row stays enqueued).
    pub fn pop_row_as_strings(&mut self) -> PgResult<Row> {
        let raw = self.row_queue.front().ok_or(PgError::QueueEmpty("row"))?;
        let row = Row::project(self.buffer_format, raw, &self.field_map)?;
        self.row_queue.pop_front();
        Ok(row)
    }

    /// Removes all rows from the row queue.
    pub fn clear_row_queue(&mut self) {
        self.row_queue.clear();
    }

    // ---- the notification queue -----------------------------------------

    /// False if notifications are enqueued.
    #[must_use]
    pub fn notification_queue_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Number of enqueued notifications.
    #[must_use]
    pub fn notification_queue_len(&self) -> usize {
        self.notifications.len()
    }

    /// The string at the front of the notification queue.
    #[must_use]
    pub fn peek_notification(&self) -> Option<&str> {
        self.notifications.front().map(String::as_str)
    }

    /// Removes and returns the string at the front of the notification
    /// queue.
    ///
    /// # Errors
    ///
    /// `PgError::QueueEmpty` if no notification is enqueued.
    pub fn pop_notification(&mut self) -> PgResult<String> {
        self.notifications
            .pop_front()
            .ok_or(PgError::QueueEmpty("notification"))
    }

    /// Removes all strings from the notification queue.
    pub fn clear_notification_queue(&mut self) {
        self.notifications.clear();
    }

    // ---- the reply loop --------------------------------------------------

    // Frame and dispatch one message at a time, until the server is ready
    // for the next client message. The CopyIn early-exit is essential: the
    // server sends nothing further until the client streams data.
    fn process_until_ready(&mut self) -> PgResult<()> {
        while self.state != SessionState::ReadyForQuery && self.state != SessionState::CopyIn {
            let msg = self.read_message()?;
            self.dispatch(msg)?;
        }
        Ok(())
    }

    // Like process_until_ready, but additionally stops once one data buffer
    // was enqueued.
    fn process_until_data(&mut self) -> PgResult<()> {
        while self.state != SessionState::ReadyForQuery && self.state != SessionState::CopyIn {
            let msg = self.read_message()?;
            if self.dispatch(msg)? {
                break;
            }
        }
        Ok(())
    }

    fn read_message(&mut self) -> PgResult<ServerMessage> {
        let tcp_client = self
            .tcp_client
            .as_mut()
            .ok_or(PgError::Usage("session is not connected"))?;
        ServerMessage::parse(tcp_client.reader())
    }

    // Applies one server message to the session state. Returns true if a
    // data buffer was enqueued.
    fn dispatch(&mut self, msg: ServerMessage) -> PgResult<bool> {
        match msg {
            ServerMessage::Authentication { mode } => {
                if mode != 0 {
                    return Err(PgError::AuthenticationNotSupported(mode));
                }
                trace!("dispatch(): authenticated");
            }
            ServerMessage::BackendKeyData { pid, secret_key } => {
                if self.backend_key.is_some() {
                    warn!("dispatch(): BackendKeyData received again, replacing");
                }
                self.backend_key = Some(BackendKey { pid, secret_key });
            }
            ServerMessage::ParameterStatus { key, value } => {
                trace!("dispatch(): parameter {key} = {value:?}");
                self.parameters.insert(key, value);
            }
            ServerMessage::RowDescription(row_description) => {
                trace!("dispatch(): new field map: {row_description}");
                self.field_map = Arc::new(row_description);
                self.row_queue.clear();
                self.buffer_format = BufferFormat::Query;
            }
            ServerMessage::DataRow(payload) => {
                self.row_queue.push_back(payload);
                return Ok(true);
            }
            ServerMessage::CommandComplete(tag) => {
                self.notifications
                    .push_back(ServerNotice::from_tag(tag).to_string());
                self.state = SessionState::Complete;
            }
            ServerMessage::EmptyQueryResponse => {
                self.notifications.push_back("[Empty request]".to_string());
            }
            ServerMessage::Notice(notice) | ServerMessage::Notification(notice) => {
                self.notifications.push_back(notice.to_string());
            }
            ServerMessage::Error(notice) => {
                // not an error return; the server follows up with
                // ReadyForQuery and the session remains usable
                self.notifications.push_back(notice.to_string());
            }
            ServerMessage::CopyInResponse { binary } => {
                self.buffer_format = copy_buffer_format(binary);
                self.state = SessionState::CopyIn;
            }
            ServerMessage::CopyOutResponse { binary } => {
                self.buffer_format = copy_buffer_format(binary);
                self.row_queue.clear();
                self.state = SessionState::CopyOut;
            }
            ServerMessage::CopyData(payload) => {
                self.row_queue.push_back(payload);
                return Ok(true);
            }
            ServerMessage::CopyDone => {
                self.state = SessionState::CopyDone;
            }
            ServerMessage::ReadyForQuery(transaction_status) => {
                self.transaction_status = transaction_status;
                self.state = SessionState::ReadyForQuery;
            }
        }
        Ok(false)
    }

    // ---- plumbing --------------------------------------------------------

    fn send(&mut self, request: &Request) -> PgResult<()> {
        let tcp_client = self
            .tcp_client
            .as_mut()
            .ok_or(PgError::Usage("session is not connected"))?;
        request.emit(tcp_client.writer())
    }

    fn check_state(&self, operation: &'static str, allowed: &[SessionState]) -> PgResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PgError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn check_post_startup(&self, operation: &'static str) -> PgResult<()> {
        match self.state {
            SessionState::NotConnected | SessionState::NotStarted => Err(PgError::InvalidState {
                operation,
                state: self.state,
            }),
            _ => Ok(()),
        }
    }

    // Fatal errors invalidate the session: the transport is closed and the
    // state falls back to NotConnected.
    fn fatally<T>(&mut self, f: impl FnOnce(&mut Self) -> PgResult<T>) -> PgResult<T> {
        match f(self) {
            Err(e) if e.is_fatal() => {
                warn!("closing the session after fatal error: {e}");
                self.tcp_client = None;
                self.state = SessionState::NotConnected;
                Err(e)
            }
            result => result,
        }
    }
}

fn copy_buffer_format(binary: bool) -> BufferFormat {
    if binary {
        BufferFormat::CopyBinary
    } else {
        BufferFormat::CopyText
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    // Best-effort teardown; transport errors during drop are ignored.
    fn drop(&mut self) {
        if self.state != SessionState::NotConnected {
            trace!("Drop of Session");
            if let Err(e) = self.send(&Request::Terminate) {
                trace!("Terminate in drop failed with {e:?}");
            }
        }
    }
}

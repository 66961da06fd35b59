// The session's state sum types. Exactly one `SessionState` holds at any
// time; public operations are guarded on it.

/// Lifecycle state of a [`Session`](crate::Session).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// No transport is open.
    NotConnected,
    /// Transport open, startup not yet performed.
    NotStarted,
    /// The server accepts the next client message.
    ReadyForQuery,
    /// A query was sent; the reply stream is being drained.
    InQuery,
    /// The server waits for `CopyData`/`CopyDone`/`CopyFail` from the client.
    CopyIn,
    /// The server streams `CopyData` messages to the client.
    CopyOut,
    /// The server finished a COPY-out stream.
    CopyDone,
    /// The current command completed; `ReadyForQuery` is still outstanding.
    Complete,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Self::NotConnected => write!(f, "not_connected"),
            Self::NotStarted => write!(f, "not_started"),
            Self::ReadyForQuery => write!(f, "ready_for_query"),
            Self::InQuery => write!(f, "in_query"),
            Self::CopyIn => write!(f, "copy_in"),
            Self::CopyOut => write!(f, "copy_out"),
            Self::CopyDone => write!(f, "copy_done"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Transaction status of the server, as reported by the most recent
/// `ReadyForQuery` message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TransactionStatus {
    /// Not in a transaction.
    #[default]
    Idle,
    /// In a transaction block.
    Active,
    /// In a failed transaction block.
    Error,
}

impl TransactionStatus {
    pub(crate) fn from_status_byte(b: u8) -> Option<Self> {
        match b {
            b'I' => Some(Self::Idle),
            b'T' => Some(Self::Active),
            b'E' => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Layout of the buffers in the row queue, determined by the server message
/// that most recently populated the queue.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BufferFormat {
    /// The row queue was not populated yet.
    #[default]
    None,
    /// `DataRow` buffers, laid out per the current field descriptors.
    Query,
    /// COPY text lines.
    CopyText,
    /// COPY binary chunks.
    CopyBinary,
}

impl std::fmt::Display for BufferFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Self::None => write!(f, "none"),
            Self::Query => write!(f, "query"),
            Self::CopyText => write!(f, "copy_text"),
            Self::CopyBinary => write!(f, "copy_binary"),
        }
    }
}

// The (pid, secret_key) pair from BackendKeyData; set exactly once per
// session, needed for out-of-band cancel requests.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BackendKey {
    pub pid: u32,
    pub secret_key: u32,
}

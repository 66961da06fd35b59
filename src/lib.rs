//! Synchronous pure-rust client for the PostgreSQL wire protocol (v3.0).
//!
//! `pgconnect` speaks the frontend/backend protocol directly over a blocking
//! byte stream (TCP or Unix-domain socket) and exposes it as a small session
//! state machine: negotiate startup, issue simple queries, stream result
//! rows, handle asynchronous server notices, and run the COPY sub-protocol.
//!
//! There is deliberately no SQL layer and no type system on top: result rows
//! are surfaced as raw buffers plus a string projection, so the crate is
//! suited for protocol-level tooling, REPLs, and tests that need exact
//! control over the wire dialog.
//!
//! ```rust,no_run
//! use pgconnect::{PgResult, Session};
//! # fn main() -> PgResult<()> {
//! let mut session = Session::new();
//! session.connect_local("5432", "/private/tmp", ".s.PGSQL.")?;
//! if session.startup("joe", "")? {
//!     session.query("SELECT datname FROM pg_database")?;
//!     while !session.row_queue_empty() {
//!         println!("{}", session.pop_row_as_strings()?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Out of scope: authentication beyond trust mode, TLS, the extended
//! (prepared-statement) query protocol, connection pooling, and typed value
//! decoding.

#![warn(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate log;

mod conn;
mod pg_error;
mod protocol;
mod row;
mod session;

pub use crate::conn::{
    BufferFormat, ConnectParams, ConnectParamsBuilder, Endpoint, SessionState, TransactionStatus,
};
pub use crate::pg_error::{PgError, PgResult};
pub use crate::protocol::parts::{FieldDescription, FieldFormat, RowDescription};
pub use crate::row::Row;
pub use crate::session::Session;

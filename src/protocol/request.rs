//! The frontend message builder. Every message is emitted self-framed:
//! `[code: u8][length: u32][body]`, with the length field counting itself and
//! the body, but not the code. `Startup` and `Cancel` are the two untagged
//! packets that begin directly with the length.
use crate::{protocol::util_sync, PgResult};
use byteorder::{BigEndian, WriteBytesExt};

// Protocol version 3.0.
const PROTOCOL_VERSION: u32 = 0x0003_0000;
// Magic number that takes the place of the protocol version in a cancel packet.
const CANCEL_REQUEST_CODE: u32 = 80_877_102;

// The action requested from the server.
#[derive(Debug)]
pub(crate) enum Request<'a> {
    // Opens the dialog; user and database name, protocol version.
    Startup { user: &'a str, database: &'a str },
    // Execute an SQL string ('Q').
    Query(&'a str),
    // Close the session ('X').
    Terminate,
    // Extended-protocol synchronization point ('S').
    Sync,
    // Ask the server to flush its output buffer ('H').
    Flush,
    // One chunk of COPY-in payload ('d').
    CopyData(&'a [u8]),
    // Finish a COPY-in stream ('c').
    CopyDone,
    // Abort a COPY-in stream with a reason ('f').
    CopyFail(&'a str),
    // Out-of-band cancellation of the in-flight request; must be sent on a
    // second connection to the same endpoint.
    Cancel { pid: u32, secret_key: u32 },
}

impl Request<'_> {
    // The frontend code byte; None for the untagged packets.
    fn code(&self) -> Option<u8> {
        match *self {
            Self::Startup { .. } | Self::Cancel { .. } => None,
            Self::Query(_) => Some(b'Q'),
            Self::Terminate => Some(b'X'),
            Self::Sync => Some(b'S'),
            Self::Flush => Some(b'H'),
            Self::CopyData(_) => Some(b'd'),
            Self::CopyDone => Some(b'c'),
            Self::CopyFail(_) => Some(b'f'),
        }
    }

    fn body_len(&self) -> usize {
        match *self {
            Self::Startup { user, database } => {
                let database = if database.is_empty() { user } else { database };
                4 + "user".len() + 1 + user.len() + 1 + "database".len() + 1 + database.len() + 1 + 1
            }
            Self::Query(sql) => sql.len() + 1,
            Self::Terminate | Self::Sync | Self::Flush | Self::CopyDone => 0,
            Self::CopyData(bytes) => bytes.len(),
            Self::CopyFail(reason) => reason.len() + 1,
            Self::Cancel { .. } => 12,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn emit(&self, w: &mut dyn std::io::Write) -> PgResult<()> {
        trace!("Request::emit() of {:?}", self);
        if let Some(code) = self.code() {
            w.write_u8(code)?;
        }
        w.write_u32::<BigEndian>(4 + self.body_len() as u32)?;
        match *self {
            Self::Startup { user, database } => {
                let database = if database.is_empty() { user } else { database };
                w.write_u32::<BigEndian>(PROTOCOL_VERSION)?;
                util_sync::emit_cstring("user", w)?;
                util_sync::emit_cstring(user, w)?;
                util_sync::emit_cstring("database", w)?;
                util_sync::emit_cstring(database, w)?;
                w.write_u8(0)?;
            }
            // the SQL bytes are sent verbatim, plus the trailing NUL
            Self::Query(sql) => util_sync::emit_cstring(sql, w)?,
            Self::CopyData(bytes) => w.write_all(bytes)?,
            Self::CopyFail(reason) => util_sync::emit_cstring(reason, w)?,
            Self::Cancel { pid, secret_key } => {
                w.write_u32::<BigEndian>(CANCEL_REQUEST_CODE)?;
                w.write_u32::<BigEndian>(pid)?;
                w.write_u32::<BigEndian>(secret_key)?;
            }
            Self::Terminate | Self::Sync | Self::Flush | Self::CopyDone => {}
        }
        w.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::<u8>::new();
        self.emit(&mut buf).unwrap();
        buf
    }
}

use crate::{protocol::util_sync, PgResult};
use byteorder::ReadBytesExt;

/// A notice-style message from the server.
///
/// `NoticeResponse`, `ErrorResponse` and `NotificationResponse` share one
/// payload structure: a sequence of fields, each a type byte followed by a
/// NUL-terminated value, closed by a single NUL. Only the severity (`S`) and
/// message (`M`) fields are retained; command-completion tags are wrapped
/// with an empty severity.
///
/// The session surfaces these as formatted strings (`SEVERITY: message`)
/// through its notification queue, also for errors; an `ErrorResponse`
/// terminates the current query but not the session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerNotice {
    severity: String,
    text: String,
}

impl ServerNotice {
    /// The severity field, e.g. `ERROR` or `NOTICE`; empty for command tags.
    pub fn severity(&self) -> &str {
        &self.severity
    }
    /// The human-readable message.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn from_tag(tag: String) -> Self {
        Self {
            severity: String::new(),
            text: tag,
        }
    }

    // Parses the notice fields; unknown field types are skipped, trailing
    // bytes after the terminator are tolerated.
    pub(crate) fn parse(rdr: &mut dyn std::io::Read) -> PgResult<Self> {
        let mut severity = String::new();
        let mut text = String::new();
        loop {
            let field_type = rdr.read_u8()?;
            if field_type == 0 {
                break;
            }
            let value = util_sync::read_cstring(rdr)?;
            match field_type {
                b'S' => severity = value,
                b'M' => text = value,
                _ => {}
            }
        }
        let notice = Self { severity, text };
        debug!("ServerNotice::parse(): {notice}");
        Ok(notice)
    }
}

impl std::fmt::Display for ServerNotice {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}: {}", self.severity, self.text)
    }
}

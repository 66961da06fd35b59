//! The backend reply parser.
//!
//! A server message is framed as `[code: u8][length: u32][payload]`, the
//! length field counting itself but not the code. The frame is read
//! completely before any payload parsing starts, so a partially consumed
//! message never leaks into the stream; payload parsing then validates
//! end-alignment wherever the format does not explicitly tolerate padding.
use crate::{
    conn::TransactionStatus,
    protocol::{
        parts::{RowDescription, ServerNotice},
        util_sync,
    },
    PgError, PgResult,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

// One message from the server, fully parsed.
//
// The closed sum type replaces the code-switched dispatch of typical C
// implementations; adding a code forces every match in the crate to be
// revisited.
#[derive(Debug)]
pub(crate) enum ServerMessage {
    // 'R': authentication challenge; mode 0 is AuthenticationOk.
    Authentication { mode: u32 },
    // 'K': cancellation key data for out-of-band cancel requests.
    BackendKeyData { pid: u32, secret_key: u32 },
    // 'S': run-time parameter broadcast.
    ParameterStatus { key: String, value: String },
    // 'T': metadata of the rows that follow.
    RowDescription(RowDescription),
    // 'D': one result row, kept as the raw payload.
    DataRow(Vec<u8>),
    // 'C': command completion tag.
    CommandComplete(String),
    // 'I': the query string was empty.
    EmptyQueryResponse,
    // 'N': informational notice.
    Notice(ServerNotice),
    // 'E': error; terminates the query, not the session.
    Error(ServerNotice),
    // 'A': asynchronous notification.
    Notification(ServerNotice),
    // 'G': the server expects COPY-in data from the client.
    CopyInResponse { binary: bool },
    // 'H': the server is about to stream COPY-out data.
    CopyOutResponse { binary: bool },
    // 'd': one chunk of COPY-out payload.
    CopyData(Vec<u8>),
    // 'c': end of the COPY-out stream.
    CopyDone,
    // 'Z': the server accepts the next client message.
    ReadyForQuery(TransactionStatus),
}

impl ServerMessage {
    // Reads one framed message from the stream.
    pub fn parse(rdr: &mut dyn std::io::Read) -> PgResult<Self> {
        let code = rdr.read_u8()?;
        let length = rdr.read_u32::<BigEndian>()?;
        if length < 4 {
            return Err(PgError::MalformedFrame(format!(
                "length {length} < 4 in message {:?}",
                char::from(code)
            )));
        }
        let payload = util_sync::parse_bytes(length as usize - 4, rdr)?;
        trace!(
            "ServerMessage::parse(): code {:?} with {} payload bytes",
            char::from(code),
            payload.len()
        );
        Self::from_payload(code, payload)
    }

    // Parses the payload of one message. Truncations inside the payload are
    // reported as framing errors, not as transport errors.
    fn from_payload(code: u8, payload: Vec<u8>) -> PgResult<Self> {
        Self::parse_payload(code, payload).map_err(|e| match e {
            PgError::Io { source } if source.kind() == std::io::ErrorKind::UnexpectedEof => {
                PgError::MalformedFrame(format!(
                    "truncated payload in message {:?}",
                    char::from(code)
                ))
            }
            e => e,
        })
    }

    fn parse_payload(code: u8, payload: Vec<u8>) -> PgResult<Self> {
        let mut rdr = Cursor::new(payload);
        let msg = match code {
            b'R' => {
                // nothing beyond the mode is consumed for AuthenticationOk;
                // other modes carry mode-specific data we never look at
                Self::Authentication {
                    mode: rdr.read_u32::<BigEndian>()?,
                }
            }
            b'K' => {
                let msg = Self::BackendKeyData {
                    pid: rdr.read_u32::<BigEndian>()?,
                    secret_key: rdr.read_u32::<BigEndian>()?,
                };
                ensure_consumed(&rdr, code)?;
                msg
            }
            b'S' => {
                let msg = Self::ParameterStatus {
                    key: util_sync::read_cstring(&mut rdr)?,
                    value: util_sync::read_cstring(&mut rdr)?,
                };
                ensure_consumed(&rdr, code)?;
                msg
            }
            b'T' => {
                let msg = Self::RowDescription(RowDescription::parse(&mut rdr)?);
                ensure_consumed(&rdr, code)?;
                msg
            }
            b'D' => Self::DataRow(rdr.into_inner()),
            b'C' => {
                let msg = Self::CommandComplete(util_sync::read_cstring(&mut rdr)?);
                ensure_consumed(&rdr, code)?;
                msg
            }
            b'I' => {
                ensure_consumed(&rdr, code)?;
                Self::EmptyQueryResponse
            }
            b'N' => Self::Notice(ServerNotice::parse(&mut rdr)?),
            b'E' => Self::Error(ServerNotice::parse(&mut rdr)?),
            b'A' => Self::Notification(ServerNotice::parse(&mut rdr)?),
            b'G' => Self::CopyInResponse {
                binary: parse_copy_response(&mut rdr, code)?,
            },
            b'H' => Self::CopyOutResponse {
                binary: parse_copy_response(&mut rdr, code)?,
            },
            b'd' => Self::CopyData(rdr.into_inner()),
            b'c' => {
                ensure_consumed(&rdr, code)?;
                Self::CopyDone
            }
            b'Z' => {
                let status_byte = rdr.read_u8()?;
                let status = TransactionStatus::from_status_byte(status_byte).ok_or_else(|| {
                    PgError::MalformedFrame(format!(
                        "invalid transaction status {:?}",
                        char::from(status_byte)
                    ))
                })?;
                ensure_consumed(&rdr, code)?;
                Self::ReadyForQuery(status)
            }
            // the payload is already drained; the caller decides whether to
            // keep the session
            other => return Err(PgError::UnknownMessageCode(other)),
        };
        Ok(msg)
    }
}

// The copy responses carry the overall format and one format code per column.
// Only the overall format matters here; the per-column list is validated and
// dropped, since COPY payloads are surfaced as opaque buffers.
fn parse_copy_response(rdr: &mut Cursor<Vec<u8>>, code: u8) -> PgResult<bool> {
    let binary = rdr.read_i8()? != 0;
    let no_of_columns = rdr.read_i16::<BigEndian>()?;
    for _ in 0..no_of_columns {
        rdr.read_i16::<BigEndian>()?;
    }
    ensure_consumed(rdr, code)?;
    Ok(binary)
}

fn ensure_consumed(rdr: &Cursor<Vec<u8>>, code: u8) -> PgResult<()> {
    let len = rdr.get_ref().len() as u64;
    if rdr.position() == len {
        Ok(())
    } else {
        Err(PgError::MalformedFrame(format!(
            "{} unexpected trailing bytes in message {:?}",
            len - rdr.position(),
            char::from(code)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::ServerMessage;
    use crate::{conn::TransactionStatus, PgError};
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    fn frame(code: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![code];
        buf.write_u32::<BigEndian>(payload.len() as u32 + 4).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_frame_roundtrip() {
        // re-emitting the parsed (code, payload) with its header must
        // reproduce the original bytes
        let original = frame(b'D', b"\x00\x01\x00\x00\x00\x011");
        let msg = ServerMessage::parse(&mut Cursor::new(original.clone())).unwrap();
        let ServerMessage::DataRow(payload) = msg else {
            panic!("expected DataRow");
        };
        assert_eq!(frame(b'D', &payload), original);
    }

    #[test]
    fn test_authentication_ok() {
        let msg = ServerMessage::parse(&mut Cursor::new(frame(b'R', &[0, 0, 0, 0]))).unwrap();
        assert!(matches!(msg, ServerMessage::Authentication { mode: 0 }));
    }

    #[test]
    fn test_backend_key_data() {
        let mut payload = Vec::new();
        payload.write_u32::<BigEndian>(17).unwrap();
        payload.write_u32::<BigEndian>(99).unwrap();
        let msg = ServerMessage::parse(&mut Cursor::new(frame(b'K', &payload))).unwrap();
        assert!(matches!(
            msg,
            ServerMessage::BackendKeyData {
                pid: 17,
                secret_key: 99
            }
        ));
    }

    #[test]
    fn test_parameter_status() {
        let msg =
            ServerMessage::parse(&mut Cursor::new(frame(b'S', b"server_version\x0014\x00")))
                .unwrap();
        let ServerMessage::ParameterStatus { key, value } = msg else {
            panic!("expected ParameterStatus");
        };
        assert_eq!(key, "server_version");
        assert_eq!(value, "14");
    }

    #[test]
    fn test_ready_for_query() {
        let msg = ServerMessage::parse(&mut Cursor::new(frame(b'Z', b"I"))).unwrap();
        assert!(matches!(
            msg,
            ServerMessage::ReadyForQuery(TransactionStatus::Idle)
        ));
        let msg = ServerMessage::parse(&mut Cursor::new(frame(b'Z', b"E"))).unwrap();
        assert!(matches!(
            msg,
            ServerMessage::ReadyForQuery(TransactionStatus::Error)
        ));
        assert!(ServerMessage::parse(&mut Cursor::new(frame(b'Z', b"x"))).is_err());
    }

    #[test]
    fn test_copy_in_response() {
        // text format, two columns
        let msg = ServerMessage::parse(&mut Cursor::new(frame(
            b'G',
            &[0, 0, 2, 0, 0, 0, 0],
        )))
        .unwrap();
        assert!(matches!(
            msg,
            ServerMessage::CopyInResponse { binary: false }
        ));
    }

    #[test]
    fn test_length_below_minimum() {
        let err =
            ServerMessage::parse(&mut Cursor::new(vec![b'Z', 0, 0, 0, 3])).unwrap_err();
        assert!(matches!(err, PgError::MalformedFrame(_)));
    }

    #[test]
    fn test_truncated_payload_is_transport_error() {
        // the frame itself is cut short: transport-level error
        let mut bytes = frame(b'K', &[0, 0, 0, 17]);
        bytes.truncate(7);
        let err = ServerMessage::parse(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, PgError::Io { .. }));
    }

    #[test]
    fn test_truncated_content_is_framing_error() {
        // the frame is complete but its content is too short
        let err = ServerMessage::parse(&mut Cursor::new(frame(b'K', &[0, 0, 0, 17])))
            .unwrap_err();
        assert!(matches!(err, PgError::MalformedFrame(_)));
    }

    #[test]
    fn test_trailing_garbage_detected() {
        let err = ServerMessage::parse(&mut Cursor::new(frame(b'Z', b"IX"))).unwrap_err();
        assert!(matches!(err, PgError::MalformedFrame(_)));
    }

    #[test]
    fn test_unknown_code() {
        let err = ServerMessage::parse(&mut Cursor::new(frame(b'?', b"abc"))).unwrap_err();
        assert!(matches!(err, PgError::UnknownMessageCode(b'?')));
    }
}

use crate::{PgError, PgResult};
use byteorder::ReadBytesExt;

// Read n bytes, return as Vec<u8>
pub(crate) fn parse_bytes(len: usize, rdr: &mut dyn std::io::Read) -> PgResult<Vec<u8>> {
    let mut vec = vec![0_u8; len];
    rdr.read_exact(&mut vec)?;
    Ok(vec)
}

// Read bytes up to and excluding the next NUL byte; the NUL is consumed.
// Non-UTF-8 bytes are replaced, the server is expected to send UTF-8.
pub(crate) fn read_cstring(rdr: &mut dyn std::io::Read) -> PgResult<String> {
    let mut bytes = Vec::<u8>::new();
    loop {
        match rdr.read_u8() {
            Ok(0) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(b) => bytes.push(b),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(PgError::MalformedFrame("unterminated string".to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub(crate) fn emit_cstring(s: &str, w: &mut dyn std::io::Write) -> PgResult<()> {
    w.write_all(s.as_bytes())?;
    w.write_all(&[0])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::read_cstring;
    use std::io::Cursor;

    #[test]
    fn test_read_cstring() {
        let mut rdr = Cursor::new(b"server_version\x0014\x00".to_vec());
        assert_eq!(read_cstring(&mut rdr).unwrap(), "server_version");
        assert_eq!(read_cstring(&mut rdr).unwrap(), "14");
        assert!(read_cstring(&mut rdr).is_err());
    }
}

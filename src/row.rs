use crate::{
    conn::BufferFormat,
    protocol::parts::{FieldFormat, RowDescription},
    PgError, PgResult,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::{io::Cursor, sync::Arc};

/// A single row, projected into strings, with a reference to the field
/// descriptions it was projected under.
///
/// The projection policy is fixed:
/// * a SQL NULL becomes the empty string,
/// * a binary-format query column becomes the placeholder `<binary>`,
/// * a COPY text line is taken verbatim,
/// * a COPY binary chunk is rendered printable-filtered (every byte outside
///   the printable ASCII range becomes `.`).
///
/// You can access individual values with `row[idx]`, or iterate over the
/// values (with `for value in row {...}`).
#[derive(Debug)]
pub struct Row {
    field_map: Arc<RowDescription>,
    value_iter: <Vec<String> as IntoIterator>::IntoIter,
}

impl Row {
    fn new(field_map: Arc<RowDescription>, values: Vec<String>) -> Self {
        Self {
            field_map,
            value_iter: values.into_iter(),
        }
    }

    /// Removes and returns the next value.
    pub fn next_value(&mut self) -> Option<String> {
        self.value_iter.next()
    }

    /// Returns the number of (remaining) values.
    pub fn len(&self) -> usize {
        self.value_iter.len()
    }

    /// Returns true if the row contains no value.
    pub fn is_empty(&self) -> bool {
        self.value_iter.as_slice().is_empty()
    }

    /// Consumes the row into its values.
    pub fn into_values(self) -> Vec<String> {
        self.value_iter.collect()
    }

    /// The field descriptions the row was projected under; empty for COPY
    /// buffers.
    pub fn field_map(&self) -> &RowDescription {
        &self.field_map
    }

    // Splits one raw buffer into strings, according to the buffer format that
    // was current when the buffer was enqueued.
    pub(crate) fn project(
        format: BufferFormat,
        raw: &[u8],
        field_map: &Arc<RowDescription>,
    ) -> PgResult<Self> {
        match format {
            BufferFormat::None => Err(PgError::NoBufferFormat),
            BufferFormat::Query => project_query_row(raw, field_map).map_err(|e| match e {
                PgError::Io { source } if source.kind() == std::io::ErrorKind::UnexpectedEof => {
                    PgError::MalformedFrame("truncated row buffer".to_string())
                }
                e => e,
            }),
            BufferFormat::CopyText => Ok(Self::new(
                Arc::clone(field_map),
                vec![String::from_utf8_lossy(raw).into_owned()],
            )),
            BufferFormat::CopyBinary => Ok(Self::new(
                Arc::clone(field_map),
                vec![printable_filtered(raw)],
            )),
        }
    }
}

// Layout of a query-format buffer: `n (i16)`, then n columns, each
// `size (i32)` followed by `size` bytes; size -1 denotes SQL NULL.
#[allow(clippy::cast_sign_loss)]
fn project_query_row(raw: &[u8], field_map: &Arc<RowDescription>) -> PgResult<Row> {
    let mut rdr = Cursor::new(raw);
    let no_of_columns = rdr.read_i16::<BigEndian>()?;
    if no_of_columns as usize != field_map.len() {
        return Err(PgError::MalformedFrame(format!(
            "row with {} columns does not match the {} field descriptions",
            no_of_columns,
            field_map.len()
        )));
    }

    let mut values = Vec::<String>::with_capacity(no_of_columns as usize);
    for field_description in field_map.iter() {
        let size = rdr.read_i32::<BigEndian>()?;
        if size == -1 {
            values.push(String::new());
            continue;
        }
        if size < 0 {
            return Err(PgError::MalformedFrame(format!(
                "column size {size} in row buffer"
            )));
        }
        let bytes = crate::protocol::util_sync::parse_bytes(size as usize, &mut rdr)?;
        values.push(match field_description.format() {
            FieldFormat::Binary => "<binary>".to_string(),
            FieldFormat::Text => String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    if rdr.position() != raw.len() as u64 {
        return Err(PgError::MalformedFrame(format!(
            "{} leftover bytes in row buffer",
            raw.len() as u64 - rdr.position()
        )));
    }
    Ok(Row::new(Arc::clone(field_map), values))
}

fn printable_filtered(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..0x7f).contains(&b) { char::from(b) } else { '.' })
        .collect()
}

/// Support indexing.
impl std::ops::Index<usize> for Row {
    type Output = String;
    fn index(&self, idx: usize) -> &String {
        &self.value_iter.as_slice()[idx]
    }
}

/// Row is an iterator with item `String`.
impl Iterator for Row {
    type Item = String;
    fn next(&mut self) -> Option<String> {
        self.next_value()
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        for v in self.value_iter.as_slice() {
            write!(fmt, "{v}, ")?;
        }
        Ok(())
    }
}

use crate::{protocol::util_sync, PgError, PgResult};
use byteorder::{BigEndian, ReadBytesExt};
use std::ops::Deref;

/// Whether a column is transferred as text or in the server's binary format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldFormat {
    /// Text representation.
    Text,
    /// Server-side binary representation.
    Binary,
}
impl FieldFormat {
    pub(crate) fn from_i16(code: i16) -> PgResult<Self> {
        match code {
            0 => Ok(Self::Text),
            1 => Ok(Self::Binary),
            code => Err(PgError::MalformedFrame(format!(
                "format code {code} is neither text (0) nor binary (1)"
            ))),
        }
    }
}

/// Metadata of a single field (column) in a query result.
#[derive(Clone, Debug)]
pub struct FieldDescription {
    name: String,
    table_oid: u32,
    column_no: i16,
    type_oid: u32,
    type_size: i16,
    type_modifier: i32,
    format: FieldFormat,
}

impl FieldDescription {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Object id of the originating table, or zero.
    pub fn table_oid(&self) -> u32 {
        self.table_oid
    }
    /// Attribute number of the originating column, or zero.
    pub fn column_no(&self) -> i16 {
        self.column_no
    }
    /// Object id of the column's data type.
    pub fn type_oid(&self) -> u32 {
        self.type_oid
    }
    /// Binary width of the data type; negative values denote variable width.
    pub fn type_size(&self) -> i16 {
        self.type_size
    }
    /// Type-specific modifier.
    pub fn type_modifier(&self) -> i32 {
        self.type_modifier
    }
    /// Transfer format of the column.
    pub fn format(&self) -> FieldFormat {
        self.format
    }

    // One descriptor record: the NUL-terminated name, then six fixed
    // big-endian fields (18 bytes). Parsed field by field, no reliance on
    // struct layout.
    fn parse(rdr: &mut dyn std::io::Read) -> PgResult<Self> {
        let name = util_sync::read_cstring(rdr)?;
        let table_oid = rdr.read_u32::<BigEndian>()?;
        let column_no = rdr.read_i16::<BigEndian>()?;
        let type_oid = rdr.read_u32::<BigEndian>()?;
        let type_size = rdr.read_i16::<BigEndian>()?;
        let type_modifier = rdr.read_i32::<BigEndian>()?;
        let format = FieldFormat::from_i16(rdr.read_i16::<BigEndian>()?)?;
        Ok(Self {
            name,
            table_oid,
            column_no,
            type_oid,
            type_size,
            type_modifier,
            format,
        })
    }
}

/// Ordered list of the field descriptions of a query result.
///
/// Replaced wholesale whenever the server sends a new `RowDescription`.
/// Provides index access to the individual [`FieldDescription`]s.
#[derive(Debug, Default)]
pub struct RowDescription(Vec<FieldDescription>);

impl Deref for RowDescription {
    type Target = Vec<FieldDescription>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for RowDescription {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        for field_description in &self.0 {
            write!(fmt, "{}, ", field_description.name())?;
        }
        Ok(())
    }
}

impl RowDescription {
    pub(crate) fn parse(rdr: &mut dyn std::io::Read) -> PgResult<Self> {
        let count = rdr.read_u16::<BigEndian>()?;
        trace!("RowDescription::parse(): got count = {count}");
        let mut field_descriptions = Vec::<FieldDescription>::with_capacity(count as usize);
        for _ in 0..count {
            field_descriptions.push(FieldDescription::parse(rdr)?);
        }
        Ok(Self(field_descriptions))
    }
}

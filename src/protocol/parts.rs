mod field_description;
mod server_notice;

pub use self::{
    field_description::{FieldDescription, FieldFormat, RowDescription},
    server_notice::ServerNotice,
};

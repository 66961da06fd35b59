// The wire protocol: big-endian primitive helpers, the frontend request
// builder, and the backend reply parser.
//
// Frontend and backend message codes overlap (`S` is the client Sync and the
// server ParameterStatus, `H` is the client Flush and the server
// CopyOutResponse); the two code tables are therefore kept strictly apart:
// frontend codes live only in `request`, backend codes only in `reply`.

pub mod parts;
mod reply;
mod request;
pub(crate) mod util_sync;

pub(crate) use self::{reply::ServerMessage, request::Request};

// The connection endpoint description, the blocking transports, and the
// session's state sum types.

mod params;
mod session_state;
mod tcp_client;

pub use params::{
    connect_params::{ConnectParams, Endpoint},
    connect_params_builder::ConnectParamsBuilder,
};
pub use session_state::{BufferFormat, SessionState, TransactionStatus};

pub(crate) use session_state::BackendKey;
pub(crate) use tcp_client::TcpClient;

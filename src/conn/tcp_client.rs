mod plain_tcp_client;

#[cfg(unix)]
mod local_socket_client;

use crate::{ConnectParams, PgResult};
use plain_tcp_client::PlainTcpClient;
use std::time::Instant;

#[cfg(unix)]
use local_socket_client::LocalSocketClient;

// A blocking stream connection, over TCP or a Unix-domain socket.
#[derive(Debug)]
pub(crate) enum TcpClient {
    // A blocking tcp connection.
    Plain(PlainTcpClient),
    // A blocking connection over a Unix-domain stream socket.
    #[cfg(unix)]
    Local(LocalSocketClient),
}
impl TcpClient {
    // Constructs a blocking stream connection matching the given connect parameters.
    pub fn try_new(params: ConnectParams) -> PgResult<Self> {
        let start = Instant::now();
        trace!("TcpClient: Connecting to {}", params);

        let conn = if params.is_local() {
            #[cfg(unix)]
            {
                Self::Local(LocalSocketClient::try_new(params)?)
            }
            #[cfg(not(unix))]
            {
                return Err(crate::PgError::Usage(
                    "Unix-domain sockets are not supported on this platform",
                ));
            }
        } else {
            Self::Plain(PlainTcpClient::try_new(params)?)
        };

        trace!(
            "Connection of type {} is initialized ({} µs)",
            conn.s_type(),
            Instant::now().duration_since(start).as_micros(),
        );
        Ok(conn)
    }

    // Returns a descriptor of the chosen type
    pub fn s_type(&self) -> &'static str {
        match self {
            Self::Plain(_) => "Plain TCP",
            #[cfg(unix)]
            Self::Local(_) => "Unix-domain socket",
        }
    }

    pub fn connect_params(&self) -> &ConnectParams {
        match self {
            Self::Plain(client) => client.connect_params(),
            #[cfg(unix)]
            Self::Local(client) => client.connect_params(),
        }
    }

    pub fn reader(&mut self) -> &mut dyn std::io::Read {
        match self {
            Self::Plain(client) => client.reader(),
            #[cfg(unix)]
            Self::Local(client) => client.reader(),
        }
    }

    pub fn writer(&mut self) -> &mut dyn std::io::Write {
        match self {
            Self::Plain(client) => client.writer(),
            #[cfg(unix)]
            Self::Local(client) => client.writer(),
        }
    }
}
impl Drop for TcpClient {
    fn drop(&mut self) {
        trace!("Drop of TcpClient");
    }
}

//! Connection parameters
use crate::ConnectParamsBuilder;
use std::path::PathBuf;

/// Default TCP host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default TCP service; resolved to port 5432 if it cannot be parsed as a port number.
pub const DEFAULT_SERVICE: &str = "postgresql";
/// Default directory of the server's Unix-domain socket file.
pub const DEFAULT_SOCKET_DIR: &str = "/private/tmp";
/// Default file-name prefix of the server's Unix-domain socket file.
pub const DEFAULT_SOCKET_PREFIX: &str = ".s.PGSQL.";
/// Default port, kept as string since it is appended to the socket file name.
pub const DEFAULT_PORT: &str = "5432";

/// An immutable struct with all information necessary to open a new connection
/// to a PostgreSQL server.
///
/// # Instantiating a `ConnectParams` using the `ConnectParamsBuilder`
///
/// See [`ConnectParamsBuilder`](crate::ConnectParamsBuilder) for details.
///
/// ```rust
/// use pgconnect::ConnectParams;
/// let connect_params = ConnectParams::builder()
///    .hostname("the_host")
///    .service("5432")
///    .build();
/// ```
///
/// # Local connections
///
/// A server on the same machine is usually reachable through a Unix-domain
/// socket file, whose path is assembled as `<dir>/<prefix><port>`:
///
/// ```rust
/// use pgconnect::ConnectParams;
/// let connect_params = ConnectParams::local("5432", "/private/tmp", ".s.PGSQL.");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectParams {
    endpoint: Endpoint,
}

/// The transport endpoint of a [`ConnectParams`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Endpoint {
    /// TCP, to `<host>:<service>`.
    Tcp {
        /// Hostname or IP address.
        host: String,
        /// Service name or port number.
        service: String,
    },
    /// Unix-domain stream socket at the given file path.
    Local {
        /// Path of the socket file.
        path: PathBuf,
    },
}

impl ConnectParams {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Returns a new builder for `ConnectParams`.
    pub fn builder() -> ConnectParamsBuilder {
        ConnectParamsBuilder::new()
    }

    /// Parameters for a TCP connection.
    pub fn tcp<H: AsRef<str>, S: AsRef<str>>(host: H, service: S) -> Self {
        Self::new(Endpoint::Tcp {
            host: host.as_ref().to_owned(),
            service: service.as_ref().to_owned(),
        })
    }

    /// Parameters for a Unix-domain socket connection.
    ///
    /// The socket file path is assembled as `<dir>/<prefix><port>`.
    pub fn local<P: AsRef<str>, D: AsRef<str>, F: AsRef<str>>(port: P, dir: D, prefix: F) -> Self {
        let mut path = PathBuf::from(dir.as_ref());
        path.push(format!("{}{}", prefix.as_ref(), port.as_ref()));
        Self::new(Endpoint::Local { path })
    }

    /// The endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether the endpoint is a Unix-domain socket.
    pub fn is_local(&self) -> bool {
        matches!(self.endpoint, Endpoint::Local { .. })
    }

    // The address of a TCP endpoint. The standard library cannot look up
    // service names, so only the registered name "postgresql" is mapped;
    // anything else must be a port number.
    pub(crate) fn tcp_addr(&self) -> Option<(String, u16)> {
        match self.endpoint {
            Endpoint::Tcp {
                ref host,
                ref service,
            } => {
                let port = match service.parse::<u16>() {
                    Ok(p) => p,
                    Err(_) if service == DEFAULT_SERVICE => 5432,
                    Err(_) => return None,
                };
                Some((host.clone(), port))
            }
            Endpoint::Local { .. } => None,
        }
    }
}

impl std::fmt::Display for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.endpoint {
            Endpoint::Tcp {
                ref host,
                ref service,
            } => write!(f, "{host}:{service}"),
            Endpoint::Local { ref path } => write!(f, "{}", path.display()),
        }
    }
}

use super::connect_params::{
    ConnectParams, Endpoint, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVICE, DEFAULT_SOCKET_DIR,
    DEFAULT_SOCKET_PREFIX,
};

/// A builder for `ConnectParams`.
///
/// Unset values fall back to the documented defaults, so the plain
/// `ConnectParams::builder().build()` describes `localhost:postgresql`.
///
/// ```rust
/// use pgconnect::ConnectParams;
///
/// let connect_params = ConnectParams::builder()
///     .hostname("abcd123")
///     .service("2222")
///     .build();
/// ```
///
/// Switch to a Unix-domain socket endpoint with [`local`](Self::local):
///
/// ```rust
/// use pgconnect::ConnectParams;
///
/// let connect_params = ConnectParams::builder()
///     .local()
///     .socket_dir("/tmp")
///     .port("5433")
///     .build();
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectParamsBuilder {
    local: bool,
    hostname: Option<String>,
    service: Option<String>,
    socket_dir: Option<String>,
    socket_prefix: Option<String>,
    port: Option<String>,
}

impl ConnectParamsBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a Unix-domain socket endpoint.
    pub fn local(&mut self) -> &mut Self {
        self.local = true;
        self
    }

    /// Sets the hostname.
    pub fn hostname<H: AsRef<str>>(&mut self, hostname: H) -> &mut Self {
        self.hostname = Some(hostname.as_ref().to_owned());
        self
    }

    /// Sets the TCP service name or port number.
    pub fn service<S: AsRef<str>>(&mut self, service: S) -> &mut Self {
        self.service = Some(service.as_ref().to_owned());
        self
    }

    /// Sets the directory of the socket file (local endpoints).
    pub fn socket_dir<D: AsRef<str>>(&mut self, dir: D) -> &mut Self {
        self.socket_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Sets the file-name prefix of the socket file (local endpoints).
    pub fn socket_prefix<P: AsRef<str>>(&mut self, prefix: P) -> &mut Self {
        self.socket_prefix = Some(prefix.as_ref().to_owned());
        self
    }

    /// Sets the port that is appended to the socket file name (local endpoints).
    pub fn port<P: AsRef<str>>(&mut self, port: P) -> &mut Self {
        self.port = Some(port.as_ref().to_owned());
        self
    }

    /// Constructs the `ConnectParams`.
    pub fn build(&self) -> ConnectParams {
        if self.local {
            ConnectParams::local(
                self.port.as_deref().unwrap_or(DEFAULT_PORT),
                self.socket_dir.as_deref().unwrap_or(DEFAULT_SOCKET_DIR),
                self.socket_prefix.as_deref().unwrap_or(DEFAULT_SOCKET_PREFIX),
            )
        } else {
            ConnectParams::new(Endpoint::Tcp {
                host: self
                    .hostname
                    .as_deref()
                    .unwrap_or(DEFAULT_HOST)
                    .to_owned(),
                service: self
                    .service
                    .as_deref()
                    .unwrap_or(DEFAULT_SERVICE)
                    .to_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectParamsBuilder;
    use crate::conn::Endpoint;

    #[test]
    fn test_defaults() {
        let params = ConnectParamsBuilder::new().build();
        assert_eq!(
            *params.endpoint(),
            Endpoint::Tcp {
                host: "localhost".to_string(),
                service: "postgresql".to_string(),
            }
        );

        let params = ConnectParamsBuilder::new().local().build();
        assert_eq!(params.to_string(), "/private/tmp/.s.PGSQL.5432");
    }
}

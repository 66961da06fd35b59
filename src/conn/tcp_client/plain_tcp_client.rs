use crate::{ConnectParams, PgError, PgResult};
use std::net::{TcpStream, ToSocketAddrs};

#[derive(Debug)]
pub struct PlainTcpClient {
    params: ConnectParams,
    reader: TcpStream,
    writer: TcpStream,
}

impl PlainTcpClient {
    // Returns an initialized tcp connection. Tries every resolved address in
    // order and keeps the first that accepts.
    pub fn try_new(params: ConnectParams) -> PgResult<Self> {
        let (host, port) = params
            .tcp_addr()
            .ok_or(PgError::Usage("service is neither a port number nor a known service name"))?;

        let mut last_error = None;
        for addr in (host.as_str(), port).to_socket_addrs()? {
            match TcpStream::connect(addr) {
                Ok(tcpstream) => {
                    return Ok(Self {
                        params,
                        writer: tcpstream.try_clone()?,
                        reader: tcpstream,
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved")
            })
            .into())
    }

    pub fn connect_params(&self) -> &ConnectParams {
        &self.params
    }

    pub fn writer(&mut self) -> &mut TcpStream {
        &mut self.writer
    }

    pub fn reader(&mut self) -> &mut TcpStream {
        &mut self.reader
    }
}

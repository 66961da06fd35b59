use crate::{ConnectParams, Endpoint, PgError, PgResult};
use std::os::unix::net::UnixStream;

#[derive(Debug)]
pub struct LocalSocketClient {
    params: ConnectParams,
    reader: UnixStream,
    writer: UnixStream,
}

impl LocalSocketClient {
    // Returns an initialized Unix-domain socket connection.
    pub fn try_new(params: ConnectParams) -> PgResult<Self> {
        let Endpoint::Local { ref path } = *params.endpoint() else {
            return Err(PgError::Usage("endpoint is not a Unix-domain socket"));
        };
        let stream = UnixStream::connect(path)?;
        Ok(Self {
            writer: stream.try_clone()?,
            reader: stream,
            params,
        })
    }

    pub fn connect_params(&self) -> &ConnectParams {
        &self.params
    }

    pub fn writer(&mut self) -> &mut UnixStream {
        &mut self.writer
    }

    pub fn reader(&mut self) -> &mut UnixStream {
        &mut self.reader
    }
}

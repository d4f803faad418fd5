// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The RTU transaction engine.
//!
//! One engine drives one transport and sequences one transaction at a
//! time: submit a request, arm the timeout, wait for the reassembled
//! answer, validate it against the request and decode it. Exclusive
//! access through `&mut self` is what enforces the single outstanding
//! transaction; the codec's remembered request shape is the entire
//! correlation state.

use std::{fmt, io, time::Duration};

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt as _};
use tokio_util::codec::Framed;

use crate::{
    bytes::Bytes,
    codec::{
        self, decode_response, expected_response_len,
        rtu::{crc16, ClientCodec, EXCEPTION_BIT},
    },
    frame::{
        rtu::{ExpectedLen, Header, RequestAdu},
        Exception, Request, Response,
    },
    slave::{Slave, SlaveContext},
    Error, Result,
};

/// Shortest complete answer: address, function code, exception code
/// and CRC.
const MIN_RESPONSE_LEN: usize = 5;

/// _Modbus_ RTU client.
#[derive(Debug)]
pub struct Client<T> {
    framed: Framed<T, ClientCodec>,
    timeout: Option<Duration>,
}

impl<T> Client<T> {
    /// The currently configured response timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Configure the response timeout for all subsequent transactions.
    ///
    /// The timeout is disabled by passing `None`.
    pub fn set_timeout(&mut self, timeout: impl Into<Option<Duration>>) {
        self.timeout = timeout.into();
    }
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Attach a transport.
    ///
    /// No timeout is armed until one is configured with
    /// [`set_timeout`](Self::set_timeout).
    pub fn new(transport: T) -> Self {
        let framed = Framed::new(transport, ClientCodec::default());
        Self {
            framed,
            timeout: None,
        }
    }

    /// Shut down the underlying transport.
    pub async fn disconnect(self) -> io::Result<()> {
        let mut transport = self.framed.into_inner();
        transport.shutdown().await
    }

    /// Run a single request/response transaction.
    pub async fn call(&mut self, server: Slave, request: Request<'_>) -> Result<Response> {
        let function = request.function_code();
        if server.is_broadcast() && !function.supports_broadcast() {
            return Err(Error::BroadcastNotAllowed(function));
        }

        log::debug!("Calling function {function} on {server}");
        let expected_len = expected_response_len(&request);
        let hdr = Header {
            slave_id: server.into(),
        };
        self.framed.send(RequestAdu { hdr, pdu: &request }).await?;

        if server.is_broadcast() {
            // One-way request: nobody answers a broadcast, so complete
            // immediately with the echo a single device would send.
            return Ok(broadcast_response(&request));
        }

        let frame = self.recv_frame().await?;
        try_into_response(server, &request, expected_len, &frame)
    }

    async fn recv_frame(&mut self) -> Result<Bytes> {
        let next = self.framed.next();
        let frame = match self.timeout {
            Some(duration) => tokio::time::timeout(duration, next)
                .await
                .map_err(|_elapsed| Error::Timeout(duration))?,
            None => next.await,
        };
        frame
            .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::BrokenPipe)))
            .map_err(Into::into)
    }
}

/// Synthesized completion of a broadcast write.
fn broadcast_response(request: &Request<'_>) -> Response {
    use Request::*;

    match *request {
        WriteSingleCoil(addr, state) => Response::WriteSingleCoil(addr, state),
        WriteSingleRegister(addr, word) => Response::WriteSingleRegister(addr, word),
        WriteSingleRegisterEnron(addr, value) => Response::WriteSingleRegisterEnron(addr, value),
        WriteMultipleCoils(addr, ref coils) => {
            Response::WriteMultipleCoils(addr, codec::u16_len(coils.len()))
        }
        WriteMultipleRegisters(addr, ref words) => {
            Response::WriteMultipleRegisters(addr, codec::u16_len(words.len()))
        }
        _ => unreachable!("broadcast is rejected for requests expecting a response"),
    }
}

/// Validate a reassembled frame against the outstanding request and
/// decode it.
fn try_into_response(
    server: Slave,
    request: &Request<'_>,
    expected_len: ExpectedLen,
    frame: &Bytes,
) -> Result<Response> {
    if frame.len() < MIN_RESPONSE_LEN {
        return Err(Error::UnexpectedLength {
            expected: MIN_RESPONSE_LEN,
            actual: frame.len(),
        });
    }

    let (body, crc) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([crc[0], crc[1]]);
    let computed = crc16(body);
    if received != computed {
        return Err(Error::Crc { computed, received });
    }

    let function = request.function_code().value();
    let fn_code = frame[1];
    if fn_code == EXCEPTION_BIT | function {
        let exception = Exception::try_from(frame[2]).map_err(|code| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid exception code: {code}"),
            )
        })?;
        return Err(Error::Exception(exception));
    }

    if frame[0] != server.into() {
        return Err(Error::UnexpectedSlave {
            expected: server.into(),
            actual: frame[0],
        });
    }
    if fn_code != function {
        return Err(Error::UnexpectedFunction {
            expected: function,
            actual: fn_code,
        });
    }
    if let ExpectedLen::Known(expected) = expected_len {
        if frame.len() != expected {
            return Err(Error::UnexpectedLength {
                expected,
                actual: frame.len(),
            });
        }
    }

    let pdu = &frame[1..frame.len() - 2];
    Ok(decode_response(request, pdu)?)
}

/// _Modbus_ RTU client with (server) context and connection state.
///
/// Client that invokes methods (request/response) on a single or many
/// (broadcast) server(s). The server can be switched between calls.
#[derive(Debug)]
pub struct ClientContext<T> {
    client: Option<Client<T>>,
    server: Slave,
}

impl<T> ClientContext<T> {
    pub fn new(client: Client<T>, server: Slave) -> Self {
        Self {
            client: Some(client),
            server,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    #[must_use]
    pub const fn server(&self) -> Slave {
        self.server
    }

    pub fn set_server(&mut self, server: Slave) {
        self.server = server;
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.client.as_ref().and_then(Client::timeout)
    }

    pub fn set_timeout(&mut self, timeout: impl Into<Option<Duration>>) {
        if let Some(client) = &mut self.client {
            client.set_timeout(timeout);
        }
    }
}

impl<T> ClientContext<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn disconnect(&mut self) -> io::Result<()> {
        let Some(client) = self.client.take() else {
            // Already disconnected.
            return Ok(());
        };
        client.disconnect().await
    }

    pub async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        let Some(client) = &mut self.client else {
            return Err(Error::Disconnected);
        };
        client.call(self.server, request).await
    }
}

impl<T> ClientContext<T>
where
    T: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send + 'static,
{
    #[must_use]
    pub fn boxed(self) -> Box<dyn crate::client::Client> {
        Box::new(self)
    }
}

impl<T> SlaveContext for ClientContext<T> {
    fn set_slave(&mut self, slave: Slave) {
        self.set_server(slave);
    }
}

#[async_trait::async_trait]
impl<T> crate::client::Client for ClientContext<T>
where
    T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn call(&mut self, req: Request<'_>) -> Result<Response> {
        self.call(req).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.disconnect().await
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.set_timeout(timeout);
    }
}

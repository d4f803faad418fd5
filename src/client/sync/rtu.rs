// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous RTU client connections

use std::{fmt::Debug, io};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::slave::Slave;

use super::Context;

/// Attach a transport for sending broadcast messages, blocking flavor.
pub fn attach<T>(transport: T) -> io::Result<Context>
where
    T: AsyncRead + AsyncWrite + Debug + Unpin + Send + 'static,
{
    attach_slave(transport, Slave::broadcast())
}

/// Attach a transport addressing a single slave device, blocking
/// flavor.
pub fn attach_slave<T>(transport: T, slave: Slave) -> io::Result<Context>
where
    T: AsyncRead + AsyncWrite + Debug + Unpin + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let async_ctx = crate::client::rtu::attach_slave(transport, slave);
    Ok(Context::new(runtime, async_ctx))
}

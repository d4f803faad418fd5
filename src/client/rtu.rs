// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTU client connections

use std::fmt::Debug;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    rtu::{Client, ClientContext},
    slave::Slave,
};

use super::Context;

/// Attach a transport, e.g. a serial port, for sending broadcast
/// messages.
///
/// No particular slave device is addressed until one is selected with
/// [`SlaveContext::set_slave`].
pub fn attach<T>(transport: T) -> Context
where
    T: AsyncRead + AsyncWrite + Debug + Unpin + Send + 'static,
{
    attach_slave(transport, Slave::broadcast())
}

/// Attach a transport, e.g. a serial port, addressing a single slave
/// device.
pub fn attach_slave<T>(transport: T, slave: Slave) -> Context
where
    T: AsyncRead + AsyncWrite + Debug + Unpin + Send + 'static,
{
    let client = ClientContext::new(Client::new(transport), slave).boxed();
    Context::from(client)
}

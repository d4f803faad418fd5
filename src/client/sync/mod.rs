// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous Modbus client
//!
//! A blocking facade over the asynchronous client: every operation is
//! driven to completion on a private single-threaded runtime.

#[cfg(feature = "rtu-sync")]
pub mod rtu;

use std::{future::Future, io, time::Duration};

use futures_util::future::Either;

use crate::{enron::EnronConfig, frame::*, slave::*, Error, Result};

use super::{
    Client as AsyncClient, Context as AsyncContext, Reader as AsyncReader, Writer as AsyncWriter,
};

fn block_on_with_timeout<T>(
    runtime: &tokio::runtime::Runtime,
    timeout: Option<Duration>,
    task: impl Future<Output = Result<T>>,
) -> Result<T> {
    let task = if let Some(duration) = timeout {
        Either::Left(async move {
            tokio::time::timeout(duration, task)
                .await
                .unwrap_or(Err(Error::Timeout(duration)))
        })
    } else {
        Either::Right(task)
    };
    runtime.block_on(task)
}

/// A transport independent synchronous client trait.
pub trait Client: SlaveContext {
    fn call(&mut self, request: Request<'_>) -> Result<Response>;
}

/// A transport independent synchronous reader trait.
///
/// The blocking counterpart of the asynchronous
/// [`Reader`](`crate::client::Reader`) trait.
pub trait Reader: Client {
    fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;
    fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;
    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;
    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;
    fn read_holding_registers_enron(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<u32>>;
    fn read_exception_status(&mut self) -> Result<i8>;
    fn read_file_records(
        &mut self,
        file_number: u16,
        record_number: u16,
        record_length: u8,
        reference_type: u8,
    ) -> Result<FileRecord>;
    fn read_device_identification(
        &mut self,
        device_id_code: u8,
        object_id: u8,
    ) -> Result<DeviceId>;
    fn read_compressed(&mut self, parameters: &[u16]) -> Result<Compressed>;
}

/// A transport independent synchronous writer trait.
///
/// The blocking counterpart of the asynchronous
/// [`Writer`](`crate::client::Writer`) trait.
pub trait Writer: Client {
    fn write_single_coil(&mut self, addr: Address, state: Coil) -> Result<(Address, Coil)>;
    fn write_multiple_coils(&mut self, addr: Address, coils: &[Coil])
        -> Result<(Address, Quantity)>;
    fn write_single_register(&mut self, addr: Address, value: Word) -> Result<(Address, Word)>;
    fn write_single_register_enron(&mut self, addr: Address, value: u32)
        -> Result<(Address, u32)>;
    fn write_multiple_registers(
        &mut self,
        addr: Address,
        values: &[Word],
    ) -> Result<(Address, Quantity)>;
    fn write_multiple_registers_bytes(
        &mut self,
        addr: Address,
        bytes: &[u8],
    ) -> Result<(Address, Quantity)>;
}

/// A synchronous Modbus client context.
#[derive(Debug)]
pub struct Context {
    runtime: tokio::runtime::Runtime,
    async_ctx: AsyncContext,
    timeout: Option<Duration>,
}

impl Context {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, async_ctx: AsyncContext) -> Self {
        Self {
            runtime,
            async_ctx,
            timeout: None,
        }
    }

    /// Returns the current timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets a timeout duration for all subsequent operations.
    ///
    /// The timeout is disabled by passing `None`.
    pub fn set_timeout(&mut self, duration: impl Into<Option<Duration>>) {
        self.timeout = duration.into();
    }

    /// Disables the timeout for all subsequent operations.
    pub fn reset_timeout(&mut self) {
        self.timeout = None;
    }

    /// The configured Enron register layout, if any.
    #[must_use]
    pub fn enron_config(&self) -> Option<&EnronConfig> {
        self.async_ctx.enron_config()
    }

    /// Configure the Enron register layout used by the Enron read and
    /// write operations.
    pub fn set_enron_config(&mut self, config: impl Into<Option<EnronConfig>>) {
        self.async_ctx.set_enron_config(config);
    }

    /// Disconnects the underlying transport.
    pub fn disconnect(&mut self) -> io::Result<()> {
        self.runtime.block_on(self.async_ctx.disconnect())
    }
}

impl Client for Context {
    fn call(&mut self, request: Request<'_>) -> Result<Response> {
        block_on_with_timeout(&self.runtime, self.timeout, self.async_ctx.call(request))
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.async_ctx.set_slave(slave);
    }
}

impl Reader for Context {
    fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_coils(addr, cnt),
        )
    }

    fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_discrete_inputs(addr, cnt),
        )
    }

    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_holding_registers(addr, cnt),
        )
    }

    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_input_registers(addr, cnt),
        )
    }

    fn read_holding_registers_enron(
        &mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<u32>> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_holding_registers_enron(addr, cnt),
        )
    }

    fn read_exception_status(&mut self) -> Result<i8> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_exception_status(),
        )
    }

    fn read_file_records(
        &mut self,
        file_number: u16,
        record_number: u16,
        record_length: u8,
        reference_type: u8,
    ) -> Result<FileRecord> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx
                .read_file_records(file_number, record_number, record_length, reference_type),
        )
    }

    fn read_device_identification(
        &mut self,
        device_id_code: u8,
        object_id: u8,
    ) -> Result<DeviceId> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx
                .read_device_identification(device_id_code, object_id),
        )
    }

    fn read_compressed(&mut self, parameters: &[u16]) -> Result<Compressed> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_compressed(parameters),
        )
    }
}

impl Writer for Context {
    fn write_single_coil(&mut self, addr: Address, state: Coil) -> Result<(Address, Coil)> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_single_coil(addr, state),
        )
    }

    fn write_multiple_coils(
        &mut self,
        addr: Address,
        coils: &[Coil],
    ) -> Result<(Address, Quantity)> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_multiple_coils(addr, coils),
        )
    }

    fn write_single_register(&mut self, addr: Address, value: Word) -> Result<(Address, Word)> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_single_register(addr, value),
        )
    }

    fn write_single_register_enron(
        &mut self,
        addr: Address,
        value: u32,
    ) -> Result<(Address, u32)> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_single_register_enron(addr, value),
        )
    }

    fn write_multiple_registers(
        &mut self,
        addr: Address,
        values: &[Word],
    ) -> Result<(Address, Quantity)> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_multiple_registers(addr, values),
        )
    }

    fn write_multiple_registers_bytes(
        &mut self,
        addr: Address,
        bytes: &[u8],
    ) -> Result<(Address, Quantity)> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_multiple_registers_bytes(addr, bytes),
        )
    }
}

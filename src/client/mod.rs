// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus clients

use std::{borrow::Cow, fmt::Debug, io, time::Duration};

use async_trait::async_trait;

use crate::{
    codec::MAX_COMPRESSED_PARAMETERS, enron::*, frame::*, slave::*, Error, Result,
};

#[cfg(feature = "rtu")]
pub mod rtu;

#[cfg(feature = "sync")]
pub mod sync;

/// Transport independent asynchronous client trait
#[async_trait]
pub trait Client: SlaveContext + Send + Debug {
    /// Invokes a _Modbus_ function.
    async fn call(&mut self, request: Request<'_>) -> Result<Response>;

    /// Disconnects the client.
    ///
    /// Permanently disconnects the client by shutting down the
    /// underlying stream in a graceful manner (`AsyncDrop`).
    ///
    /// Dropping the client without explicitly disconnecting it
    /// beforehand should also work and free all resources.
    async fn disconnect(&mut self) -> io::Result<()>;

    /// The configured response timeout.
    fn timeout(&self) -> Option<Duration>;

    /// Configure the response timeout.
    ///
    /// The timeout is disabled by passing `None`.
    fn set_timeout(&mut self, timeout: Option<Duration>);
}

/// Asynchronous _Modbus_ reader
#[async_trait]
pub trait Reader: Client {
    /// Read multiple coils (0x01)
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple discrete inputs (0x02)
    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple holding registers (0x03)
    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple input registers (0x04)
    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple Enron registers (0x03 with 32 bit values)
    ///
    /// Registers inside the configured short range are read with the
    /// standard 16 bit width and widened.
    async fn read_holding_registers_enron(
        &mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<u32>>;

    /// Read the exception status byte (0x07)
    ///
    /// The status byte is signed on the wire.
    async fn read_exception_status(&mut self) -> Result<i8>;

    /// Read one record of one file (0x14)
    ///
    /// Only the first sub-record of the response is decoded.
    async fn read_file_records(
        &mut self,
        file_number: u16,
        record_number: u16,
        record_length: u8,
        reference_type: u8,
    ) -> Result<FileRecord>;

    /// Read the device identification objects (0x2B/0x0E)
    ///
    /// Follow-up transactions are issued transparently while the
    /// server reports that more objects follow; the returned value is
    /// the merged result.
    async fn read_device_identification(
        &mut self,
        device_id_code: u8,
        object_id: u8,
    ) -> Result<DeviceId>;

    /// Read up to 16 parameters in one compressed response (0x41)
    async fn read_compressed(&mut self, parameters: &[u16]) -> Result<Compressed>;
}

/// Asynchronous Modbus writer
#[async_trait]
pub trait Writer: Client {
    /// Write a single coil (0x05)
    async fn write_single_coil(&mut self, addr: Address, state: Coil)
        -> Result<(Address, Coil)>;

    /// Write multiple coils (0x0F)
    async fn write_multiple_coils(
        &mut self,
        addr: Address,
        coils: &[Coil],
    ) -> Result<(Address, Quantity)>;

    /// Write a single holding register (0x06)
    async fn write_single_register(
        &mut self,
        addr: Address,
        value: Word,
    ) -> Result<(Address, Word)>;

    /// Write a single Enron register (0x06 with a 32 bit value)
    ///
    /// Registers inside the configured short range are written with
    /// the standard 16 bit width; the value must fit.
    async fn write_single_register_enron(
        &mut self,
        addr: Address,
        value: u32,
    ) -> Result<(Address, u32)>;

    /// Write multiple holding registers (0x10)
    async fn write_multiple_registers(
        &mut self,
        addr: Address,
        values: &[Word],
    ) -> Result<(Address, Quantity)>;

    /// Write multiple holding registers from raw big-endian bytes
    /// (0x10)
    ///
    /// The buffer is emitted verbatim and must contain an even number
    /// of bytes.
    async fn write_multiple_registers_bytes(
        &mut self,
        addr: Address,
        bytes: &[u8],
    ) -> Result<(Address, Quantity)>;
}

/// Asynchronous Modbus client context
#[derive(Debug)]
pub struct Context {
    client: Box<dyn Client>,
    enron: Option<EnronConfig>,
}

impl Context {
    /// The configured Enron register layout, if any.
    #[must_use]
    pub fn enron_config(&self) -> Option<&EnronConfig> {
        self.enron.as_ref()
    }

    /// Configure the Enron register layout used by the Enron read and
    /// write operations.
    ///
    /// Without a configuration the customary default layout applies.
    pub fn set_enron_config(&mut self, config: impl Into<Option<EnronConfig>>) {
        self.enron = config.into();
    }

    fn enron_register_width(&self, addr: Address) -> RegisterWidth {
        self.enron
            .clone()
            .unwrap_or_default()
            .register_width(addr)
    }
}

impl From<Box<dyn Client>> for Context {
    fn from(client: Box<dyn Client>) -> Self {
        Self {
            client,
            enron: None,
        }
    }
}

impl From<Context> for Box<dyn Client> {
    fn from(val: Context) -> Self {
        val.client
    }
}

#[async_trait]
impl Client for Context {
    async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        self.client.call(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.client.disconnect().await
    }

    fn timeout(&self) -> Option<Duration> {
        self.client.timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.client.set_timeout(timeout);
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.client.set_slave(slave);
    }
}

#[async_trait]
impl Reader for Context {
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        self.client
            .call(Request::ReadCoils(addr, cnt))
            .await
            .map(|response| match response {
                Response::ReadCoils(mut coils) => {
                    debug_assert!(coils.len() >= cnt.into());
                    coils.truncate(cnt.into());
                    coils
                }
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        self.client
            .call(Request::ReadDiscreteInputs(addr, cnt))
            .await
            .map(|response| match response {
                Response::ReadDiscreteInputs(mut coils) => {
                    debug_assert!(coils.len() >= cnt.into());
                    coils.truncate(cnt.into());
                    coils
                }
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.client
            .call(Request::ReadHoldingRegisters(addr, cnt))
            .await
            .map(|response| match response {
                Response::ReadHoldingRegisters(words) => {
                    debug_assert_eq!(words.len(), cnt.into());
                    words
                }
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.client
            .call(Request::ReadInputRegisters(addr, cnt))
            .await
            .map(|response| match response {
                Response::ReadInputRegisters(words) => {
                    debug_assert_eq!(words.len(), cnt.into());
                    words
                }
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn read_holding_registers_enron(
        &mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<u32>> {
        match self.enron_register_width(addr) {
            RegisterWidth::Word => {
                let words = self.read_holding_registers(addr, cnt).await?;
                Ok(words.into_iter().map(u32::from).collect())
            }
            RegisterWidth::Double => self
                .client
                .call(Request::ReadHoldingRegistersEnron(addr, cnt))
                .await
                .map(|response| match response {
                    Response::ReadHoldingRegistersEnron(values) => {
                        debug_assert_eq!(values.len(), cnt.into());
                        values
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                }),
        }
    }

    async fn read_exception_status(&mut self) -> Result<i8> {
        self.client
            .call(Request::ReadExceptionStatus)
            .await
            .map(|response| match response {
                Response::ReadExceptionStatus(status) => status,
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn read_file_records(
        &mut self,
        file_number: u16,
        record_number: u16,
        record_length: u8,
        reference_type: u8,
    ) -> Result<FileRecord> {
        self.client
            .call(Request::ReadFileRecord {
                file_number,
                record_number,
                record_length,
                reference_type,
            })
            .await
            .map(|response| match response {
                Response::ReadFileRecord(record) => record,
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn read_device_identification(
        &mut self,
        device_id_code: u8,
        object_id: u8,
    ) -> Result<DeviceId> {
        if !(1..=4).contains(&device_id_code) {
            return Err(Error::InvalidParameter(
                "device id code must be between 1 and 4",
            ));
        }

        let mut result = DeviceId::default();
        let mut object_id = object_id;
        loop {
            let response = self
                .client
                .call(Request::ReadDeviceIdentification {
                    device_id_code,
                    object_id,
                })
                .await?;
            let Response::ReadDeviceIdentification(part) = response else {
                unreachable!("call() should reject mismatching responses");
            };
            let received_objects = !part.objects.is_empty();
            result.merge(part);
            // A device reporting "more follows" without delivering a
            // single object would keep us going forever.
            if result.more_follows == 0 || !received_objects {
                break;
            }
            object_id = result.next_object_id;
        }
        Ok(result)
    }

    async fn read_compressed(&mut self, parameters: &[u16]) -> Result<Compressed> {
        if parameters.is_empty() || parameters.len() > MAX_COMPRESSED_PARAMETERS {
            return Err(Error::InvalidParameter(
                "compressed read supports 1 to 16 parameters",
            ));
        }
        self.client
            .call(Request::ReadCompressed(Cow::Borrowed(parameters)))
            .await
            .map(|response| match response {
                Response::ReadCompressed(compressed) => compressed,
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }
}

#[async_trait]
impl Writer for Context {
    async fn write_single_coil(
        &mut self,
        addr: Address,
        state: Coil,
    ) -> Result<(Address, Coil)> {
        self.client
            .call(Request::WriteSingleCoil(addr, state))
            .await
            .map(|response| match response {
                Response::WriteSingleCoil(rsp_addr, rsp_state) => (rsp_addr, rsp_state),
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn write_multiple_coils(
        &mut self,
        addr: Address,
        coils: &[Coil],
    ) -> Result<(Address, Quantity)> {
        self.client
            .call(Request::WriteMultipleCoils(addr, Cow::Borrowed(coils)))
            .await
            .map(|response| match response {
                Response::WriteMultipleCoils(rsp_addr, rsp_cnt) => (rsp_addr, rsp_cnt),
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn write_single_register(
        &mut self,
        addr: Address,
        value: Word,
    ) -> Result<(Address, Word)> {
        self.client
            .call(Request::WriteSingleRegister(addr, value))
            .await
            .map(|response| match response {
                Response::WriteSingleRegister(rsp_addr, rsp_value) => (rsp_addr, rsp_value),
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn write_single_register_enron(
        &mut self,
        addr: Address,
        value: u32,
    ) -> Result<(Address, u32)> {
        match self.enron_register_width(addr) {
            RegisterWidth::Word => {
                let value = Word::try_from(value).map_err(|_| {
                    Error::InvalidParameter("value does not fit a 16 bit register")
                })?;
                let (addr, value) = self.write_single_register(addr, value).await?;
                Ok((addr, value.into()))
            }
            RegisterWidth::Double => self
                .client
                .call(Request::WriteSingleRegisterEnron(addr, value))
                .await
                .map(|response| match response {
                    Response::WriteSingleRegisterEnron(rsp_addr, rsp_value) => {
                        (rsp_addr, rsp_value)
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                }),
        }
    }

    async fn write_multiple_registers(
        &mut self,
        addr: Address,
        values: &[Word],
    ) -> Result<(Address, Quantity)> {
        self.client
            .call(Request::WriteMultipleRegisters(addr, Cow::Borrowed(values)))
            .await
            .map(|response| match response {
                Response::WriteMultipleRegisters(rsp_addr, rsp_cnt) => (rsp_addr, rsp_cnt),
                _ => unreachable!("call() should reject mismatching responses"),
            })
    }

    async fn write_multiple_registers_bytes(
        &mut self,
        addr: Address,
        bytes: &[u8],
    ) -> Result<(Address, Quantity)> {
        if bytes.len() % 2 != 0 {
            return Err(Error::InvalidParameter(
                "register data requires an even number of bytes",
            ));
        }
        let values: Vec<Word> = bytes
            .chunks_exact(2)
            .map(|pair| Word::from_be_bytes([pair[0], pair[1]]))
            .collect();
        self.write_multiple_registers(addr, &values).await
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed Modbus requests and responses.

#[cfg(feature = "rtu")]
pub(crate) mod rtu;

use std::{borrow::Cow, collections::BTreeMap, error, fmt};

use crate::bytes::Bytes;

/// A Modbus protocol address is represented by 16 bit from `0` to `65535`.
///
/// This *protocol address* uses 0-based indexing, while the *coil address* or
/// *register address* is often specified as a number with 1-based indexing.
/// Please consult the specification of your devices if 1-based coil/register
/// addresses need to be converted to 0-based protocol addresses by subtracting 1.
pub type Address = u16;

/// A Coil represents a single bit.
///
/// - `true` is equivalent to `ON`, `1` and `0xFF00`.
/// - `false` is equivalent to `OFF`, `0` and `0x0000`.
pub(crate) type Coil = bool;

/// Modbus uses 16 bit for its data items.
///
/// Transmitted using a big-endian representation.
pub(crate) type Word = u16;

/// Number of items to process.
pub type Quantity = u16;

/// The operation selector of a request.
///
/// Responses echo the code of the request; a set high bit marks an
/// exception response instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 0x01
    ReadCoils,
    /// 0x02
    ReadDiscreteInputs,
    /// 0x03
    ReadHoldingRegisters,
    /// 0x04
    ReadInputRegisters,
    /// 0x05
    WriteSingleCoil,
    /// 0x06
    WriteSingleRegister,
    /// 0x07
    ReadExceptionStatus,
    /// 0x0F
    WriteMultipleCoils,
    /// 0x10
    WriteMultipleRegisters,
    /// 0x14
    ReadFileRecord,
    /// 0x2B with MEI type 0x0E
    ReadDeviceIdentification,
    /// 0x41 (Danfoss "read compressed")
    ReadCompressed,
}

impl FunctionCode {
    /// The wire representation of the function code.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::ReadExceptionStatus => 0x07,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
            Self::ReadFileRecord => 0x14,
            Self::ReadDeviceIdentification => 0x2B,
            Self::ReadCompressed => 0x41,
        }
    }

    /// Check if requests with this code may be sent to the broadcast
    /// address.
    ///
    /// Broadcast messages are one-way; only writes make sense without
    /// a response.
    #[must_use]
    pub(crate) const fn supports_broadcast(self) -> bool {
        matches!(
            self,
            Self::WriteSingleCoil
                | Self::WriteSingleRegister
                | Self::WriteMultipleCoils
                | Self::WriteMultipleRegisters
        )
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0>2X}", self.value())
    }
}

/// A request represents a message from the client (master) to the server (slave).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// A request to read multiple coils.
    /// The first parameter is the address of the first coil to read.
    /// The second parameter is the number of coils to read.
    ReadCoils(Address, Quantity),

    /// A request to read multiple discrete inputs.
    /// The first parameter is the address of the first discrete input to read.
    /// The second parameter is the number of discrete inputs to read.
    ReadDiscreteInputs(Address, Quantity),

    /// A request to read multiple holding registers.
    /// The first parameter is the address of the first holding register to read.
    /// The second parameter is the number of holding registers to read.
    ReadHoldingRegisters(Address, Quantity),

    /// A request to read multiple input registers.
    /// The first parameter is the address of the first input register to read.
    /// The second parameter is the number of input registers to read.
    ReadInputRegisters(Address, Quantity),

    /// A request to read multiple 32 bit Enron registers.
    /// The parameters are the same as for
    /// [`ReadHoldingRegisters`](Self::ReadHoldingRegisters); each
    /// register occupies four bytes of the response.
    ReadHoldingRegistersEnron(Address, Quantity),

    /// A request to write a single coil.
    /// The first parameter is the address of the coil.
    /// The second parameter is the value to write to the coil.
    WriteSingleCoil(Address, Coil),

    /// A request to write a single holding register.
    /// The first parameter is the address of the register.
    /// The second parameter is the value to write to the register.
    WriteSingleRegister(Address, Word),

    /// A request to write a single 32 bit Enron register.
    /// The first parameter is the address of the register.
    /// The second parameter is the value to write to the register.
    WriteSingleRegisterEnron(Address, u32),

    /// A request to write multiple coils.
    /// The first parameter is the address of the first coil to write.
    /// The second parameter is the vector of values to write to the coils.
    WriteMultipleCoils(Address, Cow<'a, [Coil]>),

    /// A request to write multiple holding registers.
    /// The first parameter is the address of the first register to write.
    /// The second parameter is the vector of values to write to the registers.
    WriteMultipleRegisters(Address, Cow<'a, [Word]>),

    /// A request to read the exception status byte of the server.
    ReadExceptionStatus,

    /// A request to read one record of one file.
    ReadFileRecord {
        /// Number of the file to read from.
        file_number: u16,
        /// Number of the first record to read.
        record_number: u16,
        /// Number of registers to read from the record.
        record_length: u8,
        /// Reference type of the sub-request; `7` marks ASCII data.
        reference_type: u8,
    },

    /// A request to read identification objects of the server.
    ReadDeviceIdentification {
        /// Access level, `1` (basic) to `4` (specific object).
        device_id_code: u8,
        /// First object to read.
        object_id: u8,
    },

    /// A request to read up to 16 parameters in one compressed
    /// response.
    /// The parameter lists the parameter numbers to read.
    ReadCompressed(Cow<'a, [u16]>),
}

impl Request<'_> {
    /// The function code this request is transmitted with.
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(_, _) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(_, _) => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters(_, _) | Self::ReadHoldingRegistersEnron(_, _) => {
                FunctionCode::ReadHoldingRegisters
            }
            Self::ReadInputRegisters(_, _) => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil(_, _) => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister(_, _) | Self::WriteSingleRegisterEnron(_, _) => {
                FunctionCode::WriteSingleRegister
            }
            Self::WriteMultipleCoils(_, _) => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters(_, _) => FunctionCode::WriteMultipleRegisters,
            Self::ReadExceptionStatus => FunctionCode::ReadExceptionStatus,
            Self::ReadFileRecord { .. } => FunctionCode::ReadFileRecord,
            Self::ReadDeviceIdentification { .. } => FunctionCode::ReadDeviceIdentification,
            Self::ReadCompressed(_) => FunctionCode::ReadCompressed,
        }
    }

    /// Converts the request into an owned instance with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> Request<'static> {
        use Request::*;

        match self {
            ReadCoils(addr, qty) => ReadCoils(addr, qty),
            ReadDiscreteInputs(addr, qty) => ReadDiscreteInputs(addr, qty),
            ReadHoldingRegisters(addr, qty) => ReadHoldingRegisters(addr, qty),
            ReadInputRegisters(addr, qty) => ReadInputRegisters(addr, qty),
            ReadHoldingRegistersEnron(addr, qty) => ReadHoldingRegistersEnron(addr, qty),
            WriteSingleCoil(addr, coil) => WriteSingleCoil(addr, coil),
            WriteSingleRegister(addr, word) => WriteSingleRegister(addr, word),
            WriteSingleRegisterEnron(addr, value) => WriteSingleRegisterEnron(addr, value),
            WriteMultipleCoils(addr, coils) => {
                WriteMultipleCoils(addr, Cow::Owned(coils.into_owned()))
            }
            WriteMultipleRegisters(addr, words) => {
                WriteMultipleRegisters(addr, Cow::Owned(words.into_owned()))
            }
            ReadExceptionStatus => ReadExceptionStatus,
            ReadFileRecord {
                file_number,
                record_number,
                record_length,
                reference_type,
            } => ReadFileRecord {
                file_number,
                record_number,
                record_length,
                reference_type,
            },
            ReadDeviceIdentification {
                device_id_code,
                object_id,
            } => ReadDeviceIdentification {
                device_id_code,
                object_id,
            },
            ReadCompressed(pnu) => ReadCompressed(Cow::Owned(pnu.into_owned())),
        }
    }
}

/// The payload of a file record response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRecordData {
    /// Raw record bytes.
    Raw(Bytes),
    /// ASCII record data, truncated at the first NUL byte.
    Ascii(String),
}

/// One record read from a file on the server.
///
/// Only the first sub-record of a response is represented; devices
/// answering a single-record request with several sub-records are not
/// supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Record payload.
    pub data: FileRecordData,
    /// Byte length of the sub-record as reported by the server.
    pub data_len: u8,
}

/// Identification objects read from a server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceId {
    /// Identification objects by object id, decoded as ASCII.
    pub objects: BTreeMap<u8, String>,
    /// Conformity level reported by the server.
    pub conformity_level: u8,
    /// Non-zero if further objects are available in a follow-up
    /// transaction.
    pub more_follows: u8,
    /// First object id of the follow-up transaction.
    pub next_object_id: u8,
}

impl DeviceId {
    /// Fold a continuation response into the accumulated result.
    ///
    /// The server controls object ordering; colliding ids are
    /// overwritten by the later response.
    pub(crate) fn merge(&mut self, other: DeviceId) {
        let DeviceId {
            objects,
            conformity_level,
            more_follows,
            next_object_id,
        } = other;
        self.objects.extend(objects);
        self.conformity_level = conformity_level;
        self.more_follows = more_follows;
        self.next_object_id = next_object_id;
    }
}

/// Values of a compressed parameter read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    /// Parameter values in request order.
    pub values: Vec<i16>,
    /// Error-flag bitmap as transmitted by the server; a set bit marks
    /// the corresponding parameter as invalid.
    pub error_flags: u16,
}

/// The data of a successful request.
///
/// `ReadCoils`/`ReadDiscreteInputs`: the length of the result `Vec` is
/// always a multiple of 8. Only the values of the first bits/coils that
/// have actually been requested are defined; the value of the remaining
/// bits depends on the server implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Response to a `ReadCoils` request.
    ReadCoils(Vec<Coil>),

    /// Response to a `ReadDiscreteInputs` request.
    ReadDiscreteInputs(Vec<Coil>),

    /// Response to a `ReadHoldingRegisters` request.
    ReadHoldingRegisters(Vec<Word>),

    /// Response to a `ReadInputRegisters` request.
    ReadInputRegisters(Vec<Word>),

    /// Response to a `ReadHoldingRegistersEnron` request.
    ReadHoldingRegistersEnron(Vec<u32>),

    /// Response to a `WriteSingleCoil` request, echoing address and
    /// written state.
    WriteSingleCoil(Address, Coil),

    /// Response to a `WriteSingleRegister` request, echoing address and
    /// written value.
    WriteSingleRegister(Address, Word),

    /// Response to a `WriteSingleRegisterEnron` request, echoing
    /// address and written value.
    WriteSingleRegisterEnron(Address, u32),

    /// Response to a `WriteMultipleCoils` request, echoing the start
    /// address and the number of written coils.
    WriteMultipleCoils(Address, Quantity),

    /// Response to a `WriteMultipleRegisters` request, echoing the
    /// start address and the number of written registers.
    WriteMultipleRegisters(Address, Quantity),

    /// Response to a `ReadExceptionStatus` request.
    ///
    /// The status byte is signed on the wire.
    ReadExceptionStatus(i8),

    /// Response to a `ReadFileRecord` request.
    ReadFileRecord(FileRecord),

    /// Response to a `ReadDeviceIdentification` request.
    ReadDeviceIdentification(DeviceId),

    /// Response to a `ReadCompressed` request.
    ReadCompressed(Compressed),
}

impl Response {
    /// The function code this response was transmitted with.
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(_) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters(_) | Self::ReadHoldingRegistersEnron(_) => {
                FunctionCode::ReadHoldingRegisters
            }
            Self::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil(_, _) => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister(_, _) | Self::WriteSingleRegisterEnron(_, _) => {
                FunctionCode::WriteSingleRegister
            }
            Self::WriteMultipleCoils(_, _) => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters(_, _) => FunctionCode::WriteMultipleRegisters,
            Self::ReadExceptionStatus(_) => FunctionCode::ReadExceptionStatus,
            Self::ReadFileRecord(_) => FunctionCode::ReadFileRecord,
            Self::ReadDeviceIdentification(_) => FunctionCode::ReadDeviceIdentification,
            Self::ReadCompressed(_) => FunctionCode::ReadCompressed,
        }
    }
}

/// A server (slave) exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exception {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    SlaveDeviceFailure = 0x04,
    Acknowledge = 0x05,
    SlaveDeviceBusy = 0x06,
    NegativeAcknowledge = 0x07,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetFailed = 0x0B,
}

impl Exception {
    /// The wire representation of the exception code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn description(&self) -> &'static str {
        use Exception::*;

        match *self {
            IllegalFunction => "Illegal function (device does not support this read/write function)",
            IllegalDataAddress => "Illegal data address (register not supported by device)",
            IllegalDataValue => "Illegal data value (value cannot be written to this register)",
            SlaveDeviceFailure => "Slave device failure (device reports internal error)",
            Acknowledge => "Acknowledge (requested data will be available later)",
            SlaveDeviceBusy => "Slave device busy (retry request again later)",
            NegativeAcknowledge => "Negative acknowledge (device cannot perform the request)",
            MemoryParityError => "Memory parity error (device failed to read from memory)",
            GatewayPathUnavailable => "Gateway path unavailable (misconfigured gateway)",
            GatewayTargetFailed => "Gateway target device failed to respond",
        }
    }
}

impl TryFrom<u8> for Exception {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        use Exception::*;

        let ex = match code {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => SlaveDeviceFailure,
            0x05 => Acknowledge,
            0x06 => SlaveDeviceBusy,
            0x07 => NegativeAcknowledge,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetFailed,
            _ => return Err(code),
        };
        Ok(ex)
    }
}

impl From<Exception> for u8 {
    fn from(from: Exception) -> Self {
        from as u8
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl error::Error for Exception {}

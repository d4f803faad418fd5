// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A pure [Rust](https://www.rust-lang.org)
//! [Modbus](https://en.wikipedia.org/wiki/Modbus) RTU client library
//! based on [tokio](https://tokio.rs).
//!
//! The client marshals typed requests into RTU frames, hands them to a
//! generic byte-stream transport, reassembles answers out of the
//! free-flowing inbound stream and reconciles them with the outstanding
//! request. Responses are surfaced as typed results, server exceptions
//! and validation failures as typed errors.
//!
//! ## Features
//!
//! - async (non-blocking) client with an optional blocking facade
//! - Modbus RTU framing with CRC-16 validation
//! - read/write of coils, discrete inputs and registers
//! - read file records (0x14), exception status (0x07) and
//!   compressed register sets (0x41)
//! - device identification (0x2B/0x0E) including multi-frame
//!   continuation
//! - Enron Modbus 32-bit register extension
//! - transport-agnostic: any [`AsyncRead`](tokio::io::AsyncRead) +
//!   [`AsyncWrite`](tokio::io::AsyncWrite) byte stream can be attached
//!
//! # Example
//!
//! ```rust,no_run
//! use modbus_client::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Any byte stream works; a serial port is the usual choice.
//!     let stream = tokio::net::TcpStream::connect("192.168.0.222:502").await?;
//!
//!     let mut ctx = client::rtu::attach_slave(stream, Slave(0x11));
//!     let data = ctx.read_holding_registers(0x006B, 2).await?;
//!     println!("Response is '{data:?}'");
//!     Ok(())
//! }
//! ```
//!
//! # Protocol-Specification
//!
//! - [MODBUS Application Protocol Specification v1.1b3 (PDF)](http://modbus.org/docs/Modbus_Application_Protocol_V1_1b3.pdf)
//! - [MODBUS over serial line specification and implementation guide v1.02 (PDF)](http://modbus.org/docs/Modbus_over_serial_line_V1_02.pdf)

/// Re-export the [`bytes`](::bytes) crate used in the public API.
pub use bytes;

pub mod prelude;

pub mod client;

#[cfg(feature = "rtu")]
pub mod rtu;

mod codec;
mod enron;
mod error;
mod frame;
mod slave;

pub use self::{
    enron::{EnronConfig, RegisterRange, RegisterWidth},
    error::{Error, Result},
    frame::{
        Address, Compressed, DeviceId, Exception, FileRecord, FileRecordData, FunctionCode,
        Quantity, Request, Response,
    },
    slave::{Slave, SlaveContext, SlaveId},
};

// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::{io, time::Duration};

use thiserror::Error;

use crate::frame::{Exception, FunctionCode};

/// Everything that can go wrong between submitting a request and
/// receiving its decoded response.
///
/// None of these failures is retried; the caller decides whether to
/// resubmit.
#[derive(Debug, Error)]
pub enum Error {
    /// A request was submitted while the transport is not connected.
    #[error("the transport is not connected")]
    Disconnected,

    /// A broadcast request was submitted for a function code that
    /// requires a response.
    #[error("broadcast is not allowed for function {0}")]
    BroadcastNotAllowed(FunctionCode),

    /// A request parameter is outside the range the protocol can
    /// express.
    #[error("invalid request parameter: {0}")]
    InvalidParameter(&'static str),

    /// No valid response arrived within the configured timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The trailing CRC of a response frame did not match the
    /// recomputed value.
    #[error("CRC mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    Crc {
        /// CRC recomputed over the received frame body.
        computed: u16,
        /// CRC carried by the received frame.
        received: u16,
    },

    /// The response frame length did not match the expectation derived
    /// from the request.
    #[error("unexpected response length: expected {expected}, actual {actual}")]
    UnexpectedLength {
        /// Frame length implied by the request.
        expected: usize,
        /// Frame length actually received.
        actual: usize,
    },

    /// The response carried a different slave address than the request.
    #[error("unexpected slave address: expected 0x{expected:02X}, actual 0x{actual:02X}")]
    UnexpectedSlave {
        /// Address the request was sent to.
        expected: u8,
        /// Address found in the response.
        actual: u8,
    },

    /// The response carried a different function code than the request.
    #[error("unexpected function code: expected 0x{expected:02X}, actual 0x{actual:02X}")]
    UnexpectedFunction {
        /// Function code of the request.
        expected: u8,
        /// Function code found in the response.
        actual: u8,
    },

    /// The server answered with a well-formed _Modbus_ exception.
    #[error("{0}")]
    Exception(#[from] Exception),

    /// The transport failed or delivered undecodable data.
    #[error("transport: {0}")]
    Transport(#[from] io::Error),
}

/// Result type alias with the crate-wide [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

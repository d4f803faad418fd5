// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FunctionCode, Request};

use crate::slave::SlaveId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) slave_id: SlaveId,
}

/// A request frame before serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestAdu<'a> {
    pub(crate) hdr: Header,
    pub(crate) pdu: &'a Request<'a>,
}

/// Response frame length derived from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpectedLen {
    /// The full frame length, including address and CRC.
    Known(usize),
    /// The response is self-describing and must be sized by parsing.
    Unknown,
}

/// Everything the stream reassembler remembers about the outstanding
/// request while waiting for its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExpectedResponse {
    pub(crate) slave_id: SlaveId,
    pub(crate) function: FunctionCode,
    pub(crate) len: ExpectedLen,
}

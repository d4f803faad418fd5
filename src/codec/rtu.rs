// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{Error, Result};

use smallvec::SmallVec;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    frame::{
        rtu::{ExpectedLen, ExpectedResponse, RequestAdu},
        FunctionCode, Request,
    },
};

use super::expected_response_len;

// [Modbus over Serial Line Specification and Implementation Guide V1.02](http://modbus.org/docs/Modbus_over_serial_line_V1_02.pdf), page 13
// "The maximum size of a Modbus RTU frame is 256 bytes."
const MAX_FRAME_LEN: usize = 256;

/// Address, function code, exception code and CRC.
const EXCEPTION_FRAME_LEN: usize = 5;

/// No complete answer, exception frames included, is shorter than this.
const MIN_FRAME_LEN: usize = 5;

const CRC_LEN: usize = 2;

/// High bit of the function code marking an exception response.
pub(crate) const EXCEPTION_BIT: u8 = 0x80;

/// Compute the Modbus CRC-16 (polynomial 0xA001, seed 0xFFFF).
///
/// The low byte of the result is transmitted first.
pub(crate) fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0xFFFF;
    for x in data {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            let crc_odd = (crc & 0x0001) != 0;
            crc >>= 1;
            if crc_odd {
                crc ^= 0xA001;
            }
        }
    }
    crc
}

type DroppedBytes = SmallVec<[u8; 32]>;

/// Stateful RTU client codec.
///
/// The encoder frames one request and remembers what its answer must
/// look like; the decoder locates that answer inside the free-flowing
/// inbound byte stream. RTU has no framing of its own, so without the
/// remembered request nothing can be decoded.
#[derive(Debug, Default)]
pub(crate) struct ClientCodec {
    expected: Option<ExpectedResponse>,
    dropped_bytes: DroppedBytes,
}

/// Response length of requests the scanner can size up front.
///
/// File record and device identification responses are self-describing
/// and must be sized by parsing instead.
fn scan_len(req: &Request<'_>) -> ExpectedLen {
    match req.function_code() {
        FunctionCode::ReadFileRecord | FunctionCode::ReadDeviceIdentification => {
            ExpectedLen::Unknown
        }
        _ => expected_response_len(req),
    }
}

/// Walk the object list of a device identification response starting
/// at `start` and return the full frame length, CRC included.
///
/// `None` means the list is still incomplete.
fn device_id_frame_len(buf: &[u8], start: usize) -> Option<usize> {
    // [addr] [fn] [mei] [id code] [conformity] [more] [next] [count]
    if buf.len() < start + 8 {
        return None;
    }
    let num_objects = usize::from(buf[start + 7]);
    let mut pos = start + 8;
    for _ in 0..num_objects {
        if buf.len() < pos + 2 {
            return None;
        }
        pos += 2 + usize::from(buf[pos + 1]);
    }
    Some(pos - start + CRC_LEN)
}

/// Frame length of a file record response, taken from the byte count
/// the server reports at offset 2.
fn file_record_frame_len(buf: &[u8], start: usize) -> Option<usize> {
    if buf.len() < start + 3 {
        return None;
    }
    Some(5 + usize::from(buf[start + 2]))
}

impl ClientCodec {
    fn record_dropped(&mut self, bytes: &[u8]) {
        if self.dropped_bytes.len() + bytes.len() > MAX_FRAME_LEN {
            log::error!(
                "Giving up to track {} dropped byte(s): {:X?}",
                self.dropped_bytes.len(),
                self.dropped_bytes
            );
            self.dropped_bytes.clear();
        }
        self.dropped_bytes.extend_from_slice(bytes);
    }

    /// Hand out the frame at `buf[start..start + len]` and discard it
    /// together with everything buffered before it.
    fn take_frame(&mut self, buf: &mut BytesMut, start: usize, len: usize) -> Bytes {
        let mut frame = buf.split_to(start + len);
        if start > 0 {
            let garbage = frame.split_to(start);
            self.record_dropped(&garbage);
        }
        if !self.dropped_bytes.is_empty() {
            log::warn!(
                "Successfully decoded frame after dropping {} byte(s): {:X?}",
                self.dropped_bytes.len(),
                self.dropped_bytes
            );
            self.dropped_bytes.clear();
        }
        self.expected = None;
        frame.freeze()
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let pdu_data: Bytes = pdu.try_into()?;
        buf.reserve(pdu_data.len() + 3);
        let start = buf.len();
        buf.put_u8(hdr.slave_id);
        buf.put_slice(&pdu_data);
        let crc = crc16(&buf[start..]);
        buf.put_u16_le(crc);

        // Broadcast requests are answered by nobody; everything else
        // arms the scanner for exactly one answer.
        self.expected = (hdr.slave_id != 0).then(|| ExpectedResponse {
            slave_id: hdr.slave_id,
            function: pdu.function_code(),
            len: scan_len(pdu),
        });
        Ok(())
    }
}

impl Decoder for ClientCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        // A frame never exceeds 256 bytes; retain only the newest data.
        if buf.len() > MAX_FRAME_LEN {
            let excess = buf.split_to(buf.len() - MAX_FRAME_LEN);
            self.record_dropped(&excess);
        }

        let Some(expected) = self.expected else {
            // No outstanding request: stray bytes cannot be an answer.
            return Ok(None);
        };

        // Wait until the buffer could hold either the expected answer
        // or at least an exception frame.
        if buf.len() < MIN_FRAME_LEN {
            return Ok(None);
        }

        let function = expected.function.value();
        let mut i = 0;
        while i + MIN_FRAME_LEN <= buf.len() {
            if buf[i] != expected.slave_id {
                i += 1;
                continue;
            }
            let fn_code = buf[i + 1];
            if fn_code == function {
                let frame_len = match expected.len {
                    ExpectedLen::Known(len) => Some(len),
                    ExpectedLen::Unknown => match expected.function {
                        FunctionCode::ReadDeviceIdentification => device_id_frame_len(buf, i),
                        FunctionCode::ReadFileRecord => file_record_frame_len(buf, i),
                        _ => unreachable!("only self-describing responses lack a length"),
                    },
                };
                return match frame_len {
                    Some(len) if i + len <= buf.len() => Ok(Some(self.take_frame(buf, i, len))),
                    // Answer located but not yet completely buffered.
                    _ => Ok(None),
                };
            }
            if fn_code == EXCEPTION_BIT | function && i + EXCEPTION_FRAME_LEN <= buf.len() {
                return Ok(Some(self.take_frame(buf, i, EXCEPTION_FRAME_LEN)));
            }
            if fn_code & 0x7F == function {
                // Plausible header, more bytes pending.
                return Ok(None);
            }
            i += 1;
        }
        Ok(None)
    }
}

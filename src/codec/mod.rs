// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialization of request PDUs and decoding of response PDUs.
//!
//! Responses are decoded against the originating request: the wire
//! format alone cannot distinguish 16 bit from 32 bit Enron registers,
//! nor recover how many coils of the trailing padding byte were
//! actually requested.

use std::io::{Cursor, Error, ErrorKind, Result};

use byteorder::{BigEndian, ReadBytesExt as _};

use crate::{
    bytes::{Buf as _, BufMut as _, Bytes, BytesMut},
    frame::*,
};

#[cfg(feature = "rtu")]
pub(crate) mod rtu;

#[cfg(feature = "rtu")]
use crate::frame::rtu::ExpectedLen;

/// Maximum number of parameters of a compressed read.
pub(crate) const MAX_COMPRESSED_PARAMETERS: usize = 16;

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn u16_len(len: usize) -> u16 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

impl<'a> TryFrom<&'a Request<'a>> for Bytes {
    type Error = Error;

    fn try_from(req: &'a Request<'a>) -> Result<Bytes> {
        use crate::frame::Request::*;

        let cnt = request_byte_count(req);
        let mut data = BytesMut::with_capacity(cnt);
        data.put_u8(req.function_code().value());
        match *req {
            ReadCoils(address, quantity)
            | ReadDiscreteInputs(address, quantity)
            | ReadHoldingRegisters(address, quantity)
            | ReadInputRegisters(address, quantity)
            | ReadHoldingRegistersEnron(address, quantity) => {
                data.put_u16(address);
                data.put_u16(quantity);
            }
            WriteSingleCoil(address, state) => {
                data.put_u16(address);
                data.put_u16(bool_to_coil(state));
            }
            WriteSingleRegister(address, word) => {
                data.put_u16(address);
                data.put_u16(word);
            }
            WriteSingleRegisterEnron(address, value) => {
                data.put_u16(address);
                data.put_u32(value);
            }
            WriteMultipleCoils(address, ref coils) => {
                data.put_u16(address);
                let len = coils.len();
                data.put_u16(u16_len(len));
                let packed_coils = pack_coils(coils);
                data.put_u8(u8_len(packed_coils.len()));
                for b in packed_coils {
                    data.put_u8(b);
                }
            }
            WriteMultipleRegisters(address, ref words) => {
                data.put_u16(address);
                let len = words.len();
                data.put_u16(u16_len(len));
                data.put_u8(u8_len(len * 2));
                for w in &**words {
                    data.put_u16(*w);
                }
            }
            ReadExceptionStatus => (),
            ReadFileRecord {
                file_number,
                record_number,
                record_length,
                reference_type,
            } => {
                data.put_u8(7);
                data.put_u8(reference_type);
                data.put_u16(file_number);
                data.put_u16(record_number);
                data.put_u8(record_length);
            }
            ReadDeviceIdentification {
                device_id_code,
                object_id,
            } => {
                data.put_u8(MEI_DEVICE_IDENTIFICATION);
                data.put_u8(device_id_code);
                data.put_u8(object_id);
            }
            ReadCompressed(ref parameters) => {
                if parameters.is_empty() || parameters.len() > MAX_COMPRESSED_PARAMETERS {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "compressed read supports 1 to 16 parameters",
                    ));
                }
                data.put_u8(u8_len(parameters.len()));
                for pnu in &**parameters {
                    data.put_u16(*pnu);
                }
            }
        }
        Ok(data.freeze())
    }
}

/// MEI transport type of the device identification interface.
pub(crate) const MEI_DEVICE_IDENTIFICATION: u8 = 0x0E;

fn request_byte_count(req: &Request<'_>) -> usize {
    use crate::frame::Request::*;

    match *req {
        ReadCoils(_, _)
        | ReadDiscreteInputs(_, _)
        | ReadHoldingRegisters(_, _)
        | ReadInputRegisters(_, _)
        | ReadHoldingRegistersEnron(_, _)
        | WriteSingleRegister(_, _)
        | WriteSingleCoil(_, _) => 5,
        WriteSingleRegisterEnron(_, _) => 7,
        WriteMultipleCoils(_, ref coils) => 6 + packed_coils_len(coils.len()),
        WriteMultipleRegisters(_, ref data) => 6 + data.len() * 2,
        ReadExceptionStatus => 1,
        ReadFileRecord { .. } => 8,
        ReadDeviceIdentification { .. } => 4,
        ReadCompressed(ref parameters) => 2 + parameters.len() * 2,
    }
}

/// Full response frame length (address, PDU and CRC) implied by a
/// request, as far as it can be known up front.
#[cfg(feature = "rtu")]
pub(crate) fn expected_response_len(req: &Request<'_>) -> ExpectedLen {
    use crate::frame::Request::*;

    const OVERHEAD: usize = 3 + 2; // address + function + byte count, CRC

    match *req {
        ReadCoils(_, quantity) | ReadDiscreteInputs(_, quantity) => {
            ExpectedLen::Known(OVERHEAD + packed_coils_len(quantity.into()))
        }
        ReadHoldingRegisters(_, quantity) | ReadInputRegisters(_, quantity) => {
            ExpectedLen::Known(OVERHEAD + 2 * usize::from(quantity))
        }
        ReadHoldingRegistersEnron(_, quantity) => {
            ExpectedLen::Known(OVERHEAD + 4 * usize::from(quantity))
        }
        WriteSingleCoil(_, _)
        | WriteSingleRegister(_, _)
        | WriteMultipleCoils(_, _)
        | WriteMultipleRegisters(_, _) => ExpectedLen::Known(8),
        WriteSingleRegisterEnron(_, _) => ExpectedLen::Known(10),
        ReadExceptionStatus => ExpectedLen::Known(5),
        ReadFileRecord { record_length, .. } => {
            ExpectedLen::Known(OVERHEAD + 2 + 2 * usize::from(record_length))
        }
        ReadDeviceIdentification { .. } => ExpectedLen::Unknown,
        ReadCompressed(ref parameters) => ExpectedLen::Known(OVERHEAD + 2 + 2 * parameters.len()),
    }
}

/// Decode a response PDU (function code plus data, CRC already
/// stripped) into the typed result matching the originating request.
pub(crate) fn decode_response(request: &Request<'_>, pdu: &[u8]) -> Result<Response> {
    use crate::frame::Request::*;

    let mut rdr = Cursor::new(pdu);
    let _fn_code = rdr.read_u8()?;
    let rsp = match *request {
        ReadCoils(_, _) | ReadDiscreteInputs(_, _) => {
            let byte_count = rdr.read_u8()?;
            let packed = pdu
                .get(2..2 + usize::from(byte_count))
                .ok_or_else(short_response)?;
            let coils = unpack_coils(packed, u16::from(byte_count) * 8);
            if matches!(request, ReadCoils(_, _)) {
                Response::ReadCoils(coils)
            } else {
                Response::ReadDiscreteInputs(coils)
            }
        }
        ReadHoldingRegisters(_, _) | ReadInputRegisters(_, _) => {
            let byte_count = rdr.read_u8()?;
            let quantity = byte_count / 2;
            let mut data = Vec::with_capacity(quantity.into());
            for _ in 0..quantity {
                data.push(rdr.read_u16::<BigEndian>()?);
            }
            if matches!(request, ReadHoldingRegisters(_, _)) {
                Response::ReadHoldingRegisters(data)
            } else {
                Response::ReadInputRegisters(data)
            }
        }
        ReadHoldingRegistersEnron(_, _) => {
            let byte_count = rdr.read_u8()?;
            let quantity = byte_count / 4;
            let mut data = Vec::with_capacity(quantity.into());
            for _ in 0..quantity {
                data.push(rdr.read_u32::<BigEndian>()?);
            }
            Response::ReadHoldingRegistersEnron(data)
        }
        WriteSingleCoil(_, _) => {
            let address = rdr.read_u16::<BigEndian>()?;
            let state = rdr.read_u16::<BigEndian>()? == COIL_ON;
            Response::WriteSingleCoil(address, state)
        }
        WriteSingleRegister(_, _) => {
            Response::WriteSingleRegister(rdr.read_u16::<BigEndian>()?, rdr.read_u16::<BigEndian>()?)
        }
        WriteSingleRegisterEnron(_, _) => Response::WriteSingleRegisterEnron(
            rdr.read_u16::<BigEndian>()?,
            rdr.read_u32::<BigEndian>()?,
        ),
        WriteMultipleCoils(_, _) => {
            Response::WriteMultipleCoils(rdr.read_u16::<BigEndian>()?, rdr.read_u16::<BigEndian>()?)
        }
        WriteMultipleRegisters(_, _) => Response::WriteMultipleRegisters(
            rdr.read_u16::<BigEndian>()?,
            rdr.read_u16::<BigEndian>()?,
        ),
        ReadExceptionStatus => Response::ReadExceptionStatus(rdr.read_i8()?),
        ReadFileRecord { .. } => {
            let _byte_count = rdr.read_u8()?;
            let data_len = rdr.read_u8()?;
            let reference_type = rdr.read_u8()?;
            if data_len == 0 {
                return Err(Error::new(ErrorKind::InvalidData, "empty file sub-record"));
            }
            let payload = pdu
                .get(4..4 + usize::from(data_len) - 1)
                .ok_or_else(short_response)?;
            let data = if reference_type == FILE_RECORD_ASCII {
                let nul = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
                FileRecordData::Ascii(String::from_utf8_lossy(&payload[..nul]).into_owned())
            } else {
                FileRecordData::Raw(Bytes::copy_from_slice(payload))
            };
            Response::ReadFileRecord(FileRecord { data, data_len })
        }
        ReadDeviceIdentification { .. } => {
            let _mei_type = rdr.read_u8()?;
            let _device_id_code = rdr.read_u8()?;
            let conformity_level = rdr.read_u8()?;
            let more_follows = rdr.read_u8()?;
            let next_object_id = rdr.read_u8()?;
            let num_objects = rdr.read_u8()?;
            let mut objects = std::collections::BTreeMap::new();
            for _ in 0..num_objects {
                let object_id = rdr.read_u8()?;
                let object_len = rdr.read_u8()?;
                #[allow(clippy::cast_possible_truncation)]
                let start = rdr.position() as usize;
                let raw = pdu
                    .get(start..start + usize::from(object_len))
                    .ok_or_else(short_response)?;
                rdr.advance(object_len.into());
                objects.insert(object_id, String::from_utf8_lossy(raw).into_owned());
            }
            Response::ReadDeviceIdentification(DeviceId {
                objects,
                conformity_level,
                more_follows,
                next_object_id,
            })
        }
        ReadCompressed(_) => {
            let byte_count = rdr.read_u8()?;
            if byte_count < 2 {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    "compressed response too short",
                ));
            }
            let error_flags = rdr.read_u16::<BigEndian>()?;
            let quantity = (byte_count - 2) / 2;
            let mut values = Vec::with_capacity(quantity.into());
            for _ in 0..quantity {
                values.push(rdr.read_i16::<BigEndian>()?);
            }
            Response::ReadCompressed(Compressed {
                values,
                error_flags,
            })
        }
    };
    Ok(rsp)
}

fn short_response() -> Error {
    Error::new(ErrorKind::InvalidData, "response data truncated")
}

/// Wire encoding of an energized coil.
const COIL_ON: u16 = 0xFF00;
/// Reference type marking ASCII file records.
const FILE_RECORD_ASCII: u8 = 7;

fn bool_to_coil(state: bool) -> u16 {
    if state {
        COIL_ON
    } else {
        0x0000
    }
}

pub(crate) fn packed_coils_len(bitcount: usize) -> usize {
    bitcount.div_ceil(8)
}

/// Pack coil states into a bitmap, coil `i` into bit `i % 8` of byte
/// `i / 8`.
pub(crate) fn pack_coils(coils: &[Coil]) -> Vec<u8> {
    let packed_size = packed_coils_len(coils.len());
    let mut res = vec![0; packed_size];
    for (i, b) in coils.iter().enumerate() {
        let v = u8::from(*b); // 0 or 1
        res[i / 8] |= v << (i % 8);
    }
    res
}

/// Unpack a coil bitmap, LSB first per byte.
pub(crate) fn unpack_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    let mut res = Vec::with_capacity(count.into());
    for i in 0usize..count.into() {
        res.push((bytes[i / 8] >> (i % 8)) & 0b1 > 0);
    }
    res
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn request_pdu(req: &Request<'_>) -> Bytes {
        req.try_into().unwrap()
    }

    #[test]
    fn convert_bool_to_coil() {
        assert_eq!(bool_to_coil(true), 0xFF00);
        assert_eq!(bool_to_coil(false), 0x0000);
    }

    #[test]
    fn convert_booleans_to_bytes() {
        assert_eq!(pack_coils(&[]), &[]);
        assert_eq!(pack_coils(&[true]), &[0b1]);
        assert_eq!(pack_coils(&[false]), &[0b0]);
        assert_eq!(pack_coils(&[true, false]), &[0b_01]);
        assert_eq!(pack_coils(&[false, true]), &[0b_10]);
        assert_eq!(pack_coils(&[true, true]), &[0b_11]);
        assert_eq!(pack_coils(&[true; 8]), &[0b_1111_1111]);
        assert_eq!(pack_coils(&[true; 9]), &[255, 1]);
        assert_eq!(pack_coils(&[false; 8]), &[0]);
        assert_eq!(pack_coils(&[false; 9]), &[0, 0]);
    }

    #[test]
    fn unpack_bits() {
        assert_eq!(unpack_coils(&[], 0), &[]);
        assert_eq!(unpack_coils(&[0, 0], 0), &[]);
        assert_eq!(unpack_coils(&[0b1], 1), &[true]);
        assert_eq!(unpack_coils(&[0b01], 2), &[true, false]);
        assert_eq!(unpack_coils(&[0b10], 2), &[false, true]);
        assert_eq!(unpack_coils(&[0b101], 3), &[true, false, true]);
        assert_eq!(unpack_coils(&[0xff, 0b11], 10), &[true; 10]);
    }

    #[test]
    fn pack_unpack_round_trip() {
        let coils = [true, false, true, true, false, false, true, false, true];
        let packed = pack_coils(&coils);
        assert_eq!(unpack_coils(&packed, u16_len(coils.len())), &coils);
    }

    mod serialize_requests {
        use super::*;

        #[test]
        fn read_coils() {
            let bytes = request_pdu(&Request::ReadCoils(0x12, 4));
            assert_eq!(&bytes[..], &[0x01, 0x00, 0x12, 0x00, 0x04]);
        }

        #[test]
        fn read_discrete_inputs() {
            let bytes = request_pdu(&Request::ReadDiscreteInputs(0x03, 19));
            assert_eq!(&bytes[..], &[0x02, 0x00, 0x03, 0x00, 19]);
        }

        #[test]
        fn read_holding_registers() {
            let bytes = request_pdu(&Request::ReadHoldingRegisters(0x006B, 2));
            assert_eq!(&bytes[..], &[0x03, 0x00, 0x6B, 0x00, 0x02]);
        }

        #[test]
        fn read_holding_registers_enron() {
            // Same layout as the standard request; only the response
            // width differs.
            let bytes = request_pdu(&Request::ReadHoldingRegistersEnron(5001, 2));
            assert_eq!(&bytes[..], &[0x03, 0x13, 0x89, 0x00, 0x02]);
        }

        #[test]
        fn write_single_coil() {
            let bytes = request_pdu(&Request::WriteSingleCoil(0x00AC, true));
            assert_eq!(&bytes[..], &[0x05, 0x00, 0xAC, 0xFF, 0x00]);

            let bytes = request_pdu(&Request::WriteSingleCoil(0x00AC, false));
            assert_eq!(&bytes[..], &[0x05, 0x00, 0xAC, 0x00, 0x00]);
        }

        #[test]
        fn write_multiple_coils() {
            let states = [true, false, true, true];
            let bytes = request_pdu(&Request::WriteMultipleCoils(0x3311, Cow::Borrowed(&states)));
            assert_eq!(
                &bytes[..],
                &[0x0F, 0x33, 0x11, 0x00, 0x04, 0x01, 0b_0000_1101]
            );
        }

        #[test]
        fn write_single_register() {
            let bytes = request_pdu(&Request::WriteSingleRegister(0x07, 0xABCD));
            assert_eq!(&bytes[..], &[0x06, 0x00, 0x07, 0xAB, 0xCD]);
        }

        #[test]
        fn write_single_register_enron() {
            let bytes = request_pdu(&Request::WriteSingleRegisterEnron(5007, 0x0001_E240));
            assert_eq!(&bytes[..], &[0x06, 0x13, 0x8F, 0x00, 0x01, 0xE2, 0x40]);
        }

        #[test]
        fn write_multiple_registers() {
            let bytes = request_pdu(&Request::WriteMultipleRegisters(
                0x06,
                Cow::Borrowed(&[0xABCD, 0xEF12]),
            ));
            assert_eq!(
                &bytes[..],
                &[0x10, 0x00, 0x06, 0x00, 0x02, 0x04, 0xAB, 0xCD, 0xEF, 0x12]
            );
        }

        #[test]
        fn read_exception_status() {
            let bytes = request_pdu(&Request::ReadExceptionStatus);
            assert_eq!(&bytes[..], &[0x07]);
        }

        #[test]
        fn read_file_record() {
            let bytes = request_pdu(&Request::ReadFileRecord {
                file_number: 4,
                record_number: 1,
                record_length: 3,
                reference_type: 6,
            });
            assert_eq!(
                &bytes[..],
                &[0x14, 0x07, 0x06, 0x00, 0x04, 0x00, 0x01, 0x03]
            );
        }

        #[test]
        fn read_device_identification() {
            let bytes = request_pdu(&Request::ReadDeviceIdentification {
                device_id_code: 0x01,
                object_id: 0x00,
            });
            assert_eq!(&bytes[..], &[0x2B, 0x0E, 0x01, 0x00]);
        }

        #[test]
        fn read_compressed() {
            let bytes = request_pdu(&Request::ReadCompressed(Cow::Borrowed(&[104, 105, 106])));
            assert_eq!(
                &bytes[..],
                &[0x41, 0x03, 0x00, 0x68, 0x00, 0x69, 0x00, 0x6A]
            );
        }

        #[test]
        fn read_compressed_rejects_too_many_parameters() {
            let parameters = vec![1u16; 17];
            let res: Result<Bytes> = (&Request::ReadCompressed(Cow::Owned(parameters))).try_into();
            assert!(res.is_err());
        }
    }

    #[cfg(feature = "rtu")]
    mod response_lengths {
        use super::*;

        #[test]
        fn reads() {
            assert_eq!(
                expected_response_len(&Request::ReadCoils(0x13, 0x25)),
                ExpectedLen::Known(3 + 5 + 2)
            );
            assert_eq!(
                expected_response_len(&Request::ReadHoldingRegisters(0x6B, 2)),
                ExpectedLen::Known(9)
            );
            assert_eq!(
                expected_response_len(&Request::ReadHoldingRegistersEnron(5001, 2)),
                ExpectedLen::Known(13)
            );
            assert_eq!(
                expected_response_len(&Request::ReadExceptionStatus),
                ExpectedLen::Known(5)
            );
        }

        #[test]
        fn writes() {
            assert_eq!(
                expected_response_len(&Request::WriteSingleCoil(0, true)),
                ExpectedLen::Known(8)
            );
            assert_eq!(
                expected_response_len(&Request::WriteSingleRegisterEnron(5001, 1)),
                ExpectedLen::Known(10)
            );
            assert_eq!(
                expected_response_len(&Request::WriteMultipleCoils(0, Cow::Borrowed(&[true]))),
                ExpectedLen::Known(8)
            );
            assert_eq!(
                expected_response_len(&Request::WriteMultipleRegisters(0, Cow::Borrowed(&[1]))),
                ExpectedLen::Known(8)
            );
        }

        #[test]
        fn self_describing() {
            assert_eq!(
                expected_response_len(&Request::ReadFileRecord {
                    file_number: 4,
                    record_number: 1,
                    record_length: 3,
                    reference_type: 6,
                }),
                ExpectedLen::Known(5 + 2 * 3 + 2)
            );
            assert_eq!(
                expected_response_len(&Request::ReadDeviceIdentification {
                    device_id_code: 1,
                    object_id: 0,
                }),
                ExpectedLen::Unknown
            );
            assert_eq!(
                expected_response_len(&Request::ReadCompressed(Cow::Borrowed(&[1, 2, 3]))),
                ExpectedLen::Known(4 + 2 * 3 + 3)
            );
        }
    }

    mod deserialize_responses {
        use super::*;

        #[test]
        fn read_coils() {
            let req = Request::ReadCoils(0x13, 5);
            let rsp = decode_response(&req, &[0x01, 0x01, 0b_0000_1001]).unwrap();
            assert_eq!(
                rsp,
                Response::ReadCoils(vec![true, false, false, true, false, false, false, false])
            );
        }

        #[test]
        fn read_holding_registers() {
            let req = Request::ReadHoldingRegisters(0x6B, 2);
            let rsp = decode_response(&req, &[0x03, 0x04, 0xAE, 0x41, 0x56, 0x52]).unwrap();
            assert_eq!(rsp, Response::ReadHoldingRegisters(vec![0xAE41, 0x5652]));
        }

        #[test]
        fn read_holding_registers_enron() {
            let req = Request::ReadHoldingRegistersEnron(5001, 1);
            let rsp = decode_response(&req, &[0x03, 0x04, 0x00, 0x01, 0xE2, 0x40]).unwrap();
            assert_eq!(rsp, Response::ReadHoldingRegistersEnron(vec![0x0001_E240]));
        }

        #[test]
        fn write_single_coil() {
            let req = Request::WriteSingleCoil(0xAC, true);
            let rsp = decode_response(&req, &[0x05, 0x00, 0xAC, 0xFF, 0x00]).unwrap();
            assert_eq!(rsp, Response::WriteSingleCoil(0xAC, true));

            let rsp = decode_response(&req, &[0x05, 0x00, 0xAC, 0x00, 0x00]).unwrap();
            assert_eq!(rsp, Response::WriteSingleCoil(0xAC, false));
        }

        #[test]
        fn write_single_register_enron() {
            let req = Request::WriteSingleRegisterEnron(5007, 0x0001_E240);
            let rsp =
                decode_response(&req, &[0x06, 0x13, 0x8F, 0x00, 0x01, 0xE2, 0x40]).unwrap();
            assert_eq!(rsp, Response::WriteSingleRegisterEnron(5007, 0x0001_E240));
        }

        #[test]
        fn write_multiple() {
            let req = Request::WriteMultipleCoils(0x3311, Cow::Borrowed(&[true; 5]));
            let rsp = decode_response(&req, &[0x0F, 0x33, 0x11, 0x00, 0x05]).unwrap();
            assert_eq!(rsp, Response::WriteMultipleCoils(0x3311, 5));

            let req = Request::WriteMultipleRegisters(0x06, Cow::Borrowed(&[1, 2]));
            let rsp = decode_response(&req, &[0x10, 0x00, 0x06, 0x00, 0x02]).unwrap();
            assert_eq!(rsp, Response::WriteMultipleRegisters(0x06, 2));
        }

        #[test]
        fn read_exception_status() {
            let rsp = decode_response(&Request::ReadExceptionStatus, &[0x07, 0x6D]).unwrap();
            assert_eq!(rsp, Response::ReadExceptionStatus(0x6D));

            // The status byte is signed on the wire.
            let rsp = decode_response(&Request::ReadExceptionStatus, &[0x07, 0x80]).unwrap();
            assert_eq!(rsp, Response::ReadExceptionStatus(-128));
        }

        #[test]
        fn read_file_record_raw() {
            let req = Request::ReadFileRecord {
                file_number: 4,
                record_number: 1,
                record_length: 2,
                reference_type: 6,
            };
            let rsp =
                decode_response(&req, &[0x14, 0x06, 0x05, 0x06, 0x0D, 0xFE, 0x00, 0x20]).unwrap();
            assert_eq!(
                rsp,
                Response::ReadFileRecord(FileRecord {
                    data: FileRecordData::Raw(Bytes::from_static(&[0x0D, 0xFE, 0x00, 0x20])),
                    data_len: 5,
                })
            );
        }

        #[test]
        fn read_file_record_ascii_truncates_at_nul() {
            let req = Request::ReadFileRecord {
                file_number: 4,
                record_number: 1,
                record_length: 3,
                reference_type: 7,
            };
            let rsp = decode_response(
                &req,
                &[0x14, 0x08, 0x07, 0x07, b'S', b'N', b'1', 0x00, b'X', b'Y'],
            )
            .unwrap();
            assert_eq!(
                rsp,
                Response::ReadFileRecord(FileRecord {
                    data: FileRecordData::Ascii("SN1".to_owned()),
                    data_len: 7,
                })
            );
        }

        #[test]
        fn read_device_identification() {
            let req = Request::ReadDeviceIdentification {
                device_id_code: 0x01,
                object_id: 0x00,
            };
            let rsp = decode_response(
                &req,
                &[
                    0x2B, 0x0E, 0x01, 0x01, 0x00, 0x00, 0x02, // header
                    0x00, 0x03, b'F', b'o', b'o', // object 0
                    0x01, 0x03, b'B', b'a', b'r', // object 1
                ],
            )
            .unwrap();
            let Response::ReadDeviceIdentification(id) = rsp else {
                panic!("unexpected response");
            };
            assert_eq!(id.conformity_level, 0x01);
            assert_eq!(id.more_follows, 0x00);
            assert_eq!(id.objects.len(), 2);
            assert_eq!(id.objects[&0], "Foo");
            assert_eq!(id.objects[&1], "Bar");
        }

        #[test]
        fn read_compressed() {
            let req = Request::ReadCompressed(Cow::Borrowed(&[104, 105]));
            let rsp = decode_response(
                &req,
                &[0x41, 0x06, 0x80, 0x00, 0xFF, 0x9C, 0x00, 0x64],
            )
            .unwrap();
            assert_eq!(
                rsp,
                Response::ReadCompressed(Compressed {
                    values: vec![-100, 100],
                    error_flags: 0x8000,
                })
            );
        }

        #[test]
        fn truncated_responses_are_rejected() {
            let req = Request::ReadCoils(0, 8);
            assert!(decode_response(&req, &[0x01, 0x02, 0xFF]).is_err());

            let req = Request::ReadHoldingRegisters(0, 2);
            assert!(decode_response(&req, &[0x03, 0x04, 0xAE]).is_err());
        }
    }
}

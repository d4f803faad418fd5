// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end RTU client tests over an in-memory transport.

#![cfg(feature = "rtu")]

use std::time::Duration;

use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

use modbus_client::{prelude::*, Error, Exception};

/// Append the Modbus CRC to a frame body.
fn with_crc(body: &[u8]) -> Vec<u8> {
    let mut crc: u16 = 0xFFFF;
    for x in body {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            let crc_odd = (crc & 0x0001) != 0;
            crc >>= 1;
            if crc_odd {
                crc ^= 0xA001;
            }
        }
    }
    let mut frame = body.to_vec();
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

#[tokio::test]
async fn read_two_holding_registers() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));

    let server = tokio::spawn(async move {
        let mut request = [0u8; 8];
        server_stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request, [0x11, 0x03, 0x00, 0x6B, 0x00, 0x02, 0x76, 0x87]);
        server_stream
            .write_all(&[0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD])
            .await
            .unwrap();
    });

    let data = ctx.read_holding_registers(0x006B, 2).await?;
    assert_eq!(data, vec![0xAE41, 0x5652]);

    server.await?;
    Ok(())
}

#[tokio::test]
async fn illegal_data_address_exception() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));

    let server = tokio::spawn(async move {
        let mut request = [0u8; 8];
        server_stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request, [0x11, 0x01, 0x00, 0x13, 0x00, 0x25, 0x0E, 0x84]);
        server_stream
            .write_all(&[0x11, 0x81, 0x02, 0xC1, 0x91])
            .await
            .unwrap();
    });

    let err = ctx.read_coils(0x0013, 0x25).await.err().unwrap();
    assert!(matches!(
        err,
        Error::Exception(Exception::IllegalDataAddress)
    ));
    assert_eq!(
        err.to_string(),
        "Illegal data address (register not supported by device)"
    );

    server.await?;
    Ok(())
}

#[tokio::test]
async fn broadcast_write_completes_without_response() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach(client_stream);

    // Completes before anything is read on the server side.
    let (addr, state) = ctx.write_single_coil(0x00AC, true).await?;
    assert_eq!((addr, state), (0x00AC, true));

    let mut request = [0u8; 8];
    server_stream.read_exact(&mut request).await?;
    assert_eq!(request[..], with_crc(&[0x00, 0x05, 0x00, 0xAC, 0xFF, 0x00])[..]);
    Ok(())
}

#[tokio::test]
async fn resync_on_leading_garbage() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));

    let server = tokio::spawn(async move {
        let mut request = [0u8; 8];
        server_stream.read_exact(&mut request).await.unwrap();
        server_stream
            .write_all(&[
                0xFF, 0xFF, // line noise
                0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD,
            ])
            .await
            .unwrap();
    });

    let data = ctx.read_holding_registers(0x006B, 2).await?;
    assert_eq!(data, vec![0xAE41, 0x5652]);

    server.await?;
    Ok(())
}

#[tokio::test]
async fn crc_mismatch_is_reported() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));

    let server = tokio::spawn(async move {
        let mut request = [0u8; 8];
        server_stream.read_exact(&mut request).await.unwrap();
        server_stream
            .write_all(&[0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAE])
            .await
            .unwrap();
    });

    let err = ctx.read_holding_registers(0x006B, 2).await.err().unwrap();
    assert!(matches!(err, Error::Crc { received: 0xAE49, .. }));

    server.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_fires_once_and_late_bytes_are_tolerated() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));
    ctx.set_timeout(Some(Duration::from_millis(100)));

    // No response at all: the transaction must fail with a timeout.
    let err = ctx.read_holding_registers(0x006B, 2).await.err().unwrap();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(100)));

    // A late fragment arrives after the transaction is gone.
    server_stream.write_all(&[0xFF, 0xFF]).await?;

    let server = tokio::spawn(async move {
        // Both the timed-out and the new request are still buffered.
        let mut requests = [0u8; 16];
        server_stream.read_exact(&mut requests).await.unwrap();
        server_stream
            .write_all(&[0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD])
            .await
            .unwrap();
    });

    // The next transaction skips the stale fragment and succeeds.
    let data = ctx.read_holding_registers(0x006B, 2).await?;
    assert_eq!(data, vec![0xAE41, 0x5652]);

    server.await?;
    Ok(())
}

#[tokio::test]
async fn device_identification_continuation() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));

    let server = tokio::spawn(async move {
        let mut request = [0u8; 7];
        server_stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request[..], with_crc(&[0x11, 0x2B, 0x0E, 0x01, 0x00])[..]);
        let response = with_crc(&[
            0x11, 0x2B, 0x0E, 0x01, 0x81, 0xFF, 0x02, 0x02, // more follows
            0x00, 0x03, b'F', b'o', b'o', // object 0
            0x01, 0x03, b'B', b'a', b'r', // object 1
        ]);
        server_stream.write_all(&response).await.unwrap();

        let mut request = [0u8; 7];
        server_stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request[..], with_crc(&[0x11, 0x2B, 0x0E, 0x01, 0x02])[..]);
        let response = with_crc(&[
            0x11, 0x2B, 0x0E, 0x01, 0x81, 0x00, 0x00, 0x01, // final chunk
            0x02, 0x03, b'B', b'a', b'z', // object 2
        ]);
        server_stream.write_all(&response).await.unwrap();
    });

    let id = ctx.read_device_identification(0x01, 0x00).await?;
    assert_eq!(id.conformity_level, 0x81);
    assert_eq!(id.objects.len(), 3);
    assert_eq!(id.objects[&0x00], "Foo");
    assert_eq!(id.objects[&0x01], "Bar");
    assert_eq!(id.objects[&0x02], "Baz");

    server.await?;
    Ok(())
}

#[tokio::test]
async fn read_file_record_ascii() -> anyhow::Result<()> {
    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    let mut ctx = client::rtu::attach_slave(client_stream, Slave(0x11));

    let server = tokio::spawn(async move {
        let mut request = [0u8; 11];
        server_stream.read_exact(&mut request).await.unwrap();
        assert_eq!(
            request[..],
            with_crc(&[0x11, 0x14, 0x07, 0x07, 0x00, 0x04, 0x00, 0x01, 0x03])[..]
        );
        let response = with_crc(&[
            0x11, 0x14, 0x08, 0x07, 0x07, b'S', b'N', b'1', 0x00, b'X', b'Y',
        ]);
        server_stream.write_all(&response).await.unwrap();
    });

    let record = ctx.read_file_records(4, 1, 3, 7).await?;
    assert_eq!(record.data, FileRecordData::Ascii("SN1".to_owned()));
    assert_eq!(record.data_len, 7);

    server.await?;
    Ok(())
}

#[cfg(feature = "rtu-sync")]
#[test]
fn blocking_facade_reads_registers() {
    use futures::executor::block_on;
    use modbus_client::client::sync::{Reader as _, Writer as _};

    let (client_stream, mut server_stream) = tokio::io::duplex(256);
    // The in-memory transport buffers the canned response up front.
    block_on(server_stream.write_all(&[
        0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD,
    ]))
    .unwrap();

    let mut ctx = client::sync::rtu::attach_slave(client_stream, Slave(0x11)).unwrap();
    ctx.set_timeout(Duration::from_secs(1));
    let data = ctx.read_holding_registers(0x006B, 2).unwrap();
    assert_eq!(data, vec![0xAE41, 0x5652]);

    block_on(server_stream.write_all(&with_crc(&[0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00]))).unwrap();
    let (addr, state) = ctx.write_single_coil(0x00AC, true).unwrap();
    assert_eq!((addr, state), (0x00AC, true));
}

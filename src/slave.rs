// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus devices

use std::fmt;

/// Slave identifier
pub type SlaveId = u8;

/// A single byte for addressing Modbus slave devices.
///
/// The terms *slave id* and *unit id* are used synonymously depending
/// on the context. This library consistently adopted the term *slave*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slave(pub SlaveId);

impl Slave {
    /// The address reserved for one-way messages to every device on
    /// the bus at once.
    ///
    /// Nothing answers a broadcast, so only write requests may be sent
    /// to this address.
    #[must_use]
    pub const fn broadcast() -> Self {
        Slave(0)
    }

    /// Check if the address is used for broadcasting
    #[must_use]
    pub fn is_broadcast(self) -> bool {
        self == Self::broadcast()
    }
}

impl From<SlaveId> for Slave {
    fn from(from: SlaveId) -> Self {
        Slave(from)
    }
}

impl From<Slave> for SlaveId {
    fn from(from: Slave) -> Self {
        from.0
    }
}

impl fmt::Display for Slave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slave 0x{:0>2X}", self.0)
    }
}

/// Stateful management of the currently addressed device.
pub trait SlaveContext {
    /// Select a slave device for all subsequent outgoing requests.
    fn set_slave(&mut self, slave: Slave);
}

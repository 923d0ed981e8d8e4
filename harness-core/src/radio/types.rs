//! Value types exchanged with the radio stack.

use core::{fmt, time::Duration};

use heapless::String;

/// Maximum number of bytes retained from an advertised or local device name.
pub const MAX_DEVICE_NAME_LEN: usize = 32;

/// Bounded device name as carried in advertising data.
pub type DeviceName = String<MAX_DEVICE_NAME_LEN>;

/// Builds a [`DeviceName`], truncating at a character boundary when `name` is too long.
#[must_use]
pub fn device_name(name: &str) -> DeviceName {
    let mut bounded = DeviceName::new();
    for ch in name.chars() {
        if bounded.push(ch).is_err() {
            break;
        }
    }
    bounded
}

/// Six-byte device address, stored least-significant byte first as radios report it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct PeerAddress([u8; 6]);

impl PeerAddress {
    /// Wraps address bytes in over-the-air (little-endian) order.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Builds an address from bytes in display order (most-significant first).
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; 6]) -> Self {
        Self([bytes[5], bytes[4], bytes[3], bytes[2], bytes[1], bytes[0]])
    }

    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 6] {
        self.0
    }

    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 6] {
        let b = self.0;
        [b[5], b[4], b[3], b[2], b[1], b[0]]
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.to_be_bytes().iter().enumerate() {
            if index > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AddressType {
    Public,
    Random,
}

/// Remote device identity as reported by the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Peer {
    pub address_type: AddressType,
    pub address: PeerAddress,
}

impl Peer {
    #[must_use]
    pub const fn new(address_type: AddressType, address: PeerAddress) -> Self {
        Self {
            address_type,
            address,
        }
    }
}

/// Stack-assigned handle of an established connection.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConnectionHandle(pub u16);

/// Stack-assigned handle of an established periodic sync.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SyncHandle(pub u16);

/// Which side of a link initiated it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectionRole {
    Central,
    Peripheral,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Central => f.write_str("central"),
            ConnectionRole::Peripheral => f.write_str("peripheral"),
        }
    }
}

/// Radio session kind requested from the console.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperationKind {
    Advertise,
    Scan,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdvertisingMode {
    Legacy,
    Periodic,
}

impl AdvertisingMode {
    #[must_use]
    pub const fn is_periodic(self) -> bool {
        matches!(self, AdvertisingMode::Periodic)
    }
}

/// Operation kind paired with the advertising flavour it uses or seeks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RadioMode {
    pub operation: OperationKind,
    pub advertising: AdvertisingMode,
}

impl RadioMode {
    #[must_use]
    pub const fn new(operation: OperationKind, advertising: AdvertisingMode) -> Self {
        Self {
            operation,
            advertising,
        }
    }

    #[must_use]
    pub const fn advertise(periodic: bool) -> Self {
        Self::new(OperationKind::Advertise, mode_for(periodic))
    }

    #[must_use]
    pub const fn scan(periodic: bool) -> Self {
        Self::new(OperationKind::Scan, mode_for(periodic))
    }
}

const fn mode_for(periodic: bool) -> AdvertisingMode {
    if periodic {
        AdvertisingMode::Periodic
    } else {
        AdvertisingMode::Legacy
    }
}

/// Accepted range for the periodic advertising interval.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PeriodicIntervalBounds {
    pub min: Duration,
    pub max: Duration,
}

impl PeriodicIntervalBounds {
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Bounds spanning half to twice the nominal interval.
    #[must_use]
    pub fn around(nominal: Duration) -> Self {
        Self {
            min: nominal / 2,
            max: nominal.saturating_mul(2),
        }
    }

    #[must_use]
    pub fn contains(&self, interval: Duration) -> bool {
        (self.min..=self.max).contains(&interval)
    }
}

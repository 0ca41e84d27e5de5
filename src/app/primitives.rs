//! Identifiers shared by the application logic and its host.

use core::fmt;
use core::str::FromStr;
use bitcoin::hashes::{sha512_256, Hash as _, HashEngine as _};
use bitcoin::hex::{DisplayHex, FromHex, HexToArrayError};

use super::deserialize::{self, UnexpectedEnd};

/// A 32-byte ledger account address.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address, used by the ledger as "no account".
    pub const ZERO: Address = Address([0; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the account controlled by the application itself.
    ///
    /// The address is `SHA-512/256("appID" || be64(id))`, so it's stable for the lifetime of the
    /// application and nobody holds a key for it.
    pub fn for_application(id: AppId) -> Self {
        let mut engine = sha512_256::Hash::engine();
        engine.input(b"appID");
        engine.input(&id.0.to_be_bytes());
        Address(sha512_256::Hash::from_engine(engine).to_byte_array())
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    pub(crate) fn deserialize(bytes: &mut &[u8]) -> Result<Self, UnexpectedEnd> {
        deserialize::array(bytes).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.as_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <[u8; 32]>::from_hex(s).map(Address).map_err(AddressParseError)
    }
}

/// The text isn't 64 hex digits.
#[derive(Debug)]
pub struct AddressParseError(HexToArrayError);

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid address: {}", self.0)
    }
}

impl std::error::Error for AddressParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for Address {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        Address(crate::test_macros::arbitrary(gen))
    }
}

/// Identifier of a deployed application.
///
/// Zero is reserved: a call carrying it creates a new application.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AppId(pub u64);

impl AppId {
    pub const CREATION: AppId = AppId(0);

    pub fn is_creation(self) -> bool {
        self == Self::CREATION
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for AppId {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        AppId(<u64 as quickcheck::Arbitrary>::arbitrary(gen))
    }
}

/// Identifier of a ledger asset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for AssetId {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        AssetId(<u64 as quickcheck::Arbitrary>::arbitrary(gen))
    }
}

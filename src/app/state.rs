//! The application's global state schema.
//!
//! The state consists of exactly two keys, `"Version"` (uint) and `"admin"` (bytes). They are
//! written once, by the creation call, and this crate never mutates them afterwards. Before
//! creation no state exists and reads fall back to the ledger defaults (zero and empty bytes).

use core::convert::TryFrom;

use super::constants::{self, KEY_ADMIN, KEY_VERSION};
use super::deserialize::{self, StateVersion, UnexpectedEnd};
use super::primitives::Address;
use super::{Deserialize, Serialize, StateData};

/// Process-wide state of one deployed application.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlobalState {
    version: u64,
    admin: Address,
}

impl GlobalState {
    /// Version written by the creation call.
    pub const INITIAL_VERSION: u64 = 1;

    /// Builds the state a creation call writes: the initial version and the creator as admin.
    pub fn create(creator: Address) -> Self {
        GlobalState {
            version: Self::INITIAL_VERSION,
            admin: creator,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn is_admin(&self, account: &Address) -> bool {
        self.admin == *account
    }

    /// Returns the state as it's stored on the ledger, key-value pairs in key order.
    pub fn entries(&self) -> [(&'static [u8], Value); 2] {
        [
            (KEY_VERSION, Value::Uint(self.version)),
            (KEY_ADMIN, Value::Bytes(self.admin.as_bytes().to_vec())),
        ]
    }

    /// Rebuilds the state from ledger key-value pairs.
    ///
    /// Both keys must be present with the right types, unknown keys are rejected.
    pub fn from_entries<'a, I: IntoIterator<Item = (&'a [u8], Value)>>(entries: I) -> Result<Self, SchemaError> {
        let mut version = None;
        let mut admin = None;
        for (key, value) in entries {
            match (key, value) {
                (KEY_VERSION, Value::Uint(value)) if version.is_none() => version = Some(value),
                (KEY_ADMIN, Value::Bytes(value)) if admin.is_none() => {
                    let bytes = <[u8; 32]>::try_from(&*value).map_err(|_| SchemaError::InvalidAdmin(value.len()))?;
                    admin = Some(Address::from_bytes(bytes));
                },
                (KEY_VERSION, _) | (KEY_ADMIN, _) => return Err(SchemaError::InvalidEntry(key.to_vec())),
                (key, _) => return Err(SchemaError::UnknownKey(key.to_vec())),
            }
        }
        match (version, admin) {
            (Some(version), Some(admin)) => Ok(GlobalState { version, admin }),
            (None, _) => Err(SchemaError::MissingKey(KEY_VERSION)),
            (_, None) => Err(SchemaError::MissingKey(KEY_ADMIN)),
        }
    }
}

crate::test_macros::impl_arbitrary!(GlobalState, version, admin);

impl StateData for GlobalState {
    const STATE_ID: constants::StateId = constants::StateId::GlobalState;
}

impl Serialize for GlobalState {
    fn serialize(&self, out: &mut Vec<u8>) {
        let entries = self.entries();
        out.push(entries.len() as u8);
        for (key, value) in &entries {
            deserialize::write_short_bytes(key, out);
            value.serialize(out);
        }
    }
}

impl Deserialize for GlobalState {
    type Error = GlobalStateDeserError;

    fn deserialize(bytes: &mut &[u8], _version: StateVersion) -> Result<Self, Self::Error> {
        let count = deserialize::byte(bytes)?;
        let mut entries = Vec::with_capacity(count.into());
        for _ in 0..count {
            let key = deserialize::short_bytes(bytes)?;
            let value = Value::deserialize(bytes)?;
            entries.push((key, value));
        }
        GlobalState::from_entries(entries.iter().map(|(key, value)| (&**key, value.clone())))
            .map_err(GlobalStateDeserError::Schema)
    }
}

/// A value stored under a global key.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl Value {
    const TAG_BYTES: u8 = 1;
    const TAG_UINT: u8 = 2;

    fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Value::Uint(value) => {
                out.push(Self::TAG_UINT);
                out.extend_from_slice(&value.to_be_bytes());
            },
            Value::Bytes(value) => {
                out.push(Self::TAG_BYTES);
                deserialize::write_short_bytes(value, out);
            },
        }
    }

    fn deserialize(bytes: &mut &[u8]) -> Result<Self, GlobalStateDeserError> {
        match deserialize::byte(bytes)? {
            Self::TAG_UINT => Ok(Value::Uint(deserialize::be(bytes)?)),
            Self::TAG_BYTES => Ok(Value::Bytes(deserialize::short_bytes(bytes)?)),
            tag => Err(GlobalStateDeserError::InvalidValueTag(tag)),
        }
    }
}

/// The key-value pairs don't match the schema.
#[derive(Debug, Eq, PartialEq)]
pub enum SchemaError {
    MissingKey(&'static [u8]),
    UnknownKey(Vec<u8>),
    /// The key is known but appears twice or holds a value of the wrong type.
    InvalidEntry(Vec<u8>),
    /// The admin isn't 32 bytes long.
    InvalidAdmin(usize),
}

#[derive(Debug)]
pub enum GlobalStateDeserError {
    UnexpectedEnd,
    InvalidValueTag(u8),
    Schema(SchemaError),
}

impl From<UnexpectedEnd> for GlobalStateDeserError {
    fn from(_: UnexpectedEnd) -> Self {
        GlobalStateDeserError::UnexpectedEnd
    }
}

//! # Application
//!
//! The approval logic of the application together with everything it needs to run: the
//! transaction and state types it reads, the inner transactions it emits and the host seam it
//! runs against.

pub mod constants;
pub mod deserialize;
pub mod primitives;
pub mod state;
pub mod transaction;
pub mod itoa;
pub mod inner;
pub mod config;
pub mod handlers;
pub mod dispatch;
pub mod ledger;

pub use config::Config;
pub use dispatch::{approval_program, clear_state_program, Decision, Invocation, InvocationError, Outcome, Program};
pub use ledger::{Ledger, MemoryLedger, Receipt};
pub use primitives::{Address, AppId, AssetId};
pub use state::GlobalState;
pub use transaction::Transaction;

/// Data that can be stored in a snapshot file.
pub trait StateData {
    const STATE_ID: constants::StateId;
}

pub trait Serialize {
    fn serialize(&self, out: &mut Vec<u8>);

    /// Serializes the value prefixed with the snapshot version and its state ID.
    fn serialize_with_header(&self, out: &mut Vec<u8>) where Self: StateData {
        deserialize::StateVersion::CURRENT.serialize(out);
        out.push(Self::STATE_ID as u8);
        self.serialize(out);
    }
}

pub trait Deserialize: Sized {
    type Error: core::fmt::Debug;

    fn deserialize(bytes: &mut &[u8], version: deserialize::StateVersion) -> Result<Self, Self::Error>;

    fn deserialize_with_header(bytes: &mut &[u8]) -> Result<Self, StateDeserError<Self::Error>> where Self: StateData {
        let version = deserialize::StateVersion::deserialize(bytes)?;
        let state_id = deserialize::byte(bytes)?;
        if state_id != Self::STATE_ID as u8 {
            return Err(StateDeserError::InvalidState(state_id));
        }
        Self::deserialize(bytes, version).map_err(StateDeserError::InvalidData)
    }
}

#[derive(Debug)]
pub enum StateDeserError<E> {
    UnexpectedEnd,
    UnsupportedVersion(u32),
    InvalidState(u8),
    InvalidData(E),
}

impl<E> From<deserialize::StateVersionDeserError> for StateDeserError<E> {
    fn from(value: deserialize::StateVersionDeserError) -> Self {
        match value {
            deserialize::StateVersionDeserError::UnexpectedEnd => StateDeserError::UnexpectedEnd,
            deserialize::StateVersionDeserError::UnsupportedVersion(version) => StateDeserError::UnsupportedVersion(version),
        }
    }
}

impl<E> From<deserialize::UnexpectedEnd> for StateDeserError<E> {
    fn from(_: deserialize::UnexpectedEnd) -> Self {
        StateDeserError::UnexpectedEnd
    }
}

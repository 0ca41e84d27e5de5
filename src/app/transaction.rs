//! The transaction the host hands to the application.

use super::constants::{OnCompletion, TxnType};
use super::primitives::{Address, AppId};

/// An application call as seen by the approval program.
///
/// The host builds one per invocation, the application only reads it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transaction {
    pub sender: Address,
    /// Zero when the call creates the application.
    pub application_id: AppId,
    pub on_completion: OnCompletion,
    pub type_enum: TxnType,
    pub application_args: Vec<Vec<u8>>,
    pub note: Vec<u8>,
}

impl Transaction {
    /// Creates a plain application call with no arguments and an empty note.
    pub fn call(sender: Address, application_id: AppId, on_completion: OnCompletion) -> Self {
        Transaction {
            sender,
            application_id,
            on_completion,
            type_enum: TxnType::ApplicationCall,
            application_args: Vec::new(),
            note: Vec::new(),
        }
    }

    /// Creates the call instantiating a new application.
    pub fn create(sender: Address) -> Self {
        Self::call(sender, AppId::CREATION, OnCompletion::NoOp)
    }

    pub fn with_args<I: IntoIterator<Item = A>, A: Into<Vec<u8>>>(mut self, args: I) -> Self {
        self.application_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_type(mut self, type_enum: TxnType) -> Self {
        self.type_enum = type_enum;
        self
    }

    pub fn with_note<N: Into<Vec<u8>>>(mut self, note: N) -> Self {
        self.note = note.into();
        self
    }

    /// Returns the argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&[u8]> {
        self.application_args.get(index).map(|arg| &**arg)
    }
}

crate::test_macros::impl_arbitrary!(Transaction, sender, application_id, on_completion, type_enum, application_args, note);

/// Interprets up to eight bytes as a big-endian unsigned integer.
///
/// Empty input is zero. Longer input is an error rather than being truncated.
pub fn btoi(bytes: &[u8]) -> Result<u64, IntegerTooLong> {
    if bytes.len() > 8 {
        return Err(IntegerTooLong(bytes.len()));
    }
    Ok(bytes.iter().fold(0, |acc, byte| (acc << 8) | u64::from(*byte)))
}

/// The byte string has more than eight bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IntegerTooLong(pub usize);

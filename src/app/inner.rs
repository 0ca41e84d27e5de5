//! Inner transactions emitted by the application.
//!
//! Every emitter builds one transaction with the application's own account as the sender and
//! submits it to the host right away. A rejected submission fails the whole invocation, there is
//! no local recovery.

use core::fmt;

use super::constants::{TxnType, NOTE_ASSET_TRANSFER};
use super::dispatch::{Invocation, InvocationError};
use super::ledger::Ledger;
use super::primitives::{Address, AssetId};

/// A transaction synthesized by the application during an invocation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InnerTransaction {
    Payment {
        sender: Address,
        receiver: Address,
        amount: u64,
    },
    AssetTransfer {
        sender: Address,
        asset: AssetId,
        amount: u64,
        receiver: Address,
        note: Vec<u8>,
    },
}

impl InnerTransaction {
    pub fn type_enum(&self) -> TxnType {
        match self {
            InnerTransaction::Payment { .. } => TxnType::Payment,
            InnerTransaction::AssetTransfer { .. } => TxnType::AssetTransfer,
        }
    }

    pub fn sender(&self) -> &Address {
        match self {
            InnerTransaction::Payment { sender, .. } => sender,
            InnerTransaction::AssetTransfer { sender, .. } => sender,
        }
    }

    /// Human-readable one-line summary.
    pub fn explain(&self) -> String {
        match self {
            InnerTransaction::Payment { sender, receiver, amount } => {
                format!("{} {} -> {}: {}", self.type_enum(), sender, receiver, amount)
            },
            InnerTransaction::AssetTransfer { sender, asset, amount, receiver, note } => {
                format!("{} {} -> {}: {} of asset {} (note: {:?})", self.type_enum(), sender, receiver, amount, asset, String::from_utf8_lossy(note))
            },
        }
    }
}

/// Pays `amount` of the native currency from the application account to `receiver`.
pub fn payment<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>, amount: u64, receiver: Address) -> Result<(), InvocationError> {
    let txn = InnerTransaction::Payment {
        sender: invocation.application_address(),
        receiver,
        amount,
    };
    invocation.submit(txn)
}

/// Transfers `amount` units of `asset` from the application account to `receiver`.
pub fn asset_transfer<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>, asset: AssetId, amount: u64, receiver: Address) -> Result<(), InvocationError> {
    let txn = InnerTransaction::AssetTransfer {
        sender: invocation.application_address(),
        asset,
        amount,
        receiver,
        note: NOTE_ASSET_TRANSFER.to_vec(),
    };
    invocation.submit(txn)
}

/// Opts the application account into holding `asset`.
///
/// This is a zero-amount transfer from the application to itself carrying the outer
/// transaction's note.
pub fn asset_opt_in<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>, asset: AssetId) -> Result<(), InvocationError> {
    let address = invocation.application_address();
    let txn = InnerTransaction::AssetTransfer {
        sender: address,
        asset,
        amount: 0,
        receiver: address,
        note: invocation.transaction().note.clone(),
    };
    invocation.submit(txn)
}

/// The host refused an inner transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InnerTxnError {
    InsufficientBalance { account: Address, balance: u64, amount: u64 },
    AssetNotFound(AssetId),
    AssetFrozen(AssetId),
    NotOptedIn { account: Address, asset: AssetId },
    InsufficientAssetBalance { account: Address, asset: AssetId, balance: u64, amount: u64 },
    BalanceOverflow(Address),
}

impl fmt::Display for InnerTxnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InnerTxnError::InsufficientBalance { account, balance, amount } => write!(f, "account {} has {} but needs {}", account, balance, amount),
            InnerTxnError::AssetNotFound(asset) => write!(f, "asset {} does not exist", asset),
            InnerTxnError::AssetFrozen(asset) => write!(f, "asset {} is frozen", asset),
            InnerTxnError::NotOptedIn { account, asset } => write!(f, "account {} is not opted into asset {}", account, asset),
            InnerTxnError::InsufficientAssetBalance { account, asset, balance, amount } => write!(f, "account {} holds {} of asset {} but needs {}", account, balance, asset, amount),
            InnerTxnError::BalanceOverflow(account) => write!(f, "balance of account {} would overflow", account),
        }
    }
}

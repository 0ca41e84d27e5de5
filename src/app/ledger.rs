//! The host seam and an in-memory ledger implementing it.
//!
//! The application only ever reads its global state and submits inner transactions, [`Ledger`]
//! captures exactly that. [`MemoryLedger`] additionally plays the host: it allocates application
//! ids, picks the program to run and applies or discards the effects of an invocation.

use core::convert::TryFrom;
use core::fmt;
use std::collections::BTreeMap;

use slog::Logger;

use super::config::Config;
use super::constants::{self, OnCompletion};
use super::deserialize::{self, StateVersion, UnexpectedEnd};
use super::dispatch::{Decision, Invocation, InvocationError, Program};
use super::inner::{InnerTransaction, InnerTxnError};
use super::primitives::{Address, AppId, AssetId};
use super::state::{GlobalState, GlobalStateDeserError};
use super::transaction::Transaction;
use super::{Deserialize, Serialize, StateData};

/// What the application needs from its host.
pub trait Ledger {
    /// Returns the global state of `app`, `None` if the application doesn't exist (yet).
    fn global_state(&self, app: AppId) -> Option<GlobalState>;

    /// Executes an inner transaction or explains why it can't be executed.
    ///
    /// A failed submission must not change the ledger.
    fn submit_inner(&mut self, txn: &InnerTransaction) -> Result<(), InnerTxnError>;
}

/// Parameters of an asset.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssetParams {
    pub creator: Address,
    pub total: u64,
    pub frozen: bool,
}

crate::test_macros::impl_arbitrary!(AssetParams, creator, total, frozen);

/// Ledger kept entirely in memory.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MemoryLedger {
    next_app_id: u64,
    apps: BTreeMap<AppId, GlobalState>,
    balances: BTreeMap<Address, u64>,
    assets: BTreeMap<AssetId, AssetParams>,
    holdings: BTreeMap<(Address, AssetId), u64>,
}

#[cfg(test)]
impl quickcheck::Arbitrary for MemoryLedger {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        use quickcheck::Arbitrary;

        MemoryLedger {
            next_app_id: u64::arbitrary(gen).max(1),
            apps: Arbitrary::arbitrary(gen),
            balances: Arbitrary::arbitrary(gen),
            assets: Arbitrary::arbitrary(gen),
            holdings: Arbitrary::arbitrary(gen),
        }
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger {
            next_app_id: 1,
            apps: BTreeMap::new(),
            balances: BTreeMap::new(),
            assets: BTreeMap::new(),
            holdings: BTreeMap::new(),
        }
    }

    /// Credits `amount` of the native currency to `account`.
    pub fn fund(&mut self, account: Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::BalanceOverflow(account))?;
        Ok(())
    }

    /// Creates an asset, the whole supply is held by the creator.
    pub fn create_asset(&mut self, asset: AssetId, creator: Address, total: u64) -> Result<(), LedgerError> {
        if self.assets.contains_key(&asset) {
            return Err(LedgerError::AssetExists(asset));
        }
        self.assets.insert(asset, AssetParams { creator, total, frozen: false });
        self.holdings.insert((creator, asset), total);
        Ok(())
    }

    pub fn set_frozen(&mut self, asset: AssetId, frozen: bool) -> Result<(), LedgerError> {
        let params = self.assets.get_mut(&asset).ok_or(LedgerError::AssetNotFound(asset))?;
        params.frozen = frozen;
        Ok(())
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Returns the amount of `asset` held by `account`, `None` if it's not opted in.
    pub fn holding(&self, account: &Address, asset: AssetId) -> Option<u64> {
        self.holdings.get(&(*account, asset)).copied()
    }

    pub fn asset(&self, asset: AssetId) -> Option<&AssetParams> {
        self.assets.get(&asset)
    }

    pub fn application(&self, app: AppId) -> Option<&GlobalState> {
        self.apps.get(&app)
    }

    pub fn applications(&self) -> impl Iterator<Item = (AppId, &GlobalState)> + '_ {
        self.apps.iter().map(|(id, state)| (*id, state))
    }

    /// Runs the application for `txn` the way the chain would.
    ///
    /// A creation call allocates the next application id and always runs the approval program.
    /// Effects are applied only if the program accepts, a rejected or failed invocation leaves
    /// the ledger untouched, including inner transactions it submitted.
    pub fn execute(&mut self, txn: &Transaction, config: &Config, logger: &Logger) -> Result<Receipt, ExecuteError> {
        let creating = txn.application_id.is_creation();
        let (app_id, program) = if creating {
            if self.next_app_id.checked_add(1).is_none() {
                return Err(ExecuteError::AppIdsExhausted);
            }
            (AppId(self.next_app_id), Program::Approval)
        } else {
            if !self.apps.contains_key(&txn.application_id) {
                return Err(ExecuteError::UnknownApplication(txn.application_id));
            }
            (txn.application_id, Program::for_on_completion(txn.on_completion))
        };

        let snapshot = self.clone();
        let result = Invocation::new(&mut *self, txn, app_id, config, logger).run(program);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                *self = snapshot;
                return Err(ExecuteError::Invocation(error));
            },
        };

        if outcome.decision == Decision::Reject {
            *self = snapshot;
            return Ok(Receipt {
                application_id: app_id,
                decision: Decision::Reject,
                logs: Vec::new(),
                inner_transactions: Vec::new(),
            });
        }

        if let Some(state) = outcome.global_state {
            self.apps.insert(app_id, state);
        }
        if creating {
            self.next_app_id += 1;
            slog::info!(logger, "application created"; "app_id" => app_id.0);
        } else if txn.on_completion == OnCompletion::DeleteApplication {
            self.apps.remove(&app_id);
            slog::info!(logger, "application deleted"; "app_id" => app_id.0);
        }

        Ok(Receipt {
            application_id: app_id,
            decision: Decision::Accept,
            logs: outcome.logs,
            inner_transactions: outcome.inner_transactions,
        })
    }

    fn submit_payment(&mut self, sender: Address, receiver: Address, amount: u64) -> Result<(), InnerTxnError> {
        let sender_balance = self.balance(&sender);
        if sender_balance < amount {
            return Err(InnerTxnError::InsufficientBalance { account: sender, balance: sender_balance, amount });
        }
        if sender != receiver {
            let receiver_balance = self.balance(&receiver)
                .checked_add(amount)
                .ok_or(InnerTxnError::BalanceOverflow(receiver))?;
            self.balances.insert(sender, sender_balance - amount);
            self.balances.insert(receiver, receiver_balance);
        }
        Ok(())
    }

    fn submit_asset_transfer(&mut self, sender: Address, asset: AssetId, amount: u64, receiver: Address) -> Result<(), InnerTxnError> {
        let params = self.assets.get(&asset).ok_or(InnerTxnError::AssetNotFound(asset))?;

        // zero-amount transfer to self is an opt-in, allowed even while the asset is frozen
        if amount == 0 && sender == receiver {
            self.holdings.entry((sender, asset)).or_insert(0);
            return Ok(());
        }

        if params.frozen {
            return Err(InnerTxnError::AssetFrozen(asset));
        }

        let sender_holding = self.holding(&sender, asset).ok_or(InnerTxnError::NotOptedIn { account: sender, asset })?;
        let receiver_holding = self.holding(&receiver, asset).ok_or(InnerTxnError::NotOptedIn { account: receiver, asset })?;
        if sender_holding < amount {
            return Err(InnerTxnError::InsufficientAssetBalance { account: sender, asset, balance: sender_holding, amount });
        }
        if sender != receiver {
            let receiver_holding = receiver_holding.checked_add(amount).ok_or(InnerTxnError::BalanceOverflow(receiver))?;
            self.holdings.insert((sender, asset), sender_holding - amount);
            self.holdings.insert((receiver, asset), receiver_holding);
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        MemoryLedger::new()
    }
}

impl Ledger for MemoryLedger {
    fn global_state(&self, app: AppId) -> Option<GlobalState> {
        self.apps.get(&app).copied()
    }

    fn submit_inner(&mut self, txn: &InnerTransaction) -> Result<(), InnerTxnError> {
        match txn {
            InnerTransaction::Payment { sender, receiver, amount } => self.submit_payment(*sender, *receiver, *amount),
            InnerTransaction::AssetTransfer { sender, asset, amount, receiver, .. } => self.submit_asset_transfer(*sender, *asset, *amount, *receiver),
        }
    }
}

impl StateData for MemoryLedger {
    const STATE_ID: constants::StateId = constants::StateId::Ledger;
}

fn write_len(len: usize, out: &mut Vec<u8>) {
    let len = u32::try_from(len).expect("ledger tables never exceed u32::MAX entries");
    out.extend_from_slice(&len.to_be_bytes());
}

impl Serialize for MemoryLedger {
    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.next_app_id.to_be_bytes());

        write_len(self.apps.len(), out);
        for (id, state) in &self.apps {
            out.extend_from_slice(&id.0.to_be_bytes());
            state.serialize(out);
        }

        write_len(self.balances.len(), out);
        for (account, balance) in &self.balances {
            account.serialize(out);
            out.extend_from_slice(&balance.to_be_bytes());
        }

        write_len(self.assets.len(), out);
        for (id, params) in &self.assets {
            out.extend_from_slice(&id.0.to_be_bytes());
            params.creator.serialize(out);
            out.extend_from_slice(&params.total.to_be_bytes());
            out.push(params.frozen.into());
        }

        write_len(self.holdings.len(), out);
        for ((account, asset), amount) in &self.holdings {
            account.serialize(out);
            out.extend_from_slice(&asset.0.to_be_bytes());
            out.extend_from_slice(&amount.to_be_bytes());
        }
    }
}

impl Deserialize for MemoryLedger {
    type Error = LedgerDeserError;

    fn deserialize(bytes: &mut &[u8], version: StateVersion) -> Result<Self, Self::Error> {
        let next_app_id = deserialize::be::<u64>(bytes)?;
        if next_app_id == AppId::CREATION.0 {
            return Err(LedgerDeserError::ReservedAppId);
        }

        let mut apps = BTreeMap::new();
        for _ in 0..deserialize::be::<u32>(bytes)? {
            let id = AppId(deserialize::be(bytes)?);
            let state = GlobalState::deserialize(bytes, version).map_err(LedgerDeserError::GlobalState)?;
            apps.insert(id, state);
        }

        let mut balances = BTreeMap::new();
        for _ in 0..deserialize::be::<u32>(bytes)? {
            let account = Address::deserialize(bytes)?;
            balances.insert(account, deserialize::be(bytes)?);
        }

        let mut assets = BTreeMap::new();
        for _ in 0..deserialize::be::<u32>(bytes)? {
            let id = AssetId(deserialize::be(bytes)?);
            let creator = Address::deserialize(bytes)?;
            let total = deserialize::be(bytes)?;
            let frozen = match deserialize::byte(bytes)? {
                0 => false,
                1 => true,
                flag => return Err(LedgerDeserError::InvalidFlag(flag)),
            };
            assets.insert(id, AssetParams { creator, total, frozen });
        }

        let mut holdings = BTreeMap::new();
        for _ in 0..deserialize::be::<u32>(bytes)? {
            let account = Address::deserialize(bytes)?;
            let asset = AssetId(deserialize::be(bytes)?);
            holdings.insert((account, asset), deserialize::be(bytes)?);
        }

        Ok(MemoryLedger { next_app_id, apps, balances, assets, holdings })
    }
}

#[derive(Debug)]
pub enum LedgerDeserError {
    UnexpectedEnd,
    GlobalState(GlobalStateDeserError),
    InvalidFlag(u8),
    /// The next application id is the one reserved for creation calls.
    ReservedAppId,
}

impl From<UnexpectedEnd> for LedgerDeserError {
    fn from(_: UnexpectedEnd) -> Self {
        LedgerDeserError::UnexpectedEnd
    }
}

/// Result of an executed application call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Receipt {
    /// The application that ran, freshly allocated on creation.
    pub application_id: AppId,
    pub decision: Decision,
    /// Log records, empty if the call was rejected.
    pub logs: Vec<Vec<u8>>,
    /// Inner transactions, empty if the call was rejected.
    pub inner_transactions: Vec<InnerTransaction>,
}

/// Administrative operation on [`MemoryLedger`] failed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LedgerError {
    AssetExists(AssetId),
    AssetNotFound(AssetId),
    BalanceOverflow(Address),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::AssetExists(asset) => write!(f, "asset {} already exists", asset),
            LedgerError::AssetNotFound(asset) => write!(f, "asset {} does not exist", asset),
            LedgerError::BalanceOverflow(account) => write!(f, "balance of account {} would overflow", account),
        }
    }
}

impl std::error::Error for LedgerError {}

/// The call failed as a whole, nothing was applied.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExecuteError {
    UnknownApplication(AppId),
    /// Every application id has been allocated.
    AppIdsExhausted,
    Invocation(InvocationError),
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecuteError::UnknownApplication(app) => write!(f, "application {} does not exist", app),
            ExecuteError::AppIdsExhausted => write!(f, "no application ids left"),
            ExecuteError::Invocation(error) => write!(f, "invocation failed: {}", error),
        }
    }
}

impl std::error::Error for ExecuteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecuteError::UnknownApplication(_) | ExecuteError::AppIdsExhausted => None,
            ExecuteError::Invocation(error) => Some(error),
        }
    }
}

impl From<InvocationError> for ExecuteError {
    fn from(error: InvocationError) -> Self {
        ExecuteError::Invocation(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::constants::TxnType;

    crate::test_macros::check_roundtrip_with_header!(ledger_snapshot, MemoryLedger);

    fn admin() -> Address {
        Address::from_bytes(hex_lit::hex!("5555555555555555555555555555555555555555555555555555555555555555"))
    }

    fn other() -> Address {
        Address::from_bytes(hex_lit::hex!("6666666666666666666666666666666666666666666666666666666666666666"))
    }

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn execute(ledger: &mut MemoryLedger, txn: &Transaction) -> Result<Receipt, ExecuteError> {
        ledger.execute(txn, &Config::default(), &logger())
    }

    #[test]
    fn creation_allocates_ids() {
        let mut ledger = MemoryLedger::new();
        let first = execute(&mut ledger, &Transaction::create(admin())).unwrap();
        let second = execute(&mut ledger, &Transaction::create(other())).unwrap();

        assert_eq!(first.application_id, AppId(1));
        assert_eq!(second.application_id, AppId(2));
        assert_eq!(ledger.application(AppId(1)), Some(&GlobalState::create(admin())));
        assert_eq!(ledger.application(AppId(2)), Some(&GlobalState::create(other())));
        assert_eq!(ledger.applications().count(), 2);
    }

    #[test]
    fn calling_missing_application_fails() {
        let mut ledger = MemoryLedger::new();
        let txn = Transaction::call(admin(), AppId(3), OnCompletion::NoOp);
        assert_eq!(execute(&mut ledger, &txn), Err(ExecuteError::UnknownApplication(AppId(3))));
    }

    #[test]
    fn failed_invocation_is_rolled_back() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        let before = ledger.clone();

        let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp).with_args(vec![b"OptInASA".to_vec(), vec![9]]);
        match execute(&mut ledger, &txn) {
            Err(ExecuteError::Invocation(InvocationError::InnerTransaction(InnerTxnError::AssetNotFound(AssetId(9))))) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn opt_in_asset_is_applied() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        ledger.create_asset(AssetId(9), admin(), 10).unwrap();

        let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp).with_args(vec![b"OptInASA".to_vec(), vec![9]]);
        let receipt = execute(&mut ledger, &txn).unwrap();
        assert_eq!(receipt.decision, Decision::Accept);
        assert_eq!(ledger.holding(&Address::for_application(AppId(1)), AssetId(9)), Some(0));
    }

    #[test]
    fn opt_in_asset_with_wrong_arity_changes_nothing() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        ledger.create_asset(AssetId(7), admin(), 10).unwrap();
        let before = ledger.clone();

        let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp).with_args(vec![b"OptInASA".to_vec(), vec![7], vec![1]]);
        match execute(&mut ledger, &txn) {
            Err(ExecuteError::Invocation(InvocationError::ArgumentCount { expected: 2, actual: 3 })) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn update_keeps_state() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        let before = ledger.clone();

        let rejected = execute(&mut ledger, &Transaction::call(other(), AppId(1), OnCompletion::UpdateApplication)).unwrap();
        assert_eq!(rejected.decision, Decision::Reject);
        assert_eq!(ledger, before);

        let accepted = execute(&mut ledger, &Transaction::call(admin(), AppId(1), OnCompletion::UpdateApplication)).unwrap();
        assert_eq!(accepted.decision, Decision::Accept);
        assert_eq!(ledger, before);
    }

    #[test]
    fn frozen_asset_allows_opt_in_only() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        ledger.create_asset(AssetId(9), admin(), 10).unwrap();
        ledger.set_frozen(AssetId(9), true).unwrap();

        let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp).with_args(vec![b"OptInASA".to_vec(), vec![9]]);
        assert_eq!(execute(&mut ledger, &txn).unwrap().decision, Decision::Accept);
        let app_address = Address::for_application(AppId(1));
        assert_eq!(ledger.holding(&app_address, AssetId(9)), Some(0));

        let transfer = InnerTransaction::AssetTransfer { sender: admin(), asset: AssetId(9), amount: 1, receiver: app_address, note: Vec::new() };
        assert_eq!(ledger.submit_inner(&transfer), Err(InnerTxnError::AssetFrozen(AssetId(9))));
    }

    #[test]
    fn snapshot_with_reserved_next_app_id_is_rejected() {
        let mut bytes = Vec::new();
        MemoryLedger::new().serialize_with_header(&mut bytes);
        // the next app id directly follows the 4-byte version and the state id
        bytes[5..13].copy_from_slice(&0u64.to_be_bytes());
        match MemoryLedger::deserialize_with_header(&mut &*bytes) {
            Err(crate::app::StateDeserError::InvalidData(LedgerDeserError::ReservedAppId)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn creation_fails_when_ids_run_out() {
        let mut ledger = MemoryLedger::new();
        ledger.next_app_id = u64::MAX;
        let before = ledger.clone();

        assert_eq!(execute(&mut ledger, &Transaction::create(admin())), Err(ExecuteError::AppIdsExhausted));
        assert_eq!(ledger, before);
    }

    #[test]
    fn execute_error_display_includes_cause() {
        let error = ExecuteError::Invocation(InvocationError::ArgumentCount { expected: 2, actual: 1 });
        assert_eq!(error.to_string(), "invocation failed: assertion failed: expected 2 arguments, got 1");
    }

    #[test]
    fn delete_requires_admin() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();

        let rejected = execute(&mut ledger, &Transaction::call(other(), AppId(1), OnCompletion::DeleteApplication)).unwrap();
        assert_eq!(rejected.decision, Decision::Reject);
        assert!(ledger.application(AppId(1)).is_some());

        let accepted = execute(&mut ledger, &Transaction::call(admin(), AppId(1), OnCompletion::DeleteApplication)).unwrap();
        assert_eq!(accepted.decision, Decision::Accept);
        assert!(ledger.application(AppId(1)).is_none());
    }

    #[test]
    fn clear_state_runs_clear_program() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        let receipt = execute(&mut ledger, &Transaction::call(other(), AppId(1), OnCompletion::ClearState)).unwrap();
        assert_eq!(receipt.decision, Decision::Accept);
    }

    #[test]
    fn rejected_call_has_no_effects() {
        let mut ledger = MemoryLedger::new();
        execute(&mut ledger, &Transaction::create(admin())).unwrap();
        let txn = Transaction::call(other(), AppId(1), OnCompletion::NoOp).with_type(TxnType::AssetTransfer);
        let receipt = execute(&mut ledger, &txn).unwrap();
        assert_eq!(receipt.decision, Decision::Reject);
        assert!(receipt.logs.is_empty());
    }

    #[test]
    fn payments_move_balance() {
        let mut ledger = MemoryLedger::new();
        ledger.fund(admin(), 100).unwrap();
        let payment = InnerTransaction::Payment { sender: admin(), receiver: other(), amount: 40 };
        ledger.submit_inner(&payment).unwrap();
        assert_eq!(ledger.balance(&admin()), 60);
        assert_eq!(ledger.balance(&other()), 40);

        let too_much = InnerTransaction::Payment { sender: admin(), receiver: other(), amount: 61 };
        assert_eq!(ledger.submit_inner(&too_much), Err(InnerTxnError::InsufficientBalance { account: admin(), balance: 60, amount: 61 }));
        assert_eq!(ledger.fund(other(), u64::MAX), Err(LedgerError::BalanceOverflow(other())));
    }

    #[test]
    fn asset_transfer_requires_opt_in() {
        let mut ledger = MemoryLedger::new();
        ledger.create_asset(AssetId(1), admin(), 10).unwrap();
        assert_eq!(ledger.create_asset(AssetId(1), other(), 10), Err(LedgerError::AssetExists(AssetId(1))));

        let transfer = InnerTransaction::AssetTransfer { sender: admin(), asset: AssetId(1), amount: 4, receiver: other(), note: Vec::new() };
        assert_eq!(ledger.submit_inner(&transfer), Err(InnerTxnError::NotOptedIn { account: other(), asset: AssetId(1) }));

        let opt_in = InnerTransaction::AssetTransfer { sender: other(), asset: AssetId(1), amount: 0, receiver: other(), note: Vec::new() };
        ledger.submit_inner(&opt_in).unwrap();
        ledger.submit_inner(&transfer).unwrap();
        assert_eq!(ledger.holding(&admin(), AssetId(1)), Some(6));
        assert_eq!(ledger.holding(&other(), AssetId(1)), Some(4));
    }
}

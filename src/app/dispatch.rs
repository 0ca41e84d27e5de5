//! The approval and clear-state programs.
//!
//! The approval program evaluates an ordered list of guarded branches, the first matching one
//! decides. Every declared on-completion value has a branch and the one a conforming host never
//! routes here, `ClearState`, fails the invocation instead of being silently accepted or rejected.

use core::fmt;
use slog::Logger;

use super::config::Config;
use super::constants::{OnCompletion, TxnType, METHOD_VERSION};
use super::handlers;
use super::inner::{InnerTransaction, InnerTxnError};
use super::ledger::Ledger;
use super::primitives::{Address, AppId};
use super::state::GlobalState;
use super::transaction::{IntegerTooLong, Transaction};

/// The verdict returned to the host.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Accept,
    Reject,
}

/// The two programs the application consists of.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Program {
    /// Runs for every call except a forced clear.
    Approval,
    /// Runs when an account force-clears its relationship with the application.
    ClearState,
}

impl Program {
    /// Selects the program the host runs for a call with the given intent.
    pub fn for_on_completion(on_completion: OnCompletion) -> Self {
        match on_completion {
            OnCompletion::ClearState => Program::ClearState,
            OnCompletion::NoOp
            | OnCompletion::OptIn
            | OnCompletion::CloseOut
            | OnCompletion::UpdateApplication
            | OnCompletion::DeleteApplication => Program::Approval,
        }
    }

    pub fn run<L: Ledger + ?Sized>(self, invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
        match self {
            Program::Approval => approval_program(invocation),
            Program::ClearState => clear_state_program(invocation),
        }
    }
}

/// Decides a call.
pub fn approval_program<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    let txn = invocation.transaction();
    let on_completion = txn.on_completion;

    match on_completion {
        _ if txn.application_id.is_creation() => handlers::create(invocation),
        OnCompletion::NoOp => normal_call(invocation),
        OnCompletion::OptIn => handlers::opt_in(invocation),
        OnCompletion::CloseOut => handlers::close_out(invocation),
        OnCompletion::UpdateApplication => handlers::update(invocation),
        OnCompletion::DeleteApplication => handlers::delete(invocation),
        OnCompletion::ClearState => Err(InvocationError::UnhandledDispatch(on_completion)),
    }
}

/// Accepts unconditionally.
pub fn clear_state_program<L: Ledger + ?Sized>(_invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    Ok(Decision::Accept)
}

/// Routes of a `NoOp` call in evaluation order.
const NORMAL_CALL_ROUTES: [Route; 3] = [Route::Version, Route::OptInAsset, Route::Pay];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Route {
    Version,
    OptInAsset,
    Pay,
}

impl Route {
    fn name(self) -> &'static str {
        match self {
            Route::Version => "version",
            Route::OptInAsset => "opt-in-asset",
            Route::Pay => "pay",
        }
    }

    fn matches<L: Ledger + ?Sized>(self, invocation: &Invocation<'_, L>) -> bool {
        let txn = invocation.transaction();
        match self {
            Route::Version => txn.arg(0) == Some(METHOD_VERSION),
            Route::OptInAsset => match &invocation.config().opt_in_asset_method {
                Some(method) => txn.arg(0) == Some(&**method),
                None => false,
            },
            Route::Pay => txn.type_enum == TxnType::Payment,
        }
    }

    fn handle<L: Ledger + ?Sized>(self, invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
        match self {
            Route::Version => handlers::version(invocation),
            Route::OptInAsset => handlers::opt_in_asset(invocation),
            Route::Pay => handlers::pay(invocation),
        }
    }
}

fn normal_call<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    match NORMAL_CALL_ROUTES.iter().find(|route| route.matches(&*invocation)) {
        Some(route) => {
            slog::debug!(invocation.logger(), "routing normal call"; "route" => route.name());
            route.handle(invocation)
        },
        None => Ok(Decision::Reject),
    }
}

/// Everything one run of a program can see and everything it produced so far.
///
/// Effects other than inner transactions are buffered here, the host applies them only if the
/// program accepts. Inner transactions go to the ledger immediately because later steps may
/// depend on them, the host is responsible for rolling them back when the invocation doesn't
/// accept.
pub struct Invocation<'a, L: Ledger + ?Sized> {
    ledger: &'a mut L,
    txn: &'a Transaction,
    app_id: AppId,
    config: &'a Config,
    logger: Logger,
    state: Option<GlobalState>,
    written_state: Option<GlobalState>,
    logs: Vec<Vec<u8>>,
    inner_transactions: Vec<InnerTransaction>,
}

impl<'a, L: Ledger + ?Sized> Invocation<'a, L> {
    /// Prepares a run of a program of application `app_id`.
    ///
    /// `app_id` is the application being executed. It differs from `txn.application_id` on
    /// creation, when the transaction carries zero and the host has already allocated the id.
    pub fn new(ledger: &'a mut L, txn: &'a Transaction, app_id: AppId, config: &'a Config, logger: &Logger) -> Self {
        let state = ledger.global_state(app_id);
        let logger = logger.new(slog::o!(
            "app_id" => app_id.0,
            "sender" => txn.sender.to_string(),
            "on_completion" => txn.on_completion.as_str(),
        ));
        Invocation {
            ledger,
            txn,
            app_id,
            config,
            logger,
            state,
            written_state: None,
            logs: Vec::new(),
            inner_transactions: Vec::new(),
        }
    }

    pub fn transaction(&self) -> &'a Transaction {
        self.txn
    }

    pub fn application_id(&self) -> AppId {
        self.app_id
    }

    pub fn application_address(&self) -> Address {
        Address::for_application(self.app_id)
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The global state including writes made during this invocation.
    pub fn global_state(&self) -> Option<&GlobalState> {
        self.written_state.as_ref().or(self.state.as_ref())
    }

    /// The stored version, zero before the application is created.
    pub fn version(&self) -> u64 {
        self.global_state().map_or(0, GlobalState::version)
    }

    /// Whether the sender is the recorded admin. Always false before creation.
    pub fn is_admin(&self) -> bool {
        self.global_state().map_or(false, |state| state.is_admin(&self.txn.sender))
    }

    pub(crate) fn write_global_state(&mut self, state: GlobalState) {
        self.written_state = Some(state);
    }

    /// Appends a ledger log record.
    pub fn log(&mut self, record: Vec<u8>) {
        slog::debug!(self.logger, "log record"; "record" => %String::from_utf8_lossy(&record));
        self.logs.push(record);
    }

    pub(crate) fn submit(&mut self, txn: InnerTransaction) -> Result<(), InvocationError> {
        match self.ledger.submit_inner(&txn) {
            Ok(()) => {
                slog::debug!(self.logger, "inner transaction submitted"; "txn" => txn.explain());
                self.inner_transactions.push(txn);
                Ok(())
            },
            Err(error) => {
                slog::warn!(self.logger, "inner transaction rejected"; "txn" => txn.explain(), "error" => %error);
                Err(InvocationError::InnerTransaction(error))
            },
        }
    }

    /// Runs `program` and collects the effects.
    pub fn run(mut self, program: Program) -> Result<Outcome, InvocationError> {
        match program.run(&mut self) {
            Ok(Decision::Accept) => {
                slog::debug!(self.logger, "accepted"; "program" => ?program);
                Ok(self.finish(Decision::Accept))
            },
            Ok(Decision::Reject) => {
                slog::info!(self.logger, "rejected"; "program" => ?program);
                Ok(self.finish(Decision::Reject))
            },
            Err(error) => {
                slog::warn!(self.logger, "invocation failed"; "program" => ?program, "error" => %error);
                Err(error)
            },
        }
    }

    /// Ends the invocation with the given decision.
    pub fn finish(self, decision: Decision) -> Outcome {
        Outcome {
            decision,
            global_state: self.written_state,
            logs: self.logs,
            inner_transactions: self.inner_transactions,
        }
    }
}

/// What a finished invocation produced.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Outcome {
    pub decision: Decision,
    /// The global state written by the invocation, if any.
    pub global_state: Option<GlobalState>,
    pub logs: Vec<Vec<u8>>,
    pub inner_transactions: Vec<InnerTransaction>,
}

/// The invocation failed, the host must discard all of its effects.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InvocationError {
    /// The call carries the wrong number of arguments.
    ArgumentCount { expected: usize, actual: usize },
    /// An argument doesn't fit into an integer.
    InvalidInteger { index: usize, error: IntegerTooLong },
    /// The host refused an inner transaction.
    InnerTransaction(InnerTxnError),
    /// The approval program has no branch for this on-completion value.
    UnhandledDispatch(OnCompletion),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvocationError::ArgumentCount { expected, actual } => write!(f, "assertion failed: expected {} arguments, got {}", expected, actual),
            InvocationError::InvalidInteger { index, error } => write!(f, "argument {} has {} bytes, integers have at most 8", index, error.0),
            InvocationError::InnerTransaction(error) => write!(f, "inner transaction rejected: {}", error),
            InvocationError::UnhandledDispatch(on_completion) => write!(f, "approval program can not handle on-completion {}", on_completion),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<InnerTxnError> for InvocationError {
    fn from(error: InnerTxnError) -> Self {
        InvocationError::InnerTransaction(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AssetId, MemoryLedger};

    fn admin() -> Address {
        Address::from_bytes(hex_lit::hex!("4444444444444444444444444444444444444444444444444444444444444444"))
    }

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn created_ledger() -> MemoryLedger {
        let mut ledger = MemoryLedger::new();
        ledger.execute(&Transaction::create(admin()), &Config::default(), &logger()).unwrap();
        ledger
    }

    fn run(ledger: &mut MemoryLedger, txn: &Transaction, config: &Config) -> Result<Outcome, InvocationError> {
        let app_id = if txn.application_id.is_creation() { AppId(99) } else { txn.application_id };
        Invocation::new(ledger, txn, app_id, config, &logger()).run(Program::Approval)
    }

    #[test]
    fn creation_takes_precedence_over_on_completion() {
        let mut ledger = MemoryLedger::new();
        for on_completion in [OnCompletion::NoOp, OnCompletion::DeleteApplication, OnCompletion::ClearState] {
            let txn = Transaction::call(admin(), AppId::CREATION, on_completion);
            let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
            assert_eq!(outcome.decision, Decision::Accept);
            assert_eq!(outcome.global_state, Some(GlobalState::create(admin())));
        }
    }

    #[test]
    fn clear_state_reaching_approval_is_fatal() {
        let mut ledger = created_ledger();
        let txn = Transaction::call(admin(), AppId(1), OnCompletion::ClearState);
        assert_eq!(run(&mut ledger, &txn, &Config::default()), Err(InvocationError::UnhandledDispatch(OnCompletion::ClearState)));
    }

    #[test]
    fn clear_state_program_accepts() {
        let mut ledger = created_ledger();
        let txn = Transaction::call(Address::ZERO, AppId(1), OnCompletion::ClearState);
        let outcome = Invocation::new(&mut ledger, &txn, AppId(1), &Config::default(), &logger())
            .run(Program::for_on_completion(txn.on_completion))
            .unwrap();
        assert_eq!(outcome.decision, Decision::Accept);
    }

    #[test]
    fn version_call() {
        let mut ledger = created_ledger();
        let txn = Transaction::call(Address::ZERO, AppId(1), OnCompletion::NoOp).with_args(vec!["Version"]);
        let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
        assert_eq!(outcome.decision, Decision::Accept);
        assert_eq!(outcome.logs, vec![b"Version: 1".to_vec()]);
        assert!(outcome.inner_transactions.is_empty());
    }

    #[test]
    fn version_wins_over_payment_type() {
        let mut ledger = created_ledger();
        let txn = Transaction::call(Address::ZERO, AppId(1), OnCompletion::NoOp)
            .with_type(TxnType::Payment)
            .with_args(vec!["Version"]);
        assert_eq!(run(&mut ledger, &txn, &Config::default()).unwrap().logs, vec![b"Version: 1".to_vec()]);
    }

    #[test]
    fn payment_call() {
        let mut ledger = created_ledger();
        let txn = Transaction::call(Address::ZERO, AppId(1), OnCompletion::NoOp).with_type(TxnType::Payment);
        let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
        assert_eq!(outcome.decision, Decision::Accept);
        assert_eq!(outcome.logs, vec![b"Pay Txn".to_vec()]);
    }

    #[test]
    fn unknown_normal_call_is_rejected() {
        let mut ledger = created_ledger();
        let no_args = Transaction::call(admin(), AppId(1), OnCompletion::NoOp);
        let unknown = no_args.clone().with_args(vec!["Transfer"]);
        for txn in [no_args, unknown] {
            let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
            assert_eq!(outcome.decision, Decision::Reject);
            assert!(outcome.logs.is_empty());
        }
    }

    #[test]
    fn opt_in_asset_call() {
        let mut ledger = created_ledger();
        ledger.create_asset(AssetId(7), admin(), 1_000).unwrap();
        let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp)
            .with_args(vec![b"OptInASA".to_vec(), vec![7]])
            .with_note("iot");
        let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
        let app_address = Address::for_application(AppId(1));

        assert_eq!(outcome.decision, Decision::Accept);
        assert_eq!(outcome.inner_transactions, vec![InnerTransaction::AssetTransfer {
            sender: app_address,
            asset: AssetId(7),
            amount: 0,
            receiver: app_address,
            note: b"iot".to_vec(),
        }]);
    }

    #[test]
    fn opt_in_asset_argument_count_is_asserted() {
        let mut ledger = created_ledger();
        ledger.create_asset(AssetId(7), admin(), 1_000).unwrap();
        let one = vec![b"OptInASA".to_vec()];
        let three = vec![b"OptInASA".to_vec(), vec![7], vec![0]];
        for (args, actual) in [(one, 1), (three, 3)] {
            let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp).with_args(args);
            assert_eq!(run(&mut ledger, &txn, &Config::default()), Err(InvocationError::ArgumentCount { expected: 2, actual }));
        }
    }

    #[test]
    fn opt_in_asset_route_can_be_removed() {
        let mut ledger = created_ledger();
        ledger.create_asset(AssetId(7), admin(), 1_000).unwrap();
        let txn = Transaction::call(admin(), AppId(1), OnCompletion::NoOp).with_args(vec![b"OptInASA".to_vec(), vec![7]]);
        let outcome = run(&mut ledger, &txn, &Config::without_opt_in_asset()).unwrap();
        assert_eq!(outcome.decision, Decision::Reject);
        assert!(outcome.inner_transactions.is_empty());
    }

    #[test]
    fn failure_display() {
        let error = InvocationError::ArgumentCount { expected: 2, actual: 3 };
        assert_eq!(error.to_string(), "assertion failed: expected 2 arguments, got 3");
    }

    quickcheck::quickcheck! {
        fn opt_in_and_close_out_always_accept(txn: Transaction, close_out: bool) -> bool {
            let mut ledger = created_ledger();
            let mut txn = txn;
            txn.application_id = AppId(1);
            txn.on_completion = if close_out { OnCompletion::CloseOut } else { OnCompletion::OptIn };
            let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
            outcome.decision == Decision::Accept && outcome.global_state.is_none() && outcome.inner_transactions.is_empty()
        }

        fn opt_in_and_close_out_accept_before_creation(txn: Transaction, close_out: bool) -> bool {
            let mut ledger = MemoryLedger::new();
            let mut txn = txn;
            txn.application_id = AppId(1);
            txn.on_completion = if close_out { OnCompletion::CloseOut } else { OnCompletion::OptIn };
            let config = Config::default();
            let outcome = Invocation::new(&mut ledger, &txn, AppId(1), &config, &logger()).run(Program::Approval).unwrap();
            outcome.decision == Decision::Accept && outcome.global_state.is_none() && outcome.inner_transactions.is_empty()
        }

        fn lifecycle_calls_require_admin(txn: Transaction, delete: bool, use_admin: bool) -> bool {
            let mut ledger = created_ledger();
            let mut txn = txn;
            txn.application_id = AppId(1);
            txn.on_completion = if delete { OnCompletion::DeleteApplication } else { OnCompletion::UpdateApplication };
            if use_admin {
                txn.sender = admin();
            }
            let expected = if txn.sender == admin() { Decision::Accept } else { Decision::Reject };
            let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
            outcome.decision == expected && outcome.global_state.is_none()
        }

        fn creation_records_sender(txn: Transaction) -> bool {
            let mut ledger = MemoryLedger::new();
            let mut txn = txn;
            txn.application_id = AppId::CREATION;
            let outcome = run(&mut ledger, &txn, &Config::default()).unwrap();
            let state = outcome.global_state.unwrap();
            outcome.decision == Decision::Accept && state.version() == 1 && *state.admin() == txn.sender
        }
    }
}

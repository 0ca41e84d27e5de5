//! The approval logic of a stateful ledger application.
//!
//! This crate contains the decision logic only: given a transaction addressed to the application
//! it decides whether to accept it, which log records to emit and which inner transactions to
//! submit. The ledger itself is abstracted behind [`app::Ledger`], [`app::MemoryLedger`] is an
//! in-memory implementation good enough to exercise the logic end-to-end.
//!
//! [`app::MemoryLedger::execute`] is the entry point for whole calls, [`app::Invocation`] for
//! running a program against any other host.

mod test_macros;
pub mod app;

//! Handlers selected by the dispatcher.
//!
//! Each handler either decides the invocation or fails it. None of them looks at the on-completion
//! value or the application id again, the dispatcher already did.

use super::constants::{LOG_PAY, LOG_VERSION_PREFIX};
use super::dispatch::{Decision, Invocation, InvocationError};
use super::inner;
use super::itoa::itoa;
use super::ledger::Ledger;
use super::primitives::AssetId;
use super::state::GlobalState;
use super::transaction::btoi;

/// Instantiates the application: version 1, the sender becomes the admin.
pub fn create<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    let state = GlobalState::create(invocation.transaction().sender);
    slog::info!(invocation.logger(), "creating application"; "admin" => %state.admin(), "version" => state.version());
    invocation.write_global_state(state);
    Ok(Decision::Accept)
}

/// Logs `"Version: <n>"`.
pub fn version<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    let mut record = LOG_VERSION_PREFIX.to_vec();
    record.extend_from_slice(&itoa(invocation.version()));
    invocation.log(record);
    Ok(Decision::Accept)
}

/// Acknowledges a payment.
pub fn pay<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    invocation.log(LOG_PAY.to_vec());
    Ok(Decision::Accept)
}

/// Opts the application into the asset given as the second argument.
///
/// Exactly two arguments are required, anything else fails the invocation. The asset id is a
/// big-endian integer of at most eight bytes.
pub fn opt_in_asset<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    const EXPECTED_ARGS: usize = 2;

    let args = &invocation.transaction().application_args;
    if args.len() != EXPECTED_ARGS {
        return Err(InvocationError::ArgumentCount { expected: EXPECTED_ARGS, actual: args.len() });
    }
    let asset = btoi(&args[1]).map_err(|error| InvocationError::InvalidInteger { index: 1, error })?;
    inner::asset_opt_in(invocation, AssetId(asset))?;
    Ok(Decision::Accept)
}

pub fn opt_in<L: Ledger + ?Sized>(_invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    Ok(Decision::Accept)
}

pub fn close_out<L: Ledger + ?Sized>(_invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    Ok(Decision::Accept)
}

/// Allows the update only to the admin.
pub fn update<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    Ok(admin_only(invocation))
}

/// Allows the deletion only to the admin.
pub fn delete<L: Ledger + ?Sized>(invocation: &mut Invocation<'_, L>) -> Result<Decision, InvocationError> {
    Ok(admin_only(invocation))
}

fn admin_only<L: Ledger + ?Sized>(invocation: &Invocation<'_, L>) -> Decision {
    if invocation.is_admin() {
        Decision::Accept
    } else {
        Decision::Reject
    }
}

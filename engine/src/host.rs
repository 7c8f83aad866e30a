//! Capability traits: the narrow surfaces the transition engine uses to reach
//! the ledger and the contract execution engine.
//!
//! The `StateDb` and `Vm` traits decouple the transition from any concrete
//! state store or interpreter:
//!
//! - In a node: implemented by the state database and the bytecode VM
//! - In tests: implemented via `MockState` and `ScriptedVm` (in-memory)

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use meridian_primitives::{AccessList, Address, Hash, VmError, U256, EMPTY_CODE_HASH, ZERO_HASH};

/// Ledger capabilities needed by a transition.
///
/// Balance mutations are unchecked at this boundary: the transition verifies
/// affordability before every debit.
pub trait StateDb {
    /// Balance of `addr`, zero for unknown accounts.
    fn balance(&self, addr: Address) -> U256;

    /// Credit `amount` to `addr`, creating the account if needed.
    fn add_balance(&mut self, addr: Address, amount: U256);

    /// Debit `amount` from `addr`. The caller has checked the balance.
    fn sub_balance(&mut self, addr: Address, amount: U256);

    /// Nonce of `addr`, zero for unknown accounts.
    fn nonce(&self, addr: Address) -> u64;

    /// Overwrite the nonce of `addr`.
    fn set_nonce(&mut self, addr: Address, nonce: u64);

    /// Code hash of `addr`. Unknown accounts report the zero hash, accounts
    /// without code report the empty-code hash.
    fn code_hash(&self, addr: Address) -> Hash;

    /// Gas refund accumulated by execution so far.
    fn refund(&self) -> u64;

    /// Add to the refund counter. Called by the execution engine.
    fn add_refund(&mut self, gas: u64);

    /// Reset and prime per-transaction access tracking with the sender, the
    /// destination, the active precompiles and the message's access list.
    fn prepare_access_list(
        &mut self,
        sender: Address,
        dest: Option<Address>,
        precompiles: &[Address],
        list: Option<&AccessList>,
    );
}

/// What the execution engine hands back from a create or call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub output: Option<Bytes>,
    /// Gas left over; never more than the gas passed in.
    pub gas_left: u64,
    pub error: Option<VmError>,
}

/// Contract execution engine. Runs synchronously and may recurse internally.
pub trait Vm {
    /// Deploy `code` from `caller` with `gas` and endowment `value`. The
    /// engine bumps the caller nonce itself.
    fn create(
        &mut self,
        state: &mut dyn StateDb,
        caller: Address,
        code: &Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome;

    /// Message call from `caller` to `to` with `gas`, moving `value`.
    fn call(
        &mut self,
        state: &mut dyn StateDb,
        caller: Address,
        to: Address,
        input: &Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome;
}

// ── MockState: in-memory ledger for testing ──

/// A single account in [`MockState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: Hash,
}

impl Account {
    /// An externally owned account with the given balance.
    pub fn eoa(balance: U256) -> Self {
        Self {
            balance,
            nonce: 0,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

/// Access tracking installed by [`StateDb::prepare_access_list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmSet {
    pub addresses: BTreeSet<Address>,
    pub slots: BTreeSet<(Address, Hash)>,
}

/// In-memory ledger for deterministic testing.
///
/// Uses `BTreeMap` so that two states compare equal exactly when they hold
/// the same accounts. Balance arithmetic saturates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockState {
    accounts: BTreeMap<Address, Account>,
    refund: u64,
    warm: Option<WarmSet>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub fn insert(&mut self, addr: Address, account: Account) {
        self.accounts.insert(addr, account);
    }

    /// Builder form of [`insert`](Self::insert) for an EOA.
    pub fn with_eoa(mut self, addr: Address, balance: U256, nonce: u64) -> Self {
        self.insert(
            addr,
            Account {
                nonce,
                ..Account::eoa(balance)
            },
        );
        self
    }

    pub fn set_code_hash(&mut self, addr: Address, code_hash: Hash) {
        self.account_mut(addr).code_hash = code_hash;
    }

    pub fn account(&self, addr: &Address) -> Option<&Account> {
        self.accounts.get(addr)
    }

    /// Access tracking from the last `prepare_access_list`, if any.
    pub fn warm_set(&self) -> Option<&WarmSet> {
        self.warm.as_ref()
    }

    fn account_mut(&mut self, addr: Address) -> &mut Account {
        self.accounts
            .entry(addr)
            .or_insert_with(|| Account::eoa(U256::zero()))
    }
}

impl StateDb for MockState {
    fn balance(&self, addr: Address) -> U256 {
        self.accounts.get(&addr).map(|a| a.balance).unwrap_or_default()
    }

    fn add_balance(&mut self, addr: Address, amount: U256) {
        let account = self.account_mut(addr);
        account.balance = account.balance.saturating_add(amount);
    }

    fn sub_balance(&mut self, addr: Address, amount: U256) {
        let account = self.account_mut(addr);
        account.balance = account.balance.saturating_sub(amount);
    }

    fn nonce(&self, addr: Address) -> u64 {
        self.accounts.get(&addr).map(|a| a.nonce).unwrap_or(0)
    }

    fn set_nonce(&mut self, addr: Address, nonce: u64) {
        self.account_mut(addr).nonce = nonce;
    }

    fn code_hash(&self, addr: Address) -> Hash {
        self.accounts
            .get(&addr)
            .map(|a| a.code_hash)
            .unwrap_or(ZERO_HASH)
    }

    fn refund(&self) -> u64 {
        self.refund
    }

    fn add_refund(&mut self, gas: u64) {
        self.refund = self.refund.saturating_add(gas);
    }

    fn prepare_access_list(
        &mut self,
        sender: Address,
        dest: Option<Address>,
        precompiles: &[Address],
        list: Option<&AccessList>,
    ) {
        let mut warm = WarmSet::default();
        warm.addresses.insert(sender);
        if let Some(dest) = dest {
            warm.addresses.insert(dest);
        }
        warm.addresses.extend(precompiles.iter().copied());
        for tuple in list.into_iter().flat_map(|l| l.iter()) {
            warm.addresses.insert(tuple.address);
            for key in &tuple.storage_keys {
                warm.slots.insert((tuple.address, *key));
            }
        }
        self.warm = Some(warm);
    }
}

// ── ScriptedVm: canned execution engine for testing ──

/// Which path of the execution engine was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Create,
    Call,
}

/// One recorded invocation of [`ScriptedVm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: InvocationKind,
    pub caller: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub gas: u64,
    pub value: U256,
    /// Caller's nonce as seen by the engine at invocation time.
    pub caller_nonce: u64,
}

/// Execution engine that replays a fixed script instead of running code.
///
/// Every invocation burns `gas_used` (out of gas if more than it was given),
/// adds `refund` to the ledger's refund counter and reports `error` and
/// `output`. On success the value moves from the caller to the callee, or to
/// `created` for creations.
#[derive(Debug, Clone)]
pub struct ScriptedVm {
    pub gas_used: u64,
    pub refund: u64,
    pub error: Option<VmError>,
    pub output: Option<Bytes>,
    /// Address credited with the value of a creation.
    pub created: Address,
    /// Report this much gas left regardless of what was given.
    pub gas_left_override: Option<u64>,
    pub invocations: Vec<Invocation>,
}

impl Default for ScriptedVm {
    fn default() -> Self {
        Self {
            gas_used: 0,
            refund: 0,
            error: None,
            output: None,
            created: meridian_primitives::types::address_from_low_u8(0xcc),
            gas_left_override: None,
            invocations: Vec::new(),
        }
    }
}

impl ScriptedVm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consuming(mut self, gas: u64) -> Self {
        self.gas_used = gas;
        self
    }

    pub fn with_refund(mut self, refund: u64) -> Self {
        self.refund = refund;
        self
    }

    pub fn failing(mut self, error: VmError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn returning(mut self, output: impl Into<Bytes>) -> Self {
        self.output = Some(output.into());
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &mut self,
        state: &mut dyn StateDb,
        kind: InvocationKind,
        caller: Address,
        to: Option<Address>,
        input: &Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.invocations.push(Invocation {
            kind,
            caller,
            to,
            input: input.clone(),
            gas,
            value,
            caller_nonce: state.nonce(caller),
        });

        if self.gas_used > gas {
            return CallOutcome {
                output: None,
                gas_left: self.gas_left_override.unwrap_or(0),
                error: Some(VmError::OutOfGas),
            };
        }

        state.add_refund(self.refund);
        if self.error.is_none() && !value.is_zero() {
            let callee = to.unwrap_or(self.created);
            state.sub_balance(caller, value);
            state.add_balance(callee, value);
        }
        CallOutcome {
            output: self.output.clone(),
            gas_left: self.gas_left_override.unwrap_or(gas - self.gas_used),
            error: self.error.clone(),
        }
    }
}

impl Vm for ScriptedVm {
    fn create(
        &mut self,
        state: &mut dyn StateDb,
        caller: Address,
        code: &Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.run(state, InvocationKind::Create, caller, None, code, gas, value)
    }

    fn call(
        &mut self,
        state: &mut dyn StateDb,
        caller: Address,
        to: Address,
        input: &Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.run(state, InvocationKind::Call, caller, Some(to), input, gas, value)
    }
}

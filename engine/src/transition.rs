//! The state transition: applying one message to the ledger.
//!
//! A transition runs these stages in strict order:
//!
//! 1. Pre-check (nonce, sender shape, fee caps, data-gas price) and escrow
//!    of the worst-case gas cost
//! 2. Intrinsic gas deduction
//! 3. Value-transfer admissibility of the topmost call
//! 4. Access-list installation (Berlin onwards)
//! 5. Dispatch to the execution engine (create, or nonce bump then call)
//! 6. Refund of unused gas
//! 7. Proposer fee settlement
//! 8. Result construction
//!
//! Any error returned before stage 5 is a consensus error and leaves the
//! ledger and the block gas budget exactly as they were. Execution-level
//! errors from stage 5 are carried in the [`ExecutionResult`] instead.

use meridian_primitives::gas::{REFUND_QUOTIENT, REFUND_QUOTIENT_EIP3529};
use meridian_primitives::types::{address_from_low_u8, narrow, widen};
use meridian_primitives::{
    data_gas_price, intrinsic_gas, Address, BlockContext, ChainConfig, ExecutionResult, GasBudget,
    Message, Pricing, Rules, TransitionError, TransitionResult, VmConfig, U256, U512,
};
use tracing::{debug, debug_span, trace};

use crate::host::{StateDb, Vm};
use crate::validation::{can_transfer, pre_check};

/// Everything a transition borrows from the block being built.
pub struct Env<'a> {
    pub chain: &'a ChainConfig,
    pub block: &'a BlockContext,
    pub config: &'a VmConfig,
    pub state: &'a mut dyn StateDb,
    pub vm: &'a mut dyn Vm,
}

impl Env<'_> {
    /// Rules in force for the block.
    pub fn rules(&self) -> Rules {
        self.chain.rules(self.block.number, self.block.is_merge())
    }
}

/// What escrow took, so it can be handed back if a later check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escrow {
    /// Amount debited from the sender.
    pub debited: U256,
    /// Ordinary gas reserved from the block budget.
    pub gas: u64,
    /// Data gas reserved from the block budget.
    pub data_gas: u64,
}

/// Apply `msg` to the ledger in `env`, drawing gas from `pool`.
///
/// `Err` means the message is invalid for this state and nothing was
/// mutated. `Ok` means the message was applied; its result may still carry
/// an execution-level error.
///
/// The one exception is [`TransitionError::GasAccounting`]: the execution
/// engine has already run, so the escrow and the gas pool are restored but
/// the caller must discard the ledger.
pub fn apply_message(
    env: &mut Env<'_>,
    msg: &Message,
    pool: &mut dyn GasBudget,
) -> TransitionResult<ExecutionResult> {
    let span = debug_span!(
        "apply_message",
        from = ?msg.from,
        nonce = msg.nonce,
        tx_type = msg.tx_type().as_str()
    );
    let _enter = span.enter();

    StateTransition::new(env, msg, pool)
        .transition()
        .inspect_err(|err| debug!(%err, "message rejected"))
}

/// Working set for one message.
///
/// Owns the `gas_remaining` counter; everything else is borrowed.
pub struct StateTransition<'e, 'a> {
    env: &'e mut Env<'a>,
    msg: &'e Message,
    pool: &'e mut dyn GasBudget,
    rules: Rules,
    /// Per-unit price against this block's base fee.
    gas_price: U256,
    gas_remaining: u64,
}

impl<'e, 'a> StateTransition<'e, 'a> {
    pub fn new(env: &'e mut Env<'a>, msg: &'e Message, pool: &'e mut dyn GasBudget) -> Self {
        let rules = env.rules();
        let gas_price = msg.pricing.price_for_block(env.block.base_fee);
        Self {
            env,
            msg,
            pool,
            rules,
            gas_price,
            gas_remaining: 0,
        }
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Run every stage and return the execution result.
    pub fn transition(mut self) -> TransitionResult<ExecutionResult> {
        let msg = self.msg;

        pre_check(msg, &*self.env.state, self.env.block, &self.rules, self.env.config)?;
        let escrow = self.buy_gas()?;
        if let Err(err) = self.admit() {
            self.rollback(&escrow);
            return Err(err);
        }

        if self.rules.is_berlin {
            let precompiles = active_precompiles(&self.rules);
            self.env.state.prepare_access_list(
                msg.from,
                msg.to,
                &precompiles,
                msg.access_list.as_ref(),
            );
        }

        let env = &mut *self.env;
        let outcome = match msg.to {
            None => env.vm.create(&mut *env.state, msg.from, &msg.data, self.gas_remaining, msg.value),
            Some(to) => {
                // Fake messages skip the nonce check and may sit at the maximum.
                let nonce = env.state.nonce(msg.from).wrapping_add(1);
                env.state.set_nonce(msg.from, nonce);
                env.vm.call(&mut *env.state, msg.from, to, &msg.data, self.gas_remaining, msg.value)
            }
        };
        if outcome.gas_left > self.gas_remaining {
            let limit = self.gas_remaining;
            self.rollback(&escrow);
            return Err(TransitionError::GasAccounting {
                limit,
                remaining: outcome.gas_left,
            });
        }
        self.gas_remaining = outcome.gas_left;

        let quotient = if self.rules.is_london {
            REFUND_QUOTIENT_EIP3529
        } else {
            REFUND_QUOTIENT
        };
        self.refund_gas(quotient)?;
        self.pay_proposer()?;

        Ok(ExecutionResult {
            used_gas: self.gas_used(),
            err: outcome.error,
            return_data: outcome.output,
        })
    }

    /// Gas consumed so far.
    fn gas_used(&self) -> u64 {
        self.msg.gas_limit.saturating_sub(self.gas_remaining)
    }

    /// Reserve block gas and prepay the worst-case cost.
    ///
    /// The balance must cover `gas_limit * gas_price + data_gas_fee` for
    /// legacy pricing, or `value + data_gas_fee + gas_limit * fee_cap` with a
    /// fee cap. The debit itself is `gas_limit * gas_price + data_gas_fee`.
    fn buy_gas(&mut self) -> TransitionResult<Escrow> {
        let msg = self.msg;
        let address = msg.from;
        let gas = U512::from(msg.gas_limit);
        let mgval = gas * widen(self.gas_price);

        let mut data_gas = 0;
        let mut dgval = U512::zero();
        if self.rules.is_sharding {
            data_gas = msg
                .data_gas_used()
                .ok_or(TransitionError::DataGasUsageOverflow {
                    address,
                    blobs: msg.data_hashes.len(),
                })?;
            if data_gas > 0 {
                let excess_data_gas = self.env.block.excess_data_gas_or_zero();
                let price = data_gas_price(excess_data_gas)
                    .ok_or(TransitionError::DataGasPriceOverflow { excess_data_gas })?;
                dgval = widen(price) * U512::from(data_gas);
            }
        }

        let prepay = mgval + dgval;
        let want = match msg.pricing {
            Pricing::Legacy { .. } => prepay,
            Pricing::DynamicFee { fee_cap, .. } => gas
                .checked_mul(fee_cap)
                .and_then(|cost| cost.checked_add(widen(msg.value)))
                .and_then(|cost| cost.checked_add(dgval))
                .ok_or(TransitionError::FeeOverflow("max gas cost"))?,
        };
        // The debit itself must be covered as well.
        let want = core::cmp::max(want, prepay);

        let have = self.env.state.balance(address);
        if widen(have) < want {
            return Err(TransitionError::InsufficientFunds {
                address,
                have,
                want,
            });
        }
        let debited = narrow(prepay).ok_or(TransitionError::FeeOverflow("prepayment"))?;

        self.pool.sub_gas(msg.gas_limit)?;
        if let Err(err) = self.pool.sub_data_gas(data_gas) {
            self.pool.add_gas(msg.gas_limit);
            return Err(err);
        }

        self.gas_remaining = msg.gas_limit;
        self.env.state.sub_balance(address, debited);

        Ok(Escrow {
            debited,
            gas: msg.gas_limit,
            data_gas,
        })
    }

    /// Intrinsic gas deduction and topmost transfer check.
    fn admit(&mut self) -> TransitionResult<()> {
        let msg = self.msg;
        let intrinsic = intrinsic_gas(
            &msg.data,
            msg.access_list.as_ref(),
            msg.is_contract_creation(),
            self.rules.intrinsic_gas_rules(),
        )?;
        if self.gas_remaining < intrinsic {
            return Err(TransitionError::IntrinsicGas {
                have: self.gas_remaining,
                want: intrinsic,
            });
        }
        self.gas_remaining -= intrinsic;

        if !msg.value.is_zero() && !can_transfer(&*self.env.state, msg.from, msg.value) {
            return Err(TransitionError::InsufficientFundsForTransfer { address: msg.from });
        }
        Ok(())
    }

    /// Undo an escrow after a later consensus check failed.
    fn rollback(&mut self, escrow: &Escrow) {
        trace!(debited = %escrow.debited, gas = escrow.gas, data_gas = escrow.data_gas, "escrow rolled back");
        self.env.state.add_balance(self.msg.from, escrow.debited);
        self.pool.add_gas(escrow.gas);
        self.pool.add_data_gas(escrow.data_gas);
        self.gas_remaining = 0;
    }

    /// Apply the capped refund, return unused prepayment to the sender and
    /// unused gas to the block budget.
    ///
    /// Data gas is never returned.
    fn refund_gas(&mut self, quotient: u64) -> TransitionResult<()> {
        let refund = core::cmp::min(self.gas_used() / quotient, self.env.state.refund());
        self.gas_remaining += refund;

        let unused = U256::from(self.gas_remaining)
            .checked_mul(self.gas_price)
            .ok_or(TransitionError::FeeOverflow("unused gas refund"))?;
        self.env.state.add_balance(self.msg.from, unused);
        self.pool.add_gas(self.gas_remaining);

        trace!(refund, gas_remaining = self.gas_remaining, %unused, "gas refunded");
        Ok(())
    }

    /// Credit the proposer with `gas_used * effective_tip`.
    fn pay_proposer(&mut self) -> TransitionResult<()> {
        let pricing = &self.msg.pricing;
        if self.env.config.no_base_fee && pricing.fee_cap().is_zero() && pricing.tip_cap().is_zero()
        {
            return Ok(());
        }

        let tip = self.effective_tip()?;
        let fee = U256::from(self.gas_used())
            .checked_mul(tip)
            .ok_or(TransitionError::FeeOverflow("proposer fee"))?;
        self.env.state.add_balance(self.env.block.coinbase, fee);

        trace!(%tip, %fee, coinbase = ?self.env.block.coinbase, "proposer paid");
        Ok(())
    }

    /// Per-unit tip: the gas price before London, `min(tip_cap, fee_cap -
    /// base_fee)` from London on.
    fn effective_tip(&self) -> TransitionResult<U256> {
        let pricing = &self.msg.pricing;
        if !self.rules.is_london {
            return Ok(self.gas_price);
        }
        let base_fee = self.env.block.base_fee.unwrap_or_default();
        let fee_cap = pricing.fee_cap();
        let headroom = fee_cap
            .checked_sub(widen(base_fee))
            .ok_or(TransitionError::FeeCapTooLow {
                address: self.msg.from,
                fee_cap,
                base_fee,
            })?;
        narrow(core::cmp::min(pricing.tip_cap(), headroom))
            .ok_or(TransitionError::FeeOverflow("effective tip"))
    }
}

/// Precompiled contract addresses active under `rules`.
pub fn active_precompiles(rules: &Rules) -> Vec<Address> {
    let count = if rules.is_istanbul || rules.is_berlin {
        9
    } else if rules.is_byzantium {
        8
    } else {
        4
    };
    let mut addresses: Vec<Address> = (1..=count).map(address_from_low_u8).collect();
    if rules.is_sharding {
        // Point evaluation.
        addresses.push(address_from_low_u8(0x14));
    }
    addresses
}

//! The three gas stages: reference price, dry-run budget estimation, and
//! payment selection.

use async_trait::async_trait;
use tracing::debug;

use crate::builder::{BuildArgs, TransactionOverrides};
use crate::client::NATIVE_COIN_TYPE;
use crate::data::{CallArg, ObjectArg, ObjectRef};
use crate::error::Error;

use super::{ResolveContext, TerminalHandler};

/// Extra computation units budgeted on top of the dry-run estimate, scaled
/// by the gas price.
const GAS_SAFE_OVERHEAD: u64 = 1000;

pub struct SetGasPrice;

#[async_trait]
impl TerminalHandler for SetGasPrice {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        if ctx.data.state().gas_data.price.is_some() {
            return Ok(());
        }
        let client = ctx.require_client("setGasPrice")?;
        let price = client
            .get_reference_gas_price()
            .await
            .map_err(Error::ChainClient)?;
        debug!(price, "using reference gas price");
        ctx.data.state_mut().gas_data.price = Some(price);
        Ok(())
    }
}

pub struct SetGasBudget;

#[async_trait]
impl TerminalHandler for SetGasBudget {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        if ctx.data.state().gas_data.budget.is_some() {
            return Ok(());
        }
        let client = ctx.require_client("setGasBudget")?;

        // Dry-run with the maximum budget and no payment objects; the
        // response tells us what the transaction actually costs.
        let bytes = ctx.data.build(&BuildArgs {
            overrides: Some(TransactionOverrides {
                gas_budget: Some(ctx.limits.max_tx_gas),
                gas_payment: Some(Vec::new()),
                ..Default::default()
            }),
            ..Default::default()
        })?;
        let response = client
            .dry_run_transaction_block(&bytes)
            .await
            .map_err(Error::ChainClient)?;
        if !response.effects.status.is_success() {
            return Err(Error::DryRunFailed {
                effects_error: response
                    .effects
                    .status
                    .error
                    .clone()
                    .unwrap_or_else(|| "dry run returned a failure status".into()),
                cause: serde_json::to_string(&response).unwrap_or_default(),
            });
        }

        let gas = response.effects.gas_used;
        let price = ctx.data.state().gas_data.price.unwrap_or(1);
        let overhead = GAS_SAFE_OVERHEAD * price;
        let base = gas.computation_cost + overhead;
        let with_storage = (base + gas.storage_cost).saturating_sub(gas.storage_rebate);
        let budget = with_storage.max(base);
        debug!(budget, "estimated gas budget from dry run");
        ctx.data.state_mut().gas_data.budget = Some(budget);
        Ok(())
    }
}

pub struct SetGasPayment;

#[async_trait]
impl TerminalHandler for SetGasPayment {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        let max_gas_objects = ctx.limits.max_gas_objects;
        if let Some(payment) = &ctx.data.state().gas_data.payment {
            if payment.len() as u64 > max_gas_objects {
                return Err(Error::TooManyGasCoins {
                    max: max_gas_objects,
                });
            }
            return Ok(());
        }

        let state = ctx.data.state();
        let owner = state
            .gas_data
            .owner
            .or(state.sender)
            .ok_or(Error::MissingSender)?;

        let client = ctx.require_client("setGasPayment")?;
        let coins = client
            .get_coins(owner, NATIVE_COIN_TYPE)
            .await
            .map_err(Error::ChainClient)?;

        // Coins already used as owned inputs cannot double as gas.
        let used: Vec<_> = ctx
            .data
            .state()
            .inputs
            .iter()
            .filter_map(|input| match input {
                CallArg::Object(ObjectArg::ImmOrOwnedObject(obj)) => Some(obj.object_id),
                _ => None,
            })
            .collect();

        let payment: Vec<ObjectRef> = coins
            .into_iter()
            .filter(|coin| !used.contains(&coin.coin_object_id))
            .take((max_gas_objects as usize).saturating_sub(1))
            .map(|coin| ObjectRef {
                object_id: coin.coin_object_id,
                version: coin.version,
                digest: coin.digest,
            })
            .collect();
        if payment.is_empty() {
            return Err(Error::NoGasCoins);
        }
        debug!(coins = payment.len(), "selected gas payment");
        ctx.data.state_mut().gas_data.payment = Some(payment);
        Ok(())
    }
}

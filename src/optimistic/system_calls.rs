//! Interface of the real, chain-backed actions.

use async_trait::async_trait;

use crate::error::ActionError;

use super::props::{
    AcceptOrderProps, BuildLaborProps, ChangeOrderStatusProps, ClaimFungibleOrderProps, HarvestLaborProps,
    MakeFungibleOrderProps,
};

/// Submits game transactions and resolves once they are confirmed.
///
/// Implementations live in the transaction layer; the optimistic wrapper only
/// relies on each call settling exactly once.
#[async_trait]
pub trait SystemCalls: Send + Sync {
    /// Creates an order; returns the real trade id.
    async fn make_fungible_order(&self, props: MakeFungibleOrderProps) -> Result<u64, ActionError>;

    async fn claim_fungible_order(&self, props: ClaimFungibleOrderProps) -> Result<(), ActionError>;

    async fn accept_order(&self, props: AcceptOrderProps) -> Result<(), ActionError>;

    async fn cancel_fungible_order(&self, props: ChangeOrderStatusProps) -> Result<(), ActionError>;

    async fn build_labor(&self, props: BuildLaborProps) -> Result<(), ActionError>;

    async fn harvest_labor(&self, props: HarvestLaborProps) -> Result<(), ActionError>;
}

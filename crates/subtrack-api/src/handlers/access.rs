//! Ownership and membership checks shared by handlers.

use subtrack_core::error::AppError;
use subtrack_core::types::id::{GroupId, PaymentId, SubscriptionId};
use subtrack_entity::group::SharingGroup;
use subtrack_entity::payment::Payment;
use subtrack_entity::subscription::Subscription;
use subtrack_service::context::RequestContext;

use crate::state::AppState;

/// The subscription, if the caller owns it or is an admin.
pub async fn owned_subscription(
    state: &AppState,
    ctx: &RequestContext,
    subscription_id: SubscriptionId,
) -> Result<Subscription, AppError> {
    let subscription = state
        .storage
        .subscriptions
        .find_by_id(subscription_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Subscription {subscription_id} not found")))?;

    if !ctx.is_admin && subscription.user_id != ctx.user_id {
        return Err(AppError::authorization(
            "Only the subscription owner can do this",
        ));
    }
    Ok(subscription)
}

/// The group, if the caller is an active member or an admin.
pub async fn member_group(
    state: &AppState,
    ctx: &RequestContext,
    group_id: GroupId,
) -> Result<SharingGroup, AppError> {
    let group = state.group_service.get(group_id).await?;
    if !ctx.is_admin && !group.is_active_member(ctx.user_id) {
        return Err(AppError::authorization("Not a member of this group"));
    }
    Ok(group)
}

/// The payment, if the caller belongs to its group or is an admin.
pub async fn visible_payment(
    state: &AppState,
    ctx: &RequestContext,
    payment_id: PaymentId,
) -> Result<Payment, AppError> {
    let payment = state
        .storage
        .payments
        .find_by_id(payment_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Payment {payment_id} not found")))?;
    member_group(state, ctx, payment.group_id).await?;
    Ok(payment)
}

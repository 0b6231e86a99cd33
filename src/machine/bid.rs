//! Bid transitions: pending -> {hold, accepted, declined}, hold -> {accepted,
//! declined}, accepted -> pending (undo), any non-terminal -> cancelled.

use chrono::Utc;

use super::{Effect, Transition};
use crate::domain::{BidStatus, HoldState, ShowSource, VenueBid};
use crate::error::{NegotiationError, Result};

pub const REASON_COMPETING_CONFIRMED: &str = "competing bid confirmed";
pub const REASON_WITHDRAWN: &str = "withdrawn by venue";

/// Accept a bid. From a held bid this is the first stage of a two-stage
/// acceptance (status accepted, hold state accepted-held, confirm still
/// required); from a plain pending bid it is single-stage.
pub fn accept(bid: &VenueBid) -> Result<Transition<VenueBid>> {
    if bid.status.is_terminal() {
        return Err(NegotiationError::validation("accept", bid.state_label()));
    }
    if bid.hold_state == HoldState::Frozen {
        // Frozen competitors stay inert until the hold resolves.
        return Err(NegotiationError::validation("accept", bid.state_label()));
    }

    let mut next = bid.clone();
    next.updated_at = Utc::now();

    match (bid.status, bid.hold_state) {
        (BidStatus::Pending | BidStatus::Hold, HoldState::Held) => {
            next.status = BidStatus::Accepted;
            next.hold_state = HoldState::AcceptedHeld;
            Ok(Transition::new(next))
        }
        (BidStatus::Pending | BidStatus::Hold, HoldState::Available) => {
            next.status = BidStatus::Accepted;
            Ok(Transition::new(next))
        }
        _ => Err(NegotiationError::validation("accept", bid.state_label())),
    }
}

/// Finalize an accepted bid: create the show, decline every competing
/// sibling, close the request. Legal from accepted-held or a plain accept
/// that has not been confirmed yet.
pub fn confirm(bid: &VenueBid) -> Result<Transition<VenueBid>> {
    if bid.status != BidStatus::Accepted || bid.is_confirmed() {
        return Err(NegotiationError::validation("confirm", bid.state_label()));
    }

    let mut next = bid.clone();
    next.confirmed_at = Some(Utc::now());
    next.updated_at = Utc::now();

    Ok(Transition::new(next)
        .with_effect(Effect::CreateShow {
            source: ShowSource::FromBid(bid.id),
        })
        .with_effect(Effect::DeclineSiblings {
            reason: REASON_COMPETING_CONFIRMED.to_string(),
        })
        .with_effect(Effect::CloseRequest))
}

/// Walk an acceptance back to pending. Legal only before confirmation.
pub fn undo_accept(bid: &VenueBid) -> Result<Transition<VenueBid>> {
    if bid.status != BidStatus::Accepted || bid.is_confirmed() {
        return Err(NegotiationError::validation(
            "undo-accept",
            bid.state_label(),
        ));
    }

    let mut next = bid.clone();
    next.status = BidStatus::Pending;
    next.updated_at = Utc::now();

    let mut transition = Transition::new(next);
    if bid.holds_priority() {
        transition.entity.hold_state = HoldState::Available;
        transition.entity.hold_placed_at = None;
        transition = transition.with_effect(Effect::ReleaseFrozenSiblings);
    }
    Ok(transition)
}

/// Decline a bid, or cancel it when the venue withdraws its own proposal.
/// Legal from any non-terminal state; a frozen bid may still be declined by
/// its own venue.
pub fn decline(bid: &VenueBid, reason: &str, withdrawn: bool) -> Result<Transition<VenueBid>> {
    if bid.status.is_terminal() {
        return Err(NegotiationError::validation("decline", bid.state_label()));
    }

    let mut next = bid.clone();
    next.status = if withdrawn {
        BidStatus::Cancelled
    } else {
        BidStatus::Declined
    };
    next.decline_reason = Some(reason.to_string());
    next.updated_at = Utc::now();

    let held = bid.holds_priority();
    next.hold_state = HoldState::Available;
    next.frozen_by_hold_id = None;
    next.hold_placed_at = None;

    let mut transition = Transition::new(next);
    if held {
        transition = transition.with_effect(Effect::ReleaseFrozenSiblings);
    }
    if withdrawn {
        transition = transition.with_effect(Effect::RetireSyntheticRequest);
    }
    Ok(transition)
}

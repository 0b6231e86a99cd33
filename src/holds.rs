//! Hold coordination across the bids competing for one show request.
//!
//! A hold gives one bid priority and freezes every other active sibling.
//! Freezing is scoped to the request; a venue's bids on other requests are
//! untouched. All functions here are pure over bid snapshots; persistence
//! is the service's job.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{BidStatus, HoldState, VenueBid};
use crate::error::{NegotiationError, Result};

/// Result of placing a hold: the held bid and the siblings it froze.
#[derive(Debug, Clone)]
pub struct HoldPlacement {
    pub held: VenueBid,
    pub frozen: Vec<VenueBid>,
}

/// Result of releasing a hold: the released bid and the siblings thawed
/// because this hold froze them.
#[derive(Debug, Clone)]
pub struct HoldRelease {
    pub released: VenueBid,
    pub thawed: Vec<VenueBid>,
}

/// The bid currently carrying the hold for this request, if any.
pub fn current_holder(bids: &[VenueBid]) -> Option<&VenueBid> {
    bids.iter().find(|b| b.is_active() && b.holds_priority())
}

/// Place a hold on `target`. Preconditions: target pending and available,
/// and no sibling already holds priority.
pub fn place_hold(target: &VenueBid, bids: &[VenueBid]) -> Result<HoldPlacement> {
    if target.status != BidStatus::Pending || target.hold_state != HoldState::Available {
        return Err(NegotiationError::validation("hold", target.state_label()));
    }
    if let Some(holder) = current_holder(bids) {
        return Err(NegotiationError::validation(
            "hold",
            format!("hold already placed on bid {}", holder.id),
        ));
    }

    let now = Utc::now();
    let mut held = target.clone();
    held.hold_state = HoldState::Held;
    held.hold_placed_at = Some(now);
    held.updated_at = now;

    let frozen = bids
        .iter()
        .filter(|b| b.id != target.id && b.is_active())
        .map(|b| {
            let mut f = b.clone();
            f.hold_state = HoldState::Frozen;
            f.frozen_by_hold_id = Some(target.id);
            f.updated_at = now;
            f
        })
        .collect();

    Ok(HoldPlacement { held, frozen })
}

/// Release the hold carried by `target`, thawing exactly the siblings this
/// hold froze. Releasing a bid that holds nothing is a no-op, not an error.
pub fn release_hold(target: &VenueBid, bids: &[VenueBid]) -> HoldRelease {
    if target.hold_state != HoldState::Held {
        return HoldRelease {
            released: target.clone(),
            thawed: Vec::new(),
        };
    }

    let now = Utc::now();
    let mut released = target.clone();
    released.hold_state = HoldState::Available;
    released.hold_placed_at = None;
    released.updated_at = now;

    HoldRelease {
        released,
        thawed: thaw_frozen_by(target.id, bids, now),
    }
}

/// Siblings frozen by the given hold, returned in their thawed state.
pub fn thaw_frozen_by(hold_id: uuid::Uuid, bids: &[VenueBid], now: DateTime<Utc>) -> Vec<VenueBid> {
    bids.iter()
        .filter(|b| b.frozen_by_hold_id == Some(hold_id) && b.hold_state == HoldState::Frozen)
        .map(|b| {
            let mut t = b.clone();
            t.hold_state = HoldState::Available;
            t.frozen_by_hold_id = None;
            t.updated_at = now;
            t
        })
        .collect()
}

/// Lazy TTL expiry: if the request's hold has outlived `ttl`, return the
/// release to persist. Accepted holds never lapse; acceptance is the
/// artist committing, not parking.
pub fn expire_lapsed_hold(
    bids: &[VenueBid],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Option<HoldRelease> {
    let holder = bids
        .iter()
        .find(|b| b.is_active() && b.hold_state == HoldState::Held)?;
    let placed_at = holder.hold_placed_at?;
    if now - placed_at < ttl {
        return None;
    }
    Some(release_hold(holder, bids))
}

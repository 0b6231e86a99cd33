//! Direct-offer transitions: pending -> {accepted, declined, cancelled}.
//! No hold vocabulary; accept is always single-stage.

use chrono::Utc;

use super::{Effect, Transition};
use crate::domain::{Actor, OfferStatus, ShowSource, VenueOffer};
use crate::error::{NegotiationError, Result};

pub const REASON_SUPERSEDED: &str = "superseded by competing booking";

/// Accept a direct offer. Single-stage: the show materializes immediately
/// and the synthetic wrapper request closes.
pub fn accept(offer: &VenueOffer) -> Result<Transition<VenueOffer>> {
    if offer.status != OfferStatus::Pending {
        return Err(NegotiationError::validation("accept", offer.status));
    }

    let mut next = offer.clone();
    next.status = OfferStatus::Accepted;
    next.updated_at = Utc::now();

    Ok(Transition::new(next)
        .with_effect(Effect::CreateShow {
            source: ShowSource::FromOffer(offer.id),
        })
        .with_effect(Effect::CloseRequest))
}

/// Decline (artist) or cancel (venue). Same terminal shape, distinct actor
/// and reason tags kept for auditing.
pub fn decline(offer: &VenueOffer, actor: Actor, reason: &str) -> Result<Transition<VenueOffer>> {
    if offer.status.is_terminal() {
        return Err(NegotiationError::validation("decline", offer.status));
    }

    let mut next = offer.clone();
    next.status = match actor {
        Actor::Artist => OfferStatus::Declined,
        Actor::Venue => OfferStatus::Cancelled,
    };
    next.decline_reason = Some(reason.to_string());
    next.declined_by = Some(actor);
    next.updated_at = Utc::now();

    let mut transition = Transition::new(next);
    if actor == Actor::Venue {
        transition = transition.with_effect(Effect::RetireSyntheticRequest);
    }
    Ok(transition)
}

/// Revert an accepted offer during a booking switch.
pub fn supersede(offer: &VenueOffer) -> Result<Transition<VenueOffer>> {
    if offer.status != OfferStatus::Accepted {
        return Err(NegotiationError::validation("supersede", offer.status));
    }

    let mut next = offer.clone();
    next.status = OfferStatus::Declined;
    next.decline_reason = Some(REASON_SUPERSEDED.to_string());
    next.declined_by = Some(Actor::Artist);
    next.updated_at = Utc::now();
    Ok(Transition::new(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn pending_offer() -> VenueOffer {
        VenueOffer::new(
            Uuid::new_v4(),
            "Chastity Belt",
            Uuid::new_v4(),
            "Neumos",
            NaiveDate::from_ymd_opt(2025, 9, 12).unwrap(),
        )
    }

    #[test]
    fn accept_creates_show_and_closes_wrapper() {
        let offer = pending_offer();
        let t = accept(&offer).unwrap();
        assert_eq!(t.entity.status, OfferStatus::Accepted);
        assert!(t
            .effects
            .iter()
            .any(|e| matches!(e, Effect::CreateShow { .. })));
        assert!(t.effects.contains(&Effect::CloseRequest));
    }

    #[test]
    fn accept_rejected_once_terminal() {
        let offer = pending_offer();
        let declined = decline(&offer, Actor::Artist, "not touring then")
            .unwrap()
            .entity;
        assert!(accept(&declined).is_err());
    }

    #[test]
    fn venue_cancel_keeps_actor_tag_and_retires_wrapper() {
        let offer = pending_offer();
        let t = decline(&offer, Actor::Venue, "room double-booked").unwrap();
        assert_eq!(t.entity.status, OfferStatus::Cancelled);
        assert_eq!(t.entity.declined_by, Some(Actor::Venue));
        assert!(t.effects.contains(&Effect::RetireSyntheticRequest));
    }

    #[test]
    fn supersede_only_applies_to_accepted_offers() {
        let offer = pending_offer();
        assert!(supersede(&offer).is_err());

        let accepted = accept(&offer).unwrap().entity;
        let reverted = supersede(&accepted).unwrap().entity;
        assert_eq!(reverted.status, OfferStatus::Declined);
        assert_eq!(reverted.decline_reason.as_deref(), Some(REASON_SUPERSEDED));
    }
}

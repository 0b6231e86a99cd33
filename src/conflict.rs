//! Per-artist date exclusivity: at most one accepted bid/offer/show per
//! calendar date. Detection runs before any accepting transition commits;
//! the switch saga moves an acceptance from one proposal to another with
//! revert-on-failure.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::domain::{HoldState, Proposal, Show, ShowSource, VenueBid, VenueOffer};
use crate::error::{NegotiationError, Result};
use crate::holds;
use crate::lineup;
use crate::machine::{self, Effect};
use crate::store::ProposalStore;

/// The already-booked entity blocking an accept.
#[derive(Debug, Clone)]
pub enum ConflictingBooking {
    Proposal(Proposal),
    Show(Show),
}

impl ConflictingBooking {
    pub fn date(&self) -> NaiveDate {
        match self {
            ConflictingBooking::Proposal(p) => p.proposed_date(),
            ConflictingBooking::Show(s) => s.date,
        }
    }

    /// Stable identity string used in the conflict error message.
    pub fn describe(&self) -> String {
        match self {
            ConflictingBooking::Proposal(Proposal::Bid(b)) => {
                format!("accepted bid at {}", b.venue_name)
            }
            ConflictingBooking::Proposal(Proposal::Offer(o)) => {
                format!("accepted offer from {}", o.venue_name)
            }
            ConflictingBooking::Show(s) => format!("confirmed show at {}", s.venue_name),
        }
    }
}

/// Outcome of a completed switch: exactly one of the two proposals is
/// accepted for the date. Effects from the accepting transition are left
/// for the service to execute.
#[derive(Debug)]
pub struct SwitchOutcome {
    pub reverted: Proposal,
    pub accepted: Proposal,
    pub effects: Vec<Effect>,
}

pub struct ConflictResolver {
    store: Arc<dyn ProposalStore>,
}

impl ConflictResolver {
    pub fn new(store: Arc<dyn ProposalStore>) -> Self {
        Self { store }
    }

    /// Scan the artist's active proposals and confirmed shows for an
    /// accepted booking on `date`, excluding the entity under
    /// consideration.
    #[instrument(skip(self))]
    pub async fn check_date_conflict(
        &self,
        artist_id: Uuid,
        date: NaiveDate,
        excluding: Option<Uuid>,
    ) -> Result<Option<ConflictingBooking>> {
        for proposal in self.store.list_active_by_artist(artist_id).await? {
            if Some(proposal.id()) == excluding {
                continue;
            }
            if proposal.is_accepted() && proposal.proposed_date() == date {
                debug!("Date conflict with proposal {}", proposal.id());
                return Ok(Some(ConflictingBooking::Proposal(proposal)));
            }
        }

        for show in self.store.list_shows_by_artist(artist_id).await? {
            if show.date != date {
                continue;
            }
            // A show sourced from the excluded proposal is that proposal's
            // own booking, not a competing one.
            if excluding == Some(source_id(&show.source)) {
                continue;
            }
            debug!("Date conflict with show {}", show.id);
            return Ok(Some(ConflictingBooking::Show(show)));
        }
        Ok(None)
    }

    /// Move the artist's acceptance for a date from `old` to `new`.
    ///
    /// Two sequential writes against the store, treated as a saga: if
    /// accepting `new` fails after `old` was reverted, the revert is rolled
    /// back so the artist never ends up with zero accepted bookings for a
    /// date that had one.
    #[instrument(skip(self, new, old), fields(new_id = %new.id(), old_id = %old.id()))]
    pub async fn switch_booking(&self, new: &Proposal, old: &Proposal) -> Result<SwitchOutcome> {
        if !old.is_accepted() {
            return Err(NegotiationError::validation(
                "switch-booking",
                "old proposal is not accepted",
            ));
        }

        // Step 1: revert the currently accepted proposal.
        let undo = self.revert_old(old).await?;

        // Step 2: accept the replacement.
        let (accepted, effects) = match self.accept_new(new).await {
            Ok(done) => done,
            Err(e) => {
                warn!("Switch failed accepting replacement, rolling back: {}", e);
                self.rollback(&undo).await;
                return Err(e);
            }
        };

        debug!("Booking switched to {}", accepted.id());
        Ok(SwitchOutcome {
            reverted: undo.reverted,
            accepted,
            effects,
        })
    }

    async fn revert_old(&self, old: &Proposal) -> Result<SwitchUndo> {
        match old {
            Proposal::Bid(bid) => {
                let siblings = self.store.list_bids_by_request(bid.show_request_id).await?;

                let mut reverted = bid.clone();
                reverted.status = crate::domain::BidStatus::Pending;
                reverted.updated_at = Utc::now();

                // A held acceptance also gives up its hold, thawing the
                // siblings it froze.
                let thawed = if bid.hold_state == HoldState::AcceptedHeld {
                    reverted.hold_state = HoldState::Available;
                    reverted.hold_placed_at = None;
                    holds::thaw_frozen_by(bid.id, &siblings, Utc::now())
                } else {
                    Vec::new()
                };

                self.store.save_bid(&reverted).await?;
                let mut frozen_originals = Vec::new();
                for sibling in &thawed {
                    let original = siblings
                        .iter()
                        .find(|s| s.id == sibling.id)
                        .cloned()
                        .ok_or(NegotiationError::Stale(sibling.id))?;
                    self.store.save_bid(sibling).await?;
                    frozen_originals.push(original);
                }

                Ok(SwitchUndo {
                    reverted: Proposal::Bid(reverted),
                    original: old.clone(),
                    sibling_originals: frozen_originals,
                    show_original: None,
                })
            }
            Proposal::Offer(offer) => {
                let t = machine::offer::supersede(offer)?;
                self.store.save_offer(&t.entity).await?;
                // Accepting an offer materialized a show; reverting the
                // offer takes that show back as well.
                let show_original = self.retract_show(offer).await?;
                Ok(SwitchUndo {
                    reverted: Proposal::Offer(t.entity),
                    original: old.clone(),
                    sibling_originals: Vec::new(),
                    show_original,
                })
            }
        }
    }

    /// Take back the show an accepted offer created. A solo show is deleted
    /// outright; on a shared bill only this artist's slot is removed and the
    /// lineup is re-ordered and re-titled.
    async fn retract_show(&self, offer: &VenueOffer) -> Result<Option<Show>> {
        let show = match self
            .store
            .find_show_by_venue_date(offer.venue_id, offer.proposed_date)
            .await?
        {
            Some(show) => show,
            None => return Ok(None),
        };
        if !show.lineup.iter().any(|s| s.artist_id == offer.artist_id) {
            return Ok(None);
        }

        let original = show.clone();
        let remaining: Vec<_> = show
            .lineup
            .iter()
            .filter(|s| s.artist_id != offer.artist_id)
            .cloned()
            .collect();
        if remaining.is_empty() {
            self.store.delete_show(show.id).await?;
            debug!("Retracted show {} for reverted offer {}", show.id, offer.id);
        } else {
            let mut trimmed = show;
            trimmed.lineup = lineup::assign(remaining);
            trimmed.title = lineup::title(&trimmed.lineup);
            self.store.save_show(&trimmed).await?;
            debug!(
                "Removed reverted offer {}'s act from show {}",
                offer.id, trimmed.id
            );
        }
        Ok(Some(original))
    }

    async fn accept_new(&self, new: &Proposal) -> Result<(Proposal, Vec<Effect>)> {
        match new {
            Proposal::Bid(bid) => {
                let t = machine::bid::accept(bid)?;
                self.store.save_bid(&t.entity).await?;
                Ok((Proposal::Bid(t.entity), t.effects))
            }
            Proposal::Offer(offer) => {
                let t = machine::offer::accept(offer)?;
                self.store.save_offer(&t.entity).await?;
                Ok((Proposal::Offer(t.entity), t.effects))
            }
        }
    }

    /// Restore the pre-switch state after a failed second write.
    async fn rollback(&self, undo: &SwitchUndo) {
        let result = match &undo.original {
            Proposal::Bid(bid) => self.store.save_bid(bid).await,
            Proposal::Offer(offer) => self.store.save_offer(offer).await,
        };
        if let Err(e) = result {
            error!("Rollback of reverted proposal failed: {}", e);
            return;
        }
        for sibling in &undo.sibling_originals {
            if let Err(e) = self.store.save_bid(sibling).await {
                error!("Rollback of thawed sibling {} failed: {}", sibling.id, e);
            }
        }
        if let Some(show) = &undo.show_original {
            // insert_show overwrites, restoring both the deleted and the
            // trimmed case.
            if let Err(e) = self.store.insert_show(show).await {
                error!("Rollback of retracted show {} failed: {}", show.id, e);
            }
        }
    }
}

fn source_id(source: &ShowSource) -> Uuid {
    match source {
        ShowSource::FromBid(id) | ShowSource::FromOffer(id) => *id,
    }
}

struct SwitchUndo {
    reverted: Proposal,
    original: Proposal,
    /// Pre-thaw snapshots of siblings the revert unfroze.
    sibling_originals: Vec<VenueBid>,
    /// Pre-retraction snapshot of the reverted offer's show.
    show_original: Option<Show>,
}

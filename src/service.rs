//! NegotiationService: the only component invoked from outside the core.
//!
//! Every operation acquires the per-show-request lock, loads the entity and
//! its siblings, runs the pure state machine (after a conflict check for
//! accepting transitions), persists the result, and executes the returned
//! side-effect instructions. Transitions retry at most once, and only after
//! a stale-entity signal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::conflict::{ConflictResolver, ConflictingBooking};
use crate::domain::*;
use crate::error::{NegotiationError, Result};
use crate::holds;
use crate::machine::{bid as bid_machine, offer as offer_machine, Effect};
use crate::store::{ProposalStore, ShowFactory, StoreShowFactory};

/// Caller-facing handle for a proposal of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalRef {
    Bid(Uuid),
    Offer(Uuid),
}

/// What a completed operation did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationEvent {
    BidPlaced { bid_id: Uuid },
    OfferSubmitted { offer_id: Uuid, request_id: Uuid },
    BidAccepted { bid_id: Uuid, two_stage: bool },
    BidConfirmed { bid_id: Uuid },
    AcceptUndone { bid_id: Uuid },
    HoldPlaced { bid_id: Uuid, frozen: Vec<Uuid> },
    HoldReleased { bid_id: Uuid, thawed: Vec<Uuid> },
    HoldExpired { bid_id: Uuid },
    BidDeclined { bid_id: Uuid, reason: String },
    BidWithdrawn { bid_id: Uuid },
    OfferAccepted { offer_id: Uuid },
    OfferDeclined { offer_id: Uuid, by: Actor },
    ShowCreated { show_id: Uuid },
    RequestClosed { request_id: Uuid },
    SyntheticRequestRetired { request_id: Uuid },
    BookingSwitched { accepted: Uuid, reverted: Uuid },
}

pub struct NegotiationService {
    store: Arc<dyn ProposalStore>,
    shows: Arc<dyn ShowFactory>,
    resolver: ConflictResolver,
    config: Config,
    /// One logical lock per show request; transitions on unrelated
    /// requests proceed in parallel.
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl NegotiationService {
    pub fn new(store: Arc<dyn ProposalStore>, shows: Arc<dyn ShowFactory>, config: Config) -> Self {
        Self {
            resolver: ConflictResolver::new(store.clone()),
            store,
            shows,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service over the given store with the default show factory and config.
    pub fn with_defaults(store: Arc<dyn ProposalStore>) -> Self {
        let shows = Arc::new(StoreShowFactory::new(store.clone()));
        Self::new(store, shows, Config::default())
    }

    fn request_lock(&self, request_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        // An entry only the registry still references has no waiters;
        // dropping it here keeps the map bounded by in-flight requests.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(request_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    // ---- submission -----------------------------------------------------

    /// Record a venue's bid against an open show request.
    #[instrument(skip(self, bid), fields(bid_id = %bid.id))]
    pub async fn place_bid(&self, bid: VenueBid) -> Result<Vec<NegotiationEvent>> {
        let lock = self.request_lock(bid.show_request_id);
        let _guard = lock.lock().await;

        let request = self
            .store
            .get_request(bid.show_request_id)
            .await?
            .ok_or(NegotiationError::Stale(bid.show_request_id))?;
        if request.status != RequestStatus::Open {
            return Err(NegotiationError::validation("place-bid", "request closed"));
        }

        self.store.insert_bid(&bid).await?;
        info!("Bid placed by {} for {}", bid.venue_name, bid.proposed_date);
        Ok(vec![NegotiationEvent::BidPlaced { bid_id: bid.id }])
    }

    /// Record a direct offer, materializing the synthetic wrapper request
    /// that makes it visible alongside open-request bids.
    #[instrument(skip(self, offer), fields(offer_id = %offer.id))]
    pub async fn submit_offer(&self, offer: VenueOffer) -> Result<Vec<NegotiationEvent>> {
        let wrapper = ShowRequest::synthetic_for_offer(&offer);
        self.store.insert_offer(&offer).await?;
        self.store.insert_request(&wrapper).await?;
        info!(
            "Offer submitted by {} for {}",
            offer.venue_name, offer.proposed_date
        );
        Ok(vec![NegotiationEvent::OfferSubmitted {
            offer_id: offer.id,
            request_id: wrapper.id,
        }])
    }

    // ---- bid actions ----------------------------------------------------

    /// Accept a bid: two-stage from a held bid, single-stage from plain
    /// pending. Rejected with a conflict error when the artist already has
    /// an accepted booking for the date.
    #[instrument(skip(self))]
    pub async fn accept_bid(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.accept_bid_inner(bid_id)).await
    }

    async fn accept_bid_inner(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        let (lock, _) = self.bid_lock(bid_id).await?;
        let _guard = lock.lock().await;
        let (request, bid, _siblings, mut events) = self.load_bid_context(bid_id).await?;

        self.reject_on_conflict(request.artist_id, &bid).await?;

        let t = bid_machine::accept(&bid)?;
        let two_stage = t.entity.hold_state == HoldState::AcceptedHeld;
        self.store.save_bid(&t.entity).await?;
        events.push(NegotiationEvent::BidAccepted { bid_id, two_stage });
        self.apply_bid_effects(&request, &t.entity, t.effects, &mut events)
            .await?;
        info!("Bid {} accepted (two_stage: {})", bid_id, two_stage);
        Ok(events)
    }

    /// Finalize an accepted bid: show created, competing siblings declined,
    /// request closed.
    #[instrument(skip(self))]
    pub async fn confirm_bid(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.confirm_bid_inner(bid_id)).await
    }

    async fn confirm_bid_inner(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        let (lock, _) = self.bid_lock(bid_id).await?;
        let _guard = lock.lock().await;
        let (request, bid, _siblings, mut events) = self.load_bid_context(bid_id).await?;

        let t = bid_machine::confirm(&bid)?;
        self.store.save_bid(&t.entity).await?;
        events.push(NegotiationEvent::BidConfirmed { bid_id });
        self.apply_bid_effects(&request, &t.entity, t.effects, &mut events)
            .await?;
        info!("Bid {} confirmed", bid_id);
        Ok(events)
    }

    /// Walk back a not-yet-confirmed acceptance, unfreezing siblings.
    #[instrument(skip(self))]
    pub async fn undo_accept_bid(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.undo_accept_bid_inner(bid_id))
            .await
    }

    async fn undo_accept_bid_inner(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        let (lock, _) = self.bid_lock(bid_id).await?;
        let _guard = lock.lock().await;
        let (request, bid, _siblings, mut events) = self.load_bid_context(bid_id).await?;

        let t = bid_machine::undo_accept(&bid)?;
        self.store.save_bid(&t.entity).await?;
        events.push(NegotiationEvent::AcceptUndone { bid_id });
        self.apply_bid_effects(&request, &t.entity, t.effects, &mut events)
            .await?;
        Ok(events)
    }

    /// Place the artist's hold on a bid, freezing every competing sibling.
    #[instrument(skip(self))]
    pub async fn hold_bid(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.hold_bid_inner(bid_id)).await
    }

    async fn hold_bid_inner(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        let (lock, _) = self.bid_lock(bid_id).await?;
        let _guard = lock.lock().await;
        let (_request, bid, siblings, mut events) = self.load_bid_context(bid_id).await?;

        let placement = holds::place_hold(&bid, &siblings)?;
        self.store.save_bid(&placement.held).await?;
        for frozen in &placement.frozen {
            self.store.save_bid(frozen).await?;
        }
        let frozen_ids: Vec<Uuid> = placement.frozen.iter().map(|b| b.id).collect();
        info!("Hold placed on bid {}, froze {} siblings", bid_id, frozen_ids.len());
        events.push(NegotiationEvent::HoldPlaced {
            bid_id,
            frozen: frozen_ids,
        });
        Ok(events)
    }

    /// Release a held bid. Releasing a bid that holds nothing is a no-op.
    #[instrument(skip(self))]
    pub async fn release_hold(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.release_hold_inner(bid_id)).await
    }

    async fn release_hold_inner(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        let (lock, _) = self.bid_lock(bid_id).await?;
        let _guard = lock.lock().await;
        let (_request, bid, siblings, mut events) = self.load_bid_context(bid_id).await?;

        if bid.hold_state != HoldState::Held {
            debug!("Release on bid {} without a hold, nothing to do", bid_id);
            return Ok(events);
        }

        let release = holds::release_hold(&bid, &siblings);
        self.store.save_bid(&release.released).await?;
        for thawed in &release.thawed {
            self.store.save_bid(thawed).await?;
        }
        events.push(NegotiationEvent::HoldReleased {
            bid_id,
            thawed: release.thawed.iter().map(|b| b.id).collect(),
        });
        Ok(events)
    }

    /// Artist-side decline of a bid. Releases any hold it carried.
    #[instrument(skip(self))]
    pub async fn decline_bid(&self, bid_id: Uuid, reason: &str) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.decline_bid_inner(bid_id, reason, false))
            .await
    }

    /// Venue withdrawal of its own bid: terminal cancelled status, and the
    /// synthetic wrapper request (if any) is retired.
    #[instrument(skip(self))]
    pub async fn withdraw_bid(&self, bid_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| {
            self.decline_bid_inner(bid_id, bid_machine::REASON_WITHDRAWN, true)
        })
        .await
    }

    async fn decline_bid_inner(
        &self,
        bid_id: Uuid,
        reason: &str,
        withdrawn: bool,
    ) -> Result<Vec<NegotiationEvent>> {
        let (lock, _) = self.bid_lock(bid_id).await?;
        let _guard = lock.lock().await;
        let (request, bid, _siblings, mut events) = self.load_bid_context(bid_id).await?;

        let t = bid_machine::decline(&bid, reason, withdrawn)?;
        self.store.save_bid(&t.entity).await?;
        if withdrawn {
            events.push(NegotiationEvent::BidWithdrawn { bid_id });
        } else {
            events.push(NegotiationEvent::BidDeclined {
                bid_id,
                reason: reason.to_string(),
            });
        }
        self.apply_bid_effects(&request, &t.entity, t.effects, &mut events)
            .await?;
        Ok(events)
    }

    // ---- offer actions --------------------------------------------------

    /// Accept a direct offer. Single-stage: the show materializes now.
    #[instrument(skip(self))]
    pub async fn accept_offer(&self, offer_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.accept_offer_inner(offer_id))
            .await
    }

    async fn accept_offer_inner(&self, offer_id: Uuid) -> Result<Vec<NegotiationEvent>> {
        let (offer, wrapper) = self.load_offer_context(offer_id).await?;
        let lock = self.request_lock(wrapper.as_ref().map(|r| r.id).unwrap_or(offer_id));
        let _guard = lock.lock().await;
        // Reload under the lock so the transition sees current state.
        let (offer, wrapper) = self.load_offer_context(offer.id).await?;

        if let Some(conflict) = self
            .resolver
            .check_date_conflict(offer.artist_id, offer.proposed_date, Some(offer.id))
            .await?
        {
            return Err(conflict_error(&conflict));
        }

        let t = offer_machine::accept(&offer)?;
        self.store.save_offer(&t.entity).await?;
        let mut events = vec![NegotiationEvent::OfferAccepted { offer_id }];
        self.apply_offer_effects(wrapper.as_ref(), &t.entity, t.effects, &mut events)
            .await?;
        info!("Offer {} accepted", offer_id);
        Ok(events)
    }

    /// Artist-side decline of a direct offer.
    #[instrument(skip(self))]
    pub async fn decline_offer(&self, offer_id: Uuid, reason: &str) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.decline_offer_inner(offer_id, Actor::Artist, reason))
            .await
    }

    /// Venue-side cancellation: same terminal shape, distinct actor tag,
    /// and the synthetic wrapper request is retired.
    #[instrument(skip(self))]
    pub async fn cancel_offer(&self, offer_id: Uuid, reason: &str) -> Result<Vec<NegotiationEvent>> {
        self.retry_stale_once(|| self.decline_offer_inner(offer_id, Actor::Venue, reason))
            .await
    }

    async fn decline_offer_inner(
        &self,
        offer_id: Uuid,
        actor: Actor,
        reason: &str,
    ) -> Result<Vec<NegotiationEvent>> {
        let (offer, wrapper) = self.load_offer_context(offer_id).await?;
        let lock = self.request_lock(wrapper.as_ref().map(|r| r.id).unwrap_or(offer_id));
        let _guard = lock.lock().await;
        let (offer, wrapper) = self.load_offer_context(offer.id).await?;

        let t = offer_machine::decline(&offer, actor, reason)?;
        self.store.save_offer(&t.entity).await?;
        let mut events = vec![NegotiationEvent::OfferDeclined {
            offer_id,
            by: actor,
        }];
        self.apply_offer_effects(wrapper.as_ref(), &t.entity, t.effects, &mut events)
            .await?;
        Ok(events)
    }

    // ---- switching ------------------------------------------------------

    /// Move the artist's acceptance for a date from `old` to `new`, as an
    /// explicit, caller-confirmed choice after a conflict was reported.
    #[instrument(skip(self))]
    pub async fn switch_booking(
        &self,
        new: ProposalRef,
        old: ProposalRef,
    ) -> Result<Vec<NegotiationEvent>> {
        let new_proposal = self.load_proposal(new).await?;
        let old_proposal = self.load_proposal(old).await?;

        // Lock both request scopes in a stable order so two concurrent
        // switches cannot deadlock.
        let mut lock_ids = vec![
            self.lock_scope(&new_proposal).await?,
            self.lock_scope(&old_proposal).await?,
        ];
        lock_ids.sort();
        lock_ids.dedup();
        let locks: Vec<_> = lock_ids.iter().map(|id| self.request_lock(*id)).collect();
        let mut guards = Vec::with_capacity(locks.len());
        for lock in &locks {
            guards.push(lock.lock().await);
        }

        // Reload under the locks.
        let new_proposal = self.load_proposal(new).await?;
        let old_proposal = self.load_proposal(old).await?;

        // A third accepted booking for the date blocks the switch outright.
        if let Some(conflict) = self
            .resolver
            .check_date_conflict(
                self.artist_of(&new_proposal).await?,
                new_proposal.proposed_date(),
                Some(old_proposal.id()),
            )
            .await?
        {
            if conflict_id(&conflict) != Some(new_proposal.id()) {
                return Err(conflict_error(&conflict));
            }
        }

        let outcome = self
            .resolver
            .switch_booking(&new_proposal, &old_proposal)
            .await?;

        let mut events = vec![NegotiationEvent::BookingSwitched {
            accepted: outcome.accepted.id(),
            reverted: outcome.reverted.id(),
        }];
        match &outcome.accepted {
            Proposal::Bid(bid) => {
                let request = self
                    .store
                    .get_request(bid.show_request_id)
                    .await?
                    .ok_or(NegotiationError::Stale(bid.show_request_id))?;
                self.apply_bid_effects(&request, bid, outcome.effects, &mut events)
                    .await?;
            }
            Proposal::Offer(offer) => {
                let wrapper = self.store.find_request_for_offer(offer.id).await?;
                self.apply_offer_effects(wrapper.as_ref(), offer, outcome.effects, &mut events)
                    .await?;
            }
        }
        info!(
            "Booking switched from {} to {}",
            outcome.reverted.id(),
            outcome.accepted.id()
        );
        Ok(events)
    }

    // ---- shared plumbing ------------------------------------------------

    async fn retry_stale_once<F, Fut>(&self, op: F) -> Result<Vec<NegotiationEvent>>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<NegotiationEvent>>>,
    {
        match op().await {
            Err(e) if e.is_stale() => {
                warn!("Stale entity mid-transition, refetching and retrying once");
                op().await
            }
            other => other,
        }
    }

    async fn bid_lock(&self, bid_id: Uuid) -> Result<(Arc<tokio::sync::Mutex<()>>, Uuid)> {
        let bid = self
            .store
            .get_bid(bid_id)
            .await?
            .ok_or(NegotiationError::Stale(bid_id))?;
        Ok((self.request_lock(bid.show_request_id), bid.show_request_id))
    }

    /// Load a bid with its request and siblings, applying lazy hold expiry
    /// first. Must be called with the request lock held.
    async fn load_bid_context(
        &self,
        bid_id: Uuid,
    ) -> Result<(ShowRequest, VenueBid, Vec<VenueBid>, Vec<NegotiationEvent>)> {
        let bid = self
            .store
            .get_bid(bid_id)
            .await?
            .ok_or(NegotiationError::Stale(bid_id))?;
        let request = self
            .store
            .get_request(bid.show_request_id)
            .await?
            .ok_or(NegotiationError::Stale(bid.show_request_id))?;
        let mut siblings = self.store.list_bids_by_request(request.id).await?;

        let mut events = Vec::new();
        if let Some(release) =
            holds::expire_lapsed_hold(&siblings, self.config.hold_ttl(), Utc::now())
        {
            info!("Hold on bid {} lapsed, releasing", release.released.id);
            self.store.save_bid(&release.released).await?;
            for thawed in &release.thawed {
                self.store.save_bid(thawed).await?;
            }
            events.push(NegotiationEvent::HoldExpired {
                bid_id: release.released.id,
            });
            siblings = self.store.list_bids_by_request(request.id).await?;
        }

        let bid = siblings
            .iter()
            .find(|b| b.id == bid_id)
            .cloned()
            .ok_or(NegotiationError::Stale(bid_id))?;
        Ok((request, bid, siblings, events))
    }

    async fn load_offer_context(
        &self,
        offer_id: Uuid,
    ) -> Result<(VenueOffer, Option<ShowRequest>)> {
        let offer = self
            .store
            .get_offer(offer_id)
            .await?
            .ok_or(NegotiationError::Stale(offer_id))?;
        let wrapper = self.store.find_request_for_offer(offer_id).await?;
        Ok((offer, wrapper))
    }

    async fn load_proposal(&self, proposal: ProposalRef) -> Result<Proposal> {
        match proposal {
            ProposalRef::Bid(id) => Ok(Proposal::Bid(
                self.store
                    .get_bid(id)
                    .await?
                    .ok_or(NegotiationError::Stale(id))?,
            )),
            ProposalRef::Offer(id) => Ok(Proposal::Offer(
                self.store
                    .get_offer(id)
                    .await?
                    .ok_or(NegotiationError::Stale(id))?,
            )),
        }
    }

    async fn lock_scope(&self, proposal: &Proposal) -> Result<Uuid> {
        match proposal {
            Proposal::Bid(bid) => Ok(bid.show_request_id),
            Proposal::Offer(offer) => Ok(self
                .store
                .find_request_for_offer(offer.id)
                .await?
                .map(|r| r.id)
                .unwrap_or(offer.id)),
        }
    }

    async fn artist_of(&self, proposal: &Proposal) -> Result<Uuid> {
        match proposal {
            Proposal::Bid(bid) => {
                let request = self
                    .store
                    .get_request(bid.show_request_id)
                    .await?
                    .ok_or(NegotiationError::Stale(bid.show_request_id))?;
                Ok(request.artist_id)
            }
            Proposal::Offer(offer) => Ok(offer.artist_id),
        }
    }

    async fn reject_on_conflict(&self, artist_id: Uuid, bid: &VenueBid) -> Result<()> {
        if let Some(conflict) = self
            .resolver
            .check_date_conflict(artist_id, bid.proposed_date, Some(bid.id))
            .await?
        {
            return Err(conflict_error(&conflict));
        }
        Ok(())
    }

    async fn apply_bid_effects(
        &self,
        request: &ShowRequest,
        bid: &VenueBid,
        effects: Vec<Effect>,
        events: &mut Vec<NegotiationEvent>,
    ) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::ReleaseFrozenSiblings => {
                    let siblings = self.store.list_bids_by_request(request.id).await?;
                    let thawed = holds::thaw_frozen_by(bid.id, &siblings, Utc::now());
                    for sibling in &thawed {
                        self.store.save_bid(sibling).await?;
                    }
                    events.push(NegotiationEvent::HoldReleased {
                        bid_id: bid.id,
                        thawed: thawed.iter().map(|b| b.id).collect(),
                    });
                }
                Effect::DeclineSiblings { reason } => {
                    let siblings = self.store.list_bids_by_request(request.id).await?;
                    for sibling in siblings {
                        if sibling.id == bid.id || !sibling.is_active() {
                            continue;
                        }
                        let mut declined = sibling.clone();
                        declined.status = BidStatus::Declined;
                        declined.decline_reason = Some(reason.clone());
                        declined.hold_state = HoldState::Available;
                        declined.frozen_by_hold_id = None;
                        declined.updated_at = Utc::now();
                        self.store.save_bid(&declined).await?;
                        events.push(NegotiationEvent::BidDeclined {
                            bid_id: declined.id,
                            reason: reason.clone(),
                        });
                    }
                }
                Effect::CreateShow { source } => {
                    let show = self
                        .shows
                        .create_show(ShowDraft {
                            venue_id: bid.venue_id,
                            venue_name: bid.venue_name.clone(),
                            date: bid.proposed_date,
                            lineup: vec![LineupSlot {
                                artist_id: request.artist_id,
                                artist_name: request.artist_name.clone(),
                                billing_position: bid.billing_position,
                                performance_order: None,
                                status: SlotStatus::Confirmed,
                            }],
                            source,
                        })
                        .await?;
                    events.push(NegotiationEvent::ShowCreated { show_id: show.id });
                }
                Effect::CloseRequest => {
                    let mut closed = request.clone();
                    closed.status = RequestStatus::Closed;
                    self.store.save_request(&closed).await?;
                    events.push(NegotiationEvent::RequestClosed {
                        request_id: request.id,
                    });
                }
                Effect::RetireSyntheticRequest => {
                    if request.is_synthetic() {
                        let mut retired = request.clone();
                        retired.status = RequestStatus::Cancelled;
                        self.store.save_request(&retired).await?;
                        events.push(NegotiationEvent::SyntheticRequestRetired {
                            request_id: request.id,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn apply_offer_effects(
        &self,
        wrapper: Option<&ShowRequest>,
        offer: &VenueOffer,
        effects: Vec<Effect>,
        events: &mut Vec<NegotiationEvent>,
    ) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::CreateShow { source } => {
                    let show = self
                        .shows
                        .create_show(ShowDraft {
                            venue_id: offer.venue_id,
                            venue_name: offer.venue_name.clone(),
                            date: offer.proposed_date,
                            lineup: vec![LineupSlot {
                                artist_id: offer.artist_id,
                                artist_name: offer.artist_name.clone(),
                                billing_position: offer.billing_position,
                                performance_order: None,
                                status: SlotStatus::Confirmed,
                            }],
                            source,
                        })
                        .await?;
                    events.push(NegotiationEvent::ShowCreated { show_id: show.id });
                }
                Effect::CloseRequest => {
                    if let Some(request) = wrapper {
                        let mut closed = request.clone();
                        closed.status = RequestStatus::Closed;
                        self.store.save_request(&closed).await?;
                        events.push(NegotiationEvent::RequestClosed {
                            request_id: request.id,
                        });
                    }
                }
                Effect::RetireSyntheticRequest => {
                    if let Some(request) = wrapper {
                        let mut retired = request.clone();
                        retired.status = RequestStatus::Cancelled;
                        self.store.save_request(&retired).await?;
                        events.push(NegotiationEvent::SyntheticRequestRetired {
                            request_id: request.id,
                        });
                    }
                }
                // Offers have no siblings; hold effects never reach here.
                Effect::ReleaseFrozenSiblings | Effect::DeclineSiblings { .. } => {
                    debug!("Ignoring sibling effect on offer {}", offer.id);
                }
            }
        }
        Ok(())
    }
}

fn conflict_error(conflict: &ConflictingBooking) -> NegotiationError {
    NegotiationError::Conflict {
        date: conflict.date(),
        with: conflict.describe(),
    }
}

fn conflict_id(conflict: &ConflictingBooking) -> Option<Uuid> {
    match conflict {
        ConflictingBooking::Proposal(p) => Some(p.id()),
        ConflictingBooking::Show(s) => Some(s.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryProposalStore;

    #[test]
    fn idle_lock_entries_are_pruned() {
        let service = NegotiationService::with_defaults(Arc::new(InMemoryProposalStore::new()));

        let released = service.request_lock(Uuid::new_v4());
        drop(released);

        let held = service.request_lock(Uuid::new_v4());
        assert_eq!(service.locks.lock().unwrap().len(), 1);
        drop(held);
    }
}

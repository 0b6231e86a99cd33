use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use gigbook::config::Config;
use gigbook::domain::*;
use gigbook::error::{NegotiationError, Result as CoreResult};
use gigbook::service::{NegotiationService, ProposalRef};
use gigbook::store::{InMemoryProposalStore, ProposalStore, StoreShowFactory};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
}

fn service_over(store: Arc<dyn ProposalStore>) -> NegotiationService {
    let shows = Arc::new(StoreShowFactory::new(store.clone()));
    NegotiationService::new(store, shows, Config::default())
}

/// Store wrapper that fails bid or offer writes on demand, for exercising
/// the switch saga's revert-on-failure paths.
struct FailingStore {
    inner: InMemoryProposalStore,
    fail_offer_writes: AtomicBool,
    fail_bid_writes: AtomicBool,
}

impl FailingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryProposalStore::new(),
            fail_offer_writes: AtomicBool::new(false),
            fail_bid_writes: AtomicBool::new(false),
        }
    }

    fn fail_offer_writes(&self, fail: bool) {
        self.fail_offer_writes.store(fail, Ordering::SeqCst);
    }

    fn fail_bid_writes(&self, fail: bool) {
        self.fail_bid_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProposalStore for FailingStore {
    async fn get_request(&self, id: Uuid) -> CoreResult<Option<ShowRequest>> {
        self.inner.get_request(id).await
    }
    async fn insert_request(&self, request: &ShowRequest) -> CoreResult<()> {
        self.inner.insert_request(request).await
    }
    async fn save_request(&self, request: &ShowRequest) -> CoreResult<()> {
        self.inner.save_request(request).await
    }
    async fn find_request_for_offer(&self, offer_id: Uuid) -> CoreResult<Option<ShowRequest>> {
        self.inner.find_request_for_offer(offer_id).await
    }
    async fn get_bid(&self, id: Uuid) -> CoreResult<Option<VenueBid>> {
        self.inner.get_bid(id).await
    }
    async fn insert_bid(&self, bid: &VenueBid) -> CoreResult<()> {
        self.inner.insert_bid(bid).await
    }
    async fn save_bid(&self, bid: &VenueBid) -> CoreResult<()> {
        if self.fail_bid_writes.load(Ordering::SeqCst) {
            return Err(NegotiationError::Persistence(
                "injected bid write failure".to_string(),
            ));
        }
        self.inner.save_bid(bid).await
    }
    async fn list_bids_by_request(&self, request_id: Uuid) -> CoreResult<Vec<VenueBid>> {
        self.inner.list_bids_by_request(request_id).await
    }
    async fn get_offer(&self, id: Uuid) -> CoreResult<Option<VenueOffer>> {
        self.inner.get_offer(id).await
    }
    async fn insert_offer(&self, offer: &VenueOffer) -> CoreResult<()> {
        self.inner.insert_offer(offer).await
    }
    async fn save_offer(&self, offer: &VenueOffer) -> CoreResult<()> {
        if self.fail_offer_writes.load(Ordering::SeqCst) {
            return Err(NegotiationError::Persistence(
                "injected offer write failure".to_string(),
            ));
        }
        self.inner.save_offer(offer).await
    }
    async fn list_active_by_artist(&self, artist_id: Uuid) -> CoreResult<Vec<Proposal>> {
        self.inner.list_active_by_artist(artist_id).await
    }
    async fn list_shows_by_artist(&self, artist_id: Uuid) -> CoreResult<Vec<Show>> {
        self.inner.list_shows_by_artist(artist_id).await
    }
    async fn get_show(&self, id: Uuid) -> CoreResult<Option<Show>> {
        self.inner.get_show(id).await
    }
    async fn insert_show(&self, show: &Show) -> CoreResult<()> {
        self.inner.insert_show(show).await
    }
    async fn save_show(&self, show: &Show) -> CoreResult<()> {
        self.inner.save_show(show).await
    }
    async fn delete_show(&self, id: Uuid) -> CoreResult<()> {
        self.inner.delete_show(id).await
    }
    async fn find_show_by_venue_date(
        &self,
        venue_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Option<Show>> {
        self.inner.find_show_by_venue_date(venue_id, date).await
    }
}

async fn accepted_bid_with_competing_offer(
    store: &Arc<dyn ProposalStore>,
    service: &NegotiationService,
) -> Result<(VenueBid, VenueOffer)> {
    let artist_id = Uuid::new_v4();
    let request = ShowRequest::new(artist_id, "Gouge Away", date());
    store.insert_request(&request).await?;

    let bid = VenueBid::new(request.id, Uuid::new_v4(), "venue x", date());
    service.place_bid(bid.clone()).await?;
    service.accept_bid(bid.id).await?;

    let offer = VenueOffer::new(artist_id, "Gouge Away", Uuid::new_v4(), "venue y", date());
    service.submit_offer(offer.clone()).await?;
    Ok((bid, offer))
}

#[tokio::test]
async fn conflicting_offer_accept_is_rejected_not_overridden() -> Result<()> {
    let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
    let service = service_over(store.clone());
    let (_bid, offer) = accepted_bid_with_competing_offer(&store, &service).await?;

    let err = service.accept_offer(offer.id).await.unwrap_err();
    match err {
        NegotiationError::Conflict { date: d, with } => {
            assert_eq!(d, date());
            assert!(with.contains("venue x"));
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    // Nothing moved.
    let offer = store.get_offer(offer.id).await?.unwrap();
    assert_eq!(offer.status, OfferStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn switch_moves_the_acceptance_to_the_offer() -> Result<()> {
    let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
    let service = service_over(store.clone());
    let (bid, offer) = accepted_bid_with_competing_offer(&store, &service).await?;

    service
        .switch_booking(ProposalRef::Offer(offer.id), ProposalRef::Bid(bid.id))
        .await?;

    let reverted = store.get_bid(bid.id).await?.unwrap();
    assert_eq!(reverted.status, BidStatus::Pending);
    let accepted = store.get_offer(offer.id).await?.unwrap();
    assert_eq!(accepted.status, OfferStatus::Accepted);

    // Exactly one accepted entity for the date, and the offer's show exists.
    let request = store.find_request_for_offer(offer.id).await?.unwrap();
    let accepted_count = store
        .list_active_by_artist(request.artist_id)
        .await?
        .iter()
        .filter(|p| p.is_accepted())
        .count();
    assert_eq!(accepted_count, 1);
    assert!(store
        .find_show_by_venue_date(offer.venue_id, date())
        .await?
        .is_some());
    Ok(())
}

#[tokio::test]
async fn switch_away_from_a_held_acceptance_thaws_its_siblings() -> Result<()> {
    let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
    let service = service_over(store.clone());

    let artist_id = Uuid::new_v4();
    let request = ShowRequest::new(artist_id, "Gag", date());
    store.insert_request(&request).await?;

    let bid1 = VenueBid::new(request.id, Uuid::new_v4(), "venue x", date());
    let bid2 = VenueBid::new(request.id, Uuid::new_v4(), "venue y", date());
    service.place_bid(bid1.clone()).await?;
    service.place_bid(bid2.clone()).await?;
    service.hold_bid(bid1.id).await?;
    service.accept_bid(bid1.id).await?;

    let offer = VenueOffer::new(artist_id, "Gag", Uuid::new_v4(), "venue z", date());
    service.submit_offer(offer.clone()).await?;
    service
        .switch_booking(ProposalRef::Offer(offer.id), ProposalRef::Bid(bid1.id))
        .await?;

    let reverted = store.get_bid(bid1.id).await?.unwrap();
    assert_eq!(reverted.status, BidStatus::Pending);
    assert_eq!(reverted.hold_state, HoldState::Available);
    let thawed = store.get_bid(bid2.id).await?.unwrap();
    assert_eq!(thawed.hold_state, HoldState::Available);
    Ok(())
}

async fn accepted_offer_with_competing_bid(
    store: &Arc<dyn ProposalStore>,
    service: &NegotiationService,
) -> Result<(VenueOffer, VenueBid)> {
    let artist_id = Uuid::new_v4();
    let offer = VenueOffer::new(artist_id, "Gouge Away", Uuid::new_v4(), "venue y", date());
    service.submit_offer(offer.clone()).await?;
    service.accept_offer(offer.id).await?;

    let request = ShowRequest::new(artist_id, "Gouge Away", date());
    store.insert_request(&request).await?;
    let bid = VenueBid::new(request.id, Uuid::new_v4(), "venue x", date());
    service.place_bid(bid.clone()).await?;
    Ok((offer, bid))
}

#[tokio::test]
async fn switch_moves_the_acceptance_from_an_offer_to_a_bid() -> Result<()> {
    let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
    let service = service_over(store.clone());
    let (offer, bid) = accepted_offer_with_competing_bid(&store, &service).await?;

    service
        .switch_booking(ProposalRef::Bid(bid.id), ProposalRef::Offer(offer.id))
        .await?;

    let accepted = store.get_bid(bid.id).await?.unwrap();
    assert_eq!(accepted.status, BidStatus::Accepted);
    let superseded = store.get_offer(offer.id).await?.unwrap();
    assert_eq!(superseded.status, OfferStatus::Declined);
    assert_eq!(
        superseded.decline_reason.as_deref(),
        Some("superseded by competing booking")
    );

    // The show the offer materialized goes with it.
    assert!(store
        .find_show_by_venue_date(offer.venue_id, date())
        .await?
        .is_none());

    // Exactly one accepted entity for the date survives.
    let request = store.get_bid(bid.id).await?.unwrap().show_request_id;
    let artist_id = store.get_request(request).await?.unwrap().artist_id;
    let accepted_count = store
        .list_active_by_artist(artist_id)
        .await?
        .iter()
        .filter(|p| p.is_accepted())
        .count();
    assert_eq!(accepted_count, 1);
    Ok(())
}

#[tokio::test]
async fn failed_switch_restores_a_retracted_show() -> Result<()> {
    let failing = Arc::new(FailingStore::new());
    let store: Arc<dyn ProposalStore> = failing.clone();
    let service = service_over(store.clone());
    let (offer, bid) = accepted_offer_with_competing_bid(&store, &service).await?;

    failing.fail_bid_writes(true);
    let err = service
        .switch_booking(ProposalRef::Bid(bid.id), ProposalRef::Offer(offer.id))
        .await
        .unwrap_err();
    assert!(matches!(err, NegotiationError::Persistence(_)));

    // The offer is accepted again and its show is back.
    let restored = store.get_offer(offer.id).await?.unwrap();
    assert_eq!(restored.status, OfferStatus::Accepted);
    assert!(store
        .find_show_by_venue_date(offer.venue_id, date())
        .await?
        .is_some());
    let untouched = store.get_bid(bid.id).await?.unwrap();
    assert_eq!(untouched.status, BidStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn failed_switch_restores_the_previous_acceptance() -> Result<()> {
    let failing = Arc::new(FailingStore::new());
    let store: Arc<dyn ProposalStore> = failing.clone();
    let service = service_over(store.clone());
    let (bid, offer) = accepted_bid_with_competing_offer(&store, &service).await?;

    failing.fail_offer_writes(true);
    let err = service
        .switch_booking(ProposalRef::Offer(offer.id), ProposalRef::Bid(bid.id))
        .await
        .unwrap_err();
    assert!(matches!(err, NegotiationError::Persistence(_)));

    // The artist still has exactly one accepted booking for the date.
    let restored = store.get_bid(bid.id).await?.unwrap();
    assert_eq!(restored.status, BidStatus::Accepted);
    let untouched = store.get_offer(offer.id).await?.unwrap();
    assert_eq!(untouched.status, OfferStatus::Pending);
    Ok(())
}

use crate::domain::*;
use crate::error::{NegotiationError, Result};
use crate::lineup;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Persistence port for negotiation records. Implementations must
/// round-trip full entities; partial updates are not part of the contract.
/// `save_*` against an id that is no longer present surfaces
/// [`NegotiationError::Stale`] so callers can refetch rather than retry
/// blindly.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    // Show request operations
    async fn get_request(&self, id: Uuid) -> Result<Option<ShowRequest>>;
    async fn insert_request(&self, request: &ShowRequest) -> Result<()>;
    async fn save_request(&self, request: &ShowRequest) -> Result<()>;
    async fn find_request_for_offer(&self, offer_id: Uuid) -> Result<Option<ShowRequest>>;

    // Bid operations
    async fn get_bid(&self, id: Uuid) -> Result<Option<VenueBid>>;
    async fn insert_bid(&self, bid: &VenueBid) -> Result<()>;
    async fn save_bid(&self, bid: &VenueBid) -> Result<()>;
    async fn list_bids_by_request(&self, request_id: Uuid) -> Result<Vec<VenueBid>>;

    // Offer operations
    async fn get_offer(&self, id: Uuid) -> Result<Option<VenueOffer>>;
    async fn insert_offer(&self, offer: &VenueOffer) -> Result<()>;
    async fn save_offer(&self, offer: &VenueOffer) -> Result<()>;

    // Cross-entity queries used by conflict detection
    async fn list_active_by_artist(&self, artist_id: Uuid) -> Result<Vec<Proposal>>;
    async fn list_shows_by_artist(&self, artist_id: Uuid) -> Result<Vec<Show>>;

    // Show operations
    async fn get_show(&self, id: Uuid) -> Result<Option<Show>>;
    async fn insert_show(&self, show: &Show) -> Result<()>;
    async fn save_show(&self, show: &Show) -> Result<()>;
    async fn delete_show(&self, id: Uuid) -> Result<()>;
    async fn find_show_by_venue_date(
        &self,
        venue_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Show>>;
}

/// Show materialization port, invoked only from confirming transitions.
#[async_trait]
pub trait ShowFactory: Send + Sync {
    async fn create_show(&self, draft: ShowDraft) -> Result<Show>;
}

/// In-memory store implementation for development/testing.
pub struct InMemoryProposalStore {
    requests: Arc<Mutex<HashMap<Uuid, ShowRequest>>>,
    bids: Arc<Mutex<HashMap<Uuid, VenueBid>>>,
    offers: Arc<Mutex<HashMap<Uuid, VenueOffer>>>,
    shows: Arc<Mutex<HashMap<Uuid, Show>>>,
}

impl Default for InMemoryProposalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProposalStore {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            bids: Arc::new(Mutex::new(HashMap::new())),
            offers: Arc::new(Mutex::new(HashMap::new())),
            shows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProposalStore for InMemoryProposalStore {
    async fn get_request(&self, id: Uuid) -> Result<Option<ShowRequest>> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }

    async fn insert_request(&self, request: &ShowRequest) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        debug!("Inserted show request {}", request.id);
        Ok(())
    }

    async fn save_request(&self, request: &ShowRequest) -> Result<()> {
        let mut requests = self.requests.lock().unwrap();
        if !requests.contains_key(&request.id) {
            return Err(NegotiationError::Stale(request.id));
        }
        requests.insert(request.id, request.clone());
        debug!("Saved show request {}", request.id);
        Ok(())
    }

    async fn find_request_for_offer(&self, offer_id: Uuid) -> Result<Option<ShowRequest>> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .values()
            .find(|r| r.venue_offer_id == Some(offer_id))
            .cloned())
    }

    async fn get_bid(&self, id: Uuid) -> Result<Option<VenueBid>> {
        Ok(self.bids.lock().unwrap().get(&id).cloned())
    }

    async fn insert_bid(&self, bid: &VenueBid) -> Result<()> {
        self.bids.lock().unwrap().insert(bid.id, bid.clone());
        debug!("Inserted bid {} from {}", bid.id, bid.venue_name);
        Ok(())
    }

    async fn save_bid(&self, bid: &VenueBid) -> Result<()> {
        let mut bids = self.bids.lock().unwrap();
        if !bids.contains_key(&bid.id) {
            return Err(NegotiationError::Stale(bid.id));
        }
        bids.insert(bid.id, bid.clone());
        debug!("Saved bid {} ({})", bid.id, bid.state_label());
        Ok(())
    }

    async fn list_bids_by_request(&self, request_id: Uuid) -> Result<Vec<VenueBid>> {
        let bids = self.bids.lock().unwrap();
        let mut request_bids: Vec<VenueBid> = bids
            .values()
            .filter(|b| b.show_request_id == request_id)
            .cloned()
            .collect();
        request_bids.sort_by_key(|b| b.created_at);
        Ok(request_bids)
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<VenueOffer>> {
        Ok(self.offers.lock().unwrap().get(&id).cloned())
    }

    async fn insert_offer(&self, offer: &VenueOffer) -> Result<()> {
        self.offers.lock().unwrap().insert(offer.id, offer.clone());
        debug!("Inserted offer {} from {}", offer.id, offer.venue_name);
        Ok(())
    }

    async fn save_offer(&self, offer: &VenueOffer) -> Result<()> {
        let mut offers = self.offers.lock().unwrap();
        if !offers.contains_key(&offer.id) {
            return Err(NegotiationError::Stale(offer.id));
        }
        offers.insert(offer.id, offer.clone());
        debug!("Saved offer {} ({})", offer.id, offer.status);
        Ok(())
    }

    async fn list_active_by_artist(&self, artist_id: Uuid) -> Result<Vec<Proposal>> {
        let requests = self.requests.lock().unwrap();
        let artist_requests: Vec<Uuid> = requests
            .values()
            .filter(|r| r.artist_id == artist_id)
            .map(|r| r.id)
            .collect();
        drop(requests);

        let mut proposals = Vec::new();
        let bids = self.bids.lock().unwrap();
        proposals.extend(
            bids.values()
                .filter(|b| b.is_active() && artist_requests.contains(&b.show_request_id))
                .cloned()
                .map(Proposal::Bid),
        );
        drop(bids);

        let offers = self.offers.lock().unwrap();
        proposals.extend(
            offers
                .values()
                .filter(|o| o.is_active() && o.artist_id == artist_id)
                .cloned()
                .map(Proposal::Offer),
        );
        Ok(proposals)
    }

    async fn list_shows_by_artist(&self, artist_id: Uuid) -> Result<Vec<Show>> {
        let shows = self.shows.lock().unwrap();
        Ok(shows
            .values()
            .filter(|s| s.lineup.iter().any(|slot| slot.artist_id == artist_id))
            .cloned()
            .collect())
    }

    async fn get_show(&self, id: Uuid) -> Result<Option<Show>> {
        Ok(self.shows.lock().unwrap().get(&id).cloned())
    }

    async fn insert_show(&self, show: &Show) -> Result<()> {
        self.shows.lock().unwrap().insert(show.id, show.clone());
        debug!("Inserted show {} \"{}\"", show.id, show.title);
        Ok(())
    }

    async fn save_show(&self, show: &Show) -> Result<()> {
        let mut shows = self.shows.lock().unwrap();
        if !shows.contains_key(&show.id) {
            return Err(NegotiationError::Stale(show.id));
        }
        shows.insert(show.id, show.clone());
        debug!("Saved show {}", show.id);
        Ok(())
    }

    async fn delete_show(&self, id: Uuid) -> Result<()> {
        self.shows.lock().unwrap().remove(&id);
        debug!("Deleted show {}", id);
        Ok(())
    }

    async fn find_show_by_venue_date(
        &self,
        venue_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Show>> {
        let shows = self.shows.lock().unwrap();
        Ok(shows
            .values()
            .find(|s| s.venue_id == venue_id && s.date == date)
            .cloned())
    }
}

/// Default show factory: persists through the proposal store and merges
/// into an existing show when another act already confirmed the same
/// venue and date.
pub struct StoreShowFactory {
    store: Arc<dyn ProposalStore>,
}

impl StoreShowFactory {
    pub fn new(store: Arc<dyn ProposalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ShowFactory for StoreShowFactory {
    async fn create_show(&self, draft: ShowDraft) -> Result<Show> {
        if let Some(mut existing) = self
            .store
            .find_show_by_venue_date(draft.venue_id, draft.date)
            .await?
        {
            let mut slots = existing.lineup.clone();
            for slot in draft.lineup {
                if !slots.iter().any(|s| s.artist_id == slot.artist_id) {
                    slots.push(slot);
                }
            }
            existing.lineup = lineup::assign(slots);
            existing.title = lineup::title(&existing.lineup);
            self.store.save_show(&existing).await?;
            debug!("Merged act into show {} \"{}\"", existing.id, existing.title);
            return Ok(existing);
        }

        let ordered = lineup::assign(draft.lineup);
        let show = Show {
            id: Uuid::new_v4(),
            venue_id: draft.venue_id,
            venue_name: draft.venue_name,
            date: draft.date,
            title: lineup::title(&ordered),
            lineup: ordered,
            source: draft.source,
            created_at: chrono::Utc::now(),
        };
        self.store.insert_show(&show).await?;
        Ok(show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    #[tokio::test]
    async fn save_of_missing_bid_is_stale() {
        let store = InMemoryProposalStore::new();
        let bid = VenueBid::new(Uuid::new_v4(), Uuid::new_v4(), "venue", date());
        let err = store.save_bid(&bid).await.unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn active_proposals_cover_bids_and_offers() {
        let store = InMemoryProposalStore::new();
        let artist_id = Uuid::new_v4();
        let request = ShowRequest::new(artist_id, "Gag", date());
        store.insert_request(&request).await.unwrap();

        let bid = VenueBid::new(request.id, Uuid::new_v4(), "venue x", date());
        store.insert_bid(&bid).await.unwrap();

        let offer = VenueOffer::new(artist_id, "Gag", Uuid::new_v4(), "venue y", date());
        store.insert_offer(&offer).await.unwrap();

        let mut declined = VenueOffer::new(artist_id, "Gag", Uuid::new_v4(), "venue z", date());
        declined.status = OfferStatus::Declined;
        store.insert_offer(&declined).await.unwrap();

        let active = store.list_active_by_artist(artist_id).await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn factory_merges_acts_sharing_venue_and_date() {
        let store = Arc::new(InMemoryProposalStore::new());
        let factory = StoreShowFactory::new(store.clone());
        let venue_id = Uuid::new_v4();

        let headliner = LineupSlot {
            artist_id: Uuid::new_v4(),
            artist_name: "Wand".to_string(),
            billing_position: Some(BillingPosition::Headliner),
            performance_order: None,
            status: SlotStatus::Confirmed,
        };
        let support = LineupSlot {
            artist_id: Uuid::new_v4(),
            artist_name: "Chastity".to_string(),
            billing_position: Some(BillingPosition::Support),
            performance_order: None,
            status: SlotStatus::Confirmed,
        };

        let first = factory
            .create_show(ShowDraft {
                venue_id,
                venue_name: "Neumos".to_string(),
                date: date(),
                lineup: vec![headliner],
                source: ShowSource::FromBid(Uuid::new_v4()),
            })
            .await
            .unwrap();
        assert_eq!(first.title, "Wand");

        let merged = factory
            .create_show(ShowDraft {
                venue_id,
                venue_name: "Neumos".to_string(),
                date: date(),
                lineup: vec![support],
                source: ShowSource::FromBid(Uuid::new_v4()),
            })
            .await
            .unwrap();
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.lineup.len(), 2);
        assert_eq!(merged.title, "Wand & Chastity");
        assert_eq!(merged.lineup[0].performance_order, Some(1));
    }
}

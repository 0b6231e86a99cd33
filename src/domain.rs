use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who opened a show request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initiator {
    Artist,
    Venue,
}

/// Actor tag recorded on declines/cancellations for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Artist,
    Venue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Closed,
    Cancelled,
}

/// Lifecycle status of a venue bid. Declined and Cancelled are terminal;
/// bids are never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    Pending,
    Hold,
    Accepted,
    Declined,
    Cancelled,
}

impl BidStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BidStatus::Declined | BidStatus::Cancelled)
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BidStatus::Pending => "pending",
            BidStatus::Hold => "hold",
            BidStatus::Accepted => "accepted",
            BidStatus::Declined => "declined",
            BidStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Hold lifecycle of a bid, orthogonal to its status. At most one bid per
/// show request may be Held or AcceptedHeld at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldState {
    Available,
    Frozen,
    Held,
    AcceptedHeld,
}

impl fmt::Display for HoldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HoldState::Available => "available",
            HoldState::Frozen => "frozen",
            HoldState::Held => "held",
            HoldState::AcceptedHeld => "accepted-held",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl OfferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Declined | OfferStatus::Cancelled)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// An act's role in a lineup. Billing priority runs headliner first,
/// local support last; a missing position sorts between co-headliner
/// and support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingPosition {
    Headliner,
    CoHeadliner,
    Support,
    LocalSupport,
}

/// An artist's open invitation for a date, or a synthetic wrapper around a
/// venue-initiated direct offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowRequest {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub artist_name: String,
    pub requested_date: NaiveDate,
    pub range_end: Option<NaiveDate>,
    pub initiator: Initiator,
    pub status: RequestStatus,
    /// Set only on synthetic wrappers created for a direct offer.
    pub venue_offer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ShowRequest {
    pub fn new(artist_id: Uuid, artist_name: &str, requested_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            artist_id,
            artist_name: artist_name.to_string(),
            requested_date,
            range_end: None,
            initiator: Initiator::Artist,
            status: RequestStatus::Open,
            venue_offer_id: None,
            created_at: Utc::now(),
        }
    }

    /// Wrapper request materialized so a direct offer shows up alongside
    /// open-request bids in the artist's itinerary.
    pub fn synthetic_for_offer(offer: &VenueOffer) -> Self {
        Self {
            id: Uuid::new_v4(),
            artist_id: offer.artist_id,
            artist_name: offer.artist_name.clone(),
            requested_date: offer.proposed_date,
            range_end: None,
            initiator: Initiator::Venue,
            status: RequestStatus::Open,
            venue_offer_id: Some(offer.id),
            created_at: Utc::now(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.venue_offer_id.is_some()
    }
}

/// A venue's response to an open show request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueBid {
    pub id: Uuid,
    pub show_request_id: Uuid,
    pub venue_id: Uuid,
    pub venue_name: String,
    pub proposed_date: NaiveDate,
    pub guarantee_cents: Option<u64>,
    pub door_split: Option<String>,
    pub billing_position: Option<BillingPosition>,
    pub status: BidStatus,
    pub hold_state: HoldState,
    /// Back-reference to the bid whose hold froze this one.
    pub frozen_by_hold_id: Option<Uuid>,
    pub hold_placed_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VenueBid {
    pub fn new(
        show_request_id: Uuid,
        venue_id: Uuid,
        venue_name: &str,
        proposed_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            show_request_id,
            venue_id,
            venue_name: venue_name.to_string(),
            proposed_date,
            guarantee_cents: None,
            door_split: None,
            billing_position: None,
            status: BidStatus::Pending,
            hold_state: HoldState::Available,
            frozen_by_hold_id: None,
            hold_placed_at: None,
            confirmed_at: None,
            decline_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Non-terminal bids still participate in freezes and conflicts.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether this bid currently carries the hold for its request.
    pub fn holds_priority(&self) -> bool {
        matches!(self.hold_state, HoldState::Held | HoldState::AcceptedHeld)
    }

    pub fn is_accepted(&self) -> bool {
        self.status == BidStatus::Accepted
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    /// Human-readable status + hold state, used in validation errors.
    pub fn state_label(&self) -> String {
        format!("{}/{}", self.status, self.hold_state)
    }
}

/// A venue's direct proposal to an artist, outside the open-request flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueOffer {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub artist_name: String,
    pub venue_id: Uuid,
    pub venue_name: String,
    pub proposed_date: NaiveDate,
    pub guarantee_cents: Option<u64>,
    pub door_split: Option<String>,
    pub billing_position: Option<BillingPosition>,
    pub status: OfferStatus,
    pub decline_reason: Option<String>,
    pub declined_by: Option<Actor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VenueOffer {
    pub fn new(
        artist_id: Uuid,
        artist_name: &str,
        venue_id: Uuid,
        venue_name: &str,
        proposed_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            artist_id,
            artist_name: artist_name.to_string(),
            venue_id,
            venue_name: venue_name.to_string(),
            proposed_date,
            guarantee_cents: None,
            door_split: None,
            billing_position: None,
            status: OfferStatus::Pending,
            decline_reason: None,
            declined_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OfferStatus::Accepted
    }
}

/// Closed union over the two proposal kinds. Every transition matches on
/// this exhaustively; there is no field-sniffing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Proposal {
    Bid(VenueBid),
    Offer(VenueOffer),
}

impl Proposal {
    pub fn id(&self) -> Uuid {
        match self {
            Proposal::Bid(b) => b.id,
            Proposal::Offer(o) => o.id,
        }
    }

    pub fn proposed_date(&self) -> NaiveDate {
        match self {
            Proposal::Bid(b) => b.proposed_date,
            Proposal::Offer(o) => o.proposed_date,
        }
    }

    pub fn venue_name(&self) -> &str {
        match self {
            Proposal::Bid(b) => &b.venue_name,
            Proposal::Offer(o) => &o.venue_name,
        }
    }

    /// Accepted in the date-exclusivity sense: a plain accept or a
    /// held-then-accepted bid both count.
    pub fn is_accepted(&self) -> bool {
        match self {
            Proposal::Bid(b) => b.is_accepted(),
            Proposal::Offer(o) => o.is_accepted(),
        }
    }
}

/// Confirmation status of a lineup slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Confirmed,
    Pending,
}

/// One act on a show's bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupSlot {
    pub artist_id: Uuid,
    pub artist_name: String,
    pub billing_position: Option<BillingPosition>,
    pub performance_order: Option<u32>,
    pub status: SlotStatus,
}

/// Where a confirmed show came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowSource {
    FromBid(Uuid),
    FromOffer(Uuid),
}

/// The confirmed, materialized booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub venue_name: String,
    pub date: NaiveDate,
    pub title: String,
    pub lineup: Vec<LineupSlot>,
    pub source: ShowSource,
    pub created_at: DateTime<Utc>,
}

/// Payload handed to the show factory by a finalizing accept/confirm.
#[derive(Debug, Clone)]
pub struct ShowDraft {
    pub venue_id: Uuid,
    pub venue_name: String,
    pub date: NaiveDate,
    pub lineup: Vec<LineupSlot>,
    pub source: ShowSource,
}

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use gigbook::config::Config;
use gigbook::domain::{BillingPosition, ShowRequest, VenueBid, VenueOffer};
use gigbook::logging::init_logging;
use gigbook::service::{NegotiationEvent, NegotiationService, ProposalRef};
use gigbook::store::{InMemoryProposalStore, ProposalStore, StoreShowFactory};

#[derive(Parser)]
#[command(name = "gigbook")]
#[command(about = "Artist/venue booking negotiation engine")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hold -> accept -> confirm walkthrough against the in-memory store
    Demo,
    /// Run the conflict-detection and booking-switch walkthrough
    Switch,
}

fn print_events(events: &[NegotiationEvent]) {
    for event in events {
        println!("   - {:?}", event);
    }
}

async fn run_demo() -> Result<()> {
    let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
    let shows = Arc::new(StoreShowFactory::new(store.clone()));
    let service = NegotiationService::new(store.clone(), shows, Config::load()?);

    let date = NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date");
    let artist_id = Uuid::new_v4();
    let request = ShowRequest::new(artist_id, "Gouge Away", date);
    store.insert_request(&request).await?;
    info!("Show request opened for {}", date);

    let mut bid1 = VenueBid::new(request.id, Uuid::new_v4(), "The Vera Project", date);
    bid1.guarantee_cents = Some(50_000);
    bid1.billing_position = Some(BillingPosition::Headliner);
    let bid2 = VenueBid::new(request.id, Uuid::new_v4(), "Black Lodge", date);

    service.place_bid(bid1.clone()).await?;
    service.place_bid(bid2.clone()).await?;

    println!("\n🎛  Hold on {}:", bid1.venue_name);
    print_events(&service.hold_bid(bid1.id).await?);

    println!("\n✅ Accept held bid:");
    print_events(&service.accept_bid(bid1.id).await?);

    println!("\n🎟  Confirm:");
    print_events(&service.confirm_bid(bid1.id).await?);

    let confirmed = store.get_bid(bid1.id).await?.expect("bid still present");
    let competing = store.get_bid(bid2.id).await?.expect("bid still present");
    println!("\n📊 Final state:");
    println!("   {}: {}", confirmed.venue_name, confirmed.state_label());
    println!("   {}: {}", competing.venue_name, competing.state_label());
    if let Some(show) = store.find_show_by_venue_date(bid1.venue_id, date).await? {
        println!("   Show: \"{}\" on {}", show.title, show.date);
    }
    Ok(())
}

async fn run_switch() -> Result<()> {
    let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
    let shows = Arc::new(StoreShowFactory::new(store.clone()));
    let service = NegotiationService::new(store.clone(), shows, Config::load()?);

    let date = NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date");
    let artist_id = Uuid::new_v4();
    let request = ShowRequest::new(artist_id, "Gouge Away", date);
    store.insert_request(&request).await?;

    let bid = VenueBid::new(request.id, Uuid::new_v4(), "The Vera Project", date);
    service.place_bid(bid.clone()).await?;
    service.accept_bid(bid.id).await?;
    println!("✅ Accepted bid from {}", bid.venue_name);

    let offer = VenueOffer::new(artist_id, "Gouge Away", Uuid::new_v4(), "Neumos", date);
    service.submit_offer(offer.clone()).await?;

    match service.accept_offer(offer.id).await {
        Err(e) => println!("⚠️  Accepting the offer directly fails: {}", e),
        Ok(_) => unreachable!("conflict detection should block the accept"),
    }

    println!("\n🔀 Switching the booking to the offer:");
    let events = service
        .switch_booking(ProposalRef::Offer(offer.id), ProposalRef::Bid(bid.id))
        .await?;
    print_events(&events);

    let reverted = store.get_bid(bid.id).await?.expect("bid still present");
    let accepted = store.get_offer(offer.id).await?.expect("offer still present");
    println!("\n📊 Final state:");
    println!("   bid {}: {}", reverted.venue_name, reverted.status);
    println!("   offer {}: {}", accepted.venue_name, accepted.status);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => run_demo().await,
        Commands::Switch => run_switch().await,
    }
}

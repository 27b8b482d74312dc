use roomfeed::{
    AppError, InMemoryDocumentStore, RoomServices, RoomSession, RoomView, SessionRole,
    StoreConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomfeed=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting room feedback demo");

    if let Err(e) = run().await {
        error!(error = %e, "Demo failed");
        std::process::exit(1);
    }
}

/// Walks one room through its life: an organizer opens it, two participants
/// rate it, everyone leaves
async fn run() -> Result<(), AppError> {
    let store = Arc::new(InMemoryDocumentStore::with_config(StoreConfig::new()));
    let services = RoomServices::new(store);

    let created = services.rooms.create_room().await?;
    let organizer = RoomSession::enter(&services, created.room_id.as_str(), created.role).await?;
    info!(room_id = %organizer.room_id(), "Share this code with participants");

    let ratings = [(5, "Clear and well paced"), (4, "Good, a bit long")];
    let mut participants = Vec::new();
    for (rating, comment) in ratings {
        let participant =
            RoomSession::enter(&services, created.room_id.as_str(), SessionRole::Participant)
                .await?;
        participant.submit(rating, comment).await?;
        participants.push(participant);
    }

    report(&organizer, "after feedback", |view| {
        view.feedback.len() == ratings.len() && view.participant_count() == 2
    })
    .await;

    if let Some(first) = participants.first() {
        first.leave().await;
        report(&organizer, "after explicit leave", |view| view.participant_count() == 1).await;
    }
    if let Some(second) = participants.get(1) {
        second.disconnect_signal().fire();
        report(&organizer, "after disconnect", |view| view.participant_count() == 0).await;
    }

    match serde_json::to_string_pretty(&organizer.current_view()) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "Failed to render room view"),
    }

    organizer.leave().await;
    info!("Demo finished");
    Ok(())
}

/// Waits for the organizer's view to settle, then logs it
async fn report(organizer: &RoomSession, step: &str, settled: impl FnMut(&RoomView) -> bool) {
    let mut view = organizer.view();
    let reached = tokio::time::timeout(Duration::from_secs(1), view.wait_for(settled))
        .await
        .is_ok_and(|changed| changed.is_ok());
    if !reached {
        warn!(step = step, "Room view did not settle in time");
    }

    let snapshot = organizer.current_view();
    info!(
        step = step,
        participants = snapshot.participant_count(),
        feedback = snapshot.feedback.len(),
        average = ?snapshot.stats.average_rounded(),
        suggestion = %snapshot.stats.suggestion,
        "Room view"
    );
}

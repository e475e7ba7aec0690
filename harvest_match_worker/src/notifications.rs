use std::{future::Future, pin::Pin};

use harvest_match_engine::events::{EventHooks, MatchEvent};
use log::*;

/// Registers the worker's notification hook. Each match event is rendered as a JSON notification and written to the
/// `harvest_match::notifications` log target, where a log shipper can forward it to consumers.
pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_request_reserved(|ev| Box::pin(notify(ev)) as Pin<Box<dyn Future<Output = ()> + Send>>);
    hooks
}

async fn notify(event: MatchEvent) {
    let notification = event.notification();
    match serde_json::to_string(&notification) {
        Ok(json) => info!(target: "harvest_match::notifications", "{json}"),
        Err(e) => error!("📬️ Could not serialize the notification for {}. {e}", notification.request_id),
    }
}

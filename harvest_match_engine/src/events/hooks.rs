use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, MatchEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub request_reserved_producer: Vec<EventProducer<MatchEvent>>,
}

impl EventProducers {
    pub fn is_empty(&self) -> bool {
        self.request_reserved_producer.is_empty()
    }

    /// Sends the events to every `on_request_reserved` subscriber. Delivery problems are logged, not returned.
    pub async fn publish_match_events(&self, events: Vec<MatchEvent>) {
        for producer in &self.request_reserved_producer {
            for event in &events {
                trace!("📬️ Publishing match event for {}", event.request.id);
                producer.publish_event(event.clone()).await;
            }
        }
    }
}

pub struct EventHandlers {
    pub on_request_reserved: Option<EventHandler<MatchEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_request_reserved = hooks.on_request_reserved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_request_reserved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_request_reserved {
            result.request_reserved_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_request_reserved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }

    /// Runs the handlers on the current task. Returns once every producer has been dropped and queued events have been
    /// handled.
    pub async fn run_handlers(self) {
        if let Some(handler) = self.on_request_reserved {
            handler.start_handler().await;
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_request_reserved: Option<Handler<MatchEvent>>,
}

impl EventHooks {
    pub fn on_request_reserved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MatchEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_request_reserved = Some(Arc::new(f));
        self
    }
}

//! Core worker utilities

use crate::events::Event;
use log::debug;
use tokio::sync::mpsc;

/// Common event sending utilities for workers
#[derive(Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Send a generic event. Events nobody would display are dropped here.
    pub async fn send_event(&self, event: Event) {
        if !event.should_display() {
            debug!("Suppressed event: {}", event);
            return;
        }
        let _ = self.sender.send(event).await;
    }

    pub async fn send_session_event(&self, message: String) {
        self.send_event(Event::session(message)).await;
    }
}

//! services/api/src/adapters/events.rs
//!
//! Fan-out of sign-in / sign-out transitions to any number of subscribers.

use study_tracker_core::{AccountEvent, AccountEventStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

const EVENT_BUFFER: usize = 64;

#[derive(Clone)]
pub struct AccountEvents {
    sender: broadcast::Sender<AccountEvent>,
}

impl Default for AccountEvents {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }
}

impl AccountEvents {
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: AccountEvent) {
        let _ = self.sender.send(event);
    }

    pub fn stream(&self) -> AccountEventStream {
        let mut receiver = self.sender.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Account event subscriber lagged, {} events dropped", missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

use crate::error::StepOutcome;
use crate::progress::SyncStep;
use showsync_models::EntityFamily;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::Receiver;

const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Notifications the sync engine publishes for anything that displays or
/// indexes local data.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    StepStarted(SyncStep),
    /// Rows of this family changed, dependent views should reload.
    ContentChanged(EntityFamily),
    SearchIndexInvalidated,
    Finished(StepOutcome),
}

#[derive(Debug, Clone)]
pub struct SyncEvents {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn emit(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for SyncEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = SyncEvents::default();
        let mut rx = events.subscribe();
        events.emit(SyncEvent::ContentChanged(EntityFamily::Movies));
        events.emit(SyncEvent::SearchIndexInvalidated);

        assert_eq!(rx.recv().await.unwrap(), SyncEvent::ContentChanged(EntityFamily::Movies));
        assert_eq!(rx.recv().await.unwrap(), SyncEvent::SearchIndexInvalidated);
    }

    #[test]
    fn test_emit_without_subscribers() {
        SyncEvents::new(4).emit(SyncEvent::SearchIndexInvalidated);
    }
}

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigEvent {
    /// Whole file reloaded; subscribers should treat every section as dirty.
    Reloaded,
}

/// Fan-out of config change events to any number of subscribers.
#[derive(Default)]
pub struct ConfigNotifier {
    subscribers: Mutex<Vec<Sender<ConfigEvent>>>,
}

impl ConfigNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ConfigEvent> {
        let (tx, rx) = unbounded();
        let mut subs = match self.subscribers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        subs.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber; dropped receivers are pruned.
    /// Returns how many subscribers received it.
    pub fn notify(&self, event: ConfigEvent) -> usize {
        let mut subs = match self.subscribers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        subs.retain(|tx| tx.send(event).is_ok());
        log::debug!(
            "config event {:?} delivered to {} subscriber(s)",
            event,
            subs.len()
        );
        subs.len()
    }
}

//! Channels the console wants to hear from.
//!
//! The set outlives connections: it is replayed after every successful
//! authentication.

/// Insertion-ordered set of channel names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    channels: Vec<String>,
}

impl SubscriptionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel. Returns `false` if it was already present.
    pub fn insert(&mut self, channel: &str) -> bool {
        if self.contains(channel) {
            return false;
        }
        self.channels.push(channel.to_string());
        true
    }

    /// Removes a channel. Returns `false` if it was not present.
    pub fn remove(&mut self, channel: &str) -> bool {
        let before = self.channels.len();
        self.channels.retain(|c| c != channel);
        self.channels.len() < before
    }

    /// Whether `channel` is present.
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    /// Channels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

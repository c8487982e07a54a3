use crate::models::{
    ActionType, Engagement, EngagementSubscriptionEvent, Mention, MentionSubscriptionEvent,
};
use futures::stream::{self, Stream};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};

pub fn mention_channel(user_id: &str) -> String {
    format!("USER_MENTION_UPDATES_{}", user_id)
}

pub fn engagement_channel(org_id: &str) -> String {
    format!("ORG_ENGAGEMENT_UPDATES_{}", org_id)
}

/// Named broadcast channels. A channel exists only while it has subscribers.
struct Channels<E> {
    capacity: usize,
    senders: Mutex<HashMap<String, broadcast::Sender<E>>>,
}

impl<E: Clone + Send + 'static> Channels<E> {
    fn new(capacity: usize) -> Self {
        Channels { capacity: capacity.max(1), senders: Mutex::new(HashMap::new()) }
    }

    fn publish(&self, key: &str, event: E) -> usize {
        let senders = match self.senders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match senders.get(key) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    fn subscribe(self: &Arc<Self>, key: String) -> impl Stream<Item = E> + Send + 'static {
        let receiver = {
            let mut senders = match self.senders.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            senders
                .entry(key.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        let subscription = Subscription {
            receiver: Some(receiver),
            channels: Arc::clone(self),
            key,
        };

        stream::unfold(subscription, |mut subscription| async move {
            loop {
                let receiver = subscription.receiver.as_mut()?;
                match receiver.recv().await {
                    Ok(event) => return Some((event, subscription)),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!(
                            "⚠️  Subscriber on {} lagged, skipped {} events",
                            subscription.key,
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    fn prune(&self, key: &str) {
        let mut senders = match self.senders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if senders.get(key).map_or(false, |s| s.receiver_count() == 0) {
            senders.remove(key);
            log::debug!("Channel {} closed, no subscribers left", key);
        }
    }

    fn subscriber_count(&self, key: &str) -> usize {
        self.senders
            .lock()
            .map(|s| s.get(key).map_or(0, |sender| sender.receiver_count()))
            .unwrap_or(0)
    }
}

struct Subscription<E: Clone + Send + 'static> {
    receiver: Option<broadcast::Receiver<E>>,
    channels: Arc<Channels<E>>,
    key: String,
}

impl<E: Clone + Send + 'static> Drop for Subscription<E> {
    fn drop(&mut self) {
        // release the receiver before checking whether anyone is left
        drop(self.receiver.take());
        self.channels.prune(&self.key);
    }
}

/// Subscription fan-out for mention and engagement updates.
///
/// Each channel buffers `capacity` events. A subscriber that falls further
/// behind loses the oldest events and resumes from the newest one.
#[derive(Clone)]
pub struct Publisher {
    mentions: Arc<Channels<MentionSubscriptionEvent>>,
    engagements: Arc<Channels<EngagementSubscriptionEvent>>,
}

impl Publisher {
    pub fn new(capacity: usize) -> Self {
        Publisher {
            mentions: Arc::new(Channels::new(capacity)),
            engagements: Arc::new(Channels::new(capacity)),
        }
    }

    /// Returns the number of subscribers reached.
    pub fn publish_mention(
        &self,
        user_id: &str,
        action: ActionType,
        message: String,
        mention: Option<Mention>,
    ) -> usize {
        let event = MentionSubscriptionEvent { action, message, mention };
        self.mentions.publish(&mention_channel(user_id), event)
    }

    pub fn publish_engagement(
        &self,
        org_id: &str,
        action: ActionType,
        message: String,
        engagement: Option<Engagement>,
    ) -> usize {
        let event = EngagementSubscriptionEvent { action, message, engagement };
        self.engagements.publish(&engagement_channel(org_id), event)
    }

    pub fn subscribe_to_mentions(
        &self,
        user_id: &str,
    ) -> impl Stream<Item = MentionSubscriptionEvent> + Send + 'static {
        self.mentions.subscribe(mention_channel(user_id))
    }

    pub fn subscribe_to_engagements(
        &self,
        org_id: &str,
    ) -> impl Stream<Item = EngagementSubscriptionEvent> + Send + 'static {
        self.engagements.subscribe(engagement_channel(org_id))
    }

    pub fn engagement_subscribers(&self, org_id: &str) -> usize {
        self.engagements.subscriber_count(&engagement_channel(org_id))
    }

    pub fn mention_subscribers(&self, user_id: &str) -> usize {
        self.mentions.subscriber_count(&mention_channel(user_id))
    }
}

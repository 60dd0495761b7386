use log::{debug, warn};
use tokio::sync::mpsc;

use crate::notifications::notifications_model::NotificationEvent;
use crate::notifications::notifications_traits::NotifierTrait;

/// Pushes events into an explicit outbound channel consumed by the
/// notification dispatcher. The engine never waits on the consumer.
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelNotifier {
    /// Creates the notifier together with the receiving end the dispatcher
    /// should drain
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelNotifier { sender }, receiver)
    }
}

impl NotifierTrait for ChannelNotifier {
    fn emit(&self, event: NotificationEvent) {
        let name = event.name.clone();
        if self.sender.send(event).is_err() {
            warn!(
                "Notification channel closed; dropping event {}",
                name
            );
        }
    }
}

/// Log-only notifier for embedders that run without a dispatcher
pub struct LogNotifier;

impl NotifierTrait for LogNotifier {
    fn emit(&self, event: NotificationEvent) {
        debug!(
            "Notification {} for {:?}: {}",
            event.name, event.recipient_user_ids, event.payload
        );
    }
}

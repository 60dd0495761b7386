use crate::notifications::notifications_model::NotificationEvent;

/// Trait for the outbound notification surface. Emitting is fire-and-forget:
/// implementations swallow and log their own failures, so a broken consumer
/// can never roll back an aggregate mutation.
pub trait NotifierTrait: Send + Sync {
    fn emit(&self, event: NotificationEvent);
}

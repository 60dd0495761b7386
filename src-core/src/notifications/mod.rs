// Module declarations
pub(crate) mod notifications_model;
pub(crate) mod notifications_service;
pub(crate) mod notifications_traits;

// Re-export the public interface
pub use notifications_model::{NotificationEvent, NotificationPriority};
pub use notifications_service::{ChannelNotifier, LogNotifier};
pub use notifications_traits::NotifierTrait;

use serde::{Deserialize, Serialize};

/// Delivery priority hint for the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

/// An event handed to the notification dispatcher. The dispatcher decides
/// email vs. push vs. both; the engine only fires and forgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub name: String,
    pub recipient_user_ids: Vec<String>,
    pub payload: serde_json::Value,
    pub priority: NotificationPriority,
}

impl NotificationEvent {
    pub fn new(
        name: &str,
        recipient_user_id: &str,
        payload: serde_json::Value,
        priority: NotificationPriority,
    ) -> Self {
        NotificationEvent {
            name: name.to_string(),
            recipient_user_ids: vec![recipient_user_id.to_string()],
            payload,
            priority,
        }
    }
}

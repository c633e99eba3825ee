// Notification kind value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Updated,
    Opened,
    Closed,
    Invited,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Updated => "updated",
            NotificationKind::Opened => "opened",
            NotificationKind::Closed => "closed",
            NotificationKind::Invited => "invited",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "updated" => Some(NotificationKind::Updated),
            "opened" => Some(NotificationKind::Opened),
            "closed" => Some(NotificationKind::Closed),
            "invited" => Some(NotificationKind::Invited),
            _ => None,
        }
    }
}

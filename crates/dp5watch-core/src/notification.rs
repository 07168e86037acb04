//! Notification taxonomy and event records.
//!
//! The device service pushes many kinds of textual frames over the event
//! channel. Only payloads whose `notificationType` is one of the kinds in
//! [`NotificationType`] are treated as domain events; everything else is
//! protocol chatter.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON field carrying the event discriminator.
pub const DISCRIMINATOR_FIELD: &str = "notificationType";

/// Known event kinds emitted by the device service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// A legacy (pre-linear) device event.
    DeviceLegacy,
    /// A scanning device was connected.
    DeviceConnected,
    /// A scanning device was disconnected.
    DeviceDisconnected,
    /// A linear barcode reader was connected.
    LinearConnected,
    /// A linear barcode reader was disconnected.
    LinearDisconnected,
    /// The linear reader decoded a new barcode.
    LinearNewBarcode,
    /// A linear reader was plugged in.
    LinearPluggedIn,
    /// A linear reader was unplugged.
    LinearUnplugged,
    /// Progress milestone of a running scan.
    ScanMilestone,
    /// Activator (trigger) event.
    ActivatorEvent,
}

impl NotificationType {
    /// Every accepted notification kind, in wire order.
    pub const ALL: [NotificationType; 10] = [
        Self::DeviceLegacy,
        Self::DeviceConnected,
        Self::DeviceDisconnected,
        Self::LinearConnected,
        Self::LinearDisconnected,
        Self::LinearNewBarcode,
        Self::LinearPluggedIn,
        Self::LinearUnplugged,
        Self::ScanMilestone,
        Self::ActivatorEvent,
    ];

    /// Returns the discriminator string as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceLegacy => "DEVICE_LEGACY",
            Self::DeviceConnected => "DEVICE_CONNECTED",
            Self::DeviceDisconnected => "DEVICE_DISCONNECTED",
            Self::LinearConnected => "LINEAR_CONNECTED",
            Self::LinearDisconnected => "LINEAR_DISCONNECTED",
            Self::LinearNewBarcode => "LINEAR_NEW_BARCODE",
            Self::LinearPluggedIn => "LINEAR_PLUGGED_IN",
            Self::LinearUnplugged => "LINEAR_UNPLUGGED",
            Self::ScanMilestone => "SCAN_MILESTONE",
            Self::ActivatorEvent => "ACTIVATOR_EVENT",
        }
    }

    /// Returns true for the device lifecycle kinds.
    pub fn is_device(self) -> bool {
        matches!(
            self,
            Self::DeviceLegacy | Self::DeviceConnected | Self::DeviceDisconnected
        )
    }

    /// Returns true for the linear reader kinds.
    pub fn is_linear(self) -> bool {
        matches!(
            self,
            Self::LinearConnected
                | Self::LinearDisconnected
                | Self::LinearNewBarcode
                | Self::LinearPluggedIn
                | Self::LinearUnplugged
        )
    }
}

impl NotificationType {
    /// Coarse grouping used in log fields: `device`, `linear` or `scan`.
    pub fn category(self) -> &'static str {
        if self.is_device() {
            "device"
        } else if self.is_linear() {
            "linear"
        } else {
            "scan"
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a discriminator is not on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    /// Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownNotificationType(s.to_string()))
    }
}

/// A recognized event extracted from the notification stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// The allow-listed discriminator.
    pub notification_type: NotificationType,
    /// The full parsed JSON object, unchanged.
    pub payload: serde_json::Value,
    /// The complete reassembled message text the payload was found in.
    #[serde(skip)]
    pub raw: String,
    /// When the message was extracted.
    pub received_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        notification_type: NotificationType,
        payload: serde_json::Value,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            payload,
            raw: raw.into(),
            received_at: Utc::now(),
        }
    }

    /// Returns the discriminator string.
    pub fn notification_type_str(&self) -> &'static str {
        self.notification_type.as_str()
    }

    /// Returns a field from the payload, if present.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload.get(name)
    }
}

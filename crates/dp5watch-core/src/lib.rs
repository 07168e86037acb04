//! Core types: notification taxonomy, event records, tracing setup

pub mod notification;
pub mod tracing;

pub use notification::{DISCRIMINATOR_FIELD, EventRecord, NotificationType, UnknownNotificationType};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

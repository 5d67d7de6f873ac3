//! `flock-notifications` — notification content and timing decisions.
//!
//! This crate owns *what* gets notified and *when*, never delivery: the
//! dispatch façade persists notification records and hands them to an
//! external channel (push/e-mail/WhatsApp) that is not part of this core.

pub mod notification;
pub mod reminder;

pub use notification::{
    Notification, NotificationDispatch, NotificationError, NotificationId, NotificationType,
};
pub use reminder::{ReminderScheduler, reminder_times};

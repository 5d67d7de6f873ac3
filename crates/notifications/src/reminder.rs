//! Reminder computation for upcoming roster occurrences.
//!
//! Two fixed offsets: 24 hours and 1 hour before the occurrence. Only fire
//! times strictly in the future at scheduling time produce a record; an
//! occurrence 30 minutes away gets no reminders at all.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use flock_core::{MemberId, TenantId};

use crate::notification::{NotificationDispatch, NotificationType};

/// Candidate reminder fire times for an occurrence at `occurs_at`.
pub fn reminder_times(occurs_at: DateTime<Utc>) -> [(NotificationType, DateTime<Utc>); 2] {
    [
        (NotificationType::Reminder24h, occurs_at - Duration::hours(24)),
        (NotificationType::Reminder1h, occurs_at - Duration::hours(1)),
    ]
}

/// Computes reminder fire times and records them through the dispatch façade.
///
/// Recording is best-effort: a failed write is logged and skipped, never
/// surfaced to the caller — reminders must not block roster creation.
#[derive(Debug)]
pub struct ReminderScheduler<D> {
    dispatch: D,
}

impl<D> ReminderScheduler<D>
where
    D: NotificationDispatch,
{
    pub fn new(dispatch: D) -> Self {
        Self { dispatch }
    }

    /// Schedule reminders for every recipient of a roster occurring at
    /// `occurs_at`, evaluated against `now`. Returns how many records were
    /// written.
    pub fn schedule_roster_reminders(
        &self,
        tenant_id: TenantId,
        recipients: &[MemberId],
        occurs_at: DateTime<Utc>,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> usize {
        let mut scheduled = 0;

        for (notification_type, fire_at) in reminder_times(occurs_at) {
            if fire_at <= now {
                continue;
            }
            for recipient in recipients {
                match self.dispatch.schedule_notification(
                    tenant_id,
                    *recipient,
                    notification_type,
                    fire_at,
                    payload.clone(),
                ) {
                    Ok(_) => scheduled += 1,
                    Err(err) => {
                        warn!(
                            %recipient,
                            %notification_type,
                            %fire_at,
                            error = %err,
                            "failed to record roster reminder"
                        );
                    }
                }
            }
        }

        scheduled
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::notification::{NotificationError, NotificationId};

    #[derive(Default)]
    struct RecordingDispatch {
        scheduled: Mutex<Vec<(MemberId, NotificationType, DateTime<Utc>)>>,
        fail: bool,
    }

    impl NotificationDispatch for RecordingDispatch {
        fn create_notification(
            &self,
            _tenant_id: TenantId,
            _recipient_id: MemberId,
            _notification_type: NotificationType,
            _payload: serde_json::Value,
        ) -> Result<NotificationId, NotificationError> {
            Ok(NotificationId::new())
        }

        fn schedule_notification(
            &self,
            _tenant_id: TenantId,
            recipient_id: MemberId,
            notification_type: NotificationType,
            fire_at: DateTime<Utc>,
            _payload: serde_json::Value,
        ) -> Result<NotificationId, NotificationError> {
            if self.fail {
                return Err(NotificationError::Dispatch("channel down".to_string()));
            }
            self.scheduled
                .lock()
                .unwrap()
                .push((recipient_id, notification_type, fire_at));
            Ok(NotificationId::new())
        }
    }

    #[test]
    fn far_future_occurrence_gets_both_reminders_per_recipient() {
        let dispatch = RecordingDispatch::default();
        let now = Utc::now();
        let occurs_at = now + chrono::Duration::hours(30);
        let recipients = [MemberId::new(), MemberId::new()];

        let scheduler = ReminderScheduler::new(&dispatch);
        let count = scheduler.schedule_roster_reminders(
            TenantId::new(),
            &recipients,
            occurs_at,
            &serde_json::json!({"ministry": "Worship"}),
            now,
        );

        assert_eq!(count, 4);
        let scheduled = dispatch.scheduled.lock().unwrap();
        assert_eq!(scheduled.len(), 4);
        assert!(scheduled
            .iter()
            .any(|(_, t, at)| *t == NotificationType::Reminder24h
                && *at == occurs_at - chrono::Duration::hours(24)));
        assert!(scheduled
            .iter()
            .any(|(_, t, at)| *t == NotificationType::Reminder1h
                && *at == occurs_at - chrono::Duration::hours(1)));
    }

    #[test]
    fn near_occurrence_inside_both_offsets_gets_no_reminders() {
        let dispatch = RecordingDispatch::default();
        let now = Utc::now();
        let occurs_at = now + chrono::Duration::minutes(30);

        let scheduler = ReminderScheduler::new(&dispatch);
        let count = scheduler.schedule_roster_reminders(
            TenantId::new(),
            &[MemberId::new()],
            occurs_at,
            &serde_json::json!({}),
            now,
        );

        assert_eq!(count, 0);
        assert!(dispatch.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn occurrence_between_offsets_gets_only_the_short_reminder() {
        let dispatch = RecordingDispatch::default();
        let now = Utc::now();
        let occurs_at = now + chrono::Duration::hours(2);

        let scheduler = ReminderScheduler::new(&dispatch);
        let count = scheduler.schedule_roster_reminders(
            TenantId::new(),
            &[MemberId::new()],
            occurs_at,
            &serde_json::json!({}),
            now,
        );

        assert_eq!(count, 1);
        let scheduled = dispatch.scheduled.lock().unwrap();
        assert_eq!(scheduled[0].1, NotificationType::Reminder1h);
    }

    #[test]
    fn dispatch_failure_is_swallowed() {
        let dispatch = RecordingDispatch {
            fail: true,
            ..Default::default()
        };
        let now = Utc::now();

        let scheduler = ReminderScheduler::new(&dispatch);
        let count = scheduler.schedule_roster_reminders(
            TenantId::new(),
            &[MemberId::new()],
            now + chrono::Duration::days(2),
            &serde_json::json!({}),
            now,
        );

        assert_eq!(count, 0);
    }
}

use chrono::{DateTime, Duration, Utc};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

pub const DEFAULT_LEAD_TIME_HOURS: i64 = 24;
pub const MAX_LEAD_TIME_HOURS: i64 = 24 * 365;

/// Decides whether cancel and reschedule are currently permitted for a booking.
///
/// Both checks look only at the booking's status and start time against a
/// caller-supplied `now`; nothing here reads the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    pub cancel_lead_time: Duration,
    pub reschedule_lead_time: Duration,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            cancel_lead_time: Duration::hours(DEFAULT_LEAD_TIME_HOURS),
            reschedule_lead_time: Duration::hours(DEFAULT_LEAD_TIME_HOURS),
        }
    }
}

impl EligibilityPolicy {
    /// Rejects negative thresholds and anything over a year.
    pub fn from_hours(cancel_hours: i64, reschedule_hours: i64) -> Result<Self, AppError> {
        Ok(Self {
            cancel_lead_time: lead_time_hours("cancel", cancel_hours)?,
            reschedule_lead_time: lead_time_hours("reschedule", reschedule_hours)?,
        })
    }

    pub fn can_cancel_at(
        &self,
        status: BookingStatus,
        start_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        is_open(status) && lead_time(start_time, now) > self.cancel_lead_time
    }

    pub fn can_reschedule_at(
        &self,
        status: BookingStatus,
        start_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        is_open(status) && lead_time(start_time, now) > self.reschedule_lead_time
    }

    pub fn can_cancel(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        self.can_cancel_at(booking.status, booking.start_time, now)
    }

    pub fn can_reschedule(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        self.can_reschedule_at(booking.status, booking.start_time, now)
    }
}

/// Time remaining until the booking starts. Negative once it has started.
pub fn lead_time(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    start_time - now
}

fn lead_time_hours(name: &str, hours: i64) -> Result<Duration, AppError> {
    if !(0..=MAX_LEAD_TIME_HOURS).contains(&hours) {
        return Err(AppError::Config(format!(
            "{name} lead time must be between 0 and {MAX_LEAD_TIME_HOURS} hours, got {hours}"
        )));
    }
    Duration::try_hours(hours)
        .ok_or_else(|| AppError::Config(format!("{name} lead time out of range: {hours}")))
}

fn is_open(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Pending | BookingStatus::Confirmed)
}

pub fn can_cancel(booking: &Booking, now: DateTime<Utc>) -> bool {
    EligibilityPolicy::default().can_cancel(booking, now)
}

pub fn can_reschedule(booking: &Booking, now: DateTime<Utc>) -> bool {
    EligibilityPolicy::default().can_reschedule(booking, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap()
    }

    fn booking(status: BookingStatus, starts_in: Duration) -> Booking {
        let start = now() + starts_in;
        Booking {
            id: "b1".to_string(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            status,
            total_price: Decimal::new(20, 0),
            notes: None,
            cancel_reason: None,
            customer: None,
            barber: None,
            barber_shop: None,
            management_service: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_pending_two_days_out_is_eligible() {
        let b = booking(BookingStatus::Pending, Duration::hours(48));
        assert!(can_cancel(&b, now()));
        assert!(can_reschedule(&b, now()));
    }

    #[test]
    fn test_pending_two_hours_out_is_not_eligible() {
        let b = booking(BookingStatus::Pending, Duration::hours(2));
        assert!(!can_cancel(&b, now()));
        assert!(!can_reschedule(&b, now()));
    }

    #[test]
    fn test_exactly_24_hours_is_not_eligible() {
        let b = booking(BookingStatus::Confirmed, Duration::hours(24));
        assert!(!can_cancel(&b, now()));

        let b = booking(BookingStatus::Confirmed, Duration::hours(24) + Duration::seconds(1));
        assert!(can_cancel(&b, now()));
    }

    #[test]
    fn test_past_booking_is_not_eligible() {
        let b = booking(BookingStatus::Confirmed, Duration::hours(-3));
        assert!(!can_cancel(&b, now()));
        assert!(lead_time(b.start_time, now()) < Duration::zero());
    }

    #[test]
    fn test_non_open_statuses_never_eligible() {
        for status in [
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            let b = booking(status, Duration::days(30));
            assert!(!can_cancel(&b, now()), "{status:?} should not be cancellable");
            assert!(!can_reschedule(&b, now()), "{status:?} should not be reschedulable");
        }
    }

    #[test]
    fn test_separate_reschedule_threshold() {
        let policy = EligibilityPolicy::from_hours(24, 2).unwrap();
        let b = booking(BookingStatus::Confirmed, Duration::hours(5));
        assert!(!policy.can_cancel(&b, now()));
        assert!(policy.can_reschedule(&b, now()));
    }

    #[test]
    fn test_out_of_range_lead_time_is_rejected() {
        assert!(matches!(
            EligibilityPolicy::from_hours(-1, 24),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            EligibilityPolicy::from_hours(24, i64::MAX),
            Err(AppError::Config(_))
        ));
        assert_eq!(
            EligibilityPolicy::from_hours(24, 24).unwrap(),
            EligibilityPolicy::default()
        );
    }
}

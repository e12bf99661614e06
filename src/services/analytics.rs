use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

pub const TOP_SERVICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Today,
    ThisWeek,
    ThisMonth,
    Last30Days,
    Last3Months,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeRange {
    pub fn parse(
        name: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, AppError> {
        match name.unwrap_or("thisMonth") {
            "today" => Ok(TimeRange::Today),
            "thisWeek" => Ok(TimeRange::ThisWeek),
            "thisMonth" => Ok(TimeRange::ThisMonth),
            "last30Days" => Ok(TimeRange::Last30Days),
            "last3Months" => Ok(TimeRange::Last3Months),
            "custom" => match (start, end) {
                (Some(start), Some(end)) if start <= end => Ok(TimeRange::Custom { start, end }),
                (Some(_), Some(_)) => Err(AppError::Validation(
                    "custom range start must not be after end".to_string(),
                )),
                _ => Err(AppError::Validation(
                    "custom range needs both start and end".to_string(),
                )),
            },
            other => Err(AppError::Validation(format!("unknown time range: {other}"))),
        }
    }

    /// Inclusive bounds of the range as seen at `now`. Weeks start on Sunday.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let day_start = |d: chrono::NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));
        let last_instant = Duration::milliseconds(1);

        match self {
            TimeRange::Today => {
                let start = day_start(today);
                (start, start + Duration::days(1) - last_instant)
            }
            TimeRange::ThisWeek => {
                let offset = today.weekday().num_days_from_sunday() as i64;
                let start = day_start(today - Duration::days(offset));
                (start, start + Duration::days(7) - last_instant)
            }
            TimeRange::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                let start = day_start(first);
                let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
                (start, day_start(next) - last_instant)
            }
            TimeRange::Last30Days => (now - Duration::days(30), now),
            TimeRange::Last3Months => (
                now.checked_sub_months(Months::new(3)).unwrap_or(now),
                now,
            ),
            TimeRange::Custom { start, end } => (*start, *end),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds(now);
        instant >= start && instant <= end
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceStat {
    pub name: String,
    pub count: usize,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub pending: usize,
    pub revenue: Decimal,
    pub average_price: Decimal,
    pub top_services: Vec<ServiceStat>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShopStat {
    pub shop_id: String,
    pub shop_name: Option<String>,
    pub appointments: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub pending: usize,
    pub revenue: Decimal,
    pub average_price: Decimal,
    pub success_rate: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub summary: Summary,
    pub shops: Vec<ShopStat>,
}

pub fn filter<'a>(
    bookings: &'a [Booking],
    range: &TimeRange,
    shop_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<&'a Booking> {
    bookings
        .iter()
        .filter(|b| range.contains(b.start_time, now))
        .filter(|b| shop_id.map_or(true, |id| b.shop_id() == Some(id)))
        .collect()
}

fn count(bookings: &[&Booking], status: BookingStatus) -> usize {
    bookings.iter().filter(|b| b.status == status).count()
}

fn revenue(bookings: &[&Booking]) -> Decimal {
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .map(|b| b.total_price)
        .sum()
}

fn average(total: Decimal, n: usize) -> Decimal {
    if n == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(n)).round_dp(2)
    }
}

pub fn summarize(bookings: &[&Booking]) -> Summary {
    let completed = count(bookings, BookingStatus::Completed);
    let revenue = revenue(bookings);

    let mut services: Vec<ServiceStat> = Vec::new();
    for booking in bookings.iter().filter(|b| b.status == BookingStatus::Completed) {
        let name = booking.service_name();
        match services.iter_mut().find(|s| s.name == name) {
            Some(stat) => {
                stat.count += 1;
                stat.revenue += booking.total_price;
            }
            None => services.push(ServiceStat {
                name: name.to_string(),
                count: 1,
                revenue: booking.total_price,
            }),
        }
    }
    services.sort_by(|a, b| b.count.cmp(&a.count));
    services.truncate(TOP_SERVICES);

    Summary {
        total: bookings.len(),
        completed,
        cancelled: count(bookings, BookingStatus::Cancelled),
        pending: count(bookings, BookingStatus::Pending),
        revenue,
        average_price: average(revenue, completed),
        top_services: services,
    }
}

/// Per-shop figures, shops in order of first appearance.
pub fn by_shop(bookings: &[&Booking]) -> Vec<ShopStat> {
    let mut shop_ids: Vec<(String, Option<String>)> = Vec::new();
    for booking in bookings {
        if let Some(shop) = &booking.barber_shop {
            if !shop_ids.iter().any(|(id, _)| *id == shop.id) {
                shop_ids.push((shop.id.clone(), shop.name.clone()));
            }
        }
    }

    shop_ids
        .into_iter()
        .map(|(shop_id, shop_name)| {
            let rows: Vec<&Booking> = bookings
                .iter()
                .copied()
                .filter(|b| b.shop_id() == Some(shop_id.as_str()))
                .collect();
            let completed = count(&rows, BookingStatus::Completed);
            let revenue = revenue(&rows);
            let success_rate = if rows.is_empty() {
                Decimal::ZERO
            } else {
                (Decimal::from(completed) * Decimal::ONE_HUNDRED / Decimal::from(rows.len()))
                    .round_dp(1)
            };

            ShopStat {
                appointments: rows.len(),
                completed,
                cancelled: count(&rows, BookingStatus::Cancelled),
                pending: count(&rows, BookingStatus::Pending),
                average_price: average(revenue, completed),
                revenue,
                success_rate,
                shop_id,
                shop_name,
            }
        })
        .collect()
}

pub fn report(
    bookings: &[Booking],
    range: &TimeRange,
    shop_id: Option<&str>,
    now: DateTime<Utc>,
) -> Report {
    let (range_start, range_end) = range.bounds(now);
    let selected = filter(bookings, range, shop_id, now);
    Report {
        range_start,
        range_end,
        summary: summarize(&selected),
        shops: by_shop(&selected),
    }
}

/// Average star rating, one decimal place.
pub fn average_rating(scores: &[u8]) -> Option<Decimal> {
    if scores.is_empty() {
        return None;
    }
    let total: u32 = scores.iter().map(|s| *s as u32).sum();
    Some((Decimal::from(total) / Decimal::from(scores.len())).round_dp(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ServiceSnapshot, ShopRef};

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2025, 6, 18, 15, 0, 0).unwrap()
    }

    fn booking(
        id: &str,
        start: DateTime<Utc>,
        status: BookingStatus,
        price: i64,
        service: &str,
        shop: &str,
    ) -> Booking {
        Booking {
            id: id.to_string(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            status,
            total_price: Decimal::new(price, 0),
            notes: None,
            cancel_reason: None,
            customer: None,
            barber: None,
            barber_shop: Some(ShopRef {
                id: shop.to_string(),
                name: Some(format!("Shop {shop}")),
            }),
            management_service: Some(ServiceSnapshot {
                id: format!("svc-{service}"),
                name: service.to_string(),
                price: Decimal::new(price, 0),
                duration_minutes: 30,
            }),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_range_parse() {
        assert_eq!(TimeRange::parse(None, None, None).unwrap(), TimeRange::ThisMonth);
        assert_eq!(TimeRange::parse(Some("today"), None, None).unwrap(), TimeRange::Today);
        assert!(TimeRange::parse(Some("custom"), Some(now()), None).is_err());
        assert!(TimeRange::parse(Some("custom"), Some(now()), Some(now() - Duration::days(1))).is_err());
        assert!(TimeRange::parse(Some("fortnight"), None, None).is_err());
    }

    #[test]
    fn test_week_starts_on_sunday() {
        let (start, end) = TimeRange::ThisWeek.bounds(now());
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2025, 6, 22, 0, 0, 0).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2025, 6, 21, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_month_and_today_bounds() {
        let (start, end) = TimeRange::ThisMonth.bounds(now());
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert!(TimeRange::ThisMonth.contains(Utc.with_ymd_and_hms(2025, 6, 30, 23, 0, 0).unwrap(), now()));
        assert!(end < Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());

        assert!(TimeRange::Today.contains(Utc.with_ymd_and_hms(2025, 6, 18, 0, 0, 0).unwrap(), now()));
        assert!(!TimeRange::Today.contains(Utc.with_ymd_and_hms(2025, 6, 19, 0, 0, 0).unwrap(), now()));
    }

    #[test]
    fn test_last_30_days_excludes_future() {
        assert!(TimeRange::Last30Days.contains(now() - Duration::days(29), now()));
        assert!(!TimeRange::Last30Days.contains(now() + Duration::hours(1), now()));
        assert!(!TimeRange::Last30Days.contains(now() - Duration::days(31), now()));
    }

    #[test]
    fn test_summary_counts_revenue_and_top_services() {
        let t = now() - Duration::days(1);
        let bookings = vec![
            booking("1", t, BookingStatus::Completed, 20, "Cut", "s1"),
            booking("2", t, BookingStatus::Completed, 35, "Beard", "s1"),
            booking("3", t, BookingStatus::Completed, 20, "Cut", "s2"),
            booking("4", t, BookingStatus::Cancelled, 20, "Cut", "s2"),
            booking("5", t, BookingStatus::Pending, 50, "Color", "s2"),
        ];
        let selected: Vec<&Booking> = bookings.iter().collect();
        let summary = summarize(&selected);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.revenue, Decimal::new(75, 0));
        assert_eq!(summary.average_price, Decimal::new(2500, 2));
        assert_eq!(summary.top_services.len(), 2);
        assert_eq!(summary.top_services[0].name, "Cut");
        assert_eq!(summary.top_services[0].count, 2);
        assert_eq!(summary.top_services[0].revenue, Decimal::new(40, 0));
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = summarize(&[]);
        assert_eq!(summary.revenue, Decimal::ZERO);
        assert_eq!(summary.average_price, Decimal::ZERO);
        assert!(summary.top_services.is_empty());
    }

    #[test]
    fn test_top_services_capped_at_five() {
        let t = now() - Duration::days(1);
        let bookings: Vec<Booking> = (0..7)
            .map(|i| booking(&i.to_string(), t, BookingStatus::Completed, 10, &format!("S{i}"), "s1"))
            .collect();
        let selected: Vec<&Booking> = bookings.iter().collect();
        let summary = summarize(&selected);
        assert_eq!(summary.top_services.len(), TOP_SERVICES);
        assert_eq!(summary.top_services[0].name, "S0");
    }

    #[test]
    fn test_shop_breakdown() {
        let t = now() - Duration::days(1);
        let bookings = vec![
            booking("1", t, BookingStatus::Completed, 20, "Cut", "s1"),
            booking("2", t, BookingStatus::Cancelled, 35, "Beard", "s1"),
            booking("3", t, BookingStatus::Completed, 30, "Cut", "s2"),
        ];
        let selected: Vec<&Booking> = bookings.iter().collect();
        let shops = by_shop(&selected);

        assert_eq!(shops.len(), 2);
        assert_eq!(shops[0].shop_id, "s1");
        assert_eq!(shops[0].appointments, 2);
        assert_eq!(shops[0].revenue, Decimal::new(20, 0));
        assert_eq!(shops[0].success_rate, Decimal::new(50, 0));
        assert_eq!(shops[1].success_rate, Decimal::new(100, 0));
    }

    #[test]
    fn test_report_applies_range_and_shop() {
        let bookings = vec![
            booking("1", now() - Duration::days(2), BookingStatus::Completed, 20, "Cut", "s1"),
            booking("2", now() - Duration::days(2), BookingStatus::Completed, 30, "Cut", "s2"),
            booking("3", now() - Duration::days(60), BookingStatus::Completed, 99, "Cut", "s1"),
        ];
        let report = report(&bookings, &TimeRange::Last30Days, Some("s1"), now());
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.revenue, Decimal::new(20, 0));
        assert_eq!(report.shops.len(), 1);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[5, 4, 4]), Some(Decimal::new(43, 1)));
    }
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ServiceSnapshot, ShopBarber};

/// Display totals for a set of selected services. The API's own totals win
/// once bookings exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub service_count: usize,
    pub total_price: Decimal,
    pub total_duration_minutes: u32,
    pub service_names: Vec<String>,
}

/// Prices come from the caller, so a negative one is refused outright.
pub fn validate_prices(services: &[ServiceSnapshot]) -> Result<(), AppError> {
    match services.iter().find(|s| s.price < Decimal::ZERO) {
        Some(service) => Err(AppError::Validation(format!(
            "price of {} must not be negative",
            service.name
        ))),
        None => Ok(()),
    }
}

pub fn quote(services: &[ServiceSnapshot]) -> Quote {
    Quote {
        service_count: services.len(),
        total_price: services.iter().map(|s| s.price).sum(),
        total_duration_minutes: services.iter().map(|s| s.duration_minutes).sum(),
        service_names: services.iter().map(|s| s.name.clone()).collect(),
    }
}

/// Services picked for one appointment slot, plus when and with whom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCart {
    pub shop_id: String,
    pub services: Vec<ServiceSnapshot>,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub barber_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingCart {
    pub fn new(shop_id: impl Into<String>, date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            services: Vec::new(),
            date: date.into(),
            time: time.into(),
            barber_id: None,
            notes: None,
        }
    }

    pub fn quote(&self) -> Quote {
        quote(&self.services)
    }

    /// Drops repeated service ids, keeping the first occurrence.
    pub fn dedup(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.services.retain(|s| seen.insert(s.id.clone()));
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.services.is_empty() {
            return Err(AppError::Validation("select at least one service".to_string()));
        }
        if self.shop_id.trim().is_empty() {
            return Err(AppError::Validation("shop is required".to_string()));
        }
        validate_prices(&self.services)?;
        self.start_time()?;
        Ok(())
    }

    /// Date and time of day combined, read as UTC.
    pub fn start_time(&self) -> Result<DateTime<Utc>, AppError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("invalid date: {}", self.date)))?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S"))
            .map_err(|_| AppError::Validation(format!("invalid time: {}", self.time)))?;
        Ok(date.and_time(time).and_utc())
    }

    /// The chosen barber, or else the shop's first active one.
    pub fn resolve_barber(&self, shop_barbers: &[ShopBarber]) -> Result<String, AppError> {
        if let Some(id) = self.barber_id.as_ref().filter(|id| !id.trim().is_empty()) {
            return Ok(id.clone());
        }
        shop_barbers
            .iter()
            .find(|b| b.is_active)
            .map(|b| b.id.clone())
            .ok_or_else(|| {
                AppError::Validation("no available barber found, please try again later".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, price: i64, minutes: u32) -> ServiceSnapshot {
        ServiceSnapshot {
            id: id.to_string(),
            name: format!("Service {id}"),
            price: Decimal::new(price, 0),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn test_quote_sums_price_and_duration() {
        let q = quote(&[service("a", 20, 30), service("b", 35, 45)]);
        assert_eq!(q.service_count, 2);
        assert_eq!(q.total_price, Decimal::new(55, 0));
        assert_eq!(q.total_duration_minutes, 75);
        assert_eq!(q.service_names, vec!["Service a", "Service b"]);
    }

    #[test]
    fn test_quote_keeps_cents() {
        let mut a = service("a", 0, 15);
        a.price = Decimal::new(1999, 2);
        let mut b = service("b", 0, 15);
        b.price = Decimal::new(501, 2);
        assert_eq!(quote(&[a, b]).total_price, Decimal::new(2500, 2));
    }

    #[test]
    fn test_empty_quote() {
        let q = quote(&[]);
        assert_eq!(q.total_price, Decimal::ZERO);
        assert_eq!(q.total_duration_minutes, 0);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut cart = BookingCart::new("shop-1", "2025-06-20", "14:00");
        cart.services = vec![service("a", 20, 30), service("b", -5, 15)];
        assert!(matches!(cart.validate(), Err(AppError::Validation(_))));

        cart.services[1].price = Decimal::ZERO;
        assert!(cart.validate().is_ok());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let mut cart = BookingCart::new("shop-1", "2025-06-20", "14:00");
        cart.services = vec![service("a", 20, 30), service("b", 35, 45), service("a", 99, 1)];
        cart.dedup();
        assert_eq!(cart.services.len(), 2);
        assert_eq!(cart.quote().total_price, Decimal::new(55, 0));
    }

    #[test]
    fn test_start_time_parsing() {
        let cart = BookingCart::new("shop-1", "2025-06-20", "14:30");
        assert_eq!(cart.start_time().unwrap().to_rfc3339(), "2025-06-20T14:30:00+00:00");

        let cart = BookingCart::new("shop-1", "2025-06-20", "14:30:00");
        assert!(cart.start_time().is_ok());

        let cart = BookingCart::new("shop-1", "20/06/2025", "14:30");
        assert!(matches!(cart.start_time(), Err(AppError::Validation(_))));

        let cart = BookingCart::new("shop-1", "2025-06-20", "2pm");
        assert!(matches!(cart.start_time(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_requires_services() {
        let cart = BookingCart::new("shop-1", "2025-06-20", "14:00");
        assert!(matches!(cart.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_resolve_barber() {
        let barbers = vec![
            ShopBarber { id: "idle".to_string(), is_active: false },
            ShopBarber { id: "active".to_string(), is_active: true },
        ];

        let mut cart = BookingCart::new("shop-1", "2025-06-20", "14:00");
        assert_eq!(cart.resolve_barber(&barbers).unwrap(), "active");

        cart.barber_id = Some("chosen".to_string());
        assert_eq!(cart.resolve_barber(&barbers).unwrap(), "chosen");

        cart.barber_id = None;
        assert!(cart.resolve_barber(&barbers[..1]).is_err());
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

/// A service as a barber manages it, richer than the snapshot on a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementService {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub barber_id: String,
    pub barber_shop_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: u32,
    pub category_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

fn check_price(price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }
    Ok(())
}

fn check_duration(minutes: u32) -> Result<(), AppError> {
    if minutes == 0 {
        return Err(AppError::Validation("duration must be at least one minute".to_string()));
    }
    Ok(())
}

impl NewService {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("service name is required".to_string()));
        }
        if self.barber_shop_id.trim().is_empty() {
            return Err(AppError::Validation("shop is required".to_string()));
        }
        if self.category_id.trim().is_empty() {
            return Err(AppError::Validation("category is required".to_string()));
        }
        check_price(self.price)?;
        check_duration(self.duration_minutes)
    }
}

impl ServiceUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if *self == ServiceUpdate::default() {
            return Err(AppError::Validation("nothing to update".to_string()));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::Validation("service name must not be blank".to_string()));
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(minutes) = self.duration_minutes {
            check_duration(minutes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_service(price: Decimal) -> NewService {
        NewService {
            barber_id: "barber-1".to_string(),
            barber_shop_id: "shop-1".to_string(),
            name: "Skin fade".to_string(),
            description: None,
            price,
            duration_minutes: 45,
            category_id: "cat-1".to_string(),
        }
    }

    #[test]
    fn test_new_service_checks() {
        assert!(new_service(Decimal::new(2550, 2)).validate().is_ok());
        assert!(new_service(Decimal::ZERO).validate().is_ok());
        assert!(new_service(Decimal::new(-1, 0)).validate().is_err());

        let mut service = new_service(Decimal::ONE);
        service.duration_minutes = 0;
        assert!(service.validate().is_err());
    }

    #[test]
    fn test_price_is_sent_as_a_number() {
        let value = serde_json::to_value(new_service(Decimal::new(2550, 2))).unwrap();
        assert_eq!(value["price"], serde_json::json!(25.5));
        assert_eq!(value["barberShopId"], "shop-1");
        assert_eq!(value["durationMinutes"], 45);
    }

    #[test]
    fn test_service_update_checks() {
        assert!(ServiceUpdate::default().validate().is_err());

        let update = ServiceUpdate {
            price: Some(Decimal::new(-500, 2)),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(AppError::Validation(_))));

        let update: ServiceUpdate = serde_json::from_str(r#"{"price": 30, "isActive": false}"#).unwrap();
        assert!(update.validate().is_ok());
        assert_eq!(update.price, Some(Decimal::new(30, 0)));
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "price": 30.0, "isActive": false })
        );
    }
}

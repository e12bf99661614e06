use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Profile fields an owner may change. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShopUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ShopUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if *self == ShopUpdate::default() {
            return Err(AppError::Validation("nothing to update".to_string()));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::Validation("shop name must not be blank".to_string()));
        }
        if matches!(&self.email, Some(email) if !email.is_empty() && !email.contains('@')) {
            return Err(AppError::Validation("shop email is not valid".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_rejected() {
        assert!(matches!(
            ShopUpdate::default().validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_name_and_bad_email() {
        let update = ShopUpdate {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ShopUpdate {
            email: Some("front-desk".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ShopUpdate {
            city: Some("Lisbon".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_only_present_fields_are_sent() {
        let update = ShopUpdate {
            zip_code: Some("1000-001".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "zipCode": "1000-001" })
        );
    }
}

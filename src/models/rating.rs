use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booking::PersonRef;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RatedType {
    User,
    Barber,
    Barbershop,
}

impl RatedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatedType::User => "USER",
            RatedType::Barber => "BARBER",
            RatedType::Barbershop => "BARBERSHOP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Some(RatedType::User),
            "BARBER" => Some(RatedType::Barber),
            "BARBERSHOP" => Some(RatedType::Barbershop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rater: Option<PersonRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRating {
    pub entity_id: String,
    pub entity_type: RatedType,
    pub rating: u8,
    pub comment: Option<String>,
    pub booking_id: Option<String>,
}

pub fn validate_score(rating: u8) -> Result<(), String> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert!(validate_score(0).is_err());
        assert!(validate_score(1).is_ok());
        assert!(validate_score(5).is_ok());
        assert!(validate_score(6).is_err());
    }

    #[test]
    fn test_rated_type_wire_names() {
        assert_eq!(RatedType::parse("barbershop"), Some(RatedType::Barbershop));
        assert_eq!(RatedType::Barbershop.as_str(), "BARBERSHOP");
        assert_eq!(
            serde_json::to_string(&RatedType::Barber).unwrap(),
            "\"BARBER\""
        );
    }
}

pub mod graphql;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::models::{
    Booking, BookingStatus, Favorite, ManagementService, NewRating, NewService, RatedType,
    Rating, Role, ServiceUpdate, Shop, ShopBarber, ShopUpdate, User,
};

/// Timestamps go to the API as UTC with millisecond precision.
pub fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_iso<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso(*dt))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user_id: String,
    pub barber_id: String,
    pub barber_shop_id: String,
    pub management_service_id: String,
    #[serde(serialize_with = "serialize_iso")]
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentFilter {
    pub barber_shop_id: Option<String>,
    pub barber_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub barber: Option<User>,
    pub expires_in: i64,
}

/// The remote booking service. It owns every booking, rating and favorite;
/// this crate only submits intents and reads back server state.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> anyhow::Result<AuthPayload>;

    async fn register(&self, account: &NewAccount) -> anyhow::Result<AuthPayload>;

    async fn create_booking(&self, token: &str, input: &NewBooking) -> anyhow::Result<Booking>;

    async fn update_booking_status(
        &self,
        token: &str,
        booking_id: &str,
        status: BookingStatus,
        reason: Option<&str>,
    ) -> anyhow::Result<Booking>;

    async fn reschedule_booking(
        &self,
        token: &str,
        booking_id: &str,
        new_start_time: DateTime<Utc>,
    ) -> anyhow::Result<Booking>;

    async fn bookings_by_user(&self, token: &str, user_id: &str) -> anyhow::Result<Vec<Booking>>;

    async fn bookings_by_barber(&self, token: &str, barber_id: &str)
        -> anyhow::Result<Vec<Booking>>;

    async fn upcoming_bookings(&self, token: &str, user_id: &str) -> anyhow::Result<Vec<Booking>>;

    async fn upcoming_bookings_by_barber(
        &self,
        token: &str,
        barber_id: &str,
    ) -> anyhow::Result<Vec<Booking>>;

    async fn owner_appointments(
        &self,
        token: &str,
        owner_id: &str,
        filter: &AppointmentFilter,
    ) -> anyhow::Result<Vec<Booking>>;

    async fn shop_barbers(&self, token: &str, shop_id: &str) -> anyhow::Result<Vec<ShopBarber>>;

    async fn ratings_by_entity(
        &self,
        token: &str,
        entity_id: &str,
        entity_type: RatedType,
    ) -> anyhow::Result<Vec<Rating>>;

    async fn create_rating(
        &self,
        token: &str,
        user_id: &str,
        rating: &NewRating,
    ) -> anyhow::Result<Rating>;

    async fn update_rating(
        &self,
        token: &str,
        rating_id: &str,
        rating: u8,
        comment: Option<&str>,
    ) -> anyhow::Result<Rating>;

    async fn delete_rating(&self, token: &str, rating_id: &str) -> anyhow::Result<bool>;

    async fn favorites(&self, token: &str, user_id: &str) -> anyhow::Result<Vec<Favorite>>;

    async fn add_favorite(&self, token: &str, user_id: &str, shop_id: &str)
        -> anyhow::Result<Favorite>;

    async fn remove_favorite(&self, token: &str, user_id: &str, shop_id: &str)
        -> anyhow::Result<bool>;

    async fn is_favorite(&self, token: &str, user_id: &str, shop_id: &str) -> anyhow::Result<bool>;

    async fn assign_barber(
        &self,
        token: &str,
        owner_id: &str,
        barber_id: &str,
        shop_id: &str,
    ) -> anyhow::Result<bool>;

    async fn unassign_barber(
        &self,
        token: &str,
        owner_id: &str,
        barber_id: &str,
        shop_id: &str,
    ) -> anyhow::Result<bool>;

    async fn update_shop(
        &self,
        token: &str,
        owner_id: &str,
        shop_id: &str,
        update: &ShopUpdate,
    ) -> anyhow::Result<Shop>;

    async fn create_service(
        &self,
        token: &str,
        service: &NewService,
    ) -> anyhow::Result<ManagementService>;

    async fn update_service(
        &self,
        token: &str,
        service_id: &str,
        update: &ServiceUpdate,
    ) -> anyhow::Result<ManagementService>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_booking_wire_shape() {
        let start = DateTime::parse_from_rfc3339("2030-06-20T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let input = NewBooking {
            user_id: "cust-1".to_string(),
            barber_id: "barber-1".to_string(),
            barber_shop_id: "shop-1".to_string(),
            management_service_id: "haircut".to_string(),
            start_time: start,
            notes: None,
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({
                "userId": "cust-1",
                "barberId": "barber-1",
                "barberShopId": "shop-1",
                "managementServiceId": "haircut",
                "startTime": "2030-06-20T14:00:00.000Z",
                "notes": null,
            })
        );
    }

    #[test]
    fn test_new_account_role_is_uppercase() {
        let account = NewAccount {
            email: "sam@example.com".to_string(),
            password: "long-enough".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Cutter".to_string(),
            phone: None,
            role: Role::Barber,
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["role"], "BARBER");
        assert_eq!(value["firstName"], "Sam");
    }
}

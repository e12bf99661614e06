use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{iso, AppointmentFilter, AuthPayload, BookingApi, NewAccount, NewBooking};
use crate::models::{
    Booking, BookingStatus, Favorite, ManagementService, NewRating, NewService, RatedType,
    Rating, ServiceUpdate, Shop, ShopBarber, ShopUpdate,
};

const BOOKING_FIELDS: &str = "fragment BookingFields on Booking {
  id startTime endTime status totalPrice notes cancelReason createdAt updatedAt
  user { id firstName lastName }
  barber { id firstName lastName }
  barberShop { id name }
  managementService { id name price durationMinutes }
}";

const RATING_FIELDS: &str = "fragment RatingFields on Rating {
  id rating comment createdAt
  rater { id firstName lastName }
}";

const LOGIN: &str = "mutation Login($email: String!, $password: String!) {
  login(email: $email, password: $password) {
    token refreshToken expiresIn
    user { id email firstName lastName role }
    barber { id email firstName lastName role }
  }
}";

const REGISTER: &str = "mutation Register($input: RegisterInput!) {
  register(input: $input) {
    token refreshToken expiresIn
    user { id email firstName lastName role }
    barber { id email firstName lastName role }
  }
}";

const CREATE_BOOKING: &str = "mutation CreateBooking($input: CreateBookingInput!) {
  createBooking(input: $input) { ...BookingFields }
}";

const UPDATE_BOOKING_STATUS: &str =
    "mutation UpdateBookingStatus($id: ID!, $status: BookingStatus!, $reason: String) {
  updateBookingStatus(id: $id, status: $status, reason: $reason) { ...BookingFields }
}";

const RESCHEDULE_BOOKING: &str = "mutation RescheduleBooking($id: ID!, $newStartTime: String!) {
  rescheduleBooking(id: $id, newStartTime: $newStartTime) { ...BookingFields }
}";

const BOOKINGS_BY_USER: &str = "query BookingsByUser($userId: ID!) {
  bookingsByUser(userId: $userId) { ...BookingFields }
}";

const BOOKINGS_BY_BARBER: &str = "query BookingsByBarber($barberId: ID!) {
  bookingsByBarber(barberId: $barberId) { ...BookingFields }
}";

const UPCOMING_BOOKINGS: &str = "query UpcomingBookings($userId: ID!) {
  upcomingBookings(userId: $userId) { ...BookingFields }
}";

const UPCOMING_BOOKINGS_BY_BARBER: &str = "query UpcomingBookingsByBarber($barberId: ID!) {
  upcomingBookingsByBarber(barberId: $barberId) { ...BookingFields }
}";

const OWNER_APPOINTMENTS: &str = "query OwnerAppointments(
  $ownerId: ID!, $barberShopId: ID, $barberId: ID, $status: BookingStatus,
  $startDate: String, $endDate: String
) {
  ownerAppointmentsWithFilters(
    ownerId: $ownerId, barberShopId: $barberShopId, barberId: $barberId,
    status: $status, startDate: $startDate, endDate: $endDate
  ) { ...BookingFields }
}";

const SHOP_BARBERS: &str = "query ShopBarbers($id: ID!) {
  barberShop(id: $id) { barbers { id isActive } }
}";

const RATINGS_BY_ENTITY: &str = "query RatingsByEntity($entityId: ID!, $entityType: RatedType!) {
  ratingsByEntity(entityId: $entityId, entityType: $entityType) { ...RatingFields }
}";

const CREATE_RATING: &str = "mutation CreateUserRating(
  $userId: ID!, $entityId: ID!, $entityType: RatedType!, $rating: Int!,
  $comment: String, $bookingId: ID
) {
  createUserRating(
    userId: $userId, entityId: $entityId, entityType: $entityType,
    rating: $rating, comment: $comment, bookingId: $bookingId
  ) { ...RatingFields }
}";

const UPDATE_RATING: &str = "mutation UpdateRating($id: ID!, $rating: Int!, $comment: String) {
  updateRating(id: $id, rating: $rating, comment: $comment) { ...RatingFields }
}";

const DELETE_RATING: &str = "mutation DeleteRating($id: ID!) { deleteRating(id: $id) }";

const FAVORITES: &str = "query Favorites($userId: ID!) {
  favorites(userId: $userId) { id barberShop { id name } }
}";

const ADD_FAVORITE: &str = "mutation AddToFavorites($userId: ID!, $shopId: ID!) {
  addToFavorites(userId: $userId, shopId: $shopId) { id barberShop { id name } }
}";

const REMOVE_FAVORITE: &str = "mutation RemoveFromFavorites($userId: ID!, $shopId: ID!) {
  removeFromFavorites(userId: $userId, shopId: $shopId)
}";

const IS_FAVORITE: &str = "query IsFavorite($userId: ID!, $shopId: ID!) {
  isFavorite(userId: $userId, shopId: $shopId)
}";

const ASSIGN_BARBER: &str =
    "mutation AssignBarberToShop($ownerId: ID!, $barberId: ID!, $barberShopId: ID!) {
  assignBarberToShop(ownerId: $ownerId, barberId: $barberId, barberShopId: $barberShopId)
}";

const UNASSIGN_BARBER: &str =
    "mutation UnassignBarberFromShop($ownerId: ID!, $barberId: ID!, $barberShopId: ID!) {
  unassignBarberFromShop(ownerId: $ownerId, barberId: $barberId, barberShopId: $barberShopId)
}";

const UPDATE_OWNED_BARBER_SHOP: &str = "mutation UpdateOwnedBarberShop(
  $ownerId: ID!, $barberShopId: ID!, $name: String, $description: String,
  $address: String, $city: String, $state: String, $country: String,
  $zipCode: String, $phone: String, $email: String, $website: String
) {
  updateOwnedBarberShop(
    ownerId: $ownerId, barberShopId: $barberShopId, name: $name,
    description: $description, address: $address, city: $city, state: $state,
    country: $country, zipCode: $zipCode, phone: $phone, email: $email,
    website: $website
  ) { id name description address city state country zipCode phone email website updatedAt }
}";

const CREATE_MANAGEMENT_SERVICE: &str =
    "mutation CreateManagementService($input: CreateManagementServiceInput!) {
  createManagementService(input: $input) {
    id name description price durationMinutes isActive
    category { id name }
  }
}";

const UPDATE_MANAGEMENT_SERVICE: &str =
    "mutation UpdateManagementService($id: ID!, $input: UpdateManagementServiceInput!) {
  updateManagementService(id: $id, input: $input) { id name description price durationMinutes }
}";

pub struct GraphqlBookingApi {
    endpoint: String,
    client: reqwest::Client,
}

impl GraphqlBookingApi {
    pub fn new(endpoint: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { endpoint, client })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        query: &str,
        variables: Value,
        field: &str,
    ) -> anyhow::Result<T> {
        let document = build_document(query);
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%request_id, field, "sending GraphQL request");

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("x-request-id", &request_id)
            .json(&json!({ "query": document, "variables": variables }));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to call booking API ({field})"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse booking API response ({field})"))?;

        if !status.is_success() {
            anyhow::bail!("booking API error ({}): {}", status, body);
        }

        extract_field(body, field)
    }
}

fn build_document(query: &str) -> String {
    let mut document = query.to_string();
    if query.contains("...BookingFields") {
        document.push('\n');
        document.push_str(BOOKING_FIELDS);
    }
    if query.contains("...RatingFields") {
        document.push('\n');
        document.push_str(RATING_FIELDS);
    }
    document
}

fn extract_field<T: DeserializeOwned>(mut body: Value, field: &str) -> anyhow::Result<T> {
    if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            anyhow::bail!("{}", messages.join("; "));
        }
    }

    let value = body
        .get_mut("data")
        .and_then(|d| d.get_mut(field))
        .map(Value::take)
        .ok_or_else(|| anyhow::anyhow!("missing {field} in booking API response"))?;

    serde_json::from_value(value).with_context(|| format!("unexpected shape for {field}"))
}

#[async_trait]
impl BookingApi for GraphqlBookingApi {
    async fn login(&self, email: &str, password: &str) -> anyhow::Result<AuthPayload> {
        self.execute(None, LOGIN, json!({ "email": email, "password": password }), "login")
            .await
    }

    async fn register(&self, account: &NewAccount) -> anyhow::Result<AuthPayload> {
        let input = serde_json::to_value(account).context("failed to encode registration")?;
        self.execute(None, REGISTER, json!({ "input": input }), "register")
            .await
    }

    async fn create_booking(&self, token: &str, input: &NewBooking) -> anyhow::Result<Booking> {
        let input = serde_json::to_value(input).context("failed to encode booking input")?;
        self.execute(Some(token), CREATE_BOOKING, json!({ "input": input }), "createBooking")
            .await
    }

    async fn update_booking_status(
        &self,
        token: &str,
        booking_id: &str,
        status: BookingStatus,
        reason: Option<&str>,
    ) -> anyhow::Result<Booking> {
        self.execute(
            Some(token),
            UPDATE_BOOKING_STATUS,
            json!({ "id": booking_id, "status": status.as_str(), "reason": reason }),
            "updateBookingStatus",
        )
        .await
    }

    async fn reschedule_booking(
        &self,
        token: &str,
        booking_id: &str,
        new_start_time: DateTime<Utc>,
    ) -> anyhow::Result<Booking> {
        self.execute(
            Some(token),
            RESCHEDULE_BOOKING,
            json!({ "id": booking_id, "newStartTime": iso(new_start_time) }),
            "rescheduleBooking",
        )
        .await
    }

    async fn bookings_by_user(&self, token: &str, user_id: &str) -> anyhow::Result<Vec<Booking>> {
        self.execute(Some(token), BOOKINGS_BY_USER, json!({ "userId": user_id }), "bookingsByUser")
            .await
    }

    async fn bookings_by_barber(
        &self,
        token: &str,
        barber_id: &str,
    ) -> anyhow::Result<Vec<Booking>> {
        self.execute(
            Some(token),
            BOOKINGS_BY_BARBER,
            json!({ "barberId": barber_id }),
            "bookingsByBarber",
        )
        .await
    }

    async fn upcoming_bookings(&self, token: &str, user_id: &str) -> anyhow::Result<Vec<Booking>> {
        self.execute(
            Some(token),
            UPCOMING_BOOKINGS,
            json!({ "userId": user_id }),
            "upcomingBookings",
        )
        .await
    }

    async fn upcoming_bookings_by_barber(
        &self,
        token: &str,
        barber_id: &str,
    ) -> anyhow::Result<Vec<Booking>> {
        self.execute(
            Some(token),
            UPCOMING_BOOKINGS_BY_BARBER,
            json!({ "barberId": barber_id }),
            "upcomingBookingsByBarber",
        )
        .await
    }

    async fn owner_appointments(
        &self,
        token: &str,
        owner_id: &str,
        filter: &AppointmentFilter,
    ) -> anyhow::Result<Vec<Booking>> {
        self.execute(
            Some(token),
            OWNER_APPOINTMENTS,
            json!({
                "ownerId": owner_id,
                "barberShopId": filter.barber_shop_id,
                "barberId": filter.barber_id,
                "status": filter.status.map(|s| s.as_str()),
                "startDate": filter.start_date,
                "endDate": filter.end_date,
            }),
            "ownerAppointmentsWithFilters",
        )
        .await
    }

    async fn shop_barbers(&self, token: &str, shop_id: &str) -> anyhow::Result<Vec<ShopBarber>> {
        let shop: Value = self
            .execute(Some(token), SHOP_BARBERS, json!({ "id": shop_id }), "barberShop")
            .await?;
        if shop.is_null() {
            anyhow::bail!("shop {shop_id} not found");
        }
        let barbers = shop.get("barbers").cloned().unwrap_or(Value::Array(vec![]));
        serde_json::from_value(barbers).context("unexpected shape for barberShop.barbers")
    }

    async fn ratings_by_entity(
        &self,
        token: &str,
        entity_id: &str,
        entity_type: RatedType,
    ) -> anyhow::Result<Vec<Rating>> {
        self.execute(
            Some(token),
            RATINGS_BY_ENTITY,
            json!({ "entityId": entity_id, "entityType": entity_type.as_str() }),
            "ratingsByEntity",
        )
        .await
    }

    async fn create_rating(
        &self,
        token: &str,
        user_id: &str,
        rating: &NewRating,
    ) -> anyhow::Result<Rating> {
        self.execute(
            Some(token),
            CREATE_RATING,
            json!({
                "userId": user_id,
                "entityId": rating.entity_id,
                "entityType": rating.entity_type.as_str(),
                "rating": rating.rating,
                "comment": rating.comment,
                "bookingId": rating.booking_id,
            }),
            "createUserRating",
        )
        .await
    }

    async fn update_rating(
        &self,
        token: &str,
        rating_id: &str,
        rating: u8,
        comment: Option<&str>,
    ) -> anyhow::Result<Rating> {
        self.execute(
            Some(token),
            UPDATE_RATING,
            json!({ "id": rating_id, "rating": rating, "comment": comment }),
            "updateRating",
        )
        .await
    }

    async fn delete_rating(&self, token: &str, rating_id: &str) -> anyhow::Result<bool> {
        self.execute(Some(token), DELETE_RATING, json!({ "id": rating_id }), "deleteRating")
            .await
    }

    async fn favorites(&self, token: &str, user_id: &str) -> anyhow::Result<Vec<Favorite>> {
        self.execute(Some(token), FAVORITES, json!({ "userId": user_id }), "favorites")
            .await
    }

    async fn add_favorite(
        &self,
        token: &str,
        user_id: &str,
        shop_id: &str,
    ) -> anyhow::Result<Favorite> {
        self.execute(
            Some(token),
            ADD_FAVORITE,
            json!({ "userId": user_id, "shopId": shop_id }),
            "addToFavorites",
        )
        .await
    }

    async fn remove_favorite(
        &self,
        token: &str,
        user_id: &str,
        shop_id: &str,
    ) -> anyhow::Result<bool> {
        self.execute(
            Some(token),
            REMOVE_FAVORITE,
            json!({ "userId": user_id, "shopId": shop_id }),
            "removeFromFavorites",
        )
        .await
    }

    async fn is_favorite(&self, token: &str, user_id: &str, shop_id: &str) -> anyhow::Result<bool> {
        self.execute(
            Some(token),
            IS_FAVORITE,
            json!({ "userId": user_id, "shopId": shop_id }),
            "isFavorite",
        )
        .await
    }

    async fn assign_barber(
        &self,
        token: &str,
        owner_id: &str,
        barber_id: &str,
        shop_id: &str,
    ) -> anyhow::Result<bool> {
        self.execute(
            Some(token),
            ASSIGN_BARBER,
            json!({ "ownerId": owner_id, "barberId": barber_id, "barberShopId": shop_id }),
            "assignBarberToShop",
        )
        .await
    }

    async fn unassign_barber(
        &self,
        token: &str,
        owner_id: &str,
        barber_id: &str,
        shop_id: &str,
    ) -> anyhow::Result<bool> {
        self.execute(
            Some(token),
            UNASSIGN_BARBER,
            json!({ "ownerId": owner_id, "barberId": barber_id, "barberShopId": shop_id }),
            "unassignBarberFromShop",
        )
        .await
    }

    async fn update_shop(
        &self,
        token: &str,
        owner_id: &str,
        shop_id: &str,
        update: &ShopUpdate,
    ) -> anyhow::Result<Shop> {
        let mut variables = serde_json::to_value(update).context("failed to encode shop update")?;
        if let Some(fields) = variables.as_object_mut() {
            fields.insert("ownerId".to_string(), json!(owner_id));
            fields.insert("barberShopId".to_string(), json!(shop_id));
        }
        self.execute(
            Some(token),
            UPDATE_OWNED_BARBER_SHOP,
            variables,
            "updateOwnedBarberShop",
        )
        .await
    }

    async fn create_service(
        &self,
        token: &str,
        service: &NewService,
    ) -> anyhow::Result<ManagementService> {
        let input = serde_json::to_value(service).context("failed to encode service")?;
        self.execute(
            Some(token),
            CREATE_MANAGEMENT_SERVICE,
            json!({ "input": input }),
            "createManagementService",
        )
        .await
    }

    async fn update_service(
        &self,
        token: &str,
        service_id: &str,
        update: &ServiceUpdate,
    ) -> anyhow::Result<ManagementService> {
        let input = serde_json::to_value(update).context("failed to encode service update")?;
        self.execute(
            Some(token),
            UPDATE_MANAGEMENT_SERVICE,
            json!({ "id": service_id, "input": input }),
            "updateManagementService",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_appended_only_when_used() {
        let doc = build_document(BOOKINGS_BY_USER);
        assert!(doc.contains("fragment BookingFields on Booking"));
        assert!(!doc.contains("fragment RatingFields"));

        let doc = build_document(DELETE_RATING);
        assert!(!doc.contains("fragment"));
    }

    #[test]
    fn test_extract_field_returns_data() {
        let body = json!({ "data": { "isFavorite": true } });
        let fav: bool = extract_field(body, "isFavorite").unwrap();
        assert!(fav);
    }

    #[test]
    fn test_extract_field_surfaces_graphql_errors() {
        let body = json!({
            "data": null,
            "errors": [
                { "message": "Time slot already booked" },
                { "message": "Barber unavailable" }
            ]
        });
        let err = extract_field::<bool>(body, "createBooking").unwrap_err();
        assert_eq!(err.to_string(), "Time slot already booked; Barber unavailable");
    }

    #[test]
    fn test_extract_field_missing_data() {
        let body = json!({ "data": {} });
        let err = extract_field::<bool>(body, "deleteRating").unwrap_err();
        assert!(err.to_string().contains("missing deleteRating"));
    }

    #[test]
    fn test_iso_uses_utc_suffix() {
        let dt = DateTime::parse_from_rfc3339("2025-06-16T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(iso(dt), "2025-06-16T14:00:00.000Z");
    }
}

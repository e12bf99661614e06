use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Role};
use crate::services::api::{AppointmentFilter, BookingApi, NewBooking};
use crate::services::authorization::{self, Action, BookingAction, Resource};
use crate::services::cart::{BookingCart, Quote};
use crate::services::policy::EligibilityPolicy;
use crate::session::Session;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingView {
    #[default]
    All,
    Upcoming,
}

/// A booking together with what the viewer may do with it right now.
#[derive(Debug, Clone, Serialize)]
pub struct BookingCard {
    #[serde(flatten)]
    pub booking: Booking,
    pub actions: Vec<BookingAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub action: BookingAction,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub new_start_time: Option<DateTime<Utc>>,
}

/// The updated booking, plus the refreshed list when the refetch worked.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub booking: Booking,
    pub bookings: Option<Vec<BookingCard>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub service_id: String,
    pub service_name: String,
    pub error: String,
}

/// Result of creating one booking per selected service. Bookings created
/// before a failure stay created.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub quote: Quote,
    pub created: Vec<Booking>,
    pub failed: Option<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerQuery {
    pub barber_shop_id: Option<String>,
    pub barber_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl OwnerQuery {
    pub fn filter(&self) -> AppointmentFilter {
        AppointmentFilter {
            barber_shop_id: self.barber_shop_id.clone().filter(|s| !s.is_empty()),
            barber_id: self.barber_id.clone().filter(|s| !s.is_empty()),
            status: self.status,
            start_date: self.start_date.clone().filter(|s| !s.is_empty()),
            end_date: self.end_date.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Rejects a second submission for a key while the first is outstanding.
#[derive(Default)]
pub struct InFlight {
    keys: Mutex<HashSet<String>>,
}

pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl InFlight {
    pub fn acquire(&self, key: &str) -> Result<InFlightGuard<'_>, AppError> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.to_string()) {
            return Err(AppError::Conflict(format!(
                "a request for {key} is already in progress"
            )));
        }
        Ok(InFlightGuard {
            owner: self,
            key: key.to_string(),
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys
            .lock()
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.remove(&self.key);
    }
}

pub struct BookingWorkflow {
    api: Arc<dyn BookingApi>,
    policy: EligibilityPolicy,
    in_flight: InFlight,
}

impl BookingWorkflow {
    pub fn new(api: Arc<dyn BookingApi>, policy: EligibilityPolicy) -> Self {
        Self {
            api,
            policy,
            in_flight: InFlight::default(),
        }
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn cards(&self, role: Role, bookings: Vec<Booking>, now: DateTime<Utc>) -> Vec<BookingCard> {
        bookings
            .into_iter()
            .map(|booking| BookingCard {
                actions: authorization::actions_for(&self.policy, role, &booking, now),
                booking,
            })
            .collect()
    }

    /// Bookings visible to a customer or barber.
    pub async fn fetch(&self, session: &Session, view: BookingView) -> Result<Vec<Booking>, AppError> {
        authorization::authorize(session.role(), Resource::Booking, Action::View)?;

        let token = &session.token;
        let id = session.user_id();
        let result = match (session.role(), view) {
            (Role::Customer, BookingView::All) => self.api.bookings_by_user(token, id).await,
            (Role::Customer, BookingView::Upcoming) => self.api.upcoming_bookings(token, id).await,
            (Role::Barber, BookingView::All) => self.api.bookings_by_barber(token, id).await,
            (Role::Barber, BookingView::Upcoming) => {
                self.api.upcoming_bookings_by_barber(token, id).await
            }
            (Role::Owner, _) => {
                self.api
                    .owner_appointments(token, id, &AppointmentFilter::default())
                    .await
            }
            (Role::Admin, _) => {
                return Err(AppError::Forbidden(
                    "admins have no personal booking list".to_string(),
                ))
            }
        };

        result.map_err(|e| {
            tracing::warn!(error = %e, user_id = id, "failed to load bookings");
            AppError::api(e)
        })
    }

    pub async fn list(
        &self,
        session: &Session,
        view: BookingView,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingCard>, AppError> {
        let bookings = self.fetch(session, view).await?;
        Ok(self.cards(session.role(), bookings, now))
    }

    /// Owner appointments: server-side filters, then search, then one page.
    pub async fn owner_appointments(
        &self,
        session: &Session,
        query: &OwnerQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingCard>, AppError> {
        if session.role() != Role::Owner {
            return Err(AppError::Forbidden("only owners can list shop appointments".to_string()));
        }

        let bookings = self
            .api
            .owner_appointments(&session.token, session.user_id(), &query.filter())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to load owner appointments");
                AppError::api(e)
            })?;

        let matching: Vec<Booking> = match query.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => bookings
                .into_iter()
                .filter(|b| matches_search(b, term))
                .collect(),
            _ => bookings,
        };

        let per_page = query.per_page.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        let page = query.page.unwrap_or(0);
        let paged = matching
            .into_iter()
            .skip(page.saturating_mul(per_page))
            .take(per_page)
            .collect();

        Ok(self.cards(session.role(), paged, now))
    }

    /// Runs one offered action: exactly one mutation, then a refetch.
    ///
    /// The booking is looked up in the caller's own list, so a user can only
    /// act on bookings the API shows them. Nothing is changed locally when the
    /// mutation fails. Once the mutation has succeeded the updated booking is
    /// always returned; a failed refetch only leaves `bookings` empty.
    pub async fn perform(
        &self,
        session: &Session,
        booking_id: &str,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, AppError> {
        let _guard = self.in_flight.acquire(booking_id)?;

        let bookings = self.fetch(session, BookingView::All).await?;
        let booking = bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        let offered = authorization::actions_for(&self.policy, session.role(), booking, now);
        if !offered.contains(&request.action) {
            return Err(AppError::Forbidden(format!(
                "{:?} is not available for this booking",
                request.action
            )));
        }

        let result = match request.action {
            BookingAction::Reschedule => {
                let new_start = request.new_start_time.ok_or_else(|| {
                    AppError::Validation("new_start_time is required to reschedule".to_string())
                })?;
                self.api
                    .reschedule_booking(&session.token, booking_id, new_start)
                    .await
            }
            BookingAction::Cancel => {
                let reason = request
                    .reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation("a reason is required to cancel".to_string())
                    })?;
                self.api
                    .update_booking_status(
                        &session.token,
                        booking_id,
                        BookingStatus::Cancelled,
                        Some(reason),
                    )
                    .await
            }
            action => {
                let status = action
                    .target_status()
                    .ok_or_else(|| AppError::Validation(format!("{action:?} has no target status")))?;
                self.api
                    .update_booking_status(&session.token, booking_id, status, None)
                    .await
            }
        };

        let updated = result.map_err(|e| {
            tracing::warn!(
                error = %e,
                booking_id,
                action = ?request.action,
                "booking action failed"
            );
            AppError::api(e)
        })?;

        tracing::info!(
            booking_id,
            action = ?request.action,
            status = updated.status.as_str(),
            "booking action applied"
        );

        let bookings = match self.list(session, BookingView::All, now).await {
            Ok(cards) => Some(cards),
            Err(e) => {
                tracing::warn!(error = %e, booking_id, "refetch after booking action failed");
                None
            }
        };
        Ok(ActionOutcome {
            booking: updated,
            bookings,
        })
    }

    /// One creation call per service, awaited in order. Stops at the first
    /// failure and keeps what was already created.
    pub async fn create_batch(
        &self,
        session: &Session,
        mut cart: BookingCart,
    ) -> Result<BatchOutcome, AppError> {
        authorization::authorize(session.role(), Resource::Booking, Action::Create)?;
        cart.dedup();
        cart.validate()?;

        let _guard = self.in_flight.acquire(&format!("batch:{}", session.user_id()))?;

        let start_time = cart.start_time()?;
        let barber_id = if cart.barber_id.is_some() {
            cart.resolve_barber(&[])?
        } else {
            let barbers = self
                .api
                .shop_barbers(&session.token, &cart.shop_id)
                .await
                .map_err(AppError::api)?;
            cart.resolve_barber(&barbers)?
        };

        let quote = cart.quote();
        let mut created = Vec::with_capacity(cart.services.len());

        for service in &cart.services {
            let input = NewBooking {
                user_id: session.user_id().to_string(),
                barber_id: barber_id.clone(),
                barber_shop_id: cart.shop_id.clone(),
                management_service_id: service.id.clone(),
                start_time,
                notes: cart.notes.clone(),
            };

            match self.api.create_booking(&session.token, &input).await {
                Ok(booking) => {
                    tracing::info!(booking_id = %booking.id, service_id = %service.id, "booking created");
                    created.push(booking);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        service_id = %service.id,
                        created = created.len(),
                        "booking batch stopped on failure"
                    );
                    return Ok(BatchOutcome {
                        quote,
                        created,
                        failed: Some(BatchFailure {
                            service_id: service.id.clone(),
                            service_name: service.name.clone(),
                            error: format!("{e:#}"),
                        }),
                    });
                }
            }
        }

        Ok(BatchOutcome {
            quote,
            created,
            failed: None,
        })
    }
}

fn matches_search(booking: &Booking, term: &str) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        booking.customer.as_ref().map(|p| p.full_name()).unwrap_or_default(),
        booking.barber.as_ref().map(|p| p.full_name()).unwrap_or_default(),
        booking
            .barber_shop
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_default(),
        booking.service_name(),
    )
    .to_lowercase();
    haystack.contains(&term.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_rejects_duplicates_until_released() {
        let in_flight = InFlight::default();
        let guard = in_flight.acquire("b1").unwrap();
        assert!(in_flight.is_busy("b1"));
        assert!(matches!(in_flight.acquire("b1"), Err(AppError::Conflict(_))));
        assert!(in_flight.acquire("b2").is_ok());

        drop(guard);
        assert!(!in_flight.is_busy("b1"));
        assert!(in_flight.acquire("b1").is_ok());
    }

    #[test]
    fn test_view_parses_lowercase() {
        let view: BookingView = serde_json::from_str("\"upcoming\"").unwrap();
        assert_eq!(view, BookingView::Upcoming);
        assert_eq!(BookingView::default(), BookingView::All);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Role};
use crate::services::policy::EligibilityPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Booking,
    Rating,
    Favorite,
    Shop,
    Service,
    Staff,
    Analytics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

const PERMISSIONS: &[(Role, Resource, &[Action])] = &[
    (Role::Customer, Resource::Booking, &[Action::View, Action::Create]),
    (Role::Customer, Resource::Rating, &[Action::View, Action::Create, Action::Update, Action::Delete]),
    (Role::Customer, Resource::Favorite, &[Action::View, Action::Create, Action::Delete]),
    (Role::Customer, Resource::Shop, &[Action::View]),
    (Role::Customer, Resource::Service, &[Action::View]),
    (Role::Barber, Resource::Booking, &[Action::View]),
    (Role::Barber, Resource::Rating, &[Action::View]),
    (Role::Barber, Resource::Shop, &[Action::View]),
    (Role::Barber, Resource::Service, &[Action::View, Action::Create, Action::Update]),
    (Role::Barber, Resource::Analytics, &[Action::View]),
    (Role::Owner, Resource::Booking, &[Action::View]),
    (Role::Owner, Resource::Rating, &[Action::View]),
    (Role::Owner, Resource::Shop, &[Action::View, Action::Update]),
    (Role::Owner, Resource::Service, &[Action::View]),
    (Role::Owner, Resource::Staff, &[Action::View, Action::Create, Action::Delete]),
    (Role::Owner, Resource::Analytics, &[Action::View]),
    (Role::Admin, Resource::Booking, &[Action::View]),
    (Role::Admin, Resource::Rating, &[Action::View]),
    (Role::Admin, Resource::Shop, &[Action::View]),
    (Role::Admin, Resource::Service, &[Action::View]),
    (Role::Admin, Resource::Staff, &[Action::View]),
    (Role::Admin, Resource::Analytics, &[Action::View]),
];

pub fn is_allowed(role: Role, resource: Resource, action: Action) -> bool {
    PERMISSIONS
        .iter()
        .any(|(r, res, actions)| *r == role && *res == resource && actions.contains(&action))
}

pub fn authorize(role: Role, resource: Resource, action: Action) -> Result<(), AppError> {
    if is_allowed(role, resource, action) {
        Ok(())
    } else {
        tracing::debug!(role = role.as_str(), ?resource, ?action, "denied by authorization table");
        Err(AppError::Forbidden(format!(
            "{} may not {:?} {:?}",
            role.as_str().to_lowercase(),
            action,
            resource
        )))
    }
}

/// Status transitions a user can request on a single booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Start,
    Complete,
    Cancel,
    Reschedule,
}

impl BookingAction {
    /// Status requested from the API; reschedule keeps the current status.
    pub fn target_status(&self) -> Option<BookingStatus> {
        match self {
            BookingAction::Confirm => Some(BookingStatus::Confirmed),
            BookingAction::Start => Some(BookingStatus::InProgress),
            BookingAction::Complete => Some(BookingStatus::Completed),
            BookingAction::Cancel => Some(BookingStatus::Cancelled),
            BookingAction::Reschedule => None,
        }
    }
}

/// Actions offered for a booking. Depends on nothing but these four inputs.
pub fn booking_actions(
    policy: &EligibilityPolicy,
    role: Role,
    status: BookingStatus,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<BookingAction> {
    let mut actions = Vec::new();
    if status.is_terminal() {
        return actions;
    }

    match role {
        Role::Barber => {
            match status {
                BookingStatus::Pending => actions.push(BookingAction::Confirm),
                BookingStatus::Confirmed => actions.push(BookingAction::Start),
                BookingStatus::InProgress => actions.push(BookingAction::Complete),
                _ => {}
            }
            if policy.can_cancel_at(status, start_time, now) {
                actions.push(BookingAction::Cancel);
            }
        }
        Role::Customer => {
            if policy.can_cancel_at(status, start_time, now) {
                actions.push(BookingAction::Cancel);
            }
            if policy.can_reschedule_at(status, start_time, now) {
                actions.push(BookingAction::Reschedule);
            }
        }
        Role::Owner | Role::Admin => {}
    }

    actions
}

pub fn actions_for(
    policy: &EligibilityPolicy,
    role: Role,
    booking: &Booking,
    now: DateTime<Utc>,
) -> Vec<BookingAction> {
    booking_actions(policy, role, booking.status, booking.start_time, now)
}

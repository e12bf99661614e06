pub mod analytics;
pub mod bookings;
pub mod catalog;
pub mod favorites;
pub mod health;
pub mod ratings;
pub mod session;
pub mod staff;

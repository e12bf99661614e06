pub mod analytics;
pub mod api;
pub mod authorization;
pub mod bookings;
pub mod cart;
pub mod policy;

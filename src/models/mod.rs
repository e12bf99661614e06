pub mod booking;
pub mod favorite;
pub mod rating;
pub mod service;
pub mod shop;
pub mod user;

pub use booking::{Booking, BookingStatus, PersonRef, ServiceSnapshot, ShopBarber, ShopRef};
pub use favorite::Favorite;
pub use rating::{NewRating, RatedType, Rating};
pub use service::{ManagementService, NewService, ServiceUpdate};
pub use shop::{Shop, ShopUpdate};
pub use user::{Role, User};

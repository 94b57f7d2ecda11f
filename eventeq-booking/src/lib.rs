pub mod clock;
pub mod dates;
pub mod error;
pub mod lifecycle;
pub mod listing;
pub mod models;
pub mod payment;
pub mod refresh;
pub mod repository;
pub mod request;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::BookingError;
pub use models::{Booking, BookingStatus, Feedback, LineItem, PaymentRecord, StatusChange};
pub use repository::{BookingFilter, BookingRepository, InMemoryBookingRepository};
pub use service::{BookingService, ServiceConfig};

pub mod api;
pub mod error;
pub mod state;
pub mod telemetry;

pub use api::BookingApi;
pub use error::AppError;
pub use state::AppState;

pub mod manager;
pub mod memory;
pub mod notification;
pub mod orchestrator;
pub mod request;
pub mod sandbox;

pub use manager::{ReservationQuote, ReservationRules, ReservationService};
pub use memory::InMemoryReservationStore;
pub use notification::{NotificationConfig, NotificationDispatcher, NotificationError};
pub use orchestrator::{ChargeResult, PaymentOrchestrator};
pub use request::{AddOnSelection, CreateReservationRequest, ServiceRequest};
pub use sandbox::SandboxGateway;

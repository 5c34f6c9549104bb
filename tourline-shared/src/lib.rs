pub mod models;
pub mod pii;

pub use models::money::Money;
pub use pii::Masked;

pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod distance_matrix;
pub mod events;
pub mod mailer;
pub mod redis_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use catalog_repo::StoreCatalogRepository;
pub use database::DbClient;
pub use distance_matrix::DistanceMatrixClient;
pub use events::EventProducer;
pub use mailer::SmtpMailer;
pub use redis_repo::RedisRouteCache;
pub use reservation_repo::StoreReservationRepository;

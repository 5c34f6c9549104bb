pub mod pricing;
pub mod routing;
pub mod static_catalog;

pub use pricing::{PriceQuote, PriceQuoteEngine, QuoteBasis, QuoteError};
pub use routing::{MemoryRouteCache, ResolverConfig, RouteDistanceResolver};
pub use static_catalog::StaticCatalog;

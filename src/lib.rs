pub mod recognition;
pub mod models;
pub mod my_utils;
pub mod config;
pub mod error;
pub mod wasm;

pub use config::{Config, CONFIG};
pub use error::{DetectionError, DetectionResult};
pub use models::catalog::{CatalogEntry, CatalogLookup, InMemoryCatalog};
pub use models::fingerprint::{Distance, DistanceMetric, Fingerprint};
pub use models::match_result::{Identification, MatchResult};
pub use models::variant::Variant;
pub use recognition::engine::{identify, Engine};

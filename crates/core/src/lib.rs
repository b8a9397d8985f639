pub mod error;
pub mod ids;
pub mod model;
pub mod rank;

pub use error::CoreError;
pub use ids::*;
pub use model::{Client, FeatureRequest, ProductArea};
pub use rank::Rank;

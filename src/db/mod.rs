pub mod history;
pub mod postgres;

pub use history::{PgRecommendationStore, RecommendationStore};
pub use postgres::create_pool;

pub mod catalog;
pub mod classifier;
pub mod encoding;
pub mod model_store;
pub mod scorer;

pub use catalog::Catalog;
pub use model_store::{load_or_build, ScorerHandle, ScorerProvider};
pub use scorer::{Scorer, ScorerError, TrainedModel};

mod conditions;
mod crop;
mod recommendation;

pub use conditions::{CategoricalField, FarmConditions};
pub use crop::{CatalogFilter, CropDetails, CropProfile, Range};
pub use recommendation::{
    NewRecommendationRecord, Recommendation, RecommendationRecord, RecommendationSet,
};

#[cfg(test)]
pub(crate) use conditions::rice_conditions;
#[cfg(test)]
pub(crate) use crop::sample_profile;

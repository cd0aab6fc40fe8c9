use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CategoricalField, FarmConditions, Recommendation, RecommendationSet};

use super::{
    catalog::Catalog,
    classifier::{KernelClassifier, TrainingError},
    encoding::{FeatureVector, Vocabulary},
};

/// Maximum number of crops returned per request
pub const TOP_N: usize = 5;

/// Error types for the recommendation scorer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScorerError {
    #[error("Unknown {field} value '{value}'")]
    UnknownCategory {
        field: CategoricalField,
        value: String,
    },
    #[error("Classifier label '{0}' has no catalog entry")]
    CatalogMismatch(String),
}

/// Fitted classifier plus the vocabulary it was trained with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub vocabulary: Vocabulary,
    pub classifier: KernelClassifier,
}

impl TrainedModel {
    /// Trains on one midpoint sample per catalog crop
    pub fn train(catalog: &Catalog, bandwidth: f64) -> Result<Self, TrainingError> {
        let vocabulary = Vocabulary::from_catalog(catalog);
        let samples = training_samples(catalog, &vocabulary)?;
        let classifier = KernelClassifier::fit(&samples, bandwidth)?;

        tracing::debug!(
            classes = classifier.classes().len(),
            bandwidth,
            "Trained crop recommendation model"
        );

        Ok(Self {
            vocabulary,
            classifier,
        })
    }

    /// Whether this model could have been trained from `catalog`
    ///
    /// Labels must equal catalog names in catalog order, the vocabulary must
    /// equal the one the catalog produces, and the stored training points must
    /// equal the catalog's current range midpoints.
    pub fn is_consistent_with(&self, catalog: &Catalog) -> bool {
        if !self.classifier.classes().iter().map(String::as_str).eq(catalog.names())
            || self.vocabulary != Vocabulary::from_catalog(catalog)
        {
            return false;
        }

        training_samples(catalog, &self.vocabulary)
            .map(|samples| self.classifier.matches_samples(&samples))
            .unwrap_or(false)
    }
}

/// One midpoint sample per catalog crop, in catalog order
fn training_samples(
    catalog: &Catalog,
    vocabulary: &Vocabulary,
) -> Result<Vec<(String, FeatureVector)>, TrainingError> {
    catalog
        .crops()
        .iter()
        .map(|crop| {
            let features = vocabulary
                .encode_profile(crop)
                .map_err(|e| TrainingError::Encoding {
                    label: crop.name.clone(),
                    reason: e.to_string(),
                })?;
            Ok((crop.name.clone(), features))
        })
        .collect()
}

/// Ranks catalog crops for a set of farm conditions
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct Scorer {
    catalog: Arc<Catalog>,
    model: TrainedModel,
}

impl Scorer {
    pub fn new(catalog: Arc<Catalog>, model: TrainedModel) -> Self {
        Self { catalog, model }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Returns up to [`TOP_N`] crops ranked by classifier confidence
    ///
    /// Ties are broken by catalog order. Either every selected label resolves
    /// to a catalog row or the whole call fails.
    pub fn recommend(&self, conditions: &FarmConditions) -> Result<RecommendationSet, ScorerError> {
        let features = self.model.vocabulary.encode_conditions(conditions)?;
        let probabilities = self.model.classifier.predict_proba(&features);
        let classes = self.model.classifier.classes();

        let mut ranked: Vec<usize> = (0..probabilities.len()).collect();
        // Stable sort keeps class (catalog) order among equal probabilities
        ranked.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

        let recommendations = ranked
            .into_iter()
            .take(TOP_N)
            .map(|class| {
                let label = &classes[class];
                let crop = self
                    .catalog
                    .get(label)
                    .ok_or_else(|| ScorerError::CatalogMismatch(label.clone()))?;
                let confidence = probabilities[class];

                Ok(Recommendation {
                    crop_name: crop.name.clone(),
                    confidence,
                    yield_per_hectare: crop.yield_per_hectare,
                    market_price: crop.market_price,
                    water_requirement: crop.water_requirement.clone(),
                    season: crop.season.clone(),
                    suitability_score: confidence * 100.0,
                })
            })
            .collect::<Result<Vec<_>, ScorerError>>()?;

        tracing::debug!(
            top = recommendations.first().map(|r| r.crop_name.as_str()),
            returned = recommendations.len(),
            "Scored farm conditions"
        );

        Ok(RecommendationSet {
            recommendations,
            input_parameters: conditions.clone(),
            total_crops_analyzed: classes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{rice_conditions, sample_profile};

    fn embedded_scorer() -> Scorer {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let model = TrainedModel::train(&catalog, 1.0).unwrap();
        Scorer::new(catalog, model)
    }

    fn conditions_for(catalog: &Catalog, name: &str) -> FarmConditions {
        let crop = catalog.get(name).unwrap();
        FarmConditions {
            temperature: crop.temperature.midpoint(),
            humidity: crop.humidity.midpoint(),
            ph: crop.ph.midpoint(),
            rainfall: crop.rainfall.midpoint(),
            soil_type: crop.soil_type.clone(),
            season: crop.season.clone(),
            region: crop.region.clone(),
            water_requirement: crop.water_requirement.clone(),
        }
    }

    #[test]
    fn test_rice_conditions_rank_rice_first() {
        let result = embedded_scorer().recommend(&rice_conditions()).unwrap();
        assert_eq!(result.recommendations[0].crop_name, "Rice");
        assert!(result.recommendations[0].confidence > 0.9);
        assert_eq!(result.total_crops_analyzed, 18);
        assert_eq!(result.input_parameters, rice_conditions());
    }

    #[test]
    fn test_results_are_bounded_and_sorted() {
        let scorer = embedded_scorer();
        for name in ["Rice", "Wheat", "Spinach", "Pomegranate"] {
            let conditions = conditions_for(scorer.catalog(), name);
            let result = scorer.recommend(&conditions).unwrap();
            let recs = &result.recommendations;
            assert!((1..=TOP_N).contains(&recs.len()));
            assert!(recs.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        }
    }

    #[test]
    fn test_fields_copied_from_catalog() {
        let scorer = embedded_scorer();
        let result = scorer.recommend(&rice_conditions()).unwrap();
        for rec in &result.recommendations {
            let crop = scorer.catalog().get(&rec.crop_name).unwrap();
            assert_eq!(rec.yield_per_hectare, crop.yield_per_hectare);
            assert_eq!(rec.market_price, crop.market_price);
            assert_eq!(rec.season, crop.season);
            assert_eq!(rec.water_requirement, crop.water_requirement);
            assert_eq!(rec.suitability_score, rec.confidence * 100.0);
            assert!((0.0..=1.0).contains(&rec.confidence));
        }
    }

    #[test]
    fn test_exact_profile_match_ranks_own_crop_first() {
        let scorer = embedded_scorer();
        let result = scorer
            .recommend(&conditions_for(scorer.catalog(), "Wheat"))
            .unwrap();
        assert_eq!(result.recommendations[0].crop_name, "Wheat");
    }

    #[test]
    fn test_ties_follow_catalog_order() {
        // Cabbage and Cauliflower share an identical profile; Cabbage comes first
        let scorer = embedded_scorer();
        let result = scorer
            .recommend(&conditions_for(scorer.catalog(), "Cabbage"))
            .unwrap();
        let names: Vec<&str> = result
            .recommendations
            .iter()
            .map(|r| r.crop_name.as_str())
            .collect();
        assert_eq!(&names[..2], &["Cabbage", "Cauliflower"]);
        assert_eq!(
            result.recommendations[0].confidence,
            result.recommendations[1].confidence
        );
    }

    #[test]
    fn test_unknown_soil_type_fails_whole_request() {
        let mut conditions = rice_conditions();
        conditions.soil_type = "sandy".to_string();
        let err = embedded_scorer().recommend(&conditions).unwrap_err();
        assert_eq!(
            err,
            ScorerError::UnknownCategory {
                field: CategoricalField::SoilType,
                value: "sandy".to_string(),
            }
        );
        assert_eq!(err.to_string(), "Unknown soil_type value 'sandy'");
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let scorer = embedded_scorer();
        let first = scorer.recommend(&rice_conditions()).unwrap();
        let second = scorer.recommend(&rice_conditions()).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_small_catalog_returns_fewer_than_top_n() {
        let mut maize = sample_profile("Maize");
        maize.soil_type = "loamy".to_string();
        let catalog = Arc::new(Catalog::new(vec![sample_profile("Rice"), maize]).unwrap());
        let model = TrainedModel::train(&catalog, 1.0).unwrap();
        let result = Scorer::new(catalog, model).recommend(&rice_conditions()).unwrap();
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.total_crops_analyzed, 2);
    }

    #[test]
    fn test_label_missing_from_catalog_is_mismatch() {
        let full = Catalog::embedded().unwrap();
        let model = TrainedModel::train(&full, 1.0).unwrap();
        let without_rice: Vec<_> = full
            .crops()
            .iter()
            .filter(|c| c.name != "Rice")
            .cloned()
            .collect();
        let skewed = Arc::new(Catalog::new(without_rice).unwrap());

        let err = Scorer::new(skewed, model)
            .recommend(&rice_conditions())
            .unwrap_err();
        assert_eq!(err, ScorerError::CatalogMismatch("Rice".to_string()));
    }

    #[test]
    fn test_model_consistency_check() {
        let catalog = Catalog::embedded().unwrap();
        let model = TrainedModel::train(&catalog, 1.0).unwrap();
        assert!(model.is_consistent_with(&catalog));

        let reordered: Vec<_> = catalog.crops().iter().rev().cloned().collect();
        assert!(!model.is_consistent_with(&Catalog::new(reordered).unwrap()));
    }

    #[test]
    fn test_edited_ranges_break_consistency() {
        let catalog = Catalog::embedded().unwrap();
        let model = TrainedModel::train(&catalog, 1.0).unwrap();

        let edited: Vec<_> = catalog
            .crops()
            .iter()
            .cloned()
            .map(|mut crop| {
                if crop.name == "Rice" {
                    crop.rainfall.max = 2500.0;
                }
                crop
            })
            .collect();
        assert!(!model.is_consistent_with(&Catalog::new(edited).unwrap()));
    }
}

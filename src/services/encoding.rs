use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    models::{CategoricalField, CropProfile, FarmConditions},
    services::{catalog::Catalog, scorer::ScorerError},
};

pub const FEATURE_COUNT: usize = 8;

/// `[temperature, humidity, ph, rainfall, soil, season, region, water]`
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Categorical value to integer code mapping, one table per field
///
/// Codes follow lexicographic order of the distinct values seen in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    soil_type: BTreeMap<String, u32>,
    season: BTreeMap<String, u32>,
    region: BTreeMap<String, u32>,
    water_requirement: BTreeMap<String, u32>,
}

impl Vocabulary {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let codes_for = |field: CategoricalField| -> BTreeMap<String, u32> {
            let distinct: BTreeSet<&str> = catalog
                .crops()
                .iter()
                .map(|crop| profile_value(crop, field))
                .collect();
            distinct
                .into_iter()
                .enumerate()
                .map(|(code, value)| (value.to_string(), code as u32))
                .collect()
        };

        Self {
            soil_type: codes_for(CategoricalField::SoilType),
            season: codes_for(CategoricalField::Season),
            region: codes_for(CategoricalField::Region),
            water_requirement: codes_for(CategoricalField::WaterRequirement),
        }
    }

    fn table(&self, field: CategoricalField) -> &BTreeMap<String, u32> {
        match field {
            CategoricalField::SoilType => &self.soil_type,
            CategoricalField::Season => &self.season,
            CategoricalField::Region => &self.region,
            CategoricalField::WaterRequirement => &self.water_requirement,
        }
    }

    pub fn code(&self, field: CategoricalField, value: &str) -> Result<u32, ScorerError> {
        self.table(field)
            .get(value)
            .copied()
            .ok_or_else(|| ScorerError::UnknownCategory {
                field,
                value: value.to_string(),
            })
    }

    /// Checks every categorical input without encoding the measurements
    pub fn check_categories(&self, conditions: &FarmConditions) -> Result<(), ScorerError> {
        self.encode_categoricals(|field| conditions.categorical(field)).map(|_| ())
    }

    /// Encodes caller conditions, failing on the first unknown categorical value
    pub fn encode_conditions(&self, conditions: &FarmConditions) -> Result<FeatureVector, ScorerError> {
        let codes = self.encode_categoricals(|field| conditions.categorical(field))?;
        Ok([
            conditions.temperature,
            conditions.humidity,
            conditions.ph,
            conditions.rainfall,
            codes[0],
            codes[1],
            codes[2],
            codes[3],
        ])
    }

    /// Encodes a catalog row as a training point using range midpoints
    pub fn encode_profile(&self, crop: &CropProfile) -> Result<FeatureVector, ScorerError> {
        let codes = self.encode_categoricals(|field| profile_value(crop, field))?;
        Ok([
            crop.temperature.midpoint(),
            crop.humidity.midpoint(),
            crop.ph.midpoint(),
            crop.rainfall.midpoint(),
            codes[0],
            codes[1],
            codes[2],
            codes[3],
        ])
    }

    fn encode_categoricals<'a>(
        &self,
        value_of: impl Fn(CategoricalField) -> &'a str,
    ) -> Result<[f64; 4], ScorerError> {
        let mut codes = [0.0; 4];
        for (slot, field) in codes.iter_mut().zip(CategoricalField::ALL) {
            *slot = f64::from(self.code(field, value_of(field))?);
        }
        Ok(codes)
    }
}

fn profile_value(crop: &CropProfile, field: CategoricalField) -> &str {
    match field {
        CategoricalField::SoilType => &crop.soil_type,
        CategoricalField::Season => &crop.season,
        CategoricalField::Region => &crop.region,
        CategoricalField::WaterRequirement => &crop.water_requirement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rice_conditions;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_catalog(&Catalog::embedded().unwrap())
    }

    #[test]
    fn test_codes_are_lexicographic() {
        let vocab = vocabulary();
        assert_eq!(vocab.code(CategoricalField::SoilType, "clay").unwrap(), 0);
        assert_eq!(vocab.code(CategoricalField::SoilType, "loamy").unwrap(), 1);
        assert_eq!(vocab.code(CategoricalField::WaterRequirement, "high").unwrap(), 0);
        assert_eq!(vocab.code(CategoricalField::WaterRequirement, "medium").unwrap(), 1);
        assert_eq!(vocab.code(CategoricalField::Season, "kharif").unwrap(), 0);
        assert_eq!(vocab.code(CategoricalField::Season, "rabi").unwrap(), 1);
    }

    #[test]
    fn test_encode_conditions_layout() {
        let features = vocabulary().encode_conditions(&rice_conditions()).unwrap();
        assert_eq!(features, [28.0, 75.0, 6.2, 1200.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_profile_uses_midpoints() {
        let catalog = Catalog::embedded().unwrap();
        let vocab = Vocabulary::from_catalog(&catalog);
        let wheat = catalog.get("Wheat").unwrap();
        let features = vocab.encode_profile(wheat).unwrap();
        assert_eq!(features, [20.0, 60.0, 6.75, 650.0, 1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_value_names_field() {
        let mut conditions = rice_conditions();
        conditions.region = "south".to_string();
        let err = vocabulary().encode_conditions(&conditions).unwrap_err();
        assert_eq!(
            err,
            ScorerError::UnknownCategory {
                field: CategoricalField::Region,
                value: "south".to_string(),
            }
        );
    }

    #[test]
    fn test_first_unknown_field_wins() {
        let mut conditions = rice_conditions();
        conditions.soil_type = "sandy".to_string();
        conditions.season = "zaid".to_string();
        let err = vocabulary().encode_conditions(&conditions).unwrap_err();
        assert!(matches!(
            err,
            ScorerError::UnknownCategory { field: CategoricalField::SoilType, .. }
        ));
    }

    #[test]
    fn test_check_categories_ignores_measurements() {
        let mut conditions = rice_conditions();
        conditions.humidity = f64::NAN;
        assert!(vocabulary().check_categories(&conditions).is_ok());

        conditions.water_requirement = "extreme".to_string();
        assert!(matches!(
            vocabulary().check_categories(&conditions),
            Err(ScorerError::UnknownCategory { field: CategoricalField::WaterRequirement, .. })
        ));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let mut conditions = rice_conditions();
        conditions.soil_type = "Clay".to_string();
        assert!(vocabulary().encode_conditions(&conditions).is_err());
    }
}

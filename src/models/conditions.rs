use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The four categorical inputs, in feature-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    SoilType,
    Season,
    Region,
    WaterRequirement,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::SoilType,
        CategoricalField::Season,
        CategoricalField::Region,
        CategoricalField::WaterRequirement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalField::SoilType => "soil_type",
            CategoricalField::Season => "season",
            CategoricalField::Region => "region",
            CategoricalField::WaterRequirement => "water_requirement",
        }
    }
}

impl Display for CategoricalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Farm conditions supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
    pub soil_type: String,
    pub season: String,
    pub region: String,
    pub water_requirement: String,
}

impl FarmConditions {
    /// Returns the caller's selection for a categorical field
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::SoilType => &self.soil_type,
            CategoricalField::Season => &self.season,
            CategoricalField::Region => &self.region,
            CategoricalField::WaterRequirement => &self.water_requirement,
        }
    }

    /// Checks that the measurements are physically plausible
    ///
    /// Categorical values are not checked here; they are validated against the
    /// trained vocabulary by the scorer.
    pub fn validate_measurements(&self) -> Result<(), String> {
        let measurements = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("ph", self.ph),
            ("rainfall", self.rainfall),
        ];
        for (name, value) in measurements {
            if !value.is_finite() {
                return Err(format!("{} must be a finite number", name));
            }
        }

        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(format!("humidity must be between 0 and 100, got {}", self.humidity));
        }
        if !(0.0..=14.0).contains(&self.ph) {
            return Err(format!("ph must be between 0 and 14, got {}", self.ph));
        }
        if self.rainfall < 0.0 {
            return Err(format!("rainfall cannot be negative, got {}", self.rainfall));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn rice_conditions() -> FarmConditions {
    FarmConditions {
        temperature: 28.0,
        humidity: 75.0,
        ph: 6.2,
        rainfall: 1200.0,
        soil_type: "clay".to_string(),
        season: "kharif".to_string(),
        region: "north".to_string(),
        water_requirement: "high".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorical_field_names() {
        let names: Vec<&str> = CategoricalField::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec!["soil_type", "season", "region", "water_requirement"]);
        assert_eq!(
            serde_json::to_string(&CategoricalField::WaterRequirement).unwrap(),
            r#""water_requirement""#
        );
    }

    #[test]
    fn test_categorical_accessor() {
        let conditions = rice_conditions();
        assert_eq!(conditions.categorical(CategoricalField::SoilType), "clay");
        assert_eq!(conditions.categorical(CategoricalField::WaterRequirement), "high");
    }

    #[test]
    fn test_validate_measurements_accepts_typical_input() {
        assert!(rice_conditions().validate_measurements().is_ok());
    }

    #[test]
    fn test_validate_measurements_rejects_out_of_range() {
        let mut conditions = rice_conditions();
        conditions.ph = 15.0;
        let err = conditions.validate_measurements().unwrap_err();
        assert!(err.contains("ph"));

        let mut conditions = rice_conditions();
        conditions.rainfall = -1.0;
        assert!(conditions.validate_measurements().is_err());

        let mut conditions = rice_conditions();
        conditions.temperature = f64::INFINITY;
        assert!(conditions.validate_measurements().is_err());
    }
}

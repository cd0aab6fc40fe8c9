use serde::{Deserialize, Serialize};

/// Inclusive numeric range accepted by a crop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Representative training value for the range
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Formats the range as `min-max` followed by a unit suffix
    pub fn display_with_unit(&self, unit: &str) -> String {
        format!("{}-{}{}", self.min, self.max, unit)
    }
}

/// Static reference record for a single crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    pub temperature: Range,
    pub humidity: Range,
    pub ph: Range,
    pub rainfall: Range,
    pub soil_type: String,
    pub season: String,
    pub region: String,
    pub water_requirement: String,
    pub yield_per_hectare: f64,
    pub market_price: f64,
}

/// Growing information for a crop, with ranges rendered for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropDetails {
    pub crop_name: String,
    pub temperature_range: String,
    pub humidity_range: String,
    pub ph_range: String,
    pub rainfall_range: String,
    pub soil_type: String,
    pub season: String,
    pub region: String,
    pub water_requirement: String,
    pub yield_per_hectare: f64,
    pub market_price: f64,
}

impl From<&CropProfile> for CropDetails {
    fn from(crop: &CropProfile) -> Self {
        Self {
            crop_name: crop.name.clone(),
            temperature_range: crop.temperature.display_with_unit("°C"),
            humidity_range: crop.humidity.display_with_unit("%"),
            ph_range: crop.ph.display_with_unit(""),
            rainfall_range: crop.rainfall.display_with_unit("mm"),
            soil_type: crop.soil_type.clone(),
            season: crop.season.clone(),
            region: crop.region.clone(),
            water_requirement: crop.water_requirement.clone(),
            yield_per_hectare: crop.yield_per_hectare,
            market_price: crop.market_price,
        }
    }
}

/// Optional exact-match filters for catalog listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    pub season: Option<String>,
    pub soil_type: Option<String>,
    pub water_requirement: Option<String>,
}

impl CatalogFilter {
    pub fn matches(&self, crop: &CropProfile) -> bool {
        fn field_matches(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |wanted| wanted == value)
        }

        field_matches(&self.season, &crop.season)
            && field_matches(&self.soil_type, &crop.soil_type)
            && field_matches(&self.water_requirement, &crop.water_requirement)
    }
}

#[cfg(test)]
pub(crate) fn sample_profile(name: &str) -> CropProfile {
    CropProfile {
        name: name.to_string(),
        temperature: Range::new(20.0, 35.0),
        humidity: Range::new(60.0, 90.0),
        ph: Range::new(5.5, 7.5),
        rainfall: Range::new(1000.0, 3000.0),
        soil_type: "clay".to_string(),
        season: "kharif".to_string(),
        region: "north".to_string(),
        water_requirement: "high".to_string(),
        yield_per_hectare: 4.5,
        market_price: 3500.0,
    }
}

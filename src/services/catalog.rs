use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogFilter, CropDetails, CropProfile},
};

/// Crop table compiled into the binary, used when no catalog file is configured
const EMBEDDED_CATALOG: &str = include_str!("../../data/crops.json");

/// Error types for catalog loading
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Catalog contains no crops")]
    Empty,
    #[error("Crop '{0}' appears more than once in the catalog")]
    DuplicateCrop(String),
    #[error("Crop '{name}' is invalid: {reason}")]
    InvalidCrop { name: String, reason: String },
}

/// Immutable reference table of crop profiles
///
/// Insertion order is preserved and is the tie-break order for ranking.
#[derive(Debug, Clone)]
pub struct Catalog {
    crops: Vec<CropProfile>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog, rejecting empty tables, duplicate names and malformed rows
    pub fn new(crops: Vec<CropProfile>) -> Result<Self, CatalogError> {
        if crops.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(crops.len());
        for (position, crop) in crops.iter().enumerate() {
            validate_crop(crop)?;
            if index.insert(crop.name.clone(), position).is_some() {
                return Err(CatalogError::DuplicateCrop(crop.name.clone()));
            }
        }

        Ok(Self { crops, index })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let crops: Vec<CropProfile> = serde_json::from_str(json)?;
        Self::new(crops)
    }

    /// The default crop table shipped with the service
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Loads the catalog from `path`, or the embedded table when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            let catalog = Self::embedded()?;
            tracing::info!(crops = catalog.len(), "Loaded embedded crop catalog");
            return Ok(catalog);
        };

        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            crops = catalog.len(),
            "Loaded crop catalog from file"
        );
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&CropProfile> {
        self.index.get(name).map(|&i| &self.crops[i])
    }

    pub fn crops(&self) -> &[CropProfile] {
        &self.crops
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.crops.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }

    /// Crops matching every set filter, in catalog order
    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&CropProfile> {
        self.crops.iter().filter(|c| filter.matches(c)).collect()
    }

    /// Detail view of a single crop by exact name
    pub fn details(&self, name: &str) -> AppResult<CropDetails> {
        self.get(name)
            .map(CropDetails::from)
            .ok_or_else(|| AppError::NotFound(format!("Crop '{}' not found", name)))
    }
}

fn validate_crop(crop: &CropProfile) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidCrop {
        name: crop.name.clone(),
        reason,
    };

    if crop.name.trim().is_empty() {
        return Err(invalid("name is empty".to_string()));
    }

    let ranges = [
        ("temperature", &crop.temperature),
        ("humidity", &crop.humidity),
        ("ph", &crop.ph),
        ("rainfall", &crop.rainfall),
    ];
    for (field, range) in ranges {
        if !range.is_valid() {
            return Err(invalid(format!(
                "{} range {}..{} is not a finite ascending range",
                field, range.min, range.max
            )));
        }
    }

    if !crop.yield_per_hectare.is_finite() || !crop.market_price.is_finite() {
        return Err(invalid("economic metrics must be finite".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_profile, Range};

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.len(), 18);
        assert_eq!(catalog.crops()[0].name, "Rice");
        assert_eq!(catalog.names().last(), Some("Pomegranate"));
    }

    #[test]
    fn test_get_is_exact_match() {
        let catalog = Catalog::embedded().unwrap();
        assert!(catalog.get("Rice").is_some());
        assert!(catalog.get("rice").is_none());
        assert!(catalog.get("Quinoa").is_none());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(Catalog::new(vec![]), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_duplicate_crop_rejected() {
        let result = Catalog::new(vec![sample_profile("Rice"), sample_profile("Rice")]);
        assert!(matches!(result, Err(CatalogError::DuplicateCrop(name)) if name == "Rice"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut crop = sample_profile("Rice");
        crop.ph = Range::new(7.5, 5.5);
        let result = Catalog::new(vec![crop]);
        assert!(matches!(result, Err(CatalogError::InvalidCrop { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Catalog::from_json("[{\"name\": \"Rice\"}]"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("farmer-api-missing-catalog.json");
        assert!(matches!(
            Catalog::load(Some(&path)),
            Err(CatalogError::Io { .. })
        ));
    }

    #[test]
    fn test_filter_by_season_and_water() {
        let catalog = Catalog::embedded().unwrap();
        let filter = CatalogFilter {
            season: Some("rabi".to_string()),
            water_requirement: Some("high".to_string()),
            ..Default::default()
        };
        let names: Vec<&str> = catalog
            .filter(&filter)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Spinach"]);
    }

    #[test]
    fn test_details_not_found() {
        let catalog = Catalog::embedded().unwrap();
        assert!(matches!(catalog.details("Quinoa"), Err(AppError::NotFound(_))));
        assert_eq!(catalog.details("Wheat").unwrap().rainfall_range, "300-1000mm");
    }
}

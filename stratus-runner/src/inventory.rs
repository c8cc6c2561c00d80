//! Model directory inventory
//!
//! The application loads, per city, `model_info_<City>.json` and a random
//! forest plus scaler for each forecast target. A city missing some of
//! those files still loads, minus the affected targets, so gaps are
//! reported as warnings and never block a sync.

use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Forecast targets each city directory is expected to carry
pub const TARGETS: [&str; 4] = ["temperature", "humidity", "pressure", "wind_speed"];

/// Inventory of one city directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityModels {
    pub city: String,
    pub has_info: bool,
    /// Expected files that are absent, relative to the city directory
    pub missing: Vec<String>,
}

impl CityModels {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Inventory of a whole models directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelInventory {
    pub cities: Vec<CityModels>,
}

impl ModelInventory {
    /// Scans `root` for city subdirectories
    pub fn scan(root: &Path) -> Result<Self> {
        let mut cities = Vec::new();

        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let city = entry.file_name().to_string_lossy().to_string();
            cities.push(inspect_city(&entry.path(), &city));
        }

        cities.sort_by(|a, b| a.city.cmp(&b.city));
        debug!("Scanned {} city model set(s) in {}", cities.len(), root.display());
        Ok(Self { cities })
    }

    pub fn complete_count(&self) -> usize {
        self.cities.iter().filter(|c| c.is_complete()).count()
    }

    /// One warning per incomplete city, plus one if there are no cities at all
    pub fn warnings(&self) -> Vec<String> {
        if self.cities.is_empty() {
            return vec!["models directory contains no city model sets".to_string()];
        }

        self.cities
            .iter()
            .filter(|c| !c.is_complete())
            .map(|c| {
                format!(
                    "models/{}: missing {} (affected forecasts will be unavailable)",
                    c.city,
                    c.missing.join(", ")
                )
            })
            .collect()
    }
}

fn inspect_city(dir: &Path, city: &str) -> CityModels {
    let info_file = format!("model_info_{}.json", city);
    let has_info = dir.join(&info_file).is_file();

    let mut missing = Vec::new();
    if !has_info {
        missing.push(info_file);
    }

    for target in TARGETS {
        for file in [
            format!("{}_rf.joblib", target),
            format!("{}_scaler.joblib", target),
        ] {
            if !dir.join(&file).is_file() {
                missing.push(file);
            }
        }
    }

    CityModels {
        city: city.to_string(),
        has_info,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scratch_dir;
    use std::fs;

    fn write_city(root: &Path, city: &str, targets: &[&str]) {
        let dir = root.join(city);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("model_info_{}.json", city)), "{}").unwrap();
        for target in targets {
            fs::write(dir.join(format!("{}_rf.joblib", target)), b"rf").unwrap();
            fs::write(dir.join(format!("{}_scaler.joblib", target)), b"sc").unwrap();
        }
    }

    #[test]
    fn test_complete_and_partial_cities() {
        let root = scratch_dir();
        write_city(&root, "Mumbai", &TARGETS);
        write_city(&root, "New Delhi", &["temperature", "humidity"]);
        fs::write(root.join("README.txt"), "not a city").unwrap();

        let inventory = ModelInventory::scan(&root).unwrap();
        assert_eq!(inventory.cities.len(), 2);
        assert_eq!(inventory.complete_count(), 1);

        let warnings = inventory.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("models/New Delhi: missing pressure_rf.joblib"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_model_info() {
        let root = scratch_dir();
        let dir = root.join("Chennai");
        fs::create_dir_all(&dir).unwrap();

        let inventory = ModelInventory::scan(&root).unwrap();
        let city = &inventory.cities[0];
        assert!(!city.has_info);
        assert_eq!(city.missing.len(), 1 + TARGETS.len() * 2);
        assert_eq!(city.missing[0], "model_info_Chennai.json");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_empty_models_dir() {
        let root = scratch_dir();
        fs::create_dir_all(&root).unwrap();

        let inventory = ModelInventory::scan(&root).unwrap();
        assert_eq!(inventory.warnings().len(), 1);

        fs::remove_dir_all(&root).unwrap();
    }
}

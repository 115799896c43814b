//! Dataset registry: loads the built-in dataset definitions from embedded
//! TOML configs.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::dataset::{DatasetDefinition, parse_dataset_toml};

/// TOML configs embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[
    (
        "nyc_collisions",
        include_str!("../datasets/nyc_collisions.toml"),
    ),
    (
        "nyc_collisions_api",
        include_str!("../datasets/nyc_collisions_api.toml"),
    ),
];

/// Identifier of the dataset used when none is configured.
pub const DEFAULT_DATASET_ID: &str = "nyc_collisions";

/// Returns all built-in dataset definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed (the configs ship with
/// the binary, so this is covered by the tests below).
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a built-in dataset by id.
#[must_use]
pub fn find_dataset(id: &str) -> Option<DatasetDefinition> {
    all_datasets().into_iter().find(|d| d.id() == id)
}

#[cfg(test)]
mod tests {
    use crash_report_record_models::VEHICLE_SLOTS;

    use super::*;

    #[test]
    fn loads_all_datasets() {
        assert_eq!(all_datasets().len(), DATASET_TOMLS.len());
    }

    #[test]
    fn dataset_ids_are_unique_and_match_file_names() {
        let datasets = all_datasets();
        let mut ids: Vec<&str> = datasets.iter().map(DatasetDefinition::id).collect();
        for ((name, _), id) in DATASET_TOMLS.iter().zip(&ids) {
            assert_eq!(name, id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DATASET_TOMLS.len());
    }

    #[test]
    fn default_dataset_exists_with_full_vehicle_mapping() {
        let def = find_dataset(DEFAULT_DATASET_ID).unwrap();
        assert_eq!(def.columns.vehicle_types.len(), VEHICLE_SLOTS);
        assert_eq!(def.columns.date, "CRASH DATE");
        assert!(def.location.is_some());
    }

    #[test]
    fn unknown_dataset_is_none() {
        assert!(find_dataset("does_not_exist").is_none());
    }
}

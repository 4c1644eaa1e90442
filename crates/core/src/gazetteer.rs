use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::Region;

const INDIA_PROFILE: &str = include_str!("../data/india.json");
const GUJARAT_PROFILE: &str = include_str!("../data/gujarat.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazetteerProfile {
    India,
    Gujarat,
}

impl GazetteerProfile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "india" | "all" => Some(Self::India),
            "gujarat" | "gj" => Some(Self::Gujarat),
            _ => None,
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::India => INDIA_PROFILE,
            Self::Gujarat => GUJARAT_PROFILE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    profile: String,
    states: Vec<StateEntry>,
}

#[derive(Debug, Deserialize)]
struct StateEntry {
    name: String,
    districts: Vec<DistrictEntry>,
}

#[derive(Debug, Deserialize)]
struct DistrictEntry {
    name: String,
    latitude: f64,
    longitude: f64,
}

/// Immutable region table. Iteration order is the data-file order, which is
/// also the priority order used by free-text region extraction.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    profile: String,
    regions: Vec<Region>,
    /// Lowercased region names, parallel to `regions`.
    search_names: Vec<String>,
    index: HashMap<(String, String), usize>,
    parents: Vec<String>,
}

impl Gazetteer {
    pub fn load(profile: GazetteerProfile) -> Result<Self> {
        Self::from_json(profile.source())
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ProfileFile =
            serde_json::from_str(raw).context("failed to parse gazetteer data")?;

        let mut regions = Vec::new();
        let mut index = HashMap::new();
        let mut parents = Vec::with_capacity(file.states.len());

        for state in file.states {
            parents.push(state.name.clone());
            for district in state.districts {
                let key = composite_key(Some(&state.name), &district.name);
                if index.contains_key(&key) {
                    bail!(
                        "duplicate region in gazetteer: {}, {}",
                        district.name,
                        state.name
                    );
                }
                index.insert(key, regions.len());
                regions.push(Region {
                    name: district.name,
                    parent: Some(state.name.clone()),
                    latitude: district.latitude,
                    longitude: district.longitude,
                });
            }
        }

        if regions.is_empty() {
            bail!("gazetteer profile {} has no regions", file.profile);
        }

        let search_names = regions
            .iter()
            .map(|region| region.name.to_lowercase())
            .collect();

        Ok(Self {
            profile: file.profile,
            regions,
            search_names,
            index,
            parents,
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn is_single_parent(&self) -> bool {
        self.parents.len() == 1
    }

    /// Exact lookup by composite identifier. Without a parent the first region
    /// with that name wins.
    pub fn lookup(&self, parent: Option<&str>, name: &str) -> Option<&Region> {
        match parent.map(str::trim).filter(|value| !value.is_empty()) {
            Some(parent) => self
                .index
                .get(&composite_key(Some(parent), name))
                .map(|idx| &self.regions[*idx]),
            None => self.find_by_name(name),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Region> {
        let needle = name.trim().to_lowercase();
        self.search_names()
            .find(|(search_name, _)| *search_name == needle)
            .map(|(_, region)| region)
    }

    /// Regions in gazetteer order, each paired with its lowercased name.
    pub fn search_names(&self) -> impl Iterator<Item = (&str, &Region)> + '_ {
        self.search_names
            .iter()
            .map(String::as_str)
            .zip(self.regions.iter())
    }

    pub fn regions_in<'a>(&'a self, parent: &str) -> impl Iterator<Item = &'a Region> + 'a {
        let needle = parent.trim().to_lowercase();
        self.regions.iter().filter(move |region| {
            region
                .parent
                .as_deref()
                .map(|value| value.to_lowercase() == needle)
                .unwrap_or(false)
        })
    }

    pub fn has_parent(&self, parent: &str) -> bool {
        self.canonical_parent(parent).is_some()
    }

    /// The parent's spelling as stored, matched case-insensitively.
    pub fn canonical_parent(&self, parent: &str) -> Option<&str> {
        let needle = parent.trim().to_lowercase();
        self.parents
            .iter()
            .find(|value| value.to_lowercase() == needle)
            .map(String::as_str)
    }
}

fn composite_key(parent: Option<&str>, name: &str) -> (String, String) {
    (
        parent.unwrap_or_default().trim().to_lowercase(),
        name.trim().to_lowercase(),
    )
}

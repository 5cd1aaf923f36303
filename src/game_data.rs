//! Asset catalog built from RaceRoom's `r3e-data.json`.
//!
//! The vendor file lists classes and physical tracks; every track carries
//! several layouts. The adaptation data is keyed by layout, so the catalog
//! flattens layouts into their own entries named `"<Track> - <Layout>"`.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ErrorKind;
use crate::game_types::{ClassId, TrackId};

#[derive(Debug, Deserialize)]
struct RawGameData {
    #[serde(default)]
    classes: HashMap<String, RawClass>,
    #[serde(default)]
    tracks: HashMap<String, RawTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawClass {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(rename = "Name")]
    name: String,
    #[serde(default)]
    layouts: Vec<RawLayout>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawLayout {
    id: u32,
    name: String,
    #[serde(default)]
    max_number_of_vehicles: Option<u32>,
}

/// One row of a name-sorted catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry<Id> {
    pub id: Id,
    pub name: String,
}

/// Lookup tables for class and track layout names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetCatalog {
    classes: BTreeMap<ClassId, String>,
    tracks: BTreeMap<TrackId, String>,
    max_vehicles: BTreeMap<TrackId, u32>,
}

impl AssetCatalog {
    /// Build the catalog from the text of `r3e-data.json`.
    pub fn from_json(json: &str) -> Result<Self, ErrorKind> {
        let raw: RawGameData = serde_json::from_str(json)?;

        let classes: BTreeMap<ClassId, String> = raw
            .classes
            .into_values()
            .map(|class| (ClassId::new(class.id), class.name))
            .collect();

        let mut tracks = BTreeMap::new();
        let mut max_vehicles = BTreeMap::new();
        for track in raw.tracks.into_values() {
            for layout in track.layouts {
                let id = TrackId::new(layout.id);
                tracks.insert(id, format!("{} - {}", track.name, layout.name));
                if let Some(max) = layout.max_number_of_vehicles {
                    max_vehicles.insert(id, max);
                }
            }
        }

        debug!(
            classes = classes.len(),
            layouts = tracks.len(),
            "built asset catalog"
        );

        Ok(Self {
            classes,
            tracks,
            max_vehicles,
        })
    }

    /// Build a catalog from bare ids, naming each entry after its id.
    ///
    /// Useful when no `r3e-data.json` is at hand: the serializer still needs
    /// to know which classes and tracks span the matrix.
    pub fn from_ids(
        classes: impl IntoIterator<Item = ClassId>,
        tracks: impl IntoIterator<Item = TrackId>,
    ) -> Self {
        Self {
            classes: classes.into_iter().map(|id| (id, id.to_string())).collect(),
            tracks: tracks.into_iter().map(|id| (id, id.to_string())).collect(),
            max_vehicles: BTreeMap::new(),
        }
    }

    pub fn classes(&self) -> &BTreeMap<ClassId, String> {
        &self.classes
    }

    pub fn tracks(&self) -> &BTreeMap<TrackId, String> {
        &self.tracks
    }

    pub fn class_name(&self, id: ClassId) -> Option<&str> {
        self.classes.get(&id).map(|s| s.as_str())
    }

    pub fn track_name(&self, id: TrackId) -> Option<&str> {
        self.tracks.get(&id).map(|s| s.as_str())
    }

    /// Grid size of a layout, when the vendor data lists one.
    pub fn max_vehicles(&self, id: TrackId) -> Option<u32> {
        self.max_vehicles.get(&id).copied()
    }

    pub fn classes_by_name(&self) -> Vec<CatalogEntry<ClassId>> {
        sorted_by_name(&self.classes)
    }

    pub fn tracks_by_name(&self) -> Vec<CatalogEntry<TrackId>> {
        sorted_by_name(&self.tracks)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.tracks.is_empty()
    }
}

fn sorted_by_name<Id: Copy + Ord>(map: &BTreeMap<Id, String>) -> Vec<CatalogEntry<Id>> {
    map.iter()
        .sorted_by(|(a_id, a_name), (b_id, b_name)| a_name.cmp(b_name).then(a_id.cmp(b_id)))
        .map(|(id, name)| CatalogEntry {
            id: *id,
            name: name.clone(),
        })
        .collect()
}

//! Host-side state: the loaded catalog, the live database and player times,
//! and the player times as they were when loaded.

use std::path::Path;

use tracing::{debug, info};

use crate::aiadaptation::{merge_xml, to_xml};
use crate::config::AdaptationConfig;
use crate::data::TextLoader;
use crate::data::database::Database;
use crate::data::player_times::PlayerTimes;
use crate::error::IResult;
use crate::fit::{ProcessedDatabase, process_database};
use crate::game_data::AssetCatalog;
use crate::game_types::{ClassId, TrackId};
use crate::modify;

#[derive(Debug, Clone, Default)]
pub struct Session {
    catalog: AssetCatalog,
    database: Database,
    player_times: PlayerTimes,
    original_player_times: PlayerTimes,
}

impl Session {
    pub fn new(catalog: AssetCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn set_catalog(&mut self, catalog: AssetCatalog) {
        self.catalog = catalog;
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn player_times(&self) -> &PlayerTimes {
        &self.player_times
    }

    /// Merge an `aiadaptation.xml` document and snapshot the resulting player
    /// times. Nothing changes when the document is rejected.
    pub fn load_xml(&mut self, xml: &str) -> IResult<bool> {
        let mut database = self.database.clone();
        let mut player_times = self.player_times.clone();
        let added = merge_xml(xml, &mut database, &mut player_times)?;

        self.database = database;
        self.original_player_times = player_times.clone();
        self.player_times = player_times;
        Ok(added)
    }

    pub fn load_file(&mut self, loader: &impl TextLoader, path: &Path) -> IResult<bool> {
        let xml = loader.read_text(path)?;
        let added = self.load_xml(&xml)?;
        info!(path = %path.display(), added, "loaded adaptation file");
        Ok(added)
    }

    pub fn processed(&self, config: &AdaptationConfig) -> ProcessedDatabase {
        process_database(&self.database, config)
    }

    /// Write predicted levels into a track. On error the database is left as it was.
    pub fn apply_range(
        &mut self,
        processed: &ProcessedDatabase,
        class: ClassId,
        track: TrackId,
        from: u32,
        to: u32,
        spacing: u32,
    ) -> IResult<()> {
        self.database =
            modify::apply_generated_range(&self.database, processed, class, track, from, to, spacing)?;
        Ok(())
    }

    pub fn remove_generated(&mut self) -> usize {
        let (database, removed) = modify::remove_generated(&self.database);
        self.database = database;
        removed
    }

    pub fn reset_database(&mut self) {
        self.database = modify::reset_all();
    }

    pub fn remove_player_time(&mut self, class: ClassId, track: TrackId, index: usize) -> IResult<()> {
        self.player_times = modify::remove_player_time(&self.player_times, class, track, index)?;
        Ok(())
    }

    pub fn keep_best_player_time(&mut self, class: ClassId, track: TrackId) {
        self.player_times = modify::keep_best_player_time(&self.player_times, class, track);
    }

    pub fn keep_best_player_times_everywhere(&mut self) {
        self.player_times = modify::keep_best_player_times_everywhere(&self.player_times);
    }

    /// Whether player times were edited since the last load.
    pub fn player_times_changed(&self) -> bool {
        modify::player_times_changed(&self.player_times, &self.original_player_times)
    }

    /// Discard player time edits made since the last load.
    pub fn restore_player_times(&mut self) {
        debug!("restoring player times to the loaded snapshot");
        self.player_times = self.original_player_times.clone();
    }

    pub fn export_xml(&self) -> String {
        to_xml(&self.database, &self.player_times, &self.catalog)
    }

    pub fn save(&self, loader: &impl TextLoader, path: &Path) -> IResult<()> {
        loader.write_text(path, &self.export_xml())?;
        info!(path = %path.display(), "saved adaptation file");
        Ok(())
    }
}

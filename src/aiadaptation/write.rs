use std::collections::BTreeSet;
use std::fmt::Display;

use super::*;
use crate::data::database::{Database, TrackRecord};
use crate::data::player_times::{PlayerTimes, PlayerTrack};
use crate::game_data::AssetCatalog;
use crate::game_types::{ClassId, TrackId};
use crate::time::format_decimal;

const INDENT: &str = "  ";

/// Line-oriented writer for the fixed layout of `aiadaptation.xml`.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: impl Display) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&text.to_string());
        self.out.push('\n');
    }

    fn open(&mut self, tag: &str) {
        self.line(format_args!("<{tag}>"));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.line(format_args!("</{tag}>"));
    }

    fn empty(&mut self, tag: &str) {
        self.line(format_args!("<{tag}></{tag}>"));
    }

    fn element(&mut self, tag: &str, value: impl Display) {
        self.line(format_args!("<{tag}>{value}</{tag}>"));
    }

    fn indexed(&mut self, index: usize, tag: &str, value: impl Display) {
        self.line(format_args!("<!-- Index:{index} --> <{tag}>{value}</{tag}>"));
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Serialize the whole class × track matrix.
///
/// Every catalog track is paired with every catalog class, even when there is
/// no data for the pair. Ids only present in the data are included as well so
/// nothing is dropped when the catalog is older than the data.
pub fn to_xml(database: &Database, player_times: &PlayerTimes, catalog: &AssetCatalog) -> String {
    let classes: BTreeSet<ClassId> = catalog
        .classes()
        .keys()
        .copied()
        .chain(database.classes.keys().copied())
        .chain(player_times.classes.keys().copied())
        .collect();
    let tracks: BTreeSet<TrackId> = catalog
        .tracks()
        .keys()
        .copied()
        .chain(
            database
                .classes
                .values()
                .flat_map(|class| class.tracks.keys().copied()),
        )
        .chain(
            player_times
                .classes
                .values()
                .flat_map(|class| class.tracks.keys().copied()),
        )
        .collect();

    let mut xml = XmlWriter::new();
    xml.line(format_args!(r#"<{ROOT} ID="{ROOT_ID}">"#));
    xml.depth += 1;
    xml.open(DATA);

    for (track_index, track) in tracks.iter().enumerate() {
        xml.indexed(track_index, LAYOUT_ID, track);
        xml.open(VALUE);
        for (class_index, class) in classes.iter().enumerate() {
            xml.indexed(class_index, CAR_CLASS_ID, class);
            xml.open(SAMPLED_DATA);
            write_player_times(&mut xml, player_times.track(*class, *track));
            write_ai_levels(&mut xml, database.track(*class, *track));
            xml.close(SAMPLED_DATA);
        }
        xml.close(VALUE);
    }

    xml.close(DATA);
    xml.close(ROOT);
    xml.finish()
}

fn write_player_times(xml: &mut XmlWriter, player: Option<&PlayerTrack>) {
    let Some(player) = player.filter(|p| !p.is_empty()) else {
        xml.empty(PLAYER_BEST_LAP_TIMES);
        return;
    };

    xml.open(PLAYER_BEST_LAP_TIMES);
    // Full precision, so re-reading the output never adds a near-duplicate time.
    for (index, time) in player.times().iter().enumerate() {
        xml.indexed(index, LAP_TIME, time);
    }
    xml.close(PLAYER_BEST_LAP_TIMES);
}

fn write_ai_levels(xml: &mut XmlWriter, record: Option<&TrackRecord>) {
    let Some(record) = record.filter(|r| !r.is_empty()) else {
        xml.empty(AI_SKILL_VS_LAP_TIMES);
        return;
    };

    xml.open(AI_SKILL_VS_LAP_TIMES);
    let levels = record
        .ailevels
        .keys()
        .filter_map(|level| Some((*level, record.average(*level)?)));
    for (index, (level, average)) in levels.enumerate() {
        xml.indexed(index, AI_SKILL, level);
        xml.open(AI_DATA);
        xml.element(AVERAGED_LAP_TIME, format_decimal(average));
        xml.element(NUMBER_OF_SAMPLED_RACES, record.samples(level));
        xml.close(AI_DATA);
    }
    xml.close(AI_SKILL_VS_LAP_TIMES);
}

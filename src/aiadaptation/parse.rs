use std::str::FromStr;

use roxmltree::Node;
use tracing::{debug, warn};

use super::*;
use crate::data::database::{DEFAULT_SAMPLES, Database};
use crate::data::player_times::PlayerTimes;
use crate::error::ErrorKind;
use crate::game_types::{ClassId, TrackId};

fn child_by_name<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(name))
}

/// Every child element of `node` named `name`, in document order.
///
/// This is the single place where the document's "one element, many elements
/// or no element at all" ambiguity is resolved: callers always get a list, and
/// a missing parent yields an empty one.
fn children_named<'a, 'input>(node: Option<Node<'a, 'input>>, name: &str) -> Vec<Node<'a, 'input>> {
    match node {
        Some(node) => node
            .children()
            .filter(|child| child.has_tag_name(name))
            .collect(),
        None => Vec::new(),
    }
}

fn parse_text<T: FromStr>(node: &Node) -> Option<T> {
    node.text()?.trim().parse::<T>().ok()
}

fn parse_lap_time(node: &Node) -> Option<f64> {
    parse_text::<f64>(node).filter(|time| time.is_finite() && *time > 0.0)
}

/// Parse a document into a fresh database and player times table.
pub fn parse_xml(xml: &str) -> Result<(Database, PlayerTimes), ErrorKind> {
    let mut database = Database::new();
    let mut player_times = PlayerTimes::new();
    merge_xml(xml, &mut database, &mut player_times)?;
    Ok((database, player_times))
}

/// Merge an `aiadaptation.xml` document into `database` and `player_times`.
///
/// Returns whether anything new was added. Only a document that is not XML at
/// all, or whose root is not `AiAdaptation`, is an error; structurally broken
/// parts are skipped.
pub fn merge_xml(
    xml: &str,
    database: &mut Database,
    player_times: &mut PlayerTimes,
) -> Result<bool, ErrorKind> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if !root.has_tag_name(ROOT) {
        return Err(ErrorKind::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
        });
    }

    let data = child_by_name(&root, DATA);
    let layouts = children_named(data, LAYOUT_ID);
    let values = children_named(data, VALUE);
    if layouts.len() != values.len() {
        warn!(
            layouts = layouts.len(),
            values = values.len(),
            "layoutId/value count mismatch, ignoring document"
        );
        return Ok(false);
    }

    let mut added = false;
    for (layout, value) in layouts.iter().zip(&values) {
        let Some(track) = parse_text::<u32>(layout).map(TrackId::new) else {
            debug!("skipping non-numeric layoutId");
            continue;
        };

        let class_ids = children_named(Some(*value), CAR_CLASS_ID);
        let samples = children_named(Some(*value), SAMPLED_DATA);
        if class_ids.len() != samples.len() {
            warn!(
                %track,
                classes = class_ids.len(),
                samples = samples.len(),
                "carClassId/sampledData count mismatch, skipping track"
            );
            continue;
        }

        for (class_node, sample) in class_ids.iter().zip(&samples) {
            let Some(class) = parse_text::<u32>(class_node).map(ClassId::new) else {
                debug!(%track, "skipping non-numeric carClassId");
                continue;
            };

            added |= merge_player_times(sample, class, track, player_times);
            added |= merge_ai_levels(sample, class, track, database);
        }
    }

    debug!(added, "merged aiadaptation document");
    Ok(added)
}

fn merge_player_times(
    sample: &Node,
    class: ClassId,
    track: TrackId,
    player_times: &mut PlayerTimes,
) -> bool {
    let lap_times: Vec<f64> = children_named(child_by_name(sample, PLAYER_BEST_LAP_TIMES), LAP_TIME)
        .iter()
        .filter_map(parse_lap_time)
        .collect();
    if lap_times.is_empty() {
        return false;
    }

    let entry = player_times.track_mut(class, track);
    let mut added = false;
    for time in lap_times {
        added |= entry.push(time);
    }
    added
}

fn merge_ai_levels(sample: &Node, class: ClassId, track: TrackId, database: &mut Database) -> bool {
    let table = child_by_name(sample, AI_SKILL_VS_LAP_TIMES);
    let skills = children_named(table, AI_SKILL);
    let ai_data = children_named(table, AI_DATA);
    if skills.len() != ai_data.len() {
        warn!(
            %class,
            %track,
            skills = skills.len(),
            data = ai_data.len(),
            "aiSkill/aiData count mismatch, skipping AI levels"
        );
        return false;
    }

    let entries: Vec<(u32, f64, u32)> = skills
        .iter()
        .zip(&ai_data)
        .filter_map(|(skill, data)| {
            let level = parse_text::<u32>(skill)?;
            let time = child_by_name(data, AVERAGED_LAP_TIME).and_then(|n| parse_lap_time(&n))?;
            let samples = child_by_name(data, NUMBER_OF_SAMPLED_RACES)
                .and_then(|n| parse_text::<u32>(&n))
                .unwrap_or(DEFAULT_SAMPLES);
            Some((level, time, samples))
        })
        .collect();
    if entries.is_empty() {
        return false;
    }

    let mut added = false;
    for (level, time, samples) in entries {
        added |= database.insert_time(class, track, level, time, samples);
    }
    added
}

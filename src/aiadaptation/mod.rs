//! Codec for RaceRoom's `aiadaptation.xml`.
//!
//! The document pairs sibling elements by position rather than nesting them:
//!
//! ```text
//! AiAdaptation
//!   aiAdaptationData: layoutId[i] <-> value[i]
//!     value: carClassId[j] <-> sampledData[j]
//!       sampledData: playerBestLapTimes.lapTime[]
//!                    aiSkillVsLapTimes: aiSkill[k] <-> aiData[k]
//!                      aiData: averagedLapTime, numberOfSampledRaces
//! ```

/// Merge `aiadaptation.xml` documents into a database and player times
pub mod parse;
/// Serialize a database and player times back into `aiadaptation.xml`
pub mod write;

pub use parse::{merge_xml, parse_xml};
pub use write::to_xml;

pub(crate) const ROOT: &str = "AiAdaptation";
pub(crate) const ROOT_ID: &str = "/aiadaptation";
pub(crate) const DATA: &str = "aiAdaptationData";
pub(crate) const LAYOUT_ID: &str = "layoutId";
pub(crate) const VALUE: &str = "value";
pub(crate) const CAR_CLASS_ID: &str = "carClassId";
pub(crate) const SAMPLED_DATA: &str = "sampledData";
pub(crate) const PLAYER_BEST_LAP_TIMES: &str = "playerBestLapTimes";
pub(crate) const LAP_TIME: &str = "lapTime";
pub(crate) const AI_SKILL_VS_LAP_TIMES: &str = "aiSkillVsLapTimes";
pub(crate) const AI_SKILL: &str = "aiSkill";
pub(crate) const AI_DATA: &str = "aiData";
pub(crate) const AVERAGED_LAP_TIME: &str = "averagedLapTime";
pub(crate) const NUMBER_OF_SAMPLED_RACES: &str = "numberOfSampledRaces";

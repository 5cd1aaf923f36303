/// Reading and writing RaceRoom's `aiadaptation.xml`
pub mod aiadaptation;
/// Options for fitting and generating AI levels
pub mod config;
/// The AI database, player times, and file access
pub mod data;
/// Error definitions
pub mod error;
/// Lap time curve fitting and per-level prediction
pub mod fit;
/// Class and track names loaded from `r3e-data.json`
pub mod game_data;
/// Class and track identifiers
pub mod game_types;
/// Edits to the AI database and player times
pub mod modify;
/// Host-side state tying loaded data, edits and saving together
pub mod session;
/// Lap time parsing and formatting
pub mod time;

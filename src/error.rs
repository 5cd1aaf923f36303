use thiserror::Error;

use crate::game_types::{ClassId, TrackId};

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("Error parsing XML: {err}")]
    Xml {
        #[from]
        err: roxmltree::Error,
    },
    #[error("Error serializing or deserializing json: {err}")]
    SerdeJson {
        #[from]
        err: serde_json::Error,
    },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unexpected root element `{found}`, expected `AiAdaptation`")]
    UnexpectedRoot { found: String },
    #[error("No prediction available for class={class}, track={track}")]
    MissingPrediction { class: ClassId, track: TrackId },
    #[error("Invalid AI range: from={from}, to={to}, spacing={spacing}")]
    InvalidRange { from: u32, to: u32, spacing: u32 },
    #[error("No player time at index {index} for class={class}, track={track}")]
    UnknownPlayerTime {
        class: ClassId,
        track: TrackId,
        index: usize,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type IResult<T> = Result<T, ErrorKind>;

//! Identifier types shared by the adaptation database, the asset catalog and
//! the XML codec.
//!
//! RaceRoom keys everything by numeric ids. Wrapping them keeps class and
//! track ids from being mixed up, and their `Ord` is numeric so any
//! `BTreeMap` keyed by them iterates `9` before `10`.

use std::fmt;
use std::str::FromStr;

/// A vehicle class identifier (`carClassId` in `aiadaptation.xml`).
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ClassId(u32);

impl ClassId {
    pub fn new(raw: u32) -> Self {
        ClassId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClassId {
    fn from(v: u32) -> Self {
        ClassId(v)
    }
}

impl FromStr for ClassId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(ClassId)
    }
}

/// A track layout identifier (`layoutId` in `aiadaptation.xml`).
///
/// A physical circuit has several layouts; the adaptation data and the
/// catalog are keyed by the layout, never by the circuit.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(u32);

impl TrackId {
    pub fn new(raw: u32) -> Self {
        TrackId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrackId {
    fn from(v: u32) -> Self {
        TrackId(v)
    }
}

impl FromStr for TrackId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(TrackId)
    }
}

//! Transport modes and the contract between the graph builder and profiles
//!
//! A profile turns a way's tags into directional access, a cruise speed and
//! a surface penalty for one mode. The builder runs every profile over every
//! way and stores the results on the edges, so routing never looks at tags.

use std::fmt;
use std::str::FromStr;

use nav_common::{suggest_correction, Error};
use serde::{Deserialize, Serialize};

use crate::profiles::tag_lookup::TagLookup;

/// Mode enumeration, also the index into per-edge attribute arrays
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Car = 0,
    Bike = 1,
    Foot = 2,
}

/// Number of supported modes
pub const MODE_COUNT: usize = 3;

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[Mode::Car, Mode::Bike, Mode::Foot]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Car => "car",
            Mode::Bike => "bike",
            Mode::Foot => "foot",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit for this mode in per-node accessibility masks
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "car" | "driving" | "drive" => Ok(Mode::Car),
            "bike" | "bicycle" | "cycling" => Ok(Mode::Bike),
            "foot" | "walk" | "walking" | "pedestrian" => Ok(Mode::Foot),
            _ => Err(Error::UnknownProfile {
                name: s.to_string(),
                suggestion: suggest_correction(s, &["car", "bike", "foot"]),
            }),
        }
    }
}

/// Mode-specific attributes of one way
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayAttrs {
    /// Can traverse along the way's node order
    pub access_fwd: bool,
    /// Can traverse against the way's node order
    pub access_rev: bool,
    /// Cruise speed in km/h
    pub speed_kmh: f64,
    /// Multiplier on traversal time for unsuitable surfaces, 1.0 if none
    pub penalty: f64,
}

impl Default for WayAttrs {
    fn default() -> Self {
        Self {
            access_fwd: false,
            access_rev: false,
            speed_kmh: 0.0,
            penalty: 1.0,
        }
    }
}

impl WayAttrs {
    pub fn is_routable(&self) -> bool {
        (self.access_fwd || self.access_rev) && self.speed_kmh > 0.0
    }
}

/// Class bit positions for way features that route options can avoid
pub mod class_bits {
    pub const TOLL: u32 = 0;
    pub const FERRY: u32 = 1;
    pub const TUNNEL: u32 = 2;
    /// motorway, trunk and their links
    pub const HIGHWAY: u32 = 3;
}

/// Default access and speed of one highway class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighwayRule {
    pub highway: &'static str,
    pub speed_kmh: f64,
    /// Multiplier on traversal time, 1.0 if none
    pub penalty: f64,
}

/// Time penalty for one surface value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceRule {
    pub surface: &'static str,
    pub penalty: f64,
}

/// The rules a profile applies, as published by `GET /profiles/{name}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileInfo {
    pub mode: Mode,
    pub description: &'static str,
    /// Highway classes open by default, everything else needs an explicit
    /// access tag
    pub highways: Vec<HighwayRule>,
    pub surfaces: Vec<SurfaceRule>,
    /// Tags whose `no`/`private` values close a way
    pub access_tags: &'static [&'static str],
    /// Cap on tagged `maxspeed` values, if the profile reads them
    pub max_speed_kmh: Option<f64>,
    pub ferry_speed_kmh: f64,
    /// Whether `oneway` tags restrict this mode
    pub obeys_oneway: bool,
}

/// Profile trait that every mode implements
pub trait Profile {
    const MODE: Mode;

    /// Process a way and return mode-specific attributes
    fn process_way(tags: &TagLookup<'_>) -> WayAttrs;

    /// Speed, access and surface rules behind `process_way`
    fn describe() -> ProfileInfo;
}

/// Helper: check if an access-style tag denies passage
pub(crate) fn is_denied(value: Option<&str>) -> bool {
    matches!(value, Some("no") | Some("private"))
}

/// Oneway direction parsed from a `oneway`-style tag value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Oneway {
    No,
    Forward,
    Reverse,
}

pub(crate) fn parse_oneway(value: Option<&str>) -> Option<Oneway> {
    match value? {
        "yes" | "1" | "true" => Some(Oneway::Forward),
        "-1" | "reverse" => Some(Oneway::Reverse),
        "no" | "0" | "false" => Some(Oneway::No),
        _ => None,
    }
}

impl WayAttrs {
    pub(crate) fn apply_oneway(&mut self, oneway: Oneway) {
        match oneway {
            Oneway::No => {}
            Oneway::Forward => self.access_rev = false,
            Oneway::Reverse => self.access_fwd = false,
        }
    }
}

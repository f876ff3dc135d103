//! Foot routing profile - tag semantics for pedestrian routing

use super::car::FERRY_SPEED_KMH;
use super::tag_lookup::TagLookup;
use crate::profile::{HighwayRule, Mode, Profile, ProfileInfo, SurfaceRule, WayAttrs};

pub struct FootProfile;

const WALKING_SPEED_KMH: f64 = 5.0;

const SOFT_SURFACE_PENALTY: f64 = 1.5;
const STEPS_PENALTY: f64 = 1.25;

const SOFT_SURFACES: &[&str] = &["sand", "mud", "grass"];

/// Open to pedestrians unless tagged otherwise. Motorways and trunk roads
/// need foot=yes or designated.
const HIGHWAYS: &[&str] = &[
    "footway",
    "pedestrian",
    "steps",
    "path",
    "cycleway",
    "bridleway",
    "track",
    "residential",
    "living_street",
    "unclassified",
    "service",
    "tertiary",
    "tertiary_link",
    "secondary",
    "secondary_link",
    "primary",
    "primary_link",
];

impl Profile for FootProfile {
    const MODE: Mode = Mode::Foot;

    fn process_way(tags: &TagLookup<'_>) -> WayAttrs {
        let mut output = WayAttrs::default();

        if tags.is("route", "ferry") {
            if tags.is("foot", "no") {
                return output;
            }
            output.access_fwd = true;
            output.access_rev = true;
            output.speed_kmh = FERRY_SPEED_KMH;
            return output;
        }

        let Some(highway) = tags.get_str("highway") else {
            return output;
        };

        let access_default = HIGHWAYS.contains(&highway);

        let foot = tags.get_str("foot");
        if matches!(foot, Some("no") | Some("private")) {
            return output;
        }
        if !access_default && !matches!(foot, Some("yes") | Some("designated")) {
            return output;
        }
        if tags.is("access", "no") && foot.is_none() {
            return output;
        }

        // Pedestrians ignore oneway restrictions
        output.access_fwd = true;
        output.access_rev = true;
        output.speed_kmh = WALKING_SPEED_KMH;

        if tags.get_str("surface").is_some_and(|v| SOFT_SURFACES.contains(&v)) {
            output.penalty = SOFT_SURFACE_PENALTY;
        }
        if highway == "steps" {
            output.penalty *= STEPS_PENALTY;
        }

        output
    }

    fn describe() -> ProfileInfo {
        ProfileInfo {
            mode: Self::MODE,
            description: "Pedestrians at walking speed in both directions of every way",
            highways: HIGHWAYS
                .iter()
                .map(|&highway| HighwayRule {
                    highway,
                    speed_kmh: WALKING_SPEED_KMH,
                    penalty: if highway == "steps" { STEPS_PENALTY } else { 1.0 },
                })
                .collect(),
            surfaces: SOFT_SURFACES
                .iter()
                .map(|&surface| SurfaceRule {
                    surface,
                    penalty: SOFT_SURFACE_PENALTY,
                })
                .collect(),
            access_tags: &["foot", "access"],
            max_speed_kmh: None,
            ferry_speed_kmh: FERRY_SPEED_KMH,
            obeys_oneway: false,
        }
    }
}

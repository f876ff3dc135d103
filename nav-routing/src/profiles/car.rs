//! Car routing profile - tag semantics for automobile routing
//!
//! Speed comes from the highway class, optionally lowered or raised by an
//! explicit `maxspeed` tag.

use super::tag_lookup::TagLookup;
use crate::profile::{
    is_denied, parse_oneway, HighwayRule, Mode, Oneway, Profile, ProfileInfo, WayAttrs,
};

pub struct CarProfile;

/// Ferry crossings are timed at a flat speed for every mode
pub(crate) const FERRY_SPEED_KMH: f64 = 20.0;

/// Upper bound on tagged speeds, guards against typos like maxspeed=500
const MAX_SPEED_KMH: f64 = 130.0;

/// Default speed per drivable highway class. track, footway, path,
/// cycleway, pedestrian, steps and construction are closed to cars.
const HIGHWAY_SPEEDS: &[(&str, f64)] = &[
    ("motorway", 110.0),
    ("motorway_link", 60.0),
    ("trunk", 90.0),
    ("trunk_link", 50.0),
    ("primary", 70.0),
    ("primary_link", 40.0),
    ("secondary", 60.0),
    ("secondary_link", 40.0),
    ("tertiary", 50.0),
    ("tertiary_link", 30.0),
    ("unclassified", 50.0),
    ("residential", 30.0),
    ("service", 20.0),
    ("living_street", 10.0),
];

const ACCESS_TAGS: &[&str] = &["motor_vehicle", "vehicle", "access"];

impl Profile for CarProfile {
    const MODE: Mode = Mode::Car;

    fn process_way(tags: &TagLookup<'_>) -> WayAttrs {
        // Default: no access
        let mut output = WayAttrs::default();

        if tags.is("route", "ferry") {
            if is_denied(tags.get_str("motor_vehicle")) || tags.is("motorcar", "no") {
                return output;
            }
            output.access_fwd = true;
            output.access_rev = true;
            output.speed_kmh = FERRY_SPEED_KMH;
            return output;
        }

        let Some(highway) = tags.get_str("highway") else {
            return output; // No highway tag = not routable
        };

        let Some(&(_, base_speed_kmh)) = HIGHWAY_SPEEDS.iter().find(|(hw, _)| *hw == highway) else {
            return output;
        };

        // Check explicit access tags
        if ACCESS_TAGS.iter().any(|key| is_denied(tags.get_str(key))) {
            return output;
        }

        output.access_fwd = true;
        output.access_rev = true;
        output.speed_kmh = parse_maxspeed(tags.get_str("maxspeed"))
            .unwrap_or(base_speed_kmh)
            .min(MAX_SPEED_KMH);

        // Motorways, their links and roundabouts are oneway unless tagged otherwise
        let implied = if matches!(highway, "motorway" | "motorway_link")
            || tags.is("junction", "roundabout")
        {
            Oneway::Forward
        } else {
            Oneway::No
        };
        output.apply_oneway(parse_oneway(tags.get_str("oneway")).unwrap_or(implied));

        output
    }

    fn describe() -> ProfileInfo {
        ProfileInfo {
            mode: Self::MODE,
            description: "Motor vehicles at road-class speeds, lowered or raised by maxspeed",
            highways: HIGHWAY_SPEEDS
                .iter()
                .map(|&(highway, speed_kmh)| HighwayRule {
                    highway,
                    speed_kmh,
                    penalty: 1.0,
                })
                .collect(),
            surfaces: Vec::new(),
            access_tags: ACCESS_TAGS,
            max_speed_kmh: Some(MAX_SPEED_KMH),
            ferry_speed_kmh: FERRY_SPEED_KMH,
            obeys_oneway: true,
        }
    }
}

/// Parse a `maxspeed` value in km/h. Handles plain numbers and "mph" suffixes;
/// symbolic values like "signals" or "walk" are ignored.
fn parse_maxspeed(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    let (number, factor) = match value.strip_suffix("mph") {
        Some(n) => (n.trim(), 1.609_344),
        None => (value.strip_suffix("km/h").unwrap_or(value).trim(), 1.0),
    };
    let speed = number.parse::<f64>().ok()? * factor;
    (speed.is_finite() && speed > 0.0).then_some(speed)
}

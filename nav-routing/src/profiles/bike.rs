//! Bicycle routing profile - tag semantics for bicycle routing
//!
//! Bikes ride at a constant cruise speed whatever the road class. Rough
//! surfaces are penalised instead.

use super::car::FERRY_SPEED_KMH;
use super::tag_lookup::TagLookup;
use super::{is_rough_surface, ROUGH_SURFACES};
use crate::profile::{
    parse_oneway, HighwayRule, Mode, Oneway, Profile, ProfileInfo, SurfaceRule, WayAttrs,
};

pub struct BikeProfile;

const CRUISE_SPEED_KMH: f64 = 18.0;

/// Rough surfaces double the traversal time
const ROUGH_SURFACE_PENALTY: f64 = 2.0;

/// Open to bikes unless tagged otherwise. Motorways, trunk roads and steps
/// need bicycle=yes or designated.
const HIGHWAYS: &[&str] = &[
    "cycleway",
    "path",
    "footway",
    "pedestrian",
    "bridleway",
    "track",
    "residential",
    "unclassified",
    "tertiary",
    "tertiary_link",
    "secondary",
    "secondary_link",
    "primary",
    "primary_link",
    "service",
    "living_street",
];

impl Profile for BikeProfile {
    const MODE: Mode = Mode::Bike;

    fn process_way(tags: &TagLookup<'_>) -> WayAttrs {
        let mut output = WayAttrs::default();

        if tags.is("route", "ferry") {
            if tags.is("bicycle", "no") {
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

        // bicycle=yes opens up footways that would otherwise be questionable
        let bicycle = tags.get_str("bicycle");
        if matches!(bicycle, Some("no") | Some("dismount") | Some("private")) {
            return output;
        }
        if !access_default && !matches!(bicycle, Some("yes") | Some("designated")) {
            return output;
        }
        if tags.is("access", "no") && bicycle.is_none() {
            return output;
        }

        output.access_fwd = true;
        output.access_rev = true;
        output.speed_kmh = CRUISE_SPEED_KMH;

        if is_rough_surface(tags.get_str("surface")) {
            output.penalty = ROUGH_SURFACE_PENALTY;
        }

        // oneway:bicycle wins over the general oneway tag
        let oneway = parse_oneway(tags.get_str("oneway:bicycle"))
            .or_else(|| parse_oneway(tags.get_str("oneway")))
            .unwrap_or(if tags.is("junction", "roundabout") {
                Oneway::Forward
            } else {
                Oneway::No
            });
        output.apply_oneway(oneway);

        output
    }

    fn describe() -> ProfileInfo {
        ProfileInfo {
            mode: Self::MODE,
            description: "Bicycles at a constant cruise speed, slowed down on rough surfaces",
            highways: HIGHWAYS
                .iter()
                .map(|&highway| HighwayRule {
                    highway,
                    speed_kmh: CRUISE_SPEED_KMH,
                    penalty: 1.0,
                })
                .collect(),
            surfaces: ROUGH_SURFACES
                .iter()
                .map(|&surface| SurfaceRule {
                    surface,
                    penalty: ROUGH_SURFACE_PENALTY,
                })
                .collect(),
            access_tags: &["bicycle", "access"],
            max_speed_kmh: None,
            ferry_speed_kmh: FERRY_SPEED_KMH,
            obeys_oneway: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn run(pairs: &[(&str, &str)]) -> WayAttrs {
        let tags: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BikeProfile::process_way(&TagLookup::new(&tags))
    }

    #[test]
    fn test_speed_ignores_road_class() {
        let primary = run(&[("highway", "primary")]);
        let cycleway = run(&[("highway", "cycleway")]);
        assert_eq!(primary.speed_kmh, CRUISE_SPEED_KMH);
        assert_eq!(cycleway.speed_kmh, CRUISE_SPEED_KMH);
    }

    #[test]
    fn test_motorway_and_steps_denied() {
        for hw in ["motorway", "trunk", "trunk_link", "steps"] {
            assert!(!run(&[("highway", hw)]).is_routable(), "{hw}");
        }
    }

    #[test]
    fn test_bicycle_tag() {
        assert!(!run(&[("highway", "residential"), ("bicycle", "no")]).is_routable());
        assert!(!run(&[("highway", "footway"), ("bicycle", "dismount")]).is_routable());
        assert!(run(&[("highway", "trunk"), ("bicycle", "designated")]).is_routable());
    }

    #[test]
    fn test_rough_surface_penalty() {
        let out = run(&[("highway", "track"), ("surface", "gravel")]);
        assert_eq!(out.penalty, ROUGH_SURFACE_PENALTY);
        let out = run(&[("highway", "track"), ("surface", "asphalt")]);
        assert_eq!(out.penalty, 1.0);
    }

    #[test]
    fn test_describe_lists_rough_surfaces() {
        let info = BikeProfile::describe();
        assert_eq!(info.mode, Mode::Bike);
        for rule in &info.surfaces {
            let out = run(&[("highway", "track"), ("surface", rule.surface)]);
            assert_eq!(out.penalty, rule.penalty, "{}", rule.surface);
        }
        assert!(info.highways.iter().all(|r| run(&[("highway", r.highway)]).is_routable()));
        assert!(!info.highways.iter().any(|r| r.highway == "motorway"));
    }

    #[test]
    fn test_oneway_bicycle_exception() {
        let out = run(&[("highway", "residential"), ("oneway", "yes")]);
        assert!(out.access_fwd && !out.access_rev);

        let out = run(&[
            ("highway", "residential"),
            ("oneway", "yes"),
            ("oneway:bicycle", "no"),
        ]);
        assert!(out.access_fwd && out.access_rev);
    }
}

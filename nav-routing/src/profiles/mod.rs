//! Built-in routing profiles for different travel modes
//!
//! Each profile implements tag semantics for access, speed, and preferences.

pub mod bike;
pub mod car;
pub mod foot;
pub mod tag_lookup;

pub use bike::BikeProfile;
pub use car::CarProfile;
pub use foot::FootProfile;
pub use tag_lookup::TagLookup;

use crate::profile::{class_bits, Mode, Profile, ProfileInfo, WayAttrs, MODE_COUNT};

/// Run a single mode's profile over a way
pub fn process_way(mode: Mode, tags: &TagLookup<'_>) -> WayAttrs {
    match mode {
        Mode::Car => CarProfile::process_way(tags),
        Mode::Bike => BikeProfile::process_way(tags),
        Mode::Foot => FootProfile::process_way(tags),
    }
}

/// Rules of a single mode's profile
pub fn describe(mode: Mode) -> ProfileInfo {
    match mode {
        Mode::Car => CarProfile::describe(),
        Mode::Bike => BikeProfile::describe(),
        Mode::Foot => FootProfile::describe(),
    }
}

/// Run every profile over a way, indexed by `Mode::index`
pub fn process_way_all(tags: &TagLookup<'_>) -> [WayAttrs; MODE_COUNT] {
    [
        CarProfile::process_way(tags),
        BikeProfile::process_way(tags),
        FootProfile::process_way(tags),
    ]
}

/// Mode-independent feature bits of a way
pub fn classify(tags: &TagLookup<'_>) -> u32 {
    let mut bits = 0;

    if tags
        .get_str("highway")
        .is_some_and(|hw| matches!(hw, "motorway" | "motorway_link" | "trunk" | "trunk_link"))
    {
        bits |= 1 << class_bits::HIGHWAY;
    }
    if tags.is_yes("toll") {
        bits |= 1 << class_bits::TOLL;
    }
    if tags.is("route", "ferry") {
        bits |= 1 << class_bits::FERRY;
    }
    // tunnel=building_passage and friends are still tunnels
    if tags.get_str("tunnel").is_some_and(|v| v != "no") {
        bits |= 1 << class_bits::TUNNEL;
    }

    bits
}

/// Surface classes that slow bikes down
pub(crate) const ROUGH_SURFACES: &[&str] = &[
    "gravel",
    "fine_gravel",
    "sand",
    "dirt",
    "ground",
    "mud",
    "grass",
    "unpaved",
    "cobblestone",
    "sett",
];

pub(crate) fn is_rough_surface(surface: Option<&str>) -> bool {
    surface.is_some_and(|s| ROUGH_SURFACES.contains(&s))
}

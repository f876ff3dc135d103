//! Geometry output formats: GeoJSON LineString, encoded polyline, raw pairs

use std::str::FromStr;

use nav_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::geo::Coord;

/// Decimal places kept by encoded polylines
pub const POLYLINE_PRECISION: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    #[default]
    Geojson,
    Polyline,
    /// Plain `[lat, lon]` pairs
    Coordinates,
}

impl GeometryFormat {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryFormat::Geojson => "geojson",
            GeometryFormat::Polyline => "polyline",
            GeometryFormat::Coordinates => "coordinates",
        }
    }
}

impl FromStr for GeometryFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "geojson" => Ok(GeometryFormat::Geojson),
            "polyline" | "polyline5" => Ok(GeometryFormat::Polyline),
            "coordinates" => Ok(GeometryFormat::Coordinates),
            _ => Err(Error::InvalidOption(format!(
                "unknown format '{s}', use geojson, polyline or coordinates"
            ))),
        }
    }
}

/// GeoJSON LineString geometry, positions are `[lon, lat]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl LineString {
    pub fn new(points: &[Coord]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: points.iter().map(|p| [p.lon, p.lat]).collect(),
        }
    }
}

/// Route geometry in the requested format
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EncodedGeometry {
    GeoJson(LineString),
    Polyline(String),
    Coordinates(Vec<[f64; 2]>),
}

pub fn encode_geometry(points: &[Coord], format: GeometryFormat) -> EncodedGeometry {
    match format {
        GeometryFormat::Geojson => EncodedGeometry::GeoJson(LineString::new(points)),
        GeometryFormat::Polyline => {
            EncodedGeometry::Polyline(encode_polyline(points, POLYLINE_PRECISION))
        }
        GeometryFormat::Coordinates => {
            EncodedGeometry::Coordinates(points.iter().map(|p| [p.lat, p.lon]).collect())
        }
    }
}

/// Google encoded polyline with `precision` decimal places
pub fn encode_polyline(points: &[Coord], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::with_capacity(points.len() * 8);
    let (mut prev_lat, mut prev_lon) = (0i64, 0i64);

    for p in points {
        let lat = (p.lat * factor).round() as i64;
        let lon = (p.lon * factor).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push(char::from((0x20 | (v & 0x1f)) as u8 + 63));
        v >>= 5;
    }
    out.push(char::from(v as u8 + 63));
}

pub fn decode_polyline(encoded: &str, precision: u32) -> Result<Vec<Coord>> {
    let factor = 10f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut pos = 0;
    let (mut lat, mut lon) = (0i64, 0i64);
    let mut points = Vec::new();

    while pos < bytes.len() {
        lat += decode_value(bytes, &mut pos)?;
        lon += decode_value(bytes, &mut pos)?;
        points.push(Coord::new(lat as f64 / factor, lon as f64 / factor));
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], pos: &mut usize) -> Result<i64> {
    let malformed = || Error::InvalidOption("malformed polyline".to_string());
    let mut result = 0i64;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*pos).ok_or_else(malformed)?;
        *pos += 1;
        let chunk = i64::from(byte).checked_sub(63).filter(|c| (0..64).contains(c)).ok_or_else(malformed)?;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
        if shift > 60 {
            return Err(malformed());
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_points() -> Vec<Coord> {
        vec![
            Coord::new(38.5, -120.2),
            Coord::new(40.7, -120.95),
            Coord::new(43.252, -126.453),
        ]
    }

    #[test]
    fn test_encode_reference_polyline() {
        assert_eq!(
            encode_polyline(&reference_points(), 5),
            "_p~iF~ps|U_ulLnnqC_mqNvxq`@"
        );
    }

    #[test]
    fn test_decode_reference_polyline() {
        let decoded = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@", 5).unwrap();
        for (a, b) in decoded.iter().zip(reference_points()) {
            assert!((a.lat - b.lat).abs() < 1e-9);
            assert!((a.lon - b.lon).abs() < 1e-9);
        }
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode_polyline("_p~iF~ps|U_", 5).is_err());
        assert!(decode_polyline("\u{7f}", 5).is_err());
        assert!(decode_polyline("", 5).unwrap().is_empty());
    }

    #[test]
    fn test_geojson_order_is_lon_lat() {
        let line = LineString::new(&[Coord::new(50.0, 4.0)]);
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["type"], "LineString");
        assert_eq!(json["coordinates"][0][0], 4.0);
        assert_eq!(json["coordinates"][0][1], 50.0);
    }

    #[test]
    fn test_encode_geometry_formats() {
        let pts = [Coord::new(50.0, 4.0)];
        match encode_geometry(&pts, GeometryFormat::Coordinates) {
            EncodedGeometry::Coordinates(c) => assert_eq!(c, vec![[50.0, 4.0]]),
            other => panic!("unexpected {other:?}"),
        }
        let json = serde_json::to_value(encode_geometry(&pts, GeometryFormat::Polyline)).unwrap();
        assert!(json.is_string());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("GeoJSON".parse::<GeometryFormat>().unwrap(), GeometryFormat::Geojson);
        assert_eq!("polyline".parse::<GeometryFormat>().unwrap(), GeometryFormat::Polyline);
        assert!("wkt".parse::<GeometryFormat>().is_err());
        assert_eq!(GeometryFormat::default().name(), "geojson");
    }
}

//! Geospatial layers from the Geoscience Australia electricity
//! infrastructure map service.
//!
//! Responses are cached as raw GeoJSON under `geodata/` in the cache
//! directory so repeated reads never hit the service.

use std::fs;

use geojson::{GeoJson, Value};
use serde_json::Map;
use tracing::info;

use crate::config::Config;
use crate::error::{NemdbError, Result};
use crate::fetch::http_get_string;

pub mod transformations;

const SERVICE_URL: &str =
    "https://services.ga.gov.au/gis/rest/services/National_Electricity_Infrastructure/MapServer";

/// States whose grids participate in the NEM.
pub const NEM_STATES: [&str; 6] = [
    "Victoria",
    "Queensland",
    "New South Wales",
    "Tasmania",
    "Australian Capital Territory",
    "South Australia",
];

/// Longitude/latitude pair.
pub type Coord = [f64; 2];

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    Line(Vec<Coord>),
    MultiLine(Vec<Vec<Coord>>),
}

#[derive(Debug, Clone)]
pub struct Feature {
    pub properties: Map<String, serde_json::Value>,
    pub geometry: Geometry,
}

impl Feature {
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// Substations across the NEM states (service layer 0).
pub fn read_substations(config: &Config) -> Result<Vec<Feature>> {
    let features = cached_geojson(config, "substations", || {
        let url =
            format!("{SERVICE_URL}/0/query?where=1%3D1&outFields=*&outSR=4326&f=geojson");
        info!(url, "fetching substation data");
        http_get_string(&url)
    })?;
    Ok(features
        .into_iter()
        .filter(|f| f.property_str("state").is_some_and(|s| NEM_STATES.contains(&s)))
        .collect())
}

/// Major power stations, queried state by state (service layer 1).
pub fn read_major_powerstations(config: &Config) -> Result<Vec<Feature>> {
    let mut features = Vec::new();
    for state in NEM_STATES {
        let mut batch = cached_geojson(config, &cache_name("powerstations", state), || {
            let url = format!(
                "{SERVICE_URL}/1/query?where=state%20%3D%20'{}'&outFields=*&f=geojson",
                encode_state(state)
            );
            info!(state, "fetching power station data");
            http_get_string(&url)
        })?;
        features.append(&mut batch);
    }
    Ok(features)
}

/// Transmission lines, queried state by state with a fixed attribute
/// projection (service layer 2). With `clean` set, the fragmented
/// multi-part geometries are reassembled into continuous lines.
pub fn read_transmission_lines(config: &Config, clean: bool) -> Result<Vec<Feature>> {
    let mut features = Vec::new();
    for state in NEM_STATES {
        let mut batch = cached_geojson(config, &cache_name("transmission_lines", state), || {
            let url = format!(
                "{SERVICE_URL}/2/query?where=state%20%3D%20'{}'&outFields=class,name,\
                 operationalstatus,state,spatialconfidence,revised,st_length(shape),\
                 capacitykv,length_m&outSR=4326&f=geojson",
                encode_state(state)
            );
            info!(state, "fetching transmission line data");
            http_get_string(&url)
        })?;
        features.append(&mut batch);
    }
    if clean {
        info!("attempting to clean transmission lines");
        features = transformations::clean_transmission_lines(features);
    }
    Ok(features)
}

fn encode_state(state: &str) -> String {
    state.replace(' ', "%20")
}

fn cache_name(layer: &str, state: &str) -> String {
    format!("{layer}-{}", state.replace(' ', "_").to_lowercase())
}

/// Runs `fetch` once and keeps the raw GeoJSON body on disk; later calls
/// parse the cached file instead.
fn cached_geojson(
    config: &Config,
    name: &str,
    fetch: impl FnOnce() -> Result<String>,
) -> Result<Vec<Feature>> {
    let path = config.cache_dir.join("geodata").join(format!("{name}.geojson"));
    if path.exists() {
        info!(path = %path.display(), "reading from cache");
        return parse_feature_collection(&fs::read_to_string(&path)?);
    }
    let body = fetch()?;
    // parse before caching so a bad response is never kept
    let features = parse_feature_collection(&body)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, body)?;
    Ok(features)
}

fn parse_feature_collection(body: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = body
        .parse()
        .map_err(|err| NemdbError::GeoJson(Box::new(err)))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(NemdbError::processing("expected a GeoJSON FeatureCollection"));
    };
    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let geometry = match geometry.value {
            Value::Point(p) => Geometry::Point(coord(&p)?),
            Value::LineString(line) => Geometry::Line(coords(&line)?),
            Value::MultiLineString(lines) => Geometry::MultiLine(
                lines.iter().map(|l| coords(l)).collect::<Result<_>>()?,
            ),
            other => {
                let kind = match other {
                    Value::MultiPoint(_) => "MultiPoint",
                    Value::Polygon(_) => "Polygon",
                    Value::MultiPolygon(_) => "MultiPolygon",
                    Value::GeometryCollection(_) => "GeometryCollection",
                    _ => "geometry",
                };
                return Err(NemdbError::processing(format!(
                    "unsupported {kind} in feature collection"
                )));
            }
        };
        features.push(Feature {
            properties: feature.properties.unwrap_or_default(),
            geometry,
        });
    }
    Ok(features)
}

fn coord(position: &[f64]) -> Result<Coord> {
    match position {
        [x, y, ..] => Ok([*x, *y]),
        _ => Err(NemdbError::processing("position with fewer than two ordinates")),
    }
}

fn coords(positions: &[Vec<f64>]) -> Result<Vec<Coord>> {
    positions.iter().map(|p| coord(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Filesystem;

    const BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "SYDNEY WEST", "state": "New South Wales"},
                "geometry": {"type": "Point", "coordinates": [150.8, -33.8]}
            },
            {
                "type": "Feature",
                "properties": {"name": "LINE A", "state": "Victoria"},
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [[[144.0, -37.0], [144.1, -37.1]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"name": "DARWIN", "state": "Northern Territory"},
                "geometry": {"type": "Point", "coordinates": [130.8, -12.4]}
            }
        ]
    }"#;

    #[test]
    fn feature_collections_parse_into_the_geometry_model() {
        let features = parse_feature_collection(BODY).unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].geometry, Geometry::Point([150.8, -33.8]));
        assert_eq!(
            features[1].geometry,
            Geometry::MultiLine(vec![vec![[144.0, -37.0], [144.1, -37.1]]])
        );
        assert_eq!(features[0].property_str("name"), Some("SYDNEY WEST"));
    }

    #[test]
    fn state_filter_keeps_only_nem_states() {
        let features = parse_feature_collection(BODY).unwrap();
        let kept: Vec<_> = features
            .into_iter()
            .filter(|f| f.property_str("state").is_some_and(|s| NEM_STATES.contains(&s)))
            .collect();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn cached_body_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path(), Filesystem::Local);
        let mut calls = 0;

        for _ in 0..2 {
            let features = cached_geojson(&config, "substations", || {
                calls += 1;
                Ok(BODY.to_string())
            })
            .unwrap();
            assert_eq!(features.len(), 3);
        }
        assert_eq!(calls, 1);
        assert!(dir.path().join("geodata").join("substations.geojson").exists());
    }
}

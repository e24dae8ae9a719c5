// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// GeoJSON driver, built on the `geojson` crate.

use std::path::Path;

use geojson::GeoJson;
use tracing::{debug, info, instrument};
use wandler_core::error::{Result, WandlerError};

use super::{Coord, Feature, FeatureCollection, Geometry, Ring};

/// Read a GeoJSON file. A bare Feature or Geometry is treated as a
/// collection of one.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)?;
    let parsed: GeoJson = text.parse().map_err(|err: geojson::Error| {
        WandlerError::VectorError(format!("invalid GeoJSON in {}: {}", path.display(), err))
    })?;

    let features = match parsed {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(feature_from_geojson)
            .collect::<Result<Vec<_>>>()?,
        GeoJson::Feature(feature) => vec![feature_from_geojson(feature)?],
        GeoJson::Geometry(geometry) => vec![Feature {
            geometry: Some(geometry_from_value(&geometry.value)?),
            properties: Default::default(),
        }],
    };

    info!(features = features.len(), "GeoJSON read");
    Ok(FeatureCollection::new(features))
}

/// Write `collection` as a single GeoJSON FeatureCollection, replacing any
/// existing file.
#[instrument(skip_all, fields(path = %path.display(), features = collection.len()))]
pub fn write(collection: &FeatureCollection, path: &Path) -> Result<()> {
    let features = collection
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: feature
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(value_from_geometry(g))),
            id: None,
            properties: Some(feature.properties.clone()),
            foreign_members: None,
        })
        .collect();

    let output = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(path, json)?;
    debug!("GeoJSON written");
    Ok(())
}

// -- Conversion helpers -------------------------------------------------------

fn feature_from_geojson(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(geometry) => Some(geometry_from_value(&geometry.value)?),
        None => None,
    };
    Ok(Feature {
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

fn coord(position: &[f64]) -> Result<Coord> {
    match position {
        [x, y, ..] => Ok(Coord::new(*x, *y)),
        _ => Err(WandlerError::VectorError(format!(
            "position needs at least two values, got {}",
            position.len()
        ))),
    }
}

fn coords(positions: &[Vec<f64>]) -> Result<Vec<Coord>> {
    positions.iter().map(|p| coord(p)).collect()
}

fn rings(rings: &[Vec<Vec<f64>>]) -> Result<Vec<Ring>> {
    rings.iter().map(|r| coords(r)).collect()
}

fn geometry_from_value(value: &geojson::Value) -> Result<Geometry> {
    use geojson::Value;

    Ok(match value {
        Value::Point(p) => Geometry::Point(coord(p)?),
        Value::MultiPoint(points) => Geometry::MultiPoint(coords(points)?),
        Value::LineString(line) => Geometry::LineString(coords(line)?),
        Value::MultiLineString(lines) => Geometry::MultiLineString(
            lines.iter().map(|l| coords(l)).collect::<Result<_>>()?,
        ),
        Value::Polygon(polygon) => Geometry::Polygon(rings(polygon)?),
        Value::MultiPolygon(polygons) => Geometry::MultiPolygon(
            polygons.iter().map(|p| rings(p)).collect::<Result<_>>()?,
        ),
        Value::GeometryCollection(_) => {
            return Err(WandlerError::VectorError(
                "GeometryCollection is not supported".into(),
            ));
        }
    })
}

fn position(c: &Coord) -> Vec<f64> {
    vec![c.x, c.y]
}

fn positions(cs: &[Coord]) -> Vec<Vec<f64>> {
    cs.iter().map(position).collect()
}

fn value_from_geometry(geometry: &Geometry) -> geojson::Value {
    use geojson::Value;

    match geometry {
        Geometry::Point(c) => Value::Point(position(c)),
        Geometry::MultiPoint(cs) => Value::MultiPoint(positions(cs)),
        Geometry::LineString(cs) => Value::LineString(positions(cs)),
        Geometry::MultiLineString(lines) => {
            Value::MultiLineString(lines.iter().map(|l| positions(l)).collect())
        }
        Geometry::Polygon(rs) => Value::Polygon(rs.iter().map(|r| positions(r)).collect()),
        Geometry::MultiPolygon(polygons) => Value::MultiPolygon(
            polygons
                .iter()
                .map(|rs| rs.iter().map(|r| positions(r)).collect())
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [13.4, 52.5, 34.0] },
          "properties": { "name": "Berlin", "pop": 3645000 } },
        { "type": "Feature",
          "geometry": { "type": "Polygon",
            "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]],[[1,1],[2,1],[2,2],[1,1]]] },
          "properties": null }
      ]
    }"#;

    #[test]
    fn reads_collection_and_drops_z() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.geojson");
        std::fs::write(&path, SAMPLE).unwrap();

        let collection = read(&path).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.features[0].geometry,
            Some(Geometry::Point(Coord::new(13.4, 52.5)))
        );
        assert_eq!(collection.features[0].properties["name"], "Berlin");
        match &collection.features[1].geometry {
            Some(Geometry::Polygon(rs)) => assert_eq!(rs.len(), 2),
            other => panic!("expected polygon, got {other:?}"),
        }
        assert!(collection.features[1].properties.is_empty());
    }

    #[test]
    fn bare_geometry_is_one_feature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.geojson");
        std::fs::write(
            &path,
            r#"{ "type": "LineString", "coordinates": [[0,0],[1,1],[2,0]] }"#,
        )
        .unwrap();

        let collection = read(&path).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.features[0].geometry.as_ref().map(|g| g.type_name()),
            Some("LineString")
        );
    }

    #[test]
    fn write_then_read_preserves_features() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.geojson");
        let out = dir.path().join("out.geojson");
        std::fs::write(&src, SAMPLE).unwrap();

        let collection = read(&src).unwrap();
        write(&collection, &out).unwrap();
        let again = read(&out).unwrap();

        assert_eq!(again, collection);
    }

    #[test]
    fn invalid_json_is_vector_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.geojson");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read(&path), Err(WandlerError::VectorError(_))));
    }

    #[test]
    fn geometry_collection_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gc.geojson");
        std::fs::write(
            &path,
            r#"{ "type": "GeometryCollection", "geometries": [] }"#,
        )
        .unwrap();

        assert!(matches!(read(&path), Err(WandlerError::VectorError(_))));
    }
}

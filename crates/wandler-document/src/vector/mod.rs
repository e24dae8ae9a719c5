// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vector module — an in-memory feature collection that both GeoJSON and
// Shapefile drivers read into and write out of.

pub mod json;
pub mod shp;

use std::path::Path;

use serde_json::{Map, Value};
use wandler_core::FormatTag;
use wandler_core::error::{Result, WandlerError};

/// A planar coordinate. Z and M values are not carried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A closed ring of coordinates. The first ring of a polygon is its exterior.
pub type Ring = Vec<Coord>;

/// Simple-feature geometries shared by GeoJSON and Shapefile.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

/// The shape family a geometry lands in when written to a Shapefile, which
/// holds exactly one family per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Point,
    MultiPoint,
    Line,
    Polygon,
}

impl Geometry {
    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::MultiPoint(_) => "MultiPoint",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn shape_kind(&self) -> ShapeKind {
        match self {
            Self::Point(_) => ShapeKind::Point,
            Self::MultiPoint(_) => ShapeKind::MultiPoint,
            Self::LineString(_) | Self::MultiLineString(_) => ShapeKind::Line,
            Self::Polygon(_) | Self::MultiPolygon(_) => ShapeKind::Polygon,
        }
    }
}

/// One geometry plus its attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
}

/// Driver-independent set of features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }
}

/// Read a vector dataset with the driver for `format`.
pub fn read(path: &Path, format: FormatTag) -> Result<FeatureCollection> {
    match format {
        FormatTag::GeoJson => json::read(path),
        FormatTag::Shp => shp::read(path),
        other => Err(WandlerError::VectorError(format!(
            "{other} is not a vector format"
        ))),
    }
}

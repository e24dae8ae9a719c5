// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shapefile driver, built on the `shapefile` crate and its re-exported
// `dbase` attribute tables.
//
// A Shapefile is a set of sidecar files sharing one base name: geometry
// (.shp), index (.shx), attributes (.dbf), projection (.prj) and codepage
// (.cpg). Each file holds a single shape family, and dBase column names are
// limited to 10 bytes.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::record::{EsriShape, WritableShape};
use shapefile::{
    HasShapeType, Multipoint, Point, PointM, PointZ, Polygon, PolygonRing, Polyline, Shape,
    ShapeType,
};
use tracing::{debug, info, instrument, warn};
use wandler_core::error::{Result, WandlerError};

use super::{Coord, Feature, FeatureCollection, Geometry, Ring, ShapeKind};

/// Sidecar extensions in packaging order.
pub const SIDECAR_EXTENSIONS: [&str; 5] = ["shp", "shx", "dbf", "prj", "cpg"];

/// GeoJSON coordinates are WGS 84, so that is what the .prj declares.
const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

const CODEPAGE: &str = "UTF-8";

const MAX_FIELD_NAME_LEN: usize = 10;
const MAX_CHARACTER_LEN: usize = 254;
const NUMERIC_LEN: u8 = 24;
const NUMERIC_DECIMALS: u8 = 8;
/// Width of a numeric or logical column demoted to text; fits any rendered f64.
const DEMOTED_TEXT_LEN: usize = 32;
/// Bytes before the first record in a .shp file.
const SHP_HEADER_LEN: u64 = 100;
/// Record number and content length, both big-endian i32.
const RECORD_HEADER_LEN: u64 = 8;
/// Shape type code of a null record.
const NULL_SHAPE_CODE: i32 = 0;

/// Existing sidecar files next to `shp_path`, in [`SIDECAR_EXTENSIONS`] order.
pub fn sidecar_paths(shp_path: &Path) -> Vec<PathBuf> {
    SIDECAR_EXTENSIONS
        .iter()
        .map(|ext| shp_path.with_extension(ext))
        .filter(|path| path.is_file())
        .collect()
}

// -- Reading ------------------------------------------------------------------

/// Read a Shapefile (the .shp path; .shx and .dbf must sit next to it).
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read(path: &Path) -> Result<FeatureCollection> {
    let pairs = shapefile::read(path).map_err(|err| {
        WandlerError::VectorError(format!("failed to read {}: {}", path.display(), err))
    })?;

    let mut features = Vec::with_capacity(pairs.len());
    for (shape, record) in pairs {
        features.push(Feature {
            geometry: geometry_from_shape(shape)?,
            properties: properties_from_record(record),
        });
    }

    info!(features = features.len(), "Shapefile read");
    Ok(FeatureCollection::new(features))
}

/// Access to the planar part of the three shapefile point flavours.
trait Planar {
    fn coord(&self) -> Coord;
}

impl Planar for Point {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

impl Planar for PointM {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

impl Planar for PointZ {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

fn planar<P: Planar>(points: &[P]) -> Vec<Coord> {
    points.iter().map(Planar::coord).collect()
}

/// One part is a LineString, several are a MultiLineString.
fn lines_from_parts<P: Planar>(parts: &[Vec<P>]) -> Geometry {
    let mut lines: Vec<Vec<Coord>> = parts.iter().map(|part| planar(part)).collect();
    if lines.len() == 1 {
        Geometry::LineString(lines.remove(0))
    } else {
        Geometry::MultiLineString(lines)
    }
}

/// Each outer ring opens a new polygon; inner rings attach to the polygon
/// before them.
fn polygons_from_rings<P: Planar>(rings: &[PolygonRing<P>]) -> Geometry {
    let mut polygons: Vec<Vec<Ring>> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push(vec![planar(points)]),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(polygon) => polygon.push(planar(points)),
                None => {
                    warn!("inner ring before any outer ring, treating it as outer");
                    polygons.push(vec![planar(points)]);
                }
            },
        }
    }
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(polygons)
    }
}

fn geometry_from_shape(shape: Shape) -> Result<Option<Geometry>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::Point(p.coord()),
        Shape::PointM(p) => Geometry::Point(p.coord()),
        Shape::PointZ(p) => Geometry::Point(p.coord()),
        Shape::Multipoint(mp) => Geometry::MultiPoint(planar(mp.points())),
        Shape::MultipointM(mp) => Geometry::MultiPoint(planar(mp.points())),
        Shape::MultipointZ(mp) => Geometry::MultiPoint(planar(mp.points())),
        Shape::Polyline(pl) => lines_from_parts(pl.parts()),
        Shape::PolylineM(pl) => lines_from_parts(pl.parts()),
        Shape::PolylineZ(pl) => lines_from_parts(pl.parts()),
        Shape::Polygon(pg) => polygons_from_rings(pg.rings()),
        Shape::PolygonM(pg) => polygons_from_rings(pg.rings()),
        Shape::PolygonZ(pg) => polygons_from_rings(pg.rings()),
        Shape::Multipatch(_) => {
            return Err(WandlerError::VectorError(
                "Multipatch shapes are not supported".into(),
            ));
        }
    };
    Ok(Some(geometry))
}

fn number(n: f64) -> Value {
    // Whole numbers come back as integers so that `3` survives a round trip
    // through a numeric dBase column.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn json_from_field(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s.map(Value::String).unwrap_or(Value::Null),
        FieldValue::Numeric(n) => n.map(number).unwrap_or(Value::Null),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Float(f) => f.map(|f| number(f as f64)).unwrap_or(Value::Null),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Double(d) => number(d),
        FieldValue::Currency(c) => number(c),
        FieldValue::Memo(m) => Value::String(m),
        other => Value::String(format!("{other:?}")),
    }
}

fn properties_from_record(record: Record) -> Map<String, Value> {
    HashMap::<String, FieldValue>::from(record)
        .into_iter()
        .map(|(name, value)| (name, json_from_field(value)))
        .collect()
}

// -- Writing ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Logical,
    Character(usize),
}

/// One dBase column derived from a GeoJSON property key.
#[derive(Debug, Clone)]
struct Column {
    key: String,
    name: String,
    kind: ColumnKind,
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Widen a column type to accept `value`. Mixed types fall back to text.
fn widen(kind: Option<ColumnKind>, value: &Value) -> Option<ColumnKind> {
    let text_len = || text_of(value).len().clamp(1, MAX_CHARACTER_LEN);
    let observed = match value {
        Value::Null => return kind,
        Value::Number(_) => ColumnKind::Numeric,
        Value::Bool(_) => ColumnKind::Logical,
        _ => ColumnKind::Character(text_len()),
    };
    Some(match (kind, observed) {
        (None, observed) => observed,
        (Some(current), observed) if current == observed => current,
        (Some(ColumnKind::Character(a)), ColumnKind::Character(b)) => {
            ColumnKind::Character(a.max(b))
        }
        (Some(ColumnKind::Character(a)), _) => ColumnKind::Character(a.max(text_len())),
        (Some(_), _) => ColumnKind::Character(text_len().max(DEMOTED_TEXT_LEN)),
    })
}

/// Squeeze a property key into a unique dBase column name.
fn field_name_for(key: &str, taken: &HashSet<String>) -> String {
    let mut base: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(MAX_FIELD_NAME_LEN)
        .collect();
    if base.is_empty() {
        base = "field".into();
    }
    if !taken.contains(&base) {
        return base;
    }
    for n in 1.. {
        let suffix = format!("_{n}");
        let keep = MAX_FIELD_NAME_LEN.saturating_sub(suffix.len()).min(base.len());
        let candidate = format!("{}{}", &base[..keep], suffix);
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
    unreachable!("an unbounded counter always finds a free name")
}

fn infer_columns(collection: &FeatureCollection) -> Vec<Column> {
    let mut order: Vec<String> = Vec::new();
    let mut kinds: HashMap<String, Option<ColumnKind>> = HashMap::new();

    for feature in collection.iter() {
        for (key, value) in &feature.properties {
            let entry = kinds.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                None
            });
            *entry = widen(*entry, value);
        }
    }

    let mut taken = HashSet::new();
    order
        .into_iter()
        .map(|key| {
            let name = field_name_for(&key, &taken);
            taken.insert(name.clone());
            let kind = kinds
                .get(&key)
                .copied()
                .flatten()
                .unwrap_or(ColumnKind::Character(1));
            if name != key {
                debug!(key = %key, name = %name, "property key renamed for dBase");
            }
            Column { key, name, kind }
        })
        .collect()
}

fn table_builder(columns: &[Column]) -> Result<TableWriterBuilder> {
    let mut builder = TableWriterBuilder::new();
    for column in columns {
        let name = FieldName::try_from(column.name.as_str()).map_err(|err| {
            WandlerError::VectorError(format!("invalid column name {}: {:?}", column.name, err))
        })?;
        builder = match column.kind {
            ColumnKind::Numeric => builder.add_numeric_field(name, NUMERIC_LEN, NUMERIC_DECIMALS),
            ColumnKind::Logical => builder.add_logical_field(name),
            ColumnKind::Character(len) => builder.add_character_field(name, len as u8),
        };
    }
    Ok(builder)
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate_bytes(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

fn field_value(kind: ColumnKind, value: Option<&Value>) -> FieldValue {
    let value = value.filter(|v| !v.is_null());
    match kind {
        ColumnKind::Numeric => FieldValue::Numeric(value.and_then(Value::as_f64)),
        ColumnKind::Logical => FieldValue::Logical(value.and_then(Value::as_bool)),
        ColumnKind::Character(len) => {
            FieldValue::Character(value.map(|v| truncate_bytes(text_of(v), len)))
        }
    }
}

fn record_for(feature: &Feature, columns: &[Column]) -> Record {
    let mut record = Record::default();
    for column in columns {
        record.insert(
            column.name.clone(),
            field_value(column.kind, feature.properties.get(&column.key)),
        );
    }
    record
}

fn check_points(feature: usize, what: &str, points: &[Coord], min: usize) -> Result<()> {
    if points.len() < min {
        return Err(WandlerError::VectorError(format!(
            "feature {feature}: {what} needs at least {min} points, got {}",
            points.len()
        )));
    }
    Ok(())
}

fn shp_points(coords: &[Coord]) -> Vec<Point> {
    coords.iter().map(|c| Point::new(c.x, c.y)).collect()
}

fn polygon_rings(feature: usize, rings: &[Ring], out: &mut Vec<PolygonRing<Point>>) -> Result<()> {
    for (index, ring) in rings.iter().enumerate() {
        check_points(feature, "polygon ring", ring, 3)?;
        let points = shp_points(ring);
        out.push(if index == 0 {
            PolygonRing::Outer(points)
        } else {
            PolygonRing::Inner(points)
        });
    }
    Ok(())
}

fn to_point(feature: usize, geometry: &Geometry) -> Result<Point> {
    match geometry {
        Geometry::Point(c) => Ok(Point::new(c.x, c.y)),
        other => Err(mixed(feature, other)),
    }
}

fn to_multipoint(feature: usize, geometry: &Geometry) -> Result<Multipoint> {
    match geometry {
        Geometry::Point(c) => Ok(Multipoint::new(shp_points(std::slice::from_ref(c)))),
        Geometry::MultiPoint(cs) => {
            check_points(feature, "multipoint", cs, 1)?;
            Ok(Multipoint::new(shp_points(cs)))
        }
        other => Err(mixed(feature, other)),
    }
}

fn to_polyline(feature: usize, geometry: &Geometry) -> Result<Polyline> {
    let parts: Vec<&Vec<Coord>> = match geometry {
        Geometry::LineString(cs) => vec![cs],
        Geometry::MultiLineString(lines) => lines.iter().collect(),
        other => return Err(mixed(feature, other)),
    };
    if parts.is_empty() {
        return Err(WandlerError::VectorError(format!(
            "feature {feature}: empty MultiLineString"
        )));
    }
    for part in &parts {
        check_points(feature, "line", part, 2)?;
    }
    Ok(Polyline::with_parts(
        parts.into_iter().map(|p| shp_points(p)).collect(),
    ))
}

fn to_polygon(feature: usize, geometry: &Geometry) -> Result<Polygon> {
    let mut rings = Vec::new();
    match geometry {
        Geometry::Polygon(rs) => polygon_rings(feature, rs, &mut rings)?,
        Geometry::MultiPolygon(polygons) => {
            for rs in polygons {
                polygon_rings(feature, rs, &mut rings)?;
            }
        }
        other => return Err(mixed(feature, other)),
    }
    if rings.is_empty() {
        return Err(WandlerError::VectorError(format!(
            "feature {feature}: polygon without rings"
        )));
    }
    Ok(Polygon::with_rings(rings))
}

fn mixed(feature: usize, geometry: &Geometry) -> WandlerError {
    WandlerError::VectorError(format!(
        "feature {feature}: {} cannot share a shapefile with the first feature's geometry type",
        geometry.type_name()
    ))
}

/// One record's shape, or a null record.
///
/// The writer stamps every record with the file's shape type, so a null
/// slot is written with no content and re-tagged by [`mark_null_records`]
/// once the file is closed.
enum Slot<S> {
    Shape(S),
    Null,
}

impl<S: HasShapeType> HasShapeType for Slot<S> {
    fn shapetype() -> ShapeType {
        S::shapetype()
    }
}

impl<S: WritableShape> WritableShape for Slot<S> {
    fn size_in_bytes(&self) -> usize {
        match self {
            Slot::Shape(shape) => shape.size_in_bytes(),
            Slot::Null => 0,
        }
    }

    fn write_to<T: Write>(&self, dest: &mut T) -> std::result::Result<(), shapefile::Error> {
        match self {
            Slot::Shape(shape) => shape.write_to(dest),
            Slot::Null => Ok(()),
        }
    }
}

/// Range that leaves the header bounding box untouched.
const NO_RANGE: [f64; 2] = [f64::MAX, f64::MIN];

impl<S: EsriShape> EsriShape for Slot<S> {
    fn x_range(&self) -> [f64; 2] {
        match self {
            Slot::Shape(shape) => shape.x_range(),
            Slot::Null => NO_RANGE,
        }
    }

    fn y_range(&self) -> [f64; 2] {
        match self {
            Slot::Shape(shape) => shape.y_range(),
            Slot::Null => NO_RANGE,
        }
    }

    fn z_range(&self) -> [f64; 2] {
        match self {
            Slot::Shape(shape) => shape.z_range(),
            Slot::Null => NO_RANGE,
        }
    }

    fn m_range(&self) -> [f64; 2] {
        match self {
            Slot::Shape(shape) => shape.m_range(),
            Slot::Null => NO_RANGE,
        }
    }
}

/// Overwrite the shape type code of every null slot with the null code.
///
/// Records follow the 100-byte header back to back: an 8-byte record
/// header, the 4-byte type code, then the content.
fn mark_null_records<S: WritableShape>(shp_path: &Path, slots: &[Slot<S>]) -> Result<()> {
    if !slots.iter().any(|slot| matches!(slot, Slot::Null)) {
        return Ok(());
    }

    let mut file = OpenOptions::new().write(true).open(shp_path)?;
    let mut offset = SHP_HEADER_LEN;
    for slot in slots {
        if let Slot::Null = slot {
            file.seek(SeekFrom::Start(offset + RECORD_HEADER_LEN))?;
            file.write_all(&NULL_SHAPE_CODE.to_le_bytes())?;
        }
        offset += RECORD_HEADER_LEN + 4 + slot.size_in_bytes() as u64;
    }
    file.flush()?;
    Ok(())
}

/// Build every shape with `convert`, then stream shapes and records out.
/// Features without geometry become null records.
fn write_shapes<S: EsriShape>(
    shp_path: &Path,
    table: TableWriterBuilder,
    collection: &FeatureCollection,
    columns: &[Column],
    convert: impl Fn(usize, &Geometry) -> Result<S>,
) -> Result<()> {
    let mut slots = Vec::with_capacity(collection.len());
    let mut records = Vec::with_capacity(collection.len());
    for (index, feature) in collection.iter().enumerate() {
        slots.push(match &feature.geometry {
            Some(geometry) => Slot::Shape(convert(index, geometry)?),
            None => Slot::Null,
        });
        records.push(record_for(feature, columns));
    }

    let mut writer = shapefile::Writer::from_path(shp_path, table).map_err(|err| {
        WandlerError::VectorError(format!("cannot create {}: {}", shp_path.display(), err))
    })?;
    for (slot, record) in slots.iter().zip(&records) {
        writer.write_shape_and_record(slot, record).map_err(|err| {
            WandlerError::VectorError(format!("failed to write shape: {}", err))
        })?;
    }
    // Headers are finalised when the writer is dropped.
    drop(writer);

    let nulls = slots.iter().filter(|slot| matches!(slot, Slot::Null)).count();
    if nulls > 0 {
        debug!(nulls, "Marking null records");
    }
    mark_null_records(shp_path, &slots)
}

/// Shape family for the whole file. Points and multipoints share a file as
/// multipoints; any other mix is reported per feature while writing.
fn collection_kind(collection: &FeatureCollection) -> ShapeKind {
    let mut kinds = collection
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(Geometry::shape_kind);
    let Some(first) = kinds.next() else {
        return ShapeKind::Point;
    };
    kinds.fold(first, |kind, next| match (kind, next) {
        (ShapeKind::Point, ShapeKind::MultiPoint) | (ShapeKind::MultiPoint, ShapeKind::Point) => {
            ShapeKind::MultiPoint
        }
        (kind, _) => kind,
    })
}

/// Write `collection` as a Shapefile at `shp_path` and return the sidecar
/// files that now exist.
#[instrument(skip_all, fields(path = %shp_path.display(), features = collection.len()))]
pub fn write(collection: &FeatureCollection, shp_path: &Path) -> Result<Vec<PathBuf>> {
    let kind = collection_kind(collection);

    let columns = infer_columns(collection);
    let table = table_builder(&columns)?;
    info!(?kind, columns = columns.len(), "Writing shapefile");

    match kind {
        ShapeKind::Point => write_shapes(shp_path, table, collection, &columns, to_point)?,
        ShapeKind::MultiPoint => {
            write_shapes(shp_path, table, collection, &columns, to_multipoint)?
        }
        ShapeKind::Line => write_shapes(shp_path, table, collection, &columns, to_polyline)?,
        ShapeKind::Polygon => write_shapes(shp_path, table, collection, &columns, to_polygon)?,
    }

    std::fs::write(shp_path.with_extension("prj"), WGS84_PRJ)?;
    std::fs::write(shp_path.with_extension("cpg"), CODEPAGE)?;

    let sidecars = sidecar_paths(shp_path);
    debug!(sidecars = sidecars.len(), "Shapefile written");
    Ok(sidecars)
}

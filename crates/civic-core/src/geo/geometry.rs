//! The GeoJSON subset carried by records (parcels), regions and info layers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Bounds, LatLng};

/// `[lng, lat]` or `[lng, lat, alt]`.
pub type Position = Vec<f64>;

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Bounding rectangle of every position, or `None` when the geometry
    /// holds no usable coordinates.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = Vec::new();
        self.collect_points(&mut points);
        Bounds::from_points(points)
    }

    fn collect_points(&self, out: &mut Vec<LatLng>) {
        fn push(out: &mut Vec<LatLng>, position: &Position) {
            if let [lng, lat, ..] = position.as_slice() {
                let point = LatLng::new(*lat, *lng);
                if point.is_valid() {
                    out.push(point);
                }
            }
        }

        match self {
            Geometry::Point { coordinates } => push(out, coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().for_each(|p| push(out, p));
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().for_each(|p| push(out, p));
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(|p| push(out, p));
            }
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().for_each(|g| g.collect_points(out));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    pub properties: serde_json::Map<String, Value>,
}

/// Any GeoJSON document: a bare geometry, a feature or a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJson {
    Geometry(Geometry),
    Feature(Feature),
    FeatureCollection(Vec<Feature>),
}

impl GeoJson {
    /// Interpret a parsed JSON document, dispatching on its `type` member.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();

        match kind.as_str() {
            "Feature" => Ok(GeoJson::Feature(feature_from_value(value)?)),
            "FeatureCollection" => {
                let features = match value.get("features") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .cloned()
                        .map(feature_from_value)
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => Vec::new(),
                };
                Ok(GeoJson::FeatureCollection(features))
            }
            _ => Ok(GeoJson::Geometry(serde_json::from_value(value)?)),
        }
    }

    pub fn geometries(&self) -> Vec<&Geometry> {
        match self {
            GeoJson::Geometry(g) => vec![g],
            GeoJson::Feature(f) => f.geometry.iter().collect(),
            GeoJson::FeatureCollection(fs) => fs.iter().filter_map(|f| f.geometry.as_ref()).collect(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.geometries()
            .into_iter()
            .filter_map(Geometry::bounds)
            .reduce(|a, b| a.union(&b))
    }

    pub fn feature_count(&self) -> usize {
        match self {
            GeoJson::Geometry(_) | GeoJson::Feature(_) => 1,
            GeoJson::FeatureCollection(fs) => fs.len(),
        }
    }
}

fn feature_from_value(value: Value) -> Result<Feature, serde_json::Error> {
    let Value::Object(mut object) = value else {
        return Err(serde::de::Error::custom("feature must be a JSON object"));
    };

    let geometry = match object.remove("geometry") {
        None | Some(Value::Null) => None,
        Some(g) => Some(serde_json::from_value(g)?),
    };
    let properties = match object.remove("properties") {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    Ok(Feature {
        id: object.remove("id"),
        geometry,
        properties,
    })
}

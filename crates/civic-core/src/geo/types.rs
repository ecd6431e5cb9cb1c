use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within the latitude/longitude ranges a map can show.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Round both components to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        Self {
            lat: (self.lat * factor).round() / factor,
            lng: (self.lng * factor).round() / factor,
        }
    }
}

/// A pixel position in projected map space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned latitude/longitude rectangle.
///
/// Constructors normalise corner order, so `south <= north` and
/// `west <= east` hold for every value built through them. `pad` with a
/// ratio below -0.5 is the one way to produce an inverted rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Build bounds from any two opposite corners.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            south: a.lat.min(b.lat),
            west: a.lng.min(b.lng),
            north: a.lat.max(b.lat),
            east: a.lng.max(b.lng),
        }
    }

    /// Smallest bounds containing every point, or `None` for no points.
    pub fn from_points<I: IntoIterator<Item = LatLng>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_corners(first, first);
        for point in iter {
            bounds.extend_point(point);
        }
        Some(bounds)
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north, self.west)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south, self.east)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn extend_point(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.west = self.west.min(point.lng);
        self.north = self.north.max(point.lat);
        self.east = self.east.max(point.lng);
    }

    pub fn extend(&mut self, other: &Bounds) {
        self.extend_point(other.south_west());
        self.extend_point(other.north_east());
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut merged = *self;
        merged.extend(other);
        merged
    }

    pub fn contains_point(&self, point: LatLng) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.contains_point(other.south_west()) && self.contains_point(other.north_east())
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        other.north >= self.south
            && other.south <= self.north
            && other.east >= self.west
            && other.west <= self.east
    }

    /// Grow (or shrink, for negative ratios) by `ratio` of the current
    /// height and width on every side.
    pub fn pad(&self, ratio: f64) -> Bounds {
        let lat_buffer = (self.north - self.south).abs() * ratio;
        let lng_buffer = (self.east - self.west).abs() * ratio;
        Bounds {
            south: self.south - lat_buffer,
            west: self.west - lng_buffer,
            north: self.north + lat_buffer,
            east: self.east + lng_buffer,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite())
            && self.south <= self.north
            && self.west <= self.east
    }

    /// Clamp a point into these bounds.
    pub fn clamp(&self, point: LatLng) -> LatLng {
        LatLng::new(
            point.lat.clamp(self.south, self.north),
            point.lng.clamp(self.west, self.east),
        )
    }
}

/// Parse a `south,west,north,east` filter box string.
///
/// Any two opposite corners are accepted; malformed input (wrong arity,
/// unparsable or non-finite numbers) yields `None`.
pub fn box_string_to_bounds(raw: &str) -> Option<Bounds> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()?;

    match parts.as_slice() {
        [lat1, lng1, lat2, lng2] => Some(Bounds::from_corners(
            LatLng::new(*lat1, *lng1),
            LatLng::new(*lat2, *lng2),
        )),
        _ => None,
    }
}

/// Inverse of [`box_string_to_bounds`].
pub fn bounds_to_box_string(bounds: &Bounds) -> String {
    format!(
        "{},{},{},{}",
        bounds.south, bounds.west, bounds.north, bounds.east
    )
}

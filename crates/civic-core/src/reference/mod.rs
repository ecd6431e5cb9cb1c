//! The user's reference location ("you are here").

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::geo::LatLng;

/// How the reference point was last set. `Auto` means the user never chose
/// one and the marker stays hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetMethod {
    #[default]
    Auto,
    Address,
    Geolocate,
    Map,
}

impl fmt::Display for SetMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetMethod::Auto => "auto",
            SetMethod::Address => "address",
            SetMethod::Geolocate => "geolocate",
            SetMethod::Map => "map",
        })
    }
}

/// What a reference-location update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RefLocationChange {
    /// New method, when it differs from the previous one.
    pub method: Option<SetMethod>,
    pub point_changed: bool,
}

impl RefLocationChange {
    pub fn is_empty(&self) -> bool {
        self.method.is_none() && !self.point_changed
    }
}

/// Read/write access the map view needs.
pub trait ReferenceLocation {
    fn point(&self) -> LatLng;
    fn set_method(&self) -> SetMethod;
    fn set_from_lat_lng(&mut self, lat: f64, lng: f64) -> RefLocationChange;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefLocation {
    point: LatLng,
    method: SetMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip)]
    default_point: LatLng,
}

impl RefLocation {
    pub fn new(default_point: LatLng) -> Self {
        Self {
            point: default_point,
            method: SetMethod::Auto,
            address: None,
            default_point,
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn set_from_address(&mut self, address: &str, point: LatLng) -> RefLocationChange {
        let change = self.update(point, SetMethod::Address);
        if !change.is_empty() || self.address.as_deref() != Some(address) {
            self.address = Some(address.to_string());
        }
        change
    }

    pub fn set_from_geolocation(&mut self, point: LatLng) -> RefLocationChange {
        let change = self.update(point, SetMethod::Geolocate);
        if !change.is_empty() {
            self.address = None;
        }
        change
    }

    /// Forget the user's choice.
    pub fn reset_to_auto(&mut self) -> RefLocationChange {
        let default_point = self.default_point;
        let change = self.update(default_point, SetMethod::Auto);
        self.address = None;
        change
    }

    fn update(&mut self, point: LatLng, method: SetMethod) -> RefLocationChange {
        if !point.is_valid() {
            warn!(
                event = "core.reference.update_rejected",
                lat = point.lat,
                lng = point.lng
            );
            return RefLocationChange::default();
        }

        let change = RefLocationChange {
            method: (self.method != method).then_some(method),
            point_changed: self.point != point,
        };
        self.point = point;
        self.method = method;
        if !change.is_empty() {
            info!(
                event = "core.reference.location_changed",
                method = %method,
                lat = point.lat,
                lng = point.lng
            );
        }
        change
    }
}

impl ReferenceLocation for RefLocation {
    fn point(&self) -> LatLng {
        self.point
    }

    fn set_method(&self) -> SetMethod {
        self.method
    }

    fn set_from_lat_lng(&mut self, lat: f64, lng: f64) -> RefLocationChange {
        let change = self.update(LatLng::new(lat, lng), SetMethod::Map);
        if !change.is_empty() {
            self.address = None;
        }
        change
    }
}

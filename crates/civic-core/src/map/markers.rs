use serde::Serialize;

use crate::geo::LatLng;
use crate::records::RecordId;

use super::surface::{LayerHandle, Viewport};

/// Rendering state of a present marker. An absent marker has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerState {
    Unzoomed,
    /// Detail rendering; the level counts zoom steps above the threshold.
    Zoomed(u8),
}

/// Pointer input delivered to a record marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerInput {
    MouseOver,
    MouseOut,
    Click,
    PopupClose,
}

#[derive(Debug, Clone)]
pub(crate) struct MarkerEntry {
    pub record_id: RecordId,
    pub layer: LayerHandle,
    pub latlng: LatLng,
    pub state: MarkerState,
    pub attached: bool,
}

/// A parcel overlay, owned by the record it was drawn for.
#[derive(Debug, Clone)]
pub(crate) struct ParcelEntry {
    pub record_id: RecordId,
    pub layer: LayerHandle,
    pub attached: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OverlayEntry {
    pub layer: LayerHandle,
    pub attached: bool,
}

/// Next state of a marker at `latlng` for the given viewport.
///
/// Above the threshold, markers outside the viewport keep their state until
/// they are next seen.
pub(crate) fn next_state(
    viewport: &Viewport,
    threshold: u8,
    latlng: LatLng,
    current: MarkerState,
) -> MarkerState {
    if viewport.zoom < threshold {
        MarkerState::Unzoomed
    } else if viewport.bounds.contains_point(latlng) {
        MarkerState::Zoomed(viewport.zoom - threshold)
    } else {
        current
    }
}

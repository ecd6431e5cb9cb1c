use serde::Serialize;

use crate::list::ListRow;
use crate::map::MarkerState;
use crate::records::RecordId;
use crate::reference::RefLocation;

/// Where the last record fetch stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportSnapshot {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
    /// `south,west,north,east`, as used by `f.box`.
    pub bounds: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSnapshot {
    pub reference: String,
    pub state: MarkerState,
    pub attached: bool,
}

/// Serialisable summary of everything the explorer shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerSnapshot {
    pub hash: String,
    pub view: Option<String>,
    pub status: LoadStatus,
    pub viewport: ViewportSnapshot,
    pub record_count: usize,
    pub results_info: String,
    pub markers: Vec<MarkerSnapshot>,
    pub list: Vec<ListRow>,
    pub selection: Vec<RecordId>,
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_bounds: Option<String>,
    pub layers_shown: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_box: Option<String>,
    pub reference: RefLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(LoadStatus::Loaded).unwrap(),
            serde_json::json!("loaded")
        );
        assert_eq!(LoadStatus::default(), LoadStatus::Idle);
    }

    #[test]
    fn test_marker_state_serializes() {
        let marker = MarkerSnapshot {
            reference: "PB-1".to_string(),
            state: MarkerState::Zoomed(1),
            attached: true,
        };
        let value = serde_json::to_value(&marker).unwrap();
        assert_eq!(value["state"], serde_json::json!({"zoomed": 1}));
    }
}

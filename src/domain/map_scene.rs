// Map scene state for the live tracking panel
use serde::Serialize;

use crate::domain::track::Track;

pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: -6.2088,
    lng: 106.8456,
};
pub const DEFAULT_ZOOM: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            south_west: *first,
            north_east: *first,
        };
        for point in &points[1..] {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Viewport {
    FitBounds { bounds: LatLngBounds },
    Center { center: LatLng, zoom: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub points: Vec<LatLng>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPopup {
    pub speed_kmh: f64,
    pub heading_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    pub position: LatLng,
    pub popup: MarkerPopup,
}

/// Live device fix as the marker wants it, already in lat/lng order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivePosition {
    pub point: LatLng,
    pub speed_kmh: f64,
    pub heading_deg: f64,
}

/// Drawing state for one device's map. The scene keeps at most one
/// polyline and one marker and mutates them in place across updates
/// instead of rebuilding the layer set.
#[derive(Debug, Clone, PartialEq)]
pub struct MapScene {
    polyline: Option<Polyline>,
    marker: Option<Marker>,
    viewport: Viewport,
    zoom: u8,
}

impl Default for MapScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MapScene {
    pub fn new() -> Self {
        Self {
            polyline: None,
            marker: None,
            viewport: Viewport::Center {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM,
            },
            zoom: DEFAULT_ZOOM,
        }
    }

    /// Applies the latest track and live fix. Track points arrive in
    /// longitude/latitude order and are swapped into map order here. An
    /// empty track removes the polyline; a missing fix leaves any existing
    /// marker where it was.
    pub fn update(&mut self, track: &Track, live: Option<LivePosition>) {
        if track.is_empty() {
            self.polyline = None;
        } else {
            let points: Vec<LatLng> = track
                .points
                .iter()
                .map(|p| LatLng::new(p.latitude, p.longitude))
                .collect();
            match self.polyline.as_mut() {
                Some(line) => line.points = points,
                None => self.polyline = Some(Polyline { points }),
            }
            // The viewport follows the live fix when there is one, and the
            // whole track only when there is not.
            if live.is_none() {
                if let Some(line) = self.polyline.as_ref() {
                    if let Some(bounds) = LatLngBounds::from_points(&line.points) {
                        self.viewport = Viewport::FitBounds { bounds };
                    }
                }
            }
        }

        if let Some(live) = live {
            let popup = MarkerPopup {
                speed_kmh: live.speed_kmh,
                heading_deg: live.heading_deg,
            };
            match self.marker.as_mut() {
                Some(marker) => {
                    marker.position = live.point;
                    marker.popup = popup;
                }
                None => {
                    self.marker = Some(Marker {
                        position: live.point,
                        popup,
                    })
                }
            }
            self.viewport = Viewport::Center {
                center: live.point,
                zoom: self.zoom,
            };
        }
    }

    pub fn view(&self) -> MapView {
        MapView {
            polyline: self.polyline.clone(),
            marker: self.marker,
            viewport: self.viewport,
        }
    }
}

/// Serializable drawing instructions for the client map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub polyline: Option<Polyline>,
    pub marker: Option<Marker>,
    pub viewport: Viewport,
}

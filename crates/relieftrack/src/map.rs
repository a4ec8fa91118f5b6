//! Map model: viewport, overlay layer, and the renderer.
//!
//! A [`MapContext`] stands in for the on-screen map a front-end would own.
//! It is created when a view mounts and dropped when the view unmounts; there
//! is no global map handle. Rendering always clears the single overlay layer
//! before drawing, so rendering the same samples twice yields the same layer
//! state, and a failed fetch that never reaches [`MapContext::render`] leaves
//! the previous frame intact.

use serde::Serialize;
use tracing::debug;

use crate::config::MapConfig;
use crate::geo::{project, unproject, LatLng, LatLngBounds};
use crate::telemetry::PositionSample;

/// Current map center and zoom, mutated only by fit-to-bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportState {
    /// Center of the viewport.
    pub center: LatLng,
    /// Zoom level.
    pub zoom: f64,
}

/// Role of a rendered marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    /// First sample of a route.
    Start,
    /// Last sample of a route.
    End,
    /// A scatter point.
    Point,
}

/// One rendered marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    /// Where the marker sits.
    pub position: LatLng,
    /// What the marker represents.
    pub kind: MarkerKind,
}

/// The single mutable drawable surface holding all rendered geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayLayer {
    /// Route polyline, when rendered in route style.
    pub polyline: Option<Vec<LatLng>>,
    /// Rendered markers.
    pub markers: Vec<Marker>,
}

impl OverlayLayer {
    /// Remove all geometry.
    pub fn clear(&mut self) {
        self.polyline = None;
        self.markers.clear();
    }

    /// Whether the layer holds no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polyline.is_none() && self.markers.is_empty()
    }

    /// Count of drawn geometry pieces: polyline vertices plus markers.
    #[must_use]
    pub fn geometry_count(&self) -> usize {
        self.polyline.as_ref().map_or(0, Vec::len) + self.markers.len()
    }
}

/// How samples are drawn onto the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    /// Polyline through all samples plus start and end markers.
    Route,
    /// One point marker per sample.
    Scatter,
}

/// An owned map: viewport, overlay layer, and fit parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MapContext {
    style: RenderStyle,
    width: u32,
    height: u32,
    padding: u32,
    max_zoom: f64,
    viewport: ViewportState,
    overlay: OverlayLayer,
}

impl MapContext {
    /// Create a map for the given rendering style and viewport settings.
    #[must_use]
    pub fn new(style: RenderStyle, config: &MapConfig) -> Self {
        Self {
            style,
            width: config.width_px,
            height: config.height_px,
            padding: config.padding_px,
            max_zoom: config.max_zoom,
            viewport: ViewportState {
                center: LatLng::new(config.center_lat, config.center_lon),
                zoom: config.default_zoom,
            },
            overlay: OverlayLayer::default(),
        }
    }

    /// The current viewport.
    #[must_use]
    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    /// The overlay layer.
    #[must_use]
    pub fn overlay(&self) -> &OverlayLayer {
        &self.overlay
    }

    /// The geographic bounds currently visible in the viewport.
    #[must_use]
    pub fn viewport_bounds(&self) -> LatLngBounds {
        let (cx, cy) = project(self.viewport.center, self.viewport.zoom);
        let half_w = f64::from(self.width) / 2.0;
        let half_h = f64::from(self.height) / 2.0;
        let north_west = unproject(cx - half_w, cy - half_h, self.viewport.zoom);
        let south_east = unproject(cx + half_w, cy + half_h, self.viewport.zoom);
        LatLngBounds {
            south: south_east.lat,
            west: north_west.lon,
            north: north_west.lat,
            east: south_east.lon,
        }
    }

    /// Clear the overlay and redraw it from `samples`, then fit the viewport.
    ///
    /// Samples without finite coordinates are skipped. An empty (or entirely
    /// invalid) sample set clears the layer and leaves the viewport untouched.
    pub fn render(&mut self, samples: &[PositionSample]) {
        self.overlay.clear();

        let coords: Vec<LatLng> = samples
            .iter()
            .map(PositionSample::position)
            .filter(LatLng::is_valid)
            .collect();

        if coords.is_empty() {
            debug!("render: no drawable samples, layer cleared");
            return;
        }

        match self.style {
            RenderStyle::Route => {
                self.overlay.markers.push(Marker {
                    position: coords[0],
                    kind: MarkerKind::Start,
                });
                self.overlay.markers.push(Marker {
                    position: coords[coords.len() - 1],
                    kind: MarkerKind::End,
                });
                self.overlay.polyline = Some(coords.clone());
            }
            RenderStyle::Scatter => {
                self.overlay.markers.extend(coords.iter().map(|&position| Marker {
                    position,
                    kind: MarkerKind::Point,
                }));
            }
        }

        if let Some(bounds) = LatLngBounds::of(&coords) {
            self.viewport = ViewportState {
                center: bounds.center(),
                zoom: bounds.fit_zoom(self.width, self.height, self.padding, self.max_zoom),
            };
            debug!(
                drawn = coords.len(),
                zoom = self.viewport.zoom,
                "render: overlay redrawn, viewport fitted"
            );
        }
    }
}

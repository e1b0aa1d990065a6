//! Camera transform, pointer handling and hit-testing.
//!
//! The controller keeps no business state: it reports hover and click
//! changes as [`PointerOutcome`]s and the component forwards them to the
//! host callbacks.

use log::debug;

use super::state::ForceGraphState;
use super::style::node_radius;
use crate::graph::GraphNode;

/// Smallest zoom scale.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom scale.
pub const MAX_ZOOM: f64 = 10.0;
const CLICK_TOLERANCE: f64 = 3.0;

/// Pan offsets and zoom scale mapping graph space onto CSS pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset.
	pub x: f64,
	/// Vertical offset.
	pub y: f64,
	/// Scale.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// Graph origin at the centre of a `width` x `height` viewport.
	pub fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	/// CSS pixel position to graph space.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Graph position to CSS pixels.
	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(gx * self.k + self.x, gy * self.k + self.y)
	}

	/// Zooms by `factor` keeping the graph point under `(sx, sy)` fixed.
	/// The scale is clamped to `[MIN_ZOOM, MAX_ZOOM]`.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

/// Node drag in progress.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	/// Whether a node is held.
	pub active: bool,
	/// Held node.
	pub node_idx: Option<usize>,
	/// Pointer position at press.
	pub start_x: f64,
	/// Pointer position at press.
	pub start_y: f64,
	/// Node position at press.
	pub node_start_x: f64,
	/// Node position at press.
	pub node_start_y: f64,
	/// Whether the pointer travelled far enough to count as a drag.
	pub moved: bool,
}

/// Background pan in progress.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	/// Whether the background is held.
	pub active: bool,
	/// Pointer position at press.
	pub start_x: f64,
	/// Pointer position at press.
	pub start_y: f64,
	/// Transform at press.
	pub transform_start_x: f64,
	/// Transform at press.
	pub transform_start_y: f64,
	/// Whether the pointer travelled far enough to count as a pan.
	pub moved: bool,
}

/// Backing buffer geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
	/// Width in CSS pixels.
	pub width: f64,
	/// Height in CSS pixels.
	pub height: f64,
	/// Device pixel ratio.
	pub dpr: f64,
	hidden: bool,
	initialized: bool,
}

/// What the host has to do after a container size change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
	/// Container is zero-sized; skip painting.
	Hidden,
	/// First visible size, or visible again after being hidden: re-provision
	/// the buffer and recentre before painting.
	Reinitialize,
	/// Re-provision the buffer.
	Resized,
	/// Nothing changed.
	Unchanged,
}

impl Viewport {
	/// Viewport that has not been measured yet.
	pub fn unmeasured() -> Self {
		Self {
			width: 0.0,
			height: 0.0,
			dpr: 1.0,
			hidden: true,
			initialized: false,
		}
	}

	/// Records a new container size.
	pub fn observe(&mut self, width: f64, height: f64, dpr: f64) -> ResizeOutcome {
		let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
		if !(width > 0.0 && height > 0.0) {
			if !self.hidden {
				debug!("Graph container hidden");
			}
			self.hidden = true;
			return ResizeOutcome::Hidden;
		}
		let changed = width != self.width || height != self.height || dpr != self.dpr;
		self.width = width;
		self.height = height;
		self.dpr = dpr;
		if self.hidden || !self.initialized {
			self.hidden = false;
			self.initialized = true;
			return ResizeOutcome::Reinitialize;
		}
		if changed {
			ResizeOutcome::Resized
		} else {
			ResizeOutcome::Unchanged
		}
	}

	/// Whether painting makes sense.
	pub fn is_drawable(&self) -> bool {
		!self.hidden && self.width > 0.0 && self.height > 0.0
	}

	/// Backing buffer size in device pixels.
	pub fn backing_size(&self) -> (u32, u32) {
		(
			(self.width * self.dpr).round() as u32,
			(self.height * self.dpr).round() as u32,
		)
	}
}

/// Index of the node under `(sx, sy)`.
///
/// A node is a candidate when the pointer lies within its on-screen radius
/// plus `slop` pixels; the candidate with the smallest centre distance wins.
/// Equal distances keep the first node in iteration order.
pub fn node_at_position(
	nodes: &[GraphNode],
	transform: &ViewTransform,
	sx: f64,
	sy: f64,
	slop: f64,
) -> Option<usize> {
	let mut found: Option<(usize, f64)> = None;
	for (idx, node) in nodes.iter().enumerate() {
		let (nx, ny) = transform.graph_to_screen(node.x, node.y);
		let distance = (nx - sx).hypot(ny - sy);
		let reach = node_radius(node.degree) * transform.k + slop;
		if distance > reach {
			continue;
		}
		if found.is_none_or(|(_, best)| distance < best) {
			found = Some((idx, distance));
		}
	}
	found.map(|(idx, _)| idx)
}

/// Hover/click changes produced by one pointer event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointerOutcome {
	/// New hovered node id, when it changed.
	pub hover: Option<Option<String>>,
	/// Clicked node id (`None` for the background), when a click completed.
	pub click: Option<Option<String>>,
	/// Whether the view must be repainted.
	pub repaint: bool,
}

impl ForceGraphState {
	/// Node under a CSS pixel position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		node_at_position(&self.nodes, &self.transform, sx, sy, self.render_config.hit_slop)
	}

	/// Press: grab a node or start panning.
	pub fn pointer_down(&mut self, x: f64, y: f64) -> PointerOutcome {
		if let Some(idx) = self.node_at_position(x, y) {
			self.drag = DragState {
				active: true,
				node_idx: Some(idx),
				start_x: x,
				start_y: y,
				node_start_x: self.nodes[idx].x,
				node_start_y: self.nodes[idx].y,
				moved: false,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
				moved: false,
			};
		}
		PointerOutcome::default()
	}

	/// Move: drag, pan, or update hover.
	pub fn pointer_move(&mut self, x: f64, y: f64) -> PointerOutcome {
		let mut outcome = PointerOutcome::default();
		if self.drag.active {
			let Some(idx) = self.drag.node_idx else {
				return outcome;
			};
			let (dx, dy) = (x - self.drag.start_x, y - self.drag.start_y);
			if !self.drag.moved && dx.hypot(dy) <= CLICK_TOLERANCE {
				return outcome;
			}
			if !self.drag.moved {
				self.drag.moved = true;
				self.simulation.reheat();
			}
			let (nx, ny) = (
				self.drag.node_start_x + dx / self.transform.k,
				self.drag.node_start_y + dy / self.transform.k,
			);
			let node = &mut self.nodes[idx];
			node.x = nx;
			node.y = ny;
			node.pinned = Some((nx, ny));
			outcome.repaint = true;
		} else if self.pan.active {
			let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
			if self.pan.moved || dx.hypot(dy) > CLICK_TOLERANCE {
				self.pan.moved = true;
				self.transform.x = self.pan.transform_start_x + dx;
				self.transform.y = self.pan.transform_start_y + dy;
				outcome.repaint = true;
			}
		} else {
			let hovered = self.node_at_position(x, y);
			if self.set_hover(hovered) {
				outcome.hover = Some(hovered.map(|i| self.nodes[i].id.clone()));
				outcome.repaint = true;
			}
		}
		outcome
	}

	/// Release: finish a drag or pan, or report a click.
	pub fn pointer_up(&mut self, _x: f64, _y: f64) -> PointerOutcome {
		let mut outcome = PointerOutcome::default();
		if self.drag.active {
			if self.drag.moved {
				self.simulation.release();
			} else {
				outcome.click = Some(self.drag.node_idx.map(|i| self.nodes[i].id.clone()));
			}
		} else if self.pan.active && !self.pan.moved {
			outcome.click = Some(None);
		}
		self.drag = DragState::default();
		self.pan = PanState::default();
		outcome
	}

	/// Pointer left the canvas: cancel gestures and clear hover.
	pub fn pointer_leave(&mut self) -> PointerOutcome {
		let mut outcome = PointerOutcome::default();
		if self.drag.active && self.drag.moved {
			self.simulation.release();
		}
		self.drag = DragState::default();
		self.pan = PanState::default();
		if self.set_hover(None) {
			outcome.hover = Some(None);
			outcome.repaint = true;
		}
		outcome
	}

	/// Wheel: zoom about the pointer.
	pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> PointerOutcome {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.transform.zoom_at(x, y, factor);
		PointerOutcome {
			repaint: true,
			..PointerOutcome::default()
		}
	}
}

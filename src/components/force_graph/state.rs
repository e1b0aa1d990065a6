use std::collections::{HashMap, HashSet};

use log::debug;

use super::interaction::{DragState, PanState, ResizeOutcome, ViewTransform, Viewport};
use super::simulation::{Simulation, TickOutcome};
use super::types::{RenderConfig, SimulationConfig};
use crate::graph::aggregate::refresh_highlight;
use crate::graph::{AggregatedEdge, GraphData, GraphNode, GraphView};

/// Hovered node and its direct neighbours.
#[derive(Clone, Debug, Default)]
pub struct HoverState {
	/// Hovered node index.
	pub node: Option<usize>,
	/// Indices sharing an aggregated edge with the hovered node.
	pub neighbors: HashSet<usize>,
}

/// What one animation frame produced.
#[derive(Clone, Debug, Default)]
pub struct FrameOutcome {
	/// Whether the canvas must be repainted.
	pub repaint: bool,
	/// Positions committed when the run converged.
	pub committed: Option<Vec<GraphNode>>,
}

/// Everything one mounted graph owns: nodes, aggregated edges, the solver,
/// the camera and the externally driven highlight inputs.
///
/// Ticks and paints run one after the other on the same owner, so the
/// renderer only ever sees post-tick positions.
pub struct ForceGraphState {
	/// View the nodes were built for.
	pub view: GraphView,
	/// Node positions, owned by the solver between ticks.
	pub nodes: Vec<GraphNode>,
	/// One weighted edge per node pair.
	pub edges: Vec<AggregatedEdge>,
	/// Layout solver.
	pub simulation: Simulation,
	/// Camera.
	pub transform: ViewTransform,
	/// Container size in CSS pixels.
	pub viewport: Viewport,
	/// Node drag in progress.
	pub drag: DragState,
	/// Background pan in progress.
	pub pan: PanState,
	/// Hovered node and its neighbours.
	pub hover: HoverState,
	/// Selected node id, as supplied by the host.
	pub selected: Option<String>,
	/// Colours, alphas and label thresholds.
	pub render_config: RenderConfig,
	search: String,
	hovered_meeting: Option<String>,
	index: HashMap<String, usize>,
	centered: bool,
	dirty: bool,
	needs_paint: bool,
}

impl ForceGraphState {
	/// Aggregates `data` and seeds a solver run over it.
	pub fn new(
		data: &GraphData,
		sim_config: SimulationConfig,
		render_config: RenderConfig,
	) -> Self {
		let mut data = data.clone();
		let edges = data.aggregate(None);
		let mut simulation = Simulation::new(sim_config);
		simulation.seed(&data.nodes, &edges);
		let index = data
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
		debug!(
			"Graph state for {}: {} nodes, {} aggregated edges",
			data.view.label(),
			data.nodes.len(),
			edges.len()
		);

		Self {
			view: data.view,
			nodes: data.nodes,
			edges,
			simulation,
			transform: ViewTransform::default(),
			viewport: Viewport::unmeasured(),
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			selected: None,
			render_config,
			search: String::new(),
			hovered_meeting: None,
			index,
			centered: false,
			dirty: false,
			needs_paint: true,
		}
	}

	/// Keeps the camera and measured size of the graph this one replaces.
	pub fn inherit_camera(&mut self, previous: &ForceGraphState) {
		self.transform = previous.transform.clone();
		self.viewport = previous.viewport.clone();
		self.centered = previous.centered;
		self.needs_paint = true;
	}

	/// Index of the node with `id`.
	pub fn node_index(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Records a container size. The first visible size centres the camera.
	pub fn resize(&mut self, width: f64, height: f64, dpr: f64) -> ResizeOutcome {
		let outcome = self.viewport.observe(width, height, dpr);
		match outcome {
			ResizeOutcome::Reinitialize => {
				if !self.centered {
					self.transform = ViewTransform::centered(width, height);
					self.centered = true;
				}
				self.needs_paint = true;
			}
			ResizeOutcome::Resized => self.needs_paint = true,
			ResizeOutcome::Hidden | ResizeOutcome::Unchanged => {}
		}
		outcome
	}

	/// Advances the solver by one tick. Positions are committed once the run
	/// converges.
	pub fn frame(&mut self) -> FrameOutcome {
		let mut outcome = FrameOutcome {
			repaint: std::mem::take(&mut self.needs_paint),
			committed: None,
		};
		match self.simulation.tick(&mut self.nodes) {
			TickOutcome::Idle => {}
			TickOutcome::Advanced => {
				self.dirty = true;
				outcome.repaint = true;
			}
			TickOutcome::Converged => {
				outcome.repaint = true;
				outcome.committed = Some(self.commit());
			}
		}
		outcome
	}

	/// Stops the run. Returns the current positions when they have moved since
	/// the last commit, so the host never keeps a stale layout.
	pub fn stop(&mut self) -> Option<Vec<GraphNode>> {
		self.simulation.stop();
		if self.drag.moved {
			self.drag = DragState::default();
			self.dirty = true;
		}
		if self.dirty {
			Some(self.commit())
		} else {
			None
		}
	}

	fn commit(&mut self) -> Vec<GraphNode> {
		self.dirty = false;
		self.snapshot()
	}

	/// Copy of the nodes with velocities zeroed.
	pub fn snapshot(&self) -> Vec<GraphNode> {
		self.nodes
			.iter()
			.map(|n| GraphNode {
				vx: 0.0,
				vy: 0.0,
				..n.clone()
			})
			.collect()
	}

	/// Active search needle, lower case. Empty when no search is active.
	pub fn search(&self) -> &str {
		&self.search
	}

	/// Whether a search is active and `node` matches it.
	pub fn is_match(&self, node: &GraphNode) -> bool {
		node.matches(&self.search)
	}

	/// Sets the search text. Returns whether it changed.
	pub fn set_search(&mut self, text: &str) -> bool {
		let needle = text.trim().to_lowercase();
		if needle == self.search {
			return false;
		}
		self.search = needle;
		self.needs_paint = true;
		true
	}

	/// Sets the selected node id. Returns whether it changed.
	pub fn set_selected(&mut self, id: Option<String>) -> bool {
		if id == self.selected {
			return false;
		}
		self.selected = id;
		self.needs_paint = true;
		true
	}

	/// Re-highlights edges for a hovered meeting without rebuilding them.
	pub fn set_hovered_meeting(&mut self, meeting: Option<String>) -> bool {
		if meeting == self.hovered_meeting {
			return false;
		}
		refresh_highlight(&mut self.edges, meeting.as_deref());
		self.hovered_meeting = meeting;
		self.needs_paint = true;
		true
	}

	/// Sets the hovered node. Returns whether it changed.
	pub fn set_hover(&mut self, node: Option<usize>) -> bool {
		if self.hover.node == node {
			return false;
		}
		self.hover.node = node;
		self.hover.neighbors.clear();
		if let Some(idx) = node {
			let id = self.nodes[idx].id.as_str();
			for edge in &self.edges {
				let other = if edge.source == id {
					&edge.target
				} else if edge.target == id {
					&edge.source
				} else {
					continue;
				};
				if let Some(&n) = self.index.get(other) {
					self.hover.neighbors.insert(n);
				}
			}
		}
		self.needs_paint = true;
		true
	}

	/// Whether `idx` is the hovered node or one of its neighbours.
	pub fn is_highlighted(&self, idx: usize) -> bool {
		self.hover.node == Some(idx) || self.hover.neighbors.contains(&idx)
	}

	/// Whether a node is hovered.
	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{EdgeCategory, EdgeKind, RawEdge};

	fn meeting(a: &str, b: &str, id: &str) -> RawEdge {
		RawEdge {
			source: a.into(),
			target: b.into(),
			source_raw_id: a.into(),
			target_raw_id: b.into(),
			kind: EdgeKind::Meeting,
			category: EdgeCategory::Conversation,
			label: None,
			result: None,
			team_name: None,
			timestamp: None,
			meeting_ids: vec![id.into()],
		}
	}

	fn data() -> GraphData {
		GraphData {
			view: GraphView::Connections,
			nodes: vec![
				GraphNode::new("a", "Ana", -20.0, 0.0),
				GraphNode::new("b", "Ben", 20.0, 0.0),
				GraphNode::new("c", "Cal", 0.0, 30.0),
			],
			links: vec![meeting("a", "b", "m1"), meeting("b", "a", "m2"), meeting("b", "c", "m3")],
		}
	}

	fn run(state: &mut ForceGraphState) -> Vec<GraphNode> {
		for _ in 0..5_000 {
			if let Some(nodes) = state.frame().committed {
				return nodes;
			}
		}
		panic!("no commit");
	}

	fn fresh() -> ForceGraphState {
		ForceGraphState::new(&data(), SimulationConfig::default(), RenderConfig::default())
	}

	#[test]
	fn new_state_aggregates_and_counts_degrees() {
		let state = fresh();
		assert_eq!(state.edges.len(), 2);
		assert_eq!(state.edges[0].count, 2);
		let b = state.node_index("b").unwrap();
		assert_eq!(state.nodes[b].degree, 2);
		assert!(state.simulation.is_running());
	}

	#[test]
	fn converged_run_commits_once() {
		let mut state = fresh();
		let committed = run(&mut state);
		assert_eq!(committed.len(), 3);
		assert!(committed.iter().all(|n| n.vx == 0.0 && n.vy == 0.0));
		assert!(state.frame().committed.is_none());
		assert!(state.stop().is_none());
	}

	#[test]
	fn stop_mid_run_flushes_positions() {
		let mut state = fresh();
		for _ in 0..5 {
			state.frame();
		}
		let flushed = state.stop().expect("positions flushed");
		assert_eq!(flushed[0].x, state.nodes[0].x);
		assert!(!state.simulation.is_running());
		let before = state.nodes.clone();
		assert!(!state.frame().repaint);
		assert_eq!(before, state.nodes);
	}

	#[test]
	fn hovered_meeting_refreshes_highlight_in_place() {
		let mut state = fresh();
		assert!(state.set_hovered_meeting(Some("m2".into())));
		assert!(state.edges[0].highlighted);
		assert!(!state.edges[1].highlighted);
		assert!(!state.set_hovered_meeting(Some("m2".into())));
		state.set_hovered_meeting(None);
		assert!(state.edges.iter().all(|e| !e.highlighted));
	}

	#[test]
	fn hover_collects_neighbors() {
		let mut state = fresh();
		let b = state.node_index("b").unwrap();
		assert!(state.set_hover(Some(b)));
		assert_eq!(state.hover.neighbors.len(), 2);
		let a = state.node_index("a").unwrap();
		state.set_hover(Some(a));
		assert!(state.is_highlighted(b));
		assert!(!state.is_highlighted(state.node_index("c").unwrap()));
		assert!(!state.set_hover(Some(a)));
	}

	#[test]
	fn search_is_case_insensitive_and_trimmed() {
		let mut state = fresh();
		assert!(state.set_search("  BE "));
		assert_eq!(state.search(), "be");
		assert!(state.is_match(&state.nodes[1]));
		assert!(!state.is_match(&state.nodes[0]));
		state.set_search("");
		assert!(!state.is_match(&state.nodes[1]));
	}

	#[test]
	fn first_visible_size_centres_camera_once() {
		let mut state = fresh();
		assert_eq!(state.resize(0.0, 0.0, 1.0), ResizeOutcome::Hidden);
		assert_eq!(state.resize(800.0, 600.0, 1.0), ResizeOutcome::Reinitialize);
		assert_eq!(state.transform, ViewTransform::centered(800.0, 600.0));
		state.transform.x += 50.0;
		state.resize(0.0, 0.0, 1.0);
		assert_eq!(state.resize(800.0, 600.0, 1.0), ResizeOutcome::Reinitialize);
		assert_eq!(state.transform.x, 450.0);
	}

	#[test]
	fn rebuilt_state_keeps_camera() {
		let mut first = fresh();
		first.resize(640.0, 480.0, 2.0);
		first.transform.zoom_at(0.0, 0.0, 2.0);
		let mut second = fresh();
		second.inherit_camera(&first);
		assert_eq!(second.transform, first.transform);
		assert!(second.viewport.is_drawable());
		assert_eq!(second.resize(640.0, 480.0, 2.0), ResizeOutcome::Unchanged);
	}

	#[test]
	fn dragging_pins_and_reheats() {
		let mut state = fresh();
		state.resize(400.0, 400.0, 1.0);
		run(&mut state);
		let a = state.node_index("a").unwrap();
		let (sx, sy) = state.transform.graph_to_screen(state.nodes[a].x, state.nodes[a].y);

		state.pointer_down(sx, sy);
		let small = state.pointer_move(sx + 1.0, sy);
		assert!(!small.repaint);
		assert!(!state.simulation.is_running());

		state.pointer_move(sx + 40.0, sy);
		assert!(state.simulation.is_running());
		assert_eq!(state.nodes[a].pinned, Some((state.nodes[a].x, state.nodes[a].y)));
		let up = state.pointer_up(sx + 40.0, sy);
		assert!(up.click.is_none());
		assert!(state.nodes[a].pinned.is_some());
	}

	#[test]
	fn press_without_movement_is_a_click() {
		let mut state = fresh();
		state.resize(400.0, 400.0, 1.0);
		let b = state.node_index("b").unwrap();
		let (sx, sy) = state.transform.graph_to_screen(state.nodes[b].x, state.nodes[b].y);
		state.pointer_down(sx, sy);
		state.pointer_move(sx + 2.0, sy + 1.0);
		assert_eq!(state.pointer_up(sx, sy).click, Some(Some("b".to_string())));

		state.pointer_down(5.0, 5.0);
		assert_eq!(state.pointer_up(5.0, 5.0).click, Some(None));

		state.pointer_down(5.0, 5.0);
		state.pointer_move(60.0, 5.0);
		assert_eq!(state.pointer_up(60.0, 5.0).click, None);
		assert_eq!(state.transform.x, 255.0);
	}

	#[test]
	fn hover_reported_only_on_change() {
		let mut state = fresh();
		state.resize(400.0, 400.0, 1.0);
		let c = state.node_index("c").unwrap();
		let (sx, sy) = state.transform.graph_to_screen(state.nodes[c].x, state.nodes[c].y);
		assert_eq!(state.pointer_move(sx, sy).hover, Some(Some("c".to_string())));
		assert_eq!(state.pointer_move(sx + 1.0, sy).hover, None);
		assert_eq!(state.pointer_leave().hover, Some(None));
	}
}

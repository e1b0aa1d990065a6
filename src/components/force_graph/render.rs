//! Frame painter: edges, nodes, labels and group pills over a [`Surface`].

use indexmap::IndexMap;

use super::state::ForceGraphState;
use super::style::{
	MULTI_TEAM_RING, SECTION_LEADER_RING, edge_style, node_fill, node_radius, truncate_label,
};
use super::surface::Surface;
use crate::graph::{GraphNode, NodeRole};

const LABEL_COLOR: &str = "#e6e6e6";
const PILL_COLOR: &str = "rgba(255, 255, 255, 0.12)";
const HOVER_DIM: f64 = 0.35;

/// Paints one frame. Returns `false` without touching the surface when there
/// is nothing to draw: a hidden container or an empty graph.
pub fn render(state: &ForceGraphState, surface: &mut impl Surface) -> bool {
	let viewport = &state.viewport;
	if !viewport.is_drawable() || state.nodes.is_empty() {
		return false;
	}
	surface.reset(
		viewport.width,
		viewport.height,
		viewport.dpr,
		&state.render_config.background,
	);
	surface.set_camera(&state.transform, viewport.dpr);
	draw_edges(state, surface);
	draw_nodes(state, surface);

	surface.set_screen_space(viewport.dpr);
	draw_labels(state, surface);
	if state.view.is_grouped() {
		draw_group_pills(state, surface);
	}
	surface.set_alpha(1.0);
	true
}

/// Search matches stay fully opaque whatever else is hovered.
fn node_alpha(state: &ForceGraphState, idx: usize, node: &GraphNode) -> f64 {
	let searching = !state.search().is_empty();
	if searching && state.is_match(node) {
		return 1.0;
	}
	let mut alpha = 1.0;
	if searching {
		alpha *= state.render_config.search_dim_alpha;
	}
	if state.has_active_highlight() && !state.is_highlighted(idx) {
		alpha *= HOVER_DIM;
	}
	alpha
}

fn draw_edges(state: &ForceGraphState, surface: &mut impl Surface) {
	let config = &state.render_config;
	let k = state.transform.k;
	let searching = !state.search().is_empty();

	for edge in &state.edges {
		let (Some(s), Some(t)) = (
			state.node_index(&edge.source),
			state.node_index(&edge.target),
		) else {
			continue;
		};
		let (a, b) = (&state.nodes[s], &state.nodes[t]);
		let style = edge_style(edge, a, b, config.edge_width);
		let mut alpha = config.edge_alpha * style.alpha;
		let mut width = style.width;
		let mut color = style.color;

		if searching && !state.is_match(a) && !state.is_match(b) {
			alpha *= config.search_dim_alpha;
		}
		if let Some(hovered) = state.hover.node {
			if s == hovered || t == hovered {
				alpha = (alpha * 2.0).min(1.0);
				width *= 1.5;
			} else {
				alpha *= HOVER_DIM;
			}
		}
		if edge.highlighted {
			color = config.highlight.as_str();
			alpha = 1.0;
			width *= 2.0;
		}

		surface.set_alpha(alpha);
		surface.stroke_line(
			(a.x, a.y),
			(b.x, b.y),
			color,
			width / k,
			style.dash.map(|(dash, gap)| (dash / k, gap / k)),
		);
	}
}

fn draw_node(state: &ForceGraphState, surface: &mut impl Surface, idx: usize, alpha: f64) {
	let node = &state.nodes[idx];
	let k = state.transform.k;
	let radius = node_radius(node.degree);
	let center = (node.x, node.y);

	surface.set_alpha(alpha);
	surface.fill_circle(center, radius, node_fill(node));
	if node.teams.len() > 1 {
		surface.stroke_circle(center, radius + 1.5 / k, MULTI_TEAM_RING, 2.0 / k);
	}
	if node.role == NodeRole::SectionLeader {
		surface.stroke_circle(center, radius + 3.5 / k, SECTION_LEADER_RING, 1.5 / k);
	}
	if state.selected.as_deref() == Some(node.id.as_str()) {
		surface.set_alpha(1.0);
		surface.stroke_circle(center, radius + 5.0 / k, &state.render_config.highlight, 2.5 / k);
	}
}

fn draw_nodes(state: &ForceGraphState, surface: &mut impl Surface) {
	let searching = !state.search().is_empty();
	for (idx, node) in state.nodes.iter().enumerate() {
		if searching && state.is_match(node) {
			continue;
		}
		draw_node(state, surface, idx, node_alpha(state, idx, node));
	}
	if !searching {
		return;
	}

	// Matches go last so dimmed context never covers them.
	let k = state.transform.k;
	let glow = &state.render_config.highlight;
	for (idx, node) in state.nodes.iter().enumerate() {
		if !state.is_match(node) {
			continue;
		}
		let radius = node_radius(node.degree);
		for (ring, alpha) in [(3.0, 0.6), (6.0, 0.35), (9.0, 0.15)] {
			surface.set_alpha(alpha);
			surface.stroke_circle((node.x, node.y), radius + ring / k, glow, 2.0 / k);
		}
		draw_node(state, surface, idx, node_alpha(state, idx, node));
	}
}

fn wants_label(state: &ForceGraphState, idx: usize, node: &GraphNode) -> bool {
	node_radius(node.degree) * state.transform.k >= state.render_config.label_min_radius
		|| state.selected.as_deref() == Some(node.id.as_str())
		|| state.hover.node == Some(idx)
		|| state.is_match(node)
		|| node.role.is_protected()
}

fn draw_labels(state: &ForceGraphState, surface: &mut impl Surface) {
	let config = &state.render_config;
	let font = config.font();
	let k = state.transform.k;

	for (idx, node) in state.nodes.iter().enumerate() {
		if !wants_label(state, idx, node) {
			continue;
		}
		let text = truncate_label(&node.name, config.label_max_width, |s| {
			surface.measure_text(s, &font)
		});
		let (sx, sy) = state.transform.graph_to_screen(node.x, node.y);
		let x = sx + node_radius(node.degree) * k + 4.0;
		let y = sy + config.font_size / 3.0;

		if state.is_match(node) {
			let width = surface.measure_text(&text, &font);
			let pad = 3.0;
			surface.set_alpha(1.0);
			surface.fill_rounded_rect(
				x - pad,
				y - config.font_size - pad / 2.0,
				width + pad * 2.0,
				config.font_size + pad * 2.0,
				3.0,
				&config.background,
			);
			surface.fill_text(&text, x, y, &font, &config.highlight);
		} else {
			surface.set_alpha(node_alpha(state, idx, node));
			surface.fill_text(&text, x, y, &font, LABEL_COLOR);
		}
	}
}

fn draw_group_pills(state: &ForceGraphState, surface: &mut impl Surface) {
	// group -> (sum x, sum y, count, top y)
	let mut groups: IndexMap<&str, (f64, f64, usize, f64)> = IndexMap::new();
	for node in &state.nodes {
		let Some(group) = node.group.as_deref() else {
			continue;
		};
		let top = node.y - node_radius(node.degree);
		let entry = groups.entry(group).or_insert((0.0, 0.0, 0, f64::INFINITY));
		entry.0 += node.x;
		entry.1 += node.y;
		entry.2 += 1;
		entry.3 = entry.3.min(top);
	}

	let config = &state.render_config;
	let font = config.font();
	surface.set_alpha(1.0);
	for (group, (sum_x, _sum_y, count, top)) in groups {
		let (cx, cy) = state.transform.graph_to_screen(sum_x / count as f64, top);
		let width = surface.measure_text(group, &font);
		let (w, h) = (width + 16.0, config.font_size + 8.0);
		let (x, y) = (cx - w / 2.0, cy - h - 18.0);
		surface.fill_rounded_rect(x, y, w, h, h / 2.0, PILL_COLOR);
		surface.fill_text(group, x + 8.0, y + h - 6.0, &font, LABEL_COLOR);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::surface::{DrawOp, RecordingSurface};
	use crate::components::force_graph::types::{RenderConfig, SimulationConfig};
	use crate::graph::{EdgeCategory, EdgeKind, GraphData, GraphView, RawEdge};

	fn person(id: &str, name: &str, team: &str, x: f64) -> GraphNode {
		let mut node = GraphNode::new(id, name, x, 0.0);
		node.teams = vec![team.into()];
		node.group = Some("North".into());
		node.roster_member = true;
		node
	}

	fn state_for(view: GraphView, nodes: Vec<GraphNode>, links: Vec<RawEdge>) -> ForceGraphState {
		let data = GraphData { view, nodes, links };
		let mut state =
			ForceGraphState::new(&data, SimulationConfig::default(), RenderConfig::default());
		state.resize(800.0, 600.0, 2.0);
		state
	}

	fn circles(surface: &RecordingSurface) -> Vec<(f64, f64)> {
		surface
			.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::Circle { center, alpha, .. } => Some((center.0, *alpha)),
				_ => None,
			})
			.collect()
	}

	#[test]
	fn skips_hidden_or_empty_graphs() {
		let mut surface = RecordingSurface::new();
		let nodes = vec![person("a", "Ana", "T", 0.0)];
		let mut state = state_for(GraphView::Connections, nodes, vec![]);
		state.resize(0.0, 600.0, 1.0);
		assert!(!render(&state, &mut surface));

		let empty = state_for(GraphView::Connections, vec![], vec![]);
		assert!(!render(&empty, &mut surface));
		assert!(surface.ops.is_empty());
	}

	#[test]
	fn edges_are_drawn_beneath_nodes() {
		let nodes = vec![person("a", "Ana", "T", 0.0), person("b", "Ben", "T", 50.0)];
		let links = vec![RawEdge::team(("a", "a"), ("b", "b"), "T")];
		let state = state_for(GraphView::Connections, nodes, links);
		let mut surface = RecordingSurface::new();
		assert!(render(&state, &mut surface));

		assert!(matches!(surface.ops[0], DrawOp::Clear { .. }));
		let line = surface.ops.iter().position(|op| matches!(op, DrawOp::Line { .. })).unwrap();
		let circle = surface.ops.iter().position(|op| matches!(op, DrawOp::Circle { .. })).unwrap();
		let text = surface.ops.iter().position(|op| matches!(op, DrawOp::Text { .. }));
		assert!(line < circle);
		if let Some(text) = text {
			assert!(text > circle);
		}
	}

	#[test]
	fn search_dims_non_matches_and_boxes_matches() {
		let nodes = vec![
			person("1", "Leo Park", "Tenants", 0.0),
			person("2", "Ana Ruiz", "Tenants", 100.0),
			person("3", "Sam Cole", "Leopards", 200.0),
			person("4", "Kim Yu", "Tenants", 300.0),
		];
		let mut state = state_for(GraphView::Connections, nodes, vec![]);
		state.set_search("LEO");
		let mut surface = RecordingSurface::new();
		render(&state, &mut surface);

		for (x, alpha) in circles(&surface) {
			let matched = x == 0.0 || x == 200.0;
			if matched {
				assert_eq!(alpha, 1.0, "match at {x}");
			} else {
				assert_eq!(alpha, 0.25, "non-match at {x}");
			}
		}
		let glow_rings = surface
			.ops
			.iter()
			.filter(|op| matches!(op, DrawOp::Ring { color, .. } if color == "#ffd166"))
			.count();
		assert_eq!(glow_rings, 6);

		let texts = surface.texts();
		assert!(texts.contains(&"Leo Park"));
		assert!(texts.contains(&"Sam Cole"));
		assert!(!texts.contains(&"Ana Ruiz"));
		let boxes = surface.ops.iter().filter(|op| matches!(op, DrawOp::Rect { .. })).count();
		assert_eq!(boxes, 2);
	}

	#[test]
	fn hovering_elsewhere_keeps_matches_opaque() {
		let nodes = vec![
			person("a", "Ana Ruiz", "Tenants", 0.0),
			person("b", "Bo Chen", "Tenants", 100.0),
			person("c", "Leo Park", "Transit", 200.0),
			person("d", "Kim Yu", "Transit", 300.0),
		];
		let links = vec![RawEdge::team(("a", "a"), ("b", "b"), "Tenants")];
		let mut state = state_for(GraphView::Connections, nodes, links);
		state.set_search("leo");
		state.set_hover(state.node_index("a"));
		let mut surface = RecordingSurface::new();
		render(&state, &mut surface);

		let alpha_at = |x: f64| {
			circles(&surface)
				.into_iter()
				.find(|(cx, _)| *cx == x)
				.map(|(_, alpha)| alpha)
		};
		assert_eq!(alpha_at(200.0), Some(1.0));
		assert_eq!(alpha_at(0.0), Some(0.25));
		assert!((alpha_at(300.0).unwrap() - 0.25 * HOVER_DIM).abs() < 1e-12);
	}

	#[test]
	fn labels_follow_size_selection_and_role() {
		let mut lead = person("l", "Lee Lead", "T", 0.0);
		lead.role = NodeRole::TeamLead;
		let nodes = vec![lead, person("p", "Pat", "T", 50.0), person("q", "Quinn", "T", 100.0)];
		let mut state = state_for(GraphView::Connections, nodes, vec![]);
		state.set_selected(Some("q".into()));
		let mut surface = RecordingSurface::new();
		render(&state, &mut surface);
		let texts = surface.texts();
		assert_eq!(texts, vec!["Lee Lead", "Quinn"]);

		state.transform.k = 3.0;
		let mut zoomed = RecordingSurface::new();
		render(&state, &mut zoomed);
		assert_eq!(zoomed.texts().len(), 3);
	}

	#[test]
	fn multi_team_and_selected_rings() {
		let mut shared = person("s", "Sky", "A", 0.0);
		shared.teams.push("B".into());
		let nodes = vec![shared, person("o", "Oli", "A", 50.0)];
		let mut state = state_for(GraphView::Connections, nodes, vec![]);
		state.set_selected(Some("o".into()));
		let mut surface = RecordingSurface::new();
		render(&state, &mut surface);
		let rings: Vec<&str> = surface
			.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::Ring { color, .. } => Some(color.as_str()),
				_ => None,
			})
			.collect();
		assert_eq!(rings, vec![MULTI_TEAM_RING, "#ffd166"]);
	}

	#[test]
	fn hovered_meeting_edges_use_highlight_colour() {
		let meeting = RawEdge {
			source: "a".into(),
			target: "b".into(),
			source_raw_id: "a".into(),
			target_raw_id: "b".into(),
			kind: EdgeKind::Meeting,
			category: EdgeCategory::Conversation,
			label: None,
			result: None,
			team_name: None,
			timestamp: None,
			meeting_ids: vec!["m9".into()],
		};
		let nodes = vec![person("a", "Ana", "T", 0.0), person("b", "Ben", "T", 50.0)];
		let mut state = state_for(GraphView::Connections, nodes, vec![meeting]);
		state.set_hovered_meeting(Some("m9".into()));
		let mut surface = RecordingSurface::new();
		render(&state, &mut surface);
		assert!(surface.ops.iter().any(|op| matches!(
			op,
			DrawOp::Line { color, alpha, .. } if color == "#ffd166" && *alpha == 1.0
		)));
	}

	#[test]
	fn grouped_views_draw_group_pills() {
		let mut south = person("b", "Ben", "U", 50.0);
		south.group = Some("South".into());
		let nodes = vec![person("a", "Ana", "T", 0.0), south];
		let grouped = state_for(GraphView::TeamMembers, nodes.clone(), vec![]);
		let mut surface = RecordingSurface::new();
		render(&grouped, &mut surface);
		let texts = surface.texts();
		assert!(texts.contains(&"North") && texts.contains(&"South"));

		let flat = state_for(GraphView::Connections, nodes, vec![]);
		let mut surface = RecordingSurface::new();
		render(&flat, &mut surface);
		assert!(!surface.texts().contains(&"North"));
	}
}

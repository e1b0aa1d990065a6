//! Category-driven styling shared by the renderer and hit-testing.

use crate::graph::{AggregatedEdge, EdgeCategory, EngagementLevel, GraphNode, NodeRole};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Radius of a node with no edges, in graph units.
pub const NODE_RADIUS: f64 = 5.0;
const MAX_RADIUS: f64 = 22.0;

/// Ring colour for people on more than one roster.
pub const MULTI_TEAM_RING: &str = "#f5a623";
/// Ring colour for section leaders.
pub const SECTION_LEADER_RING: &str = "#ffffff";

/// Node radius in graph units. Grows with the log of the degree.
pub fn node_radius(degree: usize) -> f64 {
	(NODE_RADIUS + ((degree + 1) as f64).log2() * 2.5).min(MAX_RADIUS)
}

/// Fill colour for an engagement bucket.
pub fn engagement_color(level: EngagementLevel) -> &'static str {
	match level {
		EngagementLevel::Staff => COLORS[3],
		EngagementLevel::TeamLeader => COLORS[1],
		EngagementLevel::TeamMember => COLORS[0],
		EngagementLevel::Supporter => COLORS[2],
		EngagementLevel::Unknown => COLORS[7],
	}
}

/// Fill colour for a node.
pub fn node_fill(node: &GraphNode) -> &'static str {
	match node.role {
		NodeRole::Organizer if !node.roster_member => COLORS[4],
		NodeRole::Contact if node.engagement == EngagementLevel::Unknown => COLORS[5],
		_ => engagement_color(node.engagement),
	}
}

/// Visual class of an aggregated edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeStyleClass {
	/// Shared roster.
	Team,
	/// Conversation inside one group.
	Conversation,
	/// Conversation between roster members of different groups.
	InterGroup,
	/// Conversation between two leaders.
	LeadershipChain,
	/// Conversation with a non-roster contact.
	Constituent,
}

/// Stroke parameters for one edge, widths in screen pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeStyle {
	/// Class the style was derived from.
	pub class: EdgeStyleClass,
	/// Stroke colour.
	pub color: &'static str,
	/// Stroke width.
	pub width: f64,
	/// Opacity multiplier on top of the configured edge alpha.
	pub alpha: f64,
	/// Dash and gap lengths.
	pub dash: Option<(f64, f64)>,
}

/// Staff, team leaders and anyone holding a lead role on a roster.
pub fn is_leader(node: &GraphNode) -> bool {
	matches!(node.role, NodeRole::TeamLead | NodeRole::SectionLeader)
		|| matches!(node.engagement, EngagementLevel::Staff | EngagementLevel::TeamLeader)
}

/// Classifies an edge by its category and endpoints.
pub fn classify_edge(edge: &AggregatedEdge, a: &GraphNode, b: &GraphNode) -> EdgeStyleClass {
	if edge.category == EdgeCategory::TeamConnection {
		return EdgeStyleClass::Team;
	}
	if a.role == NodeRole::Contact || b.role == NodeRole::Contact {
		return EdgeStyleClass::Constituent;
	}
	if is_leader(a) && is_leader(b) {
		return EdgeStyleClass::LeadershipChain;
	}
	let shares_team = a.teams.iter().any(|t| b.teams.contains(t));
	if a.roster_member && b.roster_member && !shares_team && a.group != b.group {
		return EdgeStyleClass::InterGroup;
	}
	EdgeStyleClass::Conversation
}

/// Stroke style for an edge. Width grows with the log of the aggregated count.
pub fn edge_style(
	edge: &AggregatedEdge,
	a: &GraphNode,
	b: &GraphNode,
	base_width: f64,
) -> EdgeStyle {
	let class = classify_edge(edge, a, b);
	let weight = 1.0 + (edge.count.max(1) as f64).log2() * 0.5;
	let (color, width, alpha, dash) = match class {
		EdgeStyleClass::Team => ("#64b4ff", base_width * weight, 1.0, None),
		EdgeStyleClass::Conversation => ("#9be7a1", base_width * weight, 1.0, None),
		EdgeStyleClass::InterGroup => ("#c7a0ff", base_width * weight, 1.0, Some((6.0, 4.0))),
		EdgeStyleClass::LeadershipChain => ("#f4a259", base_width * weight, 1.0, Some((2.0, 3.0))),
		EdgeStyleClass::Constituent => ("#8892a6", base_width * 0.5, 0.5, None),
	};
	EdgeStyle {
		class,
		color,
		width,
		alpha,
		dash,
	}
}

/// Shortens `text` with an ellipsis until `measure` says it fits in `max_width`.
pub fn truncate_label(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> String {
	if measure(text) <= max_width {
		return text.to_string();
	}
	let chars: Vec<char> = text.chars().collect();
	for keep in (0..chars.len()).rev() {
		let candidate: String = chars[..keep].iter().collect::<String>() + "…";
		if measure(&candidate) <= max_width {
			return candidate;
		}
	}
	"…".to_string()
}

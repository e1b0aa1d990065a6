use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Graph construction mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphView {
	/// Roster cliques only.
	#[default]
	TeamMembers,
	/// Roster cliques plus the conversation network from meetings.
	Connections,
	/// Connections, filtered down to a set of engagement buckets.
	ByEngagementLevel,
}

impl GraphView {
	/// Every view, in menu order.
	pub const ALL: [GraphView; 3] = [
		GraphView::TeamMembers,
		GraphView::Connections,
		GraphView::ByEngagementLevel,
	];

	/// Human readable name.
	pub fn label(self) -> &'static str {
		match self {
			GraphView::TeamMembers => "Team members",
			GraphView::Connections => "Connections",
			GraphView::ByEngagementLevel => "Leadership by LOE",
		}
	}

	/// Whether nodes cluster by team closely enough for centroid labels.
	pub fn is_grouped(self) -> bool {
		matches!(self, GraphView::TeamMembers)
	}
}

/// Coarse ordinal classification of organizing involvement.
///
/// Declaration order is rank order: `Staff` is the highest.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
	/// Paid or staff-equivalent organizer.
	Staff,
	/// Leads a team.
	TeamLeader,
	/// Active team member.
	TeamMember,
	/// Supporter or constituent.
	Supporter,
	/// Not classified.
	#[default]
	Unknown,
}

impl EngagementLevel {
	/// Every bucket, highest first.
	pub const ALL: [EngagementLevel; 5] = [
		EngagementLevel::Staff,
		EngagementLevel::TeamLeader,
		EngagementLevel::TeamMember,
		EngagementLevel::Supporter,
		EngagementLevel::Unknown,
	];

	/// Parses free-form level tags such as `"2: Team Leader"`, `"staff"` or `"4"`.
	pub fn parse(raw: &str) -> Self {
		let raw = raw.trim().to_ascii_lowercase();
		match raw.chars().next() {
			Some('1') => return EngagementLevel::Staff,
			Some('2') => return EngagementLevel::TeamLeader,
			Some('3') => return EngagementLevel::TeamMember,
			Some('4') => return EngagementLevel::Supporter,
			_ => {}
		}
		if raw.contains("staff") {
			EngagementLevel::Staff
		} else if raw.contains("lead") {
			EngagementLevel::TeamLeader
		} else if raw.contains("member") {
			EngagementLevel::TeamMember
		} else if raw.contains("support") || raw.contains("constituent") {
			EngagementLevel::Supporter
		} else {
			EngagementLevel::Unknown
		}
	}

	/// Human readable name.
	pub fn label(self) -> &'static str {
		match self {
			EngagementLevel::Staff => "Staff",
			EngagementLevel::TeamLeader => "Team leader",
			EngagementLevel::TeamMember => "Team member",
			EngagementLevel::Supporter => "Supporter",
			EngagementLevel::Unknown => "Unknown",
		}
	}
}

/// Role tag attached to a node; drives fill and ring styling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
	/// Member of exactly one roster.
	#[default]
	TeamMember,
	/// Listed as the lead of a team.
	TeamLead,
	/// Section leader.
	SectionLeader,
	/// Appears on more than one roster.
	MultiTeamMember,
	/// Meeting organizer not on any roster.
	Organizer,
	/// Meeting participant not on any roster.
	Contact,
}

impl NodeRole {
	/// Reads a roster role string.
	pub fn from_roster(role: Option<&str>) -> Self {
		let role = role.unwrap_or_default().to_ascii_lowercase();
		if role.contains("section") {
			NodeRole::SectionLeader
		} else if role.contains("lead") {
			NodeRole::TeamLead
		} else {
			NodeRole::TeamMember
		}
	}

	/// Roles whose labels are always drawn.
	pub fn is_protected(self) -> bool {
		matches!(self, NodeRole::TeamLead | NodeRole::SectionLeader)
	}
}

/// One canonical person in the graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	/// Canonical id.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Chapter or group.
	pub group: Option<String>,
	/// Names of the rosters the person appears on.
	pub teams: Vec<String>,
	/// Role tag.
	pub role: NodeRole,
	/// Engagement bucket.
	pub engagement: EngagementLevel,
	/// Whether the person came from a roster rather than only from meetings.
	pub roster_member: bool,
	/// Number of distinct aggregated edges touching this node.
	pub degree: usize,
	/// Layout position.
	pub x: f64,
	/// Layout position.
	pub y: f64,
	/// Velocity.
	pub vx: f64,
	/// Velocity.
	pub vy: f64,
	/// Fixed position while pinned.
	pub pinned: Option<(f64, f64)>,
	/// Position came from a committed layout rather than a builder seed.
	#[serde(default)]
	pub restored: bool,
}

impl GraphNode {
	/// Node at a seed position.
	pub fn new(id: impl Into<String>, name: impl Into<String>, x: f64, y: f64) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			x,
			y,
			..Self::default()
		}
	}

	/// Whether name, team or group contains `needle`. `needle` must already be lower case.
	pub fn matches(&self, needle: &str) -> bool {
		if needle.is_empty() {
			return false;
		}
		self.name.to_lowercase().contains(needle)
			|| self.teams.iter().any(|t| t.to_lowercase().contains(needle))
			|| self
				.group
				.as_deref()
				.is_some_and(|g| g.to_lowercase().contains(needle))
	}
}

/// Where a raw edge came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
	/// Shared roster membership.
	Team,
	/// A logged conversation.
	Meeting,
}

/// Category of an edge. Team-derived wins over conversation on aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCategory {
	/// `team_connection`
	TeamConnection,
	/// `conversation`
	Conversation,
}

/// One relationship record between two canonical nodes, before aggregation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
	/// Canonical source node id.
	pub source: String,
	/// Canonical target node id.
	pub target: String,
	/// Source id as it appeared in the input record.
	pub source_raw_id: String,
	/// Target id as it appeared in the input record.
	pub target_raw_id: String,
	/// Origin of the edge.
	pub kind: EdgeKind,
	/// Category tag.
	pub category: EdgeCategory,
	/// Meeting type or other free-form subcategory.
	pub label: Option<String>,
	/// Meeting result tag.
	pub result: Option<String>,
	/// Team the edge was derived from.
	pub team_name: Option<String>,
	/// Timestamp of the first meeting between the pair.
	pub timestamp: Option<String>,
	/// Meetings between the pair, first-seen first.
	pub meeting_ids: Vec<String>,
}

impl RawEdge {
	/// Clique edge between two roster members of `team`.
	pub fn team(source: (&str, &str), target: (&str, &str), team: &str) -> Self {
		Self {
			source: source.0.to_string(),
			target: target.0.to_string(),
			source_raw_id: source.1.to_string(),
			target_raw_id: target.1.to_string(),
			kind: EdgeKind::Team,
			category: EdgeCategory::TeamConnection,
			label: None,
			result: None,
			team_name: Some(team.to_string()),
			timestamp: None,
			meeting_ids: Vec::new(),
		}
	}

	/// Unordered pair key.
	pub fn key(&self) -> PairKey {
		pair_key(&self.source, &self.target)
	}
}

/// A single summarized relationship between two canonical nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEdge {
	/// Unordered pair key, see [`pair_key`].
	pub key: PairKey,
	/// Lexicographically smaller node id.
	pub source: String,
	/// Lexicographically larger node id.
	pub target: String,
	/// Number of raw edges collapsed into this one. Always at least 1.
	pub count: usize,
	/// Dominant category.
	pub category: EdgeCategory,
	/// First team name seen.
	pub team_name: Option<String>,
	/// First non-empty free-form label seen.
	pub label: Option<String>,
	/// True when any contributing meeting is the hovered one.
	pub highlighted: bool,
	/// Distinct raw endpoint ids that contributed.
	pub contributing_raw_ids: Vec<String>,
	/// Distinct meeting ids that contributed.
	pub meeting_ids: Vec<String>,
}

impl AggregatedEdge {
	/// Whether the edge touches `id`.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// Unordered node pair, smaller id first.
pub type PairKey = (String, String);

/// Canonical key for an unordered node pair.
pub fn pair_key(a: &str, b: &str) -> PairKey {
	if a <= b {
		(a.to_string(), b.to_string())
	} else {
		(b.to_string(), a.to_string())
	}
}

/// Output of a graph build, handed to the canvas component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	/// View the data was built for.
	pub view: GraphView,
	/// Canonical nodes.
	pub nodes: Vec<GraphNode>,
	/// Raw edge multiset.
	pub links: Vec<RawEdge>,
}

impl GraphData {
	/// Applies positions committed by an earlier run. Restored nodes are flagged.
	pub fn restore_layout(&mut self, layout: &HashMap<String, (f64, f64)>) -> usize {
		let mut restored = 0;
		for node in &mut self.nodes {
			if let Some(&(x, y)) = layout.get(&node.id) {
				if x.is_finite() && y.is_finite() {
					node.x = x;
					node.y = y;
					node.restored = true;
					restored += 1;
				}
			}
		}
		restored
	}

	/// Current node positions keyed by id.
	pub fn layout(nodes: &[GraphNode]) -> HashMap<String, (f64, f64)> {
		nodes.iter().map(|n| (n.id.clone(), (n.x, n.y))).collect()
	}
}

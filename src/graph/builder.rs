//! Builds the node set and raw edge multiset for one view.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::f64::consts::TAU;

use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::model::{
	EdgeCategory, EdgeKind, EngagementLevel, GraphData, GraphNode, GraphView, NodeRole, PairKey,
	RawEdge, pair_key,
};
use super::records::{Meeting, PersonRef, Team};
use crate::identity::{NameMergeIndex, OrganizerMapping, resolve_in};

/// Inputs that select and shape a build.
#[derive(Clone, Debug)]
pub struct BuildOptions {
	/// Which view to build.
	pub view: GraphView,
	/// Chapter/group to scope to. `None`, empty and "all" mean every group.
	pub group_filter: Option<String>,
	/// Engagement buckets kept by the by-engagement view. `None` keeps all.
	pub engagement_filter: Option<BTreeSet<EngagementLevel>>,
	/// Distance between team centroids on the seed grid.
	pub team_spacing: f64,
	/// Seed for layout jitter.
	pub seed: u64,
}

impl Default for BuildOptions {
	fn default() -> Self {
		Self {
			view: GraphView::TeamMembers,
			group_filter: None,
			engagement_filter: None,
			team_spacing: 320.0,
			seed: 0x5eed,
		}
	}
}

impl BuildOptions {
	/// Options for `view` with everything else defaulted.
	pub fn for_view(view: GraphView) -> Self {
		Self {
			view,
			..Self::default()
		}
	}

	/// The group filter in effect, if any.
	pub fn active_group(&self) -> Option<&str> {
		let group = self.group_filter.as_deref()?.trim();
		let lower = group.to_ascii_lowercase();
		if group.is_empty() || lower == "all" || lower == "all groups" {
			None
		} else {
			Some(group)
		}
	}
}

struct Canonical {
	id: String,
	name: String,
}

#[derive(Default)]
struct Partial {
	nodes: IndexMap<String, GraphNode>,
	team_edges: Vec<RawEdge>,
	meeting_edges: Vec<RawEdge>,
	spread: f64,
}

/// Builds [`GraphData`] from validated rosters and meetings.
///
/// Tokens are canonicalised through persisted mappings first, then the
/// name merge index, then kept as-is.
pub struct GraphBuilder<'a> {
	teams: &'a [Team],
	meetings: &'a [Meeting],
	merge: &'a NameMergeIndex,
	mappings: &'a [OrganizerMapping],
}

impl<'a> GraphBuilder<'a> {
	/// Builder over one input snapshot.
	pub fn new(teams: &'a [Team], meetings: &'a [Meeting], merge: &'a NameMergeIndex) -> Self {
		Self {
			teams,
			meetings,
			merge,
			mappings: &[],
		}
	}

	/// Uses committed organizer mappings ahead of the merge index.
	pub fn with_mappings(mut self, mappings: &'a [OrganizerMapping]) -> Self {
		self.mappings = mappings;
		self
	}

	/// Builds `options.view`.
	pub fn build(&self, options: &BuildOptions) -> GraphData {
		let mut rng = SmallRng::seed_from_u64(options.seed);
		let partial = match options.view {
			GraphView::TeamMembers => self.team_members(options, &mut rng),
			GraphView::Connections => self.connections(options, &mut rng),
			GraphView::ByEngagementLevel => self.by_engagement(options, &mut rng),
		};
		let Partial {
			nodes,
			team_edges,
			meeting_edges,
			..
		} = partial;
		let mut links = team_edges;
		links.extend(meeting_edges);
		let data = GraphData {
			view: options.view,
			nodes: nodes.into_values().collect(),
			links,
		};
		info!(
			"Built {:?} view: {} nodes, {} raw edges",
			options.view,
			data.nodes.len(),
			data.links.len()
		);
		data
	}

	fn canonicalize(&self, person: &PersonRef) -> Canonical {
		let mapping = resolve_in(self.mappings, &person.id)
			.or_else(|| resolve_in(self.mappings, &person.name));
		match mapping {
			Some(m) => Canonical {
				id: m.primary_id.clone(),
				name: m.preferred_name.clone(),
			},
			None => Canonical {
				id: self.merge.canonical(&person.id).to_string(),
				name: person.name.clone(),
			},
		}
	}

	fn team_members(&self, options: &BuildOptions, rng: &mut SmallRng) -> Partial {
		let group = options.active_group();
		let teams: Vec<&Team> = self
			.teams
			.iter()
			.filter(|t| match group {
				Some(g) => t.chapter.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(g)),
				None => true,
			})
			.collect();

		let cols = (teams.len() as f64).sqrt().ceil().max(1.0) as usize;
		let rows = teams.len().div_ceil(cols).max(1);
		let spacing = options.team_spacing;
		let mut partial = Partial {
			spread: spacing * cols.max(rows) as f64,
			..Partial::default()
		};
		let mut memberships: HashMap<String, BTreeSet<usize>> = HashMap::new();

		for (ti, team) in teams.iter().enumerate() {
			let (row, col) = (ti / cols, ti % cols);
			let cx = (col as f64 - (cols - 1) as f64 / 2.0) * spacing;
			let cy = (row as f64 - (rows - 1) as f64 / 2.0) * spacing;
			let size = team.members.len().max(1);
			let radius = 30.0 + 4.0 * size as f64;

			let mut in_team: Vec<(String, String)> = Vec::new();
			for (mi, member) in team.members.iter().enumerate() {
				let canonical = self.canonicalize(&PersonRef {
					id: member.id.clone(),
					name: member.name.clone(),
				});
				if in_team.iter().any(|(id, _)| *id == canonical.id) {
					debug!("{} listed twice on team {}", canonical.id, team.name);
					continue;
				}
				in_team.push((canonical.id.clone(), member.id.clone()));

				let seen_in = memberships.entry(canonical.id.clone()).or_default();
				seen_in.insert(ti);
				let multi_team = seen_in.len() > 1;

				let node = partial
					.nodes
					.entry(canonical.id.clone())
					.or_insert_with(|| {
						let angle = mi as f64 * TAU / size as f64 + rng.gen_range(-0.2..0.2);
						let mut node = GraphNode::new(
							canonical.id.clone(),
							canonical.name.clone(),
							cx + radius * angle.cos() + rng.gen_range(-5.0..5.0),
							cy + radius * angle.sin() + rng.gen_range(-5.0..5.0),
						);
						node.role = NodeRole::from_roster(member.role.as_deref());
						node.group = member.chapter.clone().or_else(|| team.chapter.clone());
						node.engagement = member.engagement;
						node
					});
				node.roster_member = true;
				node.engagement = node.engagement.min(member.engagement);
				if !node.teams.contains(&team.name) {
					node.teams.push(team.name.clone());
				}
				if multi_team {
					node.role = NodeRole::MultiTeamMember;
				}
			}

			for (i, a) in in_team.iter().enumerate() {
				for b in &in_team[i + 1..] {
					partial.team_edges.push(RawEdge::team(
						(a.0.as_str(), a.1.as_str()),
						(b.0.as_str(), b.1.as_str()),
						&team.name,
					));
				}
			}
		}
		partial
	}

	fn connections(&self, options: &BuildOptions, rng: &mut SmallRng) -> Partial {
		let mut partial = self.team_members(options, rng);
		let team_keys: Vec<PairKey> = partial.team_edges.iter().map(RawEdge::key).collect();
		let roster: HashSet<String> = partial.nodes.keys().cloned().collect();
		let scoped = options.active_group().is_some();
		let half = partial.spread.max(600.0) / 2.0;
		let mut by_pair: HashMap<PairKey, usize> = HashMap::new();

		for meeting in self.meetings {
			let organizer = self.canonicalize(&meeting.organizer);
			let participant = self.canonicalize(&meeting.participant);
			if organizer.id == participant.id {
				debug!("Meeting {} resolves to a single person", meeting.id);
				continue;
			}
			if scoped && !roster.contains(&organizer.id) && !roster.contains(&participant.id) {
				continue;
			}

			for (person, role) in [
				(&organizer, NodeRole::Organizer),
				(&participant, NodeRole::Contact),
			] {
				let node = partial.nodes.entry(person.id.clone()).or_insert_with(|| {
					let mut node = GraphNode::new(
						person.id.clone(),
						person.name.clone(),
						rng.gen_range(-half..half),
						rng.gen_range(-half..half),
					);
					node.role = role;
					node.group.clone_from(&meeting.chapter);
					node
				});
				if !node.roster_member {
					if role == NodeRole::Organizer {
						node.role = NodeRole::Organizer;
					} else {
						node.engagement = node.engagement.min(meeting.participant_engagement);
					}
				}
			}

			let key = pair_key(&organizer.id, &participant.id);
			if let Some(&idx) = by_pair.get(&key) {
				let edge = &mut partial.meeting_edges[idx];
				if !edge.meeting_ids.contains(&meeting.id) {
					edge.meeting_ids.push(meeting.id.clone());
				}
				continue;
			}
			by_pair.insert(key, partial.meeting_edges.len());
			partial.meeting_edges.push(RawEdge {
				source: organizer.id,
				target: participant.id,
				source_raw_id: meeting.organizer.id.clone(),
				target_raw_id: meeting.participant.id.clone(),
				kind: EdgeKind::Meeting,
				category: EdgeCategory::Conversation,
				label: meeting.category.clone(),
				result: meeting.result.clone(),
				team_name: None,
				timestamp: meeting.timestamp.clone(),
				meeting_ids: vec![meeting.id.clone()],
			});
		}

		ensure_team_edges(&mut partial, &team_keys);
		partial
	}

	fn by_engagement(&self, options: &BuildOptions, rng: &mut SmallRng) -> Partial {
		let mut partial = self.connections(options, rng);
		for node in partial.nodes.values_mut() {
			if node.roster_member {
				node.engagement = EngagementLevel::Staff;
			}
		}
		let Some(allowed) = &options.engagement_filter else {
			return partial;
		};
		partial.nodes.retain(|_, n| allowed.contains(&n.engagement));
		let nodes = &partial.nodes;
		let keep = |e: &RawEdge| nodes.contains_key(&e.source) && nodes.contains_key(&e.target);
		partial.team_edges.retain(keep);
		partial.meeting_edges.retain(keep);
		partial
	}
}

/// Team edges live in their own namespace and must survive the meeting overlay.
fn ensure_team_edges(partial: &mut Partial, expected: &[PairKey]) {
	let present: HashSet<PairKey> = partial.team_edges.iter().map(RawEdge::key).collect();
	let missing: Vec<&PairKey> = expected.iter().filter(|k| !present.contains(*k)).collect();
	if missing.is_empty() {
		return;
	}
	warn!("Re-inserting {} team edges lost during overlay", missing.len());
	for (a, b) in missing {
		let mut edge = RawEdge::team((a.as_str(), a.as_str()), (b.as_str(), b.as_str()), "");
		edge.team_name = None;
		partial.team_edges.push(edge);
	}
}

//! Collapses the raw edge multiset into one weighted edge per node pair.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::map::Entry;
use log::debug;

use super::model::{AggregatedEdge, EdgeCategory, GraphData, GraphNode, PairKey, RawEdge};

fn push_unique(list: &mut Vec<String>, value: &str) {
	if !list.iter().any(|v| v == value) {
		list.push(value.to_string());
	}
}

/// Aggregates raw edges by unordered endpoint pair, in first-seen order.
///
/// Self loops are dropped. `hovered_meeting` marks every aggregate that a
/// matching meeting contributed to as highlighted.
pub fn aggregate(raw: &[RawEdge], hovered_meeting: Option<&str>) -> Vec<AggregatedEdge> {
	let mut by_pair: IndexMap<PairKey, AggregatedEdge> = IndexMap::new();
	for edge in raw {
		if edge.source == edge.target {
			debug!("Dropping self loop on {}", edge.source);
			continue;
		}
		let key = edge.key();
		let agg = match by_pair.entry(key) {
			Entry::Occupied(slot) => {
				let agg = slot.into_mut();
				agg.count += 1;
				if edge.category == EdgeCategory::TeamConnection {
					agg.category = EdgeCategory::TeamConnection;
				}
				if agg.team_name.is_none() {
					agg.team_name.clone_from(&edge.team_name);
				}
				if agg.label.is_none() {
					agg.label.clone_from(&edge.label);
				}
				agg
			}
			Entry::Vacant(slot) => {
				let (source, target) = if edge.source <= edge.target {
					(edge.source.clone(), edge.target.clone())
				} else {
					(edge.target.clone(), edge.source.clone())
				};
				let key = slot.key().clone();
				slot.insert(AggregatedEdge {
					key,
					source,
					target,
					count: 1,
					category: edge.category,
					team_name: edge.team_name.clone(),
					label: edge.label.clone(),
					highlighted: false,
					contributing_raw_ids: Vec::new(),
					meeting_ids: Vec::new(),
				})
			}
		};
		push_unique(&mut agg.contributing_raw_ids, &edge.source_raw_id);
		push_unique(&mut agg.contributing_raw_ids, &edge.target_raw_id);
		for meeting in &edge.meeting_ids {
			push_unique(&mut agg.meeting_ids, meeting);
		}
	}

	let mut edges: Vec<AggregatedEdge> = by_pair.into_values().collect();
	refresh_highlight(&mut edges, hovered_meeting);
	edges
}

/// Re-evaluates `highlighted` for a new hovered meeting without re-aggregating.
pub fn refresh_highlight(edges: &mut [AggregatedEdge], hovered_meeting: Option<&str>) {
	for edge in edges {
		edge.highlighted =
			hovered_meeting.is_some_and(|m| edge.meeting_ids.iter().any(|id| id == m));
	}
}

/// Sets each node's degree to the number of distinct aggregated edges touching it.
pub fn recompute_degrees(nodes: &mut [GraphNode], edges: &[AggregatedEdge]) {
	let mut degrees: HashMap<&str, usize> = HashMap::new();
	for edge in edges {
		*degrees.entry(edge.source.as_str()).or_default() += 1;
		*degrees.entry(edge.target.as_str()).or_default() += 1;
	}
	for node in nodes {
		node.degree = degrees.get(node.id.as_str()).copied().unwrap_or(0);
	}
}

impl GraphData {
	/// Aggregates `links` and recomputes every node's degree from the result.
	pub fn aggregate(&mut self, hovered_meeting: Option<&str>) -> Vec<AggregatedEdge> {
		let edges = aggregate(&self.links, hovered_meeting);
		recompute_degrees(&mut self.nodes, &edges);
		edges
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::model::EdgeKind;

	fn meeting_edge(a: &str, b: &str, meeting: &str) -> RawEdge {
		RawEdge {
			source: a.into(),
			target: b.into(),
			source_raw_id: a.into(),
			target_raw_id: b.into(),
			kind: EdgeKind::Meeting,
			category: EdgeCategory::Conversation,
			label: Some("1:1".into()),
			result: None,
			team_name: None,
			timestamp: None,
			meeting_ids: vec![meeting.into()],
		}
	}

	#[test]
	fn counts_sum_to_input_size() {
		let raw = vec![
			meeting_edge("a", "b", "m1"),
			meeting_edge("b", "a", "m2"),
			meeting_edge("a", "c", "m3"),
			RawEdge::team(("b", "b"), ("a", "a"), "North"),
		];
		let agg = aggregate(&raw, None);
		assert_eq!(agg.len(), 2);
		assert_eq!(agg.iter().map(|e| e.count).sum::<usize>(), raw.len());
		assert_eq!(agg[0].key, ("a".to_string(), "b".to_string()));
		assert_eq!(agg[0].count, 3);
	}

	#[test]
	fn team_category_takes_precedence() {
		let raw = vec![
			meeting_edge("a", "b", "m1"),
			RawEdge::team(("a", "a"), ("b", "b"), "North"),
			RawEdge::team(("a", "a"), ("b", "b"), "South"),
		];
		let agg = aggregate(&raw, None);
		assert_eq!(agg[0].category, EdgeCategory::TeamConnection);
		assert_eq!(agg[0].team_name.as_deref(), Some("North"));
		assert_eq!(agg[0].label.as_deref(), Some("1:1"));
	}

	#[test]
	fn hovered_meeting_highlights_contributors() {
		let raw = vec![
			meeting_edge("a", "b", "m1"),
			meeting_edge("a", "b", "m2"),
			meeting_edge("c", "d", "m3"),
		];
		let mut agg = aggregate(&raw, Some("m2"));
		assert!(agg[0].highlighted);
		assert!(!agg[1].highlighted);

		refresh_highlight(&mut agg, Some("m3"));
		assert!(!agg[0].highlighted);
		assert!(agg[1].highlighted);
		refresh_highlight(&mut agg, None);
		assert!(agg.iter().all(|e| !e.highlighted));
	}

	#[test]
	fn contributing_raw_ids_are_distinct() {
		let mut first = meeting_edge("a", "b", "m1");
		first.source_raw_id = "van-1".into();
		let raw = vec![first, meeting_edge("a", "b", "m2")];
		let agg = aggregate(&raw, None);
		assert_eq!(agg[0].contributing_raw_ids, vec!["van-1", "b", "a"]);
	}

	#[test]
	fn degree_counts_distinct_edges_not_multiplicity() {
		let raw = vec![
			meeting_edge("a", "b", "m1"),
			meeting_edge("a", "b", "m2"),
			meeting_edge("a", "b", "m3"),
			meeting_edge("a", "c", "m4"),
			meeting_edge("a", "a", "m5"),
		];
		let agg = aggregate(&raw, None);
		let mut nodes = vec![
			GraphNode::new("a", "A", 0.0, 0.0),
			GraphNode::new("b", "B", 0.0, 0.0),
			GraphNode::new("c", "C", 0.0, 0.0),
			GraphNode::new("z", "Z", 0.0, 0.0),
		];
		recompute_degrees(&mut nodes, &agg);
		let degrees: Vec<usize> = nodes.iter().map(|n| n.degree).collect();
		assert_eq!(degrees, vec![2, 1, 1, 0]);
	}
}

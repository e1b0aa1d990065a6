use std::collections::HashSet;

use campaign_graph::components::force_graph::render::render;
use campaign_graph::components::force_graph::{
	DrawOp, ForceGraphState, RecordingSurface, RenderConfig, SimulationConfig,
};
use campaign_graph::graph::aggregate::aggregate;
use campaign_graph::graph::records::{meetings_from_json, teams_from_json};
use campaign_graph::graph::{
	BuildOptions, EdgeCategory, EdgeKind, GraphBuilder, GraphData, GraphView, PairKey, RawEdge,
};
use campaign_graph::identity::{
	IdentityResolver, InMemoryMappingStore, NameMergeIndex, OrganizerMapping, VariantKind,
};
use serde_json::json;

fn overlapping_teams() -> serde_json::Value {
	json!([
		{
			"teamId": "alpha",
			"teamName": "Alpha",
			"chapter": "North",
			"members": [
				{ "vanId": 1, "fullName": "Ana Ruiz" },
				{ "vanId": 2, "fullName": "Bo Chen" },
				{ "vanId": "s", "fullName": "Sky Patel" }
			]
		},
		{
			"teamId": "beta",
			"teamName": "Beta",
			"chapter": "North",
			"members": [
				{ "vanId": "s", "fullName": "Sky Patel" },
				{ "vanId": 4, "fullName": "Dee Ford" },
				{ "vanId": 5, "fullName": "Eli Moss" },
				{ "vanId": 6, "fullName": "Fay Lin" }
			]
		}
	])
}

fn start(data: &GraphData) -> ForceGraphState {
	ForceGraphState::new(data, SimulationConfig::default(), RenderConfig::default())
}

fn settle(state: &mut ForceGraphState) -> Vec<campaign_graph::graph::GraphNode> {
	for _ in 0..5_000 {
		if let Some(nodes) = state.frame().committed {
			return nodes;
		}
	}
	panic!("layout never converged");
}

#[test]
fn overlapping_rosters_share_one_node() {
	let teams = teams_from_json(&overlapping_teams());
	assert_eq!(teams.len(), 2);
	let index = NameMergeIndex::build(&teams, &[]);
	let mut data = GraphBuilder::new(&teams, &[], &index)
		.build(&BuildOptions::for_view(GraphView::TeamMembers));

	assert_eq!(data.nodes.len(), 6);
	assert_eq!(data.links.len(), 9);
	let edges = data.aggregate(None);
	assert_eq!(edges.len(), 9);
	assert!(edges.iter().all(|e| e.category == EdgeCategory::TeamConnection));

	let shared = data.nodes.iter().find(|n| n.id == "s").unwrap();
	assert_eq!(shared.degree, 5);
	assert_eq!(shared.teams.len(), 2);
	for node in data.nodes.iter().filter(|n| n.id != "s") {
		let expected = if node.teams[0] == "Alpha" { 2 } else { 3 };
		assert_eq!(node.degree, expected, "{}", node.name);
	}
}

#[test]
fn merged_organizers_collapse_into_one_node() {
	let teams = teams_from_json(&json!([
		{ "teamId": "t", "teamName": "Tenants", "chapter": "North",
		  "members": [{ "vanId": "p1", "fullName": "Pat Quinn" }] }
	]));
	let meetings = meetings_from_json(&json!([
		{ "meetingId": "m1", "organizerVanId": "100", "organizerName": "Alice Wong",
		  "participantVanId": "p1", "participantName": "Pat Quinn" },
		{ "meetingId": "m2", "organizerVanId": "200", "organizerName": "Ali Smith",
		  "participantVanId": "p2", "participantName": "Rae Young" },
		{ "meetingId": "m3", "organizerName": "ali", "participantVanId": "p1",
		  "participantName": "Pat Quinn" }
	]));

	let mut alice = OrganizerMapping::new("100", "Alice Wong");
	alice.add_variant("alice", VariantKind::Name);
	let mut ali = OrganizerMapping::new("200", "Ali Smith");
	ali.add_variant("ali", VariantKind::Name);
	let store = InMemoryMappingStore::with_mappings([alice, ali]);
	let mut resolver = IdentityResolver::load(store).unwrap();

	let index = NameMergeIndex::build(&teams, &meetings);
	let options = BuildOptions::for_view(GraphView::Connections);
	let before = GraphBuilder::new(&teams, &meetings, &index)
		.with_mappings(resolver.mappings())
		.build(&options);
	let ids: HashSet<&str> = before.nodes.iter().map(|n| n.id.as_str()).collect();
	assert!(ids.contains("100") && ids.contains("200"));

	let survivor = resolver.merge("100", "200").unwrap();
	assert!(survivor.has_name_variant("alice"));
	assert!(survivor.has_name_variant("ali"));
	assert!(survivor.has_name_variant("Ali Smith"));
	assert_eq!(resolver.resolve("ali").unwrap().primary_id, "100");
	assert_eq!(resolver.store().len(), 1);

	let mut after = GraphBuilder::new(&teams, &meetings, &index)
		.with_mappings(resolver.mappings())
		.build(&options);
	assert!(after.nodes.iter().all(|n| n.id != "200"));
	let edges = after.aggregate(None);
	let organizer = after.nodes.iter().find(|n| n.id == "100").unwrap();
	assert_eq!(organizer.name, "Alice Wong");
	assert_eq!(organizer.degree, 2);
	let to_pat = edges
		.iter()
		.find(|e| e.touches("100") && e.touches("p1"))
		.unwrap();
	assert_eq!(to_pat.meeting_ids, vec!["m1", "m3"]);
}

#[test]
fn aggregation_preserves_pairs_and_counts() {
	let ids = ["a", "b", "c", "d", "e"];
	let mut raw = Vec::new();
	for i in 0..40usize {
		let a = ids[i % ids.len()];
		let b = ids[(i * 7 + 3) % ids.len()];
		let mut edge = RawEdge::team((a, a), (b, b), "T");
		if i % 3 == 0 {
			edge.kind = EdgeKind::Meeting;
			edge.category = EdgeCategory::Conversation;
			edge.meeting_ids = vec![format!("m{i}")];
		}
		raw.push(edge);
	}
	let looped = raw.iter().filter(|e| e.source == e.target).count();
	let pairs: HashSet<PairKey> = raw
		.iter()
		.filter(|e| e.source != e.target)
		.map(RawEdge::key)
		.collect();

	let edges = aggregate(&raw, Some("m9"));
	assert_eq!(edges.len(), pairs.len());
	assert_eq!(edges.iter().map(|e| e.count).sum::<usize>(), raw.len() - looped);
	assert_eq!(edges.iter().filter(|e| e.highlighted).count(), 1);
}

#[test]
fn layout_settles_and_restores_warm() {
	let teams = teams_from_json(&overlapping_teams());
	let index = NameMergeIndex::build(&teams, &[]);
	let data = GraphBuilder::new(&teams, &[], &index)
		.build(&BuildOptions::for_view(GraphView::TeamMembers));

	let mut state = start(&data);
	let committed = settle(&mut state);
	assert!(state.nodes.iter().all(|n| n.vx.hypot(n.vy) < 0.01));
	let cold_ticks = state.simulation.ticks();

	let mut revisit = data.clone();
	assert_eq!(revisit.restore_layout(&GraphData::layout(&committed)), 6);
	let mut warm = start(&revisit);
	assert_eq!(warm.simulation.alpha(), 0.05);
	settle(&mut warm);
	assert!(warm.simulation.ticks() < cold_ticks);
	for (before, after) in committed.iter().zip(&warm.nodes) {
		assert!((before.x - after.x).hypot(before.y - after.y) < 60.0, "{} jumped", before.id);
	}
}

#[test]
fn search_glows_matches_and_dims_the_rest() {
	let teams = teams_from_json(&json!([
		{ "teamId": "t1", "teamName": "Tenants", "chapter": "North", "members": [
			{ "vanId": 1, "fullName": "Leo Park" },
			{ "vanId": 2, "fullName": "Ana Ruiz" }
		]},
		{ "teamId": "t2", "teamName": "Leopards", "chapter": "South", "members": [
			{ "vanId": 3, "fullName": "Sam Cole" }
		]},
		{ "teamId": "t3", "teamName": "Transit", "chapter": "Leominster", "members": [
			{ "vanId": 4, "fullName": "Kim Yu" },
			{ "vanId": 5, "fullName": "Tom Okafor" }
		]}
	]));
	let index = NameMergeIndex::build(&teams, &[]);
	let data = GraphBuilder::new(&teams, &[], &index)
		.build(&BuildOptions::for_view(GraphView::Connections));
	let mut state = start(&data);
	state.resize(1024.0, 768.0, 1.0);
	state.set_search("leo");

	let mut surface = RecordingSurface::new();
	assert!(render(&state, &mut surface));

	let matched: HashSet<String> = ["1", "3", "4", "5"].iter().map(|s| s.to_string()).collect();
	for node in &state.nodes {
		let alpha = surface
			.ops
			.iter()
			.find_map(|op| match op {
				DrawOp::Circle { center, alpha, .. } if *center == (node.x, node.y) => Some(*alpha),
				_ => None,
			})
			.unwrap();
		if matched.contains(&node.id) {
			assert_eq!(alpha, 1.0, "{} should stand out", node.name);
		} else {
			assert_eq!(alpha, 0.25, "{} should be dimmed", node.name);
		}
	}
	let glow = surface
		.ops
		.iter()
		.filter(|op| matches!(op, DrawOp::Ring { alpha, .. } if *alpha == 0.6))
		.count();
	assert_eq!(glow, matched.len());
	let texts = surface.texts();
	for name in ["Leo Park", "Sam Cole", "Kim Yu", "Tom Okafor"] {
		assert!(texts.contains(&name), "missing label {name}");
	}
	assert!(!texts.contains(&"Ana Ruiz"));
}

//! Iterative force solver: many-body repulsion, link springs, centering and
//! collision, cooled by a geometric alpha schedule.
//!
//! The solver never owns node storage. [`Simulation::tick`] takes the node
//! slice mutably, so nothing else can read positions while a tick is in
//! progress; the renderer borrows the same slice only between ticks.

use std::collections::HashMap;

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::types::SimulationConfig;
use crate::graph::{AggregatedEdge, GraphNode};

/// Lifecycle of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Waiting for a non-empty node set.
	Seeding,
	/// Advancing every tick.
	Running,
	/// Alpha reached the floor.
	Converged,
	/// Stopped by the host before converging.
	Stopped,
}

/// Result of one [`Simulation::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
	/// Not running; nothing moved.
	Idle,
	/// Positions moved.
	Advanced,
	/// Positions moved and alpha fell below the floor. Emitted once per run.
	Converged,
}

#[derive(Clone, Debug)]
struct SimLink {
	source: usize,
	target: usize,
	distance: f64,
	strength: f64,
	bias: f64,
}

/// `1 / sqrt(edges per node)`, clamped to `[0.25, 1]`. Sparse graphs get 1.
pub fn density_factor(node_count: usize, edge_count: usize) -> f64 {
	if node_count == 0 {
		return 1.0;
	}
	let density = edge_count as f64 / node_count as f64;
	(1.0 / density.max(1.0).sqrt()).clamp(0.25, 1.0)
}

/// Rest length for an edge collapsing `count` interactions.
pub fn link_distance(config: &SimulationConfig, count: usize) -> f64 {
	let shrink = ((count.max(1) as f64).log2() * config.link_distance_step)
		.min(config.link_distance_cap);
	(config.link_distance_max - shrink).max(config.link_distance_min)
}

/// Spring strength for an edge collapsing `count` interactions.
pub fn link_strength(config: &SimulationConfig, count: usize, density: f64) -> f64 {
	let growth = 1.0 + (count.max(1) as f64).log2() * config.link_strength_step;
	config.link_strength * growth.min(config.link_strength_cap) * density
}

/// Force-directed layout solver.
pub struct Simulation {
	config: SimulationConfig,
	phase: Phase,
	alpha: f64,
	alpha_target: f64,
	charge: f64,
	links: Vec<SimLink>,
	rng: SmallRng,
	ticks: usize,
}

impl Simulation {
	/// Idle solver.
	pub fn new(config: SimulationConfig) -> Self {
		let rng = SmallRng::seed_from_u64(config.seed);
		Self {
			alpha: config.alpha_start,
			charge: config.charge,
			config,
			phase: Phase::Seeding,
			alpha_target: 0.0,
			links: Vec::new(),
			rng,
			ticks: 0,
		}
	}

	/// Prepares a run over `nodes` and `edges`. An empty node set leaves the
	/// solver in [`Phase::Seeding`].
	pub fn seed(&mut self, nodes: &[GraphNode], edges: &[AggregatedEdge]) {
		self.ticks = 0;
		self.alpha_target = 0.0;
		if nodes.is_empty() {
			self.phase = Phase::Seeding;
			self.links.clear();
			return;
		}

		let index: HashMap<&str, usize> = nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect();
		let mut degree = vec![0usize; nodes.len()];
		let mut pairs = Vec::with_capacity(edges.len());
		for edge in edges {
			let (Some(&s), Some(&t)) = (
				index.get(edge.source.as_str()),
				index.get(edge.target.as_str()),
			) else {
				continue;
			};
			degree[s] += 1;
			degree[t] += 1;
			pairs.push((s, t, edge.count));
		}

		let density = density_factor(nodes.len(), pairs.len());
		self.charge = self.config.charge * density;
		self.links = pairs
			.into_iter()
			.map(|(source, target, count)| SimLink {
				source,
				target,
				distance: link_distance(&self.config, count),
				strength: link_strength(&self.config, count, density),
				bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
			})
			.collect();

		let restored = nodes.iter().filter(|n| n.restored).count();
		let warm = restored as f64 / nodes.len() as f64 > self.config.warm_fraction;
		self.alpha = if warm {
			self.config.alpha_warm
		} else {
			self.config.alpha_start
		};
		self.phase = Phase::Running;
		debug!(
			"Simulation seeded: {} nodes, {} links, density factor {:.2}, alpha {}",
			nodes.len(),
			self.links.len(),
			density,
			self.alpha
		);
	}

	/// Current phase.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Whether [`tick`](Self::tick) will move anything.
	pub fn is_running(&self) -> bool {
		self.phase == Phase::Running
	}

	/// Current temperature.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Ticks since the last seed.
	pub fn ticks(&self) -> usize {
		self.ticks
	}

	/// Keeps the layout warm while the user drags a node.
	pub fn reheat(&mut self) {
		if self.phase == Phase::Seeding {
			return;
		}
		self.alpha_target = self.config.alpha_target_drag;
		if self.alpha < self.config.alpha_min {
			self.alpha = self.config.alpha_min;
		}
		self.phase = Phase::Running;
	}

	/// Lets the layout cool down again after a drag.
	pub fn release(&mut self) {
		self.alpha_target = 0.0;
	}

	/// Halts the run. Returns whether it was still running.
	pub fn stop(&mut self) -> bool {
		let was_running = self.is_running();
		if was_running {
			self.phase = Phase::Stopped;
			debug!("Simulation stopped after {} ticks", self.ticks);
		}
		was_running
	}

	fn jiggle(&mut self) -> f64 {
		self.rng.gen_range(-0.5..0.5) * 1e-6
	}

	/// Advances the layout by one step.
	pub fn tick(&mut self, nodes: &mut [GraphNode]) -> TickOutcome {
		if self.phase != Phase::Running || nodes.is_empty() {
			return TickOutcome::Idle;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		self.ticks += 1;

		self.apply_links(nodes);
		self.apply_many_body(nodes);
		self.apply_center(nodes);
		self.apply_collision(nodes);
		self.integrate(nodes);

		if self.alpha < self.config.alpha_min && max_speed(nodes) < self.config.velocity_epsilon {
			self.phase = Phase::Converged;
			debug!("Simulation converged after {} ticks", self.ticks);
			return TickOutcome::Converged;
		}
		TickOutcome::Advanced
	}

	fn apply_links(&mut self, nodes: &mut [GraphNode]) {
		let alpha = self.alpha;
		for i in 0..self.links.len() {
			let SimLink {
				source,
				target,
				distance,
				strength,
				bias,
			} = self.links[i];
			let (s, t) = (&nodes[source], &nodes[target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 {
				x = self.jiggle();
			}
			if y == 0.0 {
				y = self.jiggle();
			}
			let l = (x * x + y * y).sqrt();
			let k = (l - distance) / l * alpha * strength;
			let (x, y) = (x * k, y * k);
			nodes[target].vx -= x * bias;
			nodes[target].vy -= y * bias;
			nodes[source].vx += x * (1.0 - bias);
			nodes[source].vy += y * (1.0 - bias);
		}
	}

	fn apply_many_body(&mut self, nodes: &mut [GraphNode]) {
		let strength = self.charge * self.alpha;
		let min2 = self.config.charge_distance_min * self.config.charge_distance_min;
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let mut x = nodes[j].x - nodes[i].x;
				let mut y = nodes[j].y - nodes[i].y;
				if x == 0.0 && y == 0.0 {
					x = self.jiggle();
					y = self.jiggle();
				}
				let mut l = x * x + y * y;
				if l < min2 {
					l = (min2 * l).sqrt();
				}
				let w = strength / l;
				nodes[i].vx += x * w;
				nodes[i].vy += y * w;
				nodes[j].vx -= x * w;
				nodes[j].vy -= y * w;
			}
		}
	}

	fn apply_center(&self, nodes: &mut [GraphNode]) {
		let k = self.config.center_strength * self.alpha;
		for node in nodes {
			node.vx -= node.x * k;
			node.vy -= node.y * k;
		}
	}

	fn apply_collision(&mut self, nodes: &mut [GraphNode]) {
		let reach = self.config.collision_radius * 2.0;
		let strength = self.config.collision_strength;
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let mut x = (nodes[i].x + nodes[i].vx) - (nodes[j].x + nodes[j].vx);
				let mut y = (nodes[i].y + nodes[i].vy) - (nodes[j].y + nodes[j].vy);
				let mut l = x * x + y * y;
				if l >= reach * reach {
					continue;
				}
				if l == 0.0 {
					x = self.jiggle();
					y = self.jiggle();
					l = x * x + y * y;
				}
				let d = l.sqrt();
				let k = (reach - d) / d * strength * 0.5;
				nodes[i].vx += x * k;
				nodes[i].vy += y * k;
				nodes[j].vx -= x * k;
				nodes[j].vy -= y * k;
			}
		}
	}

	fn integrate(&self, nodes: &mut [GraphNode]) {
		let keep = 1.0 - self.config.velocity_decay;
		for node in nodes {
			if let Some((fx, fy)) = node.pinned {
				node.x = fx;
				node.y = fy;
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= keep;
			node.vy *= keep;
			node.x += node.vx;
			node.y += node.vy;
		}
	}
}

/// Fastest free node. Pinned nodes never move on their own.
fn max_speed(nodes: &[GraphNode]) -> f64 {
	nodes
		.iter()
		.filter(|n| n.pinned.is_none())
		.map(|n| n.vx.hypot(n.vy))
		.fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::aggregate::aggregate;
	use crate::graph::RawEdge;

	fn clique(ids: &[&str]) -> (Vec<GraphNode>, Vec<AggregatedEdge>) {
		let nodes = ids
			.iter()
			.enumerate()
			.map(|(i, id)| {
				let (x, y) = (i as f64 * 7.0 - 10.0, (i as f64 * 1.3).sin() * 15.0);
				GraphNode::new(*id, *id, x, y)
			})
			.collect();
		let mut raw = Vec::new();
		for (i, a) in ids.iter().enumerate() {
			for b in &ids[i + 1..] {
				raw.push(RawEdge::team((*a, *a), (*b, *b), "T"));
			}
		}
		(nodes, aggregate(&raw, None))
	}

	fn run_to_end(sim: &mut Simulation, nodes: &mut [GraphNode]) -> usize {
		for _ in 0..5_000 {
			if sim.tick(nodes) == TickOutcome::Converged {
				return sim.ticks();
			}
		}
		panic!("simulation did not converge");
	}

	#[test]
	fn link_parameters_follow_count() {
		let config = SimulationConfig::default();
		assert_eq!(link_distance(&config, 1), 280.0);
		assert_eq!(link_distance(&config, 2), 250.0);
		assert_eq!(link_distance(&config, 1 << 12), 180.0);
		assert!((link_strength(&config, 1, 1.0) - 0.4).abs() < 1e-12);
		assert!((link_strength(&config, 1 << 20, 1.0) - 0.8).abs() < 1e-12);
		assert!((link_strength(&config, 4, 0.5) - 0.4 * 1.6 * 0.5).abs() < 1e-12);
	}

	#[test]
	fn density_factor_shrinks_for_dense_graphs() {
		assert_eq!(density_factor(10, 5), 1.0);
		assert_eq!(density_factor(10, 40), 0.5);
		assert_eq!(density_factor(10, 10_000), 0.25);
		assert_eq!(density_factor(0, 3), 1.0);
	}

	#[test]
	fn settles_below_velocity_epsilon() {
		let (mut nodes, edges) = clique(&["a", "b", "c", "d", "e"]);
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &edges);
		assert_eq!(sim.phase(), Phase::Running);
		run_to_end(&mut sim, &mut nodes);

		assert_eq!(sim.phase(), Phase::Converged);
		for node in &nodes {
			assert!(node.x.is_finite() && node.y.is_finite());
			assert!(node.vx.hypot(node.vy) < 0.01, "{} still moving", node.id);
		}
		assert_eq!(sim.tick(&mut nodes), TickOutcome::Idle);
	}

	#[test]
	fn linked_nodes_end_near_rest_length() {
		let (mut nodes, edges) = clique(&["a", "b"]);
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &edges);
		run_to_end(&mut sim, &mut nodes);
		let d = (nodes[0].x - nodes[1].x).hypot(nodes[0].y - nodes[1].y);
		assert!(d > 100.0 && d < 600.0, "distance {d}");
	}

	#[test]
	fn restored_layout_starts_warm() {
		let (mut nodes, edges) = clique(&["a", "b", "c"]);
		for node in &mut nodes {
			node.restored = true;
		}
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &edges);
		assert_eq!(sim.alpha(), 0.05);

		nodes[0].restored = false;
		nodes[1].restored = false;
		sim.seed(&nodes, &edges);
		assert_eq!(sim.alpha(), 1.0);
	}

	#[test]
	fn warm_start_converges_faster() {
		let (mut cold, edges) = clique(&["a", "b", "c", "d"]);
		let mut warm = cold.clone();
		for node in &mut warm {
			node.restored = true;
		}
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&cold, &edges);
		let cold_ticks = run_to_end(&mut sim, &mut cold);
		sim.seed(&warm, &edges);
		let warm_ticks = run_to_end(&mut sim, &mut warm);
		assert!(warm_ticks < cold_ticks);
	}

	#[test]
	fn pinned_nodes_do_not_move() {
		let (mut nodes, edges) = clique(&["a", "b", "c"]);
		nodes[0].pinned = Some((40.0, -40.0));
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &edges);
		for _ in 0..20 {
			sim.tick(&mut nodes);
		}
		assert_eq!((nodes[0].x, nodes[0].y), (40.0, -40.0));
		assert_eq!((nodes[0].vx, nodes[0].vy), (0.0, 0.0));
	}

	#[test]
	fn stop_halts_and_empty_graph_stays_seeding() {
		let (mut nodes, edges) = clique(&["a", "b"]);
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &edges);
		sim.tick(&mut nodes);
		assert!(sim.stop());
		assert!(!sim.stop());
		let before = nodes.clone();
		assert_eq!(sim.tick(&mut nodes), TickOutcome::Idle);
		assert_eq!(before, nodes);

		sim.seed(&[], &[]);
		assert_eq!(sim.phase(), Phase::Seeding);
		sim.reheat();
		assert_eq!(sim.phase(), Phase::Seeding);
	}

	#[test]
	fn coincident_nodes_separate() {
		let mut nodes = vec![
			GraphNode::new("a", "a", 0.0, 0.0),
			GraphNode::new("b", "b", 0.0, 0.0),
		];
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &[]);
		for _ in 0..50 {
			sim.tick(&mut nodes);
		}
		let d = (nodes[0].x - nodes[1].x).hypot(nodes[0].y - nodes[1].y);
		assert!(d.is_finite() && d > 1.0);
	}

	#[test]
	fn reheat_resumes_converged_run() {
		let (mut nodes, edges) = clique(&["a", "b"]);
		let mut sim = Simulation::new(SimulationConfig::default());
		sim.seed(&nodes, &edges);
		run_to_end(&mut sim, &mut nodes);
		sim.reheat();
		assert!(sim.is_running());
		for _ in 0..10 {
			assert_eq!(sim.tick(&mut nodes), TickOutcome::Advanced);
		}
		assert!(sim.alpha() > SimulationConfig::default().alpha_min);
		sim.release();
		run_to_end(&mut sim, &mut nodes);
		assert_eq!(sim.phase(), Phase::Converged);
	}
}

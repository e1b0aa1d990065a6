use serde::Deserialize;

/// Physics tuning. Every field has a default, so partial JSON is fine.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
	/// Alpha for a fresh layout.
	pub alpha_start: f64,
	/// Alpha when most nodes carry a restored position.
	pub alpha_warm: f64,
	/// Fraction of restored nodes above which the warm start is used.
	pub warm_fraction: f64,
	/// Floor below which the run converges.
	pub alpha_min: f64,
	/// Speed every free node must drop below before the run converges.
	pub velocity_epsilon: f64,
	/// Per-tick geometric decay towards the alpha target.
	pub alpha_decay: f64,
	/// Alpha target while a node is being dragged.
	pub alpha_target_drag: f64,
	/// Fraction of velocity lost each tick.
	pub velocity_decay: f64,
	/// Many-body strength before density scaling. Negative repels.
	pub charge: f64,
	/// Distance below which many-body forces stop growing.
	pub charge_distance_min: f64,
	/// Pull towards the origin.
	pub center_strength: f64,
	/// Minimum separation radius of every node.
	pub collision_radius: f64,
	/// Collision correction strength.
	pub collision_strength: f64,
	/// Link rest length for a single interaction.
	pub link_distance_max: f64,
	/// Shortest link rest length.
	pub link_distance_min: f64,
	/// Rest length lost per doubling of the edge count.
	pub link_distance_step: f64,
	/// Cap on the total rest length lost.
	pub link_distance_cap: f64,
	/// Link strength for a single interaction.
	pub link_strength: f64,
	/// Strength growth per doubling of the edge count.
	pub link_strength_step: f64,
	/// Cap on the strength multiplier.
	pub link_strength_cap: f64,
	/// Seed for coincident-node jiggle.
	pub seed: u64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			alpha_start: 1.0,
			alpha_warm: 0.05,
			warm_fraction: 0.5,
			alpha_min: 0.001,
			velocity_epsilon: 0.01,
			alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
			alpha_target_drag: 0.3,
			velocity_decay: 0.4,
			charge: -300.0,
			charge_distance_min: 1.0,
			center_strength: 0.05,
			collision_radius: 14.0,
			collision_strength: 0.7,
			link_distance_max: 280.0,
			link_distance_min: 100.0,
			link_distance_step: 30.0,
			link_distance_cap: 100.0,
			link_strength: 0.4,
			link_strength_step: 0.3,
			link_strength_cap: 2.0,
			seed: 0x6a09_e667,
		}
	}
}

impl SimulationConfig {
	/// Reads a config from JSON, defaulting absent fields.
	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}
}

/// Colours and thresholds used by the renderer.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
	/// Canvas clear colour.
	pub background: String,
	/// Stroke for the selected node, search glow and hovered-meeting edges.
	pub highlight: String,
	/// Opacity of nodes that do not match an active search.
	pub search_dim_alpha: f64,
	/// Base opacity of edges.
	pub edge_alpha: f64,
	/// Base edge width in screen pixels.
	pub edge_width: f64,
	/// On-screen radius from which labels are drawn for every node.
	pub label_min_radius: f64,
	/// Labels are truncated to this many screen pixels.
	pub label_max_width: f64,
	/// Label font size in screen pixels.
	pub font_size: f64,
	/// Extra pick distance around a node, in screen pixels.
	pub hit_slop: f64,
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self {
			background: "#1a1a2e".into(),
			highlight: "#ffd166".into(),
			search_dim_alpha: 0.25,
			edge_alpha: 0.45,
			edge_width: 1.2,
			label_min_radius: 9.0,
			label_max_width: 120.0,
			font_size: 11.0,
			hit_slop: 4.0,
		}
	}
}

impl RenderConfig {
	/// CSS font string for labels.
	pub fn font(&self) -> String {
		format!("{}px sans-serif", self.font_size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config = SimulationConfig::from_json(r#"{ "charge": -120.0, "seed": 7 }"#).unwrap();
		assert_eq!(config.charge, -120.0);
		assert_eq!(config.seed, 7);
		assert_eq!(config.alpha_warm, 0.05);
		assert!(config.alpha_decay > 0.02 && config.alpha_decay < 0.03);
	}

	#[test]
	fn render_font_uses_size() {
		let config = RenderConfig {
			font_size: 14.0,
			..RenderConfig::default()
		};
		assert_eq!(config.font(), "14px sans-serif");
	}
}

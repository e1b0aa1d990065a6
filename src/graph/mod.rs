//! Relationship graph construction: ingestion, view building and edge aggregation.

pub mod aggregate;
mod builder;
mod model;
pub mod records;

pub use builder::{BuildOptions, GraphBuilder};
pub use model::{
	AggregatedEdge, EdgeCategory, EdgeKind, EngagementLevel, GraphData, GraphNode, GraphView,
	NodeRole, PairKey, RawEdge, pair_key,
};

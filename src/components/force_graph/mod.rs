//! Canvas force-directed graph: solver, renderer, interaction and the Leptos
//! component that drives them once per animation frame.

mod component;
pub mod interaction;
pub mod render;
pub mod simulation;
mod state;
pub mod style;
pub mod surface;
mod types;

pub use component::ForceGraphCanvas;
pub use interaction::{PointerOutcome, ResizeOutcome, ViewTransform};
pub use simulation::{Phase, Simulation, TickOutcome};
pub use state::{FrameOutcome, ForceGraphState, HoverState};
pub use surface::{DrawOp, RecordingSurface, Surface};
pub use types::{RenderConfig, SimulationConfig};

mod advect;
mod grid;
mod project;
mod sim;
mod vec2;

pub use advect::{advect_velocity, sample_velocity};
pub use grid::{Cell, Grid};
pub use project::{max_divergence, project, ProjectionOutcome};
pub use sim::{apply_body_force, SimParams, Simulation};
pub use vec2::Vec2;

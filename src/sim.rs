use crate::grid::should_parallel;
use crate::{advect_velocity, project, Cell, Grid, ProjectionOutcome, Vec2};
use rayon::prelude::*;

/// Step configuration. The defaults reproduce the classic demo setup:
/// gravity only, over-relaxed projection, advection left out of the step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    pub body_force: Vec2,
    pub over_relaxation: f32,
    pub divergence_tol: f32,
    pub max_projection_sweeps: usize,
    pub advect: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            body_force: Vec2::new(0.0, -9.81),
            over_relaxation: 1.9,
            divergence_tol: 0.01,
            max_projection_sweeps: 1000,
            advect: false,
        }
    }
}

/// Uniform body-force acceleration on every cell, scaled by dt. The force
/// is divided by the grid spacing so the discrete divergence it injects per
/// step does not change with grid resolution.
pub fn apply_body_force(grid: &mut Grid, force: Vec2, dt: f32) {
    if dt == 0.0 || (force.x == 0.0 && force.y == 0.0) {
        return;
    }
    let dv = force * (dt / grid.spacing());
    if should_parallel(grid.size()) {
        grid.cells.par_iter_mut().for_each(|cell| cell.velocity += dv);
    } else {
        for cell in &mut grid.cells {
            cell.velocity += dv;
        }
    }
}

/// Owns the grid and runs the step pipeline: body forces, divergence
/// projection, then advection when enabled.
#[derive(Clone, Debug)]
pub struct Simulation {
    grid: Grid,
    params: SimParams,
}

impl Simulation {
    pub fn new(width: usize, height: usize, spacing: f32) -> Self {
        Self::with_params(Grid::new(width, height, spacing), SimParams::default())
    }

    pub fn with_params(grid: Grid, params: SimParams) -> Self {
        Self { grid, params }
    }

    /// Walls are fixed at construction: `free(row, col)` classifies each
    /// cell once, for the lifetime of the simulation.
    pub fn with_walls(
        width: usize,
        height: usize,
        spacing: f32,
        params: SimParams,
        free: impl Fn(usize, usize) -> bool,
    ) -> Self {
        Self::with_params(Grid::from_fn(width, height, spacing, free), params)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn params(&self) -> SimParams {
        self.params
    }

    pub fn step(&mut self, dt: f32) -> ProjectionOutcome {
        apply_body_force(&mut self.grid, self.params.body_force, dt);
        let outcome = project(
            &mut self.grid,
            self.params.over_relaxation,
            self.params.divergence_tol,
            self.params.max_projection_sweeps,
        );
        if self.params.advect {
            advect_velocity(&mut self.grid, dt);
        }
        outcome
    }

    pub fn cell(&self, row: i32, col: i32) -> Option<&Cell> {
        self.grid.cell(row, col)
    }

    pub fn is_free(&self, row: i32, col: i32) -> bool {
        self.grid.is_free(row, col)
    }

    pub fn average_velocity(&self) -> Vec2 {
        self.grid.average_velocity()
    }
}

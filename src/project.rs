use crate::Grid;

/// Result of a projection run. Reaching the sweep cap without converging is
/// not an error; callers can inspect the final residual here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionOutcome {
    pub sweeps: usize,
    pub max_divergence: f32,
}

impl ProjectionOutcome {
    pub fn converged(&self, tol: f32) -> bool {
        self.max_divergence <= tol
    }
}

/// Local divergence at one cell: inflow from West/South minus outflow to
/// North/East, each read from the neighbor's own velocity sample. Absent
/// neighbors contribute nothing, so the grid boundary acts as a solid wall.
fn cell_divergence(grid: &Grid, row: i32, col: i32) -> f32 {
    let mut divergence = 0.0;
    if let Some(north) = grid.cell(row, col + 1) {
        divergence -= north.velocity.y;
    }
    if let Some(south) = grid.cell(row, col - 1) {
        divergence += south.velocity.y;
    }
    if let Some(west) = grid.cell(row - 1, col) {
        divergence += west.velocity.x;
    }
    if let Some(east) = grid.cell(row + 1, col) {
        divergence -= east.velocity.x;
    }
    divergence
}

/// Largest |divergence| over the whole grid. Read-only probe for
/// diagnostics and tests.
pub fn max_divergence(grid: &Grid) -> f32 {
    let width = grid.width();
    (0..grid.size())
        .map(|i| {
            let row = (i / width) as i32;
            let col = (i % width) as i32;
            cell_divergence(grid, row, col).abs()
        })
        .fold(0.0_f32, f32::max)
}

/// Gauss-Seidel over-relaxation: each sweep redistributes every cell's
/// local divergence to its free neighbors, until the sweep maximum falls
/// below `tol` or `max_sweeps` is reached. Sweeps mutate velocities as they
/// go, so this stays strictly sequential.
pub fn project(
    grid: &mut Grid,
    over_relaxation: f32,
    tol: f32,
    max_sweeps: usize,
) -> ProjectionOutcome {
    let width = grid.width();
    let mut outcome = ProjectionOutcome {
        sweeps: 0,
        max_divergence: f32::INFINITY,
    };
    for sweep in 0..max_sweeps {
        let mut sweep_max = 0.0_f32;
        for i in 0..grid.size() {
            let row = (i / width) as i32;
            let col = (i % width) as i32;

            let north = grid.index_of(row, col + 1);
            let south = grid.index_of(row, col - 1);
            let west = grid.index_of(row - 1, col);
            let east = grid.index_of(row + 1, col);

            let mut divergence = 0.0;
            let mut states = 0u32;
            if let Some(n) = north {
                divergence -= grid.cells[n].velocity.y;
                states += grid.cells[n].free as u32;
            }
            if let Some(s) = south {
                divergence += grid.cells[s].velocity.y;
                states += grid.cells[s].free as u32;
            }
            if let Some(w) = west {
                divergence += grid.cells[w].velocity.x;
                states += grid.cells[w].free as u32;
            }
            if let Some(e) = east {
                divergence -= grid.cells[e].velocity.x;
                states += grid.cells[e].free as u32;
            }

            sweep_max = sweep_max.max(divergence.abs());

            // A fully walled-in cell has nowhere to push its divergence;
            // dividing by zero here would flood the field with NaN.
            if states == 0 {
                continue;
            }
            let share = divergence * over_relaxation / states as f32;
            if let Some(n) = north {
                let cell = &mut grid.cells[n];
                if cell.free {
                    cell.velocity.y += share;
                }
            }
            if let Some(s) = south {
                let cell = &mut grid.cells[s];
                if cell.free {
                    cell.velocity.y -= share;
                }
            }
            if let Some(w) = west {
                let cell = &mut grid.cells[w];
                if cell.free {
                    cell.velocity.x -= share;
                }
            }
            if let Some(e) = east {
                let cell = &mut grid.cells[e];
                if cell.free {
                    cell.velocity.x += share;
                }
            }
        }
        outcome.sweeps = sweep + 1;
        outcome.max_divergence = sweep_max;
        if sweep_max <= tol {
            break;
        }
    }
    outcome
}

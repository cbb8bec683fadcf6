use crate::grid::should_parallel;
use crate::{Cell, Grid, Vec2};
use rayon::prelude::*;

/// Bilinear sample of the velocity field at an arbitrary continuous
/// position.
pub fn sample_velocity(grid: &Grid, position: Vec2) -> Vec2 {
    sample_with(grid, position, |cell| cell.velocity)
}

fn sample_with(grid: &Grid, position: Vec2, read: impl Fn(&Cell) -> Vec2) -> Vec2 {
    let h = grid.spacing();
    // Containing cell, truncated toward zero like the C cast it mirrors.
    let row = (position.x / h) as i32;
    let col = (position.y / h) as i32;
    // The quadrant of the displacement from the containing cell's center
    // picks the reference corner of the 2x2 interpolation square: the
    // reference corner is the one carrying the (1-tx)(1-ty) weight, so a
    // sample taken exactly at a cell center returns that cell's velocity
    // through every branch.
    let d = position - grid.cell_center(row, col);
    let (r0, c0) = match (d.x >= 0.0, d.y >= 0.0) {
        (true, true) => (row, col),
        (true, false) => (row, col - 1),
        (false, false) => (row - 1, col - 1),
        (false, true) => (row - 1, col),
    };
    let origin = grid.cell_center(r0, c0);
    let tx = (position.x - origin.x) / h;
    let ty = (position.y - origin.y) / h;
    let w00 = (1.0 - tx) * (1.0 - ty);
    let w10 = tx * (1.0 - ty);
    let w01 = (1.0 - tx) * ty;
    let w11 = tx * ty;
    // Absent corners contribute zero and weights are not renormalized, so
    // sampled magnitude attenuates next to the grid edge.
    let mut velocity = Vec2::zero();
    if let Some(cell) = grid.cell(r0, c0) {
        velocity += read(cell) * w00;
    }
    if let Some(cell) = grid.cell(r0 + 1, c0) {
        velocity += read(cell) * w10;
    }
    if let Some(cell) = grid.cell(r0, c0 + 1) {
        velocity += read(cell) * w01;
    }
    if let Some(cell) = grid.cell(r0 + 1, c0 + 1) {
        velocity += read(cell) * w11;
    }
    velocity
}

/// Semi-Lagrangian transport: trace each cell backward through the
/// snapshotted field by one step and resample the snapshot there.
pub fn advect_velocity(grid: &mut Grid, dt: f32) {
    if dt == 0.0 {
        return;
    }
    // Snapshot first: every backward trace reads the same pre-step field,
    // whatever order the cells are processed in.
    if should_parallel(grid.size()) {
        grid.cells
            .par_iter_mut()
            .for_each(|cell| cell.old_velocity = cell.velocity);
    } else {
        for cell in &mut grid.cells {
            cell.old_velocity = cell.velocity;
        }
    }
    let h = grid.spacing();
    let sampled: Vec<Vec2> = {
        let frozen = &*grid;
        let trace = |cell: &Cell| {
            let source = cell.center - cell.old_velocity * (dt * h);
            sample_with(frozen, source, |corner| corner.old_velocity)
        };
        if should_parallel(frozen.size()) {
            frozen.cells.par_iter().map(trace).collect()
        } else {
            frozen.cells.iter().map(trace).collect()
        }
    };
    for (cell, velocity) in grid.cells.iter_mut().zip(sampled) {
        cell.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32, tol: f32) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn checkered(width: usize, height: usize, spacing: f32) -> Grid {
        let mut grid = Grid::new(width, height, spacing);
        for row in 0..height {
            for col in 0..width {
                let v = Vec2::new(
                    (row * width + col) as f32 + 1.0,
                    -((row + 2 * col) as f32),
                );
                grid.set_velocity(row, col, v);
            }
        }
        grid
    }

    #[test]
    fn sampling_at_cell_centers_is_exact() {
        let grid = checkered(3, 3, 1.0);
        for row in 0..3 {
            for col in 0..3 {
                let cell = grid.cell(row, col).unwrap();
                let sampled = sample_velocity(&grid, cell.center());
                assert_close(sampled.x, cell.velocity().x, 1e-5);
                assert_close(sampled.y, cell.velocity().y, 1e-5);
            }
        }
    }

    #[test]
    fn sampling_at_cell_centers_is_exact_for_non_unit_spacing() {
        let grid = checkered(3, 3, 0.25);
        let cell = grid.cell(1, 2).unwrap();
        let sampled = sample_velocity(&grid, cell.center());
        assert_close(sampled.x, cell.velocity().x, 1e-5);
        assert_close(sampled.y, cell.velocity().y, 1e-5);
    }

    #[test]
    fn sampling_the_shared_corner_averages_four_cells() {
        let mut grid = Grid::new(2, 2, 1.0);
        grid.set_velocity(0, 0, Vec2::new(1.0, 0.0));
        grid.set_velocity(0, 1, Vec2::new(2.0, 0.0));
        grid.set_velocity(1, 0, Vec2::new(3.0, 0.0));
        grid.set_velocity(1, 1, Vec2::new(4.0, 0.0));
        let sampled = sample_velocity(&grid, Vec2::new(1.0, 1.0));
        assert_close(sampled.x, 2.5, 1e-5);
    }

    #[test]
    fn sampling_blends_by_bilinear_weights() {
        let mut grid = Grid::new(2, 2, 1.0);
        grid.set_velocity(0, 0, Vec2::new(1.0, 0.0));
        grid.set_velocity(0, 1, Vec2::new(3.0, 0.0));
        grid.set_velocity(1, 0, Vec2::new(2.0, 0.0));
        grid.set_velocity(1, 1, Vec2::new(4.0, 0.0));
        // Position (0.75, 0.75) sits a quarter cell past the center of
        // (0, 0): weights 0.5625 / 0.1875 / 0.1875 / 0.0625.
        let sampled = sample_velocity(&grid, Vec2::new(0.75, 0.75));
        let expected = 1.0 * 0.5625 + 2.0 * 0.1875 + 3.0 * 0.1875 + 4.0 * 0.0625;
        assert_close(sampled.x, expected, 1e-5);
    }

    #[test]
    fn samples_attenuate_next_to_the_edge() {
        let mut grid = Grid::new(2, 2, 1.0);
        for row in 0..2 {
            for col in 0..2 {
                grid.set_velocity(row, col, Vec2::new(1.0, 0.0));
            }
        }
        // Two of the four corners fall outside the grid and are dropped
        // without renormalizing, so the uniform field reads at 0.75 here.
        let sampled = sample_velocity(&grid, Vec2::new(0.5, 0.25));
        assert_close(sampled.x, 0.75, 1e-5);
    }

    #[test]
    fn advecting_a_uniform_interior_field_is_stationary() {
        let mut grid = Grid::new(5, 5, 1.0);
        for row in 0..5 {
            for col in 0..5 {
                grid.set_velocity(row, col, Vec2::new(0.4, -0.3));
            }
        }
        advect_velocity(&mut grid, 0.5);
        let center = grid.cell(2, 2).unwrap().velocity();
        assert_close(center.x, 0.4, 1e-5);
        assert_close(center.y, -0.3, 1e-5);
    }

    #[test]
    fn advection_reads_the_snapshot_not_the_live_field() {
        let mut grid = checkered(3, 3, 1.0);
        let before = grid.clone();
        let dt = 0.25;
        advect_velocity(&mut grid, dt);
        // Each result must equal a sample of the untouched pre-step field
        // at the backward-traced source, independent of processing order.
        let h = before.spacing();
        for row in 0..3 {
            for col in 0..3 {
                let old = before.cell(row, col).unwrap();
                let source = old.center() - old.velocity() * (dt * h);
                let expected = sample_velocity(&before, source);
                let got = grid.cell(row, col).unwrap().velocity();
                assert_close(got.x, expected.x, 1e-5);
                assert_close(got.y, expected.y, 1e-5);
            }
        }
    }

    #[test]
    fn zero_dt_advection_is_a_no_op() {
        let mut grid = checkered(2, 2, 1.0);
        let before = grid.clone();
        advect_velocity(&mut grid, 0.0);
        assert_eq!(grid, before);
    }
}

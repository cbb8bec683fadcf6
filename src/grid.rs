use crate::Vec2;
use std::sync::OnceLock;

const PAR_THRESHOLD_DEFAULT: usize = 262_144;
const PAR_MIN_WORK_PER_THREAD: usize = 4096;

fn parallel_threshold() -> usize {
    static THRESHOLD: OnceLock<usize> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var("SIM_PAR_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(PAR_THRESHOLD_DEFAULT)
    })
}

pub(crate) fn should_parallel(len: usize) -> bool {
    if len < parallel_threshold() {
        return false;
    }
    let threads = rayon::current_num_threads().max(1);
    len / threads >= PAR_MIN_WORK_PER_THREAD
}

/// One lattice site: a velocity sample plus a solid/free classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub(crate) id: usize,
    pub(crate) center: Vec2,
    pub(crate) free: bool,
    pub(crate) velocity: Vec2,
    pub(crate) old_velocity: Vec2,
}

impl Cell {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

/// Fixed-size cell lattice. Dimensions, spacing, and the free/solid
/// classification are immutable after construction; only velocities mutate.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    spacing: f32,
    pub(crate) cells: Vec<Cell>,
}

impl Grid {
    /// All-free grid. Panics on zero dimensions or non-positive spacing.
    pub fn new(width: usize, height: usize, spacing: f32) -> Self {
        Self::from_fn(width, height, spacing, |_, _| true)
    }

    /// Grid with walls fixed at construction: `free(row, col)` decides each
    /// cell's classification.
    pub fn from_fn(
        width: usize,
        height: usize,
        spacing: f32,
        free: impl Fn(usize, usize) -> bool,
    ) -> Self {
        assert!(width > 0, "width must be > 0");
        assert!(height > 0, "height must be > 0");
        assert!(spacing > 0.0, "spacing must be > 0");
        let cells = (0..width * height)
            .map(|id| {
                let row = id / width;
                let col = id % width;
                Cell {
                    id,
                    center: Vec2::new(row as f32 + 0.5, col as f32 + 0.5) * spacing,
                    free: free(row, col),
                    velocity: Vec2::zero(),
                    old_velocity: Vec2::zero(),
                }
            })
            .collect();
        Self {
            width,
            height,
            spacing,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn size(&self) -> usize {
        self.width * self.height
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.height && col < self.width);
        row * self.width + col
    }

    pub(crate) fn index_of(&self, row: i32, col: i32) -> Option<usize> {
        if row < 0 || row >= self.height as i32 || col < 0 || col >= self.width as i32 {
            return None;
        }
        Some(self.idx(row as usize, col as usize))
    }

    pub fn cell(&self, row: i32, col: i32) -> Option<&Cell> {
        self.index_of(row, col).map(|i| &self.cells[i])
    }

    pub(crate) fn cell_mut(&mut self, row: i32, col: i32) -> Option<&mut Cell> {
        self.index_of(row, col).map(|i| &mut self.cells[i])
    }

    pub fn cell_center(&self, row: i32, col: i32) -> Vec2 {
        Vec2::new(row as f32 + 0.5, col as f32 + 0.5) * self.spacing
    }

    /// Out-of-range coordinates read as solid: everything outside the grid
    /// is an implicit wall.
    pub fn is_free(&self, row: i32, col: i32) -> bool {
        self.cell(row, col).map(|cell| cell.free).unwrap_or(false)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn set_velocity(&mut self, row: usize, col: usize, velocity: Vec2) {
        let i = self.idx(row, col);
        self.cells[i].velocity = velocity;
    }

    pub fn average_velocity(&self) -> Vec2 {
        let total = self
            .cells
            .iter()
            .fold(Vec2::zero(), |acc, cell| acc + cell.velocity);
        total * (1.0 / self.cells.len() as f32)
    }
}

//! Constraint islands and the solvers that consume them
//!
//! An island is a small dense system `A λ = b` with per-row bounds on `λ`,
//! the shape contact and joint constraints reduce to. Solvers are stateful
//! (warm-start buffers, counters) and not shared between threads, so the
//! scheduler borrows one per island from a `ConstraintSolverPool`.

mod gauss_seidel;
mod pool;

pub use gauss_seidel::GaussSeidelSolver;
pub use pool::{ConstraintSolverPool, SolverLease};

/// One independent constraint system.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintIsland {
    /// Row-major `rows x rows` matrix
    pub a: Vec<f32>,
    pub b: Vec<f32>,
    pub lo: Vec<f32>,
    pub hi: Vec<f32>,
    /// Solution, used as the warm start on entry
    pub lambda: Vec<f32>,
}

impl ConstraintIsland {
    /// An unbounded island with zero warm start
    ///
    /// # Panics
    ///
    /// If `a` is not `b.len()` squared.
    pub fn new(a: Vec<f32>, b: Vec<f32>) -> Self {
        let rows = b.len();
        assert_eq!(a.len(), rows * rows, "matrix is not {}x{}", rows, rows);
        Self {
            a,
            b,
            lo: vec![f32::NEG_INFINITY; rows],
            hi: vec![f32::INFINITY; rows],
            lambda: vec![0.0; rows],
        }
    }

    /// Clamp every row to `[lo, hi]`
    pub fn with_bounds(mut self, lo: f32, hi: f32) -> Self {
        self.lo.fill(lo);
        self.hi.fill(hi);
        self
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.b.len()
    }

    /// `max |b - A λ|` over rows whose `λ` is strictly inside its bounds
    pub fn residual(&self) -> f32 {
        let n = self.rows();
        (0..n)
            .filter(|&i| self.lambda[i] > self.lo[i] && self.lambda[i] < self.hi[i])
            .map(|i| {
                let row = &self.a[i * n..(i + 1) * n];
                let ax: f32 = row.iter().zip(&self.lambda).map(|(a, l)| a * l).sum();
                (self.b[i] - ax).abs()
            })
            .fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub iterations: usize,
    /// Stop early once the largest per-row update falls below this
    pub tolerance: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            iterations: 20,
            tolerance: 1e-6,
        }
    }
}

/// Outcome of one island solve
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveStats {
    pub rows: usize,
    pub iterations: usize,
    pub residual: f32,
}

pub trait ConstraintSolver: Send {
    fn name(&self) -> &'static str;

    fn solve_island(&mut self, island: &mut ConstraintIsland, settings: &SolverSettings) -> SolveStats;

    /// Drop any state carried between solves
    fn reset(&mut self);
}

//! Projected Gauss-Seidel

use super::{ConstraintIsland, ConstraintSolver, SolveStats, SolverSettings};

/// Reference island solver.
///
/// Sweeps rows in order, solving each against the latest values of the
/// others and projecting onto the row's bounds.
#[derive(Debug, Default)]
pub struct GaussSeidelSolver {
    diagonal_inv: Vec<f32>,
    islands_solved: usize,
}

impl GaussSeidelSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Islands solved since construction or the last `reset()`
    pub fn islands_solved(&self) -> usize {
        self.islands_solved
    }
}

impl ConstraintSolver for GaussSeidelSolver {
    fn name(&self) -> &'static str {
        "ProjectedGaussSeidel"
    }

    fn solve_island(&mut self, island: &mut ConstraintIsland, settings: &SolverSettings) -> SolveStats {
        let n = island.rows();
        self.diagonal_inv.clear();
        self.diagonal_inv.extend((0..n).map(|i| {
            let d = island.a[i * n + i];
            // a zero pivot leaves its row untouched
            if d.abs() > f32::EPSILON {
                1.0 / d
            } else {
                0.0
            }
        }));

        let mut iterations = 0;
        for _ in 0..settings.iterations {
            iterations += 1;
            let mut max_delta = 0.0f32;
            for i in 0..n {
                let row = &island.a[i * n..(i + 1) * n];
                let ax: f32 = row.iter().zip(&island.lambda).map(|(a, l)| a * l).sum();
                let old = island.lambda[i];
                let new = (old + (island.b[i] - ax) * self.diagonal_inv[i]).clamp(island.lo[i], island.hi[i]);
                island.lambda[i] = new;
                max_delta = max_delta.max((new - old).abs());
            }
            if max_delta < settings.tolerance {
                break;
            }
        }

        self.islands_solved += 1;
        SolveStats {
            rows: n,
            iterations,
            residual: island.residual(),
        }
    }

    fn reset(&mut self) {
        self.diagonal_inv.clear();
        self.islands_solved = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solves_diagonally_dominant_system() {
        // [4 1; 1 3] x = [1; 2] -> x = [1/11, 7/11]
        let mut island = ConstraintIsland::new(vec![4.0, 1.0, 1.0, 3.0], vec![1.0, 2.0]);
        let mut solver = GaussSeidelSolver::new();
        let stats = solver.solve_island(&mut island, &SolverSettings::default());
        assert_eq!(stats.rows, 2);
        assert!((island.lambda[0] - 1.0 / 11.0).abs() < 1e-4);
        assert!((island.lambda[1] - 7.0 / 11.0).abs() < 1e-4);
        assert!(stats.residual < 1e-4);
        assert_eq!(solver.islands_solved(), 1);
    }

    #[test]
    fn test_bounds_are_respected() {
        // unconstrained solution is negative; contact rows push only
        let mut island = ConstraintIsland::new(vec![2.0], vec![-3.0]).with_bounds(0.0, f32::INFINITY);
        let mut solver = GaussSeidelSolver::new();
        solver.solve_island(&mut island, &SolverSettings::default());
        assert_eq!(island.lambda[0], 0.0);
        solver.reset();
        assert_eq!(solver.islands_solved(), 0);
    }

    #[test]
    fn test_empty_island() {
        let mut island = ConstraintIsland::new(Vec::new(), Vec::new());
        let stats = GaussSeidelSolver::new().solve_island(&mut island, &SolverSettings::default());
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.residual, 0.0);
    }
}

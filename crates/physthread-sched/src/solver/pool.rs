//! Pool of constraint solvers
//!
//! A fixed set of solver instances in a lock-free queue. Each island solve
//! pops one, uses it exclusively, and pushes it back. The pool is sized
//! once; a different size means building a new pool.

use std::ops::{Deref, DerefMut};

use crossbeam_queue::ArrayQueue;
use physthread_core::ktrace;

use super::{ConstraintSolver, GaussSeidelSolver};
use crate::error::{check_thread_count, SchedResult};

pub struct ConstraintSolverPool {
    solvers: ArrayQueue<Box<dyn ConstraintSolver>>,
    num_solvers: usize,
}

impl ConstraintSolverPool {
    /// `n` projected Gauss-Seidel solvers; `n` must be in `[1, 16]`.
    pub fn new(n: usize) -> SchedResult<Self> {
        Self::with_factory(n, || Box::new(GaussSeidelSolver::new()))
    }

    pub fn with_factory<F>(n: usize, mut factory: F) -> SchedResult<Self>
    where
        F: FnMut() -> Box<dyn ConstraintSolver>,
    {
        let n = check_thread_count(n)?;
        let solvers = ArrayQueue::new(n);
        for _ in 0..n {
            // capacity is n, so every push fits
            let _ = solvers.push(factory());
        }
        Ok(Self { solvers, num_solvers: n })
    }

    #[inline]
    pub fn num_solvers(&self) -> usize {
        self.num_solvers
    }

    /// Solvers not currently lent out
    #[inline]
    pub fn available(&self) -> usize {
        self.solvers.len()
    }

    /// Borrow a free solver, spinning while all are in use
    pub fn acquire(&self) -> SolverLease<'_> {
        let mut spins = 0u32;
        loop {
            if let Some(solver) = self.solvers.pop() {
                return SolverLease {
                    pool: self,
                    solver: Some(solver),
                };
            }
            spins = spins.wrapping_add(1);
            if spins < 64 {
                std::hint::spin_loop();
            } else {
                if spins == 64 {
                    ktrace!("all {} solvers busy", self.num_solvers);
                }
                std::thread::yield_now();
            }
        }
    }

    pub fn try_acquire(&self) -> Option<SolverLease<'_>> {
        self.solvers.pop().map(|solver| SolverLease {
            pool: self,
            solver: Some(solver),
        })
    }

    /// Reset every idle solver
    pub fn reset_all(&self) {
        for _ in 0..self.solvers.len() {
            if let Some(mut solver) = self.solvers.pop() {
                solver.reset();
                let _ = self.solvers.push(solver);
            }
        }
    }
}

impl std::fmt::Debug for ConstraintSolverPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintSolverPool")
            .field("num_solvers", &self.num_solvers)
            .field("available", &self.available())
            .finish()
    }
}

/// A solver on loan; returned to its pool on drop
pub struct SolverLease<'a> {
    pool: &'a ConstraintSolverPool,
    solver: Option<Box<dyn ConstraintSolver>>,
}

impl Deref for SolverLease<'_> {
    type Target = dyn ConstraintSolver;

    fn deref(&self) -> &Self::Target {
        // Some until drop
        self.solver.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for SolverLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.solver.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for SolverLease<'_> {
    fn drop(&mut self) {
        if let Some(solver) = self.solver.take() {
            let _ = self.pool.solvers.push(solver);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedError;
    use crate::solver::{ConstraintIsland, SolverSettings};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_size_bounds() {
        assert_eq!(ConstraintSolverPool::new(1).unwrap().num_solvers(), 1);
        assert_eq!(ConstraintSolverPool::new(16).unwrap().num_solvers(), 16);
        assert_eq!(ConstraintSolverPool::new(0).unwrap_err(), SchedError::ThreadCountOutOfRange(0));
        assert_eq!(ConstraintSolverPool::new(17).unwrap_err(), SchedError::ThreadCountOutOfRange(17));
    }

    #[test]
    fn test_lease_returns_on_drop() {
        let pool = ConstraintSolverPool::new(2).unwrap();
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire().is_none());
        drop(a);
        assert_eq!(pool.available(), 1);
        drop(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_more_threads_than_solvers() {
        let pool = Arc::new(ConstraintSolverPool::new(2).unwrap());
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let mut island = ConstraintIsland::new(vec![2.0], vec![4.0]);
                        let mut solver = pool.acquire();
                        solver.solve_island(&mut island, &SolverSettings::default());
                        assert!((island.lambda[0] - 2.0).abs() < 1e-5);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.available(), 2);
    }
}

//! Basic physthread example
//!
//! Sum of squares over a 4-worker pool, then a few simulation steps with a
//! thread-count change in between.
//!
//! # Environment Variables
//!
//! - `PHYS_FLUSH_EPRINT=1` - Flush debug output immediately
//! - `PHYS_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `PHYS_NUM_THREADS=n` - Initial thread count (1..=16)

use physthread::{
    defaults, kinfo, ConstraintIsland, PhysicsHost, PoolConfig, TaskScheduler, ThreadCountSetting, WorkerThreadPool,
};
use std::process::ExitCode;

// PHYS_LOG_LEVEL=debug PHYS_FLUSH_EPRINT=1 cargo run -p physthread-basic
fn main() -> ExitCode {
    println!("=== physthread Basic Example ===\n");

    if let Err(e) = sum_of_squares() {
        eprintln!("pool failed: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = simulate() {
        eprintln!("simulation failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn sum_of_squares() -> physthread::PoolResult<()> {
    let config = PoolConfig::from_env().num_threads(4).unique_name("squares");
    // each worker keeps the inputs it has seen in its scratch buffer
    let mut pool = WorkerThreadPool::new(
        &config,
        |x: u64, seen: &mut Vec<u64>| {
            seen.push(x);
            x * x
        },
        || Vec::with_capacity(defaults::SCRATCH_BYTES / std::mem::size_of::<u64>()),
    )?;

    for (slot, x) in [1u64, 2, 3, 4].into_iter().enumerate() {
        pool.send_request(0, x, slot);
    }
    let mut results = Vec::with_capacity(4);
    for _ in 0..4 {
        let r = pool.wait_for_response();
        println!("slot {} finished: {:?}", r.task_id, r.output);
        results.extend(r.output);
    }
    results.sort_unstable();
    println!("squares: {:?}, sum {}\n", results, results.iter().sum::<u64>());

    pool.shutdown();
    Ok(())
}

fn islands(count: usize) -> Vec<ConstraintIsland> {
    (0..count)
        .map(|k| {
            let n = 3 + k % 4;
            let mut a = vec![0.0; n * n];
            for i in 0..n {
                for j in 0..n {
                    a[i * n + j] = if i == j { n as f32 + 1.0 } else { 0.5 };
                }
            }
            ConstraintIsland::new(a, vec![1.0; n]).with_bounds(0.0, f32::INFINITY)
        })
        .collect()
}

fn simulate() -> physthread::SchedResult<()> {
    let host = PhysicsHost::new(&PoolConfig::from_env().unique_name("basic-sim"), ThreadCountSetting::from_env())?;
    let env = host.create_environment()?;
    let active = host.registry().active()?;
    println!("active scheduler: {} ({} threads)", active.name(), active.num_threads());

    let mut world = islands(64);
    for step in 0..3 {
        let stats = env.step(&mut world)?;
        println!(
            "step {}: {} islands, {} rows, max residual {:.2e}",
            step, stats.islands, stats.rows, stats.max_residual
        );
    }

    kinfo!("changing thread count");
    host.set_thread_count(2)?;
    if !host.set_thread_count(32)? {
        println!("thread count 32 ignored, still {}", host.thread_count());
    }
    let stats = env.step(&mut world)?;
    println!("after resize: {} islands with {} solvers", stats.islands, env.solver_pool().num_solvers());

    host.shutdown();
    Ok(())
}

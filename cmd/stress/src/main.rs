//! Stress test - pool churn, barrier generations, lock contention
//!
//! Usage: `stress [rounds]` (default 200)

use physthread::{Barrier, CriticalSection, PoolConfig, TaskScheduler, WorkerThreadPool};
use physthread::{PhysicsHost, ThreadCountSetting};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn config(name: String, n: usize) -> PoolConfig {
    PoolConfig::from_env().num_threads(n).unique_name(name).pin_threads(false)
}

fn main() -> ExitCode {
    println!("=== physthread Stress Test ===\n");

    let rounds: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(200);

    let mut failures = 0;
    failures += churn(rounds);
    failures += barrier_generations(8, rounds);
    failures += critical_section(4, rounds * 1000);
    failures += scheduler_sum(rounds);

    println!("\n=== Results ===");
    if failures == 0 {
        println!("all checks passed");
        ExitCode::SUCCESS
    } else {
        println!("{} checks failed", failures);
        ExitCode::FAILURE
    }
}

/// Construct, use and destroy pools of every size
fn churn(rounds: usize) -> usize {
    let start = Instant::now();
    let mut failures = 0;
    for round in 0..rounds {
        let n = round % 16 + 1;
        let pool = match WorkerThreadPool::new(&config(format!("churn{}", n), n), |x: usize, _: &mut ()| x + 1, || ()) {
            Ok(pool) => pool,
            Err(e) => {
                println!("round {}: {}", round, e);
                failures += 1;
                continue;
            }
        };
        for slot in 0..n {
            pool.send_request(0, slot, slot);
        }
        let mut sum = 0;
        for _ in 0..n {
            sum += pool.wait_for_response().output.unwrap_or(0);
        }
        if sum != n * (n + 1) / 2 {
            println!("round {}: sum {} for {} workers", round, sum, n);
            failures += 1;
        }
    }
    println!("churn:         {} pools in {:?}", rounds, start.elapsed());
    failures
}

fn barrier_generations(n: usize, generations: usize) -> usize {
    let start = Instant::now();
    let barrier = Arc::new(Barrier::with_count(n));
    let arrived: Arc<Vec<AtomicUsize>> = Arc::new((0..generations).map(|_| AtomicUsize::new(0)).collect());
    let early = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let (barrier, arrived, early) = (Arc::clone(&barrier), Arc::clone(&arrived), Arc::clone(&early));
            thread::spawn(move || {
                for g in 0..generations {
                    arrived[g].fetch_add(1, Ordering::SeqCst);
                    barrier.sync();
                    if arrived[g].load(Ordering::SeqCst) != n {
                        early.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    let panicked = handles.into_iter().filter_map(|h| h.join().err()).count();

    let early = early.load(Ordering::SeqCst);
    println!("barrier:       {} generations x {} threads in {:?}, {} early", generations, n, start.elapsed(), early);
    early + panicked
}

fn critical_section(threads: usize, increments: usize) -> usize {
    let start = Instant::now();
    let cs = Arc::new(CriticalSection::new());
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cs = Arc::clone(&cs);
            thread::spawn(move || {
                for _ in 0..increments {
                    let guard = cs.enter();
                    guard.set_shared_param(0, guard.shared_param(0).wrapping_add(1));
                }
            })
        })
        .collect();
    let panicked = handles.into_iter().filter_map(|h| h.join().err()).count();

    let expected = (threads * increments) as u32;
    let got = cs.shared_param(0);
    println!("crit section:  {} x {} increments in {:?}, got {}", threads, increments, start.elapsed(), got);
    usize::from(got != expected) + panicked
}

fn scheduler_sum(rounds: usize) -> usize {
    let host = match PhysicsHost::new(&config("stress-sched".into(), 4), ThreadCountSetting::new(4)) {
        Ok(host) => host,
        Err(e) => {
            println!("host: {}", e);
            return 1;
        }
    };
    let registry = host.registry();
    let start = Instant::now();
    let mut failures = 0;
    for i in 0..registry.num_task_schedulers() {
        let Ok(ts) = registry.get_task_scheduler(i) else { continue };
        for _ in 0..rounds {
            let sum = ts.parallel_sum(0, 10_000, 97, &|r| r.map(|x| x as f64).sum());
            if sum != 49_995_000.0 {
                println!("{}: sum {}", ts.name(), sum);
                failures += 1;
                break;
            }
        }
    }
    println!("schedulers:    {} sums per backend in {:?}", rounds, start.elapsed());
    failures
}

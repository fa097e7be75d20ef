/// Concurrency management for calltrace.
/// Caps the batch-analysis pool so an attached editor stays responsive.

use anyhow::Result;

/// Initialize the global rayon thread pool with controlled worker count.
/// Uses half the cores, minimum 1 worker. Returns the worker count.
pub fn init_thread_pool() -> Result<usize> {
    let cores = num_cpus::get();
    let workers = std::cmp::max(1, cores / 2);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    println!(
        "[calltrace] Worker pool ready: {} workers ({} cores present)",
        workers, cores
    );

    Ok(workers)
}

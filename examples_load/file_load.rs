use std::sync::Arc;
use std::thread;
use std::time::Instant;

use locklog::env::{env_or, LOCKLOG_FOLDER_ENV};
use locklog::init::{init, init_tracing};
use locklog::Config;

fn main() -> Result<(), locklog::LogError> {
    let config = Config::new()
        .with("LOGGER", "handler", "file")
        .with("LOGGER", "name", "file_load.log")
        .with("FOLDERS", "logger", env_or(LOCKLOG_FOLDER_ENV, "load_logs"))
        .with_env_overrides();

    // The guard archives older month folders when `main` returns.
    let (logger, _guard) = init(config)?;
    init_tracing(Arc::clone(&logger))?;

    let threads: u64 = 4;
    let per_thread: u64 = 5_000;
    let start = Instant::now();

    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || -> Result<(), locklog::LogError> {
                for i in 0..per_thread {
                    if i % 2 == 0 {
                        logger.info(format!("worker {t} iteration {i}"))?;
                    } else {
                        tracing::warn!(worker = t, iteration = i, "routed through tracing");
                    }
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked")?;
    }

    let n = threads * per_thread;
    let elapsed = start.elapsed();
    println!("file sink: wrote {} lines in {:?} (~{:.0} lines/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}

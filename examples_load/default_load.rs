use std::sync::Arc;
use std::thread;
use std::time::Instant;

use locklog::noop_sink::NoopSink;
use locklog::{Config, Logger};

fn main() -> Result<(), locklog::LogError> {
    let logger = Arc::new(Logger::with_sink(Config::new(), Arc::new(NoopSink)));

    let threads: u64 = 8;
    let per_thread: u64 = 25_000;
    let start = Instant::now();

    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || -> Result<(), locklog::LogError> {
                for i in 0..per_thread {
                    locklog::info!(logger, "worker {} iteration {}", t, i)?;
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
    println!("noop sink: emitted {} lines in {:?} (~{:.0} lines/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}

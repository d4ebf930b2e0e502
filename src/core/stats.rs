use anyhow::Result;
use std::env;
use std::time::{Duration, Instant};

pub const STATS_ENV: &str = "SEQLEN_STATS";

pub fn enabled() -> bool {
    matches!(env::var(STATS_ENV).as_deref(), Ok("1"))
}

pub fn stage<F>(stats: bool, name: &str, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let t = Instant::now();
    let res = f();
    stage_done(stats, name, t);
    res
}

pub fn stage_done(stats: bool, name: &str, t: Instant) {
    if stats {
        eprintln!("{} stage={} time={}", STATS_ENV, name, fmt_dur(t.elapsed()));
    }
}

pub fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}

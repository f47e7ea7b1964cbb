use std::{env, path::PathBuf, time::Duration};

// Runtime/server settings (not gameplay tuning; that lives in the store).

pub const DEFAULT_TICK_HZ: u32 = 60;
const MIN_TICK_HZ: u32 = 10;
const MAX_TICK_HZ: u32 = 240;

pub fn bind_addr() -> String {
    env::var("DRIFT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9001".to_string())
}

pub fn store_path() -> PathBuf {
    env::var("DRIFT_STORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("drift2k_store.json"))
}

pub fn tick_hz() -> u32 {
    parse_tick_hz(env::var("DRIFT_TICK_HZ").ok().as_deref())
}

fn parse_tick_hz(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|hz| (MIN_TICK_HZ..=MAX_TICK_HZ).contains(hz))
        .unwrap_or(DEFAULT_TICK_HZ)
}

pub fn tick_interval(hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / hz.max(1) as f64)
}

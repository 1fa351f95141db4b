use crate::store::Storage;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerHealth {
    pub uptime_seconds: u64,
    pub nodes_tracked: u32,
    pub active_alerts: u32,
    pub ws_clients: u32,
    pub database_path: String,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    ws_clients: Arc<AtomicU32>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            ws_clients: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn ws_client_connected(&self) {
        self.ws_clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ws_client_disconnected(&self) {
        self.ws_clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, store: &Storage) -> ServerHealth {
        let (nodes_tracked, active_alerts) = match store.dashboard_stats() {
            Ok(stats) => (stats.total_nodes, stats.active_alerts),
            Err(e) => {
                eprintln!("[health] failed to read store stats: {e}");
                (0, 0)
            }
        };

        ServerHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            nodes_tracked,
            active_alerts,
            ws_clients: self.ws_clients.load(Ordering::Relaxed),
            database_path: store.path().to_string(),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    // Approximation simple via /proc, suffisant pour le endpoint de santé
    #[cfg(target_os = "linux")]
    {
        let pid = std::process::id();
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", pid)) {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<u64>() {
                            return (kb as f32) / 1024.0; // KB -> MB
                        }
                    }
                }
            }
        }
    }

    // Fallback approximatif
    12.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_client_gauge() {
        let tracker = HealthTracker::new();
        tracker.ws_client_connected();
        tracker.ws_client_connected();
        tracker.ws_client_disconnected();

        let store = Storage::open(":memory:").unwrap();
        let health = tracker.snapshot(&store);
        assert_eq!(health.ws_clients, 1);
        assert_eq!(health.nodes_tracked, 0);
        assert_eq!(health.database_path, ":memory:");
    }
}

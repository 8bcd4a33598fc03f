//! Diagnostics: logger setup, log capture and stage statistics.
//!
//! Enabled by the `diagnostics` feature flag. [`init_logger`] installs a
//! logger that prints through `env_logger` and also keeps the most recent
//! messages in a ring buffer, so a host can show them in its own overlay via
//! [`drain_captured_logs`]. [`StageStats`] is a serializable summary of one
//! [`Stage`].

use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use log::Log;
use serde::Serialize;

use crate::stage::Stage;

// ── Stage statistics ─────────────────────────────────────────────────────

/// Counts gathered by [`Stage::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub entity_count: usize,
    /// Entities spawned but not yet readied.
    pub pending_ready: usize,
    pub visible_count: usize,
    pub colliding_count: usize,
    /// Ids outstanding in the stage's id space (may exceed `entity_count`
    /// when entities built from it live outside the stage).
    pub live_ids: usize,
    pub collision_proxies: usize,
    pub static_obstacles: usize,
    pub ticks: u64,
}

impl StageStats {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Stage {
    pub fn stats(&self) -> StageStats {
        StageStats {
            entity_count: self.len(),
            pending_ready: self.pending_ready_count(),
            visible_count: self.visible().count(),
            colliding_count: self.colliding().count(),
            live_ids: self.ids().live_count(),
            collision_proxies: self.collision().proxy_count(),
            static_obstacles: self.collision().static_count(),
            ticks: self.tick_count(),
        }
    }
}

// ── Log capture ──────────────────────────────────────────────────────────

const LOG_CAPACITY: usize = 500;

/// One captured log line.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedLog {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp_secs: f32,
}

/// Fixed-capacity buffer of the newest log lines.
#[derive(Debug)]
struct LogRing {
    entries: VecDeque<CapturedLog>,
    capacity: usize,
}

impl LogRing {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest line when full.
    fn push(&mut self, entry: CapturedLog) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Remove and return up to `max` of the oldest lines.
    fn drain(&mut self, max: usize) -> Vec<CapturedLog> {
        let n = self.entries.len().min(max);
        self.entries.drain(..n).collect()
    }
}

/// Prints through env_logger and records into its ring.
struct CaptureLogger {
    inner: env_logger::Logger,
    ring: Mutex<LogRing>,
    start: Instant,
}

impl CaptureLogger {
    fn new(inner: env_logger::Logger, capacity: usize) -> Self {
        Self {
            inner,
            ring: Mutex::new(LogRing::new(capacity)),
            start: Instant::now(),
        }
    }

    fn drain(&self, max: usize) -> Vec<CapturedLog> {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(max)
    }
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);

        let entry = CapturedLog {
            level: record.level().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            timestamp_secs: self.start.elapsed().as_secs_f32(),
        };
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();

/// Install the capturing logger.
///
/// Defaults to `orrery=info`; `RUST_LOG` overrides it. Call once, early. If
/// another logger is already installed this prints a warning and leaves it.
pub fn init_logger() {
    let inner = env_logger::Builder::new()
        .filter_module("orrery", log::LevelFilter::Info)
        .parse_default_env()
        .build();
    let max_level = inner.filter();

    let logger = LOGGER.get_or_init(|| CaptureLogger::new(inner, LOG_CAPACITY));
    if log::set_logger(logger).is_err() {
        eprintln!("[orrery] Warning: a logger is already set. Log capture disabled.");
        return;
    }
    log::set_max_level(max_level);
}

/// Take up to `max` of the oldest captured log lines. Empty until
/// [`init_logger`] has run.
pub fn drain_captured_logs(max: usize) -> Vec<CapturedLog> {
    LOGGER
        .get()
        .map(|logger| logger.drain(max))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::CollisionBody;
    use crate::collision::Aabb;
    use crate::math::{Transform, Vec3};
    use crate::visual::{MeshHandle, VisualEntity};

    #[test]
    fn stats_track_stage() {
        let mut stage = Stage::new();
        stage.collision().add_static(Aabb::new(Vec3::splat(10.0), Vec3::splat(11.0)));
        stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(0))).unwrap();
        stage
            .spawn(CollisionBody::with_transform(
                stage.ids(),
                stage.collision(),
                Vec3::ONE,
                Transform::from_xyz(-5.0, 0.0, 0.0),
            ))
            .unwrap();

        let before = stage.stats();
        assert_eq!(before.entity_count, 2);
        assert_eq!(before.pending_ready, 2);
        assert_eq!(before.collision_proxies, 0);
        assert_eq!(before.static_obstacles, 1);

        stage.tick(0.016);
        let after = stage.stats();
        assert_eq!(after.pending_ready, 0);
        assert_eq!(after.visible_count, 1);
        assert_eq!(after.colliding_count, 1);
        assert_eq!(after.live_ids, 2);
        assert_eq!(after.collision_proxies, 1);
        assert_eq!(after.ticks, 1);
    }

    #[test]
    fn stats_serialize() {
        let stage = Stage::new();
        let json = stage.stats().to_json().unwrap();
        assert!(json.contains("\"entity_count\":0"));
    }

    fn line(message: &str) -> CapturedLog {
        CapturedLog {
            level: "INFO".into(),
            target: "orrery".into(),
            message: message.into(),
            timestamp_secs: 0.0,
        }
    }

    #[test]
    fn ring_evicts_oldest_when_full() {
        let mut ring = LogRing::new(3);
        for i in 0..5 {
            ring.push(line(&i.to_string()));
        }
        let kept: Vec<_> = ring.drain(usize::MAX).into_iter().map(|l| l.message).collect();
        assert_eq!(kept, ["2", "3", "4"]);
        assert!(ring.drain(10).is_empty());
    }

    #[test]
    fn ring_drains_in_batches() {
        let mut ring = LogRing::new(10);
        for i in 0..4 {
            ring.push(line(&i.to_string()));
        }
        assert_eq!(ring.drain(3).len(), 3);
        let rest = ring.drain(3);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].message, "3");
    }

    #[test]
    fn capture_logger_records_enabled_lines() {
        let inner = env_logger::Builder::new()
            .filter_module("orrery", log::LevelFilter::Info)
            .is_test(true)
            .build();
        let logger = CaptureLogger::new(inner, 8);

        logger.log(
            &log::Record::builder()
                .args(format_args!("spawned entity 1v0"))
                .level(log::Level::Info)
                .target("orrery::stage")
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .args(format_args!("too chatty"))
                .level(log::Level::Debug)
                .target("orrery::stage")
                .build(),
        );

        let captured = logger.drain(10);
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].level, "INFO");
        assert_eq!(captured[0].target, "orrery::stage");
        assert_eq!(captured[0].message, "spawned entity 1v0");
        assert!(logger.drain(10).is_empty());
    }
}

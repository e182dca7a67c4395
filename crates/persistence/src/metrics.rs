//! Store metrics collection.
//!
//! Query durations are labelled by backend so the in-memory adapter and
//! the PostgreSQL adapter report into the same histogram.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

pub const BACKEND_POSTGRES: &str = "postgres";
pub const BACKEND_MEMORY: &str = "memory";

/// Record a store operation's duration.
pub fn record_query_duration(backend: &'static str, query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "backend" => backend,
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Count a failed store operation by error kind.
pub fn record_store_error(backend: &'static str, kind: &'static str) {
    counter!("store_errors_total", "backend" => backend, "kind" => kind).increment(1);
}

/// Record database connection pool metrics.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
}

/// Records pool gauges every `every` until the pool is closed.
pub fn spawn_pool_metrics(pool: PgPool, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }
            record_pool_metrics(&pool);
        }
        debug!("Pool metrics stopped");
    })
}

/// Times one store operation.
///
/// ```ignore
/// let timer = QueryTimer::postgres("list_registrations_by_quiz");
/// let result = sqlx::query_as::<_, RegistrationEntity>(...).fetch_all(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    backend: &'static str,
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn postgres(query_name: &'static str) -> Self {
        Self::new(BACKEND_POSTGRES, query_name)
    }

    pub fn memory(query_name: &'static str) -> Self {
        Self::new(BACKEND_MEMORY, query_name)
    }

    fn new(backend: &'static str, query_name: &'static str) -> Self {
        Self {
            backend,
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        record_query_duration(
            self.backend,
            self.query_name,
            self.start.elapsed().as_secs_f64(),
        );
    }
}

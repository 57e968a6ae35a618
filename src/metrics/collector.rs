//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the match coordination
//! service using Prometheus metrics.

use crate::registry::RegistryStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the match coordination service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Match lifecycle metrics
    match_metrics: MatchMetrics,

    /// Connection and room metrics
    connection_metrics: ConnectionMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Match lifecycle metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Total matches created
    pub matches_created_total: IntCounter,

    /// Total matches started
    pub matches_started_total: IntCounter,

    /// Total matches completed, by outcome
    pub matches_completed_total: IntCounterVec,

    /// Total matches cancelled
    pub matches_cancelled_total: IntCounter,

    /// Distribution of submitted solve times
    pub solve_time_seconds: Histogram,
}

/// Connection and room metrics
#[derive(Clone)]
pub struct ConnectionMetrics {
    /// Currently live connections
    pub active_connections: IntGauge,

    /// Currently occupied rooms
    pub active_rooms: IntGauge,

    /// Connections registered since startup
    pub connections_registered: IntGauge,

    /// Connections superseded by a newer one since startup
    pub connections_superseded: IntGauge,

    /// Events delivered to destinations since startup
    pub events_delivered: IntGauge,

    /// Events dropped (timeout, closed writer, absent user) since startup
    pub events_dropped: IntGauge,

    /// Inbound client events by type
    pub client_events_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Result submission processing time
    pub submission_processing_duration: Histogram,

    /// Rating calculation time
    pub rating_calculation_duration: Histogram,

    /// Gateway operation durations
    pub gateway_operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let connection_metrics = ConnectionMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            match_metrics,
            connection_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get match metrics
    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    /// Get connection metrics
    pub fn connections(&self) -> &ConnectionMetrics {
        &self.connection_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a match being created
    pub fn record_match_created(&self) {
        self.match_metrics.matches_created_total.inc();
    }

    /// Record a match entering play
    pub fn record_match_started(&self) {
        self.match_metrics.matches_started_total.inc();
    }

    /// Record a match completing
    pub fn record_match_completed(&self, is_draw: bool) {
        let outcome = if is_draw { "draw" } else { "win" };
        self.match_metrics
            .matches_completed_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a match being cancelled
    pub fn record_match_cancelled(&self) {
        self.match_metrics.matches_cancelled_total.inc();
    }

    /// Record one submitted solve time
    pub fn record_solve_time(&self, solve_time_ms: i64) {
        self.match_metrics
            .solve_time_seconds
            .observe(solve_time_ms as f64 / 1000.0);
    }

    /// Record result submission processing duration
    pub fn record_submission(&self, duration: Duration) {
        self.performance_metrics
            .submission_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Record rating calculation duration
    pub fn record_rating_calculation(&self, duration: Duration) {
        self.performance_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record an inbound client event
    pub fn record_client_event(&self, kind: &str) {
        self.connection_metrics
            .client_events_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record gateway operation duration
    pub fn record_gateway_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .gateway_operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Update service uptime
    pub fn update_uptime(&self, seconds: i64) {
        self.service_metrics.uptime_seconds.set(seconds);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Update live connection and room gauges
    pub fn update_connection_gauges(&self, active_connections: usize, active_rooms: usize) {
        self.connection_metrics
            .active_connections
            .set(active_connections as i64);
        self.connection_metrics
            .active_rooms
            .set(active_rooms as i64);
    }

    /// Mirror cumulative registry totals into gauges
    pub fn update_from_registry_stats(&self, stats: &RegistryStats) {
        self.connection_metrics
            .connections_registered
            .set(stats.total_registered as i64);
        self.connection_metrics
            .connections_superseded
            .set(stats.total_superseded as i64);
        self.connection_metrics
            .events_delivered
            .set(stats.events_delivered as i64);
        self.connection_metrics
            .events_dropped
            .set(stats.events_dropped as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("cube_arena_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "cube_arena_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("cube_arena_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_created_total =
            IntCounter::new("cube_arena_matches_created_total", "Total matches created")?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let matches_started_total =
            IntCounter::new("cube_arena_matches_started_total", "Total matches started")?;
        registry.register(Box::new(matches_started_total.clone()))?;

        let matches_completed_total = IntCounterVec::new(
            Opts::new(
                "cube_arena_matches_completed_total",
                "Total matches completed",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(matches_completed_total.clone()))?;

        let matches_cancelled_total = IntCounter::new(
            "cube_arena_matches_cancelled_total",
            "Total matches cancelled",
        )?;
        registry.register(Box::new(matches_cancelled_total.clone()))?;

        let solve_time_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "cube_arena_solve_time_seconds",
                "Distribution of submitted solve times",
            )
            .buckets(vec![5.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(solve_time_seconds.clone()))?;

        Ok(Self {
            matches_created_total,
            matches_started_total,
            matches_completed_total,
            matches_cancelled_total,
            solve_time_seconds,
        })
    }
}

impl ConnectionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_connections = IntGauge::new(
            "cube_arena_active_connections",
            "Currently live connections",
        )?;
        registry.register(Box::new(active_connections.clone()))?;

        let active_rooms =
            IntGauge::new("cube_arena_active_rooms", "Currently occupied rooms")?;
        registry.register(Box::new(active_rooms.clone()))?;

        let connections_registered = IntGauge::new(
            "cube_arena_connections_registered",
            "Connections registered since startup",
        )?;
        registry.register(Box::new(connections_registered.clone()))?;

        let connections_superseded = IntGauge::new(
            "cube_arena_connections_superseded",
            "Connections superseded by a newer one since startup",
        )?;
        registry.register(Box::new(connections_superseded.clone()))?;

        let events_delivered = IntGauge::new(
            "cube_arena_events_delivered",
            "Events delivered to destinations since startup",
        )?;
        registry.register(Box::new(events_delivered.clone()))?;

        let events_dropped = IntGauge::new(
            "cube_arena_events_dropped",
            "Events dropped since startup",
        )?;
        registry.register(Box::new(events_dropped.clone()))?;

        let client_events_total = IntCounterVec::new(
            Opts::new(
                "cube_arena_client_events_total",
                "Inbound client events by type",
            ),
            &["type"],
        )?;
        registry.register(Box::new(client_events_total.clone()))?;

        Ok(Self {
            active_connections,
            active_rooms,
            connections_registered,
            connections_superseded,
            events_delivered,
            events_dropped,
            client_events_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let submission_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cube_arena_submission_processing_duration_seconds",
                "Result submission processing time",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(submission_processing_duration.clone()))?;

        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cube_arena_rating_calculation_duration_seconds",
                "Rating calculation time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        let gateway_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "cube_arena_gateway_operation_duration_seconds",
                "Gateway operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(gateway_operation_duration.clone()))?;

        Ok(Self {
            submission_processing_duration,
            rating_calculation_duration,
            gateway_operation_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        // Test that we can access all metric groups
        let _service = collector.service();
        let _matches = collector.matches();
        let _connections = collector.connections();
        let _performance = collector.performance();
    }

    #[test]
    fn test_match_lifecycle_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_match_created();
        collector.record_match_started();
        collector.record_match_completed(false);
        collector.record_match_completed(true);
        collector.record_match_cancelled();
        collector.record_solve_time(12_340);

        assert_eq!(collector.matches().matches_created_total.get(), 1);
        assert_eq!(
            collector
                .matches()
                .matches_completed_total
                .with_label_values(&["draw"])
                .get(),
            1
        );
    }

    #[test]
    fn test_registry_stats_mirroring() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let stats = RegistryStats {
            total_registered: 10,
            total_superseded: 2,
            events_delivered: 50,
            events_dropped: 3,
        };
        collector.update_from_registry_stats(&stats);

        assert_eq!(collector.connections().connections_registered.get(), 10);
        assert_eq!(collector.connections().events_dropped.get(), 3);
    }

    #[test]
    fn test_gauges_and_health() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.update_connection_gauges(5, 2);
        assert_eq!(collector.connections().active_connections.get(), 5);
        assert_eq!(collector.connections().active_rooms.get(), 2);

        collector.update_health_status(2);
        collector.update_component_health("match_controller", true);
        collector.update_component_health("storage", false);
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}

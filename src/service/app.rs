//! Main application state and service coordination
//!
//! This module contains the production AppState that wires together the
//! gateway, match controller, connection registry and background tasks.

use crate::auth::{Authenticator, JwtAuthenticator};
use crate::config::AppConfig;
use crate::gateway::{build_router, GatewayState};
use crate::matches::{InMemoryMatchStorage, MatchController, MatchStorage};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::rating::EloCalculator;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomMultiplexer;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Gateway server error: {message}")]
    GatewayServer { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Match persistence
    storage: Arc<dyn MatchStorage>,

    /// Live WebSocket connections
    registry: Arc<ConnectionRegistry>,

    /// Per-match rooms layered over the registry
    rooms: Arc<RoomMultiplexer>,

    /// Match lifecycle coordination
    controller: MatchController,

    /// Bearer token verification
    authenticator: Arc<dyn Authenticator>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Shutdown signal for the gateway server
    gateway_shutdown: broadcast::Sender<()>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    /// When the service was initialized
    started_at: std::time::Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing cube-arena match service");
        info!(
            "Configuration: service={}, listen={}:{}",
            config.service.name, config.server.host, config.server.port
        );

        // Initialize metrics service
        let metrics_service = Self::initialize_metrics(&config).await?;

        // Initialize core components
        let storage: Arc<dyn MatchStorage> = Arc::new(InMemoryMatchStorage::new());
        let registry = Arc::new(ConnectionRegistry::new(config.send_timeout()));
        let rooms = Arc::new(RoomMultiplexer::new(registry.clone()));

        let calculator = Arc::new(EloCalculator::new(config.rating.clone()).map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to initialize rating calculator: {}", e),
            }
        })?);

        let controller = MatchController::with_metrics(
            storage.clone(),
            calculator,
            rooms.clone(),
            config.matchplay.clone(),
            metrics_service.collector(),
        );

        let authenticator: Arc<dyn Authenticator> =
            Arc::new(JwtAuthenticator::new(&config.auth.token_secret));

        let (gateway_shutdown, _) = broadcast::channel(1);

        Ok(Self {
            config,
            storage,
            registry,
            rooms,
            controller,
            authenticator,
            metrics_service,
            background_tasks: Mutex::new(Vec::new()),
            gateway_shutdown,
            is_running: Arc::new(RwLock::new(false)),
            started_at: std::time::Instant::now(),
        })
    }

    /// Start all background services and the gateway server
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting cube-arena match service");

        // Mark as running
        *self.is_running.write().await = true;

        // Start metrics service first
        self.start_metrics_service().await?;

        // Start the gateway server
        self.start_gateway_server().await?;

        // Start background tasks
        self.start_background_tasks().await?;

        info!("✅ Cube-arena match service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of cube-arena service");

        // Mark as not running
        *self.is_running.write().await = false;

        // Stop the gateway server
        if let Err(e) = self.gateway_shutdown.send(()) {
            warn!("Failed to send shutdown signal to gateway: {}", e);
        } else {
            info!("✅ Gateway shutdown signal sent");
        }

        // Stop background tasks (including the gateway and metrics tasks)
        self.stop_background_tasks().await;

        // Stop metrics service
        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        // Log final statistics
        let controller_stats = self.controller.get_stats();
        let registry_stats = self.registry.get_stats();
        info!(
            "Final service statistics: {:?}, {:?}",
            controller_stats, registry_stats
        );
        info!("✅ Cube-arena service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the match controller for operations
    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    /// Get the connection registry
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Get the room multiplexer
    pub fn rooms(&self) -> Arc<RoomMultiplexer> {
        self.rooms.clone()
    }

    /// Get match storage
    pub fn storage(&self) -> Arc<dyn MatchStorage> {
        self.storage.clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Time since the service was initialized
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Initialize metrics service
    async fn initialize_metrics(config: &AppConfig) -> Result<Arc<MetricsService>, ServiceError> {
        info!(
            "Initializing metrics service on port {}",
            config.service.health_port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        let health_server = Arc::new(HealthServer::new(health_config, metrics_collector.clone()));
        let metrics_service = Arc::new(MetricsService::new(metrics_collector, health_server));

        Ok(metrics_service)
    }

    /// Start metrics service
    async fn start_metrics_service(&self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        // Spawn the metrics service as a background task
        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        self.background_tasks.lock().await.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Bind the gateway listener and serve it in the background
    async fn start_gateway_server(&self) -> Result<(), ServiceError> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| ServiceError::Configuration {
                message: format!("Invalid gateway address: {}", e),
            })?;

        let gateway_state = Arc::new(GatewayState {
            controller: self.controller.clone(),
            authenticator: self.authenticator.clone(),
            storage: self.storage.clone(),
            rooms: self.rooms.clone(),
            metrics_collector: self.metrics_service.collector(),
            heartbeat_interval: self.config.heartbeat_interval(),
        });
        let app = build_router(gateway_state);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::GatewayServer {
                message: format!("Failed to bind {}: {}", addr, e),
            })?;

        info!("Gateway listening on http://{}", addr);

        let mut shutdown_rx = self.gateway_shutdown.subscribe();
        let gateway_handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Gateway shutdown signal received");
            });

            if let Err(e) = serve.await {
                error!("Gateway server failed: {}", e);
            } else {
                info!("Gateway server stopped");
            }
        });

        self.background_tasks.lock().await.push(gateway_handle);

        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&self) -> Result<(), ServiceError> {
        info!("Starting background maintenance tasks...");

        // Metrics update task
        info!(
            "Starting connection metrics task ({}s interval)...",
            self.config.metrics_interval().as_secs()
        );
        let metrics_task = {
            let registry = self.registry.clone();
            let rooms = self.rooms.clone();
            let metrics_collector = self.metrics_service.collector();
            let metrics_interval = self.config.metrics_interval();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(metrics_interval);
                info!("Connection metrics task started");

                while *is_running.read().await {
                    interval.tick().await;

                    let connections = registry.connection_count();
                    let active_rooms = rooms.room_count();
                    debug!(
                        "Updating metrics - connections: {}, rooms: {}",
                        connections, active_rooms
                    );
                    metrics_collector.update_connection_gauges(connections, active_rooms);
                    metrics_collector.update_from_registry_stats(&registry.get_stats());
                }

                info!("Connection metrics task stopped");
            })
        };

        // Lock prune task
        info!(
            "Starting lock prune task ({}s interval)...",
            self.config.lock_prune_interval().as_secs()
        );
        let prune_task = {
            let controller = self.controller.clone();
            let rooms = self.rooms.clone();
            let prune_interval = self.config.lock_prune_interval();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(prune_interval);
                info!("Lock prune task started");

                while *is_running.read().await {
                    interval.tick().await;

                    controller.prune_locks();
                    rooms.prune_locks();
                    debug!("Pruned unused per-key locks");
                }

                info!("Lock prune task stopped");
            })
        };

        // Service health metrics task
        info!("Starting health metrics task (60s interval)...");
        let health_metrics_task = {
            let metrics_collector = self.metrics_service.collector();
            let is_running = self.is_running.clone();
            let started_at = self.started_at;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                info!("Health metrics task started");

                while *is_running.read().await {
                    interval.tick().await;

                    let uptime_seconds = started_at.elapsed().as_secs() as i64;
                    metrics_collector.update_uptime(uptime_seconds);

                    debug!(
                        "Updated service health metrics - uptime: {}s",
                        uptime_seconds
                    );

                    // Update health status (assume healthy for now)
                    metrics_collector.update_health_status(2); // 2 = healthy

                    // Update component health
                    metrics_collector.update_component_health("storage", true);
                    metrics_collector.update_component_health("connection_registry", true);
                    metrics_collector.update_component_health("match_controller", true);
                }

                info!("Health metrics task stopped");
            })
        };

        let mut tasks = self.background_tasks.lock().await;
        tasks.push(metrics_task);
        tasks.push(prune_task);
        tasks.push(health_metrics_task);

        info!("3 background maintenance tasks started successfully");
        Ok(())
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&self) {
        let mut tasks = self.background_tasks.lock().await;
        let task_count = tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        // Cancel all background tasks
        for (i, task) in tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        // Give tasks time to clean up gracefully
        info!("Waiting for background tasks to complete shutdown...");
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        info!("✅ All {} background tasks stopped", task_count);
    }
}

use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Counters describing request behaviour across every session sharing the manager
#[derive(Debug, Default)]
pub struct RequestMetrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    /// Number of currently held client guards
    pub active_requests: AtomicUsize,
    /// Peak concurrent guards observed
    pub peak_concurrent: AtomicUsize,
}

impl RequestMetrics {
    /// Get a formatted summary of metrics
    pub fn summary(&self) -> String {
        let total = self.total_requests.load(Ordering::Relaxed);
        let success = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let active = self.active_requests.load(Ordering::Relaxed);
        let peak = self.peak_concurrent.load(Ordering::Relaxed);

        format!(
            "Requests - Total: {total}, Success: {success}, Failed: {failed}, Active: {active}, Peak: {peak}"
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReqManagerError {
    #[error("Invalid request manager configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Request manager closed")]
    Closed,
}

/// Shared HTTP client with a cap on concurrent in-flight requests.
///
/// Synthesis fires one request per sentence as soon as the sentence is complete, and
/// tool calls or completions may overlap with them. All of them draw from one pooled
/// client; the semaphore bounds how many run at once.
///
/// # Example
/// ```rust,no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// use voxbridge::utils::req_manager::ReqManager;
///
/// let manager = ReqManager::new(10)?;
/// let guard = manager.acquire().await?;
/// let response = guard.client().get("https://api.example.com/data").send().await?;
/// guard.record(response.status().is_success());
/// # Ok(())
/// # }
/// ```
pub struct ReqManager {
    max_concurrent_requests: usize,
    client: Arc<Client>,
    semaphore: Arc<Semaphore>,
    metrics: Arc<RequestMetrics>,
}

/// Holds one concurrency permit; released on drop
pub struct ClientGuard<'a> {
    manager: &'a ReqManager,
    client: Arc<Client>,
    _permit: SemaphorePermit<'a>,
}

impl<'a> ClientGuard<'a> {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Record the outcome of the request made with this guard
    pub fn record(&self, success: bool) {
        let metrics = &self.manager.metrics;
        metrics.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            metrics.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            metrics.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<'a> Drop for ClientGuard<'a> {
    fn drop(&mut self) {
        self.manager
            .metrics
            .active_requests
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Configuration for the HTTP request manager
#[derive(Debug, Clone)]
pub struct ReqManagerConfig {
    pub max_concurrent_requests: usize,
    /// Keep-alive interval for HTTP/2 connections
    pub http2_keep_alive_interval: Duration,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    pub tcp_keepalive: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ReqManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            http2_keep_alive_interval: Duration::from_secs(3),
            pool_max_idle_per_host: 64,
            tcp_keepalive: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ReqManager {
    /// Create a new request manager with the specified maximum concurrent requests
    pub fn new(max_concurrent_requests: usize) -> Result<Self, ReqManagerError> {
        let config = ReqManagerConfig {
            max_concurrent_requests,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: ReqManagerConfig) -> Result<Self, ReqManagerError> {
        if config.max_concurrent_requests == 0 {
            return Err(ReqManagerError::InvalidConfig(
                "max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if config.max_concurrent_requests > 1000 {
            return Err(ReqManagerError::InvalidConfig(
                "max_concurrent_requests must not exceed 1000".to_string(),
            ));
        }

        let client = Arc::new(Self::create_client(&config)?);

        Ok(Self {
            max_concurrent_requests: config.max_concurrent_requests,
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    fn create_client(config: &ReqManagerConfig) -> Result<Client, reqwest::Error> {
        Client::builder()
            .http2_keep_alive_interval(Some(config.http2_keep_alive_interval))
            .http2_keep_alive_while_idle(true)
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive)
            .tcp_nodelay(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("voxbridge/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    /// Wait for a free permit and hand out the shared client.
    pub async fn acquire(&self) -> Result<ClientGuard<'_>, ReqManagerError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ReqManagerError::Closed)?;

        let active = self.metrics.active_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_concurrent
            .fetch_max(active, Ordering::Relaxed);

        Ok(ClientGuard {
            manager: self,
            client: Arc::clone(&self.client),
            _permit: permit,
        })
    }

    pub fn available_count(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn active_requests(&self) -> usize {
        self.metrics.active_requests.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }
}

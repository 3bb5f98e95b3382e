//! Client configuration types and builders.

use std::net::SocketAddr;
use std::time::Duration;

/// Default cluster name.
const DEFAULT_CLUSTER_NAME: &str = "dev";
/// Default member port.
const DEFAULT_PORT: u16 = 5701;
/// Default connection timeout.
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
/// Default heartbeat interval.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// Default heartbeat timeout.
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default fragmentation threshold.
const DEFAULT_MAX_FRAME_SIZE: usize = hazelcast_core::protocol::DEFAULT_MAX_FRAME_SIZE;
/// Smallest accepted fragmentation threshold.
const MIN_MAX_FRAME_SIZE: usize = 1024;
/// Default initial reconnect backoff.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
/// Default maximum reconnect backoff.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Default reconnect backoff multiplier.
const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
/// Default time to keep trying to reach the cluster.
const DEFAULT_CLUSTER_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
/// Default overall invocation deadline.
const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default first pause between invocation attempts.
const DEFAULT_INVOCATION_RETRY_PAUSE: Duration = Duration::from_millis(100);
/// Default cap on the pause between invocation attempts.
const DEFAULT_INVOCATION_MAX_RETRY_PAUSE: Duration = Duration::from_secs(2);
/// Default capacity of the event dispatch queue.
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 100_000;

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for hazelcast_core::HazelcastError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.message)
    }
}

/// What the client does after losing its last cluster connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectMode {
    /// Shut the client down.
    Off,
    /// Reconnect in the background; invocations wait for the new connection.
    #[default]
    On,
    /// Reconnect in the background; invocations fail fast while disconnected.
    Async,
}

/// Network configuration for cluster connections.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    addresses: Vec<SocketAddr>,
    smart_routing: bool,
    connection_timeout: Duration,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    redo_operation: bool,
    max_frame_size: usize,
    reconnect_mode: ReconnectMode,
}

impl NetworkConfig {
    /// Returns the configured cluster member addresses.
    pub fn addresses(&self) -> &[SocketAddr] {
        &self.addresses
    }

    /// Returns `true` if the client connects to every member and routes
    /// operations to partition owners; `false` for a single connection.
    pub fn smart_routing(&self) -> bool {
        self.smart_routing
    }

    /// Returns the connection timeout.
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the idle time after which a ping is sent.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Returns the silence after which a connection is considered dead.
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Returns `true` if operations that may already have run are re-sent
    /// after a connection loss.
    pub fn redo_operation(&self) -> bool {
        self.redo_operation
    }

    /// Returns the size above which outgoing messages are fragmented.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Returns the reconnect mode.
    pub fn reconnect_mode(&self) -> ReconnectMode {
        self.reconnect_mode
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            addresses: vec![default_address()],
            smart_routing: true,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            redo_operation: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            reconnect_mode: ReconnectMode::default(),
        }
    }
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
}

/// Builder for `NetworkConfig`.
#[derive(Debug, Clone, Default)]
pub struct NetworkConfigBuilder {
    addresses: Vec<SocketAddr>,
    smart_routing: Option<bool>,
    connection_timeout: Option<Duration>,
    heartbeat_interval: Option<Duration>,
    heartbeat_timeout: Option<Duration>,
    redo_operation: Option<bool>,
    max_frame_size: Option<usize>,
    reconnect_mode: Option<ReconnectMode>,
}

impl NetworkConfigBuilder {
    /// Creates a new network configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cluster member address.
    pub fn add_address(mut self, address: SocketAddr) -> Self {
        self.addresses.push(address);
        self
    }

    /// Replaces the cluster member addresses.
    pub fn addresses(mut self, addresses: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.addresses = addresses.into_iter().collect();
        self
    }

    /// Enables or disables smart routing.
    pub fn smart_routing(mut self, enabled: bool) -> Self {
        self.smart_routing = Some(enabled);
        self
    }

    /// Sets the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Sets the heartbeat interval.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Sets the heartbeat timeout.
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    /// Enables re-sending operations that may already have executed.
    pub fn redo_operation(mut self, enabled: bool) -> Self {
        self.redo_operation = Some(enabled);
        self
    }

    /// Sets the fragmentation threshold.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = Some(size);
        self
    }

    /// Sets the reconnect mode.
    pub fn reconnect_mode(mut self, mode: ReconnectMode) -> Self {
        self.reconnect_mode = Some(mode);
        self
    }

    /// Builds the network configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `heartbeat_interval` is zero or not below `heartbeat_timeout`
    /// - `max_frame_size` is below 1 KiB
    /// - `connection_timeout` is zero
    pub fn build(self) -> Result<NetworkConfig, ConfigError> {
        let defaults = NetworkConfig::default();
        let addresses = if self.addresses.is_empty() {
            defaults.addresses
        } else {
            self.addresses
        };
        let heartbeat_interval = self.heartbeat_interval.unwrap_or(defaults.heartbeat_interval);
        let heartbeat_timeout = self.heartbeat_timeout.unwrap_or(defaults.heartbeat_timeout);
        let max_frame_size = self.max_frame_size.unwrap_or(defaults.max_frame_size);
        let connection_timeout = self.connection_timeout.unwrap_or(defaults.connection_timeout);

        if heartbeat_interval.is_zero() || heartbeat_interval >= heartbeat_timeout {
            return Err(ConfigError::new(
                "heartbeat_interval must be non-zero and below heartbeat_timeout",
            ));
        }

        if max_frame_size < MIN_MAX_FRAME_SIZE {
            return Err(ConfigError::new(format!(
                "max_frame_size must be at least {} bytes",
                MIN_MAX_FRAME_SIZE
            )));
        }

        if connection_timeout.is_zero() {
            return Err(ConfigError::new("connection_timeout must be non-zero"));
        }

        Ok(NetworkConfig {
            addresses,
            smart_routing: self.smart_routing.unwrap_or(defaults.smart_routing),
            connection_timeout,
            heartbeat_interval,
            heartbeat_timeout,
            redo_operation: self.redo_operation.unwrap_or(defaults.redo_operation),
            max_frame_size,
            reconnect_mode: self.reconnect_mode.unwrap_or(defaults.reconnect_mode),
        })
    }
}

/// Backoff configuration for connecting and reconnecting to the cluster.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter: f64,
    cluster_connect_timeout: Duration,
}

impl RetryConfig {
    /// Returns the initial backoff duration.
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Returns the maximum backoff duration.
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Returns the backoff multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the jitter factor in `0.0..=1.0`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Returns how long to keep trying before giving up on the cluster.
    pub fn cluster_connect_timeout(&self) -> Duration {
        self.cluster_connect_timeout
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_RETRY_MULTIPLIER,
            jitter: 0.0,
            cluster_connect_timeout: DEFAULT_CLUSTER_CONNECT_TIMEOUT,
        }
    }
}

/// Builder for `RetryConfig`.
#[derive(Debug, Clone, Default)]
pub struct RetryConfigBuilder {
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    cluster_connect_timeout: Option<Duration>,
}

impl RetryConfigBuilder {
    /// Creates a new retry configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial backoff duration.
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    /// Sets the maximum backoff duration.
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    /// Sets the backoff multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Sets the jitter factor.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Sets how long to keep trying to reach the cluster.
    pub fn cluster_connect_timeout(mut self, timeout: Duration) -> Self {
        self.cluster_connect_timeout = Some(timeout);
        self
    }

    /// Builds the retry configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `initial_backoff` exceeds `max_backoff`
    /// - `multiplier` is less than 1.0
    /// - `jitter` is outside `0.0..=1.0`
    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        let defaults = RetryConfig::default();
        let initial_backoff = self.initial_backoff.unwrap_or(defaults.initial_backoff);
        let max_backoff = self.max_backoff.unwrap_or(defaults.max_backoff);
        let multiplier = self.multiplier.unwrap_or(defaults.multiplier);
        let jitter = self.jitter.unwrap_or(defaults.jitter);

        if initial_backoff > max_backoff {
            return Err(ConfigError::new(
                "initial_backoff must not exceed max_backoff",
            ));
        }

        if multiplier < 1.0 {
            return Err(ConfigError::new("multiplier must be at least 1.0"));
        }

        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::new("jitter must be between 0.0 and 1.0"));
        }

        Ok(RetryConfig {
            initial_backoff,
            max_backoff,
            multiplier,
            jitter,
            cluster_connect_timeout: self
                .cluster_connect_timeout
                .unwrap_or(defaults.cluster_connect_timeout),
        })
    }
}

/// Invocation retry and deadline configuration.
#[derive(Debug, Clone)]
pub struct InvocationConfig {
    invocation_timeout: Duration,
    retry_pause: Duration,
    max_retry_pause: Duration,
    max_attempts: u32,
}

impl InvocationConfig {
    /// Returns the overall deadline of one invocation.
    pub fn invocation_timeout(&self) -> Duration {
        self.invocation_timeout
    }

    /// Returns the pause before the first retry.
    pub fn retry_pause(&self) -> Duration {
        self.retry_pause
    }

    /// Returns the cap on the pause between retries.
    pub fn max_retry_pause(&self) -> Duration {
        self.max_retry_pause
    }

    /// Returns the maximum number of attempts, first attempt included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
            retry_pause: DEFAULT_INVOCATION_RETRY_PAUSE,
            max_retry_pause: DEFAULT_INVOCATION_MAX_RETRY_PAUSE,
            max_attempts: u32::MAX,
        }
    }
}

/// Builder for `InvocationConfig`.
#[derive(Debug, Clone, Default)]
pub struct InvocationConfigBuilder {
    invocation_timeout: Option<Duration>,
    retry_pause: Option<Duration>,
    max_retry_pause: Option<Duration>,
    max_attempts: Option<u32>,
}

impl InvocationConfigBuilder {
    /// Creates a new invocation configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overall deadline of one invocation.
    pub fn invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }

    /// Sets the pause before the first retry.
    pub fn retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = Some(pause);
        self
    }

    /// Sets the cap on the pause between retries.
    pub fn max_retry_pause(mut self, pause: Duration) -> Self {
        self.max_retry_pause = Some(pause);
        self
    }

    /// Sets the maximum number of attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Builds the invocation configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the timeout or `max_attempts` is zero, or the
    /// first pause exceeds the pause cap.
    pub fn build(self) -> Result<InvocationConfig, ConfigError> {
        let defaults = InvocationConfig::default();
        let config = InvocationConfig {
            invocation_timeout: self.invocation_timeout.unwrap_or(defaults.invocation_timeout),
            retry_pause: self.retry_pause.unwrap_or(defaults.retry_pause),
            max_retry_pause: self.max_retry_pause.unwrap_or(defaults.max_retry_pause),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
        };

        if config.invocation_timeout.is_zero() {
            return Err(ConfigError::new("invocation_timeout must be non-zero"));
        }
        if config.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts must be at least 1"));
        }
        if config.retry_pause > config.max_retry_pause {
            return Err(ConfigError::new(
                "retry_pause must not exceed max_retry_pause",
            ));
        }
        Ok(config)
    }
}

/// Security configuration for authentication.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    username: Option<String>,
    password: Option<String>,
}

impl SecurityConfig {
    /// Returns the configured username.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the configured password.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns true if username/password credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Builder for `SecurityConfig`.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfigBuilder {
    username: Option<String>,
    password: Option<String>,
}

impl SecurityConfigBuilder {
    /// Creates a new security configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets both username and password for authentication.
    pub fn credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username(username).password(password)
    }

    /// Builds the security configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one of `username` or `password` is set.
    pub fn build(self) -> Result<SecurityConfig, ConfigError> {
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::new(
                "both username and password must be provided together",
            ));
        }

        Ok(SecurityConfig {
            username: self.username,
            password: self.password,
        })
    }
}

/// Main client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    cluster_name: String,
    client_name: Option<String>,
    labels: Vec<String>,
    event_queue_capacity: usize,
    network: NetworkConfig,
    retry: RetryConfig,
    invocation: InvocationConfig,
    security: SecurityConfig,
}

impl ClientConfig {
    /// Creates a new client configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the cluster name.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Returns the configured client name, if any.
    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    /// Returns the client labels sent during authentication.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the capacity of the event dispatch queue.
    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity
    }

    /// Returns the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Returns the connection retry configuration.
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Returns the invocation configuration.
    pub fn invocation(&self) -> &InvocationConfig {
        &self.invocation
    }

    /// Returns the security configuration.
    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            client_name: None,
            labels: Vec::new(),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            network: NetworkConfig::default(),
            retry: RetryConfig::default(),
            invocation: InvocationConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    cluster_name: Option<String>,
    client_name: Option<String>,
    labels: Vec<String>,
    event_queue_capacity: Option<usize>,
    network: NetworkConfigBuilder,
    retry: RetryConfigBuilder,
    invocation: InvocationConfigBuilder,
    security: SecurityConfigBuilder,
}

impl ClientConfigBuilder {
    /// Creates a new client configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cluster name.
    pub fn cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    /// Sets the client instance name.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Adds a client label.
    pub fn add_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Sets the capacity of the event dispatch queue.
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = Some(capacity);
        self
    }

    /// Configures network settings using a builder function.
    pub fn network<F>(mut self, f: F) -> Self
    where
        F: FnOnce(NetworkConfigBuilder) -> NetworkConfigBuilder,
    {
        self.network = f(self.network);
        self
    }

    /// Configures reconnect backoff settings using a builder function.
    pub fn retry<F>(mut self, f: F) -> Self
    where
        F: FnOnce(RetryConfigBuilder) -> RetryConfigBuilder,
    {
        self.retry = f(self.retry);
        self
    }

    /// Configures invocation settings using a builder function.
    pub fn invocation<F>(mut self, f: F) -> Self
    where
        F: FnOnce(InvocationConfigBuilder) -> InvocationConfigBuilder,
    {
        self.invocation = f(self.invocation);
        self
    }

    /// Configures security settings using a builder function.
    pub fn security<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SecurityConfigBuilder) -> SecurityConfigBuilder,
    {
        self.security = f(self.security);
        self
    }

    /// Adds a cluster member address.
    pub fn add_address(mut self, address: SocketAddr) -> Self {
        self.network = self.network.add_address(address);
        self
    }

    /// Sets the cluster member addresses.
    pub fn addresses(mut self, addresses: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.network = self.network.addresses(addresses);
        self
    }

    /// Enables or disables smart routing.
    pub fn smart_routing(mut self, enabled: bool) -> Self {
        self.network = self.network.smart_routing(enabled);
        self
    }

    /// Sets credentials for authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.security = self.security.credentials(username, password);
        self
    }

    /// Builds the client configuration, returning an error if validation fails.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let cluster_name = self
            .cluster_name
            .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());

        if cluster_name.is_empty() {
            return Err(ConfigError::new("cluster_name must not be empty"));
        }

        let event_queue_capacity = self
            .event_queue_capacity
            .unwrap_or(DEFAULT_EVENT_QUEUE_CAPACITY);
        if event_queue_capacity == 0 {
            return Err(ConfigError::new("event_queue_capacity must be at least 1"));
        }

        Ok(ClientConfig {
            cluster_name,
            client_name: self.client_name,
            labels: self.labels,
            event_queue_capacity,
            network: self.network.build()?,
            retry: self.retry.build()?,
            invocation: self.invocation.build()?,
            security: self.security.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_config() {
        let config = ClientConfig::default();
        assert_eq!(config.cluster_name(), "dev");
        assert_eq!(config.network().addresses().len(), 1);
        assert_eq!(
            config.network().addresses()[0],
            "127.0.0.1:5701".parse::<SocketAddr>().unwrap()
        );
        assert!(config.network().smart_routing());
        assert_eq!(config.event_queue_capacity(), 100_000);
    }

    #[test]
    fn test_builder_matches_defaults() {
        let built = ClientConfig::builder().build().unwrap();
        let default = ClientConfig::default();
        assert_eq!(built.cluster_name(), default.cluster_name());
        assert_eq!(built.network().addresses(), default.network().addresses());
        assert_eq!(
            built.invocation().invocation_timeout(),
            Duration::from_secs(120)
        );
        assert_eq!(built.invocation().max_attempts(), u32::MAX);
        assert_eq!(built.network().max_frame_size(), 64 * 1024);
    }

    #[test]
    fn test_builder_empty_cluster_name_fails() {
        let result = ClientConfig::builder().cluster_name("").build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cluster_name must not be empty"));
    }

    #[test]
    fn test_builder_addresses_replaces() {
        let addr1: SocketAddr = "192.168.1.1:5701".parse().unwrap();
        let addr2: SocketAddr = "192.168.1.2:5701".parse().unwrap();

        let config = ClientConfig::builder()
            .add_address(addr1)
            .addresses([addr2])
            .build()
            .unwrap();

        assert_eq!(config.network().addresses(), &[addr2]);
    }

    #[test]
    fn test_unisocket_and_redo() {
        let config = ClientConfig::builder()
            .network(|n| n.smart_routing(false).redo_operation(true))
            .build()
            .unwrap();
        assert!(!config.network().smart_routing());
        assert!(config.network().redo_operation());
    }

    #[test]
    fn test_heartbeat_interval_must_be_below_timeout() {
        let result = ClientConfig::builder()
            .network(|n| {
                n.heartbeat_interval(Duration::from_secs(10))
                    .heartbeat_timeout(Duration::from_secs(10))
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_max_frame_size_minimum() {
        let result = NetworkConfigBuilder::new().max_frame_size(512).build();
        assert!(result.is_err());
        assert!(NetworkConfigBuilder::new().max_frame_size(1024).build().is_ok());
    }

    #[test]
    fn test_security_partial_credentials_fails() {
        let result = SecurityConfigBuilder::new().username("admin").build();
        assert!(result.is_err());

        let config = ClientConfig::builder()
            .credentials("admin", "secret")
            .build()
            .unwrap();
        assert!(config.security().has_credentials());
    }

    #[test]
    fn test_retry_config_validation() {
        assert!(RetryConfigBuilder::new()
            .initial_backoff(Duration::from_secs(5))
            .max_backoff(Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryConfigBuilder::new().multiplier(0.5).build().is_err());
        assert!(RetryConfigBuilder::new().jitter(1.5).build().is_err());

        let config = RetryConfigBuilder::new().jitter(0.2).build().unwrap();
        assert_eq!(config.jitter(), 0.2);
        assert_eq!(config.cluster_connect_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_invocation_config_validation() {
        assert!(InvocationConfigBuilder::new().max_attempts(0).build().is_err());
        assert!(InvocationConfigBuilder::new()
            .invocation_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(InvocationConfigBuilder::new()
            .retry_pause(Duration::from_secs(3))
            .build()
            .is_err());

        let config = InvocationConfigBuilder::new()
            .max_attempts(3)
            .invocation_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(config.max_attempts(), 3);
    }

    #[test]
    fn test_config_error_converts_to_hazelcast_error() {
        let err: hazelcast_core::HazelcastError = ConfigError::new("bad").into();
        assert!(matches!(
            err,
            hazelcast_core::HazelcastError::Configuration(_)
        ));
    }

    #[test]
    fn test_client_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientConfig>();
        assert_send_sync::<ConfigError>();
    }
}

use std::fmt;
use std::time::Duration;

use airsim_proto::connection::DEFAULT_TIMEOUT;
use airsim_proto::{Connection, Result, SimError};
use tracing::{info, warn};

use crate::api::{SimApi, SystemApi, VehicleApi};

/// Version this client reports, kept in sync with the Python client.
pub const CLIENT_VERSION: i64 = 1;

/// Oldest server version this client can talk to.
pub const MIN_REQUIRED_SERVER_VERSION: i64 = 1;

/// The main handle to an AirSim car simulator.
///
/// # Example
/// ```no_run
/// # async fn example() -> airsim_rs::Result<()> {
/// use airsim_rs::{CarClient, CarControls};
///
/// let client = CarClient::new("127.0.0.1", CarClient::DEFAULT_PORT).connect().await?;
/// client.confirm_connection().await?;
/// client.vehicle().enable_api_control(true).await?;
/// client.vehicle().set_car_controls(&CarControls::new(0.5, 0.0)).await?;
/// client.sim().pause(true).await?;
/// client.sim().continue_for_ticks(60).await?;
/// client.sim().pause(false).await?;
/// # Ok(())
/// # }
/// ```
pub struct CarClient {
    host: String,
    port: u16,
    timeout: Duration,
    connection: Option<Connection>,
}

impl CarClient {
    /// The port AirSim's RPC server listens on unless configured otherwise.
    pub const DEFAULT_PORT: u16 = 41451;

    /// Create a new client handle targeting the given host and port.
    /// Does not connect immediately; call [`connect()`](Self::connect) to establish a connection.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
            connection: None,
        }
    }

    /// Set how long a single call may wait for its response.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open the TCP connection to the simulator.
    pub async fn connect(mut self) -> Result<Self> {
        let conn = Connection::open(&self.host, self.port, self.timeout).await?;
        self.connection = Some(conn);
        Ok(self)
    }

    /// Returns the underlying connection, or an error if not connected.
    pub(crate) fn conn(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| SimError::Disconnected("Not connected to AirSim".into()))
    }

    /// Call a remote method over the connection.
    pub(crate) async fn call(&self, method: &str, params: Vec<rmpv::Value>) -> Result<rmpv::Value> {
        self.conn()?.call(method, params).await
    }

    /// Check the server answers and compare versions in both directions.
    ///
    /// A version mismatch is logged, not returned as an error; calls may
    /// still work against a slightly older or newer server.
    pub async fn confirm_connection(&self) -> Result<VersionInfo> {
        if !self.system().ping().await? {
            warn!("Ping returned false");
        }
        info!("Connected to AirSim at {}:{}", self.host, self.port);

        let info = VersionInfo {
            client_version: CLIENT_VERSION,
            min_required_server_version: MIN_REQUIRED_SERVER_VERSION,
            server_version: self.system().get_server_version().await?,
            min_required_client_version: self.system().get_min_required_client_version().await?,
        };

        if info.server_version < info.min_required_server_version {
            warn!("{info}: AirSim server is of older version and not supported by this client. Please upgrade!");
        } else if info.client_version < info.min_required_client_version {
            warn!("{info}: AirSim client is of older version and not supported by this server. Please upgrade!");
        }
        Ok(info)
    }

    /// Returns the host address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Drop the connection to the simulator.
    pub fn disconnect(&mut self) {
        self.connection = None;
        info!("Disconnected from AirSim");
    }

    // --- API accessors ---

    /// Access the server information API (ping, versions).
    pub fn system(&self) -> SystemApi<'_> {
        SystemApi { client: self }
    }

    /// Access the vehicle API (API control, car controls, car state).
    pub fn vehicle(&self) -> VehicleApi<'_> {
        VehicleApi { client: self }
    }

    /// Access the simulation clock API (pause, continue).
    pub fn sim(&self) -> SimApi<'_> {
        SimApi { client: self }
    }
}

/// Versions exchanged while confirming a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub client_version: i64,
    /// The oldest server this client supports.
    pub min_required_server_version: i64,
    pub server_version: i64,
    /// The oldest client the server supports.
    pub min_required_client_version: i64,
}

impl VersionInfo {
    /// Whether each side meets the other's minimum version.
    pub fn is_compatible(&self) -> bool {
        self.server_version >= self.min_required_server_version
            && self.client_version >= self.min_required_client_version
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Client Ver:{} (Min Req:{}), Server Ver:{} (Min Req:{})",
            self.client_version,
            self.min_required_client_version,
            self.server_version,
            self.min_required_server_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAirSim;

    #[tokio::test]
    async fn test_confirm_connection() {
        let mock = MockAirSim::spawn().await;
        let client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();

        let info = client.confirm_connection().await.unwrap();
        assert_eq!(info.server_version, 1);
        assert!(info.is_compatible());
        assert_eq!(
            info.to_string(),
            "Client Ver:1 (Min Req:1), Server Ver:1 (Min Req:1)"
        );
        assert_eq!(
            mock.calls(),
            vec!["ping", "getServerVersion", "getMinRequiredClientVersion"]
        );
    }

    #[tokio::test]
    async fn test_version_mismatch_is_not_fatal() {
        let mock = MockAirSim::spawn().await;
        mock.state.lock().unwrap().min_required_client_version = 3;
        let client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();

        let info = client.confirm_connection().await.unwrap();
        assert!(!info.is_compatible());
    }

    #[tokio::test]
    async fn test_not_connected() {
        let client = CarClient::new("127.0.0.1", CarClient::DEFAULT_PORT);
        assert!(!client.is_connected());
        let err = client.system().ping().await.unwrap_err();
        assert!(matches!(err, SimError::Disconnected(_)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = CarClient::new("127.0.0.1", port).connect().await;
        assert!(matches!(result, Err(SimError::Io(_))));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mock = MockAirSim::spawn().await;
        let mut client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();
        assert!(client.is_connected());
        client.disconnect();
        assert!(!client.is_connected());
        assert!(client.sim().is_paused().await.is_err());
    }
}

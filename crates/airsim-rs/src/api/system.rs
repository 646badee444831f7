use airsim_proto::types::{expect_bool, expect_i64};
use airsim_proto::Result;

use crate::client::CarClient;

/// API for querying the RPC server itself.
pub struct SystemApi<'a> {
    pub(crate) client: &'a CarClient,
}

impl SystemApi<'_> {
    /// Returns `true` if the server is alive and answering.
    pub async fn ping(&self) -> Result<bool> {
        let result = self.client.call("ping", vec![]).await?;
        expect_bool("ping", &result)
    }

    /// The server's protocol version.
    pub async fn get_server_version(&self) -> Result<i64> {
        let result = self.client.call("getServerVersion", vec![]).await?;
        expect_i64("getServerVersion", &result)
    }

    /// The oldest client version the server accepts.
    pub async fn get_min_required_client_version(&self) -> Result<i64> {
        let result = self
            .client
            .call("getMinRequiredClientVersion", vec![])
            .await?;
        expect_i64("getMinRequiredClientVersion", &result)
    }
}

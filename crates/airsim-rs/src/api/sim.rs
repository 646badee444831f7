use airsim_proto::types::expect_bool;
use airsim_proto::Result;
use tracing::debug;

use crate::client::CarClient;

/// Ticks per simulated second the server steps at.
pub const TICKS_PER_SECOND: u32 = 60;

/// API for controlling the flow of simulated time: pausing, resuming and stepping.
pub struct SimApi<'a> {
    pub(crate) client: &'a CarClient,
}

impl SimApi<'_> {
    /// Freeze (`true`) or unfreeze (`false`) simulated time for every entity.
    pub async fn pause(&self, paused: bool) -> Result<()> {
        self.client
            .call("simPause", vec![rmpv::Value::from(paused)])
            .await?;
        Ok(())
    }

    /// Whether simulated time is currently frozen.
    pub async fn is_paused(&self) -> Result<bool> {
        let result = self.client.call("simIsPaused", vec![]).await?;
        expect_bool("simIsPaused", &result)
    }

    /// Run the simulation for `seconds` of simulated time, then pause again.
    ///
    /// Returns once the server has accepted the request, not when the time has elapsed.
    pub async fn continue_for_time(&self, seconds: f64) -> Result<()> {
        self.client
            .call("simContinueForTime", vec![rmpv::Value::from(seconds)])
            .await?;
        Ok(())
    }

    /// Run the simulation for exactly `ticks` steps, then pause again.
    ///
    /// Returns once the server has accepted the request, not when the ticks have run.
    pub async fn continue_for_ticks(&self, ticks: u32) -> Result<()> {
        debug!(
            "Continuing for {ticks} ticks (~{:.1}s simulated)",
            f64::from(ticks) / f64::from(TICKS_PER_SECOND)
        );
        self.client
            .call("simContinueForTicks", vec![rmpv::Value::from(ticks)])
            .await?;
        Ok(())
    }

    /// Show a message in the simulator's on-screen log.
    ///
    /// Messages with the same `message` text overwrite each other; `param` is shown beside it.
    pub async fn print_log_message(&self, message: &str, param: &str, severity: u8) -> Result<()> {
        self.client
            .call(
                "simPrintLogMessage",
                vec![
                    rmpv::Value::from(message),
                    rmpv::Value::from(param),
                    rmpv::Value::from(severity),
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::mock::MockAirSim;
    use crate::{CarClient, SimError};

    #[tokio::test]
    async fn test_pause_and_resume() {
        let mock = MockAirSim::spawn().await;
        let client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();

        assert!(!client.sim().is_paused().await.unwrap());
        client.sim().pause(true).await.unwrap();
        assert!(client.sim().is_paused().await.unwrap());
        client.sim().pause(false).await.unwrap();
        assert!(!client.sim().is_paused().await.unwrap());
    }

    #[tokio::test]
    async fn test_continue_leaves_sim_paused() {
        let mock = MockAirSim::spawn().await;
        let client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();

        client.sim().pause(true).await.unwrap();
        client.sim().continue_for_ticks(600).await.unwrap();
        client.sim().continue_for_time(2.5).await.unwrap();
        assert!(client.sim().is_paused().await.unwrap());

        let state = mock.state.lock().unwrap();
        assert_eq!(state.ticks_advanced, 600);
        assert_eq!(state.seconds_advanced, 2.5);
    }

    #[tokio::test]
    async fn test_continue_while_running_is_rejected() {
        let mock = MockAirSim::spawn().await;
        let client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();

        let err = client.sim().continue_for_ticks(10).await.unwrap_err();
        assert!(matches!(err, SimError::Rpc { ref method, .. } if method == "simContinueForTicks"));
    }

    #[tokio::test]
    async fn test_print_log_message() {
        let mock = MockAirSim::spawn().await;
        let client = CarClient::new("127.0.0.1", mock.port).connect().await.unwrap();

        client
            .sim()
            .print_log_message("Cycle", "1", 0)
            .await
            .unwrap();
        assert_eq!(mock.calls(), vec!["simPrintLogMessage"]);
    }
}

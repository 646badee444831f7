use airsim_proto::types::{expect_bool, from_value, to_value};
use airsim_proto::Result;

use crate::client::CarClient;
use crate::controls::{CarControls, CarState};

/// API for driving the car: API control, actuation and state.
pub struct VehicleApi<'a> {
    pub(crate) client: &'a CarClient,
}

impl VehicleApi<'_> {
    /// Grant or revoke this client's authority to actuate the vehicle.
    ///
    /// Car controls sent without API control enabled are ignored by the server.
    pub async fn enable_api_control(&self, enabled: bool) -> Result<()> {
        self.client
            .call("enableApiControl", vec![rmpv::Value::from(enabled)])
            .await?;
        Ok(())
    }

    /// Whether this client currently holds API control.
    pub async fn is_api_control_enabled(&self) -> Result<bool> {
        let result = self.client.call("isApiControlEnabled", vec![]).await?;
        expect_bool("isApiControlEnabled", &result)
    }

    /// Arm or disarm the vehicle. Returns whether the server accepted the request.
    pub async fn arm_disarm(&self, arm: bool) -> Result<bool> {
        let result = self
            .client
            .call("armDisarm", vec![rmpv::Value::from(arm)])
            .await?;
        expect_bool("armDisarm", &result)
    }

    /// Reset the vehicle to its starting pose.
    pub async fn reset(&self) -> Result<()> {
        self.client.call("reset", vec![]).await?;
        Ok(())
    }

    /// Apply throttle, steering and the other car inputs.
    pub async fn set_car_controls(&self, controls: &CarControls) -> Result<()> {
        self.client
            .call("setCarControls", vec![to_value(controls)?])
            .await?;
        Ok(())
    }

    /// Get speed, gear and engine state of the car.
    pub async fn get_car_state(&self) -> Result<CarState> {
        let result = self.client.call("getCarState", vec![]).await?;
        from_value(&result)
    }
}

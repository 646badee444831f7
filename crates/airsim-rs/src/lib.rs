pub mod api;
pub mod client;
pub mod command_loop;
pub mod controls;

#[cfg(test)]
mod mock;

pub use airsim_proto::{Result, SimError};
pub use client::{CarClient, VersionInfo};
pub use command_loop::{CommandLoop, LoopConfig, Phase, Simulator, Sleeper, TokioSleeper};
pub use controls::{CarControls, CarState};

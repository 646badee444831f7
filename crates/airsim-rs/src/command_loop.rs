//! Scripted pause/continue drive.
//!
//! Each cycle sends a fixed driving command, lets it run, pauses the
//! simulation, advances it by a fixed number of ticks, and finally lets it run
//! freely again. The cycle is expressed as a sequence of [`Phase`]s so that
//! each step can be checked on its own, and waiting goes through a [`Sleeper`]
//! so tests do not have to sit through the real delays.

use std::io::Write;
use std::time::Duration;

use airsim_proto::{Result, SimError};
use async_trait::async_trait;
use tracing::info;

use crate::api::TICKS_PER_SECOND;
use crate::client::{CarClient, VersionInfo};
use crate::controls::CarControls;

/// The simulator operations the command loop depends on.
#[async_trait]
pub trait Simulator: Send {
    /// Check the session is live and the versions are known.
    async fn confirm_connection(&mut self) -> Result<VersionInfo>;

    /// Grant or revoke this client's authority to actuate the vehicle.
    async fn enable_api_control(&mut self, enabled: bool) -> Result<()>;

    /// Apply actuation values to the vehicle.
    async fn set_car_controls(&mut self, controls: &CarControls) -> Result<()>;

    /// Freeze or unfreeze simulated time.
    async fn pause(&mut self, paused: bool) -> Result<()>;

    /// Run exactly `ticks` steps, then pause again.
    async fn continue_for_ticks(&mut self, ticks: u32) -> Result<()>;
}

#[async_trait]
impl Simulator for CarClient {
    async fn confirm_connection(&mut self) -> Result<VersionInfo> {
        CarClient::confirm_connection(self).await
    }

    async fn enable_api_control(&mut self, enabled: bool) -> Result<()> {
        self.vehicle().enable_api_control(enabled).await
    }

    async fn set_car_controls(&mut self, controls: &CarControls) -> Result<()> {
        self.vehicle().set_car_controls(controls).await
    }

    async fn pause(&mut self, paused: bool) -> Result<()> {
        self.sim().pause(paused).await
    }

    async fn continue_for_ticks(&mut self, ticks: u32) -> Result<()> {
        self.sim().continue_for_ticks(ticks).await
    }
}

/// Waits between phases.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock waiting on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Constants of the drive script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    /// Number of full cycles to run.
    pub iterations: u32,
    pub throttle: f32,
    pub steering: f32,
    /// Ticks to advance while paused.
    pub advance_ticks: u32,
    /// Wait after sending the driving command.
    pub drive_dwell: Duration,
    /// Wait after pausing.
    pub pause_dwell: Duration,
    /// Wait after requesting the tick advance. Longer than the advance itself.
    pub advance_dwell: Duration,
    /// Wait after resuming.
    pub resume_dwell: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            throttle: 0.5,
            steering: 1.0,
            advance_ticks: 600,
            drive_dwell: Duration::from_secs(5),
            pause_dwell: Duration::from_secs(5),
            advance_dwell: Duration::from_secs(20),
            resume_dwell: Duration::from_secs(10),
        }
    }
}

impl LoopConfig {
    /// Total time spent waiting in one cycle.
    pub fn cycle_dwell(&self) -> Duration {
        Phase::CYCLE.iter().map(|phase| phase.dwell(self)).sum()
    }

    /// The command sent at the start of every cycle.
    pub fn controls(&self) -> CarControls {
        CarControls::new(self.throttle, self.steering)
    }

    fn validate(&self) -> Result<()> {
        if !self.controls().is_finite() {
            return Err(SimError::InvalidControls(format!(
                "throttle {} and steering {} must be finite",
                self.throttle, self.steering
            )));
        }
        Ok(())
    }
}

/// One step of a cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Send the driving command and let it run.
    Drive,
    /// Freeze simulated time.
    Pause,
    /// Advance a fixed number of ticks, ending paused.
    Advance,
    /// Let the simulation run freely.
    Resume,
}

impl Phase {
    pub const CYCLE: [Phase; 4] = [Phase::Drive, Phase::Pause, Phase::Advance, Phase::Resume];

    /// Progress line printed before the phase starts.
    pub fn announcement(self, config: &LoopConfig) -> String {
        match self {
            Phase::Drive => "Starting command".to_string(),
            Phase::Pause => format!("Pausing after {}sec", config.drive_dwell.as_secs()),
            Phase::Advance => format!(
                "Restarting command to run for {}sec",
                f64::from(config.advance_ticks) / f64::from(TICKS_PER_SECOND)
            ),
            Phase::Resume => "Finishing rest of the command".to_string(),
        }
    }

    /// How long to wait once the phase's request has been sent.
    pub fn dwell(self, config: &LoopConfig) -> Duration {
        match self {
            Phase::Drive => config.drive_dwell,
            Phase::Pause => config.pause_dwell,
            Phase::Advance => config.advance_dwell,
            Phase::Resume => config.resume_dwell,
        }
    }
}

/// Owns the simulator session and runs the scripted cycles against it.
///
/// Progress lines go to `out`; failures are returned as-is with no retry and
/// no attempt to restore the simulator's state.
pub struct CommandLoop<S, C, W> {
    sim: S,
    sleeper: C,
    out: W,
    config: LoopConfig,
    controls: CarControls,
}

impl<S: Simulator, C: Sleeper, W: Write> CommandLoop<S, C, W> {
    pub fn new(sim: S, sleeper: C, out: W) -> Self {
        Self {
            sim,
            sleeper,
            out,
            config: LoopConfig::default(),
            controls: CarControls::default(),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Confirm the connection, take API control, then run every cycle.
    pub async fn run(&mut self) -> Result<()> {
        self.config.validate()?;

        self.say("Waiting for connection")?;
        let versions = self.sim.confirm_connection().await?;
        self.say("Connected!")?;
        self.say(&versions.to_string())?;

        self.sim.enable_api_control(true).await?;
        info!("API control enabled");

        for iteration in 1..=self.config.iterations {
            self.run_cycle(iteration).await?;
        }
        info!("Completed {} cycles", self.config.iterations);
        Ok(())
    }

    /// Run one Drive, Pause, Advance, Resume cycle.
    pub async fn run_cycle(&mut self, iteration: u32) -> Result<()> {
        for phase in Phase::CYCLE {
            let announcement = phase.announcement(&self.config);
            self.say(&announcement)?;
            info!(iteration, ?phase, "{announcement}");

            self.execute(phase).await?;
            self.sleeper.sleep(phase.dwell(&self.config)).await;
        }
        self.say("Finished cycle")
    }

    async fn execute(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Drive => {
                self.controls.throttle = self.config.throttle;
                self.controls.steering = self.config.steering;
                self.sim.set_car_controls(&self.controls).await
            }
            Phase::Pause => self.sim.pause(true).await,
            Phase::Advance => self.sim.continue_for_ticks(self.config.advance_ticks).await,
            Phase::Resume => self.sim.pause(false).await,
        }
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    pub fn sleeper(&self) -> &C {
        &self.sleeper
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}

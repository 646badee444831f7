//! Drive the car in circles while pausing and stepping the simulation.
//!
//! Five times over: full-lock steering at half throttle for 5s, pause for 5s,
//! advance 600 ticks (~10 simulated seconds), then let it run freely for 10s.
//!
//! Usage:
//!   cargo run --example pause_continue_car
//!
//! Requires a running AirSim instance in car mode on the default RPC port (41451).

use airsim_rs::{CarClient, CommandLoop, TokioSleeper};

#[tokio::main]
async fn main() -> airsim_rs::Result<()> {
    // Initialize tracing for debug output.
    tracing_subscriber::fmt::init();

    let client = CarClient::new("127.0.0.1", CarClient::DEFAULT_PORT)
        .connect()
        .await?;

    CommandLoop::new(client, TokioSleeper, std::io::stdout())
        .run()
        .await
}

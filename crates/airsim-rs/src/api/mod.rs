mod sim;
mod system;
mod vehicle;

pub use sim::{SimApi, TICKS_PER_SECOND};
pub use system::SystemApi;
pub use vehicle::VehicleApi;

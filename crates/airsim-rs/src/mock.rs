//! In-process stand-in for an AirSim RPC server, used by the tests.

use std::sync::{Arc, Mutex};

use airsim_proto::connection::RESPONSE;
use airsim_proto::frame::{read_message, write_message};
use airsim_proto::types::value_to_str_dict;
use bytes::BytesMut;
use tokio::net::TcpListener;

#[derive(Debug)]
pub(crate) struct MockState {
    pub server_version: i64,
    pub min_required_client_version: i64,
    pub paused: bool,
    pub api_control: bool,
    pub ticks_advanced: u64,
    pub seconds_advanced: f64,
    pub controls: Option<(f64, f64)>,
    pub calls: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            server_version: 1,
            min_required_client_version: 1,
            paused: false,
            api_control: false,
            ticks_advanced: 0,
            seconds_advanced: 0.0,
            controls: None,
            calls: Vec::new(),
        }
    }
}

pub(crate) struct MockAirSim {
    pub port: u16,
    pub state: Arc<Mutex<MockState>>,
}

impl MockAirSim {
    /// Start a server on an ephemeral port that serves one client until it hangs up.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(MockState::default()));

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = tokio::io::split(stream);
            let mut buf = BytesMut::new();

            while let Ok(request) = read_message(&mut reader, &mut buf).await {
                let parts = request.as_array().unwrap().clone();
                let id = parts[1].clone();
                let method = parts[2].as_str().unwrap().to_string();
                let params = parts[3].as_array().unwrap().clone();

                let outcome = handle(&mut shared.lock().unwrap(), &method, &params);
                let (error, result) = match outcome {
                    Ok(result) => (rmpv::Value::Nil, result),
                    Err(message) => (rmpv::Value::from(message), rmpv::Value::Nil),
                };
                let response = rmpv::Value::Array(vec![
                    rmpv::Value::from(RESPONSE),
                    id,
                    error,
                    result,
                ]);
                if write_message(&mut writer, &response).await.is_err() {
                    break;
                }
            }
        });

        Self { port, state }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last_controls(&self) -> Option<(f64, f64)> {
        self.state.lock().unwrap().controls
    }
}

fn handle(
    state: &mut MockState,
    method: &str,
    params: &[rmpv::Value],
) -> Result<rmpv::Value, String> {
    state.calls.push(method.to_string());
    let flag = || params.first().and_then(rmpv::Value::as_bool).unwrap_or(false);

    let result = match method {
        "ping" => rmpv::Value::from(true),
        "getServerVersion" => rmpv::Value::from(state.server_version),
        "getMinRequiredClientVersion" => rmpv::Value::from(state.min_required_client_version),
        "enableApiControl" => {
            state.api_control = flag();
            rmpv::Value::Nil
        }
        "isApiControlEnabled" => rmpv::Value::from(state.api_control),
        "armDisarm" => rmpv::Value::from(true),
        "reset" => rmpv::Value::Nil,
        "setCarControls" => {
            let dict = params
                .first()
                .cloned()
                .and_then(value_to_str_dict)
                .ok_or("setCarControls expects a map")?;
            let field = |name: &str| dict.get(name).and_then(rmpv::Value::as_f64).unwrap_or(0.0);
            state.controls = Some((field("throttle"), field("steering")));
            rmpv::Value::Nil
        }
        "getCarState" => rmpv::Value::Map(vec![
            (rmpv::Value::from("speed"), rmpv::Value::from(0.0f32)),
            (rmpv::Value::from("gear"), rmpv::Value::from(1)),
            (rmpv::Value::from("rpm"), rmpv::Value::from(800.0f32)),
            (rmpv::Value::from("maxrpm"), rmpv::Value::from(7500.0f32)),
            (rmpv::Value::from("handbrake"), rmpv::Value::from(false)),
            (rmpv::Value::from("timestamp"), rmpv::Value::from(1_000u64)),
        ]),
        "simPause" => {
            state.paused = flag();
            rmpv::Value::Nil
        }
        "simIsPaused" => rmpv::Value::from(state.paused),
        "simContinueForTicks" | "simContinueForTime" => {
            if !state.paused {
                return Err(format!("{method} requires a paused simulation"));
            }
            let amount = params.first().cloned().unwrap_or(rmpv::Value::Nil);
            if method == "simContinueForTicks" {
                state.ticks_advanced += amount.as_u64().unwrap_or(0);
            } else {
                state.seconds_advanced += amount.as_f64().unwrap_or(0.0);
            }
            rmpv::Value::Nil
        }
        "simPrintLogMessage" => rmpv::Value::Nil,
        other => {
            return Err(format!(
                "rpclib: server could not find function '{other}' with argument count {}.",
                params.len()
            ))
        }
    };
    Ok(result)
}

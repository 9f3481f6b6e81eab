//! Tracer agent: standalone binary sampling a simulated position source and
//! reporting buffered fixes to an HTTP endpoint.
//!
//! Configured from the environment (see `TracerConfig`). Stops on Ctrl-C.

use std::sync::Arc;

use dotenv::dotenv;
use position_types::PositionFix;
use tracer_agent::sampling::{SimulatedSampler, SimulatedSamplerConfig};
use tracer_agent::{
    BoundedBuffer, HttpSink, SamplingMode, Tracer, TracerConfig, TracerEvent, TracerEventListener,
};

/// Logs every lifecycle event as JSON.
struct LoggingEventListener;

impl TracerEventListener for LoggingEventListener {
    fn on_event(&self, event: &TracerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::info!("[EVENT] {}", json),
            Err(e) => log::warn!("[EVENT] Failed to serialize event: {}", e),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match TracerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    log::info!(
        "Buffering up to {} fixes, reporting to {} every {}s",
        config.buffer_capacity,
        config.sink_url,
        config.report_interval.as_secs()
    );

    let store = Arc::new(BoundedBuffer::<PositionFix>::new(config.buffer_capacity));
    let sink = Arc::new(HttpSink::new(&config.sink_url, &config.device_id));
    let sampler = Arc::new(SimulatedSampler::new(SimulatedSamplerConfig::default()));

    let tracer = Tracer::<PositionFix, PositionFix>::passthrough(sampler, store, sink)
        .observation_point(config.observation_point)
        .build();
    tracer.add_event_listener(Arc::new(LoggingEventListener));

    let started = match config.sampling_mode {
        SamplingMode::Active => tracer.start_listening_actively(config.sample_interval),
        SamplingMode::Passive => tracer.start_listening_passively(
            config.active_request_interval,
            config.wake_for_active_requests,
        ),
    };
    if let Err(e) = started {
        log::error!("Failed to start listening: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = tracer.start_reporting(config.report_interval, config.wake_for_report) {
        log::error!("Failed to start reporting: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutting down");

    if let Err(e) = tracer.stop_listening() {
        log::warn!("Stop listening: {}", e);
    }
    match tracer.stop_reporting(config.flush_on_shutdown).await {
        Ok(Some(outcome)) => log::info!(
            "Final flush: {}/{} confirmed, {} left unreported",
            outcome.confirmed,
            outcome.reported,
            outcome.remaining
        ),
        Ok(None) => {}
        Err(e) => log::warn!("Stop reporting: {}", e),
    }

    match serde_json::to_string(&tracer.status()) {
        Ok(status) => log::info!("Final status: {}", status),
        Err(e) => log::warn!("Failed to serialize status: {}", e),
    }
}

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TracerError;
use crate::events::SamplingMode;
use crate::sampling::ObservationPoint;

#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub buffer_capacity: usize,
    pub sampling_mode: SamplingMode,
    /// Subscription interval for active sampling
    pub sample_interval: Duration,
    /// Staleness threshold for one-shot requests in passive sampling
    pub active_request_interval: Option<Duration>,
    pub wake_for_active_requests: bool,
    pub report_interval: Duration,
    pub wake_for_report: bool,
    pub sink_url: String,
    pub device_id: String,
    pub observation_point: ObservationPoint,
    pub flush_on_shutdown: bool,
}

impl TracerConfig {
    pub fn from_env() -> Result<Self, TracerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TracerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sampling_mode = match lookup("TRACER_SAMPLING_MODE")
            .as_deref()
            .map(str::trim)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            None | Some("passive") => SamplingMode::Passive,
            Some("active") => SamplingMode::Active,
            Some(other) => {
                return Err(TracerError::Config(format!(
                    "TRACER_SAMPLING_MODE must be 'active' or 'passive', got '{}'",
                    other
                )));
            }
        };

        Ok(Self {
            buffer_capacity: parse_or(&lookup, "TRACER_BUFFER_CAPACITY", 500)?,
            sampling_mode,
            sample_interval: parse_secs_or(&lookup, "TRACER_SAMPLE_INTERVAL_SECS", 30)?,
            active_request_interval: parse_secs_opt(&lookup, "TRACER_ACTIVE_REQUEST_INTERVAL_SECS")?,
            wake_for_active_requests: parse_bool_or(&lookup, "TRACER_WAKE_FOR_ACTIVE_REQUESTS", false)?,
            report_interval: parse_secs_or(&lookup, "TRACER_REPORT_INTERVAL_SECS", 300)?,
            wake_for_report: parse_bool_or(&lookup, "TRACER_WAKE_FOR_REPORT", false)?,
            sink_url: lookup("TRACER_SINK_URL").unwrap_or_else(|| "http://127.0.0.1:9110".to_string()),
            device_id: lookup("TRACER_DEVICE_ID").unwrap_or_else(|| "tracer-local".to_string()),
            observation_point: parse_or(&lookup, "TRACER_OBSERVATION_POINT", ObservationPoint::Accepted)?,
            flush_on_shutdown: parse_bool_or(&lookup, "TRACER_FLUSH_ON_SHUTDOWN", true)?,
        })
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Result<Option<T>, TracerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| TracerError::Config(format!("{} is invalid ('{}'): {}", key, raw, e))),
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, TracerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

/// A whole number of seconds, which must be positive when set.
fn parse_secs_opt<F>(lookup: &F, key: &str) -> Result<Option<Duration>, TracerError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_opt::<u64, _>(lookup, key)? {
        Some(0) => Err(TracerError::Config(format!("{} must be greater than zero", key))),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn parse_secs_or<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, TracerError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_secs_opt(lookup, key)?.unwrap_or(Duration::from_secs(default)))
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, TracerError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(TracerError::Config(format!("{} must be a boolean, got '{}'", key, v))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<TracerConfig, TracerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TracerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.buffer_capacity, 500);
        assert_eq!(cfg.sampling_mode, SamplingMode::Passive);
        assert_eq!(cfg.active_request_interval, None);
        assert_eq!(cfg.report_interval, Duration::from_secs(300));
        assert_eq!(cfg.observation_point, ObservationPoint::Accepted);
        assert!(cfg.flush_on_shutdown);
        assert!(!cfg.wake_for_report);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("TRACER_SAMPLING_MODE", "Active"),
            ("TRACER_BUFFER_CAPACITY", "3"),
            ("TRACER_ACTIVE_REQUEST_INTERVAL_SECS", "60"),
            ("TRACER_WAKE_FOR_REPORT", "yes"),
            ("TRACER_OBSERVATION_POINT", "offered"),
            ("TRACER_FLUSH_ON_SHUTDOWN", "0"),
        ])
        .unwrap();
        assert_eq!(cfg.sampling_mode, SamplingMode::Active);
        assert_eq!(cfg.buffer_capacity, 3);
        assert_eq!(cfg.active_request_interval, Some(Duration::from_secs(60)));
        assert!(cfg.wake_for_report);
        assert_eq!(cfg.observation_point, ObservationPoint::Offered);
        assert!(!cfg.flush_on_shutdown);
    }

    #[test]
    fn test_malformed_values_are_config_errors() {
        assert!(matches!(
            config(&[("TRACER_BUFFER_CAPACITY", "lots")]),
            Err(TracerError::Config(_))
        ));
        assert!(matches!(
            config(&[("TRACER_SAMPLING_MODE", "eager")]),
            Err(TracerError::Config(_))
        ));
        assert!(matches!(
            config(&[("TRACER_WAKE_FOR_REPORT", "maybe")]),
            Err(TracerError::Config(_))
        ));
    }

    #[test]
    fn test_zero_intervals_are_config_errors() {
        for key in [
            "TRACER_SAMPLE_INTERVAL_SECS",
            "TRACER_ACTIVE_REQUEST_INTERVAL_SECS",
            "TRACER_REPORT_INTERVAL_SECS",
        ] {
            match config(&[(key, "0")]) {
                Err(TracerError::Config(msg)) => assert!(msg.contains(key)),
                other => panic!("{} = 0 should be rejected, got {:?}", key, other),
            }
        }
        assert_eq!(
            config(&[("TRACER_ACTIVE_REQUEST_INTERVAL_SECS", "")]).unwrap().active_request_interval,
            None
        );
    }
}

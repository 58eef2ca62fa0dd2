//! Human-readable error descriptions, exit codes and structured JSON errors.

use battery_core::{InitError, TelemetryError};

fn telemetry_error(err: &eyre::Report) -> Option<&TelemetryError> {
    err.chain().find_map(|e| e.downcast_ref::<TelemetryError>())
}

fn init_error(err: &eyre::Report) -> Option<&InitError> {
    err.chain().find_map(|e| e.downcast_ref::<InitError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(te) = telemetry_error(err) {
        return match te {
            TelemetryError::RetryLater => {
                "What happened: The converter asked us to try again.\nLikely causes: The sampling source was momentarily unavailable.\nHow to fix: Re-run the command.".to_string()
            }
            TelemetryError::DeviceAbsent => {
                "What happened: The sampling device is gone.\nLikely causes: The converter was unbound or unplugged.\nHow to fix: Check that the converter is present, then re-run.".to_string()
            }
            TelemetryError::NoData => {
                "What happened: No reading could be taken.\nLikely causes: A converter fault on the voltage or current channel.\nHow to fix: Re-run with --log-level=debug to see which channel failed.".to_string()
            }
            TelemetryError::InvalidRequest(msg) => format!(
                "What happened: Invalid request ({msg}).\nLikely causes: Unknown property name, a write to a read-only property, or a technology other than NiMH.\nHow to fix: Run `battery props` to list properties; only `set technology NiMH` on an unknown pack is accepted."
            ),
        };
    }

    if let Some(ie) = init_error(err) {
        return match ie {
            InitError::RetryLater(msg) => format!(
                "What happened: Bring-up was deferred ({msg}).\nLikely causes: The converter or strap line is not ready yet.\nHow to fix: Retry once the provider is available."
            ),
            InitError::Fatal(msg) => format!(
                "What happened: Bring-up failed ({msg}).\nLikely causes: Wrong channel names in [channels] or a duplicate supply name.\nHow to fix: Check the config file and try again."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") || lower.starts_with("parse config") {
        return format!(
            "What happened: Could not load the configuration.\nLikely causes: Wrong path or malformed TOML.\nHow to fix: Check the file passed via --config. Original: {msg}"
        );
    }

    if lower.contains("must") && (lower.contains('.') || lower.contains("channels")) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or empty values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("strap gpio") {
        return "What happened: Failed to open the strap GPIO line.\nLikely causes: Wrong [strap] gpio pin or insufficient GPIO permissions.\nHow to fix: Fix the pin number; ensure the process may access GPIO.".to_string();
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 retry later, 4 device absent, 5 no data, 6 invalid
/// request, 7 bring-up failure, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(te) = telemetry_error(err) {
        return match te {
            TelemetryError::RetryLater => 3,
            TelemetryError::DeviceAbsent => 4,
            TelemetryError::NoData => 5,
            TelemetryError::InvalidRequest(_) => 6,
        };
    }
    if init_error(err).is_some() {
        return 7;
    }
    1
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(te) = telemetry_error(err) {
        return match te {
            TelemetryError::RetryLater => "RetryLater",
            TelemetryError::DeviceAbsent => "DeviceAbsent",
            TelemetryError::NoData => "NoData",
            TelemetryError::InvalidRequest(_) => "InvalidRequest",
        };
    }
    match init_error(err) {
        Some(InitError::RetryLater(_)) => "InitDeferred",
        Some(InitError::Fatal(_)) => "InitFailed",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "code": exit_code_for_error(err),
        "error": err.to_string(),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    fn report<E>(e: E) -> eyre::Report
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Err::<(), E>(e).wrap_err("context").unwrap_err()
    }

    #[test]
    fn exit_codes_survive_context() {
        assert_eq!(exit_code_for_error(&report(TelemetryError::RetryLater)), 3);
        assert_eq!(exit_code_for_error(&report(TelemetryError::DeviceAbsent)), 4);
        assert_eq!(exit_code_for_error(&report(TelemetryError::NoData)), 5);
        assert_eq!(
            exit_code_for_error(&report(TelemetryError::invalid("x"))),
            6
        );
        assert_eq!(
            exit_code_for_error(&report(InitError::Fatal("dup".into()))),
            7
        );
        assert_eq!(exit_code_for_error(&eyre::eyre!("plain")), 1);
    }

    #[test]
    fn json_error_carries_reason_and_code() {
        let v: serde_json::Value =
            serde_json::from_str(&format_error_json(&report(TelemetryError::NoData))).unwrap();
        assert_eq!(v["reason"], "NoData");
        assert_eq!(v["code"], 5);
        assert!(v["message"].as_str().unwrap().contains("No reading"));
    }

    #[test]
    fn config_errors_are_explained() {
        let msg = humanize(&eyre::eyre!("sampling.rate_hz must be > 0"));
        assert!(msg.contains("Configuration is invalid"));
    }
}

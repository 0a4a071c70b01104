//! Human-readable error descriptions and structured JSON error formatting.

use mcs_core::error::{BuildError, FollowError};

/// Validation messages from `mcs_config` name the offending key.
fn is_config_key(lower: &str) -> bool {
    ["tracking.", "limiter.", "axes.", "logging."]
        .iter()
        .any(|k| lower.starts_with(k))
}

/// Stable name of the error class, used as the JSON `reason`.
fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<toml::de::Error>().is_some()
    {
        return "Config";
    }
    if let Some(fe) = err.downcast_ref::<FollowError>() {
        return match fe {
            FollowError::Degenerate => "Degenerate",
            FollowError::NotConnected => "NotConnected",
            FollowError::TimeSource { .. } => "TimeSource",
            FollowError::InvalidIndex(_) => "InvalidIndex",
        };
    }
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("read config") || is_config_key(&lower) {
        return "Config";
    }
    if lower.contains("demand csv") {
        return "DemandFile";
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingTimeSource => {
                "What happened: No time source was provided to the tracking loop.\nLikely causes: The loop builder was not given a clock.\nHow to fix: Pass one via with_time_source(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `mcs check-config`."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: A typo in a key or a value of the wrong type.\nHow to fix: Correct the file and rerun `mcs check-config`. Parser said: {te}"
        );
    }

    if let Some(fe) = err.downcast_ref::<FollowError>() {
        return match fe {
            FollowError::Degenerate => "What happened: Two or more sample times are equal, so no curve can be fitted.\nLikely causes: Repeated apply times in the demand stream or in --point values.\nHow to fix: Use three distinct times.".to_string(),
            FollowError::NotConnected => "What happened: The demand source looks disconnected (all sample times are zero).\nLikely causes: No demands were received before follow was asserted.\nHow to fix: Check the demand stream and start following only once it is flowing.".to_string(),
            FollowError::TimeSource { message, .. } => format!(
                "What happened: The time source failed ({message}).\nLikely causes: The time card or clock service is unavailable.\nHow to fix: Check the clock hardware and rerun."
            ),
            FollowError::InvalidIndex(i) => format!(
                "What happened: The recent slot index {i} is outside 0..=2.\nLikely causes: A corrupted demand index.\nHow to fix: Re-run with --log-level=debug and inspect the ingest records."
            ),
        };
    }

    // String-based heuristics over the whole context chain
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("demand csv must have headers") {
        return "Invalid headers in demand CSV. Expected 'send_time,apply_time,track_id,azimuth,elevation'.".to_string();
    }

    if lower.contains("demand csv") || lower.contains("invalid csv row") {
        return format!(
            "What happened: The demand recording could not be used ({msg}).\nLikely causes: Wrong path, empty file or rows out of send-time order.\nHow to fix: Check the CSV and try again."
        );
    }

    if lower.contains("read config") {
        let cause = err.source().map(|s| format!(" ({s})")).unwrap_or_default();
        return format!(
            "What happened: The config file could not be read{cause}.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Point --config at a readable TOML file."
        );
    }

    if is_config_key(&lower) {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `mcs check-config`."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: config 2, demand file 3, tracking/time errors 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "Config" => 2,
        "DemandFile" => 3,
        "Error" => 1,
        _ => 4,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    if let Some(FollowError::TimeSource { code, .. }) = err.downcast_ref::<FollowError>() {
        return json!({ "reason": reason, "details": { "code": code }, "message": humanize(err) })
            .to_string();
    }
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

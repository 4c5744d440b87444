//! Payload and Flush Parameters

/// Largest payload the transport accepts.
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// Headroom kept under [`MAX_PAYLOAD_SIZE`] for topic and protocol framing.
pub const PAYLOAD_SAFETY_MARGIN: usize = 512;

/// Partial batches are flushed after this long.
pub const FLUSH_TIMEOUT_MS: u64 = 1_000;

/// Changing events with more samples than this are sent without detail.
pub const SAMPLES_JSON_CAP: u32 = 50;

/// Period of the telemetry worker's drain loop.
pub const TELEMETRY_PROCESS_INTERVAL_MS: u64 = 300;

/// Period of the formatter worker's batch loop.
pub const FORMATTER_INTERVAL_MS: u64 = 100;

/// Topic prefix; the device id and stream name are appended.
pub const TOPIC_PREFIX: &str = "mica/dev/telemetry/gateway";

/// Topic prefix of device status messages.
pub const STATUS_TOPIC_PREFIX: &str = "mica/dev/status/gateway";

/// Stream name of pressure event messages.
pub const EVENTS_TOPIC_SUFFIX: &str = "pressure-events";

/// Stream name of health check messages.
pub const HEALTH_TOPIC_SUFFIX: &str = "healthcheck";

/// Period between health checks.
pub const HEALTHCHECK_INTERVAL_MS: u64 = 60_000;

/// Period between statistics summaries in the log.
pub const STATS_LOG_INTERVAL_MS: u64 = 30_000;

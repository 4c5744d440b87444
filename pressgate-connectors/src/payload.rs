//! JSON Payload Encoding
//!
//! ## Message Layout
//!
//! ```json
//! {
//!   "sensor_id": "gw-0042",
//!   "sentTimestamp": 5100,
//!   "events": [
//!     {"type": "stable", "startTimestamp": 0, "endTimestamp": 5000,
//!      "sampleCount": 51, "duration_ms": 5000, "pressure": 3450000},
//!     {"type": "rising", "startTimestamp": 5100, "endTimestamp": 5600,
//!      "sampleCount": 6, "duration_ms": 500, "startValue": 3450000,
//!      "endValue": 3600000, "triggerReason": "derivative_rising",
//!      "samples": [[5100, 3450000], [5200, 3480000]]}
//!   ]
//! }
//! ```
//!
//! The mixed key styles are what the ingestion side parses; do not
//! normalize them.
//!
//! ## Shape Rules
//!
//! - A changing interval classified stable-like is sent in the stable shape,
//!   with `pressure` the midpoint of its start and end values.
//! - `samples` is present only when the interval has at most
//!   `samples_cap` samples and detail is enabled for this rendering.
//!
//! ## Size Fallback
//!
//! 1. Render with detail. Fits: done.
//! 2. Render again without any `samples` arrays. Fits: done, counted as
//!    stripped.
//! 3. Otherwise the batch is rejected with `PayloadTooLarge`.

use serde::{Deserialize, Serialize};

use pressgate_core::constants::transport::{
    EVENTS_TOPIC_SUFFIX, HEALTH_TOPIC_SUFFIX, MAX_PAYLOAD_SIZE, SAMPLES_JSON_CAP,
    STATUS_TOPIC_PREFIX, TOPIC_PREFIX,
};
use pressgate_core::{
    BatchEncoder, ChangingEvent, EncodeError, Event, EventKind, OutboundMessage, QoS,
    StableSummary, Timestamp,
};

/// Topic layout and size limits of outbound messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// Device identifier, used in topics and as `sensor_id`
    pub device_id: String,
    /// Prefix of telemetry topics
    pub topic_prefix: String,
    /// Prefix of status topics
    pub status_prefix: String,
    /// Delivery guarantee of event messages
    pub qos: QoS,
    /// Largest accepted payload in bytes
    pub max_payload_size: usize,
    /// Changing events with more samples are sent without detail
    pub samples_cap: u32,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            device_id: String::from("unprovisioned"),
            topic_prefix: String::from(TOPIC_PREFIX),
            status_prefix: String::from(STATUS_TOPIC_PREFIX),
            qos: QoS::AtMostOnce,
            max_payload_size: MAX_PAYLOAD_SIZE,
            samples_cap: SAMPLES_JSON_CAP,
        }
    }
}

impl PayloadConfig {
    /// Defaults for `device_id`
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// `{prefix}/{device_id}/pressure-events`
    pub fn events_topic(&self) -> String {
        format!("{}/{}/{}", self.topic_prefix, self.device_id, EVENTS_TOPIC_SUFFIX)
    }

    /// `{status_prefix}/{device_id}/healthcheck`
    pub fn health_topic(&self) -> String {
        format!("{}/{}/{}", self.status_prefix, self.device_id, HEALTH_TOPIC_SUFFIX)
    }
}

#[derive(Serialize)]
struct BatchDoc<'a> {
    sensor_id: &'a str,
    #[serde(rename = "sentTimestamp")]
    sent_timestamp: Timestamp,
    events: Vec<EventDoc>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EventDoc {
    Stable(StableDoc),
    Changing(ChangingDoc),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StableDoc {
    #[serde(rename = "type")]
    kind: &'static str,
    start_timestamp: Timestamp,
    end_timestamp: Timestamp,
    sample_count: u32,
    #[serde(rename = "duration_ms")]
    duration_ms: u64,
    pressure: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangingDoc {
    #[serde(rename = "type")]
    kind: &'static str,
    start_timestamp: Timestamp,
    end_timestamp: Timestamp,
    sample_count: u32,
    #[serde(rename = "duration_ms")]
    duration_ms: u64,
    start_value: u32,
    end_value: u32,
    trigger_reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<[u64; 2]>>,
}

impl EventDoc {
    fn from_stable(s: &StableSummary) -> Self {
        EventDoc::Stable(StableDoc {
            kind: EventKind::Stable.as_str(),
            start_timestamp: s.start_timestamp,
            end_timestamp: s.end_timestamp,
            sample_count: s.sample_count,
            duration_ms: s.end_timestamp.saturating_sub(s.start_timestamp),
            pressure: s.average,
        })
    }

    fn from_changing(c: &ChangingEvent, with_detail: bool, samples_cap: u32) -> Self {
        let duration_ms = c.end_timestamp.saturating_sub(c.start_timestamp);

        if c.kind == EventKind::Stable {
            let midpoint = (u64::from(c.start_value) + u64::from(c.end_value)) / 2;
            return EventDoc::Stable(StableDoc {
                kind: EventKind::Stable.as_str(),
                start_timestamp: c.start_timestamp,
                end_timestamp: c.end_timestamp,
                sample_count: c.sample_count,
                duration_ms,
                pressure: midpoint as u32,
            });
        }

        let fits = c.sample_count <= samples_cap && !c.samples.is_empty();
        let samples = (with_detail && fits).then(|| {
            c.samples
                .iter()
                .map(|s| [s.timestamp, u64::from(s.value)])
                .collect()
        });

        EventDoc::Changing(ChangingDoc {
            kind: c.kind.as_str(),
            start_timestamp: c.start_timestamp,
            end_timestamp: c.end_timestamp,
            sample_count: c.sample_count,
            duration_ms,
            start_value: c.start_value,
            end_value: c.end_value,
            trigger_reason: c.trigger.as_str(),
            samples,
        })
    }

    fn has_samples(&self) -> bool {
        matches!(self, EventDoc::Changing(ChangingDoc { samples: Some(_), .. }))
    }
}

/// Encoder counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderStats {
    /// Messages produced
    pub messages: u32,
    /// Payload bytes produced
    pub bytes: u64,
    /// Messages that only fit without sample detail
    pub detail_stripped: u32,
    /// Batches rejected as too large
    pub too_large: u32,
}

/// Batch encoder producing the gateway's JSON messages
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    config: PayloadConfig,
    topic: String,
    stats: EncoderStats,
}

impl JsonEncoder {
    /// Encoder for the device and limits in `config`
    pub fn new(config: PayloadConfig) -> Self {
        let topic = config.events_topic();
        Self {
            config,
            topic,
            stats: EncoderStats::default(),
        }
    }

    fn render(
        &self,
        events: &[Event],
        sent_at: Timestamp,
        with_detail: bool,
    ) -> Result<(Vec<u8>, bool), EncodeError> {
        let docs: Vec<EventDoc> = events
            .iter()
            .map(|event| match event {
                Event::Stable(s) => EventDoc::from_stable(s),
                Event::Changing(c) => {
                    EventDoc::from_changing(c, with_detail, self.config.samples_cap)
                }
            })
            .collect();
        let had_detail = docs.iter().any(EventDoc::has_samples);

        let doc = BatchDoc {
            sensor_id: &self.config.device_id,
            sent_timestamp: sent_at,
            events: docs,
        };

        let bytes = serde_json::to_vec(&doc).map_err(|_| EncodeError::Serialization)?;
        Ok((bytes, had_detail))
    }

    /// Events topic of this encoder
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Payload configuration
    pub fn config(&self) -> &PayloadConfig {
        &self.config
    }

    /// Counters
    pub fn stats(&self) -> EncoderStats {
        self.stats
    }
}

impl BatchEncoder for JsonEncoder {
    fn encode(
        &mut self,
        events: &[Event],
        sent_at: Timestamp,
    ) -> Result<OutboundMessage, EncodeError> {
        if events.is_empty() {
            return Err(EncodeError::EmptyBatch);
        }

        let limit = self.config.max_payload_size;
        let (mut payload, had_detail) = self.render(events, sent_at, true)?;

        if payload.len() > limit && had_detail {
            log::debug!("payload of {} bytes over limit, dropping sample detail", payload.len());
            payload = self.render(events, sent_at, false)?.0;
            if payload.len() <= limit {
                self.stats.detail_stripped += 1;
            }
        }

        if payload.len() > limit {
            self.stats.too_large += 1;
            return Err(EncodeError::PayloadTooLarge { size: payload.len(), limit });
        }

        self.stats.messages += 1;
        self.stats.bytes += payload.len() as u64;

        Ok(OutboundMessage {
            topic: self.topic.clone(),
            payload,
            qos: self.config.qos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressgate_core::{ProcessedSample, TriggerReason};
    use serde_json::Value;

    fn stable_event() -> Event {
        Event::Stable(StableSummary {
            start_timestamp: 1_000,
            end_timestamp: 6_000,
            sample_count: 51,
            average: 3_450_000,
            min: 3_449_000,
            max: 3_451_000,
        })
    }

    fn changing_event(kind: EventKind, samples: usize) -> Event {
        let mut detail = heapless::Vec::new();
        for i in 0..samples {
            let _ = detail.push(ProcessedSample {
                timestamp: 10_000 + i as u64 * 100,
                value: 3_450_000 + i as u32 * 3_000,
                derivative: 30_000.0,
            });
        }
        Event::Changing(ChangingEvent {
            start_timestamp: 10_000,
            end_timestamp: 10_000 + samples.saturating_sub(1) as u64 * 100,
            start_value: 3_450_000,
            end_value: 3_450_000 + samples.saturating_sub(1) as u32 * 3_000,
            sample_count: samples as u32,
            samples: detail,
            trigger: TriggerReason::DerivativeRising,
            kind,
            mean_derivative: 30_000.0,
        })
    }

    fn parse(message: &OutboundMessage) -> Value {
        serde_json::from_slice(&message.payload).expect("valid json")
    }

    #[test]
    fn stable_event_shape() {
        let mut encoder = JsonEncoder::new(PayloadConfig::new("gw-1"));
        let message = encoder.encode(&[stable_event()], 7_000).unwrap();
        let json = parse(&message);

        assert_eq!(message.topic, "mica/dev/telemetry/gateway/gw-1/pressure-events");
        assert_eq!(json["sensor_id"], "gw-1");
        assert_eq!(json["sentTimestamp"], 7_000);

        let event = &json["events"][0];
        assert_eq!(event["type"], "stable");
        assert_eq!(event["startTimestamp"], 1_000);
        assert_eq!(event["endTimestamp"], 6_000);
        assert_eq!(event["sampleCount"], 51);
        assert_eq!(event["duration_ms"], 5_000);
        assert_eq!(event["pressure"], 3_450_000);
        assert!(event.get("startValue").is_none());
    }

    #[test]
    fn changing_event_shape_with_samples() {
        let mut encoder = JsonEncoder::new(PayloadConfig::new("gw-1"));
        let message = encoder.encode(&[changing_event(EventKind::Rising, 3)], 11_000).unwrap();
        let event = &parse(&message)["events"][0];

        assert_eq!(event["type"], "rising");
        assert_eq!(event["startValue"], 3_450_000);
        assert_eq!(event["endValue"], 3_456_000);
        assert_eq!(event["triggerReason"], "derivative_rising");
        assert_eq!(event["samples"][1][0], 10_100);
        assert_eq!(event["samples"][1][1], 3_453_000);
        assert!(event.get("pressure").is_none());
    }

    #[test]
    fn stable_like_changing_event_uses_stable_shape() {
        let mut encoder = JsonEncoder::new(PayloadConfig::new("gw-1"));
        let message = encoder.encode(&[changing_event(EventKind::Stable, 3)], 11_000).unwrap();
        let event = &parse(&message)["events"][0];

        assert_eq!(event["type"], "stable");
        assert_eq!(event["pressure"], 3_453_000);
        assert!(event.get("samples").is_none());
        assert!(event.get("triggerReason").is_none());
    }

    #[test]
    fn samples_omitted_over_cap() {
        let config = PayloadConfig { samples_cap: 2, ..PayloadConfig::new("gw-1") };
        let mut encoder = JsonEncoder::new(config);
        let message = encoder.encode(&[changing_event(EventKind::Rising, 3)], 0).unwrap();
        assert!(parse(&message)["events"][0].get("samples").is_none());
    }

    #[test]
    fn oversize_batch_drops_detail_first() {
        let config = PayloadConfig { max_payload_size: 600, ..PayloadConfig::new("gw-1") };
        let mut encoder = JsonEncoder::new(config);
        let batch = [changing_event(EventKind::Rising, 40), stable_event()];

        let message = encoder.encode(&batch, 0).unwrap();
        assert!(message.len() <= 600);
        assert!(parse(&message)["events"][0].get("samples").is_none());
        assert_eq!(encoder.stats().detail_stripped, 1);
    }

    #[test]
    fn hopeless_batch_is_rejected() {
        let config = PayloadConfig { max_payload_size: 64, ..PayloadConfig::new("gw-1") };
        let mut encoder = JsonEncoder::new(config);

        match encoder.encode(&[stable_event()], 0) {
            Err(EncodeError::PayloadTooLarge { limit, size }) => {
                assert_eq!(limit, 64);
                assert!(size > 64);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(encoder.stats().too_large, 1);
    }

    #[test]
    fn empty_batch_is_an_error() {
        let mut encoder = JsonEncoder::new(PayloadConfig::default());
        assert_eq!(encoder.encode(&[], 0), Err(EncodeError::EmptyBatch));
    }

    #[test]
    fn full_default_batch_of_detailed_events_fits_after_stripping() {
        let mut encoder = JsonEncoder::new(PayloadConfig::new("gw-1"));
        let batch: Vec<Event> = (0..5).map(|_| changing_event(EventKind::Rising, 50)).collect();

        let message = encoder.encode(&batch, 0).unwrap();
        assert!(message.len() <= MAX_PAYLOAD_SIZE);
    }
}

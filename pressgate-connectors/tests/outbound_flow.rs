//! Batches and health checks sharing the outbound channel

mod common;

use pressgate_connectors::{outbound_channel, HealthCheck, JsonEncoder, PayloadConfig, QueueSender};
use pressgate_core::config::BatchConfig;
use pressgate_core::{FlushOutcome, MessageBatcher};

use common::{json, stable_at};

#[tokio::test]
async fn batch_and_health_arrive_in_order() {
    let config = PayloadConfig::new("gw-0042");
    let (tx, mut rx) = outbound_channel(4);

    let mut encoder = JsonEncoder::new(config.clone());
    let mut sink = tx.clone();
    let mut batcher: MessageBatcher<2> = MessageBatcher::new(&BatchConfig::default(), 0);
    let mut health = HealthCheck::new(QueueSender::new(tx, &config), 60_000);

    batcher.push(stable_at(5_000, 3_450_000)).unwrap();
    batcher.push(stable_at(10_000, 3_451_000)).unwrap();
    assert!(batcher.should_flush(10_050));
    assert_eq!(batcher.flush(10_050, &mut encoder, &mut sink), FlushOutcome::Sent);

    assert_eq!(health.tick(60_000).unwrap(), false);
    assert_eq!(health.tick(60_001).unwrap(), true);

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.topic, "mica/dev/telemetry/gateway/gw-0042/pressure-events");
    let doc = json(&batch.payload);
    assert_eq!(doc["sensor_id"], "gw-0042");
    assert_eq!(doc["sentTimestamp"], 10_050);
    assert_eq!(doc["events"].as_array().unwrap().len(), 2);
    assert_eq!(doc["events"][1]["pressure"], 3_451_000);

    let check = rx.recv().await.unwrap();
    assert_eq!(check.topic, "mica/dev/status/gateway/gw-0042/healthcheck");
    let doc = json(&check.payload);
    assert_eq!(doc["gatewayId"], "gw-0042");
    assert_eq!(doc["uptime"], 60_001);
}

#[tokio::test]
async fn full_channel_drops_batch_and_fails_health() {
    let config = PayloadConfig::new("gw-1");
    let (tx, mut rx) = outbound_channel(1);

    let mut encoder = JsonEncoder::new(config.clone());
    let mut sink = tx.clone();
    let mut batcher: MessageBatcher<1> = MessageBatcher::new(&BatchConfig::default(), 0);
    let mut health = HealthCheck::new(QueueSender::new(tx, &config), 1_000);

    batcher.push(stable_at(5_000, 3_000_000)).unwrap();
    assert_eq!(batcher.flush(5_000, &mut encoder, &mut sink), FlushOutcome::Sent);

    batcher.push(stable_at(6_000, 3_000_000)).unwrap();
    assert_eq!(batcher.flush(6_000, &mut encoder, &mut sink), FlushOutcome::OutboundFull);
    assert_eq!(batcher.pending(), 0);
    assert_eq!(batcher.stats().batches_dropped, 1);

    // Health check cannot get in either; its schedule stays put
    assert!(health.tick(6_000).is_err());
    assert_eq!(health.last_sent(), 0);

    rx.recv().await.unwrap();
    assert_eq!(health.tick(6_100).unwrap(), true);
}

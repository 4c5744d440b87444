//! Worker loops
//!
//! One async function per pipeline stage or collaborator-facing task. Each
//! loop waits on its [`Pacer`] at the top of every iteration, which keeps a
//! fixed rate and parks while the worker is disabled, then does one bounded
//! unit of work. Stage state is moved into the loop and never shared;
//! stages talk only through the bounded channels they were handed.

use std::time::Duration;

use pressgate_connectors::{AsyncConnector, HealthCheck, HealthSender};
use pressgate_core::queue::{Consumer, Producer};
use pressgate_core::{
    BatchEncoder, Event, MessageBatcher, Notification, OutboundMessage, OutboundSink, Reading,
    ReadingSource, SampleAcquirer, SignalPipeline, TimeSource, Timestamp,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::bus::NotificationBus;
use crate::config::Timing;
use crate::control::WorkerHandle;
use crate::supervisor::Supervisor;

/// Period of the health worker's due check
const HEALTH_POLL_MS: u64 = 1_000;

/// Fires once per interval
#[derive(Debug, Clone, Copy)]
pub struct StatsTimer {
    interval_ms: u64,
    last: Timestamp,
}

impl StatsTimer {
    /// Timer whose first period starts at `now`
    pub fn new(interval_ms: u64, now: Timestamp) -> Self {
        Self { interval_ms, last: now }
    }

    /// True once per elapsed interval
    pub fn due(&mut self, now: Timestamp) -> bool {
        if now.saturating_sub(self.last) >= self.interval_ms {
            self.last = now;
            true
        } else {
            false
        }
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Fixed-rate schedule of one worker loop
///
/// Periods are measured from start to start, so the time spent working
/// does not stretch them. After a pause the schedule restarts from the
/// moment the worker is enabled again.
#[derive(Debug)]
pub struct Pacer {
    ticker: Interval,
    started: bool,
}

impl Pacer {
    /// Pacer with the given period; zero is treated as 1 ms
    pub fn new(period_ms: u64) -> Self {
        let period = ms(period_ms.max(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker, started: false }
    }

    /// Wait for the next period, then until `handle` is enabled
    ///
    /// The first call does not wait for a period. Returns false once the
    /// worker control is gone.
    pub async fn ready(&mut self, handle: &mut WorkerHandle) -> bool {
        if self.started {
            self.ticker.tick().await;
        }
        self.started = true;

        if handle.is_enabled() {
            return true;
        }
        let enabled = handle.wait_enabled().await;
        self.ticker.reset();
        enabled
    }
}

/// Sensor reader: poll, validate, hand readings to the telemetry worker
pub async fn reader<S, C, const N: usize>(
    mut handle: WorkerHandle,
    clock: C,
    mut acquirer: SampleAcquirer<S>,
    mut readings: Producer<'_, Reading, N>,
    bus: NotificationBus,
    timing: Timing,
) where
    S: ReadingSource,
    C: TimeSource,
{
    let mut stats_timer = StatsTimer::new(timing.stats_interval_ms, clock.now());
    let mut pacer = Pacer::new(timing.sample_interval_ms);

    while pacer.ready(&mut handle).await {
        let now = clock.now();

        if let Some(reading) = acquirer.acquire(now, &bus) {
            readings.push_or_alert(reading, &bus, Notification::QUEUE_FULL);
        }

        if stats_timer.due(now) {
            let acq = acquirer.stats();
            let val = acquirer.validation_stats();
            let chan = readings.channel().stats().snapshot();
            log::info!(
                "reader: {} readings, {} rejected, {} bus faults, {} reinits, {} dropped",
                acq.readings,
                val.out_of_range + val.step_exceeded,
                acq.bus_faults,
                acq.reinitializations,
                chan.dropped
            );
        }
    }
}

/// Signal pipeline: drain readings, queue finalized events
pub async fn telemetry<C, const W: usize, const N: usize, const K: usize>(
    mut handle: WorkerHandle,
    clock: C,
    mut pipeline: SignalPipeline<W>,
    mut readings: Consumer<'_, Reading, N>,
    mut events: Producer<'_, Event, K>,
    bus: NotificationBus,
    timing: Timing,
) where
    C: TimeSource,
{
    let mut stats_timer = StatsTimer::new(timing.stats_interval_ms, clock.now());
    let mut pacer = Pacer::new(timing.telemetry_interval_ms);

    while pacer.ready(&mut handle).await {
        for reading in readings.drain() {
            for event in pipeline.process(&reading) {
                log::debug!(
                    "{} event {}..{} ({} samples)",
                    event.kind().as_str(),
                    event.start_timestamp(),
                    event.end_timestamp(),
                    event.sample_count()
                );
                events.push_or_alert(event, &bus, Notification::QUEUE_FULL);
            }
        }

        if stats_timer.due(clock.now()) {
            pipeline.log_stats();
            let chan = events.channel().stats().snapshot();
            log::info!(
                "event channel: {} queued, {} dropped, max depth {}",
                chan.pushed,
                chan.dropped,
                chan.max_depth
            );
        }
    }
}

/// Message batcher: flush events to the outbound channel while fully connected
#[allow(clippy::too_many_arguments)]
pub async fn formatter<C, E, S, const B: usize, const K: usize>(
    mut handle: WorkerHandle,
    clock: C,
    supervisor: &Supervisor,
    mut batcher: MessageBatcher<B>,
    mut events: Consumer<'_, Event, K>,
    mut encoder: E,
    mut sink: S,
    timing: Timing,
) where
    C: TimeSource,
    E: BatchEncoder,
    S: OutboundSink,
{
    let mut stats_timer = StatsTimer::new(timing.stats_interval_ms, clock.now());
    let mut pacer = Pacer::new(timing.formatter_interval_ms);

    while pacer.ready(&mut handle).await {
        let now = clock.now();

        match supervisor.get_state().await {
            Ok(state) if state.can_publish_telemetry() => {
                let flushes = batcher.poll(now, &mut events, &mut encoder, &mut sink);
                if flushes > 0 {
                    log::debug!("formatter flushed {} batches", flushes);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("formatter skipped: {}", e),
        }

        if stats_timer.due(now) {
            let stats = batcher.stats();
            log::info!(
                "formatter: {} sent, {} dropped, {} events lost, {} encode errors, {} queued",
                stats.batches_sent,
                stats.batches_dropped,
                stats.events_dropped,
                stats.encode_errors,
                batcher.pending()
            );
        }
    }
}

/// Network publisher: move outbound messages to the transport
///
/// Messages stay queued while the transport is down. A failed publish on a
/// live session is reported as `TRANSPORT_DISCONNECTED`.
pub async fn publisher<T>(
    mut handle: WorkerHandle,
    mut outbound: mpsc::Receiver<OutboundMessage>,
    mut transport: T,
    bus: NotificationBus,
    timing: Timing,
) where
    T: AsyncConnector,
{
    let wait = ms(timing.publish_wait_ms);

    while handle.wait_enabled().await {
        if !transport.is_connected() {
            tokio::time::sleep(wait).await;
            continue;
        }

        let message = match tokio::time::timeout(wait, outbound.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                log::info!("outbound channel closed, publisher exiting");
                return;
            }
            Err(_) => continue,
        };

        if let Err(e) = transport.send(&message).await {
            log::warn!("publish to {} failed: {}", message.topic, e);
            bus.post(Notification::TRANSPORT_DISCONNECTED);
        }
    }
}

/// Health checks on their own schedule
pub async fn health<C, H>(mut handle: WorkerHandle, clock: C, mut check: HealthCheck<H>)
where
    C: TimeSource,
    H: HealthSender,
{
    let mut pacer = Pacer::new(HEALTH_POLL_MS);

    while pacer.ready(&mut handle).await {
        // Failures are logged by the check and retried next poll
        let _ = check.tick(clock.now());
    }
}

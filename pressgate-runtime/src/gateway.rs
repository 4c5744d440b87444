//! Gateway wiring
//!
//! [`run_gateway`] builds one instance of the pipeline and runs it next to
//! the supervisor until the supervisor asks for a restart:
//!
//! ```text
//! reader ─[Reading; 300]→ telemetry ─[Event; 10]→ formatter ─[OutboundMessage]→ publisher
//!                                                     health ─────────┘
//! ```
//!
//! The two rings are locals of this future and the workers borrow their
//! halves, so a restart drops every stage together with its channels.

use pressgate_connectors::{
    outbound_channel, AsyncConnector, HealthCheck, HealthSender, JsonEncoder, QueueSender,
};
use pressgate_core::constants::READING_QUEUE_SIZE;
use pressgate_core::{
    EventChannel, MessageBatcher, Reading, ReadingSource, RingChannel, SampleAcquirer,
    SignalPipeline, TimeSource, Worker,
};

use crate::clock::TokioClock;
use crate::config::RuntimeConfig;
use crate::supervisor::{Exit, Supervisor};
use crate::workers;
use crate::RuntimeError;

/// Health check transport; `None` sends checks through the outbound channel
pub type HealthTransport = Option<Box<dyn HealthSender + Send>>;

/// Run the pipeline and the supervisor until the next restart
pub async fn run_gateway<S, T>(
    config: &RuntimeConfig,
    supervisor: &Supervisor,
    clock: TokioClock,
    source: S,
    transport: T,
    health: HealthTransport,
) -> Result<Exit, RuntimeError>
where
    S: ReadingSource,
    T: AsyncConnector,
{
    config.validate()?;

    let pipeline: SignalPipeline = SignalPipeline::new(config.signal)?;
    let acquirer = SampleAcquirer::new(source, config.validation);
    let batcher: MessageBatcher = MessageBatcher::new(&config.batch, clock.now());
    let encoder = JsonEncoder::new(config.payload.clone());

    let readings: RingChannel<Reading, READING_QUEUE_SIZE> = RingChannel::new();
    let events: EventChannel = EventChannel::new();
    let (reading_tx, reading_rx) = readings.split().ok_or(RuntimeError::ChannelTaken("readings"))?;
    let (event_tx, event_rx) = events.split().ok_or(RuntimeError::ChannelTaken("events"))?;
    let (outbound_tx, outbound_rx) = outbound_channel(config.outbound_capacity());

    let health_sender: Box<dyn HealthSender + Send> = match health {
        Some(sender) => sender,
        None => Box::new(QueueSender::new(outbound_tx.clone(), &config.payload)),
    };
    let health_check = HealthCheck::new(health_sender, config.timing.healthcheck_interval_ms);

    let bus = supervisor.bus().clone();
    let timing = config.timing;

    log::info!(
        "gateway {} starting, events to {}",
        config.payload.device_id,
        encoder.topic()
    );

    let workers = async {
        tokio::join!(
            workers::reader(
                supervisor.handle(Worker::Reader),
                clock,
                acquirer,
                reading_tx,
                bus.clone(),
                timing,
            ),
            workers::telemetry(
                supervisor.handle(Worker::Telemetry),
                clock,
                pipeline,
                reading_rx,
                event_tx,
                bus.clone(),
                timing,
            ),
            workers::formatter(
                supervisor.handle(Worker::Formatter),
                clock,
                supervisor,
                batcher,
                event_rx,
                encoder,
                outbound_tx,
                timing,
            ),
            workers::publisher(
                supervisor.handle(Worker::TransportPublish),
                outbound_rx,
                transport,
                bus.clone(),
                timing,
            ),
            workers::health(supervisor.handle(Worker::TransportPublish), clock, health_check),
        );
    };

    tokio::select! {
        exit = supervisor.run() => Ok(exit),
        () = workers => {
            log::error!("all workers exited");
            Ok(Exit::Restart)
        }
    }
}

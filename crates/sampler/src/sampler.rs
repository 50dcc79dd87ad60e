//! Sampling Loop Implementation

use crate::config::SamplerConfig;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use chrono::Utc;
use ring_buffer::RingBuffer;
use sngcja5_protocol::{
    Measurement, RawFrame, RegisterBus, SensorError, BASE_REGISTER, DEVICE_ADDRESS, FRAME_LEN,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Buffer shared between the sampling loop and its consumers
pub type MeasurementBuffer = RingBuffer<Measurement>;

/// Counters describing the sampling loop's progress
#[derive(Debug, Default)]
pub struct SamplerStats {
    cycles: AtomicU64,
    samples: AtomicU64,
    transient_faults: AtomicU64,
}

impl SamplerStats {
    /// Cycles attempted, successful or not
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Measurements pushed into the buffer
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Cycles skipped because of a recoverable fault
    pub fn transient_faults(&self) -> u64 {
        self.transient_faults.load(Ordering::Relaxed)
    }
}

/// Result of a single sampling cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// A measurement was decoded and buffered
    Sampled,
    /// The cycle failed but sampling may continue
    Skipped(SensorError),
    /// The device is gone; sampling must stop
    Stopped(SensorError),
}

/// Sampling loop that owns the bus and feeds the measurement buffer
pub struct Sampler<B> {
    /// Exclusively owned; never shared with consumers
    bus: B,
    buffer: Arc<MeasurementBuffer>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    config: SamplerConfig,
    stats: Arc<SamplerStats>,
}

impl<B: RegisterBus + 'static> Sampler<B> {
    /// Create a sampler with an empty buffer of `config.buffer_capacity`,
    /// reporting faults through `tracing`
    pub fn new(bus: B, config: SamplerConfig) -> Self {
        Self {
            bus,
            buffer: Arc::new(MeasurementBuffer::new(config.buffer_capacity)),
            diagnostics: Arc::new(TracingSink),
            config,
            stats: Arc::new(SamplerStats::default()),
        }
    }

    /// Replace the diagnostics sink
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Buffer this sampler pushes into; consumers pop from a clone of it
    pub fn buffer(&self) -> Arc<MeasurementBuffer> {
        self.buffer.clone()
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        self.stats.clone()
    }

    fn read_measurement(&mut self) -> Result<Measurement, SensorError> {
        let bytes = self.bus.read_block(DEVICE_ADDRESS, BASE_REGISTER, FRAME_LEN)?;
        let frame = RawFrame::try_from(bytes.as_slice())?;
        Measurement::decode(&frame, Utc::now().timestamp())
    }

    /// Run one read/decode/push cycle without sleeping
    pub fn cycle(&mut self) -> CycleOutcome {
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        match self.read_measurement() {
            Ok(measurement) => {
                debug!(
                    "PM2.5 {:.3} {} at {}",
                    measurement.mass_density.pm2_5,
                    measurement.mass_density_unit.as_str(),
                    measurement.timestamp
                );
                // Bus I/O is finished before the buffer lock is taken
                self.buffer.push(measurement);
                self.stats.samples.fetch_add(1, Ordering::Relaxed);
                CycleOutcome::Sampled
            }
            Err(e) if e.is_fatal() => {
                self.diagnostics.fatal_fault(&e);
                CycleOutcome::Stopped(e)
            }
            Err(e) => {
                self.stats.transient_faults.fetch_add(1, Ordering::Relaxed);
                self.diagnostics.transient_fault(&e);
                CycleOutcome::Skipped(e)
            }
        }
    }

    /// Move the sampler onto a background thread
    pub fn spawn(self) -> SamplerHandle {
        let (stop_tx, stop_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let stats = self.stats.clone();

        let guard = RunningGuard(running.clone());
        let thread = std::thread::spawn(move || {
            let _guard = guard;
            self.run(stop_rx);
        });

        SamplerHandle {
            stop: Some(stop_tx),
            running,
            stats,
            thread: Some(thread),
        }
    }

    fn run(mut self, stop: Receiver<()>) {
        info!("Starting sampler on {}", self.bus.describe());
        let settle = self.config.settle_interval();

        loop {
            if let CycleOutcome::Stopped(_) = self.cycle() {
                break;
            }

            // The sensor refreshes once per settle interval; a stop request
            // or a dropped handle cuts the wait short.
            match stop.recv_timeout(settle) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(
            "Sampler stopped after {} cycles ({} samples)",
            self.stats.cycles(),
            self.stats.samples()
        );
    }
}

/// Clears the running flag when the sampling thread exits, even by panic
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Control handle for a spawned sampler
///
/// Dropping the handle asks the loop to stop but does not wait for it.
pub struct SamplerHandle {
    stop: Option<Sender<()>>,
    running: Arc<AtomicBool>,
    stats: Arc<SamplerStats>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Check if the loop is still sampling
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    /// Ask the loop to stop after its current cycle
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            info!("Stopping sampler");
            let _ = stop.send(());
        }
    }

    /// Stop the loop and wait for its thread to exit
    pub fn shutdown(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Sampler thread panicked");
            }
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoopSink;
    use sngcja5_protocol::MockBus;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn frame_with_pm1(raw_pm1: u32) -> [u8; FRAME_LEN] {
        let mut raw = [0u8; FRAME_LEN];
        raw[0..4].copy_from_slice(&raw_pm1.to_le_bytes());
        raw
    }

    fn fast_config() -> SamplerConfig {
        SamplerConfig {
            settle_interval_ms: 5,
            buffer_capacity: 20,
        }
    }

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        done()
    }

    #[derive(Default)]
    struct RecordingSink {
        transient: Mutex<Vec<String>>,
        fatal: Mutex<Vec<String>>,
    }

    impl DiagnosticsSink for RecordingSink {
        fn transient_fault(&self, err: &SensorError) {
            self.transient.lock().unwrap().push(err.to_string());
        }

        fn fatal_fault(&self, err: &SensorError) {
            self.fatal.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_successful_cycle_pushes_measurement() {
        let mut sampler = Sampler::new(MockBus::new(frame_with_pm1(1000)), fast_config());
        let buffer = sampler.buffer();

        assert!(matches!(sampler.cycle(), CycleOutcome::Sampled));
        let measurement = buffer.pop_latest().unwrap();
        assert_eq!(measurement.mass_density.pm1_0, 1.0);
        assert!(measurement.timestamp > 0);
        assert_eq!(sampler.stats().samples(), 1);
    }

    #[test]
    fn test_transient_fault_skips_cycle() {
        let sink = Arc::new(RecordingSink::default());
        let bus = MockBus::new(frame_with_pm1(1000)).then_error(SensorError::Transient("nack".to_string()));
        let mut sampler = Sampler::new(bus, fast_config()).with_diagnostics(sink.clone());
        let buffer = sampler.buffer();

        assert!(matches!(sampler.cycle(), CycleOutcome::Skipped(SensorError::Transient(_))));
        assert!(buffer.is_empty());
        assert_eq!(sink.transient.lock().unwrap().len(), 1);

        assert!(matches!(sampler.cycle(), CycleOutcome::Sampled));
        assert_eq!(buffer.len(), 1);
        assert_eq!(sampler.stats().transient_faults(), 1);
    }

    #[test]
    fn test_short_frame_is_treated_as_transient() {
        let bus = MockBus::new(frame_with_pm1(1000)).then_bytes(vec![0; 11]);
        let mut sampler = Sampler::new(bus, fast_config()).with_diagnostics(Arc::new(NoopSink));
        let buffer = sampler.buffer();

        assert!(matches!(
            sampler.cycle(),
            CycleOutcome::Skipped(SensorError::MalformedFrame { actual: 11, .. })
        ));
        assert!(buffer.is_empty());
        assert!(matches!(sampler.cycle(), CycleOutcome::Sampled));
    }

    #[test]
    fn test_transport_error_stops_cycle() {
        let sink = Arc::new(RecordingSink::default());
        let bus = MockBus::new(frame_with_pm1(1000)).then_error(SensorError::Transport("ENODEV".to_string()));
        let mut sampler = Sampler::new(bus, fast_config()).with_diagnostics(sink.clone());
        let buffer = sampler.buffer();

        assert!(matches!(sampler.cycle(), CycleOutcome::Stopped(_)));
        assert!(buffer.is_empty());
        assert_eq!(sink.fatal.lock().unwrap().len(), 1);
        assert!(sink.transient.lock().unwrap().is_empty());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_unacknowledged_read_stops_cycle() {
        let lost = std::io::Error::from_raw_os_error(libc::EREMOTEIO);
        let bus = MockBus::new(frame_with_pm1(1000)).then_error(SensorError::from(lost));
        let mut sampler = Sampler::new(bus, fast_config()).with_diagnostics(Arc::new(NoopSink));

        assert!(matches!(sampler.cycle(), CycleOutcome::Stopped(SensorError::Transport(_))));
        assert!(sampler.buffer().is_empty());
        assert_eq!(sampler.stats().transient_faults(), 0);
    }

    #[test]
    fn test_buffer_capacity_comes_from_config() {
        let config = SamplerConfig {
            settle_interval_ms: 5,
            buffer_capacity: 3,
        };
        let mut sampler = Sampler::new(MockBus::new(frame_with_pm1(1000)), config);
        for _ in 0..5 {
            assert!(matches!(sampler.cycle(), CycleOutcome::Sampled));
        }

        let buffer = sampler.buffer();
        assert_eq!(buffer.capacity(), 3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.evicted(), 2);
    }

    #[test]
    fn test_spawned_loop_stops_on_transport_error() {
        let bus = MockBus::new(frame_with_pm1(1000))
            .then_bytes(frame_with_pm1(2000).to_vec())
            .then_error(SensorError::Transport("device vanished".to_string()));
        let reads = bus.read_counter();

        let sampler = Sampler::new(bus, fast_config()).with_diagnostics(Arc::new(NoopSink));
        let buffer = sampler.buffer();
        let handle = sampler.spawn();

        assert!(wait_until(Duration::from_secs(2), || !handle.is_running()));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.len(), 1);

        // No further reads once stopped
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(handle.stats().cycles(), 2);
        handle.shutdown();
    }

    #[test]
    fn test_spawned_loop_recovers_from_transient_error() {
        let bus = MockBus::new(frame_with_pm1(1000)).then_error(SensorError::Transient("timeout".to_string()));

        let sampler = Sampler::new(bus, fast_config()).with_diagnostics(Arc::new(NoopSink));
        let buffer = sampler.buffer();
        let handle = sampler.spawn();

        assert!(wait_until(Duration::from_secs(2), || buffer.len() >= 3));
        assert!(handle.is_running());
        assert_eq!(handle.stats().transient_faults(), 1);
        handle.shutdown();
    }

    #[test]
    fn test_shutdown_interrupts_settle_sleep() {
        let config = SamplerConfig {
            settle_interval_ms: 60_000,
            buffer_capacity: 20,
        };
        let sampler = Sampler::new(MockBus::new(frame_with_pm1(1000)), config);
        let buffer = sampler.buffer();
        let handle = sampler.spawn();

        assert!(wait_until(Duration::from_secs(2), || buffer.len() == 1));
        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_dropping_handle_stops_loop() {
        let bus = MockBus::new(frame_with_pm1(1000));
        let reads = bus.read_counter();
        let handle = Sampler::new(bus, fast_config()).spawn();

        assert!(wait_until(Duration::from_secs(2), || reads.load(Ordering::SeqCst) >= 1));
        drop(handle);
        std::thread::sleep(Duration::from_millis(30));
        let after_drop = reads.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(reads.load(Ordering::SeqCst), after_drop);
    }
}

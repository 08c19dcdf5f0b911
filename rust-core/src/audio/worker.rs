//! Listening loop
//!
//! Drains whole blocks from the sample queue into the session on a dedicated
//! thread. Owns every resource acquired for a listening run (queue consumer,
//! processing thread and, with the `capture` feature, the input stream).
//!
//! When the listening deadline expires the thread stops the session and
//! closes the queue, after which the capture callback pushes nothing.
//! `is_running` turns false at that point; the input stream itself is
//! released when the owner calls `stop` or drops the worker.
//!
//! A worker only ever stops the listening run it started, so a stale worker
//! cannot end a newer run on the same session.

use super::buffer::{SampleConsumer, SampleProducer, SampleQueue};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::session::AnalysisSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(feature = "capture")]
use super::input::AudioInput;

/// Idle poll interval when less than a block is queued
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Background analysis run for one listening session
pub struct ListeningWorker {
    session: Arc<AnalysisSession>,
    run: u64,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    #[cfg(feature = "capture")]
    input: Option<AudioInput>,
}

impl ListeningWorker {
    /// Start the session and spawn the processing thread
    ///
    /// # Arguments
    /// * `session` - Session to drive; must be idle
    /// * `consumer` - Consumer end of the capture queue
    /// * `sample_rate` - Sample rate of the queued samples in Hz
    /// * `block_length` - Samples per analysis block
    /// * `max_duration` - Stop automatically after this long
    pub fn spawn(
        session: Arc<AnalysisSession>,
        consumer: SampleConsumer,
        sample_rate: f64,
        block_length: usize,
        max_duration: Option<Duration>,
    ) -> Result<Self> {
        let run = session.start(sample_rate, block_length)?;

        let running = Arc::new(AtomicBool::new(true));
        let deadline = max_duration.and_then(|d| {
            let deadline = Instant::now().checked_add(d);
            if deadline.is_none() {
                log::warn!("Listening limit of {:?} is out of range, ignoring it", d);
            }
            deadline
        });

        let thread_session = Arc::clone(&session);
        let thread_running = Arc::clone(&running);

        let spawned = thread::Builder::new()
            .name("hive-analysis".to_string())
            .spawn(move || {
                let mut consumer = consumer;
                run_analysis_loop(
                    &thread_session,
                    run,
                    &mut consumer,
                    &thread_running,
                    block_length,
                    deadline,
                );
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                session.stop_run(run);
                return Err(AnalysisError::Spawn(e.to_string()));
            }
        };

        log::info!(
            "Analysis worker started{}",
            max_duration
                .map(|d| format!(", stopping after {:.1} s", d.as_secs_f64()))
                .unwrap_or_default()
        );

        Ok(Self {
            session,
            run,
            running,
            handle: Some(handle),
            #[cfg(feature = "capture")]
            input: None,
        })
    }

    /// Spawn a worker fed through a fresh queue sized from `config`
    ///
    /// Returns the producer end for the capture collaborator.
    pub fn with_queue(
        session: Arc<AnalysisSession>,
        config: &AnalysisConfig,
    ) -> Result<(Self, SampleProducer)> {
        config.validate()?;

        let queue = SampleQueue::with_blocks(config.block_length, config.queue_capacity_blocks);
        let (producer, consumer) = queue.split();

        let worker = Self::spawn(
            session,
            consumer,
            config.sample_rate,
            config.block_length,
            config.max_listen_duration(),
        )?;

        Ok((worker, producer))
    }

    /// Listen on the default input device
    ///
    /// The sample rate is taken from the device; the stream is released when
    /// the worker stops or if startup fails.
    #[cfg(feature = "capture")]
    pub fn from_default_device(
        session: Arc<AnalysisSession>,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        config.validate()?;

        let queue = SampleQueue::with_blocks(config.block_length, config.queue_capacity_blocks);
        let (producer, consumer) = queue.split();

        let input = AudioInput::from_default_device(producer)?;
        let sample_rate = input.device_info().sample_rate as f64;
        input.start()?;

        let mut worker = Self::spawn(
            session,
            consumer,
            sample_rate,
            config.block_length,
            config.max_listen_duration(),
        )?;
        worker.input = Some(input);

        Ok(worker)
    }

    /// Whether the processing thread is still running
    ///
    /// False once the deadline expired or the session was stopped elsewhere;
    /// the owner should then drop or `stop` the worker to release capture.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &Arc<AnalysisSession> {
        &self.session
    }

    /// Stop processing, join the thread and release the capture stream
    ///
    /// The session ends up idle with its last snapshot retained, unless a
    /// newer run has been started on it, which is left untouched.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Analysis thread panicked");
            }
        }

        #[cfg(feature = "capture")]
        if let Some(input) = self.input.take() {
            if let Err(e) = input.pause() {
                log::warn!("{}", e);
            }
        }

        self.session.stop_run(self.run);
    }
}

impl Drop for ListeningWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Processing loop; always ends its own listening run and closes the queue
fn run_analysis_loop(
    session: &AnalysisSession,
    run: u64,
    consumer: &mut SampleConsumer,
    running: &AtomicBool,
    block_length: usize,
    deadline: Option<Instant>,
) {
    let mut block = vec![0.0; block_length];
    let mut reported_drops = 0;

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::info!("Listening time elapsed");
            break;
        }

        let dropped = consumer.dropped_samples();
        if dropped > reported_drops {
            log::warn!(
                "Sample queue overflowed, {} samples dropped so far",
                dropped
            );
            reported_drops = dropped;
        }

        if !consumer.pop_block(&mut block) {
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        match session.submit_block_to_run(run, &block) {
            Ok(_) => {}
            Err(AnalysisError::NotListening) => {
                log::debug!("Session stopped externally");
                break;
            }
            Err(e) => log::warn!("Block skipped: {}", e),
        }
    }

    consumer.close();
    session.stop_run(run);
    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Status;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.5 * (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    fn config(max_listen_secs: Option<f64>) -> AnalysisConfig {
        AnalysisConfig {
            max_listen_secs,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_worker_processes_queued_blocks() {
        let _ = env_logger::builder().is_test(true).try_init();

        let session = Arc::new(AnalysisSession::with_defaults());
        let (mut worker, mut producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();
        assert!(session.is_listening());

        let block = sine(900.0, 44100.0, 1024);
        for _ in 0..3 {
            assert_eq!(producer.push(&block), 1024);
        }

        assert!(wait_until(Duration::from_secs(5), || session.blocks_processed() >= 3));
        worker.stop();

        assert!(!worker.is_running());
        assert!(!session.is_listening());
        let snapshot = session.latest_snapshot().unwrap();
        assert_eq!(snapshot.status, Status::Critical);
        assert_eq!(snapshot.block_index, 2);
    }

    #[test]
    fn test_chunks_are_reassembled_into_blocks() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let (mut worker, mut producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();

        // Callback-sized chunks that do not line up with block boundaries
        let signal = sine(260.0, 44100.0, 2048);
        for chunk in signal.chunks(300) {
            producer.push(chunk);
        }

        assert!(wait_until(Duration::from_secs(5), || session.blocks_processed() >= 2));
        worker.stop();

        assert_eq!(session.latest_snapshot().unwrap().status, Status::Normal);
    }

    #[test]
    fn test_deadline_stops_session() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let (worker, mut producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(Some(0.5))).unwrap();

        producer.push(&sine(900.0, 44100.0, 1024));
        assert!(wait_until(Duration::from_secs(5), || session.blocks_processed() >= 1));

        assert!(wait_until(Duration::from_secs(5), || !worker.is_running()));
        assert!(!session.is_listening());

        // The deadline stop keeps the last reading
        let snapshot = session.latest_snapshot().unwrap();
        assert_eq!(snapshot.status, Status::Critical);
        assert_eq!(snapshot.block_index, 0);

        // Capture side is told to stop sending
        assert!(!producer.is_open());
        assert_eq!(producer.push(&sine(900.0, 44100.0, 1024)), 0);
        assert_eq!(producer.dropped_samples(), 0);
    }

    #[test]
    fn test_stale_worker_leaves_new_run_alone() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let (stale, _stale_producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(Some(0.02))).unwrap();
        assert!(wait_until(Duration::from_secs(5), || !stale.is_running()));

        let (mut current, mut producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();
        drop(stale);

        assert!(session.is_listening());
        assert!(current.is_running());

        producer.push(&sine(260.0, 44100.0, 1024));
        assert!(wait_until(Duration::from_secs(5), || session.blocks_processed() >= 1));

        current.stop();
        assert!(!session.is_listening());
    }

    #[test]
    fn test_restarted_session_outlives_old_thread() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let (mut old, mut old_producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();

        // Someone else stops and restarts the session under the worker
        session.stop();
        session.start(44100.0, 1024).unwrap();

        // The old thread must not feed or stop the new run
        old_producer.push(&sine(900.0, 44100.0, 1024));
        assert!(wait_until(Duration::from_secs(5), || !old.is_running()));
        old.stop();

        assert!(session.is_listening());
        assert_eq!(session.blocks_processed(), 0);
        session.stop();
    }

    #[test]
    fn test_out_of_range_limit_runs_unbounded() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let (tx, rx) = SampleQueue::new(1024).split();
        drop(tx);

        let mut worker = ListeningWorker::spawn(
            Arc::clone(&session),
            rx,
            44100.0,
            1024,
            Some(Duration::MAX),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(worker.is_running());
        worker.stop();
        assert!(!session.is_listening());
    }

    #[test]
    fn test_huge_listen_limit_is_rejected() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let result = ListeningWorker::with_queue(Arc::clone(&session), &config(Some(1e30)));

        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
        assert!(!session.is_listening());
    }

    #[test]
    fn test_external_stop_ends_worker() {
        let session = Arc::new(AnalysisSession::with_defaults());
        let (worker, mut producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();

        session.stop();
        producer.push(&sine(260.0, 44100.0, 1024));

        assert!(wait_until(Duration::from_secs(5), || !worker.is_running()));
    }

    #[test]
    fn test_drop_releases_session() {
        let session = Arc::new(AnalysisSession::with_defaults());
        {
            let (_worker, _producer) =
                ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();
            assert!(session.is_listening());
        }
        assert!(!session.is_listening());

        // The session can be started again once the worker is gone
        let (mut worker, _producer) =
            ListeningWorker::with_queue(Arc::clone(&session), &config(None)).unwrap();
        assert!(Arc::ptr_eq(worker.session(), &session));
        worker.stop();
    }

    #[test]
    fn test_busy_session_is_rejected() {
        let session = Arc::new(AnalysisSession::with_defaults());
        session.start(44100.0, 1024).unwrap();

        let result = ListeningWorker::with_queue(Arc::clone(&session), &config(None));
        assert!(matches!(result, Err(AnalysisError::AlreadyListening)));
        assert!(session.is_listening());
    }
}

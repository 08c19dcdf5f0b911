//! Session controller
//!
//! Owns the per-session analysis resources and drives windowing, transform,
//! feature extraction and classification once per submitted block.
//!
//! `submit_block` and `stop` serialize on one mutex, so a stop issued while a
//! block is in flight waits for that block's snapshot to be published. The
//! snapshot itself lives in an `ArcSwapOption`: readers never block and always
//! see either the previous or the next complete snapshot.

pub mod snapshot;

pub use snapshot::{AnalysisSnapshot, SampleBlock, SessionState};

use crate::classify::Classifier;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::features::{extract, BandDefinition};
use crate::spectrum::{AnalyzerConfig, SpectrumAnalyzer, WindowType};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Resources held only while listening
struct Listening {
    analyzer: SpectrumAnalyzer,
}

struct SessionInner {
    listening: Option<Listening>,
    sample_rate: f64,
    block_length: usize,
    blocks_processed: u64,

    /// Incremented by every successful `start`
    run: u64,
}

/// Idle/Listening state machine around the analysis pipeline
pub struct AnalysisSession {
    bands: Vec<BandDefinition>,
    window: WindowType,
    classifier: Classifier,
    inner: Mutex<SessionInner>,
    is_listening: AtomicBool,
    latest: ArcSwapOption<AnalysisSnapshot>,
}

impl AnalysisSession {
    /// Create an idle session; fails if the configuration is invalid
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Session with the default band, status and problem tables
    pub fn with_defaults() -> Self {
        Self::from_validated(AnalysisConfig::default())
    }

    fn from_validated(config: AnalysisConfig) -> Self {
        let classifier = config.classifier();
        Self {
            bands: config.bands,
            window: config.window,
            classifier,
            inner: Mutex::new(SessionInner {
                listening: None,
                sample_rate: config.sample_rate,
                block_length: config.block_length,
                blocks_processed: 0,
                run: 0,
            }),
            is_listening: AtomicBool::new(false),
            latest: ArcSwapOption::empty(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle -> Listening
    ///
    /// Allocates the analyzer for `block_length` and clears the previous
    /// snapshot. Fails with `AlreadyListening` unless idle.
    ///
    /// # Returns
    /// Identifier of the new listening run, for use with `stop_run`
    pub fn start(&self, sample_rate: f64, block_length: usize) -> Result<u64> {
        let mut inner = self.lock();
        if inner.listening.is_some() {
            return Err(AnalysisError::AlreadyListening);
        }

        let analyzer = SpectrumAnalyzer::new(AnalyzerConfig {
            block_length,
            window_type: self.window,
            sample_rate,
        })?;

        let fft_size = block_length;
        for band in &self.bands {
            if band.bin_range(sample_rate, fft_size, fft_size / 2).is_none() {
                log::warn!(
                    "Band '{}' [{}, {}] Hz cannot be resolved at {} Hz / {} samples; it will be omitted",
                    band.name,
                    band.low_hz,
                    band.high_hz,
                    sample_rate,
                    block_length
                );
            }
        }

        self.latest.store(None);
        inner.listening = Some(Listening { analyzer });
        inner.sample_rate = sample_rate;
        inner.block_length = block_length;
        inner.blocks_processed = 0;
        inner.run += 1;
        self.is_listening.store(true, Ordering::SeqCst);

        log::info!(
            "Listening at {} Hz, {} samples per block ({:.1} ms)",
            sample_rate,
            block_length,
            block_length as f64 * 1000.0 / sample_rate
        );
        Ok(inner.run)
    }

    /// Run the full pipeline on one block and publish its snapshot
    ///
    /// A rejected block leaves the session listening.
    pub fn submit_block(&self, samples: &[f64]) -> Result<Arc<AnalysisSnapshot>> {
        let mut inner = self.lock();
        self.process_locked(&mut inner, samples)
    }

    /// Like `submit_block`, but only into listening run `run`
    ///
    /// Fails with `NotListening` once that run has been stopped, even if a
    /// newer run has started since.
    pub fn submit_block_to_run(&self, run: u64, samples: &[f64]) -> Result<Arc<AnalysisSnapshot>> {
        let mut inner = self.lock();
        if inner.run != run {
            return Err(AnalysisError::NotListening);
        }
        self.process_locked(&mut inner, samples)
    }

    /// Like `submit_block`, also checking the block's sample rate
    pub fn submit(&self, block: &SampleBlock) -> Result<Arc<AnalysisSnapshot>> {
        let mut inner = self.lock();
        if inner.listening.is_some() && block.sample_rate != inner.sample_rate {
            log::warn!(
                "Rejected block at {} Hz, session runs at {} Hz",
                block.sample_rate,
                inner.sample_rate
            );
            return Err(AnalysisError::InvalidSampleRate(block.sample_rate));
        }
        self.process_locked(&mut inner, &block.samples)
    }

    fn process_locked(&self, inner: &mut SessionInner, samples: &[f64]) -> Result<Arc<AnalysisSnapshot>> {
        let listening = inner.listening.as_mut().ok_or(AnalysisError::NotListening)?;

        let frame = listening.analyzer.analyze(samples).map_err(|e| {
            log::warn!("Rejected block: {}", e);
            e
        })?;

        let features = extract(&frame, &self.bands);
        let classification = self
            .classifier
            .classify(features.dominant_frequency_hz, &features.band_energies_db);

        let snapshot = Arc::new(AnalysisSnapshot {
            dominant_frequency_hz: features.dominant_frequency_hz,
            band_energies_db: features.band_energies_db,
            status: classification.status,
            problem: classification.problem,
            block_index: inner.blocks_processed,
        });
        inner.blocks_processed += 1;

        log::debug!(
            "Block {}: {:.1} Hz, {}{}",
            snapshot.block_index,
            snapshot.dominant_frequency_hz,
            snapshot.status,
            snapshot
                .problem
                .as_deref()
                .map(|p| format!(" ({})", p))
                .unwrap_or_default()
        );

        self.latest.store(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    /// Listening -> Idle; idempotent, keeps the latest snapshot
    ///
    /// Waits for an in-flight block to finish before releasing the analyzer.
    pub fn stop(&self) {
        let mut inner = self.lock();
        self.stop_locked(&mut inner);
    }

    /// Stop only if listening run `run` is still the active one
    ///
    /// Returns whether the session was stopped. A later run started by
    /// someone else is left alone.
    pub fn stop_run(&self, run: u64) -> bool {
        let mut inner = self.lock();
        if inner.run != run {
            return false;
        }
        self.stop_locked(&mut inner)
    }

    fn stop_locked(&self, inner: &mut SessionInner) -> bool {
        if inner.listening.take().is_none() {
            return false;
        }
        self.is_listening.store(false, Ordering::SeqCst);
        log::info!("Stopped listening after {} blocks", inner.blocks_processed);
        true
    }

    /// Most recent snapshot; never blocks
    pub fn latest_snapshot(&self) -> Option<Arc<AnalysisSnapshot>> {
        self.latest.load_full()
    }

    /// Drop the retained snapshot
    pub fn reset_snapshot(&self) {
        self.latest.store(None);
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening.load(Ordering::SeqCst)
    }

    /// Blocks processed in the current or most recent session
    pub fn blocks_processed(&self) -> u64 {
        self.lock().blocks_processed
    }

    pub fn state(&self) -> SessionState {
        let inner = self.lock();
        SessionState {
            is_listening: inner.listening.is_some(),
            sample_rate: inner.sample_rate,
            block_length: inner.block_length,
            latest_snapshot: self.latest.load_full(),
        }
    }

    pub fn bands(&self) -> &[BandDefinition] {
        &self.bands
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

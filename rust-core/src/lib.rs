//! Hive Acoustics - Beehive Sound Analysis Core
//!
//! Turns blocks of microphone samples into a colony health reading:
//! windowing, FFT power spectrum, dominant frequency and band energies,
//! then a rule-based status with an optional problem annotation. The
//! [`AnalysisSession`] drives the pipeline and publishes the latest
//! [`AnalysisSnapshot`]; [`ListeningWorker`] runs it on a background thread
//! with a bounded listening time.

pub mod audio;
pub mod classify;
pub mod config;
pub mod error;
pub mod features;
pub mod session;
pub mod spectrum;

pub use audio::{ListeningWorker, SampleQueue};
pub use classify::{Classification, Classifier, Status};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use features::{BandDefinition, BandEnergies, Features};
pub use session::{AnalysisSession, AnalysisSnapshot, SampleBlock, SessionState};
pub use spectrum::{SpectrumFrame, WindowType};

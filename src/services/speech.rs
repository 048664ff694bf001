//! Text-to-speech playback.
//!
//! [`Narrator`] owns the single playback slot: starting a new utterance
//! aborts the one in flight, and the completion callback only runs when an
//! utterance finishes on its own. Backends do the actual talking.

use crate::metrics::Metrics;
use crate::models::SpeechSettings;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Errors from a speech backend
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Failed to run speech program {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Speech program exited unsuccessfully (code {0:?})")]
    ExitStatus(Option<i32>),

    #[error("Speech timed out after {0:?}")]
    Timeout(Duration),
}

pub type SpeechFuture = Pin<Box<dyn Future<Output = Result<(), SpeechError>> + Send>>;

/// One fully resolved utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub rate: u32,
    pub pitch: u32,
    pub volume: u32,
}

/// Something that can say a [`SpeechRequest`] out loud.
///
/// The returned future resolves when playback is over. Dropping it must stop
/// playback.
pub trait SpeechBackend: Send + Sync {
    fn speak(&self, request: SpeechRequest) -> SpeechFuture;
}

/// Per-call overrides for [`Narrator::speak`].
#[derive(Default)]
pub struct SpeakOptions {
    pub rate: Option<u32>,
    pub pitch: Option<u32>,
    pub volume: Option<u32>,
    pub on_end: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl SpeakOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(mut self, rate: u32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn pitch(mut self, pitch: u32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn volume(mut self, volume: u32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Run `f` once the utterance finishes naturally.
    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_end = Some(Box::new(f));
        self
    }
}

/// Runs an external TTS program such as `espeak`.
///
/// Invoked as `<program> <extra args> -s <rate> -p <pitch> -a <volume> <text>`.
#[derive(Debug, Clone)]
pub struct CommandSpeechBackend {
    program: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl CommandSpeechBackend {
    pub fn new(program: impl Into<String>, extra_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            extra_args,
            timeout,
        }
    }

    pub fn from_settings(settings: &SpeechSettings) -> Self {
        Self::new(
            settings.program.clone(),
            settings.extra_args.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn build_command(&self, request: &SpeechRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.extra_args)
            .arg("-s")
            .arg(request.rate.to_string())
            .arg("-p")
            .arg(request.pitch.to_string())
            .arg("-a")
            .arg(request.volume.to_string())
            .arg(&request.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl SpeechBackend for CommandSpeechBackend {
    fn speak(&self, request: SpeechRequest) -> SpeechFuture {
        let mut command = self.build_command(&request);
        let program = self.program.clone();
        let limit = self.timeout;

        Box::pin(async move {
            let mut child = command.spawn().map_err(|source| SpeechError::Spawn {
                program: program.clone(),
                source,
            })?;

            // Dropping the child on timeout kills it
            let status = timeout(limit, child.wait())
                .await
                .map_err(|_| SpeechError::Timeout(limit))?
                .map_err(|source| SpeechError::Spawn { program, source })?;

            if status.success() {
                Ok(())
            } else {
                Err(SpeechError::ExitStatus(status.code()))
            }
        })
    }
}

/// Single-slot speech player.
pub struct Narrator {
    backend: Arc<dyn SpeechBackend>,
    settings: SpeechSettings,
    runtime: Handle,
    current: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<Metrics>,
}

impl Narrator {
    pub fn new(backend: Arc<dyn SpeechBackend>, settings: SpeechSettings, runtime: Handle) -> Self {
        Self {
            backend,
            settings,
            runtime,
            current: Mutex::new(None),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start saying `text`, replacing anything currently being said.
    ///
    /// Returns immediately. Does nothing when speech is disabled.
    pub fn speak(&self, text: &str, options: SpeakOptions) {
        if !self.settings.enabled {
            tracing::debug!("Speech disabled, not speaking {:?}", text);
            return;
        }

        let request = SpeechRequest {
            text: text.to_string(),
            rate: options.rate.unwrap_or(self.settings.rate),
            pitch: options.pitch.unwrap_or(self.settings.pitch),
            volume: options.volume.unwrap_or(self.settings.volume),
        };
        let on_end = options.on_end;
        self.metrics.record_speech_request();

        let mut current = self.lock_current();
        if let Some(previous) = current.take() {
            if !previous.is_finished() {
                tracing::debug!("Cancelling previous utterance");
            }
            previous.abort();
        }

        let playback = self.backend.speak(request);
        let metrics = Arc::clone(&self.metrics);
        let spoken = text.to_string();
        *current = Some(self.runtime.spawn(async move {
            match playback.await {
                Ok(()) => {
                    metrics.record_speech_completed();
                    if let Some(callback) = on_end {
                        callback();
                    }
                }
                Err(e) => {
                    metrics.record_speech_failed();
                    tracing::warn!("Could not speak {:?}: {}", spoken, e);
                }
            }
        }));
    }

    /// Cancel the utterance in flight, if any. Its `on_end` never runs.
    pub fn stop(&self) {
        if let Some(handle) = self.lock_current().take() {
            handle.abort();
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.lock_current()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.stop();
    }
}

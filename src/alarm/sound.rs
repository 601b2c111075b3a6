//! Looping alarm sound playback via cpal.
//!
//! The notifier owns at most one [`ActiveSound`] per firing. Playback
//! runs on a dedicated worker thread: the sound file is decoded with
//! symphonia, then looped through a cpal output stream until stopped.
//! The worker reports readiness (or failure) once, asynchronously,
//! through the handle; dropping the handle releases the stream.

use crate::error::{Result, SchedulerError};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Seam between the notifier and the audio backend. The production
/// implementation is [`CpalSoundPlayer`]; tests substitute a stub.
pub trait SoundPlayer: Send + Sync + 'static {
    /// Begin infinite-repeat playback of the file at `path` on a worker
    /// thread.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::SoundUnavailable`] when the file is
    /// missing. Failures after the worker starts (decode error, no
    /// output device) are reported through [`ActiveSound::ready`].
    fn start(&self, path: &Path) -> Result<ActiveSound>;
}

/// Handle to one in-flight playback session.
///
/// Stopping is idempotent and also happens on drop, so the ringing
/// stream can never outlive its notifier.
#[derive(Debug)]
pub struct ActiveSound {
    ready_rx: Option<tokio::sync::oneshot::Receiver<std::result::Result<(), String>>>,
    stop_tx: crossbeam_channel::Sender<()>,
}

impl ActiveSound {
    /// Build a handle from its two signalling halves. Exposed for
    /// [`SoundPlayer`] implementations.
    #[must_use]
    pub fn new(
        ready_rx: tokio::sync::oneshot::Receiver<std::result::Result<(), String>>,
        stop_tx: crossbeam_channel::Sender<()>,
    ) -> Self {
        Self {
            ready_rx: Some(ready_rx),
            stop_tx,
        }
    }

    /// Wait until the worker reports that playback actually started.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::SoundUnavailable`] when the worker
    /// failed to initialize playback, or died without reporting.
    pub async fn ready(&mut self) -> Result<()> {
        let Some(rx) = self.ready_rx.take() else {
            return Ok(());
        };
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(msg)) => Err(SchedulerError::SoundUnavailable(msg)),
            Err(_) => Err(SchedulerError::SoundUnavailable(
                "playback worker exited before starting".to_owned(),
            )),
        }
    }

    /// Stop playback and release the output stream.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ActiveSound {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

/// Production [`SoundPlayer`] backed by the default cpal output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalSoundPlayer;

impl SoundPlayer for CpalSoundPlayer {
    fn start(&self, path: &Path) -> Result<ActiveSound> {
        if !path.exists() {
            return Err(SchedulerError::SoundUnavailable(format!(
                "sound file not found: {}",
                path.display()
            )));
        }

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let path = path.to_path_buf();

        std::thread::Builder::new()
            .name("alarm-sound".to_owned())
            .spawn(move || match run_loop_stream(&path, &stop_rx) {
                Ok(on_ready) => {
                    let _ = ready_tx.send(Ok(()));
                    on_ready();
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| {
                SchedulerError::SoundUnavailable(format!("cannot spawn playback worker: {e}"))
            })?;

        Ok(ActiveSound::new(ready_rx, stop_tx))
    }
}

/// Samples shared with the cpal output callback. The position wraps, so
/// playback repeats until the stream is dropped.
struct LoopBuffer {
    samples: Vec<f32>,
    position: usize,
}

/// Decode the file, build the looping output stream, and start it.
/// Returns a closure that parks the worker until the stop signal, then
/// releases the stream. Split this way so the ready signal is sent after
/// `play()` succeeded but before the worker blocks.
fn run_loop_stream(
    path: &Path,
    stop_rx: &crossbeam_channel::Receiver<()>,
) -> Result<impl FnOnce() + use<>> {
    let (samples, sample_rate) = decode_to_mono(path)?;
    if samples.is_empty() {
        return Err(SchedulerError::SoundUnavailable(format!(
            "sound file has no audio: {}",
            path.display()
        )));
    }

    let host = cpal::default_host();
    let device = host.default_output_device().ok_or_else(|| {
        SchedulerError::SoundUnavailable("no default output device".to_owned())
    })?;
    let device_name = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());
    info!("alarm playback on output device: {device_name}");

    let stream_config = StreamConfig {
        channels: 1,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(LoopBuffer {
        samples,
        position: 0,
    }));
    let buffer_clone = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match buffer_clone.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };
                for sample in data.iter_mut() {
                    *sample = buf.samples[buf.position];
                    buf.position = (buf.position + 1) % buf.samples.len();
                }
            },
            move |err| {
                error!("alarm output stream error: {err}");
            },
            None,
        )
        .map_err(|e| {
            SchedulerError::SoundUnavailable(format!("failed to build output stream: {e}"))
        })?;

    stream.play().map_err(|e| {
        SchedulerError::SoundUnavailable(format!("failed to start output stream: {e}"))
    })?;

    let stop_rx = stop_rx.clone();
    Ok(move || {
        // Any stop signal (or a dropped handle) ends the loop.
        let _ = stop_rx.recv();
        drop(stream);
        debug!("alarm playback stopped");
    })
}

/// Decode an audio file to mono f32 samples plus its sample rate.
fn decode_to_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path)
        .map_err(|e| SchedulerError::SoundUnavailable(format!("cannot open sound file: {e}")))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SchedulerError::SoundUnavailable(format!("failed to probe audio: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| SchedulerError::SoundUnavailable("no default audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| SchedulerError::SoundUnavailable("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| SchedulerError::SoundUnavailable(format!("failed to create decoder: {e}")))?;

    let mut out: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(e)) => {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    break;
                }
                return Err(SchedulerError::SoundUnavailable(format!(
                    "audio read error: {e}"
                )));
            }
            Err(e) => {
                return Err(SchedulerError::SoundUnavailable(format!(
                    "audio read error: {e}"
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(SchedulerError::SoundUnavailable(format!(
                    "audio decode error: {e}"
                )));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let frames = decoded.frames() as u64;

        let required = usize::try_from(frames)
            .unwrap_or(usize::MAX)
            .saturating_mul(channels);
        let needs_new = match sample_buf.as_ref() {
            Some(b) => b.capacity() < required,
            None => true,
        };
        if needs_new {
            sample_buf = Some(SampleBuffer::<f32>::new(frames, spec));
        } else if let Some(b) = sample_buf.as_mut() {
            b.clear();
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        if channels <= 1 {
            out.extend_from_slice(buf.samples());
        } else {
            for frame in buf.samples().chunks_exact(channels) {
                let sum: f32 = frame.iter().sum();
                out.push(sum / channels as f32);
            }
        }
    }

    Ok((out, sample_rate))
}

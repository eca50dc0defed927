use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::recorder::{RecorderTap, SegmentRecorder};
use crate::ring_buffer::PcmProducer;
use voxavatar_foundation::AudioError;
use voxavatar_telemetry::{PipelineMetrics, PipelineStage};

/// How long the capture stream may stay silent before a stall is reported.
const STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Negotiated input device parameters.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to the dedicated microphone thread.
///
/// The cpal stream lives on its own OS thread because streams are not
/// `Send`. The thread owns the device for the lifetime of the session
/// and fans captured samples out to two consumers: the analysis ring
/// buffer and the segment recorder tap. `stop()` releases the device
/// and quiesces both.
pub struct CaptureThread {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl CaptureThread {
    /// Open the requested (or default) input device and start capturing.
    ///
    /// Returns synchronously once the device is live, or with
    /// `PermissionDenied` / `DeviceUnavailable` when access cannot be
    /// granted — fatal to session start, never retried. Stream stalls
    /// and runtime stream errors are pushed on `error_tx`.
    pub fn spawn(
        device_name: Option<String>,
        producer: PcmProducer,
        error_tx: tokio::sync::mpsc::UnboundedSender<AudioError>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> Result<(Self, SegmentRecorder, DeviceInfo), AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let recorder_tap = Arc::new(RecorderTap::default());
        let recorder = SegmentRecorder::new(recorder_tap.clone(), running.clone());

        let (startup_tx, startup_rx) = crossbeam_channel::bounded(1);
        let thread_running = running.clone();
        let thread_tap = recorder_tap;

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                capture_thread_main(
                    device_name,
                    producer,
                    thread_tap,
                    error_tx,
                    metrics,
                    thread_running,
                    startup_tx,
                );
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn capture thread: {}", e)))?;

        let info = startup_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| AudioError::Fatal("Capture thread did not report startup".to_string()))?;

        match info {
            Ok(info) => {
                tracing::info!(
                    "Capture started on '{}' ({} Hz, {} ch)",
                    info.name,
                    info.sample_rate,
                    info.channels
                );
                Ok((Self { handle, running }, recorder, info))
            }
            Err(e) => {
                let _ = handle.join();
                Err(e)
            }
        }
    }

    /// Release the device. Both the analyzer feed and the recorder go quiet.
    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

#[allow(clippy::too_many_arguments)]
fn capture_thread_main(
    device_name: Option<String>,
    producer: PcmProducer,
    recorder_tap: Arc<RecorderTap>,
    error_tx: tokio::sync::mpsc::UnboundedSender<AudioError>,
    metrics: Option<Arc<PipelineMetrics>>,
    running: Arc<AtomicBool>,
    startup_tx: crossbeam_channel::Sender<Result<DeviceInfo, AudioError>>,
) {
    let opened = open_device(device_name.as_deref());
    let (device, config, sample_format, info) = match opened {
        Ok(parts) => parts,
        Err(e) => {
            running.store(false, Ordering::SeqCst);
            let _ = startup_tx.send(Err(e));
            return;
        }
    };

    let last_frame: Arc<RwLock<Instant>> = Arc::new(RwLock::new(Instant::now()));
    let stream = match build_stream(
        &device,
        &config,
        sample_format,
        producer,
        recorder_tap,
        error_tx.clone(),
        metrics,
        running.clone(),
        last_frame.clone(),
    ) {
        Ok(stream) => stream,
        Err(e) => {
            running.store(false, Ordering::SeqCst);
            let _ = startup_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        running.store(false, Ordering::SeqCst);
        let _ = startup_tx.send(Err(AudioError::PlayStream(e)));
        return;
    }

    let _ = startup_tx.send(Ok(info));

    // Supervise the stream: a silent device is reported once per stall,
    // not retried. Recovery policy is the session's call.
    let mut stall_reported = false;
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));

        let elapsed = last_frame.read().elapsed();
        if elapsed > STALL_TIMEOUT {
            if !stall_reported {
                tracing::error!("No audio data for {:?}", elapsed);
                let _ = error_tx.send(AudioError::NoDataTimeout { duration: elapsed });
                stall_reported = true;
            }
        } else {
            stall_reported = false;
        }
    }

    drop(stream);
    tracing::info!("Capture thread shutting down");
}

type OpenedDevice = (cpal::Device, StreamConfig, SampleFormat, DeviceInfo);

fn open_device(device_name: Option<&str>) -> Result<OpenedDevice, AudioError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|_| AudioError::DeviceUnavailable {
                name: Some(name.to_string()),
            })?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceUnavailable {
                name: Some(name.to_string()),
            })?,
        None => host
            .default_input_device()
            .ok_or(AudioError::DeviceUnavailable { name: None })?,
    };

    let default_config = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            AudioError::DeviceUnavailable { name: None }
        }
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => AudioError::FormatNotSupported {
            format: "default input stream".to_string(),
        },
        cpal::DefaultStreamConfigError::BackendSpecific { err }
            if err.description.to_lowercase().contains("permission") =>
        {
            AudioError::PermissionDenied
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            AudioError::Fatal(err.description)
        }
    })?;

    let sample_format = default_config.sample_format();
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    let info = DeviceInfo {
        name: device.name().unwrap_or_else(|_| "unknown".to_string()),
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    Ok((device, config, sample_format, info))
}

#[allow(clippy::too_many_arguments)]
fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    producer: PcmProducer,
    recorder_tap: Arc<RecorderTap>,
    error_tx: tokio::sync::mpsc::UnboundedSender<AudioError>,
    metrics: Option<Arc<PipelineMetrics>>,
    running: Arc<AtomicBool>,
    last_frame: Arc<RwLock<Instant>>,
) -> Result<cpal::Stream, AudioError> {
    let channels = config.channels as usize;
    let producer = Mutex::new(producer);
    let mut mono_buf: Vec<i16> = Vec::new();

    // Common path once samples are i16: downmix, fan out to the ring
    // buffer and the recorder tap, feed the stall detector.
    let mut handle_i16 = move |data: &[i16]| {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        *last_frame.write() = Instant::now();

        let mono: &[i16] = if channels <= 1 {
            data
        } else {
            mono_buf.clear();
            mono_buf.reserve(data.len() / channels);
            for frame in data.chunks_exact(channels) {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                mono_buf.push((sum / channels as i32) as i16);
            }
            &mono_buf
        };

        producer.lock().write(mono);
        recorder_tap.push_samples(mono);

        if let Some(m) = &metrics {
            m.frames_captured.fetch_add(1, Ordering::Relaxed);
            m.mark_stage_active(PipelineStage::Capture);
        }
    };

    let err_fn = move |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
        let _ = error_tx.send(AudioError::Stream(err));
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &_| handle_i16(data),
            err_fn,
            None,
        )?,
        SampleFormat::F32 => {
            let mut converted: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[f32], _: &_| {
                    converted.clear();
                    converted.reserve(data.len());
                    for &s in data {
                        converted.push((s.clamp(-1.0, 1.0) * 32767.0).round() as i16);
                    }
                    handle_i16(&converted);
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let mut converted: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[u16], _: &_| {
                    converted.clear();
                    converted.reserve(data.len());
                    for &s in data {
                        converted.push((s as i32 - 32768) as i16);
                    }
                    handle_i16(&converted);
                },
                err_fn,
                None,
            )?
        }
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", other),
            });
        }
    };

    Ok(stream)
}

#[cfg(test)]
mod downmix_tests {
    #[test]
    fn stereo_pairs_average_to_mono() {
        let data = [1000i16, -1000, 900, -900, 800, -800];
        let mono: Vec<i16> = data
            .chunks_exact(2)
            .map(|f| ((f[0] as i32 + f[1] as i32) / 2) as i16)
            .collect();
        assert_eq!(mono, vec![0, 0, 0]);
    }

    #[test]
    fn f32_to_i16_clamps_and_scales() {
        let src = [-1.5f32, -1.0, 0.0, 0.5, 1.0, 2.0];
        let out: Vec<i16> = src
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect();
        assert_eq!(out, vec![-32767, -32767, 0, 16384, 32767, 32767]);
    }
}

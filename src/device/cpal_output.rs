//! The system's default output through CPAL.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use rtrb::Consumer;
use tracing::{error, info, warn};

use super::{pull, Backend, OutputDevice, StreamConfig};
use crate::error::EngineError;

/// Opens the default output device of the default host.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for CpalBackend {
    fn open(&mut self) -> Result<Box<dyn OutputDevice>, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Unavailable("no default output device".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        let config = StreamConfig {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
        };
        info!(device = %name, sample_rate = config.sample_rate, channels = config.channels, "opened output device");

        Ok(Box::new(CpalDevice {
            device,
            supported,
            config,
            suspended: Arc::new(AtomicBool::new(false)),
            consumed: Arc::new(AtomicU64::new(0)),
            commands: None,
        }))
    }
}

enum Command {
    Play,
    Pause,
}

/// The stream itself is not `Send`, so it lives on its own thread and is
/// driven through a command channel.
struct CpalDevice {
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    config: StreamConfig,
    suspended: Arc<AtomicBool>,
    consumed: Arc<AtomicU64>,
    commands: Option<(Sender<Command>, Receiver<Result<(), EngineError>>)>,
}

impl CpalDevice {
    fn command(&mut self, command: Command) -> Result<(), EngineError> {
        let (sender, replies) = self
            .commands
            .as_ref()
            .ok_or_else(|| EngineError::Stream("stream not started".into()))?;
        sender
            .send(command)
            .map_err(|_| EngineError::Stream("stream thread exited".into()))?;
        replies
            .recv()
            .map_err(|_| EngineError::Stream("stream thread exited".into()))?
    }
}

impl OutputDevice for CpalDevice {
    fn config(&self) -> StreamConfig {
        self.config
    }

    fn start(&mut self, consumer: Consumer<f32>) -> Result<(), EngineError> {
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (reply_tx, reply_rx) = mpsc::channel::<Result<(), EngineError>>();

        let device = self.device.clone();
        let sample_format = self.supported.sample_format();
        let stream_config = self.supported.config();
        let consumed = self.consumed.clone();
        let suspended = self.suspended.clone();

        std::thread::spawn(move || {
            let stream = match build_stream(&device, sample_format, &stream_config, consumer, consumed) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = reply_tx.send(Err(e));
                    return;
                }
            };

            // Some hosts refuse to play until the user interacts; stay alive
            // suspended and wait for a resume.
            if let Err(e) = stream.play() {
                warn!(error = %e, "output stream did not start, suspending");
                suspended.store(true, Ordering::Relaxed);
            }
            let _ = reply_tx.send(Ok(()));

            // Stream lives as long as the engine holds the command sender
            while let Ok(command) = command_rx.recv() {
                let result = match command {
                    Command::Play => stream.play().map_err(|e| EngineError::Stream(e.to_string())),
                    Command::Pause => stream.pause().map_err(|e| EngineError::Stream(e.to_string())),
                };
                let _ = reply_tx.send(result);
            }
        });

        reply_rx
            .recv()
            .map_err(|_| EngineError::Stream("stream thread exited".into()))??;
        self.commands = Some((command_tx, reply_rx));
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.command(Command::Play)?;
        self.suspended.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn samples_consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if self.commands.is_some() {
            let _ = self.command(Command::Pause);
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    consumer: Consumer<f32>,
    consumed: Arc<AtomicU64>,
) -> Result<cpal::Stream, EngineError> {
    match sample_format {
        SampleFormat::F32 => build_typed::<f32>(device, stream_config, consumer, consumed),
        SampleFormat::I16 => build_typed::<i16>(device, stream_config, consumer, consumed),
        SampleFormat::U16 => build_typed::<u16>(device, stream_config, consumer, consumed),
        other => Err(EngineError::Stream(format!("unsupported sample format {:?}", other))),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
    consumed: Arc<AtomicU64>,
) -> Result<cpal::Stream, EngineError>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            stream_config,
            move |data: &mut [T], _| {
                let popped = pull(&mut consumer, data, |s| T::from_sample(s.clamp(-1.0, 1.0)));
                consumed.fetch_add(popped as u64, Ordering::Relaxed);
            },
            |err| error!(error = %err, "output stream error"),
            None,
        )
        .map_err(|e| EngineError::Stream(e.to_string()))
}

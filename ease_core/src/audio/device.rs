//! Output devices that pull audio from the shared graph.

use tracing::{debug, info};

use super::graph::SharedGraph;
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    /// Opened but not producing sound until resumed
    Suspended,
    Running,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub sample_rate: u32,
    pub channels: u16,
}

/// The seam between the engine and whatever actually plays the graph
pub trait AudioDevice {
    /// Acquire the device and start pulling from `graph`
    fn open(&mut self, graph: SharedGraph) -> Result<DeviceInfo>;

    fn state(&self) -> DeviceState;

    /// Leave the suspended state; a no-op when already running
    fn resume(&mut self) -> Result<()>;

    /// Release the device; the graph is no longer pulled
    fn close(&mut self);
}

/// A device with no hardware behind it. The owner renders the graph itself.
#[derive(Debug)]
pub struct OfflineDevice {
    sample_rate: u32,
    state: DeviceState,
    start_suspended: bool,
    graph: Option<SharedGraph>,
}

impl OfflineDevice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: DeviceState::Closed,
            start_suspended: false,
            graph: None,
        }
    }

    /// Opens suspended, like an output that waits for a user gesture
    pub fn suspended(sample_rate: u32) -> Self {
        Self {
            start_suspended: true,
            ..Self::new(sample_rate)
        }
    }

    pub fn graph(&self) -> Option<&SharedGraph> {
        self.graph.as_ref()
    }
}

impl AudioDevice for OfflineDevice {
    fn open(&mut self, graph: SharedGraph) -> Result<DeviceInfo> {
        if self.sample_rate == 0 {
            return Err(Error::AudioDevice("sample rate must be positive".into()));
        }
        self.graph = Some(graph);
        self.state = if self.start_suspended {
            DeviceState::Suspended
        } else {
            DeviceState::Running
        };
        debug!(sample_rate = self.sample_rate, state = ?self.state, "Offline device opened");
        Ok(DeviceInfo {
            sample_rate: self.sample_rate,
            channels: 2,
        })
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        match self.state {
            DeviceState::Suspended => {
                self.state = DeviceState::Running;
                info!("Offline device resumed");
                Ok(())
            }
            DeviceState::Running => Ok(()),
            DeviceState::Closed => Err(Error::AudioDevice("device is closed".into())),
        }
    }

    fn close(&mut self) {
        self.graph = None;
        self.state = DeviceState::Closed;
    }
}

/// A device that refuses to open; stands in for missing hardware
#[derive(Debug, Default)]
pub struct UnavailableDevice;

impl AudioDevice for UnavailableDevice {
    fn open(&mut self, _graph: SharedGraph) -> Result<DeviceInfo> {
        Err(Error::AudioDevice("no output device available".into()))
    }

    fn state(&self) -> DeviceState {
        DeviceState::Closed
    }

    fn resume(&mut self) -> Result<()> {
        Err(Error::AudioDevice("no output device available".into()))
    }

    fn close(&mut self) {}
}

#[cfg(feature = "cpal-output")]
pub use self::cpal_output::CpalDevice;

#[cfg(feature = "cpal-output")]
mod cpal_output {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{Stream, StreamConfig};
    use tracing::{error, info};

    use super::{AudioDevice, DeviceInfo, DeviceState};
    use crate::audio::graph::{lock, SharedGraph};
    use crate::{Error, Result};

    /// Plays the graph on the host's default output device
    #[derive(Default)]
    pub struct CpalDevice {
        stream: Option<Stream>,
        state: Option<DeviceState>,
    }

    impl CpalDevice {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl AudioDevice for CpalDevice {
        fn open(&mut self, graph: SharedGraph) -> Result<DeviceInfo> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| Error::AudioDevice("no default output device".into()))?;

            let config = device
                .default_output_config()
                .map_err(|e| Error::AudioDevice(format!("Failed to get output config: {}", e)))?;

            let channels = config.channels();
            let sample_rate = config.sample_rate().0;
            let stream_config: StreamConfig = config.into();
            let mut scratch: Vec<f32> = Vec::new();

            let stream = device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let frames = data.len() / usize::from(channels.max(1));
                        scratch.resize(frames * 2, 0.0);
                        lock(&graph).render(&mut scratch);

                        for (out, stereo) in data
                            .chunks_mut(usize::from(channels.max(1)))
                            .zip(scratch.chunks_exact(2))
                        {
                            for (channel, sample) in out.iter_mut().enumerate() {
                                *sample = match channel {
                                    0 => stereo[0],
                                    1 => stereo[1],
                                    _ => 0.0,
                                };
                            }
                        }
                    },
                    |err| {
                        error!("Audio output error: {}", err);
                    },
                    None,
                )
                .map_err(|e| Error::AudioDevice(format!("Failed to build output stream: {}", e)))?;

            stream
                .play()
                .map_err(|e| Error::AudioDevice(format!("Failed to start output stream: {}", e)))?;

            info!(sample_rate, channels, "Audio output opened");
            self.stream = Some(stream);
            self.state = Some(DeviceState::Running);

            Ok(DeviceInfo {
                sample_rate,
                channels,
            })
        }

        fn state(&self) -> DeviceState {
            self.state.unwrap_or(DeviceState::Closed)
        }

        fn resume(&mut self) -> Result<()> {
            let stream = self
                .stream
                .as_ref()
                .ok_or_else(|| Error::AudioDevice("device is closed".into()))?;
            stream
                .play()
                .map_err(|e| Error::AudioDevice(format!("Failed to resume output stream: {}", e)))?;
            self.state = Some(DeviceState::Running);
            Ok(())
        }

        fn close(&mut self) {
            self.stream = None;
            self.state = Some(DeviceState::Closed);
        }
    }
}

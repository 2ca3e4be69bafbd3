//! In-memory output device.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rtrb::Consumer;
use tracing::debug;

use super::{Backend, OutputDevice, StreamConfig};
use crate::error::EngineError;

struct Shared {
    config: StreamConfig,
    available: AtomicBool,
    suspended: AtomicBool,
    resume_allowed: AtomicBool,
    consumed: AtomicU64,
    opened: AtomicUsize,
    consumer: Mutex<Option<Consumer<f32>>>,
}

/// A backend with no hardware behind it.
///
/// Clones share state, so a test can hand one clone to the
/// [`Engine`](crate::Engine) and keep another to pull rendered audio out with
/// [`drain`](Self::drain) or to simulate an unavailable or suspended output.
///
/// ```
/// use lull::device::Offline;
/// use lull::Engine;
///
/// let output = Offline::new(8_000, 2);
/// let mut engine = Engine::new(output.clone());
/// engine.start_track("brown", 0.5);
/// engine.render_available();
/// assert!(!output.drain().is_empty());
/// ```
#[derive(Clone)]
pub struct Offline {
    shared: Arc<Shared>,
}

impl Offline {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: StreamConfig { sample_rate, channels },
                available: AtomicBool::new(true),
                suspended: AtomicBool::new(false),
                resume_allowed: AtomicBool::new(true),
                consumed: AtomicU64::new(0),
                opened: AtomicUsize::new(0),
                consumer: Mutex::new(None),
            }),
        }
    }

    /// Make subsequent [`Backend::open`] calls fail (or succeed again)
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::Relaxed);
    }

    /// Put the device into the suspended state
    pub fn suspend(&self) {
        self.shared.suspended.store(true, Ordering::Relaxed);
    }

    /// Whether [`OutputDevice::resume`] succeeds; like a browser waiting for a
    /// user gesture when `false`
    pub fn set_resume_allowed(&self, allowed: bool) {
        self.shared.resume_allowed.store(allowed, Ordering::Relaxed);
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Relaxed)
    }

    /// How many times a device has been opened from this backend
    pub fn open_count(&self) -> usize {
        self.shared.opened.load(Ordering::Relaxed)
    }

    pub fn samples_consumed(&self) -> u64 {
        self.shared.consumed.load(Ordering::Relaxed)
    }

    /// Take every interleaved sample rendered so far
    pub fn drain(&self) -> Vec<f32> {
        let mut guard = match self.shared.consumer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(consumer) = guard.as_mut() else {
            return Vec::new();
        };

        let mut samples = Vec::with_capacity(consumer.slots());
        while let Ok(sample) = consumer.pop() {
            samples.push(sample);
        }
        self.shared.consumed.fetch_add(samples.len() as u64, Ordering::Relaxed);
        samples
    }
}

impl Backend for Offline {
    fn open(&mut self) -> Result<Box<dyn OutputDevice>, EngineError> {
        if !self.shared.available.load(Ordering::Relaxed) {
            return Err(EngineError::Unavailable("offline output disabled".into()));
        }
        self.shared.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(OfflineDevice {
            shared: self.shared.clone(),
        }))
    }
}

struct OfflineDevice {
    shared: Arc<Shared>,
}

impl OutputDevice for OfflineDevice {
    fn config(&self) -> StreamConfig {
        self.shared.config
    }

    fn start(&mut self, consumer: Consumer<f32>) -> Result<(), EngineError> {
        let mut guard = self
            .shared
            .consumer
            .lock()
            .map_err(|_| EngineError::Stream("offline consumer lock poisoned".into()))?;
        *guard = Some(consumer);
        debug!(sample_rate = self.shared.config.sample_rate, "offline output started");
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Relaxed)
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        if !self.shared.resume_allowed.load(Ordering::Relaxed) {
            return Err(EngineError::Suspended);
        }
        self.shared.suspended.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn samples_consumed(&self) -> u64 {
        self.shared.consumed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    #[test]
    fn unavailable_backend_refuses_to_open() {
        let mut backend = Offline::new(8_000, 2);
        backend.set_available(false);
        assert!(matches!(backend.open(), Err(EngineError::Unavailable(_))));
        backend.set_available(true);
        assert!(backend.open().is_ok());
        assert_eq!(backend.open_count(), 1);
    }

    #[test]
    fn resume_can_be_blocked() {
        let mut backend = Offline::new(8_000, 2);
        let mut device = backend.open().unwrap();
        backend.suspend();
        backend.set_resume_allowed(false);
        assert_eq!(device.resume(), Err(EngineError::Suspended));
        assert!(device.is_suspended());
        backend.set_resume_allowed(true);
        assert!(device.resume().is_ok());
        assert!(!backend.is_suspended());
    }

    #[test]
    fn drain_counts_consumed_samples() {
        let mut backend = Offline::new(8_000, 1);
        let mut device = backend.open().unwrap();
        let (mut producer, consumer) = RingBuffer::new(16);
        device.start(consumer).unwrap();
        for i in 0..5 {
            producer.push(i as f32).unwrap();
        }
        assert_eq!(backend.drain(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(device.samples_consumed(), 5);
        assert!(backend.drain().is_empty());
    }
}

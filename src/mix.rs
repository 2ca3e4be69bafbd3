//! Declarative description of which soundscapes should be playing.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::EngineError;

/// Id that means "no sound"; never becomes a track.
pub const SILENCE_ID: &str = "none";

/// Desired soundscape volumes, keyed by soundscape id.
///
/// Entries with a volume of zero (or the `"none"` id) are inactive. Ids are kept
/// as strings so that unknown ids reach the engine, which plays white noise for
/// them.
///
/// ```
/// use lull::MixerConfig;
///
/// let mix: MixerConfig = "rain=0.6, brown=0.3, wind=0".parse().unwrap();
/// let active: Vec<_> = mix.active().map(|(id, _)| id).collect();
/// assert_eq!(active, ["brown", "rain"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MixerConfig {
    volumes: BTreeMap<String, f32>,
}

impl MixerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one entry (builder pattern)
    pub fn with(mut self, id: impl Into<String>, volume: f32) -> Self {
        self.set(id, volume);
        self
    }

    pub fn set(&mut self, id: impl Into<String>, volume: f32) {
        self.volumes.insert(id.into(), volume);
    }

    pub fn remove(&mut self, id: &str) -> Option<f32> {
        self.volumes.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<f32> {
        self.volumes.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Entries that should be audible, in id order
    pub fn active(&self) -> impl Iterator<Item = (&str, f32)> {
        self.volumes
            .iter()
            .filter(|(id, volume)| is_audible(id, **volume))
            .map(|(id, &volume)| (id.as_str(), volume))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.get(id).is_some_and(|volume| is_audible(id, volume))
    }
}

fn is_audible(id: &str, volume: f32) -> bool {
    id != SILENCE_ID && volume > 0.0
}

impl<S: Into<String>> FromIterator<(S, f32)> for MixerConfig {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        Self {
            volumes: iter.into_iter().map(|(id, v)| (id.into(), v)).collect(),
        }
    }
}

impl<S: Into<String>> Extend<(S, f32)> for MixerConfig {
    fn extend<I: IntoIterator<Item = (S, f32)>>(&mut self, iter: I) {
        for (id, volume) in iter {
            self.set(id, volume);
        }
    }
}

impl FromStr for MixerConfig {
    type Err = EngineError;

    /// Parse `id=volume` pairs separated by commas. Whitespace is ignored and an
    /// empty string is an empty mix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (id, volume) = entry
                    .split_once('=')
                    .ok_or_else(|| EngineError::InvalidMix(entry.to_owned()))?;
                let id = id.trim();
                let volume: f32 = volume
                    .trim()
                    .parse()
                    .map_err(|_| EngineError::InvalidMix(entry.to_owned()))?;
                if id.is_empty() || !volume.is_finite() {
                    return Err(EngineError::InvalidMix(entry.to_owned()));
                }
                Ok((id.to_owned(), volume))
            })
            .collect()
    }
}

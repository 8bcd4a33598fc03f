//! Audio-only entities, played through [kira](https://docs.rs/kira).
//!
//! [`AudioEngine`] is a cloneable handle to one kira `AudioManager` plus the
//! listener position. A [`SoundEmitter`] starts its sound in `ready` and fades
//! it with distance to the listener in `update`.
//!
//! ```ignore
//! let engine = AudioEngine::try_new()?;
//! let hum = SoundData::from_file("assets/hum.ogg")?.looping();
//! let emitter = SoundEmitter::new(stage.ids(), &engine, hum, 20.0);
//! stage.spawn(emitter)?;
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use kira::sound::PlaybackState;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween};

use crate::entity::{EntityCore, IdSpace, SpatialEntity};
use crate::math::{Transform, Vec3};

/// Linear amplitude (0.0 = silence, 1.0 = full) to decibels.
fn amplitude_to_db(amplitude: f64) -> Decibels {
    if amplitude <= 0.0 {
        Decibels::SILENCE
    } else {
        Decibels((20.0 * amplitude.log10()) as f32)
    }
}

/// Linear falloff: full volume at the emitter, silent at `range` and beyond.
pub fn attenuation(distance: f32, range: f32) -> f64 {
    if range <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    f64::from((1.0 - distance / range).clamp(0.0, 1.0))
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors from the audio backend.
#[derive(Debug)]
pub enum AudioError {
    /// The output device couldn't be opened.
    BackendInit(String),
    /// A sound file couldn't be loaded.
    Load(String),
    /// The manager refused to play a sound.
    Play(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::BackendInit(e) => write!(f, "audio backend init failed: {e}"),
            AudioError::Load(e) => write!(f, "audio load failed: {e}"),
            AudioError::Play(e) => write!(f, "audio play failed: {e}"),
        }
    }
}

impl std::error::Error for AudioError {}

// ── SoundData ───────────────────────────────────────────────────────────

/// Decoded audio, cheap to clone.
#[derive(Clone)]
pub struct SoundData {
    inner: StaticSoundData,
}

impl SoundData {
    /// Load OGG, MP3, WAV or FLAC from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let inner =
            StaticSoundData::from_file(path).map_err(|e| AudioError::Load(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn looping(mut self) -> Self {
        self.inner = self.inner.loop_region(..);
        self
    }

    /// Playback rate, 1.0 = normal speed.
    pub fn playback_rate(mut self, rate: f64) -> Self {
        self.inner = self.inner.playback_rate(rate);
        self
    }
}

impl fmt::Debug for SoundData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundData").finish_non_exhaustive()
    }
}

// ── AudioEngine ─────────────────────────────────────────────────────────

struct EngineState {
    manager: RefCell<AudioManager<DefaultBackend>>,
    listener: Cell<Vec3>,
}

/// Shared handle to the audio output and listener.
#[derive(Clone)]
pub struct AudioEngine {
    state: Rc<EngineState>,
}

impl AudioEngine {
    pub fn try_new() -> Result<Self, AudioError> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| AudioError::BackendInit(e.to_string()))?;
        log::info!("audio backend initialised");
        Ok(Self {
            state: Rc::new(EngineState {
                manager: RefCell::new(manager),
                listener: Cell::new(Vec3::ZERO),
            }),
        })
    }

    fn play(&self, sound: &SoundData) -> Result<StaticSoundHandle, AudioError> {
        self.state
            .manager
            .borrow_mut()
            .play(sound.inner.clone())
            .map_err(|e| AudioError::Play(e.to_string()))
    }

    /// Where the listener stands, usually the camera position.
    pub fn listener(&self) -> Vec3 {
        self.state.listener.get()
    }

    pub fn set_listener(&self, position: Vec3) {
        self.state.listener.set(position);
    }

    /// Global volume (amplitude, 1.0 = full).
    pub fn set_main_volume(&self, volume: f64) {
        self.state
            .manager
            .borrow_mut()
            .main_track()
            .set_volume(amplitude_to_db(volume), Tween::default());
    }
}

impl fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioEngine")
            .field("listener", &self.listener())
            .finish_non_exhaustive()
    }
}

// ── SoundEmitter ────────────────────────────────────────────────────────

/// A positioned sound with no visual and no collision shape.
///
/// If the backend refuses to play in `ready`, the error is logged and the
/// entity reports `is_ready() == false`.
pub struct SoundEmitter {
    core: EntityCore,
    engine: AudioEngine,
    sound: SoundData,
    handle: Option<StaticSoundHandle>,
    volume: f64,
    range: f32,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl SoundEmitter {
    pub fn new(ids: &IdSpace, engine: &AudioEngine, sound: SoundData, range: f32) -> Self {
        Self::with_transform(ids, engine, sound, range, Transform::IDENTITY)
    }

    pub fn with_transform(
        ids: &IdSpace,
        engine: &AudioEngine,
        sound: SoundData,
        range: f32,
        transform: Transform,
    ) -> Self {
        Self {
            core: EntityCore::with_transform(ids, transform),
            engine: engine.clone(),
            sound,
            handle: None,
            volume: 1.0,
            range,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Builder: volume at zero distance (amplitude, 1.0 = full).
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn is_playing(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| !matches!(h.state(), PlaybackState::Stopped))
    }

    /// Volume the emitter should have at its current distance from the listener.
    pub fn audible_volume(&self) -> f64 {
        let distance = self.core.position().distance(self.engine.listener());
        self.volume * attenuation(distance, self.range)
    }

    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop(Tween::default());
        }
    }
}

impl SpatialEntity for SoundEmitter {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn update(&mut self, dt: f32) {
        if dt > 0.0 {
            let position = self.core.position() + self.velocity * dt;
            self.core.set_position(position);
            self.core.integrate_rotation(self.angular_velocity, dt);
        }
        let volume = self.audible_volume();
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(amplitude_to_db(volume), Tween::default());
        }
    }

    fn ready(&mut self) {
        if self.handle.is_some() {
            return;
        }
        match self.engine.play(&self.sound) {
            Ok(mut handle) => {
                handle.set_volume(amplitude_to_db(self.audible_volume()), Tween::default());
                self.handle = Some(handle);
                self.core.set_ready(true);
                log::debug!("entity {} started sound", self.core.id());
            }
            Err(e) => {
                log::error!("entity {}: {e}", self.core.id());
                self.core.set_ready(false);
            }
        }
    }

    fn describe(&self) -> String {
        format!("sound range={}", self.range)
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }

    fn has_visual(&self) -> bool {
        false
    }

    fn has_collision(&self) -> bool {
        false
    }

    fn can_be_moved(&self) -> bool {
        true
    }

    fn move_to(&mut self, destination: Vec3) {
        self.core.set_position(destination);
    }
}

impl Drop for SoundEmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for SoundEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundEmitter")
            .field("core", &self.core)
            .field("range", &self.range)
            .field("playing", &self.is_playing())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_is_linear_and_clamped() {
        assert_eq!(attenuation(0.0, 10.0), 1.0);
        assert!((attenuation(5.0, 10.0) - 0.5).abs() < 1e-6);
        assert_eq!(attenuation(10.0, 10.0), 0.0);
        assert_eq!(attenuation(50.0, 10.0), 0.0);
    }

    #[test]
    fn zero_range_is_point_source() {
        assert_eq!(attenuation(0.0, 0.0), 1.0);
        assert_eq!(attenuation(0.1, 0.0), 0.0);
    }

    #[test]
    fn silence_maps_to_silence() {
        assert_eq!(amplitude_to_db(0.0).0, Decibels::SILENCE.0);
        assert_eq!(amplitude_to_db(1.0).0, 0.0);
    }

    #[test]
    fn error_messages() {
        let e = AudioError::Play("no device".into());
        assert_eq!(e.to_string(), "audio play failed: no device");
    }
}

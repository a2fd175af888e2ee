//! Avatar animation: a small per-avatar mixer plus the policy that picks
//! which named action should be playing.
//!
//! The mixer only tracks playback time and blend weight per action. Sampling
//! the skeleton is the renderer's business.

use crate::assets::{AssetError, ClipInfo};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// The fixed set of ground actions an avatar can be asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationName {
    #[default]
    Idle,
    Walk,
    Run,
}

impl AnimationName {
    pub const ALL: [AnimationName; 3] = [AnimationName::Idle, AnimationName::Walk, AnimationName::Run];

    pub fn as_str(self) -> &'static str {
        match self {
            AnimationName::Idle => "Idle",
            AnimationName::Walk => "Walk",
            AnimationName::Run => "Run",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == name)
    }
}

impl fmt::Display for AnimationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the target selection policy for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationTarget {
    /// In the air: ground actions are stopped and nothing replaces them.
    Airborne,
    Ground(AnimationName),
}

/// Pick the action for the local avatar from its motion this tick.
pub fn resolve_target(airborne: bool, moving: bool, running: bool) -> AnimationTarget {
    if airborne {
        AnimationTarget::Airborne
    } else if moving {
        AnimationTarget::Ground(if running { AnimationName::Run } else { AnimationName::Walk })
    } else {
        AnimationTarget::Ground(AnimationName::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

/// Playback state of one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationAction {
    clip: ClipInfo,
    time: f32,
    weight: f32,
    playing: bool,
    fade: Option<Fade>,
}

impl AnimationAction {
    pub fn new(clip: ClipInfo) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 1.0,
            playing: false,
            fade: None,
        }
    }

    pub fn clip_name(&self) -> &str {
        &self.clip.name
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn is_running(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.fade = None;
        self.time = 0.0;
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
        self.weight = 1.0;
        self.fade = None;
    }

    pub fn fade_in(&mut self, duration: f32) {
        self.start_fade(0.0, 1.0, duration);
    }

    pub fn fade_out(&mut self, duration: f32) {
        self.start_fade(self.weight, 0.0, duration);
    }

    fn start_fade(&mut self, from: f32, to: f32, duration: f32) {
        if duration <= 0.0 {
            self.weight = to;
            self.fade = None;
            if to == 0.0 {
                self.playing = false;
            }
            return;
        }
        self.weight = from;
        self.fade = Some(Fade {
            from,
            to,
            elapsed: 0.0,
            duration,
        });
    }

    /// Advance playback; a finished fade-out stops the action.
    pub fn update(&mut self, delta: f32) {
        if !self.playing {
            return;
        }

        self.time += delta;
        if self.clip.duration > 0.0 {
            self.time %= self.clip.duration;
        }

        if let Some(mut fade) = self.fade {
            fade.elapsed += delta;
            let t = (fade.elapsed / fade.duration).min(1.0);
            self.weight = fade.from + (fade.to - fade.from) * t;
            if t >= 1.0 {
                self.fade = None;
                if fade.to == 0.0 {
                    self.playing = false;
                }
            } else {
                self.fade = Some(fade);
            }
        }
    }
}

/// All actions of one avatar model, keyed by clip name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationMixer {
    actions: HashMap<String, AnimationAction>,
}

impl AnimationMixer {
    pub fn from_clips(clips: &[ClipInfo]) -> Self {
        let actions = clips
            .iter()
            .map(|clip| (clip.name.clone(), AnimationAction::new(clip.clone())))
            .collect();
        Self { actions }
    }

    pub fn action(&self, clip: &str) -> Option<&AnimationAction> {
        self.actions.get(clip)
    }

    pub fn action_mut(&mut self, clip: &str) -> Option<&mut AnimationAction> {
        self.actions.get_mut(clip)
    }

    pub fn update(&mut self, delta: f32) {
        for action in self.actions.values_mut() {
            action.update(delta);
        }
    }
}

/// Binds [`AnimationName`]s to clips of a loaded model and performs
/// cross-faded transitions between them.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationController {
    mixer: AnimationMixer,
    bindings: HashMap<AnimationName, String>,
    current: AnimationName,
    fade_seconds: f32,
}

impl AnimationController {
    fn bind_exact(clips: &[ClipInfo]) -> HashMap<AnimationName, String> {
        AnimationName::ALL
            .into_iter()
            .filter_map(|name| {
                clips
                    .iter()
                    .find(|clip| clip.name == name.as_str())
                    .map(|clip| (name, clip.name.clone()))
            })
            .collect()
    }

    /// Controller for the local avatar. Fails when the model has no clips at
    /// all; a missing `Idle` is covered by the first clip of the model.
    pub fn for_local(clips: &[ClipInfo], fade_seconds: f32) -> Result<Self, AssetError> {
        let first = clips.first().ok_or(AssetError::NoAnimations)?;
        debug!(
            "Available animations: {:?}",
            clips.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );

        let mut bindings = Self::bind_exact(clips);
        if !bindings.contains_key(&AnimationName::Idle) {
            warn!("Playing first available animation as fallback for Idle: {}", first.name);
            bindings.insert(AnimationName::Idle, first.name.clone());
        }
        for name in [AnimationName::Walk, AnimationName::Run] {
            if !bindings.contains_key(&name) {
                warn!("Avatar model has no '{}' animation; that state will not play", name);
            }
        }

        let mut controller = Self {
            mixer: AnimationMixer::from_clips(clips),
            bindings,
            current: AnimationName::Idle,
            fade_seconds,
        };
        controller.start(AnimationName::Idle);
        Ok(controller)
    }

    /// Controller for a remote avatar: exact bindings only, never fails.
    pub fn for_peer(clips: &[ClipInfo], fade_seconds: f32, initial: AnimationName) -> Self {
        let mut controller = Self {
            mixer: AnimationMixer::from_clips(clips),
            bindings: Self::bind_exact(clips),
            current: AnimationName::Idle,
            fade_seconds,
        };
        let initial = if controller.has(initial) { initial } else { AnimationName::Idle };
        controller.current = initial;
        controller.start(initial);
        controller
    }

    fn start(&mut self, name: AnimationName) {
        if let Some(action) = self.action_for_mut(name) {
            action.reset();
            action.play();
        }
    }

    pub fn has(&self, name: AnimationName) -> bool {
        self.bindings.contains_key(&name)
    }

    pub fn current(&self) -> AnimationName {
        self.current
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn action_for(&self, name: AnimationName) -> Option<&AnimationAction> {
        self.bindings.get(&name).and_then(|clip| self.mixer.action(clip))
    }

    fn action_for_mut(&mut self, name: AnimationName) -> Option<&mut AnimationAction> {
        let clip = self.bindings.get(&name)?;
        self.mixer.actions.get_mut(clip)
    }

    pub fn is_running(&self, name: AnimationName) -> bool {
        self.action_for(name).is_some_and(AnimationAction::is_running)
    }

    /// Whether the recorded current action is actually advancing.
    pub fn current_running(&self) -> bool {
        self.is_running(self.current)
    }

    /// Cross-fade to `target` if it differs from the current action and is
    /// bound. Returns whether a transition started.
    pub fn transition_to(&mut self, target: AnimationName) -> bool {
        if target == self.current || !self.has(target) {
            return false;
        }
        self.crossfade(target);
        true
    }

    fn crossfade(&mut self, target: AnimationName) {
        let fade = self.fade_seconds;
        let previous = self.current;
        if let Some(old) = self.action_for_mut(previous) {
            if old.is_running() {
                old.fade_out(fade);
            }
        }
        if let Some(new) = self.action_for_mut(target) {
            new.reset();
            new.fade_in(fade);
            new.play();
        }
        debug!("Animation {} -> {}", previous, target);
        self.current = target;
    }

    /// Fade the current action back in after it was stopped.
    fn restart_current(&mut self) {
        let fade = self.fade_seconds;
        if let Some(action) = self.action_for_mut(self.current) {
            action.reset();
            action.fade_in(fade);
            action.play();
        }
    }

    pub fn stop_current(&mut self) {
        if let Some(action) = self.action_for_mut(self.current) {
            action.stop();
        }
    }

    /// Apply the local target policy.
    pub fn apply_local(&mut self, target: AnimationTarget) {
        match target {
            AnimationTarget::Airborne => self.stop_current(),
            AnimationTarget::Ground(name) => {
                if !self.transition_to(name) && name == self.current && !self.current_running() {
                    // Landing with the same target as before take-off.
                    self.restart_current();
                }
            }
        }
    }

    /// Apply an animation name received from a peer. Unknown or unbound names
    /// fall back to `Idle`; a bound action that is not advancing is restarted
    /// so duplicate or reordered messages cannot leave it frozen.
    pub fn apply_remote(&mut self, received: Option<&str>) {
        let received = received.unwrap_or(AnimationName::Idle.as_str());
        match AnimationName::from_wire(received).filter(|name| self.has(*name)) {
            Some(name) if name != self.current => self.crossfade(name),
            Some(_) => {
                if !self.current_running() {
                    self.restart_current();
                }
            }
            None => {
                debug!("Peer animation '{}' unavailable, falling back to Idle", received);
                if !self.has(AnimationName::Idle) {
                    return;
                }
                if self.current != AnimationName::Idle {
                    self.crossfade(AnimationName::Idle);
                } else if !self.current_running() {
                    self.restart_current();
                }
            }
        }
    }

    pub fn update(&mut self, delta: f32) {
        self.mixer.update(delta);
    }
}

//! Session registry: one entry per connected client, holding at most one
//! live sound.
//!
//! Each entry sits behind its own mutex, so every mutation of one client's
//! sound is serialized while different clients proceed independently. The
//! mutex is never held across an `.await` or while a buffer renders.
//!
//! A sound is installed before its buffer exists and carries a fresh
//! [`SoundId`]. Rendering happens off the lock; when the voice comes back it
//! is attached only if that same record is still current. A replace, stop,
//! expiry or disconnect in the meantime leaves the new voice orphaned, and it
//! is stopped on the spot.

use std::sync::Arc;
use std::time::Duration;

use chorus_synth::{AudioSink, ToneParams, Voice, synthesize};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::SoundConfig;
use crate::errors::RegistryError;
use crate::ids::{ClientId, SoundId};
use crate::metrics::{MESSAGES_DROPPED_TOTAL, SOUNDS_STARTED_TOTAL, SOUNDS_STOPPED_TOTAL};
use crate::protocol::{ClientAction, SoundSnapshot};

/// A client's current sound.
#[derive(Debug)]
pub struct ActiveSound {
    /// Changes on every replace.
    pub id: SoundId,
    /// Owner.
    pub client_id: ClientId,
    /// What was requested.
    pub params: ToneParams,
    /// Lifetime.
    pub duration: Duration,
    /// When the record was installed.
    pub started_at: Instant,
    /// `started_at + duration`. Never changes.
    pub end_time: Instant,
    /// `None` while the buffer is still rendering.
    pub voice: Option<Arc<dyn Voice>>,
    fade: CancellationToken,
}

impl ActiveSound {
    fn new(client_id: ClientId, params: ToneParams, duration: Duration, now: Instant) -> Self {
        Self {
            id: SoundId::new(),
            client_id,
            params,
            duration,
            started_at: now,
            end_time: now + duration,
            voice: None,
            fade: CancellationToken::new(),
        }
    }

    /// Cancel the fade-in and fade the voice out over `fadeout`.
    fn retire(self, fadeout: Duration) {
        self.fade.cancel();
        if let Some(voice) = self.voice {
            voice.fadeout(fadeout);
        }
    }

    /// Cancel the fade-in and silence the voice at once.
    fn halt(self) {
        self.fade.cancel();
        if let Some(voice) = self.voice {
            voice.stop();
        }
    }

    fn snapshot(&self, now: Instant) -> SoundSnapshot {
        let (is_playing, length_sec, volume) = match &self.voice {
            Some(voice) => (
                voice.is_playing(),
                voice.length().as_secs_f64(),
                f64::from(voice.volume()),
            ),
            None => (false, 0.0, 0.0),
        };
        SoundSnapshot {
            client_id: self.client_id.clone(),
            frequency: self.params.frequency,
            lfo_frequency: self.params.lfo_frequency,
            pan: self.params.pan,
            lfo_shape: self.params.lfo_shape.clone(),
            is_playing,
            length_sec,
            remaining_sec: self.end_time.saturating_duration_since(now).as_secs_f64(),
            volume,
        }
    }
}

/// One connected client.
#[derive(Debug)]
pub struct ClientSession {
    /// Identity.
    pub client_id: ClientId,
    transport: mpsc::Sender<String>,
    /// 0 or 1 sounds.
    pub active_sound: Option<ActiveSound>,
    closed: bool,
}

impl ClientSession {
    fn new(client_id: ClientId, transport: mpsc::Sender<String>) -> Self {
        Self {
            client_id,
            transport,
            active_sound: None,
            closed: false,
        }
    }
}

type SessionHandle = Arc<Mutex<ClientSession>>;

/// All connected clients and their sounds.
pub struct SessionRegistry {
    sessions: DashMap<ClientId, SessionHandle>,
    sink: Arc<dyn AudioSink>,
    sound: SoundConfig,
}

impl SessionRegistry {
    /// Create an empty registry that plays through `sink`.
    pub fn new(sink: Arc<dyn AudioSink>, sound: SoundConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            sink,
            sound,
        }
    }

    /// Sound settings in effect.
    pub fn sound_config(&self) -> &SoundConfig {
        &self.sound
    }

    /// Add a client with no sound.
    ///
    /// A second registration of the same id is refused and leaves the
    /// existing session untouched.
    pub fn register(
        &self,
        client_id: ClientId,
        transport: mpsc::Sender<String>,
    ) -> Result<(), RegistryError> {
        match self.sessions.entry(client_id) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                let session = ClientSession::new(entry.key().clone(), transport);
                let _ = entry.insert(Arc::new(Mutex::new(session)));
                Ok(())
            }
        }
    }

    /// Remove a client and silence its sound. `false` if it was not present.
    pub fn unregister(&self, client_id: &ClientId) -> bool {
        let Some((_, session)) = self.sessions.remove(client_id) else {
            return false;
        };
        let released = {
            let mut guard = session.lock();
            guard.closed = true;
            guard.active_sound.take()
        };
        if let Some(sound) = released {
            debug!(client_id = %client_id, sound_id = %sound.id, "releasing sound on disconnect");
            sound.halt();
        }
        true
    }

    /// Replace the client's sound with a new tone.
    ///
    /// The previous voice fades out over the replace fade. The new record is
    /// visible to snapshots immediately; its voice attaches once rendering
    /// finishes. Returns `false` if the client is not registered.
    pub async fn start_sound(&self, client_id: &ClientId, params: ToneParams) -> bool {
        let Some(session) = self.session(client_id) else {
            return false;
        };
        self.start_on(&session, client_id, params).await
    }

    /// `start_sound` against a handle already looked up. A session that was
    /// unregistered in the meantime is left alone.
    async fn start_on(
        &self,
        session: &SessionHandle,
        client_id: &ClientId,
        params: ToneParams,
    ) -> bool {
        let (sound_id, fade) = {
            let mut guard = session.lock();
            if guard.closed {
                return false;
            }
            let sound = ActiveSound::new(
                client_id.clone(),
                params.clone(),
                self.sound.duration(),
                Instant::now(),
            );
            let ids = (sound.id.clone(), sound.fade.clone());
            if let Some(old) = guard.active_sound.replace(sound) {
                old.retire(self.sound.replace_fadeout);
            }
            ids
        };

        let render = self.sound.render;
        let buffer = match tokio::task::spawn_blocking(move || synthesize(&params, &render)).await
        {
            Ok(buffer) => buffer,
            Err(e) => {
                error!(client_id = %client_id, error = %e, "synthesis task failed");
                let mut guard = session.lock();
                let _ = guard.active_sound.take_if(|s| s.id == sound_id);
                return true;
            }
        };

        let voice = self.sink.play(buffer);
        let attached = {
            let mut guard = session.lock();
            match guard.active_sound.as_mut() {
                Some(sound) if sound.id == sound_id => {
                    sound.voice = Some(Arc::clone(&voice));
                    true
                }
                _ => false,
            }
        };

        if !attached {
            debug!(client_id = %client_id, sound_id = %sound_id, "sound superseded while rendering");
            voice.stop();
            return true;
        }

        counter!(SOUNDS_STARTED_TOTAL).increment(1);
        debug!(client_id = %client_id, sound_id = %sound_id, "sound started");
        let _ = tokio::spawn(self.sound.fade_in.run(voice, fade));
        true
    }

    /// Fade out and remove the client's sound.
    ///
    /// Returns whether a sound was removed; calling it again is a no-op.
    pub fn stop_sound(&self, client_id: &ClientId) -> bool {
        let Some(session) = self.session(client_id) else {
            return false;
        };
        let Some(sound) = session.lock().active_sound.take() else {
            return false;
        };
        debug!(client_id = %client_id, sound_id = %sound.id, "sound stopped");
        sound.retire(self.sound.stop_fadeout);
        counter!(SOUNDS_STOPPED_TOTAL).increment(1);
        true
    }

    /// Every client's sound, copied.
    pub fn snapshot_all(&self) -> Vec<SoundSnapshot> {
        let now = Instant::now();
        self.handles()
            .into_iter()
            .filter_map(|session| session.lock().active_sound.as_ref().map(|s| s.snapshot(now)))
            .collect()
    }

    /// One client's sound, copied.
    pub fn snapshot_of(&self, client_id: &ClientId) -> Option<SoundSnapshot> {
        let session = self.session(client_id)?;
        let guard = session.lock();
        guard.active_sound.as_ref().map(|s| s.snapshot(Instant::now()))
    }

    /// What every client other than `client_id` is playing.
    pub fn snapshot_excluding(&self, client_id: &ClientId) -> Vec<ClientAction> {
        self.handles()
            .into_iter()
            .filter_map(|session| {
                let guard = session.lock();
                if &guard.client_id == client_id {
                    return None;
                }
                guard
                    .active_sound
                    .as_ref()
                    .map(|s| ClientAction::from_params(guard.client_id.clone(), &s.params))
            })
            .collect()
    }

    /// Remove every sound whose end time is at or before `now`.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        for session in self.handles() {
            let expired = session.lock().active_sound.take_if(|s| s.end_time <= now);
            if let Some(sound) = expired {
                debug!(client_id = %sound.client_id, sound_id = %sound.id, "sound expired");
                sound.halt();
                removed += 1;
            }
        }
        removed
    }

    /// Queue a text frame for a client without waiting.
    ///
    /// A full or closed queue drops the message and returns `false`.
    pub fn send_to(&self, client_id: &ClientId, text: String) -> bool {
        let Some(session) = self.session(client_id) else {
            return false;
        };
        let result = session.lock().transport.try_send(text);
        match result {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                warn!(client_id = %client_id, msg_len = msg.len(), "send queue full, dropping message");
                counter!(MESSAGES_DROPPED_TOTAL).increment(1);
                false
            }
            Err(TrySendError::Closed(_)) => {
                counter!(MESSAGES_DROPPED_TOTAL).increment(1);
                false
            }
        }
    }

    /// Connected clients.
    pub fn client_count(&self) -> usize {
        self.sessions.len()
    }

    /// Clients with a sound.
    pub fn sound_count(&self) -> usize {
        self.handles()
            .into_iter()
            .filter(|session| session.lock().active_sound.is_some())
            .count()
    }

    /// Whether `client_id` is registered.
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.sessions.contains_key(client_id)
    }

    fn session(&self, client_id: &ClientId) -> Option<SessionHandle> {
        self.sessions.get(client_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Entry handles, cloned so no map shard stays locked while entries are.
    fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_synth::{FadeIn, HeadlessSink, LfoShape, RenderSpec};

    fn quick_sound(duration_secs: f64) -> SoundConfig {
        SoundConfig {
            render: RenderSpec {
                sample_rate: 200,
                duration_secs,
                base_volume: 0.7,
            },
            fade_in: FadeIn {
                target: 0.7,
                duration: Duration::from_millis(5),
                steps: 5,
            },
            replace_fadeout: Duration::from_millis(10),
            stop_fadeout: Duration::from_millis(1_000),
        }
    }

    fn registry(duration_secs: f64) -> (Arc<SessionRegistry>, Arc<HeadlessSink>) {
        let sink = Arc::new(HeadlessSink::new());
        let reg = SessionRegistry::new(sink.clone(), quick_sound(duration_secs));
        (Arc::new(reg), sink)
    }

    fn join(reg: &SessionRegistry) -> (ClientId, mpsc::Receiver<String>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(4);
        reg.register(id.clone(), tx).unwrap();
        (id, rx)
    }

    fn tone(frequency: f64, pan: f64) -> ToneParams {
        ToneParams {
            frequency,
            pan,
            ..ToneParams::default()
        }
    }

    #[tokio::test]
    async fn register_then_unregister() {
        let (reg, _) = registry(12.0);
        let (id, _rx) = join(&reg);
        assert!(reg.contains(&id));
        assert_eq!(reg.client_count(), 1);
        assert!(reg.unregister(&id));
        assert!(!reg.contains(&id));
        assert!(!reg.unregister(&id));
    }

    #[tokio::test]
    async fn duplicate_register_is_refused() {
        let (reg, _) = registry(12.0);
        let (id, mut rx) = join(&reg);
        let (other_tx, _other_rx) = mpsc::channel(4);
        let err = reg.register(id.clone(), other_tx).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(ref dup) if dup == &id));
        // The original transport is still the one in use.
        assert!(reg.send_to(&id, "hi".into()));
        assert_eq!(rx.recv().await.as_deref(), Some("hi"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_sound_installs_playing_voice() {
        let (reg, sink) = registry(12.0);
        let (id, _rx) = join(&reg);
        assert!(reg.start_sound(&id, tone(220.0, 0.0)).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let snap = reg.snapshot_of(&id).unwrap();
        assert!(snap.is_playing);
        assert!((snap.frequency - 220.0).abs() < f64::EPSILON);
        assert!((snap.length_sec - 12.0).abs() < 1e-9);
        assert!((snap.volume - 0.7).abs() < 1e-6);
        assert!(snap.remaining_sec > 11.0);
        assert_eq!(sink.voices_started(), 1);
    }

    #[tokio::test]
    async fn start_sound_for_missing_client_is_noop() {
        let (reg, sink) = registry(12.0);
        assert!(!reg.start_sound(&ClientId::new(), ToneParams::default()).await);
        assert_eq!(reg.sound_count(), 0);
        assert_eq!(sink.voices_started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_keeps_one_sound_and_fades_old_voice() {
        let (reg, sink) = registry(12.0);
        let (id, _rx) = join(&reg);
        assert!(reg.start_sound(&id, tone(220.0, 0.5)).await);
        assert!(reg.start_sound(&id, tone(330.0, 0.5)).await);

        assert_eq!(reg.sound_count(), 1);
        assert!((reg.snapshot_of(&id).unwrap().frequency - 330.0).abs() < f64::EPSILON);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.voices_started(), 2);
        assert_eq!(sink.active_voices(), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_leave_one_sound() {
        let (reg, sink) = registry(0.5);
        let (id, _rx) = join(&reg);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let reg = Arc::clone(&reg);
                let id = id.clone();
                tokio::spawn(async move { reg.start_sound(&id, tone(100.0 + f64::from(i), 0.5)).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(reg.sound_count(), 1);
        assert_eq!(reg.snapshot_all().len(), 1);
        // Every superseded voice was stopped or faded; only the current one plays on.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sink.active_voices(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_sound_removes_and_is_idempotent() {
        let (reg, _) = registry(12.0);
        let (id, _rx) = join(&reg);
        assert!(reg.start_sound(&id, tone(220.0, 0.0)).await);
        assert!(reg.stop_sound(&id));
        assert!(reg.snapshot_of(&id).is_none());
        assert!(!reg.stop_sound(&id));
        assert!(!reg.stop_sound(&ClientId::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_voice_fades_over_stop_fadeout() {
        let (reg, sink) = registry(12.0);
        let (id, _rx) = join(&reg);
        assert!(reg.start_sound(&id, tone(220.0, 0.0)).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(reg.stop_sound(&id));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.active_voices(), 1);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.active_voices(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unregister_silences_immediately() {
        let (reg, sink) = registry(12.0);
        let (id, _rx) = join(&reg);
        assert!(reg.start_sound(&id, tone(220.0, 0.0)).await);
        assert!(reg.unregister(&id));
        assert_eq!(sink.active_voices(), 0);
        assert!(reg.snapshot_all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_on_unregistered_handle_plays_nothing() {
        let (reg, sink) = registry(12.0);
        let (id, _rx) = join(&reg);
        let stale = reg.session(&id).unwrap();
        assert!(reg.unregister(&id));

        assert!(!reg.start_on(&stale, &id, tone(220.0, 0.0)).await);
        assert!(stale.lock().active_sound.is_none());
        assert_eq!(sink.voices_started(), 0);
        assert_eq!(reg.sound_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sound_visible_until_end_time() {
        let (reg, _) = registry(2.0);
        let (id, _rx) = join(&reg);
        let start = Instant::now();
        assert!(reg.start_sound(&id, tone(220.0, 0.0)).await);

        assert_eq!(reg.sweep_expired(start + Duration::from_millis(1_999)), 0);
        assert_eq!(reg.snapshot_all().len(), 1);

        assert_eq!(reg.sweep_expired(start + Duration::from_secs(2)), 1);
        assert!(reg.snapshot_all().is_empty());
        assert!(reg.contains(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_spares_a_replacement() {
        let (reg, _) = registry(2.0);
        let (id, _rx) = join(&reg);
        assert!(reg.start_sound(&id, tone(220.0, 0.0)).await);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(reg.start_sound(&id, tone(330.0, 0.0)).await);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(reg.sweep_expired(Instant::now()), 0);
        assert_eq!(reg.sound_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_excluding_omits_caller() {
        let (reg, _) = registry(12.0);
        let (x, _rx_x) = join(&reg);
        let (y, _rx_y) = join(&reg);
        let (_idle, _rx_idle) = join(&reg);
        assert!(reg.start_sound(&x, tone(220.0, 0.0)).await);
        let mut params = tone(330.0, 1.0);
        params.lfo_frequency = -4.0;
        params.lfo_shape = LfoShape::Square;
        assert!(reg.start_sound(&y, params).await);

        let others = reg.snapshot_excluding(&x);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].client_id, y);
        assert!((others[0].frequency - 330.0).abs() < f64::EPSILON);
        assert!((others[0].lfo_frequency + 4.0).abs() < f64::EPSILON);
        assert_eq!(others[0].lfo_shape, LfoShape::Square);

        assert!(reg.snapshot_excluding(&y).iter().all(|a| a.client_id != y));
        assert_eq!(reg.snapshot_all().len(), 2);
    }

    #[tokio::test]
    async fn send_to_full_queue_drops() {
        let (reg, _) = registry(12.0);
        let id = ClientId::new();
        let (tx, _rx) = mpsc::channel(1);
        reg.register(id.clone(), tx).unwrap();
        assert!(reg.send_to(&id, "one".into()));
        assert!(!reg.send_to(&id, "two".into()));
        assert!(!reg.send_to(&ClientId::new(), "nobody".into()));
    }

    #[tokio::test]
    async fn send_to_closed_queue_fails() {
        let (reg, _) = registry(12.0);
        let (id, rx) = join(&reg);
        drop(rx);
        assert!(!reg.send_to(&id, "gone".into()));
    }
}

//! Playback state: the track list, the play cursor and transport controls.
//!
//! Nothing here touches audio. The store only tracks what should be playing
//! and hands the UI a consistent view of it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// seconds
    pub duration: f64,
    pub cover: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub cover: String,
    pub music_list: Vec<Track>,
}

/// How `next_music`/`prev_music` pick the next cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    #[default]
    Sequence,
    Loop,
    Random,
}

/// Composed read-only view for rendering the player.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub current_music: Option<Track>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f64,
    pub play_mode: PlayMode,
}

#[derive(Clone, Debug)]
pub struct PlaybackStore {
    music_list: Vec<Track>,
    current_music: Option<Track>,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    volume: f64,
    play_mode: PlayMode,
    current_index: usize,
    rng: StdRng,
}

impl Default for PlaybackStore {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl PlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a fixed random source, for reproducible shuffles.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            music_list: Vec::new(),
            current_music: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            play_mode: PlayMode::Sequence,
            current_index: 0,
            rng,
        }
    }

    // ========================================================================
    // Readers
    // ========================================================================

    pub fn music_list(&self) -> &[Track] {
        &self.music_list
    }

    pub fn current_music(&self) -> Option<&Track> {
        self.current_music.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Percentage of the current track played, 0 when the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            self.current_time / self.duration * 100.0
        } else {
            0.0
        }
    }

    /// Snapshot of every playback field plus the derived progress.
    pub fn player_state(&self) -> PlayerState {
        PlayerState {
            current_music: self.current_music.clone(),
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            play_mode: self.play_mode,
        }
    }

    // ========================================================================
    // Setters
    // ========================================================================

    /// Replaces the queue. The cursor is left as is.
    pub fn set_music_list(&mut self, list: Vec<Track>) {
        tracing::debug!(tracks = list.len(), "Track list replaced");
        self.music_list = list;
    }

    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    /// Saturates into `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.play_mode = mode;
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Starts `track`. The index is trusted as given.
    pub fn play_music(&mut self, track: Track, index: Option<usize>) {
        tracing::debug!(track = %track.title, ?index, "Play");
        self.current_music = Some(track);
        if let Some(index) = index {
            self.current_index = index;
        }
        self.is_playing = true;
    }

    pub fn pause_music(&mut self) {
        self.is_playing = false;
    }

    pub fn resume_music(&mut self) {
        self.is_playing = true;
    }

    /// Stops playback and rewinds to the start of the track.
    pub fn stop_music(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
    }

    /// Advances the cursor per the play mode. No-op on an empty queue.
    pub fn next_music(&mut self) {
        let len = self.music_list.len();
        if len == 0 {
            return;
        }

        let next = match self.play_mode {
            PlayMode::Random => self.rng.gen_range(0..len),
            PlayMode::Sequence | PlayMode::Loop => (self.current_index + 1) % len,
        };
        self.move_to(next);
    }

    /// Steps the cursor back per the play mode. No-op on an empty queue.
    pub fn prev_music(&mut self) {
        let len = self.music_list.len();
        if len == 0 {
            return;
        }

        let prev = match self.play_mode {
            PlayMode::Random => self.rng.gen_range(0..len),
            PlayMode::Sequence | PlayMode::Loop => {
                if self.current_index == 0 {
                    len - 1
                } else {
                    // a cursor past the end (trusted play_music index) wraps too
                    (self.current_index - 1).min(len - 1)
                }
            }
        };
        self.move_to(prev);
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index;
        self.current_music = self.music_list.get(index).cloned();
        self.is_playing = true;
        tracing::debug!(index, mode = ?self.play_mode, "Cursor moved");
    }
}

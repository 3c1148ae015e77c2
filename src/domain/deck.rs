//! The cassette deck sequencer.
//!
//! The deck owns all playback state for one mixtape session: whether a tape
//! is in the slot, which track the cursor is on and whether it is playing.
//! It knows nothing about sockets or the embedded player; callers feed it
//! events and forward the returned effects to whatever widget is attached.
//! Insert and eject pass through a one second transient while the mechanism
//! (visually) moves, during which transport buttons do nothing.

use std::time::{Duration, Instant};

use crate::domain::resolve::ResolvedTrack;

/// How long the insert/eject mechanics take before the deck settles.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Mechanical state of the tape slot. `playing` only exists on `Loaded`,
/// which keeps "playing with no cassette" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeState {
    Empty,
    Inserting { settled_at: Instant },
    Loaded { playing: bool },
    Ejecting { settled_at: Instant },
}

/// Everything the deck reacts to: front-panel buttons, the page clock and
/// the widget's lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckEvent {
    Insert,
    Eject,
    TogglePlay,
    /// relative cursor move, +1 for next and -1 for previous
    Advance(i32),
    /// the page finished its insert/eject animation
    Settled,
    /// the embedded player is constructed and accepts commands
    WidgetReady,
    /// the widget reports the current video finished on its own
    TrackEnded,
}

/// Instructions for the page: audio cues for the skin, commands for the
/// embedded player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CueInsert,
    CueEject,
    Load(String),
    Play,
    Pause,
}

pub struct Deck {
    tracks: Vec<ResolvedTrack>,
    /// 1-indexed cursor, like the counter on the faceplate
    current: usize,
    state: TapeState,
    widget_ready: bool,
}

impl Deck {
    pub fn new(tracks: Vec<ResolvedTrack>) -> Self {
        Self {
            tracks,
            current: 1,
            state: TapeState::Empty,
            widget_ready: false,
        }
    }

    pub fn state(&self) -> TapeState {
        self.state
    }

    /// 1-indexed position of the cursor.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, TapeState::Loaded { playing: true })
    }

    /// The track under the cursor; `None` when the tape has no playable
    /// tracks at all.
    pub fn current_track(&self) -> Option<&ResolvedTrack> {
        self.tracks.get(self.current - 1)
    }

    /// Feeds one event into the deck. Any transient whose deadline has
    /// passed settles first, then the event applies. Returns the effects
    /// the caller must forward to the page, in order.
    pub fn apply(&mut self, event: DeckEvent, now: Instant) -> Vec<Effect> {
        self.settle(now);

        let mut effects = Vec::new();
        let mut cue = None;
        let before = (self.current, self.is_playing());

        match event {
            DeckEvent::Insert => {
                if self.state == TapeState::Empty {
                    self.state = TapeState::Inserting {
                        settled_at: now + SETTLE_DELAY,
                    };
                    cue = Some(Effect::CueInsert);
                }
            }
            DeckEvent::Eject => match self.state {
                // ejecting mid-insert is allowed, the mechanism just
                // reverses
                TapeState::Inserting { .. } | TapeState::Loaded { .. } => {
                    self.state = TapeState::Ejecting {
                        settled_at: now + SETTLE_DELAY,
                    };
                    cue = Some(Effect::CueEject);
                }
                _ => {}
            },
            DeckEvent::TogglePlay => {
                if let TapeState::Loaded { playing } = self.state {
                    self.state = TapeState::Loaded { playing: !playing };
                }
            }
            DeckEvent::Advance(delta) => {
                if matches!(self.state, TapeState::Loaded { .. }) {
                    self.current = self.clamped(delta);
                }
            }
            DeckEvent::TrackEnded => {
                if matches!(self.state, TapeState::Loaded { .. }) {
                    if self.current < self.tracks.len() {
                        self.current += 1;
                    } else {
                        // end of side: stop, keep the cursor on the last
                        // track
                        self.state = TapeState::Loaded { playing: false };
                    }
                }
            }
            DeckEvent::WidgetReady => {
                if !self.widget_ready {
                    self.widget_ready = true;
                    self.sync_widget(&mut effects);
                }
            }
            DeckEvent::Settled => {}
        }

        let after = (self.current, self.is_playing());
        if after != before {
            self.sync_widget(&mut effects);
        }
        // for eject this lands after the pause, so the music stops before
        // the clunk
        if let Some(cue) = cue {
            effects.push(cue);
        }
        effects
    }

    /// The single synchronization point between deck state and widget:
    /// load the track under the cursor, then apply the playing flag.
    fn sync_widget(&self, effects: &mut Vec<Effect>) {
        if !self.widget_ready {
            return;
        }
        let Some(track) = self.current_track() else {
            return;
        };
        effects.push(Effect::Load(track.video_id.clone()));
        effects.push(if self.is_playing() {
            Effect::Play
        } else {
            Effect::Pause
        });
    }

    fn settle(&mut self, now: Instant) {
        match self.state {
            TapeState::Inserting { settled_at } if now >= settled_at => {
                self.state = TapeState::Loaded { playing: false };
            }
            TapeState::Ejecting { settled_at } if now >= settled_at => {
                self.state = TapeState::Empty;
            }
            _ => {}
        }
    }

    fn clamped(&self, delta: i32) -> usize {
        let len = self.tracks.len();
        if len == 0 {
            return 1;
        }
        let target = self.current as i64 + i64::from(delta);
        target.clamp(1, len as i64) as usize
    }
}

//! Deck sessions over websockets.
//!
//! Each playback page opens one socket and gets its own sequencer. The page
//! is a dumb faceplate: it forwards button presses and widget callbacks up,
//! and applies whatever commands come back down. All sequencing decisions
//! happen here, so two tabs on the same mixtape are two independent decks.

use std::{
    sync::{Arc, Mutex},
    thread,
    time::Instant,
};

use log::{debug, warn};
use rouille::{
    Request, Response,
    websocket::{self, Message, SendError, Websocket},
};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        deck::{Deck, DeckEvent, Effect, TapeState},
        id::MixtapeId,
        resolve,
    },
    http::error::ApiError,
    storage::{error::StoreError, operations::Store},
};

/// Events the page sends up the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Insert,
    Eject,
    Toggle,
    Prev,
    Next,
    /// the insert/eject animation finished
    Settled,
    WidgetReady,
    TrackEnded,
}

/// Messages the server pushes down the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ServerMessage {
    /// full deck snapshot, sent after every event and once on connect
    State {
        tape: String,
        playing: bool,
        current: usize,
        total: usize,
        video_id: Option<String>,
        url: Option<String>,
    },
    Load {
        video_id: String,
    },
    Play,
    Pause,
    Cue {
        name: String,
    },
}

/// Answers a `GET /deck/{id}` upgrade: loads the mixtape (with the usual
/// fallback), builds a deck and hands the socket to a session thread.
pub fn handle_deck_socket(id: String, store: &Arc<Mutex<Store>>, request: &Request) -> Response {
    let deck = match load_deck(&id, store) {
        Ok(deck) => deck,
        Err(e) => return e.into_response(),
    };

    let (response, websocket) = match websocket::start(request, None::<&str>) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("deck {id}: not a websocket upgrade: {e:?}");
            return Response::text("expected a websocket upgrade").with_status_code(400);
        }
    };

    thread::spawn(move || {
        // the receiver resolves once the upgrade response has been sent
        let Ok(ws) = websocket.recv() else {
            warn!("deck {id}: client vanished before the upgrade completed");
            return;
        };
        debug!("deck {id}: session open");
        run_session(deck, ws);
        debug!("deck {id}: session closed");
    });

    response
}

fn load_deck(id: &str, store: &Arc<Mutex<Store>>) -> Result<Deck, ApiError> {
    let id = MixtapeId::parse(id).map_err(|_| StoreError::InvalidMixtapeId)?;

    let mut store = store.lock().map_err(|e| {
        ApiError::Internal(format!("could not access the mixtape store under lock: {e}"))
    })?;
    let mixtape = store.fetch(&id)?.into_mixtape();

    Ok(Deck::new(resolve::resolve_tracks(&mixtape.tracks)))
}

fn run_session(mut deck: Deck, mut ws: Websocket) {
    // greet the page with the initial state
    if send(&mut ws, &snapshot(&deck)).is_err() {
        return;
    }

    while let Some(message) = ws.next() {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(_) => continue,
        };

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!("deck session: skipping malformed event {text:?}: {e}");
                continue;
            }
        };
        debug!("deck event: {event:?}");

        for message in process_event(&mut deck, event, Instant::now()) {
            if send(&mut ws, &message).is_err() {
                return;
            }
        }
    }
}

/// Applies one client event and returns everything the page must see: the
/// deck's effects in order, then a refreshed snapshot.
pub(crate) fn process_event(
    deck: &mut Deck,
    event: ClientEvent,
    now: Instant,
) -> Vec<ServerMessage> {
    let effects = deck.apply(deck_event(event), now);
    let mut out: Vec<ServerMessage> = effects.into_iter().map(effect_message).collect();
    out.push(snapshot(deck));
    out
}

fn deck_event(event: ClientEvent) -> DeckEvent {
    match event {
        ClientEvent::Insert => DeckEvent::Insert,
        ClientEvent::Eject => DeckEvent::Eject,
        ClientEvent::Toggle => DeckEvent::TogglePlay,
        ClientEvent::Prev => DeckEvent::Advance(-1),
        ClientEvent::Next => DeckEvent::Advance(1),
        ClientEvent::Settled => DeckEvent::Settled,
        ClientEvent::WidgetReady => DeckEvent::WidgetReady,
        ClientEvent::TrackEnded => DeckEvent::TrackEnded,
    }
}

fn effect_message(effect: Effect) -> ServerMessage {
    match effect {
        Effect::CueInsert => ServerMessage::Cue {
            name: "insert".to_string(),
        },
        Effect::CueEject => ServerMessage::Cue {
            name: "eject".to_string(),
        },
        Effect::Load(video_id) => ServerMessage::Load { video_id },
        Effect::Play => ServerMessage::Play,
        Effect::Pause => ServerMessage::Pause,
    }
}

fn snapshot(deck: &Deck) -> ServerMessage {
    let tape = match deck.state() {
        TapeState::Empty => "empty",
        TapeState::Inserting { .. } => "inserting",
        TapeState::Loaded { .. } => "loaded",
        TapeState::Ejecting { .. } => "ejecting",
    };
    let track = deck.current_track();
    ServerMessage::State {
        tape: tape.to_string(),
        playing: deck.is_playing(),
        current: deck.current(),
        total: deck.track_count(),
        video_id: track.map(|t| t.video_id.clone()),
        url: track.map(|t| t.url.clone()),
    }
}

fn send(ws: &mut Websocket, message: &ServerMessage) -> Result<(), SendError> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("deck session: failed to encode {message:?}: {e}");
            return Ok(());
        }
    };
    ws.send_text(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{deck::SETTLE_DELAY, mixtape::Track};

    fn mock_deck(n: usize) -> Deck {
        let tracks: Vec<Track> = (1..=n as u64)
            .map(|i| Track::new(i, format!("https://youtu.be/vid{i}")))
            .collect();
        Deck::new(resolve::resolve_tracks(&tracks))
    }

    fn state_of(messages: &[ServerMessage]) -> &ServerMessage {
        match messages.last() {
            Some(state @ ServerMessage::State { .. }) => state,
            other => panic!("expected a trailing state snapshot, got {other:?}"),
        }
    }

    #[test]
    fn client_events_parse_from_the_wire() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"insert"}"#).unwrap();
        assert_eq!(event, ClientEvent::Insert);

        let event: ClientEvent = serde_json::from_str(r#"{"event":"widget_ready"}"#).unwrap();
        assert_eq!(event, ClientEvent::WidgetReady);

        let event: ClientEvent = serde_json::from_str(r#"{"event":"track_ended"}"#).unwrap();
        assert_eq!(event, ClientEvent::TrackEnded);

        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"rewind"}"#).is_err());
    }

    #[test]
    fn server_messages_have_a_stable_wire_shape() {
        let load = ServerMessage::Load {
            video_id: "abc123".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&load).unwrap(),
            r#"{"cmd":"load","video_id":"abc123"}"#
        );

        assert_eq!(serde_json::to_string(&ServerMessage::Play).unwrap(), r#"{"cmd":"play"}"#);

        let cue = ServerMessage::Cue {
            name: "eject".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&cue).unwrap(),
            r#"{"cmd":"cue","name":"eject"}"#
        );
    }

    #[test]
    fn every_event_is_followed_by_a_snapshot() {
        let mut deck = mock_deck(2);
        let now = Instant::now();

        let messages = process_event(&mut deck, ClientEvent::Insert, now);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            ServerMessage::Cue {
                name: "insert".to_string()
            }
        );
        let ServerMessage::State { tape, total, .. } = state_of(&messages) else {
            unreachable!()
        };
        assert_eq!(tape, "inserting");
        assert_eq!(*total, 2);
    }

    #[test]
    fn a_play_session_over_the_wire() {
        let mut deck = mock_deck(2);
        let now = Instant::now();

        process_event(&mut deck, ClientEvent::WidgetReady, now);
        process_event(&mut deck, ClientEvent::Insert, now);
        let messages = process_event(&mut deck, ClientEvent::Settled, now + SETTLE_DELAY);
        let ServerMessage::State { tape, .. } = state_of(&messages) else {
            unreachable!()
        };
        assert_eq!(tape, "loaded");

        let messages = process_event(&mut deck, ClientEvent::Toggle, now + SETTLE_DELAY);
        assert_eq!(
            messages[0],
            ServerMessage::Load {
                video_id: "vid1".to_string()
            }
        );
        assert_eq!(messages[1], ServerMessage::Play);
        let ServerMessage::State { playing, .. } = state_of(&messages) else {
            unreachable!()
        };
        assert!(*playing);
    }

    #[test]
    fn prev_and_next_map_to_clamped_cursor_moves() {
        let mut deck = mock_deck(2);
        let now = Instant::now();
        process_event(&mut deck, ClientEvent::WidgetReady, now);
        process_event(&mut deck, ClientEvent::Insert, now);
        process_event(&mut deck, ClientEvent::Settled, now + SETTLE_DELAY);

        // at the first track, prev is only the snapshot
        let messages = process_event(&mut deck, ClientEvent::Prev, now + SETTLE_DELAY);
        assert_eq!(messages.len(), 1);

        let messages = process_event(&mut deck, ClientEvent::Next, now + SETTLE_DELAY);
        let ServerMessage::State { current, .. } = state_of(&messages) else {
            unreachable!()
        };
        assert_eq!(*current, 2);

        let messages = process_event(&mut deck, ClientEvent::Next, now + SETTLE_DELAY);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn snapshots_carry_the_current_track_link() {
        let mut deck = mock_deck(1);
        let now = Instant::now();

        let messages = process_event(&mut deck, ClientEvent::Settled, now);
        let ServerMessage::State { video_id, url, .. } = state_of(&messages) else {
            unreachable!()
        };
        assert_eq!(video_id.as_deref(), Some("vid1"));
        assert_eq!(
            url.as_deref(),
            Some("https://www.youtube.com/watch?v=vid1")
        );
    }

    #[test]
    fn an_unplayable_tape_has_no_current_track() {
        let mut deck = mock_deck(0);
        let now = Instant::now();

        let messages = process_event(&mut deck, ClientEvent::Settled, now);
        let ServerMessage::State {
            video_id,
            url,
            total,
            ..
        } = state_of(&messages) else {
            unreachable!()
        };
        assert_eq!(*video_id, None);
        assert_eq!(*url, None);
        assert_eq!(*total, 0);
    }
}

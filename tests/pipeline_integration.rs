//! End-to-end tests: synthetic replay bytes through to a finished `Game`.

mod common;

use common::{two_player_game, BARRACKS};
use sgreplay_parser::events::{EventContent, EventIterator};
use sgreplay_parser::format::SYSTEM_PLAYER_ID;
use sgreplay_parser::{decode_container, parse_replay, Game, Outcome, ParseOptions, TickRate};

fn parse_two_player() -> Game {
    let data = two_player_game().build();
    parse_replay(&data, &ParseOptions::default()).expect("synthetic replay should parse")
}

// ============================================================================
// Game Metadata Tests
// ============================================================================

#[test]
fn test_game_metadata() {
    let game = parse_two_player();

    assert_eq!(game.header.version, 1);
    assert_eq!(game.header.changelist, common::CHANGELIST);
    assert_eq!(game.map_name.as_deref(), Some("DesolateTemple"));
    assert_eq!(game.match_id.as_deref(), Some("match-1"));
    assert_eq!(game.tick_rate, TickRate::Hz1024);
    assert_eq!(game.duration_frames, 827_812);
    assert_eq!(game.duration, "13:28");
    assert_eq!(game.message_count, 8);
    assert!(!game.truncated);
    assert!(game.anomalies.is_empty(), "unexpected anomalies: {:?}", game.anomalies);
}

#[test]
fn test_trailer_matches_stream() {
    let builder = two_player_game();
    let game = parse_replay(&builder.build(), &ParseOptions::default()).unwrap();

    let trailer = game.trailer.expect("trailer present");
    assert_eq!(trailer.isize as usize, builder.stream().len());
}

// ============================================================================
// Player Tests
// ============================================================================

#[test]
fn test_players_and_outcomes() {
    let game = parse_two_player();
    assert_eq!(game.players.len(), 2);

    let alice = game.player(1).unwrap();
    assert_eq!(alice.name.as_deref(), Some("Alice"));
    assert_eq!(alice.outcome, Outcome::Win);
    assert_eq!(alice.team, Some(1));
    assert_eq!(alice.command_count, 2);

    let bob = game.player_by_name("Bob").unwrap();
    assert_eq!(bob.player_id, 2);
    assert_eq!(bob.outcome, Outcome::Loss);
    assert_eq!(bob.team, Some(2));

    let winners: Vec<_> = game.winners().map(|p| p.player_id).collect();
    let losers: Vec<_> = game.losers().map(|p| p.player_id).collect();
    assert_eq!(winners, vec![1]);
    assert_eq!(losers, vec![2]);
}

#[test]
fn test_system_player_is_not_listed() {
    let game = parse_two_player();
    assert!(game.player(SYSTEM_PLAYER_ID).is_none());
}

#[test]
fn test_build_order() {
    let game = parse_two_player();
    let alice = game.player(1).unwrap();

    assert_eq!(alice.build_order.len(), 1);
    let first = &alice.build_order[0];
    assert_eq!(first.building_type, BARRACKS);
    assert_eq!(first.frame, 13_796);
    assert_eq!(first.time, "0:13");
    assert_eq!(first.name, None);
    assert_eq!(first.label(), BARRACKS.to_string());

    let bob = game.player(2).unwrap();
    assert_eq!(bob.build_order[0].building_type, 42);
    assert_eq!(bob.build_order[0].time, "0:20");
}

#[test]
fn test_apm_timeline_covers_game() {
    let game = parse_two_player();
    let alice = game.player(1).unwrap();

    // 13:28 of game time spans minutes 0 through 13
    assert_eq!(alice.apm_timeline.len(), 14);
    assert_eq!(alice.apm_timeline[0].actions, 2);
    assert!(alice.apm_timeline[1..].iter().all(|b| b.actions == 0));
    assert!(alice.apm > 0.0);
}

// ============================================================================
// Event Tests
// ============================================================================

#[test]
fn test_command_coordinates() {
    let game = parse_two_player();
    let command = game
        .events
        .iter()
        .filter(|e| e.player_id == Some(1))
        .find_map(|e| e.as_command())
        .expect("Alice issued a command");

    let coords = command.ability.as_ref().unwrap().coords.unwrap();
    assert_eq!(coords.x, Some(-2320.0));
    assert_eq!(coords.y, Some(100.0));
    assert_eq!(command.building_type(), Some(BARRACKS));
}

#[test]
fn test_event_counts() {
    let game = parse_two_player();

    assert_eq!(game.event_count(), 8);
    assert_eq!(game.event_counts.get("Command"), Some(&3));
    assert_eq!(game.event_counts.get("PlayerInfo"), Some(&2));
    assert_eq!(game.event_counts.get("MapInfo"), Some(&1));
    assert_eq!(game.event_counts.get("Sync"), Some(&1));
    assert_eq!(game.event_counts.get("ChatOrProfile"), Some(&1));
}

#[test]
fn test_sync_event() {
    let game = parse_two_player();
    let sync = game
        .events
        .iter()
        .find_map(|e| match &e.content {
            EventContent::Sync(sync) => Some(sync),
            _ => None,
        })
        .unwrap();

    assert!(sync.initial);
    assert_eq!(sync.checksum, Some([1, 2, 3, 4, 5]));
}

#[test]
fn test_events_can_be_dropped() {
    let data = two_player_game().build();
    let game = parse_replay(&data, &ParseOptions::default().keep_events(false)).unwrap();

    assert!(game.events.is_empty());
    assert_eq!(game.event_count(), 8);
    assert_eq!(game.player(1).unwrap().command_count, 2);
}

#[test]
fn test_chat() {
    let game = parse_two_player();

    assert_eq!(game.chat.len(), 1);
    assert_eq!(game.chat[0].speaker, "Bob");
    assert_eq!(game.chat[0].text, "gl hf");
    assert_eq!(game.chat[0].time, "1:20");
}

#[test]
fn test_entities() {
    let game = parse_two_player();

    assert_eq!(game.entities.len(), 1);
    let entity = &game.entities[0];
    assert_eq!(entity.target_id, 9001);
    assert_eq!(entity.action_count, 1);
    assert_eq!(entity.likely_owner, Some(1));
}

// ============================================================================
// Lower-Level Access Tests
// ============================================================================

#[test]
fn test_decoded_replay_streams_events() {
    let data = two_player_game().build();
    let decoded = decode_container(&data).unwrap();

    assert_eq!(decoded.messages().count(), 8);

    let mut events = decoded.events();
    let kinds: Vec<&str> = events
        .by_ref()
        .map(|e| e.unwrap().content.type_name())
        .collect();
    assert_eq!(kinds[0], "MapInfo");
    assert_eq!(kinds.last(), Some(&"ChatOrProfile"));
    assert_eq!(events.extractor().map_name(), Some("DesolateTemple"));

    let footer = decoded.footer().footer.unwrap();
    assert_eq!(footer.final_frame, Some(827_812));
}

#[test]
fn test_event_iterator_on_raw_stream() {
    let stream = two_player_game().stream();
    let events: Vec<_> = EventIterator::new(&stream).collect::<Result<_, _>>().unwrap();

    assert_eq!(events.len(), 8);
    assert!(events[0].is_system());
}

#[test]
fn test_render_messages() {
    let data = two_player_game().build();
    let decoded = decode_container(&data).unwrap();

    let rendered: Vec<_> = decoded
        .render_messages(&ParseOptions::default())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rendered.len(), 8);
    assert_eq!(rendered[0]["index"], 0);
    assert!(rendered[0].get("fields").is_some());
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_game_serializes_to_json() {
    let game = parse_two_player();
    let json = serde_json::to_value(&game).unwrap();

    assert_eq!(json["map_name"], "DesolateTemple");
    assert_eq!(json["duration"], "13:28");
    assert_eq!(json["players"].as_array().unwrap().len(), 2);
    assert!(json["events"].as_array().is_some());
}

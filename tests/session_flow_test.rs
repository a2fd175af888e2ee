use citywalk::assets::{AssetError, AvatarModel, ClipInfo, VisualHandle};
use citywalk::config::ClientSettings;
use citywalk::networking::transport::{memory_link, ServerEnd, TransportEvent};
use citywalk::world::{AnimationName, InputEvent, MovementFlags, PeerId, SceneEvent};
use citywalk::{ClientSession, LinkState};
use glam::Vec3;
use serde_json::Value;
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

fn soldier() -> AvatarModel {
    AvatarModel {
        handle: VisualHandle::next(),
        clips: vec![
            ClipInfo::new("Idle", 2.0),
            ClipInfo::new("Run", 0.73),
            ClipInfo::new("TPose", 0.03),
            ClipInfo::new("Walk", 1.07),
        ],
    }
}

fn connected_session(now: Instant) -> (ClientSession, ServerEnd) {
    let mut session = ClientSession::new(ClientSettings::default(), soldier()).unwrap();
    let (link, server) = memory_link();
    session.attach_transport(link.handle);
    session.on_transport_event(TransportEvent::Opened, now);
    (session, server)
}

fn receive(session: &mut ClientSession, frame: &str, now: Instant) {
    session.on_transport_event(TransportEvent::Message(frame.to_string()), now);
}

#[test]
fn test_self_update_is_ignored() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);
    receive(
        &mut session,
        r#"{"type":"updateState","id":"abc","position":{"x":9,"y":9,"z":9},"animationState":"Run"}"#,
        now,
    );

    assert_eq!(session.local_id(), Some(&PeerId::from("abc")));
    assert!(session.registry().is_empty());
}

#[test]
fn test_joined_peer_follows_updates() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);
    receive(&mut session, r#"{"type":"playerJoined","id":"p1","position":{"x":1,"y":1,"z":1}}"#, now);
    receive(
        &mut session,
        r#"{"type":"updateState","id":"p1","position":{"x":2,"y":1,"z":1},"animationState":"Walk"}"#,
        now,
    );

    let peer = session.registry().get(&"p1".into()).unwrap();
    assert_eq!(peer.position, Vec3::new(2.0, 1.0, 1.0));
    assert_eq!(peer.current_animation, AnimationName::Walk);
    assert_eq!(session.take_load_requests(), vec![PeerId::from("p1")]);
    assert_eq!(session.status().text(), "Connected (ID: abc..., Players: 2)");
}

#[test]
fn test_repeated_update_is_idempotent() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);
    receive(&mut session, r#"{"type":"playerJoined","id":"p1"}"#, now);
    session.complete_peer_load("p1".into(), Ok(soldier()));

    let update = r#"{"type":"updateState","id":"p1","position":{"x":4,"y":1,"z":2},"rotation":{"_x":0,"_y":0.7071068,"_z":0,"_w":0.7071068},"animationState":"Run"}"#;
    receive(&mut session, update, now);
    let once = session.registry().get(&"p1".into()).cloned().unwrap();
    receive(&mut session, update, now);
    let twice = session.registry().get(&"p1".into()).cloned().unwrap();

    assert_eq!(once, twice);
    assert!(twice.animation_running());
}

#[test]
fn test_close_clears_peers_and_schedules_reconnect() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"initialState","yourId":"abc","players":[{"id":"p1"},{"id":"p2"}]}"#, now);
    session.complete_peer_load("p1".into(), Ok(soldier()));
    assert_eq!(session.registry().len(), 2);
    session.take_scene_events();

    session.on_transport_event(TransportEvent::Closed { reason: None }, now);

    assert!(session.registry().is_empty());
    assert!(session.local_id().is_none());
    assert_eq!(
        session.link_state(),
        LinkState::Reconnecting {
            retry_at: now + Duration::from_secs(5)
        }
    );
    assert_eq!(session.status().text(), "Disconnected. Attempting to reconnect...");
    let released: Vec<_> = session
        .take_scene_events()
        .into_iter()
        .filter(|event| matches!(event, SceneEvent::ReleaseVisual { .. }))
        .collect();
    assert_eq!(released.len(), 1);
}

#[test]
fn test_airborne_avatar_keeps_moving() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    let ground = session.settings().movement.ground_height;
    let start = session.avatar().position;

    session.handle_input(InputEvent::Press(MovementFlags::FORWARD), now);
    session.handle_input(InputEvent::Jump, now);
    session.tick(FRAME, now);

    let avatar = session.avatar();
    assert!(avatar.position.y > ground);
    assert!(avatar.position.z < start.z);
    assert!(!session.animation().current_running());

    // Land, then walking resumes.
    for _ in 0..100 {
        session.tick(FRAME, now);
    }
    assert_eq!(session.avatar().position.y, ground);
    assert!(session.avatar().grounded);
    assert_eq!(session.avatar().vertical_velocity, 0.0);
    assert_eq!(session.animation().current(), AnimationName::Walk);
    assert!(session.animation().current_running());
}

#[test]
fn test_send_rate_is_limited() {
    let start = Instant::now();
    let (mut session, mut server) = connected_session(start);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, start);

    let mut sent = 0;
    for frame in 0..60u32 {
        session.tick(FRAME, start + FRAME * frame);
        if server.take_sent().is_some() {
            sent += 1;
        }
    }
    // 60 frames of 16ms span 944ms: sends at 0, 112, 224, ... 896.
    assert_eq!(sent, 9);
}

#[test]
fn test_outbound_frame_shape() {
    let now = Instant::now();
    let (mut session, mut server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);
    session.handle_input(InputEvent::Press(MovementFlags::FORWARD), now);
    session.tick(FRAME, now);

    let frame: Value = serde_json::from_str(&server.take_sent().unwrap()).unwrap();
    assert_eq!(frame["type"], "updateState");
    assert_eq!(frame["animationState"], "Walk");
    assert!(frame.get("id").is_none());
    assert!(frame["rotation"].get("_w").is_some());
    assert_eq!(frame["position"]["y"], 1.0);
}

#[test]
fn test_respawn_sends_immediately() {
    let now = Instant::now();
    let (mut session, mut server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);

    session.handle_input(InputEvent::Press(MovementFlags::RIGHT), now);
    session.tick(FRAME, now);
    assert!(server.take_sent().is_some());

    let later = now + Duration::from_millis(20);
    session.handle_input(InputEvent::Respawn, later);
    let frame: Value = serde_json::from_str(&server.take_sent().unwrap()).unwrap();
    assert_eq!(frame["position"]["x"], 200.0);
    assert_eq!(frame["position"]["z"], 0.0);
}

#[test]
fn test_model_for_departed_peer_is_released() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);
    receive(&mut session, r#"{"type":"playerJoined","id":"p1"}"#, now);
    receive(&mut session, r#"{"type":"playerLeft","id":"p1"}"#, now);

    let model = soldier();
    let handle = model.handle;
    session.complete_peer_load("p1".into(), Ok(model));

    assert!(session.registry().is_empty());
    assert_eq!(
        session.take_scene_events(),
        vec![SceneEvent::ReleaseVisual {
            peer: "p1".into(),
            handle
        }]
    );
}

#[test]
fn test_rejoin_with_two_loads_releases_the_extra_model() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"me"}"#, now);
    receive(&mut session, r#"{"type":"playerJoined","id":"p1"}"#, now);
    receive(&mut session, r#"{"type":"playerLeft","id":"p1"}"#, now);
    receive(&mut session, r#"{"type":"playerJoined","id":"p1"}"#, now);
    assert_eq!(session.take_load_requests(), vec![PeerId::from("p1"), PeerId::from("p1")]);

    let first = soldier();
    let second = soldier();
    let (first_handle, second_handle) = (first.handle, second.handle);
    session.complete_peer_load("p1".into(), Ok(first));
    session.complete_peer_load("p1".into(), Ok(second));

    let events = session.take_scene_events();
    let attached: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            SceneEvent::AttachVisual { handle, .. } => Some(*handle),
            _ => None,
        })
        .collect();
    let released: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            SceneEvent::ReleaseVisual { handle, .. } => Some(*handle),
            _ => None,
        })
        .collect();
    assert_eq!(attached, vec![first_handle]);
    assert_eq!(released, vec![second_handle]);

    let peer = session.registry().get(&"p1".into()).unwrap();
    assert_eq!(peer.visual.as_ref().map(|visual| visual.handle), Some(first_handle));
}

#[test]
fn test_failed_peer_load_leaves_peer_without_visual() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);
    receive(&mut session, r#"{"type":"playerJoined","id":"p1"}"#, now);
    session.complete_peer_load(
        "p1".into(),
        Err(AssetError::NotFound {
            source_name: "Soldier".to_string(),
        }),
    );

    let peer = session.registry().get(&"p1".into()).unwrap();
    assert!(peer.visual.is_none());
    assert!(session.take_scene_events().is_empty());
}

#[test]
fn test_bad_frames_are_dropped() {
    let now = Instant::now();
    let (mut session, _server) = connected_session(now);
    receive(&mut session, "not json", now);
    receive(&mut session, r#"{"type":"chat","text":"hello"}"#, now);
    receive(&mut session, r#"{"type":"yourId","id":"abc"}"#, now);

    assert_eq!(session.local_id(), Some(&PeerId::from("abc")));
    assert_eq!(session.link_state(), LinkState::Open);
}

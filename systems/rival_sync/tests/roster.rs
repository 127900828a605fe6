use std::{thread, time::Duration};

use dash_runner_config::GameConfig;
use dash_runner_core::{
    protocol::{PeerMessage, PlayerUpdate},
    CenteredLane, PeerId, VehicleVariant,
};
use dash_runner_system_rival_sync::{inbox, Broadcaster, LocalSample, RivalSync, SessionNotice};

fn relayed(peer: u64, lane: f32, distance: f64, timestamp: u64) -> String {
    PeerMessage::PlayerUpdate(PlayerUpdate {
        user_id: Some(PeerId::new(peer)),
        lane: CenteredLane::new(lane),
        distance,
        car_index: VehicleVariant::new(1),
        timestamp,
    })
    .encode()
    .expect("encode")
}

#[test]
fn network_thread_hands_messages_to_the_tick_loop() {
    let (sender, inbox) = inbox();
    let mut sync = RivalSync::new(PeerId::new(1), &GameConfig::default());

    let network = thread::spawn(move || {
        for peer in 2..6 {
            for step in 0..10_u64 {
                assert!(sender.deliver(relayed(peer, 0.0, step as f64 * 10.0, step * 100)));
            }
        }
        assert!(sender.deliver("garbage"));
    });
    network.join().expect("network thread");

    let notices = sync.pump(&inbox);
    assert!(notices.is_empty());
    assert_eq!(sync.rivals().count(), 4);
    for rival in sync.rivals() {
        assert_eq!(rival.latest().distance, 90.0);
    }
    assert_eq!(sync.dropped().malformed, 1);
}

#[test]
fn stale_rival_is_excluded_on_the_next_tick() {
    let config = GameConfig::default();
    let mut sync = RivalSync::new(PeerId::new(1), &config);
    let _ = sync.receive(&relayed(2, 1.0, 10.0, 1));
    let _ = sync.receive(&relayed(3, -1.0, 10.0, 1));

    // Peer 3 keeps talking, peer 2 goes silent.
    let frame = Duration::from_millis(100);
    let mut timestamp = 1;
    while sync.now() + frame <= config.sync.stale_after() {
        let pruned = sync.tick(frame);
        assert!(pruned.is_empty());
        timestamp += 100;
        let _ = sync.receive(&relayed(3, -1.0, 10.0, timestamp));
    }
    assert_eq!(sync.frame().len(), 2, "silence at the threshold is not stale yet");

    let pruned = sync.tick(frame);
    assert_eq!(pruned, vec![PeerId::new(2)]);
    assert!(sync.rival(PeerId::new(2)).is_none());

    let visible: Vec<PeerId> = sync.frame().iter().map(|pose| pose.peer).collect();
    assert_eq!(visible, vec![PeerId::new(3)]);
}

#[test]
fn late_sample_after_pruning_recreates_the_rival() {
    let config = GameConfig::default();
    let mut sync = RivalSync::new(PeerId::new(1), &config);
    let _ = sync.receive(&relayed(2, 0.0, 10.0, 1));
    let _ = sync.tick(config.sync.stale_after() + Duration::from_millis(1));
    assert_eq!(sync.rivals().count(), 0);

    let _ = sync.receive(&relayed(2, 0.0, 500.0, 2));
    assert_eq!(sync.frame().len(), 1);
}

#[test]
fn lobby_notices_are_surfaced() {
    let mut sync = RivalSync::new(PeerId::new(1), &GameConfig::default());
    let notice = sync.receive(
        r#"{"type":"lobby_update","players":[{"id":1,"username":"ana"},{"id":2,"username":"bo"}]}"#,
    );
    match notice {
        Some(SessionNotice::LobbyChanged(players)) => assert_eq!(players.len(), 2),
        other => panic!("unexpected notice {other:?}"),
    }
}

#[test]
fn two_clients_see_each_other() {
    let config = GameConfig::default();
    let mut alice = RivalSync::new(PeerId::new(1), &config);
    let mut bob = RivalSync::new(PeerId::new(2), &config);
    let mut alice_out = Broadcaster::new(&config);
    let mut bob_out = Broadcaster::new(&config);

    let dt = Duration::from_millis(20);
    for step in 0..50_u64 {
        let _ = alice.tick(dt);
        let _ = bob.tick(dt);
        let now = step * 20;

        if let Some(PeerMessage::PlayerUpdate(mut update)) = alice_out.poll(
            dt,
            LocalSample {
                lane: CenteredLane::new(-1.0),
                distance: now as f64,
                vehicle: VehicleVariant::new(0),
                timestamp: now,
            },
        ) {
            // The relay stamps the sender before forwarding.
            update.user_id = Some(PeerId::new(1));
            let _ = bob.apply(PeerMessage::PlayerUpdate(update));
        }
        if let Some(PeerMessage::PlayerUpdate(mut update)) = bob_out.poll(
            dt,
            LocalSample {
                lane: CenteredLane::new(1.0),
                distance: now as f64 * 2.0,
                vehicle: VehicleVariant::new(4),
                timestamp: now,
            },
        ) {
            update.user_id = Some(PeerId::new(2));
            let _ = alice.apply(PeerMessage::PlayerUpdate(update));
        }
    }

    let seen_by_alice = alice.frame();
    let seen_by_bob = bob.frame();
    assert_eq!(seen_by_alice.len(), 1);
    assert_eq!(seen_by_bob.len(), 1);
    assert_eq!(seen_by_alice[0].peer, PeerId::new(2));
    assert_eq!(seen_by_alice[0].vehicle, VehicleVariant::new(4));
    assert_eq!(seen_by_bob[0].lane, -1.0);
}

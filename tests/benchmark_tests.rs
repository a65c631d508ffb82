//! Performance benchmarks for the simulation, the codec and the
//! reliability layer

use shared::{
    decode_frame, encode_frame, Frame, InputSample, Inventory, InventoryOp, Level, Message,
    PlayerPose, ReliableChannel, SimEvent, Tuning, Vec2, World, LONGBOW, PLAYER_HALF,
    PLAYER_MAX_HEALTH, SWORD, TONIC, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::time::Instant;

/// Benchmarks a full world step with four armed players trading fire
#[test]
fn benchmark_world_step() {
    let mut world = World::new(Level::arena(), Tuning::default());
    for peer in 1..=4u32 {
        world.spawn_player(peer, Vec2::new(200.0 + peer as f32 * 320.0, 900.0));
        assert!(world.apply_inventory_op(
            peer,
            InventoryOp::Add {
                item: LONGBOW,
                quantity: 1
            }
        ));
        assert!(world.apply_inventory_op(peer, InventoryOp::Equip { slot: 0 }));

        let mut sample = InputSample::idle();
        sample.axis_x = if peer % 2 == 0 { 1.0 } else { -1.0 };
        sample.attack = true;
        world.set_input(peer, sample);
        world.set_aim(peer, Vec2::new(960.0, 500.0));
    }

    let dt = 1.0 / 60.0;
    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = world.step(dt);
    }

    let duration = start.elapsed();
    println!(
        "World step: {} ticks with 4 armed players in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Almost three minutes of game time should cost well under a second.
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks frame encoding and decoding for the largest periodic payload
#[test]
fn benchmark_frame_codec() {
    let players: Vec<PlayerPose> = (1..=4u32)
        .map(|peer| PlayerPose {
            peer,
            position: Vec2::new(peer as f32 * 300.0, 984.0),
            velocity: Vec2::new(150.0, -40.0),
            aim: Vec2::new(960.0, 500.0),
            on_ground: true,
            dashing: false,
        })
        .collect();
    let frame = Frame::Unreliable {
        message: Message::Snapshot {
            tick: 123_456,
            players,
        },
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let data = encode_frame(&frame).unwrap();
        let _ = decode_frame(&data).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Frame codec: {} snapshot roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks the reliable channel's send, deliver and ack cycle
#[test]
fn benchmark_reliable_channel_cycle() {
    let mut sender = ReliableChannel::new();
    let mut receiver = ReliableChannel::new();
    let now = Instant::now();

    let iterations = 10_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let frame = sender.send(Message::DamageFlash { peer: i % 4 + 1 }, now);
        if let Frame::Reliable { seq, message } = frame {
            let released = receiver.on_reliable(seq, message);
            assert_eq!(released.len(), 1);
        }
        if let Some(Frame::Ack { cumulative }) = receiver.take_ack() {
            sender.on_ack(cumulative);
        }
    }

    let duration = start.elapsed();
    assert_eq!(sender.pending(), 0);
    println!(
        "Reliable channel: {} message cycles in {:?} ({:.2} ns/cycle)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks inventory mutation throughput
#[test]
fn benchmark_inventory_operations() {
    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut inventory = Inventory::new();
        for _ in 0..3 {
            assert!(inventory.add_item(TONIC, 5));
        }
        assert!(inventory.add_item(SWORD, 1));
        assert_eq!(inventory.equip_item(3), Some(SWORD));
        assert!(inventory.move_item(3, 10));
        assert!(inventory.remove_item(0, 5));
        assert_eq!(inventory.count_item(TONIC), 10);
    }

    let duration = start.elapsed();
    println!(
        "Inventory: {} mutation sequences in {:?} ({:.2} μs/sequence)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Stress tests a sustained four-player brawl for simulation sanity
#[test]
fn stress_test_sixty_second_brawl() {
    let mut world = World::new(Level::arena(), Tuning::default());
    for (peer, x) in [(1u32, 400.0), (2, 800.0), (3, 1120.0), (4, 1520.0)] {
        world.spawn_player(peer, Vec2::new(x, 900.0));
        assert!(world.apply_inventory_op(
            peer,
            InventoryOp::Add {
                item: LONGBOW,
                quantity: 1
            }
        ));
        assert!(world.apply_inventory_op(peer, InventoryOp::Equip { slot: 0 }));

        let mut sample = InputSample::idle();
        sample.attack = true;
        world.set_input(peer, sample);
        // Everyone fires across the arena's center line.
        world.set_aim(peer, Vec2::new(960.0, 984.0));
    }

    let dt = 1.0 / 60.0;
    let mut flashes = 0usize;
    let mut resets = 0usize;
    let start = Instant::now();

    for _ in 0..3600 {
        for event in world.step(dt) {
            match event {
                SimEvent::DamageFlash { .. } => flashes += 1,
                SimEvent::PlayerReset { .. } => resets += 1,
                _ => {}
            }
        }
    }

    let duration = start.elapsed();
    println!(
        "Brawl: 4 players × 3600 ticks in {:?}, {} hits and {} resets",
        duration, flashes, resets
    );

    assert!(flashes > 0, "nobody landed a hit in a minute of fire");
    assert!(resets > 0, "constant fire must deplete someone");
    assert!(world.projectiles().len() < 64);
    assert_eq!(world.player_count(), 4);
    for player in world.players_sorted() {
        assert!(player.health >= 1 && player.health <= PLAYER_MAX_HEALTH);
        assert!(player.position.x >= PLAYER_HALF);
        assert!(player.position.x <= WORLD_WIDTH - PLAYER_HALF);
        assert!(player.position.y >= PLAYER_HALF);
        assert!(player.position.y <= WORLD_HEIGHT - PLAYER_HALF);
    }

    // A minute of game time should simulate in a couple of wall seconds.
    assert!(duration.as_millis() < 5000);
}

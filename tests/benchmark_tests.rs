//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::SeedableRng;
use snake_server::game::{Arena, GameState, Snake};
use snake_shared::{Direction, Snapshot};
use std::time::Instant;

fn crowded_world(players: u32, length: i32) -> GameState {
    let mut game = GameState::new(Arena::new(400, 250), 50);

    for id in 0..players {
        let y = 2 + 2 * id as i32;
        let body = (0..length).map(|i| (length + 1 - i, y));
        let snake = Snake::with_body(format!("p{}", id), body, Direction::Right)
            .expect("length is positive");
        game.place_player(id + 1, snake);
    }

    game
}

/// Benchmarks a full simulation step with many snakes
#[test]
fn benchmark_tick() {
    let mut game = crowded_world(100, 20);
    let mut rng = StdRng::seed_from_u64(1);

    let iterations = 300;
    let start = Instant::now();

    for _ in 0..iterations {
        game.tick(&mut rng);
    }

    let duration = start.elapsed();
    println!(
        "Tick: {} snakes × {} ticks in {:?} ({:.2} μs/tick)",
        100,
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(game.tick, iterations);
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks snapshot encoding performance
#[test]
fn benchmark_snapshot_encoding() {
    let game = crowded_world(100, 50);

    let iterations = 500;
    let start = Instant::now();
    let mut bytes = 0;

    for _ in 0..iterations {
        bytes = game.snapshot().encode().unwrap().len();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot encoding: {} iterations in {:?} ({:.2} μs/iter, {} bytes)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        bytes
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
    assert!(Snapshot::decode(&game.snapshot().encode().unwrap()).is_ok());
}

//! Performance checks for the simulation engine.

use server::game::GameState;
use server::level::Level;
use std::time::Instant;

fn bordered_level(width: usize, height: usize, max_fruits: usize) -> Level {
    let mut rows = Vec::with_capacity(height);
    for y in 0..height {
        let row: String = (0..width)
            .map(|x| {
                if y == 0 || y == height - 1 || x == 0 || x == width - 1 {
                    '#'
                } else {
                    ' '
                }
            })
            .collect();
        rows.push(row);
    }
    Level::from_map(1, &rows.join("\n"), 10, max_fruits)
}

/// Benchmarks the tick step with a populated board.
#[test]
fn benchmark_step_throughput() {
    let mut state = GameState::new(bordered_level(60, 40, 10), 5, false);
    for id in 1..=50 {
        state.add_player(id, &format!("player{}", id));
    }

    let iterations = 5_000;
    let start = Instant::now();

    for tick in 0..iterations {
        // keep the board populated as snakes die off
        if tick % 100 == 0 {
            for id in 1..=50 {
                state.add_player(id, &format!("player{}", id));
            }
        }
        state.step();
    }

    let duration = start.elapsed();
    println!(
        "Engine step: {} iterations in {:?} ({:.2} us/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Well under one tick period even at the fastest level rate
    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks snapshot serialization and board rendering.
#[test]
fn benchmark_render_and_snapshot() {
    let mut state = GameState::new(bordered_level(60, 40, 10), 5, false);
    for id in 1..=20 {
        state.add_player(id, &format!("player{}", id));
    }

    let iterations = 2_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let board = state.render_board();
        let snapshot = state.snapshot();
        assert!(!board.is_empty());
        assert_eq!(snapshot.width, 60);
    }

    let duration = start.elapsed();
    println!(
        "Render + snapshot: {} iterations in {:?} ({:.2} us/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2_000);
}

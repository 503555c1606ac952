//! Performance benchmarks for the hot paths of a match

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::leaderboard::rank;
use server::registry::{ConnectionId, Player};
use server::session::{Effect, Session, SessionEvent};
use server::settings::MatchSettings;
use server::word_bank::WordBank;
use shared::{DisplayName, ServerLine};
use std::time::{Duration, Instant};

/// Benchmarks drawing match sequences from the built-in catalog
#[test]
fn benchmark_word_draw() {
    let bank = WordBank::builtin();
    let mut rng = StdRng::seed_from_u64(42);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let words = bank.draw(10, &mut rng).unwrap();
        assert_eq!(words.len(), 10);
    }

    let duration = start.elapsed();
    println!(
        "Word draw: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks ranking a large lobby
#[test]
fn benchmark_leaderboard_ranking() {
    let players: Vec<Player> = (0..1_000u64)
        .map(|i| {
            let name = DisplayName::parse(&format!("player{}", i)).unwrap();
            let mut player = Player::new(name, ConnectionId(i));
            player.score = (i * 7 % 13) as u32;
            player
        })
        .collect();

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let standings = rank(&players);
        assert_eq!(standings.len(), players.len());
    }

    let duration = start.elapsed();
    println!(
        "Ranking 1000 players: {} iterations in {:?}",
        iterations, duration
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks answer handling with wrong guesses that keep the match running
#[test]
fn stress_test_many_answers() {
    let settings = MatchSettings {
        sequence_length: 10,
        win_threshold: 10,
        countdown_steps: 0,
        step_delay: Duration::ZERO,
    };
    let mut session = Session::with_seed(settings, WordBank::builtin(), 5).unwrap();

    for (id, name) in ["ana", "bea", "carla", "dani"].iter().enumerate() {
        session.handle(SessionEvent::Join {
            connection: ConnectionId(id as u64),
            name: name.to_string(),
        });
    }
    let mut pending = None;
    for id in 0..4 {
        let effects = session.handle(SessionEvent::Message {
            connection: ConnectionId(id),
            text: "/ready".to_string(),
        });
        pending = effects.iter().find_map(|e| match e {
            Effect::ScheduleTick { generation, .. } => Some(*generation),
            _ => None,
        });
    }
    let generation = pending.unwrap();
    session.handle(SessionEvent::CountdownTick { generation });

    let answers = 100_000;
    let start = Instant::now();

    for i in 0..answers {
        session.handle(SessionEvent::Message {
            connection: ConnectionId(i % 4),
            text: "not a catalog word".to_string(),
        });
    }

    let duration = start.elapsed();
    println!(
        "Answer handling: {} answers in {:?} ({:.2} μs/answer)",
        answers,
        duration,
        duration.as_micros() as f64 / answers as f64
    );

    let errors: u32 = session.registry().all().iter().map(|p| p.errors).sum();
    assert_eq!(errors, answers as u32);
    assert!(duration.as_secs() < 5);
}

/// Benchmarks marker parsing on the client side
#[test]
fn benchmark_server_line_parsing() {
    let lines = [
        "/score 7",
        "/errors 3",
        "/stats",
        "Type: relógio",
        "ana joined the lobby.",
    ];

    let iterations = 100_000;
    let start = Instant::now();

    let mut markers = 0;
    for i in 0..iterations {
        if !matches!(ServerLine::parse(lines[i % lines.len()]), ServerLine::Text(_)) {
            markers += 1;
        }
    }

    let duration = start.elapsed();
    println!("Line parsing: {} lines in {:?}", iterations, duration);

    assert_eq!(markers, iterations / lines.len() * 3);
    assert!(duration.as_millis() < 1000);
}

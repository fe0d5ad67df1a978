use super::*;
use crate::protocol::MoveCommand;

fn make_settings() -> Settings {
    Settings {
        max_powerups: 0,
        ..Settings::default()
    }
}

fn make_state(settings: Settings) -> WorldState {
    WorldState {
        settings,
        snakes: BTreeMap::new(),
        powerups: BTreeMap::new(),
        walls: BTreeMap::new(),
        sessions: HashMap::new(),
        next_snake_id: 1,
        next_powerup_id: 1,
        powerup_gate: 0,
        frame: 0,
    }
}

fn make_snake(id: u32, body: &[Vector2D], direction: Vector2D) -> Snake {
    let mut snake = Snake::new(id, format!("snake-{id}"));
    snake.body = body.to_vec();
    snake.direction = direction;
    snake.prev_direction = direction;
    snake.alive = true;
    snake.respawn = 0;
    snake.join = false;
    snake
}

fn attach_session(state: &mut WorldState, snake_id: u32) -> Arc<SessionInbound> {
    let inbound = Arc::new(SessionInbound::new());
    let (outbound, frames) = mpsc::channel(OUTBOUND_FRAME_CAPACITY);
    // Keep the receiver alive so broadcasts do not count as a stall.
    std::mem::forget(frames);
    state.sessions.insert(
        format!("session-{snake_id}"),
        SessionEntry {
            snake_id,
            inbound: Arc::clone(&inbound),
            outbound,
        },
    );
    inbound
}

#[test]
fn new_snake_spawns_vertical_on_first_tick() {
    let mut state = make_state(make_settings());
    state.snakes.insert(1, Snake::new(1, "alice".to_string()));

    state.respawn_scan();

    let snake = &state.snakes[&1];
    assert!(snake.alive);
    assert!(snake.join);
    assert_eq!(snake.score, 0);
    assert_eq!(snake.body.len(), 2);
    let tail = snake.body[0];
    let head = snake.body[1];
    assert_eq!(tail.x, head.x);
    assert_eq!(tail.y - head.y, state.settings.snake_starting_size as f64);
    assert_eq!(snake.direction, Vector2D::UP);

    let frame = state.encode_frame();
    assert!(frame.contains("\"join\":true"));
    assert!(frame.contains("\"name\":\"alice\""));

    state.garbage_pass();
    assert!(!state.snakes[&1].join);
}

#[test]
fn powerup_pickup_grants_score_and_growth() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    state.powerups.insert(
        1,
        Powerup {
            id: 1,
            loc: Vector2D::new(70.0, 0.0),
            died: false,
        },
    );

    state.tick();

    let snake = &state.snakes[&1];
    assert_eq!(snake.score, 10);
    assert_eq!(snake.growth, 24);
    assert!(state.powerups.is_empty(), "consumed powerup collected");

    // The tail holds still for exactly the granted growth frames.
    let tail = state.snakes[&1].body[0];
    assert_eq!(tail, Vector2D::new(6.0, 0.0));
    for _ in 0..24 {
        state.tick();
    }
    assert_eq!(state.snakes[&1].body[0], Vector2D::new(6.0, 0.0));
    assert_eq!(state.snakes[&1].growth, 0);
    state.tick();
    assert_eq!(state.snakes[&1].body[0], Vector2D::new(12.0, 0.0));
}

#[test]
fn consumed_powerup_is_emitted_once_with_terminal_flag() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    state.powerups.insert(
        4,
        Powerup {
            id: 4,
            loc: Vector2D::new(70.0, 0.0),
            died: false,
        },
    );

    state.apply_pending_commands();
    state.respawn_scan();
    let ids: Vec<u32> = state.snakes.keys().copied().collect();
    for id in ids {
        let mut snake = state.snakes.remove(&id).expect("snake");
        state.move_snake(&mut snake);
        state.resolve_collisions(&mut snake);
        state.snakes.insert(id, snake);
    }
    let frame = state.encode_frame();
    assert!(frame.contains("\"power\":4"));
    assert!(frame.contains("\"died\":true"));
    state.garbage_pass();
    assert!(state.powerups.is_empty());
}

#[test]
fn wrap_teleports_head_and_resets_growth() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(934.0, 0.0), Vector2D::new(994.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );

    state.tick();

    let snake = &state.snakes[&1];
    assert_eq!(
        snake.body,
        vec![Vector2D::new(-995.0, 0.0), Vector2D::new(-990.0, 0.0)]
    );
    // A 60-unit body at 6 units per tick: ten ticks of held tail.
    assert_eq!(snake.growth, 10);
    assert!(snake.alive);
}

#[test]
fn head_to_head_higher_score_survives() {
    let mut state = make_state(make_settings());
    let mut strong = make_snake(
        1,
        &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
        Vector2D::RIGHT,
    );
    strong.score = 30;
    let mut weak = make_snake(
        2,
        &[Vector2D::new(76.0, 0.0), Vector2D::new(16.0, 0.0)],
        Vector2D::LEFT,
    );
    weak.score = 20;
    state.snakes.insert(1, strong);
    state.snakes.insert(2, weak);

    state.tick();

    let strong = &state.snakes[&1];
    assert!(strong.alive);
    assert!(!strong.died);
    assert_eq!(strong.score, 30);

    let weak = &state.snakes[&2];
    assert!(!weak.alive);
    assert!(weak.died);
    assert_eq!(weak.score, 0);
    assert_eq!(weak.respawn, state.settings.respawn_rate);
}

#[test]
fn equal_score_head_to_head_favors_earliest_joined() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    state.snakes.insert(
        2,
        make_snake(
            2,
            &[Vector2D::new(76.0, 0.0), Vector2D::new(16.0, 0.0)],
            Vector2D::LEFT,
        ),
    );

    state.tick();

    assert!(state.snakes[&1].alive);
    assert!(!state.snakes[&2].alive);
}

#[test]
fn body_collision_kills_the_moving_snake() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    // A vertical body crossing the runner's path, head far away.
    state.snakes.insert(
        2,
        make_snake(
            2,
            &[Vector2D::new(10.0, 150.0), Vector2D::new(10.0, -50.0)],
            Vector2D::UP,
        ),
    );

    state.tick();

    assert!(!state.snakes[&1].alive);
    assert!(state.snakes[&1].died);
    assert!(state.snakes[&2].alive);
}

#[test]
fn poison_survivor_absorbs_score_and_growth() {
    let settings = Settings {
        game_mode: GameMode::Poison,
        ..make_settings()
    };
    let mut state = make_state(settings);
    let mut runner = make_snake(
        1,
        &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
        Vector2D::RIGHT,
    );
    runner.score = 30;
    let mut blocker = make_snake(
        2,
        &[Vector2D::new(10.0, 150.0), Vector2D::new(10.0, -50.0)],
        Vector2D::UP,
    );
    blocker.score = 20;
    state.snakes.insert(1, runner);
    state.snakes.insert(2, blocker);

    state.tick();

    assert!(!state.snakes[&1].alive);
    assert_eq!(state.snakes[&1].score, 0);
    let blocker = &state.snakes[&2];
    assert!(blocker.alive);
    assert_eq!(blocker.score, 50);
    // Three powerups' worth of growth, minus the blocker's own tail hold
    // later in the same tick.
    assert_eq!(blocker.growth, 3 * 24 - 1);
}

#[test]
fn venom_attacker_absorbs_victim() {
    let settings = Settings {
        game_mode: GameMode::Venom,
        ..make_settings()
    };
    let mut state = make_state(settings);
    let mut attacker = make_snake(
        1,
        &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
        Vector2D::RIGHT,
    );
    attacker.score = 40;
    attacker.venomous = true;
    attacker.venom_ticks = 500;
    let mut victim = make_snake(
        2,
        &[Vector2D::new(10.0, 150.0), Vector2D::new(10.0, -50.0)],
        Vector2D::UP,
    );
    victim.score = 10;
    state.snakes.insert(1, attacker);
    state.snakes.insert(2, victim);

    state.tick();

    let attacker = &state.snakes[&1];
    assert!(attacker.alive);
    assert_eq!(attacker.score, 50);
    assert!(attacker.venomous);
    // Only the regular countdown touched the timer.
    assert_eq!(attacker.venom_ticks, 499);

    let victim = &state.snakes[&2];
    assert!(!victim.alive);
    assert!(victim.died);
    assert_eq!(victim.respawn, state.settings.respawn_rate);
}

#[test]
fn venom_absorb_credits_at_least_one_powerup() {
    let settings = Settings {
        game_mode: GameMode::Venom,
        ..make_settings()
    };
    let mut state = make_state(settings);
    let mut attacker = make_snake(
        1,
        &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
        Vector2D::RIGHT,
    );
    attacker.venomous = true;
    attacker.venom_ticks = 500;
    state.snakes.insert(1, attacker);
    state.snakes.insert(
        2,
        make_snake(
            2,
            &[Vector2D::new(10.0, 150.0), Vector2D::new(10.0, -50.0)],
            Vector2D::UP,
        ),
    );

    state.tick();

    assert_eq!(state.snakes[&1].score, 10);
}

#[test]
fn non_venomous_attacker_dies_on_contact() {
    let settings = Settings {
        game_mode: GameMode::Venom,
        ..make_settings()
    };
    let mut state = make_state(settings);
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(-60.0, 0.0), Vector2D::new(0.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    state.snakes.insert(
        2,
        make_snake(
            2,
            &[Vector2D::new(10.0, 150.0), Vector2D::new(10.0, -50.0)],
            Vector2D::UP,
        ),
    );

    state.tick();

    assert!(!state.snakes[&1].alive);
    assert!(state.snakes[&2].alive);
}

#[test]
fn venom_powerup_grants_time_not_score() {
    let settings = Settings {
        game_mode: GameMode::Venom,
        ..make_settings()
    };
    let mut state = make_state(settings);
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    state.powerups.insert(
        1,
        Powerup {
            id: 1,
            loc: Vector2D::new(70.0, 0.0),
            died: false,
        },
    );
    let expected_ticks = state.settings.venom_ticks();

    state.tick();

    let snake = &state.snakes[&1];
    assert_eq!(snake.score, 0);
    assert_eq!(snake.growth, 0);
    assert!(snake.venomous);
    assert_eq!(snake.venom_ticks, expected_ticks - 1);
}

#[test]
fn venomous_name_carries_remaining_seconds() {
    let settings = Settings {
        game_mode: GameMode::Venom,
        ..make_settings()
    };
    let mut state = make_state(settings);
    let mut snake = make_snake(
        1,
        &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
        Vector2D::RIGHT,
    );
    snake.venomous = true;
    // 500 ticks at 17 ms per tick is 8.5 seconds.
    snake.venom_ticks = 500;
    state.snakes.insert(1, snake);

    let frame = state.encode_frame();
    assert!(frame.contains("\"name\":\"snake-1 8\""));
}

#[test]
fn wall_collision_kills() {
    let mut state = make_state(make_settings());
    state.walls.insert(
        0,
        Wall::new(0, Vector2D::new(0.0, 0.0), Vector2D::new(0.0, 0.0)),
    );
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(-100.0, 0.0), Vector2D::new(-40.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );

    state.tick();

    assert!(!state.snakes[&1].alive);
    assert!(state.snakes[&1].died);
}

#[test]
fn opposite_turn_command_is_rejected() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    let inbound = attach_session(&mut state, 1);
    inbound.store(MoveCommand::Left);

    state.tick();

    let snake = &state.snakes[&1];
    assert_eq!(snake.direction, Vector2D::RIGHT);
    assert!(snake.alive);
    assert_eq!(snake.head(), Vector2D::new(66.0, 0.0));
}

#[test]
fn turn_into_short_neck_is_rejected() {
    let mut state = make_state(make_settings());
    // Was heading up, just turned right; the head segment is shorter than
    // the snake width.
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[
                Vector2D::new(0.0, 60.0),
                Vector2D::new(0.0, 0.0),
                Vector2D::new(4.0, 0.0),
            ],
            Vector2D::RIGHT,
        ),
    );
    let inbound = attach_session(&mut state, 1);
    inbound.store(MoveCommand::Down);

    state.tick();
    assert_eq!(state.snakes[&1].direction, Vector2D::RIGHT);

    // Away from the neck the same geometry accepts a turn.
    inbound.store(MoveCommand::Up);
    state.tick();
    assert_eq!(state.snakes[&1].direction, Vector2D::UP);
}

#[test]
fn repeated_direction_command_is_a_noop() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    let inbound = attach_session(&mut state, 1);
    inbound.store(MoveCommand::Right);

    state.tick();

    // No corner point was inserted for an unchanged direction.
    let snake = &state.snakes[&1];
    assert_eq!(snake.body.len(), 2);
    assert_eq!(snake.head(), Vector2D::new(66.0, 0.0));
}

#[test]
fn turn_inserts_corner_point() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    let inbound = attach_session(&mut state, 1);
    inbound.store(MoveCommand::Up);

    state.tick();

    let snake = &state.snakes[&1];
    assert_eq!(snake.direction, Vector2D::UP);
    assert_eq!(snake.body.len(), 3);
    assert_eq!(snake.body[1], Vector2D::new(60.0, 0.0));
    assert_eq!(snake.head(), Vector2D::new(60.0, -6.0));
}

#[test]
fn died_flag_holds_for_exactly_one_tick() {
    let mut state = make_state(make_settings());
    let mut snake = make_snake(
        1,
        &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
        Vector2D::RIGHT,
    );
    snake.kill(5);
    state.snakes.insert(1, snake);

    assert!(state.snakes[&1].died);
    state.tick();
    assert!(!state.snakes[&1].died);
    assert_eq!(state.snakes[&1].respawn, 4);

    for _ in 0..4 {
        state.tick();
    }
    let snake = &state.snakes[&1];
    assert!(snake.alive, "respawn timer expired");
    assert_eq!(snake.body.len(), 2);
}

#[test]
fn disconnect_emits_terminal_flags_then_removes() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    attach_session(&mut state, 1);

    state.disconnect_session("session-1");
    let snake = &state.snakes[&1];
    assert!(snake.dc);
    assert!(snake.died);
    assert!(!snake.alive);

    let frame = state.encode_frame();
    assert!(frame.contains("\"dc\":true"));

    state.tick();
    assert!(state.snakes.is_empty());
    assert!(state.sessions.is_empty());
}

#[test]
fn powerup_population_respects_the_cap() {
    let settings = Settings {
        max_powerups: 2,
        powerup_delay: 1,
        ..Settings::default()
    };
    let mut state = make_state(settings);

    for _ in 0..10 {
        state.tick();
        assert!(state.powerups.len() <= 2);
    }
    assert_eq!(state.powerups.len(), 2);
}

#[test]
fn spawned_powerups_get_fresh_ids() {
    let settings = Settings {
        max_powerups: 4,
        powerup_delay: 1,
        ..Settings::default()
    };
    let mut state = make_state(settings);
    for _ in 0..8 {
        state.tick();
    }
    let ids: Vec<u32> = state.powerups.keys().copied().collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn blocked_spawn_is_skipped_and_retried() {
    // The interior degenerates to a single point and a wall sits on it, so
    // every placement attempt collides and the respawn keeps retrying.
    let settings = Settings {
        universe_size: 240,
        ..make_settings()
    };
    let mut state = make_state(settings);
    state.walls.insert(
        0,
        Wall::new(0, Vector2D::new(0.0, 0.0), Vector2D::new(0.0, 0.0)),
    );
    state.snakes.insert(1, Snake::new(1, "boxed".to_string()));

    for _ in 0..3 {
        state.tick();
        let snake = &state.snakes[&1];
        assert!(!snake.alive);
        assert_eq!(snake.respawn, 1);
    }
}

#[test]
fn body_stays_axis_aligned_across_ticks() {
    let mut state = make_state(make_settings());
    state.snakes.insert(
        1,
        make_snake(
            1,
            &[Vector2D::new(0.0, 0.0), Vector2D::new(60.0, 0.0)],
            Vector2D::RIGHT,
        ),
    );
    let inbound = attach_session(&mut state, 1);

    let commands = [
        MoveCommand::Up,
        MoveCommand::Right,
        MoveCommand::Down,
        MoveCommand::Right,
    ];
    for command in commands {
        inbound.store(command);
        state.tick();
        let snake = &state.snakes[&1];
        assert!(snake.body.len() >= 2);
        for pair in snake.body.windows(2) {
            let dx = pair[1].x - pair[0].x;
            let dy = pair[1].y - pair[0].y;
            assert!(
                dx == 0.0 || dy == 0.0,
                "segment not axis aligned: {pair:?}"
            );
        }
    }
}

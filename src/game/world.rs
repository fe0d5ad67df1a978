use super::collision::{point_hits_powerup, point_hits_snake, point_hits_wall, self_collision};
use super::constants::{
    MAX_PLACEMENT_ATTEMPTS, OUTBOUND_FRAME_CAPACITY, POWERUP_SCORE, POWERUP_WIDTH, SNAKE_WIDTH,
    STATUS_LOG_INTERVAL_TICKS,
};
use super::types::{Powerup, Snake, Wall};
use super::vector::{polyline_length, Vector2D};
use crate::protocol;
use crate::settings::{GameMode, Settings};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

mod session;
#[cfg(test)]
mod tests;

pub use session::{SessionInbound, SessionIo};

/// The authoritative arena. All mutable state sits behind one lock; the
/// simulation task holds it for the duration of a tick, the connection
/// manager takes it briefly to register and unregister sessions.
#[derive(Debug)]
pub struct World {
    state: Mutex<WorldState>,
}

#[derive(Debug)]
struct SessionEntry {
    snake_id: u32,
    inbound: Arc<SessionInbound>,
    outbound: mpsc::Sender<String>,
}

#[derive(Debug)]
struct WorldState {
    settings: Settings,
    /// Snakes and powerups iterate in id order; ids are handed out
    /// monotonically at connect, so "first iterated" is "earliest joined"
    /// and collision tie-breaks are deterministic.
    snakes: BTreeMap<u32, Snake>,
    powerups: BTreeMap<u32, Powerup>,
    walls: BTreeMap<u32, Wall>,
    sessions: HashMap<String, SessionEntry>,
    next_snake_id: u32,
    next_powerup_id: u32,
    /// Ticks until the next powerup may spawn.
    powerup_gate: u32,
    frame: u64,
}

impl World {
    pub fn new(settings: Settings) -> Self {
        let walls = settings
            .walls
            .iter()
            .map(|config| (config.id, Wall::new(config.id, config.p1, config.p2)))
            .collect();
        Self {
            state: Mutex::new(WorldState {
                settings,
                snakes: BTreeMap::new(),
                powerups: BTreeMap::new(),
                walls,
                sessions: HashMap::new(),
                next_snake_id: 1,
                next_powerup_id: 1,
                powerup_gate: 0,
                frame: 0,
            }),
        }
    }

    /// Registers a client: allocates the snake id, creates the snake (it is
    /// placed on the next tick), and returns the handshake payload plus the
    /// session's I/O endpoints.
    pub async fn connect(&self, raw_name: &str) -> SessionIo {
        let mut state = self.state.lock().await;
        let name = protocol::sanitize_name(raw_name);
        let snake_id = state.next_snake_id;
        state.next_snake_id += 1;
        state.snakes.insert(snake_id, Snake::new(snake_id, name));

        let session_id = Uuid::new_v4().to_string();
        let inbound = Arc::new(SessionInbound::new());
        let (outbound, frames) = mpsc::channel(OUTBOUND_FRAME_CAPACITY);
        state.sessions.insert(
            session_id.clone(),
            SessionEntry {
                snake_id,
                inbound: Arc::clone(&inbound),
                outbound,
            },
        );

        SessionIo {
            session_id,
            snake_id,
            universe_size: state.settings.universe_size,
            walls: state.walls.values().map(protocol::wall_record).collect(),
            inbound,
            frames,
        }
    }

    pub async fn disconnect(&self, session_id: &str) {
        let mut state = self.state.lock().await;
        state.disconnect_session(session_id);
    }

    /// Advances the simulation by one tick and broadcasts the frame.
    pub async fn tick(&self) {
        let mut state = self.state.lock().await;
        state.tick();
    }
}

impl WorldState {
    fn tick(&mut self) {
        self.apply_pending_commands();
        self.respawn_scan();

        let ids: Vec<u32> = self.snakes.keys().copied().collect();
        for id in ids {
            let Some(mut snake) = self.snakes.remove(&id) else {
                continue;
            };
            if snake.alive {
                self.move_snake(&mut snake);
                self.resolve_collisions(&mut snake);
                if snake.venomous {
                    snake.venom_ticks = snake.venom_ticks.saturating_sub(1);
                    if snake.venom_ticks == 0 {
                        snake.venomous = false;
                    }
                }
            }
            self.snakes.insert(id, snake);
        }

        self.spawn_powerups();

        let frame = self.encode_frame();
        self.broadcast(frame);
        self.garbage_pass();

        self.frame += 1;
        if self.frame % STATUS_LOG_INTERVAL_TICKS == 0 {
            tracing::debug!(
                sessions = self.sessions.len(),
                snakes = self.snakes.len(),
                powerups = self.powerups.len(),
                frame = self.frame,
                "arena status"
            );
        }
    }

    /// Drains each session's latest direction command into its snake,
    /// subject to the turn rules: no 180s through the neck, and no turn
    /// that would fold a too-short head segment back onto the body.
    fn apply_pending_commands(&mut self) {
        let pending: Vec<(u32, Vector2D)> = self
            .sessions
            .values()
            .filter_map(|session| {
                session
                    .inbound
                    .take()
                    .and_then(|command| command.direction())
                    .map(|direction| (session.snake_id, direction))
            })
            .collect();
        for (snake_id, direction) in pending {
            let Some(snake) = self.snakes.get_mut(&snake_id) else {
                continue;
            };
            if !snake.alive || direction == snake.direction {
                continue;
            }
            if direction.is_cardinal_opposite(snake.direction) {
                continue;
            }
            if Self::turn_folds_into_neck(snake, direction) {
                continue;
            }
            snake.direction = direction;
        }
    }

    fn turn_folds_into_neck(snake: &Snake, direction: Vector2D) -> bool {
        if snake.body.len() < 3 {
            return false;
        }
        let head = snake.body[snake.body.len() - 1];
        let neck = snake.body[snake.body.len() - 2];
        if (head - neck).length() > SNAKE_WIDTH {
            return false;
        }
        let behind = snake.body[snake.body.len() - 3];
        match (neck - behind).cardinal() {
            Some(neck_direction) => neck_direction.is_cardinal_opposite(direction),
            None => false,
        }
    }

    /// Step 1 of the tick: one-shot flags from the previous tick are
    /// cleared and respawn timers advance. Disconnected snakes are left
    /// untouched so their terminal flags survive until the frame goes out.
    fn respawn_scan(&mut self) {
        for snake in self.snakes.values_mut() {
            if !snake.dc {
                snake.died = false;
            }
        }
        let ids: Vec<u32> = self
            .snakes
            .iter()
            .filter(|(_, snake)| !snake.alive && !snake.dc && snake.respawn > 0)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let Some(mut snake) = self.snakes.remove(&id) else {
                continue;
            };
            snake.respawn -= 1;
            if snake.respawn == 0 {
                match self.sample_snake_body() {
                    Some(body) => {
                        snake.body = body;
                        snake.direction = Vector2D::UP;
                        snake.prev_direction = Vector2D::UP;
                        snake.alive = true;
                        tracing::debug!(snake_id = id, "snake spawned");
                    }
                    None => {
                        snake.respawn = 1;
                        tracing::debug!(snake_id = id, "spawn placement exhausted, retrying");
                    }
                }
            }
            self.snakes.insert(id, snake);
        }
    }

    /// Step 2a-c: translate the head (inserting a corner point when the
    /// direction changed), teleport across the world edge on overshoot, and
    /// consume tail length unless growth is pending.
    fn move_snake(&self, snake: &mut Snake) {
        let speed = self.settings.snake_speed as f64;
        let length_before = polyline_length(&snake.body);
        if snake.direction != snake.prev_direction {
            let corner = snake.head();
            snake.body.push(corner);
        }
        let last = snake.body.len() - 1;
        snake.body[last] = snake.body[last] + snake.direction * speed;
        snake.prev_direction = snake.direction;

        let head = snake.head();
        let limit = self.settings.universe_size as f64 / 2.0 - SNAKE_WIDTH / 2.0;
        if head.x.abs() > limit || head.y.abs() > limit {
            let (entry, overshoot) = if head.x.abs() > limit {
                (
                    Vector2D::new(-limit * head.x.signum(), head.y),
                    head.x.abs() - limit,
                )
            } else {
                (
                    Vector2D::new(head.x, -limit * head.y.signum()),
                    head.y.abs() - limit,
                )
            };
            snake.body = vec![entry, entry + snake.direction * overshoot];
            snake.growth = (length_before / speed).round() as u32;
            return;
        }

        Self::advance_tail(snake, speed);
    }

    fn advance_tail(snake: &mut Snake, speed: f64) {
        if snake.growth > 0 {
            snake.growth -= 1;
            return;
        }
        let mut remaining = speed;
        while remaining > 0.0 && snake.body.len() >= 2 {
            let tail = snake.body[0];
            let segment = snake.body[1] - tail;
            let length = segment.length();
            if length <= remaining && snake.body.len() > 2 {
                remaining -= length;
                snake.body.remove(0);
            } else {
                let shift = remaining.min(length);
                snake.body[0] = tail + segment.normalize() * shift;
                break;
            }
        }
    }

    /// Step 2d, in order: powerup pickups, other snakes, walls, self. The
    /// snake under resolution has been taken out of the map, so `snakes`
    /// holds exactly the others.
    fn resolve_collisions(&mut self, snake: &mut Snake) {
        self.resolve_powerup_pickups(snake);
        self.resolve_snake_contacts(snake);

        if snake.alive {
            let head = snake.head();
            if self
                .walls
                .values()
                .any(|wall| point_hits_wall(head, SNAKE_WIDTH, wall))
            {
                tracing::debug!(snake_id = snake.id, reason = "wall", "snake died");
                snake.kill(self.settings.respawn_rate);
            }
        }

        if snake.alive && self_collision(&snake.body, snake.direction) {
            tracing::debug!(snake_id = snake.id, reason = "self", "snake died");
            snake.kill(self.settings.respawn_rate);
        }
    }

    fn resolve_powerup_pickups(&mut self, snake: &mut Snake) {
        let head = snake.head();
        let hits: Vec<u32> = self
            .powerups
            .values()
            .filter(|powerup| !powerup.died && point_hits_powerup(head, SNAKE_WIDTH, powerup.loc))
            .map(|powerup| powerup.id)
            .collect();
        for id in hits {
            let Some(powerup) = self.powerups.get_mut(&id) else {
                continue;
            };
            powerup.died = true;
            match self.settings.game_mode {
                GameMode::Default | GameMode::Poison => {
                    snake.score += POWERUP_SCORE;
                    snake.growth += self.settings.snake_growth_frames;
                }
                GameMode::Venom => {
                    snake.venomous = true;
                    snake.venom_ticks += self.settings.venom_ticks();
                }
            }
        }
    }

    fn resolve_snake_contacts(&mut self, snake: &mut Snake) {
        let head = snake.head();
        let other_ids: Vec<u32> = self.snakes.keys().copied().collect();
        for other_id in other_ids {
            if !snake.alive {
                return;
            }
            let Some(other) = self.snakes.get(&other_id) else {
                continue;
            };
            if !other.alive || !point_hits_snake(head, SNAKE_WIDTH, &other.body) {
                continue;
            }
            let head_to_head = point_hits_snake(other.head(), SNAKE_WIDTH, &snake.body);
            let other_score = other.score;
            let other_venomous = other.venomous;

            match self.settings.game_mode {
                GameMode::Default => {
                    if head_to_head && snake.score >= other_score {
                        self.kill_other(other_id, "head to head");
                    } else {
                        tracing::debug!(snake_id = snake.id, reason = "snake", "snake died");
                        snake.kill(self.settings.respawn_rate);
                    }
                }
                GameMode::Poison => {
                    if head_to_head && snake.score >= other_score {
                        self.kill_other(other_id, "head to head");
                        self.credit_absorb(snake, other_score);
                    } else {
                        let own_score = snake.score;
                        tracing::debug!(snake_id = snake.id, reason = "snake", "snake died");
                        snake.kill(self.settings.respawn_rate);
                        if let Some(other) = self.snakes.get_mut(&other_id) {
                            other.score += own_score;
                            other.growth += Self::growth_for_score(
                                own_score,
                                self.settings.snake_growth_frames,
                            );
                        }
                    }
                }
                GameMode::Venom => {
                    if !snake.venomous {
                        tracing::debug!(snake_id = snake.id, reason = "venom", "snake died");
                        snake.kill(self.settings.respawn_rate);
                    } else if other_venomous && head_to_head && snake.score < other_score {
                        let own_score = snake.score.max(POWERUP_SCORE);
                        tracing::debug!(snake_id = snake.id, reason = "venom", "snake died");
                        snake.kill(self.settings.respawn_rate);
                        if let Some(other) = self.snakes.get_mut(&other_id) {
                            other.score += own_score;
                            other.growth += Self::growth_for_score(
                                own_score,
                                self.settings.snake_growth_frames,
                            );
                        }
                    } else {
                        self.kill_other(other_id, "absorbed");
                        self.credit_absorb(snake, other_score.max(POWERUP_SCORE));
                    }
                }
            }
        }
    }

    fn kill_other(&mut self, id: u32, reason: &'static str) {
        if let Some(other) = self.snakes.get_mut(&id) {
            tracing::debug!(snake_id = id, reason, "snake died");
            other.kill(self.settings.respawn_rate);
        }
    }

    fn credit_absorb(&self, snake: &mut Snake, score: i32) {
        snake.score += score;
        snake.growth += Self::growth_for_score(score, self.settings.snake_growth_frames);
    }

    fn growth_for_score(score: i32, growth_frames: u32) -> u32 {
        (score.max(0) as u32 / POWERUP_SCORE as u32) * growth_frames
    }

    /// Step 3: at most one powerup per tick, gated by a randomized delay,
    /// never past the configured cap.
    fn spawn_powerups(&mut self) {
        if self.powerup_gate > 0 || self.powerups.len() >= self.settings.max_powerups as usize {
            self.powerup_gate = self.powerup_gate.saturating_sub(1);
            return;
        }
        let Some(loc) = self.sample_powerup_location() else {
            tracing::debug!("powerup placement exhausted, retrying");
            return;
        };
        let id = self.next_powerup_id;
        self.next_powerup_id += 1;
        self.powerups.insert(
            id,
            Powerup {
                id,
                loc,
                died: false,
            },
        );
        self.powerup_gate = rand::thread_rng().gen_range(0..self.settings.powerup_delay.max(1));
    }

    /// Respawn placement: a vertical two-point body, head above tail,
    /// sampled at snake-width stride against every wall, live snake and
    /// live powerup. Attempts are capped; the caller retries next tick.
    fn sample_snake_body(&self) -> Option<Vec<Vector2D>> {
        let length = self.settings.snake_starting_size as f64;
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let tail = self.random_interior_point(&mut rng);
            let head = Vector2D::new(tail.x, tail.y - length);
            if self.placement_clear(tail, head, SNAKE_WIDTH) {
                return Some(vec![tail, head]);
            }
        }
        None
    }

    fn sample_powerup_location(&self) -> Option<Vector2D> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let loc = self.random_interior_point(&mut rng);
            if self.placement_clear(loc, loc, POWERUP_WIDTH) {
                return Some(loc);
            }
        }
        None
    }

    fn random_interior_point(&self, rng: &mut impl Rng) -> Vector2D {
        let margin = self.settings.snake_starting_size as f64;
        let half = self.settings.universe_size as f64 / 2.0;
        // A universe smaller than twice the margin degenerates to spawning
        // at the center rather than panicking mid-tick.
        let lo = (-half + margin).min(0.0);
        let hi = (half - margin).max(lo);
        Vector2D::new(rng.gen_range(lo..=hi), rng.gen_range(lo..=hi))
    }

    fn placement_clear(&self, tail: Vector2D, head: Vector2D, width: f64) -> bool {
        let total = (head - tail).length();
        let step = (head - tail).cardinal().unwrap_or(Vector2D::UP);
        let mut offset = 0.0;
        loop {
            let point = tail + step * offset;
            if self
                .walls
                .values()
                .any(|wall| point_hits_wall(point, width, wall))
            {
                return false;
            }
            if self
                .snakes
                .values()
                .filter(|snake| snake.alive)
                .any(|snake| point_hits_snake(point, width, &snake.body))
            {
                return false;
            }
            if self
                .powerups
                .values()
                .filter(|powerup| !powerup.died)
                .any(|powerup| point_hits_powerup(point, width, powerup.loc))
            {
                return false;
            }
            if offset >= total {
                return true;
            }
            offset = (offset + width).min(total);
        }
    }

    /// Step 4: all snakes then all powerups, one JSON record per line. A
    /// snake that has never been placed has no body and is withheld unless
    /// it carries its terminal disconnect flags.
    fn encode_frame(&self) -> String {
        let mut out = String::new();
        for snake in self.snakes.values() {
            if snake.body.len() < 2 && !snake.dc {
                continue;
            }
            let record = protocol::snake_record(snake, self.display_name(snake));
            protocol::push_line(&mut out, &record);
        }
        for powerup in self.powerups.values() {
            protocol::push_line(&mut out, &protocol::powerup_record(powerup));
        }
        out
    }

    fn display_name(&self, snake: &Snake) -> String {
        if self.settings.game_mode == GameMode::Venom && snake.venomous {
            let seconds = snake.venom_ticks as u64 * self.settings.ms_per_frame / 1000;
            format!("{} {}", snake.name, seconds)
        } else {
            snake.name.clone()
        }
    }

    /// A session that cannot keep up with the frame stream is dropped so a
    /// stalled socket never delays the next tick.
    fn broadcast(&mut self, frame: String) {
        let mut dropped: Vec<String> = Vec::new();
        for (session_id, session) in &self.sessions {
            if session.outbound.try_send(frame.clone()).is_err() {
                dropped.push(session_id.clone());
            }
        }
        for session_id in dropped {
            tracing::info!(%session_id, "dropping stalled session");
            self.disconnect_session(&session_id);
        }
    }

    /// Step 5: entities whose terminal flags went out with this tick's
    /// frame are removed, and the spawn one-shot is retired for every
    /// snake that has been broadcast.
    fn garbage_pass(&mut self) {
        self.snakes.retain(|_, snake| !snake.dc);
        self.powerups.retain(|_, powerup| !powerup.died);
        for snake in self.snakes.values_mut() {
            if snake.join && snake.body.len() >= 2 {
                snake.join = false;
            }
        }
    }

    fn disconnect_session(&mut self, session_id: &str) {
        let Some(entry) = self.sessions.remove(session_id) else {
            return;
        };
        if let Some(snake) = self.snakes.get_mut(&entry.snake_id) {
            snake.dc = true;
            snake.alive = false;
            snake.died = true;
            tracing::info!(snake_id = entry.snake_id, "snake disconnected");
        }
    }
}

pub const SNAKE_WIDTH: f64 = 10.0;
pub const POWERUP_WIDTH: f64 = 16.0;
pub const WALL_HALF_WIDTH: f64 = 25.0;
pub const POWERUP_SCORE: i32 = 10;
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1000;
pub const MAX_NAME_LENGTH: usize = 20;
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 5;
pub const OUTBOUND_FRAME_CAPACITY: usize = 16;
pub const STATUS_LOG_INTERVAL_TICKS: u64 = 600;
pub const DEFAULT_PORT: u16 = 11000;

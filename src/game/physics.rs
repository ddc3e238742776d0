//! Ball and paddle physics on the normalized 100x100 table

use serde::{Deserialize, Serialize};

use super::{PaddleIntent, Side};

/// Table width in logical units
pub const FIELD_WIDTH: f32 = 100.0;
/// Table height in logical units
pub const FIELD_HEIGHT: f32 = 100.0;
/// Vertical extent of a paddle, measured down from its offset
pub const PADDLE_HEIGHT: f32 = 20.0;
/// Paddle travel per tick while an intent is held
pub const PADDLE_STEP: f32 = 1.5;
/// Paddles start vertically centered
pub const PADDLE_START: f32 = (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0;
/// How far inside the goal line a returned ball is placed
pub const RETURN_MARGIN: f32 = 2.0;
/// Velocity of the opening ball on each axis
pub const INITIAL_SPEED: f32 = 2.0;
/// Velocity magnitude on each axis after a serve
pub const SERVE_SPEED: f32 = 0.8;

/// Ball position and per-tick velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Ball {
    /// Opening ball: centered, fixed diagonal velocity
    pub fn opening() -> Self {
        Self {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            dx: INITIAL_SPEED,
            dy: INITIAL_SPEED,
        }
    }

    /// Ball held at center while a serve is pending
    pub fn held() -> Self {
        Self {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            dx: 0.0,
            dy: 0.0,
        }
    }

    /// Launch from the current position with the given axis directions
    pub fn launch(&mut self, rightward: bool, downward: bool) {
        self.dx = if rightward { SERVE_SPEED } else { -SERVE_SPEED };
        self.dy = if downward { SERVE_SPEED } else { -SERVE_SPEED };
    }
}

/// Paddle offsets for both ends of the table, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddles {
    pub left: f32,
    pub right: f32,
}

impl Paddles {
    pub fn get(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

impl Default for Paddles {
    fn default() -> Self {
        Self {
            left: PADDLE_START,
            right: PADDLE_START,
        }
    }
}

/// Physics system for the paddle table
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance ball and paddles by one tick.
    ///
    /// Returns the side that scored when the ball got past a paddle.
    /// Order is fixed: paddles, ball motion, top/bottom reflection,
    /// left goal line, right goal line.
    pub fn step(
        ball: &mut Ball,
        paddles: &mut Paddles,
        left_intent: PaddleIntent,
        right_intent: PaddleIntent,
    ) -> Option<Side> {
        paddles.left = Self::move_paddle(paddles.left, left_intent);
        paddles.right = Self::move_paddle(paddles.right, right_intent);

        ball.x += ball.dx;
        ball.y += ball.dy;

        Self::reflect_vertical(ball);

        if ball.x <= 0.0 {
            if Self::paddle_covers(paddles.left, ball.y) {
                ball.dx = ball.dx.abs();
                ball.x = RETURN_MARGIN;
            } else {
                return Some(Side::Right);
            }
        }

        if ball.x >= FIELD_WIDTH {
            if Self::paddle_covers(paddles.right, ball.y) {
                ball.dx = -ball.dx.abs();
                ball.x = FIELD_WIDTH - RETURN_MARGIN;
            } else {
                return Some(Side::Left);
            }
        }

        None
    }

    /// Move a paddle one step toward its intent, clamped to the table
    pub fn move_paddle(offset: f32, intent: PaddleIntent) -> f32 {
        let moved = match intent {
            PaddleIntent::Up => offset - PADDLE_STEP,
            PaddleIntent::Down => offset + PADDLE_STEP,
            PaddleIntent::None => offset,
        };
        moved.clamp(0.0, FIELD_HEIGHT)
    }

    /// Bounce off the top or bottom wall.
    ///
    /// Only a ball heading into the wall flips, so a ball already
    /// travelling back inward is never inverted twice.
    pub fn reflect_vertical(ball: &mut Ball) -> bool {
        if ball.y <= 0.0 && ball.dy < 0.0 {
            ball.dy = -ball.dy;
            ball.y = 0.0;
            true
        } else if ball.y >= FIELD_HEIGHT && ball.dy > 0.0 {
            ball.dy = -ball.dy;
            ball.y = FIELD_HEIGHT;
            true
        } else {
            false
        }
    }

    /// Inclusive hit test against a paddle at its current offset
    pub fn paddle_covers(offset: f32, y: f32) -> bool {
        y >= offset && y <= offset + PADDLE_HEIGHT
    }
}

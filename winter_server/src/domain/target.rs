// The moving target players shoot at.

use rand::Rng;

pub const TARGET_NAME: &str = "night-king";

/// Result of advancing the target by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Walked,
    ReachedWall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: &'static str,
    pub x: u32,
    pub y: u32,
}

impl Target {
    /// Places a fresh target on the left edge at a random row.
    pub fn spawn<R: Rng + ?Sized>(height: u32, rng: &mut R) -> Self {
        Self {
            name: TARGET_NAME,
            x: 0,
            y: rng.gen_range(0..height.max(1)),
        }
    }

    pub fn is_hit(&self, x: u32, y: u32) -> bool {
        self.x == x && self.y == y
    }

    /// Moves right by 0 or 1 and drifts at most one row.
    /// The row is clamped to the board; the column is not, so the caller
    /// learns the target escaped once it reaches `width`.
    pub fn advance<R: Rng + ?Sized>(&mut self, width: u32, height: u32, rng: &mut R) -> Step {
        self.x = self.x.saturating_add(rng.gen_range(0..=1));
        let drift: i64 = rng.gen_range(-1..=1);
        let max_row = i64::from(height.saturating_sub(1));
        let row = (i64::from(self.y) + drift).clamp(0, max_row);
        self.y = u32::try_from(row).unwrap_or(0);

        if self.x >= width {
            Step::ReachedWall
        } else {
            Step::Walked
        }
    }
}

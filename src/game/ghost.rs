//! Ghosts: free-running replays of a recorded path

use std::collections::VecDeque;

use super::grid::{occupies, Point};

/// Fallback when the source color is not `#RRGGBB`
const GHOST_FALLBACK_COLOR: &str = "#ffffff";
const GHOST_ALPHA: &str = "0.5";

/// A lethal obstacle replaying a captured path, one recorded body per tick
#[derive(Debug, Clone)]
pub struct Ghost {
    /// Currently displayed position
    pub body: Vec<Point>,
    /// Bodies still to be played, consumed front to back
    pub path: VecDeque<Vec<Point>>,
    pub color: String,
    pub created_at: u64,
}

impl Ghost {
    /// Build a ghost from a non-empty recorded path
    pub fn from_path(path: Vec<Vec<Point>>, source_color: Option<&str>, created_at: u64) -> Option<Self> {
        let body = path.first()?.clone();
        Some(Self {
            body,
            path: path.into(),
            color: ghost_color(source_color.unwrap_or(GHOST_FALLBACK_COLOR)),
            created_at,
        })
    }

    /// Step one recorded frame. Returns false once the path was already exhausted.
    pub fn advance(&mut self) -> bool {
        match self.path.pop_front() {
            Some(next) => {
                self.body = next;
                true
            }
            None => false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.path.len()
    }

    pub fn occupies(&self, cell: Point) -> bool {
        occupies(&self.body, cell)
    }
}

/// `#RRGGBB` -> translucent `rgba(r, g, b, 0.5)`
pub fn ghost_color(hex: &str) -> String {
    let (r, g, b) = parse_hex_rgb(hex)
        .or_else(|| parse_hex_rgb(GHOST_FALLBACK_COLOR))
        .unwrap_or((255, 255, 255));
    format!("rgba({}, {}, {}, {})", r, g, b, GHOST_ALPHA)
}

/// Parse `#RRGGBB` (either case) into components
pub fn parse_hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: i32) -> Vec<Vec<Point>> {
        (0..n).map(|i| vec![Point::new(i, 0)]).collect()
    }

    #[test]
    fn color_is_translucent_rgba() {
        assert_eq!(ghost_color("#00FF9D"), "rgba(0, 255, 157, 0.5)");
        assert_eq!(ghost_color("not a color"), "rgba(255, 255, 255, 0.5)");
    }

    #[test]
    fn empty_path_yields_no_ghost() {
        assert!(Ghost::from_path(Vec::new(), Some("#FFFF00"), 0).is_none());
    }

    #[test]
    fn path_is_consumed_one_frame_per_advance() {
        let mut ghost = Ghost::from_path(frames(4), None, 0).unwrap();
        assert_eq!(ghost.body, vec![Point::new(0, 0)]);
        assert_eq!(ghost.color, "rgba(255, 255, 255, 0.5)");

        for k in 1..=4 {
            assert!(ghost.advance());
            assert_eq!(ghost.remaining(), 4 - k);
            assert_eq!(ghost.body, vec![Point::new(k as i32 - 1, 0)]);
        }
        assert!(!ghost.advance());
    }
}

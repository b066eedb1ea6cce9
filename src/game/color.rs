//! Join-time color assignment

use rand::seq::SliceRandom;
use rand::Rng;

use super::ghost::parse_hex_rgb;

/// Spawn palette used when the client did not ask for a usable color
pub const SPAWN_PALETTE: [&str; 5] = ["#00FF9D", "#00F3FF", "#FFFF00", "#FF00FF", "#0000FF"];

/// Food is drawn in this color; snakes may not look like it
const RESERVED_RGB: (u8, u8, u8) = (255, 0, 85);
const MIN_RESERVED_DISTANCE: f64 = 60.0;
const DEDUPE_ATTEMPTS: usize = 20;

/// Requested color if it is `#RRGGBB` and clearly distinct from the food color
pub fn accept_requested(requested: &str) -> Option<String> {
    let (r, g, b) = parse_hex_rgb(requested)?;
    let dr = f64::from(r) - f64::from(RESERVED_RGB.0);
    let dg = f64::from(g) - f64::from(RESERVED_RGB.1);
    let db = f64::from(b) - f64::from(RESERVED_RGB.2);
    ((dr * dr + dg * dg + db * db).sqrt() > MIN_RESERVED_DISTANCE).then(|| requested.to_string())
}

/// Pick a player's color: requested, else palette; then resample if already used in the room
pub fn assign_color<R: Rng + ?Sized>(requested: Option<&str>, used: &[String], rng: &mut R) -> String {
    let mut color = requested
        .and_then(accept_requested)
        .unwrap_or_else(|| SPAWN_PALETTE.choose(rng).copied().unwrap_or(SPAWN_PALETTE[0]).to_string());

    if used.iter().any(|c| c.eq_ignore_ascii_case(&color)) {
        for _ in 0..DEDUPE_ATTEMPTS {
            let candidate = format!("#{:06X}", rng.gen_range(0..0xFF_FFFFu32));
            if !used.iter().any(|c| c.eq_ignore_ascii_case(&candidate)) {
                color = candidate;
                break;
            }
        }
    }

    color
}

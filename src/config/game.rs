/// Game session configuration constants.
///
/// This module defines the main session parameters such as round duration,
/// tick cadence, and grid dimensions.
pub const SESSION_DURATION_SECS: u64 = 180; // Duration of a word-finding round in seconds.

/// Interval between authoritative countdown ticks, in seconds.
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Side length of the letter grid (grids are always square).
pub const GRID_SIZE: usize = 4;

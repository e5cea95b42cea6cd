//! Per-lobby game session state machine.
//!
//! Holds the authoritative state of one word-finding round: letter grid,
//! countdown, found-word ledger, and running flag. The relay actor drives
//! the countdown through [`GameSession::tick`] from a 1-second interval task
//! whose `SpawnHandle` lives here, alongside the state it advances, so lobby
//! teardown can cancel it before the session is dropped.

use std::time::Instant;

use actix::SpawnHandle;

use crate::config::game::SESSION_DURATION_SECS;
use crate::game::grid;
use crate::server::messages::Grid;

/// Outcome of one countdown tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Still counting down; carries the new timer value for broadcast.
    Running(u64),
    /// The countdown just reached zero. Carries the final (zero) value:
    /// every tick broadcasts its new timer value, this one included, and
    /// only then does the caller cancel the ticker and broadcast the final
    /// ledger.
    Ended(u64),
    /// The session was not running; nothing changed.
    Idle,
}

/// Authoritative state of one lobby's game.
pub struct GameSession {
    pub grid: Option<Grid>,
    pub timer: u64,
    pub found_words: Vec<String>,
    pub is_running: bool,
    pub started_at: Option<Instant>,
    /// Countdown ticker for this session; cancelled on end and on teardown.
    pub ticker: Option<SpawnHandle>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            grid: None,
            timer: SESSION_DURATION_SECS,
            found_words: Vec::new(),
            is_running: false,
            started_at: None,
            ticker: None,
        }
    }
}

impl GameSession {
    /// Start (or restart) the round: fresh grid, empty ledger, full timer.
    ///
    /// Restarting an already-running session is allowed and resets it from
    /// the same fixed duration. Returns the new grid for broadcast.
    pub fn start(&mut self, grid_size: usize) -> Grid {
        let grid = grid::generate_grid(grid_size);
        self.grid = Some(grid.clone());
        self.timer = SESSION_DURATION_SECS;
        self.found_words.clear();
        self.is_running = true;
        self.started_at = Some(Instant::now());
        grid
    }

    /// Advance the countdown by one second.
    ///
    /// The timer never goes below zero; once it reaches zero the running
    /// flag is forced false and further ticks report [`TickOutcome::Idle`].
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_running {
            return TickOutcome::Idle;
        }
        self.timer = self.timer.saturating_sub(1);
        if self.timer == 0 {
            self.is_running = false;
            TickOutcome::Ended(self.timer)
        } else {
            TickOutcome::Running(self.timer)
        }
    }

    /// Append a word to the ledger, preserving first-submission order.
    /// Returns false for duplicates, which leave the ledger untouched.
    pub fn submit_word(&mut self, word: &str) -> bool {
        if self.found_words.iter().any(|w| w == word) {
            return false;
        }
        self.found_words.push(word.to_string());
        true
    }

    /// Explicit termination; same transition as the tick reaching zero.
    pub fn end(&mut self) {
        self.is_running = false;
    }
}

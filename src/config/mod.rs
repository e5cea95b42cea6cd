/// Main configuration module.
///
/// Re-exports submodules for game session and invitation configuration.
pub mod game;
pub mod invitation;

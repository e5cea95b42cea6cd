//! Pure game logic, independent of the server layer.

pub mod grid;

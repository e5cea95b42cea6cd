//! Letter grid generation.
//!
//! Stateless collaborator for the game session state machine: produces a
//! square grid of single letters by shuffling the classic sixteen six-sided
//! letter dice and sampling one face per cell.

use rand::seq::{IndexedRandom, SliceRandom};

/// The sixteen standard letter dice, one face set per die.
const DICE: [[char; 6]; 16] = [
    ['A', 'A', 'E', 'E', 'G', 'N'],
    ['E', 'L', 'R', 'T', 'T', 'Y'],
    ['A', 'O', 'O', 'T', 'T', 'W'],
    ['A', 'B', 'B', 'J', 'O', 'O'],
    ['E', 'H', 'R', 'T', 'V', 'W'],
    ['C', 'I', 'M', 'O', 'T', 'U'],
    ['D', 'I', 'S', 'T', 'T', 'Y'],
    ['E', 'I', 'O', 'S', 'S', 'T'],
    ['D', 'E', 'L', 'R', 'V', 'Y'],
    ['A', 'C', 'H', 'O', 'P', 'S'],
    ['H', 'I', 'M', 'N', 'Q', 'U'],
    ['E', 'E', 'I', 'N', 'S', 'U'],
    ['E', 'E', 'G', 'H', 'N', 'W'],
    ['A', 'F', 'F', 'K', 'P', 'S'],
    ['H', 'L', 'N', 'N', 'R', 'Z'],
    ['D', 'E', 'I', 'L', 'R', 'X'],
];

/// Generate a `size` x `size` grid of single-letter strings.
///
/// The dice are shuffled once, then each cell takes a uniformly random face
/// of the die at its position (cycling through the shuffled dice when
/// `size * size` exceeds the number of dice).
pub fn generate_grid(size: usize) -> Vec<Vec<String>> {
    let mut rng = rand::rng();
    let mut dice = DICE.to_vec();
    dice.shuffle(&mut rng);

    (0..size)
        .map(|row| {
            (0..size)
                .map(|col| {
                    let die = &dice[(row * size + col) % dice.len()];
                    let letter = die.choose(&mut rng).copied().unwrap_or('A');
                    letter.to_string()
                })
                .collect()
        })
        .collect()
}

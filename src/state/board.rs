//! Board geometry and fleet placement.

use indexmap::IndexSet;
use rand::Rng;

/// Width and height of every board.
pub const BOARD_SIZE: u8 = 8;
/// Pieces placed for each player when a game starts.
pub const FLEET_SIZE: usize = 12;

/// Zero-based cell on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub x: u8,
    pub y: u8,
}

/// Draw [`FLEET_SIZE`] distinct cells, resampling whenever a draw lands on a taken cell.
pub fn random_layout<R: Rng + ?Sized>(rng: &mut R) -> Vec<Coordinate> {
    let mut cells = IndexSet::with_capacity(FLEET_SIZE);
    while cells.len() < FLEET_SIZE {
        cells.insert(Coordinate {
            x: rng.random_range(0..BOARD_SIZE),
            y: rng.random_range(0..BOARD_SIZE),
        });
    }
    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn layout_has_full_fleet_of_distinct_cells() {
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = random_layout(&mut rng);

            assert_eq!(layout.len(), FLEET_SIZE);
            let unique: HashSet<_> = layout.iter().copied().collect();
            assert_eq!(unique.len(), FLEET_SIZE);
            assert!(
                layout
                    .iter()
                    .all(|cell| cell.x < BOARD_SIZE && cell.y < BOARD_SIZE)
            );
        }
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let first = random_layout(&mut StdRng::seed_from_u64(7));
        let second = random_layout(&mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
    }
}

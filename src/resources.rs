//! Resource and dice number assignment
//!
//! Assignment runs after the board graph is assembled and validated; it only
//! fills in the `resource`, `dice_number` and `robber_present` fields.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::config::STANDARD_TILE_COUNT;
use crate::tile::{Resource, Tile};

/// Dice tokens of the base game
const BASE_DICE: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// Trait for assigning resources and dice numbers to assembled tiles
pub trait ResourceAssigner {
    /// Fill in resource, dice number and robber placement for every tile
    fn assign(&self, tiles: &mut [Tile], rng: &mut ChaCha8Rng);
}

/// Base-game distribution scaled to the tile count
///
/// One desert per 19 tiles (rounded up). Producing tiles draw from the base
/// resource bag and dice tokens, repeated as often as needed. The robber
/// starts on the desert with the lowest tile id.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResourceAssigner;

impl StandardResourceAssigner {
    /// Number of deserts for a board of `tile_count` tiles
    pub fn desert_count(tile_count: usize) -> usize {
        tile_count.div_ceil(STANDARD_TILE_COUNT)
    }
}

impl ResourceAssigner for StandardResourceAssigner {
    fn assign(&self, tiles: &mut [Tile], rng: &mut ChaCha8Rng) {
        let deserts = Self::desert_count(tiles.len()).min(tiles.len());
        let producing = tiles.len() - deserts;

        let mut bag: Vec<Resource> = Resource::PRODUCING
            .iter()
            .flat_map(|&resource| std::iter::repeat(resource).take(resource.base_count()))
            .cycle()
            .take(producing)
            .collect();
        bag.extend(std::iter::repeat(Resource::Desert).take(deserts));
        bag.shuffle(rng);

        let mut dice: Vec<u8> = BASE_DICE.iter().copied().cycle().take(producing).collect();
        dice.shuffle(rng);
        let mut dice = dice.into_iter();

        let mut robber_placed = false;
        for (tile, resource) in tiles.iter_mut().zip(bag) {
            tile.resource = resource;
            if resource == Resource::Desert {
                tile.dice_number = None;
                tile.robber_present = !robber_placed;
                robber_placed = true;
            } else {
                tile.dice_number = dice.next();
                tile.robber_present = false;
            }
        }

        tracing::debug!(
            "Assigned resources: {} tiles, {} deserts, {} producing",
            tiles.len(),
            deserts,
            producing
        );
    }
}

//! Example: Generate a board of each map type
//!
//! Demonstrates the basic usage of the generation pipeline. Set `RUST_LOG`
//! (e.g. `RUST_LOG=rust_polygon_board=debug`) to follow the pipeline stages.

use rust_polygon_board::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    println!("Polygon Board Generation Example");
    println!("================================\n");

    for (map_type, target) in [
        (MapType::Standard, 19),
        (MapType::ExpandedHex, 30),
        (MapType::ExpandedDelaunay, 30),
    ] {
        let config = MapConfigBuilder::new()
            .seed(12345u64)
            .map_type(map_type)
            .target_tile_count(target)
            .unwrap()
            .erosion_rounds(4)
            .unwrap()
            .build()
            .unwrap();

        println!("Configuration:");
        println!("  Map Type: {}", map_type.name());
        println!("  Seed: {}", config.seed);
        println!("  Target Tiles: {}", config.land_target());
        println!("  Seed Points: {}", config.point_count());
        println!("  Sampling Radius: {:.2}", config.radius());

        let map = match MapData::generate(config) {
            Ok(map) => map,
            Err(err) => {
                println!("  Generation failed: {}\n", err);
                continue;
            }
        };

        let shapes = [5, 6, 7].map(|s| {
            map.tiles()
                .iter()
                .filter(|t| t.nodes.len() == s)
                .count()
        });
        let interior_nodes = map.nodes().iter().filter(|n| !n.is_boundary()).count();

        println!("Result:");
        let fallback = if map.used_fallback() { " (fallback)" } else { "" };
        println!("  Generator: {}{}", map.map_type().name(), fallback);
        println!(
            "  Tiles: {} (5-sided {}, 6-sided {}, 7-sided {})",
            map.tile_count(),
            shapes[0],
            shapes[1],
            shapes[2]
        );
        println!("  Nodes: {} ({} interior)", map.node_count(), interior_nodes);
        println!("  Edges: {} ({} coastline)", map.edge_count(), map.boundary_edges().len());
        println!("  Robber starts on tile {:?}", map.robber_tile());

        println!("Sample tiles:");
        for tile in map.tiles().iter().take(4) {
            println!(
                "  Tile {}: center=({:.2}, {:.2}), {} {:?}, sides={}, boundary={}",
                tile.id,
                tile.center.x,
                tile.center.y,
                tile.resource.name(),
                tile.dice_number,
                tile.nodes.len(),
                tile.is_boundary
            );
        }
        println!();
    }

    println!("Generation complete!");
}

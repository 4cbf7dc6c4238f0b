//! Built-in preset templates
//!
//! Small structure templates defined as row-of-glyph layouts over a legend
//! mapping each glyph to a terrain name and placement priority. A template
//! resolves against a terrain registry; it is skipped when the registry
//! lacks one of its terrain names.

use crate::presets::types::{Preset, PresetCell};
use crate::terrain::TerrainRegistry;

/// Build preset cells from a glyph layout.
///
/// Offsets are centered on the layout's midpoint so the anchor sits in the
/// middle of the stamped structure. `' '` and `'.'` leave the base terrain
/// untouched. Returns None when a legend terrain is missing.
fn cells_from_rows(
    rows: &[&str],
    legend: &[(char, &str, i32)],
    registry: &TerrainRegistry,
) -> Option<Vec<PresetCell>> {
    let height = rows.len() as i32;
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;

    let mut cells = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        for (x, glyph) in row.chars().enumerate() {
            if glyph == ' ' || glyph == '.' {
                continue;
            }
            let (_, name, priority) = legend.iter().find(|(g, _, _)| *g == glyph)?;
            let terrain = registry.find(name)?;
            cells.push(PresetCell {
                dx: x as i32 - width / 2,
                dy: y as i32 - height / 2,
                terrain,
                priority: *priority,
            });
        }
    }
    Some(cells)
}

/// A ruined tower: stone shell around a rubble floor, one collapsed gap.
pub fn ruined_tower(registry: &TerrainRegistry) -> Option<Preset> {
    let cells = cells_from_rows(
        &[
            "#####",
            "#___#",
            "#___#",
            "#___ ",
            "## ##",
        ],
        &[('#', "ruin_wall", 2), ('_', "ruin_floor", 1)],
        registry,
    )?;

    Some(Preset {
        name: "ruined_tower".to_string(),
        natural_spawn: true,
        spawn_chance: 0.3,
        min_spacing: 24.0,
        height_window: (0.32, 0.72),
        temperature_window: (-0.8, 0.9),
        humidity_window: (-1.0, 1.0),
        cells,
        trigger_terrain: Some(
            ["grass", "meadow"]
                .iter()
                .filter_map(|n| registry.find(n))
                .collect(),
        ),
    })
}

/// A campsite: a fire ring on trampled ground.
pub fn campsite(registry: &TerrainRegistry) -> Option<Preset> {
    let cells = cells_from_rows(
        &[
            "___",
            "_x_",
            "___",
        ],
        &[('_', "ruin_floor", 0), ('x', "campfire", 2)],
        registry,
    )?;

    Some(Preset {
        name: "campsite".to_string(),
        natural_spawn: true,
        spawn_chance: 0.5,
        min_spacing: 16.0,
        height_window: (0.3, 0.7),
        temperature_window: (-0.9, 1.0),
        humidity_window: (-1.0, 0.9),
        cells,
        trigger_terrain: Some(
            ["grass", "meadow", "sand"]
                .iter()
                .filter_map(|n| registry.find(n))
                .collect(),
        ),
    })
}

/// A shrine: a standing stone on a paved cross.
pub fn shrine(registry: &TerrainRegistry) -> Option<Preset> {
    let cells = cells_from_rows(
        &[
            ".._..",
            "._#_.",
            "_#O#_",
            "._#_.",
            ".._..",
        ],
        &[
            ('O', "shrine_stone", 3),
            ('#', "ruin_wall", 2),
            ('_', "ruin_floor", 1),
        ],
        registry,
    )?;

    Some(Preset {
        name: "shrine".to_string(),
        natural_spawn: true,
        spawn_chance: 0.15,
        min_spacing: 40.0,
        height_window: (0.35, 0.65),
        temperature_window: (-1.0, 1.0),
        humidity_window: (-0.2, 1.0),
        cells,
        trigger_terrain: Some(
            ["grass"].iter().filter_map(|n| registry.find(n)).collect(),
        ),
    })
}

/// A loose boulder cluster.
pub fn boulder_cluster(registry: &TerrainRegistry) -> Option<Preset> {
    let cells = cells_from_rows(
        &[
            "^..^.",
            "..^..",
            ".^.^^",
        ],
        &[('^', "rock", 0)],
        registry,
    )?;

    Some(Preset {
        name: "boulder_cluster".to_string(),
        natural_spawn: true,
        spawn_chance: 0.6,
        min_spacing: 10.0,
        height_window: (0.5, 0.9),
        temperature_window: (-1.0, 1.0),
        humidity_window: (-1.0, 1.0),
        cells,
        trigger_terrain: None,
    })
}

/// All built-in presets resolvable against a registry.
pub fn builtin_presets(registry: &TerrainRegistry) -> Vec<Preset> {
    [ruined_tower, campsite, shrine, boulder_cluster]
        .iter()
        .filter_map(|build| build(registry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    #[test]
    fn test_builtin_presets_resolve_against_default_registry() {
        let registry = WorldConfig::default().terrain_registry();
        let presets = builtin_presets(&registry);

        assert_eq!(presets.len(), 4);
        for preset in &presets {
            assert!(!preset.cells.is_empty(), "{} has no cells", preset.name);
        }
    }

    #[test]
    fn test_layout_offsets_are_centered() {
        let registry = WorldConfig::default().terrain_registry();
        let tower = ruined_tower(&registry).unwrap();

        let (ex, ey) = tower.extent();
        assert_eq!((ex, ey), (2, 2));
        // The collapsed gap leaves fewer cells than the full 5x5 shell
        assert!(tower.cells.len() < 25);
    }

    #[test]
    fn test_missing_terrain_skips_template() {
        let registry = TerrainRegistry::new(Vec::new(), None, 1.0);
        assert!(ruined_tower(&registry).is_none());
        assert!(builtin_presets(&registry).is_empty());
    }
}

//! World configuration
//!
//! One serde-loadable structure supplies everything generation needs: seed,
//! noise parameters, streaming radii and throttles, the terrain-type
//! registry and the preset registry. Loaded once at startup and treated as
//! immutable for the process lifetime. Validation returns warnings, not
//! errors: a gappy or empty registry is a content-authoring mistake the
//! engine works around with fallbacks.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::generation::ChunkGenerator;
use crate::noise_field::NoiseParams;
use crate::presets::{
    builtin_presets, Preset, PresetCell, PresetRegistry, StampPolicy,
};
use crate::seeds::WorldSeeds;
use crate::streaming::{ChunkStreamingManager, StreamingConfig};
use crate::surface::TileSurface;
use crate::terrain::{TerrainDef, TerrainRegistry};

/// Configuration loading failures. The only fatal error surface in the
/// crate; everything past startup degrades instead of failing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Non-fatal configuration problems, logged at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("terrain registry is empty; every cell will use the fallback or stay empty")]
    EmptyTerrainRegistry,
    #[error("no presets resolved; chunks will carry base terrain only")]
    EmptyPresetRegistry,
    #[error("no terrain covers heights in [{0:.3}, {1:.3}]; cells there get the fallback")]
    HeightGap(f64, f64),
    #[error("terrain '{0}' has an inverted height range")]
    InvertedHeightRange(String),
    #[error("terrain '{0}' has {1} outside [0,1]")]
    ValueOutOfRange(String, &'static str),
    #[error("fallback terrain '{0}' is not in the registry")]
    UnknownFallback(String),
    #[error("preset '{0}' references unknown terrain '{1}' and was skipped")]
    UnknownPresetTerrain(String, String),
    #[error("preset '{0}' has spawn chance outside [0,1]")]
    BadSpawnChance(String),
}

/// One preset cell as authored in a config file (terrain by name).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresetCellConfig {
    pub dx: i32,
    pub dy: i32,
    pub terrain: String,
    #[serde(default)]
    pub priority: i32,
}

/// One preset as authored in a config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresetConfig {
    pub name: String,
    #[serde(default)]
    pub natural_spawn: bool,
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f64,
    #[serde(default)]
    pub min_spacing: f64,
    #[serde(default = "default_height_window")]
    pub height_window: (f64, f64),
    #[serde(default = "default_biome_window")]
    pub temperature_window: (f64, f64),
    #[serde(default = "default_biome_window")]
    pub humidity_window: (f64, f64),
    pub cells: Vec<PresetCellConfig>,
    #[serde(default)]
    pub trigger_terrain: Option<Vec<String>>,
}

fn default_spawn_chance() -> f64 {
    1.0
}

fn default_height_window() -> (f64, f64) {
    (0.0, 1.0)
}

fn default_biome_window() -> (f64, f64) {
    (-1.0, 1.0)
}

impl PresetConfig {
    /// Resolve terrain names against a registry. None when any name is
    /// unknown; the caller warns and skips.
    fn resolve(&self, registry: &TerrainRegistry) -> Option<Preset> {
        let mut cells = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            cells.push(PresetCell {
                dx: cell.dx,
                dy: cell.dy,
                terrain: registry.find(&cell.terrain)?,
                priority: cell.priority,
            });
        }
        let trigger_terrain = match &self.trigger_terrain {
            None => None,
            Some(names) => {
                let mut ids = Vec::with_capacity(names.len());
                for name in names {
                    ids.push(registry.find(name)?);
                }
                Some(ids)
            }
        };
        Some(Preset {
            name: self.name.clone(),
            natural_spawn: self.natural_spawn,
            spawn_chance: self.spawn_chance,
            min_spacing: self.min_spacing,
            height_window: self.height_window,
            temperature_window: self.temperature_window,
            humidity_window: self.humidity_window,
            cells,
            trigger_terrain,
        })
    }
}

/// Complete world configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub noise: NoiseParams,
    pub streaming: StreamingConfig,
    pub terrain: Vec<TerrainDef>,
    /// Terrain used for cells no type covers; None = such cells stay empty
    pub fallback_terrain: Option<String>,
    /// Global multiplier applied to every terrain frequency
    pub frequency_multiplier: f64,
    /// Authored presets; an empty list selects the built-in library
    pub presets: Vec<PresetConfig>,
    pub max_presets_per_chunk: usize,
    pub stamp_policy: StampPolicy,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            noise: NoiseParams::default(),
            streaming: StreamingConfig::default(),
            terrain: default_terrain(),
            fallback_terrain: Some("grass".to_string()),
            frequency_multiplier: 1.0,
            presets: Vec::new(),
            max_presets_per_chunk: 3,
            stamp_policy: StampPolicy::default(),
        }
    }
}

impl WorldConfig {
    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the terrain registry.
    pub fn terrain_registry(&self) -> TerrainRegistry {
        let defs = self.terrain.clone();
        let probe = TerrainRegistry::new(defs.clone(), None, self.frequency_multiplier);
        let fallback = self
            .fallback_terrain
            .as_deref()
            .and_then(|name| probe.find(name));
        TerrainRegistry::new(defs, fallback, self.frequency_multiplier)
    }

    /// Build the preset registry, resolving names against the terrain
    /// registry. An empty authored list selects the built-in library.
    pub fn preset_registry(&self, terrain: &TerrainRegistry) -> PresetRegistry {
        if self.presets.is_empty() {
            return PresetRegistry::new(builtin_presets(terrain));
        }
        let resolved = self
            .presets
            .iter()
            .filter_map(|p| p.resolve(terrain))
            .collect();
        PresetRegistry::new(resolved)
    }

    /// Build the chunk generator for this configuration.
    pub fn chunk_generator(&self) -> ChunkGenerator {
        let terrain = self.terrain_registry();
        let presets = self.preset_registry(&terrain);
        ChunkGenerator::new(
            WorldSeeds::from_master(self.seed),
            self.noise,
            terrain,
            presets,
            self.stamp_policy,
            self.max_presets_per_chunk,
            self.streaming.chunk_size,
        )
    }

    /// Build a streaming manager over a surface.
    pub fn streaming_manager<S: TileSurface>(&self, surface: S) -> ChunkStreamingManager<S> {
        ChunkStreamingManager::new(self.streaming, self.chunk_generator(), surface)
    }

    /// Collect configuration warnings. Callers log them and proceed.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.terrain.is_empty() {
            warnings.push(ConfigWarning::EmptyTerrainRegistry);
        }
        for def in &self.terrain {
            if def.height_range.0 > def.height_range.1 {
                warnings.push(ConfigWarning::InvertedHeightRange(def.name.clone()));
            }
            for (value, what) in [
                (def.height_range.0, "height range"),
                (def.height_range.1, "height range"),
                (def.frequency, "frequency"),
                (def.rarity_gate, "rarity gate"),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    warnings.push(ConfigWarning::ValueOutOfRange(def.name.clone(), what));
                    break;
                }
            }
        }

        let registry = self.terrain_registry();
        if let Some(name) = &self.fallback_terrain {
            if registry.find(name).is_none() {
                warnings.push(ConfigWarning::UnknownFallback(name.clone()));
            }
        }
        if !self.terrain.is_empty() {
            for (lo, hi) in registry.coverage_gaps() {
                warnings.push(ConfigWarning::HeightGap(lo, hi));
            }
        }

        for preset in &self.presets {
            if preset.resolve(&registry).is_none() {
                let missing = preset
                    .cells
                    .iter()
                    .map(|c| c.terrain.as_str())
                    .chain(
                        preset
                            .trigger_terrain
                            .iter()
                            .flatten()
                            .map(|s| s.as_str()),
                    )
                    .find(|name| registry.find(name).is_none())
                    .unwrap_or("?");
                warnings.push(ConfigWarning::UnknownPresetTerrain(
                    preset.name.clone(),
                    missing.to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&preset.spawn_chance) {
                warnings.push(ConfigWarning::BadSpawnChance(preset.name.clone()));
            }
        }
        if self.preset_registry(&registry).is_empty() {
            warnings.push(ConfigWarning::EmptyPresetRegistry);
        }

        warnings
    }

    /// Log every warning via tracing and return how many there were.
    pub fn log_warnings(&self) -> usize {
        let warnings = self.validate();
        for warning in &warnings {
            warn!("{warning}");
        }
        warnings.len()
    }
}

/// The built-in terrain set: natural bands over the height field plus the
/// structure terrains presets stamp (frequency 0, never selected naturally).
pub fn default_terrain() -> Vec<TerrainDef> {
    fn natural(
        name: &str,
        glyph: char,
        color: [u8; 3],
        collides: bool,
        height_range: (f64, f64),
        frequency: f64,
        rarity_gate: f64,
    ) -> TerrainDef {
        TerrainDef {
            name: name.to_string(),
            glyph,
            color,
            collides,
            interactable: false,
            height_range,
            frequency,
            rarity_gate,
        }
    }

    fn structure(
        name: &str,
        glyph: char,
        color: [u8; 3],
        collides: bool,
        interactable: bool,
    ) -> TerrainDef {
        TerrainDef {
            name: name.to_string(),
            glyph,
            color,
            collides,
            interactable,
            height_range: (0.0, 0.0),
            frequency: 0.0,
            rarity_gate: 1.0,
        }
    }

    vec![
        natural("deep_water", '~', [18, 50, 110], true, (0.0, 0.12), 1.0, 1.0),
        natural("water", '~', [34, 96, 168], true, (0.10, 0.24), 1.0, 1.0),
        natural("sand", '.', [194, 178, 128], false, (0.22, 0.32), 1.0, 1.0),
        natural("grass", ',', [96, 160, 60], false, (0.30, 0.72), 1.0, 1.0),
        natural("meadow", '"', [132, 192, 92], false, (0.34, 0.60), 0.25, 0.4),
        natural("forest", 'T', [40, 110, 50], false, (0.45, 0.78), 0.6, 1.0),
        natural("rock", '^', [122, 120, 118], true, (0.70, 1.0), 1.0, 1.0),
        natural("snow", '*', [235, 240, 245], false, (0.86, 1.0), 0.8, 1.0),
        structure("ruin_wall", '#', [92, 86, 80], true, false),
        structure("ruin_floor", '_', [150, 140, 120], false, false),
        structure("campfire", 'x', [204, 92, 32], false, true),
        structure("shrine_stone", 'O', [172, 166, 192], true, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_clean() {
        let config = WorldConfig::default();
        let warnings = config.validate();

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.preset_registry(&config.terrain_registry()).len(), 4);
    }

    #[test]
    fn test_json_round_trip() {
        let config = WorldConfig {
            seed: 777,
            max_presets_per_chunk: 5,
            ..WorldConfig::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        let parsed = WorldConfig::from_json_str(&text).unwrap();

        assert_eq!(parsed.seed, 777);
        assert_eq!(parsed.max_presets_per_chunk, 5);
        assert_eq!(parsed.terrain.len(), config.terrain.len());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let parsed = WorldConfig::from_json_str(r#"{"seed": 9}"#).unwrap();

        assert_eq!(parsed.seed, 9);
        assert_eq!(parsed.streaming.chunk_size, 16);
        assert!(!parsed.terrain.is_empty());
    }

    #[test]
    fn test_bad_json_is_a_parse_error() {
        assert!(matches!(
            WorldConfig::from_json_str("{nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_height_gap_is_warned() {
        let mut config = WorldConfig::default();
        config.terrain = vec![
            TerrainDef {
                name: "low".to_string(),
                glyph: '.',
                color: [0, 0, 0],
                collides: false,
                interactable: false,
                height_range: (0.0, 0.3),
                frequency: 1.0,
                rarity_gate: 1.0,
            },
            TerrainDef {
                name: "high".to_string(),
                glyph: '^',
                color: [0, 0, 0],
                collides: false,
                interactable: false,
                height_range: (0.6, 1.0),
                frequency: 1.0,
                rarity_gate: 1.0,
            },
        ];
        config.fallback_terrain = Some("low".to_string());
        config.presets = vec![PresetConfig {
            name: "p".to_string(),
            natural_spawn: false,
            spawn_chance: 1.0,
            min_spacing: 0.0,
            height_window: (0.0, 1.0),
            temperature_window: (-1.0, 1.0),
            humidity_window: (-1.0, 1.0),
            cells: vec![PresetCellConfig {
                dx: 0,
                dy: 0,
                terrain: "low".to_string(),
                priority: 0,
            }],
            trigger_terrain: None,
        }];

        let warnings = config.validate();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::HeightGap(lo, hi)
                if (*lo - 0.3).abs() < 1e-9 && (*hi - 0.6).abs() < 1e-9)));
    }

    #[test]
    fn test_empty_registries_are_warned() {
        let config = WorldConfig {
            terrain: Vec::new(),
            fallback_terrain: None,
            ..WorldConfig::default()
        };
        let warnings = config.validate();

        assert!(warnings.contains(&ConfigWarning::EmptyTerrainRegistry));
        assert!(warnings.contains(&ConfigWarning::EmptyPresetRegistry));
    }

    #[test]
    fn test_unknown_preset_terrain_is_skipped_with_warning() {
        let mut config = WorldConfig::default();
        config.presets = vec![PresetConfig {
            name: "ghost".to_string(),
            natural_spawn: true,
            spawn_chance: 0.5,
            min_spacing: 4.0,
            height_window: (0.0, 1.0),
            temperature_window: (-1.0, 1.0),
            humidity_window: (-1.0, 1.0),
            cells: vec![PresetCellConfig {
                dx: 0,
                dy: 0,
                terrain: "no_such_terrain".to_string(),
                priority: 0,
            }],
            trigger_terrain: None,
        }];

        let registry = config.terrain_registry();
        assert!(config.preset_registry(&registry).is_empty());
        assert!(config.validate().iter().any(|w| matches!(
            w,
            ConfigWarning::UnknownPresetTerrain(name, terrain)
                if name == "ghost" && terrain == "no_such_terrain"
        )));
    }
}

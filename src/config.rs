use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

pub const SIM_HZ: f32 = 60.0;
pub const RENDER_HZ: f32 = 30.0;
pub const DT: f32 = 1.0 / SIM_HZ;

// Pixel footprint of one terminal cell.
pub const CELL_PX_W: f32 = 9.0;
pub const CELL_PX_H: f32 = 18.0;

pub const MAX_TERMS: usize = 45;
pub const LABEL_FIELDS: [&str; 4] = ["feature_module", "module", "label", "type"];
pub const IGNORED_LABELS: [&str; 10] = [
    "N/A",
    "None",
    "unknown",
    "Other",
    "NA",
    "-",
    " ",
    "无",
    "null",
    "undefined",
];

pub const GRAVITY: f32 = 0.85;
pub const FRICTION: f32 = 0.96;
pub const REPULSION: f32 = 0.5;
pub const ATTRACTION: f32 = 0.012;
pub const GROUND_ELASTICITY: f32 = 0.15;
pub const GROUND_FRICTION: f32 = 0.8;
pub const CUSHION_ZONE: f32 = 120.0;
pub const CUSHION_STRENGTH: f32 = 0.05;
pub const FADE_STEP: f32 = 0.08;
pub const PAIR_PADDING: f32 = 15.0;
pub const WALL_MARGIN: f32 = 5.0;
pub const WALL_DAMPING: f32 = 0.4;
pub const REST_SPEED: f32 = 0.5;

pub const FONT_SIZE_BASE: f32 = 0.7;
pub const FONT_SIZE_SCALE: f32 = 1.2;
pub const GLYPH_PX: f32 = 9.0;
pub const RADIUS_PAD: f32 = 20.0;

pub const LANE_INSET: f32 = 0.1;
pub const LANE_SPAN: f32 = 0.8;
pub const SPAWN_TOP: f32 = -150.0;
pub const SPAWN_STAGGER: f32 = 12.0;
pub const SPAWN_JITTER: f32 = 60.0;
pub const SPAWN_VX: f32 = 4.0;
pub const SPAWN_VY_MIN: f32 = 15.0;
pub const SPAWN_VY_RANGE: f32 = 10.0;
pub const SPAWN_ROTATION: f32 = 20.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read params file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid params JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {field}: {value} ({reason})")]
    Invalid {
        field: &'static str,
        value: f32,
        reason: &'static str,
    },
}

/// Tunable physics parameters. Every field falls back to its constant above,
/// so a params file only needs the values it overrides.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsParams {
    pub gravity: f32,
    pub friction: f32,
    pub repulsion: f32,
    pub attraction: f32,
    pub ground_elasticity: f32,
    pub ground_friction: f32,
    pub cushion_zone: f32,
    pub cushion_strength: f32,
    pub fade_step: f32,
    pub pair_padding: f32,
    pub wall_margin: f32,
    pub wall_damping: f32,
    pub rest_speed: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            friction: FRICTION,
            repulsion: REPULSION,
            attraction: ATTRACTION,
            ground_elasticity: GROUND_ELASTICITY,
            ground_friction: GROUND_FRICTION,
            cushion_zone: CUSHION_ZONE,
            cushion_strength: CUSHION_STRENGTH,
            fade_step: FADE_STEP,
            pair_padding: PAIR_PADDING,
            wall_margin: WALL_MARGIN,
            wall_damping: WALL_DAMPING,
            rest_speed: REST_SPEED,
        }
    }
}

impl PhysicsParams {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let params: PhysicsParams = serde_json::from_str(raw)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("repulsion", self.repulsion),
            ("attraction", self.attraction),
            ("ground_elasticity", self.ground_elasticity),
            ("ground_friction", self.ground_friction),
            ("cushion_zone", self.cushion_zone),
            ("cushion_strength", self.cushion_strength),
            ("fade_step", self.fade_step),
            ("pair_padding", self.pair_padding),
            ("wall_margin", self.wall_margin),
            ("wall_damping", self.wall_damping),
            ("rest_speed", self.rest_speed),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    value,
                    reason: "must be finite",
                });
            }
        }

        let unit = [
            ("friction", self.friction),
            ("ground_elasticity", self.ground_elasticity),
            ("ground_friction", self.ground_friction),
            ("cushion_strength", self.cushion_strength),
            ("wall_damping", self.wall_damping),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    value,
                    reason: "must be within [0, 1]",
                });
            }
        }

        let non_negative = [
            ("cushion_zone", self.cushion_zone),
            ("fade_step", self.fade_step),
            ("pair_padding", self.pair_padding),
            ("wall_margin", self.wall_margin),
            ("rest_speed", self.rest_speed),
        ];
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    value,
                    reason: "must not be negative",
                });
            }
        }
        Ok(())
    }
}

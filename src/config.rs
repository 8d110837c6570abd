//! Harness configuration
//!
//! Loaded from TOML; every field has a default so a partial file (or none at
//! all) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::codegen::{DEFAULT_GLSL_VERSION, DEFAULT_RHS_EXPRESSION, DEFAULT_ROOT_NAME};
use crate::constants::harness::{
    DEFAULT_INSTANCE_ALIGNMENT, DEFAULT_SEED, DEFAULT_VALUE_SEED, ROOT_ARRAY_GRANULARITY,
};
use crate::error::{LayoutError, LayoutResult};
use crate::random::FieldKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Seed for the structure generator
    pub seed: u64,
    /// First value handed out by `loop_seed`
    pub value_seed: f32,
    /// Instances in the shared buffer start on multiples of this
    pub instance_alignment: usize,
    pub random: RandomConfig,
    pub shader: ShaderConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            value_seed: DEFAULT_VALUE_SEED,
            instance_alignment: DEFAULT_INSTANCE_ALIGNMENT,
            random: RandomConfig::default(),
            shader: ShaderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    pub type_pool: Vec<FieldKind>,
    /// Arrays get 1..=max_array_len elements
    pub max_array_len: u32,
    pub max_root_array_multiplier: u32,
    pub root_array_granularity: u32,
}

impl Default for RandomConfig {
    fn default() -> Self {
        let type_pool = FieldKind::default_pool();
        let n = type_pool.len() as u32;
        Self {
            type_pool,
            max_array_len: n,
            max_root_array_multiplier: n,
            root_array_granularity: ROOT_ARRAY_GRANULARITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub version: String,
    /// Name of the storage block instance
    pub root_name: String,
    /// Right-hand side assigned to every leaf
    pub rhs_expression: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_GLSL_VERSION.to_string(),
            root_name: DEFAULT_ROOT_NAME.to_string(),
            rhs_expression: DEFAULT_RHS_EXPRESSION.to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(raw: &str) -> LayoutResult<Self> {
        let config: HarnessConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> LayoutResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        log::info!("[HarnessConfig] Loaded {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> LayoutResult<String> {
        Ok(toml::to_string(self)?)
    }

    fn validate(&self) -> LayoutResult<()> {
        if !self.instance_alignment.is_power_of_two() {
            return Err(LayoutError::Config(format!(
                "instance_alignment must be a power of two, got {}",
                self.instance_alignment
            )));
        }
        if self.random.type_pool.len() < 2 {
            return Err(LayoutError::Config(
                "random.type_pool needs at least two entries".to_string(),
            ));
        }
        Ok(())
    }
}

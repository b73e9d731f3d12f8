//! Configuration loading and well-known directories.
//!
//! Config files: `skillport.toml`, `skillport.yaml`, `skillport.yml` or
//! `skillport.json`, searched in `./` then the user config directory
//! (`~/.config/skillport/` on Linux).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, config_dir, data_dir, discover_and_load, expand_home, load_config,
        set_config_dir, set_data_dir,
    },
    schema::{CatalogsConfig, GithubConfig, ProvidersConfig, SkillportConfig},
};

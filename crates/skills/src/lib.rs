//! Skill catalogs: discovery, parsing, installation and reconciliation.
//!
//! Skills are directories containing a `SKILL.md` file with YAML front matter
//! and markdown instructions. They are listed by catalogs (the local catalog
//! of installed skills, GitHub repositories, template folders) and installed
//! into the skill directories of one or more providers.

pub mod catalog;
pub mod editor;
pub mod error;
pub mod install;
pub mod library;
pub mod parse;
pub mod registry;
pub mod source;
pub mod types;

#[cfg(test)]
mod testing;

pub use {
    catalog::{LOCAL_CATALOG_ID, SkillsCatalog},
    editor::{FsSkillWriter, SkillWriter},
    error::{FetchError, InstallError, ParseError, RegistryError, WriteError},
    install::{FsSkillInstaller, SkillInstaller, resolve_provider_roots},
    library::{Library, SourceFilter},
    registry::{CatalogEntry, CatalogRegistry, CatalogRegistryStore},
    source::{
        GitMirrorRepository, LocalRoot, LocalSkillRepository, RemoteSkillRepository, RootKind,
        SkillRepository,
    },
    types::{Provider, Skill, SkillSource, UnknownProvider},
};

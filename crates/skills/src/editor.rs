use std::{io, path::Path};

use async_trait::async_trait;

use crate::{
    error::WriteError,
    parse,
    types::{MANIFEST_FILENAME, Skill},
};

/// Persists edits to a skill's manifest.
#[async_trait]
pub trait SkillWriter: Send + Sync {
    async fn save(&self, skill: &Skill) -> Result<Skill, WriteError>;
}

/// Rewrites `<directory>/SKILL.md` in place. Last writer wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSkillWriter;

#[async_trait]
impl SkillWriter for FsSkillWriter {
    async fn save(&self, skill: &Skill) -> Result<Skill, WriteError> {
        let dir = skill
            .directory
            .as_deref()
            .ok_or_else(|| WriteError::NoLocalPath {
                key: skill.unique_key(),
            })?;

        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {},
            Ok(_) => {
                return Err(WriteError::DirectoryMissing {
                    path: dir.to_path_buf(),
                });
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WriteError::DirectoryMissing {
                    path: dir.to_path_buf(),
                });
            },
            Err(e) => return Err(WriteError::io(dir, e)),
        }

        let rendered = parse::serialize(skill)?;
        write_atomic(&dir.join(MANIFEST_FILENAME), &rendered).await?;
        tracing::info!(key = %skill.unique_key(), ?dir, "saved skill");
        Ok(skill.clone())
    }
}

/// Write via temp file + rename so readers never see a partial manifest.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), WriteError> {
    let tmp = path.with_extension("md.tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| WriteError::io(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(WriteError::io(path, e));
    }
    Ok(())
}

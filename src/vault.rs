use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Vault-relative path in forward-slash form; the identity of a file record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VaultPath(String);

impl VaultPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for VaultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&Path> for VaultPath {
    type Error = Error;

    fn try_from(value: &Path) -> Result<Self> {
        let mut parts = Vec::new();
        for c in value.components() {
            match c {
                Component::Normal(part) => parts.push(part.to_string_lossy()),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(Error::InvalidVaultPath(format!(
                        "{} escapes the vault",
                        value.display()
                    )));
                }
                Component::Prefix(_) | Component::RootDir => {
                    return Err(Error::InvalidVaultPath(format!(
                        "{} is not vault-relative",
                        value.display()
                    )));
                }
            }
        }
        if parts.is_empty() {
            return Err(Error::InvalidVaultPath("empty path".into()));
        }
        Ok(Self(parts.join("/")))
    }
}

/// Canonical root of an opened vault.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::VaultNotFound(root));
        }
        let root = std::fs::canonicalize(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a path found under the root to its vault-relative form.
    pub fn relative(&self, abs: &Path) -> Result<VaultPath> {
        let rel = abs
            .strip_prefix(&self.root)
            .map_err(|_| Error::PathOutsideVault(abs.to_path_buf()))?;
        VaultPath::try_from(rel)
    }

    /// True when any component of `rel` is one of `ignore_dirs`.
    pub fn is_ignored_rel(&self, rel: &Path, ignore_dirs: &[String]) -> bool {
        rel.components().any(|c| match c {
            Component::Normal(part) => ignore_dirs.iter().any(|d| part == d.as_str()),
            _ => false,
        })
    }
}

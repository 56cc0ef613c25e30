//! Filesystem operations scoped to the shared root.
//!
//! Every request path from the wire is resolved through [`SharedRoot::resolve`]
//! before it touches the filesystem. Resolution is purely lexical: `.`
//! components are dropped, `..` pops back towards the root and fails once it
//! would cross it, and absolute paths are rejected outright. A request can
//! therefore never name anything outside the shared directory, whether or
//! not the target exists yet. Containment is lexical, not canonical: a
//! symlink placed inside the root is followed wherever it points. Clients
//! cannot create symlinks through this protocol, so the boundary holds
//! against remote input; an operator who plants one inside the root is
//! trusted to mean it.
//!
//! Operations are thin wrappers over `std::fs`; failures are returned to the
//! connection handler, which converts them into FAILURE replies.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{Error, Result};
use crate::protocol::TreeNode;

/// The single directory tree a server exposes.
///
/// Cheap to clone; each connection worker gets its own handle to the same
/// canonical path, fixed for the server's lifetime.
#[derive(Debug, Clone)]
pub struct SharedRoot {
    path: PathBuf,
}

impl SharedRoot {
    /// Open the shared root, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but is not a directory, or the
    /// directory cannot be created. Callers treat this as fatal at startup.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        } else if !path.is_dir() {
            return Err(Error::InvalidTarget(format!(
                "shared root {} is not a directory",
                path.display()
            )));
        }

        let path = path.canonicalize()?;
        Ok(Self { path })
    }

    /// The canonical path of the shared root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a request path to a real path under the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathOutsideRoot`] if the request is absolute or
    /// walks above the root with `..` components.
    pub fn resolve(&self, request: &str) -> Result<PathBuf> {
        let mut resolved = self.path.clone();
        let mut depth = 0usize;

        for component in Path::new(request).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(Error::PathOutsideRoot(request.to_string()));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::PathOutsideRoot(request.to_string()));
                }
            }
        }

        Ok(resolved)
    }

    /// Create a directory and any missing parents. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the path escapes the root or creation fails.
    pub fn mkdir(&self, request: &str) -> Result<()> {
        let path = self.resolve(request)?;
        fs::create_dir_all(&path)?;
        Ok(())
    }

    /// Rename a file or directory within the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the source is absent and
    /// [`Error::AlreadyExists`] if the destination exists; there is no
    /// overwrite.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        if !from_path.exists() {
            return Err(Error::NotFound(from.to_string()));
        }
        if to_path.exists() {
            return Err(Error::AlreadyExists(to.to_string()));
        }

        fs::rename(&from_path, &to_path)?;
        Ok(())
    }

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path escapes the root or removal fails
    /// (including when the target does not exist).
    pub fn delete(&self, request: &str) -> Result<()> {
        let path = self.resolve(request)?;
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Recursively delete a directory, children before parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if the target is a plain file,
    /// leaving it untouched.
    pub fn rmdir(&self, request: &str) -> Result<()> {
        let path = self.resolve(request)?;

        if path.is_file() {
            return Err(Error::InvalidTarget(format!(
                "{request} is not a directory"
            )));
        }

        fs::remove_dir_all(&path)?;
        Ok(())
    }

    /// Build a formatted metadata block for a path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the target is absent.
    pub fn detail(&self, request: &str) -> Result<String> {
        let path = self.resolve(request)?;

        if !path.exists() {
            return Err(Error::NotFound(request.to_string()));
        }

        let metadata = fs::metadata(&path)?;
        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());

        let modified = metadata
            .modified()
            .map(|time| {
                DateTime::<Local>::from(time)
                    .format("%m/%d/%Y %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|_| "unknown".to_string());

        let mut block = String::new();
        block.push_str(&format!("name : {name}\n"));
        block.push_str(&format!("size (bytes) : {}\n", metadata.len()));
        block.push_str(&format!("dir? : {}\n", metadata.is_dir()));
        block.push_str(&format!("file? : {}\n", metadata.is_file()));
        block.push_str(&format!("readonly? : {}\n", metadata.permissions().readonly()));
        block.push_str(&format!("modified : {modified}\n"));
        block.push_str(&format!("path : {}\n", path.display()));

        Ok(block)
    }

    /// Serialize the whole shared root as a recursive [`TreeNode`].
    ///
    /// Children are sorted by name so the structure is deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be read.
    pub fn tree(&self) -> Result<TreeNode> {
        build_node(&self.path)
    }
}

fn build_node(path: &Path) -> Result<TreeNode> {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    if !path.is_dir() {
        return Ok(TreeNode {
            name,
            is_dir: false,
            children: Vec::new(),
        });
    }

    let mut entries: Vec<_> = fs::read_dir(path)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    let mut children = Vec::with_capacity(entries.len());
    for entry in entries {
        children.push(build_node(&entry.path())?);
    }

    Ok(TreeNode {
        name,
        is_dir: true,
        children,
    })
}

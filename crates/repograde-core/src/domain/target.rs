//! A repository selected for grading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One `<owner>/<repo>` directory under the input root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    /// Owner (student) directory name
    pub owner: String,
    /// Repository directory name
    pub name: String,
    /// Absolute or root-relative path to the repository directory
    pub path: PathBuf,
}

impl RepoTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `owner/name`, used in logs and summaries.
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_owner_and_repo() {
        let target = RepoTarget::new("alice", "todo-app", "/repos/alice/todo-app");
        assert_eq!(target.display_name(), "alice/todo-app");
        assert_eq!(target.path, PathBuf::from("/repos/alice/todo-app"));
    }
}

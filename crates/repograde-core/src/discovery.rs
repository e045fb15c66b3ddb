//! Repository discovery under a `<root>/<owner>/<repo>/` layout.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{GradeError, RepoTarget, Result};
use crate::policy::SourcePolicy;

/// List every `<owner>/<repo>` directory under `root`, sorted by owner then
/// repository name.
///
/// Owner or repository directories whose names are in the policy's ignore set
/// are skipped, as are loose files at either level. An unreadable owner
/// directory is logged and skipped. Only a missing `root` is an error.
pub fn discover_repositories(root: &Path, policy: &SourcePolicy) -> Result<Vec<RepoTarget>> {
    if !root.is_dir() {
        return Err(GradeError::RootNotFound(root.display().to_string()));
    }

    let walker = WalkDir::new(root)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || (entry.file_type().is_dir()
                    && !entry
                        .file_name()
                        .to_str()
                        .map(|name| policy.is_ignored_dir(name))
                        .unwrap_or(false))
        });

    let mut targets = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory during discovery");
                continue;
            }
        };

        if entry.depth() != 2 {
            continue;
        }

        let path = entry.path();
        let owner = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        let Some(owner) = owner else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();

        debug!(owner = %owner, repo = %name, "Discovered repository");
        targets.push(RepoTarget::new(owner, name, path));
    }

    Ok(targets)
}

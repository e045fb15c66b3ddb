//! Budgeted corpus construction.
//!
//! Turns a repository directory into one bounded excerpt string: the README
//! first, then the largest qualifying source files, each truncated to a
//! per-file ceiling, with the whole thing hard-capped at an aggregate ceiling.
//!
//! Selection is deterministic. Candidates are ranked by descending byte size
//! with ties broken by relative path, so two runs over the same tree produce
//! the same excerpt (and the same digest).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::policy::SourcePolicy;

/// Size limits applied while building an excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusBudget {
    /// Hard cap on the rendered excerpt, in characters.
    pub max_total_chars: usize,
    /// Cap on each README or file body, in characters.
    pub max_file_chars: usize,
    /// Maximum number of ranked files considered.
    pub max_files: usize,
    /// Files at or above this many bytes are never candidates.
    pub max_file_bytes: u64,
}

impl Default for CorpusBudget {
    fn default() -> Self {
        Self {
            max_total_chars: 60_000,
            max_file_chars: 10_000,
            max_files: 40,
            max_file_bytes: 200_000,
        }
    }
}

/// A qualifying file found during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// Path relative to the repository root, used as the block label.
    pub relative: PathBuf,
    /// On-disk size in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Readme,
    File,
}

/// One labeled, already-truncated section of the excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptBlock {
    pub kind: BlockKind,
    /// README file name or file path relative to the root.
    pub label: String,
    pub text: String,
}

impl ExcerptBlock {
    fn render(&self) -> String {
        match self.kind {
            BlockKind::Readme => format!("{}:\n{}", self.label, self.text),
            BlockKind::File => format!("\nFILE: {}\n{}", self.label, self.text),
        }
    }
}

/// Counters describing how an excerpt was assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Files with an allowed extension under the byte ceiling.
    pub candidates: usize,
    /// Files with an allowed extension dropped for size.
    pub oversized: usize,
    /// Candidates skipped because they could not be read or looked binary.
    pub skipped: usize,
    /// File blocks in the excerpt (the README is not counted).
    pub files_included: usize,
    pub has_readme: bool,
    /// Characters in the rendered excerpt.
    pub chars: usize,
    /// SHA-256 hex digest of the rendered excerpt.
    pub digest: String,
}

/// The bounded text submitted as grading evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusExcerpt {
    blocks: Vec<ExcerptBlock>,
    text: String,
    stats: CorpusStats,
}

impl CorpusExcerpt {
    pub fn blocks(&self) -> &[ExcerptBlock] {
        &self.blocks
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of `FILE:` blocks.
    pub fn file_count(&self) -> usize {
        self.stats.files_included
    }
}

/// Builds [`CorpusExcerpt`]s under a fixed policy and budget.
pub struct CorpusBuilder<'a> {
    policy: &'a SourcePolicy,
    budget: CorpusBudget,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(policy: &'a SourcePolicy, budget: CorpusBudget) -> Self {
        Self { policy, budget }
    }

    pub fn budget(&self) -> &CorpusBudget {
        &self.budget
    }

    /// Build the excerpt for the repository at `root`.
    ///
    /// Never fails: unreadable files are skipped and an empty repository
    /// yields an empty excerpt.
    pub fn build(&self, root: &Path) -> CorpusExcerpt {
        let readme = self.policy.find_readme(root);
        let (candidates, oversized) = self.collect_candidates(root, readme.as_deref());

        let mut excerpt = self.assemble(readme.as_deref(), &candidates);
        excerpt.stats.oversized = oversized;

        debug!(
            root = %root.display(),
            files = excerpt.stats.files_included,
            chars = excerpt.stats.chars,
            "Corpus assembled"
        );
        excerpt
    }

    /// Read the README and the ranked `candidates` into an excerpt.
    ///
    /// A candidate that can no longer be read is skipped and counted in
    /// `stats.skipped`; the remaining candidates are still emitted.
    pub fn assemble(&self, readme: Option<&Path>, candidates: &[CandidateFile]) -> CorpusExcerpt {
        let mut blocks = Vec::new();
        let mut stats = CorpusStats::default();
        let mut running_chars = 0usize;

        if let Some(path) = readme {
            match std::fs::read(path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    let label = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "README".to_string());
                    let block = ExcerptBlock {
                        kind: BlockKind::Readme,
                        label,
                        text: truncate_chars(&text, self.budget.max_file_chars).to_string(),
                    };
                    running_chars += block.render().chars().count();
                    stats.has_readme = true;
                    blocks.push(block);
                }
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable README"),
            }
        }

        stats.candidates = candidates.len();

        for candidate in candidates.iter().take(self.budget.max_files) {
            if running_chars > self.budget.max_total_chars {
                break;
            }
            let bytes = match std::fs::read(&candidate.path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(path = %candidate.path.display(), error = %e, "Skipping unreadable file");
                    stats.skipped += 1;
                    continue;
                }
            };
            if self.policy.looks_binary(&bytes) {
                debug!(path = %candidate.path.display(), "Skipping binary-looking file");
                stats.skipped += 1;
                continue;
            }

            let text = String::from_utf8_lossy(&bytes);
            let block = ExcerptBlock {
                kind: BlockKind::File,
                label: candidate.relative.display().to_string(),
                text: truncate_chars(&text, self.budget.max_file_chars).to_string(),
            };
            running_chars += block.render().chars().count();
            stats.files_included += 1;
            blocks.push(block);
        }

        let joined = blocks
            .iter()
            .map(ExcerptBlock::render)
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = truncate_chars(&joined, self.budget.max_total_chars).to_string();

        stats.chars = text.chars().count();
        stats.digest = hex::encode(Sha256::digest(text.as_bytes()));

        CorpusExcerpt {
            blocks,
            text,
            stats,
        }
    }

    /// Walk `root` and return ranked candidates plus the number of files
    /// dropped for size. Ignored directories are pruned before descent.
    pub fn collect_candidates(
        &self,
        root: &Path,
        exclude: Option<&Path>,
    ) -> (Vec<CandidateFile>, usize) {
        let mut candidates = Vec::new();
        let mut oversized = 0usize;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !entry
                        .file_name()
                        .to_str()
                        .map(|name| self.policy.is_ignored_dir(name))
                        .unwrap_or(false)
            });

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if exclude == Some(path) || !self.policy.is_source_file(path) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping file without metadata");
                    continue;
                }
            };
            if size >= self.budget.max_file_bytes {
                debug!(
                    path = %path.display(),
                    size,
                    limit = self.budget.max_file_bytes,
                    "Skipping oversized file"
                );
                oversized += 1;
                continue;
            }

            candidates.push(CandidateFile {
                path: path.to_path_buf(),
                relative: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
                size,
            });
        }

        candidates.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.relative.cmp(&b.relative))
        });

        (candidates, oversized)
    }
}

/// Prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use promptpack_selectors::CompiledSelectors;
use tracing::{debug, trace, warn};

use crate::candidate::Candidate;
use crate::render::file_section;

/// Files larger than this are skipped (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Directories never descended into, whatever the selectors say.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Read from the walk root when present.
pub const GITIGNORE_FILE: &str = ".gitignore";
pub const GPTIGNORE_FILE: &str = ".gptignore";

/// One selected repository file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path relative to the walk root, `/`-separated.
    pub path: String,
    pub content: String,
}

impl CorpusFile {
    /// Candidate whose content is the rendered `File:` section, so packed
    /// totals match the text that ends up in the prompt.
    #[must_use]
    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(self.path.clone(), file_section(&self.path, &self.content))
    }
}

/// Collects the text files under a root that the selectors admit.
///
/// Patterns from the root's `.gitignore` and `.gptignore`, and from any extra
/// ignore files, drop paths before the selectors see them. `.gitignore` can
/// be switched off; `.gptignore` is always honoured.
#[derive(Debug, Clone)]
pub struct CorpusWalker {
    selectors: CompiledSelectors,
    max_file_size: u64,
    use_gitignore: bool,
    ignore_files: Vec<Utf8PathBuf>,
}

impl CorpusWalker {
    #[must_use]
    pub fn new(selectors: CompiledSelectors) -> Self {
        Self {
            selectors,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            use_gitignore: true,
            ignore_files: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use]
    pub const fn use_gitignore(mut self, yes: bool) -> Self {
        self.use_gitignore = yes;
        self
    }

    /// Also apply the gitignore-style patterns in `path`.
    #[must_use]
    pub fn with_ignore_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.ignore_files.push(path.into());
        self
    }

    /// Ignore patterns rooted at `root`.
    fn ignore_matcher(&self, root: &Utf8Path) -> Result<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        let mut sources: Vec<Utf8PathBuf> = Vec::new();
        if self.use_gitignore {
            sources.push(root.join(GITIGNORE_FILE));
        }
        sources.push(root.join(GPTIGNORE_FILE));

        for source in sources.iter().filter(|p| p.is_file()) {
            if let Some(err) = builder.add(source) {
                warn!(file = %source, error = %err, "Skipping unreadable ignore patterns");
            }
        }
        for source in &self.ignore_files {
            if !source.is_file() {
                anyhow::bail!("Ignore file not found: {source}");
            }
            if let Some(err) = builder.add(source) {
                warn!(file = %source, error = %err, "Skipping unreadable ignore patterns");
            }
        }

        builder
            .build()
            .with_context(|| format!("Failed to compile ignore patterns under {root}"))
    }

    /// Walk `root` and return the selected files sorted by path.
    ///
    /// Ignored paths, symlinks, oversized files and files that are not valid
    /// UTF-8 are skipped.
    ///
    /// # Errors
    ///
    /// Fails when a directory cannot be read, a path is not UTF-8, or an
    /// extra ignore file does not exist.
    pub fn walk(&self, root: &Utf8Path) -> Result<Vec<CorpusFile>> {
        let ignored = self.ignore_matcher(root)?;
        let mut files = Vec::new();
        self.walk_directory(root, root, &ignored, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %root, files = files.len(), "Corpus walk completed");
        Ok(files)
    }

    fn walk_directory(
        &self,
        root: &Utf8Path,
        dir: &Utf8Path,
        ignored: &Gitignore,
        files: &mut Vec<CorpusFile>,
    ) -> Result<()> {
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {dir}"))? {
            let entry = entry?;
            let path = Utf8PathBuf::try_from(entry.path()).context("Invalid UTF-8 path")?;
            let file_type = entry.file_type()?;

            if file_type.is_symlink() {
                trace!(path = %path, "Skipping symlink");
                continue;
            }

            if ignored.matched(&path, file_type.is_dir()).is_ignore() {
                trace!(path = %path, "Skipping ignored path");
                continue;
            }

            if file_type.is_dir() {
                if path.file_name().is_some_and(|name| SKIPPED_DIRS.contains(&name)) {
                    continue;
                }
                self.walk_directory(root, &path, ignored, files)?;
                continue;
            }

            let relative = relative_path(root, &path);
            if !self.selectors.is_selected(&relative) {
                continue;
            }

            let size = entry.metadata()?.len();
            if size > self.max_file_size {
                debug!(path = %relative, size = size, "Skipping oversized file");
                continue;
            }

            match fs::read_to_string(&path) {
                Ok(content) => files.push(CorpusFile {
                    path: relative,
                    content,
                }),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    debug!(path = %relative, "Skipping non-UTF-8 file");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to read file: {path}"));
                }
            }
        }

        Ok(())
    }
}

fn relative_path(root: &Utf8Path, path: &Utf8Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

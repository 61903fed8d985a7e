//! System prompts of the team's agents.
//!
//! Prompts are markdown files named after the agent id. A loader reads
//! them from a directory when one is configured, and falls back to the
//! prompts compiled into the binary otherwise.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Sections every prompt is expected to have.
pub const REQUIRED_SECTIONS: [&str; 4] =
    ["# Identity", "# Mission", "## Methodology", "## Output Format"];

const SHORT_PROMPT_CHARS: usize = 100;

/// Returns the prompt shipped with the crate for an agent.
pub fn builtin_prompt(agent_id: &str) -> Option<&'static str> {
    let prompt = match agent_id {
        "manager" => include_str!("../prompts/manager.md"),
        "analyst" => include_str!("../prompts/analyst.md"),
        "growth_hacker" => include_str!("../prompts/growth_hacker.md"),
        "sales_machine" => include_str!("../prompts/sales_machine.md"),
        "system_builder" => include_str!("../prompts/system_builder.md"),
        "brand_builder" => include_str!("../prompts/brand_builder.md"),
        _ => return None,
    };
    Some(prompt)
}

/// Errors raised while loading a prompt.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// There is no prompt for the agent.
    #[error("Prompt file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The prompt file has no content.
    #[error("Prompt file is empty: {}", .0.display())]
    Empty(PathBuf),
    /// The prompt file couldn't be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// The result of checking a prompt for its required sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PromptValidation {
    /// The agent the prompt belongs to.
    pub agent_id: String,
    /// Whether every required section is present.
    pub is_valid: bool,
    /// Required sections that are missing, in the order they're expected.
    pub missing_sections: Vec<&'static str>,
    /// Length of the prompt in characters.
    pub prompt_length: usize,
}

/// Loads and caches agent prompts.
///
/// Every prompt is read at most once until [`clear_cache`] is called.
///
/// [`clear_cache`]: PromptLoader::clear_cache
#[derive(Debug, Default)]
pub struct PromptLoader {
    dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Arc<str>>>,
}

impl PromptLoader {
    /// Creates a loader that only knows the built-in prompts.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader that reads `<dir>/<agent_id>.md`, falling back to
    /// the built-in prompt when the file doesn't exist.
    #[inline]
    pub fn with_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: Some(dir.into()),
            cache: Mutex::default(),
        }
    }

    /// Returns the prompt directory, if any.
    #[inline]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, Arc<str>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the prompt of an agent.
    pub fn load(&self, agent_id: &str) -> Result<Arc<str>, PromptError> {
        if let Some(prompt) = self.lock_cache().get(agent_id) {
            return Ok(Arc::clone(prompt));
        }

        let prompt: Arc<str> = self.read(agent_id)?.into();
        if prompt.chars().count() < SHORT_PROMPT_CHARS {
            warn!(agent_id, length = prompt.len(), "prompt is suspiciously short");
        }
        self.lock_cache()
            .insert(agent_id.to_owned(), Arc::clone(&prompt));
        Ok(prompt)
    }

    fn read(&self, agent_id: &str) -> Result<String, PromptError> {
        let builtin_path = || PathBuf::from(format!("{agent_id}.md"));
        let Some(dir) = &self.dir else {
            return builtin_prompt(agent_id)
                .map(str::to_owned)
                .ok_or_else(|| PromptError::NotFound(builtin_path()));
        };

        let path = dir.join(format!("{agent_id}.md"));
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return match builtin_prompt(agent_id) {
                    Some(prompt) => {
                        debug!(agent_id, "using built-in prompt");
                        Ok(prompt.to_owned())
                    }
                    None => Err(PromptError::NotFound(path)),
                };
            }
            Err(source) => return Err(PromptError::Io { path, source }),
        };
        if content.trim().is_empty() {
            return Err(PromptError::Empty(path));
        }
        debug!(agent_id, path = %path.display(), "prompt loaded");
        Ok(content)
    }

    /// Checks that the prompt of an agent has every required section.
    pub fn validate(&self, agent_id: &str) -> Result<PromptValidation, PromptError> {
        let prompt = self.load(agent_id)?;
        let missing_sections: Vec<_> = REQUIRED_SECTIONS
            .into_iter()
            .filter(|section| !prompt.contains(section))
            .collect();
        Ok(PromptValidation {
            agent_id: agent_id.to_owned(),
            is_valid: missing_sections.is_empty(),
            missing_sections,
            prompt_length: prompt.chars().count(),
        })
    }

    /// Lists the agents a prompt is available for, sorted.
    ///
    /// With a directory, this is the stem of every `.md` file in it.
    pub fn list_available(&self) -> Vec<String> {
        let Some(dir) = &self.dir else {
            let mut ids: Vec<_> = crate::team::AGENT_IDS
                .iter()
                .map(|id| (*id).to_owned())
                .collect();
            ids.sort();
            return ids;
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("failed to list {}: {err}", dir.display());
                return vec![];
            }
        };
        let mut ids: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_owned)
            })
            .collect();
        ids.sort();
        ids
    }

    /// Forgets every loaded prompt.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "# Identity\nYou test things.\n\n# Mission\nFind bugs before users do.\n\n## Methodology\nRead, then poke.\n\n## Output Format\nA list.\n";

    #[test]
    fn test_builtin_prompts_are_valid() {
        let loader = PromptLoader::new();
        for id in loader.list_available() {
            let validation = loader.validate(&id).unwrap();
            assert!(validation.is_valid, "{id}: {:?}", validation.missing_sections);
        }
        assert!(matches!(
            loader.load("ghost"),
            Err(PromptError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("analyst.md"), VALID).unwrap();
        fs::write(dir.path().join("empty.md"), "  \n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loader = PromptLoader::with_dir(dir.path());
        assert_eq!(&*loader.load("analyst").unwrap(), VALID);
        // Missing files fall back to the built-in prompt.
        assert_eq!(
            &*loader.load("manager").unwrap(),
            builtin_prompt("manager").unwrap()
        );
        assert!(matches!(loader.load("empty"), Err(PromptError::Empty(_))));
        assert!(matches!(loader.load("ghost"), Err(PromptError::NotFound(_))));
        assert_eq!(loader.list_available(), ["analyst", "empty"]);
    }

    #[test]
    fn test_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyst.md");
        fs::write(&path, VALID).unwrap();

        let loader = PromptLoader::with_dir(dir.path());
        let first = loader.load("analyst").unwrap();
        fs::write(&path, "# Identity\nchanged").unwrap();
        assert!(Arc::ptr_eq(&first, &loader.load("analyst").unwrap()));

        loader.clear_cache();
        assert_eq!(&*loader.load("analyst").unwrap(), "# Identity\nchanged");
    }

    #[test]
    fn test_validate_reports_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("analyst.md"), "# Identity\nshort\n\n# Mission\n")
            .unwrap();

        let validation = PromptLoader::with_dir(dir.path())
            .validate("analyst")
            .unwrap();
        assert!(!validation.is_valid);
        assert_eq!(
            validation.missing_sections,
            ["## Methodology", "## Output Format"]
        );
        assert_eq!(validation.prompt_length, 28);
    }
}

use crate::prompts::PromptKind;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads prompt overrides from `dir_path`.
///
/// Each `<key>.md` file replaces the built-in template of the prompt kind
/// with that key. Other files and subdirectories are skipped, and so are
/// markdown files whose stem names no prompt kind.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<PromptKind, String>> {
    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?;

    let mut prompts = HashMap::new();
    for entry in entries {
        let path = entry?.path();
        let Some(stem) = markdown_stem(&path) else {
            continue;
        };
        let Some(kind) = PromptKind::from_key(stem) else {
            tracing::warn!(file = %path.display(), "no prompt uses this file, skipping it");
            continue;
        };

        let template = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        tracing::debug!(prompt = kind.key(), "loaded prompt override");
        prompts.insert(kind, template);
    }

    Ok(prompts)
}

fn markdown_stem(path: &Path) -> Option<&str> {
    if !path.is_file() || path.extension()? != "md" {
        return None;
    }
    path.file_stem()?.to_str()
}

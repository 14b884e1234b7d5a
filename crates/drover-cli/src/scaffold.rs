//! Metadata directory scaffolding.
//!
//! The prompt documents and the feature-list template ship embedded in the
//! binary and are copied into the metadata directory the first time an
//! initializer or onboarding iteration runs. Files that already exist are
//! never overwritten; the agent owns them from then on.

use drover_core::{FEATURE_LIST_FILE_NAME, PROMPTS_DIR_NAME, SPEC_FILE_NAME};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

const INITIALIZER_PROMPT: &str = include_str!("../data/initializer.md");
const ONBOARDING_PROMPT: &str = include_str!("../data/onboarding.md");
const CODING_PROMPT: &str = include_str!("../data/coding.md");
const TODO_PROMPT: &str = include_str!("../data/todo.md");
const FEATURE_LIST_TEMPLATE: &str = include_str!("../data/feature_list.json");

/// Copies the embedded prompt documents and the feature-list template into
/// the metadata directory. Idempotent; existing files win.
pub fn ensure_artifacts(metadata_dir: &Path) -> io::Result<()> {
    let prompts = metadata_dir.join(PROMPTS_DIR_NAME);
    fs::create_dir_all(&prompts)?;

    write_if_absent(&prompts.join("initializer.md"), INITIALIZER_PROMPT)?;
    write_if_absent(&prompts.join("onboarding.md"), ONBOARDING_PROMPT)?;
    write_if_absent(&prompts.join("coding.md"), CODING_PROMPT)?;
    write_if_absent(&prompts.join("todo.md"), TODO_PROMPT)?;
    write_if_absent(
        &metadata_dir.join(FEATURE_LIST_FILE_NAME),
        FEATURE_LIST_TEMPLATE,
    )?;
    Ok(())
}

/// Copies the user-supplied specification to `spec.txt` when one was given
/// and no copy exists yet.
pub fn copy_spec(spec_file: Option<&Path>, metadata_dir: &Path) -> io::Result<()> {
    let Some(spec_file) = spec_file else {
        return Ok(());
    };
    let target = metadata_dir.join(SPEC_FILE_NAME);
    if target.exists() {
        debug!(target = %target.display(), "Specification already copied");
        return Ok(());
    }
    fs::copy(spec_file, &target)?;
    info!(from = %spec_file.display(), to = %target.display(), "Copied specification");
    Ok(())
}

fn write_if_absent(path: &Path, content: &str) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn artifacts_are_copied_once_and_never_overwritten() {
        let temp = TempDir::new().unwrap();
        ensure_artifacts(temp.path()).unwrap();

        let coding = temp.path().join("prompts/coding.md");
        assert!(coding.is_file());
        assert!(temp.path().join(FEATURE_LIST_FILE_NAME).is_file());

        // A second pass must not clobber agent-owned content.
        fs::write(&coding, "customized").unwrap();
        ensure_artifacts(temp.path()).unwrap();
        assert_eq!(fs::read_to_string(&coding).unwrap(), "customized");
    }

    #[test]
    fn template_carries_both_placeholder_markers() {
        assert!(FEATURE_LIST_TEMPLATE.contains(drover_core::DATE_PLACEHOLDER));
        assert!(FEATURE_LIST_TEMPLATE.contains(drover_core::FEATURE_NAME_PLACEHOLDER));
    }

    #[test]
    fn spec_copy_respects_existing_file() {
        let temp = TempDir::new().unwrap();
        let spec = temp.path().join("spec.md");
        fs::write(&spec, "build a parser").unwrap();

        copy_spec(Some(&spec), temp.path()).unwrap();
        let target = temp.path().join(SPEC_FILE_NAME);
        assert_eq!(fs::read_to_string(&target).unwrap(), "build a parser");

        fs::write(&spec, "changed upstream").unwrap();
        copy_spec(Some(&spec), temp.path()).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "build a parser");
    }

    #[test]
    fn no_spec_file_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        copy_spec(None, temp.path()).unwrap();
        assert!(!temp.path().join(SPEC_FILE_NAME).exists());
    }
}

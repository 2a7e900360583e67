//! Finding CLIP weights on disk.
//!
//! Nothing is downloaded. The first existing directory among
//! `$SNAPSEEK_MODELS_DIR`, `~/.snapseek/models` and `models/` beside the
//! executable is the models root, laid out as:
//!
//! ```text
//! <root>/clip/clip-vit-base-patch32/
//!     model.safetensors
//!     tokenizer.json
//!     config.json        (optional)
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ModelError, ModelResult};

pub const SNAPSEEK_MODELS_DIR_ENV: &str = "SNAPSEEK_MODELS_DIR";

pub const CLIP_SUBDIR: &str = "clip";

pub const DEFAULT_CLIP_MODEL_NAME: &str = "clip-vit-base-patch32";

/// Files without which a checkpoint directory is rejected.
pub const REQUIRED_MODEL_FILES: &[&str] = &["model.safetensors", "tokenizer.json"];

const WEIGHTS_FILE: &str = "model.safetensors";

#[derive(Debug, Clone, Default)]
pub struct ModelLocator {
    /// Replaces the whole search when set.
    pinned_root: Option<PathBuf>,
}

impl ModelLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only ever look in `root`.
    pub fn with_base_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            pinned_root: Some(root.into()),
        }
    }

    /// Roots in the order they are tried.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        if let Some(root) = &self.pinned_root {
            return vec![root.clone()];
        }

        let from_env = std::env::var_os(SNAPSEEK_MODELS_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let in_home = dirs::home_dir().map(|home| home.join(".snapseek").join("models"));
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("models")));

        [from_env, in_home, beside_exe].into_iter().flatten().collect()
    }

    pub fn resolve_base_dir(&self) -> ModelResult<PathBuf> {
        let searched = self.search_paths();
        match searched.iter().position(|root| root.is_dir()) {
            Some(i) => Ok(searched[i].clone()),
            None => Err(ModelError::ModelsDirectoryNotFound { searched }),
        }
    }

    /// Directory of the checkpoint named by `model_id`, either a Hugging Face
    /// id (`openai/clip-vit-base-patch32`) or a bare directory name.
    ///
    /// Looks at `clip/<name>`, then `<model_id>`, then `<name>` under the root,
    /// and takes the first one holding `model.safetensors`.
    pub fn clip_model_path(&self, model_id: &str) -> ModelResult<PathBuf> {
        let root = self.resolve_base_dir()?;
        let name = extract_model_name(model_id);
        let preferred = root.join(CLIP_SUBDIR).join(name);

        [preferred.clone(), root.join(model_id), root.join(name)]
            .into_iter()
            .find(|dir| has_weights(dir))
            .ok_or(ModelError::ModelNotFound {
                model_id: model_id.to_string(),
                path: preferred,
            })
    }

    pub fn default_clip_model_path(&self) -> ModelResult<PathBuf> {
        self.clip_model_path(DEFAULT_CLIP_MODEL_NAME)
    }

    /// Fails with [`ModelError::IncompleteModelFiles`] naming every missing
    /// required file.
    pub fn validate_model_dir(&self, dir: &Path) -> ModelResult<()> {
        if !dir.exists() {
            return Err(ModelError::ModelNotFound {
                model_id: dir.display().to_string(),
                path: dir.to_path_buf(),
            });
        }

        let missing: Vec<&'static str> = REQUIRED_MODEL_FILES
            .iter()
            .copied()
            .filter(|file| !dir.join(file).is_file())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::IncompleteModelFiles {
                path: dir.to_path_buf(),
                missing,
            })
        }
    }
}

/// Last path segment of a model id: `openai/clip-vit-base-patch32` gives
/// `clip-vit-base-patch32`.
pub(crate) fn extract_model_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}

fn has_weights(dir: &Path) -> bool {
    dir.join(WEIGHTS_FILE).is_file()
}

//! Persona: the static system instruction that conditions every model call.
//!
//! The persona is loaded once at startup and shared by all sessions. It is
//! always the first message of a composed prompt and never part of the stored
//! session history.
//!
//! Sources, in priority order:
//!
//! 1. **Inline** — prompt text given directly (config or tests)
//! 2. **File** — a markdown/text file named in config
//! 3. **Built-in** — the character setting bundled with the binary

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Error;

/// The bundled character setting.
const BUILTIN_PERSONA: &str = include_str!("../persona/aiko.md");
const BUILTIN_NAME: &str = "高森藍子";

/// Where the persona text came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaSource {
    #[default]
    Builtin,
    File(PathBuf),
    Inline,
}

/// The persona configuration shared by every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Display name of the character
    pub name: String,

    /// System prompt text
    pub system_prompt: String,

    /// Where the prompt was loaded from (for diagnostics)
    pub source: PersonaSource,
}

impl Persona {
    /// The bundled persona.
    pub fn builtin() -> Self {
        Self {
            name: BUILTIN_NAME.into(),
            system_prompt: BUILTIN_PERSONA.trim_end().to_string(),
            source: PersonaSource::Builtin,
        }
    }

    /// A persona from prompt text held in memory.
    pub fn inline(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            source: PersonaSource::Inline,
        }
    }

    /// Load a persona from a file. The name defaults to the file stem.
    ///
    /// Unlike optional context files, a persona file that was asked for must
    /// exist and must not be empty.
    pub fn from_file(path: &Path, name: Option<&str>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read persona file {}: {e}", path.display()),
        })?;

        if content.trim().is_empty() {
            return Err(Error::Config {
                message: format!("persona file {} is empty", path.display()),
            });
        }

        let name = name
            .map(str::to_string)
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "persona".into());

        debug!(file = %path.display(), chars = content.len(), "Loaded persona file");

        Ok(Self {
            name,
            system_prompt: content.trim_end().to_string(),
            source: PersonaSource::File(path.to_path_buf()),
        })
    }

    /// Resolve the persona from optional config values.
    pub fn load(file: Option<&Path>, name: Option<&str>) -> Result<Self, Error> {
        match file {
            Some(path) => Self::from_file(path, name),
            None => {
                let mut persona = Self::builtin();
                if let Some(name) = name {
                    persona.name = name.to_string();
                }
                Ok(persona)
            }
        }
    }

    /// Estimate the token count of the system prompt (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.system_prompt.len() / 4
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn builtin_persona_is_bundled() {
        let persona = Persona::builtin();
        assert_eq!(persona.name, "高森藍子");
        assert!(persona.system_prompt.contains("プロデューサーさん"));
        assert!(persona.system_prompt.ends_with("シミュレーションを開始します。"));
        assert_eq!(persona.source, PersonaSource::Builtin);
    }

    #[test]
    fn builtin_persona_bounds_reply_length() {
        let prompt = Persona::builtin().system_prompt;
        let constraints = prompt
            .split("回答は以下の条件により制限されます。")
            .nth(1)
            .expect("constraint block present");
        assert!(constraints.contains("・50文字以内"));
        assert!(constraints.contains("・高森藍子の発言のみを出力"));
    }

    #[test]
    fn load_from_file_uses_stem_as_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("butler.md");
        fs::write(&path, "You are a polite butler.\n\n").unwrap();

        let persona = Persona::load(Some(&path), None).unwrap();
        assert_eq!(persona.name, "butler");
        assert_eq!(persona.system_prompt, "You are a polite butler.");
        assert_eq!(persona.source, PersonaSource::File(path));
    }

    #[test]
    fn explicit_name_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("p.txt");
        fs::write(&path, "Speak in haiku.").unwrap();

        let persona = Persona::load(Some(&path), Some("Basho")).unwrap();
        assert_eq!(persona.name, "Basho");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = Persona::load(Some(Path::new("/nonexistent/persona.md")), None);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn empty_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.md");
        fs::write(&path, "  \n").unwrap();
        assert!(Persona::load(Some(&path), None).is_err());
    }

    #[test]
    fn no_file_falls_back_to_builtin() {
        let persona = Persona::load(None, Some("Aiko")).unwrap();
        assert_eq!(persona.name, "Aiko");
        assert_eq!(persona.source, PersonaSource::Builtin);
    }
}

//! Prompt templates for the model backends
//!
//! Prompts are resolved in two layers:
//! 1. An override file in the data dir (`~/.local/share/saldo/prompts/<id>.md`)
//! 2. The embedded default compiled into the binary
//!
//! A prompt file starts with TOML frontmatter between `+++` fences, followed
//! by a `# User` section holding the template. Variables use `{{name}}`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

mod defaults {
    pub const CLASSIFY_TRANSACTION: &str =
        include_str!("../../../prompts/classify_transaction.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    ClassifyTransaction,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyTransaction => "classify_transaction",
        }
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ClassifyTransaction => defaults::CLASSIFY_TRANSACTION,
        }
    }
}

/// Prompt frontmatter
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub version: u32,
}

/// A loaded prompt
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    pub content: String,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Load a prompt, preferring an override file in `override_dir`
    pub fn load(id: PromptId, override_dir: Option<&PathBuf>) -> Result<Self> {
        if let Some(dir) = override_dir {
            let path = dir.join(format!("{}.md", id.as_str()));
            if path.exists() {
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, content) = parse_prompt(&content)?;
                return Ok(Self {
                    metadata,
                    content,
                    override_path: Some(path),
                });
            }
        }

        let (metadata, content) = parse_prompt(id.default_content())?;
        Ok(Self {
            metadata,
            content,
            override_path: None,
        })
    }

    /// The embedded default for `id`
    pub fn embedded(id: PromptId) -> Result<Self> {
        Self::load(id, None)
    }

    /// Render the `# User` section (or the whole body) with variables replaced
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = extract_section(&self.content, "# User")
            .unwrap_or(&self.content)
            .to_string();
        for (key, value) in vars {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }
        result
    }
}

/// Default prompt override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("saldo").join("prompts"))
}

/// Split a prompt file into frontmatter and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("+++").ok_or_else(|| {
        Error::InvalidData("Prompt must start with TOML frontmatter (+++)".into())
    })?;
    let end = rest.find("+++").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second +++)".into())
    })?;

    let metadata: PromptMetadata = toml::from_str(rest[..end].trim())
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;
    let body = rest[end + 3..].trim().to_string();

    Ok((metadata, body))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

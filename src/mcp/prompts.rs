//! MCP Prompt Templates
//!
//! Named, parameterized prompts. Each prompt is a handler that turns string
//! arguments into messages; [`TemplatePrompt`] covers the common case of a
//! text template with `{{name}}` placeholders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Error, Result};

/// A prompt argument definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
        }
    }
}

/// A prompt definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text {
        text: String,
    },
    Resource {
        uri: String,
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

/// Result of prompts/list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Handler that renders one prompt.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    /// Get the prompt definition.
    fn definition(&self) -> Prompt;

    /// Render the prompt. Required arguments have already been checked.
    async fn render(&self, arguments: &HashMap<String, String>) -> Result<GetPromptResult>;
}

/// Prompt registry.
#[derive(Default, Clone)]
pub struct PromptRegistry {
    prompts: BTreeMap<String, Arc<dyn PromptHandler>>,
}

impl PromptRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in prompts.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register_builtin_prompts();
        registry
    }

    fn register_builtin_prompts(&mut self) {
        self.register(TemplatePrompt::new(
            Prompt {
                name: "summarize".to_string(),
                description: Some("Summarize a piece of text".to_string()),
                arguments: vec![
                    PromptArgument::required("text", "The text to summarize"),
                    PromptArgument::optional("style", "Summary style (bullets, paragraph, tldr)"),
                ],
            },
            r#"Please summarize the following text{{#if style}} as {{style}}{{/if}}:

{{text}}

Keep the summary faithful to the source and note anything ambiguous."#,
        ));
    }

    /// Register a prompt handler.
    pub fn register<H: PromptHandler + 'static>(&mut self, handler: H) {
        let prompt = handler.definition();
        self.prompts.insert(prompt.name, Arc::new(handler));
    }

    /// List all prompts, sorted by name.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.values().map(|h| h.definition()).collect()
    }

    /// Render a prompt by name.
    pub async fn get(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        let handler = self
            .prompts
            .get(name)
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;

        let missing: Vec<String> = handler
            .definition()
            .arguments
            .into_iter()
            .filter(|arg| arg.required && !arguments.contains_key(&arg.name))
            .map(|arg| arg.name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidParams(format!(
                "Missing required prompt arguments: {}",
                missing.join(", ")
            )));
        }

        handler.render(arguments).await
    }

    /// Check if a prompt exists.
    pub fn contains(&self, name: &str) -> bool {
        self.prompts.contains_key(name)
    }

    /// Get the number of registered prompts.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Check if no prompts are registered.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// A prompt rendered from a text template.
///
/// Supports `{{name}}` substitution and `{{#if name}}...{{/if}}` sections that
/// are kept only when the argument is present and non-empty.
#[derive(Debug, Clone)]
pub struct TemplatePrompt {
    prompt: Prompt,
    template: String,
}

impl TemplatePrompt {
    pub fn new(prompt: Prompt, template: impl Into<String>) -> Self {
        Self {
            prompt,
            template: template.into(),
        }
    }

    /// Apply the template to `arguments`.
    pub fn apply(&self, arguments: &HashMap<String, String>) -> String {
        let mut text = self.template.clone();

        // Conditionals first so that substituted values cannot open sections.
        while let Some(start) = text.find("{{#if ") {
            let Some(tag_end) = text[start..].find("}}").map(|i| start + i) else {
                break;
            };
            let Some(end) = text[tag_end..].find("{{/if}}").map(|i| tag_end + i) else {
                break;
            };
            let key = text[start + "{{#if ".len()..tag_end].trim().to_string();
            let body = text[tag_end + 2..end].to_string();
            let keep = arguments.get(&key).is_some_and(|v| !v.is_empty());
            let replacement = if keep { body } else { String::new() };
            text.replace_range(start..end + "{{/if}}".len(), &replacement);
        }

        // One pass over the template; substituted values are never rescanned.
        let mut out = String::with_capacity(text.len());
        let mut rest = text.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let Some(close) = tail.find("}}") else {
                rest = tail;
                break;
            };
            let placeholder = &tail[..close + 2];
            match arguments.get(&placeholder[2..close]) {
                Some(value) => out.push_str(value),
                None => out.push_str(placeholder),
            }
            rest = &tail[close + 2..];
        }
        out.push_str(rest);

        out
    }
}

#[async_trait]
impl PromptHandler for TemplatePrompt {
    fn definition(&self) -> Prompt {
        self.prompt.clone()
    }

    async fn render(&self, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        Ok(GetPromptResult {
            description: self.prompt.description.clone(),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Text {
                    text: self.apply(arguments),
                },
            }],
        })
    }
}

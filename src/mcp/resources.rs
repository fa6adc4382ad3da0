//! MCP Resources Support
//!
//! Resources are readable named data addressed by URI. The registry maps each
//! URI to the handler that produces its contents.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::error::{Error, Result};

/// Characters escaped when a filesystem path is turned into a `file://` URI.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decode a percent-encoded file:// URI path to a PathBuf.
fn decode_file_uri(uri: &str) -> Option<PathBuf> {
    uri.strip_prefix("file://").map(|path| {
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        PathBuf::from(decoded.as_ref())
    })
}

/// Convert an absolute filesystem path to a file:// URI.
fn path_to_file_uri(path: &Path) -> String {
    let path_str = path.to_string_lossy();

    #[cfg(windows)]
    {
        let normalized = path_str.replace('\\', "/");
        format!("file:///{}", utf8_percent_encode(&normalized, PATH_ESCAPES))
    }

    #[cfg(not(windows))]
    {
        format!("file://{}", utf8_percent_encode(&path_str, PATH_ESCAPES))
    }
}

/// A resource exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>, // base64 encoded
}

/// Result of resources/list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Result of resources/read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

impl ReadResourceResult {
    /// A single text entry.
    pub fn text(uri: impl Into<String>, mime_type: Option<String>, text: impl Into<String>) -> Self {
        Self {
            contents: vec![ResourceContents {
                uri: uri.into(),
                mime_type,
                text: Some(text.into()),
                blob: None,
            }],
        }
    }
}

/// Handler producing the contents of one resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Get the resource definition.
    fn definition(&self) -> Resource;

    /// Read the resource identified by `uri`.
    async fn read(&self, uri: &str) -> Result<ReadResourceResult>;
}

/// Registry of resource handlers, keyed by URI.
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn ResourceHandler>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource handler under its URI.
    pub fn register<H: ResourceHandler + 'static>(&mut self, handler: H) {
        let resource = handler.definition();
        self.resources.insert(resource.uri, Arc::new(handler));
    }

    /// List all resources, sorted by URI.
    pub fn list(&self) -> Vec<Resource> {
        self.resources.values().map(|h| h.definition()).collect()
    }

    /// Read a resource by URI.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        let handler = self
            .resources
            .get(uri)
            .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;
        handler.read(uri).await
    }

    /// Get a resource handler by URI.
    pub fn get(&self, uri: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.resources.get(uri).cloned()
    }

    /// Get the number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// A resource with fixed text contents.
#[derive(Debug, Clone)]
pub struct TextResource {
    resource: Resource,
    text: String,
}

impl TextResource {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            resource: Resource {
                uri: uri.into(),
                name: name.into(),
                description: None,
                mime_type: Some("text/plain".to_string()),
            },
            text: text.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.resource.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.resource.mime_type = Some(mime_type.into());
        self
    }
}

#[async_trait]
impl ResourceHandler for TextResource {
    fn definition(&self) -> Resource {
        self.resource.clone()
    }

    async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        Ok(ReadResourceResult::text(
            uri,
            self.resource.mime_type.clone(),
            self.text.clone(),
        ))
    }
}

/// A local file exposed as a `file://` resource.
///
/// The file is re-read on every request.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
    uri: String,
}

impl FileResource {
    /// Expose the file at `path`. The file must exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().canonicalize().map_err(|e| {
            Error::Config(format!(
                "Cannot resolve resource path {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Resource is not a regular file: {}",
                path.display()
            )));
        }
        let uri = path_to_file_uri(&path);
        Ok(Self { path, uri })
    }

    /// Expose a file given either a plain path or a `file://` URI.
    pub fn from_arg(arg: &str) -> Result<Self> {
        match decode_file_uri(arg) {
            Some(path) => Self::new(path),
            None => Self::new(arg),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Infer a MIME type string for a file path based on its extension.
    fn guess_mime_type(path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        let mime = match ext {
            "rs" => "text/x-rust",
            "py" => "text/x-python",
            "js" | "tsx" | "jsx" => "text/javascript",
            "ts" => "text/typescript",
            "json" => "application/json",
            "yaml" | "yml" => "text/yaml",
            "toml" => "text/x-toml",
            "md" => "text/markdown",
            "html" => "text/html",
            "css" => "text/css",
            "sh" | "bash" => "text/x-shellscript",
            "sql" => "text/x-sql",
            "go" => "text/x-go",
            "c" | "h" => "text/x-c",
            "cpp" | "hpp" | "cc" => "text/x-c++",
            "xml" => "application/xml",
            "csv" => "text/csv",
            _ => "text/plain",
        };
        Some(mime.to_string())
    }
}

#[async_trait]
impl ResourceHandler for FileResource {
    fn definition(&self) -> Resource {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string());

        Resource {
            uri: self.uri.clone(),
            name,
            description: Some(format!("File: {}", self.path.display())),
            mime_type: Self::guess_mime_type(&self.path),
        }
    }

    async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        let content = fs::read_to_string(&self.path).await?;
        Ok(ReadResourceResult::text(
            uri,
            Self::guess_mime_type(&self.path),
            content,
        ))
    }
}

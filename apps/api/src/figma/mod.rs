//! Figma export — optional outbound collaborator.
//!
//! Consumes exactly the Formatter's output and translates it into Figma node
//! JSON (position/size, SOLID fills with 0..1 RGB components). Export failures
//! are logged and surfaced to the caller but NEVER change the workflow's
//! success/failure classification.

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::layout::formatter::{CanonicalNode, OutputArtifact};

const FIGMA_API_URL: &str = "https://api.figma.com/v1";

#[derive(Debug, Error)]
pub enum FigmaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Figma API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Summary of a completed export, attached to the API response.
#[derive(Debug, Clone, Serialize)]
pub struct FigmaReceipt {
    pub file_key: String,
    pub node_count: usize,
}

/// Client for the Figma REST API, authenticated with a personal access token.
#[derive(Clone)]
pub struct FigmaClient {
    client: Client,
    access_token: String,
    file_key: String,
}

impl FigmaClient {
    pub fn new(access_token: String, file_key: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            file_key,
        }
    }

    /// Fetches the target file — a cheap connectivity and credential check.
    pub async fn get_file(&self) -> Result<Value, FigmaError> {
        let url = format!("{FIGMA_API_URL}/files/{}", self.file_key);
        let response = self
            .client
            .get(&url)
            .header("X-Figma-Token", &self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FigmaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Pushes a generated artifact into the target file.
    pub async fn export(&self, artifact: &OutputArtifact) -> Result<FigmaReceipt, FigmaError> {
        let document = to_figma_document(artifact);
        let node_count = count_nodes(&artifact.root);

        debug!("Exporting {node_count} node(s) to Figma file {}", self.file_key);

        let url = format!("{FIGMA_API_URL}/files/{}/nodes", self.file_key);
        let response = self
            .client
            .post(&url)
            .header("X-Figma-Token", &self.access_token)
            .json(&document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FigmaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(
            "Exported {node_count} node(s) to Figma file {}",
            self.file_key
        );

        Ok(FigmaReceipt {
            file_key: self.file_key.clone(),
            node_count,
        })
    }
}

/// Converts a canonical artifact into Figma's node document shape.
pub fn to_figma_document(artifact: &OutputArtifact) -> Value {
    json!({ "nodes": [convert_node(&artifact.root)] })
}

fn convert_node(node: &CanonicalNode) -> Value {
    let mut figma_node = json!({
        "name": node.name,
        "type": node.kind.as_str(),
        "position": { "x": node.geometry.x, "y": node.geometry.y },
        "size": { "width": node.geometry.width, "height": node.geometry.height },
    });

    if let Some(rgb) = fill_color(node) {
        figma_node["styles"] = json!({
            "fills": [{
                "type": "SOLID",
                "color": { "r": rgb[0], "g": rgb[1], "b": rgb[2] },
            }]
        });
    }

    if let Some(content) = &node.content {
        figma_node["characters"] = Value::String(content.clone());
    }

    if !node.children.is_empty() {
        figma_node["children"] = Value::Array(node.children.iter().map(convert_node).collect());
    }

    figma_node
}

fn fill_color(node: &CanonicalNode) -> Option<[f64; 3]> {
    node.style
        .get("fill")
        .or_else(|| node.style.get("backgroundColor"))
        .and_then(Value::as_str)
        .and_then(hex_to_rgb)
}

/// Parses `#RRGGBB` (or `RRGGBB`, or short `#RGB`) into 0..1 float components.
fn hex_to_rgb(hex: &str) -> Option<[f64; 3]> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);

    let (r, g, b) = match hex.len() {
        6 => (
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ),
        3 => {
            let component = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16)
                    .ok()
                    .map(|v| v * 16 + v)
            };
            (component(0)?, component(1)?, component(2)?)
        }
        _ => return None,
    };

    Some([r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0])
}

fn count_nodes(node: &CanonicalNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

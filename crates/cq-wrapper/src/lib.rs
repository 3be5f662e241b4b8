//! Process boundary: one JSON request in, one JSON response out.
//!
//! ```text
//! {"code": "...", "filePath": "a.c", "config": {...}}            → encode
//! {"files": [{"code": "...", "filePath": "a.c"}, ...]}           → batch encode
//! {"operation": "decode", "code": "...", "decodeOptions": {...}} → decode
//! ```

use anyhow::Context;
use cq_compactor::{CompactorPipeline, DecodeOptions, EncodedArtifact, SymbolContext};
use cq_core::{CodecError, SirclConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Encode,
    Decode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    pub code: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WrapperRequest {
    pub code: Option<String>,
    pub file_path: Option<String>,
    pub config: SirclConfig,
    pub operation: Operation,
    pub decode_options: DecodeOptions,
    pub files: Option<Vec<FileInput>>,
}

fn encoded_json(artifact: &EncodedArtifact, file_path: Option<&str>) -> anyhow::Result<Value> {
    let mut value = json!({
        "code": artifact.code,
        "metadata": serde_json::to_value(&artifact.metadata)?,
        "identifierMapping": serde_json::to_value(&artifact.identifier_mapping)?,
        "macroLegend": serde_json::to_value(&artifact.macro_legend)?,
    });
    if let Some(path) = file_path {
        value["filePath"] = json!(path);
    }
    Ok(value)
}

/// Run one request and build its success response.
pub fn handle_request(input: &str) -> anyhow::Result<Value> {
    let request: WrapperRequest = serde_json::from_str(input).context("request is not valid JSON")?;
    let pipeline = CompactorPipeline::new(request.config)?;

    match request.operation {
        Operation::Decode => {
            let code = request.code.ok_or_else(|| CodecError::MissingField("code".into()))?;
            let result = pipeline.decode(&code, &request.decode_options)?;
            debug!(decoded = result.decoded, warnings = result.warnings.len(), "decode request");
            let mut value = serde_json::to_value(&result)?;
            value["success"] = json!(true);
            Ok(value)
        }
        Operation::Encode => match request.files {
            Some(files) => {
                let mut ctx = SymbolContext::new();
                let mut encoded = Vec::with_capacity(files.len());
                for file in &files {
                    let artifact = pipeline.encode(&file.code, &mut ctx);
                    encoded.push(encoded_json(&artifact, file.file_path.as_deref())?);
                }
                info!(
                    files = encoded.len(),
                    symbols = ctx.len(),
                    stable = pipeline.config().cross_file_stable,
                    "batch encoded"
                );
                Ok(json!({ "files": encoded, "success": true }))
            }
            None => {
                let code = request.code.ok_or_else(|| CodecError::MissingField("code".into()))?;
                let artifact = pipeline.encode_file(&code);
                info!(
                    file = request.file_path.as_deref().unwrap_or("<stdin>"),
                    saved = artifact.metadata.tokens_saved,
                    "encoded"
                );
                let mut value = encoded_json(&artifact, request.file_path.as_deref())?;
                value["success"] = json!(true);
                Ok(value)
            }
        },
    }
}

/// Failure response with the full error chain.
pub fn error_response(err: &anyhow::Error) -> Value {
    json!({
        "error": err.to_string(),
        "stack": format!("{err:?}"),
        "success": false,
    })
}

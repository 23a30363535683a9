//! JSON patch subset (add, replace, remove) over JSON pointers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiError, Result};

/// One patch operation as emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOperation {
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Remove { path } => path,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => {
                Some(value)
            }
            PatchOperation::Remove { .. } => None,
        }
    }
}

/// Decode the `patches` argument of a patch call.
///
/// Accepts a list of operations, the same list encoded as a JSON string, or
/// null for no operations.
pub fn parse_patch_list(raw: Value) -> Result<Vec<PatchOperation>> {
    let raw = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| AiError::InvalidFormat(format!("patch list is not valid JSON: {e}")))?,
        other => other,
    };
    serde_json::from_value(raw)
        .map_err(|e| AiError::InvalidFormat(format!("invalid patch list: {e}")))
}

/// Apply `ops` in order to a copy of `doc`.
///
/// Replacing a missing object member inserts it and removing one is a no-op;
/// array indices must be in bounds (`-` appends on add).
pub fn apply_patches(doc: &Value, ops: &[PatchOperation]) -> Result<Value> {
    let mut patched = doc.clone();
    for op in ops {
        apply_one(&mut patched, op)?;
    }
    Ok(patched)
}

fn apply_one(doc: &mut Value, op: &PatchOperation) -> Result<()> {
    let tokens = parse_pointer(op.path())?;
    let Some((last, parents)) = tokens.split_last() else {
        // Whole-document operation.
        match op {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => {
                *doc = value.clone();
                return Ok(());
            }
            PatchOperation::Remove { .. } => {
                return Err(AiError::InvalidFormat(
                    "cannot remove the document root".to_string(),
                ));
            }
        }
    };

    let mut target = doc;
    for token in parents {
        target = match target {
            Value::Object(map) => map.get_mut(token.as_str()),
            Value::Array(items) => parse_index(token, items.len())
                .ok()
                .and_then(|idx| items.get_mut(idx)),
            _ => None,
        }
        .ok_or_else(|| missing_path(op.path()))?;
    }

    match target {
        Value::Object(map) => {
            match op {
                PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => {
                    map.insert(last.clone(), value.clone());
                }
                PatchOperation::Remove { .. } => {
                    map.remove(last.as_str());
                }
            }
            Ok(())
        }
        Value::Array(items) => match op {
            PatchOperation::Add { value, .. } => {
                let idx = if last == "-" {
                    items.len()
                } else {
                    parse_index(last, items.len() + 1)?
                };
                items.insert(idx, value.clone());
                Ok(())
            }
            PatchOperation::Replace { value, .. } => {
                let idx = parse_index(last, items.len())?;
                items[idx] = value.clone();
                Ok(())
            }
            PatchOperation::Remove { .. } => {
                let idx = parse_index(last, items.len())?;
                items.remove(idx);
                Ok(())
            }
        },
        _ => Err(missing_path(op.path())),
    }
}

fn parse_pointer(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(AiError::InvalidFormat(format!(
            "JSON pointer must start with '/': {path}"
        )));
    };
    Ok(rest
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn parse_index(token: &str, len: usize) -> Result<usize> {
    let idx = token
        .parse::<usize>()
        .map_err(|_| AiError::InvalidFormat(format!("invalid array index '{token}'")))?;
    if idx >= len {
        return Err(AiError::InvalidFormat(format!(
            "array index {idx} out of bounds"
        )));
    }
    Ok(idx)
}

fn missing_path(path: &str) -> AiError {
    AiError::InvalidFormat(format!("patch path does not exist: {path}"))
}

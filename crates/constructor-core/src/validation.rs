//! Model validation seam.
//!
//! Full schema validation belongs to the application's schema layer. The
//! store only needs a yes/no answer (with a reason) before it writes, so it
//! takes any [`ModelValidator`]. [`BasicValidator`] checks the structure the
//! store itself relies on.

use serde_json::Value;

use crate::ids::SequenceHash;

/// Validates manifests after identity stamping, before they are written.
pub trait ModelValidator: Send + Sync {
    fn validate_project(&self, project: &Value) -> Result<(), String>;
    fn validate_block(&self, block: &Value) -> Result<(), String>;
    fn validate_order(&self, order: &Value) -> Result<(), String>;
}

/// Structural checks only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicValidator;

fn require_string(value: &Value, field: &str) -> Result<(), String> {
    match value.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(()),
        Some(_) => Err(format!("`{field}` must be a non-empty string")),
        None => Err(format!("`{field}` is required")),
    }
}

fn require_object(value: &Value) -> Result<(), String> {
    if value.is_object() {
        Ok(())
    } else {
        Err("manifest must be a JSON object".to_string())
    }
}

impl ModelValidator for BasicValidator {
    fn validate_project(&self, project: &Value) -> Result<(), String> {
        require_object(project)?;
        require_string(project, "id")?;

        if let Some(components) = project.get("components") {
            let all_strings = components
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string));
            if !all_strings {
                return Err("`components` must be an array of block ids".to_string());
            }
        }
        Ok(())
    }

    fn validate_block(&self, block: &Value) -> Result<(), String> {
        require_object(block)?;
        require_string(block, "id")?;
        require_string(block, "projectId")?;

        match block.pointer("/sequence/md5") {
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(md5)) => SequenceHash::parse(md5.as_str())
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Some(_) => Err("`sequence.md5` must be a string".to_string()),
        }
    }

    fn validate_order(&self, order: &Value) -> Result<(), String> {
        require_object(order)?;
        require_string(order, "id")?;
        require_string(order, "projectId")?;

        if let Some(ids) = order.get("constructIds") {
            let all_strings = ids
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string));
            if !all_strings {
                return Err("`constructIds` must be an array of strings".to_string());
            }
        }
        Ok(())
    }
}

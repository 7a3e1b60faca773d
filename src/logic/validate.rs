use serde_json::Value;

use crate::config::TreeLimits;
use crate::error::{GenerationError, Result};
use crate::model::GeneratedMindMap;

/// Check the shape of a generation webhook response and convert it to a typed tree.
///
/// The raw value is walked with an explicit stack first, so that depth and size limits are
/// enforced before serde gets to recurse into it.
pub fn validate_payload(payload: &Value, limits: &TreeLimits) -> Result<GeneratedMindMap> {
    let object = payload
        .as_object()
        .ok_or_else(|| GenerationError::invalid_shape("response body is not a JSON object"))?;

    match object.get("idea") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(GenerationError::invalid_shape("`idea` is not a string")),
        None => return Err(GenerationError::invalid_shape("missing `idea`")),
    }

    let roots = match object.get("nodes") {
        Some(Value::Array(nodes)) => nodes,
        Some(_) => return Err(GenerationError::invalid_shape("`nodes` is not an array")),
        None => return Err(GenerationError::invalid_shape("missing `nodes`")),
    };

    let mut stack: Vec<(&Value, usize, String)> = roots
        .iter()
        .enumerate()
        .map(|(index, node)| (node, 0, format!("nodes[{}]", index)))
        .collect();
    let mut seen = 0usize;

    while let Some((node, depth, path)) = stack.pop() {
        seen += 1;
        if seen > limits.max_nodes {
            return Err(GenerationError::invalid_shape(format!(
                "tree has more than {} nodes",
                limits.max_nodes
            )));
        }
        if depth >= limits.max_tree_depth {
            return Err(GenerationError::invalid_shape(format!(
                "{} exceeds the maximum tree depth of {}",
                path, limits.max_tree_depth
            )));
        }

        let fields = node
            .as_object()
            .ok_or_else(|| GenerationError::invalid_shape(format!("{} is not an object", path)))?;

        if !fields.get("id").map(Value::is_i64).unwrap_or(false) {
            return Err(GenerationError::invalid_shape(format!(
                "{}.id is missing or not an integer",
                path
            )));
        }
        if !fields.get("title").map(Value::is_string).unwrap_or(false) {
            return Err(GenerationError::invalid_shape(format!(
                "{}.title is missing or not a string",
                path
            )));
        }

        match fields.get("children") {
            None | Some(Value::Null) => {}
            Some(Value::Array(children)) => {
                for (index, child) in children.iter().enumerate() {
                    stack.push((child, depth + 1, format!("{}.children[{}]", path, index)));
                }
            }
            Some(_) => {
                return Err(GenerationError::invalid_shape(format!(
                    "{}.children is not an array",
                    path
                )))
            }
        }
    }

    serde_json::from_value(payload.clone())
        .map_err(|e| GenerationError::invalid_shape(e.to_string()))
}

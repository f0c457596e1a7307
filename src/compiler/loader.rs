use anyhow::{Result, Context as AnyhowContext};
use std::fs;
use std::path::Path;
use crate::dsl::ComposerNode;
use crate::dsl::codec::from_json;

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn is_json_path(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

/// Read a tree from a YAML file.
///
/// `.json` files go through the JSON reader, which has no nesting limit.
/// serde_yaml stops at 128 levels of nesting, so very deep trees must be
/// kept as JSON.
pub fn load_tree_from_yaml(file_path: &str) -> Result<ComposerNode> {
    let content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read tree file from {}", file_path))?;

    let node: ComposerNode = if is_json_path(Path::new(file_path)) {
        from_json(&content)
            .with_context(|| format!("Failed to deserialize tree from {}", file_path))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to deserialize tree from {}", file_path))?
    };

    Ok(node)
}

/// Write `node` as pretty JSON, or YAML when the extension is `.yaml`/`.yml`.
///
/// YAML output is read back before writing; a tree too deep for the YAML
/// reader is refused instead of leaving an unloadable file.
pub fn write_tree(file_path: &Path, node: &ComposerNode) -> Result<()> {
    let content = if is_yaml_path(file_path) {
        let yaml = serde_yaml::to_string(node)?;
        if let Err(e) = serde_yaml::from_str::<ComposerNode>(&yaml) {
            anyhow::bail!(
                "Tree {} cannot be stored as YAML ({}); write it as .json instead",
                node.id,
                e
            );
        }
        yaml
    } else {
        serde_json::to_string_pretty(node)?
    };
    fs::write(file_path, content)
        .with_context(|| format!("Failed to write tree to {}", file_path.display()))
}

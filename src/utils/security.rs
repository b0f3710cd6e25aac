//! Validation of storage object names

use anyhow::Result;
use tracing::warn;

/// Validate an object name before it is turned into a storage key or path
///
/// Object names are flat keys: no separators, no traversal, no control
/// characters. Names are rejected rather than rewritten so that the key the
/// caller asked for is the key that gets used.
pub fn validate_object_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(anyhow::anyhow!("Object name cannot be empty"));
    }

    if name.len() > 255 {
        return Err(anyhow::anyhow!("Object name too long (max 255 characters)"));
    }

    if name.contains('\0') {
        return Err(anyhow::anyhow!("Object name contains null bytes"));
    }

    if name.contains('/') || name.contains('\\') {
        warn!("Rejected object name with path separators: {}", name);
        return Err(anyhow::anyhow!("Object name cannot contain path separators"));
    }

    if name == "." || name == ".." {
        warn!("Rejected object name: {}", name);
        return Err(anyhow::anyhow!("Object name cannot be a directory reference"));
    }

    if name.chars().any(|ch| ch.is_control()) {
        return Err(anyhow::anyhow!("Object name contains control characters"));
    }

    if is_reserved_name(name) {
        return Err(anyhow::anyhow!("Reserved object name: {}", name));
    }

    Ok(name)
}

/// Windows device names, which cannot be used as files on every host
fn is_reserved_name(name: &str) -> bool {
    let reserved_names = [
        "con", "prn", "aux", "nul",
        "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8", "com9",
        "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
    ];

    let lower = name.to_lowercase();
    let stem = lower.split('.').next().unwrap_or("");
    reserved_names.contains(&stem)
}

/// Turn an uploaded file name into an editor image id (whitespace runs become `-`)
pub fn image_id_from_file_name(file_name: &str) -> String {
    let mut id = String::with_capacity(file_name.len());
    let mut in_whitespace = false;

    for ch in file_name.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                id.push('-');
            }
            in_whitespace = true;
        } else {
            id.push(ch);
            in_whitespace = false;
        }
    }

    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_name() {
        // Valid names
        assert!(validate_object_name("42-problem-1.png").is_ok());
        assert!(validate_object_name("new_1_my image.png").is_ok());
        assert!(validate_object_name("existing_42-problem-2.jpg").is_ok());

        // Invalid names
        assert!(validate_object_name("").is_err());
        assert!(validate_object_name("../etc/passwd").is_err());
        assert!(validate_object_name("..").is_err());
        assert!(validate_object_name("file\0name.png").is_err());
        assert!(validate_object_name("con.png").is_err());
        assert!(validate_object_name("dir\\name.png").is_err());
        assert!(validate_object_name("line\nbreak.png").is_err());
        assert!(validate_object_name(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_image_id_from_file_name() {
        assert_eq!(image_id_from_file_name("my diagram.png"), "my-diagram.png");
        assert_eq!(image_id_from_file_name("a  \t b.jpg"), "a-b.jpg");
        assert_eq!(image_id_from_file_name("plain.png"), "plain.png");
    }
}

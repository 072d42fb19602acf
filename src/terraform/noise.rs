//! Removal of the banner text terraform prints around generated config.

const LOCK_ACQUIRE_PREFIX: &str = "Acquiring state lock.";
const LOCK_RELEASE_PREFIX: &str = "Releasing state lock.";

/// Strip leading state-lock, warning comment and blank lines, and trailing
/// blank and state-unlock lines. Matching is by line content, never by a fixed
/// count. Applying it twice gives the same result as applying it once.
pub fn strip_tool_noise(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let start = lines
        .iter()
        .position(|l| {
            let l = l.trim_end_matches('\r');
            !(l.trim().is_empty() || l.starts_with(LOCK_ACQUIRE_PREFIX) || l.starts_with('#'))
        })
        .unwrap_or(lines.len());

    let mut end = lines.len();
    while end > start {
        let line = lines[end - 1].trim_end_matches('\r');
        if line.is_empty() || line.starts_with(LOCK_RELEASE_PREFIX) {
            end -= 1;
        } else {
            break;
        }
    }

    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "resource \"azurerm_resource_group\" \"res-0\" {\n  name = \"rg\"\n}";

    #[test]
    fn test_strips_lock_banner_and_warnings() {
        let raw = format!(
            "Acquiring state lock. This may take a few moments...\n# __generated__ by Terraform\n# Please review\n{}\n\nReleasing state lock. This may take a few moments...\n\n",
            BLOCK
        );
        assert_eq!(strip_tool_noise(&raw), BLOCK);
    }

    #[test]
    fn test_blank_lines_inside_banner() {
        let raw = format!(
            "Acquiring state lock. This may take a few moments...\n\n# __generated__ by Terraform\n\n{}\n",
            BLOCK
        );
        assert_eq!(strip_tool_noise(&raw), BLOCK);
    }

    #[test]
    fn test_keeps_inner_comments() {
        let raw = "resource \"x\" \"y\" {\n  # keep me\n}\n";
        assert_eq!(strip_tool_noise(raw), "resource \"x\" \"y\" {\n  # keep me\n}");
    }

    #[test]
    fn test_idempotent() {
        let raw = format!("# warning\n{}\n\n", BLOCK);
        let once = strip_tool_noise(&raw);
        assert_eq!(strip_tool_noise(&once), once);
        assert_eq!(strip_tool_noise(BLOCK), BLOCK);
    }

    #[test]
    fn test_all_noise_yields_empty() {
        assert_eq!(strip_tool_noise("Acquiring state lock.\n\nReleasing state lock.\n"), "");
        assert_eq!(strip_tool_noise(""), "");
    }
}

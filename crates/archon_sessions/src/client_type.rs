//! `client_type` derivation (spec §4.8): matches an MCP `clientInfo.name`
//! against a table of known clients; anything else is `unknown-client`.

const KNOWN_CLIENTS: &[(&str, &str)] = &[
    ("claude-code", "Claude Code"),
    ("claude code", "Claude Code"),
    ("cursor", "Cursor"),
    ("windsurf", "Windsurf"),
    ("cline", "Cline"),
    ("kiro", "Kiro"),
    ("augment", "Augment"),
    ("gemini", "Gemini"),
];

pub fn derive_client_type(declared_name: &str) -> String {
    let lower = declared_name.to_lowercase();
    KNOWN_CLIENTS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| "unknown-client".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_clients_case_insensitively() {
        assert_eq!(derive_client_type("Cursor/1.2.0"), "Cursor");
        assert_eq!(derive_client_type("WINDSURF"), "Windsurf");
        assert_eq!(derive_client_type("claude-code-cli"), "Claude Code");
    }

    #[test]
    fn falls_back_to_unknown_client() {
        assert_eq!(derive_client_type("some-bespoke-harness"), "unknown-client");
        assert_eq!(derive_client_type(""), "unknown-client");
    }
}

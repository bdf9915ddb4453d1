use super::*;

fn config() -> McpClientConfig {
    McpClientConfig::new(
        "client_1",
        "git",
        McpConnectionType::Stdio,
        "/usr/local/bin/git-mcp",
    )
}

#[test]
fn test_valid_config() {
    assert!(config().validate().is_ok());
}

#[test]
fn test_name_rules() {
    let mut bad = config();
    bad.name = String::new();
    assert!(bad.validate().is_err());

    let mut bad = config();
    bad.name = "my-tools".to_string();
    assert!(bad.validate().is_err(), "hyphens collide with tool prefixes");

    let mut bad = config();
    bad.name = "my tools".to_string();
    assert!(bad.validate().is_err());

    let mut bad = config();
    bad.name = "1git".to_string();
    assert!(bad.validate().is_err());

    let mut bad = config();
    bad.name = "gît".to_string();
    assert!(bad.validate().is_err());

    let mut ok = config();
    ok.name = "git_tools2".to_string();
    assert!(ok.validate().is_ok());
}

#[test]
fn test_wildcard_is_exclusive() {
    let mut bad = config();
    bad.tools_to_execute = vec!["*".to_string(), "status".to_string()];
    assert!(bad.validate().is_err());
}

#[test]
fn test_duplicates_rejected() {
    let mut bad = config();
    bad.tools_to_execute = vec!["status".to_string(), "status".to_string()];
    assert!(bad.validate().is_err());
}

#[test]
fn test_auto_execute_subset() {
    let mut ok = config();
    ok.tools_to_execute = vec!["status".to_string(), "log".to_string()];
    ok.tools_to_auto_execute = vec!["status".to_string()];
    assert!(ok.validate().is_ok());

    let mut bad = config();
    bad.tools_to_execute = vec!["status".to_string()];
    bad.tools_to_auto_execute = vec!["push".to_string()];
    assert!(bad.validate().is_err());

    // Wildcard execute admits any concrete auto-execute entry.
    let mut ok = config();
    ok.tools_to_execute = vec!["*".to_string()];
    ok.tools_to_auto_execute = vec!["status".to_string()];
    assert!(ok.validate().is_ok());

    // Auto-execute wildcard requires an execute wildcard.
    let mut bad = config();
    bad.tools_to_execute = vec!["status".to_string()];
    bad.tools_to_auto_execute = vec!["*".to_string()];
    assert!(bad.validate().is_err());
}

#[test]
fn test_empty_execute_forces_empty_auto_execute() {
    let mut cfg = config();
    cfg.tools_to_execute = Vec::new();
    cfg.tools_to_auto_execute = vec!["status".to_string()];
    assert!(cfg.validate().is_err());

    cfg.tools_to_auto_execute = Vec::new();
    assert!(cfg.validate().is_ok());
    assert!(cfg.effective_auto_execute().is_empty());
}

#[test]
fn test_state_transitions() {
    use McpClientState::*;
    assert!(Connecting.can_transition_to(Connected));
    assert!(Connecting.can_transition_to(Error));
    assert!(Connected.can_transition_to(Error));
    assert!(Connected.can_transition_to(Disconnected));
    assert!(Error.can_transition_to(Connecting));

    assert!(!Disconnected.can_transition_to(Connecting));
    assert!(!Connected.can_transition_to(Connecting));
    assert!(!Connecting.can_transition_to(Disconnected));
}

#[test]
fn test_redaction_merge() {
    let mut stored = config();
    stored
        .headers
        .insert("authorization".to_string(), "Bearer raw-token".to_string());

    let redacted = stored.redacted();
    assert_eq!(
        redacted.headers.get("authorization").map(String::as_str),
        Some(crate::redact::SENTINEL)
    );

    // Echoing the redacted config back preserves the raw header.
    let merged = stored.merge_update(redacted);
    assert_eq!(
        merged.headers.get("authorization").map(String::as_str),
        Some("Bearer raw-token")
    );

    // A changed value replaces the stored one.
    let mut update = stored.clone();
    update
        .headers
        .insert("authorization".to_string(), "Bearer next-token".to_string());
    let merged = stored.merge_update(update);
    assert_eq!(
        merged.headers.get("authorization").map(String::as_str),
        Some("Bearer next-token")
    );
}

use super::*;

#[test]
fn test_prefix_roundtrip() {
    let name = prefixed_tool_name("git", "status");
    assert_eq!(name, "git-status");
    assert_eq!(split_prefixed_tool_name(&name), Some(("git", "status")));
}

#[test]
fn test_split_keeps_hyphens_in_tool_name() {
    // Client names cannot contain hyphens, so everything after the first
    // hyphen belongs to the tool.
    assert_eq!(
        split_prefixed_tool_name("git-cherry-pick"),
        Some(("git", "cherry-pick"))
    );
}

#[test]
fn test_split_rejects_malformed_names() {
    assert_eq!(split_prefixed_tool_name("bare"), None);
    assert_eq!(split_prefixed_tool_name("-tool"), None);
    assert_eq!(split_prefixed_tool_name("client-"), None);
}

#[test]
fn test_include_filter() {
    let filter = vec!["git-*".to_string(), "search-lookup".to_string()];

    assert!(matches_include_filter("git-status", &filter));
    assert!(matches_include_filter("git-cherry-pick", &filter));
    assert!(matches_include_filter("search-lookup", &filter));

    assert!(!matches_include_filter("search-index", &filter));
    assert!(!matches_include_filter("gitlab-status", &filter));

    // No filter admits everything.
    assert!(matches_include_filter("anything-goes", &[]));
}

#[test]
fn test_execute_allow_list() {
    let wildcard = vec!["*".to_string()];
    assert!(allowed_by_execute_list("status", &wildcard));

    let explicit = vec!["status".to_string(), "log".to_string()];
    assert!(allowed_by_execute_list("status", &explicit));
    assert!(!allowed_by_execute_list("push", &explicit));

    // Empty list admits nothing.
    assert!(!allowed_by_execute_list("status", &[]));
}

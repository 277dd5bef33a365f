//! Integration tests for site identity and override matching.

use forumcp_core::{AuthMode, AuthOverride, find_override, normalize_base};

#[test]
fn test_paths_on_one_site_share_a_base() {
    let a = normalize_base("https://a.example/x").unwrap();
    let b = normalize_base("https://a.example/y?page=3").unwrap();
    assert_eq!(a, b);
    assert_eq!(a, "https://a.example");
}

#[test]
fn test_override_for_origin_applies_to_any_path() {
    let overrides = vec![AuthOverride {
        user_api_key: Some("uak".into()),
        ..AuthOverride::for_site("https://a.example")
    }];

    let base = normalize_base("https://a.example/anything").unwrap();
    let entry = find_override(&overrides, &base).unwrap();

    assert!(matches!(entry.auth_mode(), Some(AuthMode::UserApiKey { .. })));
}

#[test]
fn test_profile_style_json_list() {
    let json = r#"[
        {"site": "https://a.example", "api_key": "k", "api_username": "system"},
        {"site": "https://b.example", "cookies": "_t=abc; _forum_session=def"}
    ]"#;
    let overrides: Vec<AuthOverride> = serde_json::from_str(json).unwrap();

    let b = find_override(&overrides, "https://b.example").unwrap();
    assert!(b.auth_mode().is_none());
    assert_eq!(b.cookies.as_deref(), Some("_t=abc; _forum_session=def"));
}

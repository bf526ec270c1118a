use std::path::Path;

use super::*;

fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_owned())
    }
}

// =============================================================================
// BackendConfig
// =============================================================================

#[test]
fn backend_config_resolves_when_both_vars_present() {
    let config = BackendConfig::from_lookup(lookup_from(&[
        ("PARISHBOARD_BACKEND_URL", "https://id.example.com"),
        ("PARISHBOARD_BACKEND_KEY", "anon-key"),
    ]))
    .unwrap();

    assert_eq!(config.base_url, "https://id.example.com");
    assert_eq!(config.api_key, "anon-key");
}

#[test]
fn backend_config_trims_trailing_slash() {
    let config = BackendConfig::from_lookup(lookup_from(&[
        ("PARISHBOARD_BACKEND_URL", "https://id.example.com/"),
        ("PARISHBOARD_BACKEND_KEY", "anon-key"),
    ]))
    .unwrap();

    assert_eq!(config.base_url, "https://id.example.com");
}

#[test]
fn backend_config_missing_url_disables_backend() {
    let config =
        BackendConfig::from_lookup(lookup_from(&[("PARISHBOARD_BACKEND_KEY", "anon-key")]));
    assert!(config.is_none());
}

#[test]
fn backend_config_missing_key_disables_backend() {
    let config = BackendConfig::from_lookup(lookup_from(&[(
        "PARISHBOARD_BACKEND_URL",
        "https://id.example.com",
    )]));
    assert!(config.is_none());
}

// =============================================================================
// StorageConfig
// =============================================================================

#[test]
fn storage_config_defaults_to_namespaced_path() {
    let config = StorageConfig::from_lookup(lookup_from(&[]));
    assert_eq!(config.path, Path::new(".parishboard/auth.json"));
}

#[test]
fn storage_config_honours_override() {
    let config = StorageConfig::from_lookup(lookup_from(&[(
        "PARISHBOARD_STORAGE_PATH",
        "/var/lib/parishboard/auth.json",
    )]));
    assert_eq!(config.path, Path::new("/var/lib/parishboard/auth.json"));
}

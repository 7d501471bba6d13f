mod support;

use layerconf::config::{paths, secure_key, LayerKind, MemoryVault, SetOptions};
use layerconf::ErrorKind;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use support::Fixture;

fn secure() -> SetOptions {
    SetOptions {
        secure: true,
        ..SetOptions::default()
    }
}

fn append() -> SetOptions {
    SetOptions {
        append: true,
        ..SetOptions::default()
    }
}

#[tokio::test]
async fn secure_value_round_trip() {
    let fixture = Fixture::new();
    let vault = Arc::new(MemoryVault::new("mem"));
    let mut config = fixture.load_with_vault(vault.clone());

    let path = "profiles.db.x.properties.password";
    config.set(path, json!("secret123"), secure()).unwrap();
    config.write().await.unwrap();

    let on_disk = fixture.read("repo/app.config.json");
    assert_eq!(
        on_disk["profiles"]["db"]["x"]["properties"]["password"],
        "managed by mem"
    );
    assert_eq!(on_disk["secure"], json!([path]));

    let layer = config.layer_get().unwrap();
    let saves = vault.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].0, secure_key(&layer.path, path));
    assert_eq!(saves[0].1, "\"secret123\"");

    assert_eq!(config.get(path), Some(json!("secret123")));
}

#[tokio::test]
async fn secure_value_hydrates_after_reload() {
    let fixture = Fixture::new();
    let vault = Arc::new(MemoryVault::new("mem"));
    {
        let mut config = fixture.load_with_vault(vault.clone());
        config
            .set("all.token", json!({"id": 7}), secure())
            .unwrap();
        config.write().await.unwrap();
    }

    let mut reloaded = fixture.load_with_vault(vault.clone());
    assert_eq!(reloaded.get("all.token"), Some(json!("managed by mem")));
    reloaded.load_secure().await.unwrap();
    assert_eq!(reloaded.get("all.token"), Some(json!({"id": 7})));

    // Hydrating twice changes nothing.
    reloaded.load_secure().await.unwrap();
    assert_eq!(reloaded.properties().all()["token"], json!({"id": 7}));
}

#[tokio::test]
async fn failed_vault_save_aborts_write() {
    let fixture = Fixture::new();
    let vault = Arc::new(MemoryVault::new("mem"));
    let mut config = fixture.load_with_vault(vault.clone());
    config.set("all.a", json!("1"), secure()).unwrap();
    config.set("all.b", json!("2"), secure()).unwrap();

    let layer_path = config.layer_get().unwrap().path;
    vault.fail_on(secure_key(&layer_path, "all.b"));

    let err = config.write().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Write);
    assert!(err.to_string().contains(&layer_path.display().to_string()));
    assert!(!layer_path.exists());
    // The earlier save is not rolled back.
    assert_eq!(vault.saves().len(), 1);
}

#[tokio::test]
async fn write_without_vault_keeps_plaintext() {
    let fixture = Fixture::new();
    let mut config = fixture.load();
    config.set("all.pw", json!("plain"), secure()).unwrap();
    config.write().await.unwrap();

    let on_disk = fixture.read("repo/app.config.json");
    assert_eq!(on_disk["all"]["pw"], "plain");
    let text = fs::read_to_string(fixture.project().join("app.config.json")).unwrap();
    assert!(text.contains("\n    \"all\""));
}

#[test]
fn normalization_is_stable_across_loads() {
    let fixture = Fixture::new();
    fixture.write("repo/app.config.json", json!({"all": {"a": 1}, "extra": true}));

    let first = fixture.load().layers();
    let second = fixture.load().layers();
    assert_eq!(first, second);
    let shared = &first[LayerKind::ProjectShared.index()];
    assert!(shared.exists);
    assert_eq!(shared.properties.secure(), Vec::<String>::new());
    assert_eq!(shared.properties.get("extra"), Some(&json!(true)));
}

#[test]
fn project_shared_all_beats_global_shared() {
    let fixture = Fixture::new();
    fixture.write("repo/app.config.json", json!({"all": {"host": "project"}}));
    fixture.write(".app/app.config.json", json!({"all": {"host": "global", "port": 1}}));

    let merged = fixture.load().properties();
    assert_eq!(merged.all()["host"], "project");
    assert_eq!(merged.all()["port"], 1);
}

#[test]
fn project_user_profile_shadows_global_shared() {
    let fixture = Fixture::new();
    fixture.write(
        "repo/app.config.user.json",
        json!({"profiles": {"db": {"x": {"properties": {"host": "mine"}}}}}),
    );
    fixture.write(
        ".app/app.config.json",
        json!({"profiles": {"db": {"x": {"properties": {"host": "theirs", "port": 5}}}}}),
    );

    let config = fixture.load();
    let profile = config.profiles().get_raw("db", "x").unwrap();
    assert_eq!(profile.properties["host"], "mine");
    assert!(!profile.properties.contains_key("port"));
}

#[test]
fn first_existing_layer_becomes_active() {
    let fixture = Fixture::new();
    fixture.write(".app/app.config.user.json", json!({}));
    let config = fixture.load();
    assert_eq!(config.active().kind(), LayerKind::GlobalUser);
    assert!(config.exists());
}

#[test]
fn project_file_found_from_subdirectory() {
    let fixture = Fixture::new();
    fixture.write("repo/app.config.json", json!({"all": {"found": true}}));

    let mut options = fixture.options();
    options.project_dir = Some(fixture.project().join("src"));
    let config = layerconf::Configuration::load(support::APP, options).unwrap();
    assert_eq!(config.get("all.found"), Some(json!(true)));
    assert_eq!(config.paths()[1], fixture.project().join("app.config.json"));
}

#[test]
fn malformed_layer_fails_load() {
    let fixture = Fixture::new();
    let path = fixture.project().join("app.config.json");
    fs::write(&path, "{ not json").unwrap();

    let err = match layerconf::Configuration::load(support::APP, fixture.options()) {
        Ok(_) => panic!("load should fail"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("app.config.json"));
}

#[test]
fn string_values_are_coerced() {
    let fixture = Fixture::new();
    let mut config = fixture.load();
    config.set("x.flag", json!("true"), SetOptions::default()).unwrap();
    config.set("x.count", json!("42"), SetOptions::default()).unwrap();
    config.set("x.name", json!("abc"), SetOptions::default()).unwrap();

    assert_eq!(config.get("x.flag"), Some(json!(true)));
    assert_eq!(config.get("x.count"), Some(json!(42)));
    assert_eq!(config.get("x.name"), Some(json!("abc")));
}

#[test]
fn append_requires_existing_array() {
    let fixture = Fixture::new();
    let mut config = fixture.load();

    let err = config.set("x.y", json!("v"), append()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    config.set("x.z", json!("scalar"), SetOptions::default()).unwrap();
    assert!(config.set("x.z", json!("v"), append()).is_err());

    config.set("x.list", json!(["a", "b"]), SetOptions::default()).unwrap();
    config.set("x.list", json!("c"), append()).unwrap();
    assert_eq!(config.get("x.list"), Some(json!(["a", "b", "c"])));
}

#[test]
fn group_paths_require_arrays() {
    let fixture = Fixture::new();
    let mut config = fixture.load();
    let err = config.set("groups.ops", json!("alice"), SetOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(config.get("groups"), None);
}

#[test]
fn secure_paths_are_deduplicated() {
    let fixture = Fixture::new();
    let mut config = fixture.load();
    config.set("all.pw", json!("a"), secure()).unwrap();
    config.set("all.pw", json!("b"), secure()).unwrap();
    config.add_secure("all.pw").unwrap();
    assert_eq!(config.layer_get().unwrap().properties.secure(), vec!["all.pw"]);
}

#[test]
fn search_stops_at_boundary() {
    let fixture = Fixture::new();
    let start = fixture.home().join("repo").join("src");
    // A match at the boundary itself is not reported.
    fs::write(fixture.home().join("marker.json"), "{}").unwrap();

    let found = paths::search("marker.json", &start, Some(&fixture.home())).unwrap();
    assert_eq!(found, None);

    fs::write(fixture.project().join("marker.json"), "{}").unwrap();
    let found = paths::search("marker.json", &start, Some(&fixture.home())).unwrap();
    assert_eq!(found, Some(fixture.project().join("marker.json")));
}

#[test]
fn accessors_return_snapshots() {
    let fixture = Fixture::new();
    let mut config = fixture.load();
    let before = config.properties();
    config.set("all.a", json!(1), SetOptions::default()).unwrap();
    assert!(before.all().is_empty());
    assert_eq!(config.base().all().len(), 0);
    assert_eq!(config.properties().all()["a"], 1);
}

#[tokio::test]
async fn unhydrated_placeholder_is_never_saved_as_secret() {
    let fixture = Fixture::new();
    let path = fixture.write(
        "repo/app.config.json",
        json!({"all": {"pw": "managed by mem"}, "secure": ["all.pw"]}),
    );
    let vault = Arc::new(MemoryVault::new("mem"));
    let mut config = fixture.load_with_vault(vault.clone());

    config.load_secure().await.unwrap();
    config.set("all.x", json!("2"), SetOptions::default()).unwrap();
    config.write().await.unwrap();

    assert_eq!(vault.get(&secure_key(&path, "all.pw")), None);
    assert!(vault.saves().is_empty());
    assert_eq!(fixture.read("repo/app.config.json")["all"]["pw"], "managed by mem");
    assert_eq!(fixture.read("repo/app.config.json")["all"]["x"], 2);
}

#[tokio::test]
async fn write_plugins_after_hydrate_keeps_secrets_off_disk() {
    let fixture = Fixture::new();
    let vault = Arc::new(MemoryVault::new("mem"));
    {
        let mut config = fixture.load_with_vault(vault.clone());
        config.set("all.pw", json!("secret123"), secure()).unwrap();
        config.write().await.unwrap();
    }

    let mut config = fixture.load_with_vault(vault.clone());
    config.load_secure().await.unwrap();
    assert_eq!(config.get("all.pw"), Some(json!("secret123")));
    config.set("plugins", json!("p"), append()).unwrap();
    config.write_plugins().await.unwrap();

    let on_disk = fixture.read("repo/app.config.json");
    assert_eq!(on_disk["all"]["pw"], "managed by mem");
    assert_eq!(on_disk["plugins"], json!(["p"]));
    let text = fs::read_to_string(fixture.project().join("app.config.json")).unwrap();
    assert!(!text.contains("secret123"));
}

#[tokio::test]
async fn relative_project_dir_yields_absolute_vault_keys() {
    let fixture = Fixture::new();
    // Express the fixture project relative to the working directory.
    let cwd = std::env::current_dir().unwrap();
    let mut relative = std::path::PathBuf::new();
    for _ in cwd.components().skip(1) {
        relative.push("..");
    }
    relative.extend(fixture.project().components().skip(1));
    assert!(relative.is_relative());

    let vault = Arc::new(MemoryVault::new("mem"));
    let mut options = fixture.options().with_vault(vault.clone());
    options.project_dir = Some(relative);
    let mut config = layerconf::Configuration::load(support::APP, options).unwrap();

    let expected = fixture.project().join("app.config.json");
    assert_eq!(config.paths()[1], expected);
    config.set("all.pw", json!("secret123"), secure()).unwrap();
    config.write().await.unwrap();
    assert_eq!(vault.saves()[0].0, secure_key(&expected, "all.pw"));

    let mut reloaded = fixture.load_with_vault(vault.clone());
    reloaded.load_secure().await.unwrap();
    assert_eq!(reloaded.get("all.pw"), Some(json!("secret123")));
}

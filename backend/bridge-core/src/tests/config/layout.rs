// Unit tests for notification layout loading

use crate::config::LayoutConfig;

use tempfile::TempDir;

/// **VALUE**: Richer notification kinds get taller surfaces, everything else the default.
#[test]
fn given_default_layout_when_height_for_kind_then_uses_lookup_table() {
    // GIVEN: Default layout
    let layout = LayoutConfig::default();

    // WHEN/THEN: Known kinds are taller, unknown kinds use the default
    assert_eq!(layout.height_for("task_suggestion"), 180);
    assert_eq!(layout.height_for("unified_suggestion"), 240);
    assert_eq!(layout.height_for("deploy_detected"), 120);
    assert_eq!(layout.max_visible, 3);
    assert!(layout.validate().is_ok());
}

/// **VALUE**: The bundled layout file under `config/` is found and partial files are filled in.
#[test]
fn given_layout_in_config_subdir_when_load_then_file_values_apply() {
    // GIVEN: {resource}/config/notification_layout.toml overriding two values
    let dir = TempDir::new().expect("temp dir");
    std::fs::create_dir_all(dir.path().join("config")).expect("create config dir");
    std::fs::write(
        dir.path().join("config").join("notification_layout.toml"),
        "max_visible = 5\nfade_steps = 4\n",
    )
    .expect("write layout");

    // WHEN: Loading from the resource dir
    let layout = LayoutConfig::load(dir.path()).expect("load always succeeds");

    // THEN: Overrides applied, rest defaulted
    assert_eq!(layout.max_visible, 5);
    assert_eq!(layout.fade_steps, 4);
    assert_eq!(layout.width, 380);
    assert_eq!(layout.height_for("task_suggestion"), 180);
}

/// **VALUE**: A layout file that would break the stack is ignored in favour of defaults.
///
/// **BUG THIS CATCHES**: `max_visible = 0` would make every `show` evict forever.
#[test]
fn given_invalid_layout_file_when_load_then_falls_back_to_defaults() {
    // GIVEN: A layout with max_visible = 0 at the resource root
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("notification_layout.toml"), "max_visible = 0\n")
        .expect("write layout");

    // WHEN: Loading
    let layout = LayoutConfig::load(dir.path()).expect("load always succeeds");

    // THEN: Defaults
    assert_eq!(layout, LayoutConfig::default());
}

/// **VALUE**: A `[heights]` table replaces the built-in table as a whole.
#[test]
fn given_heights_table_when_load_then_replaces_builtin_heights() {
    // GIVEN: A layout declaring only timer_expiry
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("notification_layout.toml"),
        "default_height = 100\n\n[heights]\ntimer_expiry = 150\n",
    )
    .expect("write layout");

    // WHEN: Loading
    let layout = LayoutConfig::load(dir.path()).expect("load always succeeds");

    // THEN: Declared kind uses its height, others the file's default
    assert_eq!(layout.height_for("timer_expiry"), 150);
    assert_eq!(layout.height_for("task_suggestion"), 100);
}

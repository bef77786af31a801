//! Configuration and run files in a scratch data folder

use splitkeeper::persistence::*;
use splitkeeper::{Accuracy, CompareMethod, RunDefinition, SegmentDefinition, Time};
use std::fs;

fn secs(s: i64) -> Option<Time> {
    Some(Time::from_milliseconds(s * 1000))
}

fn celeste() -> RunDefinition {
    let mut definition = RunDefinition::new("Celeste");
    definition.segments = vec![
        SegmentDefinition {
            name: "Prologue".to_string(),
            icon: None,
            run_time: secs(5),
            best_time: secs(4),
        },
        SegmentDefinition {
            name: "Forsaken City".to_string(),
            icon: Some("city.png".to_string()),
            run_time: secs(7),
            best_time: secs(7),
        },
        SegmentDefinition {
            name: "Old Site".to_string(),
            icon: None,
            run_time: None,
            best_time: secs(9),
        },
    ];
    definition
}

#[test]
fn runs_are_saved_found_and_listed() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_run_to_file(&celeste(), dir.path()).unwrap();
    assert_eq!(path, dir.path().join("Celeste.toml"));

    let mut other = RunDefinition::with_split_names("Any%", &get_splits("a|b"));
    other.segmented = true;
    save_run_to_file(&other, dir.path()).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a run").unwrap();
    fs::write(dir.path().join("broken.toml"), "name = ").unwrap();

    assert_eq!(list_runs(dir.path()).unwrap(), vec!["Any%", "Celeste"]);
    assert_eq!(find_run_by_name("Celeste", dir.path()).unwrap(), celeste());
    assert!(find_run_by_name("Any%", dir.path()).unwrap().segmented);
    assert!(matches!(
        find_run_by_name("Hollow Knight", dir.path()),
        Err(Error::Run(_))
    ));
    assert!(matches!(find_run_by_name("", dir.path()), Err(Error::Run(_))));
}

#[test]
fn run_file_stores_times_as_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_run_to_file(&celeste(), dir.path()).unwrap();
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("run_time = \"5.00\""), "{content}");
    assert!(content.contains("best_time = \"9.00\""), "{content}");
}

#[test]
fn configuration_survives_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config").join(".splitkeeper");
    let mut config = Configuration::new(dir.path().join("runs"));
    config.accuracy = Accuracy::Tenth;
    config.comparison.method = CompareMethod::SumOfBestSegments;
    config.keybinding.split = "space".to_string();
    config.save(&config_path).unwrap();
    assert_eq!(Configuration::load(&config_path).unwrap(), config);

    update_configuration_with_default_run(&mut config, "Celeste", &config_path).unwrap();
    let loaded = Configuration::load(&config_path).unwrap();
    assert!(loaded.use_default_run);
    assert_eq!(loaded.default_run_name.as_deref(), Some("Celeste"));
}

#[test]
fn configuration_with_clashing_keys_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join(".splitkeeper");
    let mut config = Configuration::new(dir.path().to_path_buf());
    config.keybinding.reset = config.keybinding.split.clone();
    config.save(&config_path).unwrap();
    assert!(matches!(
        Configuration::load(&config_path),
        Err(Error::Keybinding(_))
    ));
    assert!(matches!(
        Configuration::load(&dir.path().join("missing")),
        Err(Error::ConfigFileOpen(_))
    ));
}

#[test]
fn livesplit_export_imports_back() {
    let dir = tempfile::tempdir().unwrap();
    let lss = dir.path().join("celeste.lss");
    export_lss(&celeste(), &lss).unwrap();

    let imported = import_lss(&lss).unwrap();
    assert_eq!(imported.name, "Celeste");
    let names: Vec<_> = imported.segments.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Prologue", "Forsaken City", "Old Site"]);
    let run_times: Vec<_> = imported.segments.iter().map(|s| s.run_time).collect();
    assert_eq!(run_times, vec![secs(5), secs(7), None]);
    let best_times: Vec<_> = imported.segments.iter().map(|s| s.best_time).collect();
    assert_eq!(best_times, vec![secs(4), secs(7), secs(9)]);
}

#[test]
fn importing_a_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        import_lss(&dir.path().join("missing.lss")),
        Err(Error::Import(_))
    ));
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use presetstore::{
    KeyValueMedium, MemoryMedium, PresetRecord, PresetStore, StoreError, TomlFileMedium,
    DEFAULT_PRESET_PREFIX,
};
use proptest::prelude::*;

fn key(id: &str) -> String {
    format!("{DEFAULT_PRESET_PREFIX}{id}")
}

fn sorted_ids(records: Vec<PresetRecord>) -> Vec<String> {
    let mut ids: Vec<String> = records.into_iter().map(|record| record.id).collect();
    ids.sort();
    ids
}

#[test]
fn save_then_find_by_id() {
    let store = PresetStore::open(MemoryMedium::new());
    store
        .save(&PresetRecord::new("shader 1", "CRT").with_id("id1"))
        .expect("save");

    let found = store.find_preset_by_id("id1").expect("preset present");
    assert_eq!(found.shader, "CRT");
    assert_eq!(found.name, "shader 1");
    assert!(store.find_preset_by_id("id2").is_none());
}

#[test]
fn groups_presets_by_shader() {
    let store = PresetStore::open(MemoryMedium::new());
    for (id, shader) in [("m1", "MAME"), ("m2", "MAME"), ("r1", "Retro"), ("m3", "MAME")] {
        store
            .save(&PresetRecord::new(format!("preset {id}"), shader).with_id(id))
            .unwrap();
    }

    assert_eq!(store.find_presets_by_shader("MAME").len(), 3);
    assert_eq!(store.find_presets_by_shader("Retro").len(), 1);
    assert!(store.find_presets_by_shader("foo").is_empty());
}

#[test]
fn shader_of_existing_preset_cannot_change() {
    let medium = Arc::new(MemoryMedium::new());
    let store = PresetStore::open(Arc::clone(&medium));
    store
        .save(&PresetRecord::new("Glow", "CRT").with_id("p1").with_parameter("a", 1.0))
        .unwrap();
    let before = medium.get(&key("p1")).unwrap();

    let err = store
        .save(&PresetRecord::new("Glow", "Retro").with_id("p1").with_parameter("a", 2.0))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::ShaderModified { ref stored, ref requested, .. }
            if stored == "CRT" && requested == "Retro"
    ));

    assert_eq!(medium.get(&key("p1")).unwrap(), before);
    let found = store.find_preset_by_id("p1").unwrap();
    assert_eq!(found.shader, "CRT");
    assert_eq!(found.parameters.get("a"), Some(&1.0));
    assert!(store.find_presets_by_shader("Retro").is_empty());
}

#[test]
fn duplicate_name_is_checked_before_shader() {
    let store = PresetStore::open(MemoryMedium::new());
    store.save(&PresetRecord::new("Taken", "CRT").with_id("a")).unwrap();
    store.save(&PresetRecord::new("Other", "CRT").with_id("b")).unwrap();

    // Both checks would fail; the name check wins.
    let err = store
        .save(&PresetRecord::new("Taken", "Retro").with_id("b"))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { ref name } if name == "Taken"));

    let err = store
        .save(&PresetRecord::new("Taken", "CRT").with_id("c"))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { .. }));
    assert!(!store.exists_by_id("c"));
}

#[test]
fn resaving_keeps_own_name() {
    let store = PresetStore::open(MemoryMedium::new());
    store.save(&PresetRecord::new("Mine", "CRT").with_id("a")).unwrap();
    store
        .save(&PresetRecord::new("Mine", "CRT").with_id("a").with_parameter("x", 3.0))
        .unwrap();
    assert_eq!(store.find_preset_by_name("Mine").unwrap().parameters.len(), 1);
}

#[test]
fn rename_moves_name_index() {
    let store = PresetStore::open(MemoryMedium::new());
    store.save(&PresetRecord::new("Before", "CRT").with_id("a")).unwrap();
    store.save(&PresetRecord::new("After", "CRT").with_id("a")).unwrap();

    assert!(!store.exists_by_name("Before"));
    assert!(store.exists_by_name("After"));
    assert_eq!(store.find_preset_by_name("After").unwrap().id, "a");
    assert_eq!(store.find_presets_by_shader("CRT").len(), 1);

    // The old name is free again.
    store.save(&PresetRecord::new("Before", "CRT").with_id("b")).unwrap();
}

#[test]
fn remove_updates_every_index() {
    let medium = Arc::new(MemoryMedium::new());
    let store = PresetStore::open(Arc::clone(&medium));
    store.save(&PresetRecord::new("One", "CRT").with_id("a")).unwrap();
    store.save(&PresetRecord::new("Two", "CRT").with_id("b")).unwrap();
    assert!(store.find_preset_by_id("a").is_some());

    assert!(store.remove("a").unwrap());
    assert!(medium.get(&key("a")).is_none());
    assert!(store.find_preset_by_id("a").is_none());
    assert!(!store.exists_by_id("a"));
    assert!(!store.exists_by_name("One"));
    assert_eq!(sorted_ids(store.find_presets_by_shader("CRT")), vec!["b"]);
    assert_eq!(store.ids(), vec!["b"]);

    assert!(!store.remove("a").unwrap());
}

#[test]
fn remove_accepts_storage_keys() {
    let store = PresetStore::open(MemoryMedium::new());
    store.save(&PresetRecord::new("One", "CRT").with_id("a")).unwrap();
    assert!(store.remove(&key("a")).unwrap());
    assert!(store.ids().is_empty());
}

#[test]
fn rebuild_skips_corrupt_entries() {
    let medium = MemoryMedium::with_entries([
        (key("good1"), r#"$name="One";$shader="CRT";a=1"#.to_string()),
        (key("bad"), "ccvalue=foo;x=1".to_string()),
        (key("good2"), r#"$name="Two";$shader="CRT";$createdAt="5";b=2"#.to_string()),
        (key("legacy"), r#""Old","Retro":c=3"#.to_string()),
        ("unrelated.key".to_string(), "=nonsense".to_string()),
    ]);
    let store = PresetStore::open(medium);

    assert_eq!(
        sorted_ids(store.find_presets_by_shader("CRT")),
        vec!["good1", "good2"]
    );
    assert_eq!(store.find_preset_by_name("Old").unwrap().shader, "Retro");
    assert!(store.find_preset_by_id("bad").is_none());
    assert!(store.exists_by_id("bad"));

    let summary = store.rebuild_indices();
    assert_eq!(summary.indexed, 3);
    assert_eq!(summary.skipped, vec![key("bad")]);
}

#[test]
fn rebuild_rejects_tampered_signatures() {
    let signed = presettext::signature::append(r#"$name="One";$shader="CRT";a=1"#);
    assert_eq!(signed, r#"$name="One";$shader="CRT";a=1@0c9"#);
    // The a=2 body signs as 051.
    let tampered = r#"$name="One";$shader="CRT";a=2@0c9"#;
    assert!(!presettext::signature::is_valid(tampered));

    let medium = MemoryMedium::with_entries([(key("p"), tampered)]);
    let store = PresetStore::open(medium);
    assert!(store.ids().is_empty());
    assert!(store.find_preset_by_id("p").is_none());
    assert!(!store.exists_by_name("One"));
}

#[test]
fn default_preset_prefers_saved_preset_named_after_shader() {
    let store = PresetStore::open(MemoryMedium::new());
    let shader = presetstore::ShaderDescriptor::new("CRT Geom").with_parameter(
        presetstore::ShaderParameter::new("curvature", 2.0, 0.0, 5.0, 0.1),
    );

    let synthesised = store.default_preset_for_shader(&shader);
    assert_eq!(synthesised.id, "CRT Geom");
    assert_eq!(synthesised.parameters.get("curvature"), Some(&2.0));
    assert!(!store.exists_by_id("CRT Geom"));

    let mut tuned = synthesised.clone();
    tuned.parameters.insert("curvature".into(), 3.5);
    store.save(&tuned).unwrap();
    let saved = store.default_preset_for_shader(&shader);
    assert_eq!(saved.parameters.get("curvature"), Some(&3.5));
}

#[test]
fn presets_matching_filters_by_predicate() {
    let store = PresetStore::open(MemoryMedium::new());
    store
        .save(&PresetRecord::new("A", "CRT").with_id("a").with_parameter("gamma", 2.4))
        .unwrap();
    store.save(&PresetRecord::new("B", "CRT").with_id("b")).unwrap();
    store
        .save(&PresetRecord::new("C", "Retro").with_id("c").with_parameter("gamma", 1.0))
        .unwrap();

    let with_gamma = store.presets_matching(|record| record.parameters.contains_key("gamma"));
    assert_eq!(sorted_ids(with_gamma), vec!["a", "c"]);
}

#[test]
fn file_backed_store_survives_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("presets.toml");
    {
        let store = PresetStore::open(TomlFileMedium::open(&path).unwrap());
        store
            .save(&PresetRecord::new("Persisted", "CRT").with_id("p").with_parameter("x", 0.25))
            .unwrap();
    }

    let store = PresetStore::open(TomlFileMedium::open(&path).unwrap());
    let found = store.find_preset_by_name("Persisted").expect("reloaded");
    assert_eq!(found.id, "p");
    assert_eq!(found.parameters.get("x"), Some(&0.25));
    assert!(found.created_at.is_some());
}

#[test]
fn invalid_names_are_rejected_without_writing() {
    let medium = Arc::new(MemoryMedium::new());
    let store = PresetStore::open(Arc::clone(&medium));
    let err = store
        .save(&PresetRecord::new("bad;name", "CRT").with_id("x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::Write(_)));
    assert!(medium.is_empty());
    assert!(!store.exists_by_name("bad;name"));
}

#[test]
fn concurrent_saves_and_reads_stay_consistent() {
    const WRITERS: usize = 6;
    const PER_WRITER: usize = 25;

    let store = PresetStore::open(MemoryMedium::new());
    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let store = &store;
            scope.spawn(move || {
                let shader = format!("shader{}", writer % 3);
                for n in 0..PER_WRITER {
                    let id = format!("w{writer}-{n}");
                    store
                        .save(&PresetRecord::new(format!("name {id}"), shader.clone()).with_id(&id))
                        .expect("save");
                }
            });
        }
        for _ in 0..3 {
            let store = &store;
            scope.spawn(move || {
                for _ in 0..200 {
                    for shader in ["shader0", "shader1", "shader2"] {
                        for record in store.find_presets_by_shader(shader) {
                            assert_eq!(record.shader, shader);
                            assert!(store.exists_by_id(&record.id));
                            assert!(store.exists_by_name(&record.name));
                        }
                    }
                }
            });
        }
    });

    assert_eq!(store.ids().len(), WRITERS * PER_WRITER);
    for shader in ["shader0", "shader1", "shader2"] {
        assert_eq!(store.find_presets_by_shader(shader).len(), 2 * PER_WRITER);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Save { id: u8, name: u8, shader: u8 },
    Remove { id: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..6, 0u8..5, 0u8..3).prop_map(|(id, name, shader)| Op::Save { id, name, shader }),
        1 => (0u8..6).prop_map(|id| Op::Remove { id }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// After any sequence of saves and removes, the shader and name indices
    /// match a straightforward model of what is stored.
    #[test]
    fn indices_match_stored_records(ops in prop::collection::vec(op(), 1..40)) {
        let medium = Arc::new(MemoryMedium::new());
        let store = PresetStore::open(Arc::clone(&medium));
        let mut model: BTreeMap<String, (String, String)> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Save { id, name, shader } => {
                    let (id, name, shader) = (format!("id{id}"), format!("name{name}"), format!("shader{shader}"));
                    let duplicate = model.iter().any(|(other, (taken, _))| other != &id && taken == &name);
                    let modified = model.get(&id).is_some_and(|(_, stored)| stored != &shader);
                    let result = store.save(&PresetRecord::new(name.clone(), shader.clone()).with_id(&id));
                    if duplicate {
                        prop_assert!(matches!(result, Err(StoreError::DuplicateName { .. })), "expected DuplicateName, got {:?}", result);
                    } else if modified {
                        prop_assert!(matches!(result, Err(StoreError::ShaderModified { .. })), "expected ShaderModified, got {:?}", result);
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(id, (name, shader));
                    }
                }
                Op::Remove { id } => {
                    let id = format!("id{id}");
                    let removed = store.remove(&id).unwrap();
                    prop_assert_eq!(removed, model.remove(&id).is_some());
                }
            }
        }

        for shader in ["shader0", "shader1", "shader2"] {
            let expected: Vec<String> = model
                .iter()
                .filter(|(_, (_, stored))| stored == shader)
                .map(|(id, _)| id.clone())
                .collect();
            prop_assert_eq!(sorted_ids(store.find_presets_by_shader(shader)), expected);
        }
        for name in 0..5 {
            let name = format!("name{name}");
            let owner = model.iter().find(|(_, (taken, _))| taken == &name).map(|(id, _)| id.clone());
            prop_assert_eq!(store.find_preset_by_name(&name).map(|record| record.id), owner);
        }
        prop_assert_eq!(store.ids(), model.keys().cloned().collect::<Vec<_>>());

        // A fresh store over the same medium rebuilds the same indices.
        let reopened = PresetStore::open(Arc::clone(&medium));
        prop_assert_eq!(reopened.ids(), store.ids());
    }
}

// Startup flow against a catalog on disk
use std::fs;
use std::path::{Path, PathBuf};

use soundfont_catalog::engine::{
    DirectoryLocator, LoadError, PresetInfo, SoundFontInfo, SoundFontLoader,
};
use soundfont_catalog::state::{self, Location, Ubiquitous};
use soundfont_catalog::{Catalog, StoragePaths};
use tempfile::TempDir;

struct FileNameLoader;

impl SoundFontLoader for FileNameLoader {
    fn load(&self, path: &Path) -> Result<SoundFontInfo, LoadError> {
        let bytes = fs::read(path)?;
        if !bytes.starts_with(b"RIFF") {
            return Err(LoadError::NotLoadable(path.display().to_string()));
        }
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(SoundFontInfo {
            embedded_name: name.clone(),
            presets: vec![
                PresetInfo {
                    name: format!("{} Piano", name),
                    bank: 0,
                    program: 0,
                },
                PresetInfo {
                    name: format!("{} Drums", name),
                    bank: 128,
                    program: 0,
                },
            ],
            ..SoundFontInfo::default()
        })
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bundle() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    for name in ["FreeFont", "GeneralUser GS MuseScore v1.442", "RolandNicePiano"] {
        fs::write(dir.path().join(format!("{}.sf2", name)), b"RIFF").unwrap();
    }
    let path = dir.path().to_path_buf();
    (dir, path)
}

#[test]
fn first_launch_installs_builtins() {
    init_logging();
    let root = TempDir::new().unwrap();
    let (_bundle, bundle_path) = bundle();
    let locator = DirectoryLocator::new(&bundle_path);

    let catalog = Catalog::open(StoragePaths::new(root.path()), &FileNameLoader, &locator).unwrap();
    assert!(root.path().join("catalog.db").exists());

    let names: Vec<String> = state::list_sound_fonts(&catalog.db)
        .unwrap()
        .into_iter()
        .map(|sf| sf.display_name)
        .collect();
    assert_eq!(names, vec!["FreeFont", "MuseScore", "Roland Piano"]);
    assert_eq!(
        state::sound_fonts_tagged(&catalog.db, &Ubiquitous::BuiltIn.id())
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn reopening_keeps_everything_once() {
    init_logging();
    let root = TempDir::new().unwrap();
    let (_bundle, bundle_path) = bundle();
    let locator = DirectoryLocator::new(&bundle_path);

    let catalog = Catalog::open(StoragePaths::new(root.path()), &FileNameLoader, &locator).unwrap();
    let keys = state::create_tag(&catalog.db, "Keys").unwrap();
    drop(catalog);

    let catalog = Catalog::open(StoragePaths::new(root.path()), &FileNameLoader, &locator).unwrap();
    assert_eq!(state::list_sound_fonts(&catalog.db).unwrap().len(), 3);

    let tags = state::list_tags(&catalog.db).unwrap();
    assert_eq!(tags.len(), 5);
    assert_eq!(tags[4], keys);
}

#[test]
fn import_and_remove_installed_file() {
    init_logging();
    let root = TempDir::new().unwrap();
    let (_bundle, bundle_path) = bundle();
    let paths = StoragePaths::new(root.path());
    let catalog = Catalog::open(paths.clone(), &FileNameLoader, &DirectoryLocator::new(&bundle_path)).unwrap();

    let outside = TempDir::new().unwrap();
    let source = outside.path().join("Strings.sf2");
    fs::write(&source, b"RIFF").unwrap();
    let copied = state::install_file(&paths, &source).unwrap();

    let sound_font = state::import_sound_font(
        &catalog.db,
        &FileNameLoader,
        "Strings",
        Location::installed(copied.to_string_lossy().to_string()),
    )
    .unwrap();
    let tags: Vec<String> = state::tags_for_sound_font(&catalog.db, &sound_font.id)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(tags, vec!["All", "Added"]);

    state::remove_sound_font(&catalog.db, &sound_font.id).unwrap();
    assert!(!copied.exists());
    assert!(source.exists());
}

#[test]
fn active_state_survives_restart() {
    init_logging();
    let root = TempDir::new().unwrap();
    let (_bundle, bundle_path) = bundle();
    let locator = DirectoryLocator::new(&bundle_path);

    let catalog = Catalog::open(StoragePaths::new(root.path()), &FileNameLoader, &locator).unwrap();
    let sound_font = state::list_sound_fonts(&catalog.db).unwrap()[0].clone();
    let preset = state::presets_for_sound_font(&catalog.db, &sound_font.id, true).unwrap()[1].clone();
    catalog
        .active
        .update(|active| active.activate_preset(sound_font.id, preset.id))
        .unwrap();
    drop(catalog);

    let catalog = Catalog::open(StoragePaths::new(root.path()), &FileNameLoader, &locator).unwrap();
    let active = catalog.active.load().unwrap();
    let resolved = state::resolve(&active, &catalog.db).unwrap();
    assert_eq!(resolved.active_sound_font.unwrap().id, sound_font.id);
    assert_eq!(resolved.active_tag.id, Ubiquitous::All.id());
    assert_eq!(
        state::active_preset_name(&catalog.db, &active).unwrap(),
        "FreeFont Drums"
    );
}

// State management module
// Handles SQLite persistence, the active selection document and installed files

pub mod active;
pub mod db;
pub mod models;
pub mod overrides;
pub mod queries;
pub mod schema;
pub mod storage;

pub use active::{active_preset_name, resolve, ActiveState, ActiveStateStore, ResolvedActiveState};
pub use db::{init_db, open_in_memory, DbConnection, DbError, DbResult};
pub use models::{
    AudioConfig, ConfigOwner, DelayConfig, ElementCounts, Favorite, Location, LocationKind,
    Preset, PresetWithFavorites, ReverbConfig, SoundFont, Tag, Ubiquitous,
};
pub use overrides::{ZoneOverrides, GLOBAL_ZONE};
pub use queries::configs::{
    audio_config_for, delay_config, remove_delay_config, remove_reverb_config,
    remove_zone_override, remove_zone_overrides, reverb_config, set_delay_config,
    set_reverb_config, set_zone_override, update_audio_config,
};
pub use queries::presets::{
    create_favorite, delete_favorite, favorites_for_preset, get_favorite, get_preset,
    get_preset_with_favorites, presets_for_sound_font, rename_favorite, rename_preset,
    set_favorite_notes, set_preset_notes, set_preset_visible,
};
pub use queries::sound_fonts::{
    add_sound_font, delete_sound_font, element_counts, find_sound_font_by_location,
    get_sound_font, import_sound_font, install_builtin_sound_fonts, list_sound_fonts,
    remove_sound_font, rename_sound_font, set_sound_font_notes, set_sound_font_visible,
};
pub use queries::tags::{
    create_tag, delete_tag, ensure_ubiquitous_tags, find_tag_by_name, generate_tags_list,
    get_tag, list_tags, next_tag_name, rename_tag, reorder_tags, sound_fonts_tagged,
    tag_sound_font, tags_for_sound_font, untag_sound_font,
};
pub use storage::{install_file, remove_installed_file, StorageError, StoragePaths};

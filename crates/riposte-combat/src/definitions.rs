//! Item combat profile loading and management.
//!
//! This module provides:
//! - Loading profiles from assets/combat/*.toml and *.ron
//! - Profile validation on load
//! - Schema version checks against [`SchemaVersion::ITEM_PROFILE`]
//! - A registry with lookup by item type and by name

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use riposte_common::{ItemTypeId, RiposteError, SchemaVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::attack_range::AttackRange;
use crate::blocking::BlockingItem;
use crate::blocks_attacks::BlocksAttacks;
use crate::kinetic_weapon::KineticWeapon;
use crate::piercing_weapon::PiercingWeapon;
use crate::strike::{StrikePolicy, WeaponStats};
use crate::world::{CooldownGroup, EquipmentSlot, SoundId};

/// Default asset path for combat profiles.
pub const DEFAULT_PROFILE_PATH: &str = "assets/combat";

/// Default use duration of an item held down, in ticks.
pub const DEFAULT_USE_DURATION_TICKS: u32 = 72_000;

/// Errors that can occur while loading profiles.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// File not found.
    #[error("Profile file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read profile file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse profile TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failed to parse RON.
    #[error("Failed to parse profile RON: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// File extension is neither `toml` nor `ron`.
    #[error("Unsupported profile format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Schema version problem.
    #[error(transparent)]
    Version(#[from] RiposteError),

    /// Validation error.
    #[error("Profile validation error: {0}")]
    Validation(String),

    /// Two profiles share an item type.
    #[error("Duplicate item type: {0}")]
    DuplicateItemType(u32),

    /// Two profiles share a name.
    #[error("Duplicate profile name: {0}")]
    DuplicateName(String),
}

/// Result type for profile operations.
pub type DefinitionResult<T> = Result<T, DefinitionError>;

const fn default_use_duration() -> u32 {
    DEFAULT_USE_DURATION_TICKS
}

/// Combat components of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCombatProfile {
    /// Display name, unique case-insensitively.
    pub name: String,
    /// Item type this profile belongs to.
    pub item_type: ItemTypeId,
    /// Reach override; entity default when absent.
    #[serde(default)]
    pub attack_range: Option<AttackRange>,
    /// Strike policy.
    #[serde(default)]
    pub strike: Option<StrikePolicy>,
    /// Blocking policy.
    #[serde(default)]
    pub blocks_attacks: Option<BlocksAttacks>,
    /// Weapon stats.
    #[serde(default)]
    pub weapon: Option<WeaponStats>,
    /// Cooldown group; the lowercased name when absent.
    #[serde(default)]
    pub cooldown_group: Option<CooldownGroup>,
    /// How long the item can be held in use.
    #[serde(default = "default_use_duration")]
    pub use_duration_ticks: u32,
}

impl ItemCombatProfile {
    /// Creates a profile with no combat components.
    #[must_use]
    pub fn new(name: impl Into<String>, item_type: ItemTypeId) -> Self {
        Self {
            name: name.into(),
            item_type,
            attack_range: None,
            strike: None,
            blocks_attacks: None,
            weapon: None,
            cooldown_group: None,
            use_duration_ticks: DEFAULT_USE_DURATION_TICKS,
        }
    }

    /// Sets the reach override.
    #[must_use]
    pub fn with_attack_range(mut self, range: AttackRange) -> Self {
        self.attack_range = Some(range);
        self
    }

    /// Sets the strike policy.
    #[must_use]
    pub fn with_strike(mut self, strike: StrikePolicy) -> Self {
        self.strike = Some(strike);
        self
    }

    /// Sets the blocking policy.
    #[must_use]
    pub fn with_blocks_attacks(mut self, blocks: BlocksAttacks) -> Self {
        self.blocks_attacks = Some(blocks);
        self
    }

    /// Sets the weapon stats.
    #[must_use]
    pub fn with_weapon(mut self, weapon: WeaponStats) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Stock spear: a kinetic lunge weapon with long reach.
    #[must_use]
    pub fn spear() -> Self {
        Self::new("Spear", ItemTypeId::new(1))
            .with_attack_range(AttackRange::new(2.0, 4.5, 2.0, 6.5, 0.125, 0.5))
            .with_strike(StrikePolicy::Kinetic(KineticWeapon::spear()))
            .with_weapon(WeaponStats::default())
    }

    /// Stock trident: a piercing swing.
    #[must_use]
    pub fn trident() -> Self {
        Self::new("Trident", ItemTypeId::new(2))
            .with_attack_range(AttackRange::new(0.0, 3.5, 0.0, 5.0, 0.3, 1.0))
            .with_strike(StrikePolicy::Piercing(PiercingWeapon {
                deals_knockback: true,
                dismounts: false,
                sound: Some(SoundId::new("item.trident.swing")),
                hit_sound: Some(SoundId::new("item.trident.hit")),
            }))
            .with_weapon(WeaponStats::default())
    }

    /// Stock shield.
    #[must_use]
    pub fn shield() -> Self {
        Self::new("Shield", ItemTypeId::new(3)).with_blocks_attacks(BlocksAttacks::shield())
    }

    /// Stock axe: breaks blocks for five seconds.
    #[must_use]
    pub fn axe() -> Self {
        Self::new("Axe", ItemTypeId::new(4)).with_weapon(WeaponStats {
            item_damage_per_attack: 2,
            disable_blocking_for_seconds: 5.0,
        })
    }

    /// All stock profiles.
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![Self::spear(), Self::trident(), Self::shield(), Self::axe()]
    }

    /// Reach for a wielder with the given interaction range.
    #[must_use]
    pub fn reach(&self, interaction_range: f32) -> AttackRange {
        AttackRange::resolve(self.attack_range.as_ref(), interaction_range)
    }

    /// Weapon stats, or the defaults.
    #[must_use]
    pub fn weapon_stats(&self) -> WeaponStats {
        self.weapon.unwrap_or_default()
    }

    /// Effective cooldown group.
    #[must_use]
    pub fn cooldown_group(&self) -> CooldownGroup {
        self.cooldown_group
            .clone()
            .unwrap_or_else(|| CooldownGroup::new(self.name.to_lowercase()))
    }

    /// Describes this item as a blocking item held in `slot`.
    #[must_use]
    pub fn blocking_item(&self, slot: EquipmentSlot) -> BlockingItem {
        BlockingItem {
            slot,
            item_type: self.item_type,
            cooldown_group: self.cooldown_group(),
        }
    }

    /// Validates the profile.
    pub fn validate(&self) -> DefinitionResult<()> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::Validation(format!(
                "Item type {} has empty name",
                self.item_type.raw()
            )));
        }

        if let Some(range) = &self.attack_range {
            range.validate(&self.name)?;
        }
        if let Some(strike) = &self.strike {
            strike.validate(&self.name)?;
        }
        if let Some(blocks) = &self.blocks_attacks {
            blocks.validate(&self.name)?;
        }
        if let Some(weapon) = &self.weapon {
            weapon.validate(&self.name)?;
        }

        if let Some(StrikePolicy::Kinetic(kinetic)) = &self.strike {
            if kinetic.delay_ticks >= self.use_duration_ticks {
                warn!(
                    "Profile {} never goes live: delay {} >= use duration {}",
                    self.name, kinetic.delay_ticks, self.use_duration_ticks
                );
            }
        }

        Ok(())
    }
}

/// A collection of profiles from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Profiles in this file.
    #[serde(default)]
    pub items: Vec<ItemCombatProfile>,
}

fn default_version() -> String {
    SchemaVersion::ITEM_PROFILE.to_string()
}

impl ProfileFile {
    /// Parses a TOML profile file.
    pub fn from_toml_str(text: &str) -> DefinitionResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parses a RON profile file.
    pub fn from_ron_str(text: &str) -> DefinitionResult<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Fails unless this file's version is readable.
    pub fn check_version(&self) -> DefinitionResult<()> {
        let version = SchemaVersion::parse(&self.version)?;
        SchemaVersion::ITEM_PROFILE.ensure_readable(&version)?;
        Ok(())
    }
}

/// Profile registry with lookup by item type and name.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: Vec<ItemCombatProfile>,
    /// Profile indices by item type.
    by_item: HashMap<ItemTypeId, usize>,
    /// Profile indices by name (lowercase).
    by_name: HashMap<String, usize>,
}

impl ProfileRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the stock profiles.
    pub fn with_presets() -> DefinitionResult<Self> {
        let mut registry = Self::new();
        for profile in ItemCombatProfile::presets() {
            registry.register(profile)?;
        }
        Ok(registry)
    }

    /// Returns the number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Validates and registers a profile.
    pub fn register(&mut self, profile: ItemCombatProfile) -> DefinitionResult<()> {
        profile.validate()?;

        if self.by_item.contains_key(&profile.item_type) {
            return Err(DefinitionError::DuplicateItemType(profile.item_type.raw()));
        }
        let name_lower = profile.name.to_lowercase();
        if self.by_name.contains_key(&name_lower) {
            return Err(DefinitionError::DuplicateName(profile.name));
        }

        let index = self.profiles.len();
        self.by_item.insert(profile.item_type, index);
        self.by_name.insert(name_lower, index);
        self.profiles.push(profile);
        Ok(())
    }

    /// Gets a profile by item type.
    #[must_use]
    pub fn get(&self, item_type: ItemTypeId) -> Option<&ItemCombatProfile> {
        self.by_item.get(&item_type).map(|&i| &self.profiles[i])
    }

    /// Gets a profile by name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ItemCombatProfile> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&i| &self.profiles[i])
    }

    /// Returns an iterator over all profiles, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemCombatProfile> {
        self.profiles.iter()
    }

    /// Returns all profiles that can block.
    #[must_use]
    pub fn blocking_items(&self) -> Vec<&ItemCombatProfile> {
        self.profiles
            .iter()
            .filter(|p| p.blocks_attacks.is_some())
            .collect()
    }

    /// Returns all profiles with a kinetic strike.
    #[must_use]
    pub fn kinetic_weapons(&self) -> Vec<&ItemCombatProfile> {
        self.profiles
            .iter()
            .filter(|p| p.strike.as_ref().is_some_and(|s| s.as_kinetic().is_some()))
            .collect()
    }

    /// Clears the registry.
    pub fn clear(&mut self) {
        self.profiles.clear();
        self.by_item.clear();
        self.by_name.clear();
    }
}

/// Loads profile files into a registry.
pub struct ProfileLoader {
    /// Base path for profile files.
    base_path: PathBuf,
    /// Profile registry.
    registry: ProfileRegistry,
}

impl ProfileLoader {
    /// Creates a new profile loader.
    #[must_use]
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            registry: ProfileRegistry::new(),
        }
    }

    /// Returns a reference to the profile registry.
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Consumes the loader, returning its registry.
    #[must_use]
    pub fn into_registry(self) -> ProfileRegistry {
        self.registry
    }

    /// Loads every `.toml` and `.ron` file under the base path.
    ///
    /// Files that fail to load are skipped with a warning.
    pub fn load_all(&mut self) -> DefinitionResult<usize> {
        let path = &self.base_path;
        if !path.exists() {
            info!("Profile path does not exist: {:?}", path);
            return Ok(0);
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path
                .extension()
                .is_some_and(|ext| ext == "toml" || ext == "ron")
            {
                files.push(file_path);
            }
        }
        files.sort();

        let mut count = 0;
        for file_path in files {
            match self.load_file(&file_path) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} profiles from {:?}", n, file_path);
                },
                Err(e) => {
                    warn!("Failed to load profile file {:?}: {}", file_path, e);
                },
            }
        }

        info!("Loaded {} combat profiles total", count);
        Ok(count)
    }

    /// Loads profiles from a single file.
    ///
    /// Nothing from the file is registered unless every profile in it is
    /// valid and no item type or name repeats, within the file or against
    /// profiles already registered.
    pub fn load_file(&mut self, path: &Path) -> DefinitionResult<usize> {
        if !path.exists() {
            return Err(DefinitionError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ProfileFile::from_toml_str(&content)?,
            Some("ron") => ProfileFile::from_ron_str(&content)?,
            _ => return Err(DefinitionError::UnsupportedFormat(path.to_path_buf())),
        };
        file.check_version()?;

        let mut item_types = HashSet::new();
        let mut names = HashSet::new();
        for profile in &file.items {
            profile.validate()?;
            if !item_types.insert(profile.item_type) || self.registry.get(profile.item_type).is_some() {
                return Err(DefinitionError::DuplicateItemType(profile.item_type.raw()));
            }
            let name_lower = profile.name.to_lowercase();
            if self.registry.get_by_name(&name_lower).is_some() || !names.insert(name_lower) {
                return Err(DefinitionError::DuplicateName(profile.name.clone()));
            }
        }

        let mut count = 0;
        for profile in file.items {
            self.registry.register(profile)?;
            count += 1;
        }
        Ok(count)
    }

    /// Reloads all profiles.
    pub fn reload(&mut self) -> DefinitionResult<usize> {
        self.registry.clear();
        self.load_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SPEAR_TOML: &str = r#"
version = "1.0.0"

[[items]]
name = "Iron Spear"
item_type = 10
use_duration_ticks = 200

[items.attack_range]
min_range = 2.0
max_range = 4.5
min_creative_range = 2.0
max_creative_range = 6.5
hitbox_margin = 0.125
mob_factor = 0.5

[items.strike]
type = "kinetic"
contact_cooldown_ticks = 10
delay_ticks = 10
forward_movement = 0.38
damage_multiplier = 5.0
hit_sound = "item.spear.hit"

[items.strike.damage_conditions]
max_duration_ticks = 300
min_relative_speed = 0.25

[[items]]
name = "Harpoon"
item_type = 11

[items.strike]
type = "piercing"
dismounts = true
"#;

    const BUCKLER_RON: &str = r#"(
    version: "1.2.0",
    items: [
        (
            name: "Buckler",
            item_type: 21,
            blocks_attacks: Some((
                block_delay_seconds: 0.1,
                disable_cooldown_scale: 0.5,
            )),
            cooldown_group: Some("shield"),
        ),
    ],
)"#;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("create file");
        file.write_all(content.as_bytes()).expect("write file");
        path
    }

    #[test]
    fn test_shipped_assets_match_presets() {
        let text = include_str!("../../../assets/combat/items.toml");
        let file = ProfileFile::from_toml_str(text).expect("shipped file parses");
        assert!(file.check_version().is_ok());
        assert_eq!(file.items, ItemCombatProfile::presets());
    }

    #[test]
    fn test_parse_toml_profiles() {
        let file = ProfileFile::from_toml_str(SPEAR_TOML).expect("valid toml");
        assert_eq!(file.items.len(), 2);

        let spear = &file.items[0];
        let kinetic = spear
            .strike
            .as_ref()
            .and_then(StrikePolicy::as_kinetic)
            .expect("kinetic strike");
        assert_eq!(kinetic.contact_cooldown_ticks, 10);
        assert_eq!(kinetic.mob_speed_factor, 0.2);
        assert_eq!(kinetic.compute_damage_use_duration(), 310);
        assert!(kinetic.knockback_conditions.is_none());

        let harpoon = &file.items[1];
        let piercing = harpoon
            .strike
            .as_ref()
            .and_then(StrikePolicy::as_piercing)
            .expect("piercing strike");
        assert!(piercing.dismounts);
        assert!(piercing.deals_knockback);
        assert_eq!(harpoon.use_duration_ticks, DEFAULT_USE_DURATION_TICKS);
        assert_eq!(harpoon.reach(3.0), AttackRange::default_for(3.0));
    }

    #[test]
    fn test_parse_ron_profiles() {
        let file = ProfileFile::from_ron_str(BUCKLER_RON).expect("valid ron");
        assert!(file.check_version().is_ok());

        let buckler = &file.items[0];
        let blocks = buckler.blocks_attacks.as_ref().expect("blocks attacks");
        assert_eq!(blocks.block_delay_ticks(), 2);
        assert_eq!(blocks.damage_reductions.len(), 1);
        assert_eq!(buckler.cooldown_group().as_str(), "shield");
    }

    #[test]
    fn test_presets_are_valid() {
        let registry = ProfileRegistry::with_presets().expect("presets register");
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.kinetic_weapons().len(), 1);
        assert_eq!(registry.blocking_items().len(), 1);
        assert_eq!(
            registry.get_by_name("SHIELD").map(|p| p.item_type),
            Some(ItemTypeId::new(3))
        );
        assert_eq!(
            registry.get(ItemTypeId::new(4)).map(ItemCombatProfile::cooldown_group),
            Some(CooldownGroup::new("axe"))
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = ProfileRegistry::new();
        registry.register(ItemCombatProfile::shield()).expect("first");

        let same_id = ItemCombatProfile::new("Tower Shield", ItemTypeId::new(3));
        assert!(matches!(registry.register(same_id), Err(DefinitionError::DuplicateItemType(3))));

        let same_name = ItemCombatProfile::new("shield", ItemTypeId::new(99));
        assert!(matches!(registry.register(same_name), Err(DefinitionError::DuplicateName(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_validation_errors() {
        let unnamed = ItemCombatProfile::new("  ", ItemTypeId::new(5));
        assert!(matches!(unnamed.validate(), Err(DefinitionError::Validation(_))));

        let too_far = ItemCombatProfile::new("Pike", ItemTypeId::new(6))
            .with_attack_range(AttackRange::new(0.0, 80.0, 0.0, 5.0, 0.3, 1.0));
        assert!(too_far.validate().is_err());

        let bad_version = ProfileFile {
            version: "2.0.0".to_string(),
            items: Vec::new(),
        };
        assert!(matches!(bad_version.check_version(), Err(DefinitionError::Version(_))));
    }

    #[test]
    fn test_load_all_skips_bad_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_file(dir.path(), "spears.toml", SPEAR_TOML);
        write_file(dir.path(), "shields.ron", BUCKLER_RON);
        write_file(dir.path(), "broken.toml", "this is [ not toml");
        write_file(dir.path(), "notes.txt", "ignored");

        let mut loader = ProfileLoader::new(dir.path());
        let count = loader.load_all().expect("directory readable");

        assert_eq!(count, 3);
        assert!(loader.registry().get_by_name("iron spear").is_some());
        assert!(loader.registry().get(ItemTypeId::new(21)).is_some());

        assert_eq!(loader.reload().expect("reload"), 3);
        assert_eq!(loader.into_registry().len(), 3);
    }

    #[test]
    fn test_load_file_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut loader = ProfileLoader::new(dir.path());

        let missing = dir.path().join("missing.toml");
        assert!(matches!(loader.load_file(&missing), Err(DefinitionError::NotFound(_))));

        let text = write_file(dir.path(), "items.txt", SPEAR_TOML);
        assert!(matches!(loader.load_file(&text), Err(DefinitionError::UnsupportedFormat(_))));

        let invalid = write_file(
            dir.path(),
            "invalid.toml",
            "[[items]]\nname = \"Ok\"\nitem_type = 1\n\n[[items]]\nname = \"\"\nitem_type = 2\n",
        );
        assert!(loader.load_file(&invalid).is_err());
        // The valid first entry was not registered either
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_duplicate_in_file_registers_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_file(
            dir.path(),
            "dupes.toml",
            "[[items]]\nname = \"Alpha\"\nitem_type = 30\n\n\
             [[items]]\nname = \"Beta\"\nitem_type = 31\n\n\
             [[items]]\nname = \"alpha\"\nitem_type = 32\n",
        );

        let mut loader = ProfileLoader::new(dir.path());
        assert!(matches!(
            loader.load_file(&dir.path().join("dupes.toml")),
            Err(DefinitionError::DuplicateName(_))
        ));
        assert_eq!(loader.load_all().expect("directory readable"), 0);
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_clash_with_loaded_file_registers_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = write_file(dir.path(), "a.toml", SPEAR_TOML);
        let second = write_file(
            dir.path(),
            "b.toml",
            "[[items]]\nname = \"Gaff\"\nitem_type = 40\n\n\
             [[items]]\nname = \"Boat Hook\"\nitem_type = 11\n",
        );

        let mut loader = ProfileLoader::new(dir.path());
        assert_eq!(loader.load_file(&first).expect("spears load"), 2);
        assert!(matches!(
            loader.load_file(&second),
            Err(DefinitionError::DuplicateItemType(11))
        ));
        assert_eq!(loader.registry().len(), 2);
        assert!(loader.registry().get_by_name("gaff").is_none());
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut loader = ProfileLoader::new(dir.path().join("absent"));
        assert_eq!(loader.load_all().expect("no error"), 0);
    }
}

// Zone overrides - sparse generator values per instrument zone
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Zone index that applies to every zone of an instrument
pub const GLOBAL_ZONE: i32 = -1;

pub type GeneratorOverrides = BTreeMap<i32, f32>;

/// Mapping of zone index to generator index to value
///
/// A zone entry only exists while it holds at least one generator override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneOverrides {
    zones: BTreeMap<i32, GeneratorOverrides>,
}

impl ZoneOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, zone: i32) -> Option<&GeneratorOverrides> {
        self.zones.get(&zone)
    }

    pub fn get_override(&self, zone: i32, generator: i32) -> Option<f32> {
        self.zones.get(&zone)?.get(&generator).copied()
    }

    pub fn set_override(&mut self, zone: i32, generator: i32, value: f32) {
        self.zones.entry(zone).or_default().insert(generator, value);
    }

    /// Remove one generator override, dropping the zone once it is empty
    pub fn remove_override(&mut self, zone: i32, generator: i32) -> Option<f32> {
        let generators = self.zones.get_mut(&zone)?;
        let removed = generators.remove(&generator);
        if generators.is_empty() {
            self.zones.remove(&zone);
        }
        removed
    }

    pub fn remove_all_overrides_in(&mut self, zone: i32) {
        self.zones.remove(&zone);
    }

    pub fn remove_all_overrides(&mut self) {
        self.zones.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Number of zones with at least one override
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn zones(&self) -> impl Iterator<Item = (i32, &GeneratorOverrides)> {
        self.zones.iter().map(|(zone, generators)| (*zone, generators))
    }

    /// First override holding NaN or an infinity, as (zone, generator, value)
    pub fn first_non_finite(&self) -> Option<(i32, i32, f32)> {
        self.zones().find_map(|(zone, generators)| {
            generators
                .iter()
                .find(|(_, value)| !value.is_finite())
                .map(|(generator, value)| (zone, *generator, *value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removing_last_override_drops_zone() {
        let mut overrides = ZoneOverrides::new();
        overrides.set_override(3, 7, 1.0);
        assert_eq!(overrides.get_override(3, 7), Some(1.0));

        assert_eq!(overrides.remove_override(3, 7), Some(1.0));
        assert!(overrides.get(3).is_none());
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_remove_keeps_other_generators() {
        let mut overrides = ZoneOverrides::new();
        overrides.set_override(GLOBAL_ZONE, 1, 0.5);
        overrides.set_override(GLOBAL_ZONE, 2, 0.25);
        overrides.remove_override(GLOBAL_ZONE, 1);

        let zone = overrides.get(GLOBAL_ZONE).unwrap();
        assert_eq!(zone.len(), 1);
        assert_eq!(zone.get(&2), Some(&0.25));
    }

    #[test]
    fn test_missing_entries_are_not_found() {
        let mut overrides = ZoneOverrides::new();
        assert!(overrides.get(0).is_none());
        assert!(overrides.get_override(0, 0).is_none());
        assert!(overrides.remove_override(0, 0).is_none());

        overrides.set_override(0, 1, 2.0);
        assert!(overrides.remove_override(0, 9).is_none());
        assert_eq!(overrides.get_override(0, 1), Some(2.0));
    }

    #[test]
    fn test_set_replaces_value() {
        let mut overrides = ZoneOverrides::new();
        overrides.set_override(2, 4, 1.0);
        overrides.set_override(2, 4, 3.0);
        assert_eq!(overrides.get_override(2, 4), Some(3.0));
        assert_eq!(overrides.zone_count(), 1);
    }

    #[test]
    fn test_remove_all() {
        let mut overrides = ZoneOverrides::new();
        overrides.set_override(1, 1, 1.0);
        overrides.set_override(2, 1, 1.0);

        overrides.remove_all_overrides_in(1);
        assert!(overrides.get(1).is_none());
        assert!(overrides.get(2).is_some());

        overrides.remove_all_overrides();
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_first_non_finite() {
        let mut overrides = ZoneOverrides::new();
        overrides.set_override(GLOBAL_ZONE, 8, 0.5);
        assert_eq!(overrides.first_non_finite(), None);

        overrides.set_override(2, 5, f32::INFINITY);
        assert_eq!(overrides.first_non_finite(), Some((2, 5, f32::INFINITY)));
    }

    #[test]
    fn test_json_shape() {
        let mut overrides = ZoneOverrides::new();
        overrides.set_override(GLOBAL_ZONE, 8, 0.5);
        let json = serde_json::to_string(&overrides).unwrap();
        assert_eq!(json, r#"{"-1":{"8":0.5}}"#);

        let back: ZoneOverrides = serde_json::from_str(&json).unwrap();
        assert_eq!(back, overrides);
    }
}

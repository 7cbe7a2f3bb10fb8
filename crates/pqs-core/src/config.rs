//! JSON sphere descriptions.
//!
//! A [`SphereConfig`] names a radius, a list of mods and the images those
//! mods sample. Each entry in `mods` is tagged with its mod type; the shared
//! `name`/`enabled`/`order` fields sit beside the mod's own parameters:
//!
//! ```json
//! {
//!   "radius": 600000.0,
//!   "maps": { "relief": { "width": 2, "height": 1, "pixels": [[0,0,0,255],[255,255,255,255]] } },
//!   "mods": [
//!     { "type": "VertexHeightMap", "order": 10, "map": "relief", "deformity": 4000.0 },
//!     { "type": "FlattenOcean", "name": "sea", "order": 50, "ocean_radius": 200.0 }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::map::{MapData, MapSampler};
use crate::mods::{self, ModSettings};
use crate::pqs::Pqs;

/// One configured mod: common settings plus the mod's own parameters.
#[derive(Serialize, Deserialize)]
pub struct ModEntryConfig<T> {
    #[serde(flatten)]
    pub settings: ModSettings,
    /// Name of an entry in [`SphereConfig::maps`]; only read by map-sampling mods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(flatten)]
    pub params: T,
}

impl<T> ModEntryConfig<T> {
    pub fn new(settings: ModSettings, params: T) -> Self {
        Self { settings, map: None, params }
    }

    pub fn with_map(mut self, name: impl Into<String>) -> Self {
        self.map = Some(name.into());
        self
    }
}

fn lookup(maps: &BTreeMap<String, Arc<dyn MapSampler>>, mod_name: &str, map: Option<&str>) -> Option<Arc<dyn MapSampler>> {
    let name = map?;
    let found = maps.get(name).cloned();
    if found.is_none() {
        log::warn!("mod '{mod_name}' references unknown map '{name}'");
    }
    found
}

macro_rules! mod_configs {
    (plain: [$($plain:ident),* $(,)?], mapped: [$($mapped:ident),* $(,)?] $(,)?) => {
        /// A mod of any kind, tagged by its type name in JSON.
        #[derive(Serialize, Deserialize)]
        #[serde(tag = "type")]
        pub enum ModConfig {
            $($plain(ModEntryConfig<mods::$plain>),)*
            $($mapped(ModEntryConfig<mods::$mapped>),)*
        }

        impl ModConfig {
            pub fn settings(&self) -> &ModSettings {
                match self {
                    $(Self::$plain(c) => &c.settings,)*
                    $(Self::$mapped(c) => &c.settings,)*
                }
            }

            /// Adds the mod to `pqs`, resolving its map reference against `maps`.
            /// An unresolved reference leaves the map unset, so setup fails for that mod.
            fn register(self, pqs: &mut Pqs, maps: &BTreeMap<String, Arc<dyn MapSampler>>) {
                match self {
                    $(Self::$plain(c) => {
                        pqs.add_mod(c.settings, c.params);
                    })*
                    $(Self::$mapped(c) => {
                        let mut module = c.params;
                        module.map = lookup(maps, &c.settings.name, c.map.as_deref());
                        pqs.add_mod(c.settings, module);
                    })*
                }
            }
        }
    };
}

mod_configs! {
    plain: [
        HeightOffset,
        FlattenOcean,
        DefineCoastLine,
        HeightOblate,
        FlattenArea,
        FlattenAreaTangential,
        SimplexHeightAbsolute,
        SimplexHeightFlatten,
        HeightNoise,
        VertexNoise,
        VertexVoronoi,
        HeightNoiseVertHeight,
        HeightNoiseVertHeightCurve,
        HeightNoiseVertHeightCurve2,
        VertexPlanet,
        VoronoiCraters,
        AltitudeAlpha,
        HeightColorMap,
        ColorSolid,
        ColorSolidBlend,
        ColorNoise,
        ColorNoiseRgb,
        SimplexNoiseColor,
        SimplexColorRgb,
        SimplexMultiChromatic,
    ],
    mapped: [
        VertexHeightMap,
        HeightNoiseHeightMap,
        ColorMap,
        ColorMapBlend,
    ],
}

/// A complete sphere: radius, mods in registration order and named maps.
#[derive(Serialize, Deserialize)]
pub struct SphereConfig {
    pub radius: f64,
    #[serde(default)]
    pub mods: Vec<ModConfig>,
    #[serde(default)]
    pub maps: BTreeMap<String, MapData>,
}

impl SphereConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a sphere with every configured mod registered. The sphere
    /// still needs [`Pqs::setup_sphere`] before vertices can be built.
    pub fn into_pqs(self) -> Pqs {
        let maps: BTreeMap<String, Arc<dyn MapSampler>> =
            self.maps.into_iter().map(|(name, map)| (name, Arc::new(map) as Arc<dyn MapSampler>)).collect();
        let mut pqs = Pqs::new(self.radius);
        for config in self.mods {
            config.register(&mut pqs, &maps);
        }
        pqs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PqsError;
    use crate::mods::{FlattenOcean, HeightOffset, VertexHeightMap};

    #[test]
    fn parses_tagged_mods_with_defaults() {
        let config = SphereConfig::from_json(
            r#"{
                "radius": 1000.0,
                "mods": [
                    { "type": "HeightOffset", "offset": 25.0 },
                    { "type": "FlattenOcean", "name": "sea", "order": 5, "enabled": false, "ocean_radius": 3.0 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.mods.len(), 2);
        assert_eq!(config.mods[0].settings(), &ModSettings::default());
        let sea = config.mods[1].settings();
        assert_eq!((sea.name.as_str(), sea.order, sea.enabled), ("sea", 5, false));

        let pqs = config.into_pqs();
        assert_eq!(pqs.mods_of_type::<HeightOffset>()[0].1.offset, 25.0);
        let (_, ocean) = pqs.mod_by_name::<FlattenOcean>("sea").unwrap();
        assert_eq!(ocean.ocean_radius, 3.0);
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let err = SphereConfig::from_json(r#"{ "radius": 1.0, "mods": [{ "type": "Nope" }] }"#).err().unwrap();
        assert!(matches!(err, PqsError::Config(_)), "{err}");
    }

    #[test]
    fn map_references_resolve_by_name() {
        let config = SphereConfig::from_json(
            r#"{
                "radius": 1000.0,
                "maps": { "relief": { "width": 1, "height": 1, "pixels": [[255, 255, 255, 255]] } },
                "mods": [{ "type": "VertexHeightMap", "map": "relief", "deformity": 10.0 }]
            }"#,
        )
        .unwrap();
        let mut pqs = config.into_pqs();
        assert!(pqs.mods_of_type::<VertexHeightMap>()[0].1.map.is_some());
        let info = pqs.setup_sphere().unwrap();
        assert_eq!(info.radius_max, 1010.0);
    }

    #[test]
    fn unknown_map_fails_setup() {
        let config = SphereConfig::from_json(
            r#"{ "radius": 1000.0, "mods": [{ "type": "ColorMap", "name": "albedo", "map": "missing" }] }"#,
        )
        .unwrap();
        let mut pqs = config.into_pqs();
        match pqs.setup_sphere() {
            Err(PqsError::ModSetup { name, source }) => {
                assert_eq!(name, "albedo");
                assert!(matches!(*source, PqsError::MissingResource { .. }));
            }
            other => panic!("expected a setup failure, got {other:?}"),
        }
    }

    #[test]
    fn round_trips_through_json() {
        let config = SphereConfig {
            radius: 10.0,
            mods: vec![ModConfig::HeightOffset(ModEntryConfig::new(
                ModSettings::new("lift", 7),
                HeightOffset { offset: 2.0 },
            ))],
            maps: BTreeMap::new(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""type":"HeightOffset""#), "{json}");
        let back = SphereConfig::from_json(&json).unwrap();
        assert_eq!(back.mods[0].settings(), &ModSettings::new("lift", 7));
    }
}

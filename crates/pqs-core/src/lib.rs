//! Procedural quad-sphere terrain: a composable noise graph and an ordered
//! pipeline of mods that turns a direction on the sphere into a height and
//! a colour.

pub mod color;
pub mod config;
pub mod coords;
pub mod curve;
pub mod error;
pub mod heightfield;
pub mod map;
pub mod mods;
pub mod noise;
pub mod pqs;
pub mod sphere;
pub mod vertex;

pub use color::{Color, Gradient};
pub use config::{ModConfig, ModEntryConfig, SphereConfig};
pub use error::{PqsError, Result};
pub use heightfield::HeightField;
pub use map::{MapData, MapDepth, MapSampler};
pub use mods::{ModSettings, PqsMod, SphereInfo};
pub use pqs::{ModHandle, Pqs};
pub use sphere::Vec3;
pub use vertex::VertexBuildData;

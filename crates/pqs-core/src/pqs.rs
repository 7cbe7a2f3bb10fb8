//! The sphere: radius, registered mods and the per-vertex pipeline.
//!
//! Mods live in an append-only arena of slots, so a [`ModHandle`] stays valid
//! when other mods are removed. Every structural change bumps a generation
//! counter. [`Pqs::setup_sphere`] snapshots the enabled mods, stably sorted by
//! order, together with the generation it saw; building vertices from a
//! snapshot whose generation is out of date fails with [`PqsError::NotSetUp`].

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::error::{PqsError, Result};
use crate::heightfield::HeightField;
use crate::mods::{ModSettings, PqsMod, SphereInfo};
use crate::sphere::Vec3;
use crate::vertex::VertexBuildData;

/// Stable reference to a registered mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModHandle(usize);

impl ModHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

struct ModEntry {
    settings: ModSettings,
    module: Box<dyn PqsMod>,
}

impl ModEntry {
    fn label(&self) -> &str {
        if self.settings.name.is_empty() {
            self.module.kind()
        } else {
            &self.settings.name
        }
    }
}

/// Result of the last successful setup.
struct Pipeline {
    generation: u64,
    /// Slot indices of enabled mods, in execution order.
    order: Vec<usize>,
    info: SphereInfo,
}

pub struct Pqs {
    radius: f64,
    slots: Vec<Option<ModEntry>>,
    generation: u64,
    pipeline: Option<Pipeline>,
}

impl std::fmt::Debug for Pqs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pqs")
            .field("radius", &self.radius)
            .field("mods", &self.len())
            .field("generation", &self.generation)
            .field("set_up", &self.is_set_up())
            .finish()
    }
}

impl Pqs {
    pub fn new(radius: f64) -> Self {
        Self { radius, slots: Vec::new(), generation: 0, pipeline: None }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.touch();
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn entry(&self, handle: ModHandle) -> Option<&ModEntry> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, handle: ModHandle) -> Option<&mut ModEntry> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    fn entries(&self) -> impl Iterator<Item = (ModHandle, &ModEntry)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| slot.as_ref().map(|e| (ModHandle(i), e)))
    }

    // ── Registration ─────────────────────────────────────────────────────────

    pub fn add_mod<M: PqsMod>(&mut self, settings: ModSettings, module: M) -> ModHandle {
        self.add_boxed(settings, Box::new(module))
    }

    pub fn add_boxed(&mut self, settings: ModSettings, module: Box<dyn PqsMod>) -> ModHandle {
        self.slots.push(Some(ModEntry { settings, module }));
        self.touch();
        ModHandle(self.slots.len() - 1)
    }

    /// Removes a mod, returning it. Other handles stay valid.
    pub fn remove_mod(&mut self, handle: ModHandle) -> Option<Box<dyn PqsMod>> {
        let entry = self.slots.get_mut(handle.0)?.take()?;
        self.touch();
        Some(entry.module)
    }

    /// Number of registered mods, enabled or not.
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn settings(&self, handle: ModHandle) -> Option<&ModSettings> {
        self.entry(handle).map(|e| &e.settings)
    }

    /// Returns false when the handle is stale.
    pub fn set_enabled(&mut self, handle: ModHandle, enabled: bool) -> bool {
        let Some(entry) = self.entry_mut(handle) else { return false };
        entry.settings.enabled = enabled;
        self.touch();
        true
    }

    /// Returns false when the handle is stale.
    pub fn set_order(&mut self, handle: ModHandle, order: i32) -> bool {
        let Some(entry) = self.entry_mut(handle) else { return false };
        entry.settings.order = order;
        self.touch();
        true
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn get_mod<T: PqsMod>(&self, handle: ModHandle) -> Option<&T> {
        self.entry(handle)?.module.as_ref().as_any().downcast_ref()
    }

    /// Mutable access to a mod's configuration. Invalidates the current setup.
    pub fn mod_mut<T: PqsMod>(&mut self, handle: ModHandle) -> Option<&mut T> {
        self.slots.get(handle.0)?.as_ref()?.module.as_ref().as_any().downcast_ref::<T>()?;
        self.touch();
        self.entry_mut(handle)?.module.as_mut().as_any_mut().downcast_mut()
    }

    /// All mods of type `T`, in registration order.
    pub fn mods_of_type<T: PqsMod>(&self) -> Vec<(ModHandle, &T)> {
        self.entries()
            .filter_map(|(h, e)| e.module.as_ref().as_any().downcast_ref::<T>().map(|m| (h, m)))
            .collect()
    }

    /// All mods of type `T` registered under `name`, in registration order.
    pub fn mods_by_name_and_type<T: PqsMod>(&self, name: &str) -> Vec<(ModHandle, &T)> {
        self.entries()
            .filter(|(_, e)| e.settings.name == name)
            .filter_map(|(h, e)| e.module.as_ref().as_any().downcast_ref::<T>().map(|m| (h, m)))
            .collect()
    }

    /// First mod of type `T` registered under `name`.
    pub fn mod_by_name<T: PqsMod>(&self, name: &str) -> Option<(ModHandle, &T)> {
        self.mods_by_name_and_type(name).into_iter().next()
    }

    // ── Pipeline ─────────────────────────────────────────────────────────────

    /// Sets up every enabled mod, fixes the execution order and aggregates
    /// the radius bounds. Must be called again after any change to the mods.
    pub fn setup_sphere(&mut self) -> Result<SphereInfo> {
        self.pipeline = None;
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PqsError::InvalidParameter { what: "sphere radius", value: self.radius });
        }

        let mut order = Vec::new();
        for (h, entry) in self.entries() {
            if entry.settings.enabled {
                order.push(h.0);
            } else {
                log::warn!("mod '{}' is disabled and will be skipped", entry.label());
            }
        }
        order.sort_by_key(|&i| self.slots[i].as_ref().map_or(0, |e| e.settings.order));

        let radius = self.radius;
        let (mut min_sum, mut max_sum) = (0.0, 0.0);
        for &i in &order {
            let Some(entry) = self.slots[i].as_mut() else { continue };
            if let Err(e) = entry.module.setup(radius) {
                return Err(PqsError::ModSetup { name: entry.label().to_string(), source: Box::new(e) });
            }
            let (lo, hi) = (entry.module.min_height(), entry.module.max_height());
            log::debug!(
                "set up mod '{}' ({}) order {}: height range [{lo}, {hi}]",
                entry.label(),
                entry.module.kind(),
                entry.settings.order
            );
            min_sum += lo;
            max_sum += hi;
        }

        let info = SphereInfo { radius, radius_min: radius + min_sum, radius_max: radius + max_sum };
        if !(info.radius_min <= info.radius_max) {
            return Err(PqsError::InvalidBounds { radius_min: info.radius_min, radius_max: info.radius_max });
        }
        log::info!(
            "sphere set up: radius {radius}, {} active mods, radius bounds [{}, {}]",
            order.len(),
            info.radius_min,
            info.radius_max
        );

        self.pipeline = Some(Pipeline { generation: self.generation, order, info });
        Ok(info)
    }

    fn current(&self) -> Result<&Pipeline> {
        self.pipeline.as_ref().filter(|p| p.generation == self.generation).ok_or(PqsError::NotSetUp)
    }

    fn active<'a>(&'a self, p: &'a Pipeline) -> impl Iterator<Item = &'a ModEntry> + 'a {
        p.order.iter().filter_map(move |&i| self.slots[i].as_ref())
    }

    pub fn is_set_up(&self) -> bool {
        self.current().is_ok()
    }

    /// Radius and bounds from the last setup, if it is still current.
    pub fn sphere_info(&self) -> Option<SphereInfo> {
        self.current().ok().map(|p| p.info)
    }

    /// Names of the active mods in execution order.
    pub fn pipeline_names(&self) -> Result<Vec<&str>> {
        let p = self.current()?;
        Ok(self.active(p).map(ModEntry::label).collect())
    }

    /// Runs every height hook, then every colour hook, for one direction.
    pub fn build_vertex(&self, direction: Vec3) -> Result<VertexBuildData> {
        let p = self.current()?;
        let len = direction.length();
        if !(len.is_finite() && len > 0.0) {
            return Err(PqsError::InvalidParameter { what: "vertex direction length", value: len });
        }

        let mut data = VertexBuildData::new(direction.normalize(), self.radius);
        for entry in self.active(p) {
            entry.module.build_height(&mut data, &p.info);
        }
        for entry in self.active(p) {
            entry.module.build_color(&mut data, &p.info);
        }
        Ok(data)
    }

    /// Builds many vertices; each result stands alone. Parallel with the
    /// `threading` feature.
    pub fn build_vertices(&self, directions: &[Vec3]) -> Vec<Result<VertexBuildData>> {
        #[cfg(feature = "threading")]
        let iter = directions.par_iter();
        #[cfg(not(feature = "threading"))]
        let iter = directions.iter();
        iter.map(|&d| self.build_vertex(d)).collect()
    }

    /// Samples a whole-globe equirectangular grid. Elevations are relative
    /// to the radius.
    pub fn build_heightfield(&self, width: usize, height: usize) -> Result<HeightField> {
        self.current()?;
        if width == 0 || height == 0 {
            return Err(PqsError::InvalidParameter { what: "heightfield size", value: (width * height) as f64 });
        }

        let mut hf = HeightField::flat(width, height);
        let directions: Vec<Vec3> = (0..height)
            .flat_map(|row| (0..width).map(move |col| (row, col)))
            .map(|(row, col)| {
                let (lat, lon) = hf.lat_lon(row, col);
                Vec3::from_latlon(lat, lon)
            })
            .collect();

        let vertices = self.build_vertices(&directions).into_iter().collect::<Result<Vec<_>>>()?;
        hf.data = vertices.iter().map(|v| (v.height - self.radius) as f32).collect();
        hf.colors = vertices.iter().map(|v| v.color).collect();
        log::debug!(
            "sampled {width}x{height} heightfield: elevation [{}, {}]",
            hf.min_elevation(),
            hf.max_elevation()
        );
        Ok(hf)
    }
}

use crate::bitmap_list::BitmapList;
use crate::cache::{CacheEntry, SliceCache};
use crate::config::MachineConfig;
use crate::error::EmitResult;
use crate::extruder::Extruder;
use crate::flood::label_islands;
use crate::gcode::CommandSink;
use crate::geom::{HalfPlane, Pt};
use crate::offset::offset;
use crate::poly::Polygon;
use crate::slice_bitmap::Material;
use crate::toolpath::Emitter;
use tracing::debug;

// Secondary cache index = 3 * material ordinal + kind. The raw layer list
// lives at ordinal 0.
pub const SUB_RAW: u32 = 0;
pub const SUB_PERIMETER: u32 = 1;
pub const SUB_INFILL: u32 = 2;
const SUB_KINDS: u32 = 3;

fn sub_index(material_ordinal: usize, kind: u32) -> u32 {
    material_ordinal as u32 * SUB_KINDS + kind
}

fn extruder_for(extruders: &[Extruder], material: Option<&Material>) -> usize {
    material
        .and_then(|m| extruders.iter().position(|ex| &ex.config().material == m))
        .unwrap_or(0)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LayerStats {
    pub materials: usize,
    pub perimeters: usize,
    pub infill_paths: usize,
}

/// Turns one layer of material bitmaps into extrusion paths.
///
/// Per material, in list order: select the extruder, extrude every island's
/// perimeters (outer boundaries before holes) traced half a nozzle width
/// inside the solid, then hatch infill one full width inside. Infill is
/// turned 90 degrees on odd layers.
pub struct LayerProducer {
    cache: SliceCache,
    // Holds a layer that falls below a full window, which the main cache
    // would evict as soon as it was inserted.
    scratch: SliceCache,
}

impl LayerProducer {
    pub fn new(cache_window: usize) -> Self {
        Self { cache: SliceCache::new(cache_window), scratch: SliceCache::new(1) }
    }

    pub fn from_machine(machine: &MachineConfig) -> Self {
        Self::new(machine.cache_window)
    }

    pub fn cache(&self) -> &SliceCache {
        &self.cache
    }

    /// Cache the layer's bitmaps and island insets. A layer already resident
    /// with the same content is left alone, along with anything derived from
    /// it.
    pub fn prepare(&mut self, layer: i64, bitmaps: &BitmapList, extruders: &[Extruder]) -> BitmapList {
        let layers = bitmaps.collapsed();
        let resident = self
            .cache
            .get(layer, SUB_RAW)
            .or_else(|| self.scratch.get(layer, SUB_RAW))
            .is_some_and(|e| e.bitmaps().same_content(&layers));
        if resident {
            return layers;
        }

        self.cache.insert(layer, SUB_RAW, layers.clone());
        let store = if self.cache.contains(layer, SUB_RAW) {
            &mut self.cache
        } else {
            debug!(layer = layer, window = self.cache.window(), "layer is below the cache window");
            self.scratch.clear();
            self.scratch.insert(layer, SUB_RAW, layers.clone());
            &mut self.scratch
        };
        for (m, bm) in layers.iter().enumerate() {
            let width = extruders
                .get(extruder_for(extruders, bm.material()))
                .map_or(0.0, |ex| ex.config().extrusion_width);
            let islands = label_islands(bm);
            debug!(layer = layer, material = m, islands = islands.len(), "labelled islands");

            let perimeters = BitmapList::from_bitmaps(islands.iter().map(|i| offset(i, -0.5 * width)));
            let infill = BitmapList::from_bitmaps(islands.iter().map(|i| offset(i, -width)));
            store.insert(layer, sub_index(m, SUB_PERIMETER), perimeters);
            store.insert(layer, sub_index(m, SUB_INFILL), infill);
        }
        layers
    }

    fn entry(&mut self, layer: i64, secondary: u32) -> Option<&mut CacheEntry> {
        if self.cache.contains(layer, secondary) {
            self.cache.get_mut(layer, secondary)
        } else {
            self.scratch.get_mut(layer, secondary)
        }
    }

    fn perimeter_paths(&mut self, layer: i64, m: usize, pixel: f64) -> Vec<Polygon> {
        let Some(entry) = self.entry(layer, sub_index(m, SUB_PERIMETER)) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for island in entry.contours() {
            let mut contours: Vec<_> = island.iter().collect();
            contours.sort_by_key(|c| c.is_hole);
            out.extend(contours.iter().map(|c| c.poly.simplify(pixel)));
        }
        out
    }

    fn infill_paths(&mut self, layer: i64, m: usize, sweep: &HalfPlane, gap: f64) -> Vec<Polygon> {
        match self.entry(layer, sub_index(m, SUB_INFILL)) {
            Some(entry) => entry.hatches(sweep, gap, true).iter().flatten().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Emit layer `layer` at height `z`.
    pub fn produce<S: CommandSink>(
        &mut self,
        layer: i64,
        z: f64,
        bitmaps: &BitmapList,
        em: &mut Emitter<S>,
    ) -> EmitResult<LayerStats> {
        em.starting_layer(layer, z)?;
        let layers = self.prepare(layer, bitmaps, em.extruders());

        let mut stats = LayerStats { materials: layers.len(), ..LayerStats::default() };
        let mut first = true;
        for (m, bm) in layers.iter().enumerate() {
            match bm.material() {
                Some(material) => em.select_material(material)?,
                None => em.select_extruder(0)?,
            }
            let index = em.selected_extruder().unwrap_or(0);
            let cfg = em.extruders()[index].config().clone();
            let pixel = bm.pixel_size().unwrap_or(0.0);

            for poly in self.perimeter_paths(layer, m, pixel) {
                em.plot_polygon(&poly, first)?;
                first = false;
                stats.perimeters += 1;
            }

            let turn = if layer.rem_euclid(2) == 1 { 90.0 } else { 0.0 };
            let sweep = HalfPlane::from_angle(Pt::default(), (cfg.infill_angle_deg + turn).to_radians());
            for poly in self.infill_paths(layer, m, &sweep, cfg.infill_gap) {
                em.plot_polygon(&poly, first)?;
                first = false;
                stats.infill_paths += 1;
            }
        }
        debug!(
            layer = layer,
            perimeters = stats.perimeters,
            infill = stats.infill_paths,
            "layer produced"
        );
        Ok(stats)
    }
}

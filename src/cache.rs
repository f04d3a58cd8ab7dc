use crate::bitmap_list::BitmapList;
use crate::geom::HalfPlane;
use crate::hatch::hatch;
use crate::poly::Polygon;
use crate::trace::{Contour, trace};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_CACHE_WINDOW: usize = 4;

/// Hatch parameters an entry's cached infill was computed with.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HatchKey {
    org_x: f64,
    org_y: f64,
    dir_x: f64,
    dir_y: f64,
    gap: f64,
    optimize: bool,
}

/// A cached bitmap list plus results derived from it on demand.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    bitmaps: BitmapList,
    contours: Option<Vec<Vec<Contour>>>,
    hatches: Option<(HatchKey, Vec<Vec<Polygon>>)>,
}

impl CacheEntry {
    fn new(bitmaps: BitmapList) -> Self {
        Self { bitmaps, contours: None, hatches: None }
    }

    pub fn bitmaps(&self) -> &BitmapList {
        &self.bitmaps
    }

    /// Contours of every bitmap, in list order. Traced on first use.
    pub fn contours(&mut self) -> &[Vec<Contour>] {
        let bitmaps = &self.bitmaps;
        self.contours
            .get_or_insert_with(|| bitmaps.iter().map(trace).collect())
    }

    /// Hatch paths of every bitmap, in list order. Recomputed only when the
    /// parameters change.
    pub fn hatches(&mut self, sweep: &HalfPlane, gap: f64, optimize: bool) -> &[Vec<Polygon>] {
        let key = HatchKey {
            org_x: sweep.org.x,
            org_y: sweep.org.y,
            dir_x: sweep.dir.x,
            dir_y: sweep.dir.y,
            gap,
            optimize,
        };
        if self.hatches.as_ref().is_none_or(|(k, _)| *k != key) {
            let paths = self
                .bitmaps
                .iter()
                .map(|bm| hatch(bm, sweep, gap, optimize))
                .collect();
            self.hatches = Some((key, paths));
        }
        match &self.hatches {
            Some((_, paths)) => paths.as_slice(),
            None => &[],
        }
    }
}

/// Sliding window of per-layer results keyed by (layer, sub-slice).
///
/// At most `window` distinct layers are resident; storing a new layer
/// beyond that evicts the lowest resident layer with all its sub-slices.
#[derive(Debug, Clone)]
pub struct SliceCache {
    window: usize,
    layers: BTreeMap<i64, BTreeMap<u32, CacheEntry>>,
}

impl Default for SliceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_WINDOW)
    }
}

impl SliceCache {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), layers: BTreeMap::new() }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Store (or replace) an entry, evicting whole layers past the window.
    pub fn insert(&mut self, primary: i64, secondary: u32, bitmaps: BitmapList) {
        self.layers
            .entry(primary)
            .or_default()
            .insert(secondary, CacheEntry::new(bitmaps));

        while self.layers.len() > self.window {
            if let Some((evicted, entries)) = self.layers.pop_first() {
                debug!(layer = evicted, entries = entries.len(), "slice cache evicted layer");
            }
        }
    }

    pub fn get(&self, primary: i64, secondary: u32) -> Option<&CacheEntry> {
        self.layers.get(&primary)?.get(&secondary)
    }

    pub fn get_mut(&mut self, primary: i64, secondary: u32) -> Option<&mut CacheEntry> {
        self.layers.get_mut(&primary)?.get_mut(&secondary)
    }

    pub fn contains(&self, primary: i64, secondary: u32) -> bool {
        self.get(primary, secondary).is_some()
    }

    /// Resident layers, lowest first.
    pub fn layers(&self) -> impl Iterator<Item = i64> + '_ {
        self.layers.keys().copied()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

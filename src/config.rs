use crate::error::ConfigError;
use crate::slice_bitmap::Material;
use serde::Deserialize;
use std::f64::consts::PI;

// Feed rates are mm/min; lengths are mm.

fn default_bed() -> f64 {
    200.0
}
fn default_max_feedrate_xy() -> f64 {
    6000.0
}
fn default_max_feedrate_z() -> f64 {
    300.0
}
fn default_fast_feedrate_xy() -> f64 {
    4800.0
}
fn default_skirt_gap() -> f64 {
    3.0
}
fn default_layer_height() -> f64 {
    0.2
}
fn default_pixel_size() -> f64 {
    0.1
}
fn default_cache_window() -> usize {
    crate::cache::DEFAULT_CACHE_WINDOW
}

fn default_extrusion_width() -> f64 {
    0.4
}
fn default_extrusion_height() -> f64 {
    0.2
}
fn default_feed_diameter() -> f64 {
    1.75
}
fn default_extrude_ratio() -> f64 {
    1.0
}
fn default_retraction_distance() -> f64 {
    1.0
}
fn default_retraction_feedrate() -> f64 {
    1800.0
}
fn default_max_extrude_feedrate() -> f64 {
    3000.0
}
fn default_extrusion_feedrate() -> f64 {
    1800.0
}
fn default_extra_extrude_first() -> f64 {
    0.5
}
fn default_extra_extrude_polygon() -> f64 {
    0.1
}
fn default_infill_gap() -> f64 {
    0.8
}
fn default_infill_angle_deg() -> f64 {
    45.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtruderConfig {
    pub material: Material,
    /// Physical hardware channel (tool number). Extruders sharing a channel
    /// share one physical state.
    #[serde(default)]
    pub channel: usize,
    #[serde(default = "default_extrusion_width")]
    pub extrusion_width: f64,
    #[serde(default = "default_extrusion_height")]
    pub extrusion_height: f64,
    #[serde(default = "default_feed_diameter")]
    pub feed_diameter: f64,
    #[serde(default = "default_extrude_ratio")]
    pub extrude_ratio: f64,
    #[serde(default = "default_retraction_distance")]
    pub retraction_distance: f64,
    #[serde(default = "default_retraction_feedrate")]
    pub retraction_feedrate: f64,
    #[serde(default)]
    pub lift: f64,
    /// Fastest XY feed rate while extruding.
    #[serde(default = "default_max_extrude_feedrate")]
    pub max_feedrate: f64,
    #[serde(default = "default_extrusion_feedrate")]
    pub extrusion_feedrate: f64,
    /// Priming length before the first extrusion of a layer.
    #[serde(default = "default_extra_extrude_first")]
    pub extra_extrude_first: f64,
    /// Priming length before every other extrusion.
    #[serde(default = "default_extra_extrude_polygon")]
    pub extra_extrude_polygon: f64,
    #[serde(default = "default_infill_gap")]
    pub infill_gap: f64,
    #[serde(default = "default_infill_angle_deg")]
    pub infill_angle_deg: f64,
}

impl ExtruderConfig {
    /// Cross-section area of the feedstock.
    pub fn feed_area(&self) -> f64 {
        let r = 0.5 * self.feed_diameter;
        PI * r * r
    }

    /// Feedstock length consumed per millimetre of deposited track.
    pub fn extrusion_per_mm(&self) -> f64 {
        self.extrusion_width * self.extrusion_height * self.extrude_ratio / self.feed_area()
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidExtruder { index, reason: reason.to_string() };
        if self.material.0.is_empty() {
            return Err(invalid("material name is empty"));
        }
        let positive = [
            ("extrusion_width", self.extrusion_width),
            ("extrusion_height", self.extrusion_height),
            ("feed_diameter", self.feed_diameter),
            ("extrude_ratio", self.extrude_ratio),
            ("max_feedrate", self.max_feedrate),
            ("extrusion_feedrate", self.extrusion_feedrate),
            ("retraction_feedrate", self.retraction_feedrate),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(invalid(&format!("{name} must be > 0, got {v}")));
            }
        }
        let non_negative = [
            ("retraction_distance", self.retraction_distance),
            ("lift", self.lift),
            ("extra_extrude_first", self.extra_extrude_first),
            ("extra_extrude_polygon", self.extra_extrude_polygon),
        ];
        for (name, v) in non_negative {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(&format!("{name} must be >= 0, got {v}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MachineConfig {
    #[serde(default = "default_bed")]
    pub bed_x: f64,
    #[serde(default = "default_bed")]
    pub bed_y: f64,
    #[serde(default = "default_bed")]
    pub bed_z: f64,
    #[serde(default = "default_max_feedrate_xy")]
    pub max_feedrate_xy: f64,
    #[serde(default = "default_max_feedrate_z")]
    pub max_feedrate_z: f64,
    /// Travel feed rate for non-extruding XY moves.
    #[serde(default = "default_fast_feedrate_xy")]
    pub fast_feedrate_xy: f64,
    #[serde(default)]
    pub dump_x: f64,
    #[serde(default)]
    pub dump_y: f64,
    /// Purge at the dump point on every extruder change.
    #[serde(default)]
    pub shield: bool,
    #[serde(default)]
    pub skirt: bool,
    #[serde(default = "default_skirt_gap")]
    pub skirt_gap: f64,
    #[serde(default = "default_layer_height")]
    pub layer_height: f64,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: f64,
    #[serde(default = "default_cache_window")]
    pub cache_window: usize,
    #[serde(default)]
    pub extruders: Vec<ExtruderConfig>,
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extruders.is_empty() {
            return Err(ConfigError::NoExtruders);
        }
        let positive = [
            ("bed_x", self.bed_x),
            ("bed_y", self.bed_y),
            ("bed_z", self.bed_z),
            ("max_feedrate_xy", self.max_feedrate_xy),
            ("max_feedrate_z", self.max_feedrate_z),
            ("fast_feedrate_xy", self.fast_feedrate_xy),
            ("layer_height", self.layer_height),
            ("pixel_size", self.pixel_size),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(ConfigError::InvalidMachine(format!("{name} must be > 0, got {v}")));
            }
        }
        if !(0.0..=self.bed_x).contains(&self.dump_x) || !(0.0..=self.bed_y).contains(&self.dump_y) {
            return Err(ConfigError::InvalidMachine(format!(
                "dump point ({}, {}) is off the bed",
                self.dump_x, self.dump_y
            )));
        }
        for (i, e) in self.extruders.iter().enumerate() {
            e.validate(i)?;
        }
        Ok(())
    }

    /// Index of the first extruder loaded with `material`.
    pub fn extruder_for_material(&self, material: &Material) -> Option<usize> {
        self.extruders.iter().position(|e| &e.material == material)
    }
}

/// Parse and validate a JSON machine description.
pub fn parse_machine_json(text: &str) -> Result<MachineConfig, ConfigError> {
    let cfg: MachineConfig = serde_json::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
}

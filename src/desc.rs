use crate::bitmap_list::BitmapList;
use crate::config::MachineConfig;
use crate::error::ConfigError;
use crate::geom::Pt;
use crate::mpoly::MPoly;
use crate::poly::Polygon;
use crate::slice_bitmap::Material;
use serde::Deserialize;

// x0, y0, x1, y1, ... in mm.
type FlatVerts = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolyDesc {
    pub exterior: FlatVerts,
    #[serde(default)]
    pub holes: Vec<FlatVerts>,
}

/// A prism of one material: the `mpoly` outline extruded from `bottom` to
/// `top` (mm).
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "PartDescRaw")]
pub struct PartDesc {
    pub material: Material,
    pub bottom: f64,
    pub top: f64,
    pub mpoly: MPoly,
}

#[derive(Debug, Clone, Deserialize)]
struct PartDescRaw {
    material: Material,
    #[serde(default)]
    bottom: f64,
    top: f64,
    #[serde(default)]
    mpoly: Vec<PolyDesc>,
}

fn ring(flat: &[f64]) -> Polygon {
    Polygon::closed(flat.chunks_exact(2).map(|c| Pt::new(c[0], c[1])).collect())
}

impl From<PartDescRaw> for PartDesc {
    fn from(raw: PartDescRaw) -> Self {
        let rings: Vec<Polygon> = raw
            .mpoly
            .iter()
            .flat_map(|pd| std::iter::once(&pd.exterior).chain(pd.holes.iter()))
            .map(|flat| ring(flat))
            .collect();
        Self {
            material: raw.material,
            bottom: raw.bottom,
            top: raw.top,
            mpoly: MPoly::from_polygons(&rings),
        }
    }
}

impl PartDesc {
    /// Whether a slice at height `z` cuts this part.
    pub fn spans(&self, z: f64) -> bool {
        z > self.bottom && z <= self.top
    }
}

/// A machine plus the parts to build on it.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDesc {
    pub machine: MachineConfig,
    #[serde(default)]
    pub parts: Vec<PartDesc>,
}

impl JobDesc {
    pub fn layer_count(&self) -> usize {
        let top = self.parts.iter().map(|p| p.top).fold(0.0, f64::max);
        (top / self.machine.layer_height).ceil().max(0.0) as usize
    }

    /// Height of the top of layer `layer`.
    pub fn layer_z(&self, layer: usize) -> f64 {
        (layer + 1) as f64 * self.machine.layer_height
    }

    /// Rasterize every part cut by layer `layer`, one entry per part.
    pub fn layer_bitmaps(&self, layer: usize) -> BitmapList {
        let z = self.layer_z(layer);
        BitmapList::from_bitmaps(
            self.parts
                .iter()
                .filter(|p| p.spans(z))
                .map(|p| p.mpoly.rasterize(self.machine.pixel_size, Some(p.material.clone()))),
        )
    }

    /// Outline of everything on the first layer.
    pub fn first_layer_outline(&self) -> MPoly {
        let z = self.layer_z(0);
        let paths = self
            .parts
            .iter()
            .filter(|p| p.spans(z))
            .flat_map(|p| p.mpoly.paths().iter().cloned())
            .collect();
        MPoly::new(paths)
    }
}

pub fn parse_job_json(text: &str) -> Result<JobDesc, ConfigError> {
    let job: JobDesc = serde_json::from_str(text)?;
    job.machine.validate()?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"{
        "machine": {
            "layer_height": 0.5,
            "pixel_size": 0.25,
            "extruders": [ { "material": "pla" }, { "material": "support", "channel": 1 } ]
        },
        "parts": [
            {
                "material": "pla",
                "top": 2.0,
                "mpoly": [ { "exterior": [10,10, 20,10, 20,20, 10,20],
                             "holes": [ [14,14, 16,14, 16,16, 14,16] ] } ]
            },
            {
                "material": "support",
                "bottom": 1.0,
                "top": 1.5,
                "mpoly": [ { "exterior": [30,10, 35,10, 35,15, 30,15] } ]
            }
        ]
    }"#;

    #[test]
    fn parts_become_rings() {
        let job = parse_job_json(JOB).unwrap();
        assert_eq!(job.parts.len(), 2);
        assert_eq!(job.parts[0].mpoly.len(), 2);
        assert_eq!(job.parts[1].bottom, 1.0);
        assert_eq!(job.layer_count(), 4);
    }

    #[test]
    fn layers_include_only_spanning_parts() {
        let job = parse_job_json(JOB).unwrap();
        let l0 = job.layer_bitmaps(0);
        assert_eq!(l0.len(), 1);
        // 40x40 pixels less the 8x8 hole.
        assert_eq!(l0.iter().next().unwrap().solid_count(), 1600 - 64);

        let l2 = job.layer_bitmaps(2);
        assert_eq!(l2.len(), 2);
        assert_eq!(l2.materials().len(), 2);
        assert!(job.layer_bitmaps(4).is_empty());
    }

    #[test]
    fn outline_covers_first_layer_parts() {
        let job = parse_job_json(JOB).unwrap();
        let outline = job.first_layer_outline();
        assert_eq!(outline.len(), 2);
        let b = outline.bbox();
        assert_eq!((b.x.lo, b.x.hi), (10.0, 20.0));
    }

    #[test]
    fn job_without_extruders_is_rejected() {
        let err = parse_job_json(r#"{ "machine": {}, "parts": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoExtruders));
    }
}

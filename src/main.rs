use rslice::bitmap_list::BitmapList;
use rslice::desc::{JobDesc, parse_job_json};
use rslice::gcode::GCodeWriter;
use rslice::producer::LayerProducer;
use rslice::toolpath::Emitter;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const TEST_JSON: &str = r#"
    {
        "machine": {
            "bed_x": 200, "bed_y": 200, "bed_z": 150,
            "dump_x": 0, "dump_y": 100,
            "shield": true,
            "skirt": true,
            "layer_height": 0.2,
            "pixel_size": 0.1,
            "extruders": [
                { "material": "pla", "channel": 0, "lift": 0.3 },
                { "material": "support", "channel": 1, "infill_gap": 1.6 }
            ]
        },
        "parts": [
            {
                "material": "pla",
                "top": 2.0,
                "mpoly": [
                    {
                        "exterior": [60,60, 100,60, 100,100, 60,100],
                        "holes": [ [75,75, 85,75, 85,85, 75,85] ]
                    }
                ]
            },
            {
                "material": "support",
                "top": 1.0,
                "mpoly": [ { "exterior": [110,60, 130,60, 130,80, 110,80] } ]
            }
        ]
    }
"#;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).compact())
        .with(filter)
        .init();
}

// Set RSLICE_PNG_DIR to dump every layer's solid as a PNG.
#[cfg(feature = "im-io")]
fn dump_layer_png(layer: usize, bitmaps: &BitmapList) -> Result<(), Box<dyn Error>> {
    if let Ok(dir) = std::env::var("RSLICE_PNG_DIR") {
        let path = std::path::Path::new(&dir).join(format!("layer_{layer:04}.png"));
        bitmaps.flatten().save_png(&path)?;
    }
    Ok(())
}

#[cfg(not(feature = "im-io"))]
fn dump_layer_png(_layer: usize, _bitmaps: &BitmapList) -> Result<(), Box<dyn Error>> {
    Ok(())
}

fn run<W: Write>(job: &JobDesc, out: W) -> Result<(), Box<dyn Error>> {
    let mut em = Emitter::new(job.machine.clone(), GCodeWriter::new(out))?;
    let mut producer = LayerProducer::from_machine(&job.machine);

    em.start_run(Some(&job.first_layer_outline()))?;
    for layer in 0..job.layer_count() {
        let bitmaps = job.layer_bitmaps(layer);
        dump_layer_png(layer, &bitmaps)?;
        let stats = producer.produce(layer as i64, job.layer_z(layer), &bitmaps, &mut em)?;
        info!(
            layer = layer,
            materials = stats.materials,
            perimeters = stats.perimeters,
            infill = stats.infill_paths,
            "layer done"
        );
    }
    em.terminate()?;
    info!(
        lines = em.sink().lines(),
        extruded_mm = em.total_extruded(),
        "finished"
    );
    Ok(())
}

// Usage: rslice [job.json] [out.gcode]
// With no job the built-in demo part is sliced; with no output path the
// G-code goes to stdout.
fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let job = match args.next() {
        Some(path) => parse_job_json(&std::fs::read_to_string(path)?)?,
        None => parse_job_json(TEST_JSON)?,
    };
    info!(parts = job.parts.len(), layers = job.layer_count(), "job loaded");

    match args.next() {
        Some(path) => run(&job, BufWriter::new(File::create(path)?)),
        None => run(&job, io::stdout().lock()),
    }
}

//! Geometry inspector: builds a geometry file and prints its volume tree.
//!
//! Usage:
//! ```text
//! cargo run --example inspect                                   # bundled liquid-xenon setup
//! cargo run --example inspect -- path/to/geometry.json
//! cargo run --example inspect -- geometry.json materials.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use detgeom::placement::PlacementId;
use detgeom::{BuiltGeometry, Detector, NistLibrary};

fn main() -> ExitCode {
    // Default: WARN for everything, INFO for detgeom.
    // Override with RUST_LOG env var (e.g. RUST_LOG=detgeom=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("detgeom=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let geometry_file = args.next().map_or_else(
        || PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/inspect/lxe_geometry.json"),
        PathBuf::from,
    );
    let mut detector = Detector::new(geometry_file);
    if let Some(materials) = args.next() {
        detector = detector.with_materials_file(materials);
    }

    match detector.construct(&NistLibrary::new()) {
        Ok(geometry) => {
            print_tree(&geometry, geometry.world, 0);
            for warning in &geometry.warnings {
                println!("warning: {warning}");
            }
            for (collection, volumes) in &geometry.hits_collections {
                let names: Vec<&str> = volumes.iter().map(String::as_str).collect();
                println!("hits collection {collection}: {}", names.join(", "));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_tree(geometry: &BuiltGeometry, id: PlacementId, depth: usize) {
    let Ok(placement) = geometry.store.placement(id) else {
        return;
    };
    let Ok(volume) = geometry.store.volume(placement.volume) else {
        return;
    };
    let material = geometry
        .store
        .material(volume.material)
        .map_or("?", |m| m.name.as_str());
    let t = placement.transform.translation.vector;
    println!(
        "{:indent$}{} [{}] in {material} at ({:.1}, {:.1}, {:.1}) mm{}",
        "",
        placement.name,
        volume.name,
        t.x,
        t.y,
        t.z,
        volume
            .sensitive
            .as_deref()
            .map_or_else(String::new, |c| format!(" -> {c}")),
        indent = depth * 2
    );
    for daughter in &volume.daughters {
        print_tree(geometry, *daughter, depth + 1);
    }
}

use anyhow::{anyhow, Result};
use glam::{DMat4, DVec3};
use std::path::PathBuf;

use avatar_rig::convert::shapes::DEFAULT_SHAPE_COLLECTION;
use avatar_rig::logging;
use avatar_rig::{
    export_shapes_to_file, export_shapes_to_json, load_shapes_file, parse_rig_file, Rig,
    ShapeExportConfig,
};

const HELP: &str = "\
avatar-rig

USAGE:
  avatar-rig transform --rig FILE [--shapes FILE] JOINT
  avatar-rig joints --rig FILE CONTROLLER...
  avatar-rig move --rig FILE [--shapes FILE] --delta X,Y,Z [--out FILE] JOINT
  avatar-rig shapes --rig FILE --shapes FILE [--out FILE]

OPTIONS:
  --rig FILE          JSON with 'hierarchy' and/or 'controllers' arrays
  --shapes FILE       JSON with custom shapes applied as local joint offsets
  --collection NAME   Name of the shape array [default: shapes]
  --full-names        Export full joint paths instead of short names
  --out FILE          Write exported shapes here instead of stdout
  --log-level LEVEL   off, error, warn, info, debug or trace [default: $RUST_LOG or warn]
  -h, --help          Print help
";

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{}", HELP);
        return Ok(());
    }

    let log_level: Option<String> = args.opt_value_from_str("--log-level")?;
    let env_level = std::env::var(logging::LOG_LEVEL_ENV).ok();
    logging::init(logging::level_from(
        log_level.as_deref(),
        env_level.as_deref(),
    ))?;

    let command = args
        .subcommand()?
        .ok_or_else(|| anyhow!("Missing command\n\n{}", HELP))?;

    let rig_path: PathBuf = args.value_from_str("--rig")?;
    let shapes_path: Option<PathBuf> = args.opt_value_from_str("--shapes")?;
    let collection: String = args
        .opt_value_from_str("--collection")?
        .unwrap_or_else(|| DEFAULT_SHAPE_COLLECTION.to_string());
    let export_config = ShapeExportConfig {
        collection: collection.clone(),
        full_names: args.contains("--full-names"),
    };

    let mut rig = parse_rig_file(&rig_path)?;
    if let Some(path) = &shapes_path {
        load_shapes_file(&mut rig.hierarchy, path, &collection)?;
    }

    match command.as_str() {
        "transform" => {
            let joint: String = args.free_from_str()?;
            finish(args)?;
            print_transform(&mut rig, &joint)
        }
        "joints" => {
            let controllers = remaining(args)?;
            if controllers.is_empty() {
                return Err(anyhow!("No controllers given"));
            }
            for joint in rig.controllers.get_joints(&controllers)? {
                println!("{}", joint);
            }
            Ok(())
        }
        "move" => {
            let delta: DVec3 = args.value_from_fn("--delta", parse_vec3)?;
            let out: Option<PathBuf> = args.opt_value_from_str("--out")?;
            let joint: String = args.free_from_str()?;
            finish(args)?;

            let name = rig.hierarchy.resolve_name(&joint)?.to_string();
            if !rig.hierarchy.has_local_transform(&name) {
                rig.hierarchy.reset_local_transform(&name)?;
            }
            rig.hierarchy.move_joint(&name, delta.x, delta.y, delta.z)?;
            write_shapes(&rig, out, &export_config)
        }
        "shapes" => {
            if shapes_path.is_none() {
                return Err(anyhow!("The shapes command requires --shapes"));
            }
            let out: Option<PathBuf> = args.opt_value_from_str("--out")?;
            finish(args)?;
            write_shapes(&rig, out, &export_config)
        }
        other => Err(anyhow!("Unknown command '{}'\n\n{}", other, HELP)),
    }
}

fn print_transform(rig: &mut Rig, joint: &str) -> Result<()> {
    let name = rig.hierarchy.resolve_name(joint)?.to_string();

    // Without a custom shape the bind pose transform is the answer.
    let matrix = if rig.hierarchy.has_local_transform(&name) {
        rig.hierarchy.get_combined_transform(&name)?
    } else {
        rig.hierarchy.resolve_global_transform(&name)?
    };

    println!("{}", name);
    print_matrix(&matrix);
    Ok(())
}

fn print_matrix(m: &DMat4) {
    for row in 0..4 {
        let r = m.row(row);
        println!("{:>14.6} {:>14.6} {:>14.6} {:>14.6}", r.x, r.y, r.z, r.w);
    }
}

fn write_shapes(rig: &Rig, out: Option<PathBuf>, config: &ShapeExportConfig) -> Result<()> {
    match out {
        Some(path) => {
            let count = export_shapes_to_file(&rig.hierarchy, &path, config)?;
            eprintln!("Wrote {} shapes to {}", count, path.display());
        }
        None => println!("{}", export_shapes_to_json(&rig.hierarchy, config)?),
    }
    Ok(())
}

fn parse_vec3(s: &str) -> Result<DVec3, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        _ => Err(format!("expected X,Y,Z but got {} values", values.len())),
    }
}

fn remaining(args: pico_args::Arguments) -> Result<Vec<String>> {
    args.finish()
        .into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|arg| anyhow!("Argument is not valid UTF-8: {:?}", arg))
        })
        .collect()
}

fn finish(args: pico_args::Arguments) -> Result<()> {
    let rest = args.finish();
    if !rest.is_empty() {
        return Err(anyhow!("Unexpected arguments: {:?}", rest));
    }
    Ok(())
}

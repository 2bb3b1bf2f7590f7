//! xformstack CLI - Inspect and edit transform op stacks stored as JSON prims.

use std::env;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use xformstack::prelude::*;

/// Verbosity selected on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Debug,
    Trace,
}

fn init_logging(verbosity: Verbosity, settings: &Settings) {
    let directive = match verbosity {
        Verbosity::Quiet => "warn".to_string(),
        Verbosity::Normal => settings.log_filter.clone(),
        Verbosity::Debug => "debug".to_string(),
        Verbosity::Trace => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = Verbosity::Normal;
    let mut settings_path = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Debug,
            "-vv" | "--trace" => verbosity = Verbosity::Trace,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            "--settings" => settings_path = iter.next().map(String::as_str),
            _ => filtered_args.push(arg),
        }
    }

    let settings = match settings_path {
        Some(path) => match Settings::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to load settings {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };
    init_logging(verbosity, &settings);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "i" | "info" => cmd_info(&filtered_args[1..], &settings),
        "e" | "edit" => cmd_edit(&filtered_args[1..], &settings),
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other if Path::new(other).exists() => cmd_info(&filtered_args, &settings),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("xformstack - transform op stack toolkit");
    println!("built {} {}", env!("XFORMSTACK_BUILD_DATE"), env!("XFORMSTACK_BUILD_TIME"));
    println!();
    println!("USAGE:");
    println!("    xformstack [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info <prim.json> [--time T]      Show the op stack and its decomposition");
    println!("    e, edit <prim.json> [EDITS] [--out <file>]");
    println!("                                        Apply host edits and write them back");
    println!("    h, help                             Show this help");
    println!();
    println!("EDITS (values are x,y,z; rotations in degrees):");
    println!("    --translate, --rotate, --scale, --shear, --rotate-pivot, --scale-pivot");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose       Debug output");
    println!("    -vv, --trace        Trace output");
    println!("    -q, --quiet         Warnings and errors only");
    println!("    --settings <file>   Load reconciler settings from JSON");
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_info(args: &[&str], settings: &Settings) -> Result<()> {
    let path = args.first().ok_or_else(|| anyhow!("missing prim file\nUsage: xformstack info <prim.json> [--time T]"))?;
    let mut time = TimeCode::Default;
    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match *arg {
            "--time" | "-t" => {
                let value = rest.next().ok_or_else(|| anyhow!("--time needs a value"))?;
                time = TimeCode::At(value.parse().with_context(|| format!("bad time {:?}", value))?);
            }
            other => bail!("unexpected argument {:?}", other),
        }
    }

    info!("Opening prim: {}", path);
    let prim = MemoryPrim::load(path).with_context(|| format!("failed to load {}", path))?;
    let mut xform = TransformationMatrix::with_settings(settings);
    xform.bind(prim);
    xform.update_to_time(time);

    let Some(prim) = xform.prim() else {
        bail!("{} is not a valid prim", path);
    };
    println!("Prim: {}", prim.name());
    println!("  schema: {}", xform.schema().unwrap_or("<none, raw matrix>"));
    println!("  inherits transform: {}", xform.derived_state().inherits_transform);
    println!("  animated: {}", xform.has_animation());
    println!("  ops:");
    for (i, entry) in xform.entries().iter().enumerate() {
        let value = prim.get(&entry.op, time);
        println!("    [{i}] {:<44} {:<22} {:?}", entry.op.op_name(), entry.class.slot.name(), value);
    }

    let d = xform.decomposed();
    let euler = d.rotation.to_degrees();
    println!("  decomposed:");
    print_vec("translate", d.translation);
    print_vec("rotatePivotTranslate", d.rotate_pivot_translation);
    print_vec("rotatePivot", d.rotate_pivot);
    println!("    {:<22} ({:.4}, {:.4}, {:.4}) {}", "rotate", euler.x, euler.y, euler.z, d.rotation.order);
    print_vec("scalePivotTranslate", d.scale_pivot_translation);
    print_vec("scalePivot", d.scale_pivot);
    print_vec("shear", d.shear);
    print_vec("scale", d.scale);
    println!("  local matrix:");
    print_matrix(&xform.as_matrix());
    Ok(())
}

fn cmd_edit(args: &[&str], settings: &Settings) -> Result<()> {
    let path = args.first().ok_or_else(|| anyhow!("missing prim file\nUsage: xformstack edit <prim.json> [EDITS] [--out <file>]"))?;
    let prim = MemoryPrim::load(path).with_context(|| format!("failed to load {}", path))?;
    let mut xform = TransformationMatrix::with_settings(settings);
    xform.bind(prim);
    if !xform.is_bound() {
        bail!("{} is not a valid prim", path);
    }
    xform.enable_push_to_prim(true)?;
    if !xform.push_to_prim_enabled() {
        tracing::warn!("{} is animated, edits are not written back", path);
    }

    let mut out = path.to_string();
    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        if *flag == "--out" || *flag == "-o" {
            out = rest.next().ok_or_else(|| anyhow!("--out needs a path"))?.to_string();
            continue;
        }
        let raw = rest.next().ok_or_else(|| anyhow!("{} needs a value", flag))?;
        let v = parse_vec(raw)?;
        debug!("edit {} {:?}", flag, v);
        match *flag {
            "--translate" => xform.translate_to(v)?,
            "--rotate" => {
                let order = xform.rotation_order();
                xform.rotate_to(EulerRotation::from_degrees(v, order))?
            }
            "--scale" => xform.scale_to(v)?,
            "--shear" => xform.shear_to(v)?,
            "--rotate-pivot" => xform.set_rotate_pivot(v, false)?,
            "--scale-pivot" => xform.set_scale_pivot(v, false)?,
            other => bail!("unknown edit {:?}", other),
        }
    }

    let prim = xform.prim().ok_or_else(|| anyhow!("prim was unbound"))?;
    prim.save(&out).with_context(|| format!("failed to write {}", out))?;
    info!("Wrote {} ({})", out, prim.op_order_names().join(" "));
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_vec(s: &str) -> Result<DVec3> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("bad vector {:?}", s))?;
    match parts.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        [v] => Ok(DVec3::splat(*v)),
        _ => bail!("expected x,y,z, got {:?}", s),
    }
}

fn print_vec(label: &str, v: DVec3) {
    println!("    {:<22} ({:.4}, {:.4}, {:.4})", label, v.x, v.y, v.z);
}

fn print_matrix(m: &DMat4) {
    // rows as stored in scene files
    for row in m.to_cols_array_2d() {
        println!("    [{:>10.4} {:>10.4} {:>10.4} {:>10.4}]", row[0], row[1], row[2], row[3]);
    }
}

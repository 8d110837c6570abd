//! Round-trip check for a randomly generated std430 structure
//!
//! Builds a random root composite, prints the compute shader that would fill
//! it, simulates the invocations on the host, packs every instance into one
//! buffer, reads them back into fresh shapes and compares.
//!
//! Usage: struct_roundtrip [CONFIG.toml] [--seed N] [--shader] [--report] [--json]

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use struct_layout::report::first_word_difference;
use struct_layout::shader::{instance_stride, pack_instances, simulate_invocations, unpack_instances};
use struct_layout::{
    generate_compute_shader, generate_structure, HarnessConfig, LayoutReport, PushConstants,
    StructGenerator,
};

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    seed: Option<u64>,
    shader: bool,
    report: bool,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--shader" => args.shader = true,
            "--report" => args.report = true,
            "--json" => args.json = true,
            "--seed" => {
                let value = it.next().context("--seed needs a value")?;
                args.seed = Some(value.parse().with_context(|| format!("bad seed '{}'", value))?);
            }
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            path => args.config = Some(path.to_string()),
        }
    }
    Ok(args)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run() {
        Ok(true) => log::info!("Round trip passed"),
        Ok(false) => {
            log::error!("Round trip failed");
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Round trip aborted: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run() -> Result<bool> {
    let args = parse_args()?;
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path).with_context(|| format!("loading {}", path))?,
        None => HarnessConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let sg = StructGenerator::new();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let generated = generate_structure(&config.random, &mut rng)?;
    let root = &generated.root;
    let invocations = generated.open_array_len;

    let code = generate_compute_shader(&sg, root, invocations, &config.shader)?;
    println!("Shader line count: {}", code.lines().count());
    if args.shader {
        println!("{}", code);
    }

    if args.report || args.json {
        let report = LayoutReport::capture(root)?;
        if args.json {
            println!("{}", report.to_json()?);
        } else {
            print!("{}", report.visualize());
        }
    }

    let pc = PushConstants::new(config.value_seed, root);
    let stride = instance_stride(root, config.instance_alignment)?;
    log::info!(
        "Seed {}: {} ({} bytes, stride {}), {} leaves, {} invocations, push constants {:?}",
        config.seed,
        root.describe(),
        root.logical_size(),
        stride,
        pc.visits,
        invocations,
        pc
    );

    // What the dispatched shader writes
    let expected = simulate_invocations(root, invocations, pc.seed);
    let device_buffer = pack_instances(&sg, &expected, stride)?;

    let observed = unpack_instances(&sg, root, &device_buffer, expected.len(), stride)?;

    let mut passed = true;
    for (i, (actual, wanted)) in observed.iter().zip(&expected).enumerate() {
        let result = sg.compare(actual, wanted);
        let same_text = sg.values_string(actual)? == sg.values_string(wanted)?;
        if !result.is_equal() || !same_text {
            passed = false;
            log::error!("Instance {} differs:\n{}", i, result);
        }
    }

    let host_buffer = pack_instances(&sg, &observed, stride)?;
    if let Some(word) = first_word_difference(&device_buffer, &host_buffer) {
        passed = false;
        log::error!("First difference at word {}, byte {}", word, word * 4);
    }

    Ok(passed)
}

use std::time::Instant;

use env_logger::{Builder, Target};
use log::LevelFilter;

use hprof_graph::args::get_args;
use hprof_graph::errors::HprofGraphError;
use hprof_graph::slurp::slurp_file;
use hprof_graph::utils::pretty_bytes_size;

/// Log lines go to stderr so they do not mix with the report, `RUST_LOG` still applies.
fn init_logger(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(Target::Stderr)
        .format_timestamp(None)
        .init();
}

fn main() {
    std::process::exit(match main_result() {
        Ok(_) => 0,
        Err(HprofGraphError::ClapError { e }) => e.exit(),
        Err(err) => {
            eprintln!("error: {}", err);
            1
        }
    });
}

fn main_result() -> Result<(), HprofGraphError> {
    let now = Instant::now();
    let args = get_args()?;
    init_logger(args.debug);

    let dump = slurp_file(&args.file_path, &args.options)?;
    let snapshot = dump.snapshot();
    println!("{}", snapshot.render_summary());

    let histogram = snapshot.instance_histogram();
    println!("\nTop {} classes by instance count:", args.top);
    for entry in histogram.iter().take(args.top) {
        println!(
            "{:>10} instances {:>12} {}",
            entry.instances,
            pretty_bytes_size(entry.data_bytes),
            entry.class_name
        );
    }

    if dump.is_incomplete() {
        println!("\nThe dump is truncated, references to missing objects are expected.");
    }
    println!("\nFile decoded in {} ms", now.elapsed().as_millis());
    Ok(())
}

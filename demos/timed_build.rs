//! Time a few build phases and print where the records went
//!
//! ```text
//! BT_INIT=1 BT_DIR=/tmp RUST_LOG=bt=debug cargo run --example timed_build
//! ```

use anyhow::Result;
use bt::RecordNames;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn compile(unit: &str) -> Result<usize> {
    std::thread::sleep(std::time::Duration::from_millis(5));
    Ok(unit.len())
}

fn main() -> Result<()> {
    init_tracing();

    let config = bt::Config::from_env();
    if !bt::is_active() {
        eprintln!("BT_INIT is not set; nothing will be recorded");
    }

    bt::start("build")?;
    let mut total = 0;
    for unit in ["parser", "checker", "codegen"] {
        total += bt::try_time("compile-unit", || compile(unit))?;
    }
    let linked = bt::time("link", || total * 2)?;
    bt::end("build")?;

    println!("linked {linked} bytes");
    for name in ["build", "compile-unit", "link"] {
        let session = config
            .record_dir()
            .join(RecordNames::for_event(name).session());
        println!("{name:>13}: {}", session.display());
    }
    Ok(())
}

//! env_logger setup for applications and tests embedding the crate

use log::LevelFilter;

const LOG_TARGETS: &[&str] = &["localmind", "reqwest", "hyper"];

/// Log at `level` for this crate and its HTTP stack.
/// Safe to call more than once; later calls are ignored.
pub fn init(level: LevelFilter)
{   let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    for target in LOG_TARGETS
    {   builder.filter_module(target, level);
    }
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

/// Configure from `RUST_LOG`, defaulting to `info`
pub fn init_from_env()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .try_init();
}

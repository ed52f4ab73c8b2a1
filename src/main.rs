use std::fs;

use anyhow::Context;
use cache_sim::{
    config::{CacheConfig, Mapping, Organization},
    sim::Simulator,
    stats::Report,
    trace::Trace,
};

const USAGE: &str = "\
Usage: cache_sim [OPTIONS] [cache size: 128-4096] [cache mapping: dm|fa] [cache organization: uc|sc]

Options:
  -t <path>          trace file, .xz traces are decompressed (default: mem_trace.txt)
  -p <path>          read the cache config from a JSON file instead
  --config <json>    inline JSON cache config
  --json <path>      also write the report as JSON
  -w <n>             warmup accesses left out of the stats (default: 0)
  -h <n>             log progress every n accesses, 0 disables (default: 0)
  --buffer-size <n>  accesses per trace batch (default: 16384)
  --queue-size <n>   trace batches in flight (default: 32)
  -v                 verbose logging
  --help             print this message
";

fn main() -> anyhow::Result<()> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains("--help") {
        print!("{USAGE}");
        return Ok(());
    }

    let filter = if args.contains("-v") { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let n_warm: u64 = args
        .opt_value_from_str("-w")
        .context("-w should be an integer")?
        .unwrap_or(0);
    let heartbeat_int: u64 = args
        .opt_value_from_str("-h")
        .context("-h should be an integer")?
        .unwrap_or(0);
    let accesses_per_batch: usize = args
        .opt_value_from_str("--buffer-size")
        .context("--buffer-size must be an integer")?
        .unwrap_or(1024 * 16);
    let batches_per_queue: usize = args
        .opt_value_from_str("--queue-size")
        .context("--queue-size must be an integer")?
        .unwrap_or(32);
    let trace_path: String = args
        .opt_value_from_str("-t")?
        .unwrap_or_else(|| "mem_trace.txt".to_owned());
    let stats_path: Option<String> = args.opt_value_from_str("--json")?;

    let config = read_config(&mut args)?;

    let unused = args.finish();
    if !unused.is_empty() {
        log::warn!("Ignoring unused arguments: {unused:?}");
    }

    log::info!(
        "Cache {}: {} blocks, {} index bits, {} tag bits",
        config.label(),
        config.n_blocks(),
        config.index_bits(),
        config.tag_bits()
    );

    let trace = Trace::read(trace_path.clone().into(), accesses_per_batch, batches_per_queue)
        .with_context(|| format!("unable to open the trace file {trace_path}"))?;

    let mut sim = Simulator::new(config.to_cache(), n_warm, heartbeat_int);
    for batch in trace.rec.iter() {
        sim.operate(&batch?);
    }
    log::info!("Ran {} accesses", sim.processed());

    let report = sim.report();
    if report.hit_rate.is_none() {
        log::warn!("No accesses were counted, hit rate is undefined");
    }
    print!("{report}");

    if let Some(stats_path) = stats_path {
        write_report(&stats_path, &report)?;
    }

    Ok(())
}

/// Cache config from `--config <json>`, `-p <path>`, or the three positionals, in that order.
fn read_config(args: &mut pico_args::Arguments) -> anyhow::Result<CacheConfig> {
    if let Some(config_str) = args.opt_value_from_str::<_, String>("--config")? {
        return Ok(CacheConfig::from_json(&config_str)?);
    }
    if let Some(config_path) = args.opt_value_from_str::<_, String>("-p")? {
        let config_str = fs::read_to_string(&config_path)
            .with_context(|| format!("could not read config file {config_path}"))?;
        return Ok(CacheConfig::from_json(&config_str)?);
    }

    let size: u32 = args.free_from_str().context(USAGE)?;
    let mapping: Mapping = args.free_from_str()?;
    let organization: Organization = args.free_from_str()?;
    Ok(CacheConfig::new(size, mapping, organization)?)
}

fn write_report(stats_path: &str, report: &Report) -> anyhow::Result<()> {
    let stats_file = fs::File::create(stats_path)
        .with_context(|| format!("cannot open output file {stats_path}"))?;
    serde_json::to_writer_pretty(stats_file, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsString, io::Write};

    use cache_sim::stats::Stats;

    use super::*;

    fn args(list: &[&str]) -> pico_args::Arguments {
        pico_args::Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    #[test]
    fn positional_config() {
        let mut args = args(&["2048", "fa", "sc"]);
        let config = read_config(&mut args).unwrap();
        assert_eq!(config.size, 2048);
        assert_eq!(config.mapping, Mapping::FullyAssociative);
        assert_eq!(config.organization, Organization::Split);
        assert!(args.finish().is_empty());
    }

    #[test]
    fn positional_config_errors() {
        assert!(read_config(&mut args(&[])).is_err());
        assert!(read_config(&mut args(&["1024", "xx", "uc"])).is_err());
        assert!(read_config(&mut args(&["1000", "dm", "uc"])).is_err());
    }

    #[test]
    fn inline_json_wins_over_positionals() {
        let mut args = args(&[
            "--config",
            r#"{"size": 256, "mapping": "dm", "org": "sc"}"#,
            "4096",
            "fa",
            "uc",
        ]);
        let config = read_config(&mut args).unwrap();
        assert_eq!(config.label(), "256 dm sc");
        assert_eq!(args.finish().len(), 3);
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"size": 512, "mapping": "fa", "organization": "uc"}}"#).unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap();
        let config = read_config(&mut args(&["-p", path])).unwrap();
        assert_eq!(config.label(), "512 fa uc");

        assert!(read_config(&mut args(&["-p", "/nonexistent/config.json"])).is_err());
    }

    #[test]
    fn writes_json_report() {
        let config = CacheConfig::new(128, Mapping::DirectMapped, Organization::Unified).unwrap();
        let mut stats = Stats::default();
        stats.record_access();
        stats.record_access();
        stats.record_hit();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let path = path.to_str().unwrap();
        write_report(path, &stats.report(&config)).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["name"], "128 dm uc");
        assert_eq!(json["accesses"], 2);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["hit_rate"], 0.5);
    }
}

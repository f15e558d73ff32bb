use clap::Parser;
use tracepost::config::Config;
use tracepost::emitter::UdpEmitter;
use tracepost::trace::Segment;
use tracepost::Result;
use tracing::info;

/// Resolve the configured daemon endpoint and fire one probe segment at it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<String>,
}

/// `TRACEPOST_DAEMON_ADDRESS` overrides the configured address.
async fn run(args: Args) -> Result<()> {
    let mut config = match args.config {
        Some(path) => Config::load_json_file(path)?,
        None => Config::default(),
    };
    config.apply_env();

    let endpoint = config.daemon.to_endpoint()?;
    info!(%endpoint, service = config.service_name, "daemon endpoint resolved");

    let emitter = UdpEmitter::bind(endpoint)?;

    let mut segment = Segment::begin(config.service_name.clone());
    segment.annotate("probe", true);
    segment.end();
    emitter.emit(&segment).await?;
    info!(trace_id = %segment.trace_id, id = %segment.id, "probe segment emitted");

    // Let the background sender drain before the cancel lands.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    emitter.shutdown().await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .init();

    if let Err(err) = run(args).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_config_path() {
        let args = Args::try_parse_from(["tracepost"]).unwrap();
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["tracepost", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("/tmp/c.json"));

        let args = Args::try_parse_from(["tracepost", "-c", "c.json"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("c.json"));
    }
}

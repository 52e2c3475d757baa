use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use packet_dashboard::{
    aggregator::Aggregator,
    app::Dashboard,
    listener::Listener,
    presenter::Presenter,
    settings::Config,
    ui::TerminalBackend,
    utils::CancellationToken,
};
use std::fs::File;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "packet-dashboard")]
#[command(about = "Live TUI dashboard for packet records sent by a local sniffer")]
struct Cli {
    #[arg(short, long, help = "Address to receive packet records on (default 127.0.0.1:5005)")]
    bind: Option<String>,

    #[arg(short, long, help = "Configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Number of packets kept in the live table")]
    history: Option<usize>,

    #[arg(short, long, help = "Enable debug logging")]
    debug: bool,

    #[arg(long, help = "Write debug log to this file instead of stderr")]
    log_file: Option<String>,
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    if !cli.debug {
        return Ok(());
    }

    let env = env_logger::Env::default().default_filter_or("debug");
    let mut builder = env_logger::Builder::from_env(env);
    // The TUI owns the terminal, so a log file keeps the screen clean.
    if let Some(path) = &cli.log_file {
        let file = File::create(path).with_context(|| format!("cannot create log file {}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_addr = bind.clone();
    }
    if let Some(history) = cli.history {
        config.history.capacity = history;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(&cli)?;
    let config = load_config(&cli)?;

    let token = CancellationToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || token.cancel()).context("cannot install interrupt handler")?;
    }

    // Bind before touching the terminal so a bind failure prints a plain diagnostic.
    let listener = Listener::bind(&config.listener.bind_addr, config.listener.max_datagram_size)?;
    let renderer = TerminalBackend::new(token.clone()).context("cannot initialise terminal")?;

    let mut dashboard = Dashboard::new(
        listener,
        Aggregator::new(config.history.capacity),
        Presenter::new(config.ui.top_talkers),
        renderer,
        token,
    )
    .with_tick_interval(Duration::from_millis(config.ui.refresh_rate_ms));

    let result = dashboard.run();
    // restore the terminal before anything is printed
    drop(dashboard);
    result?;

    info!("Packet dashboard stopped");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        warn!("Startup or render failure: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

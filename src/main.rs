use anyhow::Context;
use clap::Parser;
use commconsole::{
    default_transport, init_logging, spawn_line_reader, ConsoleCommand, ConsoleConfig, DataBits,
    EventDispatcher, FlowControl, Parity, SessionError, SessionEvent, SessionManager, StopBits,
    BUILD_DATE, VERSION,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tokio::time::MissedTickBehavior;

/// Serial console with per-port session buffers
#[derive(Parser)]
#[command(name = "commconsole", version, about = "Serial (UART) console with per-port session buffers")]
struct Cli {
    /// Port to open on startup (e.g. COM3, /dev/ttyUSB0)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Data bits (7 or 8)
    #[arg(long)]
    data_bits: Option<DataBits>,

    /// Parity (none, even, odd)
    #[arg(long)]
    parity: Option<Parity>,

    /// Stop bits (1, 1.5, 2)
    #[arg(long)]
    stop_bits: Option<StopBits>,

    /// Flow control (none, rts-cts, xon-xoff)
    #[arg(long)]
    flow: Option<FlowControl>,

    /// Config file path (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List available ports and exit
    #[arg(long)]
    list: bool,

    /// Print the port whose hardware id contains HWID and exit
    #[arg(long, value_name = "HWID")]
    find: Option<String>,
}

impl Cli {
    fn apply_to(&self, config: &mut ConsoleConfig) {
        let line = &mut config.serial.line;
        if let Some(baud) = self.baud {
            line.baud_rate = baud;
        }
        if let Some(data_bits) = self.data_bits {
            line.data_bits = data_bits;
        }
        if let Some(parity) = self.parity {
            line.parity = parity;
        }
        if let Some(stop_bits) = self.stop_bits {
            line.stop_bits = stop_bits;
        }
        if let Some(flow) = self.flow {
            line.flow_control = flow;
        }
    }
}

fn report(err: &SessionError) {
    eprintln!("{}", err.user_message());
}

fn print_text(text: &str) {
    let mut stdout = std::io::stdout().lock();
    // Broken stdout has nowhere to be reported
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

struct Console {
    manager: SessionManager,
    config: ConsoleConfig,
    config_path: Option<PathBuf>,
}

impl Console {
    fn active(&self) -> Option<String> {
        self.manager.active_key().map(str::to_string)
    }

    fn open(&mut self) {
        let Some(port) = self.active() else {
            eprintln!("No port selected. Use :port NAME first.");
            return;
        };
        let line = self.config.serial.line;
        match self.manager.open(&port, &line) {
            Ok(()) => {
                eprintln!("Connected to {} ({})", port, line);
                self.remember_port(&port);
            }
            Err(e) => report(&e),
        }
    }

    fn remember_port(&mut self, port: &str) {
        if self.config.serial.last_port.as_deref() == Some(port) {
            return;
        }
        self.config.serial.last_port = Some(port.to_string());
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_to_file(path) {
                tracing::warn!("Failed to save settings to {}: {}", path.display(), e);
            }
        }
    }

    /// Returns false when the console should exit
    fn handle(&mut self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::Open => self.open(),
            ConsoleCommand::Close => {
                self.manager.close();
            }
            ConsoleCommand::Clear => {
                if let Some(port) = self.active() {
                    self.manager.clear(&port);
                }
            }
            ConsoleCommand::Port(name) => {
                let text = self.manager.set_active(&name, None);
                eprintln!("-- {} --", name);
                print_text(&text);
            }
            ConsoleCommand::Ports => {
                for port in self.manager.list_ports() {
                    println!("{}\t{}", port.device_name, port.hardware_id);
                }
            }
            ConsoleCommand::Batch(items) => {
                let Some(port) = self.active() else {
                    eprintln!("No port selected. Use :port NAME first.");
                    return true;
                };
                let spacing = self.config.console.send_spacing();
                self.manager.send_many(&port, items, spacing, |report| {
                    tracing::info!("Batch finished: {}", report);
                });
            }
            ConsoleCommand::Quit => return false,
            ConsoleCommand::Send(text) => {
                if let Some(port) = self.active() {
                    if let Err(e) = self.manager.send(&port, &text) {
                        report(&e);
                    }
                }
            }
        }
        true
    }

    fn tick(&mut self) {
        match self.manager.poll() {
            Ok(Some(text)) => print_text(&text),
            Ok(None) => {}
            Err(e) => report(&e),
        }
        self.manager.pump_sequences(Instant::now());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => ConsoleConfig::default_path().ok(),
    };
    let mut config = match &config_path {
        Some(path) => ConsoleConfig::load_or_default(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    cli.apply_to(&mut config);
    config.validate()?;

    init_logging(&config.logging.level, config.logging.json)?;
    tracing::debug!("commconsole {} (built {})", VERSION, BUILD_DATE);

    let events = EventDispatcher::default_with_buffer();
    let manager = SessionManager::with_config(default_transport(), config.manager_config())
        .with_events(events.clone());

    if cli.list {
        for port in manager.list_ports() {
            println!("{}\t{}", port.device_name, port.hardware_id);
        }
        return Ok(());
    }
    if let Some(needle) = &cli.find {
        match manager.find_port_by_hardware_id(needle) {
            Some(port) => println!("{}", port),
            None => anyhow::bail!("no port with hardware id matching '{}'", needle),
        }
        return Ok(());
    }

    let mut console = Console {
        manager,
        config,
        config_path,
    };

    let initial = cli
        .port
        .clone()
        .or_else(|| console.config.serial.last_port.clone())
        .or_else(|| {
            console
                .manager
                .find_port_by_hardware_id(&console.config.console.hardware_id)
        })
        .or_else(|| {
            console
                .manager
                .list_ports()
                .into_iter()
                .next()
                .map(|port| port.device_name)
        });
    if let Some(port) = initial {
        console.manager.set_active(&port, None);
        eprintln!("Active port: {}", port);
        if cli.port.is_some() {
            console.open();
        }
    }

    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                SessionEvent::Connected { .. } | SessionEvent::Disconnected { .. } => {
                    tracing::debug!("{}", event)
                }
                SessionEvent::ConnectionLost { port, .. } => {
                    tracing::warn!("Connection to {} lost", port)
                }
                _ => tracing::trace!("{}", event),
            }
        }
    });

    let mut ticker = tokio::time::interval(console.config.console.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let stdin = std::io::BufReader::new(std::io::stdin());
    let mut lines =
        spawn_line_reader("stdin-reader", stdin).context("spawning stdin reader")?;

    loop {
        tokio::select! {
            _ = ticker.tick() => console.tick(),
            line = lines.recv() => {
                let Some(line) = line else { break };
                let line = line.context("reading stdin")?;
                let line = line.trim_end_matches('\r');
                match ConsoleCommand::parse(line) {
                    Ok(command) => {
                        if !console.handle(command) {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    console.manager.close();
    Ok(())
}

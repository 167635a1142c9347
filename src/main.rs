use std::{
    process::ExitCode,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gc_genie::{
    display::TerminalView,
    gc_adapter::{capture_view, codec, AdapterError, FrameBuffer, UsbAdapterSession},
    intent::{self, toggled_rumble, Intent, RumbleScope},
    ticker::Ticker,
    Port, PortCursor,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long the display may go without a complete frame before warning.
const STALE_AFTER: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "gc-genie")]
#[command(about = "Live viewer for the GameCube controller USB adapter")]
#[command(version)]
struct Cli {
    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// How long a single adapter read may block
    #[arg(
        long,
        global = true,
        default_value_t = 2000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    read_timeout_ms: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Continuously display controller state (default)
    Watch(WatchArgs),

    /// Print one decoded frame for all four ports as YAML
    Dump {
        /// Reads to attempt before giving up on a fresh frame
        #[arg(long, default_value_t = 5)]
        attempts: u32,
    },

    /// Rumble the given ports briefly, then stop
    Rumble {
        /// Ports to rumble (1-4)
        #[arg(required = true)]
        ports: Vec<Port>,

        #[arg(long, default_value_t = 500)]
        duration_ms: u64,
    },
}

#[derive(clap::Args)]
struct WatchArgs {
    /// Port to display first
    #[arg(long, default_value_t = Port::default())]
    port: Port,

    /// Loop period
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Toggle rumble only on the displayed port instead of all four
    #[arg(long)]
    per_port_rumble: bool,

    /// Keep looking for the adapter for this many seconds
    #[arg(long, default_value_t = 0)]
    wait_secs: u64,
}

impl Default for WatchArgs {
    fn default() -> Self {
        Self {
            port: Port::default(),
            tick_ms: 10,
            per_port_rumble: false,
            wait_secs: 0,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gc_genie={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AdapterError>() {
        Some(AdapterError::NoAdapterFound { .. }) => 2,
        Some(AdapterError::InterfaceBusy { .. }) => 3,
        Some(AdapterError::EndpointNotFound { .. }) => 4,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let read_timeout = Duration::from_millis(cli.read_timeout_ms);

    // Every subcommand leaves through `release`, so Ctrl-C becomes a Quit intent.
    let (tx, rx) = mpsc::channel::<Intent>();
    {
        let tx = tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(Intent::Quit);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    match cli.command {
        None => run_watch(WatchArgs::default(), read_timeout, tx, rx),
        Some(Command::Watch(args)) => run_watch(args, read_timeout, tx, rx),
        Some(Command::Dump { attempts }) => run_dump(attempts, read_timeout, &rx),
        Some(Command::Rumble { ports, duration_ms }) => run_rumble(
            &ports,
            Duration::from_millis(duration_ms),
            read_timeout,
            &rx,
        ),
    }
}

fn run_watch(
    args: WatchArgs,
    read_timeout: Duration,
    tx: Sender<Intent>,
    rx: Receiver<Intent>,
) -> Result<()> {
    let wait = Duration::from_secs(args.wait_secs);
    let mut session = UsbAdapterSession::open(wait, read_timeout)?;

    intent::spawn_stdin_reader(tx).context("failed to start input thread")?;

    let mut frame = FrameBuffer::new();
    let mut cursor = PortCursor::starting_at(args.port);
    let mut view = TerminalView::stdout();
    let mut ticker = Ticker::new(Duration::from_millis(args.tick_ms));
    let scope = |port: Port| {
        if args.per_port_rumble {
            RumbleScope::Selected(port)
        } else {
            RumbleScope::AllPorts
        }
    };

    view.print_help()?;
    info!(
        port = %cursor.current(),
        tick_ms = ticker.period().as_millis() as u64,
        "watching adapter"
    );

    let mut warned_stale = false;
    'cycle: loop {
        let outcome = frame.fill_from(&mut session)?;
        if frame.is_older_than(STALE_AFTER) {
            if !warned_stale {
                warn!(after = ?STALE_AFTER, "no complete frame from adapter, display is stale");
                warned_stale = true;
            }
        } else {
            warned_stale = false;
        }
        let snapshot = capture_view(&frame, cursor.current(), session.rumble_state(), outcome);
        view.render(&snapshot)?;

        // Drain user intents.
        while let Ok(intent) = rx.try_recv() {
            match intent {
                Intent::ToggleRumble => {
                    let flags = toggled_rumble(session.rumble_state(), scope(cursor.current()));
                    session.set_rumble(flags)?;
                }
                Intent::AdvancePort => {
                    let port = cursor.advance();
                    info!(%port, "displaying next port");
                }
                Intent::Quit => break 'cycle,
            }
        }

        ticker.wait();
    }

    if ticker.overruns() > 0 {
        info!(overruns = ticker.overruns(), "loop ticks started late");
    }
    session.release();
    Ok(())
}

fn run_dump(attempts: u32, read_timeout: Duration, rx: &Receiver<Intent>) -> Result<()> {
    let mut session = UsbAdapterSession::open(Duration::ZERO, read_timeout)?;
    let mut frame = FrameBuffer::new();

    for attempt in 1..=attempts.max(1) {
        if intent::quit_requested(rx) {
            session.release();
            bail!("interrupted before the adapter delivered a frame");
        }
        if frame.fill_from(&mut session)?.is_fresh() {
            let controllers = codec::decode_all(frame.as_bytes());
            let yaml = serde_yaml::to_string(&controllers).context("failed to encode snapshot")?;
            print!("{yaml}");
            session.release();
            return Ok(());
        }
        warn!(attempt, "no complete frame from adapter yet");
    }

    session.release();
    bail!("adapter did not deliver a complete frame in {attempts} reads")
}

fn run_rumble(
    ports: &[Port],
    duration: Duration,
    read_timeout: Duration,
    rx: &Receiver<Intent>,
) -> Result<()> {
    let mut session = UsbAdapterSession::open(Duration::ZERO, read_timeout)?;

    let mut flags = [false; 4];
    for port in ports {
        flags[port.index()] = true;
    }

    session.set_rumble(flags)?;
    if intent::wait_for_quit(rx, duration) {
        info!("interrupted, stopping rumble early");
    }
    session.set_rumble([false; 4])?;
    session.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_read_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["gc-genie", "--read-timeout-ms", "0", "dump"]).is_err());
    }

    #[test]
    fn read_timeout_defaults_to_two_seconds() {
        let cli = Cli::try_parse_from(["gc-genie", "dump"]).unwrap();
        assert_eq!(cli.read_timeout_ms, 2000);

        let cli = Cli::try_parse_from(["gc-genie", "--read-timeout-ms", "1", "dump"]).unwrap();
        assert_eq!(cli.read_timeout_ms, 1);
    }

    #[test]
    fn bare_invocation_watches() {
        let cli = Cli::try_parse_from(["gc-genie"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(WatchArgs::default().tick_ms, 10);
    }
}

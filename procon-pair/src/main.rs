use clap::Parser;
use color_eyre::eyre::{Context, Result};
use procon_codec::ProconCodec;
use procon_protocol::{BdAddr, ControllerType, Engine, Identity, DEFAULT_REPORT_SIZE};
use session::Session;
use tokio::signal;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod session;

#[derive(Parser, Debug)]
#[command(about = "Answers a Switch console as a wired-in Pro Controller")]
struct Args {
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Serial device of the HID bridge.
    #[arg(long, value_name = "TTY", value_hint = clap::ValueHint::FilePath)]
    tty_path: String,

    #[arg(short, long, default_value_t = 115200)]
    serial_baudrate: u32,

    /// Bluetooth address reported to the console.
    #[arg(long, default_value = "98:B6:E9:12:34:57", conflicts_with = "random_address")]
    bd_address: String,

    /// Use a random address from a Switch-compatible vendor range instead.
    #[arg(long)]
    random_address: bool,

    #[arg(long, default_value_t = ControllerType::ProController)]
    controller_type: ControllerType,

    #[arg(long, default_value_t = DEFAULT_REPORT_SIZE)]
    report_size: usize,
}

fn open_serial(path: String, baudrate: u32) -> Result<tokio_serial::SerialStream> {
    debug!("Opening serial port {} (baudrate={})", path, baudrate);

    let serial = tokio_serial::new(path, baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()?;
    Ok(serial)
}

fn spawn_sigint_watcher(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", err);
        }
        token.cancel();
    });
}

fn identity(args: &Args) -> Result<Identity> {
    let identity = if args.random_address {
        let address = BdAddr::random_switch_compatible(&mut rand::rng());
        Identity::new(address, args.controller_type, args.report_size)?
    } else {
        Identity::parse(&args.bd_address, args.controller_type, args.report_size)?
    };
    Ok(identity)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(args.log_level)
            .finish(),
    )?;

    let identity = identity(&args).with_context(|| "Invalid controller identity")?;
    info!(
        "Emulating {} at {} ({}-byte reports)",
        identity.controller_type(),
        identity.address(),
        identity.report_size()
    );

    let serial = open_serial(args.tty_path, args.serial_baudrate)
        .with_context(|| "Failed to open HID bridge port")?;
    let mut link = ProconCodec::default().framed(serial);

    let token = CancellationToken::new();
    spawn_sigint_watcher(token.clone());

    let mut session = Session::new(Engine::new(identity));
    session.run(&token, &mut link).await?;

    info!(
        "Session ended after {} reports (paired: {})",
        session.reports_sent(),
        session.is_paired()
    );

    Ok(())
}

use clap::{Parser, Subcommand};
use tether::exchange::StatusCode;
use tether::{HandlerResult, HttpBridge, Request, Response, WebSocketHandlers};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Tether CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the demo server: GET / answers with a health JSON, /ws echoes WebSocket frames.
    Serve {
        /// Config file path (default: TETHER_CONFIG_PATH or ~/.tether/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP and WebSocket port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("tether {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = tether::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting demo server on {} (config {})",
        config.server.bind_addr(),
        path.display()
    );
    let app = HttpBridge::new(demo_handler).into_router(&config);
    tether::server::serve(&config, app).await
}

fn demo_handler(request: &Request, response: &mut Response) -> HandlerResult {
    match request.path() {
        "/" => {
            let body = serde_json::json!({
                "runtime": "running",
                "version": env!("CARGO_PKG_VERSION"),
            });
            response.set_header("content-type", "application/json")?;
            response.write(serde_json::to_vec(&body)?);
        }
        "/ws" if request.is_upgrade() => response.upgrade(echo_handlers()),
        _ => response.send_error(StatusCode::NOT_FOUND, ""),
    }
    Ok(())
}

fn echo_handlers() -> WebSocketHandlers {
    WebSocketHandlers::new()
        .on_text(|conn, text| {
            conn.send_text(text)?;
            Ok(())
        })
        .on_binary(|conn, data| {
            conn.send_binary(data)?;
            Ok(())
        })
        .on_close(|conn, code, reason| {
            log::info!("ws {} closed by peer: {} {}", conn.id(), code, reason);
            Ok(())
        })
        .on_error(|conn, cause| {
            log::warn!("ws {} failed: {}", conn.id(), cause);
            Ok(())
        })
}

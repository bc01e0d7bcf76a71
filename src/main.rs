mod common;
mod config;
mod error;
mod network;
mod session;
mod storage;
mod ui;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use eframe::egui;

use common::{SessionContext, UserProfile};
use config::AppConfig;
use network::{HttpHistory, WsConnector};
use storage::CredentialStore;
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "storefront_chat",
    version,
    about = "Live support chat for storefront customers"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Store the storefront login used to open chat sessions
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        user_name: String,
    },
    /// Forget the stored login
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config);

    match cli.command {
        Some(Command::Login {
            token,
            user_id,
            user_name,
        }) => {
            let mut store = CredentialStore::open(&app_config.credentials_db)?;
            store.save_session_context(&SessionContext {
                token,
                user: UserProfile {
                    id: user_id,
                    name: user_name,
                },
            })?;
            log::info!("Saved login to {}", app_config.credentials_db);
            Ok(())
        }
        Some(Command::Logout) => {
            let store = CredentialStore::open(&app_config.credentials_db)?;
            let removed = store.clear()?;
            log::info!("Removed {removed} stored credentials");
            Ok(())
        }
        None => run_chat(app_config),
    }
}

fn run_chat(app_config: AppConfig) -> Result<(), Box<dyn Error>> {
    // Credentials are read exactly once, here.
    let context = CredentialStore::open(&app_config.credentials_db)?.load_session_context()?;

    let transport = WsConnector::new(
        app_config.server_url.clone(),
        app_config.reconnect_policy(),
    );
    let history = Arc::new(HttpHistory::new(app_config.history_url.clone()));
    let typing_idle = app_config.typing_idle();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Customer support")
            .with_inner_size([380.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Storefront Chat",
        options,
        Box::new(move |cc| {
            let egui_ctx = cc.egui_ctx.clone();
            let link = session::start(
                context,
                &transport,
                history,
                typing_idle,
                Box::new(move || egui_ctx.request_repaint()),
            );
            log::info!(
                "Chat window started ({})",
                if link.is_some() { "signed in" } else { "no user" }
            );
            Ok(Box::new(ChatApp::new(cc, link)))
        }),
    )?;
    Ok(())
}

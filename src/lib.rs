mod app;
mod cli;
mod commands;
mod config;
mod error;
mod instance_guard;
mod notifier;
mod port_manager;
mod process;
mod shell;
mod shutdown;
mod state;
mod window;

use std::sync::Arc;

use clap::Parser;
use tauri::{Manager, RunEvent};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::LOG_FILTER_ENV;
use cli::Cli;
use config::LauncherConfig;
use instance_guard::{InstanceGuard, SystemWindowQuery};
use notifier::{DialogNotifier, Notifier};
use process::ProcessGroup;
use shutdown::{ExitReason, Shutdown};
use state::{AppContext, LaunchMode};
use window::WindowSignal;

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();
    let cli = Cli::parse();
    info!("Starting {}", cli::banner());

    let config = LauncherConfig::load();

    // Created before anything is spawned so every child can join it
    let group = match ProcessGroup::create() {
        Ok(group) => Arc::new(group),
        Err(e) => panic!("[{}] {}", e.code(), e),
    };
    let shutdown = Arc::new(Shutdown::new(group));

    // From here on a panic anywhere takes every spawned process down with it
    let hook_shutdown = shutdown.clone();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!("Application panic: {}", panic_info);
        hook_shutdown.on_panic();
    }));

    let mode = if cli.terminal {
        LaunchMode::Terminal
    } else {
        LaunchMode::Primary
    };
    let port = cli
        .port
        .unwrap_or_else(|| port_manager::negotiate_port(config.service.fallback_port));
    let terminal_window = cli.terminal_window(&config);
    info!("Launch mode {:?}, service port {}", mode, port);

    let setup_shutdown = shutdown.clone();
    let app = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            let notifier: Arc<dyn Notifier> = Arc::new(DialogNotifier::new(app.handle().clone()));
            let ctx = Arc::new(AppContext::new(config, port, mode, setup_shutdown, notifier));
            app.manage(ctx.clone());

            let guard = InstanceGuard::new(SystemWindowQuery);
            shell::start(app.handle(), &ctx, &guard, terminal_window)?;
            Ok(())
        })
        .on_window_event(|window, event| {
            let signal = WindowSignal::from_event(event);
            if let Some(ctx) = window.try_state::<Arc<AppContext>>() {
                ctx.windows.handle_signal(window.label(), signal, &ctx.shutdown);
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::app_toggle_full_screen,
            commands::app_quit,
            commands::app_new_window,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |_app, event| {
        if let RunEvent::Exit = event {
            info!("Event loop exited");
            shutdown.request(ExitReason::WindowClosed);
        }
    });
}

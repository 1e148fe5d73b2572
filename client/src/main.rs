use clap::Parser;
use client::input::{IntentSource, MacroquadDevice, NoGamepad};
use client::network::{run_network, NetworkConfig, Session};
use log::{error, info};
use macroquad::prelude::*;
use shared::{Tuning, CLIENT_VERSION};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value_t = 0)]
    fake_ping: u64,

    /// Protocol version announced in the handshake
    #[arg(long, default_value_t = CLIENT_VERSION)]
    client_version: u32,

    /// JSON file overriding the default movement tuning
    #[arg(long)]
    tuning: Option<PathBuf>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "movesync".to_string(),
        window_width: 800,
        window_height: 600,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run(Args::parse()).await {
        error!("Client error: {}", e);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let tuning = match &args.tuning {
        Some(path) => Tuning::from_json_file(path)?,
        None => Tuning::default(),
    };

    let config = NetworkConfig {
        server_addr: args.server.parse()?,
        client_version: args.client_version,
        fake_ping_ms: args.fake_ping,
    };

    info!("Starting client...");
    info!("Connecting to: {}", config.server_addr);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Controls: WASD/arrows to move, Shift to run, Space to jump, Q/E or mouse to turn");
    info!("Tab toggles mouse look, Escape quits");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let (packets_tx, packets_rx) = mpsc::unbounded_channel();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let network = runtime.spawn(run_network(config, packets_rx, events_tx));

    let mut session = Session::new(packets_tx, &tuning);
    let mut source: IntentSource<MacroquadDevice, NoGamepad> =
        IntentSource::new(MacroquadDevice::default());

    loop {
        if is_key_pressed(KeyCode::Escape) || network.is_finished() {
            break;
        }

        if is_key_pressed(KeyCode::Tab) {
            let device = source.device_mut();
            device.mouse_look = !device.mouse_look;
            set_cursor_grab(device.mouse_look);
            show_mouse(!device.mouse_look);
        }

        while let Ok(event) = events_rx.try_recv() {
            session.handle_event(event);
        }

        let intent = source.sample();
        if let Err(e) = session.frame(get_frame_time(), intent) {
            error!("Error publishing intent: {}", e);
            break;
        }

        draw_hud(&session);
        next_frame().await;
    }

    drop(session);
    runtime.shutdown_timeout(Duration::from_millis(250));
    Ok(())
}

fn draw_hud(session: &Session) {
    clear_background(Color::from_rgba(26, 26, 26, 255));

    let mut lines = vec![
        session.status().to_string(),
        format!("Server tick: {}", session.tick()),
        format!(
            "View yaw: {:.2}  Intents sent: {}",
            session.view_yaw(),
            session.intents_sent()
        ),
    ];

    if let Some(avatar) = session.own_avatar() {
        lines.push(format!(
            "Position: ({:.2}, {:.2}, {:.2})  Throttle: ({:.2}, {:.2}, {:.2})",
            avatar.position.x,
            avatar.position.y,
            avatar.position.z,
            avatar.throttle.x,
            avatar.throttle.y,
            avatar.throttle.z
        ));
        lines.push(format!(
            "Yaw: {:.2}  Grounded: {}",
            avatar.yaw, avatar.grounded
        ));
    }
    lines.push(format!("Avatars: {}", session.avatars().len()));

    for (i, line) in lines.iter().enumerate() {
        draw_text(line, 10.0, 24.0 + i as f32 * 22.0, 20.0, WHITE);
    }
}

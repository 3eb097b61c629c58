use wavesync_engine::{Engine, EngineConfig};
use wavesync_messages::{Command, Event, Hertz, SyncMode};

use clap::Parser;
use flume::Sender;
use log::{LevelFilter, debug, info, warn};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Headless client for an SDR receiver's spectrum stream.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Receiver base address, e.g. http://sdr.example.net:8073/
    #[arg(long)]
    server: Option<String>,

    /// Session identifier presented at admission
    #[arg(long)]
    session_id: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// TOML engine configuration
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Show the newest frame instead of syncing to audio
    #[arg(long)]
    free_running: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} - {} | {}",
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .filter_module("wavesync_engine", LevelFilter::Info)
        .filter_module("tungstenite", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::bounded(64);

    let engine = Engine::connect_to_server(cmd_rx, event_tx, config)?;
    let engine_handle = std::thread::spawn(move || engine.run());

    let _ = cmd_tx.send(Command::Connect);

    let console_tx = cmd_tx.clone();
    std::thread::spawn(move || read_console(console_tx));
    drop(cmd_tx);

    // Headless sink: runs until the engine drops its event sender.
    let mut frames = 0u64;
    for event in event_rx.iter() {
        log_event(&event, &mut frames);
    }

    engine_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Engine thread panicked"))??;

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(server) = &args.server {
        config.session.server_url = server.clone();
    }
    if let Some(session_id) = &args.session_id {
        config.session.session_id = session_id.clone();
    }
    if args.password.is_some() {
        config.session.password = args.password.clone();
    }
    if args.free_running {
        config.scheduler.mode = SyncMode::FreeRunning;
    }
    config.validate()?;
    Ok(config)
}

fn read_console(cmd_tx: Sender<Command>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let commands = match parse_console(&words) {
            Ok(commands) => commands,
            Err(message) => {
                warn!("{message}");
                continue;
            }
        };
        let quit = commands.contains(&Command::Stop);
        for command in commands {
            if cmd_tx.send(command).is_err() {
                return;
            }
        }
        if quit {
            return;
        }
    }
    // stdin closed
    let _ = cmd_tx.send(Command::Stop);
}

fn parse_console(words: &[&str]) -> Result<Vec<Command>, String> {
    let frequency = |word: Option<&&str>| -> Result<f64, String> {
        word.ok_or_else(|| "missing frequency".to_string())?
            .parse::<f64>()
            .map_err(|err| format!("bad frequency: {err}"))
    };

    let commands = match words[0] {
        "pan" => vec![Command::PanTo(Hertz::round_from(frequency(words.get(1))?))],
        "zoom-in" => vec![Command::ZoomIn],
        "zoom-out" => vec![Command::ZoomOut],
        "reset" => vec![Command::ResetZoom],
        "tune" => vec![Command::SetTunedFrequency(Hertz::round_from(frequency(
            words.get(1),
        )?))],
        "drag" => vec![
            Command::DragStart,
            Command::DragTo(frequency(words.get(1))?),
            Command::DragEnd,
        ],
        "sync" => match words.get(1).copied() {
            Some("on") => vec![Command::SetSyncMode(SyncMode::Synchronized)],
            Some("off") => vec![Command::SetSyncMode(SyncMode::FreeRunning)],
            _ => return Err("usage: sync on|off".to_string()),
        },
        "subscribe" | "unsubscribe" => {
            let stream = words
                .get(1)
                .ok_or_else(|| format!("usage: {} <stream>", words[0]))?
                .to_string();
            if words[0] == "subscribe" {
                vec![Command::Subscribe(stream)]
            } else {
                vec![Command::Unsubscribe(stream)]
            }
        }
        "connect" => vec![Command::Connect],
        "disconnect" => vec![Command::Disconnect],
        "quit" | "exit" => vec![Command::Stop],
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(commands)
}

fn log_event(event: &Event, frames: &mut u64) {
    match event {
        Event::Frame(frame) => {
            *frames += 1;
            let peak = frame
                .magnitudes
                .iter()
                .copied()
                .filter(|m| m.is_finite())
                .fold(f32::NEG_INFINITY, f32::max);
            debug!(
                "frame #{} ts={:.0} center={:?} bins={} max={:.1} dB range={:?}",
                frame.receive_order,
                frame.server_timestamp_ms,
                frame.frame_view.map(|view| view.center_frequency),
                frame.magnitudes.len(),
                peak,
                frame.spectrum_range
            );
        }
        Event::ViewChanged(view) => info!(
            "View {:.0}..{:.0} Hz ({} bins of {} Hz)",
            view.start_frequency(),
            view.end_frequency(),
            view.bin_count,
            view.bin_bandwidth
        ),
        Event::Connection(state) => info!("Connection {state}"),
        Event::Notice(notice) => warn!("{notice}"),
        Event::Stats(stats) => info!(
            "{} frames shown; queue {} released {} stale {} backpressure {} superseded {}",
            frames,
            stats.queue_depth,
            stats.released,
            stats.dropped_stale,
            stats.dropped_backpressure,
            stats.superseded
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pan_rounds_to_hertz() {
        assert_eq!(
            parse_console(&["pan", "7074000.4"]),
            Ok(vec![Command::PanTo(Hertz(7_074_000))])
        );
    }

    #[test]
    fn test_parse_drag_expands_to_gesture() {
        assert_eq!(
            parse_console(&["drag", "1000"]),
            Ok(vec![
                Command::DragStart,
                Command::DragTo(1000.0),
                Command::DragEnd
            ])
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_console(&["pan"]).is_err());
        assert!(parse_console(&["pan", "abc"]).is_err());
        assert!(parse_console(&["sync", "maybe"]).is_err());
        assert!(parse_console(&["warp"]).is_err());
    }
}

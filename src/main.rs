//! World Theme player: main entry point.
//!
//! Event-driven, single consumer.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Producers (own threads)                   │
//! │                                                               │
//! │  GPIO IRQs ─▶ RawEdges ─▶ debouncer ─┐                        │
//! │  RCWL pin / RD-03D UART ─▶ sensor ───┼─▶ EventQueue           │
//! │  stdin console (simulation) ─────────┘        │               │
//! │                                               ▼               │
//! │  ┌────────────────────────────────────────────────────────┐   │
//! │  │ PlayerRuntime (consumer) ─ PlayerService ─ FSM, timers │   │
//! │  └────────────────────────────────────────────────────────┘   │
//! │        │ engine            │ IndicatorSignal   │ sink         │
//! │   aplay / sim        render thread (PWM)    LogEventSink      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope};

use anyhow::{Context, Result};
use clap::Parser;
use embedded_hal::pwm::SetDutyCycle;
use log::{LevelFilter, info};

use themeplayer::adapters::config_file::JsonFileConfig;
use themeplayer::adapters::log_sink::LogEventSink;
use themeplayer::adapters::time::SystemClock;
use themeplayer::app::ports::{ConfigPort, PipelinePort, PlaybackEngine, Ports};
use themeplayer::app::runtime::PlayerRuntime;
use themeplayer::app::service::PlayerService;
use themeplayer::config::PlayerConfig;
use themeplayer::diagnostics::Diagnostics;
use themeplayer::drivers::debounce::{InputDebouncer, RawEdges, run_debounce_loop};
use themeplayer::drivers::indicator::{IndicatorPanel, IndicatorSignal, run_render_loop};
use themeplayer::events::EventQueue;
use themeplayer::sensors::binary::EdgeChannel;
use themeplayer::sensors::{PresenceModel, ReadingSource, SensorAdapter, run_sensor_loop};

// ── Shared statics (reached from IRQ callbacks and worker threads) ──

static QUEUE: EventQueue = EventQueue::new();
static RAW_EDGES: RawEdges = RawEdges::new();
static RADAR_EDGES: EdgeChannel = EdgeChannel::new();
static INDICATORS: IndicatorSignal = IndicatorSignal::new();
static STOP: AtomicBool = AtomicBool::new(false);

#[derive(Parser, Debug)]
#[command(name = "themeplayer", version, about = "Presence-aware playback controller")]
struct Cli {
    /// Settings file (JSON).
    #[arg(short, long, default_value = "themeplayer.json")]
    config: PathBuf,

    /// Log level; RUST_LOG overrides it.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the default settings as JSON and exit.
    #[arg(long)]
    print_defaults: bool,
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_defaults {
        println!("{}", serde_json::to_string_pretty(&PlayerConfig::default())?);
        return Ok(());
    }

    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_default_env()
        .init();

    info!("╔══════════════════════════════════════╗");
    info!("║  World Theme player v{:<16}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration (fatal if missing or invalid) ────────
    let cfg = JsonFileConfig::new(&cli.config)
        .load()
        .with_context(|| format!("refusing to start with config {}", cli.config.display()))?;

    // ── 2. Shutdown signal ────────────────────────────────────
    ctrlc::set_handler(|| {
        info!("shutdown requested");
        STOP.store(true, Ordering::Release);
    })
    .context("installing signal handler")?;

    // ── 3. Hardware + run ─────────────────────────────────────
    run(&cfg)?;
    info!("bye");
    Ok(())
}

// ── Raspberry Pi ──────────────────────────────────────────────

#[cfg(feature = "rpi")]
fn run(cfg: &PlayerConfig) -> Result<()> {
    use log::warn;
    use themeplayer::adapters::engine::CommandEngine;
    use themeplayer::adapters::pipeline::CommandPipeline;
    use themeplayer::adapters::rpi::{PiBoard, PiUart};
    use themeplayer::config::SensorConfig;
    use themeplayer::error::SensorFault;
    use themeplayer::sensors::ranged::SerialReadings;

    let board = PiBoard::open().context("opening GPIO")?;
    let (_inputs, initial) = board.inputs(&cfg.pins, &RAW_EDGES).context("configuring inputs")?;
    let debouncer = InputDebouncer::new(cfg.debounce(), initial);
    let switch_on = debouncer.radar_switch_on();

    let (player_led, radar_led) = board.leds(&cfg.pins).context("configuring indicator LEDs")?;
    let panel = IndicatorPanel::new(player_led, radar_led, cfg.max_brightness_percent);

    // A sensor that cannot be opened disarms the radar; it does not stop
    // the player.
    let mut _radar_pin = None;
    let source: Box<dyn ReadingSource + Send> = match &cfg.sensor {
        SensorConfig::Binary => {
            match board.radar_pin(cfg.pins.radar_signal, &RADAR_EDGES) {
                Ok(pin) => _radar_pin = Some(pin),
                Err(e) => {
                    warn!("radar pin unavailable: {}", e);
                    RADAR_EDGES.fail(SensorFault::GpioUnavailable);
                }
            }
            Box::new(&RADAR_EDGES)
        }
        SensorConfig::Ranged(r) => match PiUart::open(r) {
            Ok(uart) => Box::new(SerialReadings::new(uart)),
            Err(e) => {
                warn!("radar UART unavailable: {}", e);
                RADAR_EDGES.fail(SensorFault::ChannelLost);
                Box::new(&RADAR_EDGES)
            }
        },
    };

    serve(
        cfg,
        Workers {
            source,
            model: PresenceModel::from_config(&cfg.sensor),
            panel,
            debouncer: Some(debouncer),
        },
        CommandEngine::new(cfg.engine_command.clone()),
        CommandPipeline::new(cfg.full_cycle_command.clone()),
        switch_on,
    )
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(feature = "rpi"))]
fn run(cfg: &PlayerConfig) -> Result<()> {
    use embassy_time::Duration;
    use log::warn;
    use themeplayer::adapters::console::run_console;
    use themeplayer::adapters::engine::SimEngine;
    use themeplayer::adapters::pipeline::LogPipeline;
    use themeplayer::config::SensorConfig;
    use themeplayer::drivers::indicator::SimPwm;
    use themeplayer::sensors::binary::BinaryPresence;

    /// Length of the simulated track.
    const SIM_TRACK: Duration = Duration::from_secs(30);

    warn!("built without the `rpi` feature: simulated hardware, console input");
    if matches!(cfg.sensor, SensorConfig::Ranged(_)) {
        warn!("ranged sensor needs the `rpi` feature; simulating the binary model");
    }
    let switch_on = true;

    // stdin cannot be interrupted, so the console thread is left detached.
    thread::Builder::new()
        .name("console".into())
        .spawn(move || run_console(std::io::stdin().lock(), &QUEUE, &RADAR_EDGES, SystemClock, switch_on, &STOP))
        .context("spawning console thread")?;

    serve(
        cfg,
        Workers {
            source: &RADAR_EDGES,
            model: PresenceModel::Binary(BinaryPresence::new()),
            panel: IndicatorPanel::new(SimPwm::new(), SimPwm::new(), cfg.max_brightness_percent),
            debouncer: None,
        },
        SimEngine::new(SIM_TRACK),
        LogPipeline::new(),
        switch_on,
    )
}

// ── Shared wiring ─────────────────────────────────────────────

/// Everything that moves onto a producer thread.
struct Workers<S, A, B> {
    source: S,
    model: PresenceModel,
    panel: IndicatorPanel<A, B>,
    debouncer: Option<InputDebouncer>,
}

fn serve<S, A, B, E, P>(
    cfg: &PlayerConfig,
    workers: Workers<S, A, B>,
    engine: E,
    pipeline: P,
    switch_on: bool,
) -> Result<()>
where
    S: ReadingSource + Send,
    A: SetDutyCycle + Send,
    B: SetDutyCycle + Send,
    E: PlaybackEngine,
    P: PipelinePort,
{
    let diagnostics = Arc::new(Diagnostics::new());

    thread::scope(|s| {
        spawn_workers(s, workers, &diagnostics).inspect_err(|_| STOP.store(true, Ordering::Release))?;

        let service = PlayerService::new(cfg, switch_on, Arc::clone(&diagnostics));
        let ports = Ports {
            engine,
            indicators: &INDICATORS,
            pipeline,
            sink: LogEventSink::new(),
        };
        let mut runtime = PlayerRuntime::new(cfg, service, ports, &QUEUE, SystemClock);
        info!("controller ready, entering event loop");
        runtime.run(&STOP);
        Ok(())
    })
}

fn spawn_workers<'scope, 'env, S, A, B>(
    s: &'scope Scope<'scope, 'env>,
    workers: Workers<S, A, B>,
    diagnostics: &'env Diagnostics,
) -> Result<()>
where
    S: ReadingSource + Send + 'scope,
    A: SetDutyCycle + Send + 'scope,
    B: SetDutyCycle + Send + 'scope,
{
    let Workers {
        source,
        model,
        mut panel,
        debouncer,
    } = workers;

    thread::Builder::new()
        .name("indicators".into())
        .spawn_scoped(s, move || run_render_loop(&INDICATORS, &mut panel, &STOP))
        .context("spawning indicator thread")?;

    let adapter = SensorAdapter::new(source, SystemClock, model);
    thread::Builder::new()
        .name("sensor".into())
        .spawn_scoped(s, move || run_sensor_loop(adapter, &QUEUE, diagnostics, &STOP))
        .context("spawning sensor thread")?;

    if let Some(debouncer) = debouncer {
        thread::Builder::new()
            .name("debounce".into())
            .spawn_scoped(s, move || run_debounce_loop(&RAW_EDGES, debouncer, &QUEUE, &STOP))
            .context("spawning debouncer thread")?;
    }
    Ok(())
}

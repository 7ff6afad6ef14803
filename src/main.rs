/// Entry point and console loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::collections::HashMap;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode as TermKey, KeyEvent};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::DeskConfig;
use domain::element::{ElementAccessor, ORDER_PRICE};
use domain::key::{KeyCode, KeyPress};
use sim::animate::SessionId;
use sim::countdown::{Countdown, Reading};
use sim::desk::Desk;
use sim::dispatch::{CommandDispatcher, Dispatch};
use sim::document::Document;
use sim::hooks::Hooks;
use ui::input::InputState;
use ui::renderer::{FrameInfo, Renderer};

const HELP: &str = "A/S side  H/J/K/L suit  Z/X/C type  0-9 price  Enter send  Y requeue";

fn main() {
    let config = DeskConfig::load();
    init_logging(&config);
    for w in &config.warnings {
        warn!(%w, "config problem; using default");
    }

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = console_loop(&mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    match result {
        Ok(desk) => {
            info!(round = desk.round(), points = desk.points(), "console closed");
            println!();
            println!("Round {}, final points: {}", desk.round(), desk.points());
        }
        Err(e) => {
            error!(%e, "console error");
            eprintln!("Console error: {e}");
        }
    }
}

/// Log to a file; the terminal belongs to the renderer.
fn init_logging(config: &DeskConfig) {
    let file = match File::create(&config.log.file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", config.log.file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn console_loop(renderer: &mut Renderer, config: &DeskConfig) -> std::io::Result<Desk> {
    let mut doc = Document::order_page();
    let mut hooks = Hooks::new();
    let mut desk = Desk::new(config.desk.clone());
    let dispatcher = CommandDispatcher::new();
    let mut kb = InputState::new();

    // Start time of each animation session, for the emulated completion signal
    let mut started: HashMap<SessionId, Instant> = HashMap::new();

    let mut status = desk.start_round(&mut doc, &mut hooks).to_string();
    let mut countdown = Some(start_countdown(config));
    let mut clock: Option<Reading> = None;

    'frames: loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }

        for raw in &kb.raw_events {
            let press = KeyPress::from_terminal(raw, doc.active_element());
            let outcome = dispatcher.dispatch(&mut doc, &press);
            if !outcome.consumed && !default_key_action(&mut doc, raw, &press, &outcome) {
                break 'frames;
            }
        }

        for ticket in doc.take_submissions() {
            status = desk.apply(&mut doc, &mut hooks, &ticket).to_string();
        }

        if doc.take_requeue() && !desk.in_round() {
            status = desk.start_round(&mut doc, &mut hooks).to_string();
            countdown = Some(start_countdown(config));
        }

        let now = Instant::now();
        if let Some(reading) = countdown.as_mut().and_then(|c| c.poll(now)) {
            clock = Some(reading);
            if reading.expired {
                // Dropping the countdown cancels its tick
                countdown = None;
                if let Some(event) = desk.end_round(&mut doc, &mut hooks) {
                    status = event.to_string();
                }
            }
        }

        finish_animations(&mut doc, &mut hooks, &mut started, now, config.animation.flash);

        let info = FrameInfo { desk: &desk, clock, status: &status };
        renderer.render(&doc, &info)?;
        std::thread::sleep(config.frame);
    }

    Ok(desk)
}

fn start_countdown(config: &DeskConfig) -> Countdown {
    Countdown::start(Instant::now(), config.countdown.round, config.countdown.danger_fraction)
}

/// Default handling for keys the dispatcher left alone, standing in for
/// what a browser would do. Returns `false` to quit.
fn default_key_action(doc: &mut Document, raw: &KeyEvent, press: &KeyPress, outcome: &Dispatch) -> bool {
    if press.ctrl || press.alt {
        return true;
    }
    match press.code {
        // Esc that closed a modal does not also quit
        KeyCode::Escape => outcome.modal_dismissed,
        KeyCode::Tab => {
            if doc.active_element() == Some(ORDER_PRICE) {
                doc.blur();
            } else {
                doc.focus(ORDER_PRICE);
            }
            true
        }
        KeyCode::Digit(_) if doc.active_element() == Some(ORDER_PRICE) => {
            // Native text entry in the focused field
            if let (Some(mut value), Some(d)) = (doc.value(ORDER_PRICE), press.code.digit()) {
                value.push(d);
                doc.set_value(ORDER_PRICE, &value);
            }
            true
        }
        _ => {
            if raw.code == TermKey::Char('?') && doc.modal().is_none() && !outcome.modal_dismissed {
                doc.open_modal(HELP);
            }
            true
        }
    }
}

/// Deliver the completion signal for every session older than `flash`.
fn finish_animations(
    doc: &mut Document,
    hooks: &mut Hooks,
    started: &mut HashMap<SessionId, Instant>,
    now: Instant,
    flash: Duration,
) {
    for id in hooks.sessions.pending_ids() {
        let at = *started.entry(id).or_insert(now);
        if now.duration_since(at) >= flash {
            hooks.animation_end(doc, id);
            started.remove(&id);
        }
    }
}

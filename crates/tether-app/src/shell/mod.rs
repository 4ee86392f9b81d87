//! Console shell: UI loop on the main thread, stdin on a helper thread,
//! engine output printed from the event bus.

pub mod commands;
pub mod receiver;
pub mod shutdown;
pub mod ui;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tether_bridge::{Bridge, BridgeOptions, UiLoop, UiMarshaler};
use tether_common::{BridgeEvent, EventBus, TetherError};
use tether_config::TetherConfig;
use tokio::sync::broadcast;

use crate::cli::Args;
use crate::engine::LoopbackEngine;
use commands::Command;
use receiver::ConsoleReceiver;
use ui::ConsoleUi;

// =============================================================================
// RUN
// =============================================================================

pub fn run(args: &Args, config: TetherConfig) -> Result<(), TetherError> {
    let bus = Arc::new(EventBus::new(256));
    let printer = spawn_printer(bus.subscribe())?;

    // The main thread becomes the UI thread
    let ui = UiLoop::with_warn_depth(
        Rc::new(ConsoleUi::new(
            args.save_dir.as_ref().map(PathBuf::from),
            Arc::clone(&bus),
        )),
        config.ui.queue_warn_depth as usize,
    );

    let receiver = ConsoleReceiver::new(Arc::clone(&bus));
    let ready = receiver.ready_flag();
    let bridge = Arc::new(Bridge::new(
        Box::new(receiver),
        ui.marshaler(),
        BridgeOptions::from_config(&config),
    )?);

    let engine = LoopbackEngine::new(&config.engine)?;
    bridge.serve(Arc::new(engine))?;

    // Deliveries start once the loop is up
    ui.marshaler().post(move |_| ready.store(true, Ordering::SeqCst))?;

    spawn_input(Arc::clone(&bridge), ui.marshaler())?;
    println!("{}", commands::HELP);

    tracing::info!("Entering UI loop");
    ui.run();

    shutdown::shutdown(&bridge, &bus, Some(printer));
    Ok(())
}

// =============================================================================
// HELPER THREADS
// =============================================================================

/// Print bus events until the shell shuts down.
fn spawn_printer(mut rx: broadcast::Receiver<BridgeEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tether-printer".into())
        .spawn(move || loop {
            match rx.blocking_recv() {
                Ok(BridgeEvent::Push(event)) => {
                    println!("push {} {:?}: {}", event.subject, event.action, event.object);
                }
                Ok(BridgeEvent::UnparsedPush(payload)) => println!("push: {payload}"),
                Ok(BridgeEvent::UserNotification(message)) => println!("notice: {message}"),
                Ok(BridgeEvent::Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                Ok(BridgeEvent::Unknown) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event printer fell behind");
                }
            }
        })
}

/// Read commands from stdin. EOF or `quit` stops the UI loop.
fn spawn_input(bridge: Arc<Bridge>, marshaler: UiMarshaler) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tether-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("stdin read failed: {e}");
                        break;
                    }
                };
                match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = commands::execute(&bridge, command) {
                            eprintln!("error: {e}");
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            tracing::debug!("input closed");
            marshaler.quit();
        })
}

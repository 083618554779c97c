//! Surface lifecycle demo
//!
//! Drives a surface manager the way a mobile embedder does: a UI thread reports
//! window lifecycle events through the mailbox, a resource thread switches the
//! resource context while uploading, and the main thread renders frames and
//! applies window messages between them. Runs against the headless context.
//!
//! Usage: `surface_demo [config.toml|config.ron]`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use gpu_surface::foundation::{logging, time::FrameTimer};
use gpu_surface::prelude::*;
use gpu_surface::render::compositor::EmbeddedViewParams;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const UPLOAD_INTERVAL: Duration = Duration::from_millis(25);

/// Messages from the UI thread to the render loop
enum Control {
    /// The scripted session is over
    Finished,
}

/// Platform side: window created, rotated twice, destroyed, recreated, closed
fn run_ui_script(sender: MailboxSender, control: Sender<Control>) {
    let pause = |frames: u32| thread::sleep(FRAME_INTERVAL * frames);

    let first = NativeWindow::android(0x7f00_1000, SurfaceSize::new(1080, 1920));
    log::info!("Window {} created", first.id());
    sender.post(WindowMessage::Attach(first.clone()));
    pause(20);

    sender.post(WindowMessage::Resize(SurfaceSize::new(1920, 1080)));
    pause(20);
    sender.post(WindowMessage::Resize(SurfaceSize::new(1080, 1920)));
    pause(20);

    // The platform destroys the window before the teardown reaches the render thread
    first.invalidate();
    pause(3);
    sender.post(WindowMessage::Teardown);
    pause(10);

    let second = NativeWindow::android(0x7f00_2000, SurfaceSize::new(1080, 1920));
    log::info!("Window {} created", second.id());
    sender.post(WindowMessage::Attach(second));
    sender.post(WindowMessage::Resize(SurfaceSize::new(1080, 2340)));
    pause(20);

    sender.post(WindowMessage::Teardown);
    pause(5);

    if control.send(Control::Finished).is_err() {
        log::warn!("Render loop exited before the script finished");
    }
}

/// Resource loader: switches the resource context in and out per upload
fn run_resource_loader(resource: ResourceContextHandle, shutdown: Receiver<()>) -> u64 {
    let mut uploads = 0;
    loop {
        select! {
            recv(shutdown) -> _ => break,
            default(UPLOAD_INTERVAL) => {
                if resource.make_current() {
                    uploads += 1;
                    if !resource.clear_current() {
                        log::warn!("Could not release the resource context");
                    }
                } else {
                    log::warn!("Resource context unavailable; skipping upload");
                }
            }
        }
    }
    uploads
}

fn load_config() -> Result<ApplicationConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => ApplicationConfig::load_from_file(&path),
        None => Ok(ApplicationConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init();
            log::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    logging::init_with_config(&config.logging);
    if let Err(e) = config.validate() {
        log::warn!("Configuration is not usable, continuing to show the failure path: {}", e);
    }

    log::info!("Starting surface lifecycle demo");

    let context = Arc::new(HeadlessContext::new(config.context.clone()));
    let mut manager = SurfaceLifecycleManager::new(context.clone(), config.compositor.clone());
    if !manager.is_valid() {
        log::error!("Graphics context is not valid; nothing to render");
    }

    let backend = Arc::new(NullBackendContext::new());
    let mut surface = manager.create_gpu_surface(backend.clone());

    let mailbox = WindowMailbox::new();
    let (control_tx, control_rx) = bounded::<Control>(1);
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

    let ui = {
        let sender = mailbox.sender();
        thread::Builder::new()
            .name("ui".to_string())
            .spawn(move || run_ui_script(sender, control_tx))?
    };
    let loader = {
        let resource = manager.resource_context();
        thread::Builder::new()
            .name("io".to_string())
            .spawn(move || run_resource_loader(resource, shutdown_rx))?
    };

    let ticker = tick(FRAME_INTERVAL);
    let mut timer = FrameTimer::new();
    let mut frame_index: u64 = 0;

    loop {
        select! {
            recv(control_rx) -> _ => break,
            recv(ticker) -> _ => {}
        }

        if let Some(message) = mailbox.take() {
            log::debug!("Applying {:?}", message);
            if !manager.apply(message) {
                log::warn!("Window message could not be applied");
            }
        }

        let (Some(surface), Some(size)) = (surface.as_mut(), manager.on_screen_size()) else {
            continue;
        };

        frame_index += 1;
        let presented = match surface.acquire_frame(size) {
            Some(frame) => {
                if let Some(embedder) = frame.external_view_embedder() {
                    embedder.begin_frame(size);
                    // A platform video view shows up for part of the session
                    if frame_index % 40 < 10 {
                        let params = EmbeddedViewParams::new((0, 0), SurfaceSize::new(size.width, size.height / 3));
                        if let Err(e) = embedder.prepare_view(1, params) {
                            log::warn!("Could not place platform view: {}", e);
                        }
                    }
                }
                frame.submit()
            }
            None => false,
        };
        timer.record_frame(presented);
    }

    drop(shutdown_tx);
    let uploads = loader.join().map_err(|_| "resource thread panicked")?;
    ui.join().map_err(|_| "ui thread panicked")?;

    manager.teardown_on_screen_context();
    drop(surface);

    let (posted, coalesced) = mailbox.stats();
    log::info!(
        "Presented {} frames, dropped {}, {:.1} fps average",
        timer.presented_frames(),
        timer.dropped_frames(),
        timer.average_fps()
    );
    log::info!(
        "Window messages: {} posted, {} coalesced; {} swaps; {} backend resets; {} resource uploads",
        posted,
        coalesced,
        context.swap_count(),
        backend.resets(),
        uploads
    );
    log::info!("Surface lifecycle demo finished");
    Ok(())
}

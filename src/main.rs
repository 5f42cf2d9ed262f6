//! tabhost - A tab-strip window manager with cross-window drag
//!
//! Every tab lives in a host window with a tab strip. Tabs can be dragged
//! out of a strip: dropped on another window they join it, dropped on the
//! empty desktop they get a window of their own. Merge mode collects every
//! tab into one window; turning it off splits them out again.
//!
//! The front-end runs in a terminal: the desktop is drawn with box
//! characters and driven by the mouse.
//!
//! # Quick Start
//!
//! ```text
//! tabhost                         # One window on the home page
//! tabhost --url a.test --url b.test
//! tabhost -m                      # Start in merge mode
//! ```
//!
//! # Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | t | New tab |
//! | w / W | Close tab / window |
//! | m | Toggle merge mode |
//! | g | Edit address |
//! | [ / ] | Back / Forward |
//! | Esc | Cancel drag |

mod config;
mod core;
mod desktop;
mod ui;
mod wm;

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::surface::RenderMode;
use crate::core::{HostId, Size};
use crate::desktop::{PageFactory, VirtualDesktop};
use crate::ui::{AddressInput, Command, DesktopRenderer, KeyMapper};
use crate::wm::{DragOutcome, TabContext};

/// Command line options
#[derive(Debug, Default)]
struct Options {
    /// Override for `merge_mode` from the config file
    merge_mode: Option<bool>,
    /// Tabs to open at startup
    urls: Vec<String>,
    /// Alternate config file
    config_path: Option<PathBuf>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frame interval while an animation runs
const FRAME: Duration = Duration::from_millis(16);

/// Poll interval when idle
const IDLE_POLL: Duration = Duration::from_millis(100);

fn print_version() {
    eprintln!("tabhost {}", VERSION);
}

fn print_help() {
    eprintln!("tabhost {} - A tab-strip window manager with cross-window drag", VERSION);
    eprintln!();
    eprintln!("Usage: tabhost [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -u, --url <URL>       Open a tab on URL (repeatable)");
    eprintln!("  -m, --merge           Start in merge mode (one window)");
    eprintln!("  -s, --split           Start with merge mode off");
    eprintln!("  -c, --config <FILE>   Read configuration from FILE");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Mouse:");
    eprintln!("  Click a tab           Activate it");
    eprintln!("  Drag a tab down       Drag it out of its window");
    eprintln!("  Drop on a window      Move the tab there");
    eprintln!("  Drop on the desktop   Open it in a new window");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  t                     New tab");
    eprintln!("  w                     Close the focused tab");
    eprintln!("  W                     Close the focused window");
    eprintln!("  m                     Toggle merge mode");
    eprintln!("  g, Ctrl+L             Edit the address of the focused tab");
    eprintln!("  [ ], Alt+Left/Right   Back / Forward");
    eprintln!("  r, F5                 Reload");
    eprintln!("  x                     Stop loading");
    eprintln!("  y                     Copy the URL to the clipboard");
    eprintln!("  Esc                   Cancel a drag");
    eprintln!("  q, Ctrl+C             Quit");
    eprintln!();
    eprintln!("Configuration: ~/.tabhost/config.toml");
    eprintln!("Log file:      ~/.tabhost/tabhost.log");
    eprintln!();
    eprintln!("Color schemes: {}", crate::config::ColorScheme::list().join(", "));
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-m" | "--merge" => {
                options.merge_mode = Some(true);
            }
            "-s" | "--split" => {
                options.merge_mode = Some(false);
            }
            "-u" | "--url" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing URL argument".to_string());
                }
                options.urls.push(args[i].clone());
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config file argument".to_string());
                }
                options.config_path = Some(PathBuf::from(&args[i]));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to `~/.tabhost/tabhost.log`; the terminal belongs to the desktop
fn init_logging(config: &Config) {
    let log_path = Config::data_dir()
        .map(|dir| dir.join("tabhost.log"))
        .unwrap_or_else(|| PathBuf::from("tabhost.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(merge_mode) = options.merge_mode {
        config.merge_mode = merge_mode;
    }

    init_logging(&config);
    info!("tabhost {} starting...", VERSION);

    run(config, options)
}

/// Front-end state that is not part of the tab manager
#[derive(Default)]
struct Session {
    /// Status bar message
    message: String,
    /// Address being typed, if the address line has focus
    address: Option<String>,
    /// Where a changed merge mode is written back
    config_path: Option<PathBuf>,
    quit: bool,
}

fn run(config: Config, options: Options) -> anyhow::Result<()> {
    let (cols, rows) = DesktopRenderer::size()?;
    info!("Terminal size: {}x{}", cols, rows);

    // The bottom row is the status bar
    let desktop = VirtualDesktop::new(Size::new(cols as u32, rows.saturating_sub(1) as u32));
    let color_scheme = config.get_color_scheme();
    let frame = config.drag.preview_size();
    let mut ctx = TabContext::new(
        Box::new(desktop.clone()),
        Box::new(PageFactory::new(RenderMode::Offscreen, frame)),
        config,
    );

    let urls = if options.urls.is_empty() {
        vec![String::new()]
    } else {
        options.urls
    };
    // Startup tabs go through the same queue as requests from other threads
    let handle = ctx.handle();
    for url in urls {
        handle.open_tab(url);
    }
    ctx.run_pending();
    if ctx.registry().is_empty() {
        anyhow::bail!("no tab could be opened");
    }

    let mut renderer = DesktopRenderer::with_color_scheme(color_scheme);
    renderer.init()?;

    let mut session = Session {
        config_path: options.config_path,
        ..Session::default()
    };
    let result = run_main_loop(&mut ctx, &desktop, &mut renderer, &mut session);

    let _ = renderer.cleanup();
    if let Err(e) = &result {
        error!("Main loop failed: {}", e);
    }
    info!("tabhost exiting");
    result
}

fn run_main_loop(
    ctx: &mut TabContext,
    desktop: &VirtualDesktop,
    renderer: &mut DesktopRenderer,
    session: &mut Session,
) -> anyhow::Result<()> {
    let mut last_tick = Instant::now();
    let mut animating = false;

    ctx.run_pending();
    renderer.render(ctx, desktop, &status_line(session))?;

    loop {
        let timeout = if animating { FRAME } else { IDLE_POLL };
        let mut dirty = false;

        if event::poll(timeout)? {
            // Drain everything that is queued before drawing again
            loop {
                handle_event(ctx, desktop, session, event::read()?);
                dirty = true;
                if session.quit || !event::poll(Duration::ZERO)? {
                    break;
                }
            }
        }

        if ctx.run_pending() > 0 {
            dirty = true;
        }

        let now = Instant::now();
        animating = ctx.tick(now - last_tick);
        last_tick = now;

        if session.quit || desktop.quit_requested() {
            break;
        }
        if dirty || animating {
            renderer.render(ctx, desktop, &status_line(session))?;
        }
    }

    Ok(())
}

fn status_line(session: &Session) -> String {
    match &session.address {
        Some(address) => format!("go to: {}▏", address),
        None => session.message.clone(),
    }
}

fn handle_event(ctx: &mut TabContext, desktop: &VirtualDesktop, session: &mut Session, event: Event) {
    match event {
        Event::Key(key) => {
            if session.address.is_some() {
                if let Some(input) = KeyMapper::map_address_key(&key) {
                    edit_address(ctx, desktop, session, input);
                }
                return;
            }
            if let Some(command) = KeyMapper::map_key(&key) {
                execute(ctx, desktop, session, command);
            }
        }
        Event::Mouse(mouse) => {
            if let Some(command) = KeyMapper::map_mouse(&mouse) {
                execute(ctx, desktop, session, command);
            }
        }
        Event::Resize(cols, rows) => {
            info!("Terminal resized: {}x{}", cols, rows);
            desktop.resize(Size::new(cols as u32, rows.saturating_sub(1) as u32));
        }
        Event::FocusLost => {
            ctx.capture_lost();
        }
        _ => {}
    }
}

/// The window that keyboard commands act on
fn focused_host(ctx: &TabContext, desktop: &VirtualDesktop) -> Option<HostId> {
    desktop
        .active_window()
        .and_then(|window| ctx.registry().host_by_window(window))
        .or_else(|| ctx.registry().first_host())
}

fn execute(ctx: &mut TabContext, desktop: &VirtualDesktop, session: &mut Session, command: Command) {
    if !matches!(command, Command::PointerMove(_)) {
        session.message.clear();
    }
    let host = focused_host(ctx, desktop);

    match command {
        Command::NewTab => {
            if let Err(e) = ctx.open_tab("") {
                warn!("New tab failed: {}", e);
                session.message = format!("new tab failed: {}", e);
            }
        }
        Command::CloseTab => {
            let tab = host
                .and_then(|id| ctx.registry().host(id))
                .and_then(|window| window.active_tab().cloned());
            if let Some(tab) = tab {
                if let Err(e) = ctx.close_tab(&tab) {
                    session.message = format!("close failed: {}", e);
                }
            }
        }
        Command::CloseWindow => {
            if let Some(host) = host {
                if let Err(e) = ctx.close_window(host) {
                    session.message = format!("close failed: {}", e);
                }
            }
        }
        Command::ToggleMerge => {
            let enabled = !ctx.merge_mode();
            let report = ctx.set_merge_mode(enabled);
            session.message = if enabled {
                format!("merged {} tabs", report.moved)
            } else {
                format!("split into {} windows", report.windows_created)
            };
            if report.skipped > 0 {
                session.message.push_str(&format!(", {} skipped", report.skipped));
            }
            save_merge_mode(ctx, session, enabled);
        }
        Command::CancelDrag => {
            if let DragOutcome::Cancelled { .. } = ctx.cancel_drag() {
                session.message = "drag cancelled".to_string();
            }
        }
        Command::Back => {
            if let Some(host) = host {
                ctx.go_back(host);
            }
        }
        Command::Forward => {
            if let Some(host) = host {
                ctx.go_forward(host);
            }
        }
        Command::Refresh => {
            if let Some(host) = host {
                ctx.refresh(host);
            }
        }
        Command::Stop => {
            if let Some(host) = host {
                ctx.stop(host);
            }
        }
        Command::CopyUrl => {
            let url = host
                .and_then(|id| ctx.registry().host(id))
                .map(|window| window.nav().url.clone())
                .unwrap_or_default();
            session.message = match copy_to_clipboard(&url) {
                Ok(()) => format!("copied {}", url),
                Err(e) => {
                    warn!("Clipboard: {}", e);
                    "clipboard unavailable".to_string()
                }
            };
        }
        Command::EditAddress => {
            if host.is_some() {
                session.address = Some(String::new());
            }
        }
        Command::Quit => {
            ctx.cancel_drag();
            session.quit = true;
        }
        Command::PointerDown(point) => {
            desktop.set_cursor(point);
            ctx.pointer_down(point);
        }
        Command::PointerMove(point) => {
            desktop.set_cursor(point);
            ctx.pointer_move(point);
        }
        Command::PointerUp(point) => {
            desktop.set_cursor(point);
            session.message = describe(ctx.pointer_up(point));
        }
    }
}

/// Remember the merge mode for the next start
fn save_merge_mode(ctx: &TabContext, session: &Session, enabled: bool) {
    let mut config = ctx.config().clone();
    config.merge_mode = enabled;
    let saved = match &session.config_path {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    if let Err(e) = saved {
        warn!("Could not save merge mode: {}", e);
    }
}

fn edit_address(ctx: &mut TabContext, desktop: &VirtualDesktop, session: &mut Session, input: AddressInput) {
    let Some(address) = session.address.as_mut() else {
        return;
    };
    match input {
        AddressInput::Insert(ch) => address.push(ch),
        AddressInput::Backspace => {
            address.pop();
        }
        AddressInput::Abort => session.address = None,
        AddressInput::Submit => {
            let url = address.trim().to_string();
            session.address = None;
            if url.is_empty() {
                return;
            }
            // Posted against the window so a window closed meanwhile is skipped
            if let Some(host) = focused_host(ctx, desktop).and_then(|id| ctx.host_ref(id)) {
                ctx.handle().navigate(&host, url);
            }
        }
    }
}

fn describe(outcome: DragOutcome) -> String {
    match outcome {
        DragOutcome::Moved { tab, to, .. } => format!("moved {} to {}", tab, to),
        DragOutcome::Spawned { tab, to, .. } => format!("{} opened in {}", tab, to),
        DragOutcome::Cancelled { .. } => "drag cancelled".to_string(),
        _ => String::new(),
    }
}

fn copy_to_clipboard(text: &str) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_string())
}

/**
 * rwm :: a tiling window manager in the style of dwm
 *
 * Configuration lives in config.rs — there is no runtime config file, only
 * a value rebuilt and recompiled for every change. To follow the start-up
 * logic and main loop, start with manager.rs.
 */
use std::{env, process};

use rwm::bar::CoreFontDrawable;
use rwm::config::default_config;
use rwm::manager::Wm;
use rwm::x::backend::X11rbConnection;
use rwm::x::Connection;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 2 && args[1] == "-v" {
        println!("rwm-{}", rwm::VERSION);
        process::exit(0);
    } else if args.len() > 1 {
        eprintln!("usage: rwm [-v]");
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        tracing::error!("fatal: {e}");
        process::exit(1);
    }
}

fn run() -> rwm::error::Result<()> {
    let conn = X11rbConnection::connect()?;
    let root = conn.root();
    let cfg = default_config();
    let drawable = Box::new(CoreFontDrawable::new(root, cfg.fonts)?);

    let mut wm = Wm::new(conn, cfg, drawable)?;
    wm.scan()?;
    wm.run()
}

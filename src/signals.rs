use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};

/// What should we do when the user stops this program?
///
/// Workers are separate containers and keep running, so there is nothing to
/// tear down: tell systemd we are stopping and exit.
pub fn handle_shutdown() -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
            log::info!("Received signal {signal}, shutting down");
            std::process::exit(0);
        }
    });

    Ok(())
}

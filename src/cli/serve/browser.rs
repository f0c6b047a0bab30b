//! Open the served URL in the default browser.

use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use crate::{debug, log};

/// Platform opener command and its leading arguments.
fn opener() -> Option<(&'static str, &'static [&'static str])> {
    if cfg!(target_os = "macos") {
        Some(("open", &[]))
    } else if cfg!(windows) {
        Some(("cmd", &["/C", "start", ""]))
    } else {
        ["xdg-open", "gio", "wslview"]
            .into_iter()
            .find(|cmd| which::which(cmd).is_ok())
            .map(|cmd| -> (&'static str, &'static [&'static str]) {
                if cmd == "gio" { (cmd, &["open"]) } else { (cmd, &[]) }
            })
    }
}

/// Best effort: failures are logged, never returned.
pub fn open(url: &str) {
    let Some((program, args)) = opener() else {
        debug!("serve"; "no browser opener found");
        return;
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if let Err(e) = spawn_reaped(&mut command) {
        log!("serve"; "failed to open browser: {}", e);
    }
}

/// Spawn `command` and reap it on a detached thread once it exits.
fn spawn_reaped(command: &mut Command) -> io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = command.spawn()?;
    std::thread::Builder::new()
        .name("kiln-opener".into())
        .spawn(move || child.wait().ok())
}

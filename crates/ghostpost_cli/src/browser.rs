//! System browser launching.

use std::io;
use std::process::{Child, Command};

/// Opens `url` in the default browser without waiting for it.
pub fn open(url: &str) -> io::Result<Child> {
    command(url).spawn()
}

fn command(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("rundll32");
        cmd.args(["url.dll,FileProtocolHandler", url]);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

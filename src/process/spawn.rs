//! Process spawning utilities

use crate::result::SpawnError;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};

/// A child attached to a freshly opened PTY.
pub(crate) struct Spawned {
    pub master: Box<dyn MasterPty + Send>,
    pub child: Box<dyn Child + Send + Sync>,
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
}

/// Open a PTY, configure it for grading, and start `cmd` on it.
pub(crate) fn spawn_on_pty(cmd: CommandBuilder, size: PtySize) -> Result<Spawned, SpawnError> {
    let pty_pair = native_pty_system()
        .openpty(size)
        .map_err(|e| SpawnError::Pty(e.to_string()))?;

    #[cfg(unix)]
    configure_terminal(&*pty_pair.master)?;

    let child = pty_pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| SpawnError::Spawn(e.to_string()))?;

    // Holding the slave open here would keep the reader from ever seeing EOF.
    drop(pty_pair.slave);

    let reader = pty_pair
        .master
        .try_clone_reader()
        .map_err(|e| SpawnError::Pty(e.to_string()))?;

    let writer = pty_pair
        .master
        .take_writer()
        .map_err(|e| SpawnError::Pty(e.to_string()))?;

    Ok(Spawned {
        master: pty_pair.master,
        child,
        reader,
        writer,
    })
}

/// Turn off input echo and `\n` to `\r\n` output translation.
///
/// Typed input must not show up as program output, otherwise every `stdin`
/// would look like a response to `reject`.
#[cfg(unix)]
fn configure_terminal(master: &(dyn MasterPty + Send)) -> Result<(), SpawnError> {
    let Some(fd) = master.as_raw_fd() else {
        tracing::debug!("PTY master has no raw fd, leaving terminal modes untouched");
        return Ok(());
    };

    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(SpawnError::Pty(format!(
            "tcgetattr failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    termios.c_lflag &= !libc::ECHO;
    termios.c_oflag &= !libc::ONLCR;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(SpawnError::Pty(format!(
            "tcsetattr failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

/// Exit code of a child that has terminated, `None` while it is running.
pub(crate) fn try_exit_code(
    child: &mut Box<dyn Child + Send + Sync>,
) -> std::io::Result<Option<u32>> {
    Ok(child.try_wait()?.map(|status| status.exit_code()))
}

use std::io::{ErrorKind, Read};
use std::sync::mpsc::{Receiver, channel};
use std::thread;
use tracing::{debug, trace};

/// Spawns a background thread that forwards PTY output chunks.
///
/// The channel disconnects once the PTY reports EOF (or an I/O error, which
/// is how Linux signals a closed slave), so a disconnected receiver means the
/// program will not produce any more output.
pub fn spawn_reader<R: Read + Send + 'static>(mut reader: R, name: &str) -> Receiver<Vec<u8>> {
    let (tx, rx) = channel();
    let label = name.to_string();

    let spawned = thread::Builder::new()
        .name(format!("pty-reader {name}"))
        .spawn(move || {
            let mut buffer = [0u8; 4096];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        trace!(session = %label, bytes = n, "pty output");
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!(session = %label, error = %e, "pty reader stopped");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        // The sender was moved into the failed closure and dropped, so the
        // receiver reports a disconnect straight away.
        debug!(error = %e, "failed to start pty reader thread");
    }

    rx
}

//! mpv JSON IPC client
//!
//! One task per player process. It connects to the `--input-ipc-server`
//! socket once mpv has created it, observes the `pause` property and writes
//! queued commands. Commands sent before the connection is up are buffered.

use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tuner_core::SessionId;

/// Attempts to connect while mpv starts up
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY: Duration = Duration::from_millis(100);

/// Request id of the `pause` property observer
const OBS_PAUSE: u64 = 1;

/// Socket path for one session
pub fn socket_path(session_id: SessionId) -> PathBuf {
    std::env::temp_dir().join(format!("tuner-mpv-{}.sock", session_id))
}

/// Serialize one IPC command as a newline-terminated JSON line
pub fn command_line(args: Value) -> String {
    let mut line = json!({ "command": args }).to_string();
    line.push('\n');
    line
}

/// New value of `pause` if `line` is a property change event for it
pub fn pause_change(line: &str) -> Option<bool> {
    let event: Value = serde_json::from_str(line).ok()?;
    if event.get("event")?.as_str()? != "property-change" || event.get("name")?.as_str()? != "pause" {
        return None;
    }
    event.get("data")?.as_bool()
}

/// Handle to the IPC task of one player process
pub struct MpvIpc {
    commands: mpsc::UnboundedSender<Value>,
    task: JoinHandle<()>,
    socket: PathBuf,
}

impl MpvIpc {
    /// Start the IPC task; pause events are reported with `session_id`
    pub fn spawn(
        socket: PathBuf,
        session_id: SessionId,
        paused: Option<mpsc::UnboundedSender<SessionId>>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(socket.clone(), rx, session_id, paused));
        Self {
            commands,
            task,
            socket,
        }
    }

    pub fn set_property(&self, name: &str, value: Value) -> io::Result<()> {
        self.commands
            .send(json!(["set_property", name, value]))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "mpv IPC closed"))
    }

    /// Stop the task and remove the socket file
    pub async fn close(self) {
        self.task.abort();
        if let Err(e) = tokio::fs::remove_file(&self.socket).await {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(socket = %self.socket.display(), error = %e, "Socket not removed");
            }
        }
    }
}

async fn run(
    socket: PathBuf,
    mut commands: mpsc::UnboundedReceiver<Value>,
    session_id: SessionId,
    paused: Option<mpsc::UnboundedSender<SessionId>>,
) {
    if let Err(e) = serve(&socket, &mut commands, session_id, paused.as_ref()).await {
        warn!(session_id = %session_id, error = %e, "mpv IPC stopped");
    }
}

#[cfg(unix)]
async fn serve(
    socket: &Path,
    commands: &mut mpsc::UnboundedReceiver<Value>,
    session_id: SessionId,
    paused: Option<&mpsc::UnboundedSender<SessionId>>,
) -> io::Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let stream = connect(socket).await?;
    debug!(session_id = %session_id, socket = %socket.display(), "mpv IPC connected");

    let (read, mut write) = stream.into_split();
    write
        .write_all(command_line(json!(["observe_property", OBS_PAUSE, "pause"])).as_bytes())
        .await?;

    let mut lines = BufReader::new(read).lines();
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { return Ok(()) };
                write.write_all(command_line(command).as_bytes()).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                if pause_change(&line) == Some(true) {
                    debug!(session_id = %session_id, "Player paused");
                    if let Some(paused) = paused {
                        let _ = paused.send(session_id);
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
async fn connect(socket: &Path) -> io::Result<tokio::net::UnixStream> {
    let mut attempt = 0;
    loop {
        match tokio::net::UnixStream::connect(socket).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt + 1 >= CONNECT_ATTEMPTS => return Err(e),
            Err(_) => {
                attempt += 1;
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn serve(
    _socket: &Path,
    _commands: &mut mpsc::UnboundedReceiver<Value>,
    _session_id: SessionId,
    _paused: Option<&mpsc::UnboundedSender<SessionId>>,
) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "mpv IPC needs a unix socket",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        assert_eq!(
            command_line(json!(["set_property", "fullscreen", true])),
            "{\"command\":[\"set_property\",\"fullscreen\",true]}\n"
        );
    }

    #[test]
    fn test_pause_change() {
        assert_eq!(
            pause_change(r#"{"event":"property-change","id":1,"name":"pause","data":true}"#),
            Some(true)
        );
        assert_eq!(
            pause_change(r#"{"event":"property-change","id":1,"name":"pause","data":false}"#),
            Some(false)
        );
        assert_eq!(
            pause_change(r#"{"event":"property-change","id":2,"name":"volume","data":50}"#),
            None
        );
        assert_eq!(pause_change(r#"{"request_id":0,"error":"success"}"#), None);
        assert_eq!(pause_change("not json"), None);
    }

    #[test]
    fn test_socket_path_is_per_session() {
        let a = socket_path(SessionId::new());
        let b = socket_path(SessionId::new());
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with(".sock"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_commands_reach_socket_and_pause_is_reported() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let (paused_tx, mut paused_rx) = mpsc::unbounded_channel();
        let session_id = SessionId::new();
        let ipc = MpvIpc::spawn(socket.clone(), session_id, Some(paused_tx));
        ipc.set_property("fullscreen", json!(true)).unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        let observe = lines.next_line().await.unwrap().unwrap();
        assert!(observe.contains("observe_property"));
        let fullscreen = lines.next_line().await.unwrap().unwrap();
        assert_eq!(fullscreen, "{\"command\":[\"set_property\",\"fullscreen\",true]}");

        write
            .write_all(b"{\"event\":\"property-change\",\"id\":1,\"name\":\"pause\",\"data\":true}\n")
            .await
            .unwrap();
        assert_eq!(paused_rx.recv().await, Some(session_id));

        ipc.close().await;
        assert!(!socket.exists());
    }
}

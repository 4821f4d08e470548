//! External control surface: JSON commands on stdin, JSON events on stdout,
//! and the startup query string.
//!
//! A host process embeds the generator by writing one command object per
//! line and reading event objects back. Both directions carry a `type`
//! field naming the protocol so unrelated traffic is ignored.

use serde::Deserialize;
use serde_json::{json, Value};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver};

/// `type` value of inbound command objects.
pub const COMMAND_TYPE: &str = "meme-generator-command";

/// `type` value of outbound event objects.
pub const EVENT_TYPE: &str = "meme-generator";

/// A host-issued command, selected by its `action` field.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Command {
    /// Export the current composition.
    Download,
    /// Replace both captions.
    SetText {
        #[serde(rename = "topText", default)]
        top: String,
        #[serde(rename = "bottomText", default)]
        bottom: String,
    },
    /// Replace all three selections by catalog index; `null` clears a layer.
    SetLayers {
        #[serde(default)]
        background: Option<usize>,
        #[serde(default)]
        pose: Option<usize>,
        #[serde(default)]
        charm: Option<usize>,
    },
}

impl Command {
    /// Parse one line of host input. Objects with a different `type` are an
    /// error so the caller can log and skip them.
    pub fn parse(line: &str) -> Result<Command, String> {
        let value: Value =
            serde_json::from_str(line).map_err(|err| format!("invalid command JSON: {err}"))?;
        match value.get("type").and_then(Value::as_str) {
            Some(COMMAND_TYPE) => {}
            other => return Err(format!("not a command object (type: {other:?})")),
        }
        serde_json::from_value(value).map_err(|err| format!("unknown command: {err}"))
    }
}

/// Events emitted back to the host on stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// All catalog images have settled; the generator accepts commands.
    Ready,
    /// An export finished and was written to `path`.
    ImageGenerated { path: String },
}

impl Event {
    pub fn to_json(&self) -> Value {
        match self {
            Event::Ready => json!({ "type": EVENT_TYPE, "action": "ready" }),
            Event::ImageGenerated { path } => json!({
                "type": EVENT_TYPE,
                "action": "image-generated",
                "imageUrl": path,
            }),
        }
    }

    /// Write the event as one line on stdout.
    pub fn emit(&self) {
        println!("{}", self.to_json());
    }
}

/// Initial selections and captions taken from the first CLI argument, a URL
/// query string like `bg=2&pose=0&topText=gm`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartupConfig {
    pub background: Option<usize>,
    pub pose: Option<usize>,
    pub charm: Option<usize>,
    pub top_text: Option<String>,
    pub bottom_text: Option<String>,
}

impl StartupConfig {
    pub fn from_query(query: &str) -> Self {
        let mut config = StartupConfig::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, raw)) = pair.split_once('=') else {
                continue;
            };
            let value = decode_component(raw);
            match key {
                "bg" => config.background = value.parse().ok(),
                "pose" => config.pose = value.parse().ok(),
                "charm" => config.charm = value.parse().ok(),
                "topText" => config.top_text = Some(value),
                "bottomText" => config.bottom_text = Some(value),
                _ => log::debug!("ignoring unknown query parameter {key}"),
            }
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        *self == StartupConfig::default()
    }
}

/// Minimal percent-decoding: `+` and `%XX` sequences; malformed escapes pass
/// through literally.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut i = 0;
    let mut buf = Vec::new();
    while i < bytes.len() {
        match bytes[i] {
            b'+' => buf.push(b' '),
            b'%' => {
                if let Some(byte) = raw
                    .get(i + 1..i + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    buf.push(byte);
                    i += 3;
                    continue;
                }
                buf.push(b'%');
            }
            b => buf.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Spawn the stdin reader. Each well-formed command line is forwarded on the
/// channel; everything else is logged and dropped. The thread ends when
/// stdin closes.
pub fn start_stdin_listener() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("stdin read failed: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                Err(err) => log::warn!("dropping command line: {err}"),
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_command_parses() {
        let command =
            Command::parse(r#"{"type":"meme-generator-command","action":"download"}"#).unwrap();
        assert_eq!(command, Command::Download);
    }

    #[test]
    fn set_text_command_carries_both_captions() {
        let command = Command::parse(
            r#"{"type":"meme-generator-command","action":"set-text","topText":"GM","bottomText":"frens"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::SetText {
                top: "GM".to_string(),
                bottom: "frens".to_string(),
            }
        );
    }

    #[test]
    fn set_layers_null_clears_a_layer() {
        let command = Command::parse(
            r#"{"type":"meme-generator-command","action":"set-layers","background":2,"pose":0,"charm":null}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::SetLayers {
                background: Some(2),
                pose: Some(0),
                charm: None,
            }
        );
    }

    #[test]
    fn wrong_type_and_unknown_action_are_rejected() {
        assert!(Command::parse(r#"{"type":"other","action":"download"}"#).is_err());
        assert!(Command::parse(r#"{"action":"download"}"#).is_err());
        assert!(
            Command::parse(r#"{"type":"meme-generator-command","action":"self-destruct"}"#).is_err()
        );
        assert!(Command::parse("not json").is_err());
    }

    #[test]
    fn events_serialize_with_the_protocol_type() {
        assert_eq!(
            Event::Ready.to_json(),
            serde_json::json!({"type": "meme-generator", "action": "ready"})
        );
        let event = Event::ImageGenerated {
            path: "/tmp/bani-meme.png".to_string(),
        };
        assert_eq!(
            event.to_json(),
            serde_json::json!({
                "type": "meme-generator",
                "action": "image-generated",
                "imageUrl": "/tmp/bani-meme.png",
            })
        );
    }

    #[test]
    fn startup_query_parses_indices_and_text() {
        let config = StartupConfig::from_query("?bg=2&pose=0&topText=hello%20there&bottomText=gm+frens");
        assert_eq!(config.background, Some(2));
        assert_eq!(config.pose, Some(0));
        assert_eq!(config.charm, None);
        assert_eq!(config.top_text.as_deref(), Some("hello there"));
        assert_eq!(config.bottom_text.as_deref(), Some("gm frens"));
    }

    #[test]
    fn malformed_query_pieces_are_skipped() {
        let config = StartupConfig::from_query("bg=notanumber&flag&unknown=1");
        assert!(config.is_empty());
    }
}

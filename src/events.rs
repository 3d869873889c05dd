//! Session output and exit notifications.
//!
//! Every event names the tool it came from, so any number of listeners can
//! follow any number of sessions.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub tool_name: String,
    pub data: Vec<u8>,
}

impl SessionData {
    /// Lossy text of the chunk. Chunks from the registry never end inside a
    /// UTF-8 sequence, so only genuinely invalid bytes become U+FFFD.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExit {
    pub tool_name: String,
    pub exit_code: i32,
}

/// Length of a trailing UTF-8 sequence in `bytes` that is still missing bytes.
pub fn utf8_incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let needed = match b {
            b if b & 0xE0 == 0xC0 => 2,
            b if b & 0xF0 == 0xE0 => 3,
            b if b & 0xF8 == 0xF0 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Data(SessionData),
    Exit(SessionExit),
}

impl SessionEvent {
    pub fn tool_name(&self) -> &str {
        match self {
            SessionEvent::Data(d) => &d.tool_name,
            SessionEvent::Exit(e) => &e.tool_name,
        }
    }
}

/// Receives events from the reader and waiter threads of every session.
pub trait SessionEventSink: Send + Sync + 'static {
    fn emit(&self, event: SessionEvent);
}

impl<F> SessionEventSink for F
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    fn emit(&self, event: SessionEvent) {
        self(event)
    }
}

struct Subscriber {
    tool_name: Option<String>,
    tx: Sender<SessionEvent>,
}

/// Fan-out sink. Each subscription gets its own channel; dropped receivers are pruned.
#[derive(Default)]
pub struct SessionBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SessionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events from every session.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.add(None)
    }

    /// Events from the session of one tool.
    pub fn subscribe_tool(&self, tool_name: impl Into<String>) -> Receiver<SessionEvent> {
        self.add(Some(tool_name.into()))
    }

    fn add(&self, tool_name: Option<String>) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(Subscriber { tool_name, tx });
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl SessionEventSink for SessionBus {
    fn emit(&self, event: SessionEvent) {
        self.subscribers.lock().retain(|sub| {
            match &sub.tool_name {
                Some(name) if name != event.tool_name() => true,
                _ => sub.tx.send(event.clone()).is_ok(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit(tool: &str, code: i32) -> SessionEvent {
        SessionEvent::Exit(SessionExit {
            tool_name: tool.to_string(),
            exit_code: code,
        })
    }

    #[test]
    fn incomplete_tail_detection() {
        let e_acute = "é".as_bytes();
        let euro = "€".as_bytes();
        assert_eq!(utf8_incomplete_tail(b"plain"), 0);
        assert_eq!(utf8_incomplete_tail(b""), 0);
        assert_eq!(utf8_incomplete_tail(&[b'x', e_acute[0]]), 1);
        assert_eq!(utf8_incomplete_tail(e_acute), 0);
        assert_eq!(utf8_incomplete_tail(&euro[..2]), 2);
        assert_eq!(utf8_incomplete_tail(euro), 0);
        assert_eq!(utf8_incomplete_tail(&"😀".as_bytes()[..3]), 3);
        // A stray continuation byte is invalid, not incomplete.
        assert_eq!(utf8_incomplete_tail(&[b'a', 0x80]), 0);
    }

    #[test]
    fn tool_subscription_filters_by_name() {
        let bus = SessionBus::new();
        let all = bus.subscribe();
        let foo = bus.subscribe_tool("Foo");

        bus.emit(exit("Bar", 1));
        bus.emit(exit("Foo", 0));

        assert_eq!(all.try_iter().count(), 2);
        assert_eq!(foo.try_iter().collect::<Vec<_>>(), vec![exit("Foo", 0)]);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = SessionBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        drop(bus.subscribe_tool("Foo"));
        assert_eq!(bus.subscriber_count(), 3);

        bus.emit(exit("Foo", 0));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn closures_are_sinks() {
        let (tx, rx) = channel();
        let tx = Mutex::new(tx);
        let sink = move |event: SessionEvent| {
            let _ = tx.lock().send(event);
        };
        sink.emit(exit("Foo", 3));
        assert_eq!(rx.recv().unwrap(), exit("Foo", 3));
    }

    #[test]
    fn payloads_use_camel_case() {
        let data = SessionData {
            tool_name: "Foo".into(),
            data: b"hi\r\n".to_vec(),
        };
        assert_eq!(data.text(), "hi\r\n");
        let exit = serde_json::to_value(SessionExit {
            tool_name: "Foo".into(),
            exit_code: 3,
        })
        .unwrap();
        assert_eq!(exit["toolName"], "Foo");
        assert_eq!(exit["exitCode"], 3);
    }
}

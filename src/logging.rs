//! Logging backend which writes to a file from a background thread.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::OnceCell;
use std::{
    fs::File,
    io::Write,
    sync::{mpsc, Mutex},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MessageType {
    Normal,
    Error,
    Warning,
    Debug,
}

impl MessageType {
    fn from_level(level: Level) -> MessageType {
        match level {
            Level::Error => MessageType::Error,
            Level::Warn => MessageType::Warning,
            Level::Info => MessageType::Normal,
            Level::Debug | Level::Trace => MessageType::Debug,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MessageType::Normal => "info",
            MessageType::Error => "error",
            MessageType::Warning => "warning",
            MessageType::Debug => "debug",
        }
    }
}

struct Message {
    module: String,
    msg_type: MessageType,
    string: String,
    time: String,
}

impl Message {
    /// Formats the message as a single log line:
    ///      [date time] [module] [level] Text
    fn line(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}\n",
            self.time,
            self.module,
            self.msg_type.name(),
            self.string
        )
    }

    fn write_to_file(&self, file: &mut File) {
        let _ = file.write_all(self.line().as_bytes());
    }
}

pub struct Logger;

impl Logger {
    fn message(record: &Record) -> Option<Message> {
        let module = record.module_path()?.split("::").last().unwrap_or("unknown");

        Some(Message {
            module: module.to_string(),
            msg_type: MessageType::from_level(record.level()),
            string: record.args().to_string(),
            time: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        })
    }

    fn commit(&self, record: &Record) {
        let message = match Self::message(record) {
            Some(message) => message,
            None => return,
        };

        // Messages logged before the writer thread exists are dropped.
        if let Some(sender) = MSG_SENDER.get() {
            if let Ok(sender) = sender.lock() {
                let _ = sender.send(message);
            }
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.commit(record);
        }
    }

    fn flush(&self) {}
}

static LOGGER: Logger = Logger;
static MSG_SENDER: OnceCell<Mutex<mpsc::Sender<Message>>> = OnceCell::new();

fn max_level() -> LevelFilter {
    if cfg!(feature = "debug") {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    }
}

fn panic_message(info: &std::panic::PanicHookInfo) -> String {
    let payload = info.payload();

    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "no message".to_string())
}

#[cfg(all(windows, target_arch = "x86"))]
fn image_base() -> String {
    match crate::hook::image_base() {
        Ok(base) => format!("{base:#x}"),
        Err(err) => format!("unknown ({err})"),
    }
}

#[cfg(not(all(windows, target_arch = "x86")))]
fn image_base() -> String {
    "unknown".to_string()
}

fn panic_hook(info: &std::panic::PanicHookInfo) {
    let message = panic_message(info);
    let location = info
        .location()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());

    let info_dump = format!(
        "The level customizer crashed. The game can't safely continue.

Image base: {}
Message: {message}
Location: {location}
Time: {}

{:?}",
        image_base(),
        Local::now(),
        backtrace::Backtrace::new()
    );

    log::error!("{info_dump}");

    let _ = std::fs::write(crate::meta::resources::panic_path(), &info_dump);

    // Unwinding into game frames is undefined behaviour.
    std::process::abort();
}

pub fn init() {
    std::panic::set_hook(Box::new(panic_hook));

    let file = match File::create(crate::meta::resources::log_path()) {
        Ok(file) => file,

        // Without a file there's nowhere for messages to go.
        Err(_) => return,
    };

    if log::set_logger(&LOGGER).is_err() {
        return;
    }

    log::set_max_level(max_level());

    let (sender, receiver) = mpsc::channel::<Message>();

    if MSG_SENDER.set(Mutex::new(sender)).is_err() {
        return;
    }

    // Writing happens on a background thread so that the game thread never waits on the disk.
    std::thread::spawn(move || {
        let mut file = file;

        for msg in receiver {
            msg.write_to_file(&mut file);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let message = Message {
            module: "config".to_string(),
            msg_type: MessageType::Warning,
            string: "hello".to_string(),
            time: "2024-01-01 00:00:00.000".to_string(),
        };

        assert_eq!(
            message.line(),
            "[2024-01-01 00:00:00.000] [config] [warning] hello\n"
        );
    }

    #[test]
    fn module_is_last_path_segment() {
        let message = Logger::message(
            &Record::builder()
                .args(format_args!("loaded"))
                .level(Level::Info)
                .module_path(Some("level_customizer::meta::config"))
                .build(),
        )
        .unwrap();

        assert_eq!(message.module, "config");
        assert_eq!(message.msg_type, MessageType::Normal);
        assert_eq!(message.string, "loaded");
    }

    #[test]
    fn records_without_module_are_dropped() {
        let message = Logger::message(
            &Record::builder()
                .args(format_args!("x"))
                .level(Level::Error)
                .build(),
        );

        assert!(message.is_none());
    }
}

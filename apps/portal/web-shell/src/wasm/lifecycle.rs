use super::*;

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Installs a `tracing` subscriber that prints to the browser console.
/// Only the first call per page takes effect.
pub(super) fn install_console_logging(level: &str) {
    let level = level.trim().parse::<Level>().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();
}

struct ConsoleMakeWriter;

/// Buffers one formatted event and flushes it to the console method that
/// matches its level.
struct ConsoleWriter {
    level: Level,
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        let line = JsValue::from_str(line.trim_end());
        match self.level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buffer: Vec::new(),
        }
    }
}

/// Reads page configuration from the constructor argument, falling back to
/// `window.__PORTAL_CONFIG__`, then to defaults.
pub(super) fn load_config(explicit: &JsValue) -> Result<PortalConfig, ConfigError> {
    let source = if explicit.is_undefined() || explicit.is_null() {
        config_global()
    } else {
        Some(explicit.clone())
    };
    let Some(source) = source else {
        return Ok(PortalConfig::default());
    };
    if let Some(raw) = source.as_string() {
        return PortalConfig::from_json(&raw);
    }
    let raw: String = js_sys::JSON::stringify(&source)
        .map_err(|_| ConfigError::Decode("config is not serializable".to_string()))?
        .into();
    PortalConfig::from_json(&raw)
}

fn config_global() -> Option<JsValue> {
    let window = web_sys::window()?;
    let value = js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL)).ok()?;
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(value)
    }
}

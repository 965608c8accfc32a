//! Tracing infrastructure with per-component channels.
//!
//! Control via the MATCHA_DEBUG environment variable:
//! - `MATCHA_DEBUG=*` - Enable all components
//! - `MATCHA_DEBUG=machine` - Enable only the machine
//! - `MATCHA_DEBUG=machine,compile` - Enable several
//!
//! Verbosity via MATCHA_DEBUG_VERBOSITY (1-2, default 1). Level 2 adds
//! per-step detail.

use std::env;
use std::sync::OnceLock;

use hashbrown::HashSet;

enum Enabled {
    All,
    None,
    Components(HashSet<String>),
}

struct Config {
    enabled: Enabled,
    verbosity: u8,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let enabled = match env::var("MATCHA_DEBUG").ok().as_deref() {
            None | Some("") => Enabled::None,
            Some("*") | Some("1") | Some("true") => Enabled::All,
            Some(value) => {
                let set: HashSet<_> = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if set.is_empty() {
                    Enabled::None
                } else {
                    Enabled::Components(set)
                }
            }
        };
        let verbosity = env::var("MATCHA_DEBUG_VERBOSITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(|v: u8| v.clamp(1, 2))
            .unwrap_or(1);
        Config { enabled, verbosity }
    })
}

/// A tracing channel for one component.
///
/// Disabled channels are inert; the macros below skip the format cost
/// entirely when a channel is off.
pub struct Tracer {
    name: &'static str,
    enabled: bool,
}

impl Tracer {
    pub const fn disabled() -> Self {
        Self {
            name: "",
            enabled: false,
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn detailed(&self) -> bool {
        self.enabled && config().verbosity >= 2
    }

    pub fn emit(&self, msg: &str) {
        if self.enabled {
            eprintln!("[{}] {}", self.name, msg);
        }
    }

    pub fn detail(&self, msg: &str) {
        if self.detailed() {
            eprintln!("[{}] {}", self.name, msg);
        }
    }
}

/// Create a tracing channel. The name must be a static string.
pub fn tracer(name: &'static str) -> Tracer {
    let on = match &config().enabled {
        Enabled::None => false,
        Enabled::All => true,
        Enabled::Components(set) => set.contains(name),
    };
    if on {
        Tracer { name, enabled: true }
    } else {
        Tracer::disabled()
    }
}

// Macros - avoid format! cost when the channel is disabled

#[macro_export]
macro_rules! trace {
    ($tracer:expr, $($arg:tt)*) => {
        if $tracer.enabled() {
            $tracer.emit(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! trace_detail {
    ($tracer:expr, $($arg:tt)*) => {
        if $tracer.detailed() {
            $tracer.detail(&format!($($arg)*));
        }
    };
}

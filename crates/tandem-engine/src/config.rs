//! Session-level tunables (§10.3): the defaults §4 states inline, collected
//! into one struct so the CLI can load them from a TOML file and override
//! them with flags instead of every crate hard-coding its own constant.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_core::{Key, Modifiers};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Leader hot-key rune (§4.6 default: `b`, held with `ctrl`).
    pub leader_key: char,
    pub leader_ctrl: bool,
    pub leader_alt: bool,
    pub leader_shift: bool,
    /// How long a leader press stays armed before auto-deactivating, in
    /// milliseconds (§4.6, §8 scenario 4 default: 1000).
    pub leader_window_ms: u64,
    /// Mouse-move coalescing interval in milliseconds (§4.6).
    pub mouse_coalesce_ms: u64,
    /// Grace period before a hung-up pty is escalated to `SIGKILL`, in
    /// milliseconds. Overrides `tandem-terminal`'s own 200ms default via
    /// `Terminal::set_shutdown_grace`.
    pub pty_shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            leader_key: 'b',
            leader_ctrl: true,
            leader_alt: false,
            leader_shift: false,
            leader_window_ms: 1000,
            mouse_coalesce_ms: 16,
            pty_shutdown_grace_ms: 200,
        }
    }
}

impl Config {
    pub fn leader(&self) -> (Key, Modifiers) {
        (
            Key::Char(self.leader_key),
            Modifiers {
                ctrl: self.leader_ctrl,
                alt: self.leader_alt,
                shift: self.leader_shift,
                ..Modifiers::default()
            },
        )
    }

    pub fn leader_window(&self) -> Duration {
        Duration::from_millis(self.leader_window_ms)
    }

    pub fn mouse_coalesce(&self) -> Duration {
        Duration::from_millis(self.mouse_coalesce_ms)
    }

    pub fn pty_shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.pty_shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_input_routers_own_defaults() {
        let config = Config::default();
        assert_eq!(config.leader(), (Key::Char('b'), Modifiers { ctrl: true, ..Modifiers::default() }));
        assert_eq!(config.leader_window(), Duration::from_secs(1));
        assert_eq!(config.mouse_coalesce(), Duration::from_millis(16));
        assert_eq!(config.pty_shutdown_grace(), Duration::from_millis(200));
    }
}

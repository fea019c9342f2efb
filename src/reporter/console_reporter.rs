//! Console-based event reporter.

use std::io::{self, Write};

use crate::domain::{CaptureStats, SignatureMatch};
use crate::reporter::EventReporter;

/// Payload bytes shown in verbose mode.
const HEX_DUMP_LIMIT: usize = 64;

/// Reports signature matches to stdout.
pub struct ConsoleReporter {
    /// Whether to include a payload hex dump
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter.
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Enable or disable verbose output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn format_event(&self, event: &SignatureMatch) -> String {
        let mut output = format!("TCP Port: {} -> {}", event.src_port(), event.dst_port());

        for line in event.layer_summary() {
            output.push_str("\n  ");
            output.push_str(&line);
        }

        if self.verbose && !event.tcp.payload.is_empty() {
            output.push_str("\n  Payload:");
            for chunk in event.tcp.payload[..event.tcp.payload.len().min(HEX_DUMP_LIMIT)].chunks(16) {
                output.push_str("\n    ");
                output.push_str(&hex_line(chunk));
            }
            if event.tcp.payload.len() > HEX_DUMP_LIMIT {
                output.push_str(&format!(
                    "\n    ... {} more bytes",
                    event.tcp.payload.len() - HEX_DUMP_LIMIT
                ));
            }
        }

        output
    }
}

fn hex_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventReporter for ConsoleReporter {
    fn report(&self, event: &SignatureMatch) {
        let output = self.format_event(event);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
    }

    fn on_start(&self, interface: &str) {
        println!("Capturing on interface: {}", interface);
        println!("Press Ctrl+C to stop.\n");
    }

    fn on_stop(&self, stats: &CaptureStats) {
        println!("\nStopped capture: {}", stats);
    }
}

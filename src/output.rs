use crate::signal::Cancellation;
use anyhow::{Context, Result};
use std::io::{BufRead, ErrorKind, Write};

/// Why relaying stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelayEnd {
    /// tcpdump closed its stdout.
    Eof,
    /// The reader of our output went away, e.g. `netcap -r x.pcap | head`.
    OutputClosed,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Relay {
    pub packets: usize,
    pub end: RelayEnd,
}

/// Copies tcpdump's text output to `out` byte for byte and counts the packets
/// seen. Cancellation is checked between lines.
pub fn relay_packets<R: BufRead, W: Write>(
    mut reader: R,
    mut out: W,
    cancel: &impl Cancellation,
) -> Result<Relay> {
    let mut packets = 0;
    let mut line = Vec::new();

    let end = loop {
        if cancel.is_cancelled() {
            break RelayEnd::Cancelled;
        }

        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .context("failed to read capture output")?;
        if n == 0 {
            break RelayEnd::Eof;
        }

        // -v 模式下一个包占多行，续行以空白开头。
        if is_packet_line(&line) {
            packets += 1;
        }

        match out.write_all(&line) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::BrokenPipe => break RelayEnd::OutputClosed,
            Err(err) => return Err(err).context("failed to write capture output"),
        }
    };

    if end != RelayEnd::OutputClosed {
        out.flush().ok();
    }
    Ok(Relay { packets, end })
}

fn is_packet_line(line: &[u8]) -> bool {
    match line.first() {
        Some(b) => !b.is_ascii_whitespace(),
        None => false,
    }
}

//! Built-in tasks
//!
//! Two statically compiled tasks ship with the agent: `ticker`, a periodic
//! counter useful for exercising streaming and cancellation, and
//! `hashcrack`, a SHA-256 prefix-range search over a fixed charset.

use crate::task::{CancelToken, Task, TaskError, TaskRegistry, TaskSink};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Search space for `hashcrack`: a-z, A-Z, 0-9
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Registry holding every built-in task
pub fn builtin_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register("ticker", Arc::new(Ticker));
    registry.register("hashcrack", Arc::new(HashCrack));
    registry
}

/// Emits a numbered progress line on a fixed cadence.
///
/// Args: `[count]` (default 100000) `[interval_ms]` (default 5000).
pub struct Ticker;

impl Task for Ticker {
    fn run(&self, args: &[String], cancel: &CancelToken, out: &TaskSink) -> Result<(), TaskError> {
        let count: u64 = parse_or(args.first(), 100_000)?;
        let interval_ms: u64 = parse_or(args.get(1), 5_000)?;

        for i in 1..=count {
            if cancel.is_cancelled() {
                out.push("ticker stopped");
                return Ok(());
            }
            out.push(format!("working... ({i})"));
            sleep_cancellable(Duration::from_millis(interval_ms), cancel);
        }
        Ok(())
    }
}

/// SHA-256 preimage search over one prefix range of the charset.
///
/// Args: `<hex digest> <start char> <end char> [suffix_len]` (default 4).
/// The first character of each candidate runs over `[start, end)`; the
/// remaining `suffix_len` characters run over the whole charset.
pub struct HashCrack;

impl Task for HashCrack {
    fn run(&self, args: &[String], cancel: &CancelToken, out: &TaskSink) -> Result<(), TaskError> {
        let [digest_hex, start, end, ..] = args else {
            return Err(TaskError::InvalidArgs(
                "usage: <hex digest> <start char> <end char> [suffix_len]".into(),
            ));
        };
        let target = parse_digest(digest_hex)?;
        let start_idx = charset_index(start)?;
        let end_idx = charset_index(end)?;
        let suffix_len: usize = parse_or(args.get(3), 4)?;

        for &first in CHARSET[start_idx..end_idx].iter() {
            if cancel.is_cancelled() {
                out.push("hash search cancelled");
                return Ok(());
            }
            out.push(format!("scanning prefix '{}'", first as char));

            if let Some(found) = search_prefix(first, suffix_len, &target, cancel) {
                out.push(format!("FOUND: {found}"));
                return Ok(());
            }
            if cancel.is_cancelled() {
                out.push("hash search cancelled");
                return Ok(());
            }
        }

        out.push("range exhausted, no match");
        Ok(())
    }
}

/// Enumerate `prefix + suffix` candidates, polling cancellation periodically
fn search_prefix(
    prefix: u8,
    suffix_len: usize,
    target: &[u8; 32],
    cancel: &CancelToken,
) -> Option<String> {
    let mut candidate = vec![prefix];
    candidate.extend(std::iter::repeat(CHARSET[0]).take(suffix_len));
    let mut odometer = vec![0usize; suffix_len];
    let mut since_poll = 0u32;

    loop {
        if Sha256::digest(&candidate)[..] == target[..] {
            // Charset is ASCII throughout.
            return Some(String::from_utf8_lossy(&candidate).into_owned());
        }

        since_poll += 1;
        if since_poll == 4096 {
            since_poll = 0;
            if cancel.is_cancelled() {
                return None;
            }
        }

        // Advance the suffix odometer; done once it wraps around.
        let mut pos = suffix_len;
        loop {
            if pos == 0 {
                return None;
            }
            pos -= 1;
            odometer[pos] += 1;
            if odometer[pos] < CHARSET.len() {
                candidate[1 + pos] = CHARSET[odometer[pos]];
                break;
            }
            odometer[pos] = 0;
            candidate[1 + pos] = CHARSET[0];
        }
    }
}

fn parse_or<T: std::str::FromStr>(arg: Option<&String>, default: T) -> Result<T, TaskError> {
    match arg {
        Some(raw) => raw
            .parse()
            .map_err(|_| TaskError::InvalidArgs(format!("not a number: '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_digest(hex: &str) -> Result<[u8; 32], TaskError> {
    if hex.len() != 64 {
        return Err(TaskError::InvalidArgs(format!(
            "digest must be 64 hex chars, got {}",
            hex.len()
        )));
    }
    let mut digest = [0u8; 32];
    for (i, byte) in digest.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|_| TaskError::InvalidArgs("digest is not valid hex".into()))?;
    }
    Ok(digest)
}

fn charset_index(arg: &str) -> Result<usize, TaskError> {
    let [c] = arg.as_bytes() else {
        return Err(TaskError::InvalidArgs(format!(
            "range bound must be a single charset character, got '{arg}'"
        )));
    };
    CHARSET
        .iter()
        .position(|b| b == c)
        .ok_or_else(|| TaskError::InvalidArgs(format!("'{}' not in charset", *c as char)))
}

fn sleep_cancellable(total: Duration, cancel: &CancelToken) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !remaining.is_zero() && !cancel.is_cancelled() {
        let nap = remaining.min(slice);
        std::thread::sleep(nap);
        remaining -= nap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskOutput;
    use tokio::sync::mpsc;

    fn harness() -> (TaskSink, mpsc::UnboundedReceiver<TaskOutput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TaskSink::new(tx), rx)
    }

    fn lines(rx: &mut mpsc::UnboundedReceiver<TaskOutput>) -> Vec<String> {
        let mut collected = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let TaskOutput::Line(line) = item {
                collected.push(line);
            }
        }
        collected
    }

    #[test]
    fn test_ticker_completes() {
        let (sink, mut rx) = harness();
        let cancel = CancelToken::new();

        Ticker
            .run(&["3".into(), "1".into()], &cancel, &sink)
            .unwrap();

        let output = lines(&mut rx);
        assert_eq!(output.len(), 3);
        assert_eq!(output[0], "working... (1)");
        assert_eq!(output[2], "working... (3)");
    }

    #[test]
    fn test_ticker_honors_cancellation() {
        let (sink, mut rx) = harness();
        let cancel = CancelToken::new();
        cancel.cancel();

        Ticker.run(&[], &cancel, &sink).unwrap();

        assert_eq!(lines(&mut rx), vec!["ticker stopped"]);
    }

    #[test]
    fn test_ticker_rejects_bad_args() {
        let (sink, _rx) = harness();
        let result = Ticker.run(&["many".into()], &CancelToken::new(), &sink);
        assert!(matches!(result, Err(TaskError::InvalidArgs(_))));
    }

    #[test]
    fn test_hashcrack_finds_known_preimage() {
        let target = format!("{:x}", Sha256::digest(b"ab"));
        let (sink, mut rx) = harness();

        HashCrack
            .run(
                &[target, "a".into(), "b".into(), "1".into()],
                &CancelToken::new(),
                &sink,
            )
            .unwrap();

        let output = lines(&mut rx);
        assert!(output.iter().any(|l| l == "FOUND: ab"), "{output:?}");
    }

    #[test]
    fn test_hashcrack_exhausts_range_without_match() {
        let target = format!("{:x}", Sha256::digest(b"no-such-candidate"));
        let (sink, mut rx) = harness();

        HashCrack
            .run(
                &[target, "a".into(), "c".into(), "1".into()],
                &CancelToken::new(),
                &sink,
            )
            .unwrap();

        let output = lines(&mut rx);
        assert_eq!(output.last().unwrap(), "range exhausted, no match");
    }

    #[test]
    fn test_hashcrack_rejects_bad_args() {
        let (sink, _rx) = harness();
        let cancel = CancelToken::new();

        assert!(matches!(
            HashCrack.run(&[], &cancel, &sink),
            Err(TaskError::InvalidArgs(_))
        ));
        assert!(matches!(
            HashCrack.run(&["ab".into(), "a".into(), "z".into()], &cancel, &sink),
            Err(TaskError::InvalidArgs(_))
        ));
        let valid_digest = "0".repeat(64);
        assert!(matches!(
            HashCrack.run(&[valid_digest, "!".into(), "z".into()], &cancel, &sink),
            Err(TaskError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_hashcrack_stops_when_cancelled() {
        let target = "0".repeat(64);
        let (sink, mut rx) = harness();
        let cancel = CancelToken::new();
        cancel.cancel();

        HashCrack
            .run(
                &[target, "a".into(), "z".into(), "2".into()],
                &cancel,
                &sink,
            )
            .unwrap();

        let output = lines(&mut rx);
        assert_eq!(output, vec!["hash search cancelled"]);
    }

    #[test]
    fn test_builtin_registry_contents() {
        let registry = builtin_registry();
        assert!(registry.get("ticker").is_some());
        assert!(registry.get("hashcrack").is_some());
    }
}

//! Device transport abstraction
//!
//! A [`Transport`] moves one output packet to the token and one input report
//! back, blocking in both directions. Backends only implement the three raw
//! operations; framing, logging and retries are layered on top here so every
//! backend behaves the same.

use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{encode_packet, Command, Framing, Response};

/// Bounded retry policy for reads
///
/// Some tokens drop the first response after a command, so reads of
/// configuration responses are attempted several times before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of read attempts (at least one is always made)
    pub tries: usize,
    /// Pause after each failed attempt except the last
    pub delay: Duration,
}

impl RetryPolicy {
    /// Default number of read attempts
    pub const DEFAULT_TRIES: usize = 5;
    /// Default pause between attempts
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    /// Create a policy with the given attempts and delay
    pub const fn new(tries: usize, delay: Duration) -> Self {
        Self { tries, delay }
    }

    /// Policy that retries without sleeping
    pub const fn immediate(tries: usize) -> Self {
        Self::new(tries, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TRIES, Self::DEFAULT_DELAY)
    }
}

/// Blocking request/response channel to one token
pub trait Transport {
    /// Write one complete output packet (report id first)
    fn write_packet(&mut self, packet: &[u8]) -> Result<()>;

    /// Read one input report, waiting at most `timeout`
    ///
    /// Implementations return [`Error::Timeout`](crate::Error::Timeout) if
    /// nothing arrived in time.
    fn read_report(&mut self, timeout: Duration) -> Result<Response>;

    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);

    /// Frame and send a command
    fn send(&mut self, framing: Framing, command: Command, payload: &[u8]) -> Result<()> {
        let packet = encode_packet(framing, command, payload)?;
        log::trace!(
            "-> {} {:?} payload {:02x?}",
            command,
            framing,
            payload
        );
        self.write_packet(&packet)
    }

    /// Receive one response
    fn receive(&mut self, timeout: Duration) -> Result<Response> {
        let response = self.read_report(timeout)?;
        log::trace!("<- {:?}", response);
        Ok(response)
    }

    /// Receive with bounded retries
    ///
    /// Makes up to `policy.tries` attempts. Any error is retried; the result
    /// of the final attempt is returned as-is, so callers still have to
    /// inspect it.
    fn receive_with_retries(&mut self, policy: &RetryPolicy, timeout: Duration) -> Result<Response> {
        let tries = policy.tries.max(1);
        for attempt in 1..tries {
            match self.receive(timeout) {
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    log::debug!("Read attempt {}/{} timed out", attempt, tries);
                }
                Err(e) => {
                    log::debug!("Read attempt {}/{} failed: {}", attempt, tries, e);
                }
            }
            if !policy.delay.is_zero() {
                thread::sleep(policy.delay);
            }
        }
        self.receive(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        (**self).write_packet(packet)
    }

    fn read_report(&mut self, timeout: Duration) -> Result<Response> {
        (**self).read_report(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Transport that fails a fixed number of reads before answering
    struct Flaky {
        failures_left: usize,
        reads: usize,
        writes: Vec<Vec<u8>>,
        closed: usize,
    }

    impl Flaky {
        fn new(failures: usize) -> Self {
            Self {
                failures_left: failures,
                reads: 0,
                writes: Vec::new(),
                closed: 0,
            }
        }
    }

    impl Transport for Flaky {
        fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
            self.writes.push(packet.to_vec());
            Ok(())
        }

        fn read_report(&mut self, _timeout: Duration) -> Result<Response> {
            self.reads += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                // Alternate causes; both must be retried
                if self.failures_left % 2 == 0 {
                    Err(Error::Timeout)
                } else {
                    Err(Error::Transport("garbled report".into()))
                }
            } else {
                Ok(Response::new(&[0x80, 1]))
            }
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    #[test]
    fn test_four_failures_then_success() {
        let mut t = Flaky::new(4);
        let resp = t
            .receive_with_retries(&RetryPolicy::immediate(5), Duration::from_millis(1))
            .unwrap();
        assert!(resp.status_ok(1));
        assert_eq!(t.reads, 5);
    }

    #[test]
    fn test_five_failures_exhaust_retries() {
        let mut t = Flaky::new(5);
        let result = t.receive_with_retries(&RetryPolicy::immediate(5), Duration::from_millis(1));
        assert!(result.is_err());
        assert_eq!(t.reads, 5);
    }

    #[test]
    fn test_success_stops_retrying() {
        let mut t = Flaky::new(0);
        t.receive_with_retries(&RetryPolicy::immediate(5), Duration::from_millis(1))
            .unwrap();
        assert_eq!(t.reads, 1);
    }

    #[test]
    fn test_zero_tries_still_reads_once() {
        let mut t = Flaky::new(0);
        assert!(t
            .receive_with_retries(&RetryPolicy::immediate(0), Duration::from_millis(1))
            .is_ok());
        assert_eq!(t.reads, 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.tries, 5);
        assert_eq!(policy.delay, Duration::from_millis(100));
    }

    #[test]
    fn test_send_frames_packet() {
        let mut t = Flaky::new(0);
        t.send(Framing::Short, Command::IsBuild, &[]).unwrap();
        t.send(Framing::Broadcast, Command::Wink, &[0, 0]).unwrap();
        assert_eq!(&t.writes[0][..2], &[0x00, 0x81]);
        assert_eq!(&t.writes[1][..6], &[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x24]);
    }

    #[test]
    fn test_boxed_transport() {
        let mut t: Box<dyn Transport> = Box::new(Flaky::new(0));
        assert!(t.receive(Duration::from_millis(1)).is_ok());
        t.close();
        t.close();
    }
}

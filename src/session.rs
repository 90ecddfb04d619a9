//! Bus session.
//!
//! A [`Session`] owns the serial link of one VISCA bus. Every request/reply
//! exchange runs under a single lock, so callers sharing the session (wrap it
//! in an [`Arc`](std::sync::Arc)) never interleave their traffic on the wire.
//!
//! Create exactly one session per bus and hand clones of the `Arc` to every
//! user; [`Session::start`] is idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};

use crate::error::{Error, Result};
use crate::protocol::command::{self, IF_CLEAR};
use crate::protocol::packet::{
    Address, MAX_PACKET_SIZE, Packet, TERMINATOR, build_request, validate_reply,
};
use crate::protocol::parser::parse_address_reply;
use crate::protocol::reply::{ReplyKind, classify};
use crate::transport::serial::SerialConfig;
use crate::transport::{SerialTransport, Transport};
use crate::zoom::ZoomTable;

/// Number of reads an inquiry may take to produce its answer.
pub const INQUIRY_ATTEMPTS: usize = 5;

/// Replies up to this length carry no data (ACK or empty completion).
pub const SHORT_REPLY_LEN: usize = 3;

/// Address handed to the first device during enumeration.
pub const FIRST_ADDRESS: u8 = 1;

/// Default pause between inquiry reads.
pub const DEFAULT_INQUIRY_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause between inquiry reads.
    pub inquiry_retry_interval: Duration,
    /// Pause between enumeration attempts in [`Session::start`].
    pub enumeration_retry_interval: Duration,
    /// Give up after this many enumeration attempts (`None` retries forever).
    pub max_enumeration_attempts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inquiry_retry_interval: DEFAULT_INQUIRY_RETRY_INTERVAL,
            enumeration_retry_interval: Duration::ZERO,
            max_enumeration_attempts: None,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause between inquiry reads.
    #[must_use]
    pub const fn inquiry_retry_interval(mut self, interval: Duration) -> Self {
        self.inquiry_retry_interval = interval;
        self
    }

    /// Sets the pause between enumeration attempts.
    #[must_use]
    pub const fn enumeration_retry_interval(mut self, interval: Duration) -> Self {
        self.enumeration_retry_interval = interval;
        self
    }

    /// Bounds the number of enumeration attempts.
    #[must_use]
    pub const fn max_enumeration_attempts(mut self, attempts: u32) -> Self {
        self.max_enumeration_attempts = Some(attempts);
        self
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Link not open, or lost.
    Closed,
    /// Opening the link.
    Opening,
    /// Assigning bus addresses.
    Enumerating,
    /// Addresses assigned; exchanges allowed.
    Ready {
        /// Number of devices found on the bus.
        devices: u8,
    },
}

impl SessionState {
    /// Returns true once enumeration succeeded.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Whether a request expects data back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Answered by a single ACK or completion.
    Command,
    /// Answered by a completion carrying data, possibly after ACKs.
    Inquiry,
}

/// Reads one packet: bytes up to and including the terminator, at most
/// [`MAX_PACKET_SIZE`] bytes.
///
/// # Errors
///
/// Returns `ReadTimeout` if the link stays silent for a whole read timeout.
/// Pending input is discarded in that case.
pub async fn read_one_packet<T: Transport + ?Sized>(transport: &mut T) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(MAX_PACKET_SIZE);
    while buf.len() < MAX_PACKET_SIZE {
        match transport.read_byte().await? {
            Some(byte) => {
                buf.push(byte);
                if byte == TERMINATOR {
                    break;
                }
            }
            None => {
                tracing::warn!("timeout waiting for reply after {} bytes", buf.len());
                transport.clear()?;
                return Err(Error::ReadTimeout {
                    received: buf.len(),
                });
            }
        }
    }
    tracing::trace!("received {}", hex::encode(&buf));
    Ok(buf)
}

/// A session on one VISCA bus.
pub struct Session<T> {
    transport: Mutex<T>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    network_changed: AtomicBool,
    zoom_table: ZoomTable,
}

impl Session<SerialTransport> {
    /// Creates a session for a serial port with default settings.
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::with_serial_config(SerialConfig::new(port))
    }

    /// Creates a session with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig) -> Self {
        Self::new(SerialTransport::new(config))
    }
}

impl<T: Transport> Session<T> {
    /// Creates a session over the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Creates a session over the given transport with custom tuning.
    #[must_use]
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Closed);
        Self {
            transport: Mutex::new(transport),
            config,
            state,
            network_changed: AtomicBool::new(false),
            zoom_table: ZoomTable::default(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Returns the number of devices found by enumeration.
    #[must_use]
    pub fn devices(&self) -> Option<u8> {
        match self.state() {
            SessionState::Ready { devices } => Some(devices),
            _ => None,
        }
    }

    /// Returns true if a device announced a bus topology change since the
    /// last enumeration.
    #[must_use]
    pub fn network_changed(&self) -> bool {
        self.network_changed.load(Ordering::Acquire)
    }

    /// Returns the zoom step table.
    #[must_use]
    pub const fn zoom_table(&self) -> &ZoomTable {
        &self.zoom_table
    }

    /// Returns the session tuning.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("session state {:?} -> {:?}", previous, state);
        }
    }

    /// Opens the link and assigns bus addresses.
    ///
    /// Enumeration is retried until it succeeds (or until
    /// `max_enumeration_attempts` is reached). Returns the device count.
    /// Calling this on a ready session does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Serial`/`Io` if the link cannot be opened, `LinkLost` if it
    /// fails during enumeration, or the last enumeration error once the
    /// attempt bound is reached.
    pub async fn start(&self) -> Result<u8> {
        let mut transport = self.transport.lock().await;
        if let SessionState::Ready { devices } = self.state() {
            return Ok(devices);
        }

        self.set_state(SessionState::Opening);
        // A link left open by a lost session is reopened from scratch
        if transport.is_open() {
            transport.close().await?;
        }
        let opened = match transport.open().await {
            Ok(()) => transport.clear(),
            Err(e) => Err(e),
        };
        if let Err(e) = opened {
            tracing::error!("cannot open bus: {}", e);
            self.set_state(SessionState::Closed);
            return Err(e);
        }

        self.set_state(SessionState::Enumerating);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.enumerate_locked(&mut *transport).await {
                Ok(devices) => {
                    tracing::info!("found {} devices on the bus", devices);
                    self.set_state(SessionState::Ready { devices });
                    return Ok(devices);
                }
                Err(e @ Error::LinkLost(_)) => return Err(e),
                Err(e) => {
                    if self
                        .config
                        .max_enumeration_attempts
                        .is_some_and(|max| attempt >= max)
                    {
                        tracing::error!("address enumeration failed {} times: {}", attempt, e);
                        self.set_state(SessionState::Closed);
                        return Err(e);
                    }
                    tracing::warn!("address enumeration failed: {}. Retrying...", e);
                    tokio::time::sleep(self.config.enumeration_retry_interval).await;
                }
            }
        }
    }

    /// Assigns bus addresses again, e.g. after a network change.
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` before [`Session::start`], or the enumeration
    /// error. A failed re-enumeration leaves the previous device count.
    pub async fn enumerate(&self) -> Result<u8> {
        let mut transport = self.transport.lock().await;
        if !self.state().is_ready() {
            return Err(Error::NotStarted);
        }
        let devices = self.enumerate_locked(&mut *transport).await?;
        tracing::info!("re-enumerated {} devices on the bus", devices);
        self.set_state(SessionState::Ready { devices });
        Ok(devices)
    }

    /// Closes the link.
    pub async fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        self.set_state(SessionState::Closed);
        transport.close().await
    }

    /// Sends `payload` to `recipient` and returns the reply.
    ///
    /// Holds the session lock for the whole round trip. Commands take a
    /// single reply. Inquiries read up to [`INQUIRY_ATTEMPTS`] times until a
    /// reply longer than [`SHORT_REPLY_LEN`] arrives.
    ///
    /// Error replies are returned as packets; see
    /// [`check_reply`](crate::protocol::check_reply).
    ///
    /// # Errors
    ///
    /// - `NotStarted` before [`Session::start`]
    /// - `Packet` if the payload cannot be framed
    /// - `ReadTimeout` if the device stays silent
    /// - `NotTerminated` if the reply is cut at 16 bytes without terminator
    /// - `InquiryExhausted` if an inquiry only got short replies
    /// - `LinkLost` if the link fails; the session is then closed
    pub async fn exchange(
        &self,
        recipient: Address,
        payload: &[u8],
        kind: RequestKind,
    ) -> Result<Packet> {
        let request = build_request(recipient, payload)?;
        let mut transport = self.transport.lock().await;
        if !self.state().is_ready() {
            return Err(Error::NotStarted);
        }
        self.round_trip(&mut *transport, &request, kind).await
    }

    /// Resets the command buffers of every device on the bus.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedReply` if the devices do not echo the request.
    pub async fn clear_interfaces(&self) -> Result<()> {
        let reply = self
            .exchange(Address::Broadcast, &IF_CLEAR, RequestKind::Command)
            .await?;
        if reply.payload() != IF_CLEAR {
            return Err(Error::unexpected(format!(
                "interface clear answered with {}",
                hex::encode(reply.as_bytes())
            )));
        }
        tracing::debug!("all interfaces clear");
        Ok(())
    }

    async fn enumerate_locked(&self, transport: &mut T) -> Result<u8> {
        let request = build_request(Address::Broadcast, &command::address_set(FIRST_ADDRESS))?;
        let reply = self
            .round_trip(transport, &request, RequestKind::Command)
            .await?;
        let devices = parse_address_reply(&reply, FIRST_ADDRESS)?;
        self.network_changed.store(false, Ordering::Release);
        Ok(devices)
    }

    async fn round_trip(
        &self,
        transport: &mut T,
        request: &Packet,
        kind: RequestKind,
    ) -> Result<Packet> {
        self.send_and_receive(transport, request, kind)
            .await
            .map_err(|e| self.check_link(e))
    }

    async fn send_and_receive(
        &self,
        transport: &mut T,
        request: &Packet,
        kind: RequestKind,
    ) -> Result<Packet> {
        self.discard_pending(transport).await?;
        tracing::trace!("sent {}", request);
        transport.write(request.to_bytes()).await?;
        match kind {
            RequestKind::Command => {
                let reply = read_one_packet(transport).await?;
                self.finish_reply(reply)
            }
            RequestKind::Inquiry => self.read_inquiry_reply(transport).await,
        }
    }

    /// Reads and drops whatever arrived since the last exchange, typically
    /// completions nobody waited for.
    async fn discard_pending(&self, transport: &mut T) -> Result<()> {
        while transport.bytes_waiting()? > 0 {
            match read_one_packet(transport).await {
                Ok(bytes) => {
                    tracing::debug!("ignored unsolicited {}", hex::encode(&bytes));
                    if let Ok(packet) = validate_reply(bytes) {
                        self.note_network_change(&packet);
                    }
                }
                Err(Error::ReadTimeout { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn read_inquiry_reply(&self, transport: &mut T) -> Result<Packet> {
        let mut last_reply = None;
        for attempt in 1..=INQUIRY_ATTEMPTS {
            match read_one_packet(transport).await {
                Ok(bytes) if bytes.len() > SHORT_REPLY_LEN => return self.finish_reply(bytes),
                Ok(bytes) => {
                    tracing::debug!(
                        "inquiry attempt {}: no data in {}",
                        attempt,
                        hex::encode(&bytes)
                    );
                    if let Ok(packet) = validate_reply(bytes.clone()) {
                        self.note_network_change(&packet);
                    }
                    last_reply = Some(bytes);
                }
                Err(Error::ReadTimeout { received }) => {
                    tracing::debug!(
                        "inquiry attempt {}: timeout after {} bytes",
                        attempt,
                        received
                    );
                }
                Err(e) => return Err(e),
            }
            if attempt < INQUIRY_ATTEMPTS {
                tokio::time::sleep(self.config.inquiry_retry_interval).await;
            }
        }

        match last_reply {
            Some(last_reply) => Err(Error::InquiryExhausted {
                attempts: INQUIRY_ATTEMPTS,
                last_reply,
            }),
            None => Err(Error::ReadTimeout { received: 0 }),
        }
    }

    fn finish_reply(&self, bytes: Vec<u8>) -> Result<Packet> {
        if bytes.last() != Some(&TERMINATOR) {
            tracing::warn!("received packet not terminated: {}", hex::encode(&bytes));
            return Err(Error::NotTerminated { reply: bytes });
        }
        let packet = validate_reply(bytes)?;
        tracing::trace!("received {}", packet);
        self.note_network_change(&packet);
        Ok(packet)
    }

    fn note_network_change(&self, packet: &Packet) {
        if classify(packet) == ReplyKind::NetworkChange {
            tracing::warn!("network change on the bus; addresses must be assigned again");
            self.network_changed.store(true, Ordering::Release);
        }
    }

    fn check_link(&self, err: Error) -> Error {
        match err {
            Error::Io(io) => {
                tracing::error!("serial link lost: {}", io);
                self.set_state(SessionState::Closed);
                Error::LinkLost(io)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::reply::{DeviceErrorCode, check};
    use crate::transport::mock::{MockEvent, MockTransport};

    const ENUM_REPLY: &[u8] = &[0x88, 0x30, 0x04, 0xFF];
    const ACK: &[u8] = &[0x90, 0x41, 0xFF];

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn fast_config() -> SessionConfig {
        SessionConfig::new().inquiry_retry_interval(Duration::ZERO)
    }

    async fn started(mock: &MockTransport) -> Session<MockTransport> {
        init_tracing();
        mock.reply_with(&[ENUM_REPLY]);
        let session = Session::with_config(mock.clone(), fast_config());
        assert_eq!(session.start().await.unwrap(), 3);
        session
    }

    #[tokio::test]
    async fn test_start_enumerates() {
        let mock = MockTransport::new();
        let session = started(&mock).await;

        assert_eq!(session.state(), SessionState::Ready { devices: 3 });
        assert_eq!(session.devices(), Some(3));
        assert_eq!(mock.writes(), vec![vec![0x88, 0x30, 0x01, 0xFF]]);
        assert!(mock.events().starts_with(&[MockEvent::Open, MockEvent::Clear]));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let mock = MockTransport::new();
        let session = started(&mock).await;

        assert_eq!(session.start().await.unwrap(), 3);
        let opens = mock
            .events()
            .iter()
            .filter(|e| **e == MockEvent::Open)
            .count();
        assert_eq!(opens, 1);
        assert_eq!(mock.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_start_retries_enumeration() {
        let mock = MockTransport::new();
        // No answer, then our own request echoed (no devices), then one device
        mock.reply_with(&[]);
        mock.reply_with(&[&[0x88, 0x30, 0x01, 0xFF]]);
        mock.reply_with(&[&[0x88, 0x30, 0x02, 0xFF]]);
        let session = Session::with_config(mock.clone(), fast_config());

        assert_eq!(session.start().await.unwrap(), 1);
        assert_eq!(mock.writes().len(), 3);
    }

    #[tokio::test]
    async fn test_start_gives_up_when_bounded() {
        let mock = MockTransport::new();
        let session = Session::with_config(mock.clone(), fast_config().max_enumeration_attempts(2));

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, Error::ReadTimeout { .. }));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(mock.writes().len(), 2);
    }

    #[tokio::test]
    async fn test_start_open_failure() {
        let mock = MockTransport::new();
        mock.fail_open();
        let session = Session::new(mock.clone());

        assert!(session.start().await.is_err());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_requires_start() {
        let session = Session::new(MockTransport::new());
        let err = session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotStarted));
    }

    #[tokio::test]
    async fn test_command_reads_single_reply() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[ACK, &[0x90, 0x51, 0xFF]]);

        let reply = session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap();
        assert_eq!(reply.as_bytes(), ACK);
        assert_eq!(
            mock.writes().last().unwrap(),
            &vec![0x81, 0x01, 0x04, 0x00, 0x02, 0xFF]
        );
        // The completion stays on the link until the next exchange
        assert_eq!(mock.pending(), 3);
    }

    #[tokio::test]
    async fn test_exchange_discards_stale_packets() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.push_rx(&[0x90, 0x51, 0xFF, 0x90, 0x52, 0xFF]);
        mock.reply_with(&[&[0x90, 0x50, 0x02, 0xFF]]);

        let reply = session
            .exchange(Address::Device(1), &[0x09, 0x04, 0x61], RequestKind::Inquiry)
            .await
            .unwrap();
        assert_eq!(reply.data(), &[0x02]);

        // Both stale completions were read before the request went out
        let events = mock.events();
        let write_at = events
            .iter()
            .rposition(|e| matches!(e, MockEvent::Write(_)))
            .unwrap();
        let stale: Vec<MockEvent> = [0x90, 0x51, 0xFF, 0x90, 0x52, 0xFF]
            .into_iter()
            .map(MockEvent::Read)
            .collect();
        assert_eq!(events[write_at - 6..write_at], stale[..]);
    }

    #[tokio::test]
    async fn test_inquiry_retries_until_data() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        let data_reply: &[u8] = &[0x90, 0x50, 0x01, 0x02, 0x03, 0xFF];
        mock.reply_with(&[ACK, ACK, ACK, ACK, data_reply]);

        let reply = session
            .exchange(Address::Device(1), &[0x09, 0x04, 0x47], RequestKind::Inquiry)
            .await
            .unwrap();
        assert_eq!(reply.as_bytes(), data_reply);
        assert_eq!(mock.pending(), 0);

        let terminators = mock
            .events()
            .iter()
            .filter(|e| **e == MockEvent::Read(TERMINATOR))
            .count();
        // One enumeration reply plus five inquiry reads
        assert_eq!(terminators, 6);
    }

    #[tokio::test]
    async fn test_inquiry_exhausted() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[ACK, ACK, ACK, ACK, ACK, ACK]);

        let err = session
            .exchange(Address::Device(1), &[0x09, 0x04, 0x47], RequestKind::Inquiry)
            .await
            .unwrap_err();
        match err {
            Error::InquiryExhausted {
                attempts,
                last_reply,
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(last_reply, ACK);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The sixth ACK was never read
        assert_eq!(mock.pending(), 3);
    }

    #[tokio::test]
    async fn test_inquiry_tolerates_timeouts() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[]);

        let err = session
            .exchange(Address::Device(1), &[0x09, 0x04, 0x47], RequestKind::Inquiry)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadTimeout { received: 0 }));
        let timeouts = mock
            .events()
            .iter()
            .filter(|e| **e == MockEvent::Timeout)
            .count();
        assert_eq!(timeouts, 5);
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[&[0x90, 0x41]]);

        let err = session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadTimeout { received: 2 }));
        assert!(session.state().is_ready());
    }

    #[tokio::test]
    async fn test_unterminated_reply() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[&[0x90; 20]]);

        let err = session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap_err();
        match err {
            Error::NotTerminated { reply } => assert_eq!(reply.len(), MAX_PACKET_SIZE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_device_error_reply() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[&[0x90, 0x61, 0x05, 0xFF]]);

        let reply = session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap();
        assert!(matches!(
            check(&reply),
            Err(Error::Device {
                socket: 1,
                code: DeviceErrorCode::InvalidSocket
            })
        ));
    }

    #[tokio::test]
    async fn test_link_lost_closes_session() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.fail_writes();

        let err = session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LinkLost(_)));
        assert!(err.is_fatal());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_restart_after_link_lost() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.fail_writes();
        assert!(
            session
                .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
                .await
                .is_err()
        );
        assert!(matches!(
            session
                .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
                .await,
            Err(Error::NotStarted)
        ));

        mock.restore_writes();
        mock.reply_with(&[&[0x88, 0x30, 0x03, 0xFF]]);
        assert_eq!(session.start().await.unwrap(), 2);
        let opens = mock
            .events()
            .iter()
            .filter(|e| **e == MockEvent::Open)
            .count();
        assert_eq!(opens, 2);
    }

    #[tokio::test]
    async fn test_network_change_latches() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.push_rx(&[0x88, 0x38, 0xFF]);
        mock.reply_with(&[ACK]);

        session
            .exchange(Address::Device(1), &[0x01, 0x04, 0x00, 0x02], RequestKind::Command)
            .await
            .unwrap();
        assert!(session.network_changed());

        mock.reply_with(&[&[0x88, 0x30, 0x03, 0xFF]]);
        assert_eq!(session.enumerate().await.unwrap(), 2);
        assert!(!session.network_changed());
        assert_eq!(session.devices(), Some(2));
    }

    #[tokio::test]
    async fn test_network_change_during_inquiry() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[&[0x88, 0x38, 0xFF], &[0x90, 0x50, 0x02, 0xFF]]);

        let reply = session
            .exchange(Address::Device(1), &[0x09, 0x04, 0x61], RequestKind::Inquiry)
            .await
            .unwrap();
        assert_eq!(reply.as_bytes(), &[0x90, 0x50, 0x02, 0xFF]);
        assert!(session.network_changed());
    }

    #[tokio::test]
    async fn test_clear_interfaces() {
        let mock = MockTransport::new();
        let session = started(&mock).await;
        mock.reply_with(&[&[0x88, 0x01, 0x00, 0x01, 0xFF]]);
        session.clear_interfaces().await.unwrap();
        assert_eq!(
            mock.writes().last().unwrap(),
            &vec![0x88, 0x01, 0x00, 0x01, 0xFF]
        );

        mock.reply_with(&[ACK]);
        assert!(matches!(
            session.clear_interfaces().await,
            Err(Error::UnexpectedReply { .. })
        ));
    }

    #[tokio::test]
    async fn test_state_subscription() {
        let mock = MockTransport::new();
        let session = Session::with_config(mock.clone(), fast_config());
        let rx = session.subscribe();
        assert_eq!(*rx.borrow(), SessionState::Closed);

        mock.reply_with(&[ENUM_REPLY]);
        session.start().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Ready { devices: 3 });

        session.close().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exchanges_do_not_interleave() {
        let mock = MockTransport::new();
        let session = Arc::new(started(&mock).await);
        // Echo the request tag back in a completion
        mock.respond_with(|request| vec![0x90, 0x50, request[4], 0xFF]);

        let mut tasks = Vec::new();
        for task in 0..8u8 {
            let session = Arc::clone(&session);
            tasks.push(tokio::spawn(async move {
                for i in 0..10u8 {
                    let tag = task * 10 + i;
                    let payload = [0x09, 0x04, 0x24, tag];
                    let reply = session
                        .exchange(Address::Device(1), &payload, RequestKind::Inquiry)
                        .await
                        .unwrap();
                    assert_eq!(reply.data(), &[tag]);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Every write is followed by exactly its own reply before the next write
        let events = mock.events();
        let first_write = events
            .iter()
            .position(|e| matches!(e, MockEvent::Write(w) if w.len() == 6))
            .unwrap();
        let mut exchanges = 0;
        let mut rest = &events[first_write..];
        while let Some((MockEvent::Write(request), tail)) = rest.split_first() {
            let expected = [0x90, 0x50, request[4], 0xFF];
            let reads: Vec<u8> = tail
                .iter()
                .take(4)
                .map(|e| match e {
                    MockEvent::Read(b) => *b,
                    other => panic!("interleaved event {other:?}"),
                })
                .collect();
            assert_eq!(reads, expected);
            rest = &tail[4..];
            exchanges += 1;
        }
        assert!(rest.is_empty());
        assert_eq!(exchanges, 80);
    }
}

//! Outbound message delivery
//!
//! The session never owns a socket. It hands [`ClientMessage`]s to a
//! [`Transport`], which may be a channel into a connection task or, in tests,
//! a recorder.

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::ClientMessage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),
}

pub trait Transport {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError>;
}

impl Transport for UnboundedSender<ClientMessage> {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        UnboundedSender::send(self, message).map_err(|_| TransportError::Closed)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        (**self).send(message)
    }
}

/// Transport that keeps everything sent
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Vec<ClientMessage>,
    closed: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[ClientMessage] {
        &self.sent
    }

    pub fn take(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.sent)
    }

    /// Fail every later send.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sent.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn open(request_id: &str) -> ClientMessage {
        ClientMessage::OpenChat {
            chat_id: "c1".to_string(),
            request_id: request_id.to_string(),
        }
    }

    #[test]
    fn test_channel_transport() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();
        Transport::send(&mut tx, open("a")).unwrap();

        assert_eq!(rx.try_recv().unwrap(), open("a"));

        drop(rx);
        assert_eq!(Transport::send(&mut tx, open("b")), Err(TransportError::Closed));
    }

    #[test]
    fn test_recording_transport() {
        let mut transport = RecordingTransport::new();
        transport.send(open("a")).unwrap();
        assert_eq!(transport.sent().len(), 1);

        transport.close();
        assert!(transport.send(open("b")).is_err());
        assert_eq!(transport.take(), vec![open("a")]);
    }
}

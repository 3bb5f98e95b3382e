//! Heartbeat ping.

use crate::protocol::builtin;
use crate::protocol::constants::*;
use crate::protocol::ClientMessage;

/// Encodes a ping request.
pub fn encode_request() -> ClientMessage {
    let mut message = ClientMessage::new_request(
        CLIENT_PING,
        PARTITION_ID_ANY,
        builtin::initial_content(REQUEST_HEADER_SIZE),
    );
    message.set_retryable(true);
    message
}

/// Encodes the empty ping response.
pub fn encode_response() -> ClientMessage {
    ClientMessage::new_response(
        CLIENT_PING_RESPONSE,
        builtin::initial_content(RESPONSE_HEADER_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_request() {
        let message = encode_request();
        assert_eq!(message.message_type(), Some(CLIENT_PING));
        assert_eq!(message.partition_id(), Some(PARTITION_ID_ANY));
        assert!(message.is_retryable());
        assert_eq!(encode_response().message_type(), Some(CLIENT_PING_RESPONSE));
    }
}

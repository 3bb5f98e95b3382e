//! Error responses.

use super::custom::{decode_error_holder, encode_error_holder};
use crate::error::{HazelcastError, Result, ServerError};
use crate::protocol::builtin;
use crate::protocol::constants::*;
use crate::protocol::ClientMessage;

/// Encodes `error` and its causes as an error response.
pub fn encode(error: &ServerError) -> ClientMessage {
    let mut message = ClientMessage::new_response(
        ERROR_MESSAGE_TYPE,
        builtin::initial_content(RESPONSE_HEADER_SIZE),
    );
    let mut holders = Vec::with_capacity(error.causes.len() + 1);
    holders.push(error.clone());
    holders.extend(error.causes.iter().cloned());
    builtin::encode_list(&mut message, &holders, encode_error_holder);
    message
}

/// Decodes an error response. The first holder becomes the returned error,
/// the rest its causes.
pub fn decode(message: &ClientMessage) -> Result<ServerError> {
    let mut iter = message.iter();
    iter.next_frame()?;
    let mut holders = builtin::decode_list(&mut iter, decode_error_holder)?.into_iter();
    let mut error = holders
        .next()
        .ok_or_else(|| HazelcastError::Protocol("error response without errors".to_string()))?;
    error.causes = holders.collect();
    Ok(error)
}

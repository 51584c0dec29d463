//! Session string codec: standard base64 over the binary `grammers-session` format.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use grammers_session::Session;

use tgr_core::{errors::Error, Result};

pub fn decode(session_string: &str) -> Result<Session> {
    let bytes = STANDARD.decode(session_string.trim()).map_err(|e| {
        Error::Config(format!(
            "SESSION_STRING is not valid base64 ({e}); generate one with tgr-login"
        ))
    })?;
    Session::load(&bytes)
        .map_err(|e| Error::Config(format!("SESSION_STRING is not a valid session: {e}")))
}

pub fn encode(session: &Session) -> String {
    STANDARD.encode(session.save())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode("%%% not base64 %%%"), Err(Error::Config(_))));
        assert!(matches!(decode("AAAA"), Err(Error::Config(_))));
    }

    #[test]
    fn fresh_session_decodes() {
        let encoded = encode(&Session::new());
        assert!(!encoded.is_empty());
        assert!(decode(&format!("  {encoded}\n")).is_ok());
    }
}

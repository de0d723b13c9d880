//! Authorization gate for kiosk
//!
//! A minimal permission ladder: public browsing, authenticated submitters,
//! and moderators. Submitter identity arrives as verified headers set by
//! the trusted web frontend after the third-party auth provider checks the
//! user; moderation calls carry an API key matched against the configured
//! moderator key. Dev mode relaxes the moderator check.

use hyper::header::HeaderMap;

use crate::config::Args;
use crate::types::{KioskError, Result};

/// Header carrying the stable submitter id from the auth provider
pub const AUTHOR_ID_HEADER: &str = "x-author-id";
/// Header carrying the submitter display handle
pub const AUTHOR_HEADER: &str = "x-author";
/// Header carrying the moderator API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Verified submitter identity forwarded by the web frontend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub author_id: String,
    pub author: String,
}

/// Extract the submitter identity from request headers, if present
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let author_id = headers
        .get(AUTHOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let author = headers
        .get(AUTHOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(author_id);

    Some(Identity {
        author_id: author_id.to_string(),
        author: author.to_string(),
    })
}

/// Require a verified submitter identity
pub fn require_identity(headers: &HeaderMap) -> Result<Identity> {
    identity_from_headers(headers).ok_or_else(|| {
        KioskError::Permission("Submission requires a verified identity".to_string())
    })
}

/// Require the moderator API key (any caller passes in dev mode)
pub fn require_moderator(args: &Args, headers: &HeaderMap) -> Result<()> {
    let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if args.is_moderator_key(presented) {
        Ok(())
    } else {
        Err(KioskError::Permission(
            "Moderator API key required".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                hyper::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn identity_requires_author_id() {
        assert!(identity_from_headers(&headers(&[])).is_none());
        assert!(identity_from_headers(&headers(&[("x-author", "ada")])).is_none());

        let identity =
            identity_from_headers(&headers(&[("x-author-id", "user-1"), ("x-author", "ada")]))
                .unwrap();
        assert_eq!(identity.author_id, "user-1");
        assert_eq!(identity.author, "ada");
    }

    #[test]
    fn display_handle_falls_back_to_id() {
        let identity = identity_from_headers(&headers(&[("x-author-id", "user-1")])).unwrap();
        assert_eq!(identity.author, "user-1");
    }

    #[test]
    fn blank_headers_are_rejected() {
        assert!(identity_from_headers(&headers(&[("x-author-id", "  ")])).is_none());
        assert!(matches!(
            require_identity(&headers(&[])),
            Err(KioskError::Permission(_))
        ));
    }

    #[test]
    fn moderator_key_is_checked() {
        use clap::Parser;

        let mut args = Args::parse_from(["kiosk"]);
        args.moderator_key = Some("secret".to_string());

        assert!(require_moderator(&args, &headers(&[("x-api-key", "secret")])).is_ok());
        assert!(matches!(
            require_moderator(&args, &headers(&[("x-api-key", "wrong")])),
            Err(KioskError::Permission(_))
        ));
        assert!(matches!(
            require_moderator(&args, &headers(&[])),
            Err(KioskError::Permission(_))
        ));
    }
}

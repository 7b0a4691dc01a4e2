//! Shared Key request signing for blob storage.
//!
//! The signature is an HMAC-SHA256 over a canonical rendering of the request,
//! keyed with the decoded account key.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::search::error::SearchError;

type HmacSha256 = Hmac<Sha256>;

/// Account name and decoded key.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl std::fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The parts of a request that go into the signature.
#[derive(Debug)]
pub struct SignedRequest<'a> {
    pub method: &'a str,
    pub content_length: usize,
    pub content_type: Option<&'a str>,
    /// `x-ms-*` headers, names in lowercase.
    pub ms_headers: &'a [(&'a str, &'a str)],
    /// Encoded path starting with `/{container}/`.
    pub path: &'a str,
}

impl SharedKeyCredential {
    /// Build a credential from an account name and base64 account key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConnection`] if the key is not base64.
    pub fn new(account: &str, encoded_key: &str) -> Result<Self, SearchError> {
        let key = STANDARD
            .decode(encoded_key)
            .map_err(|_| SearchError::invalid_connection("AccountKey is not valid base64"))?;
        Ok(Self {
            account: account.to_string(),
            key,
        })
    }

    /// Value for the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConnection`] if the key cannot seed the MAC.
    pub fn authorization(&self, request: &SignedRequest<'_>) -> Result<String, SearchError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SearchError::invalid_connection(e.to_string()))?;
        mac.update(self.string_to_sign(request).as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{signature}", self.account))
    }

    fn string_to_sign(&self, request: &SignedRequest<'_>) -> String {
        // Zero length is signed as an empty string.
        let content_length = if request.content_length == 0 {
            String::new()
        } else {
            request.content_length.to_string()
        };

        let mut ms_headers: Vec<&(&str, &str)> = request.ms_headers.iter().collect();
        ms_headers.sort_by_key(|(name, _)| *name);
        let canonical_headers: String = ms_headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();

        [
            request.method,
            "", // Content-Encoding
            "", // Content-Language
            content_length.as_str(),
            "", // Content-MD5
            request.content_type.unwrap_or_default(),
            "", // Date (x-ms-date is used instead)
            "", // If-Modified-Since
            "", // If-Match
            "", // If-None-Match
            "", // If-Unmodified-Since
            "", // Range
        ]
        .join("\n")
            + "\n"
            + &canonical_headers
            + &format!("/{}{}", self.account, request.path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credential() -> SharedKeyCredential {
        SharedKeyCredential::new("docstore", "c2VjcmV0LWtleQ==").unwrap()
    }

    fn put_request<'a>(headers: &'a [(&'a str, &'a str)]) -> SignedRequest<'a> {
        SignedRequest {
            method: "PUT",
            content_length: 5,
            content_type: Some("text/plain"),
            ms_headers: headers,
            path: "/uploads/notes.txt",
        }
    }

    #[test]
    fn test_string_to_sign_layout() {
        let headers = [
            ("x-ms-version", "2021-08-06"),
            ("x-ms-blob-type", "BlockBlob"),
            ("x-ms-date", "Fri, 16 Oct 2026 10:00:00 GMT"),
        ];

        let rendered = credential().string_to_sign(&put_request(&headers));

        assert_eq!(
            rendered,
            "PUT\n\n\n5\n\ntext/plain\n\n\n\n\n\n\n\
             x-ms-blob-type:BlockBlob\n\
             x-ms-date:Fri, 16 Oct 2026 10:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /docstore/uploads/notes.txt"
        );
    }

    #[test]
    fn test_zero_length_is_blank() {
        let request = SignedRequest {
            method: "GET",
            content_length: 0,
            content_type: None,
            ms_headers: &[],
            path: "/uploads/notes.txt",
        };

        let rendered = credential().string_to_sign(&request);

        assert!(rendered.starts_with("GET\n\n\n\n\n\n"));
        assert!(rendered.ends_with("/docstore/uploads/notes.txt"));
    }

    #[test]
    fn test_authorization_is_deterministic() {
        let headers = [("x-ms-date", "Fri, 16 Oct 2026 10:00:00 GMT")];
        let credential = credential();

        let first = credential.authorization(&put_request(&headers)).unwrap();
        let second = credential.authorization(&put_request(&headers)).unwrap();

        assert_eq!(first, second);
        let signature = first.strip_prefix("SharedKey docstore:").unwrap();
        assert_eq!(STANDARD.decode(signature).unwrap().len(), 32);
    }

    #[test]
    fn test_signature_covers_path() {
        let headers = [("x-ms-date", "Fri, 16 Oct 2026 10:00:00 GMT")];
        let credential = credential();
        let mut other = put_request(&headers);
        other.path = "/uploads/other.txt";

        assert_ne!(
            credential.authorization(&put_request(&headers)).unwrap(),
            credential.authorization(&other).unwrap()
        );
    }

    #[test]
    fn test_rejects_non_base64_key() {
        assert!(matches!(
            SharedKeyCredential::new("docstore", "not base64!"),
            Err(SearchError::InvalidConnection(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let debug = format!("{:?}", credential());
        assert!(debug.contains("docstore"));
        assert!(debug.contains("[REDACTED]"));
    }
}

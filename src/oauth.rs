//! OAuth 1.0a signing and app-only authorization headers.
//!
//! User-context requests carry an OAuth 1.0a HMAC-SHA1 signature over the
//! method, normalized URL, and full parameter set. The app-only token
//! exchange authenticates with a Basic header built from the
//! percent-encoded key/secret pair.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use rand::RngCore;
use sha1::Sha1;

use crate::account::Account;
use crate::credentials::Credentials;
use crate::error::AuthError;

/// Characters that must be percent-encoded in OAuth signatures.
/// RFC 3986 unreserved characters: ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode a string according to RFC 3986.
pub(crate) fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Generate the `Authorization` header for a user-context request.
///
/// `url` is the bare endpoint URL without query parameters; `params` holds
/// query and body parameters alike, all of which enter the signature.
pub(crate) fn user_context_header(
    credentials: &Credentials,
    account: &Account,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, AuthError> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| AuthError::Signature(format!("failed to get timestamp: {e}")))?
        .as_secs()
        .to_string();

    let nonce = generate_nonce();

    sign_at(credentials, account, method, url, params, &nonce, &timestamp)
}

/// Signature assembly with the nonce and timestamp pinned.
fn sign_at(
    credentials: &Credentials,
    account: &Account,
    method: &str,
    url: &str,
    params: &[(String, String)],
    nonce: &str,
    timestamp: &str,
) -> Result<String, AuthError> {
    let mut oauth_params = vec![
        (
            "oauth_consumer_key".to_string(),
            credentials.app_key.clone(),
        ),
        ("oauth_nonce".to_string(), nonce.to_string()),
        (
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        ),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), account.token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    // OAuth params and request params are signed together.
    let mut all_params = oauth_params.clone();
    all_params.extend(params.iter().cloned());

    all_params.sort_by(|a, b| {
        if a.0 == b.0 {
            a.1.cmp(&b.1)
        } else {
            a.0.cmp(&b.0)
        }
    });

    let param_string = all_params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(&credentials.app_secret),
        percent_encode(&account.token_secret)
    );

    let signature = hmac_sha1(&signing_key, &base_string)?;

    oauth_params.push(("oauth_signature".to_string(), signature));

    let header = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {header}"))
}

/// The `Authorization` header for the one-time bearer token exchange.
pub(crate) fn app_only_exchange_header(app_key: &str, app_secret: &str) -> String {
    let pair = format!("{}:{}", percent_encode(app_key), percent_encode(app_secret));
    format!("Basic {}", BASE64.encode(pair))
}

/// The `Authorization` header for an app-only request.
pub(crate) fn bearer_header(token: &str) -> String {
    format!("Bearer {token}")
}

/// Generate a random nonce.
fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compute HMAC-SHA1 and return the base64-encoded result.
fn hmac_sha1(key: &str, data: &str) -> Result<String, AuthError> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| AuthError::Signature(e.to_string()))?;

    mac.update(data.as_bytes());
    let result = mac.finalize();
    Ok(BASE64.encode(result.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encode_matches_rfc3986() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("foo=bar&baz"), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("test-value_123.txt"), "test-value_123.txt");
        assert_eq!(percent_encode("~tilde"), "~tilde");
    }

    #[test]
    fn nonces_are_unique_hex() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_ne!(nonce1, nonce2);
        assert_eq!(nonce1.len(), 32);
        assert!(nonce1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn user_context_header_has_oauth_shape() {
        let credentials = Credentials {
            app_key: "test_app_key".into(),
            app_secret: "test_app_secret".into(),
            account: None,
            bearer_token: None,
        };
        let account = crate::Account::new(1, "tester", "test_token", "test_token_secret");

        let header = user_context_header(
            &credentials,
            &account,
            "GET",
            "https://api.twitter.com/1.1/account/verify_credentials.json",
            &[],
        )
        .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key="));
        assert!(header.contains("oauth_signature="));
        assert!(header.contains("oauth_timestamp="));
        assert!(header.contains("oauth_nonce="));
        assert!(header.contains("oauth_token=\"test_token\""));
    }

    // Known vector from the platform's signing documentation.
    #[test]
    fn signature_matches_documented_example() {
        let credentials = Credentials {
            app_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            app_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
            account: None,
            bearer_token: None,
        };
        let account = crate::Account::new(
            370_773_112,
            "example",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        let params = vec![
            ("include_entities".to_string(), "true".to_string()),
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
        ];

        let header = sign_at(
            &credentials,
            &account,
            "POST",
            "https://api.twitter.com/1/statuses/update.json",
            &params,
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            "1318622958",
        )
        .unwrap();

        assert!(header.contains("oauth_signature=\"tnnArxj06cWHq44gCs1OSKk%2FjLY%3D\""));
    }

    #[test]
    fn exchange_header_encodes_key_pair() {
        let header = app_only_exchange_header("xvz1evFS4wEEPTGEFPHBog", "L8qq9PZyRg6ieKGEKhZolGC0vJWLw8iEJ88DRdyOg");
        assert!(header.starts_with("Basic "));

        let decoded = BASE64
            .decode(header.trim_start_matches("Basic "))
            .unwrap();
        let decoded = String::from_utf8(decoded).unwrap();
        assert_eq!(
            decoded,
            "xvz1evFS4wEEPTGEFPHBog:L8qq9PZyRg6ieKGEKhZolGC0vJWLw8iEJ88DRdyOg"
        );
    }
}

//! TLS connector setup for the hyper HTTP client.
//!
//! TLS support requires both a crypto provider and root certificates:
//!
//! - **Crypto provider**: `tls-ring`, or a process-wide default installed with
//!   `rustls::crypto::CryptoProvider::install_default()`
//! - **Root certificates** (choose one):
//!   - `tls-native-roots` - Use system root certificates (default with `tls` feature)
//!   - `tls-webpki-roots` - Use bundled Mozilla root certificates
//!
//! The `tls` feature enables `tls-ring` + `tls-native-roots` for convenience.

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use restify_core::{Error, Result};
use rustls::ClientConfig;

/// Whether both a crypto provider feature and a root certificate feature are enabled.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(feature = "tls-ring") && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

/// A config builder from the feature-gated provider, else the installed default.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn crypto_provider_builder() -> Option<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(std::sync::Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(not(feature = "tls-ring"))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    let provider = provider?;
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .ok()
}

/// Build the default TLS configuration from the enabled root certificate feature.
///
/// Returns `None` if no crypto provider is available.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Option<ClientConfig> {
    let builder = crypto_provider_builder()?;
    Some(builder.with_root_certificates(root_store()).with_no_client_auth())
}

/// Native roots win when both root features are enabled.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build a connector serving both `http://` and `https://` URIs.
///
/// Without a custom TLS config, the default config from the enabled features is
/// used; a configuration error is returned when none can be built.
pub fn build_https_connector(tls_config: Option<ClientConfig>) -> Result<HttpsConnector<HttpConnector>> {
    let config = match tls_config {
        Some(config) => config,
        None => default_config()?,
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build())
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn default_config() -> Result<ClientConfig> {
    default_tls_config().ok_or_else(|| {
        Error::configuration(
            "HTTPS requires a crypto provider: enable the `tls-ring` feature or install \
             a global provider via `CryptoProvider::install_default()`",
        )
    })
}

#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
fn default_config() -> Result<ClientConfig> {
    Err(Error::configuration(
        "HTTPS requires TLS root certificates: enable `tls-native-roots`, \
         `tls-webpki-roots` or `tls`, or provide a TLS config",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(feature = "tls-ring", feature = "tls-native-roots"))]
    #[test]
    fn test_default_connector_builds() {
        assert!(has_tls_support());
        assert!(default_tls_config().is_some());
        assert!(build_https_connector(None).is_ok());
    }

    #[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
    #[test]
    fn test_missing_roots_is_configuration_error() {
        assert!(build_https_connector(None).err().unwrap().is_configuration());
    }
}

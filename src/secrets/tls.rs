//! # TLS Material
//!
//! Certificate provider contract and the self-signed implementation used for
//! the Ironic and Inspector endpoints.
//!
//! # Certificate Rotation
//!
//! A certificate is rotated once its `notAfter` falls within the rotation
//! window (30 days by default):
//! - `not_after <= now + window` rotates, including already expired certificates
//! - `not_after > now + window` is kept

use std::net::IpAddr;
use std::time::Duration;

use rcgen::{
    CertificateParams, DistinguishedName, DnType, DnValue, ExtendedKeyUsagePurpose, Ia5String,
    IsCa, KeyPair, KeyUsagePurpose, SanType,
};
use time::OffsetDateTime;
use x509_parser::pem::parse_x509_pem;

use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_TLS_ROTATION_WINDOW_DAYS, DEFAULT_TLS_VALIDITY_DAYS};
use crate::secrets::error::{Result, SecretsError};

/// Subject common name of generated certificates
pub const CERT_COMMON_NAME: &str = "metal3-ironic";

/// Host always present in the SAN list so in-pod clients can connect locally
const LOCALHOST: &str = "localhost";

/// A PEM encoded certificate and its private key
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateMaterial {
    pub certificate_pem: Vec<u8>,
    pub private_key_pem: Vec<u8>,
}

impl std::fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("certificate_pem", &String::from_utf8_lossy(&self.certificate_pem))
            .field("private_key_pem", &"***")
            .finish()
    }
}

/// Source of TLS material for the provisioning endpoints
pub trait CertificateProvider: Send + Sync {
    /// Issue a certificate covering `host` (an IP or DNS name)
    fn generate(&self, host: Option<&str>) -> Result<CertificateMaterial>;

    /// Whether a stored certificate is expired or inside the rotation window
    fn is_expiring_soon(&self, certificate_pem: &[u8]) -> Result<bool>;
}

/// Issues self-signed server certificates with rcgen
#[derive(Debug, Clone)]
pub struct SelfSignedCertificateProvider {
    validity: Duration,
    rotation_window: Duration,
}

impl Default for SelfSignedCertificateProvider {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_TLS_VALIDITY_DAYS * 86_400),
            Duration::from_secs(DEFAULT_TLS_ROTATION_WINDOW_DAYS * 86_400),
        )
    }
}

impl SelfSignedCertificateProvider {
    #[must_use]
    pub fn new(validity: Duration, rotation_window: Duration) -> Self {
        Self {
            validity,
            rotation_window,
        }
    }

    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.tls_validity(), config.tls_rotation_window())
    }

    #[must_use]
    pub fn rotation_window(&self) -> Duration {
        self.rotation_window
    }
}

impl CertificateProvider for SelfSignedCertificateProvider {
    fn generate(&self, host: Option<&str>) -> Result<CertificateMaterial> {
        let not_before = OffsetDateTime::now_utc();
        let not_after = offset_by(not_before, self.validity)?;
        let mut hosts: Vec<&str> = host.into_iter().collect();
        hosts.push(LOCALHOST);
        issue_certificate(&hosts, not_before, not_after)
    }

    fn is_expiring_soon(&self, certificate_pem: &[u8]) -> Result<bool> {
        expires_within(
            certificate_pem,
            OffsetDateTime::now_utc(),
            self.rotation_window,
        )
    }
}

/// Issue a self-signed server certificate for `hosts` valid between the given instants
pub fn issue_certificate(
    hosts: &[&str],
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> Result<CertificateMaterial> {
    let mut params = CertificateParams::default();

    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(CERT_COMMON_NAME.to_string()),
    );
    params.distinguished_name = dn;

    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.not_before = not_before;
    params.not_after = not_after;
    params.subject_alt_names = hosts
        .iter()
        .map(|host| subject_alt_name(host))
        .collect::<Result<Vec<_>>>()?;

    let key_pair = KeyPair::generate()
        .map_err(|e| SecretsError::Generation(format!("failed to generate TLS key: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| SecretsError::Certificate(format!("failed to self-sign certificate: {e}")))?;

    Ok(CertificateMaterial {
        certificate_pem: cert.pem().into_bytes(),
        private_key_pem: key_pair.serialize_pem().into_bytes(),
    })
}

fn subject_alt_name(host: &str) -> Result<SanType> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SanType::IpAddress(ip));
    }
    Ia5String::try_from(host.to_string())
        .map(SanType::DnsName)
        .map_err(|e| SecretsError::Certificate(format!("invalid DNS name '{host}': {e}")))
}

/// `notAfter` of the first certificate in `certificate_pem`
pub fn certificate_not_after(certificate_pem: &[u8]) -> Result<OffsetDateTime> {
    let (_, pem) = parse_x509_pem(certificate_pem)
        .map_err(|e| SecretsError::Certificate(format!("failed to parse PEM: {e}")))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| SecretsError::Certificate(format!("failed to parse certificate: {e}")))?;
    Ok(cert.validity().not_after.to_datetime())
}

/// Whether the certificate expires at or before `now + window`
pub fn expires_within(
    certificate_pem: &[u8],
    now: OffsetDateTime,
    window: Duration,
) -> Result<bool> {
    let not_after = certificate_not_after(certificate_pem)?;
    Ok(not_after <= offset_by(now, window)?)
}

/// `at + by`, failing instead of panicking past the representable range
fn offset_by(at: OffsetDateTime, by: Duration) -> Result<OffsetDateTime> {
    time::Duration::try_from(by)
        .ok()
        .and_then(|by| at.checked_add(by))
        .ok_or_else(|| {
            SecretsError::Certificate(format!(
                "{}s after {at} is out of range for a certificate date",
                by.as_secs()
            ))
        })
}

use std::fmt;

/// Signing identity handed to the transport.
///
/// Holds the secret URI or mnemonic opaquely; key derivation happens in the transport.
#[derive(Clone)]
pub struct Signer {
    label: String,
    secret: String,
}

impl Signer {
    pub fn from_secret(label: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            secret: secret.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("label", &self.label)
            .field("secret", &"<redacted>")
            .finish()
    }
}

//! Persisted host identity (§6): the same keypair — and therefore the same
//! `PeerId` — survives across restarts, so a rendezvous string keeps
//! resolving to the same host without re-sharing a fresh address each time.

use std::path::PathBuf;

use libp2p::identity::Keypair;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no config directory available for this platform")]
    NoConfigDir,
    #[error("reading identity file: {0}")]
    Read(#[source] std::io::Error),
    #[error("writing identity file: {0}")]
    Write(#[source] std::io::Error),
    #[error("decoding identity file: {0}")]
    Decode(#[from] libp2p::identity::DecodingError),
}

fn identity_path() -> Result<PathBuf, IdentityError> {
    let mut dir = dirs::config_dir().ok_or(IdentityError::NoConfigDir)?;
    dir.push("tandem");
    Ok(dir.join("identity.key"))
}

/// Loads the identity keypair at the platform config dir, generating and
/// persisting a fresh ed25519 key on first run.
pub fn load_or_generate_identity() -> Result<Keypair, IdentityError> {
    let path = identity_path()?;
    if let Ok(bytes) = std::fs::read(&path) {
        return Keypair::from_protobuf_encoding(&bytes).map_err(IdentityError::from);
    }

    let keypair = Keypair::generate_ed25519();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(IdentityError::Write)?;
    }
    let encoded = keypair.to_protobuf_encoding().expect("ed25519 keys always encode");
    std::fs::write(&path, encoded).map_err(IdentityError::Write)?;
    Ok(keypair)
}

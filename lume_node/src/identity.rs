use std::path::Path;

use ed25519_dalek::SigningKey;
use lume_registry::PeerId;

use crate::config::NodeConfigIdentity;

/// Load the node's secret key from config.
///
/// The `config_dir` should be the directory containing the config file,
/// used to resolve relative `secret_key_file` paths.
pub fn load_secret_key(identity: &NodeConfigIdentity, config_dir: &Path) -> Option<SigningKey> {
    // Prefer inline key over file
    if let Some(s) = &identity.secret_key
        && let Some(key) = parse_secret_key_string(s)
    {
        return Some(key);
    }
    let path = Path::new(identity.secret_key_file.as_ref()?);
    let resolved = if path.is_relative() {
        config_dir.join(path)
    } else {
        path.to_path_buf()
    };
    load_secret_key_file(&resolved).ok()
}

/// Reads a secret key file holding either the raw 32 bytes or their hex.
pub fn load_secret_key_file(path: &Path) -> anyhow::Result<SigningKey> {
    let bytes = std::fs::read(path)?;
    if let Ok(s) = std::str::from_utf8(&bytes)
        && let Some(key) = parse_secret_key_string(s)
    {
        return Ok(key);
    }
    parse_secret_key_bytes(&bytes).ok_or_else(|| {
        anyhow::anyhow!(
            "{} does not hold a 32-byte ed25519 secret key",
            path.display()
        )
    })
}

pub fn parse_secret_key_string(s: &str) -> Option<SigningKey> {
    let bytes = hex::decode(s.trim()).ok()?;
    parse_secret_key_bytes(&bytes)
}

pub fn parse_secret_key_bytes(bytes: &[u8]) -> Option<SigningKey> {
    let bytes: &[u8; 32] = bytes.try_into().ok()?;
    Some(SigningKey::from_bytes(bytes))
}

/// The peer identity a node announces: its ed25519 public key.
pub fn peer_id(key: &SigningKey) -> PeerId {
    PeerId::from(key.verifying_key().to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_key_preferred() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("node.secretkey"), [2u8; 32]).unwrap();

        let identity = NodeConfigIdentity {
            secret_key: Some(hex::encode([1u8; 32])),
            secret_key_file: Some("node.secretkey".into()),
        };
        let key = load_secret_key(&identity, dir.path()).unwrap();
        assert_eq!(key.to_bytes(), [1u8; 32]);
    }

    #[test]
    fn test_key_file_raw_and_hex() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw"), [3u8; 32]).unwrap();
        std::fs::write(dir.path().join("hex"), format!("{}\n", hex::encode([4u8; 32]))).unwrap();

        for (file, expected) in [("raw", [3u8; 32]), ("hex", [4u8; 32])] {
            let identity = NodeConfigIdentity {
                secret_key: None,
                secret_key_file: Some(file.into()),
            };
            let key = load_secret_key(&identity, dir.path()).unwrap();
            assert_eq!(key.to_bytes(), expected);
        }
    }

    #[test]
    fn test_bad_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short");
        std::fs::write(&path, [5u8; 12]).unwrap();

        assert!(load_secret_key_file(&path).is_err());
        assert!(load_secret_key_file(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_peer_id_is_public_key() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        assert_eq!(
            peer_id(&key).as_bytes(),
            key.verifying_key().to_bytes().as_slice()
        );
    }
}

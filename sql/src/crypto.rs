//! Crypto collaborator for encrypted attributes.

/// Encrypts and decrypts the payload of `Crypto` attributes. Implementations
/// are injected by the application; the engine never chooses an algorithm.
pub trait CryptoProvider: Send + Sync {
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>, String>;

    fn decrypt(&self, cipher: &[u8]) -> Result<Vec<u8>, String>;
}

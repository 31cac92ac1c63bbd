use async_trait::async_trait;

use crate::error::BoxError;

/// A signature over built transaction bytes, echoing the signed payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureBytes {
    pub signature: Vec<u8>,
    pub bytes: Vec<u8>,
}

/// The signing seam. Key management, schemes, and envelope formats live
/// behind implementations of this trait.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, bytes: &[u8]) -> Result<SignatureBytes, BoxError>;
}

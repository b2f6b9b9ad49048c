//! Streaming content hashing.
//!
//! Assets can be hundreds of megabytes; bytes are hashed and counted as
//! they arrive, never buffered whole.

use futures::StreamExt;
use sha2::Digest as _;

use crate::io::AssetByteStream;
use crate::types::{HashAlgorithm, HexDigest};

/// Incremental (size, digest) accumulator over one asset's bytes.
#[derive(Debug)]
pub struct ContentHasher {
    state: State,
    bytes_seen: u64,
}

#[derive(Debug)]
enum State {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

impl ContentHasher {
    /// Start a fresh hash under the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Blake3 => State::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => State::Sha256(sha2::Sha256::new()),
        };
        Self {
            state,
            bytes_seen: 0,
        }
    }

    /// Feed one chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.bytes_seen += chunk.len() as u64;
        match &mut self.state {
            State::Blake3(hasher) => {
                hasher.update(chunk);
            }
            State::Sha256(hasher) => hasher.update(chunk),
        }
    }

    /// Total bytes and lowercase hex digest.
    pub fn finalize(self) -> (u64, HexDigest) {
        let digest = match self.state {
            State::Blake3(hasher) => HexDigest::from_bytes(hasher.finalize().as_bytes()),
            State::Sha256(hasher) => HexDigest::from_bytes(&hasher.finalize()),
        };
        (self.bytes_seen, digest)
    }
}

/// Drain a byte stream once, hashing and counting as bytes arrive.
///
/// When the release API reported a size up front, a stream of any other
/// length is an error: the hash would not describe the asset the release
/// claims to hold.
pub async fn hash_stream(
    mut stream: AssetByteStream,
    algorithm: HashAlgorithm,
    expected_size: Option<u64>,
) -> std::io::Result<(u64, HexDigest)> {
    let mut hasher = ContentHasher::new(algorithm);
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    let (size, digest) = hasher.finalize();
    if let Some(expected) = expected_size {
        if expected != size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected {expected} bytes but stream ended after {size}"),
            ));
        }
    }
    Ok((size, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn stream_of(chunks: Vec<&'static [u8]>) -> AssetByteStream {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<std::io::Result<Bytes>>>(),
        )
        .boxed()
    }

    #[tokio::test]
    async fn sha256_known_vector() {
        let (size, digest) = hash_stream(stream_of(vec![b"abc"]), HashAlgorithm::Sha256, None)
            .await
            .unwrap();
        assert_eq!(size, 3);
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn blake3_empty_vector() {
        let (size, digest) = hash_stream(stream_of(vec![]), HashAlgorithm::Blake3, None)
            .await
            .unwrap();
        assert_eq!(size, 0);
        assert_eq!(
            digest.as_str(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[tokio::test]
    async fn chunked_stream_matches_one_shot_hash() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let (size, digest) = hash_stream(
            stream_of(vec![&data[..10], &data[10..20], &data[20..]]),
            HashAlgorithm::Blake3,
            Some(data.len() as u64),
        )
        .await
        .unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(digest.as_str(), blake3::hash(data).to_hex().as_str());
    }

    #[tokio::test]
    async fn short_stream_fails_size_check() {
        let err = hash_stream(stream_of(vec![b"abc"]), HashAlgorithm::Blake3, Some(10))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains('3'));
    }

    #[tokio::test]
    async fn read_failure_propagates() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection reset",
            )),
        ];
        let err = hash_stream(stream::iter(chunks).boxed(), HashAlgorithm::Blake3, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn algorithm_changes_digest_not_size() {
        let (size_b3, digest_b3) = hash_stream(stream_of(vec![b"abc"]), HashAlgorithm::Blake3, None)
            .await
            .unwrap();
        let (size_sha, digest_sha) =
            hash_stream(stream_of(vec![b"abc"]), HashAlgorithm::Sha256, None)
                .await
                .unwrap();
        assert_eq!(size_b3, size_sha);
        assert_ne!(digest_b3.as_str(), digest_sha.as_str());
    }
}

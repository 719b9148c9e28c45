//! File checksums.

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use filescraper_common::{Error, Result};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl FromStr for Algorithm {
    type Err = Error;

    /// Accepts `sha256`, `SHA-256` and `sha-256` style names.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(Error::invalid_parameter(
                "algorithm",
                format!("unsupported checksum algorithm: {s}"),
            )),
        }
    }
}

fn digest_file<D: Digest>(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; 1024 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hex digest of the file at `path`.
pub fn hexdigest(path: &Path, algorithm: Algorithm) -> Result<String> {
    match algorithm {
        Algorithm::Sha224 => digest_file::<Sha224>(path),
        Algorithm::Sha256 => digest_file::<Sha256>(path),
        Algorithm::Sha384 => digest_file::<Sha384>(path),
        Algorithm::Sha512 => digest_file::<Sha512>(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_known_digests() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            hexdigest(file.path(), Algorithm::Sha256).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hexdigest(file.path(), Algorithm::Sha224).unwrap(),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
        assert_eq!(hexdigest(file.path(), Algorithm::Sha384).unwrap().len(), 96);
        assert_eq!(hexdigest(file.path(), Algorithm::Sha512).unwrap().len(), 128);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("SHA-256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!("sha512".parse::<Algorithm>().unwrap(), Algorithm::Sha512);
        assert!("md5".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(hexdigest(Path::new("/nonexistent/file"), Algorithm::Sha256).is_err());
    }
}

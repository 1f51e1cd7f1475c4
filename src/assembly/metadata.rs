//! Assembly identity from the `Assembly` metadata row
//!
//! `dotscope` loads the image and resolves the row; this module only turns
//! it into an [`AssemblyIdentity`].

use std::fs;
use std::path::Path;

use dotscope::CilObject;
use sha1::{Digest, Sha1};
use thiserror::Error;

use super::AssemblyIdentity;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a loadable .NET image: {0}")]
    Load(#[from] dotscope::Error),

    /// A managed module without an assembly manifest
    #[error("Image has no assembly manifest")]
    NotManaged,
}

pub type MetadataResult<T> = Result<T, MetadataError>;

/// Read the identity of the assembly stored at `path`
pub fn read_identity(path: &Path) -> MetadataResult<AssemblyIdentity> {
    let data = fs::read(path).map_err(|source| MetadataError::Io {
        message: format!("Failed to read {:?}", path),
        source,
    })?;
    identity_from_image(data)
}

/// Identity of a PE image held in memory
pub fn identity_from_image(data: Vec<u8>) -> MetadataResult<AssemblyIdentity> {
    let object = CilObject::from_mem(data)?;
    let assembly = object.assembly().ok_or(MetadataError::NotManaged)?;
    Ok(identity_from_row(
        &assembly.name,
        [
            assembly.major_version,
            assembly.minor_version,
            assembly.build_number,
            assembly.revision_number,
        ],
        assembly.culture.as_deref(),
        assembly.public_key.as_deref(),
    ))
}

/// Identity from the decoded columns of an `Assembly` row. Empty culture
/// and empty key mean neutral and unsigned.
pub fn identity_from_row(
    name: &str,
    version: [u32; 4],
    culture: Option<&str>,
    public_key: Option<&[u8]>,
) -> AssemblyIdentity {
    AssemblyIdentity {
        name: name.to_string(),
        version: version.iter().map(u32::to_string).collect::<Vec<_>>().join("."),
        culture: culture.filter(|c| !c.is_empty()).map(str::to_string),
        public_key_token: public_key.filter(|k| !k.is_empty()).map(public_key_token),
    }
}

/// Last eight bytes of the SHA-1 of the key, reversed, as lowercase hex
pub fn public_key_token(public_key: &[u8]) -> String {
    let digest = Sha1::digest(public_key);
    digest.iter().rev().take(8).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;

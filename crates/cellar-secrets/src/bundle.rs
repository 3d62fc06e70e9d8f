//! Tar codec for packing many secrets into one plaintext
//!
//! A packed archive is sealed with a single envelope, so bulk operations cost
//! one KMS round trip regardless of how many secrets they carry. Output is
//! deterministic: entries are sorted by name and carry fixed metadata.

use crate::error::{Error, Result};
use crate::types::SecretMap;
use std::collections::BTreeMap;
use std::io::Read;
use tar::{Archive, Builder, EntryType, Header};

/// Mode recorded for every packed entry (owner read-only)
const ENTRY_MODE: u32 = 0o400;

/// Normalize a secret path into an archive entry name
///
/// Empty and `.` segments are dropped and `..` is resolved lexically. A name
/// that is absolute or climbs above the archive root is rejected.
pub fn normalize_entry_name(name: &str) -> Result<String> {
    if name.starts_with('/') {
        return Err(Error::path_traversal(name));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::path_traversal(name));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(Error::malformed_archive(format!(
            "entry name {:?} is empty after normalization",
            name
        )));
    }

    Ok(segments.join("/"))
}

fn archive_error(err: std::io::Error) -> Error {
    Error::malformed_archive(err.to_string())
}

/// Pack secrets into a tar archive, one regular-file entry per secret
pub fn pack(secrets: &SecretMap) -> Result<Vec<u8>> {
    let mut entries: BTreeMap<String, &[u8]> = BTreeMap::new();
    for (path, data) in secrets {
        let name = normalize_entry_name(path)?;
        if entries.insert(name.clone(), data.as_slice()).is_some() {
            return Err(Error::duplicate_entry(name));
        }
    }

    let mut builder = Builder::new(Vec::new());
    for (name, data) in &entries {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(ENTRY_MODE);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_username("root").map_err(archive_error)?;
        header.set_groupname("root").map_err(archive_error)?;

        builder
            .append_data(&mut header, name, *data)
            .map_err(archive_error)?;
    }

    builder.into_inner().map_err(archive_error)
}

/// Unpack a tar archive into a path-to-contents map
///
/// Directory entries are skipped. Duplicate names (after normalization) and
/// names escaping the archive root are rejected rather than resolved.
pub fn unpack(archive: &[u8]) -> Result<SecretMap> {
    let mut secrets = SecretMap::new();
    let mut archive = Archive::new(archive);

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            continue;
        }
        if !entry_type.is_file() {
            return Err(Error::malformed_archive(format!(
                "unsupported entry type {:?}",
                entry_type
            )));
        }

        let raw_name = entry.path_bytes().into_owned();
        let raw_name = String::from_utf8(raw_name)
            .map_err(|_| Error::malformed_archive("entry name is not valid UTF-8"))?;
        let name = normalize_entry_name(&raw_name)?;

        if secrets.contains_key(&name) {
            return Err(Error::duplicate_entry(name));
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(archive_error)?;
        secrets.insert(name, data);
    }

    Ok(secrets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(pairs: &[(&str, &str)]) -> SecretMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    fn raw_entry(builder: &mut Builder<Vec<u8>>, name: &[u8], data: &[u8]) {
        let mut header = Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o400);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let input = secrets(&[("a.txt", "1"), ("b.txt", "2")]);

        let archive = pack(&input).unwrap();
        let output = unpack(&archive).unwrap();

        assert_eq!(output, input);
    }

    #[test]
    fn test_nested_and_binary_contents() {
        let mut input = secrets(&[("db/prod/password", "hunter2"), ("tls/key.pem", "")]);
        input.insert("blob.bin".to_string(), (0..=255u8).collect());

        let output = unpack(&pack(&input).unwrap()).unwrap();

        assert_eq!(output, input);
    }

    #[test]
    fn test_long_entry_names() {
        let long = format!("{}/secret.txt", "nested".repeat(30));
        let input = secrets(&[(long.as_str(), "value")]);

        let output = unpack(&pack(&input).unwrap()).unwrap();

        assert_eq!(output.get(&long).map(Vec::as_slice), Some(&b"value"[..]));
    }

    #[test]
    fn test_pack_is_deterministic() {
        let input = secrets(&[("z", "last"), ("a", "first"), ("m/n", "middle")]);
        assert_eq!(pack(&input).unwrap(), pack(&input).unwrap());
    }

    #[test]
    fn test_empty_mapping() {
        let output = unpack(&pack(&SecretMap::new()).unwrap()).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_pack_rejects_traversal() {
        let result = pack(&secrets(&[("../escape", "x")]));
        assert!(matches!(result, Err(Error::PathTraversal { .. })));

        let result = pack(&secrets(&[("/etc/passwd", "x")]));
        assert!(matches!(result, Err(Error::PathTraversal { .. })));
    }

    #[test]
    fn test_pack_rejects_names_colliding_after_normalization() {
        let result = pack(&secrets(&[("a.txt", "1"), ("./a.txt", "2")]));
        assert!(matches!(result, Err(Error::DuplicateEntry { name }) if name == "a.txt"));
    }

    #[test]
    fn test_unpack_rejects_duplicate_entries() {
        let mut builder = Builder::new(Vec::new());
        raw_entry(&mut builder, b"a.txt", b"first");
        raw_entry(&mut builder, b"a.txt", b"second");
        let archive = builder.into_inner().unwrap();

        let result = unpack(&archive);
        assert!(matches!(result, Err(Error::DuplicateEntry { name }) if name == "a.txt"));
    }

    #[test]
    fn test_unpack_rejects_traversal() {
        let mut builder = Builder::new(Vec::new());
        raw_entry(&mut builder, b"ok.txt", b"fine");
        raw_entry(&mut builder, b"../escape", b"bad");
        let archive = builder.into_inner().unwrap();

        let result = unpack(&archive);
        assert!(matches!(result, Err(Error::PathTraversal { name }) if name == "../escape"));
    }

    #[test]
    fn test_normalize_entry_name() {
        assert_eq!(normalize_entry_name("a/b/c").unwrap(), "a/b/c");
        assert_eq!(normalize_entry_name("./a//b/").unwrap(), "a/b");
        assert_eq!(normalize_entry_name("a/../b").unwrap(), "b");
        assert!(matches!(
            normalize_entry_name("a/../../b"),
            Err(Error::PathTraversal { .. })
        ));
        assert!(matches!(
            normalize_entry_name("./"),
            Err(Error::MalformedArchive { .. })
        ));
    }
}

//! Mirror set — a storage gateway over local directories that each hold
//! a full replica of every bucket.
//!
//! Healing is replica reconciliation: an object needs healing when some
//! online disk lacks it or holds different bytes, and healing rewrites the
//! copy held by the most disks onto every disk that disagrees.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{ListResult, MAX_LIST_KEYS, ObjectInfo, StatusSnapshot, StorageGateway};

const META_DIR: &str = ".strata";
const FORMAT_FILE: &str = "format.json";
const FORMAT_VERSION: u32 = 1;

type ContentHash = [u8; 32];

/// Per-disk format metadata persisted in `.strata/format.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct DiskFormat {
    version: u32,
    set_id: String,
    disk_id: String,
}

#[derive(Debug, Default)]
struct FormatState {
    /// Set id agreed by the largest group of disks.
    set_id: Option<String>,
    /// Per-disk membership, same order as `MirrorSet::disks`.
    online: Vec<bool>,
    ready: bool,
}

/// A set of local disks holding full replicas.
pub struct MirrorSet {
    disks: Vec<PathBuf>,
    state: RwLock<FormatState>,
}

impl MirrorSet {
    /// Create a mirror set over `disks`. No I/O happens until
    /// [`load_format`](Self::load_format) is called.
    pub fn new(disks: Vec<PathBuf>) -> Self {
        let online = vec![false; disks.len()];
        Self {
            disks,
            state: RwLock::new(FormatState {
                set_id: None,
                online,
                ready: false,
            }),
        }
    }

    /// All disks of the set, online or not.
    pub fn disks(&self) -> &[PathBuf] {
        &self.disks
    }

    /// Disks that must agree for the set to accept writes.
    pub fn write_quorum(&self) -> usize {
        self.disks.len() / 2 + 1
    }

    /// Disks that must agree for the set to serve reads.
    pub fn read_quorum(&self) -> usize {
        (self.disks.len() / 2).max(1)
    }

    /// Re-read every disk's format and recompute readiness.
    ///
    /// Returns whether the set is ready afterwards.
    pub fn load_format(&self) -> bool {
        let formats: Vec<Option<DiskFormat>> = self
            .disks
            .iter()
            .map(|disk| match read_format(disk) {
                Ok(format) => format,
                Err(e) => {
                    warn!(disk = %disk.display(), error = %e, "unreadable disk format");
                    None
                }
            })
            .collect();

        let set_id = majority_set_id(&formats);
        let online: Vec<bool> = formats
            .iter()
            .map(|format| match (format, &set_id) {
                (Some(format), Some(id)) => format.set_id == *id,
                _ => false,
            })
            .collect();
        let online_count = online.iter().filter(|o| **o).count();
        let ready = set_id.is_some() && online_count >= self.write_quorum();

        debug!(
            online = online_count,
            total = self.disks.len(),
            ready,
            "disk formats loaded"
        );

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = FormatState {
            set_id,
            online,
            ready,
        };
        ready
    }

    /// Buckets present on any online disk, sorted.
    pub fn list_buckets(&self) -> GatewayResult<Vec<String>> {
        let disks = self.ensure_ready()?;
        let mut buckets = BTreeSet::new();

        for disk in &disks {
            let entries = fs::read_dir(disk).map_err(|e| GatewayError::io(disk, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| GatewayError::io(disk, e))?;
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    if name != META_DIR {
                        buckets.insert(name.to_string());
                    }
                }
            }
        }

        Ok(buckets.into_iter().collect())
    }

    fn online_disks(&self) -> Vec<PathBuf> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        self.disks
            .iter()
            .zip(&state.online)
            .filter(|(_, online)| **online)
            .map(|(disk, _)| disk.clone())
            .collect()
    }

    fn ensure_ready(&self) -> GatewayResult<Vec<PathBuf>> {
        if !self.is_ready() {
            return Err(GatewayError::NotReady);
        }
        Ok(self.online_disks())
    }
}

impl StorageGateway for MirrorSet {
    fn is_ready(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).ready
    }

    fn list_objects_for_heal(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> GatewayResult<ListResult> {
        if bucket.is_empty() || max_keys == 0 {
            return Ok(ListResult::default());
        }
        validate_bucket(bucket)?;
        let disks = self.ensure_ready()?;

        let mut scans = Vec::with_capacity(disks.len());
        for disk in &disks {
            scans.push(scan_bucket(disk, bucket, prefix)?);
        }
        if scans.iter().all(Option::is_none) {
            return Err(GatewayError::BucketNotFound(bucket.to_string()));
        }
        let scans: Vec<BTreeMap<String, (ContentHash, u64)>> =
            scans.into_iter().map(Option::unwrap_or_default).collect();

        let mut names: BTreeMap<&str, u64> = BTreeMap::new();
        for scan in &scans {
            for (name, (_, size)) in scan {
                names.entry(name.as_str()).or_insert(*size);
            }
        }

        let max_keys = max_keys.min(MAX_LIST_KEYS);
        let mut objects: Vec<ObjectInfo> = Vec::new();
        let mut is_truncated = false;

        for (name, size) in names {
            if !needs_heal(&scans, name) {
                continue;
            }

            let entry = match common_prefix(name, prefix, delimiter) {
                Some(rolled) => ObjectInfo {
                    name: rolled,
                    size: 0,
                    is_prefix: true,
                },
                None => ObjectInfo {
                    name: name.to_string(),
                    size,
                    is_prefix: false,
                },
            };

            if entry.name.as_str() <= marker {
                continue;
            }
            if objects.last().is_some_and(|last| last.name == entry.name) {
                continue;
            }
            if objects.len() == max_keys {
                is_truncated = true;
                break;
            }
            objects.push(entry);
        }

        let next_marker = match (is_truncated, objects.last()) {
            (true, Some(last)) => last.name.clone(),
            _ => String::new(),
        };

        debug!(%bucket, %prefix, count = objects.len(), is_truncated, "listed heal targets");

        Ok(ListResult {
            is_truncated,
            next_marker,
            objects,
        })
    }

    fn heal_object(&self, bucket: &str, object: &str) -> GatewayResult<()> {
        validate_bucket(bucket)?;
        validate_object(object)?;
        let disks = self.ensure_ready()?;

        let mut has_bucket = false;
        let mut copies: Vec<Option<ContentHash>> = Vec::with_capacity(disks.len());
        for disk in &disks {
            let bucket_dir = disk.join(bucket);
            has_bucket |= bucket_dir.is_dir();

            let path = bucket_dir.join(object);
            copies.push(if path.is_file() {
                Some(hash_file(&path)?.0)
            } else {
                None
            });
        }

        if !has_bucket {
            return Err(GatewayError::BucketNotFound(bucket.to_string()));
        }
        let Some(good) = majority_hash(&copies) else {
            return Err(GatewayError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            });
        };
        let source_index = copies
            .iter()
            .position(|c| c.as_ref() == Some(&good))
            .unwrap_or_default();

        let source = disks[source_index].join(bucket).join(object);
        let data = fs::read(&source).map_err(|e| GatewayError::io(&source, e))?;

        let mut healed = 0;
        for (disk, copy) in disks.iter().zip(&copies) {
            if copy.as_ref() == Some(&good) {
                continue;
            }
            let target = disk.join(bucket).join(object);
            write_atomic(disk, &target, &data)?;
            debug!(disk = %disk.display(), %bucket, %object, "rewrote object replica");
            healed += 1;
        }

        info!(%bucket, %object, healed, "healed object");
        Ok(())
    }

    fn storage_status(&self) -> StatusSnapshot {
        let online = self.online_disks();

        let used_bytes = online
            .iter()
            .flat_map(|disk| {
                WalkDir::new(disk)
                    .min_depth(1)
                    .into_iter()
                    .filter_entry(|e| e.file_name() != META_DIR)
                    .filter_map(Result::ok)
            })
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum();

        StatusSnapshot {
            backend: "mirror".to_string(),
            total_disks: self.disks.len(),
            online_disks: online.len(),
            offline_disks: self.disks.len() - online.len(),
            read_quorum: self.read_quorum(),
            write_quorum: self.write_quorum(),
            used_bytes,
        }
    }

    fn repair_disk_metadata(&self, disks: &[PathBuf]) -> GatewayResult<()> {
        if let Some(unknown) = disks.iter().find(|d| !self.disks.contains(d)) {
            return Err(GatewayError::UnknownDisk(unknown.clone()));
        }

        self.load_format();
        let set_id = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_id
            .clone()
            .unwrap_or_else(|| generate_id(Path::new("set")));

        let mut repaired = 0;
        for disk in disks {
            let current = read_format(disk).unwrap_or_else(|e| {
                warn!(disk = %disk.display(), error = %e, "replacing unreadable disk format");
                None
            });

            match current {
                Some(format) if format.set_id == set_id => continue,
                Some(format) => {
                    warn!(
                        disk = %disk.display(),
                        found = %format.set_id,
                        expected = %set_id,
                        "disk belongs to another set, reformatting"
                    );
                }
                None => {}
            }

            write_format(
                disk,
                &DiskFormat {
                    version: FORMAT_VERSION,
                    set_id: set_id.clone(),
                    disk_id: generate_id(disk),
                },
            )?;
            repaired += 1;
        }

        let ready = self.load_format();
        info!(%set_id, repaired, ready, "disk metadata repair complete");
        Ok(())
    }
}

fn read_format(disk: &Path) -> GatewayResult<Option<DiskFormat>> {
    let path = disk.join(META_DIR).join(FORMAT_FILE);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GatewayError::io(path, e)),
    };

    let format: DiskFormat = serde_json::from_slice(&raw)
        .map_err(|e| GatewayError::Format(format!("{}: {e}", path.display())))?;
    if format.version != FORMAT_VERSION {
        return Err(GatewayError::Format(format!(
            "{}: unsupported format version {}",
            path.display(),
            format.version
        )));
    }
    Ok(Some(format))
}

fn write_format(disk: &Path, format: &DiskFormat) -> GatewayResult<()> {
    let data = serde_json::to_vec_pretty(format).map_err(|e| GatewayError::Format(e.to_string()))?;
    write_atomic(disk, &disk.join(META_DIR).join(FORMAT_FILE), &data)
}

/// Write `data` to `target` through a temp file under the disk's
/// metadata directory, so readers never observe a partial file.
fn write_atomic(disk: &Path, target: &Path, data: &[u8]) -> GatewayResult<()> {
    let tmp_dir = disk.join(META_DIR).join("tmp");
    fs::create_dir_all(&tmp_dir).map_err(|e| GatewayError::io(&tmp_dir, e))?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| GatewayError::io(parent, e))?;
    }

    let tmp = tmp_dir.join(generate_id(target));
    fs::write(&tmp, data).map_err(|e| GatewayError::io(&tmp, e))?;
    fs::rename(&tmp, target).map_err(|e| GatewayError::io(target, e))
}

/// Object names under `<disk>/<bucket>` that start with `prefix`, with
/// their content hash and size. `None` when the bucket is absent.
fn scan_bucket(
    disk: &Path,
    bucket: &str,
    prefix: &str,
) -> GatewayResult<Option<BTreeMap<String, (ContentHash, u64)>>> {
    let root = disk.join(bucket);
    if !root.is_dir() {
        return Ok(None);
    }

    let mut objects = BTreeMap::new();
    for entry in WalkDir::new(&root).min_depth(1) {
        let entry = entry.map_err(|e| GatewayError::io(&root, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let Some(parts) = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
        else {
            warn!(path = %entry.path().display(), "skipping object with non-UTF-8 name");
            continue;
        };
        let name = parts.join("/");
        if !name.starts_with(prefix) {
            continue;
        }

        objects.insert(name, hash_file(entry.path())?);
    }

    Ok(Some(objects))
}

fn hash_file(path: &Path) -> GatewayResult<(ContentHash, u64)> {
    let mut file = fs::File::open(path).map_err(|e| GatewayError::io(path, e))?;
    let mut hasher = Sha256::new();
    let size = std::io::copy(&mut file, &mut hasher).map_err(|e| GatewayError::io(path, e))?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    Ok((hash, size))
}

/// An object needs healing when any online disk lacks it or disagrees
/// with the others about its content.
fn needs_heal(scans: &[BTreeMap<String, (ContentHash, u64)>], name: &str) -> bool {
    let mut seen: Option<&ContentHash> = None;
    for scan in scans {
        match (scan.get(name), seen) {
            (None, _) => return true,
            (Some((hash, _)), None) => seen = Some(hash),
            (Some((hash, _)), Some(first)) if hash != first => return true,
            _ => {}
        }
    }
    false
}

/// Roll `name` up to the first `delimiter` after `prefix`, if any.
fn common_prefix(name: &str, prefix: &str, delimiter: &str) -> Option<String> {
    if delimiter.is_empty() {
        return None;
    }
    let rest = name.get(prefix.len()..)?;
    rest.find(delimiter)
        .map(|i| format!("{prefix}{}", &rest[..i + delimiter.len()]))
}

/// Content held by the most disks; ties go to the lowest disk index.
fn majority_hash(copies: &[Option<ContentHash>]) -> Option<ContentHash> {
    let mut best: Option<(ContentHash, usize)> = None;
    for hash in copies.iter().flatten() {
        let count = copies.iter().flatten().filter(|h| *h == hash).count();
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((*hash, count));
        }
    }
    best.map(|(hash, _)| hash)
}

/// Set id shared by the most disks; ties go to the lowest disk index.
fn majority_set_id(formats: &[Option<DiskFormat>]) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for format in formats.iter().flatten() {
        let count = formats
            .iter()
            .flatten()
            .filter(|f| f.set_id == format.set_id)
            .count();
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((&format.set_id, count));
        }
    }
    best.map(|(id, _)| id.to_string())
}

fn validate_bucket(bucket: &str) -> GatewayResult<()> {
    if bucket.is_empty()
        || bucket.contains('/')
        || bucket.contains('\\')
        || bucket == "."
        || bucket == ".."
        || bucket == META_DIR
    {
        return Err(GatewayError::InvalidArgument(format!("invalid bucket name: {bucket:?}")));
    }
    Ok(())
}

fn validate_object(object: &str) -> GatewayResult<()> {
    let valid = !object.is_empty()
        && Path::new(object)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !valid {
        return Err(GatewayError::InvalidArgument(format!("invalid object name: {object:?}")));
    }
    Ok(())
}

fn generate_id(seed: &Path) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(seed.as_os_str().as_encoded_bytes());
    hex::encode(&hasher.finalize()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_set(disks: usize) -> (TempDir, MirrorSet) {
        let dir = TempDir::new().unwrap();
        let paths = (0..disks)
            .map(|i| {
                let path = dir.path().join(format!("disk{i}"));
                fs::create_dir_all(&path).unwrap();
                path
            })
            .collect();
        (dir, MirrorSet::new(paths))
    }

    fn formatted_set(disks: usize) -> (TempDir, MirrorSet) {
        let (dir, set) = test_set(disks);
        let all = set.disks().to_vec();
        set.repair_disk_metadata(&all).unwrap();
        (dir, set)
    }

    fn put(disk: &Path, bucket: &str, object: &str, data: &[u8]) {
        let path = disk.join(bucket).join(object);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn names(result: &ListResult) -> Vec<&str> {
        result.objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn unformatted_set_is_not_ready() {
        let (_dir, set) = test_set(3);
        assert!(!set.load_format());
        assert!(!set.is_ready());
        assert!(matches!(
            set.list_objects_for_heal("photos", "", "", "", 100),
            Err(GatewayError::NotReady)
        ));
    }

    #[test]
    fn repair_formats_all_disks() {
        let (_dir, set) = formatted_set(3);
        assert!(set.is_ready());

        let status = set.storage_status();
        assert_eq!(status.backend, "mirror");
        assert_eq!(status.total_disks, 3);
        assert_eq!(status.online_disks, 3);
        assert_eq!(status.offline_disks, 0);
        assert_eq!(status.write_quorum, 2);
        assert_eq!(status.read_quorum, 1);
    }

    #[test]
    fn repair_rejects_foreign_disk() {
        let (_dir, set) = test_set(2);
        let err = set
            .repair_disk_metadata(&[PathBuf::from("/definitely/not/ours")])
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownDisk(_)));
    }

    #[test]
    fn readiness_needs_write_quorum() {
        let (_dir, set) = test_set(3);
        let disks = set.disks().to_vec();

        set.repair_disk_metadata(&disks[..1]).unwrap();
        assert!(!set.is_ready());

        set.repair_disk_metadata(&disks[1..2]).unwrap();
        assert!(set.is_ready());
        assert_eq!(set.storage_status().offline_disks, 1);
    }

    #[test]
    fn repair_reuses_existing_set_id() {
        let (_dir, set) = formatted_set(3);
        let disks = set.disks().to_vec();
        fs::remove_dir_all(disks[2].join(META_DIR)).unwrap();

        assert!(set.load_format());
        assert_eq!(set.storage_status().online_disks, 2);

        set.repair_disk_metadata(&disks[2..]).unwrap();
        assert_eq!(set.storage_status().online_disks, 3);

        let a = read_format(&disks[0]).unwrap().unwrap();
        let c = read_format(&disks[2]).unwrap().unwrap();
        assert_eq!(a.set_id, c.set_id);
        assert_ne!(a.disk_id, c.disk_id);
    }

    #[test]
    fn format_survives_reopen() {
        let (_dir, set) = formatted_set(3);
        let reopened = MirrorSet::new(set.disks().to_vec());
        assert!(!reopened.is_ready());
        assert!(reopened.load_format());
    }

    #[test]
    fn list_finds_missing_and_divergent_objects() {
        let (_dir, set) = formatted_set(3);
        let disks = set.disks().to_vec();

        for disk in &disks {
            put(disk, "media", "photos/a.jpg", b"same");
        }
        put(&disks[0], "media", "photos/b.jpg", b"partial");
        put(&disks[1], "media", "photos/b.jpg", b"partial");
        put(&disks[0], "media", "docs/c.txt", b"good");
        put(&disks[1], "media", "docs/c.txt", b"good");
        put(&disks[2], "media", "docs/c.txt", b"rotten");

        let result = set.list_objects_for_heal("media", "", "", "", 100).unwrap();
        assert_eq!(names(&result), vec!["docs/c.txt", "photos/b.jpg"]);
        assert!(!result.is_truncated);
        assert!(result.next_marker.is_empty());
        assert_eq!(result.objects[1].size, 7);
    }

    #[test]
    fn list_applies_prefix_and_delimiter() {
        let (_dir, set) = formatted_set(2);
        let disks = set.disks().to_vec();
        put(&disks[0], "media", "photos/2024/a.jpg", b"x");
        put(&disks[0], "media", "photos/2024/b.jpg", b"x");
        put(&disks[0], "media", "photos/2025/c.jpg", b"x");
        put(&disks[0], "media", "photos/top.jpg", b"x");
        put(&disks[0], "media", "docs/readme", b"x");

        let result = set
            .list_objects_for_heal("media", "photos/", "", "/", 100)
            .unwrap();
        assert_eq!(
            names(&result),
            vec!["photos/2024/", "photos/2025/", "photos/top.jpg"]
        );
        assert!(result.objects[0].is_prefix);
        assert!(!result.objects[2].is_prefix);
    }

    #[test]
    fn list_paginates_with_marker() {
        let (_dir, set) = formatted_set(2);
        let disks = set.disks().to_vec();
        for name in ["a", "b", "c", "d", "e"] {
            put(&disks[0], "logs", name, b"x");
        }

        let first = set.list_objects_for_heal("logs", "", "", "", 2).unwrap();
        assert_eq!(names(&first), vec!["a", "b"]);
        assert!(first.is_truncated);
        assert_eq!(first.next_marker, "b");

        let second = set
            .list_objects_for_heal("logs", "", &first.next_marker, "", 2)
            .unwrap();
        assert_eq!(names(&second), vec!["c", "d"]);
        assert!(second.is_truncated);

        let last = set
            .list_objects_for_heal("logs", "", &second.next_marker, "", 2)
            .unwrap();
        assert_eq!(names(&last), vec!["e"]);
        assert!(!last.is_truncated);
        assert!(last.next_marker.is_empty());
    }

    #[test]
    fn list_boundaries_return_empty() {
        let (_dir, set) = formatted_set(2);
        put(&set.disks()[0], "logs", "a", b"x");

        assert_eq!(
            set.list_objects_for_heal("logs", "", "", "", 0).unwrap(),
            ListResult::default()
        );
        assert_eq!(
            set.list_objects_for_heal("", "", "", "", 100).unwrap(),
            ListResult::default()
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn list_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_dir, set) = formatted_set(2);
        let disk = set.disks()[0].clone();
        put(&disk, "media", "photos/a.jpg", b"x");

        let raw_dir = disk.join("media").join(OsStr::from_bytes(b"raw\xff"));
        fs::create_dir_all(&raw_dir).unwrap();
        fs::write(raw_dir.join("x.txt"), b"x").unwrap();
        fs::write(disk.join("media").join(OsStr::from_bytes(b"b\xfe.jpg")), b"x").unwrap();

        let result = set.list_objects_for_heal("media", "", "", "", 100).unwrap();
        assert_eq!(names(&result), vec!["photos/a.jpg"]);
    }

    #[test]
    fn list_missing_bucket_errors() {
        let (_dir, set) = formatted_set(2);
        assert!(matches!(
            set.list_objects_for_heal("nope", "", "", "", 10),
            Err(GatewayError::BucketNotFound(_))
        ));
    }

    #[test]
    fn heal_copies_missing_replica() {
        let (_dir, set) = formatted_set(3);
        let disks = set.disks().to_vec();
        put(&disks[0], "media", "photos/b.jpg", b"partial");
        put(&disks[1], "media", "photos/b.jpg", b"partial");

        set.heal_object("media", "photos/b.jpg").unwrap();

        let healed = fs::read(disks[2].join("media/photos/b.jpg")).unwrap();
        assert_eq!(healed, b"partial");
        let result = set.list_objects_for_heal("media", "", "", "", 100).unwrap();
        assert!(result.objects.is_empty());
    }

    #[test]
    fn heal_prefers_majority_content() {
        let (_dir, set) = formatted_set(3);
        let disks = set.disks().to_vec();
        put(&disks[0], "media", "c.txt", b"rotten");
        put(&disks[1], "media", "c.txt", b"good");
        put(&disks[2], "media", "c.txt", b"good");

        set.heal_object("media", "c.txt").unwrap();

        for disk in &disks {
            assert_eq!(fs::read(disk.join("media/c.txt")).unwrap(), b"good");
        }
    }

    #[test]
    fn heal_reports_missing_object_and_bucket() {
        let (_dir, set) = formatted_set(2);
        put(&set.disks()[0], "media", "a", b"x");

        assert!(matches!(
            set.heal_object("media", "ghost"),
            Err(GatewayError::ObjectNotFound { .. })
        ));
        assert!(matches!(
            set.heal_object("nothing", "a"),
            Err(GatewayError::BucketNotFound(_))
        ));
    }

    #[test]
    fn heal_rejects_path_traversal() {
        let (_dir, set) = formatted_set(2);
        assert!(matches!(
            set.heal_object("media", "../../etc/passwd"),
            Err(GatewayError::InvalidArgument(_))
        ));
        assert!(matches!(
            set.heal_object(META_DIR, "format.json"),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn list_buckets_skips_metadata() {
        let (_dir, set) = formatted_set(2);
        let disks = set.disks().to_vec();
        put(&disks[0], "alpha", "a", b"x");
        put(&disks[1], "beta", "b", b"x");

        assert_eq!(set.list_buckets().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn status_counts_object_bytes_only() {
        let (_dir, set) = formatted_set(2);
        let disks = set.disks().to_vec();
        put(&disks[0], "alpha", "a", b"12345");
        put(&disks[1], "alpha", "a", b"12345");

        assert_eq!(set.storage_status().used_bytes, 10);
    }
}

//! Filesystem-safe, collision-free filename resolution

use std::path::Path;

/// Characters that are rejected by at least one mainstream filesystem
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace filesystem-hostile characters with `_` and trim surrounding whitespace.
///
/// Pure string transformation, no I/O. Idempotent: sanitizing an already
/// sanitized name returns it unchanged.
pub fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Find a filename under `directory` that does not collide with an existing entry.
///
/// Returns `desired` unchanged when nothing with that name exists. Otherwise
/// probes `stem(1).ext`, `stem(2).ext`, … in increasing order and returns the
/// first free name. The split is on the last dot (`Path::file_stem` semantics),
/// so `clip.tar.gz` probes as `clip.tar(1).gz`.
///
/// The result is deterministic given the directory contents at call time, but
/// not atomic with respect to subsequent file creation: another process can
/// claim the returned name between the probe and the write.
pub fn resolve_unique(directory: &Path, desired: &str) -> String {
    if !directory.join(desired).exists() {
        return desired.to_string();
    }

    let path = Path::new(desired);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(desired);
    let extension = path.extension().and_then(|e| e.to_str());

    let mut counter: u64 = 1;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{stem}({counter}).{ext}"),
            None => format!("{stem}({counter})"),
        };
        if !directory.join(&candidate).exists() {
            return candidate;
        }
        counter += 1;
    }
}

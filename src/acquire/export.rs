use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::acquire::buffer::Snapshot;
use crate::acquire::error::ScopeError;

/// Serialize a snapshot as CSV: a header row of channel labels, then one row
/// per retained sample in chronological order.
///
/// The data is written to a sibling temp file and renamed into place, so a
/// failed write never leaves a truncated file at `path`. The snapshot itself
/// is untouched on failure and the save can simply be retried.
pub fn save_csv(snapshot: &Snapshot, path: &Path) -> Result<(), ScopeError> {
    let tmp = tmp_target(path);
    let result =
        write_rows(snapshot, &tmp).and_then(|()| fs::rename(&tmp, path).map_err(ScopeError::from));
    if result.is_err() {
        fs::remove_file(&tmp).ok();
    }
    result?;
    log::info!(
        "saved {} samples x {} channels to {}",
        snapshot.len(),
        snapshot.channel_count(),
        path.display()
    );
    Ok(())
}

/// Sibling of `path`, so the final rename stays on one filesystem.
fn tmp_target(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("export"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_rows(snapshot: &Snapshot, path: &Path) -> Result<(), ScopeError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    write!(w, "Time")?;
    for label in &snapshot.channel_labels {
        write!(w, ",{label}")?;
    }
    writeln!(w)?;

    for (t, row) in snapshot.rows() {
        write!(w, "{t:.6}")?;
        for value in row {
            write!(w, ",{value:.6}")?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

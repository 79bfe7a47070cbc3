use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::SimResult;
use crate::recorder::SnapshotTable;

pub const DELIMITER: char = ',';

fn needs_quoting(field: &str) -> bool {
    field.contains(|c: char| c == DELIMITER || matches!(c, '"' | '\n' | '\r'))
}

pub fn write_field<W: Write>(w: &mut W, field: &str) -> io::Result<()> {
    if needs_quoting(field) {
        write!(w, "\"{}\"", field.replace('"', "\"\""))
    } else {
        w.write_all(field.as_bytes())
    }
}

pub fn write_record<W: Write, S: AsRef<str>>(w: &mut W, fields: &[S]) -> io::Result<()> {
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            write!(w, "{DELIMITER}")?;
        }
        write_field(w, f.as_ref())?;
    }
    w.write_all(b"\n")
}

/// Header, then one line per snapshot row. Numbers use the shortest
/// representation that reads back to the same `f64`.
pub fn write_csv<W: Write>(w: &mut W, table: &SnapshotTable) -> io::Result<()> {
    write_record(w, table.header.as_slice())?;
    for row in &table.rows {
        write_field(w, &row.cues)?;
        write!(w, "{DELIMITER}")?;
        write_field(w, &row.marker)?;
        for v in &row.values {
            write!(w, "{DELIMITER}{v}")?;
        }
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Write the table to `path` via a temporary sibling file and a rename, so a
/// failed run never leaves a truncated CSV behind.
pub fn write_csv_atomic(path: &Path, table: &SnapshotTable) -> SimResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        write_csv(&mut w, table)?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), rows = table.rows.len() + 1, "wrote csv");
    Ok(())
}

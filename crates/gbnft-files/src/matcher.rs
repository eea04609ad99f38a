//! Match log: the receiver-side sink for delivered files.
//!
//! Every delivered file is compared against the whole catalog and the
//! outcome is appended to the result log, one line per file:
//! `<received-filename> <matched-filename-or-UNKNOWN>`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use gbnft_engine::Delivery;
use gbnft_wire::Payload;

use crate::catalog::Catalog;

/// Line-oriented result log, flushed per line so the output survives an
/// aborted session.
pub struct MatchLog {
    out: BufWriter<File>,
}

impl MatchLog {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn record(&mut self, received: &str, matched: Option<&str>) -> Result<()> {
        writeln!(self.out, "{} {}", received, matched.unwrap_or("UNKNOWN"))
            .context("failed to write match result")?;
        self.out.flush().context("failed to flush match log")?;
        Ok(())
    }
}

/// [`Delivery`] implementation wiring the receiver to the catalog and log.
pub struct CatalogMatcher {
    catalog: Catalog,
    log: MatchLog,
}

impl CatalogMatcher {
    pub fn new(catalog: Catalog, log: MatchLog) -> Self {
        Self { catalog, log }
    }
}

impl Delivery for CatalogMatcher {
    fn deliver(&mut self, file: Payload) -> Result<()> {
        let matched = self.catalog.match_bytes(&file.bytes);
        match matched {
            Some(entry) => debug!(received = %file.filename, matched = %entry.name, "match"),
            None => info!(received = %file.filename, "no matching catalog entry"),
        }
        self.log
            .record(&file.filename, matched.map(|e| e.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileBlob;
    use bytes::Bytes;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gbnft-match-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn records_match_and_unknown_lines_in_order() {
        let path = scratch("result.txt");
        let catalog = Catalog::from_entries(vec![FileBlob {
            name: "ref.pgm".to_string(),
            bytes: Bytes::from_static(b"known"),
        }]);
        let mut matcher = CatalogMatcher::new(catalog, MatchLog::create(&path).unwrap());

        matcher
            .deliver(Payload {
                id: 0,
                filename: "recv-a.pgm".to_string(),
                bytes: Bytes::from_static(b"known"),
            })
            .unwrap();
        matcher
            .deliver(Payload {
                id: 1,
                filename: "recv-b.pgm".to_string(),
                bytes: Bytes::from_static(b"mystery"),
            })
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "recv-a.pgm ref.pgm\nrecv-b.pgm UNKNOWN\n");
        fs::remove_file(&path).ok();
    }
}

use std::fs::{create_dir_all, remove_file, rename, File};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, SalesError};
use crate::job::SalesRun;
use crate::report::{write_baskets, write_stores, Summary};

/// Results report
pub const RESULTS_FILE: &str = "results.txt";

/// `StoreCode|StoreName` listing
pub const STORES_FILE: &str = "Stores.csv";

/// `StoreCode|products` listing
pub const BASKETS_FILE: &str = "Baskets.csv";

/// Which report files to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportFiles {
    pub stores: bool,
    pub baskets: bool
}

impl ReportFiles {

    /// Listings a run with `config` produces.  Baskets need basket items to be collected.
    pub fn from_config(config: &Config) -> Self {
        ReportFiles {
            stores: config.write_stores,
            baskets: config.write_baskets && config.basket_items
        }
    }
}

/// Directory report files are written into.
#[derive(Clone, Debug)]
pub struct ReportSink {
    root: PathBuf
}

/// A report file being written under a temporary name.  It only appears under its real
/// name once `finish` succeeds; dropped unfinished, the temporary file is removed.
pub struct ReportFile {
    tmp: PathBuf,
    target: PathBuf,
    out: Option<BufWriter<File>>
}

impl ReportFile {

    fn create(root: &Path, name: &str) -> io::Result<Self> {
        let tmp = root.join(format!(".{}.{}.tmp", name, Uuid::new_v4()));
        let fd = File::create(&tmp)?;
        Ok(ReportFile {
            tmp: tmp,
            target: root.join(name),
            out: Some(BufWriter::new(fd))
        })
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.out.as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "report file already closed"))
    }

    /// Flushes and moves the file to its real name.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        rename(&self.tmp, &self.target)?;
        Ok(self.target.clone())
    }
}

impl Drop for ReportFile {
    fn drop(&mut self) {
        if self.tmp.exists() {
            if let Err(e) = remove_file(&self.tmp) {
                warn!("Error deleting {:?}: {}", self.tmp, e);
            }
        }
    }
}

impl ReportSink {

    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        ReportSink { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `name` through `fill`, replacing any previous file of that name.
    pub fn write_atomic<F>(&self, name: &str, fill: F) -> Result<PathBuf>
            where F: FnOnce(&mut BufWriter<File>) -> io::Result<()> {

        let target = self.root.join(name);
        let wrap = |e: io::Error| SalesError::io(&target, e);

        create_dir_all(&self.root).map_err(|e| SalesError::io(&self.root, e))?;
        let mut file = ReportFile::create(&self.root, name).map_err(wrap)?;
        fill(file.writer().map_err(wrap)?).map_err(wrap)?;
        let path = file.finish().map_err(wrap)?;
        debug!("Wrote {:?}", path);
        Ok(path)
    }

    /// Deletes `name` if present.
    fn remove(&self, name: &str) -> Result<()> {
        let target = self.root.join(name);
        match remove_file(&target) {
            Ok(()) => {
                debug!("Removed stale {:?}", target);
                Ok(())
            },
            Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SalesError::io(&target, e))
        }
    }

    /// Writes the requested listings and then the results report for a finished run.
    ///
    /// A requested listing is always written, empty or not.  A listing that is not
    /// requested is removed so one from an earlier run never sits next to these results.
    /// The results report goes last, so it never exists without its listings.
    pub fn write_reports(&self, input: &Path, run: &SalesRun, files: ReportFiles) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if files.stores {
            written.push(self.write_atomic(STORES_FILE, |out| write_stores(&run.stats, out))?);
        } else {
            self.remove(STORES_FILE)?;
        }
        if files.baskets {
            written.push(self.write_atomic(BASKETS_FILE, |out| write_baskets(&run.stats, out))?);
        } else {
            self.remove(BASKETS_FILE)?;
        }

        let summary = Summary::new(input, run);
        written.push(self.write_atomic(RESULTS_FILE, |out| write!(out, "{}", summary))?);
        info!("Wrote {} report files to {:?}", written.len(), self.root);
        Ok(written)
    }
}

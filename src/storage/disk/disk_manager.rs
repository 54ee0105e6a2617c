use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::common::Result;

/// DiskManager is responsible for reading and writing pages to/from disk.
/// It manages a single table file made of `page_size` byte pages; page `n`
/// lives at byte offset `n * page_size`.
pub struct DiskManager {
    /// The table file
    db_file: Mutex<File>,
    /// Path to the table file
    db_path: PathBuf,
    /// Bytes per page
    page_size: usize,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `db_path`, creating it if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        Ok(Self {
            db_file: Mutex::new(file),
            db_path: db_path.as_ref().to_path_buf(),
            page_size,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    fn offset(&self, page_no: u32) -> u64 {
        page_no as u64 * self.page_size as u64
    }

    /// Reads exactly one page into `data`, which must be `page_size` bytes.
    /// A page that extends past the end of the file is an error, never
    /// zero-filled.
    pub fn read_page(&self, page_no: u32, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), self.page_size, "Buffer must be page_size bytes");

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(self.offset(page_no)))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes one page at its offset. Writing at or past the end of the file
    /// grows it.
    pub fn write_page(&self, page_no: u32, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), self.page_size, "Buffer must be page_size bytes");

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(self.offset(page_no)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data` as a new page directly after the last one and returns
    /// its page number. The length check and the write happen under one
    /// file lock, so concurrent appends get distinct pages.
    pub fn allocate_page(&self, data: &[u8]) -> Result<u32> {
        assert_eq!(data.len(), self.page_size, "Buffer must be page_size bytes");

        let mut file = self.db_file.lock();
        let len = file.metadata()?.len();
        let page_no = Self::pages_for_len(len, self.page_size);

        file.seek(SeekFrom::Start(self.offset(page_no)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!("appended page {} to {}", page_no, self.db_path.display());
        Ok(page_no)
    }

    fn pages_for_len(len: u64, page_size: usize) -> u32 {
        len.div_ceil(page_size as u64) as u32
    }

    /// Returns `ceil(file_length / page_size)`.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.db_file.lock();
        let len = file.metadata()?.len();
        Ok(Self::pages_for_len(len, self.page_size))
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of disk reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of disk writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the table file.
    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.db_file.get_mut();
        let _ = file.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DbError;
    use tempfile::NamedTempFile;

    const PAGE: usize = 4096;

    #[test]
    fn test_disk_manager_new() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 0);
    }

    #[test]
    fn test_disk_manager_allocate_page() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();

        let zeros = vec![0u8; PAGE];
        assert_eq!(dm.allocate_page(&zeros).unwrap(), 0);
        assert_eq!(dm.num_pages().unwrap(), 1);
        assert_eq!(dm.allocate_page(&zeros).unwrap(), 1);
        assert_eq!(dm.num_pages().unwrap(), 2);
    }

    #[test]
    fn test_disk_manager_read_write() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();

        let mut write_data = vec![0u8; PAGE];
        write_data[0] = 42;
        write_data[100] = 255;
        write_data[PAGE - 1] = 128;
        dm.write_page(0, &write_data).unwrap();

        let mut read_data = vec![0u8; PAGE];
        dm.read_page(0, &mut read_data).unwrap();
        assert_eq!(read_data, write_data);
        assert_eq!(dm.get_num_reads(), 1);
        assert_eq!(dm.get_num_writes(), 1);
    }

    #[test]
    fn test_write_one_past_end_grows_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();

        dm.write_page(0, &vec![1u8; PAGE]).unwrap();
        dm.write_page(1, &vec![2u8; PAGE]).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 2);
    }

    #[test]
    fn test_read_past_end_is_error() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();

        let mut data = vec![0u8; PAGE];
        assert!(matches!(dm.read_page(0, &mut data), Err(DbError::Io(_))));
    }

    #[test]
    fn test_partial_trailing_page_counts() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), vec![7u8; PAGE + 10]).unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();

        assert_eq!(dm.num_pages().unwrap(), 2);
        let mut data = vec![0u8; PAGE];
        dm.read_page(0, &mut data).unwrap();
        assert!(dm.read_page(1, &mut data).is_err());
    }

    #[test]
    fn test_disk_manager_persistence() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        {
            let dm = DiskManager::new(&path, PAGE).unwrap();
            let mut data = vec![0u8; PAGE];
            data[0] = 123;
            dm.allocate_page(&data).unwrap();
        }

        {
            let dm = DiskManager::new(&path, PAGE).unwrap();
            assert_eq!(dm.num_pages().unwrap(), 1);

            let mut data = vec![0u8; PAGE];
            dm.read_page(0, &mut data).unwrap();
            assert_eq!(data[0], 123);
        }
    }
}

use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    fs::{File, OpenOptions},
    hash::{Hash, Hasher},
    io::{Read, Seek, SeekFrom, Write},
    sync::{Mutex, MutexGuard},
};

use log::debug;

use crate::{
    buffer::BufferPool,
    error::DbError,
    heap::{HeapPage, HeapPageID},
    storage::{Schema, Tuple, WrappedTuple},
    transaction::{Permission, Transaction},
    types::Pod,
    utils::HandyRwLock,
    Database,
};

/// On-disk heap file: an unordered sequence of fixed-size pages.
pub struct HeapTable {
    pub file_path: String,

    table_id: u32,

    pub schema: Schema,

    file: Mutex<File>,
}

impl HeapTable {
    pub fn new(file_path: &str, schema: &Schema) -> Self {
        File::create(file_path).expect("io error");

        let f = Mutex::new(
            OpenOptions::new()
                .write(true)
                .read(true)
                .open(file_path)
                .unwrap(),
        );

        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Self {
            file_path: file_path.to_string(),
            table_id,
            schema: schema.clone(),
            file: f,
        }
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> Schema {
        self.schema.clone()
    }

    pub fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    /// Pages currently on disk.
    pub fn pages_count(&self) -> usize {
        let len = self.get_file().metadata().unwrap().len() as usize;
        len / BufferPool::get_page_size()
    }

    /// Raw page load, bypassing the buffer pool.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, DbError> {
        let page_size = BufferPool::get_page_size();

        if pid.page_index as usize >= self.pages_count() {
            return Err(DbError::new(&format!(
                "page {} not in file {}",
                pid, self.file_path
            )));
        }

        let mut file = self.get_file();
        let start_pos = pid.page_index as usize * page_size;
        file.seek(SeekFrom::Start(start_pos as u64))
            .or(Err(DbError::io("seek failed")))?;

        let mut buf: Vec<u8> = vec![0; page_size];
        file.read_exact(&mut buf)
            .or(Err(DbError::io(&format!("read of page {} failed", pid))))?;

        debug!("page {} read from {}", pid, self.file_path);
        Ok(HeapPage::new(pid, &buf, &self.schema))
    }

    /// Raw page store, bypassing the buffer pool.
    pub fn write_page(&self, pid: &HeapPageID, data: &[u8]) -> Result<(), DbError> {
        let page_size = BufferPool::get_page_size();
        assert_eq!(data.len(), page_size);

        let mut file = self.get_file();
        let start_pos = pid.page_index as usize * page_size;
        file.seek(SeekFrom::Start(start_pos as u64))
            .or(Err(DbError::io("seek failed")))?;
        file.write_all(data)
            .or(Err(DbError::io(&format!("write of page {} failed", pid))))?;
        file.flush().or(Err(DbError::io("flush failed")))?;
        Ok(())
    }

    /// Extend the file with one zeroed page and return its id.
    pub fn append_empty_page(&self) -> Result<HeapPageID, DbError> {
        let page_size = BufferPool::get_page_size();

        let mut file = self.get_file();
        let len = file
            .metadata()
            .or(Err(DbError::io("metadata failed")))?
            .len() as usize;
        let page_index = (len / page_size) as u32;

        file.seek(SeekFrom::End(0))
            .or(Err(DbError::io("seek failed")))?;
        file.write_all(&HeapPage::empty_page_data())
            .or(Err(DbError::io("append failed")))?;
        file.flush().or(Err(DbError::io("flush failed")))?;

        debug!("page {} appended to {}", page_index, self.file_path);
        Ok(HeapPageID::new(self.table_id, page_index))
    }

    /// Insert inside a one-off transaction that commits right away.
    pub fn insert_tuple_auto_tx(&self, tuple: &Tuple) -> Result<(), DbError> {
        let tx = Transaction::new();
        if let Err(e) = Database::buffer_pool().insert_tuple(&tx, self.get_id(), tuple) {
            tx.abort()?;
            return Err(e);
        }
        tx.commit()
    }

    /// Find a page with room and place the tuple there, appending a
    /// fresh page when the whole file is packed. Returns the pages
    /// dirtied by the operation.
    ///
    /// Full pages are probed under a read lock that is dropped right
    /// away, so a long insert does not pin the entire file.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        for i in 0..self.pages_count() {
            let pid = HeapPageID::new(self.table_id, i as u32);

            let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadOnly, &pid)?;
            let has_room = page_rc.rl().empty_slots_count() > 0;
            if !page_rc.rl().get_pg_lock().holds_x_lock(tx.get_id()) {
                // Dropping the probe lock instead of upgrading keeps a
                // swarm of concurrent inserters out of mass upgrade
                // deadlocks.
                Database::buffer_pool().unsafe_release_page(tx, &pid);
            }
            if !has_room {
                continue;
            }

            let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;
            // the page may have filled up in between
            if page_rc.rl().empty_slots_count() == 0 {
                continue;
            }
            page_rc.wl().insert_tuple(tuple)?;
            return Ok(vec![page_rc]);
        }

        let pid = self.append_empty_page()?;
        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().insert_tuple(tuple)?;
        Ok(vec![page_rc])
    }

    /// Remove the tuple from the page it lives on. Returns the pages
    /// dirtied by the operation.
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        tuple: &WrappedTuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        let pid = tuple.get_pid();
        assert_eq!(pid.table_id, self.table_id);

        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().delete_tuple(tuple.get_slot_index())?;
        Ok(vec![page_rc])
    }
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapTable, file: {}, id: {}>",
            self.file_path, self.table_id
        )
    }
}

impl fmt::Debug for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

use std::{
    fs::{File, OpenOptions},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    query::predicate::{eval, Expression},
    storage::table::Table,
    types::{
        error::{DatabaseError, Result},
        TupleLocation,
    },
};

const TABLE_NAME_MAX_LEN: usize = 32;
#[cfg(unix)]
const TABLE_FILE_MODE: u32 = 0o600;

/// A database is a directory holding one pair of files per table:
/// `{name}.data` for tuples and `{name}.fsm` for the free-space map.
pub struct Database {
    dir: PathBuf,
}

impl Database {
    /// Opens a database over an existing directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Database> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DatabaseError::NotADirectory {
                path: dir.display().to_string(),
            });
        }
        Ok(Database {
            dir: dir.to_path_buf(),
        })
    }

    /// Opens (or creates) a typed table stored in this database directory.
    pub fn table<T>(&self, name: &str) -> Result<TypedTable<T>> {
        if !valid_table_name(name) {
            return Err(DatabaseError::InvalidTableName {
                name: name.to_string(),
            });
        }
        let data = self.open_table_file(&format!("{}.data", name))?;
        let fsm = self.open_table_file(&format!("{}.fsm", name))?;
        Ok(TypedTable {
            table: Table::new(data, fsm),
            _row: PhantomData,
        })
    }

    fn open_table_file(&self, file_name: &str) -> Result<File> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(TABLE_FILE_MODE);
        }
        Ok(options.open(self.dir.join(file_name))?)
    }
}

fn valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= TABLE_NAME_MAX_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Typed view over a table. Rows are serialized to self-describing binary
/// payloads on insert and decoded back to a generic nested map for
/// predicate evaluation on select.
#[derive(Debug)]
pub struct TypedTable<T> {
    table: Table,
    _row: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> TypedTable<T> {
    pub fn insert(&mut self, row: &T) -> Result<()> {
        let payload = serde_json::to_vec(row).map_err(|e| DatabaseError::SerializationError {
            details: e.to_string(),
        })?;
        self.table.add(&payload)
    }

    /// Returns every row matching the expression together with its
    /// location, which can later be passed to delete.
    pub fn select(&mut self, expression: &Expression) -> Result<(Vec<T>, Vec<TupleLocation>)> {
        let mut rows = Vec::new();
        let mut locations = Vec::new();
        let empty = Map::new();
        self.table.scan(|tuple, location| {
            let value: Value =
                serde_json::from_slice(&tuple).map_err(|e| DatabaseError::SerializationError {
                    details: e.to_string(),
                })?;
            let matched = eval(value.as_object().unwrap_or(&empty), expression);
            if matched {
                let row: T = serde_json::from_value(value).map_err(|e| {
                    DatabaseError::SerializationError {
                        details: e.to_string(),
                    }
                })?;
                rows.push(row);
                locations.push(location);
            }
            Ok(true)
        })?;
        Ok((rows, locations))
    }

    pub fn delete(&mut self, location: TupleLocation) -> Result<()> {
        self.table.delete(location)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.table.flush()
    }

    pub fn close(&mut self) -> Result<()> {
        self.table.close()
    }
}

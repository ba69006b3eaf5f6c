use std::{fs::File, marker::PhantomData};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    storage::page::Page,
    types::error::{DatabaseError, Result},
};

/// Single-page typed store: the smallest way to persist a handful of rows
/// in one file, selecting and deleting through plain closures instead of
/// predicate expressions. Everything lives in the first page of the file,
/// so capacity is bounded by one page.
pub struct Instance<T> {
    file: File,
    _row: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> Instance<T> {
    pub fn new(file: File) -> Self {
        Self {
            file,
            _row: PhantomData,
        }
    }

    pub fn insert(&mut self, row: &T) -> Result<()> {
        let payload = serde_json::to_vec(row).map_err(|e| DatabaseError::SerializationError {
            details: e.to_string(),
        })?;
        let mut page = Page::new(&self.file, 0);
        page.add(&payload)?;
        Ok(())
    }

    /// Returns every row the selector accepts.
    pub fn select<F>(&mut self, selector: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let mut page = Page::new(&self.file, 0);
        let mut results = Vec::new();
        for (_, tuple) in page.entries()? {
            let row = decode(&tuple)?;
            if selector(&row) {
                results.push(row);
            }
        }
        Ok(results)
    }

    /// Deletes every row the selector accepts and returns how many went.
    pub fn delete<F>(&mut self, selector: F) -> Result<usize>
    where
        F: Fn(&T) -> bool,
    {
        let mut page = Page::new(&self.file, 0);
        let mut deleted = 0;
        for (slot, tuple) in page.entries()? {
            let row = decode(&tuple)?;
            if selector(&row) {
                page.remove(slot)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    pub fn flush(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(tuple: &[u8]) -> Result<T> {
    serde_json::from_slice(tuple).map_err(|e| DatabaseError::SerializationError {
        details: e.to_string(),
    })
}

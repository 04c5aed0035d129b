//! In-memory stand-ins for the remote store and the page reader.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use docscan::error::ExtractError;
use docscan::processor::regions::resolve_index;
use docscan::processor::{PageLoader, RegionSource};
use docscan::remote::{DomainTerm, RemoteError, RemoteRecord, RemoteStore, Value};

/// Remote store backed by a name -> id table.
#[derive(Default)]
pub struct FakeStore {
    records: HashMap<String, i64>,
    /// Number of upcoming calls that fail with a transport error.
    failures: Cell<u32>,
    next_id: Cell<i64>,
    pub logins: Cell<u32>,
    pub searches: Cell<u32>,
    pub created: RefCell<Vec<(String, BTreeMap<String, Value>)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(31),
            ..Default::default()
        }
    }

    pub fn with_record(mut self, name: &str, id: i64) -> Self {
        self.records.insert(name.to_string(), id);
        self
    }

    pub fn failing(self, calls: u32) -> Self {
        self.failures.set(calls);
        self
    }

    fn fail_if_down(&self) -> Result<(), RemoteError> {
        let remaining = self.failures.get();
        if remaining > 0 {
            self.failures.set(remaining - 1);
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

impl RemoteStore for FakeStore {
    fn authenticate(&self) -> Result<i64, RemoteError> {
        self.logins.set(self.logins.get() + 1);
        Ok(2)
    }

    fn search(
        &self,
        _uid: i64,
        _object: &str,
        domain: &[DomainTerm],
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        self.searches.set(self.searches.get() + 1);
        self.fail_if_down()?;

        let name = domain
            .iter()
            .find(|term| term.field == "name")
            .and_then(|term| term.value.as_str())
            .unwrap_or_default();
        Ok(self
            .records
            .get(name)
            .map(|id| RemoteRecord {
                id: *id,
                name: name.to_string(),
            })
            .into_iter()
            .collect())
    }

    fn create(
        &self,
        _uid: i64,
        object: &str,
        values: BTreeMap<String, Value>,
    ) -> Result<i64, RemoteError> {
        self.fail_if_down()?;
        self.created.borrow_mut().push((object.to_string(), values));
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(id)
    }
}

/// Scripted page: each layer lists block texts top to bottom and applies
/// from its sensitivity downwards.
struct ScriptedPage {
    layers: Vec<(u32, Vec<String>)>,
    current: Vec<String>,
}

impl RegionSource for ScriptedPage {
    fn detect(&mut self, sensitivity: u32) -> Result<usize, ExtractError> {
        self.current = self
            .layers
            .iter()
            .find(|(threshold, _)| sensitivity <= *threshold)
            .map(|(_, texts)| texts.clone())
            .unwrap_or_default();
        Ok(self.current.len())
    }

    fn read(&mut self, index: i32) -> Result<String, ExtractError> {
        let i = resolve_index(index, self.current.len())?;
        Ok(self.current[i].clone())
    }
}

/// Page loader keyed by file name.
#[derive(Default)]
pub struct FakePages {
    pages: HashMap<String, Vec<(u32, Vec<String>)>>,
}

impl FakePages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text blocks seen at every sensitivity.
    pub fn page(self, file_name: &str, blocks: &[&str]) -> Self {
        self.layered(file_name, &[(u32::MAX, blocks)])
    }

    /// Layers sorted by ascending sensitivity ceiling.
    pub fn layered(mut self, file_name: &str, layers: &[(u32, &[&str])]) -> Self {
        let mut layers: Vec<(u32, Vec<String>)> = layers
            .iter()
            .map(|(threshold, texts)| (*threshold, texts.iter().map(|t| t.to_string()).collect()))
            .collect();
        layers.sort_by_key(|(threshold, _)| *threshold);
        self.pages.insert(file_name.to_string(), layers);
        self
    }
}

impl PageLoader for FakePages {
    fn load<'a>(&'a self, path: &Path) -> Result<Box<dyn RegionSource + 'a>, ExtractError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match self.pages.get(&name) {
            Some(layers) => Ok(Box::new(ScriptedPage {
                layers: layers.clone(),
                current: Vec::new(),
            })),
            None => Err(ExtractError::ImageDecode {
                path: path.to_path_buf(),
                message: "no scripted page".to_string(),
            }),
        }
    }
}

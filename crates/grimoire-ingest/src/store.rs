//! Fragment store: the flat serialized fragment list that bridges the
//! ingest binary and the serving binaries. Must round-trip losslessly.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use grimoire_core::types::{Fragment, FragmentId};

#[derive(Default)]
pub struct FragmentStore {
    fragments: Vec<Fragment>,
    by_id: HashMap<FragmentId, usize>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fragment, assigning its ordinal. A duplicate id replaces
    /// the earlier fragment in place, keeping its ordinal.
    pub fn push(&mut self, mut fragment: Fragment) {
        if let Some(&i) = self.by_id.get(&fragment.id) {
            tracing::warn!(id = %fragment.id, "duplicate fragment id; replacing earlier fragment");
            fragment.ordinal = self.fragments[i].ordinal;
            self.fragments[i] = fragment;
            return;
        }
        fragment.ordinal = self.fragments.len();
        self.by_id.insert(fragment.id.clone(), self.fragments.len());
        self.fragments.push(fragment);
    }

    pub fn extend<I: IntoIterator<Item = Fragment>>(&mut self, fragments: I) {
        for fragment in fragments {
            self.push(fragment);
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn get(&self, id: &str) -> Option<&Fragment> {
        self.by_id.get(id).map(|&i| &self.fragments[i])
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.fragments)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("cannot open fragment store at {}", path.display()))?;
        let fragments: Vec<Fragment> = serde_json::from_reader(BufReader::new(file))?;
        let mut store = Self::new();
        store.extend(fragments);
        Ok(store)
    }
}

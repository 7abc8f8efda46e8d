use super::StorageBackend;
use crate::error::{QuireError, Result};
use crate::model::{ResourceRecord, TreeNodeRecord};
use std::cell::RefCell;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since quire is single-threaded,
/// letting the `StorageBackend` trait take `&self` everywhere.
#[derive(Default)]
pub struct MemBackend {
    nodes: RefCell<Vec<TreeNodeRecord>>,
    resources: RefCell<Vec<ResourceRecord>>,
    simulate_write_error: RefCell<bool>,
    simulate_unauthorized: RefCell<bool>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Make every call fail as an expired session would.
    pub fn set_simulate_unauthorized(&self, simulate: bool) {
        *self.simulate_unauthorized.borrow_mut() = simulate;
    }

    fn check_auth(&self) -> Result<()> {
        if *self.simulate_unauthorized.borrow() {
            return Err(QuireError::Unauthorized);
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        self.check_auth()?;
        if *self.simulate_write_error.borrow() {
            return Err(QuireError::Store("Simulated write error".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn load_nodes(&self) -> Result<Vec<TreeNodeRecord>> {
        self.check_auth()?;
        Ok(self.nodes.borrow().clone())
    }

    fn save_nodes(&self, nodes: &[TreeNodeRecord]) -> Result<()> {
        self.check_write()?;
        *self.nodes.borrow_mut() = nodes.to_vec();
        Ok(())
    }

    fn load_resources(&self) -> Result<Vec<ResourceRecord>> {
        self.check_auth()?;
        Ok(self.resources.borrow().clone())
    }

    fn save_resources(&self, resources: &[ResourceRecord]) -> Result<()> {
        self.check_write()?;
        *self.resources.borrow_mut() = resources.to_vec();
        Ok(())
    }

    fn location(&self) -> String {
        "memory://quire".to_string()
    }
}

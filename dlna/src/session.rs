use crate::error::{DlnaError, Result};
use crate::transport::device::{DescriptionFetcher, Device};
use crate::transport::discovery::{CancelToken, Discovery};

/// Devices found so far and the one commands are aimed at
#[derive(Debug, Clone, Default)]
pub struct Session {
    devices: Vec<Device>,
    selected: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Search again, keeping earlier finds. Returns how many devices were new.
    pub fn discover<F, C>(&mut self, discovery: &Discovery<F>, cancel: &CancelToken, on_found: C) -> Result<usize>
    where
        F: DescriptionFetcher,
        C: FnMut(usize, &Device),
    {
        discovery.discover_into(&mut self.devices, cancel, on_found)
    }

    /// Make the device at `index` the command target
    pub fn select(&mut self, index: usize) -> Result<&Device> {
        if index >= self.devices.len() {
            return Err(DlnaError::NotFound(format!(
                "device index {} (found {})",
                index,
                self.devices.len()
            )));
        }
        self.selected = index;
        Ok(&self.devices[index])
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Device> {
        self.devices.get(self.selected)
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.selected = 0;
    }
}

// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Device-class registry handing out numbered device nodes

use std::collections::BTreeMap;
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{DriverError, DriverResult};
use crate::sensors::CharDevice;

/// Maps device paths such as `/dev/baro0` to readable devices
pub struct DeviceRegistry {
    nodes: Mutex<BTreeMap<String, Arc<dyn CharDevice>>>,
    max_class_instances: u32,
}

impl DeviceRegistry {
    pub fn new(max_class_instances: u32) -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            max_class_instances,
        }
    }

    /// Register `device` at a fixed `path`.
    pub fn register(&self, path: &str, device: Arc<dyn CharDevice>) -> DriverResult<()> {
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(path) {
            return Err(DriverError::AllocationFailure(format!(
                "device node {} already exists",
                path
            )));
        }
        nodes.insert(path.to_string(), device);
        debug!("Registered device {}", path);
        Ok(())
    }

    pub fn unregister(&self, path: &str) {
        if self.nodes.lock().remove(path).is_some() {
            debug!("Unregistered device {}", path);
        } else {
            warn!("Device {} was not registered", path);
        }
    }

    /// Register `device` under the lowest free `{base_path}{n}` and return `n`.
    pub fn register_class(&self, base_path: &str, device: Arc<dyn CharDevice>) -> DriverResult<u32> {
        let mut nodes = self.nodes.lock();
        for index in 0..self.max_class_instances {
            let path = format!("{}{}", base_path, index);
            if nodes.contains_key(&path) {
                continue;
            }
            nodes.insert(path.clone(), device);
            debug!("Registered class device {}", path);
            return Ok(index);
        }

        Err(DriverError::AllocationFailure(format!(
            "no free instance of device class {}",
            base_path
        )))
    }

    pub fn unregister_class(&self, base_path: &str, index: u32) {
        let path = format!("{}{}", base_path, index);
        if self.nodes.lock().remove(&path).is_some() {
            debug!("Unregistered class device {}", path);
        } else {
            warn!("Class device {} was not registered", path);
        }
    }

    pub fn open(&self, path: &str) -> Option<Arc<dyn CharDevice>> {
        self.nodes.lock().get(path).cloned()
    }

    /// Number of registered instances of a device class
    pub fn class_instances(&self, base_path: &str) -> usize {
        let nodes = self.nodes.lock();
        (0..self.max_class_instances)
            .filter(|i| nodes.contains_key(&format!("{}{}", base_path, i)))
            .count()
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDevice;

    impl CharDevice for NullDevice {
        fn read(&self, _buf: &mut [u8]) -> DriverResult<usize> {
            Ok(0)
        }

        fn sample_size(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_class_indices_are_reused() {
        let registry = DeviceRegistry::new(4);
        assert_eq!(registry.register_class("/dev/baro", Arc::new(NullDevice)).unwrap(), 0);
        assert_eq!(registry.register_class("/dev/baro", Arc::new(NullDevice)).unwrap(), 1);
        assert_eq!(registry.class_instances("/dev/baro"), 2);

        registry.unregister_class("/dev/baro", 0);
        assert!(registry.open("/dev/baro0").is_none());
        assert!(registry.open("/dev/baro1").is_some());
        assert_eq!(registry.register_class("/dev/baro", Arc::new(NullDevice)).unwrap(), 0);
    }

    #[test]
    fn test_fixed_node_is_exclusive() {
        let registry = DeviceRegistry::new(4);
        registry.register("/dev/fakebaro", Arc::new(NullDevice)).unwrap();
        assert!(matches!(
            registry.register("/dev/fakebaro", Arc::new(NullDevice)),
            Err(DriverError::AllocationFailure(_))
        ));
        assert_eq!(registry.register_class("/dev/baro", Arc::new(NullDevice)).unwrap(), 0);
        assert_eq!(
            registry.nodes(),
            vec!["/dev/baro0".to_string(), "/dev/fakebaro".to_string()]
        );

        registry.unregister("/dev/fakebaro");
        assert!(registry.open("/dev/fakebaro").is_none());
    }

    #[test]
    fn test_class_limit() {
        let registry = DeviceRegistry::new(1);
        registry.register_class("/dev/mag", Arc::new(NullDevice)).unwrap();
        assert!(matches!(
            registry.register_class("/dev/mag", Arc::new(NullDevice)),
            Err(DriverError::AllocationFailure(_))
        ));
        assert_eq!(registry.nodes(), vec!["/dev/mag0".to_string()]);
    }
}

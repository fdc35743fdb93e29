//! SDK classification
//!
//! Groups devices by the API level they report so each level can be built
//! once against the matching platform library.

use std::collections::btree_map;
use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::adb::AdbClient;

/// API level -> serials of the devices reporting it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkGroups {
    groups: BTreeMap<String, Vec<String>>,
}

impl SdkGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device to the group for `level`. A serial is kept once per group.
    pub fn insert(&mut self, level: impl Into<String>, serial: impl Into<String>) {
        let serial = serial.into();
        let devices = self.groups.entry(level.into()).or_default();
        if !devices.contains(&serial) {
            devices.push(serial);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct API levels
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Number of classified devices across all groups
    pub fn device_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn devices(&self, level: &str) -> Option<&[String]> {
        self.groups.get(level).map(Vec::as_slice)
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> {
        self.groups.iter()
    }
}

impl<'a> IntoIterator for &'a SdkGroups {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Query every device's API level and group the answers.
///
/// Queries run concurrently. A device whose query fails is logged and left
/// out; an empty result is valid.
pub async fn classify(adb: &AdbClient, serials: &[String]) -> SdkGroups {
    let answers = join_all(serials.iter().map(|serial| async move {
        (serial, adb.get_sdk_version(serial).await)
    }))
    .await;

    let mut groups = SdkGroups::new();
    for (serial, answer) in answers {
        match answer {
            Ok(level) => {
                debug!("{} reports SDK {}", serial, level);
                groups.insert(level, serial.clone());
            }
            Err(e) => warn!("Skipping {}: could not read SDK version: {}", serial, e),
        }
    }
    groups
}

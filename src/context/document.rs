/*!
 * Context Document
 * Stylesheets and the mount point owned by the isolated context
 */

use parking_lot::Mutex;
use std::sync::Arc;

/// A `<style>` element in the context's head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleElement {
    /// Marker attribute; unmarked styles belong to the host configuration
    pub marker: Option<String>,
    pub text: String,
}

/// The element a mounted instance renders into
///
/// Cloning yields another handle to the same element.
#[derive(Debug, Clone)]
pub struct MountPoint {
    id: Arc<str>,
    nodes: Arc<Mutex<Vec<String>>>,
}

impl MountPoint {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            nodes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn append(&self, node: impl Into<String>) {
        self.nodes.lock().push(node.into());
    }

    /// Remove every child node
    pub fn clear(&self) {
        self.nodes.lock().clear();
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.lock().clone()
    }

    /// Concatenated content, the equivalent of `innerHTML`
    pub fn inner_html(&self) -> String {
        self.nodes.lock().concat()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }

    pub fn same_element(&self, other: &MountPoint) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
    }
}

/// Document state of one isolated context
#[derive(Debug)]
pub struct Document {
    mount_id: String,
    head: Vec<StyleElement>,
    mount_point: Option<MountPoint>,
}

impl Document {
    pub fn new(mount_id: &str) -> Self {
        Self {
            mount_id: mount_id.to_string(),
            head: Vec::new(),
            mount_point: Some(MountPoint::new(mount_id)),
        }
    }

    pub fn add_stylesheet(&mut self, text: impl Into<String>, marker: Option<&str>) {
        self.head.push(StyleElement {
            marker: marker.map(str::to_string),
            text: text.into(),
        });
    }

    /// Remove exactly the styles carrying `marker`, returning how many went
    pub fn remove_marked(&mut self, marker: &str) -> usize {
        let before = self.head.len();
        self.head
            .retain(|style| style.marker.as_deref() != Some(marker));
        before - self.head.len()
    }

    pub fn styles(&self) -> &[StyleElement] {
        &self.head
    }

    pub fn marked_count(&self, marker: &str) -> usize {
        self.head
            .iter()
            .filter(|style| style.marker.as_deref() == Some(marker))
            .count()
    }

    pub fn mount_point(&self) -> Option<&MountPoint> {
        self.mount_point.as_ref()
    }

    /// Empty the mount point, recreating it if it was removed
    pub fn reset_mount_point(&mut self) -> MountPoint {
        match &self.mount_point {
            Some(mount_point) => {
                mount_point.clear();
                mount_point.clone()
            }
            None => {
                let mount_point = MountPoint::new(&self.mount_id);
                self.mount_point = Some(mount_point.clone());
                mount_point
            }
        }
    }

    /// Detach the mount point from the document
    pub fn remove_mount_point(&mut self) -> Option<MountPoint> {
        self.mount_point.take()
    }
}

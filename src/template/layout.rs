//! Finding the destination layout for a cloned slide.
//!
//! Layouts are matched by name. The presentation's direct layout collection
//! (its first master's layouts) is searched first; a layout that lives under
//! another master is then looked up under the destination master with the
//! same name as the source slide's master.

use crate::ooxml::pptx::{LayoutRef, MasterRef, Package};
use crate::template::error::{Result, TemplateError};
use std::collections::HashMap;
use tracing::debug;

/// Name-to-layout table. The first layout with a given name wins.
#[derive(Debug, Default)]
struct LayoutTable {
    by_name: HashMap<String, LayoutRef>,
}

impl LayoutTable {
    fn new(layouts: Vec<LayoutRef>) -> Self {
        let mut by_name = HashMap::with_capacity(layouts.len());
        for layout in layouts {
            by_name.entry(layout.name.clone()).or_insert(layout);
        }
        Self { by_name }
    }

    fn get(&self, name: &str) -> Option<&LayoutRef> {
        self.by_name.get(name)
    }
}

/// Resolve the layout in `dest` matching `layout`, a source slide's layout
/// under source master `master`.
pub fn resolve_layout(dest: &Package, layout: &LayoutRef, master: &MasterRef) -> Result<LayoutRef> {
    let direct = LayoutTable::new(dest.slide_layouts()?);
    if let Some(found) = direct.get(&layout.name) {
        return Ok(found.clone());
    }

    let masters: Vec<MasterRef> = dest.slide_masters()?;
    if let Some(dest_master) = masters.iter().find(|m| m.name == master.name) {
        let scoped = LayoutTable::new(dest.layouts_of(&dest_master.partname)?);
        if let Some(found) = scoped.get(&layout.name) {
            debug!(
                layout = %layout.name,
                master = %dest_master.name,
                "layout resolved through master"
            );
            return Ok(found.clone());
        }
    }

    Err(TemplateError::LayoutNotFound {
        layout: layout.name.clone(),
        master: master.name.clone(),
    })
}

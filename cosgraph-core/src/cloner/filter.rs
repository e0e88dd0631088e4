//! Shape-matched clone strategies
//!
//! A filter is selected by looking at the source dictionary's entries, never
//! at a declared type, so malformed or boundary-case dictionaries are still
//! handled.

use super::Cloner;
use crate::error::Result;
use crate::objects::{Dictionary, Name, Node, NodeKind, PdfString, TypeKey};
use std::fmt;
use tracing::{debug, warn};

/// Attributes a page inherits from its ancestors in the page tree.
const INHERITED_PAGE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Bound on parent-chain and name-tree walks.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Clone, Copy)]
pub struct Filter {
    pub name: &'static str,
    /// Whether this filter handles the source dictionary.
    pub matches: fn(&Dictionary) -> bool,
    /// Called per entry before it is copied; `false` skips the entry.
    pub before_clone: fn(&Name, &Node) -> bool,
    /// Called with the source and its finished copy.
    pub after_clone: fn(&mut Cloner, &Dictionary, &Dictionary) -> Result<()>,
}

impl Filter {
    /// Field, named destination, annotation, page.
    pub fn defaults() -> Vec<Filter> {
        vec![
            Self::field(),
            Self::named_destination(),
            Self::annotation(),
            Self::page(),
        ]
    }

    /// Copies every entry and does nothing afterwards.
    pub fn passthrough() -> Filter {
        Filter {
            name: "passthrough",
            matches: |_| true,
            before_clone: |_, _| true,
            after_clone: |_, _, _| Ok(()),
        }
    }

    pub fn page() -> Filter {
        Filter {
            name: "page",
            matches: is_page,
            before_clone: |key, _| key != "Parent",
            after_clone: inherit_page_attributes,
        }
    }

    pub fn annotation() -> Filter {
        Filter {
            name: "annotation",
            matches: is_annotation,
            before_clone: |key, _| key != "P",
            after_clone: |_, _, _| Ok(()),
        }
    }

    pub fn field() -> Filter {
        Filter {
            name: "field",
            matches: is_field,
            before_clone: |key, _| key != "P" && key != "Parent",
            after_clone: register_field,
        }
    }

    pub fn named_destination() -> Filter {
        Filter {
            name: "named destination",
            matches: |dict| destination_name(dict).is_some(),
            before_clone: |key, _| key != "P",
            after_clone: transfer_named_destination,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

fn is_page(dict: &Dictionary) -> bool {
    if dict.contains_key("Type") {
        return dict.is_name("Type", "Page");
    }
    !dict.contains_key("Kids")
        && dict.contains_key("Parent")
        && ["MediaBox", "Contents", "Resources"]
            .iter()
            .any(|key| dict.contains_key(key))
}

fn is_annotation(dict: &Dictionary) -> bool {
    dict.get_name("Subtype").is_some()
        && dict
            .get("Rect")
            .is_some_and(|rect| rect.kind() == NodeKind::Array)
}

fn is_field(dict: &Dictionary) -> bool {
    (is_annotation(dict) && dict.contains_key("FT"))
        || (dict.is_name("Subtype", "Widget") && dict.contains_key("T"))
}

/// Destination given by name: `/Dest`, or `/D` of a GoTo action.
fn destination_name(dict: &Dictionary) -> Option<PdfString> {
    let target = match dict.get("Dest") {
        Some(dest) => dest,
        None if dict.is_name("S", "GoTo") => dict.get("D")?,
        None => return None,
    };
    match target.kind() {
        NodeKind::String => target.as_string(),
        NodeKind::Name => target
            .as_name()
            .map(|name| PdfString::new(name.as_str().as_bytes().to_vec())),
        _ => None,
    }
}

/// Copies inherited attributes that the source page only has through its
/// ancestors.
fn inherit_page_attributes(cloner: &mut Cloner, source: &Dictionary, copy: &Dictionary) -> Result<()> {
    for key in INHERITED_PAGE_KEYS {
        if source.contains_key(key) || copy.contains_key(key) {
            continue;
        }
        let mut ancestor = source.get_dictionary("Parent");
        let mut depth = 0;
        while let Some(node) = ancestor {
            if depth >= MAX_TREE_DEPTH {
                warn!("Page tree deeper than {} levels, stopped looking for /{}", MAX_TREE_DEPTH, key);
                break;
            }
            if let Some(value) = node.get_raw(key).filter(|value| !value.is_virtual()) {
                debug!("Materializing inherited /{} on cloned page", key);
                let value = cloner.copy(&value)?;
                copy.set(key, value);
                break;
            }
            ancestor = node.get_dictionary("Parent");
            depth += 1;
        }
    }
    Ok(())
}

/// Adds an indirect field copy to the target's `/AcroForm /Fields`.
fn register_field(cloner: &mut Cloner, _source: &Dictionary, _copy: &Dictionary) -> Result<()> {
    let Some(reference) = cloner.current_reference().cloned() else {
        return Ok(());
    };
    let Some(catalog) = cloner.target().catalog() else {
        warn!("Target document has no catalog, field {} not registered", reference);
        return Ok(());
    };

    let fields = catalog
        .get_or_create_dictionary("AcroForm")
        .get_or_create_array("Fields");
    let entry = Node::reference(reference.clone());
    if fields.index_of(&entry).is_none() {
        fields.push(entry);
        debug!("Registered field {} in /AcroForm", reference);
    }
    Ok(())
}

/// Resolves the destination name in the source document, copies the
/// destination and registers it under the same name in the target catalog.
fn transfer_named_destination(
    cloner: &mut Cloner,
    source: &Dictionary,
    _copy: &Dictionary,
) -> Result<()> {
    let Some(name) = destination_name(source) else {
        return Ok(());
    };
    let Some(source_doc) = source.node().document() else {
        return Ok(());
    };
    if source_doc.id() == cloner.target().id() {
        return Ok(());
    }
    let Some(target_catalog) = cloner.target().catalog() else {
        return Ok(());
    };
    let key = name.to_string_lossy();
    let dests = target_catalog.get_or_create_dictionary("Dests");
    if dests.contains_key(&key) {
        return Ok(());
    }

    let Some(destination) = source_doc.catalog().and_then(|catalog| lookup_destination(&catalog, &name))
    else {
        warn!("Named destination ({}) not found in source document", key);
        return Ok(());
    };
    let copy = cloner.copy(&destination)?;
    dests.set(key.as_str(), copy);
    debug!("Transferred named destination ({})", key);
    Ok(())
}

fn lookup_destination(catalog: &Dictionary, name: &PdfString) -> Option<Node> {
    let key = name.to_string_lossy();
    if let Some(found) = catalog
        .get_dictionary("Dests")
        .and_then(|dests| dests.get_raw(&key))
    {
        return Some(found);
    }
    let tree = catalog.get_dictionary("Names")?.get_dictionary("Dests")?;
    lookup_name_tree(&tree, name.as_bytes(), 0)
}

/// Looks `key` up in a name tree (`/Names` leaves, `/Kids` with `/Limits`).
fn lookup_name_tree(node: &Dictionary, key: &[u8], depth: usize) -> Option<Node> {
    if depth >= MAX_TREE_DEPTH {
        warn!("Name tree deeper than {} levels", MAX_TREE_DEPTH);
        return None;
    }
    if let Some(names) = node.get_array("Names") {
        let items = names.items();
        for pair in items.chunks(2) {
            let [name, value] = pair else { continue };
            let matched = name
                .resolve()
                .ok()
                .flatten()
                .and_then(|name| name.as_string())
                .is_some_and(|name| name.as_bytes() == key);
            if matched {
                return Some(value.clone());
            }
        }
    }
    let kids = node.get_array("Kids")?;
    for index in 0..kids.len() {
        let Some(kid) = kids.get_typed(index, TypeKey::Dictionary).and_then(|kid| kid.as_dictionary())
        else {
            continue;
        };
        if !within_limits(&kid, key) {
            continue;
        }
        if let Some(found) = lookup_name_tree(&kid, key, depth + 1) {
            return Some(found);
        }
    }
    None
}

fn within_limits(node: &Dictionary, key: &[u8]) -> bool {
    let Some(limits) = node.get_array("Limits") else {
        return true;
    };
    let bound = |index| {
        limits
            .get(index)
            .and_then(|node| node.as_string())
            .map(|s| s.as_bytes().to_vec())
    };
    match (bound(0), bound(1)) {
        (Some(low), Some(high)) => low.as_slice() <= key && key <= high.as_slice(),
        _ => true,
    }
}

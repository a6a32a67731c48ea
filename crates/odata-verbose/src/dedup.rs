//! Collapsing of repeated property names inside buffered objects.
//!
//! For every object in a buffered subtree, each name that occurs more than
//! once keeps the position of its first occurrence and takes the value of its
//! last occurrence. All other occurrences are removed. Nested objects are
//! processed before the object containing them.
use alloc::{collections::BTreeMap, string::String, vec::Vec};

use tracing::debug;

use crate::{
    buffering::{NodeId, NodeList},
    error::ReaderError,
    json_value::JsonNodeType,
};

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    name: NodeId,
    last: NodeId,
}

#[derive(Debug, Default)]
struct ObjectRecord {
    properties: BTreeMap<String, Vec<Occurrence>>,
    open: Option<(String, NodeId)>,
}

impl ObjectRecord {
    /// Closes the open property, whose value ends at `last`.
    fn close(&mut self, last: Option<NodeId>) {
        if let (Some((name, node)), Some(last)) = (self.open.take(), last) {
            self.properties
                .entry(name)
                .or_default()
                .push(Occurrence { name: node, last });
        }
    }

    fn splice(self, nodes: &mut NodeList) -> usize {
        let mut removed = 0;
        for occurrences in self.properties.into_values() {
            let [first, middle @ .., last] = occurrences.as_slice() else {
                continue;
            };
            for o in middle {
                nodes.unlink_range(o.name, o.last);
                nodes.free_range(o.name, o.last);
            }
            let (Some(kept_first), Some(old_first)) = (nodes.next(last.name), nodes.next(first.name)) else {
                continue;
            };
            nodes.unlink_range(last.name, last.name);
            nodes.free_range(last.name, last.name);
            nodes.unlink_range(kept_first, last.last);

            nodes.unlink_range(old_first, first.last);
            nodes.free_range(old_first, first.last);
            nodes.insert_range_after(first.name, kept_first, last.last);
            removed += middle.len() + 1;
        }
        removed
    }
}

/// De-duplicates every object in the subtree starting at the start-object
/// node `start`. `on_object` sees each object before its members are touched.
pub(crate) fn deduplicate<F>(nodes: &mut NodeList, start: NodeId, mut on_object: F) -> Result<(), ReaderError>
where
    F: FnMut(&NodeList, NodeId) -> Result<(), ReaderError>,
{
    let mut records: Vec<ObjectRecord> = Vec::new();
    let mut removed = 0;
    let mut at = Some(start);
    while let Some(id) = at {
        match nodes.node(id).node_type() {
            JsonNodeType::StartObject => {
                on_object(nodes, id)?;
                records.push(ObjectRecord::default());
            }
            JsonNodeType::Property => {
                let last = nodes.prev(id);
                if let Some(record) = records.last_mut() {
                    record.close(last);
                    let name = nodes.node(id).property_name().map(String::from).unwrap_or_default();
                    record.open = Some((name, id));
                }
            }
            JsonNodeType::EndObject => {
                let last = nodes.prev(id);
                if let Some(mut record) = records.pop() {
                    record.close(last);
                    removed += record.splice(nodes);
                }
                if records.is_empty() {
                    break;
                }
            }
            _ => {}
        }
        at = nodes.next(id);
    }
    if removed > 0 {
        debug!(removed, "collapsed repeated properties");
    }
    Ok(())
}

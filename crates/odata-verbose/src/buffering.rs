//! A tokenizer front end with look-ahead.
//!
//! Nodes pulled from the [`Tokenizer`] are kept in a [`NodeList`], a doubly
//! linked list over an arena of slots, until they have been consumed. While a
//! look-ahead window is open ([`BufferingJsonReader::buffered`]) consumed
//! nodes are retained so that the window can rewind to where it started, and a
//! bookmark can be set and returned to inside the window.
//!
//! When object processing is enabled, every start-object node pulled from the
//! tokenizer makes the reader pull the whole object subtree at once. The
//! subtree is then checked for in-stream error objects and, in server
//! compatibility mode, de-duplicated before the first node is handed out.
use alloc::{string::String, vec::Vec};

use tracing::{debug, trace};

use crate::{
    dedup,
    error::{ErrorKind, ODataError, ReaderError},
    json_value::{JsonNode, JsonNodeType, JsonPrimitive, JsonValue},
    tokenizer::{Position, Tokenizer},
};

pub(crate) type NodeId = usize;

#[derive(Debug, Clone)]
pub(crate) struct BufferedNode {
    pub(crate) node: JsonNode,
    pub(crate) position: Position,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Doubly linked list of buffered nodes.
///
/// Ranges can be detached and re-attached in O(1) without touching the nodes
/// in between; freed slots are recycled.
#[derive(Debug, Default)]
pub(crate) struct NodeList {
    slots: Vec<BufferedNode>,
    free: Vec<NodeId>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl NodeList {
    pub(crate) fn push_back(&mut self, node: JsonNode, position: Position) -> NodeId {
        let slot = BufferedNode {
            node,
            position,
            prev: self.tail,
            next: None,
        };
        let id = if let Some(id) = self.free.pop() {
            self.slots[id] = slot;
            id
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        };
        match self.tail {
            Some(tail) => self.slots[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &BufferedNode {
        &self.slots[id]
    }

    pub(crate) fn node(&self, id: NodeId) -> &JsonNode {
        &self.slots[id].node
    }

    pub(crate) fn next(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id].next
    }

    pub(crate) fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id].prev
    }

    #[cfg(test)]
    pub(crate) fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// Detaches `first..=last` from the list. Links inside the range stay
    /// intact so the range can be re-attached elsewhere.
    pub(crate) fn unlink_range(&mut self, first: NodeId, last: NodeId) {
        let before = self.slots[first].prev;
        let after = self.slots[last].next;
        match before {
            Some(b) => self.slots[b].next = after,
            None => self.head = after,
        }
        match after {
            Some(a) => self.slots[a].prev = before,
            None => self.tail = before,
        }
        self.slots[first].prev = None;
        self.slots[last].next = None;
    }

    /// Attaches the detached range `first..=last` right after `anchor`.
    pub(crate) fn insert_range_after(&mut self, anchor: NodeId, first: NodeId, last: NodeId) {
        let after = self.slots[anchor].next;
        self.slots[anchor].next = Some(first);
        self.slots[first].prev = Some(anchor);
        self.slots[last].next = after;
        match after {
            Some(a) => self.slots[a].prev = Some(last),
            None => self.tail = Some(last),
        }
    }

    /// Recycles the slots of a detached range.
    pub(crate) fn free_range(&mut self, first: NodeId, last: NodeId) {
        let mut at = Some(first);
        while let Some(id) = at {
            at = if id == last { None } else { self.slots[id].next };
            let slot = &mut self.slots[id];
            slot.node = JsonNode::None;
            slot.prev = None;
            slot.next = None;
            self.free.push(id);
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) {
        self.unlink_range(id, id);
        self.free_range(id, id);
    }

    /// The last node of the value starting at `id`: its matching end node
    /// for objects and arrays, `id` itself for primitives.
    pub(crate) fn end_of_value(&self, id: NodeId) -> Option<NodeId> {
        let mut depth = 0usize;
        let mut at = id;
        loop {
            match self.node(at).node_type() {
                JsonNodeType::StartObject | JsonNodeType::StartArray => depth += 1,
                JsonNodeType::EndObject | JsonNodeType::EndArray => depth = depth.checked_sub(1)?,
                _ => {}
            }
            if depth == 0 {
                return Some(at);
            }
            at = self.next(at)?;
        }
    }

    pub(crate) fn iter_from(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(Some(id), move |&at| self.next(at))
    }
}

/// What to do with an object when its start node is first pulled from the
/// tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ObjectProcessing {
    pub(crate) detect_in_stream_errors: bool,
    pub(crate) deduplicate_properties: bool,
}

impl ObjectProcessing {
    fn is_enabled(self) -> bool {
        self.detect_in_stream_errors || self.deduplicate_properties
    }
}

#[derive(Debug)]
pub(crate) struct BufferingJsonReader<'src> {
    tokenizer: Tokenizer<'src>,
    nodes: NodeList,
    current: NodeId,
    /// Start of the open look-ahead window.
    buffering_start: Option<NodeId>,
    bookmark: Option<NodeId>,
    processing: ObjectProcessing,
}

impl<'src> BufferingJsonReader<'src> {
    pub(crate) fn new(input: &'src [u8], processing: ObjectProcessing) -> Self {
        let mut nodes = NodeList::default();
        let current = nodes.push_back(JsonNode::None, Position::default());
        Self {
            tokenizer: Tokenizer::new(input),
            nodes,
            current,
            buffering_start: None,
            bookmark: None,
            processing,
        }
    }

    pub(crate) fn node(&self) -> &JsonNode {
        self.nodes.node(self.current)
    }

    pub(crate) fn node_type(&self) -> JsonNodeType {
        self.node().node_type()
    }

    pub(crate) fn position(&self) -> Position {
        self.nodes.get(self.current).position
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> ReaderError {
        let Position { line, column } = self.position();
        ReaderError::new(kind, line, column)
    }

    pub(crate) fn is_buffering(&self) -> bool {
        self.buffering_start.is_some()
    }

    /// Moves to the next node.
    pub(crate) fn read(&mut self) -> Result<(), ReaderError> {
        let next = match self.nodes.next(self.current) {
            Some(next) => next,
            None => self.fetch()?,
        };
        if self.buffering_start.is_none() {
            self.nodes.remove(self.current);
        }
        self.current = next;
        Ok(())
    }

    /// Runs `f` inside a look-ahead window and rewinds to the current node
    /// afterwards, whether `f` succeeded or not.
    ///
    /// Windows nest: an inner window restores the position it started at and
    /// leaves the outer window open.
    pub(crate) fn buffered<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ReaderError>,
    ) -> Result<T, ReaderError> {
        let outermost = self.buffering_start.is_none();
        let saved = self.current;
        let saved_bookmark = self.bookmark;
        if outermost {
            trace!(at = ?self.position(), "start buffering");
            self.buffering_start = Some(self.current);
        }
        let result = f(self);
        self.current = saved;
        self.bookmark = saved_bookmark;
        if outermost {
            trace!(at = ?self.position(), "stop buffering");
            self.buffering_start = None;
        }
        result
    }

    pub(crate) fn bookmark(&mut self) {
        debug_assert!(self.is_buffering(), "bookmarks only exist inside a buffering window");
        self.bookmark = Some(self.current);
    }

    pub(crate) fn move_to_bookmark(&mut self) {
        if let Some(bookmark) = self.bookmark {
            self.current = bookmark;
        }
    }

    fn fetch(&mut self) -> Result<NodeId, ReaderError> {
        let (node, position) = self.tokenizer.next_node()?;
        let is_object = node == JsonNode::StartObject;
        let id = self.nodes.push_back(node, position);
        if is_object && self.processing.is_enabled() {
            self.fetch_subtree()?;
            self.process_object(id)?;
        }
        Ok(id)
    }

    /// Pulls the rest of the object whose start node was just pulled.
    fn fetch_subtree(&mut self) -> Result<(), ReaderError> {
        let mut depth = 1usize;
        while depth > 0 {
            let (node, position) = self.tokenizer.next_node()?;
            match node.node_type() {
                JsonNodeType::StartObject | JsonNodeType::StartArray => depth += 1,
                JsonNodeType::EndObject | JsonNodeType::EndArray => depth -= 1,
                _ => {}
            }
            self.nodes.push_back(node, position);
        }
        Ok(())
    }

    fn process_object(&mut self, start: NodeId) -> Result<(), ReaderError> {
        let detect = self.processing.detect_in_stream_errors;
        let check = |nodes: &NodeList, id: NodeId| -> Result<(), ReaderError> {
            if !detect {
                return Ok(());
            }
            match read_in_stream_error(nodes, id) {
                Some(error) => {
                    debug!(%error, "in-stream error object");
                    let Position { line, column } = nodes.get(id).position;
                    Err(ReaderError::new(ErrorKind::InStreamError(error), line, column))
                }
                None => Ok(()),
            }
        };

        if self.processing.deduplicate_properties {
            return dedup::deduplicate(&mut self.nodes, start, check);
        }
        let Some(end) = self.nodes.end_of_value(start) else {
            return Ok(());
        };
        for id in self.nodes.iter_from(start) {
            if self.nodes.node(id).node_type() == JsonNodeType::StartObject {
                check(&self.nodes, id)?;
            }
            if id == end {
                break;
            }
        }
        Ok(())
    }

    // ── node-level helpers ─────────────────────────────────────────────

    pub(crate) fn expect(&self, node_type: JsonNodeType, expected: &'static str) -> Result<(), ReaderError> {
        let found = self.node_type();
        if found == node_type {
            Ok(())
        } else {
            Err(self.error(ErrorKind::UnexpectedNode { expected, found }))
        }
    }

    pub(crate) fn read_start_object(&mut self) -> Result<(), ReaderError> {
        self.expect(JsonNodeType::StartObject, "start of an object")?;
        self.read()
    }

    pub(crate) fn read_end_object(&mut self) -> Result<(), ReaderError> {
        self.expect(JsonNodeType::EndObject, "end of an object")?;
        self.read()
    }

    pub(crate) fn read_start_array(&mut self) -> Result<(), ReaderError> {
        self.expect(JsonNodeType::StartArray, "start of an array")?;
        self.read()
    }

    pub(crate) fn read_end_array(&mut self) -> Result<(), ReaderError> {
        self.expect(JsonNodeType::EndArray, "end of an array")?;
        self.read()
    }

    pub(crate) fn property_name(&self) -> Option<&str> {
        self.node().property_name()
    }

    pub(crate) fn read_property_name(&mut self) -> Result<String, ReaderError> {
        self.expect(JsonNodeType::Property, "a property")?;
        let name = self.property_name().map(String::from).unwrap_or_default();
        self.read()?;
        Ok(name)
    }

    pub(crate) fn read_primitive(&mut self) -> Result<JsonPrimitive, ReaderError> {
        let JsonNode::Primitive(value) = self.node() else {
            return Err(self.error(ErrorKind::UnexpectedNode {
                expected: "a primitive value",
                found: self.node_type(),
            }));
        };
        let value = value.clone();
        self.read()?;
        Ok(value)
    }

    /// Reads a string or `null`.
    pub(crate) fn read_string_value(&mut self) -> Result<Option<String>, ReaderError> {
        match self.node() {
            JsonNode::Primitive(JsonPrimitive::String(s)) => {
                let s = s.clone();
                self.read()?;
                Ok(Some(s))
            }
            JsonNode::Primitive(JsonPrimitive::Null) => {
                self.read()?;
                Ok(None)
            }
            _ => Err(self.error(ErrorKind::UnexpectedNode {
                expected: "a string value",
                found: self.node_type(),
            })),
        }
    }

    /// Skips the value at the current node, including nested containers.
    pub(crate) fn skip_value(&mut self) -> Result<(), ReaderError> {
        let mut depth = 0usize;
        loop {
            match self.node_type() {
                JsonNodeType::StartObject | JsonNodeType::StartArray => depth += 1,
                JsonNodeType::EndObject | JsonNodeType::EndArray => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        self.error(ErrorKind::UnexpectedNode {
                            expected: "a value",
                            found: self.node_type(),
                        })
                    })?;
                }
                JsonNodeType::Property | JsonNodeType::PrimitiveValue => {}
                found @ (JsonNodeType::None | JsonNodeType::EndOfInput) => {
                    return Err(self.error(ErrorKind::UnexpectedNode {
                        expected: "a value",
                        found,
                    }));
                }
            }
            self.read()?;
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Materializes the value at the current node. Containers nested deeper
    /// than `max_depth` fail with [`ErrorKind::NestingTooDeep`].
    pub(crate) fn read_json_value(&mut self, max_depth: usize) -> Result<JsonValue, ReaderError> {
        self.read_nested_json_value(1, max_depth)
    }

    fn read_nested_json_value(&mut self, depth: usize, max_depth: usize) -> Result<JsonValue, ReaderError> {
        let node_type = self.node_type();
        if matches!(node_type, JsonNodeType::StartArray | JsonNodeType::StartObject) && depth > max_depth {
            return Err(self.error(ErrorKind::NestingTooDeep(max_depth)));
        }
        match node_type {
            JsonNodeType::PrimitiveValue => Ok(self.read_primitive()?.into()),
            JsonNodeType::StartArray => {
                self.read()?;
                let mut items = Vec::new();
                while self.node_type() != JsonNodeType::EndArray {
                    items.push(self.read_nested_json_value(depth + 1, max_depth)?);
                }
                self.read()?;
                Ok(JsonValue::Array(items))
            }
            JsonNodeType::StartObject => {
                self.read()?;
                let mut members = Vec::new();
                while self.node_type() == JsonNodeType::Property {
                    let name = self.read_property_name()?;
                    members.push((name, self.read_nested_json_value(depth + 1, max_depth)?));
                }
                self.read_end_object()?;
                Ok(JsonValue::Object(members))
            }
            found => Err(self.error(ErrorKind::UnexpectedNode {
                expected: "a value",
                found,
            })),
        }
    }
}

/// Recognizes `{"error": {"code": ..., "message": ..., "innererror": ...}}`
/// starting at `start`. Anything else, including extra members, is not an
/// error object.
fn read_in_stream_error(nodes: &NodeList, start: NodeId) -> Option<ODataError> {
    let property = nodes.next(start)?;
    if nodes.node(property).property_name()? != "error" {
        return None;
    }
    let (error, end) = read_error_value(nodes, nodes.next(property)?)?;
    let after = nodes.next(end)?;
    (*nodes.node(after) == JsonNode::EndObject).then_some(error)
}

fn read_error_value(nodes: &NodeList, value: NodeId) -> Option<(ODataError, NodeId)> {
    if *nodes.node(value) != JsonNode::StartObject {
        return None;
    }
    let mut error = ODataError::default();
    let mut seen: Vec<&str> = Vec::new();
    let mut at = nodes.next(value)?;
    loop {
        let name = match nodes.node(at) {
            JsonNode::EndObject => return Some((error, at)),
            JsonNode::Property(name) => name.as_str(),
            _ => return None,
        };
        if seen.contains(&name) {
            return None;
        }
        seen.push(name);
        let value = nodes.next(at)?;
        let end = match name {
            "code" => {
                error.code = primitive_string(nodes, value)?;
                value
            }
            "message" => match nodes.node(value) {
                JsonNode::StartObject => read_error_message(nodes, value, &mut error)?,
                _ => {
                    error.message = primitive_string(nodes, value)?;
                    value
                }
            },
            "innererror" => nodes.end_of_value(value)?,
            _ => return None,
        };
        at = nodes.next(end)?;
    }
}

fn read_error_message(nodes: &NodeList, start: NodeId, error: &mut ODataError) -> Option<NodeId> {
    let mut at = nodes.next(start)?;
    loop {
        let name = match nodes.node(at) {
            JsonNode::EndObject => return Some(at),
            JsonNode::Property(name) => name.as_str(),
            _ => return None,
        };
        let value = nodes.next(at)?;
        match name {
            "lang" => error.lang = Some(primitive_string(nodes, value)?),
            "value" => error.message = primitive_string(nodes, value)?,
            _ => return None,
        }
        at = nodes.next(value)?;
    }
}

fn primitive_string(nodes: &NodeList, id: NodeId) -> Option<String> {
    match nodes.node(id) {
        JsonNode::Primitive(JsonPrimitive::String(s)) => Some(s.clone()),
        JsonNode::Primitive(JsonPrimitive::Null) => Some(String::new()),
        _ => None,
    }
}

//! YAML and JSON documents reduced to a tree whose leaves keep the scalar
//! text exactly as written in the file (`1.10`, `0x1F`, `.inf`).

use std::fmt;

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IgnoredAny, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Null,
    Scalar(String),
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
}

/// Parses YAML in two passes: the first learns the shape of every node, the
/// second re-reads the same text and pulls each scalar out as a string so
/// serde_yaml never gets to resolve it into a number. Tags are dropped.
pub fn parse_yaml(contents: &str) -> Result<Node, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(Node::Null);
    }
    let shape: Shape = serde_yaml::from_str(contents)?;
    Shaped(&shape).deserialize(serde_yaml::Deserializer::from_str(contents))
}

/// Numbers keep their source text through serde_json's `arbitrary_precision`.
pub fn parse_json(contents: &str) -> Result<Node, serde_json::Error> {
    if contents.trim().is_empty() {
        return Ok(Node::Null);
    }
    let value: serde_json::Value = serde_json::from_str(contents)?;
    Ok(json_node(value))
}

fn json_node(value: serde_json::Value) -> Node {
    use serde_json::Value;

    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Scalar(b.to_string()),
        Value::Number(n) => Node::Scalar(n.to_string()),
        Value::String(s) => Node::Scalar(s),
        Value::Array(items) => Node::Sequence(items.into_iter().map(json_node).collect()),
        Value::Object(map) => Node::Mapping(
            map.into_iter()
                .map(|(key, value)| (key, json_node(value)))
                .collect(),
        ),
    }
}

/// Node kinds without values, as resolved by serde_yaml.
enum Shape {
    Null,
    Scalar,
    Mapping(Vec<Shape>),
    Sequence(Vec<Shape>),
}

impl<'de> Deserialize<'de> for Shape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ShapeVisitor)
    }
}

struct ShapeVisitor;

impl<'de> Visitor<'de> for ShapeVisitor {
    type Value = Shape;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any yaml node")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Shape, E> {
        Ok(Shape::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Shape, E> {
        Ok(Shape::Null)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Shape, E> {
        Ok(Shape::Scalar)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Shape, A::Error> {
        let mut values = Vec::new();
        while map.next_key::<IgnoredAny>()?.is_some() {
            values.push(map.next_value()?);
        }
        Ok(Shape::Mapping(values))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Shape, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Shape::Sequence(items))
    }

    // Tagged nodes (`!secret xyz`) arrive as enums; keep the content only.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Shape, A::Error> {
        let (IgnoredAny, content) = data.variant::<IgnoredAny>()?;
        content.newtype_variant()
    }
}

struct Shaped<'a>(&'a Shape);

impl<'de> DeserializeSeed<'de> for Shaped<'_> {
    type Value = Node;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        match self.0 {
            Shape::Null => {
                IgnoredAny::deserialize(deserializer)?;
                Ok(Node::Null)
            }
            Shape::Scalar => String::deserialize(deserializer).map(Node::Scalar),
            Shape::Mapping(values) => deserializer.deserialize_map(MappingVisitor(values)),
            Shape::Sequence(items) => deserializer.deserialize_seq(SequenceVisitor(items)),
        }
    }
}

struct MappingVisitor<'a>(&'a [Shape]);

impl<'de> Visitor<'de> for MappingVisitor<'_> {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a mapping with {} entries", self.0.len())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut entries = Vec::with_capacity(self.0.len());
        for shape in self.0 {
            let key: String = map
                .next_key()?
                .ok_or_else(|| de::Error::invalid_length(entries.len(), &self))?;
            let value = map.next_value_seed(Shaped(shape))?;
            entries.push((key, value));
        }
        Ok(Node::Mapping(entries))
    }
}

struct SequenceVisitor<'a>(&'a [Shape]);

impl<'de> Visitor<'de> for SequenceVisitor<'_> {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a sequence with {} items", self.0.len())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(self.0.len());
        for shape in self.0 {
            let item = seq
                .next_element_seed(Shaped(shape))?
                .ok_or_else(|| de::Error::invalid_length(items.len(), &self))?;
            items.push(item);
        }
        Ok(Node::Sequence(items))
    }
}

/// Flattens a document into colon-delimited keys. An empty document yields
/// nothing; any root other than a mapping is rejected.
pub fn flatten_document(document: &Node) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    match document {
        Node::Null => {}
        Node::Mapping(entries) => {
            for (key, value) in entries {
                flatten_node(key.clone(), value, &mut pairs);
            }
        }
        Node::Sequence(_) => return Err(ConfigError::InvalidRoot("sequence")),
        Node::Scalar(_) => return Err(ConfigError::InvalidRoot("scalar")),
    }
    Ok(pairs)
}

fn flatten_node(key: String, node: &Node, out: &mut Vec<(String, String)>) {
    match node {
        Node::Mapping(entries) if !entries.is_empty() => {
            for (child, value) in entries {
                flatten_node(format!("{key}:{child}"), value, out);
            }
        }
        Node::Sequence(items) if !items.is_empty() => {
            for (idx, value) in items.iter().enumerate() {
                flatten_node(format!("{key}:{idx}"), value, out);
            }
        }
        Node::Mapping(_) | Node::Sequence(_) | Node::Null => out.push((key, String::new())),
        Node::Scalar(text) => out.push((key, text.clone())),
    }
}

//! Indented XML printing.
//!
//! Every element that has element children gets its children on their own
//! lines, two spaces deeper than the parent. Leaf elements stay on one line.

use super::xml::{XmlElement, XmlNode};
use quick_xml::escape::escape;

const INDENT: &str = "  ";

/// Render a document: XML declaration, the indented tree and a trailing newline.
pub fn to_pretty_string(root: &XmlElement) -> String {
    let mut output = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(&mut output, root, 0);
    output.push('\n');
    output
}

fn write_element(output: &mut String, element: &XmlElement, depth: usize) {
    output.push('<');
    output.push_str(&element.name);
    for (key, value) in &element.attributes {
        output.push(' ');
        output.push_str(key);
        output.push_str("=\"");
        output.push_str(&escape_attribute(value));
        output.push('"');
    }

    if element.children.is_empty() {
        output.push_str(" />");
        return;
    }
    output.push('>');

    if element.has_element_children() {
        for child in &element.children {
            newline(output, depth + 1);
            match child {
                XmlNode::Element(child) => write_element(output, child, depth + 1),
                XmlNode::Text(text) => output.push_str(&escape(text.trim())),
            }
        }
        newline(output, depth);
    } else {
        for child in &element.children {
            if let XmlNode::Text(text) = child {
                output.push_str(&escape(text.as_str()));
            }
        }
    }

    output.push_str("</");
    output.push_str(&element.name);
    output.push('>');
}

/// Escape an attribute value, keeping line breaks and tabs as character
/// references so readers do not normalize them to spaces.
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

fn newline(output: &mut String, depth: usize) {
    output.push('\n');
    for _ in 0..depth {
        output.push_str(INDENT);
    }
}

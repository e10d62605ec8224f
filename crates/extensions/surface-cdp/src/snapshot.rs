//! Converts a CDP DOM tree into a [`Document`].

use retrace_protocols::{Document, ElementHandle, NodeId};

use crate::cdp::{DomNode, ELEMENT_NODE};

/// Builds a document from `DOM.getDocument` output.
///
/// Only element nodes are kept. Shadow roots and iframe documents are
/// flattened into their host element. Handles are backend node IDs, which
/// stay stable for the lifetime of the page.
pub fn build_document(root: &DomNode) -> Document {
    let mut doc = Document::new();
    append(&mut doc, None, root);
    doc
}

fn append(doc: &mut Document, parent: Option<NodeId>, node: &DomNode) {
    let this = if node.node_type == ELEMENT_NODE {
        let tag = node
            .local_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&node.node_name);
        let attributes = node
            .attributes
            .as_deref()
            .map(pair_attributes)
            .unwrap_or_default();
        Some(doc.append_with_handle(
            parent,
            tag,
            attributes,
            ElementHandle(node.backend_node_id as u64),
        ))
    } else {
        parent
    };

    for shadow in node.shadow_roots.iter().flatten() {
        append(doc, this, shadow);
    }
    if let Some(content) = &node.content_document {
        append(doc, this, content);
    }
    for child in node.children.iter().flatten() {
        append(doc, this, child);
    }
}

fn pair_attributes(flat: &[String]) -> Vec<(String, String)> {
    flat.chunks_exact(2)
        .map(|pair| (pair[0].to_ascii_lowercase(), pair[1].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> DomNode {
        serde_json::from_str(
            r##"{
            "nodeId": 1, "backendNodeId": 1, "nodeType": 9, "nodeName": "#document",
            "children": [{
                "nodeId": 2, "backendNodeId": 2, "nodeType": 1, "nodeName": "HTML",
                "localName": "html", "attributes": [],
                "children": [{
                    "nodeId": 3, "backendNodeId": 3, "nodeType": 1, "nodeName": "BODY",
                    "localName": "body", "attributes": ["class", "app"],
                    "children": [
                        {"nodeId": 4, "backendNodeId": 40, "nodeType": 3, "nodeName": "#text"},
                        {
                            "nodeId": 5, "backendNodeId": 50, "nodeType": 1, "nodeName": "INPUT",
                            "localName": "input", "attributes": ["id", "email", "name", "email"]
                        },
                        {
                            "nodeId": 6, "backendNodeId": 60, "nodeType": 1, "nodeName": "IFRAME",
                            "localName": "iframe", "attributes": [],
                            "contentDocument": {
                                "nodeId": 7, "backendNodeId": 70, "nodeType": 9,
                                "nodeName": "#document",
                                "children": [{
                                    "nodeId": 8, "backendNodeId": 80, "nodeType": 1,
                                    "nodeName": "BUTTON", "localName": "button",
                                    "attributes": ["id", "inner"]
                                }]
                            }
                        }
                    ]
                }]
            }]
        }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_build_document_keeps_elements() {
        let doc = build_document(&fixture());
        let tags: Vec<&str> = doc.iter().map(|n| doc.tag(n)).collect();
        assert_eq!(tags, vec!["html", "body", "input", "iframe", "button"]);

        let email = doc.get_element_by_id("email").unwrap();
        assert_eq!(doc.attr(email, "name"), Some("email"));
        assert_eq!(doc.handle(email), ElementHandle(50));
        assert_eq!(doc.find_by_handle(ElementHandle(50)), Some(email));
    }

    #[test]
    fn test_frame_content_hangs_off_host() {
        let doc = build_document(&fixture());
        let inner = doc.get_element_by_id("inner").unwrap();
        let host = doc.parent(inner).unwrap();
        assert_eq!(doc.tag(host), "iframe");
    }

    #[test]
    fn test_odd_attribute_list_drops_dangling_name() {
        let attrs = pair_attributes(&["ID".to_string(), "a".to_string(), "x".to_string()]);
        assert_eq!(attrs, vec![("id".to_string(), "a".to_string())]);
    }
}

use super::*;

const PAGE: &str = r#"
<!DOCTYPE html>
<html>
  <body class="page">
    <!-- header -->
    <div id="app">
      <form name="login">
        <input name="user" type="text">
        <input name="pass" type="password"/>
        <button class="btn primary" data-testid="submit">Go</button>
      </form>
    </div>
    <ul><li>a</li><li>b</li></ul>
  </body>
</html>
"#;

#[test]
fn test_parse_structure() {
    let doc = Document::parse(PAGE).unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.tag(root), "html");

    let tags: Vec<&str> = doc.iter().map(|n| doc.tag(n)).collect();
    assert_eq!(
        tags,
        vec!["html", "body", "div", "form", "input", "input", "button", "ul", "li", "li"]
    );
}

#[test]
fn test_void_elements_have_no_children() {
    let doc = Document::parse(PAGE).unwrap();
    let inputs: Vec<NodeId> = doc.iter().filter(|n| doc.tag(*n) == "input").collect();
    assert_eq!(inputs.len(), 2);
    assert!(doc.children(inputs[0]).is_empty());
    assert_eq!(doc.parent(inputs[0]), doc.parent(inputs[1]));
}

#[test]
fn test_attributes_and_classes() {
    let doc = Document::parse(PAGE).unwrap();
    let button = doc.iter().find(|n| doc.tag(*n) == "button").unwrap();
    let el = doc.element(button);
    assert_eq!(el.attr("data-testid"), Some("submit"));
    assert_eq!(el.classes().collect::<Vec<_>>(), vec!["btn", "primary"]);
    assert!(el.has_class("primary"));
    assert!(el.id().is_none());
}

#[test]
fn test_ancestors_and_lookup() {
    let doc = Document::parse(PAGE).unwrap();
    let app = doc.get_element_by_id("app").unwrap();
    let button = doc.iter().find(|n| doc.tag(*n) == "button").unwrap();
    let chain: Vec<&str> = doc.ancestors(button).map(|n| doc.tag(n)).collect();
    assert_eq!(chain, vec!["form", "div", "body", "html"]);
    assert!(doc.ancestors(button).any(|n| n == app));
}

#[test]
fn test_find_by_handle() {
    let doc = Document::parse(PAGE).unwrap();
    let form = doc.iter().find(|n| doc.tag(*n) == "form").unwrap();
    let handle = doc.handle(form);
    assert_eq!(doc.find_by_handle(handle), Some(form));
    assert_eq!(doc.find_by_handle(ElementHandle(9999)), None);
}

#[test]
fn test_set_and_remove_attr() {
    let mut doc = Document::parse(r#"<input name="q">"#).unwrap();
    let input = doc.root().unwrap();
    doc.set_attr(input, "value", "rust");
    assert_eq!(doc.attr(input, "value"), Some("rust"));
    doc.set_attr(input, "value", "go");
    assert_eq!(doc.attr(input, "value"), Some("go"));
    assert_eq!(doc.remove_attr(input, "value"), Some("go".to_string()));
    assert_eq!(doc.attr(input, "value"), None);
}

#[test]
fn test_count_with_attr() {
    let doc = Document::parse(r#"<div><a data-testid="x"></a><a data-testid="x"></a></div>"#).unwrap();
    assert_eq!(doc.count_with_attr("data-testid", "x"), 2);
    assert_eq!(doc.count_with_attr("data-testid", "y"), 0);
}

#[test]
fn test_unexpected_closing_tag() {
    let err = Document::parse("<div></span>").unwrap_err();
    assert!(err.to_string().contains("</span>"));
}

#[test]
fn test_unterminated_attribute() {
    assert!(Document::parse(r#"<div id="x></div>"#).is_err());
}

#[test]
fn test_siblings_at_top_level() {
    let doc = Document::parse("<p></p><p></p>").unwrap();
    let first = doc.root().unwrap();
    assert_eq!(doc.siblings(first).len(), 2);
}

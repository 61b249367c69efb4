// Declarative view description rendered to HTML
use serde_json::Value;
use std::fmt::Write;

const VOID_TAGS: [&str; 5] = ["br", "hr", "img", "input", "meta"];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Element(Element),
    Text(String),
    Fragment(Vec<View>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<View>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    /// Boolean attribute, emitted only when `on`
    pub fn flag(self, name: &str, on: bool) -> Self {
        if on { self.attr(name, name) } else { self }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, V>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<View>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(View::Text(text.into()))
    }

    #[cfg(test)]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<Element> for View {
    fn from(element: Element) -> Self {
        View::Element(element)
    }
}

impl From<&str> for View {
    fn from(text: &str) -> Self {
        View::Text(text.to_string())
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        View::Text(text)
    }
}

pub fn el(tag: &'static str) -> Element {
    Element::new(tag)
}

impl View {
    pub fn empty() -> Self {
        View::Fragment(Vec::new())
    }

    /// Container picked up by the page script, which instantiates the chart
    /// from the embedded options
    pub fn chart_slot(container_id: &str, kind: &str, options: &Value) -> Self {
        el("div")
            .id(container_id)
            .class("chart-container")
            .attr("data-chart-kind", kind)
            .attr("data-chart-options", options.to_string())
            .into()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        match self {
            View::Text(text) => out.push_str(&escape(text)),
            View::Fragment(children) => children.iter().for_each(|c| c.write_to(out)),
            View::Element(element) => {
                let _ = write!(out, "<{}", element.tag);
                for (name, value) in &element.attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
                out.push('>');
                if VOID_TAGS.contains(&element.tag) {
                    return;
                }
                element.children.iter().for_each(|c| c.write_to(out));
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }

    /// Depth-first search for the element carrying `id`
    #[cfg(test)]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        match self {
            View::Text(_) => None,
            View::Fragment(children) => children.iter().find_map(|c| c.find_by_id(id)),
            View::Element(element) => {
                if element.get_attr("id") == Some(id) {
                    return Some(element);
                }
                element.children.iter().find_map(|c| c.find_by_id(id))
            }
        }
    }

    /// Concatenated text content
    #[cfg(test)]
    pub fn text_content(&self) -> String {
        match self {
            View::Text(text) => text.clone(),
            View::Fragment(children) => children.iter().map(View::text_content).collect(),
            View::Element(element) => element.children.iter().map(View::text_content).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_escapes_text_and_attributes() {
        let view: View = el("p")
            .attr("title", "a \"quoted\" <value>")
            .text("5 < 6 & 7")
            .into();
        assert_eq!(
            view.render(),
            "<p title=\"a &quot;quoted&quot; &lt;value&gt;\">5 &lt; 6 &amp; 7</p>"
        );
    }

    #[test]
    fn test_void_elements() {
        let view: View = el("input").attr("type", "date").flag("disabled", true).into();
        assert_eq!(view.render(), "<input type=\"date\" disabled=\"disabled\">");
    }

    #[test]
    fn test_find_by_id_and_text() {
        let view: View = el("div")
            .child(el("span").id("total-sales").text("1258"))
            .child(el("span").text("otro"))
            .into();
        let found = view.find_by_id("total-sales").unwrap();
        assert_eq!(View::Element(found.clone()).text_content(), "1258");
        assert!(view.find_by_id("missing").is_none());
    }

    #[test]
    fn test_chart_slot() {
        let view = View::chart_slot("trend-chart", "line", &json!({"series": []}));
        let html = view.render();
        assert!(html.contains("id=\"trend-chart\""));
        assert!(html.contains("data-chart-options=\"{&quot;series&quot;:[]}\""));
    }
}

// Reusable view components shared by the section pages
use super::view::{el, Element, View};

pub fn card(title: &str, tools: Option<View>, body: impl Into<View>) -> Element {
    let mut header = el("div")
        .class("card-header")
        .child(el("h5").class("card-title").text(title));
    if let Some(tools) = tools {
        header = header.child(el("div").class("card-tools").child(tools));
    }
    el("div")
        .class("card")
        .child(header)
        .child(el("div").class("card-body").child(body))
}

pub fn metric(id: &str, label: &str, value: &str, icon: &str) -> Element {
    el("div")
        .class("metric-card")
        .child(el("div").class("metric-icon").child(el("i").class(format!("fas fa-{}", icon))))
        .child(
            el("div")
                .class("metric-content")
                .child(el("h3").id(id).text(value))
                .child(el("p").text(label)),
        )
}

pub fn row(columns: Vec<Element>) -> Element {
    el("div").class("row").children(columns)
}

pub fn col(class: &str, child: impl Into<View>) -> Element {
    el("div").class(class).child(child)
}

/// Form that posts `field=<option>` to `action` whenever the selection changes
pub fn select_form(
    action: &str,
    field: &str,
    id: &str,
    options: &[(String, String)],
    selected: &str,
) -> Element {
    let options = options.iter().map(|(value, label)| {
        el("option")
            .attr("value", value.clone())
            .flag("selected", value == selected)
            .text(label.clone())
    });
    el("form").attr("method", "post").attr("action", action).child(
        el("select")
            .id(id)
            .attr("name", field)
            .class("form-select form-select-sm")
            .attr("onchange", "this.form.submit()")
            .children(options),
    )
}

/// Single-button form
pub fn post_button(action: &str, label: &str, class: &str) -> Element {
    el("form")
        .attr("method", "post")
        .attr("action", action)
        .class("d-inline")
        .child(el("button").attr("type", "submit").class(class).text(label))
}

/// Button group posting `field=<value>`, the active value highlighted
pub fn toggle_group(action: &str, field: &str, values: &[(&str, &str)], active: &str) -> Element {
    el("form")
        .attr("method", "post")
        .attr("action", action)
        .class("btn-group")
        .children(values.iter().map(|(value, label)| {
            let class = if *value == active {
                "btn btn-sm btn-outline-primary active"
            } else {
                "btn btn-sm btn-outline-primary"
            };
            el("button")
                .attr("type", "submit")
                .attr("name", field)
                .attr("value", *value)
                .class(class)
                .text(*label)
        }))
}

pub fn table(headers: &[&str], body_id: &str, rows: Vec<Element>) -> Element {
    el("div").class("table-responsive").child(
        el("table")
            .class("table table-hover")
            .child(el("thead").child(el("tr").children(headers.iter().map(|h| el("th").text(*h)))))
            .child(el("tbody").id(body_id).children(rows)),
    )
}

/// Full-width row spanning `columns` cells
pub fn message_row(columns: usize, message: &str) -> Element {
    el("tr").child(
        el("td")
            .attr("colspan", columns.to_string())
            .class("text-center")
            .text(message),
    )
}

/// Star icons for a 0..5 score: full stars, one half star when the
/// fractional part reaches .5, the rest empty
pub fn stars(score: f64) -> Element {
    let full = score.floor().clamp(0.0, 5.0) as usize;
    let half = full < 5 && score - score.floor() >= 0.5;
    let empty = 5 - full - usize::from(half);
    let icons = std::iter::repeat_n("fas fa-star", full)
        .chain(std::iter::repeat_n("fas fa-star-half-alt", usize::from(half)))
        .chain(std::iter::repeat_n("far fa-star", empty))
        .map(|class| el("i").class(format!("{} text-warning", class)));
    el("span").class("stars").children(icons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(html: &str, needle: &str) -> usize {
        html.matches(needle).count()
    }

    #[test]
    fn test_stars() {
        let html = View::from(stars(3.5)).render();
        assert_eq!(count(&html, "\"fas fa-star text-warning\""), 3);
        assert_eq!(count(&html, "fa-star-half-alt"), 1);
        assert_eq!(count(&html, "far fa-star"), 1);

        let html = View::from(stars(5.0)).render();
        assert_eq!(count(&html, "\"fas fa-star text-warning\""), 5);
        assert_eq!(count(&html, "far fa-star"), 0);
    }

    #[test]
    fn test_select_marks_selection() {
        let options = vec![
            ("".to_string(), "Todas".to_string()),
            ("home".to_string(), "Hogar".to_string()),
        ];
        let html = View::from(select_form("/pages/inventory/filter", "category", "cat", &options, "home")).render();
        assert!(html.contains("<option value=\"home\" selected=\"selected\">Hogar</option>"));
        assert!(html.contains("<option value=\"\">Todas</option>"));
    }

    #[test]
    fn test_metric_value_is_addressable() {
        let view = View::from(metric("total-sales", "Ventas Totales", "1258", "shopping-cart"));
        let value = view.find_by_id("total-sales").unwrap();
        assert_eq!(View::Element(value.clone()).text_content(), "1258");
    }
}

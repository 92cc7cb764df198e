use crate::edge::LineageEdge;
use crate::node::NodeId;
use crate::output::is_quiet;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

fn node_name(node: &NodeId) -> String {
    match node {
        NodeId::Table(_) => node.display_name().style(theme().table.clone()).to_string(),
        NodeId::Column(_) => node.display_name().style(theme().column.clone()).to_string(),
    }
}

/// `source -[KIND]-> target`, colored by node label
pub fn edge_line(edge: &LineageEdge) -> String {
    format!(
        "{} -[{}]-> {}",
        node_name(&edge.from),
        edge.kind.as_str().style(theme().relation.clone()),
        node_name(&edge.to)
    )
}

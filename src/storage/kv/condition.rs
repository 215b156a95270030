use std::collections::BTreeMap;

use super::{Item, Value};

/// A filter over document attributes, rendered to a DynamoDB filter
/// expression or evaluated directly by the in-process client.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Exists(&'static str),
    /// Holds when the attribute is absent or has any other value.
    NotEquals(&'static str, Value),
    And(Vec<Condition>),
}

/// A condition in DynamoDB expression syntax, with attribute names and
/// values moved out into placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub text: String,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

impl Condition {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Condition::Exists(name) => item.contains_key(*name),
            Condition::NotEquals(name, value) => item.get(*name) != Some(value),
            Condition::And(parts) => parts.iter().all(|part| part.matches(item)),
        }
    }

    pub fn render(&self) -> Expression {
        let mut expression = Expression::default();
        let text = self.render_into(&mut expression);
        expression.text = text;
        expression
    }

    fn render_into(&self, out: &mut Expression) -> String {
        match self {
            Condition::Exists(name) => format!("attribute_exists({})", name_placeholder(out, name)),
            Condition::NotEquals(name, value) => {
                let name = name_placeholder(out, name);
                let key = format!(":v{}", out.values.len());
                out.values.insert(key.clone(), value.clone());
                format!("NOT {name} = {key}")
            }
            Condition::And(parts) => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|part| match part {
                        Condition::And(_) => format!("({})", part.render_into(out)),
                        _ => part.render_into(out),
                    })
                    .collect();
                rendered.join(" AND ")
            }
        }
    }
}

fn name_placeholder(out: &mut Expression, name: &str) -> String {
    if let Some((placeholder, _)) = out.names.iter().find(|(_, n)| n.as_str() == name) {
        return placeholder.clone();
    }
    let placeholder = format!("#n{}", out.names.len());
    out.names.insert(placeholder.clone(), name.to_string());
    placeholder
}

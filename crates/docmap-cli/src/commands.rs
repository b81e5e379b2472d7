use colored::Colorize;
use docmap_model::{ConditionValue, Conditions, DocMap, ObjectView};
use docmap_types::Pid;
use serde_json::json;

use crate::cli::*;
use crate::seed;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let docmap = seed::open(cli.config.as_deref())?;
    if let Some(path) = &cli.seed {
        seed::apply(&docmap, seed::load(path)?)?;
    }
    match cli.command {
        Command::Models => cmd_models(&docmap, &cli.format),
        Command::Materialize(args) => cmd_materialize(&docmap, args, &cli.format),
        Command::Find(args) => cmd_find(&docmap, args, &cli.format),
        Command::Count(args) => cmd_count(&docmap, args, &cli.format),
    }
}

fn cmd_models(docmap: &DocMap, format: &OutputFormat) -> anyhow::Result<()> {
    let registry = docmap.registry();
    let mut models = Vec::new();
    for model in registry.models() {
        let parent = registry.parent(model)?;
        let datastreams = registry.resolve(model)?;
        let delegates = registry.delegates(model)?;
        match format {
            OutputFormat::Json => models.push(json!({
                "name": model.as_str(),
                "parent": parent.map(|p| p.as_str()),
                "datastreams": datastreams,
                "delegates": delegates,
            })),
            OutputFormat::Text => {
                match parent {
                    Some(parent) => println!("{} < {}", model.as_str().bold(), parent.as_str()),
                    None => println!("{}", model.as_str().bold()),
                }
                for spec in datastreams {
                    let mut flags = Vec::new();
                    if !spec.versionable {
                        flags.push("unversioned");
                    }
                    if !spec.autocreate {
                        flags.push("no-autocreate");
                    }
                    println!(
                        "  {} {} {}",
                        spec.name.cyan(),
                        spec.kind.to_string().dimmed(),
                        flags.join(",").yellow()
                    );
                }
                for delegate in delegates {
                    let arity = if delegate.multiple { "[]" } else { "" };
                    println!(
                        "  {}{} → {}.{}",
                        delegate.attribute.green(),
                        arity,
                        delegate.datastream,
                        delegate.field_name()
                    );
                }
            }
        }
    }
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&models)?);
    }
    Ok(())
}

fn cmd_materialize(docmap: &DocMap, args: MaterializeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let pid = Pid::new(args.pid)?;
    let obj = docmap.find_one(&args.model, &pid, Some(args.cast))?;
    let attributes = obj.attributes()?;

    if let OutputFormat::Json = format {
        let datastreams: Vec<_> = obj
            .datastreams()
            .values()
            .map(|ds| {
                json!({
                    "name": ds.name(),
                    "kind": ds.kind(),
                    "label": ds.label(),
                    "mime_type": ds.mime_type(),
                    "versionable": ds.versionable(),
                    "new": ds.is_new(),
                    "size": ds.size(),
                })
            })
            .collect();
        let out = json!({
            "pid": pid.as_str(),
            "model": obj.model().as_str(),
            "datastreams": datastreams,
            "attributes": attributes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {} ({})", "✓".green().bold(), pid.as_str().bold(), obj.model().as_str().yellow());
    if let Some(created) = obj.created() {
        println!("  Created: {}", created.to_rfc3339());
    }
    for ds in obj.datastreams().values() {
        let state = if ds.is_new() { "new".yellow() } else { "persisted".green() };
        println!(
            "  {} {} {} {} bytes [{}]",
            ds.name().cyan(),
            ds.kind().to_string().dimmed(),
            ds.mime_type(),
            ds.size(),
            state
        );
    }
    for (name, value) in &attributes {
        println!("  {} = {}", name.green(), value.clone().into_values().join(", "));
    }
    Ok(())
}

/// Repeated fields become one all-values condition, in first-seen order.
fn conditions(pairs: Vec<(String, String)>) -> Conditions {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (field, value) in pairs {
        match grouped.iter_mut().find(|(f, _)| *f == field) {
            Some((_, values)) => values.push(value),
            None => grouped.push((field, vec![value])),
        }
    }
    grouped
        .into_iter()
        .map(|(field, mut values)| {
            let value = if values.len() == 1 {
                ConditionValue::One(values.remove(0))
            } else {
                ConditionValue::All(values)
            };
            (field, value)
        })
        .collect()
}

fn cmd_find(docmap: &DocMap, args: FindArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let found = docmap.find_where(&args.model, conditions(args.conditions))?;
    match format {
        OutputFormat::Json => {
            let hits: Vec<_> = found
                .iter()
                .map(|view| json!({ "pid": view.pid().map(Pid::as_str), "model": view.model().as_str() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        OutputFormat::Text => {
            for view in &found {
                let source = match view {
                    ObjectView::Proxy(_) => "index",
                    ObjectView::Materialized(_) => "repository",
                };
                let pid = view.pid().map(Pid::as_str).unwrap_or("-");
                println!("{} {} {}", pid.bold(), view.model().as_str().yellow(), source.dimmed());
            }
            println!("{} object(s)", found.len().to_string().bold());
        }
    }
    Ok(())
}

fn cmd_count(docmap: &DocMap, args: CountArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let n = docmap.count(&args.model, args.query.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "model": args.model, "count": n })),
        OutputFormat::Text => println!("{} {}", n.to_string().bold(), args.model),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_fields_group_into_all_values() {
        let pairs = vec![
            ("tags".to_string(), "quix".to_string()),
            ("title".to_string(), "9\" Nails".to_string()),
            ("tags".to_string(), "quack".to_string()),
        ];
        let expected = Conditions::new()
            .with("tags", vec!["quix", "quack"])
            .with("title", "9\" Nails");
        assert_eq!(conditions(pairs), expected);
    }

    #[test]
    fn no_pairs_is_empty() {
        assert!(conditions(Vec::new()).is_empty());
    }
}

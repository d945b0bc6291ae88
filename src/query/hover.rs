use crate::analyzer::{IdentifierKind, Resolution};
use crate::catalog;
use crate::query::definition::find_template;
use crate::query::{Hover, QueryContext, Target, target_at};
use crate::store::Document;
use crate::utils::Position;

pub fn hover(ctx: &QueryContext<'_>, document: &Document, position: Position) -> Option<Hover> {
    let analysis = ctx.state.analysis(document);
    let target = target_at(document, &analysis, position)?;

    let hover = match target {
        Target::Reference(resolved) => {
            let name = &resolved.reference.name;
            let range = resolved.reference.range;
            match &resolved.resolution {
                Resolution::Local(binding) => {
                    let detail = binding.kind.completion_detail();
                    let value = if binding.implicit {
                        format!("**{}** `{}`\n\nimplicitly available in macro bodies", detail, name)
                    } else {
                        format!(
                            "**{}** `{}`\n\ndeclared at line {}",
                            detail,
                            name,
                            binding.range.start.line + 1
                        )
                    };
                    Hover::markdown(value, range).with_label(detail)
                }
                Resolution::Backend(entry) => {
                    let detail = IdentifierKind::BackendVariable.completion_detail();
                    let value = format!(
                        "**{}** `{}`\n\ndefined in `{}` at line {}",
                        detail,
                        name,
                        entry.filename,
                        entry.range.start.line + 1
                    );
                    Hover::markdown(value, range).with_label(detail)
                }
                Resolution::Builtin => {
                    Hover::markdown(format!("**Builtin** `{}`", name), range).with_label("Builtin")
                }
                Resolution::Unresolved(reason) => {
                    let detail = IdentifierKind::UndefinedVariable.completion_detail();
                    Hover::markdown(reason.to_string(), range).with_label(detail)
                }
            }
        }

        Target::Filter(filter) => {
            let mut hover = Hover::markdown(format!("**Filter** `{}`", filter.name), filter.range)
                .with_label("Filter");
            if let Some(doc) = catalog::filter_doc(&filter.name) {
                hover.value = format!("{}\n\n{}", hover.value, doc);
                hover.documentation = Some(doc.to_string());
            } else if let Some(entry) = ctx.state.backend().latest(&filter.name, ctx.state.family()) {
                hover.value = format!("{}\n\nregistered in `{}`", hover.value, entry.filename);
            }
            hover
        }

        Target::Identifier(identifier) => {
            let detail = identifier.kind.completion_detail();
            match identifier.kind {
                IdentifierKind::Link => {
                    let value = match ctx.hints.get(&identifier.name) {
                        Some(hint) => hint.action.description,
                        None => format!("**{}** `{}`", detail, identifier.name),
                    };
                    Hover::markdown(value, identifier.range).with_label(detail)
                }
                IdentifierKind::JinjaTemplateRef => {
                    let status = match find_template(ctx.state, &identifier.name) {
                        Some(template) => format!("open as `{}`", template.filename()),
                        None => "not open in the workspace".to_string(),
                    };
                    let value = format!("**{}** `{}`\n\n{}", detail, identifier.name, status);
                    Hover::markdown(value, identifier.range).with_label(detail)
                }
                _ => {
                    let value = match &identifier.error {
                        Some(error) => error.clone(),
                        None => format!("**{}** `{}`", detail, identifier.name),
                    };
                    Hover::markdown(value, identifier.range).with_label(detail)
                }
            }
        }
    };
    Some(hover)
}

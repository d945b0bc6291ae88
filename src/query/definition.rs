use std::path::PathBuf;
use std::sync::Arc;

use crate::analyzer::{IdentifierKind, Resolution};
use crate::backend::Language;
use crate::query::{Location, QueryContext, Target, target_at};
use crate::store::{Document, StoreState};
use crate::utils::{Position, Range};

/// 按模板名找已打开的模板 (文件名等于模板名，或以 `/模板名` 结尾)
pub(crate) fn find_template<'a>(state: &'a StoreState, name: &str) -> Option<&'a Arc<Document>> {
    let suffix = format!("/{}", name.trim_start_matches('/'));
    state
        .documents()
        .filter(|doc| doc.language() == Language::Template)
        .filter(|doc| doc.filename() == name || doc.filename().ends_with(&suffix))
        // 多个匹配时取路径最短的那个
        .min_by_key(|doc| doc.filename().len())
}

/// 光标下什么都没有时返回 None；找到了东西但没有定义时返回空列表
///
/// 后端变量有多个候选时全部返回，最近写入的在前。
pub fn goto_definition(
    ctx: &QueryContext<'_>,
    document: &Document,
    position: Position,
) -> Option<Vec<Location>> {
    let analysis = ctx.state.analysis(document);
    let target = target_at(document, &analysis, position)?;

    let locations = match target {
        Target::Reference(resolved) => match &resolved.resolution {
            Resolution::Local(binding) if !binding.implicit => vec![Location {
                uri: document.filename().to_string(),
                range: binding.range,
                is_backend: false,
                name: binding.name.clone(),
            }],
            Resolution::Backend(_) => backend_locations(ctx, &resolved.reference.name),
            _ => Vec::new(),
        },

        // 自定义过滤器可能在后端注册
        Target::Filter(filter) => backend_locations(ctx, &filter.name),

        Target::Identifier(identifier) => match identifier.kind {
            IdentifierKind::JinjaTemplateRef => template_location(ctx, &identifier.name)
                .into_iter()
                .collect(),
            IdentifierKind::Link => ctx
                .hints
                .get(&identifier.name)
                .map(|hint| Location {
                    uri: hint.uri,
                    range: Range::default(),
                    is_backend: false,
                    name: identifier.name.clone(),
                })
                .into_iter()
                .collect(),
            IdentifierKind::UndefinedVariable => Vec::new(),
            // 声明跳到自己
            kind => vec![Location {
                uri: document.filename().to_string(),
                range: identifier.range,
                is_backend: kind == IdentifierKind::BackendVariable,
                name: identifier.name.clone(),
            }],
        },
    };
    Some(locations)
}

/// 光标下的模板引用在工作区里找不到时，返回它应该创建的位置
/// 没有配置模板根目录时无从得知，返回 None
pub fn missing_template(
    ctx: &QueryContext<'_>,
    document: &Document,
    position: Position,
) -> Option<PathBuf> {
    let analysis = ctx.state.analysis(document);
    let Target::Identifier(identifier) = target_at(document, &analysis, position)? else {
        return None;
    };
    if identifier.kind != IdentifierKind::JinjaTemplateRef
        || find_template(ctx.state, &identifier.name).is_some()
    {
        return None;
    }
    ctx.config.template_path(&identifier.name)
}

fn backend_locations(ctx: &QueryContext<'_>, name: &str) -> Vec<Location> {
    ctx.state
        .backend()
        .lookup(name, ctx.state.family())
        .into_iter()
        .map(|entry| Location {
            uri: entry.filename.clone(),
            range: entry.range,
            is_backend: true,
            name: name.to_string(),
        })
        .collect()
}

/// 已打开的模板优先，否则拼上模板根目录
fn template_location(ctx: &QueryContext<'_>, name: &str) -> Option<Location> {
    let uri = match find_template(ctx.state, name) {
        Some(template) => template.filename().to_string(),
        None => ctx.config.template_path(name)?.to_string_lossy().to_string(),
    };
    Some(Location {
        uri,
        range: Range::default(),
        is_backend: false,
        name: name.to_string(),
    })
}

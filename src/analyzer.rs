//! 语义分析：作用域、名字解析、标识符表

mod db;
mod errors;
mod identifier;
mod info;
mod resolve;
mod scope;

use crate::backend::BackendLang;
use crate::parser::TemplateSyntax;
use crate::source::SourceFile;
use crate::utils::Range;

pub use db::{BackendEntry, BackendIndex};
pub use errors::{SemanticError, UnresolvedReason};
pub use identifier::{Identifier, IdentifierKind, normalize};
pub use info::{FilterUse, Reference};
pub use resolve::{Resolution, ResolvedReference};
pub use scope::{Binding, Scope, ScopeId, ScopeKind, ScopeTree};

/// 模板全局可用、不需要声明的名字
pub const BUILTINS: [&str; 13] = [
    "range", "dict", "lipsum", "cycler", "joiner", "namespace", "self", "super", "true", "false",
    "none", "True", "False",
];

/// Python 风格的 None 也是字面量
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name) || name == "None"
}

/// 一次分析的结果
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// 排好序的标识符表
    pub identifiers: Vec<Identifier>,
    /// 每个变量引用及其绑定结果，按源码顺序
    pub references: Vec<ResolvedReference>,
    pub errors: Vec<SemanticError>,
}

pub struct Analyzer<'a> {
    file: &'a SourceFile,
    syntax: &'a TemplateSyntax,
    backend: &'a BackendIndex,
    /// None 表示所有后端语言族
    family: Option<BackendLang>,
    errors: Vec<SemanticError>,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        file: &'a SourceFile,
        syntax: &'a TemplateSyntax,
        backend: &'a BackendIndex,
        family: Option<BackendLang>,
    ) -> Self {
        Self {
            file,
            syntax,
            backend,
            family,
            errors: Vec::new(),
        }
    }

    /// 记录未解析的引用
    fn report(&mut self, name: &str, range: Range, reason: UnresolvedReason) {
        self.errors.push(SemanticError {
            name: name.to_string(),
            range,
            reason,
        });
    }

    pub fn analyze(mut self) -> Analysis {
        // 1. 解析每一个引用
        let mut references = Vec::with_capacity(self.syntax.references.len());
        for reference in &self.syntax.references {
            let resolution = self.resolve_reference(reference);
            if let Resolution::Unresolved(reason) = &resolution {
                self.report(&reference.name, reference.range, reason.clone());
            }
            references.push(ResolvedReference {
                reference: reference.clone(),
                resolution,
            });
        }

        // 2. 声明 (隐式名字不进表)
        let mut identifiers: Vec<Identifier> = self
            .syntax
            .scopes
            .bindings()
            .filter(|binding| !binding.implicit)
            .map(|binding| Identifier::new(binding.name.clone(), binding.range, binding.kind))
            .collect();

        // 3. 模板引用、链接
        identifiers.extend(self.syntax.templates.iter().cloned());
        identifiers.extend(self.syntax.links.iter().cloned());

        // 4. 未定义变量
        identifiers.extend(
            self.errors
                .iter()
                .map(|error| Identifier::undefined(error.name.clone(), error.range, error.to_string())),
        );

        normalize(&mut identifiers);
        log::trace!(
            "{}: {} identifiers, {} references, {} undefined",
            self.file.name,
            identifiers.len(),
            references.len(),
            self.errors.len()
        );

        Analysis {
            identifiers,
            references,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use indoc::indoc;

    use super::*;
    use crate::parser::Parser;
    use crate::source::DocumentId;

    fn analyze_with(src: &str, backend: &BackendIndex) -> Analysis {
        let file = SourceFile::new(PathBuf::from("page.jinja"), src.to_string());
        let syntax = Parser::parse(&file);
        Analyzer::new(&file, &syntax, backend, None).analyze()
    }

    fn analyze(src: &str) -> Analysis {
        analyze_with(src, &BackendIndex::default())
    }

    fn undefined(analysis: &Analysis) -> Vec<(&str, &str)> {
        analysis
            .identifiers
            .iter()
            .filter(|id| id.kind == IdentifierKind::UndefinedVariable)
            .map(|id| (id.name.as_str(), id.error.as_deref().unwrap_or("")))
            .collect()
    }

    #[test]
    fn loop_variable_shadows_outer_set() {
        let analysis = analyze(indoc! {"
            {% set x = 1 %}
            {% for x in items %}{{ x }}{% endfor %}
            {{ x }}
        "});
        let kinds: Vec<_> = analysis
            .references
            .iter()
            .filter(|r| r.reference.name == "x")
            .map(|r| match &r.resolution {
                Resolution::Local(binding) => binding.kind,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(kinds, vec![IdentifierKind::ForLoopKey, IdentifierKind::SetVariable]);
    }

    #[test]
    fn undefined_reference_has_error() {
        let analysis = analyze("{{ missing }} {{ range(3) }} {{ none }}");
        assert_eq!(undefined(&analysis), vec![("missing", "no binding for `missing` in scope")]);
    }

    #[test]
    fn declared_in_sibling_scope_is_reported_with_line() {
        let analysis = analyze(indoc! {"
            {% for item in items %}{% endfor %}
            {{ item }}
        "});
        let found = undefined(&analysis);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "items");
        assert_eq!(found[1], ("item", "`item` is declared at line 1 but is not visible here"));
    }

    #[test]
    fn set_reads_outer_value_on_right_hand_side() {
        let analysis = analyze("{% set x = x + 1 %}");
        assert_eq!(undefined(&analysis).len(), 1);
    }

    #[test]
    fn macro_body_sees_parameters_and_caller() {
        let analysis = analyze(indoc! {"
            {% macro row(cells) %}{{ cells }}{{ caller() }}{{ row }}{% endmacro %}
            {{ cells }}
        "});
        let found = undefined(&analysis);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "cells");
    }

    #[test]
    fn backend_variables_resolve_references() {
        let mut backend = BackendIndex::default();
        let ids = vec![Identifier::new(
            "user",
            Range::new(crate::utils::Position::new(3, 4), crate::utils::Position::new(3, 8)),
            IdentifierKind::BackendVariable,
        )];
        backend.insert_document(DocumentId::new(7), "app.rs", BackendLang::Rust, 1, &ids);

        let analysis = analyze_with("{{ user.name }}", &backend);
        assert!(undefined(&analysis).is_empty());
        match &analysis.references[0].resolution {
            Resolution::Backend(entry) => assert_eq!(entry.filename, "app.rs"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn table_is_sorted_and_contains_declarations() {
        let analysis = analyze(indoc! {r#"
            {% extends "base.html" %}
            {% block content %}{% with a = 1 %}{{ a }}{% endwith %}{% endblock %}
        "#});
        let kinds: Vec<_> = analysis.identifiers.iter().map(|id| id.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IdentifierKind::JinjaTemplateRef,
                IdentifierKind::TemplateBlock,
                IdentifierKind::WithVariable,
            ]
        );
    }
}

use crate::analyzer::{
    Analyzer, BackendEntry, Binding, Reference, UnresolvedReason, is_builtin,
};

/// 一个变量引用绑定到了哪里
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 模板内作用域链上的声明
    Local(Binding),
    /// 后端文件里的声明 (多个候选时取最近写入的)
    Backend(BackendEntry),
    /// 内置名字
    Builtin,
    Unresolved(UnresolvedReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub reference: Reference,
    pub resolution: Resolution,
}

impl<'a> Analyzer<'a> {
    /// 解析一个引用：作用域链 -> 后端文件 -> 内置名字
    pub fn resolve_reference(&self, reference: &Reference) -> Resolution {
        let name = reference.name.as_str();

        // 1. 模板内，从引用所在作用域向外
        if let Some((_, binding)) = self.syntax.scopes.resolve(reference.scope, name, reference.at()) {
            return Resolution::Local(binding.clone());
        }

        // 2. 跨文件：同语言族的后端变量
        if let Some(entry) = self.backend.latest(name, self.family) {
            return Resolution::Backend(entry.clone());
        }

        // 3. 内置
        if is_builtin(name) {
            return Resolution::Builtin;
        }

        // 4. 本模板里有同名声明，但对这里不可见
        let declared = self
            .syntax
            .scopes
            .bindings()
            .filter(|binding| binding.name == name && binding.kind.binds_references())
            .min_by_key(|binding| binding.range.start);
        match declared {
            Some(binding) => Resolution::Unresolved(UnresolvedReason::DeclaredOutOfScope {
                name: name.to_string(),
                line: binding.range.start.line + 1,
            }),
            None => Resolution::Unresolved(UnresolvedReason::NotInScope(name.to_string())),
        }
    }
}


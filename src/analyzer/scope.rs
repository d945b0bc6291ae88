use std::collections::HashSet;

use crate::analyzer::IdentifierKind;
use crate::utils::{Position, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// 模板根作用域
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Template,
    Loop,
    Macro,
    Call,
    With,
    Block,
}

/// 作用域里直接声明的一个名字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub kind: IdentifierKind,
    pub range: Range,
    /// 从这个位置起名字可见 (`set x = x + 1` 右边看到的还是外层 x)
    pub visible_from: Position,
    /// 隐式名字 (caller / varargs / kwargs)，不进标识符表
    pub implicit: bool,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub range: Range,
    pub parent: Option<ScopeId>,
    pub bindings: Vec<Binding>,
    /// 直到文件尾都没有结束标签：末尾位置也算在作用域里 (正在输入的块)
    pub open_ended: bool,
}

impl Scope {
    fn covers(&self, pos: Position) -> bool {
        self.range.contains(pos) || (self.open_ended && self.range.touches(pos))
    }
}

/// 一个模板文件的作用域树 (arena)
///
/// 作用域按源码顺序创建，子作用域总在父作用域之后，
/// 所以"最后创建且包含位置 p 的作用域"就是 p 的最内层作用域。
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new(end: Position) -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Template,
                range: Range::new(Position::default(), end),
                parent: None,
                bindings: Vec::new(),
                open_ended: false,
            }],
        }
    }

    pub fn open(&mut self, kind: ScopeKind, parent: ScopeId, start: Position) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        // 先假定延伸到父作用域末尾，遇到结束标签再收口
        let end = self.scopes[parent.0].range.end.max(start);
        self.scopes.push(Scope {
            kind,
            range: Range::new(start, end),
            parent: Some(parent),
            bindings: Vec::new(),
            open_ended: false,
        });
        id
    }

    pub fn set_start(&mut self, id: ScopeId, start: Position) {
        let scope = &mut self.scopes[id.0];
        scope.range.start = start;
        scope.range.end = scope.range.end.max(start);
    }

    pub fn close(&mut self, id: ScopeId, end: Position) {
        let scope = &mut self.scopes[id.0];
        scope.range.end = end.max(scope.range.start);
    }

    /// 没有结束标签的块：收口到文件尾，并且包含文件尾那个位置
    pub fn close_at_end(&mut self, id: ScopeId, end: Position) {
        self.close(id, end);
        self.scopes[id.0].open_ended = true;
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().enumerate().map(|(i, s)| (ScopeId(i), s))
    }

    /// 定义名字
    /// 同一个结构里只声明一次的名字 (循环变量 / with / 宏参数) 重复出现时后写覆盖前写；
    /// set 和 macro 允许在同一作用域里重复定义，各自从自己的位置开始生效
    pub fn define(&mut self, id: ScopeId, binding: Binding) {
        let scope = &mut self.scopes[id.0];
        let redefinable = matches!(
            binding.kind,
            IdentifierKind::SetVariable | IdentifierKind::MacroName | IdentifierKind::TemplateBlock
        );
        if !redefinable {
            if let Some(existing) = scope
                .bindings
                .iter_mut()
                .find(|b| b.name == binding.name && b.kind == binding.kind)
            {
                log::trace!("duplicate {:?} `{}` in one scope", binding.kind, binding.name);
                *existing = binding;
                return;
            }
        }
        scope.bindings.push(binding);
    }

    /// 从 id 开始一直走到根
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = (ScopeId, &Scope)> {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let current = next?;
            let scope = &self.scopes[current.0];
            next = scope.parent;
            Some((current, scope))
        })
    }

    pub fn innermost_at(&self, pos: Position) -> ScopeId {
        self.scopes
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, s)| s.covers(pos))
            .map(|(i, _)| ScopeId(i))
            .unwrap_or(ScopeId::ROOT)
    }

    /// 查找符号 (从内向外)
    /// 同一作用域里有多个可见声明时取最靠后的那个
    pub fn resolve(&self, from: ScopeId, name: &str, at: Position) -> Option<(ScopeId, &Binding)> {
        for (id, scope) in self.chain(from) {
            let found = scope
                .bindings
                .iter()
                .filter(|b| b.name == name && b.kind.binds_references() && b.visible_from <= at)
                .max_by_key(|b| b.visible_from);
            if let Some(binding) = found {
                return Some((id, binding));
            }
        }
        None
    }

    /// 位置 p 上可见的全部名字，内层优先，同名只保留最内层
    pub fn visible_at(&self, pos: Position) -> Vec<&Binding> {
        let mut seen = HashSet::new();
        let mut visible = Vec::new();
        for (_, scope) in self.chain(self.innermost_at(pos)) {
            let mut local: Vec<&Binding> = scope
                .bindings
                .iter()
                .filter(|b| b.kind.binds_references() && b.visible_from <= pos)
                .collect();
            // 同一层里后声明的排在前面
            local.sort_by(|a, b| b.visible_from.cmp(&a.visible_from));
            for binding in local {
                if seen.insert(binding.name.as_str()) {
                    visible.push(binding);
                }
            }
        }
        visible
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.scopes.iter().flat_map(|s| s.bindings.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position::new(line, character)
    }

    fn binding(name: &str, kind: IdentifierKind, at: Position) -> Binding {
        Binding {
            name: name.to_string(),
            kind,
            range: Range::new(at, at),
            visible_from: at,
            implicit: false,
        }
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let mut tree = ScopeTree::new(pos(10, 0));
        tree.define(
            ScopeId::ROOT,
            binding("x", IdentifierKind::SetVariable, pos(0, 5)),
        );
        let lp = tree.open(ScopeKind::Loop, ScopeId::ROOT, pos(1, 0));
        tree.define(lp, binding("x", IdentifierKind::ForLoopKey, pos(1, 0)));
        tree.close(lp, pos(3, 0));

        let (id, inner) = tree.resolve(tree.innermost_at(pos(2, 0)), "x", pos(2, 0)).unwrap();
        assert_eq!(id, lp);
        assert_eq!(inner.kind, IdentifierKind::ForLoopKey);

        let (_, outer) = tree.resolve(tree.innermost_at(pos(4, 0)), "x", pos(4, 0)).unwrap();
        assert_eq!(outer.kind, IdentifierKind::SetVariable);
    }

    #[test]
    fn declaration_is_invisible_before_it_starts() {
        let mut tree = ScopeTree::new(pos(10, 0));
        tree.define(
            ScopeId::ROOT,
            binding("x", IdentifierKind::SetVariable, pos(5, 0)),
        );
        assert!(tree.resolve(ScopeId::ROOT, "x", pos(1, 0)).is_none());
        assert!(tree.resolve(ScopeId::ROOT, "x", pos(6, 0)).is_some());
    }

    #[test]
    fn repeated_loop_key_keeps_last_write() {
        let mut tree = ScopeTree::new(pos(10, 0));
        let lp = tree.open(ScopeKind::Loop, ScopeId::ROOT, pos(0, 0));
        tree.define(lp, binding("k", IdentifierKind::ForLoopKey, pos(0, 1)));
        tree.define(lp, binding("k", IdentifierKind::ForLoopKey, pos(0, 4)));
        assert_eq!(tree.get(lp).bindings.len(), 1);
        assert_eq!(tree.get(lp).bindings[0].visible_from, pos(0, 4));
    }

    #[test]
    fn unclosed_scope_includes_end_of_file() {
        let end = pos(1, 5);
        let mut tree = ScopeTree::new(end);
        let closed = tree.open(ScopeKind::Loop, ScopeId::ROOT, pos(0, 0));
        tree.close(closed, end);
        assert_eq!(tree.innermost_at(end), ScopeId::ROOT);

        let unclosed = tree.open(ScopeKind::Loop, ScopeId::ROOT, pos(0, 0));
        tree.close_at_end(unclosed, end);
        assert_eq!(tree.innermost_at(end), unclosed);
        assert_eq!(tree.innermost_at(pos(1, 6)), ScopeId::ROOT);
    }

    #[test]
    fn block_names_never_bind() {
        let mut tree = ScopeTree::new(pos(10, 0));
        tree.define(
            ScopeId::ROOT,
            binding("content", IdentifierKind::TemplateBlock, pos(0, 0)),
        );
        assert!(tree.resolve(ScopeId::ROOT, "content", pos(5, 0)).is_none());
        assert!(tree.visible_at(pos(5, 0)).is_empty());
    }
}

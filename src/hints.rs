//! 链接提示：编辑器推过来的"可跳转动作"，和文档生命周期无关

use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::store::{read_lock, write_lock};

/// 编辑器给的一个动作 (name 同时是提示的键)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HintState {
    /// 可能来自还没落盘的内容
    Unsaved,
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkHint {
    pub uri: String,
    pub action: Action,
    pub state: HintState,
}

#[derive(Debug, Default)]
pub struct LinkHintManager {
    hints: RwLock<HashMap<String, LinkHint>>,
}

impl LinkHintManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一批候选动作，全部是 Unsaved (同名的直接覆盖，包括已保存的)
    pub fn add_link_hints(&self, uri: &str, actions: Option<Vec<Action>>) {
        let Some(actions) = actions else {
            return;
        };
        let mut hints = write_lock(&self.hints);
        for action in actions {
            debug!("link hint `{}` from {} -> unsaved", action.name, uri);
            hints.insert(
                action.name.clone(),
                LinkHint {
                    uri: uri.to_string(),
                    action,
                    state: HintState::Unsaved,
                },
            );
        }
    }

    /// 提升为 Saved
    /// actions 里的每一项按名字提升 (不存在的直接以 Saved 写入)，hint 按键提升
    pub fn save_link_hint(&self, actions: Option<Vec<Action>>, hint: Option<&str>) {
        let mut hints = write_lock(&self.hints);

        for action in actions.into_iter().flatten() {
            debug!("link hint `{}` -> saved", action.name);
            let uri = hints
                .get(&action.name)
                .map(|existing| existing.uri.clone())
                .unwrap_or_default();
            hints.insert(
                action.name.clone(),
                LinkHint {
                    uri,
                    action,
                    state: HintState::Saved,
                },
            );
        }

        if let Some(key) = hint {
            match hints.get_mut(key) {
                Some(existing) => {
                    debug!("link hint `{}` -> saved", key);
                    existing.state = HintState::Saved;
                }
                None => debug!("link hint `{}` not found, nothing to save", key),
            }
        }
    }

    /// 丢弃未保存的提示；None 表示丢弃全部未保存的
    pub fn remove_temp_link_hint(&self, hint: Option<&str>) {
        let mut hints = write_lock(&self.hints);
        match hint {
            Some(key) => {
                if hints.get(key).is_some_and(|h| h.state == HintState::Unsaved) {
                    debug!("link hint `{}` -> removed", key);
                    hints.remove(key);
                }
            }
            None => {
                let before = hints.len();
                hints.retain(|_, h| h.state == HintState::Saved);
                debug!("removed {} unsaved link hints", before - hints.len());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<LinkHint> {
        read_lock(&self.hints).get(key).cloned()
    }

    /// 已保存的在前，其余按名字排序
    pub fn all(&self) -> Vec<LinkHint> {
        let mut all: Vec<LinkHint> = read_lock(&self.hints).values().cloned().collect();
        all.sort_by(|a, b| {
            let rank = |h: &LinkHint| h.state != HintState::Saved;
            rank(a).cmp(&rank(b)).then_with(|| a.action.name.cmp(&b.action.name))
        });
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str) -> Action {
        Action {
            name: name.to_string(),
            description: format!("open {}", name),
        }
    }

    #[test]
    fn unsaved_hint_can_be_removed() {
        let manager = LinkHintManager::new();
        manager.add_link_hints("file:///routes.py", Some(vec![action("/users")]));
        assert_eq!(manager.get("/users").map(|h| h.state), Some(HintState::Unsaved));

        manager.remove_temp_link_hint(Some("/users"));
        assert!(manager.get("/users").is_none());
    }

    #[test]
    fn saved_hint_survives_unrelated_removal() {
        let manager = LinkHintManager::new();
        manager.add_link_hints("file:///routes.py", Some(vec![action("/users"), action("/posts")]));
        manager.save_link_hint(None, Some("/users"));

        manager.remove_temp_link_hint(Some("/posts"));
        manager.remove_temp_link_hint(Some("/users"));
        manager.remove_temp_link_hint(None);

        let saved = manager.get("/users").unwrap();
        assert_eq!(saved.state, HintState::Saved);
        assert_eq!(saved.uri, "file:///routes.py");
        assert!(manager.get("/posts").is_none());
    }

    #[test]
    fn add_overwrites_saved_hint() {
        let manager = LinkHintManager::new();
        manager.save_link_hint(Some(vec![action("/about")]), None);
        assert_eq!(manager.get("/about").map(|h| h.state), Some(HintState::Saved));

        manager.add_link_hints("file:///new.py", Some(vec![action("/about")]));
        let hint = manager.get("/about").unwrap();
        assert_eq!(hint.state, HintState::Unsaved);
        assert_eq!(hint.uri, "file:///new.py");
    }

    #[test]
    fn missing_arguments_are_no_ops() {
        let manager = LinkHintManager::new();
        manager.add_link_hints("file:///a.py", None);
        manager.save_link_hint(None, None);
        manager.remove_temp_link_hint(Some("/nothing"));
        assert!(manager.all().is_empty());
    }
}

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use jinja_lens::backend::Language;
use jinja_lens::workspace;
use jinja_lens::{Engine, EngineConfig, Identifier, Position};
use log::{LevelFilter, debug, info, warn};
use lsp_server::{Connection, ExtractError, Message, Notification, Request, RequestId, Response};
use lsp_types::notification::{
    DidChangeTextDocument, DidChangeWatchedFiles, DidOpenTextDocument, Notification as _,
    PublishDiagnostics,
};
use lsp_types::request::{
    CodeActionRequest, Completion, DocumentSymbolRequest, GotoDefinition, HoverRequest,
};
use lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionProviderCapability,
    CodeActionResponse, CompletionOptions, CompletionResponse, CreateFile, CreateFileOptions,
    Diagnostic, DiagnosticSeverity, DocumentChangeOperation, DocumentChanges, DocumentSymbol,
    DocumentSymbolResponse, FileChangeType, GotoDefinitionResponse, HoverProviderCapability,
    InitializeParams, OneOf, PublishDiagnosticsParams, ResourceOp, ServerCapabilities,
    TextDocumentSyncCapability, TextDocumentSyncKind, Uri, WorkspaceEdit,
};
use serde_json::Value;

type LspResult<T> = Result<T, Box<dyn Error + Sync + Send>>;

fn main() -> LspResult<()> {
    // 1. 初始化日志 (输出到 stderr，因为 stdout 被 LSP 占用了)
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;
    info!("jinja-lens LSP starting...");

    // 2. 建立连接 (基于 stdio)
    let (connection, io_threads) = Connection::stdio();

    // 3. 初始化握手：全量同步 + hover / 补全 / 跳转 / 大纲 / 快速修复
    let trigger_characters = ["|", "{", "%", "\"", "'", "/"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let server_capabilities = serde_json::to_value(&ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
        definition_provider: Some(OneOf::Left(true)),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(trigger_characters),
            ..Default::default()
        }),
        document_symbol_provider: Some(OneOf::Left(true)),
        code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
        ..Default::default()
    })?;

    let initialization_params = connection.initialize(server_capabilities)?;
    main_loop(connection, initialization_params)?;
    io_threads.join()?;

    info!("jinja-lens LSP shutting down");
    Ok(())
}

struct ServerState {
    engine: Engine,
    /// uri -> 引擎里的文档编号
    ids: HashMap<String, u32>,
}

impl ServerState {
    fn new(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config),
            ids: HashMap::new(),
        }
    }

    /// 只在文档进入工作区时分配编号
    fn id_for(&mut self, uri: &str) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(uri.to_string()).or_insert(next)
    }

    /// 查询用：没见过的 uri 不分配编号
    fn lookup(&self, uri: &str) -> Option<u32> {
        self.ids.get(uri).copied()
    }

    fn language_of(&self, uri: &str) -> Option<Language> {
        self.engine.config().language_of(Path::new(uri))
    }

    /// 放进工作区 (不发布诊断)；不认识的文件返回 false
    fn load(&mut self, uri: &str, text: &str) -> bool {
        if self.language_of(uri).is_none() {
            debug!("ignoring {}", uri);
            return false;
        }
        let extension = Path::new(uri)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        let id = self.id_for(uri);
        self.engine.add_one(id, uri, text, 0, &extension, None);
        true
    }

    /// 启动时加载模板根目录和后端目录，没打开的文件也参与解析
    fn preload(&mut self) {
        let files = workspace::discover(self.engine.config());
        let mut loaded = 0;
        for (path, _) in files {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("preload {}: {}", path.display(), e);
                    continue;
                }
            };
            let Some(uri) = to_uri(&path.to_string_lossy()) else {
                continue;
            };
            if self.load(uri.as_str(), &text) {
                loaded += 1;
            }
        }
        info!("preloaded {} files", loaded);
    }

    /// didOpen / didChange：整体重新分析
    fn analyze(&mut self, connection: &Connection, uri: &Uri, text: &str) -> LspResult<()> {
        if self.load(uri.as_str(), text) {
            self.publish_diagnostics(connection)?;
        }
        Ok(())
    }

    /// 后端文件的变化会影响所有模板，所以每次都为全部模板重新发布
    fn publish_diagnostics(&self, connection: &Connection) -> LspResult<()> {
        if self.engine.config().hide_undefined {
            return Ok(());
        }
        for filename in self.engine.template_files() {
            let Some(uri) = to_uri(&filename) else {
                continue;
            };
            let diagnostics = self
                .engine
                .undefined(&filename)
                .unwrap_or_default()
                .into_iter()
                .map(|undefined| Diagnostic {
                    range: undefined.range.into(),
                    severity: Some(DiagnosticSeverity::WARNING),
                    source: Some("jinja-lens".to_string()),
                    message: undefined.error.unwrap_or_else(|| "undefined variable".to_string()),
                    ..Default::default()
                })
                .collect();
            let params = PublishDiagnosticsParams {
                uri,
                diagnostics,
                version: None,
            };
            let not = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
            connection.sender.send(Message::Notification(not))?;
        }
        Ok(())
    }
}

fn main_loop(connection: Connection, params: Value) -> LspResult<()> {
    let params: InitializeParams = serde_json::from_value(params)?;

    let config = match params.initialization_options {
        Some(options) => EngineConfig::from_json(options).unwrap_or_else(|e| {
            warn!("{}, using defaults", e);
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };
    debug!("config: {:?}", config);

    let mut state = ServerState::new(config);
    state.preload();
    state.publish_diagnostics(&connection)?;

    info!("jinja-lens LSP initialized!");

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    return Ok(());
                }
                let resp = handle_request(&state, req);
                connection.sender.send(Message::Response(resp))?;
            }
            Message::Notification(not) => handle_notification(&mut state, &connection, not)?,
            Message::Response(_) => {}
        }
    }
    Ok(())
}

/// 每个请求都有回应：参数不对回 InvalidParams，不认识的文档回 null
fn handle_request(state: &ServerState, req: Request) -> Response {
    let request_id = req.id.clone();

    let req = match cast::<HoverRequest>(req) {
        Ok((id, params)) => {
            let uri = params.text_document_position_params.text_document.uri;
            let position = Position::from(params.text_document_position_params.position);
            let result: Option<lsp_types::Hover> = state
                .lookup(uri.as_str())
                .and_then(|doc_id| state.engine.hover(doc_id, uri.as_str(), position.line, position))
                .map(Into::into);
            return Response::new_ok(id, result);
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(ExtractError::JsonError { method, error }) => return bad_params(request_id, &method, error),
    };

    let req = match cast::<Completion>(req) {
        Ok((id, params)) => {
            let uri = params.text_document_position.text_document.uri;
            let position = Position::from(params.text_document_position.position);
            let result = state
                .lookup(uri.as_str())
                .and_then(|doc_id| state.engine.complete(doc_id, uri.as_str(), position.line, position))
                .map(|items| CompletionResponse::Array(items.into_iter().map(Into::into).collect()));
            return Response::new_ok(id, result);
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(ExtractError::JsonError { method, error }) => return bad_params(request_id, &method, error),
    };

    let req = match cast::<GotoDefinition>(req) {
        Ok((id, params)) => {
            let uri = params.text_document_position_params.text_document.uri;
            let position = Position::from(params.text_document_position_params.position);
            let result = state
                .lookup(uri.as_str())
                .and_then(|doc_id| {
                    state.engine.goto_definition(doc_id, uri.as_str(), position.line, position)
                })
                .map(|locations| {
                    let locations = locations
                        .into_iter()
                        .filter_map(|location| {
                            Some(lsp_types::Location {
                                uri: to_uri(&location.uri)?,
                                range: location.range.into(),
                            })
                        })
                        .collect();
                    GotoDefinitionResponse::Array(locations)
                });
            return Response::new_ok(id, result);
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(ExtractError::JsonError { method, error }) => return bad_params(request_id, &method, error),
    };

    let req = match cast::<DocumentSymbolRequest>(req) {
        Ok((id, params)) => {
            let uri = params.text_document.uri;
            let result = state
                .lookup(uri.as_str())
                .and_then(|doc_id| state.engine.document_symbols(doc_id, uri.as_str()))
                .map(|symbols| DocumentSymbolResponse::Nested(symbols.into_iter().map(to_symbol).collect()));
            return Response::new_ok(id, result);
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(ExtractError::JsonError { method, error }) => return bad_params(request_id, &method, error),
    };

    let req = match cast::<CodeActionRequest>(req) {
        Ok((id, params)) => {
            let uri = params.text_document.uri;
            let position = Position::from(params.range.start);
            let result: Option<CodeActionResponse> = state
                .lookup(uri.as_str())
                .and_then(|doc_id| {
                    state.engine.missing_template(doc_id, uri.as_str(), position.line, position)
                })
                .and_then(|path| to_uri(&path.to_string_lossy()))
                .map(|target| vec![CodeActionOrCommand::CodeAction(generate_template(target))]);
            return Response::new_ok(id, result);
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(ExtractError::JsonError { method, error }) => return bad_params(request_id, &method, error),
    };

    debug!("unhandled request {}", req.method);
    Response::new_err(
        req.id,
        lsp_server::ErrorCode::MethodNotFound as i32,
        format!("unsupported method {}", req.method),
    )
}

fn handle_notification(
    state: &mut ServerState,
    connection: &Connection,
    not: Notification,
) -> LspResult<()> {
    match not.method.as_str() {
        DidOpenTextDocument::METHOD => {
            let params: lsp_types::DidOpenTextDocumentParams = serde_json::from_value(not.params)?;
            state.analyze(connection, &params.text_document.uri, &params.text_document.text)?;
        }
        DidChangeTextDocument::METHOD => {
            let params: lsp_types::DidChangeTextDocumentParams = serde_json::from_value(not.params)?;
            // 全量同步：最后一个变更就是完整内容
            if let Some(change) = params.content_changes.last() {
                state.analyze(connection, &params.text_document.uri, &change.text)?;
            }
        }
        DidChangeWatchedFiles::METHOD => {
            let params: lsp_types::DidChangeWatchedFilesParams = serde_json::from_value(not.params)?;
            let mut deleted = false;
            for change in params.changes {
                if change.typ == FileChangeType::DELETED {
                    state.engine.delete_all(change.uri.as_str());
                    deleted = true;
                }
            }
            if deleted {
                state.publish_diagnostics(connection)?;
            }
        }
        // didClose 之后文档仍留在工作区里
        _ => {}
    }
    Ok(())
}

fn bad_params(id: RequestId, method: &str, error: serde_json::Error) -> Response {
    warn!("bad params for {}: {}", method, error);
    Response::new_err(id, lsp_server::ErrorCode::InvalidParams as i32, error.to_string())
}

#[allow(deprecated)]
fn to_symbol(identifier: Identifier) -> DocumentSymbol {
    let range: lsp_types::Range = identifier.range.into();
    DocumentSymbol {
        name: identifier.name,
        detail: Some(identifier.kind.completion_detail().to_string()),
        kind: identifier.kind.symbol_kind(),
        tags: None,
        deprecated: None,
        range,
        selection_range: range,
        children: None,
    }
}

/// 快速修复：在模板根目录下创建缺失的模板 (已存在时什么都不做)
fn generate_template(target: Uri) -> CodeAction {
    let create = CreateFile {
        uri: target,
        options: Some(CreateFileOptions {
            overwrite: Some(false),
            ignore_if_exists: Some(true),
        }),
        annotation_id: None,
    };
    CodeAction {
        title: "Generate new template".to_string(),
        kind: Some(CodeActionKind::QUICKFIX),
        edit: Some(WorkspaceEdit {
            document_changes: Some(DocumentChanges::Operations(vec![
                DocumentChangeOperation::Op(ResourceOp::Create(create)),
            ])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// 文件名本身就是 uri；模板根目录拼出来的和预加载扫到的是磁盘路径
fn to_uri(location: &str) -> Option<Uri> {
    if location.contains("://") {
        return Uri::from_str(location).ok();
    }
    let path = fs::canonicalize(location)
        .or_else(|_| std::path::absolute(location))
        .ok()?;
    Uri::from_str(&format!("file://{}", path.display())).ok()
}

// 辅助函数：尝试将通用的 Request 转换为具体的 LSP Request 类型
fn cast<R>(req: Request) -> Result<(RequestId, R::Params), ExtractError<Request>>
where
    R: lsp_types::request::Request,
    R::Params: serde::de::DeserializeOwned,
{
    req.extract(R::METHOD)
}

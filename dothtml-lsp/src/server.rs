//! Main language server implementation

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use dothtml_config::DotHtmlConfig;
use dothtml_metadata::ControlRegistry;
use dothtml_syntax::{Document, LineIndex, Position as BytePosition, TextChange};
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams, CompletionResponse,
    CompletionTextEdit, Diagnostic, DiagnosticSeverity, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, Hover, HoverContents, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams,
    InsertTextFormat, MarkupContent, MarkupKind, Position, Range as LspRange, SelectionRange,
    SelectionRangeParams, SelectionRangeProviderCapability, ServerCapabilities, ServerInfo,
    TextDocumentItem, TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit, Url,
};
use tower_lsp::Client;

use crate::features::completion::{completion_items, CompletionCandidate};
use crate::features::diagnostics::{collect_diagnostics, DocumentDiagnostic, Severity};
use crate::features::hover::{hover as compute_hover, HoverResult};
use crate::features::selection_range::selection_ranges as compute_selection_ranges;

/// The slice of the protocol client the server actually uses, so tests can
/// substitute a recording mock.
#[async_trait]
pub trait LspClient: Send + Sync + 'static {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    );
}

#[async_trait]
impl LspClient for Client {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    ) {
        Client::publish_diagnostics(self, uri, diagnostics, version).await;
    }
}

pub trait FeatureProvider: Send + Sync + 'static {
    fn completions(
        &self,
        document: &Document,
        offset: usize,
        registry: &ControlRegistry,
    ) -> Vec<CompletionCandidate>;
    fn hover(
        &self,
        document: &Document,
        offset: usize,
        registry: &ControlRegistry,
    ) -> Option<HoverResult>;
    fn diagnostics(&self, document: &Document, registry: &ControlRegistry)
        -> Vec<DocumentDiagnostic>;
    fn selection_ranges(&self, document: &Document, offset: usize) -> Vec<Range<usize>>;
}

pub struct DefaultFeatureProvider {
    config: DotHtmlConfig,
}

impl DefaultFeatureProvider {
    pub fn new(config: DotHtmlConfig) -> Self {
        Self { config }
    }
}

impl Default for DefaultFeatureProvider {
    fn default() -> Self {
        let config = dothtml_config::load_defaults().expect("embedded defaults are well-formed");
        Self::new(config)
    }
}

impl FeatureProvider for DefaultFeatureProvider {
    fn completions(
        &self,
        document: &Document,
        offset: usize,
        registry: &ControlRegistry,
    ) -> Vec<CompletionCandidate> {
        completion_items(document, offset, registry, &self.config.completion)
    }

    fn hover(
        &self,
        document: &Document,
        offset: usize,
        registry: &ControlRegistry,
    ) -> Option<HoverResult> {
        compute_hover(document, offset, registry)
    }

    fn diagnostics(
        &self,
        document: &Document,
        registry: &ControlRegistry,
    ) -> Vec<DocumentDiagnostic> {
        collect_diagnostics(document, registry)
    }

    fn selection_ranges(&self, document: &Document, offset: usize) -> Vec<Range<usize>> {
        compute_selection_ranges(document, offset)
    }
}

#[derive(Default)]
struct DocumentStore {
    entries: RwLock<HashMap<Url, Document>>,
}

impl DocumentStore {
    async fn open(&self, uri: Url, text: String) {
        self.entries.write().await.insert(uri, Document::new(text));
    }

    async fn change(&self, uri: &Url, changes: &[TextChange]) {
        if let Some(document) = self.entries.write().await.get_mut(uri) {
            document.apply_changes(changes);
        }
    }

    async fn close(&self, uri: &Url) {
        self.entries.write().await.remove(uri);
    }

    async fn with_document<T>(&self, uri: &Url, f: impl FnOnce(&Document) -> T) -> Option<T> {
        self.entries.read().await.get(uri).map(f)
    }
}

/// Parameters of the `dothtml/updateMetadata` notification pushed by the
/// external metadata watcher. A missing `snapshot` removes the source.
#[derive(Debug, Deserialize)]
pub struct UpdateMetadataParams {
    pub key: String,
    #[serde(default)]
    pub snapshot: Option<serde_json::Value>,
}

pub struct DotHtmlLanguageServer<C = Client, P = DefaultFeatureProvider> {
    client: C,
    documents: DocumentStore,
    registry: RwLock<ControlRegistry>,
    features: Arc<P>,
}

impl DotHtmlLanguageServer<Client, DefaultFeatureProvider> {
    /// Server with the embedded defaults layered under an optional
    /// `dothtml.toml` in the working directory. Snapshot files named in the
    /// configuration are loaded into the registry up front.
    pub fn new(client: Client) -> Self {
        let config = dothtml_config::Loader::new()
            .with_optional_file("dothtml.toml")
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "configuration failed to load, using defaults");
                dothtml_config::load_defaults().expect("embedded defaults are well-formed")
            });

        let mut registry = ControlRegistry::with_default_snapshot();
        for path in &config.metadata.snapshot_paths {
            match std::fs::read_to_string(path) {
                Ok(json) => {
                    registry.update_snapshot_json(path, &json);
                }
                Err(error) => tracing::warn!(%path, %error, "snapshot file not readable"),
            }
        }

        let mut server =
            Self::with_features(client, Arc::new(DefaultFeatureProvider::new(config)));
        server.registry = RwLock::new(registry);
        server
    }
}

impl<C, P> DotHtmlLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    pub fn with_features(client: C, features: Arc<P>) -> Self {
        Self {
            client,
            documents: DocumentStore::default(),
            registry: RwLock::new(ControlRegistry::with_default_snapshot()),
            features,
        }
    }

    /// Handler for the `dothtml/updateMetadata` custom method.
    pub async fn update_metadata(&self, params: UpdateMetadataParams) -> Result<bool> {
        let accepted = {
            let mut registry = self.registry.write().await;
            match params.snapshot {
                Some(snapshot) => {
                    registry.update_snapshot_json(&params.key, &snapshot.to_string())
                }
                None => {
                    registry.remove_snapshot(&params.key);
                    true
                }
            }
        };
        tracing::debug!(source = %params.key, accepted, "metadata snapshot update");
        Ok(accepted)
    }

    async fn publish_diagnostics_for(&self, uri: Url, version: Option<i32>) {
        let registry = self.registry.read().await;
        let diagnostics = self
            .documents
            .with_document(&uri, |document| {
                let index = document.line_index();
                self.features
                    .diagnostics(document, &registry)
                    .into_iter()
                    .map(|diagnostic| to_lsp_diagnostic(&diagnostic, &index))
                    .collect()
            })
            .await
            .unwrap_or_default();
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }
}

fn to_byte_position(position: Position) -> BytePosition {
    BytePosition::new(position.line as usize, position.character as usize)
}

fn to_lsp_position(position: BytePosition) -> Position {
    Position::new(position.line as u32, position.column as u32)
}

fn to_lsp_range(span: &Range<usize>, index: &LineIndex) -> LspRange {
    LspRange {
        start: to_lsp_position(index.position_at(span.start)),
        end: to_lsp_position(index.position_at(span.end)),
    }
}

fn to_lsp_diagnostic(diagnostic: &DocumentDiagnostic, index: &LineIndex) -> Diagnostic {
    Diagnostic {
        range: to_lsp_range(&diagnostic.span, index),
        severity: Some(match diagnostic.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        }),
        source: Some("dothtml".to_owned()),
        message: diagnostic.message.clone(),
        ..Diagnostic::default()
    }
}

fn to_completion_item(candidate: CompletionCandidate, index: &LineIndex) -> CompletionItem {
    let insert_text = candidate
        .insert_text
        .clone()
        .unwrap_or_else(|| candidate.label.clone());
    let text_edit = candidate
        .replace_range
        .as_ref()
        .map(|range| {
            CompletionTextEdit::Edit(TextEdit {
                range: to_lsp_range(range, index),
                new_text: insert_text.clone(),
            })
        });
    CompletionItem {
        label: candidate.label,
        detail: candidate.detail,
        kind: Some(candidate.kind),
        insert_text: if text_edit.is_none() {
            Some(insert_text)
        } else {
            None
        },
        text_edit,
        insert_text_format: if candidate.is_snippet {
            Some(InsertTextFormat::SNIPPET)
        } else {
            None
        },
        ..CompletionItem::default()
    }
}

fn to_text_changes(params: DidChangeTextDocumentParams) -> Vec<TextChange> {
    params
        .content_changes
        .into_iter()
        .map(|change| match change.range {
            Some(range) => TextChange::ranged(
                to_byte_position(range.start),
                to_byte_position(range.end),
                change.text,
            ),
            None => TextChange::full(change.text),
        })
        .collect()
}

#[async_trait]
impl<C, P> tower_lsp::LanguageServer for DotHtmlLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::INCREMENTAL,
            )),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec![
                    "<".to_owned(),
                    "{".to_owned(),
                    ":".to_owned(),
                    " ".to_owned(),
                ]),
                ..CompletionOptions::default()
            }),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            selection_range_provider: Some(SelectionRangeProviderCapability::Simple(true)),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "dothtml-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {}

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let TextDocumentItem { uri, text, version, .. } = params.text_document;
        self.documents.open(uri.clone(), text).await;
        self.publish_diagnostics_for(uri, Some(version)).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let version = params.text_document.version;
        let changes = to_text_changes(params);
        self.documents.change(&uri, &changes).await;
        self.publish_diagnostics_for(uri, Some(version)).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.close(&uri).await;
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = to_byte_position(params.text_document_position.position);
        let registry = self.registry.read().await;
        let items = self
            .documents
            .with_document(&uri, |document| {
                let index = document.line_index();
                let offset = index.offset_at(position);
                self.features
                    .completions(document, offset, &registry)
                    .into_iter()
                    .map(|candidate| to_completion_item(candidate, &index))
                    .collect::<Vec<CompletionItem>>()
            })
            .await;
        Ok(items.filter(|items| !items.is_empty()).map(CompletionResponse::Array))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = to_byte_position(params.text_document_position_params.position);
        let registry = self.registry.read().await;
        let hover = self
            .documents
            .with_document(&uri, |document| {
                let index = document.line_index();
                let offset = index.offset_at(position);
                self.features
                    .hover(document, offset, &registry)
                    .map(|result| Hover {
                        contents: HoverContents::Markup(MarkupContent {
                            kind: MarkupKind::Markdown,
                            value: result.contents,
                        }),
                        range: Some(to_lsp_range(&result.span, &index)),
                    })
            })
            .await
            .flatten();
        Ok(hover)
    }

    async fn selection_range(
        &self,
        params: SelectionRangeParams,
    ) -> Result<Option<Vec<SelectionRange>>> {
        let uri = params.text_document.uri;
        let ranges = self
            .documents
            .with_document(&uri, |document| {
                let index = document.line_index();
                params
                    .positions
                    .iter()
                    .filter_map(|&position| {
                        let offset = index.offset_at(to_byte_position(position));
                        let spans = self.features.selection_ranges(document, offset);
                        nest_selection_ranges(&spans, &index)
                    })
                    .collect::<Vec<SelectionRange>>()
            })
            .await
            .unwrap_or_default();
        Ok(if ranges.is_empty() { None } else { Some(ranges) })
    }
}

/// Fold an innermost-first span chain into the protocol's linked
/// `SelectionRange` shape.
fn nest_selection_ranges(spans: &[Range<usize>], index: &LineIndex) -> Option<SelectionRange> {
    let mut result: Option<SelectionRange> = None;
    for span in spans.iter().rev() {
        result = Some(SelectionRange {
            range: to_lsp_range(span, index),
            parent: result.map(Box::new),
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower_lsp::lsp_types::{
        PartialResultParams, TextDocumentContentChangeEvent, TextDocumentIdentifier,
        TextDocumentPositionParams, VersionedTextDocumentIdentifier, WorkDoneProgressParams,
    };
    use tower_lsp::LanguageServer;

    #[derive(Default)]
    struct RecordingClient {
        published: Mutex<Vec<(Url, Vec<Diagnostic>, Option<i32>)>>,
    }

    #[async_trait]
    impl LspClient for Arc<RecordingClient> {
        async fn publish_diagnostics(
            &self,
            uri: Url,
            diagnostics: Vec<Diagnostic>,
            version: Option<i32>,
        ) {
            self.published
                .lock()
                .unwrap()
                .push((uri, diagnostics, version));
        }
    }

    #[derive(Default)]
    struct MockFeatureProvider {
        completions_called: AtomicUsize,
        hover_called: AtomicUsize,
        last_completion_offset: Mutex<Option<usize>>,
    }

    impl FeatureProvider for MockFeatureProvider {
        fn completions(
            &self,
            _: &Document,
            offset: usize,
            _: &ControlRegistry,
        ) -> Vec<CompletionCandidate> {
            self.completions_called.fetch_add(1, Ordering::SeqCst);
            *self.last_completion_offset.lock().unwrap() = Some(offset);
            vec![CompletionCandidate {
                label: "mock".into(),
                detail: None,
                kind: CompletionItemKind::TEXT,
                insert_text: None,
                is_snippet: false,
                replace_range: None,
            }]
        }

        fn hover(&self, _: &Document, _: usize, _: &ControlRegistry) -> Option<HoverResult> {
            self.hover_called.fetch_add(1, Ordering::SeqCst);
            Some(HoverResult {
                span: 0..5,
                contents: "hover".into(),
            })
        }

        fn diagnostics(&self, _: &Document, _: &ControlRegistry) -> Vec<DocumentDiagnostic> {
            vec![DocumentDiagnostic {
                span: 0..1,
                severity: Severity::Error,
                message: "mock diagnostic".into(),
            }]
        }

        fn selection_ranges(&self, _: &Document, _: usize) -> Vec<Range<usize>> {
            vec![2..4, 0..10]
        }
    }

    type MockServer = DotHtmlLanguageServer<Arc<RecordingClient>, MockFeatureProvider>;

    fn mock_server() -> (MockServer, Arc<RecordingClient>, Arc<MockFeatureProvider>) {
        let client = Arc::new(RecordingClient::default());
        let features = Arc::new(MockFeatureProvider::default());
        let server = DotHtmlLanguageServer::with_features(Arc::clone(&client), Arc::clone(&features));
        (server, client, features)
    }

    fn sample_uri() -> Url {
        Url::parse("file:///sample.dothtml").unwrap()
    }

    async fn open(server: &MockServer, text: &str) {
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: sample_uri(),
                    language_id: "dothtml".into(),
                    version: 1,
                    text: text.into(),
                },
            })
            .await;
    }

    #[tokio::test]
    async fn did_open_publishes_diagnostics_with_the_document_version() {
        let (server, client, _) = mock_server();
        open(&server, "<div></div>").await;

        let published = client.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (uri, diagnostics, version) = &published[0];
        assert_eq!(uri, &sample_uri());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "mock diagnostic");
        assert_eq!(*version, Some(1));
    }

    #[tokio::test]
    async fn incremental_changes_update_the_stored_document() {
        let (server, _, features) = mock_server();
        open(&server, "<div>abc</div>").await;

        server
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: sample_uri(),
                    version: 2,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: Some(LspRange {
                        start: Position::new(0, 5),
                        end: Position::new(0, 8),
                    }),
                    range_length: None,
                    text: "xyz!".into(),
                }],
            })
            .await;

        let text = server
            .documents
            .with_document(&sample_uri(), |document| document.text().to_owned())
            .await
            .expect("document is open");
        assert_eq!(text, "<div>xyz!</div>");

        // completion offset proves position math runs against the new text
        let _ = server
            .completion(CompletionParams {
                text_document_position: TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier { uri: sample_uri() },
                    position: Position::new(0, 9),
                },
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
                context: None,
            })
            .await
            .unwrap();
        assert_eq!(*features.last_completion_offset.lock().unwrap(), Some(9));
    }

    #[tokio::test]
    async fn completion_returns_feature_provider_items() {
        let (server, _, features) = mock_server();
        open(&server, "<div></div>").await;

        let response = server
            .completion(CompletionParams {
                text_document_position: TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier { uri: sample_uri() },
                    position: Position::new(0, 1),
                },
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
                context: None,
            })
            .await
            .unwrap();

        let Some(CompletionResponse::Array(items)) = response else {
            panic!("expected an item array");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "mock");
        assert_eq!(features.completions_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hover_converts_spans_to_protocol_ranges() {
        let (server, _, features) = mock_server();
        open(&server, "<div></div>").await;

        let hover = server
            .hover(HoverParams {
                text_document_position_params: TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier { uri: sample_uri() },
                    position: Position::new(0, 2),
                },
                work_done_progress_params: WorkDoneProgressParams::default(),
            })
            .await
            .unwrap()
            .expect("hover result");

        assert_eq!(features.hover_called.load(Ordering::SeqCst), 1);
        let range = hover.range.expect("range");
        assert_eq!(range.start, Position::new(0, 0));
        assert_eq!(range.end, Position::new(0, 5));
    }

    #[tokio::test]
    async fn selection_ranges_nest_innermost_first() {
        let (server, _, _) = mock_server();
        open(&server, "0123456789").await;

        let ranges = server
            .selection_range(SelectionRangeParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
                positions: vec![Position::new(0, 3)],
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
            })
            .await
            .unwrap()
            .expect("selection ranges");

        assert_eq!(ranges.len(), 1);
        let innermost = &ranges[0];
        assert_eq!(innermost.range.start, Position::new(0, 2));
        let parent = innermost.parent.as_ref().expect("parent range");
        assert_eq!(parent.range.end, Position::new(0, 10));
    }

    #[tokio::test]
    async fn update_metadata_replaces_and_removes_sources() {
        let (server, _, _) = mock_server();

        let accepted = server
            .update_metadata(UpdateMetadataParams {
                key: "project".into(),
                snapshot: Some(serde_json::json!({
                    "controls": { "My.App.Chart": {} },
                    "registrations": [
                        { "type": "code", "tagPrefix": "app", "namespace": "My.App" }
                    ]
                })),
            })
            .await
            .unwrap();
        assert!(accepted);
        assert!(server
            .registry
            .read()
            .await
            .resolve_control("app:Chart")
            .is_some());

        server
            .update_metadata(UpdateMetadataParams {
                key: "project".into(),
                snapshot: None,
            })
            .await
            .unwrap();
        assert!(server
            .registry
            .read()
            .await
            .resolve_control("app:Chart")
            .is_none());
    }

    #[tokio::test]
    async fn malformed_metadata_is_rejected_without_breaking_the_registry() {
        let (server, _, _) = mock_server();
        let accepted = server
            .update_metadata(UpdateMetadataParams {
                key: "broken".into(),
                snapshot: Some(serde_json::Value::String("not a snapshot".into())),
            })
            .await
            .unwrap();
        assert!(!accepted);
        assert!(server
            .registry
            .read()
            .await
            .resolve_control("dot:Repeater")
            .is_some());
    }

    #[tokio::test]
    async fn did_close_clears_diagnostics() {
        let (server, client, _) = mock_server();
        open(&server, "<div></div>").await;
        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
            })
            .await;

        let published = client.published.lock().unwrap();
        let (_, diagnostics, _) = published.last().expect("close publishes");
        assert!(diagnostics.is_empty());
    }
}

use dothtml_lsp::DotHtmlLanguageServer;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logging goes to stderr; stdout carries the protocol stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("dothtml_lsp=info".parse().expect("valid log directive"))
                .add_directive("tower_lsp=info".parse().expect("valid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(DotHtmlLanguageServer::new)
        .custom_method("dothtml/updateMetadata", DotHtmlLanguageServer::update_metadata)
        .finish();

    Server::new(stdin, stdout, socket).serve(service).await;
}
